//! Shared helpers for the session test suites.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::time::{sleep, timeout};

use crate::evaluator::{EvalOutput, EvalRequest, Evaluator};
use crate::{Error, Result};

/// Polls `condition` until it holds, failing the test after a hard timeout.
pub(crate) async fn wait_until<F>(name: &str, mut condition: F)
where
	F: FnMut() -> bool,
{
	timeout(Duration::from_secs(2), async move {
		loop {
			if condition() {
				return;
			}
			sleep(Duration::from_millis(2)).await;
		}
	})
	.await
	.unwrap_or_else(|_| panic!("timed out waiting for {name}"));
}

enum Script {
	Success(String),
	Failure { stdout: String, stderr: String },
	FailWithPaths(String),
	MissingBinary(String),
}

/// Scriptable evaluator that records every request.
///
/// With the gate armed, each run blocks until [`ScriptedEvaluator::proceed`]
/// releases it, which lets tests hold a run outstanding deterministically.
/// An exhausted script answers with a trivial success.
pub(crate) struct ScriptedEvaluator {
	calls: AtomicUsize,
	gated: AtomicBool,
	gate: Notify,
	script: Mutex<VecDeque<Script>>,
	record_contents: AtomicBool,
	last_args: Mutex<Vec<String>>,
	last_paths: Mutex<Option<(PathBuf, PathBuf)>>,
	last_contents: Mutex<Option<(String, String)>>,
}

impl ScriptedEvaluator {
	pub(crate) fn new() -> Self {
		Self {
			calls: AtomicUsize::new(0),
			gated: AtomicBool::new(false),
			gate: Notify::new(),
			script: Mutex::new(VecDeque::new()),
			record_contents: AtomicBool::new(false),
			last_args: Mutex::new(Vec::new()),
			last_paths: Mutex::new(None),
			last_contents: Mutex::new(None),
		}
	}

	pub(crate) fn gated() -> Arc<Self> {
		let eval = Self::new();
		eval.gated.store(true, Ordering::SeqCst);
		Arc::new(eval)
	}

	/// Releases one blocked (or the next) run.
	pub(crate) fn proceed(&self) {
		self.gate.notify_one();
	}

	pub(crate) fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}

	pub(crate) fn push_success(&self, stdout: impl Into<String>) {
		self.script.lock().push_back(Script::Success(stdout.into()));
	}

	pub(crate) fn push_failure(&self, stdout: impl Into<String>, stderr: impl Into<String>) {
		self.script.lock().push_back(Script::Failure {
			stdout: stdout.into(),
			stderr: stderr.into(),
		});
	}

	/// Next run fails with a diagnostic mentioning the scratch paths it was
	/// given; `{filter}` and `{input}` in the template are substituted.
	pub(crate) fn fail_mentioning_paths(&self, template: impl Into<String>) {
		self.script
			.lock()
			.push_back(Script::FailWithPaths(template.into()));
	}

	pub(crate) fn push_missing_binary(&self, program: impl Into<String>) {
		self.script
			.lock()
			.push_back(Script::MissingBinary(program.into()));
	}

	/// Makes subsequent runs snapshot the scratch file contents they see.
	pub(crate) fn record_scratch_contents(&self) {
		self.record_contents.store(true, Ordering::SeqCst);
	}

	pub(crate) fn last_args(&self) -> Vec<String> {
		self.last_args.lock().clone()
	}

	pub(crate) fn last_paths(&self) -> Option<(PathBuf, PathBuf)> {
		self.last_paths.lock().clone()
	}

	pub(crate) fn last_contents(&self) -> Option<(String, String)> {
		self.last_contents.lock().clone()
	}
}

#[async_trait]
impl Evaluator for ScriptedEvaluator {
	async fn run(&self, req: EvalRequest<'_>) -> Result<EvalOutput> {
		self.calls.fetch_add(1, Ordering::SeqCst);
		*self.last_args.lock() = req.args.iter().map(|s| (*s).to_owned()).collect();
		*self.last_paths.lock() = Some((req.filter_path.to_owned(), req.input_path.to_owned()));
		if self.record_contents.load(Ordering::SeqCst) {
			let filter = std::fs::read_to_string(req.filter_path).unwrap_or_default();
			let input = std::fs::read_to_string(req.input_path).unwrap_or_default();
			*self.last_contents.lock() = Some((filter, input));
		}

		if self.gated.load(Ordering::SeqCst) {
			self.gate.notified().await;
		}

		let script = self.script.lock().pop_front();
		match script {
			None => Ok(EvalOutput {
				status_ok: true,
				stdout: "{}\n".to_owned(),
				stderr: String::new(),
			}),
			Some(Script::Success(stdout)) => Ok(EvalOutput {
				status_ok: true,
				stdout,
				stderr: String::new(),
			}),
			Some(Script::Failure { stdout, stderr }) => Ok(EvalOutput {
				status_ok: false,
				stdout,
				stderr,
			}),
			Some(Script::FailWithPaths(template)) => {
				let stderr = template
					.replace("{filter}", &req.filter_path.display().to_string())
					.replace("{input}", &req.input_path.display().to_string());
				Ok(EvalOutput {
					status_ok: false,
					stdout: String::new(),
					stderr,
				})
			}
			Some(Script::MissingBinary(program)) => Err(Error::EvaluatorMissing { program }),
		}
	}
}
