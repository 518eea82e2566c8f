//! The external evaluator seam and the stock jq implementation.

use std::io;
use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use crate::{Error, Result};

/// One evaluator invocation, fully resolved to on-disk scratch files.
#[derive(Debug, Clone, Copy)]
pub struct EvalRequest<'a> {
	/// Option switches, in the order the session's option set holds them.
	pub args: &'a [&'static str],
	/// Scratch file holding the filter text.
	pub filter_path: &'a Path,
	/// Scratch file holding the input text.
	pub input_path: &'a Path,
}

/// What an evaluator run produced, regardless of success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvalOutput {
	/// Whether the process exited with status zero.
	pub status_ok: bool,
	pub stdout: String,
	pub stderr: String,
}

/// Runs one filter against one input.
///
/// Implementations must not cancel: once a run starts it is awaited to
/// completion, and the session layer serializes runs so at most one is
/// outstanding per session.
#[async_trait]
pub trait Evaluator: Send + Sync {
	async fn run(&self, req: EvalRequest<'_>) -> Result<EvalOutput>;
}

/// Invokes the real jq binary as `<program> <args> -f <filter> <input>`.
pub struct JqEvaluator {
	program: String,
}

impl JqEvaluator {
	pub fn new(program: impl Into<String>) -> Self {
		Self {
			program: program.into(),
		}
	}

	pub fn program(&self) -> &str {
		&self.program
	}
}

impl Default for JqEvaluator {
	fn default() -> Self {
		Self::new("jq")
	}
}

#[async_trait]
impl Evaluator for JqEvaluator {
	async fn run(&self, req: EvalRequest<'_>) -> Result<EvalOutput> {
		let mut cmd = Command::new(&self.program);
		cmd.args(req.args)
			.arg("-f")
			.arg(req.filter_path)
			.arg(req.input_path)
			.stdin(Stdio::null())
			.stdout(Stdio::piped())
			.stderr(Stdio::piped())
			.kill_on_drop(true);

		let output = cmd.output().await.map_err(|err| {
			if err.kind() == io::ErrorKind::NotFound {
				Error::EvaluatorMissing {
					program: self.program.clone(),
				}
			} else {
				Error::Io(err)
			}
		})?;

		// Evaluator output is expected to be UTF-8; anything else is only
		// ever displayed, so lossy conversion is fine.
		Ok(EvalOutput {
			status_ok: output.status.success(),
			stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
			stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
		})
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;

	#[tokio::test]
	async fn missing_binary_maps_to_guided_error() {
		let eval = JqEvaluator::new("jqlens-definitely-not-installed");
		let req = EvalRequest {
			args: &[],
			filter_path: Path::new("f.jq"),
			input_path: Path::new("in.json"),
		};
		let err = eval.run(req).await.unwrap_err();
		assert!(matches!(err, Error::EvaluatorMissing { .. }));
		let message = err.to_string();
		assert!(message.contains("Please install jq"), "{message}");
		assert!(message.contains("jqlens-definitely-not-installed"), "{message}");
	}

	#[cfg(unix)]
	mod unix {
		use std::os::unix::fs::PermissionsExt;

		use pretty_assertions::assert_eq;

		use super::*;

		fn fake_evaluator(dir: &Path, script: &str) -> JqEvaluator {
			let path = dir.join("fake-jq");
			std::fs::write(&path, script).unwrap();
			let mut perms = std::fs::metadata(&path).unwrap().permissions();
			perms.set_mode(0o755);
			std::fs::set_permissions(&path, perms).unwrap();
			JqEvaluator::new(path.display().to_string())
		}

		#[tokio::test]
		async fn captures_stdout_on_success() {
			let dir = tempfile::tempdir().unwrap();
			let eval = fake_evaluator(dir.path(), "#!/bin/sh\necho \"args: $@\"\n");
			let out = eval
				.run(EvalRequest {
					args: &["-c", "-S"],
					filter_path: Path::new("/tmp/f.jq"),
					input_path: Path::new("/tmp/in.json"),
				})
				.await
				.unwrap();
			assert!(out.status_ok);
			assert_eq!(out.stdout, "args: -c -S -f /tmp/f.jq /tmp/in.json\n");
			assert_eq!(out.stderr, "");
		}

		#[tokio::test]
		async fn captures_stderr_and_status_on_failure() {
			let dir = tempfile::tempdir().unwrap();
			let eval = fake_evaluator(
				dir.path(),
				"#!/bin/sh\necho partial\necho 'jq: error: boom' >&2\nexit 3\n",
			);
			let out = eval
				.run(EvalRequest {
					args: &[],
					filter_path: Path::new("/tmp/f.jq"),
					input_path: Path::new("/tmp/in.json"),
				})
				.await
				.unwrap();
			assert!(!out.status_ok);
			assert_eq!(out.stdout, "partial\n");
			assert_eq!(out.stderr, "jq: error: boom\n");
		}
	}
}
