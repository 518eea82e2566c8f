//! One evaluator run, end to end.
//!
//! Filter and input text are read through the host (live buffers win over
//! disk), written to randomly named scratch files, and handed to the
//! evaluator. Scratch files are deleted on every exit path by dropping
//! their [`tempfile::NamedTempFile`] handles. Diagnostics are rewritten so
//! they point at the real files, never at scratch paths.

use std::path::{Path, PathBuf};

use jqlens_host::Host;
use jqlens_host::view::workspace_relative;
use jqlens_primitives::FilterOutcome;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::Result;
use crate::evaluator::{EvalRequest, Evaluator};

/// Everything one run needs, snapshotted from the session so the run can
/// proceed while the session keeps handling messages.
#[derive(Debug, Clone)]
pub(crate) struct RunSpec {
	pub filter_path: PathBuf,
	pub input_path: Option<PathBuf>,
	pub args: Vec<&'static str>,
	/// Workspace root, for rewriting scratch paths in diagnostics.
	pub root: Option<PathBuf>,
}

/// Runs the filter once. Never fails: every error becomes an
/// [`FilterOutcome::Error`] carrying the message the panel should show.
pub(crate) async fn run_filter(
	host: &dyn Host,
	evaluator: &dyn Evaluator,
	spec: &RunSpec,
) -> FilterOutcome {
	match try_run(host, evaluator, spec).await {
		Ok(outcome) => outcome,
		Err(err) => FilterOutcome::Error {
			message: err.to_string(),
		},
	}
}

async fn try_run(
	host: &dyn Host,
	evaluator: &dyn Evaluator,
	spec: &RunSpec,
) -> Result<FilterOutcome> {
	let Some(input_path) = &spec.input_path else {
		return Ok(FilterOutcome::Placeholder);
	};

	let filter_text = host.document_text(&spec.filter_path).await?;
	let input_text = host.document_text(input_path).await?;

	let filter_file = scratch_file("jqlens-filter-", ".jq", &filter_text)?;
	// The input scratch keeps the original extension so the evaluator sees
	// the same file shape a direct run would.
	let input_suffix = match input_path.extension() {
		Some(ext) => format!(".{}", ext.to_string_lossy()),
		None => String::new(),
	};
	let input_file = scratch_file("jqlens-input-", &input_suffix, &input_text)?;

	let output = evaluator
		.run(EvalRequest {
			args: &spec.args,
			filter_path: filter_file.path(),
			input_path: input_file.path(),
		})
		.await?;

	if output.status_ok {
		return Ok(FilterOutcome::Output {
			text: output.stdout,
		});
	}

	// jq writes diagnostics to stderr; fall back to stdout for evaluators
	// that do not.
	let diagnostic = if output.stderr.trim().is_empty() {
		output.stdout
	} else {
		output.stderr
	};
	let root = spec.root.as_deref();
	let message = rewrite_scratch_paths(
		diagnostic,
		&[
			(filter_file.path(), display_of(root, &spec.filter_path)),
			(input_file.path(), display_of(root, input_path)),
		],
	);
	debug!(filter = %spec.filter_path.display(), "invoke.run_failed");
	Ok(FilterOutcome::Error { message })
}

fn scratch_file(prefix: &str, suffix: &str, contents: &str) -> Result<NamedTempFile> {
	let file = tempfile::Builder::new()
		.prefix(prefix)
		.suffix(suffix)
		.tempfile()?;
	std::fs::write(file.path(), contents)?;
	Ok(file)
}

fn display_of(root: Option<&Path>, path: &Path) -> String {
	workspace_relative(root, path)
}

/// Replaces every occurrence of each scratch path with the display path of
/// the real file it stands in for.
fn rewrite_scratch_paths(text: String, substitutions: &[(&Path, String)]) -> String {
	let mut out = text;
	for (scratch, display) in substitutions {
		let scratch = scratch.display().to_string();
		if out.contains(&scratch) {
			out = out.replace(&scratch, display);
		}
	}
	out
}
