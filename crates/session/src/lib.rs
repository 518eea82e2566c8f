//! Session orchestration for live jq previews.
//!
//! A session pairs one jq filter document with one selected input file and
//! keeps a preview panel current: edits on either side re-run the external
//! evaluator, rapid edits coalesce into a single follow-up run, and results
//! land on the panel in completion order. [`PreviewRegistry`] owns the
//! sessions and is the entry point editors call from their "open preview"
//! command.
//!
//! Nothing here interprets jq. The evaluator is an external process behind
//! the [`Evaluator`] seam; the editor side is behind `jqlens_host::Host`.

use jqlens_host::HostError;

/// Per-session orchestration task and handle.
pub mod controller;
/// The external evaluator seam and the stock jq implementation.
pub mod evaluator;
mod invoke;
/// Session ownership and the open-preview entry point.
pub mod registry;

#[cfg(test)]
pub(crate) mod test_support;

pub use controller::{BUSY_GRACE, RunState, SessionHandle, SessionMsg, SessionStatus};
pub use evaluator::{EvalOutput, EvalRequest, Evaluator, JqEvaluator};
pub use registry::{PreviewRegistry, SessionConfig};

/// Possible errors.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
	/// The evaluator binary could not be found. The message doubles as the
	/// guidance shown in the preview panel.
	#[error(
		"`{program}` was not found on your PATH. Please install jq \
		 (https://jqlang.org/download/) or configure the session with the \
		 path to an existing binary."
	)]
	EvaluatorMissing { program: String },
	/// Scratch file or process I/O failed.
	#[error("{0}")]
	Io(#[from] std::io::Error),
	/// The host refused or failed an operation.
	#[error("{0}")]
	Host(#[from] HostError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
