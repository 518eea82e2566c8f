//! Result of a single evaluator run.

/// What one run of the filter produced.
///
/// `Output` and `Error` both carry text destined for the preview body;
/// rewriting scratch-file paths back to real ones happens before an outcome
/// is constructed, so consumers never see temp paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterOutcome {
	/// No input file selected yet; the preview shows guidance instead.
	Placeholder,
	/// The evaluator exited cleanly; `text` is its verbatim stdout.
	Output { text: String },
	/// The evaluator failed (or could not run); `message` is its diagnostic.
	Error { message: String },
}

impl FilterOutcome {
	pub fn is_output(&self) -> bool {
		matches!(self, FilterOutcome::Output { .. })
	}

	pub fn is_error(&self) -> bool {
		matches!(self, FilterOutcome::Error { .. })
	}
}
