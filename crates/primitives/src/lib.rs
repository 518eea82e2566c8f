//! Core types for jq preview sessions: option flags, input kinds, and run outcomes.

/// Evaluator option flags and the ordered option set.
pub mod flags;
/// Input file classification.
pub mod input;
/// Result of a single evaluator run.
pub mod outcome;

pub use flags::{OptionFlag, OptionSet};
pub use input::InputKind;
pub use outcome::FilterOutcome;
