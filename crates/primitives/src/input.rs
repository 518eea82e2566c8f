//! Input file classification.

use std::path::Path;

/// How the evaluator should treat the selected input file.
///
/// Derived purely from the file name; nothing sniffs content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
	/// A `.json` file the evaluator can parse directly.
	Structured,
	/// Anything else: fed line-by-line as raw strings.
	Plain,
}

impl InputKind {
	/// Classifies by extension. `.json` (any case) is structured, everything
	/// else, including extensionless paths, is plain.
	pub fn from_path(path: &Path) -> InputKind {
		let structured = path
			.extension()
			.is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
		if structured {
			InputKind::Structured
		} else {
			InputKind::Plain
		}
	}
}

#[cfg(test)]
mod tests {
	use std::path::Path;

	use super::*;

	#[test]
	fn json_extension_is_structured() {
		assert_eq!(
			InputKind::from_path(Path::new("data/people.json")),
			InputKind::Structured
		);
		assert_eq!(
			InputKind::from_path(Path::new("UPPER.JSON")),
			InputKind::Structured
		);
	}

	#[test]
	fn everything_else_is_plain() {
		for p in ["notes.txt", "app.log", "README", "archive.json.bak", ".json"] {
			assert_eq!(InputKind::from_path(Path::new(p)), InputKind::Plain, "{p}");
		}
	}
}
