//! Evaluator option flags.
//!
//! The catalog mirrors the jq switches the preview exposes as toggles. Flags
//! travel across the panel boundary as their literal switch strings
//! (`"-c"`, `"-R"`, ...), so serde goes through [`OptionFlag::flag`] and
//! [`OptionFlag::from_flag`] rather than variant names.

use indexmap::IndexSet;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::input::InputKind;

/// One toggleable evaluator switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionFlag {
	/// `-c`: print each result on a single line.
	CompactOutput,
	/// `-n`: run the filter once with `null` input.
	NullInput,
	/// `-R`: feed each input line as a JSON string instead of parsing.
	RawInput,
	/// `-r`: print string results without JSON quoting.
	RawOutput,
	/// `-s`: read the whole input into one array before filtering.
	SlurpArray,
	/// `-S`: sort object keys in the output.
	SortKeys,
}

impl OptionFlag {
	/// Every supported flag, in catalog (display) order.
	pub const ALL: [OptionFlag; 6] = [
		OptionFlag::CompactOutput,
		OptionFlag::NullInput,
		OptionFlag::RawInput,
		OptionFlag::RawOutput,
		OptionFlag::SlurpArray,
		OptionFlag::SortKeys,
	];

	/// The literal command-line switch.
	pub fn flag(self) -> &'static str {
		match self {
			OptionFlag::CompactOutput => "-c",
			OptionFlag::NullInput => "-n",
			OptionFlag::RawInput => "-R",
			OptionFlag::RawOutput => "-r",
			OptionFlag::SlurpArray => "-s",
			OptionFlag::SortKeys => "-S",
		}
	}

	/// Human-readable toggle label shown next to the switch.
	pub fn label(self) -> &'static str {
		match self {
			OptionFlag::CompactOutput => "compact output",
			OptionFlag::NullInput => "null input",
			OptionFlag::RawInput => "raw input",
			OptionFlag::RawOutput => "raw output",
			OptionFlag::SlurpArray => "slurp into array",
			OptionFlag::SortKeys => "sort keys",
		}
	}

	/// Parses a literal switch string. Case-sensitive: `-s` and `-S` differ.
	pub fn from_flag(s: &str) -> Option<OptionFlag> {
		OptionFlag::ALL.iter().copied().find(|f| f.flag() == s)
	}
}

impl Serialize for OptionFlag {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_str(self.flag())
	}
}

impl<'de> Deserialize<'de> for OptionFlag {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		let s = String::deserialize(deserializer)?;
		OptionFlag::from_flag(&s).ok_or_else(|| D::Error::custom(format!("unknown jq flag `{s}`")))
	}
}

/// Insertion-ordered set of active flags for one session.
///
/// Order is preserved so `to_args` and the panel chips reflect the order the
/// user enabled things in, not an arbitrary hash order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptionSet {
	flags: IndexSet<OptionFlag>,
}

impl OptionSet {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn is_empty(&self) -> bool {
		self.flags.is_empty()
	}

	pub fn len(&self) -> usize {
		self.flags.len()
	}

	pub fn contains(&self, flag: OptionFlag) -> bool {
		self.flags.contains(&flag)
	}

	/// Adds a flag; returns whether the set changed.
	pub fn insert(&mut self, flag: OptionFlag) -> bool {
		self.flags.insert(flag)
	}

	/// Removes a flag; returns whether the set changed.
	///
	/// Uses `shift_remove` so the insertion order of the remaining flags
	/// survives.
	pub fn remove(&mut self, flag: OptionFlag) -> bool {
		self.flags.shift_remove(&flag)
	}

	/// Flips a flag; returns whether it is now active.
	pub fn toggle(&mut self, flag: OptionFlag) -> bool {
		if self.flags.contains(&flag) {
			self.flags.shift_remove(&flag);
			false
		} else {
			self.flags.insert(flag);
			true
		}
	}

	/// Replaces the whole set, keeping the iteration order of `flags`.
	pub fn replace_with(&mut self, flags: impl IntoIterator<Item = OptionFlag>) {
		self.flags = flags.into_iter().collect();
	}

	/// Active flags in insertion order.
	pub fn iter(&self) -> impl Iterator<Item = OptionFlag> + '_ {
		self.flags.iter().copied()
	}

	/// Command-line arguments for one evaluator run, in insertion order.
	pub fn to_args(&self) -> Vec<&'static str> {
		self.flags.iter().map(|f| f.flag()).collect()
	}

	/// Reconciles `-R` with the kind of the selected input file.
	///
	/// Plain (non-JSON) inputs force raw input on; structured inputs force it
	/// off. No other flag is touched. Callers invoke this only when the input
	/// file changes, never on a direct option edit, so a user choosing `-R`
	/// for a JSON file by hand is left alone until the next input switch.
	///
	/// Returns whether the set changed.
	pub fn apply_input_policy(&mut self, kind: InputKind) -> bool {
		match kind {
			InputKind::Plain => self.insert(OptionFlag::RawInput),
			InputKind::Structured => self.remove(OptionFlag::RawInput),
		}
	}
}

impl FromIterator<OptionFlag> for OptionSet {
	fn from_iter<I: IntoIterator<Item = OptionFlag>>(iter: I) -> Self {
		Self {
			flags: iter.into_iter().collect(),
		}
	}
}
