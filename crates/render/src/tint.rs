//! Regex-based JSON tinting.
//!
//! Line-local and purely cosmetic: the text content of the output never
//! changes, spans just get wrapped in classed `<span>`s. Classification runs
//! on the raw text and escaping happens per emitted piece afterwards, so
//! escape entities can never be re-matched by a pattern. Anything the
//! patterns do not recognize is left as plain escaped text, which is the
//! right behavior for the non-JSON output `-r` produces.

use std::sync::OnceLock;

use regex::Regex;

use crate::escape::escape_markup;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tint {
	Key,
	Str,
	Num,
	Lit,
}

impl Tint {
	fn class(self) -> &'static str {
		match self {
			Tint::Key => "jq-key",
			Tint::Str => "jq-string",
			Tint::Num => "jq-number",
			Tint::Lit => "jq-literal",
		}
	}
}

fn re_key() -> &'static Regex {
	static RE: OnceLock<Regex> = OnceLock::new();
	RE.get_or_init(|| {
		Regex::new(r#"("(?:[^"\\]|\\.)*")\s*:"#)
			.expect("re_key: pattern is valid and should always compile")
	})
}

fn re_string() -> &'static Regex {
	static RE: OnceLock<Regex> = OnceLock::new();
	RE.get_or_init(|| {
		Regex::new(r#""(?:[^"\\]|\\.)*""#)
			.expect("re_string: pattern is valid and should always compile")
	})
}

fn re_number() -> &'static Regex {
	static RE: OnceLock<Regex> = OnceLock::new();
	RE.get_or_init(|| {
		Regex::new(r"-?\d+(?:\.\d+)?(?:[eE][+-]?\d+)?")
			.expect("re_number: pattern is valid and should always compile")
	})
}

fn re_literal() -> &'static Regex {
	static RE: OnceLock<Regex> = OnceLock::new();
	RE.get_or_init(|| {
		Regex::new(r"\b(?:true|false|null)\b")
			.expect("re_literal: pattern is valid and should always compile")
	})
}

/// Claimed byte range within one line. Later claims lose on overlap, which
/// is what gives key/string claims priority over the number and literal
/// patterns matching inside them.
struct Claims(Vec<(usize, usize, Tint)>);

impl Claims {
	fn new() -> Self {
		Self(Vec::new())
	}

	fn try_claim(&mut self, start: usize, end: usize, tint: Tint) {
		if self.0.iter().all(|&(s, e, _)| end <= s || e <= start) {
			self.0.push((start, end, tint));
		}
	}

	fn into_sorted(mut self) -> Vec<(usize, usize, Tint)> {
		self.0.sort_by_key(|&(s, _, _)| s);
		self.0
	}
}

/// `true` when a number match stands on its own rather than inside a word
/// or a dotted sequence like a version string.
fn number_boundaries_ok(line: &str, start: usize, end: usize) -> bool {
	let loose = |c: char| !c.is_ascii_alphanumeric() && c != '_' && c != '.';
	let before_ok = line[..start].chars().next_back().is_none_or(loose);
	let after_ok = line[end..].chars().next().is_none_or(loose);
	before_ok && after_ok
}

fn tint_line(line: &str) -> String {
	let mut claims = Claims::new();

	for caps in re_key().captures_iter(line) {
		// Group 1 is the quoted key; the trailing colon stays plain.
		if let Some(m) = caps.get(1) {
			claims.try_claim(m.start(), m.end(), Tint::Key);
		}
	}
	for m in re_string().find_iter(line) {
		claims.try_claim(m.start(), m.end(), Tint::Str);
	}
	for m in re_number().find_iter(line) {
		if number_boundaries_ok(line, m.start(), m.end()) {
			claims.try_claim(m.start(), m.end(), Tint::Num);
		}
	}
	for m in re_literal().find_iter(line) {
		claims.try_claim(m.start(), m.end(), Tint::Lit);
	}

	let mut out = String::with_capacity(line.len());
	let mut cursor = 0;
	for (start, end, tint) in claims.into_sorted() {
		out.push_str(&escape_markup(&line[cursor..start]));
		out.push_str("<span class=\"");
		out.push_str(tint.class());
		out.push_str("\">");
		out.push_str(&escape_markup(&line[start..end]));
		out.push_str("</span>");
		cursor = end;
	}
	out.push_str(&escape_markup(&line[cursor..]));
	out
}

/// Tints a whole output body line by line. Preserves line structure
/// exactly, including a trailing newline.
pub fn tint_json(text: &str) -> String {
	let mut out = String::with_capacity(text.len() + text.len() / 4);
	let mut first = true;
	for line in text.split('\n') {
		if !first {
			out.push('\n');
		}
		first = false;
		out.push_str(&tint_line(line));
	}
	out
}
