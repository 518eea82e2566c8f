//! Markup escaping for untrusted text.

/// Escapes text for safe embedding in panel markup.
///
/// Every byte of evaluator output and every diagnostic passes through here
/// exactly once before it reaches a panel body.
pub fn escape_markup(text: &str) -> String {
	let mut out = String::with_capacity(text.len());
	for c in text.chars() {
		match c {
			'<' => out.push_str("&lt;"),
			'>' => out.push_str("&gt;"),
			'&' => out.push_str("&amp;"),
			'"' => out.push_str("&quot;"),
			'\'' => out.push_str("&#39;"),
			_ => out.push(c),
		}
	}
	out
}
