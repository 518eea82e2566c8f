//! Inbound panel messages.
//!
//! The host forwards raw JSON values from the panel UI; this module gives
//! them shape. Malformed messages are dropped, not errored: a misbehaving
//! panel must not take its session down.

use jqlens_primitives::OptionFlag;
use serde::Deserialize;
use tracing::{debug, warn};

/// A request the panel UI makes of its session.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PanelRequest {
	/// Replace the active option set wholesale with these flag strings.
	SetOptions { flags: Vec<String> },
	/// Re-open the input file picker.
	ChooseInput,
	/// Materialize the last successful output as a new document.
	OpenOutput,
}

impl PanelRequest {
	/// Decodes a raw panel message. `None` means the message was not a
	/// recognizable request.
	pub fn decode(value: &serde_json::Value) -> Option<PanelRequest> {
		match serde_json::from_value(value.clone()) {
			Ok(req) => Some(req),
			Err(err) => {
				debug!(error = %err, "panel.request_undecodable");
				None
			}
		}
	}
}

/// Maps flag strings from the panel to known flags, dropping strangers.
pub fn flags_from_strings(raw: &[String]) -> Vec<OptionFlag> {
	raw.iter()
		.filter_map(|s| {
			let flag = OptionFlag::from_flag(s);
			if flag.is_none() {
				warn!(flag = %s, "panel.unknown_flag_dropped");
			}
			flag
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;
	use serde_json::json;

	use super::*;

	#[test]
	fn decodes_tagged_requests() {
		assert_eq!(
			PanelRequest::decode(&json!({"type": "setOptions", "flags": ["-c", "-S"]})),
			Some(PanelRequest::SetOptions {
				flags: vec!["-c".to_owned(), "-S".to_owned()],
			})
		);
		assert_eq!(
			PanelRequest::decode(&json!({"type": "chooseInput"})),
			Some(PanelRequest::ChooseInput)
		);
		assert_eq!(
			PanelRequest::decode(&json!({"type": "openOutput"})),
			Some(PanelRequest::OpenOutput)
		);
	}

	#[test]
	fn malformed_messages_decode_to_none() {
		assert_eq!(PanelRequest::decode(&json!({"type": "selfDestruct"})), None);
		assert_eq!(PanelRequest::decode(&json!({"flags": ["-c"]})), None);
		assert_eq!(PanelRequest::decode(&json!("not an object")), None);
		assert_eq!(PanelRequest::decode(&json!(null)), None);
	}

	#[test]
	fn unknown_flags_are_dropped_known_kept() {
		let raw = vec![
			"-c".to_owned(),
			"--slurpfile".to_owned(),
			"-S".to_owned(),
			"".to_owned(),
		];
		assert_eq!(
			flags_from_strings(&raw),
			vec![OptionFlag::CompactOutput, OptionFlag::SortKeys]
		);
	}
}
