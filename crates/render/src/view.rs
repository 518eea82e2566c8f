//! Panel payload assembly.
//!
//! A pure function of the last outcome plus session display state. The
//! session layer calls this after every run and on every option or input
//! change; surfaces replace their content with whatever comes out.

use std::path::Path;

use jqlens_host::view::{BodyKind, InputLabel, PanelView};
use jqlens_primitives::{FilterOutcome, OptionFlag, OptionSet};

use crate::escape::escape_markup;
use crate::tint::tint_json;

/// Display state a view is built from.
pub struct ViewContext<'a> {
	pub outcome: &'a FilterOutcome,
	pub options: &'a OptionSet,
	/// Selected input file, if any.
	pub input: Option<&'a Path>,
	/// Workspace root for shortening the input label.
	pub root: Option<&'a Path>,
	/// Banner text, e.g. when the input file disappeared from disk.
	pub warning: Option<String>,
}

/// Builds the complete panel payload for one display state.
pub fn view(ctx: ViewContext<'_>) -> PanelView {
	let (body, body_kind) = match ctx.outcome {
		FilterOutcome::Placeholder => (
			"<div class=\"jq-placeholder\">Choose an input file to run the filter against.</div>"
				.to_owned(),
			BodyKind::Placeholder,
		),
		FilterOutcome::Output { text } => {
			// Raw output is not JSON; tinting would just mis-claim spans.
			let inner = if ctx.options.contains(OptionFlag::RawOutput) {
				escape_markup(text)
			} else {
				tint_json(text)
			};
			(format!("<pre class=\"jq-output\">{inner}</pre>"), BodyKind::Output)
		}
		FilterOutcome::Error { message } => (
			format!("<pre class=\"jq-error\">{}</pre>", escape_markup(message)),
			BodyKind::Error,
		),
	};

	PanelView {
		input_label: ctx.input.map(|p| InputLabel::for_path(ctx.root, p)),
		active_flags: ctx.options.iter().collect(),
		catalog: OptionFlag::ALL.to_vec(),
		body,
		body_kind,
		warning: ctx.warning,
		can_materialize: ctx.outcome.is_output(),
	}
}
