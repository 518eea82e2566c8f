//! The display payload applied to a surface.

use std::path::Path;

use jqlens_primitives::OptionFlag;
use serde::Serialize;

/// Identity of the selected input file as shown in the panel header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InputLabel {
	/// File name only.
	pub name: String,
	/// Workspace-relative parent directory; absolute when the file lives
	/// outside the workspace, empty at the workspace root.
	pub location: String,
}

impl InputLabel {
	pub fn for_path(root: Option<&Path>, path: &Path) -> Self {
		let name = match path.file_name() {
			Some(n) => n.to_string_lossy().into_owned(),
			None => path.display().to_string(),
		};
		let location = path
			.parent()
			.map(|dir| workspace_relative(root, dir))
			.unwrap_or_default();
		Self { name, location }
	}
}

/// What kind of content the body holds, so surfaces can style it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum BodyKind {
	Placeholder,
	Output,
	Error,
}

/// Everything a surface needs to draw one preview state.
///
/// Surfaces replace their content wholesale on every apply; there is no
/// incremental update protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelView {
	/// Selected input, if any.
	pub input_label: Option<InputLabel>,
	/// Currently active flags, in the order the user enabled them.
	pub active_flags: Vec<OptionFlag>,
	/// The full flag catalog, in fixed display order, so the panel can
	/// render every toggle without knowing the flag table itself.
	pub catalog: Vec<OptionFlag>,
	/// Markup for the result area. Already escaped; safe to inject.
	pub body: String,
	pub body_kind: BodyKind,
	/// Banner shown above the body (e.g. the input file disappeared).
	/// Independent of the body: a stale-but-valid result stays visible
	/// underneath.
	pub warning: Option<String>,
	/// Whether the "open output as document" action is available.
	pub can_materialize: bool,
}

/// Path relative to the workspace root, for display and diagnostics.
/// Falls back to the path as given when there is no root or the path lives
/// outside it.
pub fn workspace_relative(root: Option<&Path>, path: &Path) -> String {
	let rel = root
		.and_then(|r| path.strip_prefix(r).ok())
		.unwrap_or(path);
	rel.display().to_string()
}
