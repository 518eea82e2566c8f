//! Preview surface and inbound panel events.

use crate::view::PanelView;

/// Events the panel sends back to its session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelEvent {
	/// A structured message from the panel UI (option toggles, input
	/// re-selection, materialize requests). Decoded by the render layer;
	/// the host just forwards the raw value.
	Message(serde_json::Value),
	/// The user closed the panel. The session disposes itself in response.
	Closed,
}

/// The host-owned widget a session renders into.
///
/// Calls arrive from the session task; implementations marshal to their UI
/// thread as needed.
pub trait PreviewSurface: Send {
	/// Replaces the displayed content wholesale.
	fn apply(&mut self, view: &PanelView);

	/// Shows or hides the loading indicator.
	fn set_busy(&mut self, busy: bool);

	/// Brings the panel to the foreground without changing its content.
	fn reveal(&mut self);
}
