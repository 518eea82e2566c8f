//! Pure rendering: evaluator outcomes in, panel payloads out.
//!
//! Nothing in this crate does I/O or holds state. The session layer calls
//! [`view::view`] after every run and forwards decoded [`PanelRequest`]s
//! from the panel back into its own loop.

/// Markup escaping for untrusted text.
pub mod escape;
/// Inbound panel messages.
pub mod message;
/// Regex-based JSON tinting.
pub mod tint;
/// Panel payload assembly.
pub mod view;

pub use escape::escape_markup;
pub use message::{PanelRequest, flags_from_strings};
pub use tint::tint_json;
pub use view::{ViewContext, view};
