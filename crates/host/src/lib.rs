//! The seam between the preview core and the editor embedding it.
//!
//! The core never draws UI or touches the filesystem watcher machinery
//! itself; everything it needs from the surrounding editor goes through
//! [`Host`], and everything it shows goes through a [`PreviewSurface`]
//! applied with a [`PanelView`]. [`memory::MemoryHost`] is a complete
//! in-process implementation used by the test suites and by embedders that
//! want to drive sessions headless.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedSender;

/// In-process reference host.
pub mod memory;
/// Preview surface and inbound panel events.
pub mod panel;
/// The display payload applied to a surface.
pub mod view;
/// Change subscriptions for documents and input files.
pub mod watch;

pub use panel::{PanelEvent, PreviewSurface};
pub use view::{BodyKind, InputLabel, PanelView};
pub use watch::{WatchEvent, WatchGuard, WatchKind};

/// Errors a host can report back to the core.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum HostError {
	/// Filesystem access on behalf of the core failed.
	#[error("{0}")]
	Io(#[from] std::io::Error),
	/// The document is neither open in the editor nor readable from disk.
	#[error("document unavailable: {0}")]
	DocumentUnavailable(PathBuf),
	/// The preview surface was torn down while the core still held it.
	#[error("preview panel closed")]
	PanelClosed,
	/// The host does not implement an optional capability.
	#[error("unsupported host operation: {0}")]
	Unsupported(&'static str),
}

pub type HostResult<T> = Result<T, HostError>;

/// Everything the preview core needs from the surrounding editor.
///
/// One instance serves all sessions; implementations are shared behind an
/// `Arc` and must be safe to call from the session tasks.
#[async_trait]
pub trait Host: Send + Sync {
	/// Root of the open workspace, if any. Used to shorten displayed paths.
	fn workspace_root(&self) -> Option<PathBuf>;

	/// Current text of a document. The live buffer wins over the on-disk
	/// contents whenever the document is open, so unsaved edits preview
	/// correctly.
	async fn document_text(&self, path: &Path) -> HostResult<String>;

	/// Subscribes to edits of an open document's buffer. Events flow into
	/// `sink` until the returned guard is dropped.
	fn watch_document(
		&self,
		path: &Path,
		sink: UnboundedSender<WatchEvent>,
	) -> HostResult<WatchGuard>;

	/// Subscribes to filesystem changes of a path (the selected input file).
	fn watch_path(&self, path: &Path, sink: UnboundedSender<WatchEvent>) -> HostResult<WatchGuard>;

	/// Asks the user to pick a file from the workspace. `None` means the
	/// picker was cancelled.
	async fn pick_workspace_file(&self) -> HostResult<Option<PathBuf>>;

	/// Opens a new untitled document containing `text`, optionally with a
	/// language association for highlighting.
	async fn open_untitled(&self, text: &str, language: Option<&str>) -> HostResult<()>;

	/// Creates the preview surface for one session. Inbound UI events flow
	/// into `events` for the session task to consume.
	fn create_panel(
		&self,
		title: &str,
		events: UnboundedSender<PanelEvent>,
	) -> HostResult<Box<dyn PreviewSurface>>;
}
