//! Change subscriptions for documents and input files.

use std::path::PathBuf;

/// What happened to a watched path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchKind {
	Created,
	Changed,
	Removed,
}

/// One change notification from the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
	pub path: PathBuf,
	pub kind: WatchKind,
}

impl WatchEvent {
	pub fn new(path: impl Into<PathBuf>, kind: WatchKind) -> Self {
		Self {
			path: path.into(),
			kind,
		}
	}
}

/// Keeps a subscription alive; dropping it unsubscribes.
///
/// The teardown closure must tolerate the host side having gone away
/// already, since sessions and hosts can shut down in either order.
pub struct WatchGuard {
	cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl WatchGuard {
	pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
		Self {
			cancel: Some(Box::new(cancel)),
		}
	}

	/// A guard with no teardown, for hosts whose subscriptions are free.
	pub fn noop() -> Self {
		Self { cancel: None }
	}
}

impl Drop for WatchGuard {
	fn drop(&mut self) {
		if let Some(cancel) = self.cancel.take() {
			cancel();
		}
	}
}

impl std::fmt::Debug for WatchGuard {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("WatchGuard")
			.field("armed", &self.cancel.is_some())
			.finish()
	}
}
