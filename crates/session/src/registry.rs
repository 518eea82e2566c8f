use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use jqlens_host::Host;
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::Result;
use crate::controller::{self, BUSY_GRACE, SessionHandle};
use crate::evaluator::{Evaluator, JqEvaluator};

/// Settings for the sessions a registry opens.
#[derive(Debug, Clone)]
pub struct SessionConfig {
	/// Name or path of the jq binary to invoke.
	pub program: String,
	/// How long a run may stay outstanding before the panel shows its
	/// loading indicator.
	pub busy_grace: Duration,
}

impl Default for SessionConfig {
	fn default() -> Self {
		Self {
			program: "jq".to_owned(),
			busy_grace: BUSY_GRACE,
		}
	}
}

/// Owns at most one live session per filter document.
///
/// This is the entry point an editor's "open jq preview" command calls.
/// Reopening a filter that already has a live session reveals its panel
/// instead of spawning a second one.
pub struct PreviewRegistry {
	host: Arc<dyn Host>,
	evaluator: Arc<dyn Evaluator>,
	busy_grace: Duration,
	sessions: RwLock<HashMap<PathBuf, SessionHandle>>,
}

impl PreviewRegistry {
	pub fn new(host: Arc<dyn Host>, config: SessionConfig) -> Self {
		Self::with_evaluator(
			host,
			Arc::new(JqEvaluator::new(config.program)),
			config.busy_grace,
		)
	}

	/// Registry with a custom evaluator, for tests and for embedders that
	/// ship their own jq.
	pub fn with_evaluator(
		host: Arc<dyn Host>,
		evaluator: Arc<dyn Evaluator>,
		busy_grace: Duration,
	) -> Self {
		Self {
			host,
			evaluator,
			busy_grace,
			sessions: RwLock::new(HashMap::new()),
		}
	}

	/// Opens a preview for `filter_path`, or reveals the existing one.
	///
	/// Documents without a `.jq` extension are ignored. Must be called from
	/// within a tokio runtime.
	pub fn open_preview(&self, filter_path: &Path) -> Result<()> {
		if filter_path
			.extension()
			.is_none_or(|ext| !ext.eq_ignore_ascii_case("jq"))
		{
			debug!(path = %filter_path.display(), "registry.open_ignored_not_a_filter");
			return Ok(());
		}

		if let Some(handle) = self.sessions.read().get(filter_path)
			&& handle.is_live()
		{
			debug!(filter = %filter_path.display(), "registry.reveal_existing");
			handle.reveal();
			return Ok(());
		}

		let handle = controller::spawn(
			Arc::clone(&self.host),
			Arc::clone(&self.evaluator),
			filter_path.to_owned(),
			self.busy_grace,
		)?;
		let mut sessions = self.sessions.write();
		// Opportunistic sweep of sessions whose tasks have ended.
		sessions.retain(|_, h| h.is_live());
		sessions.insert(filter_path.to_owned(), handle);
		info!(filter = %filter_path.display(), open = sessions.len(), "registry.open");
		Ok(())
	}

	/// Handle of the live session for `filter_path`, if any.
	pub fn session(&self, filter_path: &Path) -> Option<SessionHandle> {
		self.sessions
			.read()
			.get(filter_path)
			.filter(|handle| handle.is_live())
			.cloned()
	}

	pub fn live_count(&self) -> usize {
		self.sessions
			.read()
			.values()
			.filter(|handle| handle.is_live())
			.count()
	}

	/// Disposes every session, e.g. on editor shutdown.
	pub fn dispose_all(&self) {
		let sessions = std::mem::take(&mut *self.sessions.write());
		for (filter, handle) in sessions {
			debug!(filter = %filter.display(), "registry.dispose");
			handle.dispose();
		}
	}
}

#[cfg(test)]
mod tests {
	use jqlens_host::memory::MemoryHost;
	use pretty_assertions::assert_eq;

	use super::*;
	use crate::test_support::{ScriptedEvaluator, wait_until};

	fn registry() -> (Arc<MemoryHost>, Arc<ScriptedEvaluator>, PreviewRegistry) {
		let host = Arc::new(MemoryHost::with_root("/ws"));
		host.seed("/ws/filter.jq", ".");
		host.seed("/ws/other.jq", ".a");
		let eval = Arc::new(ScriptedEvaluator::new());
		let registry = PreviewRegistry::with_evaluator(
			host.clone(),
			eval.clone(),
			Duration::from_millis(50),
		);
		(host, eval, registry)
	}

	#[tokio::test]
	async fn non_filter_documents_are_ignored() {
		let (host, _eval, registry) = registry();

		registry.open_preview(Path::new("/ws/readme.md")).unwrap();
		registry.open_preview(Path::new("/ws/no-extension")).unwrap();

		assert_eq!(registry.live_count(), 0);
		assert_eq!(host.panel_count(), 0);
	}

	#[tokio::test]
	async fn uppercase_extension_is_accepted() {
		let (host, _eval, registry) = registry();
		host.seed("/ws/UPPER.JQ", ".");

		registry.open_preview(Path::new("/ws/UPPER.JQ")).unwrap();
		assert_eq!(registry.live_count(), 1);
	}

	#[tokio::test]
	async fn reopening_reveals_instead_of_duplicating() {
		let (host, _eval, registry) = registry();

		registry.open_preview(Path::new("/ws/filter.jq")).unwrap();
		assert_eq!(host.panel_count(), 1);
		let panel = host.last_panel().unwrap();
		assert_eq!(panel.title, "jq preview: filter.jq");

		registry.open_preview(Path::new("/ws/filter.jq")).unwrap();
		assert_eq!(host.panel_count(), 1);
		wait_until("revealed", || panel.state.reveal_count() == 1).await;
		assert_eq!(registry.live_count(), 1);
	}

	#[tokio::test]
	async fn disposed_session_reopens_with_a_fresh_panel() {
		let (host, _eval, registry) = registry();

		registry.open_preview(Path::new("/ws/filter.jq")).unwrap();
		let handle = registry.session(Path::new("/ws/filter.jq")).unwrap();
		handle.dispose();
		wait_until("session ended", || !handle.is_live()).await;
		assert!(registry.session(Path::new("/ws/filter.jq")).is_none());

		registry.open_preview(Path::new("/ws/filter.jq")).unwrap();
		assert_eq!(host.panel_count(), 2);
		assert_eq!(registry.live_count(), 1);
	}

	#[tokio::test]
	async fn dispose_all_ends_every_session() {
		let (_host, _eval, registry) = registry();

		registry.open_preview(Path::new("/ws/filter.jq")).unwrap();
		registry.open_preview(Path::new("/ws/other.jq")).unwrap();
		assert_eq!(registry.live_count(), 2);

		let first = registry.session(Path::new("/ws/filter.jq")).unwrap();
		let second = registry.session(Path::new("/ws/other.jq")).unwrap();
		registry.dispose_all();
		wait_until("all ended", || !first.is_live() && !second.is_live()).await;
		assert_eq!(registry.live_count(), 0);
	}
}
