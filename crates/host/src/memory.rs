//! In-process reference host.
//!
//! A complete [`Host`] with no editor behind it: documents live in a map,
//! watch events are emitted by hand, the file picker replays a scripted
//! queue, and panels record everything applied to them. The session test
//! suites run on it, and embedders can use it to drive sessions headless.
//!
//! Buffer and filesystem watching collapse into one registry here; `write`
//! and `delete` notify every sink subscribed to the path, whichever way it
//! subscribed.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use tokio::sync::Notify;
use tokio::sync::mpsc::UnboundedSender;

use crate::panel::{PanelEvent, PreviewSurface};
use crate::view::PanelView;
use crate::watch::{WatchEvent, WatchGuard, WatchKind};
use crate::{Host, HostError, HostResult};

type WatcherMap = HashMap<PathBuf, Vec<(u64, UnboundedSender<WatchEvent>)>>;

/// Recorded state of one created panel.
#[derive(Default)]
pub struct SurfaceState {
	views: Mutex<Vec<PanelView>>,
	busy_log: Mutex<Vec<bool>>,
	busy: AtomicBool,
	reveals: AtomicUsize,
}

impl SurfaceState {
	/// Every view applied so far, oldest first.
	pub fn views(&self) -> Vec<PanelView> {
		self.views.lock().clone()
	}

	pub fn last_view(&self) -> Option<PanelView> {
		self.views.lock().last().cloned()
	}

	pub fn view_count(&self) -> usize {
		self.views.lock().len()
	}

	/// Every `set_busy` call in order, including redundant ones.
	pub fn busy_log(&self) -> Vec<bool> {
		self.busy_log.lock().clone()
	}

	pub fn is_busy(&self) -> bool {
		self.busy.load(Ordering::SeqCst)
	}

	pub fn reveal_count(&self) -> usize {
		self.reveals.load(Ordering::SeqCst)
	}
}

struct MemorySurface {
	state: Arc<SurfaceState>,
}

impl PreviewSurface for MemorySurface {
	fn apply(&mut self, view: &PanelView) {
		self.state.views.lock().push(view.clone());
	}

	fn set_busy(&mut self, busy: bool) {
		self.state.busy.store(busy, Ordering::SeqCst);
		self.state.busy_log.lock().push(busy);
	}

	fn reveal(&mut self) {
		self.state.reveals.fetch_add(1, Ordering::SeqCst);
	}
}

/// Handle to a panel the host created, for injecting UI events and
/// inspecting what the session rendered.
#[derive(Clone)]
pub struct PanelHandle {
	pub title: String,
	pub state: Arc<SurfaceState>,
	events: UnboundedSender<PanelEvent>,
}

impl PanelHandle {
	/// Delivers a raw panel message as if the UI had sent it.
	pub fn send_message(&self, value: serde_json::Value) {
		let _ = self.events.send(PanelEvent::Message(value));
	}

	/// Simulates the user closing the panel.
	pub fn close(&self) {
		let _ = self.events.send(PanelEvent::Closed);
	}
}

/// See the module docs.
#[derive(Default)]
pub struct MemoryHost {
	root: Option<PathBuf>,
	docs: RwLock<HashMap<PathBuf, String>>,
	watchers: Arc<RwLock<WatcherMap>>,
	watch_ids: AtomicU64,
	picks: Mutex<VecDeque<Option<PathBuf>>>,
	picks_gated: AtomicBool,
	pick_gate: Notify,
	untitled: Mutex<Vec<(String, Option<String>)>>,
	panels: RwLock<Vec<PanelHandle>>,
}

impl MemoryHost {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_root(root: impl Into<PathBuf>) -> Self {
		Self {
			root: Some(root.into()),
			..Self::default()
		}
	}

	/// Sets document content without emitting any watch event.
	pub fn seed(&self, path: impl Into<PathBuf>, text: impl Into<String>) {
		self.docs.write().insert(path.into(), text.into());
	}

	/// Sets document content and notifies watchers of the path.
	/// New paths emit `Created`, existing ones `Changed`.
	pub fn write(&self, path: impl Into<PathBuf>, text: impl Into<String>) {
		let path = path.into();
		let existed = self.docs.write().insert(path.clone(), text.into()).is_some();
		let kind = if existed {
			WatchKind::Changed
		} else {
			WatchKind::Created
		};
		self.emit(&path, kind);
	}

	/// Removes a document and notifies watchers with `Removed`.
	pub fn delete(&self, path: &Path) {
		if self.docs.write().remove(path).is_some() {
			self.emit(path, WatchKind::Removed);
		}
	}

	/// Queues the next result of [`Host::pick_workspace_file`].
	pub fn enqueue_pick(&self, pick: Option<PathBuf>) {
		self.picks.lock().push_back(pick);
	}

	/// Makes every [`Host::pick_workspace_file`] call wait for
	/// [`MemoryHost::release_pick`], simulating a dialog that stays open.
	pub fn gate_picks(&self) {
		self.picks_gated.store(true, Ordering::SeqCst);
	}

	/// Lets one gated pick resolve.
	pub fn release_pick(&self) {
		self.pick_gate.notify_one();
	}

	/// Documents opened through [`Host::open_untitled`], in order:
	/// `(text, language)`.
	pub fn untitled_docs(&self) -> Vec<(String, Option<String>)> {
		self.untitled.lock().clone()
	}

	/// The most recently created panel.
	pub fn last_panel(&self) -> Option<PanelHandle> {
		self.panels.read().last().cloned()
	}

	pub fn panel_count(&self) -> usize {
		self.panels.read().len()
	}

	fn emit(&self, path: &Path, kind: WatchKind) {
		let mut watchers = self.watchers.write();
		if let Some(sinks) = watchers.get_mut(path) {
			// Drop sinks whose sessions have gone away.
			sinks.retain(|(_, sink)| sink.send(WatchEvent::new(path, kind)).is_ok());
		}
	}

	fn subscribe(&self, path: &Path, sink: UnboundedSender<WatchEvent>) -> WatchGuard {
		let id = self.watch_ids.fetch_add(1, Ordering::Relaxed);
		self.watchers
			.write()
			.entry(path.to_owned())
			.or_default()
			.push((id, sink));

		let weak = Arc::downgrade(&self.watchers);
		let path = path.to_owned();
		WatchGuard::new(move || {
			if let Some(watchers) = weak.upgrade() {
				if let Some(sinks) = watchers.write().get_mut(&path) {
					sinks.retain(|(sink_id, _)| *sink_id != id);
				}
			}
		})
	}
}

#[async_trait]
impl Host for MemoryHost {
	fn workspace_root(&self) -> Option<PathBuf> {
		self.root.clone()
	}

	async fn document_text(&self, path: &Path) -> HostResult<String> {
		self.docs
			.read()
			.get(path)
			.cloned()
			.ok_or_else(|| HostError::DocumentUnavailable(path.to_owned()))
	}

	fn watch_document(
		&self,
		path: &Path,
		sink: UnboundedSender<WatchEvent>,
	) -> HostResult<WatchGuard> {
		Ok(self.subscribe(path, sink))
	}

	fn watch_path(&self, path: &Path, sink: UnboundedSender<WatchEvent>) -> HostResult<WatchGuard> {
		Ok(self.subscribe(path, sink))
	}

	async fn pick_workspace_file(&self) -> HostResult<Option<PathBuf>> {
		if self.picks_gated.load(Ordering::SeqCst) {
			self.pick_gate.notified().await;
		}
		Ok(self.picks.lock().pop_front().flatten())
	}

	async fn open_untitled(&self, text: &str, language: Option<&str>) -> HostResult<()> {
		self.untitled
			.lock()
			.push((text.to_owned(), language.map(str::to_owned)));
		Ok(())
	}

	fn create_panel(
		&self,
		title: &str,
		events: UnboundedSender<PanelEvent>,
	) -> HostResult<Box<dyn PreviewSurface>> {
		let state = Arc::new(SurfaceState::default());
		let handle = PanelHandle {
			title: title.to_owned(),
			state: Arc::clone(&state),
			events,
		};
		self.panels.write().push(handle);
		Ok(Box::new(MemorySurface { state }))
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;
	use tokio::sync::mpsc;

	use super::*;

	#[tokio::test]
	async fn document_text_reads_seeded_content() {
		let host = MemoryHost::new();
		host.seed("/w/filter.jq", ".name");
		assert_eq!(host.document_text(Path::new("/w/filter.jq")).await.unwrap(), ".name");
		assert!(matches!(
			host.document_text(Path::new("/w/missing.jq")).await,
			Err(HostError::DocumentUnavailable(_))
		));
	}

	#[tokio::test]
	async fn write_and_delete_emit_watch_events() {
		let host = MemoryHost::new();
		let (tx, mut rx) = mpsc::unbounded_channel();
		let _guard = host.watch_path(Path::new("/w/in.json"), tx).unwrap();

		host.write("/w/in.json", "{}");
		host.write("/w/in.json", "{\"a\":1}");
		host.delete(Path::new("/w/in.json"));

		assert_eq!(rx.recv().await.unwrap().kind, WatchKind::Created);
		assert_eq!(rx.recv().await.unwrap().kind, WatchKind::Changed);
		assert_eq!(rx.recv().await.unwrap().kind, WatchKind::Removed);
	}

	#[tokio::test]
	async fn dropped_guard_stops_events() {
		let host = MemoryHost::new();
		let (tx, mut rx) = mpsc::unbounded_channel();
		let guard = host.watch_document(Path::new("/w/filter.jq"), tx).unwrap();

		host.write("/w/filter.jq", ".a");
		drop(guard);
		host.write("/w/filter.jq", ".b");

		assert_eq!(rx.recv().await.unwrap().kind, WatchKind::Created);
		assert!(rx.try_recv().is_err());
	}

	#[tokio::test]
	async fn picker_replays_script() {
		let host = MemoryHost::new();
		host.enqueue_pick(Some(PathBuf::from("/w/a.json")));
		host.enqueue_pick(None);

		assert_eq!(
			host.pick_workspace_file().await.unwrap(),
			Some(PathBuf::from("/w/a.json"))
		);
		assert_eq!(host.pick_workspace_file().await.unwrap(), None);
		// Exhausted script keeps answering "cancelled".
		assert_eq!(host.pick_workspace_file().await.unwrap(), None);
	}

	#[tokio::test]
	async fn gated_pick_waits_for_release() {
		let host = Arc::new(MemoryHost::new());
		host.gate_picks();
		host.enqueue_pick(Some(PathBuf::from("/w/a.json")));

		let picker = tokio::spawn({
			let host = Arc::clone(&host);
			async move { host.pick_workspace_file().await.unwrap() }
		});
		tokio::task::yield_now().await;
		assert!(!picker.is_finished());

		host.release_pick();
		assert_eq!(picker.await.unwrap(), Some(PathBuf::from("/w/a.json")));
	}

	#[tokio::test]
	async fn surface_records_applies_and_busy() {
		let host = MemoryHost::new();
		let (events, _events_rx) = mpsc::unbounded_channel();
		let mut surface = host.create_panel("jq preview", events).unwrap();
		let panel = host.last_panel().unwrap();
		assert_eq!(panel.title, "jq preview");

		surface.set_busy(true);
		surface.reveal();
		surface.set_busy(false);

		assert_eq!(panel.state.busy_log(), vec![true, false]);
		assert!(!panel.state.is_busy());
		assert_eq!(panel.state.reveal_count(), 1);
		assert_eq!(panel.state.view_count(), 0);
	}
}
