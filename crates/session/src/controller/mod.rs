//! Per-session orchestration.
//!
//! One task owns one session: the pairing of a jq filter document with a
//! selected input file and the panel previewing the result. All mutation
//! flows through the task's mailbox, so session state needs no locks.
//!
//! Scheduling invariant: at most one evaluator run is outstanding per
//! session. Changes that arrive mid-run collapse into a single follow-up,
//! so a burst of keystrokes costs one extra run, not one run per
//! keystroke. Runs are never cancelled; a completed run's result is
//! applied and, if anything changed meanwhile, the follow-up starts
//! immediately.


use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use jqlens_host::view::workspace_relative;
use jqlens_host::{Host, PanelEvent, PreviewSurface, WatchEvent, WatchGuard, WatchKind};
use jqlens_primitives::{FilterOutcome, InputKind, OptionFlag, OptionSet};
use jqlens_render::{PanelRequest, ViewContext, flags_from_strings, view};
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info, warn};

use crate::Result;
use crate::evaluator::Evaluator;
use crate::invoke::{RunSpec, run_filter};

/// How long a run may stay outstanding before the panel shows its loading
/// indicator. Runs that finish sooner never flash it.
pub const BUSY_GRACE: Duration = Duration::from_millis(100);

/// Control messages accepted by a session task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionMsg {
	/// Something the preview depends on changed; re-run when possible.
	Refresh,
	/// Replace the option set wholesale.
	SetOptions(Vec<OptionFlag>),
	/// Select a new input file.
	SetInput(PathBuf),
	/// Ask the host to pick an input file.
	PickInput,
	/// Open the last successful output as a new document.
	Materialize,
	/// Bring the panel to the foreground.
	Reveal,
	/// Tear the session down.
	Dispose,
}

/// Evaluation scheduling state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RunState {
	/// No run outstanding.
	#[default]
	Idle,
	/// One run outstanding, nothing queued behind it.
	Running,
	/// One run outstanding and changes arrived meanwhile. Any number of
	/// further changes stay absorbed here; exactly one follow-up run
	/// starts when the current one completes.
	RunningWithPendingUpdate,
}

/// Externally observable session state, published on a watch channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStatus {
	pub state: RunState,
	/// Total completed runs, including placeholder refreshes.
	pub runs_completed: u64,
	pub disposed: bool,
}

/// Completion message from a spawned run task.
#[derive(Debug)]
struct RunComplete {
	seq: u64,
	outcome: FilterOutcome,
}

/// Cloneable handle to a running session. All methods are fire-and-forget
/// sends; they are no-ops once the session is gone.
#[derive(Clone)]
pub struct SessionHandle {
	tx: mpsc::UnboundedSender<SessionMsg>,
	status: watch::Receiver<SessionStatus>,
}

impl SessionHandle {
	pub fn refresh(&self) {
		let _ = self.tx.send(SessionMsg::Refresh);
	}

	pub fn set_options(&self, flags: Vec<OptionFlag>) {
		let _ = self.tx.send(SessionMsg::SetOptions(flags));
	}

	pub fn set_input(&self, path: impl Into<PathBuf>) {
		let _ = self.tx.send(SessionMsg::SetInput(path.into()));
	}

	pub fn pick_input(&self) {
		let _ = self.tx.send(SessionMsg::PickInput);
	}

	pub fn materialize(&self) {
		let _ = self.tx.send(SessionMsg::Materialize);
	}

	pub fn reveal(&self) {
		let _ = self.tx.send(SessionMsg::Reveal);
	}

	pub fn dispose(&self) {
		let _ = self.tx.send(SessionMsg::Dispose);
	}

	/// Whether the session task is still accepting messages.
	pub fn is_live(&self) -> bool {
		!self.tx.is_closed()
	}

	pub fn status(&self) -> SessionStatus {
		*self.status.borrow()
	}

	/// A receiver for status updates, for callers that want to await state
	/// changes instead of polling.
	pub fn watch_status(&self) -> watch::Receiver<SessionStatus> {
		self.status.clone()
	}
}

impl std::fmt::Debug for SessionHandle {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SessionHandle")
			.field("live", &self.is_live())
			.field("status", &self.status())
			.finish()
	}
}

fn panel_title(filter_path: &Path) -> String {
	match filter_path.file_name() {
		Some(name) => format!("jq preview: {}", name.to_string_lossy()),
		None => "jq preview".to_owned(),
	}
}

/// Starts a session task for `filter_path` and returns its handle.
///
/// Must be called from within a tokio runtime; the task lives until the
/// handle sends `Dispose`, the panel closes, or every handle is dropped.
pub(crate) fn spawn(
	host: Arc<dyn Host>,
	evaluator: Arc<dyn Evaluator>,
	filter_path: PathBuf,
	busy_grace: Duration,
) -> Result<SessionHandle> {
	let (msg_tx, msg_rx) = mpsc::unbounded_channel();
	let (watch_tx, watch_rx) = mpsc::unbounded_channel();
	let (panel_tx, panel_rx) = mpsc::unbounded_channel();
	let (completion_tx, completion_rx) = mpsc::unbounded_channel();
	let (status_tx, status_rx) = watch::channel(SessionStatus::default());

	let filter_watch = host.watch_document(&filter_path, watch_tx.clone())?;
	let surface = host.create_panel(&panel_title(&filter_path), panel_tx)?;

	info!(filter = %filter_path.display(), "session.open");

	let session = Session {
		filter_path,
		host,
		evaluator,
		surface,
		options: OptionSet::new(),
		input: None,
		input_missing: false,
		state: RunState::Idle,
		run_seq: 0,
		runs_completed: 0,
		last_outcome: FilterOutcome::Placeholder,
		busy_grace,
		busy_deadline: None,
		busy_shown: false,
		completion_tx,
		msg_tx: msg_tx.downgrade(),
		watch_tx,
		_filter_watch: filter_watch,
		input_watch: None,
		status_tx,
	};
	tokio::spawn(session.run(msg_rx, watch_rx, panel_rx, completion_rx));

	Ok(SessionHandle {
		tx: msg_tx,
		status: status_rx,
	})
}

/// Task-owned session state.
struct Session {
	filter_path: PathBuf,
	host: Arc<dyn Host>,
	evaluator: Arc<dyn Evaluator>,
	surface: Box<dyn PreviewSurface>,
	options: OptionSet,
	input: Option<PathBuf>,
	/// The selected input disappeared from disk; shown as a banner, not an
	/// error body.
	input_missing: bool,
	state: RunState,
	/// Monotonic run counter; completions carry it back so anything stale
	/// is discarded.
	run_seq: u64,
	runs_completed: u64,
	last_outcome: FilterOutcome,
	busy_grace: Duration,
	/// Armed when a run chain leaves `Idle`; cleared on return to `Idle`.
	/// Deliberately not re-armed by coalesced follow-ups, so a chain shows
	/// one continuous busy phase.
	busy_deadline: Option<Instant>,
	busy_shown: bool,
	completion_tx: mpsc::UnboundedSender<RunComplete>,
	/// For feeding picker results back through the mailbox. Weak, so a
	/// pending pick never holds the mailbox open once every handle is gone.
	msg_tx: mpsc::WeakUnboundedSender<SessionMsg>,
	/// Kept for re-subscription when the input file changes.
	watch_tx: mpsc::UnboundedSender<WatchEvent>,
	_filter_watch: WatchGuard,
	input_watch: Option<WatchGuard>,
	status_tx: watch::Sender<SessionStatus>,
}

async fn busy_deadline_elapsed(deadline: Option<Instant>) {
	match deadline {
		Some(at) => sleep_until(at).await,
		None => std::future::pending().await,
	}
}

impl Session {
	async fn run(
		mut self,
		mut msgs: mpsc::UnboundedReceiver<SessionMsg>,
		mut watches: mpsc::UnboundedReceiver<WatchEvent>,
		mut panel_events: mpsc::UnboundedReceiver<PanelEvent>,
		mut completions: mpsc::UnboundedReceiver<RunComplete>,
	) {
		// A fresh panel shows the placeholder until an input is chosen.
		self.apply_view();

		loop {
			tokio::select! {
				maybe_msg = msgs.recv() => match maybe_msg {
					// All handles dropped: nobody is left to dispose us.
					None => break,
					Some(msg) => {
						if self.handle_msg(msg).await.is_break() {
							break;
						}
					}
				},
				Some(event) = watches.recv() => self.handle_watch(event),
				Some(event) = panel_events.recv() => {
					if self.handle_panel(event).await.is_break() {
						break;
					}
				}
				Some(done) = completions.recv() => self.handle_completion(done),
				_ = busy_deadline_elapsed(self.busy_deadline), if self.busy_deadline.is_some() => {
					self.show_busy();
				}
			}
		}

		self.teardown();
	}

	async fn handle_msg(&mut self, msg: SessionMsg) -> ControlFlow<()> {
		match msg {
			SessionMsg::Refresh => self.note_dirty(),
			SessionMsg::SetOptions(flags) => self.set_options(flags),
			SessionMsg::SetInput(path) => self.set_input(path),
			SessionMsg::PickInput => self.pick_input(),
			SessionMsg::Materialize => self.materialize().await,
			SessionMsg::Reveal => self.surface.reveal(),
			SessionMsg::Dispose => return ControlFlow::Break(()),
		}
		ControlFlow::Continue(())
	}

	/// The three-state scheduling machine. Every "something changed" signal
	/// lands here.
	fn note_dirty(&mut self) {
		match self.state {
			RunState::Idle => self.start_run(),
			RunState::Running => {
				debug!(filter = %self.filter_path.display(), "session.coalesced");
				self.state = RunState::RunningWithPendingUpdate;
				self.publish_status();
			}
			// Already queued; further changes fold into the same follow-up.
			RunState::RunningWithPendingUpdate => {}
		}
	}

	fn start_run(&mut self) {
		// Arm the indicator grace only when a chain starts from Idle.
		if self.state == RunState::Idle && !self.busy_shown {
			self.busy_deadline = Some(Instant::now() + self.busy_grace);
		}
		self.run_seq += 1;
		let seq = self.run_seq;
		self.state = RunState::Running;
		self.publish_status();
		debug!(seq, filter = %self.filter_path.display(), "session.run_start");

		let host = Arc::clone(&self.host);
		let evaluator = Arc::clone(&self.evaluator);
		let spec = RunSpec {
			filter_path: self.filter_path.clone(),
			input_path: self.input.clone(),
			args: self.options.to_args(),
			root: self.host.workspace_root(),
		};
		let completion_tx = self.completion_tx.clone();
		tokio::spawn(async move {
			let outcome = run_filter(host.as_ref(), evaluator.as_ref(), &spec).await;
			// Send failure means the session is gone; the outcome is
			// dropped here and never touches the surface.
			let _ = completion_tx.send(RunComplete { seq, outcome });
		});
	}

	fn handle_completion(&mut self, done: RunComplete) {
		if done.seq != self.run_seq {
			debug!(
				seq = done.seq,
				current = self.run_seq,
				"session.stale_completion_discarded"
			);
			return;
		}

		self.runs_completed += 1;
		self.last_outcome = done.outcome;
		self.apply_view();
		debug!(seq = done.seq, "session.run_done");

		match self.state {
			// Results apply in completion order: the queued follow-up only
			// starts after this result reached the panel.
			RunState::RunningWithPendingUpdate => self.start_run(),
			_ => self.finish_idle(),
		}
	}

	fn finish_idle(&mut self) {
		self.state = RunState::Idle;
		self.busy_deadline = None;
		if self.busy_shown {
			self.busy_shown = false;
			self.surface.set_busy(false);
		}
		self.publish_status();
	}

	fn show_busy(&mut self) {
		self.busy_deadline = None;
		if self.state != RunState::Idle && !self.busy_shown {
			self.busy_shown = true;
			self.surface.set_busy(true);
		}
	}

	fn set_options(&mut self, flags: Vec<OptionFlag>) {
		self.options.replace_with(flags);
		info!(
			filter = %self.filter_path.display(),
			args = ?self.options.to_args(),
			"session.options_set"
		);
		// Chips update immediately; the body catches up when the run lands.
		self.apply_view();
		self.note_dirty();
	}

	fn set_input(&mut self, path: PathBuf) {
		let kind = InputKind::from_path(&path);
		let policy_changed = self.options.apply_input_policy(kind);
		info!(
			filter = %self.filter_path.display(),
			input = %path.display(),
			?kind,
			policy_changed,
			"session.input_set"
		);

		// Swapping the guard first drops the old subscription.
		match self.host.watch_path(&path, self.watch_tx.clone()) {
			Ok(guard) => self.input_watch = Some(guard),
			Err(err) => {
				self.input_watch = None;
				warn!(error = %err, input = %path.display(), "session.input_watch_failed");
			}
		}

		self.input = Some(path);
		self.input_missing = false;
		self.apply_view();
		self.note_dirty();
	}

	fn handle_watch(&mut self, event: WatchEvent) {
		if self.input.as_deref() == Some(event.path.as_path()) {
			match event.kind {
				WatchKind::Removed => {
					warn!(input = %event.path.display(), "session.input_missing");
					self.input_missing = true;
					// Keep the last result visible under the banner; a run
					// against a missing file would only produce noise.
					self.apply_view();
					return;
				}
				WatchKind::Created | WatchKind::Changed => {
					self.input_missing = false;
				}
			}
		}
		self.note_dirty();
	}

	async fn handle_panel(&mut self, event: PanelEvent) -> ControlFlow<()> {
		match event {
			PanelEvent::Closed => {
				info!(filter = %self.filter_path.display(), "session.panel_closed");
				ControlFlow::Break(())
			}
			PanelEvent::Message(value) => {
				match PanelRequest::decode(&value) {
					Some(PanelRequest::SetOptions { flags }) => {
						self.set_options(flags_from_strings(&flags));
					}
					Some(PanelRequest::ChooseInput) => self.pick_input(),
					Some(PanelRequest::OpenOutput) => self.materialize().await,
					None => {}
				}
				ControlFlow::Continue(())
			}
		}
	}

	/// The host picker is modal, so it runs on its own task; the mailbox
	/// keeps draining while the dialog is open, and the choice re-enters as
	/// an ordinary `SetInput`.
	fn pick_input(&self) {
		let host = Arc::clone(&self.host);
		let msg_tx = self.msg_tx.clone();
		tokio::spawn(async move {
			match host.pick_workspace_file().await {
				Ok(Some(path)) => {
					if let Some(tx) = msg_tx.upgrade() {
						let _ = tx.send(SessionMsg::SetInput(path));
					}
				}
				Ok(None) => debug!("session.pick_cancelled"),
				Err(err) => warn!(error = %err, "session.pick_failed"),
			}
		});
	}

	async fn materialize(&mut self) {
		let FilterOutcome::Output { text } = &self.last_outcome else {
			debug!("session.materialize_unavailable");
			return;
		};
		// Raw output is not JSON; leave the new document unassociated.
		let language = (!self.options.contains(OptionFlag::RawOutput)).then_some("json");
		if let Err(err) = self.host.open_untitled(text, language).await {
			warn!(error = %err, "session.materialize_failed");
		}
	}

	fn apply_view(&mut self) {
		let root = self.host.workspace_root();
		let warning = match (&self.input, self.input_missing) {
			(Some(path), true) => Some(format!(
				"Input file {} no longer exists.",
				workspace_relative(root.as_deref(), path)
			)),
			_ => None,
		};
		let view = view(ViewContext {
			outcome: &self.last_outcome,
			options: &self.options,
			input: self.input.as_deref(),
			root: root.as_deref(),
			warning,
		});
		self.surface.apply(&view);
	}

	fn publish_status(&self) {
		self.status_tx.send_modify(|status| {
			status.state = self.state;
			status.runs_completed = self.runs_completed;
		});
	}

	fn teardown(mut self) {
		info!(filter = %self.filter_path.display(), "session.dispose");
		self.input_watch = None;
		self.status_tx.send_modify(|status| status.disposed = true);
		// Dropping the rest unhooks the filter watch and the completion
		// channel; any still-running evaluator task finds the receiver
		// gone and its late result is discarded.
	}
}
