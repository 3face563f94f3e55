//! The sequencer actor.
//!
//! All mutation happens inside one task draining an mpsc inbox, so stage
//! transitions never race. Timers are delayed messages into the same inbox,
//! tagged with an epoch counter; any transition that invalidates outstanding
//! timers bumps the epoch and stale firings are dropped on arrival.

use std::collections::VecDeque;
use std::time::Duration;

use serde_json::json;
use tokio::sync::{mpsc, watch};
use tracing::debug;

use attache_models::AgentCard;

use crate::error::{Result, SequencerError};
use crate::state::{
    default_step_payload, ConsoleEntry, SequencerState, StepEvent, EDGE_MAP, FINAL_STEP,
    STEP_LABELS,
};

/// Delay before stage 1 begins after a start.
pub const SETTLE_DELAY: Duration = Duration::from_millis(800);
/// Delay before the stage 2 card reveal starts.
pub const CARD_LEAD: Duration = Duration::from_millis(800);
/// Time spent reading each manifest card.
pub const CARD_READ: Duration = Duration::from_millis(1200);
/// Pause between completing one stage and beginning the next.
pub const ADVANCE_PAUSE: Duration = Duration::from_millis(300);
/// How long an open gate waits for real backend data before self-advancing.
pub const FALLBACK_DELAY: Duration = Duration::from_secs(3);

#[derive(Debug)]
enum TimerFire {
    BeginStage(u8),
    CardRead(usize),
    Fallback,
}

#[derive(Debug)]
enum Command {
    Start,
    Replay,
    ExternalEvent(StepEvent),
    CompleteStage(Option<StepEvent>),
    SetManifest {
        cards: Vec<AgentCard>,
        shortlist: Vec<usize>,
    },
    Timer {
        epoch: u64,
        fire: TimerFire,
    },
}

/// Cheap cloneable handle to a running [`Sequencer`].
#[derive(Clone)]
pub struct SequencerHandle {
    tx: mpsc::UnboundedSender<Command>,
    state_rx: watch::Receiver<SequencerState>,
}

impl SequencerHandle {
    pub fn start(&self) -> Result<()> {
        self.send(Command::Start)
    }

    pub fn replay(&self) -> Result<()> {
        self.send(Command::Replay)
    }

    pub fn external_event(&self, event: StepEvent) -> Result<()> {
        self.send(Command::ExternalEvent(event))
    }

    pub fn complete_stage(&self, data: Option<StepEvent>) -> Result<()> {
        self.send(Command::CompleteStage(data))
    }

    /// Installs real manifest data. Takes effect for the next card reveal.
    pub fn set_manifest(&self, cards: Vec<AgentCard>, shortlist: Vec<usize>) -> Result<()> {
        self.send(Command::SetManifest { cards, shortlist })
    }

    /// Watch channel for renderers; holds the latest published frame.
    pub fn watch(&self) -> watch::Receiver<SequencerState> {
        self.state_rx.clone()
    }

    /// The most recently published frame.
    pub fn snapshot(&self) -> SequencerState {
        self.state_rx.borrow().clone()
    }

    fn send(&self, command: Command) -> Result<()> {
        self.tx.send(command).map_err(|_| SequencerError::Closed)
    }
}

/// Drives the five-stage orchestration animation.
pub struct Sequencer {
    rx: mpsc::UnboundedReceiver<Command>,
    tx: mpsc::UnboundedSender<Command>,
    state_tx: watch::Sender<SequencerState>,
    state: SequencerState,
    epoch: u64,
    gate_open: bool,
    stage_done: bool,
    pending: VecDeque<StepEvent>,
    shortlist: Vec<usize>,
}

impl Sequencer {
    pub fn new() -> (Self, SequencerHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let state = SequencerState::default();
        let (state_tx, state_rx) = watch::channel(state.clone());
        let handle = SequencerHandle {
            tx: tx.clone(),
            state_rx,
        };
        let actor = Self {
            rx,
            tx,
            state_tx,
            state,
            epoch: 0,
            gate_open: false,
            stage_done: false,
            pending: VecDeque::new(),
            shortlist: attache_models::default_shortlist(),
        };
        (actor, handle)
    }

    /// Runs until every handle has been dropped.
    pub async fn run(mut self) {
        while let Some(command) = self.rx.recv().await {
            self.handle(command);
        }
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Start => self.start(),
            Command::Replay => self.replay(),
            Command::ExternalEvent(event) => self.external_event(event),
            Command::CompleteStage(data) => {
                if self.state.is_running && self.gate_open && !self.stage_done {
                    self.complete_stage(data);
                }
            }
            Command::SetManifest { cards, shortlist } => {
                self.state.manifest = cards;
                self.shortlist = shortlist;
                self.publish();
            }
            Command::Timer { epoch, fire } => {
                if epoch != self.epoch {
                    debug!(?fire, "dropping stale timer");
                    return;
                }
                match fire {
                    TimerFire::BeginStage(step) => self.advance_to(step),
                    TimerFire::CardRead(index) => self.read_card(index),
                    TimerFire::Fallback => {
                        if self.gate_open && !self.stage_done {
                            self.complete_stage(self.fallback_completion());
                        }
                    }
                }
            }
        }
    }

    /// Begins a fresh run. Queued events and installed manifest data survive
    /// so an event that triggered the start is not lost.
    fn start(&mut self) {
        self.epoch += 1;
        let manifest = std::mem::take(&mut self.state.manifest);
        self.state = SequencerState {
            is_running: true,
            manifest,
            ..SequencerState::default()
        };
        self.gate_open = false;
        self.stage_done = false;
        self.arm(SETTLE_DELAY, TimerFire::BeginStage(1));
        self.publish();
    }

    /// Cancels everything and returns to the idle frame.
    fn replay(&mut self) {
        self.epoch += 1;
        self.pending.clear();
        let manifest = std::mem::take(&mut self.state.manifest);
        self.state = SequencerState {
            manifest,
            ..SequencerState::default()
        };
        self.gate_open = false;
        self.stage_done = false;
        self.publish();
    }

    fn external_event(&mut self, event: StepEvent) {
        if self.state.is_complete {
            return;
        }
        if !self.state.is_running {
            self.pending.push_back(event);
            self.start();
            return;
        }

        let current = self.state.current_step;
        if event.step < current || (event.step == current && self.stage_done) {
            debug!(step = event.step, current, "dropping past-step event");
            return;
        }
        if event.step == current && self.gate_open {
            self.complete_stage(Some(event));
            return;
        }
        self.pending.push_back(event);
    }

    fn advance_to(&mut self, step: u8) {
        self.epoch += 1;

        if step > FINAL_STEP {
            self.state.is_running = false;
            self.state.is_complete = true;
            self.state.active_edge = None;
            self.publish();
            return;
        }

        self.state.current_step = step;
        self.state.active_edge = EDGE_MAP[step as usize].map(str::to_string);
        self.stage_done = false;
        self.push_entry(
            STEP_LABELS[step as usize],
            default_step_payload(step, &self.state.manifest, &self.shortlist),
        );

        if step == 2 {
            // Card reveal runs before this stage's gate opens.
            self.gate_open = false;
            self.arm(CARD_LEAD, TimerFire::CardRead(0));
        } else {
            self.open_gate();
        }
        self.publish();
    }

    fn read_card(&mut self, index: usize) {
        if let Some(card) = self.state.manifest.get(index).cloned() {
            self.state.card_reading_index = Some(index);
            self.state.card_flipped_indices.push(index);
            self.push_entry(
                format!("Reading: {}", card.name),
                json!({
                    "agent": card.name,
                    "provider": card.provider,
                    "capabilities": card.capabilities,
                    "score": card.score,
                }),
            );
            self.arm(CARD_READ, TimerFire::CardRead(index + 1));
        } else {
            self.state.card_reading_index = None;
            self.state.shortlist_phase = true;
            self.state.shortlisted_indices = self.shortlist.clone();
            let shortlisted: Vec<_> = self
                .shortlist
                .iter()
                .filter_map(|&i| self.state.manifest.get(i))
                .map(|card| json!({ "agent": card.name, "score": card.score }))
                .collect();
            let rejected: Vec<_> = self
                .state
                .manifest
                .iter()
                .enumerate()
                .filter(|(i, _)| !self.shortlist.contains(i))
                .map(|(_, card)| card.name.clone())
                .collect();
            self.push_entry(
                "Shortlist processing",
                json!({ "shortlisted": shortlisted, "rejected": rejected }),
            );
            self.open_gate();
        }
        self.publish();
    }

    /// Applies the first queued event for the current stage, or arms the
    /// fallback so a quiet backend never stalls the run.
    fn open_gate(&mut self) {
        self.gate_open = true;
        let current = self.state.current_step;
        if let Some(pos) = self.pending.iter().position(|e| e.step == current) {
            let event = self.pending.remove(pos);
            self.complete_stage(event);
            return;
        }
        self.arm(FALLBACK_DELAY, TimerFire::Fallback);
    }

    fn complete_stage(&mut self, data: Option<StepEvent>) {
        self.stage_done = true;
        self.gate_open = false;
        if let Some(event) = data {
            self.push_entry(event.label, event.payload);
        }
        self.epoch += 1;
        let next = self.state.current_step + 1;
        self.arm(ADVANCE_PAUSE, TimerFire::BeginStage(next));
        self.publish();
    }

    /// Synthetic completion used when the fallback fires. Stage 2 reports
    /// the shortlist it just animated; other stages advance silently.
    fn fallback_completion(&self) -> Option<StepEvent> {
        if self.state.current_step != 2 {
            return None;
        }
        let shortlisted: Vec<_> = self
            .state
            .manifest
            .iter()
            .take(5)
            .map(|card| json!({ "name": card.name, "score": card.score }))
            .collect();
        Some(StepEvent {
            step: 2,
            label: STEP_LABELS[2].to_string(),
            payload: json!({ "status": "manifest_scanned", "shortlisted": shortlisted }),
        })
    }

    fn arm(&self, delay: Duration, fire: TimerFire) {
        let tx = self.tx.clone();
        let epoch = self.epoch;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(Command::Timer { epoch, fire });
        });
    }

    fn push_entry(&mut self, label: impl Into<String>, payload: serde_json::Value) {
        self.state.console_entries.push(ConsoleEntry::new(label, payload));
    }

    fn publish(&self) {
        let _ = self.state_tx.send(self.state.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spawn() -> SequencerHandle {
        let (actor, handle) = Sequencer::new();
        tokio::spawn(actor.run());
        handle
    }

    async fn settle(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    fn step_event(step: u8, label: &str) -> StepEvent {
        StepEvent {
            step,
            label: label.to_string(),
            payload: json!({ "from": "backend" }),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_run_via_fallbacks() {
        let handle = spawn();
        handle.start().unwrap();

        // Six default cards at 1.2 s each plus five 3 s fallbacks and the
        // inter-stage pauses finish comfortably inside 30 s.
        settle(30_000).await;

        let state = handle.snapshot();
        assert!(state.is_complete);
        assert!(!state.is_running);
        assert_eq!(state.current_step, 5);
        assert_eq!(state.active_edge, None);
        assert!(state.shortlist_phase);
        assert_eq!(state.card_flipped_indices, vec![0, 1, 2, 3, 4, 5]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stage_one_waits_for_gate() {
        let handle = spawn();
        handle.start().unwrap();
        settle(1_000).await;

        let state = handle.snapshot();
        assert_eq!(state.current_step, 1);
        assert!(state.is_running);
        assert_eq!(state.active_edge.as_deref(), Some("local-search"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_external_event_completes_open_stage() {
        let handle = spawn();
        handle.start().unwrap();
        settle(1_000).await;

        handle
            .external_event(step_event(1, "Local Agent → Search Engine"))
            .unwrap();
        settle(400).await;

        let state = handle.snapshot();
        assert_eq!(state.current_step, 2);
        assert_eq!(
            state.console_entries[1].payload,
            json!({ "from": "backend" })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_start_on_first_external_event() {
        let handle = spawn();
        handle
            .external_event(step_event(1, "Local Agent → Search Engine"))
            .unwrap();
        settle(100).await;
        assert!(handle.snapshot().is_running);

        // The triggering event survives the start and completes stage 1.
        settle(1_200).await;
        assert_eq!(handle.snapshot().current_step, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_future_step_events_applied_in_order() {
        let handle = spawn();
        handle.start().unwrap();
        settle(1_000).await;

        // Events for stages 4 and 5 arrive while stage 1 is active.
        handle.external_event(step_event(4, "req")).unwrap();
        handle.external_event(step_event(5, "reply")).unwrap();
        settle(60_000).await;

        let state = handle.snapshot();
        assert!(state.is_complete);
        let labels: Vec<&str> = state
            .console_entries
            .iter()
            .map(|e| e.label.as_str())
            .collect();
        let req = labels.iter().position(|l| *l == "req").unwrap();
        let reply = labels.iter().position(|l| *l == "reply").unwrap();
        assert!(req < reply);
    }

    #[tokio::test(start_paused = true)]
    async fn test_past_step_event_dropped() {
        let handle = spawn();
        handle.start().unwrap();
        // Run past stage 1 via its fallback.
        settle(4_500).await;
        assert_eq!(handle.snapshot().current_step, 2);
        let entries_before = handle.snapshot().console_entries.len();

        handle.external_event(step_event(1, "late")).unwrap();
        settle(100).await;

        let state = handle.snapshot();
        assert!(!state.console_entries.iter().any(|e| e.label == "late"));
        assert_eq!(state.console_entries.len(), entries_before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stage_two_gate_waits_for_shortlist() {
        let handle = spawn();
        handle.start().unwrap();
        settle(1_000).await;
        handle.external_event(step_event(1, "s1")).unwrap();
        // Land in stage 2 and immediately offer its completion event.
        settle(400).await;
        assert_eq!(handle.snapshot().current_step, 2);
        handle.external_event(step_event(2, "s2")).unwrap();

        // Mid card reveal the event must still be queued.
        settle(3_000).await;
        let state = handle.snapshot();
        assert_eq!(state.current_step, 2);
        assert!(!state.shortlist_phase);
        assert!(!state.console_entries.iter().any(|e| e.label == "s2"));

        // Once the reveal and shortlist finish, the queued event applies.
        settle(8_000).await;
        let state = handle.snapshot();
        assert!(state.console_entries.iter().any(|e| e.label == "s2"));
        assert_eq!(state.current_step, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_installed_manifest_drives_card_reveal() {
        let handle = spawn();
        let cards = vec![
            AgentCard::new("FlightTravelAgent", "AgentNetwork", vec![], "flights", 0.9),
            AgentCard::new("SmartLegalAgent", "AgentNetwork", vec![], "legal", 0.7),
        ];
        handle.set_manifest(cards, vec![0, 1]).unwrap();
        handle.start().unwrap();

        settle(1_000).await;
        handle.external_event(step_event(1, "s1")).unwrap();
        settle(5_000).await;

        let state = handle.snapshot();
        assert_eq!(state.card_flipped_indices, vec![0, 1]);
        assert!(state
            .console_entries
            .iter()
            .any(|e| e.label == "Reading: FlightTravelAgent"));
        assert!(state
            .console_entries
            .iter()
            .any(|e| e.label == "Reading: SmartLegalAgent"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_replay_resets_and_cancels_timers() {
        let handle = spawn();
        handle.start().unwrap();
        settle(1_000).await;
        handle.replay().unwrap();
        settle(50).await;

        let state = handle.snapshot();
        assert!(!state.is_running);
        assert_eq!(state.current_step, 0);
        assert!(state.console_entries.is_empty());

        // Timers armed before the replay must not resurrect the run.
        settle(60_000).await;
        let state = handle.snapshot();
        assert!(!state.is_running);
        assert!(!state.is_complete);
        assert_eq!(state.current_step, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_events_after_complete_are_ignored() {
        let handle = spawn();
        handle.start().unwrap();
        settle(60_000).await;
        assert!(handle.snapshot().is_complete);

        handle.external_event(step_event(1, "again")).unwrap();
        settle(5_000).await;

        let state = handle.snapshot();
        assert!(state.is_complete);
        assert!(!state.console_entries.iter().any(|e| e.label == "again"));
    }
}
