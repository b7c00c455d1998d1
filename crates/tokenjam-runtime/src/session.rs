//! The session actor and its handle.
//!
//! One task owns all puzzle state and processes events one at a time from a
//! single queue. Transports, the evaluator, and operators only ever talk to
//! it through [`SessionHandle`]; nothing else reads or writes the state.

use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use tokenjam_core::{
    Assignment, Catalog, ClearDetector, ControlCommand, PlayerView, PositionUpdate,
    SessionSnapshot, SubscriberId, Token, expression, is_reading_order,
};
use tokenjam_settings::Settings;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::errors::{Result, SessionError};
use crate::evaluator::{Candidate, Evaluator};
use crate::interpreter::Interpreter;
use crate::registry::Registry;

/// Evaluator output shown before the first result of each puzzle.
pub const NO_OUTPUT: &str = "<n/a>";

/// Runtime parameters for one session.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// How long the solved layout must persist.
    pub clear_hold: Duration,
    /// Period of the level-clear re-check.
    pub clear_check_interval: Duration,
    /// Idle time after which a holder is stale.
    pub stale_after: Duration,
    /// Period of the stale-holder sweep.
    pub stale_sweep_interval: Duration,
    /// Whether stale holders lose their token to a spectator.
    pub reassign_stale: bool,
    /// Per-subscriber outbound queue capacity.
    pub send_queue_capacity: usize,
    /// Actor event queue capacity.
    pub event_queue_capacity: usize,
    /// Evaluator polling period.
    pub eval_tick: Duration,
    /// Per-evaluation timeout.
    pub eval_timeout: Duration,
    /// Prefix of the echoed expression in evaluator output.
    pub prompt: String,
}

impl SessionConfig {
    /// Derive the session parameters from loaded settings.
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            clear_hold: settings.session.clear_hold(),
            clear_check_interval: settings.session.clear_check_interval(),
            stale_after: settings.session.stale_after(),
            stale_sweep_interval: settings.session.stale_sweep_interval(),
            reassign_stale: settings.session.reassign_stale,
            send_queue_capacity: settings.server.send_queue_capacity,
            event_queue_capacity: settings.server.event_queue_capacity,
            eval_tick: settings.evaluator.tick(),
            eval_timeout: settings.evaluator.timeout(),
            prompt: settings.evaluator.prompt.clone(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

/// A registered subscriber's end of the fan-out.
#[derive(Debug)]
pub struct Subscription {
    /// Identity assigned by the session.
    pub id: SubscriberId,
    /// Outbound snapshots, newest last. Frames may be skipped.
    pub updates: mpsc::Receiver<PlayerView>,
    /// Fire to have the session drop this subscriber on its next broadcast.
    pub stop: CancellationToken,
}

/// Consistent read of the session state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    /// Current puzzle index.
    pub puzzle_id: usize,
    /// Number of puzzles in the catalog.
    pub puzzle_count: usize,
    /// Whether position updates are accepted.
    pub started: bool,
    /// Whether the current puzzle is cleared.
    pub level_clear: bool,
    /// Connected subscribers.
    pub subscribers: usize,
    /// Subscribers holding a token.
    pub occupants: usize,
    /// Current arranged expression.
    pub expression: String,
    /// Snapshots dropped on full outbound queues.
    pub dropped_snapshots: u64,
}

#[derive(Debug)]
pub(crate) enum SessionEvent {
    Control(ControlCommand),
    Position {
        subscriber: SubscriberId,
        update: PositionUpdate,
    },
    Subscribe {
        reply: oneshot::Sender<Subscription>,
    },
    Unsubscribe(SubscriberId),
    EvalResult {
        generation: u64,
        output: String,
    },
    Status {
        reply: oneshot::Sender<SessionStatus>,
    },
}

/// Cloneable sender side of the session's event queue.
#[derive(Clone, Debug)]
pub struct SessionHandle {
    events: mpsc::Sender<SessionEvent>,
}

impl SessionHandle {
    /// Deliver an operator command.
    pub async fn control(&self, command: ControlCommand) -> Result<()> {
        self.send(SessionEvent::Control(command)).await
    }

    /// Register a new subscriber.
    pub async fn subscribe(&self) -> Result<Subscription> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionEvent::Subscribe { reply }).await?;
        rx.await.map_err(|_| SessionError::Closed)
    }

    /// Forward a position update without waiting for queue space.
    ///
    /// Updates are best-effort; a full queue drops this one.
    pub fn update_position(&self, subscriber: SubscriberId, update: PositionUpdate) -> Result<()> {
        match self.events.try_send(SessionEvent::Position { subscriber, update }) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                warn!(subscriber_id = %subscriber, "session event queue full, dropping update");
                Err(SessionError::Busy)
            }
            Err(TrySendError::Closed(_)) => Err(SessionError::Closed),
        }
    }

    /// Remove a subscriber; a token it held is redistributed.
    pub async fn unsubscribe(&self, subscriber: SubscriberId) -> Result<()> {
        self.send(SessionEvent::Unsubscribe(subscriber)).await
    }

    /// Read the current state.
    pub async fn status(&self) -> Result<SessionStatus> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionEvent::Status { reply }).await?;
        rx.await.map_err(|_| SessionError::Closed)
    }

    async fn send(&self, event: SessionEvent) -> Result<()> {
        self.events.send(event).await.map_err(|_| SessionError::Closed)
    }
}

/// Entry point for starting a session.
pub struct Session;

impl Session {
    /// Spawn the actor and its evaluator.
    ///
    /// Both tasks stop when `cancel` fires; their handles are returned for
    /// shutdown coordination, actor first.
    pub fn spawn(
        catalog: Catalog,
        config: SessionConfig,
        interpreter: Arc<dyn Interpreter>,
        cancel: CancellationToken,
    ) -> (SessionHandle, Vec<JoinHandle<()>>) {
        Self::spawn_with_rng(catalog, config, interpreter, cancel, StdRng::from_os_rng())
    }

    /// [`Session::spawn`] with a caller-provided random source.
    pub fn spawn_with_rng(
        catalog: Catalog,
        config: SessionConfig,
        interpreter: Arc<dyn Interpreter>,
        cancel: CancellationToken,
        rng: StdRng,
    ) -> (SessionHandle, Vec<JoinHandle<()>>) {
        let (events_tx, events_rx) = mpsc::channel(config.event_queue_capacity.max(1));
        let (trigger_tx, trigger_rx) = mpsc::channel(1);
        let (candidates_tx, candidates_rx) = watch::channel(Candidate::default());

        let evaluator = Evaluator {
            interpreter,
            tick: config.eval_tick,
            timeout: config.eval_timeout,
            prompt: config.prompt.clone(),
        }
        .spawn(candidates_rx, events_tx.clone(), cancel.clone());

        let actor = SessionActor::new(catalog, config, rng, candidates_tx, trigger_tx);
        let actor = tokio::spawn(actor.run(events_rx, trigger_rx, cancel));

        (SessionHandle { events: events_tx }, vec![actor, evaluator])
    }
}

struct SessionActor {
    catalog: Catalog,
    config: SessionConfig,
    puzzle_index: usize,
    generation: u64,
    tokens: Vec<Token>,
    started: bool,
    clear: ClearDetector,
    eval_output: String,
    assignment: Assignment,
    registry: Registry,
    next_subscriber: u64,
    rng: StdRng,
    candidates: watch::Sender<Candidate>,
    trigger: mpsc::Sender<()>,
}

fn now() -> Instant {
    tokio::time::Instant::now().into_std()
}

impl SessionActor {
    fn new(
        catalog: Catalog,
        config: SessionConfig,
        rng: StdRng,
        candidates: watch::Sender<Candidate>,
        trigger: mpsc::Sender<()>,
    ) -> Self {
        let tokens = catalog.get(0).map(|p| p.tokens.clone()).unwrap_or_default();
        Self {
            assignment: Assignment::new(tokens.len()),
            clear: ClearDetector::new(config.clear_hold),
            catalog,
            config,
            puzzle_index: 0,
            generation: 0,
            tokens,
            started: false,
            eval_output: NO_OUTPUT.to_string(),
            registry: Registry::default(),
            next_subscriber: 1,
            rng,
            candidates,
            trigger,
        }
    }

    async fn run(
        mut self,
        mut events: mpsc::Receiver<SessionEvent>,
        mut trigger: mpsc::Receiver<()>,
        cancel: CancellationToken,
    ) {
        let mut clear_tick = tokio::time::interval(self.config.clear_check_interval);
        clear_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut stale_tick = tokio::time::interval(self.config.stale_sweep_interval);
        stale_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(puzzles = self.catalog.len(), "session started");
        self.publish_candidate();

        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                event = events.recv() => match event {
                    Some(event) => self.handle(event),
                    None => break,
                },
                Some(()) = trigger.recv() => self.broadcast(),
                _ = clear_tick.tick() => self.check_clear(now()),
                _ = stale_tick.tick() => self.sweep_stale(now()),
            }
        }
        info!("session stopped");
    }

    fn handle(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Control(command) => self.control(command),
            SessionEvent::Position { subscriber, update } => self.position(subscriber, update),
            SessionEvent::Subscribe { reply } => self.subscribe(reply),
            SessionEvent::Unsubscribe(id) => self.depart(id),
            SessionEvent::EvalResult { generation, output } => {
                if generation == self.generation {
                    self.eval_output = output;
                    self.mark_dirty();
                } else {
                    debug!(generation, current = self.generation, "discarding stale evaluation");
                }
            }
            SessionEvent::Status { reply } => {
                let _ = reply.send(self.status());
            }
        }
    }

    fn control(&mut self, command: ControlCommand) {
        match command {
            ControlCommand::Start => {
                self.started = true;
                let rebound = self.assignment.reassign(&mut self.rng);
                info!(puzzle_id = self.puzzle_index, rebound = rebound.len(), "session started accepting moves");
                self.mark_dirty();
            }
            ControlCommand::Stop => {
                self.started = false;
                info!(puzzle_id = self.puzzle_index, "session stopped accepting moves");
                self.mark_dirty();
            }
            ControlCommand::Next => {
                if self.puzzle_index < self.catalog.last_index() {
                    self.load_puzzle(self.puzzle_index + 1);
                } else {
                    debug!(puzzle_id = self.puzzle_index, "already at last puzzle");
                }
            }
            ControlCommand::Prev => {
                if self.puzzle_index > 0 {
                    self.load_puzzle(self.puzzle_index - 1);
                } else {
                    debug!("already at first puzzle");
                }
            }
            ControlCommand::Unknown(raw) => {
                warn!(command = %raw, "ignoring unknown control command");
            }
        }
    }

    fn load_puzzle(&mut self, index: usize) {
        let Some(puzzle) = self.catalog.get(index) else {
            return;
        };
        self.puzzle_index = index;
        self.generation += 1;
        self.tokens = puzzle.tokens.clone();
        self.started = false;
        self.clear.reset();
        self.eval_output = NO_OUTPUT.to_string();
        self.assignment.reset(self.tokens.len());
        let _ = self.assignment.reassign(&mut self.rng);
        info!(puzzle_id = index, goal = %puzzle.goal, "puzzle changed");
        self.publish_candidate();
        self.mark_dirty();
    }

    fn position(&mut self, subscriber: SubscriberId, update: PositionUpdate) {
        let now = now();
        self.registry.touch(subscriber, now);

        let current = i64::try_from(self.puzzle_index).ok() == Some(update.puzzle_id);
        let token = self.assignment.token_of(subscriber);
        let Some(index) = token.filter(|_| self.started && !self.clear.is_clear() && current)
        else {
            debug!(
                subscriber_id = %subscriber,
                puzzle_id = update.puzzle_id,
                started = self.started,
                assigned = token.is_some(),
                "dropping position update"
            );
            return;
        };

        self.tokens[index].move_to(update.x, update.y);
        self.publish_candidate();
        self.check_clear(now);
        self.mark_dirty();
    }

    fn subscribe(&mut self, reply: oneshot::Sender<Subscription>) {
        let id = SubscriberId::from_raw(self.next_subscriber);
        self.next_subscriber += 1;

        let (tx, updates) = mpsc::channel(self.config.send_queue_capacity.max(1));
        let stop = CancellationToken::new();
        self.registry.register(id, tx, stop.clone(), now());
        let token = self.assignment.join(id, &mut self.rng);
        if self.started {
            let _ = self.assignment.reassign(&mut self.rng);
        }
        info!(subscriber_id = %id, token = ?token, "subscriber joined");
        self.mark_dirty();

        if reply.send(Subscription { id, updates, stop }).is_err() {
            self.depart(id);
        }
    }

    fn depart(&mut self, id: SubscriberId) {
        let registered = self.registry.remove(id);
        let departure = self.assignment.leave(id, &mut self.rng);
        if registered || departure.freed.is_some() {
            info!(
                subscriber_id = %id,
                freed = ?departure.freed,
                rebound = departure.rebound.len(),
                "subscriber left"
            );
            self.mark_dirty();
        }
    }

    fn check_clear(&mut self, now: Instant) {
        if self.clear.observe(is_reading_order(&self.tokens), now) {
            info!(puzzle_id = self.puzzle_index, "level cleared");
            self.mark_dirty();
        }
    }

    fn sweep_stale(&mut self, now: Instant) {
        if !self.config.reassign_stale {
            return;
        }
        let stale: Vec<SubscriberId> = self
            .registry
            .idle(now, self.config.stale_after)
            .into_iter()
            .filter(|id| self.assignment.token_of(*id).is_some())
            .collect();
        if stale.is_empty() {
            return;
        }
        let handovers = self.assignment.hand_over_stale(&stale, &mut self.rng);
        for h in &handovers {
            // The new holder gets a full window before it can be swept.
            self.registry.touch(h.to, now);
            info!(from = %h.from, to = %h.to, token = h.token, "reassigned idle token");
        }
        if !handovers.is_empty() {
            self.mark_dirty();
        }
    }

    fn publish_candidate(&self) {
        let _ = self.candidates.send_replace(Candidate {
            generation: self.generation,
            puzzle_id: self.puzzle_index,
            expression: expression(&self.tokens),
        });
    }

    fn mark_dirty(&self) {
        // One slot: a pending broadcast already covers this change.
        let _ = self.trigger.try_send(());
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            puzzle_goal: self
                .catalog
                .get(self.puzzle_index)
                .map(|p| p.goal.clone())
                .unwrap_or_default(),
            eval_output: self.eval_output.clone(),
            tokens: self.tokens.clone(),
            puzzle_id: self.puzzle_index as i64,
            occupant_count: self.assignment.occupant_count(),
            spectator_count: self.assignment.spectator_count(),
            started: self.started,
            level_clear: self.clear.is_clear(),
        }
    }

    fn broadcast(&mut self) {
        let snapshot = Arc::new(self.snapshot());
        let departed = self.registry.broadcast(&snapshot, &self.assignment);
        for id in &departed {
            let departure = self.assignment.leave(*id, &mut self.rng);
            info!(subscriber_id = %id, freed = ?departure.freed, "subscriber dropped");
        }
        if !departed.is_empty() {
            self.mark_dirty();
        }
    }

    fn status(&self) -> SessionStatus {
        SessionStatus {
            puzzle_id: self.puzzle_index,
            puzzle_count: self.catalog.len(),
            started: self.started,
            level_clear: self.clear.is_clear(),
            subscribers: self.registry.len(),
            occupants: self.assignment.occupant_count(),
            expression: expression(&self.tokens),
            dropped_snapshots: self.registry.dropped(),
        }
    }
}
