//! The simulation context: graph, time base and every piece of runtime state
//! the scheduler needs, passed around explicitly instead of living in globals.

mod propagation;

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::audio::{AudioBinding, NullAudio};
use crate::config::EngineConfig;
use crate::graph::{
    ConnectOptions, Connection, ConnectionId, ConnectionKind, Graph, Node, NodeId, NodeKind, Vec2,
    ViewId,
};
use crate::projectile::Projectile;
use crate::pulse::{WaveGuard, WaveId};
use crate::record::Recorder;
use crate::render::{NullVisual, VisualLayer};
use crate::retrigger::Sequencer;
use crate::timeline::{PlaybackClock, ScheduledAction, ScheduledEvent, Scheduler, TIME_EPSILON};
use crate::transport::TransportState;
use crate::tuning::Tuning;
use crate::{OrbError, Result};

pub struct World {
    pub(crate) config: EngineConfig,
    pub(crate) graph: Graph,
    pub(crate) transport: TransportState,
    pub(crate) tuning: Tuning,
    pub(crate) clock: PlaybackClock,
    pub(crate) scheduler: Scheduler,
    pub(crate) guard: WaveGuard,
    pub(crate) sequencer: Sequencer,
    pub(crate) projectiles: Vec<Projectile>,
    pub(crate) rng: StdRng,
    pub(crate) audio: Box<dyn AudioBinding>,
    pub(crate) visual: Box<dyn VisualLayer>,
    active_view: ViewId,
    next_wave: u64,
    tick_origin: f64,
    tick_count: u64,
}

impl World {
    /// Creates a world whose collaborators discard everything.
    pub fn new(config: EngineConfig) -> Self {
        Self::with_bindings(config, Box::new(NullAudio), Box::new(NullVisual))
    }

    pub fn with_bindings(
        config: EngineConfig,
        audio: Box<dyn AudioBinding>,
        visual: Box<dyn VisualLayer>,
    ) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            transport: TransportState::from_config(&config.transport),
            guard: WaveGuard::new(config.wave_memory),
            config,
            graph: Graph::new(),
            tuning: Tuning::default(),
            clock: PlaybackClock::default(),
            scheduler: Scheduler::new(),
            sequencer: Sequencer::new(),
            projectiles: Vec::new(),
            rng,
            audio,
            visual,
            active_view: 0,
            next_wave: 1,
            tick_origin: 0.0,
            tick_count: 0,
        }
    }

    /// Routes both audio and visual calls into `recorder`.
    pub fn with_recorder(config: EngineConfig, recorder: &Recorder) -> Self {
        Self::with_bindings(config, Box::new(recorder.clone()), Box::new(recorder.clone()))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn transport(&self) -> &TransportState {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut TransportState {
        &mut self.transport
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    pub fn tuning_mut(&mut self) -> &mut Tuning {
        &mut self.tuning
    }

    /// Current simulation time in seconds.
    pub fn now(&self) -> f64 {
        self.clock.time_seconds
    }

    pub fn active_view(&self) -> ViewId {
        self.active_view
    }

    pub(crate) fn set_active_view(&mut self, view: ViewId, at: f64) {
        self.active_view = view;
        self.visual.view_switched(at, view);
    }

    /// Number of scheduled continuations still waiting to fire.
    pub fn pending_events(&self) -> usize {
        self.scheduler.len()
    }

    pub fn projectiles(&self) -> &[Projectile] {
        &self.projectiles
    }

    /// Visible step index of the node's retrigger sequence.
    pub fn retrigger_step(&self, node: NodeId) -> Option<usize> {
        self.sequencer.current_step(node)
    }

    /// Allocates a wave id no other wave has used.
    pub fn next_wave_id(&mut self) -> WaveId {
        let wave = WaveId(self.next_wave);
        self.next_wave += 1;
        wave
    }

    /// Most recent wave that reached the node.
    pub fn last_wave(&self, node: NodeId) -> Option<WaveId> {
        self.guard.last_seen(node)
    }

    // --- graph editing -------------------------------------------------

    pub fn add_node(&mut self, kind: NodeKind, position: Vec2) -> NodeId {
        self.add_node_in_view(kind, position, self.active_view)
    }

    /// Adds a node. Sources start their free-running clock now.
    pub fn add_node_in_view(&mut self, kind: NodeKind, position: Vec2, view: ViewId) -> NodeId {
        let now = self.now();
        let id = self.graph.add_node_in_view(kind, position, view);
        if let Some(node) = self.graph.node_mut(id) {
            node.clock.reset(now);
        }
        tracing::trace!(node = %id, "node added");
        id
    }

    /// Removes a node, its connections and its pending retrigger steps. Pulses
    /// already heading for it are left to find it gone.
    pub fn remove_node(&mut self, id: NodeId) -> Option<(Node, Vec<Connection>)> {
        let removed = self.graph.remove_node(id)?;
        let cancelled = self.sequencer.cancel(id, &mut self.scheduler);
        self.guard.forget(id);
        tracing::debug!(
            node = %id,
            connections = removed.1.len(),
            cancelled_steps = cancelled,
            "node removed"
        );
        Some(removed)
    }

    pub fn move_node(&mut self, id: NodeId, position: Vec2) -> Result<()> {
        self.graph.move_node(id, position)
    }

    pub fn connect(
        &mut self,
        from: NodeId,
        to: NodeId,
        kind: ConnectionKind,
    ) -> Result<ConnectionId> {
        self.graph.connect(from, to, kind)
    }

    pub fn connect_with(
        &mut self,
        from: NodeId,
        to: NodeId,
        kind: ConnectionKind,
        options: ConnectOptions,
    ) -> Result<ConnectionId> {
        self.graph.connect_with(from, to, kind, options)
    }

    pub fn disconnect(&mut self, id: ConnectionId) -> Result<Connection> {
        self.graph
            .disconnect(id)
            .ok_or(OrbError::UnknownConnection(id))
    }

    /// Replaces a node's configuration. Source timing restarts, and a switch
    /// configured with no latch accepts a new one.
    pub fn configure_node(&mut self, id: NodeId, kind: NodeKind) -> Result<()> {
        let now = self.now();
        let node = self.graph.node_mut(id).ok_or(OrbError::UnknownNode(id))?;
        node.kind = kind;
        node.clock.reset(now);
        Ok(())
    }

    /// Clears a switch's latched input.
    pub fn reset_switch(&mut self, id: NodeId) -> Result<()> {
        let node = self.graph.node_mut(id).ok_or(OrbError::UnknownNode(id))?;
        if let NodeKind::Switch { latched } = &mut node.kind {
            *latched = None;
        }
        Ok(())
    }

    pub fn set_enabled(&mut self, id: NodeId, enabled: bool) -> Result<()> {
        let now = self.now();
        let node = self.graph.node_mut(id).ok_or(OrbError::UnknownNode(id))?;
        if node.enabled != enabled {
            node.enabled = enabled;
            node.clock.reset(now);
        }
        Ok(())
    }

    // --- time ----------------------------------------------------------

    /// Time of the next simulation tick.
    pub fn next_tick_time(&self) -> f64 {
        self.tick_origin + (self.tick_count + 1) as f64 * self.config.tick_seconds()
    }

    /// Advances one fixed-rate tick: sources, projectiles, due continuations,
    /// then glow decay.
    pub fn tick(&mut self) {
        let now = self.next_tick_time();
        self.tick_count += 1;
        let delta = (now - self.clock.time_seconds).max(0.0);
        self.clock.advance_to(now);

        self.evaluate_sources(now);
        self.step_projectiles(delta, now);
        self.drain_due(now);
        self.decay_glow(delta as f32);
    }

    /// Ticks until the next tick would pass `end`.
    pub fn run_until(&mut self, end: f64) {
        while self.next_tick_time() <= end + TIME_EPSILON {
            self.tick();
        }
    }

    /// Fires every pending continuation in time order, moving the clock along
    /// with them, without evaluating sources. Stops after
    /// `max_events_per_tick` events. Returns how many fired.
    pub fn settle(&mut self) -> usize {
        let budget = self.config.max_events_per_tick;
        let mut fired = 0;
        while fired < budget {
            let Some(event) = self.scheduler.pop_next() else {
                break;
            };
            self.clock.advance_to(event.time_seconds);
            self.fire(event);
            fired += 1;
        }
        if fired == budget && !self.scheduler.is_empty() {
            tracing::warn!(pending = self.scheduler.len(), "settle stopped at event budget");
        }
        self.tick_origin = self.clock.time_seconds;
        self.tick_count = 0;
        fired
    }

    fn drain_due(&mut self, now: f64) {
        let budget = self.config.max_events_per_tick;
        let mut fired = 0;
        while fired < budget {
            let Some(event) = self.scheduler.pop_due(now) else {
                return;
            };
            self.fire(event);
            fired += 1;
        }
        if self.scheduler.next_time().is_some_and(|next| next <= now) {
            tracing::warn!(
                budget,
                pending = self.scheduler.len(),
                "tick event budget exhausted, deferring the rest"
            );
        }
    }

    fn fire(&mut self, event: ScheduledEvent) {
        let at = event.time_seconds;
        match event.action {
            ScheduledAction::Arrive(arrival) => self.arrive(arrival, at),
            ScheduledAction::RetriggerStep(step) => {
                self.fire_retrigger_step(event.handle, step, at)
            }
        }
    }

    fn decay_glow(&mut self, delta: f32) {
        let fade = self.config.glow_decay_per_second * delta;
        for id in self.graph.node_ids() {
            if let Some(node) = self.graph.node_mut(id) {
                node.glow = (node.glow - fade).max(0.0);
            }
        }
    }
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("now", &self.clock.time_seconds)
            .field("nodes", &self.graph.node_count())
            .field("connections", &self.graph.connection_count())
            .field("pending", &self.scheduler.len())
            .field("projectiles", &self.projectiles.len())
            .field("active_view", &self.active_view)
            .finish()
    }
}

#[cfg(test)]
mod tests;
