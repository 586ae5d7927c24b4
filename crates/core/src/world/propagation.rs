use std::collections::BTreeSet;

use super::World;
use crate::audio::{EmitTarget, Emission, Glide};
use crate::dispatch::{dispatch, Effect, Forward};
use crate::graph::{ConnectionId, ConnectionKind, NodeId, NodeKind, ViewId};
use crate::pulse::{Arrival, HopBudget, PulseEnvelope, WaveId};
use crate::render::HopNotice;
use crate::timeline::ScheduledAction;

impl World {
    /// Sends a pulse of `wave` to `target`, arriving `delay` seconds from now.
    ///
    /// This is the entry point for everything that injects waves: click
    /// triggers, scanners, projectile impacts, portals. Drone targets light up
    /// immediately and are never scheduled. A target that is gone by the time
    /// the pulse lands is skipped silently.
    #[allow(clippy::too_many_arguments)]
    pub fn propagate(
        &mut self,
        target: NodeId,
        delay: f64,
        wave: WaveId,
        source: Option<NodeId>,
        hops: HopBudget,
        envelope: PulseEnvelope,
        via: Option<ConnectionId>,
    ) {
        let now = self.now();
        self.propagate_at(
            now,
            Arrival {
                target,
                wave,
                source,
                hops,
                envelope,
                via,
            },
            delay,
        );
    }

    /// Starts a fresh, unbounded wave at `target` right now.
    pub fn inject(&mut self, target: NodeId, envelope: PulseEnvelope) -> WaveId {
        let wave = self.next_wave_id();
        self.propagate(target, 0.0, wave, None, HopBudget::Unbounded, envelope, None);
        wave
    }

    pub(crate) fn propagate_at(&mut self, at: f64, arrival: Arrival, delay: f64) {
        let Some(node) = self.graph.node_mut(arrival.target) else {
            tracing::debug!(
                node = %arrival.target,
                wave = %arrival.wave,
                "propagate to missing node"
            );
            return;
        };

        if node.kind.is_drone() {
            node.glow = node.glow.max(arrival.envelope.intensity);
            self.visual.node_activated(at, arrival.target, &arrival.envelope);
            return;
        }

        let delay = if delay.is_finite() { delay.max(0.0) } else { 0.0 };
        tracing::trace!(
            node = %arrival.target,
            wave = %arrival.wave,
            hops = %arrival.hops,
            delay,
            "hop scheduled"
        );
        self.scheduler
            .schedule(at + delay, ScheduledAction::Arrive(arrival));
    }

    /// A scheduled pulse lands on its target.
    pub(crate) fn arrive(&mut self, arrival: Arrival, at: f64) {
        if let Some(via) = arrival.via {
            if self.graph.connection(via).is_none() {
                tracing::debug!(
                    connection = %via,
                    wave = %arrival.wave,
                    "pulse lost with its connection"
                );
                return;
            }
        }

        let Some(node) = self.graph.node_mut(arrival.target) else {
            tracing::debug!(node = %arrival.target, wave = %arrival.wave, "pulse target is gone");
            return;
        };
        if !self.guard.visit(node.id, arrival.wave) {
            tracing::trace!(node = %arrival.target, wave = %arrival.wave, "wave already seen");
            return;
        }

        let effect = dispatch(node, &arrival, &mut self.rng);
        if effect != Effect::Absorb {
            node.glow = node.glow.max(arrival.envelope.intensity);
            self.visual.node_activated(at, arrival.target, &arrival.envelope);
        }
        tracing::trace!(node = %arrival.target, wave = %arrival.wave, ?effect, "dispatched");
        self.apply(effect, &arrival, at);
    }

    fn apply(&mut self, effect: Effect, arrival: &Arrival, at: f64) {
        let node = arrival.target;
        match effect {
            Effect::Absorb => {}
            Effect::Forward(forward) => self.continue_wave(node, arrival, forward, at),
            Effect::Play(forward) => {
                self.play_node(node, arrival, at);
                self.continue_wave(node, arrival, forward, at);
            }
            Effect::Sequence => self.start_retrigger(node, arrival, at),
            Effect::ShiftPitch { steps, forward } => {
                self.shift_neighbours(node, steps);
                self.continue_wave(node, arrival, forward, at);
            }
            Effect::ApplyKey { target, forward } => {
                if self.tuning.apply(target) {
                    tracing::debug!(node = %node, ?target, "key changed");
                }
                self.continue_wave(node, arrival, forward, at);
            }
            Effect::Reflect => self.reflect(node, arrival, at),
            Effect::ToggleSource => {
                if let Some(source) = self.graph.node_mut(node) {
                    source.enabled = !source.enabled;
                    source.clock.reset(at);
                    tracing::debug!(node = %node, enabled = source.enabled, "source toggled");
                }
            }
            Effect::Teleport { receiver, view } => self.teleport(receiver, view, arrival, at),
        }
    }

    /// Fans out to the neighbours unless the arrival had no budget left.
    fn continue_wave(&mut self, node: NodeId, arrival: &Arrival, forward: Forward, at: f64) {
        if arrival.hops.is_exhausted() {
            return;
        }
        self.fan_out(node, arrival.source, arrival.wave, forward, at);
    }

    /// Schedules the wave onto every eligible neighbour of `origin` except the
    /// one it came from. Ropes and drones are never fan-out targets.
    pub(crate) fn fan_out(
        &mut self,
        origin: NodeId,
        sender: Option<NodeId>,
        wave: WaveId,
        forward: Forward,
        at: f64,
    ) {
        for neighbour in self.graph.neighbors(origin) {
            if Some(neighbour) == sender {
                continue;
            }
            let Some(connection) = self.travel_connection(origin, neighbour) else {
                continue;
            };
            let is_drone = self
                .graph
                .node(neighbour)
                .map(|node| node.kind.is_drone())
                .unwrap_or(true);
            if is_drone {
                continue;
            }
            self.send_hop(origin, neighbour, connection, wave, forward, at);
        }
    }

    /// Sends one hop across `connection`, using its live length.
    fn send_hop(
        &mut self,
        origin: NodeId,
        target: NodeId,
        connection: ConnectionId,
        wave: WaveId,
        forward: Forward,
        at: f64,
    ) {
        let Some(length) = self.graph.connection_length(connection) else {
            return;
        };
        let travel_time = f64::from(length) * self.config.delay_per_unit;

        self.sound_connection(connection, wave, &forward.envelope, at);
        self.visual.notify_hop(&HopNotice {
            time_seconds: at,
            connection,
            origin,
            target,
            travel_time,
            hops_left: forward.hops,
            envelope: forward.envelope,
            wave,
        });
        self.propagate_at(
            at,
            Arrival {
                target,
                wave,
                source: Some(origin),
                hops: forward.hops,
                envelope: forward.envelope,
                via: Some(connection),
            },
            travel_time,
        );
    }

    /// First connection a pulse may use to travel from `origin` to `target`.
    fn travel_connection(&self, origin: NodeId, target: NodeId) -> Option<ConnectionId> {
        self.graph
            .connections_between(origin, target)
            .into_iter()
            .find(|id| {
                self.graph
                    .connection(*id)
                    .map(|connection| {
                        connection.kind != ConnectionKind::Rope && connection.allows(origin, target)
                    })
                    .unwrap_or(false)
            })
    }

    fn play_node(&mut self, node_id: NodeId, arrival: &Arrival, at: f64) {
        let Some(node) = self.graph.node(node_id) else {
            return;
        };
        let NodeKind::Sound(params) = &node.kind else {
            return;
        };
        let emission = Emission {
            time_seconds: at,
            target: EmitTarget::Node(node_id),
            wave: Some(arrival.wave),
            note: Some(self.tuning.note_for(params.scale_index)),
            volume: params.volume,
            envelope: arrival.envelope,
            filter_bias: 0.0,
            glide: self.glide_for(node_id, arrival),
            step: None,
        };
        tracing::trace!(node = %node_id, wave = %arrival.wave, note = ?emission.note, "emit");
        self.audio.emit(&emission);
    }

    /// Glide hint for a pulse that reached `node` over a glide connection.
    pub(crate) fn glide_for(&self, node: NodeId, arrival: &Arrival) -> Option<Glide> {
        let connection = self.graph.connection(arrival.via?)?;
        let ConnectionKind::Glide { duration } = connection.kind else {
            return None;
        };
        let sender = self.graph.node(connection.other_end(node)?)?;
        Some(Glide {
            from_note: self.tuning.note_for(sender.kind.scale_index()?),
            duration,
        })
    }

    pub(crate) fn sound_connection(
        &mut self,
        id: ConnectionId,
        wave: WaveId,
        envelope: &PulseEnvelope,
        at: f64,
    ) {
        let Some(connection) = self.graph.connection(id) else {
            return;
        };
        let (note, volume) = match connection.kind {
            ConnectionKind::String { scale_index, volume } => {
                (Some(self.tuning.note_for(scale_index)), volume)
            }
            ConnectionKind::Wavetrail { volume } => (None, volume),
            _ => return,
        };
        self.audio.emit(&Emission {
            time_seconds: at,
            target: EmitTarget::Connection(id),
            wave: Some(wave),
            note,
            volume,
            envelope: *envelope,
            filter_bias: 0.0,
            glide: None,
            step: None,
        });
    }

    /// Moves every pitched neighbour node and every string connection touching
    /// `origin` by `steps` scale positions.
    fn shift_neighbours(&mut self, origin: NodeId, steps: i32) {
        let Some(node) = self.graph.node(origin) else {
            return;
        };
        let neighbours: BTreeSet<NodeId> = node.neighbors().collect();
        let links: Vec<ConnectionId> = node.links().collect();

        for neighbour in neighbours {
            if let Some(scale_index) = self
                .graph
                .node_mut(neighbour)
                .and_then(|node| node.kind.scale_index_mut())
            {
                *scale_index = scale_index.saturating_add(steps);
            }
        }
        for link in links {
            if let Some(connection) = self.graph.connection_mut(link) {
                if let ConnectionKind::String { scale_index, .. } = &mut connection.kind {
                    *scale_index = scale_index.saturating_add(steps);
                }
            }
        }
    }

    /// Bounces a fresh wave back across the incoming connection, toward its
    /// far end. Projectile impacts carry no sender, only the connection.
    fn reflect(&mut self, reflector: NodeId, arrival: &Arrival, at: f64) {
        let Some(via) = arrival.via else {
            return;
        };
        let Some(connection) = self.graph.connection(via) else {
            return;
        };
        if connection.kind == ConnectionKind::Rope {
            return;
        }
        let Some(target) = connection.other_end(reflector) else {
            return;
        };
        if let Some(sender) = arrival.source {
            if sender != target {
                tracing::debug!(node = %reflector, %sender, %target, "reflecting past sender");
            }
        }

        let wave = self.next_wave_id();
        tracing::trace!(node = %reflector, incoming = %arrival.wave, outgoing = %wave, "reflect");
        self.send_hop(reflector, target, via, wave, Forward::pass(arrival), at);
    }

    /// Switches the view and re-enters on the receiver with a fresh wave.
    fn teleport(
        &mut self,
        receiver: Option<NodeId>,
        view: Option<ViewId>,
        arrival: &Arrival,
        at: f64,
    ) {
        let receiver_view = receiver
            .and_then(|id| self.graph.node(id))
            .map(|node| node.view);
        if let Some(view) = view.or(receiver_view) {
            self.set_active_view(view, at);
        }

        let Some(receiver) = receiver else {
            return;
        };
        let wave = self.next_wave_id();
        tracing::debug!(from = %arrival.target, to = %receiver, wave = %wave, "teleport");
        self.propagate_at(
            at,
            Arrival {
                target: receiver,
                wave,
                source: None,
                hops: arrival.hops,
                envelope: arrival.envelope,
                via: None,
            },
            0.0,
        );
    }
}
