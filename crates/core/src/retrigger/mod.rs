//! Expands one activation of a sound node into a timed run of steps.

use std::collections::HashMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::audio::{EmitTarget, Emission, Glide};
use crate::graph::{NodeId, NodeKind};
use crate::pulse::{Arrival, PulseEnvelope, WaveId};
use crate::timeline::{EventHandle, ScheduledAction, Scheduler};
use crate::transport::{clamp_interval, TransportState};
use crate::world::World;

const ACCELERATION: f64 = 0.8;
const DECELERATION: f64 = 1.25;

/// Per-step parameters. Each step is independent of the others.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetriggerStep {
    pub volume: f32,
    /// Offset in scale steps from the node's own pitch.
    pub pitch_offset: i32,
    pub filter_bias: f32,
    /// Muted steps advance the step index but stay silent.
    pub muted: bool,
}

impl Default for RetriggerStep {
    fn default() -> Self {
        Self {
            volume: 1.0,
            pitch_offset: 0,
            filter_bias: 0.0,
            muted: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateMode {
    #[default]
    Constant,
    /// Each gap is shorter than the previous one.
    Accelerate,
    /// Each gap is longer than the previous one.
    Decelerate,
    /// Each gap is the base interval scaled by a random factor.
    Random,
}

/// Base spacing between steps.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepTiming {
    Fixed { seconds: f64 },
    Synced { subdivision: usize },
}

impl Default for StepTiming {
    fn default() -> Self {
        Self::Fixed { seconds: 0.125 }
    }
}

impl StepTiming {
    pub fn base_interval(&self, transport: &TransportState, min_interval: f64) -> f64 {
        match *self {
            Self::Fixed { seconds } => clamp_interval(seconds, min_interval),
            Self::Synced { subdivision } => {
                transport.subdivision_seconds(subdivision, min_interval)
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetriggerConfig {
    pub enabled: bool,
    pub steps: Vec<RetriggerStep>,
    pub rate: RateMode,
    pub timing: StepTiming,
}

impl RetriggerConfig {
    /// Enabled sequence of `count` identical steps at a fixed spacing.
    pub fn uniform(count: usize, seconds: f64) -> Self {
        Self {
            enabled: true,
            steps: vec![RetriggerStep::default(); count],
            rate: RateMode::Constant,
            timing: StepTiming::Fixed { seconds },
        }
    }

    pub fn is_active(&self) -> bool {
        self.enabled && !self.steps.is_empty()
    }

    /// Offsets of every step from the start of the sequence. The first is zero.
    pub fn step_offsets<R: Rng>(&self, base: f64, min_interval: f64, rng: &mut R) -> Vec<f64> {
        let mut offsets = Vec::with_capacity(self.steps.len());
        let mut elapsed = 0.0;
        for index in 0..self.steps.len() {
            if index > 0 {
                let gap = match self.rate {
                    RateMode::Constant => base,
                    RateMode::Accelerate => base * ACCELERATION.powi(index as i32 - 1),
                    RateMode::Decelerate => base * DECELERATION.powi(index as i32 - 1),
                    RateMode::Random => base * rng.gen_range(0.5..1.5),
                };
                elapsed += clamp_interval(gap, min_interval);
            }
            offsets.push(elapsed);
        }
        offsets
    }
}

/// A later step of a running sequence, waiting on the timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct StepEvent {
    pub node: NodeId,
    pub step: usize,
    pub wave: WaveId,
    pub envelope: PulseEnvelope,
}

#[derive(Debug, Default)]
struct ActiveSequence {
    pending: Vec<EventHandle>,
    current_step: usize,
}

/// Tracks at most one running sequence per node.
#[derive(Debug, Default)]
pub struct Sequencer {
    active: HashMap<NodeId, ActiveSequence>,
}

impl Sequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancels every not-yet-fired step of the node's sequence. Returns how many
    /// were cancelled.
    pub fn cancel(&mut self, node: NodeId, scheduler: &mut Scheduler) -> usize {
        self.active
            .remove(&node)
            .map(|sequence| {
                sequence
                    .pending
                    .into_iter()
                    .filter(|handle| scheduler.cancel(*handle))
                    .count()
            })
            .unwrap_or(0)
    }

    /// Step index most recently reached by the node's sequence.
    pub fn current_step(&self, node: NodeId) -> Option<usize> {
        self.active.get(&node).map(|sequence| sequence.current_step)
    }

    fn begin(&mut self, node: NodeId, pending: Vec<EventHandle>) {
        self.active.insert(
            node,
            ActiveSequence {
                pending,
                current_step: 0,
            },
        );
    }

    fn advance(&mut self, node: NodeId, step: usize) {
        if let Some(sequence) = self.active.get_mut(&node) {
            sequence.current_step = step;
        }
    }

    fn fired(&mut self, node: NodeId, handle: EventHandle) {
        if let Some(sequence) = self.active.get_mut(&node) {
            sequence.pending.retain(|pending| *pending != handle);
        }
    }
}

impl World {
    /// Starts a sequence on a sound node, replacing any sequence still running.
    pub(crate) fn start_retrigger(&mut self, node_id: NodeId, arrival: &Arrival, at: f64) {
        let cancelled = self.sequencer.cancel(node_id, &mut self.scheduler);
        if cancelled > 0 {
            tracing::trace!(node = %node_id, cancelled, "superseded retrigger sequence");
        }

        let Some(config) = self.graph.node(node_id).and_then(|node| match &node.kind {
            NodeKind::Sound(params) if params.retrigger.is_active() => {
                Some(params.retrigger.clone())
            }
            _ => None,
        }) else {
            return;
        };

        let min_interval = self.config.min_interval;
        let base = config.timing.base_interval(&self.transport, min_interval);
        let offsets = config.step_offsets(base, min_interval, &mut self.rng);

        let pending = offsets
            .iter()
            .enumerate()
            .skip(1)
            .map(|(step, offset)| {
                self.scheduler.schedule(
                    at + offset,
                    ScheduledAction::RetriggerStep(StepEvent {
                        node: node_id,
                        step,
                        wave: arrival.wave,
                        envelope: arrival.envelope,
                    }),
                )
            })
            .collect();
        self.sequencer.begin(node_id, pending);

        let glide = self.glide_for(node_id, arrival);
        self.perform_step(node_id, 0, arrival.wave, &arrival.envelope, glide, at);
    }

    pub(crate) fn fire_retrigger_step(&mut self, handle: EventHandle, event: StepEvent, at: f64) {
        self.sequencer.fired(event.node, handle);
        self.perform_step(event.node, event.step, event.wave, &event.envelope, None, at);
    }

    fn perform_step(
        &mut self,
        node_id: NodeId,
        step_index: usize,
        wave: WaveId,
        envelope: &PulseEnvelope,
        glide: Option<Glide>,
        at: f64,
    ) {
        let Some(node) = self.graph.node(node_id) else {
            tracing::debug!(node = %node_id, step = step_index, "retrigger target is gone");
            return;
        };
        let NodeKind::Sound(params) = &node.kind else {
            return;
        };
        let Some(step) = params.retrigger.steps.get(step_index) else {
            return;
        };

        let scale_index = params.scale_index.saturating_add(step.pitch_offset);
        let emission = (!step.muted).then(|| Emission {
            time_seconds: at,
            target: EmitTarget::Node(node_id),
            wave: Some(wave),
            note: Some(self.tuning.note_for(scale_index)),
            volume: params.volume * step.volume,
            envelope: *envelope,
            filter_bias: step.filter_bias.clamp(-1.0, 1.0),
            glide,
            step: Some(step_index),
        });
        let muted = step.muted;

        self.sequencer.advance(node_id, step_index);
        self.visual.retrigger_step(at, node_id, step_index, muted);
        if let Some(emission) = emission {
            self.audio.emit(&emission);
        }
    }
}
