//! Per-node-kind reaction to an arriving pulse.
//!
//! [`dispatch`] only touches the node's own state (gate counters, switch
//! latches, alternating pitch direction) and describes everything else as an
//! [`Effect`] for the world to carry out. That keeps each node contract
//! testable without a running world.

use rand::Rng;

use crate::graph::{GateMode, Node, NodeId, NodeKind, SourceStyle, ViewId};
use crate::pulse::{Arrival, HopBudget, PulseEnvelope};
use crate::tuning::KeyTarget;

/// Lower bound of randomized source intensity.
pub const RANDOM_INTENSITY_MIN: f32 = 0.3;

/// Envelope and budget handed to the next hops.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Forward {
    pub envelope: PulseEnvelope,
    pub hops: HopBudget,
}

impl Forward {
    /// Passes the wave on unchanged, without spending budget.
    pub fn pass(arrival: &Arrival) -> Self {
        Self {
            envelope: arrival.envelope,
            hops: arrival.hops,
        }
    }

    /// Passes the wave on and spends one hop of budget.
    pub fn consume(arrival: &Arrival) -> Self {
        Self {
            envelope: arrival.envelope,
            hops: arrival.hops.consume(),
        }
    }
}

/// What the world must do after a node has reacted.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// The pulse stops here.
    Absorb,
    Forward(Forward),
    /// Sound the node now, then forward.
    Play(Forward),
    /// Hand the activation to the retrigger sequencer. No fan-out.
    Sequence,
    /// Move every pitched neighbour by `steps`, then forward.
    ShiftPitch { steps: i32, forward: Forward },
    /// Apply a key change, then forward.
    ApplyKey { target: KeyTarget, forward: Forward },
    /// Send a fresh wave back over the incoming connection. No fan-out.
    Reflect,
    /// Flip the node's enabled flag and restart its timing.
    ToggleSource,
    /// Switch the active view and re-enter on the receiver with a fresh wave.
    Teleport {
        receiver: Option<NodeId>,
        view: Option<ViewId>,
    },
}

impl Effect {
    /// Onward envelope, for effects that continue the wave.
    pub fn forward(&self) -> Option<&Forward> {
        match self {
            Self::Forward(forward)
            | Self::Play(forward)
            | Self::ShiftPitch { forward, .. }
            | Self::ApplyKey { forward, .. } => Some(forward),
            _ => None,
        }
    }
}

/// Reacts to `arrival` at `node`. The wave guard has already admitted it.
pub fn dispatch<R: Rng>(node: &mut Node, arrival: &Arrival, rng: &mut R) -> Effect {
    if !node.enabled && !node.kind.is_source() {
        return Effect::Absorb;
    }

    match &mut node.kind {
        NodeKind::Sound(params) => {
            if params.retrigger.is_active() {
                Effect::Sequence
            } else {
                Effect::Play(Forward::consume(arrival))
            }
        }
        NodeKind::Drone { .. } => Effect::Absorb,
        NodeKind::Gate { mode, counter } => {
            *counter = counter.wrapping_add(1);
            if gate_passes(*mode, *counter, rng) {
                Effect::Forward(Forward::pass(arrival))
            } else {
                Effect::Absorb
            }
        }
        NodeKind::ProbabilityGate { probability } => {
            if rng.gen::<f32>() < probability.clamp(0.0, 1.0) {
                Effect::Forward(Forward::pass(arrival))
            } else {
                Effect::Absorb
            }
        }
        NodeKind::PitchShift {
            steps,
            alternate,
            inverted,
        } => {
            let applied = if *inverted { -*steps } else { *steps };
            if *alternate {
                *inverted = !*inverted;
            }
            Effect::ShiftPitch {
                steps: applied,
                forward: Forward::pass(arrival),
            }
        }
        NodeKind::Relay | NodeKind::PortalReceive => Effect::Forward(Forward::consume(arrival)),
        NodeKind::Reflector => Effect::Reflect,
        NodeKind::Switch { latched } => match (*latched, arrival.via) {
            (None, Some(via)) => {
                *latched = Some(via);
                Effect::Forward(Forward::pass(arrival))
            }
            (None, None) => Effect::Forward(Forward::pass(arrival)),
            (Some(latch), Some(via)) if latch == via => Effect::Forward(Forward::pass(arrival)),
            _ => Effect::Absorb,
        },
        NodeKind::Source(params) => {
            if params.style == SourceStyle::Toggle {
                return Effect::ToggleSource;
            }
            let intensity = if params.randomize_intensity || params.style == SourceStyle::Random {
                rng.gen_range(RANDOM_INTENSITY_MIN..=1.0)
            } else {
                params.intensity
            };
            let mut forward = Forward::consume(arrival);
            forward.envelope.intensity = intensity;
            if params.color.is_some() {
                forward.envelope.color = params.color;
            }
            Effect::Forward(forward)
        }
        NodeKind::KeySetter { target } => Effect::ApplyKey {
            target: *target,
            forward: Forward::pass(arrival),
        },
        NodeKind::PortalSend { receiver, view } => Effect::Teleport {
            receiver: *receiver,
            view: *view,
        },
    }
}

/// Whether a gate forwards its `count`-th arrival (counted from 1).
pub fn gate_passes<R: Rng>(mode: GateMode, count: u32, rng: &mut R) -> bool {
    match mode {
        GateMode::Half => count % 2 == 0,
        GateMode::Third => count % 3 == 0,
        GateMode::Quarter => count % 4 == 0,
        GateMode::TwoThirds => count % 3 != 0,
        GateMode::ThreeQuarters => count % 4 != 0,
        GateMode::Random => rng.gen_bool(0.5),
    }
}
