use serde::{Deserialize, Serialize};

use crate::graph::{ConnectionId, NodeId};
use crate::pulse::{PulseEnvelope, WaveId};

/// What is asked to sound: an orb, or a string/trail connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmitTarget {
    Node(NodeId),
    Connection(ConnectionId),
}

/// Pitch slide requested when a pulse arrives over a glide connection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Glide {
    pub from_note: u8,
    pub duration: f32,
}

/// A request to produce sound right now.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Emission {
    pub time_seconds: f64,
    pub target: EmitTarget,
    pub wave: Option<WaveId>,
    /// Resolved MIDI note, for pitched targets.
    pub note: Option<u8>,
    pub volume: f32,
    pub envelope: PulseEnvelope,
    /// Filter cutoff bias in [-1, 1]; zero leaves the patch untouched.
    pub filter_bias: f32,
    pub glide: Option<Glide>,
    /// Retrigger step index, when the emission belongs to a sequence.
    pub step: Option<usize>,
}

impl Emission {
    pub fn node(&self) -> Option<NodeId> {
        match self.target {
            EmitTarget::Node(node) => Some(node),
            EmitTarget::Connection(_) => None,
        }
    }
}

/// Synthesis collaborator. The engine only ever asks it to emit immediately.
pub trait AudioBinding {
    fn emit(&mut self, emission: &Emission);
}

/// Binding that discards every request.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAudio;

impl AudioBinding for NullAudio {
    fn emit(&mut self, _emission: &Emission) {}
}
