use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::{ConnectionId, NodeId, Vec2, ViewId};
use crate::retrigger::RetriggerConfig;
use crate::tuning::KeyTarget;

/// Sound-emitting orb parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoundParams {
    /// Position within the current scale.
    pub scale_index: i32,
    #[serde(default = "unit_volume")]
    pub volume: f32,
    #[serde(default)]
    pub retrigger: RetriggerConfig,
}

impl SoundParams {
    pub fn new(scale_index: i32) -> Self {
        Self {
            scale_index,
            volume: 1.0,
            retrigger: RetriggerConfig::default(),
        }
    }
}

/// Forwarding fraction of a [`NodeKind::Gate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GateMode {
    #[serde(rename = "1/2")]
    Half,
    #[serde(rename = "1/3")]
    Third,
    #[serde(rename = "1/4")]
    Quarter,
    #[serde(rename = "2/3")]
    TwoThirds,
    #[serde(rename = "3/4")]
    ThreeQuarters,
    #[serde(rename = "rand")]
    Random,
}

/// How an autonomous source decides when to fire, and what it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceStyle {
    /// Fires on its interval; external arrivals pass through like a relay.
    Pulsar,
    /// Fires on its interval; external arrivals toggle it on and off.
    Toggle,
    /// Fires at unpredictable times governed by the global density.
    Random,
    /// Launches a free-flying projectile instead of pulsing its connections.
    Launcher,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceParams {
    pub style: SourceStyle,
    /// Free-running interval in seconds.
    #[serde(default = "default_interval")]
    pub interval: f64,
    /// Index into the transport subdivision table, used while synced.
    #[serde(default = "default_subdivision")]
    pub subdivision: usize,
    /// Keep free-running timing even while the transport is synced.
    #[serde(default)]
    pub ignore_global_sync: bool,
    #[serde(default = "unit_volume")]
    pub intensity: f32,
    #[serde(default)]
    pub randomize_intensity: bool,
    /// `None` lets the waves travel without a hop limit.
    #[serde(default)]
    pub max_hops: Option<u32>,
    #[serde(default)]
    pub color: Option<[u8; 3]>,
    /// Launch direction in radians for [`SourceStyle::Launcher`].
    #[serde(default)]
    pub launch_angle: f32,
}

impl SourceParams {
    pub fn pulsar(interval: f64) -> Self {
        Self {
            style: SourceStyle::Pulsar,
            interval,
            subdivision: default_subdivision(),
            ignore_global_sync: false,
            intensity: 1.0,
            randomize_intensity: false,
            max_hops: None,
            color: None,
            launch_angle: 0.0,
        }
    }

    pub fn with_style(mut self, style: SourceStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_subdivision(mut self, subdivision: usize) -> Self {
        self.subdivision = subdivision;
        self
    }

    pub fn with_max_hops(mut self, max_hops: u32) -> Self {
        self.max_hops = Some(max_hops);
        self
    }
}

/// Tagged node variants. Each carries only its own parameters and state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeKind {
    Sound(SoundParams),
    /// Ambient drone. Terminal: it lights up but never passes pulses on.
    Drone { scale_index: i32 },
    Gate {
        mode: GateMode,
        #[serde(default)]
        counter: u32,
    },
    ProbabilityGate { probability: f32 },
    PitchShift {
        steps: i32,
        #[serde(default)]
        alternate: bool,
        #[serde(default)]
        inverted: bool,
    },
    Relay,
    Reflector,
    Switch {
        #[serde(default)]
        latched: Option<ConnectionId>,
    },
    Source(SourceParams),
    KeySetter { target: KeyTarget },
    PortalSend {
        #[serde(default)]
        receiver: Option<NodeId>,
        #[serde(default)]
        view: Option<ViewId>,
    },
    PortalReceive,
}

impl NodeKind {
    pub fn gate(mode: GateMode) -> Self {
        Self::Gate { mode, counter: 0 }
    }

    pub fn sound(scale_index: i32) -> Self {
        Self::Sound(SoundParams::new(scale_index))
    }

    pub fn is_drone(&self) -> bool {
        matches!(self, Self::Drone { .. })
    }

    pub fn is_source(&self) -> bool {
        matches!(self, Self::Source(_))
    }

    /// Scale position for kinds that have a pitch.
    pub fn scale_index(&self) -> Option<i32> {
        match self {
            Self::Sound(params) => Some(params.scale_index),
            Self::Drone { scale_index } => Some(*scale_index),
            _ => None,
        }
    }

    pub fn scale_index_mut(&mut self) -> Option<&mut i32> {
        match self {
            Self::Sound(params) => Some(&mut params.scale_index),
            Self::Drone { scale_index } => Some(scale_index),
            _ => None,
        }
    }

}

/// Timing state of an autonomous source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceClock {
    pub last_fire_time: Option<f64>,
    pub next_sync_fire_time: Option<f64>,
    /// Interval the sync boundary was computed with.
    pub sync_interval: Option<f64>,
    pub next_random_fire_time: Option<f64>,
}

impl SourceClock {
    /// Restarts free-running timing at `now` and drops every cached boundary.
    pub fn reset(&mut self, now: f64) {
        *self = Self {
            last_fire_time: Some(now),
            ..Self::default()
        };
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    pub position: Vec2,
    /// Graph page the node lives on.
    pub view: ViewId,
    pub enabled: bool,
    pub clock: SourceClock,
    /// Visual activation level, decays every tick.
    pub glow: f32,
    pub(super) neighbors: BTreeSet<NodeId>,
    pub(super) links: BTreeSet<ConnectionId>,
}

impl Node {
    pub(super) fn new(id: NodeId, kind: NodeKind, position: Vec2, view: ViewId) -> Self {
        Self {
            id,
            kind,
            position,
            view,
            enabled: true,
            clock: SourceClock::default(),
            glow: 0.0,
            neighbors: BTreeSet::new(),
            links: BTreeSet::new(),
        }
    }

    /// Adjacent node ids in ascending order.
    pub fn neighbors(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.neighbors.iter().copied()
    }

    /// Ids of every connection touching this node.
    pub fn links(&self) -> impl Iterator<Item = ConnectionId> + '_ {
        self.links.iter().copied()
    }
}

fn unit_volume() -> f32 {
    1.0
}

fn default_interval() -> f64 {
    1.0
}

fn default_subdivision() -> usize {
    crate::transport::DEFAULT_SUBDIVISION
}
