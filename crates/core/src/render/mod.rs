use serde::{Deserialize, Serialize};

use crate::graph::{ConnectionId, NodeId, Vec2, ViewId};
use crate::pulse::{HopBudget, PulseEnvelope, WaveId};

/// Animation request for one pulse crossing one connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HopNotice {
    pub time_seconds: f64,
    pub connection: ConnectionId,
    pub origin: NodeId,
    pub target: NodeId,
    pub travel_time: f64,
    pub hops_left: HopBudget,
    pub envelope: PulseEnvelope,
    pub wave: WaveId,
}

/// Rendering collaborator. Calls are animation-only and have no logical effect.
pub trait VisualLayer {
    fn notify_hop(&mut self, hop: &HopNotice);

    fn node_activated(&mut self, _time_seconds: f64, _node: NodeId, _envelope: &PulseEnvelope) {}

    fn retrigger_step(&mut self, _time_seconds: f64, _node: NodeId, _step: usize, _muted: bool) {}

    fn view_switched(&mut self, _time_seconds: f64, _view: ViewId) {}

    fn projectile_launched(&mut self, _time_seconds: f64, _origin: NodeId, _position: Vec2) {}
}

/// Layer that draws nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullVisual;

impl VisualLayer for NullVisual {
    fn notify_hop(&mut self, _hop: &HopNotice) {}
}
