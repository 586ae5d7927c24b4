use serde::{Deserialize, Serialize};

use super::{ConnectionId, NodeId, Vec2};

/// One side of a connection: a node plus an optional handle offset from its
/// centre.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Endpoint {
    pub node: NodeId,
    #[serde(default)]
    pub handle: Option<Vec2>,
}

impl Endpoint {
    pub fn new(node: NodeId) -> Self {
        Self { node, handle: None }
    }
}

/// Behavioural flavour of a connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConnectionKind {
    Plain,
    /// Bowed string that sounds whenever a pulse departs across it.
    String { scale_index: i32, volume: f32 },
    /// Sound nodes reached over a glide slide from the sender's pitch.
    Glide { duration: f32 },
    /// Physically simulated rope. Never carries pulses.
    Rope,
    /// Sampled waveform trail that plays its sample as pulses depart.
    Wavetrail { volume: f32 },
    OneWay,
}

impl ConnectionKind {
    /// Whether the connection produces sound when traversed.
    pub fn is_audible(&self) -> bool {
        matches!(self, Self::String { .. } | Self::Wavetrail { .. })
    }
}

/// Extra options accepted when creating a connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectOptions {
    pub directional: bool,
    pub curvature: f32,
    pub from_handle: Option<Vec2>,
    pub to_handle: Option<Vec2>,
}

impl ConnectOptions {
    pub fn directional() -> Self {
        Self {
            directional: true,
            ..Self::default()
        }
    }

    pub fn with_curvature(mut self, curvature: f32) -> Self {
        self.curvature = curvature;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Connection {
    pub id: ConnectionId,
    pub from: Endpoint,
    pub to: Endpoint,
    pub kind: ConnectionKind,
    pub directional: bool,
    /// Perpendicular offset of the curve's control point from the chord midpoint.
    pub curvature: f32,
    /// Length as of the last refresh. Use [`super::Graph::connection_length`]
    /// for a value derived from live positions.
    pub length: f32,
}

impl Connection {
    /// Returns the endpoint opposite `node`, if `node` is an endpoint at all.
    pub fn other_end(&self, node: NodeId) -> Option<NodeId> {
        if self.from.node == node {
            Some(self.to.node)
        } else if self.to.node == node {
            Some(self.from.node)
        } else {
            None
        }
    }

    pub fn touches(&self, node: NodeId) -> bool {
        self.from.node == node || self.to.node == node
    }

    pub fn is_one_way(&self) -> bool {
        self.directional || matches!(self.kind, ConnectionKind::OneWay)
    }

    /// Whether a pulse may travel from `origin` to `target` over this connection.
    pub fn allows(&self, origin: NodeId, target: NodeId) -> bool {
        if self.is_one_way() {
            self.from.node == origin && self.to.node == target
        } else {
            self.other_end(origin) == Some(target)
        }
    }
}

const CURVE_SEGMENTS: usize = 16;

/// Length of the (possibly curved) path between two points.
pub(crate) fn path_length(a: Vec2, b: Vec2, curvature: f32) -> f32 {
    let chord = b - a;
    if curvature.abs() <= f32::EPSILON || chord.length() <= f32::EPSILON {
        return chord.length();
    }

    let control = path_control(a, b, curvature);
    let mut length = 0.0;
    let mut previous = a;
    for step in 1..=CURVE_SEGMENTS {
        let t = step as f32 / CURVE_SEGMENTS as f32;
        let point = quadratic_point(a, control, b, t);
        length += (point - previous).length();
        previous = point;
    }
    length
}

/// Point at parameter `t` in [0, 1] along the connection path.
pub(crate) fn path_point(a: Vec2, b: Vec2, curvature: f32, t: f32) -> Vec2 {
    if curvature.abs() <= f32::EPSILON {
        return a + (b - a) * t;
    }
    quadratic_point(a, path_control(a, b, curvature), b, t)
}

fn path_control(a: Vec2, b: Vec2, curvature: f32) -> Vec2 {
    let chord = b - a;
    let midpoint = a + chord * 0.5;
    let normal = Vec2::new(-chord.y, chord.x).normalized();
    midpoint + normal * curvature
}

fn quadratic_point(a: Vec2, control: Vec2, b: Vec2, t: f32) -> Vec2 {
    let u = 1.0 - t;
    a * (u * u) + control * (2.0 * u * t) + b * (t * t)
}
