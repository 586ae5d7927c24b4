//! Graph store: nodes, connections and adjacency bookkeeping.

mod arena;
mod connection;
mod node;

use std::fmt;
use std::ops::{Add, Mul, Sub};

use serde::{Deserialize, Serialize};

pub use arena::{Arena, ArenaId};
pub use connection::{ConnectOptions, Connection, ConnectionKind, Endpoint};
pub(crate) use connection::{path_length, path_point};
pub use node::{GateMode, Node, NodeKind, SoundParams, SourceClock, SourceParams, SourceStyle};

use crate::{OrbError, Result};

macro_rules! arena_id {
    ($name:ident, $prefix:literal) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl ArenaId for $name {
            fn from_raw(raw: u64) -> Self {
                Self(raw)
            }

            fn raw(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

arena_id!(NodeId, "n");
arena_id!(ConnectionId, "c");

/// Identifier of a graph page. Portals move the active view between pages.
pub type ViewId = u32;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn distance(self, other: Vec2) -> f32 {
        (other - self).length()
    }

    pub fn dot(self, other: Vec2) -> f32 {
        self.x * other.x + self.y * other.y
    }

    pub fn normalized(self) -> Vec2 {
        let length = self.length();
        if length <= f32::EPSILON {
            Vec2::default()
        } else {
            self * (1.0 / length)
        }
    }
}

impl Add for Vec2 {
    type Output = Vec2;

    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vec2 {
    type Output = Vec2;

    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;

    fn mul(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

/// Node and connection storage with adjacency kept in sync on every edit.
#[derive(Debug, Default)]
pub struct Graph {
    nodes: Arena<NodeId, Node>,
    connections: Arena<ConnectionId, Connection>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, kind: NodeKind, position: Vec2) -> NodeId {
        self.add_node_in_view(kind, position, 0)
    }

    pub fn add_node_in_view(&mut self, kind: NodeKind, position: Vec2, view: ViewId) -> NodeId {
        self.nodes
            .insert_with(|id| Node::new(id, kind, position, view))
    }

    /// Removes a node after detaching and removing every connection touching it.
    /// Returns the node together with the connections that went with it.
    pub fn remove_node(&mut self, id: NodeId) -> Option<(Node, Vec<Connection>)> {
        let links: Vec<ConnectionId> = self.nodes.get(id)?.links().collect();
        let removed = links
            .into_iter()
            .filter_map(|link| self.disconnect(link))
            .collect();
        let node = self.nodes.remove(id)?;
        Some((node, removed))
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    /// Live node ids in creation order.
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.ids()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn move_node(&mut self, id: NodeId, position: Vec2) -> Result<()> {
        let node = self.nodes.get_mut(id).ok_or(OrbError::UnknownNode(id))?;
        node.position = position;
        Ok(())
    }

    pub fn connect(
        &mut self,
        from: NodeId,
        to: NodeId,
        kind: ConnectionKind,
    ) -> Result<ConnectionId> {
        self.connect_with(from, to, kind, ConnectOptions::default())
    }

    pub fn connect_with(
        &mut self,
        from: NodeId,
        to: NodeId,
        kind: ConnectionKind,
        options: ConnectOptions,
    ) -> Result<ConnectionId> {
        if from == to {
            return Err(OrbError::SelfConnection(from));
        }
        for endpoint in [from, to] {
            if !self.nodes.contains(endpoint) {
                return Err(OrbError::UnknownNode(endpoint));
            }
        }

        let id = self.connections.insert_with(|id| Connection {
            id,
            from: Endpoint {
                node: from,
                handle: options.from_handle,
            },
            to: Endpoint {
                node: to,
                handle: options.to_handle,
            },
            kind,
            directional: options.directional,
            curvature: options.curvature,
            length: 0.0,
        });

        for (node, other) in [(from, to), (to, from)] {
            if let Some(node) = self.nodes.get_mut(node) {
                node.neighbors.insert(other);
                node.links.insert(id);
            }
        }
        self.refresh_length(id);
        Ok(id)
    }

    /// Removes a connection. Adjacency between its endpoints survives while
    /// another connection still joins them.
    pub fn disconnect(&mut self, id: ConnectionId) -> Option<Connection> {
        let connection = self.connections.remove(id)?;
        let (a, b) = (connection.from.node, connection.to.node);
        let still_joined = !self.connections_between(a, b).is_empty();

        for (node, other) in [(a, b), (b, a)] {
            if let Some(node) = self.nodes.get_mut(node) {
                node.links.remove(&id);
                if !still_joined {
                    node.neighbors.remove(&other);
                }
            }
        }
        Some(connection)
    }

    pub fn connection(&self, id: ConnectionId) -> Option<&Connection> {
        self.connections.get(id)
    }

    pub fn connection_mut(&mut self, id: ConnectionId) -> Option<&mut Connection> {
        self.connections.get_mut(id)
    }

    pub fn connection_ids(&self) -> Vec<ConnectionId> {
        self.connections.ids()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Every connection joining `a` and `b`, in creation order.
    pub fn connections_between(&self, a: NodeId, b: NodeId) -> Vec<ConnectionId> {
        let Some(node) = self.nodes.get(a) else {
            return Vec::new();
        };
        node.links()
            .filter(|link| {
                self.connections
                    .get(*link)
                    .map(|connection| connection.other_end(a) == Some(b))
                    .unwrap_or(false)
            })
            .collect()
    }

    pub fn connection_between(&self, a: NodeId, b: NodeId) -> Option<ConnectionId> {
        self.connections_between(a, b).into_iter().next()
    }

    pub fn neighbors(&self, id: NodeId) -> Vec<NodeId> {
        self.nodes
            .get(id)
            .map(|node| node.neighbors().collect())
            .unwrap_or_default()
    }

    /// World-space point of an endpoint, including its handle offset.
    pub fn endpoint_position(&self, endpoint: &Endpoint) -> Option<Vec2> {
        let node = self.nodes.get(endpoint.node)?;
        Some(node.position + endpoint.handle.unwrap_or_default())
    }

    /// Length derived from the current endpoint positions. The cached
    /// `Connection::length` is updated as a side effect.
    pub fn connection_length(&mut self, id: ConnectionId) -> Option<f32> {
        self.refresh_length(id)
    }

    fn refresh_length(&mut self, id: ConnectionId) -> Option<f32> {
        let (a, b, curvature) = self.connection_points(id)?;
        let length = path_length(a, b, curvature);
        if let Some(connection) = self.connections.get_mut(id) {
            connection.length = length;
        }
        Some(length)
    }

    /// Start point, end point and curvature of a connection.
    pub(crate) fn connection_points(&self, id: ConnectionId) -> Option<(Vec2, Vec2, f32)> {
        let connection = self.connections.get(id)?;
        let a = self.endpoint_position(&connection.from)?;
        let b = self.endpoint_position(&connection.to)?;
        Some((a, b, connection.curvature))
    }
}
