use crate::graph::{ConnectionId, NodeId};

/// Result alias that carries the custom [`OrbError`] type.
pub type Result<T> = std::result::Result<T, OrbError>;

/// Common error type for the core crate.
///
/// Only the editing and loading surface returns errors. Pulse propagation never
/// does: a hop that can no longer be resolved is simply dropped.
#[derive(Debug, thiserror::Error)]
pub enum OrbError {
    /// Free-form failure message.
    #[error("{0}")]
    Message(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("invalid engine config: {0}")]
    Config(#[from] toml::de::Error),
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unknown node {0}")]
    UnknownNode(NodeId),
    #[error("unknown connection {0}")]
    UnknownConnection(ConnectionId),
    #[error("node {0} cannot be connected to itself")]
    SelfConnection(NodeId),
    #[error("invalid scenario: {0}")]
    InvalidScenario(String),
}

impl OrbError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }
}

impl From<&str> for OrbError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for OrbError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
