//! Core library for Orbweaver.
//!
//! A graph of orb nodes joined by typed connections, and the discrete-event
//! engine that moves pulses across it. Each module owns one subsystem (graph
//! bookkeeping, per-node dispatch, autonomous sources, the retrigger
//! sequencer, the time base) and the [`World`] ties them together. Audio and
//! rendering stay behind the [`AudioBinding`] and [`VisualLayer`] seams so the
//! engine runs headless.

pub mod audio;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod graph;
pub mod projectile;
pub mod pulse;
pub mod record;
pub mod render;
pub mod retrigger;
pub mod scene;
pub mod sources;
pub mod timeline;
pub mod transport;
pub mod tuning;
pub mod world;

pub use audio::{AudioBinding, EmitTarget, Emission, Glide, NullAudio};
pub use config::{EngineConfig, ProjectileConfig, TransportConfig};
pub use dispatch::{dispatch, Effect, Forward};
pub use error::{OrbError, Result};
pub use graph::{
    ConnectOptions, Connection, ConnectionId, ConnectionKind, GateMode, Graph, Node, NodeId,
    NodeKind, SoundParams, SourceParams, SourceStyle, Vec2, ViewId,
};
pub use projectile::{Impact, Projectile};
pub use pulse::{Arrival, HopBudget, PulseEnvelope, WaveGuard, WaveId};
pub use record::{Recorder, RecordingSettings, TraceEvent};
pub use render::{HopNotice, NullVisual, VisualLayer};
pub use retrigger::{RateMode, RetriggerConfig, RetriggerStep, StepTiming};
pub use scene::{ConnectionSpec, NodeSpec, ScenarioDescriptor, TriggerSpec};
pub use timeline::{EventHandle, PlaybackClock, ScheduledEvent, Scheduler};
pub use transport::{Subdivision, TransportState};
pub use tuning::{KeyTarget, Scale, Tuning};
pub use world::World;
