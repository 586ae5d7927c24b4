use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::TransportConfig;
use crate::graph::{
    ConnectOptions, ConnectionKind, GateMode, NodeId, NodeKind, SourceParams, Vec2, ViewId,
};
use crate::pulse::{HopBudget, PulseEnvelope};
use crate::tuning::Tuning;
use crate::world::World;
use crate::{OrbError, Result};

const DEFAULT_DURATION: f64 = 4.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSpec {
    pub name: String,
    pub kind: NodeKind,
    #[serde(default)]
    pub position: Vec2,
    #[serde(default)]
    pub view: ViewId,
    #[serde(default = "enabled")]
    pub enabled: bool,
    /// Name of the receiver a portal sender teleports to.
    #[serde(default)]
    pub portal_to: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionSpec {
    pub from: String,
    pub to: String,
    #[serde(default = "plain")]
    pub kind: ConnectionKind,
    #[serde(default)]
    pub options: ConnectOptions,
}

/// A one-off manual trigger, as if the node were clicked at `at` seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerSpec {
    pub node: String,
    pub at: f64,
    #[serde(default)]
    pub max_hops: Option<u32>,
}

/// A graph plus its transport and key, loadable from JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioDescriptor {
    pub name: String,
    #[serde(default)]
    pub transport: Option<TransportConfig>,
    #[serde(default)]
    pub tuning: Tuning,
    #[serde(default)]
    pub nodes: Vec<NodeSpec>,
    #[serde(default)]
    pub connections: Vec<ConnectionSpec>,
    #[serde(default)]
    pub triggers: Vec<TriggerSpec>,
    #[serde(default)]
    pub duration: Option<f64>,
}

fn enabled() -> bool {
    true
}

fn plain() -> ConnectionKind {
    ConnectionKind::Plain
}

impl ScenarioDescriptor {
    pub fn from_json_str(source: &str) -> Result<Self> {
        Ok(serde_json::from_str(source)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_json_str(&source)
    }

    /// Seconds to simulate when the caller does not override it.
    pub fn duration(&self) -> f64 {
        self.duration
            .filter(|duration| duration.is_finite() && *duration >= 0.0)
            .unwrap_or(DEFAULT_DURATION)
    }

    /// A 4 Hz pulsar feeding a sound orb through a half gate.
    pub fn gate_demo() -> Self {
        let node = |name: &str, kind: NodeKind, x: f32| NodeSpec {
            name: name.to_string(),
            kind,
            position: Vec2::new(x, 0.0),
            view: 0,
            enabled: true,
            portal_to: None,
        };
        let link = |from: &str, to: &str| ConnectionSpec {
            from: from.to_string(),
            to: to.to_string(),
            kind: ConnectionKind::Plain,
            options: ConnectOptions::default(),
        };
        Self {
            name: "Gate Demo".to_string(),
            transport: None,
            tuning: Tuning::default(),
            nodes: vec![
                node("pulsar", NodeKind::Source(SourceParams::pulsar(0.25)), 0.0),
                node("gate", NodeKind::gate(GateMode::Half), 60.0),
                node("orb", NodeKind::sound(0), 120.0),
            ],
            connections: vec![link("pulsar", "gate"), link("gate", "orb")],
            triggers: Vec::new(),
            duration: Some(2.0),
        }
    }

    /// Populates `world` and returns the id assigned to every node name.
    pub fn build_world(&self, world: &mut World) -> Result<HashMap<String, NodeId>> {
        if let Some(transport) = &self.transport {
            world.transport_mut().set_bpm(transport.bpm);
            world.transport_mut().sync_enabled = transport.sync_enabled;
        }
        *world.tuning_mut() = self.tuning.clone();

        let mut ids = HashMap::with_capacity(self.nodes.len());
        for spec in &self.nodes {
            if ids.contains_key(&spec.name) {
                return Err(OrbError::InvalidScenario(format!(
                    "duplicate node name `{}`",
                    spec.name
                )));
            }
            let id = world.add_node_in_view(spec.kind.clone(), spec.position, spec.view);
            if !spec.enabled {
                world.set_enabled(id, false)?;
            }
            ids.insert(spec.name.clone(), id);
        }

        for spec in &self.nodes {
            let Some(receiver) = &spec.portal_to else {
                continue;
            };
            let receiver = lookup(&ids, receiver)?;
            let id = lookup(&ids, &spec.name)?;
            let NodeKind::PortalSend { view, .. } = spec.kind else {
                return Err(OrbError::InvalidScenario(format!(
                    "`{}` has a portal target but is not a portal sender",
                    spec.name
                )));
            };
            world.configure_node(
                id,
                NodeKind::PortalSend {
                    receiver: Some(receiver),
                    view,
                },
            )?;
        }

        for spec in &self.connections {
            let from = lookup(&ids, &spec.from)?;
            let to = lookup(&ids, &spec.to)?;
            world.connect_with(from, to, spec.kind.clone(), spec.options)?;
        }

        for trigger in &self.triggers {
            let target = lookup(&ids, &trigger.node)?;
            let wave = world.next_wave_id();
            let delay = (trigger.at - world.now()).max(0.0);
            world.propagate(
                target,
                delay,
                wave,
                None,
                HopBudget::for_source(trigger.max_hops),
                PulseEnvelope::default(),
                None,
            );
        }

        tracing::info!(
            scenario = %self.name,
            nodes = ids.len(),
            connections = self.connections.len(),
            "scenario loaded"
        );
        Ok(ids)
    }
}

fn lookup(ids: &HashMap<String, NodeId>, name: &str) -> Result<NodeId> {
    ids.get(name)
        .copied()
        .ok_or_else(|| OrbError::InvalidScenario(format!("unknown node `{name}`")))
}
