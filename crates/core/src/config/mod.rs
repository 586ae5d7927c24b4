use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::Result;

/// Top-level configuration for the simulation engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Fixed simulation tick rate driving sources, projectiles and glow decay.
    pub tick_rate_hz: f64,
    /// Seconds a pulse needs to travel one unit of connection length.
    pub delay_per_unit: f64,
    /// A freshly computed sync boundary closer than this to "now" is skipped.
    pub sync_epsilon: f64,
    /// Floor applied to every source and retrigger interval.
    pub min_interval: f64,
    /// Average fires per second of randomized sources.
    pub random_density: f64,
    /// Number of recent wave ids each node remembers.
    pub wave_memory: usize,
    /// Upper bound on timeline events drained in a single tick.
    pub max_events_per_tick: usize,
    pub node_radius: f32,
    pub glow_decay_per_second: f32,
    /// Seed for the engine RNG. `None` seeds from entropy.
    pub seed: Option<u64>,
    pub projectile: ProjectileConfig,
    pub transport: TransportConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: 60.0,
            delay_per_unit: 0.005,
            sync_epsilon: 0.001,
            min_interval: 0.01,
            random_density: 1.0,
            wave_memory: 32,
            max_events_per_tick: 10_000,
            node_radius: 12.0,
            glow_decay_per_second: 4.0,
            seed: None,
            projectile: ProjectileConfig::default(),
            transport: TransportConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Parses a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        Ok(toml::from_str(source)?)
    }

    /// Reads and parses a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// Defaults with a fixed RNG seed, used for reproducible runs.
    pub fn seeded(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..Self::default()
        }
    }

    /// Length of one simulation tick in seconds.
    pub fn tick_seconds(&self) -> f64 {
        if self.tick_rate_hz.is_finite() && self.tick_rate_hz > 0.0 {
            1.0 / self.tick_rate_hz
        } else {
            1.0 / 60.0
        }
    }
}

/// Configuration of free-flying projectiles spawned by launcher sources.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectileConfig {
    /// Units per second.
    pub speed: f32,
    /// Seconds before an unimpacted projectile is discarded.
    pub lifetime: f64,
    pub hit_radius: f32,
}

impl Default for ProjectileConfig {
    fn default() -> Self {
        Self {
            speed: 240.0,
            lifetime: 4.0,
            hit_radius: 4.0,
        }
    }
}

/// Initial transport state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub bpm: f64,
    pub sync_enabled: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            bpm: 120.0,
            sync_enabled: false,
        }
    }
}
