use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use crate::audio::{AudioBinding, Emission};
use crate::graph::{NodeId, Vec2, ViewId};
use crate::pulse::PulseEnvelope;
use crate::render::{HopNotice, VisualLayer};
use crate::{OrbError, Result};

/// Which collaborator calls end up in the trace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingSettings {
    pub capture_hops: bool,
    pub capture_visuals: bool,
}

impl Default for RecordingSettings {
    fn default() -> Self {
        Self {
            capture_hops: true,
            capture_visuals: true,
        }
    }
}

/// One captured collaborator call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TraceEvent {
    Emit(Emission),
    Hop(HopNotice),
    Activated {
        time_seconds: f64,
        node: NodeId,
        envelope: PulseEnvelope,
    },
    Step {
        time_seconds: f64,
        node: NodeId,
        step: usize,
        muted: bool,
    },
    View {
        time_seconds: f64,
        view: ViewId,
    },
    Projectile {
        time_seconds: f64,
        origin: NodeId,
        position: Vec2,
    },
}

#[derive(Debug, Default)]
struct RecorderState {
    is_recording: bool,
    events: Vec<TraceEvent>,
}

/// Stands in for both the audio binding and the visual layer, capturing every
/// call. Clones share the same trace, so one clone can be handed to the world
/// while another is inspected.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    settings: RecordingSettings,
    shared: Arc<Mutex<RecorderState>>,
}

impl Recorder {
    pub fn new(settings: RecordingSettings) -> Self {
        Self {
            settings,
            shared: Arc::new(Mutex::new(RecorderState::default())),
        }
    }

    /// Recorder with default settings that is already capturing.
    pub fn recording() -> Self {
        let recorder = Self::new(RecordingSettings::default());
        if let Ok(mut state) = recorder.shared.lock() {
            state.is_recording = true;
        }
        recorder
    }

    pub fn start(&self) -> Result<()> {
        self.lock()?.is_recording = true;
        Ok(())
    }

    pub fn stop(&self) -> Result<()> {
        self.lock()?.is_recording = false;
        Ok(())
    }

    pub fn is_recording(&self) -> bool {
        self.lock().map(|state| state.is_recording).unwrap_or(false)
    }

    pub fn events(&self) -> Result<Vec<TraceEvent>> {
        Ok(self.lock()?.events.clone())
    }

    pub fn emissions(&self) -> Result<Vec<Emission>> {
        Ok(self
            .lock()?
            .events
            .iter()
            .filter_map(|event| match event {
                TraceEvent::Emit(emission) => Some(emission.clone()),
                _ => None,
            })
            .collect())
    }

    /// Emissions that targeted `node`.
    pub fn emissions_for(&self, node: NodeId) -> Result<Vec<Emission>> {
        Ok(self
            .emissions()?
            .into_iter()
            .filter(|emission| emission.node() == Some(node))
            .collect())
    }

    pub fn hops(&self) -> Result<Vec<HopNotice>> {
        Ok(self
            .lock()?
            .events
            .iter()
            .filter_map(|event| match event {
                TraceEvent::Hop(hop) => Some(hop.clone()),
                _ => None,
            })
            .collect())
    }

    pub fn clear(&self) -> Result<()> {
        self.lock()?.events.clear();
        Ok(())
    }

    fn push(&self, event: TraceEvent) {
        match self.lock() {
            Ok(mut state) if state.is_recording => state.events.push(event),
            Ok(_) => {}
            Err(err) => tracing::warn!(%err, "dropping trace event"),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, RecorderState>> {
        self.shared
            .lock()
            .map_err(|_| OrbError::msg("trace recorder has been poisoned"))
    }
}

impl AudioBinding for Recorder {
    fn emit(&mut self, emission: &Emission) {
        self.push(TraceEvent::Emit(emission.clone()));
    }
}

impl VisualLayer for Recorder {
    fn notify_hop(&mut self, hop: &HopNotice) {
        if self.settings.capture_hops {
            self.push(TraceEvent::Hop(hop.clone()));
        }
    }

    fn node_activated(&mut self, time_seconds: f64, node: NodeId, envelope: &PulseEnvelope) {
        if self.settings.capture_visuals {
            self.push(TraceEvent::Activated {
                time_seconds,
                node,
                envelope: *envelope,
            });
        }
    }

    fn retrigger_step(&mut self, time_seconds: f64, node: NodeId, step: usize, muted: bool) {
        if self.settings.capture_visuals {
            self.push(TraceEvent::Step {
                time_seconds,
                node,
                step,
                muted,
            });
        }
    }

    fn view_switched(&mut self, time_seconds: f64, view: ViewId) {
        if self.settings.capture_visuals {
            self.push(TraceEvent::View { time_seconds, view });
        }
    }

    fn projectile_launched(&mut self, time_seconds: f64, origin: NodeId, position: Vec2) {
        if self.settings.capture_visuals {
            self.push(TraceEvent::Projectile {
                time_seconds,
                origin,
                position,
            });
        }
    }
}
