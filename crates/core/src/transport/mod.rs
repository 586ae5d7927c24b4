//! Shared tempo state and beat quantization.

use serde::{Deserialize, Serialize};

use crate::config::TransportConfig;

/// Index of the one-beat ("1/4") entry in the default subdivision table.
pub const DEFAULT_SUBDIVISION: usize = 4;

const MIN_BPM: f64 = 1.0;

/// Named beat fraction, e.g. `1/8` = half a beat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subdivision {
    pub label: String,
    /// Length in beats.
    pub beats: f64,
}

impl Subdivision {
    pub fn new(label: impl Into<String>, beats: f64) -> Self {
        Self {
            label: label.into(),
            beats,
        }
    }
}

/// The stock subdivision table, longest first.
pub fn default_subdivisions() -> Vec<Subdivision> {
    vec![
        Subdivision::new("2 bars", 8.0),
        Subdivision::new("1 bar", 4.0),
        Subdivision::new("1/2", 2.0),
        Subdivision::new("1/4.", 1.5),
        Subdivision::new("1/4", 1.0),
        Subdivision::new("1/4T", 2.0 / 3.0),
        Subdivision::new("1/8.", 0.75),
        Subdivision::new("1/8", 0.5),
        Subdivision::new("1/8T", 1.0 / 3.0),
        Subdivision::new("1/16", 0.25),
        Subdivision::new("1/16T", 1.0 / 6.0),
        Subdivision::new("1/32", 0.125),
    ]
}

/// Tempo state read by sources and the retrigger sequencer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportState {
    bpm: f64,
    pub sync_enabled: bool,
    subdivisions: Vec<Subdivision>,
}

impl Default for TransportState {
    fn default() -> Self {
        Self::from_config(&TransportConfig::default())
    }
}

impl TransportState {
    pub fn from_config(config: &TransportConfig) -> Self {
        let mut state = Self {
            bpm: 120.0,
            sync_enabled: config.sync_enabled,
            subdivisions: default_subdivisions(),
        };
        state.set_bpm(config.bpm);
        state
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    /// Sets the tempo. Non-positive or non-finite values clamp to 1 BPM.
    pub fn set_bpm(&mut self, bpm: f64) {
        self.bpm = if bpm.is_finite() { bpm.max(MIN_BPM) } else { MIN_BPM };
    }

    pub fn seconds_per_beat(&self) -> f64 {
        60.0 / self.bpm
    }

    pub fn subdivisions(&self) -> &[Subdivision] {
        &self.subdivisions
    }

    pub fn subdivision(&self, index: usize) -> Option<&Subdivision> {
        self.subdivisions.get(index)
    }

    pub fn find_subdivision(&self, label: &str) -> Option<usize> {
        self.subdivisions.iter().position(|entry| entry.label == label)
    }

    /// Length of a subdivision in seconds. A missing index falls back to one
    /// beat, and the result never drops below `min_interval`.
    pub fn subdivision_seconds(&self, index: usize, min_interval: f64) -> f64 {
        let beats = self
            .subdivision(index)
            .map(|entry| entry.beats)
            .filter(|beats| beats.is_finite() && *beats > 0.0)
            .unwrap_or(1.0);
        clamp_interval(self.seconds_per_beat() * beats, min_interval)
    }
}

/// Clamps a configured interval to a usable minimum.
pub fn clamp_interval(interval: f64, min_interval: f64) -> f64 {
    let floor = if min_interval.is_finite() && min_interval > 0.0 {
        min_interval
    } else {
        f64::EPSILON
    };
    if interval.is_finite() {
        interval.max(floor)
    } else {
        floor
    }
}

/// Rounds `time` up to the next multiple of `interval`.
pub fn quantize_next(time: f64, interval: f64) -> f64 {
    if interval <= 0.0 || !interval.is_finite() {
        return time;
    }
    (time / interval).ceil() * interval
}

/// Next sync boundary strictly ahead of `now`. A boundary within `epsilon` of
/// `now` is skipped so a source cannot fire twice around a recomputation.
pub fn next_boundary(now: f64, interval: f64, epsilon: f64) -> f64 {
    let boundary = quantize_next(now, interval);
    if boundary - now < epsilon {
        boundary + interval
    } else {
        boundary
    }
}
