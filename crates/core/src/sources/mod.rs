//! Per-tick evaluation of self-triggering nodes.

use rand::Rng;

use crate::dispatch::{Forward, RANDOM_INTENSITY_MIN};
use crate::graph::{NodeId, NodeKind, SourceClock, SourceParams, SourceStyle};
use crate::pulse::{HopBudget, PulseEnvelope};
use crate::timeline::TIME_EPSILON;
use crate::transport::{clamp_interval, next_boundary};
use crate::world::World;

/// Bounds of a randomized source's gap, as multiples of the mean gap.
const RANDOM_WINDOW: (f64, f64) = (0.25, 1.75);

/// Free-running check. Returns the fire time when `interval` has elapsed
/// since the last fire.
pub fn free_running_due(clock: &mut SourceClock, now: f64, interval: f64) -> Option<f64> {
    let last = *clock.last_fire_time.get_or_insert(now);
    if now - last >= interval - TIME_EPSILON {
        clock.last_fire_time = Some(now);
        Some(now)
    } else {
        None
    }
}

/// Tempo-synced check. The boundary is recomputed only when it is unset, was
/// computed for a different interval, or has fallen more than one interval
/// behind. Returns the boundary the source fires on.
pub fn synced_due(clock: &mut SourceClock, now: f64, interval: f64, epsilon: f64) -> Option<f64> {
    let interval_changed = clock
        .sync_interval
        .map(|previous| (previous - interval).abs() > TIME_EPSILON)
        .unwrap_or(true);
    let stale = match clock.next_sync_fire_time {
        None => true,
        Some(next) => interval_changed || next < now - interval,
    };
    if stale {
        clock.next_sync_fire_time = Some(next_boundary(now, interval, epsilon));
        clock.sync_interval = Some(interval);
    }

    let boundary = clock.next_sync_fire_time?;
    if now + TIME_EPSILON < boundary {
        return None;
    }
    clock.next_sync_fire_time = Some(boundary + interval);
    clock.last_fire_time = Some(now);
    Some(boundary)
}

/// Randomized check. The first call only arms the source.
pub fn random_due<R: Rng>(
    clock: &mut SourceClock,
    now: f64,
    mean_gap: f64,
    min_interval: f64,
    rng: &mut R,
) -> Option<f64> {
    let draw = |rng: &mut R| {
        let gap = mean_gap * rng.gen_range(RANDOM_WINDOW.0..RANDOM_WINDOW.1);
        now + clamp_interval(gap, min_interval)
    };

    let Some(next) = clock.next_random_fire_time else {
        clock.next_random_fire_time = Some(draw(rng));
        return None;
    };
    if now + TIME_EPSILON < next {
        return None;
    }
    clock.next_random_fire_time = Some(draw(rng));
    clock.last_fire_time = Some(now);
    Some(now)
}

impl World {
    /// Evaluates every enabled source once and fires those that are due.
    pub(crate) fn evaluate_sources(&mut self, now: f64) {
        let min_interval = self.config.min_interval;
        let sync_epsilon = self.config.sync_epsilon;
        let mean_gap = 1.0 / self.config.random_density.max(f64::EPSILON);

        for id in self.graph.node_ids() {
            let Some(node) = self.graph.node_mut(id) else {
                continue;
            };
            if !node.enabled {
                continue;
            }
            let NodeKind::Source(params) = &node.kind else {
                continue;
            };

            let synced = self.transport.sync_enabled && !params.ignore_global_sync;
            let due = match params.style {
                SourceStyle::Random => {
                    random_due(&mut node.clock, now, mean_gap, min_interval, &mut self.rng)
                }
                _ if synced => {
                    let interval = self
                        .transport
                        .subdivision_seconds(params.subdivision, min_interval);
                    synced_due(&mut node.clock, now, interval, sync_epsilon)
                }
                _ => {
                    let interval = clamp_interval(params.interval, min_interval);
                    free_running_due(&mut node.clock, now, interval)
                }
            };

            if let Some(at) = due {
                let params = params.clone();
                self.fire_source(id, &params, at);
            }
        }
    }

    /// Originates a new wave from a source at logical time `at`.
    pub(crate) fn fire_source(&mut self, id: NodeId, params: &SourceParams, at: f64) {
        let wave = self.next_wave_id();
        self.guard.visit(id, wave);

        let intensity = if params.randomize_intensity || params.style == SourceStyle::Random {
            self.rng.gen_range(RANDOM_INTENSITY_MIN..=1.0)
        } else {
            params.intensity
        };
        let envelope = PulseEnvelope {
            intensity,
            color: params.color,
            multiplier: 1.0,
        };

        if let Some(node) = self.graph.node_mut(id) {
            node.glow = node.glow.max(intensity);
        }
        self.visual.node_activated(at, id, &envelope);
        tracing::debug!(node = %id, wave = %wave, at, style = ?params.style, "source fired");

        if params.max_hops == Some(0) {
            return;
        }
        let hops = HopBudget::for_source(params.max_hops);
        match params.style {
            SourceStyle::Launcher => {
                self.launch_projectile(id, params.launch_angle, envelope, hops, at)
            }
            _ => self.fan_out(id, None, wave, Forward { envelope, hops }, at),
        }
    }
}
