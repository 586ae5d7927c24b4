//! Free-flying pulses launched by launcher sources. They move through space
//! instead of along connections and join the graph again on impact.

use crate::graph::{path_point, ConnectionId, ConnectionKind, Graph, NodeId, Vec2};
use crate::pulse::{Arrival, HopBudget, PulseEnvelope};
use crate::world::World;

const CURVE_SAMPLES: usize = 16;

#[derive(Debug, Clone, PartialEq)]
pub struct Projectile {
    /// Launcher the projectile left from. It never collides with it.
    pub origin: NodeId,
    pub position: Vec2,
    /// Units per second.
    pub velocity: Vec2,
    /// Seconds since launch.
    pub age: f64,
    pub envelope: PulseEnvelope,
    pub hops: HopBudget,
}

/// What a projectile ran into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Impact {
    Node(NodeId),
    /// Connection hit at parameter `t` in [0, 1], measured from its `from` end.
    Connection { id: ConnectionId, t: f32 },
}

impl Projectile {
    pub fn integrate(&mut self, delta: f64) {
        self.position = self.position + self.velocity * delta as f32;
        self.age += delta;
    }

    /// First node within reach, otherwise the nearest connection within reach.
    pub fn find_impact(&self, graph: &Graph, node_radius: f32, hit_radius: f32) -> Option<Impact> {
        let node_hit = graph
            .nodes()
            .filter(|node| node.id != self.origin)
            .map(|node| (node.id, node.position.distance(self.position)))
            .filter(|(_, distance)| *distance <= node_radius + hit_radius)
            .min_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        if let Some((id, _)) = node_hit {
            return Some(Impact::Node(id));
        }

        graph
            .connection_ids()
            .into_iter()
            .filter_map(|id| {
                let connection = graph.connection(id)?;
                if connection.kind == ConnectionKind::Rope || connection.touches(self.origin) {
                    return None;
                }
                let (a, b, curvature) = graph.connection_points(id)?;
                let (t, distance) = nearest_on_path(a, b, curvature, self.position);
                (distance <= hit_radius).then_some((id, t, distance))
            })
            .min_by(|a, b| a.2.total_cmp(&b.2))
            .map(|(id, t, _)| Impact::Connection { id, t })
    }
}

/// Closest parameter along a connection path to `point`, and its distance.
fn nearest_on_path(a: Vec2, b: Vec2, curvature: f32, point: Vec2) -> (f32, f32) {
    let mut best = (0.0, f32::MAX);
    let mut previous = path_point(a, b, curvature, 0.0);
    for sample in 1..=CURVE_SAMPLES {
        let t1 = sample as f32 / CURVE_SAMPLES as f32;
        let t0 = (sample - 1) as f32 / CURVE_SAMPLES as f32;
        let current = path_point(a, b, curvature, t1);

        let segment = current - previous;
        let span = segment.dot(segment);
        let along = if span <= f32::EPSILON {
            0.0
        } else {
            ((point - previous).dot(segment) / span).clamp(0.0, 1.0)
        };
        let closest = previous + segment * along;
        let distance = closest.distance(point);
        if distance < best.1 {
            best = (t0 + (t1 - t0) * along, distance);
        }
        previous = current;
    }
    best
}

impl World {
    pub(crate) fn launch_projectile(
        &mut self,
        origin: NodeId,
        angle: f32,
        envelope: PulseEnvelope,
        hops: HopBudget,
        at: f64,
    ) {
        let Some(node) = self.graph.node(origin) else {
            return;
        };
        let speed = self.config.projectile.speed;
        let projectile = Projectile {
            origin,
            position: node.position,
            velocity: Vec2::new(angle.cos(), angle.sin()) * speed,
            age: 0.0,
            envelope,
            hops,
        };
        self.visual.projectile_launched(at, origin, projectile.position);
        self.projectiles.push(projectile);
    }

    /// Moves every projectile, retires expired ones and turns impacts into
    /// zero-delay pulses with fresh waves.
    pub(crate) fn step_projectiles(&mut self, delta: f64, now: f64) {
        if self.projectiles.is_empty() {
            return;
        }
        let lifetime = self.config.projectile.lifetime;
        let node_radius = self.config.node_radius;
        let hit_radius = self.config.projectile.hit_radius;

        let mut impacts = Vec::new();
        let mut flying = Vec::with_capacity(self.projectiles.len());
        for mut projectile in std::mem::take(&mut self.projectiles) {
            projectile.integrate(delta);
            if projectile.age > lifetime {
                continue;
            }
            match projectile.find_impact(&self.graph, node_radius, hit_radius) {
                Some(impact) => impacts.push((projectile, impact)),
                None => flying.push(projectile),
            }
        }
        self.projectiles = flying;

        for (projectile, impact) in impacts {
            self.impact(projectile, impact, now);
        }
    }

    fn impact(&mut self, projectile: Projectile, impact: Impact, now: f64) {
        let wave = self.next_wave_id();
        tracing::debug!(origin = %projectile.origin, ?impact, wave = %wave, "projectile impact");
        match impact {
            Impact::Node(target) => self.propagate_at(
                now,
                Arrival {
                    target,
                    wave,
                    source: None,
                    hops: projectile.hops,
                    envelope: projectile.envelope,
                    via: None,
                },
                0.0,
            ),
            Impact::Connection { id, t } => {
                let Some(connection) = self.graph.connection(id).cloned() else {
                    return;
                };
                let Some(length) = self.graph.connection_length(id) else {
                    return;
                };
                let length = f64::from(length);
                let factor = self.config.delay_per_unit;
                let t = f64::from(t);
                if connection.kind.is_audible() {
                    self.sound_connection(id, wave, &projectile.envelope, now);
                }

                let mut legs = vec![(connection.to.node, (1.0 - t) * length * factor)];
                if !connection.is_one_way() {
                    legs.push((connection.from.node, t * length * factor));
                }
                for (target, delay) in legs {
                    self.propagate_at(
                        now,
                        Arrival {
                            target,
                            wave,
                            source: None,
                            hops: projectile.hops,
                            envelope: projectile.envelope,
                            via: Some(id),
                        },
                        delay,
                    );
                }
            }
        }
    }
}
