//! Pulse data: wave identity, hop budget, envelope and the per-node wave guard.

use std::collections::{HashMap, VecDeque};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::graph::{ConnectionId, NodeId};

/// Identity of one logical wave, shared by every hop of that wave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WaveId(pub u64);

impl fmt::Display for WaveId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "w{}", self.0)
    }
}

/// Number of further hops a pulse may take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HopBudget {
    Unbounded,
    Finite(u32),
}

impl HopBudget {
    /// Budget for the first hop leaving a source configured with `max_hops`.
    pub fn for_source(max_hops: Option<u32>) -> Self {
        match max_hops {
            None => Self::Unbounded,
            Some(hops) => Self::Finite(hops.saturating_sub(1)),
        }
    }

    pub fn is_exhausted(self) -> bool {
        matches!(self, Self::Finite(0))
    }

    /// One hop less. Never goes below zero.
    pub fn consume(self) -> Self {
        match self {
            Self::Unbounded => Self::Unbounded,
            Self::Finite(hops) => Self::Finite(hops.saturating_sub(1)),
        }
    }
}

impl fmt::Display for HopBudget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unbounded => f.write_str("unbounded"),
            Self::Finite(hops) => write!(f, "{hops}"),
        }
    }
}

/// Shape a pulse carries along its wave.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PulseEnvelope {
    pub intensity: f32,
    pub color: Option<[u8; 3]>,
    pub multiplier: f32,
}

impl Default for PulseEnvelope {
    fn default() -> Self {
        Self {
            intensity: 1.0,
            color: None,
            multiplier: 1.0,
        }
    }
}

impl PulseEnvelope {
    pub fn with_intensity(intensity: f32) -> Self {
        Self {
            intensity,
            ..Self::default()
        }
    }

    /// Intensity scaled by the multiplier, as handed to the audio layer.
    pub fn level(&self) -> f32 {
        (self.intensity * self.multiplier).max(0.0)
    }
}

/// One scheduled hop: a pulse about to reach `target`.
#[derive(Debug, Clone, PartialEq)]
pub struct Arrival {
    pub target: NodeId,
    pub wave: WaveId,
    /// Node the pulse came from. `None` for injected pulses.
    pub source: Option<NodeId>,
    pub hops: HopBudget,
    pub envelope: PulseEnvelope,
    /// Connection the pulse travelled over.
    pub via: Option<ConnectionId>,
}

/// Remembers which waves have already reached each node.
///
/// The guard is scoped to the wave, not to the incoming edge: a node reachable
/// over two paths of the same wave reacts once, whichever path arrives first.
#[derive(Debug, Clone)]
pub struct WaveGuard {
    capacity: usize,
    seen: HashMap<NodeId, VecDeque<WaveId>>,
}

impl WaveGuard {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            seen: HashMap::new(),
        }
    }

    /// Records the visit. Returns `false` if the node already saw this wave.
    pub fn visit(&mut self, node: NodeId, wave: WaveId) -> bool {
        let seen = self.seen.entry(node).or_default();
        if seen.contains(&wave) {
            return false;
        }
        if seen.len() == self.capacity {
            seen.pop_front();
        }
        seen.push_back(wave);
        true
    }

    pub fn has_seen(&self, node: NodeId, wave: WaveId) -> bool {
        self.seen
            .get(&node)
            .map(|seen| seen.contains(&wave))
            .unwrap_or(false)
    }

    /// Most recent wave that reached the node.
    pub fn last_seen(&self, node: NodeId) -> Option<WaveId> {
        self.seen.get(&node).and_then(|seen| seen.back().copied())
    }

    pub fn forget(&mut self, node: NodeId) {
        self.seen.remove(&node);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finite_budget_never_goes_negative() {
        let budget = HopBudget::Finite(1);
        assert!(!budget.is_exhausted());
        assert_eq!(budget.consume(), HopBudget::Finite(0));
        assert_eq!(budget.consume().consume(), HopBudget::Finite(0));
        assert!(budget.consume().is_exhausted());
        assert_eq!(HopBudget::Unbounded.consume(), HopBudget::Unbounded);
    }

    #[test]
    fn source_budget_counts_the_first_hop() {
        assert_eq!(HopBudget::for_source(None), HopBudget::Unbounded);
        assert_eq!(HopBudget::for_source(Some(3)), HopBudget::Finite(2));
        assert_eq!(HopBudget::for_source(Some(0)), HopBudget::Finite(0));
    }

    #[test]
    fn guard_admits_each_wave_once_per_node() {
        let mut guard = WaveGuard::new(4);
        let node = NodeId(1);
        assert!(guard.visit(node, WaveId(1)));
        assert!(!guard.visit(node, WaveId(1)));
        assert!(guard.visit(node, WaveId(2)));
        // Interleaved waves cannot sneak back in.
        assert!(!guard.visit(node, WaveId(1)));
        assert!(guard.visit(NodeId(2), WaveId(1)));
        assert_eq!(guard.last_seen(node), Some(WaveId(2)));
    }

    #[test]
    fn guard_memory_is_bounded() {
        let mut guard = WaveGuard::new(2);
        let node = NodeId(7);
        for wave in 1..=3 {
            assert!(guard.visit(node, WaveId(wave)));
        }
        assert!(!guard.has_seen(node, WaveId(1)));
        assert!(guard.has_seen(node, WaveId(3)));

        guard.forget(node);
        assert_eq!(guard.last_seen(node), None);
    }
}
