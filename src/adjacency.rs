//! Region adjacency with shared-boundary lengths.

use std::collections::HashMap;

use crate::errors::{Result, SegError};
use crate::region::RegionId;

/// Index-based adjacency: region id → (neighbor id → shared boundary length).
///
/// Every edge is stored on both endpoints with the same length.
#[derive(Debug, Clone, Default)]
pub struct AdjacencyGraph {
    edges: Vec<HashMap<RegionId, u32>>,
}

impl AdjacencyGraph {
    pub fn new(region_count: usize) -> Self {
        Self {
            edges: vec![HashMap::new(); region_count],
        }
    }

    /// Record `length` more grid edges between `a` and `b`.
    pub fn add_boundary(&mut self, a: RegionId, b: RegionId, length: u32) {
        if a == b || length == 0 {
            return;
        }
        *self.edges[a.index()].entry(b).or_insert(0) += length;
        *self.edges[b.index()].entry(a).or_insert(0) += length;
    }

    pub fn neighbors(&self, id: RegionId) -> impl Iterator<Item = RegionId> + '_ {
        self.edges
            .get(id.index())
            .into_iter()
            .flat_map(|map| map.keys().copied())
    }

    /// Neighbors together with the shared boundary length.
    pub fn boundaries(&self, id: RegionId) -> impl Iterator<Item = (RegionId, u32)> + '_ {
        self.edges
            .get(id.index())
            .into_iter()
            .flat_map(|map| map.iter().map(|(&n, &len)| (n, len)))
    }

    pub fn shared_boundary(&self, a: RegionId, b: RegionId) -> u32 {
        self.edges
            .get(a.index())
            .and_then(|map| map.get(&b))
            .copied()
            .unwrap_or(0)
    }

    pub fn degree(&self, id: RegionId) -> usize {
        self.edges.get(id.index()).map_or(0, HashMap::len)
    }

    /// Number of undirected edges.
    pub fn edge_count(&self) -> usize {
        self.edges.iter().map(HashMap::len).sum::<usize>() / 2
    }

    /// Rewire the edges of `a` and `b` onto `survivor`, which must be one of them.
    ///
    /// Boundaries to a common third region are summed; the `a`–`b` edge disappears.
    pub fn on_merge(&mut self, a: RegionId, b: RegionId, survivor: RegionId) -> Result<()> {
        let absorbed = match survivor {
            s if s == a && a != b => b,
            s if s == b && a != b => a,
            _ => {
                return Err(SegError::InvalidMerge {
                    a: a.0,
                    b: b.0,
                    reason: format!("survivor {survivor} is not exactly one of the merged regions"),
                })
            }
        };
        if self.shared_boundary(a, b) == 0 {
            return Err(SegError::InvalidMerge {
                a: a.0,
                b: b.0,
                reason: "regions are not adjacent".to_string(),
            });
        }

        let absorbed_edges = std::mem::take(&mut self.edges[absorbed.index()]);
        self.edges[survivor.index()].remove(&absorbed);

        for (neighbor, length) in absorbed_edges {
            if neighbor == survivor {
                continue;
            }
            let neighbor_edges = &mut self.edges[neighbor.index()];
            neighbor_edges.remove(&absorbed);
            *neighbor_edges.entry(survivor).or_insert(0) += length;
            *self.edges[survivor.index()].entry(neighbor).or_insert(0) += length;
        }
        Ok(())
    }
}
