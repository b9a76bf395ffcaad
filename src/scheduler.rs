//! Mutual-best-fit agglomeration in synchronous rounds.
//!
//! Each round has two phases. First, every active region looks up its
//! cheapest neighbor; this is read-only and runs on the rayon pool. Then a
//! single writer commits every mutually-best pair in id order and rewires
//! the adjacency graph. Regions without a finite-cost neighbor settle until
//! a neighboring merge wakes them up again.
//!
//! Rounds never consult the threshold, so the merge sequence is the same for
//! every threshold. Each merge records a height: the largest cost among the
//! merges that built it. A run at threshold `t` keeps exactly the merges
//! whose height is below `t`, and the region count can only shrink as `t`
//! grows.

use std::cmp::Ordering;

use log::debug;
use rayon::prelude::*;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::adjacency::AdjacencyGraph;
use crate::errors::{Result, SegError};
use crate::partition::Partition;
use crate::region::{RegionId, RegionStore};
use crate::traits::MergeCost;

// Below this many active regions the best-partner search stays on one thread.
const PARALLEL_MIN_LEN: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RegionState {
    Active,
    Settled,
    Absorbed,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Candidate {
    partner: RegionId,
    cost: f64,
}

impl Candidate {
    // Lower cost first, then lower partner id.
    fn order(&self, other: &Self) -> Ordering {
        self.cost
            .total_cmp(&other.cost)
            .then(self.partner.cmp(&other.partner))
    }
}

/// Outcome of a converged run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScheduleReport {
    pub rounds: usize,
    pub merges: usize,
}

/// One committed merge. The survivor is the lower of `a` and `b`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MergeStep {
    pub a: RegionId,
    pub b: RegionId,
    pub cost: f64,
    /// Largest cost among this merge and every merge that formed `a` or `b`.
    pub height: f64,
}

/// Threshold-free merge sequence, in commit order.
///
/// A hierarchy built for threshold `t` stops once no later merge could have
/// a height below `t`; it answers queries for any threshold up to `t`.
#[derive(Debug, Clone, Default)]
pub struct MergeHierarchy {
    steps: Vec<MergeStep>,
    rounds: usize,
}

impl MergeHierarchy {
    pub fn steps(&self) -> &[MergeStep] {
        &self.steps
    }

    pub const fn rounds(&self) -> usize {
        self.rounds
    }

    /// Number of merges kept at `threshold`.
    pub fn merges_below(&self, threshold: f64) -> usize {
        self.steps.iter().filter(|s| s.height < threshold).count()
    }

    /// Replay the merges kept at `threshold` onto the seed partition they
    /// were recorded from.
    pub fn apply(
        &self,
        threshold: f64,
        store: &mut RegionStore,
        graph: &mut AdjacencyGraph,
    ) -> Result<usize> {
        let mut merges = 0;
        for step in self.steps.iter().filter(|s| s.height < threshold) {
            let shared = graph.shared_boundary(step.a, step.b);
            let survivor = store.merge(step.a, step.b, shared)?;
            graph.on_merge(step.a, step.b, survivor)?;
            merges += 1;
        }
        Ok(merges)
    }
}

pub struct MergeScheduler<C: MergeCost> {
    cost: C,
    threshold: f64,
    cancellation: Option<CancellationToken>,
}

impl<C: MergeCost> MergeScheduler<C> {
    pub const fn new(cost: C, threshold: f64) -> Self {
        Self {
            cost,
            threshold,
            cancellation: None,
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub fn run(&self, partition: &mut Partition) -> Result<ScheduleReport> {
        self.run_on(&mut partition.store, &mut partition.graph)
    }

    /// Merge a seed partition down to the regions kept at the threshold.
    pub fn run_on(
        &self,
        store: &mut RegionStore,
        graph: &mut AdjacencyGraph,
    ) -> Result<ScheduleReport> {
        let hierarchy = self.build_hierarchy(store.clone(), graph.clone())?;
        let merges = hierarchy.apply(self.threshold, store, graph)?;
        Ok(ScheduleReport {
            rounds: hierarchy.rounds(),
            merges,
        })
    }

    /// Run mutual-best-fit rounds until every region is settled, or until
    /// every region that can still merge already sits at or above the
    /// threshold.
    pub fn build_hierarchy(
        &self,
        mut store: RegionStore,
        mut graph: AdjacencyGraph,
    ) -> Result<MergeHierarchy> {
        let capacity = store.capacity();
        let mut state = vec![RegionState::Absorbed; capacity];
        let mut level = vec![0.0_f64; capacity];
        let mut choice: Vec<Option<RegionId>> = vec![None; capacity];

        let mut active: Vec<RegionId> = store.live_ids().collect();
        for id in &active {
            state[id.index()] = RegionState::Active;
        }

        // live regions with a neighbor whose level is still below the threshold
        let mut below = if 0.0 < self.threshold {
            active.iter().filter(|&&id| graph.degree(id) > 0).count()
        } else {
            0
        };

        let mut hierarchy = MergeHierarchy::default();

        while !active.is_empty() && below > 0 {
            if self.is_cancelled() {
                return Err(SegError::Cancelled {
                    rounds: hierarchy.rounds,
                });
            }
            hierarchy.rounds += 1;

            let best = self.find_best_partners(&active, &store, &graph);
            for &(id, candidate) in &best {
                choice[id.index()] = candidate.map(|c| c.partner);
            }

            let mut pairs = Vec::new();
            for &(id, candidate) in &best {
                match candidate {
                    None => state[id.index()] = RegionState::Settled,
                    Some(c) if id < c.partner && choice[c.partner.index()] == Some(id) => {
                        pairs.push((id, c.partner, c.cost));
                    }
                    Some(_) => {}
                }
            }

            if pairs.is_empty() {
                if let Some(&(id, Some(c))) = best.iter().find(|(_, c)| c.is_some()) {
                    return Err(SegError::InvalidMerge {
                        a: id.0,
                        b: c.partner.0,
                        reason: "no mutual pair among regions with finite merge costs".to_string(),
                    });
                }
            }

            let mut survivors = Vec::with_capacity(pairs.len());
            for &(a, b, cost) in &pairs {
                let shared = graph.shared_boundary(a, b);
                let survivor = store.merge(a, b, shared)?;
                graph.on_merge(a, b, survivor)?;

                let height = cost.max(level[a.index()]).max(level[b.index()]);
                below -= [a, b]
                    .iter()
                    .filter(|id| level[id.index()] < self.threshold)
                    .count();
                if height < self.threshold && graph.degree(survivor) > 0 {
                    below += 1;
                }

                let absorbed = if survivor == a { b } else { a };
                level[survivor.index()] = height;
                state[absorbed.index()] = RegionState::Absorbed;
                state[survivor.index()] = RegionState::Active;
                hierarchy.steps.push(MergeStep { a, b, cost, height });
                survivors.push(survivor);
            }

            let mut next: Vec<RegionId> = best
                .iter()
                .map(|&(id, _)| id)
                .filter(|id| state[id.index()] == RegionState::Active)
                .collect();
            for &survivor in &survivors {
                for neighbor in graph.neighbors(survivor) {
                    if state[neighbor.index()] == RegionState::Settled {
                        state[neighbor.index()] = RegionState::Active;
                        next.push(neighbor);
                    }
                }
            }
            next.sort_unstable();

            debug!(
                "round {}: {} active, {} merged, {} regions left",
                hierarchy.rounds,
                active.len(),
                pairs.len(),
                store.live_count()
            );

            for &(id, _) in &best {
                choice[id.index()] = None;
            }
            active = next;
        }

        Ok(hierarchy)
    }

    fn find_best_partners(
        &self,
        active: &[RegionId],
        store: &RegionStore,
        graph: &AdjacencyGraph,
    ) -> Vec<(RegionId, Option<Candidate>)> {
        active
            .par_iter()
            .with_min_len(PARALLEL_MIN_LEN)
            .map(|&id| (id, self.best_partner(id, store, graph)))
            .collect()
    }

    // Cheapest finite-cost neighbor.
    fn best_partner(
        &self,
        id: RegionId,
        store: &RegionStore,
        graph: &AdjacencyGraph,
    ) -> Option<Candidate> {
        let region = store.get(id)?;
        graph
            .boundaries(id)
            .filter_map(|(partner, shared)| {
                let other = store.get(partner)?;
                let cost = self.cost.cost(region, other, shared);
                cost.is_finite().then_some(Candidate { partner, cost })
            })
            .min_by(Candidate::order)
    }

    fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }
}
