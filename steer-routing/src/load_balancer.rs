// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Choosing one path from a [`PathWeightTable`].
//!
//! Two strategies are provided:
//!  - [`StatelessLoadBalancer`]: an independent weighted random draw for
//!    every decision.
//!  - [`StatefulLoadBalancer`]: a deterministic choice that tracks how much
//!    traffic each path has carried relative to its weight.

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use steer_engine::types::NodeId;

use crate::errors::RoutingError;
use crate::path::Path;
use crate::weights::PathWeightTable;

/// Seed used by the load balancers when none is configured.
pub const DEFAULT_SEED: u64 = 1037658;

pub trait LoadBalancer {
    /// Pick the path to use for the next unit of traffic.
    fn choose_path(&mut self, table: &PathWeightTable) -> Result<Path, RoutingError>;

    /// Record that `size_bits` were sent along `path`.
    fn log_path_taken(&mut self, path: &Path, size_bits: u64) -> Result<(), RoutingError>;

    /// Forget any state derived from previous weights and start again from
    /// `table`.
    fn reset(&mut self, table: &PathWeightTable);
}

pub struct StatelessLoadBalancer {
    rng: StdRng,
}

impl StatelessLoadBalancer {
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for StatelessLoadBalancer {
    fn default() -> Self {
        Self::new(DEFAULT_SEED)
    }
}

impl LoadBalancer for StatelessLoadBalancer {
    fn choose_path(&mut self, table: &PathWeightTable) -> Result<Path, RoutingError> {
        if table.is_empty() {
            return Err(RoutingError::EmptyTable {
                source: table.source(),
                destination: table.destination(),
            });
        }
        let sum = table.sum_weights();
        if sum <= 0.0 {
            return Err(RoutingError::UnnormalizedTable {
                source: table.source(),
                destination: table.destination(),
                sum,
            });
        }
        let draw = self.rng.gen_range(0.0..sum);
        table.select_path(draw).cloned()
    }

    fn log_path_taken(&mut self, _path: &Path, _size_bits: u64) -> Result<(), RoutingError> {
        Ok(())
    }

    fn reset(&mut self, _table: &PathWeightTable) {}
}

struct PathScore {
    path: Path,
    weight: f64,
    score: f64,
}

/// Sends each unit of traffic on the path that is furthest behind its share.
///
/// Every path starts with a score equal to its weight. Sending `size` bits
/// along a path lowers its score by `(1 - w) * size` and raises every other
/// path's score by its own `w * size`. Ties go to the first path in table
/// order. Scores start again whenever the table's paths or weights no longer
/// match the ones the scores were built from.
#[derive(Default)]
pub struct StatefulLoadBalancer {
    scores: HashMap<(NodeId, NodeId), Vec<PathScore>>,
}

impl StatefulLoadBalancer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn init_scores(table: &PathWeightTable) -> Vec<PathScore> {
        table
            .all_paths_and_weights()
            .map(|(path, weight)| PathScore {
                path: path.clone(),
                weight,
                score: weight,
            })
            .collect()
    }

    fn built_from(scores: &[PathScore], table: &PathWeightTable) -> bool {
        scores.len() == table.len()
            && scores
                .iter()
                .all(|s| table.weight_of(&s.path).is_ok_and(|w| w == s.weight))
    }

    /// Current score of `path`.
    pub fn score_of(&self, path: &Path) -> Result<f64, RoutingError> {
        self.scores
            .get(&(path.source(), path.destination()))
            .and_then(|scores| scores.iter().find(|s| &s.path == path))
            .map(|s| s.score)
            .ok_or_else(|| RoutingError::UnknownPath {
                path: path.to_string(),
            })
    }
}

impl LoadBalancer for StatefulLoadBalancer {
    fn choose_path(&mut self, table: &PathWeightTable) -> Result<Path, RoutingError> {
        let scores = self
            .scores
            .entry((table.source(), table.destination()))
            .or_insert_with(|| Self::init_scores(table));
        if !Self::built_from(scores, table) {
            *scores = Self::init_scores(table);
        }

        let mut best: Option<&PathScore> = None;
        for candidate in scores.iter() {
            if best.is_none_or(|b| candidate.score > b.score) {
                best = Some(candidate);
            }
        }
        best.map(|b| b.path.clone())
            .ok_or(RoutingError::EmptyTable {
                source: table.source(),
                destination: table.destination(),
            })
    }

    fn log_path_taken(&mut self, path: &Path, size_bits: u64) -> Result<(), RoutingError> {
        let unknown = || RoutingError::UnknownPath {
            path: path.to_string(),
        };
        let scores = self
            .scores
            .get_mut(&(path.source(), path.destination()))
            .ok_or_else(unknown)?;
        if !scores.iter().any(|s| &s.path == path) {
            return Err(unknown());
        }

        let size = size_bits as f64;
        for s in scores.iter_mut() {
            if &s.path == path {
                s.score -= (1.0 - s.weight) * size;
            } else {
                s.score += s.weight * size;
            }
        }
        Ok(())
    }

    fn reset(&mut self, table: &PathWeightTable) {
        self.scores.insert(
            (table.source(), table.destination()),
            Self::init_scores(table),
        );
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn path(nodes: &[NodeId]) -> Path {
        Path::new(nodes.to_vec()).unwrap()
    }

    fn table(weights: &[(&[NodeId], f64)]) -> PathWeightTable {
        let first = weights[0].0;
        let mut table = PathWeightTable::new(first[0], first[first.len() - 1]).unwrap();
        for (nodes, w) in weights {
            table.update_weight(path(nodes), *w).unwrap();
        }
        table
    }

    #[test]
    fn stateless_is_reproducible() {
        let t = table(&[(&[1, 2, 5], 0.5), (&[1, 3, 5], 0.3), (&[1, 4, 5], 0.2)]);

        let mut a = StatelessLoadBalancer::new(42);
        let mut b = StatelessLoadBalancer::new(42);
        for _ in 0..50 {
            assert_eq!(a.choose_path(&t).unwrap(), b.choose_path(&t).unwrap());
        }
    }

    #[test]
    fn stateless_follows_weights() {
        let t = table(&[(&[1, 2, 5], 0.8), (&[1, 3, 5], 0.2)]);
        let mut balancer = StatelessLoadBalancer::default();

        let mut first = 0;
        let n = 10_000;
        for _ in 0..n {
            if balancer.choose_path(&t).unwrap() == path(&[1, 2, 5]) {
                first += 1;
            }
        }
        let share = first as f64 / n as f64;
        assert!((0.75..0.85).contains(&share), "share was {share}");
    }

    #[test]
    fn stateless_never_picks_zero_weight() {
        let t = table(&[(&[1, 2, 5], 0.0), (&[1, 3, 5], 1.0)]);
        let mut balancer = StatelessLoadBalancer::default();
        for _ in 0..100 {
            assert_eq!(balancer.choose_path(&t).unwrap(), path(&[1, 3, 5]));
        }
    }

    #[test]
    fn stateless_empty_table() {
        let t = PathWeightTable::new(1, 5).unwrap();
        let mut balancer = StatelessLoadBalancer::default();
        assert!(matches!(
            balancer.choose_path(&t),
            Err(RoutingError::EmptyTable { .. })
        ));
    }

    #[test]
    fn stateful_tracks_shares() {
        let t = table(&[(&[1, 2, 5], 0.75), (&[1, 3, 5], 0.25)]);
        let mut balancer = StatefulLoadBalancer::new();

        let mut taken = Vec::new();
        for _ in 0..4 {
            let p = balancer.choose_path(&t).unwrap();
            balancer.log_path_taken(&p, 100).unwrap();
            taken.push(p.intermediate());
        }
        // Three units on the heavy path for each unit on the light one
        assert_eq!(taken.iter().filter(|n| **n == 2).count(), 3);
        assert_eq!(taken.iter().filter(|n| **n == 3).count(), 1);
    }

    #[test]
    fn stateful_score_updates() {
        let t = table(&[(&[1, 2, 5], 0.6), (&[1, 3, 5], 0.4)]);
        let mut balancer = StatefulLoadBalancer::new();

        let p = balancer.choose_path(&t).unwrap();
        assert_eq!(p, path(&[1, 2, 5]));
        balancer.log_path_taken(&p, 10).unwrap();

        assert_relative_eq!(balancer.score_of(&path(&[1, 2, 5])).unwrap(), 0.6 - 4.0);
        assert_relative_eq!(balancer.score_of(&path(&[1, 3, 5])).unwrap(), 0.4 + 4.0);

        balancer.reset(&t);
        assert_relative_eq!(balancer.score_of(&path(&[1, 2, 5])).unwrap(), 0.6);
    }

    #[test]
    fn stateful_tie_goes_to_first() {
        let t = table(&[(&[1, 3, 5], 0.5), (&[1, 2, 5], 0.5)]);
        let mut balancer = StatefulLoadBalancer::new();
        assert_eq!(balancer.choose_path(&t).unwrap(), path(&[1, 3, 5]));
    }

    #[test]
    fn stateful_unknown_path() {
        let t = table(&[(&[1, 2, 5], 1.0)]);
        let mut balancer = StatefulLoadBalancer::new();
        balancer.choose_path(&t).unwrap();
        assert!(matches!(
            balancer.log_path_taken(&path(&[1, 4, 5]), 10),
            Err(RoutingError::UnknownPath { .. })
        ));
    }

    #[test]
    fn stateful_follows_reloaded_table() {
        let old = table(&[(&[1, 2, 5], 0.6), (&[1, 3, 5], 0.4)]);
        let mut balancer = StatefulLoadBalancer::new();
        let p = balancer.choose_path(&old).unwrap();
        balancer.log_path_taken(&p, 10).unwrap();

        // Reloaded without a reset: the old paths are gone
        let new = table(&[(&[1, 4, 5], 1.0)]);
        assert_eq!(balancer.choose_path(&new).unwrap(), path(&[1, 4, 5]));
        assert_relative_eq!(balancer.score_of(&path(&[1, 4, 5])).unwrap(), 1.0);
        assert!(balancer.score_of(&path(&[1, 2, 5])).is_err());

        // Same paths with new weights also start again
        let reweighted = table(&[(&[1, 4, 5], 0.5), (&[1, 2, 5], 0.5)]);
        assert_eq!(balancer.choose_path(&reweighted).unwrap(), path(&[1, 4, 5]));
        assert_relative_eq!(balancer.score_of(&path(&[1, 2, 5])).unwrap(), 0.5);
    }
}
