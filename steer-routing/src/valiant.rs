// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Oblivious detour selection.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use steer_engine::types::BlockId;

use crate::errors::RoutingError;

/// Picks a detour block uniformly from an inclusive range.
pub struct ValiantSelector {
    lower_incl: BlockId,
    upper_incl: BlockId,
    rng: StdRng,
}

impl ValiantSelector {
    pub fn new(lower_incl: BlockId, upper_incl: BlockId, seed: u64) -> Result<Self, RoutingError> {
        if lower_incl > upper_incl {
            return Err(RoutingError::InvalidValiantRange {
                lower: lower_incl,
                upper: upper_incl,
            });
        }
        Ok(Self {
            lower_incl,
            upper_incl,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    /// Choose a block in the range that is neither the source nor the
    /// destination block.
    pub fn select(
        &mut self,
        source_block: BlockId,
        destination_block: BlockId,
    ) -> Result<BlockId, RoutingError> {
        let candidates: Vec<BlockId> = (self.lower_incl..=self.upper_incl)
            .filter(|b| *b != source_block && *b != destination_block)
            .collect();
        if candidates.is_empty() {
            return Err(RoutingError::NoCandidateBlock {
                source_block,
                destination_block,
            });
        }
        Ok(candidates[self.rng.gen_range(0..candidates.len())])
    }

    #[must_use]
    pub fn range(&self) -> (BlockId, BlockId) {
        (self.lower_incl, self.upper_incl)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RouteMode {
    Ecmp,
    Valiant,
}

/// Small flows use ECMP. Flows of at least `threshold_bytes` are detoured.
#[derive(Clone, Copy, Debug)]
pub struct EcmpThenValiant {
    threshold_bytes: u64,
}

impl EcmpThenValiant {
    #[must_use]
    pub fn new(threshold_bytes: u64) -> Self {
        Self { threshold_bytes }
    }

    #[must_use]
    pub fn mode_for(&self, flow_bytes: u64) -> RouteMode {
        if flow_bytes >= self.threshold_bytes {
            RouteMode::Valiant
        } else {
            RouteMode::Ecmp
        }
    }

    #[must_use]
    pub fn threshold_bytes(&self) -> u64 {
        self.threshold_bytes
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn excludes_endpoints() {
        let mut selector = ValiantSelector::new(0, 4, 3).unwrap();
        let mut seen = HashSet::new();
        for _ in 0..200 {
            let b = selector.select(1, 3).unwrap();
            assert!(b != 1 && b != 3 && b <= 4);
            seen.insert(b);
        }
        assert_eq!(seen, HashSet::from([0, 2, 4]));
    }

    #[test]
    fn empty_candidates() {
        let mut selector = ValiantSelector::new(2, 3, 3).unwrap();
        assert_eq!(
            selector.select(2, 3),
            Err(RoutingError::NoCandidateBlock {
                source_block: 2,
                destination_block: 3
            })
        );
    }

    #[test]
    fn bad_range() {
        assert!(matches!(
            ValiantSelector::new(5, 4, 0),
            Err(RoutingError::InvalidValiantRange { lower: 5, upper: 4 })
        ));
    }

    #[test]
    fn threshold_switches_mode() {
        let policy = EcmpThenValiant::new(1_000_000);
        assert_eq!(policy.mode_for(999_999), RouteMode::Ecmp);
        assert_eq!(policy.mode_for(1_000_000), RouteMode::Valiant);
        assert_eq!(policy.mode_for(u64::MAX), RouteMode::Valiant);
    }
}
