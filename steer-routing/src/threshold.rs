// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Threshold routing: keep traffic on the direct next hop up to a configured
//! rate and spread the excess over ECMP next hops.

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use steer_engine::types::{FlowId, NodeId, SimTimeNs};

use crate::errors::RoutingError;

/// Interval at which tokens are added to a [`TokenBucket`].
pub const REFILL_PERIOD_NS: SimTimeNs = 1000;

/// A token bucket measured in bits.
///
/// Tokens are added in whole refill periods. The bucket starts holding one
/// period's worth and holds at most two.
#[derive(Debug)]
pub struct TokenBucket {
    capacity_bits: u64,
    tokens_bits: u64,
    refill_bits: u64,
    last_refill_ns: SimTimeNs,
}

impl TokenBucket {
    #[must_use]
    pub fn new(rate_bit_per_ns: f64) -> Self {
        let refill_bits = (rate_bit_per_ns * REFILL_PERIOD_NS as f64) as u64;
        Self {
            capacity_bits: 2 * refill_bits,
            tokens_bits: refill_bits,
            refill_bits,
            last_refill_ns: 0,
        }
    }

    fn refill(&mut self, now_ns: SimTimeNs) {
        let periods = now_ns.saturating_sub(self.last_refill_ns) / REFILL_PERIOD_NS;
        if periods > 0 {
            self.tokens_bits = self
                .tokens_bits
                .saturating_add(periods.saturating_mul(self.refill_bits))
                .min(self.capacity_bits);
            self.last_refill_ns += periods * REFILL_PERIOD_NS;
        }
    }

    /// Remove `size_bits` tokens if enough are available at `now_ns`.
    pub fn try_consume(&mut self, size_bits: u64, now_ns: SimTimeNs) -> bool {
        self.refill(now_ns);
        if self.tokens_bits >= size_bits {
            self.tokens_bits -= size_bits;
            true
        } else {
            false
        }
    }

    #[must_use]
    pub fn tokens_bits(&self) -> u64 {
        self.tokens_bits
    }

    #[must_use]
    pub fn capacity_bits(&self) -> u64 {
        self.capacity_bits
    }
}

pub struct ThresholdRouter {
    bucket: TokenBucket,
    direct_next_hop: NodeId,
    ecmp_next_hops: Vec<NodeId>,
    flow_next_hop: HashMap<FlowId, NodeId>,
    rng: StdRng,
}

impl ThresholdRouter {
    pub fn new(
        rate_bit_per_ns: f64,
        direct_next_hop: NodeId,
        ecmp_next_hops: Vec<NodeId>,
        seed: u64,
    ) -> Result<Self, RoutingError> {
        if ecmp_next_hops.is_empty() {
            return Err(RoutingError::NoNextHop {
                node: direct_next_hop,
            });
        }
        Ok(Self {
            bucket: TokenBucket::new(rate_bit_per_ns),
            direct_next_hop,
            ecmp_next_hops,
            flow_next_hop: HashMap::new(),
            rng: StdRng::seed_from_u64(seed),
        })
    }

    /// Next hop for a packet of `size_bits` belonging to `flow`.
    ///
    /// Packets that fit in the bucket take the direct next hop. Others follow
    /// the ECMP next hop their flow was first assigned.
    pub fn next_hop(&mut self, flow: FlowId, size_bits: u64, now_ns: SimTimeNs) -> NodeId {
        if self.bucket.try_consume(size_bits, now_ns) {
            return self.direct_next_hop;
        }

        let ecmp_next_hops = &self.ecmp_next_hops;
        let rng = &mut self.rng;
        *self
            .flow_next_hop
            .entry(flow)
            .or_insert_with(|| ecmp_next_hops[rng.gen_range(0..ecmp_next_hops.len())])
    }

    #[must_use]
    pub fn bucket(&self) -> &TokenBucket {
        &self.bucket
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucket_refills_per_period() {
        // 1 bit/ns => 1000 bits per period, capacity 2000
        let mut bucket = TokenBucket::new(1.0);
        assert_eq!(bucket.tokens_bits(), 1000);
        assert_eq!(bucket.capacity_bits(), 2000);

        assert!(bucket.try_consume(800, 0));
        assert!(!bucket.try_consume(800, 999));
        assert!(bucket.try_consume(800, 1000));
        assert_eq!(bucket.tokens_bits(), 400);

        // Long idle time only fills to capacity
        assert!(bucket.try_consume(2000, 50_000));
        assert!(!bucket.try_consume(1, 50_500));
    }

    #[test]
    fn overflow_goes_to_sticky_ecmp() {
        let mut router = ThresholdRouter::new(1.0, 100, vec![200, 201, 202], 7).unwrap();

        assert_eq!(router.next_hop(1, 1000, 0), 100);

        let first = router.next_hop(1, 1000, 10);
        assert_ne!(first, 100);
        for t in 20..30 {
            assert_eq!(router.next_hop(1, 1000, t), first);
        }

        // Next period the direct hop is available again
        assert_eq!(router.next_hop(1, 1000, 1000), 100);
    }

    #[test]
    fn needs_ecmp_hops() {
        assert!(matches!(
            ThresholdRouter::new(1.0, 100, vec![], 7),
            Err(RoutingError::NoNextHop { node: 100 })
        ));
    }
}
