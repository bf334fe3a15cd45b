// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! The routing strategy selected by [`RoutingKind`].

use std::fmt::Display;

use steer_engine::sim_error;
use steer_engine::types::{FlowId, NodeId, SimError};
use steer_routing::flow_cache::FlowRouteCache;
use steer_routing::load_balancer::LoadBalancer;
use steer_routing::path::Path;
use steer_routing::threshold::ThresholdRouter;
use steer_routing::ugal::{UgalGlobal, UgalLocal};
use steer_routing::valiant::{EcmpThenValiant, ValiantSelector};
use steer_routing::weights::PathWeightTable;

use crate::types::RoutingKind;

pub enum RoutingStrategy {
    /// Each flow sticks to the path the balancer first picks for it.
    Wcmp {
        flows: FlowRouteCache,
        balancer: Box<dyn LoadBalancer>,
    },

    /// Rate-limited direct hops with sticky ECMP overflow. Routers are made
    /// per switch because the next hops are local to it.
    Threshold { rate_bit_per_ns: f64, seed: u64 },

    /// Reconfigurable switches pick intermediate blocks from their
    /// inter-block weights.
    ReconfigurablePod,

    /// Large flows detour through a random block.
    BlockValiant {
        selector: ValiantSelector,
        mode: EcmpThenValiant,
    },

    BlockUgalG(UgalGlobal),

    BlockUgalL(UgalLocal),
}

impl RoutingStrategy {
    #[must_use]
    pub fn kind(&self) -> RoutingKind {
        match self {
            Self::Wcmp { .. } => RoutingKind::Wcmp,
            Self::Threshold { .. } => RoutingKind::Threshold,
            Self::ReconfigurablePod => RoutingKind::ReconfigurablePod,
            Self::BlockValiant { .. } => RoutingKind::BlockValiant,
            Self::BlockUgalG(_) => RoutingKind::BlockUgalG,
            Self::BlockUgalL(_) => RoutingKind::BlockUgalL,
        }
    }

    /// Path for `flow` under WCMP routing.
    pub fn wcmp_route(
        &mut self,
        flow: FlowId,
        table: &PathWeightTable,
    ) -> Result<Path, SimError> {
        match self {
            Self::Wcmp { flows, balancer } => {
                Ok(flows.route(flow, table, balancer.as_mut())?.clone())
            }
            _ => sim_error!(format!("wcmp routing is not in use, routing is {}", self.kind())),
        }
    }

    /// Build the threshold router of a switch with the given next hops.
    pub fn threshold_router(
        &self,
        direct_next_hop: NodeId,
        ecmp_next_hops: Vec<NodeId>,
    ) -> Result<ThresholdRouter, SimError> {
        match self {
            Self::Threshold {
                rate_bit_per_ns,
                seed,
            } => Ok(ThresholdRouter::new(
                *rate_bit_per_ns,
                direct_next_hop,
                ecmp_next_hops,
                *seed,
            )?),
            _ => sim_error!(format!(
                "threshold routing is not in use, routing is {}",
                self.kind()
            )),
        }
    }
}

impl Display for RoutingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Wcmp => "wcmp",
            Self::Threshold => "threshold",
            Self::ReconfigurablePod => "reconfigurable-pod",
            Self::BlockValiant => "block-valiant",
            Self::BlockUgalG => "block-ugal-g",
            Self::BlockUgalL => "block-ugal-l",
        };
        write!(f, "{name}")
    }
}
