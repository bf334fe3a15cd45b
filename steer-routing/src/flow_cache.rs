// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Per-flow path stickiness for WCMP.
//!
//! The first packet of a flow chooses a path with a [`LoadBalancer`] and
//! later packets of the same flow reuse it, so that a flow is never
//! reordered across paths.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use steer_engine::types::FlowId;

use crate::errors::RoutingError;
use crate::load_balancer::LoadBalancer;
use crate::path::Path;
use crate::weights::PathWeightTable;

#[derive(Default)]
pub struct FlowRouteCache {
    routes: HashMap<FlowId, Path>,
}

impl FlowRouteCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the path for `flow`, choosing one from `table` if the flow has
    /// not been seen before.
    pub fn route(
        &mut self,
        flow: FlowId,
        table: &PathWeightTable,
        balancer: &mut dyn LoadBalancer,
    ) -> Result<&Path, RoutingError> {
        match self.routes.entry(flow) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => Ok(entry.insert(balancer.choose_path(table)?)),
        }
    }

    #[must_use]
    pub fn cached(&self, flow: FlowId) -> Option<&Path> {
        self.routes.get(&flow)
    }

    /// Forget a finished flow.
    pub fn remove(&mut self, flow: FlowId) -> Option<Path> {
        self.routes.remove(&flow)
    }

    /// Forget every flow, e.g. after new weights are installed.
    pub fn invalidate(&mut self) {
        self.routes.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
