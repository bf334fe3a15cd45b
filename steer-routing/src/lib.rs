// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

#![doc(test(attr(warn(unused))))]

//! Routing decisions for the STEER simulator.
//!
//! Two families of strategy are supported:
//!
//!  - Weighted multi-path (WCMP): the [weights](crate::weights) of every
//!    path between a pair of nodes are held in a
//!    [`PathWeightTable`](crate::weights::PathWeightTable), owned by a
//!    [`WeightRegistry`](crate::registry::WeightRegistry) that is reloaded
//!    by replacement. A [load balancer](crate::load_balancer) picks one path
//!    and the [flow cache](crate::flow_cache) keeps each flow on it.
//!  - Block-adaptive (UGAL): a packet is wrapped in an
//!    [`AdaptiveRouteEncapsulation`](crate::encapsulation::AdaptiveRouteEncapsulation)
//!    that records whether it takes the direct inter-block path or a detour
//!    through another block. See [`ugal`](crate::ugal).
//!
//! [Threshold routing](crate::threshold) and oblivious
//! [valiant](crate::valiant) detours are also provided.

pub mod encapsulation;
pub mod errors;
pub mod flow_cache;
pub mod load_balancer;
pub mod path;
pub mod registry;
pub mod test_helpers;
pub mod threshold;
pub mod ugal;
pub mod valiant;
pub mod weights;
