// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! The reconfigurable part of the network.
//!
//! Switches own one [`ReconfigurablePort`](port::ReconfigurablePort) per
//! remote block. The number of parallel links behind each port can change
//! during a run. A [`ReconfigurationPlanner`](reconfiguration::ReconfigurationPlanner)
//! registers the changes with the simulator ahead of time and the switches
//! apply them when the events fire.

#![doc(test(attr(warn(unused))))]

pub mod device;
pub mod errors;
pub mod link;
pub mod port;
pub mod reconfiguration;
pub mod switch;
