// Copyright (c) 2023 Graphcore Ltd. All rights reserved.

//! A set of common traits used across the STEER crates.

use std::fmt::{Debug, Display};

use crate::simulator::Simulator;
use crate::types::{FlowId, NodeId, SimResult};

/// The `TotalBits` trait is used to determine how many bits an object
/// represents on the wire.
pub trait TotalBits {
    fn total_bits(&self) -> u64;
}

/// ECN-style congestion signalling carried by a packet.
pub trait CongestionMarked {
    /// Record that the packet passed a congested queue.
    fn mark_congestion_encountered(&mut self);

    /// Whether any queue along the way marked this packet.
    fn congestion_encountered(&self) -> bool;
}

/// A transport-layer packet as seen by the routing layer.
///
///  - Debug:             Allows "{:?}" in log messages.
///  - TotalBits:         Allows size accounting of encapsulations.
///  - CongestionMarked:  Allows congestion to be forwarded to the payload.
pub trait FlowPacket: Debug + TotalBits + CongestionMarked {
    fn flow_id(&self) -> FlowId;
    fn source_id(&self) -> NodeId;
    fn destination_id(&self) -> NodeId;
}

/// An occurrence at a point in simulated time.
///
/// The [`Simulator`] owns the event until it fires, at which point `trigger`
/// consumes it. Handlers may register further events through the simulator
/// they are given.
pub trait Event: Display {
    fn trigger(self: Box<Self>, simulator: &Simulator) -> SimResult;
}
