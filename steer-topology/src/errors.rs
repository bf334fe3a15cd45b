// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Errors raised while building or reconfiguring the topology.

use std::error::Error;
use std::fmt;

use steer_engine::types::{BlockId, NodeId, SimError, SimTimeNs};
use steer_routing::errors::RoutingError;

#[derive(Debug, Clone, PartialEq)]
pub enum TopologyError {
    InvalidMultiplicity {
        multiplicity: i64,
    },
    UnknownDevice {
        device: NodeId,
    },
    DuplicateDevice {
        device: NodeId,
    },
    DuplicatePort {
        device: NodeId,
        target_block: BlockId,
    },
    NotReconfigurable {
        device: NodeId,
    },
    OverlappingReconfiguration {
        device: NodeId,
        first_ns: SimTimeNs,
        second_ns: SimTimeNs,
    },
    ReconfigurationInProgress {
        device: NodeId,
    },
    NoReconfigurationInProgress {
        device: NodeId,
        target_block: BlockId,
    },
    UnknownTargetBlock {
        device: NodeId,
        target_block: BlockId,
    },
    StalePlanConflict {
        device: NodeId,
        fired_ns: SimTimeNs,
        replacement_ns: SimTimeNs,
    },
    NoUplink {
        device: NodeId,
        destination_block: BlockId,
    },
    InvalidPlan(String),
    Routing(RoutingError),
}

impl fmt::Display for TopologyError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::InvalidMultiplicity { multiplicity } => {
                write!(f, "invalid link multiplicity {multiplicity}")
            }
            Self::UnknownDevice { device } => write!(f, "unknown device {device}"),
            Self::DuplicateDevice { device } => write!(f, "device {device} already registered"),
            Self::DuplicatePort {
                device,
                target_block,
            } => write!(
                f,
                "device {device} already has a port to block {target_block}"
            ),
            Self::NotReconfigurable { device } => {
                write!(f, "device {device} is not reconfigurable")
            }
            Self::OverlappingReconfiguration {
                device,
                first_ns,
                second_ns,
            } => write!(
                f,
                "reconfigurations of device {device} at {first_ns}ns and {second_ns}ns overlap"
            ),
            Self::ReconfigurationInProgress { device } => write!(
                f,
                "device {device} cannot start a reconfiguration before the previous one completes"
            ),
            Self::NoReconfigurationInProgress {
                device,
                target_block,
            } => write!(
                f,
                "device {device} is not reconfiguring its port to block {target_block}"
            ),
            Self::UnknownTargetBlock {
                device,
                target_block,
            } => write!(f, "device {device} has no port to block {target_block}"),
            Self::StalePlanConflict {
                device,
                fired_ns,
                replacement_ns,
            } => write!(
                f,
                "device {device} was already reconfigured at {fired_ns}ns, cannot replace with {replacement_ns}ns"
            ),
            Self::NoUplink {
                device,
                destination_block,
            } => write!(
                f,
                "device {device} has no uplink towards block {destination_block}"
            ),
            Self::InvalidPlan(msg) => write!(f, "invalid reconfiguration plan: {msg}"),
            Self::Routing(e) => write!(f, "{e}"),
        }
    }
}

impl Error for TopologyError {}

impl From<RoutingError> for TopologyError {
    fn from(e: RoutingError) -> Self {
        Self::Routing(e)
    }
}

impl From<TopologyError> for SimError {
    fn from(e: TopologyError) -> Self {
        SimError(e.to_string())
    }
}
