// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Errors raised by routing operations.
//!
//! Every variant is a contract violation: the caller has either supplied
//! malformed data or asked for a routing decision in the wrong state. They
//! convert into a [`SimError`] so that an event handler can abort the run
//! with `?`.

use std::error::Error;
use std::fmt;

use steer_engine::types::{BlockId, NodeId, SimError};

use crate::encapsulation::RouteStateKind;

#[derive(Debug, Clone, PartialEq)]
pub enum RoutingError {
    DegeneratePath {
        num_nodes: usize,
    },
    SameSourceAndDestination {
        node: NodeId,
    },
    InvalidPathWeight {
        path: String,
        weight: f64,
    },
    MismatchedEndpoints {
        path: String,
        source: NodeId,
        destination: NodeId,
    },
    UnknownPath {
        path: String,
    },
    UnknownPair {
        source: NodeId,
        destination: NodeId,
    },
    EmptyTable {
        source: NodeId,
        destination: NodeId,
    },
    UnnormalizedTable {
        source: NodeId,
        destination: NodeId,
        sum: f64,
    },
    InvalidDraw {
        draw: f64,
        sum: f64,
    },
    RoutingDecisionAlreadyMade {
        state: RouteStateKind,
    },
    NotInValiantChosen {
        state: RouteStateKind,
    },
    AlreadyDelivered,
    NotDelivered {
        state: RouteStateKind,
    },
    UnresolvedValiantBlock,
    UnresolvedEntrySwitch,
    UnresolvedExitSwitch {
        valiant_block: BlockId,
    },
    NoCandidateBlock {
        source_block: BlockId,
        destination_block: BlockId,
    },
    NoPortBetweenBlocks {
        from: BlockId,
        to: BlockId,
    },
    InvalidValiantRange {
        lower: BlockId,
        upper: BlockId,
    },
    NoNextHop {
        node: NodeId,
    },
}

impl fmt::Display for RoutingError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::DegeneratePath { num_nodes } => {
                write!(f, "a path needs at least two nodes, got {num_nodes}")
            }
            Self::SameSourceAndDestination { node } => {
                write!(f, "source and destination are both {node}")
            }
            Self::InvalidPathWeight { path, weight } => {
                write!(f, "weight {weight} for path {path} is outside [0, 1]")
            }
            Self::MismatchedEndpoints {
                path,
                source,
                destination,
            } => write!(
                f,
                "path {path} does not run from {source} to {destination}"
            ),
            Self::UnknownPath { path } => write!(f, "path {path} is not in the table"),
            Self::UnknownPair {
                source,
                destination,
            } => write!(f, "no weights for pair ({source}, {destination})"),
            Self::EmptyTable {
                source,
                destination,
            } => write!(f, "weight table for ({source}, {destination}) is empty"),
            Self::UnnormalizedTable {
                source,
                destination,
                sum,
            } => write!(
                f,
                "weights for ({source}, {destination}) sum to {sum}, expected 1"
            ),
            Self::InvalidDraw { draw, sum } => {
                write!(f, "draw {draw} is outside [0, {sum})")
            }
            Self::RoutingDecisionAlreadyMade { state } => {
                write!(f, "routing decision already made ({state})")
            }
            Self::NotInValiantChosen { state } => {
                write!(f, "cannot enter valiant block from {state}")
            }
            Self::AlreadyDelivered => write!(f, "packet already delivered"),
            Self::NotDelivered { state } => {
                write!(f, "cannot unwrap a packet that is not delivered ({state})")
            }
            Self::UnresolvedValiantBlock => write!(f, "no valiant block has been selected"),
            Self::UnresolvedEntrySwitch => write!(f, "no entry switch has been selected"),
            Self::UnresolvedExitSwitch { valiant_block } => write!(
                f,
                "no exit switch has been selected in valiant block {valiant_block}"
            ),
            Self::NoCandidateBlock {
                source_block,
                destination_block,
            } => write!(
                f,
                "no valiant block available for {source_block} -> {destination_block}"
            ),
            Self::NoPortBetweenBlocks { from, to } => {
                write!(f, "no port from block {from} to block {to}")
            }
            Self::InvalidValiantRange { lower, upper } => {
                write!(f, "valiant range [{lower}, {upper}] is empty")
            }
            Self::NoNextHop { node } => write!(f, "no next hop available towards {node}"),
        }
    }
}

impl Error for RoutingError {}

impl From<RoutingError> for SimError {
    fn from(e: RoutingError) -> Self {
        SimError(e.to_string())
    }
}
