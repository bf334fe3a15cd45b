// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! An ordered sequence of nodes from a source to a destination.
//!
//! Two paths are equal, and hash the same, exactly when their node sequences
//! are element-wise identical. This makes a [`Path`] safe to use as a map key
//! across reloads of the weights that refer to it.
//!
//! ```rust
//! use steer_routing::path::Path;
//!
//! let path = Path::new(vec![1, 2, 5]).unwrap();
//! assert_eq!(path.length(), 2);
//! assert_eq!(path.source(), 1);
//! assert_eq!(path.destination(), 5);
//! assert_eq!(path.to_string(), "1->2->5");
//! ```

use std::fmt;

use itertools::Itertools;
use steer_engine::types::NodeId;

use crate::errors::RoutingError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Path {
    nodes: Vec<NodeId>,
}

impl Path {
    /// Create a path; at least two nodes are required.
    pub fn new(nodes: Vec<NodeId>) -> Result<Self, RoutingError> {
        if nodes.len() < 2 {
            return Err(RoutingError::DegeneratePath {
                num_nodes: nodes.len(),
            });
        }
        Ok(Self { nodes })
    }

    /// Number of hops.
    #[must_use]
    pub fn length(&self) -> usize {
        self.nodes.len() - 1
    }

    #[must_use]
    pub fn source(&self) -> NodeId {
        self.nodes[0]
    }

    #[must_use]
    pub fn destination(&self) -> NodeId {
        self.nodes[self.nodes.len() - 1]
    }

    #[must_use]
    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    /// The node following `node`, if `node` is on the path and is not the
    /// destination.
    #[must_use]
    pub fn next_hop_after(&self, node: NodeId) -> Option<NodeId> {
        self.nodes
            .iter()
            .position(|n| *n == node)
            .and_then(|i| self.nodes.get(i + 1).copied())
    }

    /// The node traffic is sent to first: the destination itself for a
    /// direct path, otherwise the second node.
    #[must_use]
    pub fn intermediate(&self) -> NodeId {
        self.nodes[1]
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains(&node)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.nodes.iter().join("->"))
    }
}
