// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Split weights for the paths between one ordered (source, destination)
//! pair.
//!
//! The table does not renormalize. Callers update every path and then check
//! [`PathWeightTable::sum_weights`] before using the table to split traffic.
//! Paths are kept in insertion order so that a weighted draw maps to the
//! same path on every run with the same seed.
//!
//! ```rust
//! use steer_routing::path::Path;
//! use steer_routing::weights::PathWeightTable;
//!
//! let mut table = PathWeightTable::new(1, 5).unwrap();
//! let p_a = Path::new(vec![1, 2, 5]).unwrap();
//! let p_b = Path::new(vec![1, 3, 5]).unwrap();
//! table.update_weight(p_a.clone(), 0.6).unwrap();
//! table.update_weight(p_b.clone(), 0.4).unwrap();
//!
//! assert!((table.sum_weights() - 1.0).abs() < 1e-9);
//! assert_eq!(table.select_path(0.5).unwrap(), &p_a);
//! assert_eq!(table.select_path(0.7).unwrap(), &p_b);
//! ```

use std::collections::HashMap;

use steer_engine::types::NodeId;

use crate::errors::RoutingError;
use crate::path::Path;

#[derive(Clone, Debug)]
pub struct PathWeightTable {
    source: NodeId,
    destination: NodeId,
    entries: Vec<(Path, f64)>,
    index: HashMap<Path, usize>,
}

impl PathWeightTable {
    pub fn new(source: NodeId, destination: NodeId) -> Result<Self, RoutingError> {
        if source == destination {
            return Err(RoutingError::SameSourceAndDestination { node: source });
        }
        Ok(Self {
            source,
            destination,
            entries: Vec::new(),
            index: HashMap::new(),
        })
    }

    #[must_use]
    pub fn source(&self) -> NodeId {
        self.source
    }

    #[must_use]
    pub fn destination(&self) -> NodeId {
        self.destination
    }

    /// Insert or overwrite the weight of `path`.
    pub fn update_weight(&mut self, path: Path, weight: f64) -> Result<(), RoutingError> {
        if !(0.0..=1.0).contains(&weight) {
            return Err(RoutingError::InvalidPathWeight {
                path: path.to_string(),
                weight,
            });
        }
        if path.source() != self.source || path.destination() != self.destination {
            return Err(RoutingError::MismatchedEndpoints {
                path: path.to_string(),
                source: self.source,
                destination: self.destination,
            });
        }

        match self.index.get(&path) {
            Some(&i) => self.entries[i].1 = weight,
            None => {
                self.index.insert(path.clone(), self.entries.len());
                self.entries.push((path, weight));
            }
        }
        Ok(())
    }

    /// Strict lookup: a path that is not in the table is an error.
    pub fn weight_of(&self, path: &Path) -> Result<f64, RoutingError> {
        self.index
            .get(path)
            .map(|&i| self.entries[i].1)
            .ok_or_else(|| RoutingError::UnknownPath {
                path: path.to_string(),
            })
    }

    #[must_use]
    pub fn contains(&self, path: &Path) -> bool {
        self.index.contains_key(path)
    }

    #[must_use]
    pub fn sum_weights(&self) -> f64 {
        self.entries.iter().map(|(_, w)| w).sum()
    }

    /// Whether the weights sum to one within `tolerance`.
    #[must_use]
    pub fn is_normalized(&self, tolerance: f64) -> bool {
        (self.sum_weights() - 1.0).abs() <= tolerance
    }

    /// All paths with their weights, in insertion order.
    pub fn all_paths_and_weights(&self) -> impl Iterator<Item = (&Path, f64)> {
        self.entries.iter().map(|(p, w)| (p, *w))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove every path. The (source, destination) pair is kept.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
    }

    /// Map a draw in `[0, sum_weights())` onto one path by cumulative-weight
    /// partitioning in insertion order.
    ///
    /// The last path is returned if floating-point rounding pushes the draw
    /// beyond the final boundary.
    pub fn select_path(&self, draw: f64) -> Result<&Path, RoutingError> {
        let Some((last, _)) = self.entries.last() else {
            return Err(RoutingError::EmptyTable {
                source: self.source,
                destination: self.destination,
            });
        };

        let sum = self.sum_weights();
        if !(0.0..sum).contains(&draw) {
            return Err(RoutingError::InvalidDraw { draw, sum });
        }

        let mut cumulative = 0.0;
        for (path, weight) in &self.entries {
            cumulative += weight;
            if cumulative > draw {
                return Ok(path);
            }
        }
        Ok(last)
    }
}
