// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Ownership of all [`PathWeightTable`]s, keyed by (source, destination).
//!
//! A reload never edits live tables. A complete [`WeightRegistry`] is built
//! off to the side from already-parsed tuples, validated, and then swapped in
//! with [`RoutingWeights::install`]. Anyone holding a
//! [`snapshot`](RoutingWeights::snapshot) keeps a consistent view.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use steer_engine::types::{BlockId, NodeId};
use steer_track::entity::Entity;
use steer_track::{debug, trace};

use crate::errors::RoutingError;
use crate::path::Path;
use crate::weights::PathWeightTable;

/// Default tolerance when checking that a table sums to one.
pub const DEFAULT_WEIGHT_TOLERANCE: f64 = 1e-6;

/// One already-parsed `(source, destination, path, weight)` entry.
#[derive(Clone, Debug, PartialEq)]
pub struct WeightTuple {
    pub source: NodeId,
    pub destination: NodeId,
    pub path: Vec<NodeId>,
    pub weight: f64,
}

/// One already-parsed block-level entry. An `intermediate` equal to
/// `destination` denotes the direct path.
#[derive(Clone, Debug, PartialEq)]
pub struct BlockWeightTuple {
    pub source: BlockId,
    pub destination: BlockId,
    pub intermediate: BlockId,
    pub weight: f64,
}

#[derive(Clone, Debug, Default)]
pub struct WeightRegistry {
    tables: HashMap<(NodeId, NodeId), PathWeightTable>,
}

impl WeightRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build every table from `tuples` and check that each one is normalized.
    pub fn from_tuples(
        tuples: impl IntoIterator<Item = WeightTuple>,
        tolerance: f64,
    ) -> Result<Self, RoutingError> {
        let mut registry = Self::new();
        for tuple in tuples {
            if tuple.path.len() >= 2
                && (tuple.path[0] != tuple.source
                    || tuple.path[tuple.path.len() - 1] != tuple.destination)
            {
                return Err(RoutingError::MismatchedEndpoints {
                    path: Path::new(tuple.path)?.to_string(),
                    source: tuple.source,
                    destination: tuple.destination,
                });
            }
            let path = Path::new(tuple.path)?;
            registry
                .table_mut(tuple.source, tuple.destination)?
                .update_weight(path, tuple.weight)?;
        }
        registry.validate(tolerance)?;
        Ok(registry)
    }

    /// Return the table for a pair, creating an empty one if needed.
    pub fn table_mut(
        &mut self,
        source: NodeId,
        destination: NodeId,
    ) -> Result<&mut PathWeightTable, RoutingError> {
        if source == destination {
            return Err(RoutingError::SameSourceAndDestination { node: source });
        }
        Ok(self
            .tables
            .entry((source, destination))
            .or_insert(PathWeightTable::new(source, destination)?))
    }

    pub fn table(
        &self,
        source: NodeId,
        destination: NodeId,
    ) -> Result<&PathWeightTable, RoutingError> {
        self.tables
            .get(&(source, destination))
            .ok_or(RoutingError::UnknownPair {
                source,
                destination,
            })
    }

    /// Check that every table sums to one within `tolerance`.
    pub fn validate(&self, tolerance: f64) -> Result<(), RoutingError> {
        // Report the smallest failing pair so the error is reproducible
        let mut pairs: Vec<_> = self.tables.keys().copied().collect();
        pairs.sort_unstable();
        for pair in pairs {
            let table = &self.tables[&pair];
            if !table.is_normalized(tolerance) {
                return Err(RoutingError::UnnormalizedTable {
                    source: pair.0,
                    destination: pair.1,
                    sum: table.sum_weights(),
                });
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn contains_pair(&self, source: NodeId, destination: NodeId) -> bool {
        self.tables.contains_key(&(source, destination))
    }

    #[must_use]
    pub fn num_pairs(&self) -> usize {
        self.tables.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

/// Block-level weights used to pick an intermediate block.
#[derive(Clone, Debug, Default)]
pub struct InterBlockWeights {
    registry: WeightRegistry,
}

impl InterBlockWeights {
    pub fn from_block_tuples(
        tuples: impl IntoIterator<Item = BlockWeightTuple>,
        tolerance: f64,
    ) -> Result<Self, RoutingError> {
        let path_tuples = tuples.into_iter().map(|t| {
            let path = if t.intermediate == t.destination {
                vec![t.source, t.destination]
            } else {
                vec![t.source, t.intermediate, t.destination]
            };
            WeightTuple {
                source: t.source,
                destination: t.destination,
                path,
                weight: t.weight,
            }
        });
        Ok(Self {
            registry: WeightRegistry::from_tuples(path_tuples, tolerance)?,
        })
    }

    pub fn table(
        &self,
        source_block: BlockId,
        destination_block: BlockId,
    ) -> Result<&PathWeightTable, RoutingError> {
        self.registry.table(source_block, destination_block)
    }

    /// The first-hop block of each path with its weight, in table order.
    pub fn intermediate_candidates(
        &self,
        source_block: BlockId,
        destination_block: BlockId,
    ) -> Result<Vec<(BlockId, f64)>, RoutingError> {
        Ok(self
            .table(source_block, destination_block)?
            .all_paths_and_weights()
            .map(|(p, w)| (p.intermediate(), w))
            .collect())
    }

    #[must_use]
    pub fn num_pairs(&self) -> usize {
        self.registry.num_pairs()
    }
}

/// The live routing weights shared by every reader.
pub struct RoutingWeights {
    entity: Rc<Entity>,
    current: RefCell<Rc<WeightRegistry>>,
    generation: Cell<u64>,
}

impl RoutingWeights {
    #[must_use]
    pub fn new(parent: &Rc<Entity>, name: &str, initial: WeightRegistry) -> Self {
        Self {
            entity: parent.child(name),
            current: RefCell::new(Rc::new(initial)),
            generation: Cell::new(0),
        }
    }

    /// Replace every table at once.
    pub fn install(&self, registry: WeightRegistry) {
        debug!(self.entity ; "install {} weight tables", registry.num_pairs());
        *self.current.borrow_mut() = Rc::new(registry);
        self.generation.set(self.generation.get() + 1);
    }

    /// The registry as it is now. Later installs do not affect it.
    #[must_use]
    pub fn snapshot(&self) -> Rc<WeightRegistry> {
        trace!(self.entity ; "snapshot generation {}", self.generation());
        self.current.borrow().clone()
    }

    /// Number of installs since creation.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation.get()
    }
}
