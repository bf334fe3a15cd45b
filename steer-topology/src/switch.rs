// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! A switch whose inter-block ports change multiplicity at run time.
//!
//! A reconfiguration moves every listed port to a new multiplicity. While
//! any port is still moving, the switch routes with the *during* weights.
//! When the last port completes, the *after* weights are installed.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::rc::Rc;

use itertools::Itertools;
use steer_engine::types::{BlockId, FlowId, NodeId};
use steer_routing::registry::InterBlockWeights;
use steer_track::entity::Entity;
use steer_track::{debug, trace};

use crate::errors::TopologyError;
use crate::link::Link;
use crate::port::ReconfigurablePort;

pub struct ReconfigurableSwitch {
    entity: Rc<Entity>,
    id: NodeId,
    block: BlockId,

    ports: BTreeMap<BlockId, ReconfigurablePort>,

    current_weights: Rc<InterBlockWeights>,
    pending_after_weights: Option<Rc<InterBlockWeights>>,

    /// Target blocks of the ports still being reconfigured.
    being_reconfigured: BTreeSet<BlockId>,

    /// Intermediate block chosen for each flow under the current weights.
    flow_intermediate: HashMap<FlowId, BlockId>,

    num_reconfigurations: u64,
}

impl ReconfigurableSwitch {
    #[must_use]
    pub fn new(
        parent: &Rc<Entity>,
        id: NodeId,
        block: BlockId,
        weights: Rc<InterBlockWeights>,
    ) -> Self {
        Self {
            entity: parent.child(&format!("switch{id}")),
            id,
            block,
            ports: BTreeMap::new(),
            current_weights: weights,
            pending_after_weights: None,
            being_reconfigured: BTreeSet::new(),
            flow_intermediate: HashMap::new(),
            num_reconfigurations: 0,
        }
    }

    #[must_use]
    pub fn entity(&self) -> &Rc<Entity> {
        &self.entity
    }

    #[must_use]
    pub fn id(&self) -> NodeId {
        self.id
    }

    #[must_use]
    pub fn block(&self) -> BlockId {
        self.block
    }

    pub fn add_port(&mut self, target_block: BlockId, link: Link) -> Result<(), TopologyError> {
        if self.ports.contains_key(&target_block) {
            return Err(TopologyError::DuplicatePort {
                device: self.id,
                target_block,
            });
        }
        trace!(self.entity ; "add port to block {target_block} x{}", link.multiplicity());
        self.ports.insert(
            target_block,
            ReconfigurablePort::new(self.id, target_block, link),
        );
        Ok(())
    }

    pub fn port(&self, target_block: BlockId) -> Result<&ReconfigurablePort, TopologyError> {
        self.ports
            .get(&target_block)
            .ok_or(TopologyError::UnknownTargetBlock {
                device: self.id,
                target_block,
            })
    }

    pub fn ports(&self) -> impl Iterator<Item = &ReconfigurablePort> {
        self.ports.values()
    }

    #[must_use]
    pub fn current_weights(&self) -> &Rc<InterBlockWeights> {
        &self.current_weights
    }

    #[must_use]
    pub fn is_reconfiguring(&self) -> bool {
        !self.being_reconfigured.is_empty()
    }

    pub fn ports_being_reconfigured(&self) -> impl Iterator<Item = BlockId> + '_ {
        self.being_reconfigured.iter().copied()
    }

    #[must_use]
    pub fn num_reconfigurations(&self) -> u64 {
        self.num_reconfigurations
    }

    fn install_weights(&mut self, weights: Rc<InterBlockWeights>) {
        debug!(self.entity ; "install {} block weight tables", weights.num_pairs());
        self.current_weights = weights;
        self.flow_intermediate.clear();
    }

    /// Start moving each port in `details` (target block to new
    /// multiplicity) and switch to the matching weights.
    ///
    /// Returns the target blocks of the ports that are now reconfiguring.
    /// Each of these must later be reported through
    /// [`port_reconfiguration_ended`](Self::port_reconfiguration_ended).
    pub fn trigger_reconfiguration(
        &mut self,
        details: &BTreeMap<BlockId, i64>,
        during: Rc<InterBlockWeights>,
        after: Rc<InterBlockWeights>,
    ) -> Result<Vec<BlockId>, TopologyError> {
        if self.is_reconfiguring() || self.pending_after_weights.is_some() {
            return Err(TopologyError::ReconfigurationInProgress { device: self.id });
        }

        let targets = details
            .iter()
            .filter(|(target_block, _)| **target_block != self.block)
            .map(|(target_block, multiplicity)| (*target_block, *multiplicity))
            .collect_vec();

        // Check everything before touching any port
        for (target_block, multiplicity) in &targets {
            self.port(*target_block)?;
            if *multiplicity < 0 {
                return Err(TopologyError::InvalidMultiplicity {
                    multiplicity: *multiplicity,
                });
            }
        }

        for (target_block, multiplicity) in &targets {
            if let Some(port) = self.ports.get_mut(target_block) {
                port.begin(*multiplicity)?;
            }
            self.being_reconfigured.insert(*target_block);
        }

        self.num_reconfigurations += 1;
        debug!(self.entity ; "reconfigure ports [{}]", targets.iter().map(|(b, m)| format!("{b}:x{m}")).join(", "));

        if targets.is_empty() {
            self.install_weights(after);
        } else {
            self.install_weights(during);
            self.pending_after_weights = Some(after);
        }
        Ok(targets.into_iter().map(|(b, _)| b).collect())
    }

    /// Apply the new multiplicity of one port. The pending weights are
    /// installed once the last port completes.
    pub fn port_reconfiguration_ended(&mut self, target_block: BlockId) -> Result<(), TopologyError> {
        if !self.being_reconfigured.remove(&target_block) {
            return Err(TopologyError::NoReconfigurationInProgress {
                device: self.id,
                target_block,
            });
        }
        if let Some(port) = self.ports.get_mut(&target_block) {
            port.finish()?;
            trace!(self.entity ; "port to block {target_block} now x{}", port.multiplicity());
        }

        if self.being_reconfigured.is_empty() {
            if let Some(after) = self.pending_after_weights.take() {
                self.install_weights(after);
            }
        }
        Ok(())
    }

    /// Pick the next block on the way to `destination_block` for `flow`.
    ///
    /// The first packet of a flow draws with `draw` in `[0, 1)` scaled to
    /// the table's total weight. Later packets of the same flow get the same
    /// block until the weights change.
    pub fn find_intermediate_block(
        &mut self,
        destination_block: BlockId,
        flow: FlowId,
        draw: f64,
    ) -> Result<BlockId, TopologyError> {
        if destination_block == self.block {
            return Ok(destination_block);
        }
        if let Some(block) = self.flow_intermediate.get(&flow) {
            return Ok(*block);
        }

        let candidates = self
            .current_weights
            .intermediate_candidates(self.block, destination_block)?;
        let has_uplink = candidates.iter().any(|(block, _)| {
            self.ports
                .get(block)
                .is_some_and(|port| port.multiplicity() > 0)
        });
        if !has_uplink {
            return Err(TopologyError::NoUplink {
                device: self.id,
                destination_block,
            });
        }

        let table = self
            .current_weights
            .table(self.block, destination_block)?;
        let scaled = draw * table.sum_weights();
        let block = table.select_path(scaled)?.intermediate();
        trace!(self.entity ; "flow {flow} to block {destination_block} via {block}");
        self.flow_intermediate.insert(flow, block);
        Ok(block)
    }
}
