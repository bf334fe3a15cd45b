// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! UGAL decisions for block-structured fabrics.
//!
//! At the ingress switch a packet compares the congestion on its direct
//! inter-block path with the congestion through every other block and
//! records its choice in an [`AdaptiveRouteEncapsulation`]. Every switch
//! along the way then calls [`next_hop_target`] to find out where the packet
//! should head next.
//!
//!  - [`UgalGlobal`] sees the queues of every inter-block port.
//!  - [`UgalLocal`] only sees the queues at the ingress switch and picks the
//!    exit from the valiant block once the packet is inside it.

use std::rc::Rc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use steer_engine::traits::FlowPacket;
use steer_engine::types::{BlockId, NodeId};
use steer_track::entity::Entity;
use steer_track::{debug, trace};

use crate::encapsulation::{AdaptiveRouteEncapsulation, RouteStateKind};
use crate::errors::RoutingError;

/// An output port that could carry a packet towards a block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CandidatePort {
    /// The switch the traffic must reach to use this port.
    pub owner: NodeId,
    /// Bits currently queued.
    pub occupied_bits: u64,
}

/// Congestion state of the fabric as seen by the routing decision.
pub trait BlockCongestion {
    fn num_blocks(&self) -> usize;

    /// Every port in block `from` with a link into block `to`.
    fn ports_between(&self, from: BlockId, to: BlockId) -> Vec<CandidatePort>;

    /// The ports `switch` itself could use to head towards block `to`. The
    /// `owner` is the switch in the same block that has the link into `to`.
    fn local_ports_toward(&self, switch: NodeId, to: BlockId) -> Vec<CandidatePort>;

    /// Switches in `block` with a link into block `to`.
    fn exit_switches(&self, block: BlockId, to: BlockId) -> Vec<NodeId>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UgalChoice {
    Direct,
    Valiant { block: BlockId },
}

/// Where a packet should head from the current switch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HopTarget {
    /// The destination block has been reached.
    Deliver,
    /// Cross into another block.
    TowardBlock(BlockId),
    /// Move within the current block towards a switch.
    TowardSwitch(NodeId),
}

/// The port with the fewest queued bits. Ties are broken uniformly.
fn least_congested(ports: &[CandidatePort], rng: &mut StdRng) -> Option<CandidatePort> {
    let min_bits = ports.iter().map(|p| p.occupied_bits).min()?;
    let tied: Vec<&CandidatePort> = ports
        .iter()
        .filter(|p| p.occupied_bits == min_bits)
        .collect();
    Some(*tied[rng.gen_range(0..tied.len())])
}

fn take_direct<P: FlowPacket>(
    enc: &mut AdaptiveRouteEncapsulation<P>,
    source_block: BlockId,
    this_switch: NodeId,
    direct_exit: NodeId,
) -> Result<UgalChoice, RoutingError> {
    enc.select_valiant_block(source_block, this_switch)?;
    enc.mark_entered_valiant()?;
    enc.select_valiant_exit_switch(direct_exit)?;
    Ok(UgalChoice::Direct)
}

/// UGAL with a global view of inter-block queues.
pub struct UgalGlobal {
    entity: Rc<Entity>,
    rng: StdRng,
}

impl UgalGlobal {
    #[must_use]
    pub fn new(parent: &Rc<Entity>, name: &str, seed: u64) -> Self {
        Self {
            entity: parent.child(name),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Decide between the direct path and the least congested detour.
    ///
    /// The direct cost is the least congested port from the source block to
    /// the destination block. The cost through block `b` is the least
    /// congested port into `b` plus the least congested port out of `b`. A
    /// detour is only taken if strictly cheaper.
    pub fn decide<P: FlowPacket>(
        &mut self,
        enc: &mut AdaptiveRouteEncapsulation<P>,
        source_block: BlockId,
        this_switch: NodeId,
        view: &dyn BlockCongestion,
    ) -> Result<UgalChoice, RoutingError> {
        let destination_block = enc.destination_block();
        if source_block == destination_block {
            return Ok(UgalChoice::Direct);
        }

        let direct = least_congested(
            &view.ports_between(source_block, destination_block),
            &mut self.rng,
        )
        .ok_or(RoutingError::NoPortBetweenBlocks {
            from: source_block,
            to: destination_block,
        })?;

        let mut best: Option<(BlockId, CandidatePort, CandidatePort)> = None;
        for block in 0..view.num_blocks() {
            if block == source_block || block == destination_block {
                continue;
            }
            let into = least_congested(&view.ports_between(source_block, block), &mut self.rng);
            let out = least_congested(&view.ports_between(block, destination_block), &mut self.rng);
            if let (Some(into), Some(out)) = (into, out) {
                let cost = into.occupied_bits + out.occupied_bits;
                if best.is_none_or(|(_, i, o)| cost < i.occupied_bits + o.occupied_bits) {
                    best = Some((block, into, out));
                }
            }
        }

        match best {
            Some((block, into, out)) if into.occupied_bits + out.occupied_bits < direct.occupied_bits => {
                debug!(self.entity ; "flow {}: valiant through block {block} ({} < {} bits)",
                    enc.flow_id(), into.occupied_bits + out.occupied_bits, direct.occupied_bits);
                enc.select_valiant_block(block, into.owner)?;
                enc.select_valiant_exit_switch(out.owner)?;
                Ok(UgalChoice::Valiant { block })
            }
            _ => {
                debug!(self.entity ; "flow {}: direct to block {destination_block} via {}",
                    enc.flow_id(), direct.owner);
                take_direct(enc, source_block, this_switch, direct.owner)
            }
        }
    }
}

/// UGAL with only the ingress switch's queues visible.
pub struct UgalLocal {
    entity: Rc<Entity>,
    rng: StdRng,
}

impl UgalLocal {
    #[must_use]
    pub fn new(parent: &Rc<Entity>, name: &str, seed: u64) -> Self {
        Self {
            entity: parent.child(name),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Decide between the direct path and a detour using the local queue
    /// towards each block. The exit from a detour block is left open.
    pub fn decide<P: FlowPacket>(
        &mut self,
        enc: &mut AdaptiveRouteEncapsulation<P>,
        source_block: BlockId,
        this_switch: NodeId,
        view: &dyn BlockCongestion,
    ) -> Result<UgalChoice, RoutingError> {
        let destination_block = enc.destination_block();
        if source_block == destination_block {
            return Ok(UgalChoice::Direct);
        }

        let direct = least_congested(
            &view.local_ports_toward(this_switch, destination_block),
            &mut self.rng,
        )
        .ok_or(RoutingError::NoPortBetweenBlocks {
            from: source_block,
            to: destination_block,
        })?;

        let mut best: Option<(BlockId, CandidatePort)> = None;
        for block in 0..view.num_blocks() {
            if block == source_block || block == destination_block {
                continue;
            }
            let Some(port) =
                least_congested(&view.local_ports_toward(this_switch, block), &mut self.rng)
            else {
                continue;
            };
            if best.is_none_or(|(_, b)| port.occupied_bits < b.occupied_bits) {
                best = Some((block, port));
            }
        }

        match best {
            Some((block, port)) if port.occupied_bits < direct.occupied_bits => {
                debug!(self.entity ; "flow {}: valiant through block {block}", enc.flow_id());
                enc.select_valiant_block(block, port.owner)?;
                Ok(UgalChoice::Valiant { block })
            }
            _ => {
                debug!(self.entity ; "flow {}: direct to block {destination_block}", enc.flow_id());
                take_direct(enc, source_block, this_switch, direct.owner)
            }
        }
    }

    /// Pick an exit switch for a packet that has reached its valiant block
    /// without one.
    pub fn resolve_exit_switch<P: FlowPacket>(
        &mut self,
        enc: &mut AdaptiveRouteEncapsulation<P>,
        here_block: BlockId,
        view: &dyn BlockCongestion,
    ) -> Result<(), RoutingError> {
        let route = match enc.state() {
            RouteStateKind::ValiantChosen | RouteStateKind::ValiantEntered => enc.valiant_route()?,
            _ => return Ok(()),
        };
        if route.block != here_block || route.exit_switch.is_some() {
            return Ok(());
        }

        let destination_block = enc.destination_block();
        let exits = view.exit_switches(here_block, destination_block);
        if exits.is_empty() {
            return Err(RoutingError::NoPortBetweenBlocks {
                from: here_block,
                to: destination_block,
            });
        }
        let exit = exits[self.rng.gen_range(0..exits.len())];
        trace!(self.entity ; "flow {}: exit block {here_block} via {exit}", enc.flow_id());
        enc.select_valiant_exit_switch(exit)
    }

    /// [`next_hop_target`] with the exit switch resolved on demand.
    pub fn next_hop_target<P: FlowPacket>(
        &mut self,
        enc: &mut AdaptiveRouteEncapsulation<P>,
        here_block: BlockId,
        here_switch: NodeId,
        view: &dyn BlockCongestion,
    ) -> Result<HopTarget, RoutingError> {
        if here_block != enc.destination_block() {
            self.resolve_exit_switch(enc, here_block, view)?;
        }
        next_hop_target(enc, here_block, here_switch)
    }
}

/// Where a packet at `here_switch` in `here_block` should go next.
///
/// A packet that has reached its valiant block while it was still marked as
/// chosen is marked as entered.
pub fn next_hop_target<P: FlowPacket>(
    enc: &mut AdaptiveRouteEncapsulation<P>,
    here_block: BlockId,
    here_switch: NodeId,
) -> Result<HopTarget, RoutingError> {
    let destination_block = enc.destination_block();
    if here_block == destination_block {
        enc.deliver()?;
        return Ok(HopTarget::Deliver);
    }

    let route = enc.valiant_route()?;
    if route.block == here_block && enc.state() == RouteStateKind::ValiantChosen {
        enc.mark_entered_valiant()?;
    }

    if enc.has_entered_valiant() {
        let exit = enc.exit_switch()?;
        if here_switch == exit {
            Ok(HopTarget::TowardBlock(destination_block))
        } else {
            Ok(HopTarget::TowardSwitch(exit))
        }
    } else if here_switch == route.entry_switch {
        Ok(HopTarget::TowardBlock(route.block))
    } else {
        Ok(HopTarget::TowardSwitch(route.entry_switch))
    }
}
