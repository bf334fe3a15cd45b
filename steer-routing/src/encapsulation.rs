// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! The wrapper a packet travels in while it is routed across blocks.
//!
//! The routing decision is revealed in stages as the packet moves:
//!
//! ```text
//!   DirectPending -> ValiantChosen -> ValiantEntered -> Delivered
//! ```
//!
//! The detour (valiant) block and the switch that leads into it are chosen
//! once, at the ingress switch. The switch that leads out of the valiant
//! block may only be chosen later, once the packet can see local state
//! inside that block. Packets that stay on the direct path are modelled as
//! having the source block as their valiant block and are entered straight
//! away.
//!
//! ```rust
//! use steer_routing::encapsulation::{AdaptiveRouteEncapsulation, RouteStateKind};
//! use steer_routing::test_helpers::TestPacket;
//!
//! let mut enc = AdaptiveRouteEncapsulation::new(TestPacket::new(1, 0, 9, 12_000), 7);
//! assert_eq!(enc.state(), RouteStateKind::DirectPending);
//!
//! enc.select_valiant_block(3, 12).unwrap();
//! assert_eq!(enc.state(), RouteStateKind::ValiantChosen);
//! assert_eq!(enc.valiant_block().unwrap(), 3);
//!
//! enc.mark_entered_valiant().unwrap();
//! assert_eq!(enc.state(), RouteStateKind::ValiantEntered);
//! assert!(enc.mark_entered_valiant().is_err());
//! ```

use std::fmt;

use steer_engine::traits::{CongestionMarked, FlowPacket, TotalBits};
use steer_engine::types::{BlockId, FlowId, NodeId};

use crate::errors::RoutingError;

/// Outer framing removed at each decapsulation step.
pub const ENCAPSULATION_OVERHEAD_BITS: u64 = 480;

/// The detour decided for a packet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ValiantRoute {
    pub block: BlockId,
    pub entry_switch: NodeId,
    pub exit_switch: Option<NodeId>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum RouteState {
    DirectPending,
    ValiantChosen(ValiantRoute),
    ValiantEntered(ValiantRoute),
    Delivered,
}

/// The routing state without its payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RouteStateKind {
    DirectPending,
    ValiantChosen,
    ValiantEntered,
    Delivered,
}

impl fmt::Display for RouteStateKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Self::DirectPending => "direct pending",
            Self::ValiantChosen => "valiant chosen",
            Self::ValiantEntered => "valiant entered",
            Self::Delivered => "delivered",
        };
        write!(f, "{name}")
    }
}

impl RouteState {
    fn kind(&self) -> RouteStateKind {
        match self {
            Self::DirectPending => RouteStateKind::DirectPending,
            Self::ValiantChosen(_) => RouteStateKind::ValiantChosen,
            Self::ValiantEntered(_) => RouteStateKind::ValiantEntered,
            Self::Delivered => RouteStateKind::Delivered,
        }
    }

    fn route(&self) -> Option<&ValiantRoute> {
        match self {
            Self::ValiantChosen(route) | Self::ValiantEntered(route) => Some(route),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct AdaptiveRouteEncapsulation<P> {
    packet: P,
    destination_block: BlockId,
    state: RouteState,
}

impl<P: FlowPacket> AdaptiveRouteEncapsulation<P> {
    #[must_use]
    pub fn new(packet: P, destination_block: BlockId) -> Self {
        Self {
            packet,
            destination_block,
            state: RouteState::DirectPending,
        }
    }

    #[must_use]
    pub fn state(&self) -> RouteStateKind {
        self.state.kind()
    }

    #[must_use]
    pub fn destination_block(&self) -> BlockId {
        self.destination_block
    }

    #[must_use]
    pub fn flow_id(&self) -> FlowId {
        self.packet.flow_id()
    }

    #[must_use]
    pub fn source_id(&self) -> NodeId {
        self.packet.source_id()
    }

    #[must_use]
    pub fn destination_id(&self) -> NodeId {
        self.packet.destination_id()
    }

    #[must_use]
    pub fn packet(&self) -> &P {
        &self.packet
    }

    /// Record the detour block and the switch that leads into it.
    pub fn select_valiant_block(
        &mut self,
        block: BlockId,
        entry_switch: NodeId,
    ) -> Result<(), RoutingError> {
        match self.state {
            RouteState::DirectPending => {
                self.state = RouteState::ValiantChosen(ValiantRoute {
                    block,
                    entry_switch,
                    exit_switch: None,
                });
                Ok(())
            }
            RouteState::Delivered => Err(RoutingError::AlreadyDelivered),
            _ => Err(RoutingError::RoutingDecisionAlreadyMade {
                state: self.state(),
            }),
        }
    }

    /// Record the switch in the valiant block that leads on to the
    /// destination block. It can only be set once.
    pub fn select_valiant_exit_switch(&mut self, switch: NodeId) -> Result<(), RoutingError> {
        let state = self.state();
        match &mut self.state {
            RouteState::ValiantChosen(route) | RouteState::ValiantEntered(route) => {
                if route.exit_switch.is_some() {
                    return Err(RoutingError::RoutingDecisionAlreadyMade { state });
                }
                route.exit_switch = Some(switch);
                Ok(())
            }
            RouteState::DirectPending => Err(RoutingError::UnresolvedValiantBlock),
            RouteState::Delivered => Err(RoutingError::AlreadyDelivered),
        }
    }

    /// Record that the packet has crossed into the valiant block.
    pub fn mark_entered_valiant(&mut self) -> Result<(), RoutingError> {
        match self.state {
            RouteState::ValiantChosen(route) => {
                self.state = RouteState::ValiantEntered(route);
                Ok(())
            }
            RouteState::Delivered => Err(RoutingError::AlreadyDelivered),
            _ => Err(RoutingError::NotInValiantChosen {
                state: self.state(),
            }),
        }
    }

    /// Pass a congestion mark on to the wrapped packet. The routing state is
    /// not affected.
    pub fn mark_congestion_encountered(&mut self) -> Result<(), RoutingError> {
        if self.state == RouteState::Delivered {
            return Err(RoutingError::AlreadyDelivered);
        }
        self.packet.mark_congestion_encountered();
        Ok(())
    }

    #[must_use]
    pub fn congestion_encountered(&self) -> bool {
        self.packet.congestion_encountered()
    }

    /// Record that the destination block has been reached.
    pub fn deliver(&mut self) -> Result<(), RoutingError> {
        if self.state == RouteState::Delivered {
            return Err(RoutingError::AlreadyDelivered);
        }
        self.state = RouteState::Delivered;
        Ok(())
    }

    /// Unwrap the packet once it has been delivered.
    pub fn into_packet(self) -> Result<P, RoutingError> {
        match self.state {
            RouteState::Delivered => Ok(self.packet),
            _ => Err(RoutingError::NotDelivered {
                state: self.state(),
            }),
        }
    }

    #[must_use]
    pub fn has_entered_valiant(&self) -> bool {
        matches!(self.state, RouteState::ValiantEntered(_))
    }

    pub fn valiant_route(&self) -> Result<ValiantRoute, RoutingError> {
        match self.state {
            RouteState::Delivered => Err(RoutingError::AlreadyDelivered),
            _ => self
                .state
                .route()
                .copied()
                .ok_or(RoutingError::UnresolvedValiantBlock),
        }
    }

    pub fn valiant_block(&self) -> Result<BlockId, RoutingError> {
        self.valiant_route().map(|r| r.block)
    }

    pub fn entry_switch(&self) -> Result<NodeId, RoutingError> {
        match self.state {
            RouteState::DirectPending => Err(RoutingError::UnresolvedEntrySwitch),
            _ => self.valiant_route().map(|r| r.entry_switch),
        }
    }

    pub fn exit_switch(&self) -> Result<NodeId, RoutingError> {
        let route = self.valiant_route()?;
        route
            .exit_switch
            .ok_or(RoutingError::UnresolvedExitSwitch {
                valiant_block: route.block,
            })
    }
}

impl<P: FlowPacket> TotalBits for AdaptiveRouteEncapsulation<P> {
    fn total_bits(&self) -> u64 {
        self.packet
            .total_bits()
            .saturating_sub(ENCAPSULATION_OVERHEAD_BITS)
    }
}
