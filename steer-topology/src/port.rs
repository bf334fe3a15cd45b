// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! An output port of a reconfigurable switch, facing one remote block.

use steer_engine::types::{BlockId, NodeId};

use crate::errors::TopologyError;
use crate::link::Link;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PortState {
    Normal,
    /// The multiplicity to apply once the reconfiguration completes.
    Reconfiguring { after: u64 },
}

#[derive(Debug)]
pub struct ReconfigurablePort {
    owner: NodeId,
    target_block: BlockId,
    link: Link,
    state: PortState,
}

impl ReconfigurablePort {
    #[must_use]
    pub fn new(owner: NodeId, target_block: BlockId, link: Link) -> Self {
        Self {
            owner,
            target_block,
            link,
            state: PortState::Normal,
        }
    }

    #[must_use]
    pub fn target_block(&self) -> BlockId {
        self.target_block
    }

    #[must_use]
    pub fn link(&self) -> &Link {
        &self.link
    }

    #[must_use]
    pub fn multiplicity(&self) -> u64 {
        self.link.multiplicity()
    }

    #[must_use]
    pub fn state(&self) -> PortState {
        self.state
    }

    #[must_use]
    pub fn is_reconfiguring(&self) -> bool {
        matches!(self.state, PortState::Reconfiguring { .. })
    }

    /// Start moving to `after` parallel links. Only the links common to both
    /// configurations stay usable until [`finish`](Self::finish).
    pub fn begin(&mut self, after: i64) -> Result<(), TopologyError> {
        if self.is_reconfiguring() {
            return Err(TopologyError::ReconfigurationInProgress { device: self.owner });
        }
        if after < 0 {
            return Err(TopologyError::InvalidMultiplicity {
                multiplicity: after,
            });
        }
        let after = after as u64;
        let during = after.min(self.link.multiplicity());
        self.link.set_multiplicity(during as i64)?;
        self.state = PortState::Reconfiguring { after };
        Ok(())
    }

    pub fn finish(&mut self) -> Result<(), TopologyError> {
        let PortState::Reconfiguring { after } = self.state else {
            return Err(TopologyError::NoReconfigurationInProgress {
                device: self.owner,
                target_block: self.target_block,
            });
        };
        self.link.set_multiplicity(after as i64)?;
        self.state = PortState::Normal;
        Ok(())
    }
}
