// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! The read-only device registry handed to planners and builders.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use steer_engine::types::{BlockId, NodeId};

use crate::errors::TopologyError;
use crate::link::LinkFactory;
use crate::switch::ReconfigurableSwitch;

/// What a [`LinkFactory`] needs to know about each end of a link.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeviceInfo {
    pub id: NodeId,
    pub block: BlockId,
    pub is_server: bool,
}

impl DeviceInfo {
    #[must_use]
    pub fn server(id: NodeId, block: BlockId) -> Self {
        Self {
            id,
            block,
            is_server: true,
        }
    }

    #[must_use]
    pub fn switch(id: NodeId, block: BlockId) -> Self {
        Self {
            id,
            block,
            is_server: false,
        }
    }
}

#[derive(Clone)]
pub enum DeviceHandle {
    Server(DeviceInfo),
    Switch(DeviceInfo),
    Reconfigurable(Rc<RefCell<ReconfigurableSwitch>>),
}

impl DeviceHandle {
    #[must_use]
    pub fn info(&self) -> DeviceInfo {
        match self {
            Self::Server(info) | Self::Switch(info) => *info,
            Self::Reconfigurable(switch) => {
                let switch = switch.borrow();
                DeviceInfo::switch(switch.id(), switch.block())
            }
        }
    }
}

/// All devices, keyed by id.
#[derive(Default)]
pub struct DeviceRegistry {
    devices: BTreeMap<NodeId, DeviceHandle>,
}

impl DeviceRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, id: NodeId, handle: DeviceHandle) -> Result<(), TopologyError> {
        if self.devices.contains_key(&id) {
            return Err(TopologyError::DuplicateDevice { device: id });
        }
        self.devices.insert(id, handle);
        Ok(())
    }

    pub fn add_server(&mut self, id: NodeId, block: BlockId) -> Result<(), TopologyError> {
        self.insert(id, DeviceHandle::Server(DeviceInfo::server(id, block)))
    }

    pub fn add_switch(&mut self, id: NodeId, block: BlockId) -> Result<(), TopologyError> {
        self.insert(id, DeviceHandle::Switch(DeviceInfo::switch(id, block)))
    }

    pub fn add_reconfigurable_switch(
        &mut self,
        switch: ReconfigurableSwitch,
    ) -> Result<Rc<RefCell<ReconfigurableSwitch>>, TopologyError> {
        let id = switch.id();
        let switch = Rc::new(RefCell::new(switch));
        self.insert(id, DeviceHandle::Reconfigurable(switch.clone()))?;
        Ok(switch)
    }

    pub fn get(&self, id: NodeId) -> Result<&DeviceHandle, TopologyError> {
        self.devices
            .get(&id)
            .ok_or(TopologyError::UnknownDevice { device: id })
    }

    pub fn info(&self, id: NodeId) -> Result<DeviceInfo, TopologyError> {
        Ok(self.get(id)?.info())
    }

    pub fn block_of(&self, id: NodeId) -> Result<BlockId, TopologyError> {
        Ok(self.info(id)?.block)
    }

    pub fn reconfigurable(
        &self,
        id: NodeId,
    ) -> Result<Rc<RefCell<ReconfigurableSwitch>>, TopologyError> {
        match self.get(id)? {
            DeviceHandle::Reconfigurable(switch) => Ok(switch.clone()),
            _ => Err(TopologyError::NotReconfigurable { device: id }),
        }
    }

    /// Create the link for one adjacency entry and attach it to `from` as the
    /// port towards the block of `to`.
    pub fn connect(
        &self,
        from: NodeId,
        to: NodeId,
        multiplicity: i64,
        factory: &dyn LinkFactory,
    ) -> Result<(), TopologyError> {
        let from_info = self.info(from)?;
        let to_info = self.info(to)?;
        let link = factory.create(&from_info, &to_info, multiplicity)?;
        self.reconfigurable(from)?
            .borrow_mut()
            .add_port(to_info.block, link)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.devices.keys().copied()
    }
}
