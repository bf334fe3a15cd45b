// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Planned reconfigurations and the simulator events that carry them out.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use steer_engine::simulator::Simulator;
use steer_engine::traits::Event;
use steer_engine::types::{BlockId, NodeId, SimResult, SimTimeNs};
use steer_routing::registry::InterBlockWeights;
use steer_track::trace;

use crate::switch::ReconfigurableSwitch;

/// One planned change to one switch.
#[derive(Clone, Debug)]
pub struct ReconfigurationEvent {
    pub time_ns: SimTimeNs,
    pub device: NodeId,

    /// New multiplicity of the port towards each listed block.
    pub details: BTreeMap<BlockId, i64>,

    /// Weights to route with while ports are moving.
    pub during: Rc<InterBlockWeights>,

    /// Weights to route with once every port has completed.
    pub after: Rc<InterBlockWeights>,
}

/// Fires at the planned time and starts the reconfiguration on the switch.
pub struct StartReconfiguration {
    switch: Rc<RefCell<ReconfigurableSwitch>>,
    device: NodeId,
    details: BTreeMap<BlockId, i64>,
    during: Rc<InterBlockWeights>,
    after: Rc<InterBlockWeights>,
    link_reconfig_latency_ns: SimTimeNs,
}

impl StartReconfiguration {
    #[must_use]
    pub fn new(
        switch: Rc<RefCell<ReconfigurableSwitch>>,
        event: &ReconfigurationEvent,
        link_reconfig_latency_ns: SimTimeNs,
    ) -> Self {
        Self {
            switch,
            device: event.device,
            details: event.details.clone(),
            during: event.during.clone(),
            after: event.after.clone(),
            link_reconfig_latency_ns,
        }
    }
}

impl fmt::Display for StartReconfiguration {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "start reconfiguration of device {}", self.device)
    }
}

impl Event for StartReconfiguration {
    fn trigger(self: Box<Self>, simulator: &Simulator) -> SimResult {
        let Self {
            switch,
            device,
            details,
            during,
            after,
            link_reconfig_latency_ns,
        } = *self;

        let targets = switch
            .borrow_mut()
            .trigger_reconfiguration(&details, during, after)?;

        for target_block in targets {
            trace!(simulator.entity() ; "device {device} port to block {target_block} completes in {link_reconfig_latency_ns}ns");
            simulator.schedule_in(
                link_reconfig_latency_ns,
                Box::new(PortReconfigurationCompleted {
                    switch: switch.clone(),
                    device,
                    target_block,
                }),
            )?;
        }
        Ok(())
    }
}

/// Fires once a port's links have physically moved.
pub struct PortReconfigurationCompleted {
    switch: Rc<RefCell<ReconfigurableSwitch>>,
    device: NodeId,
    target_block: BlockId,
}

impl fmt::Display for PortReconfigurationCompleted {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "device {} port to block {} reconfigured",
            self.device, self.target_block
        )
    }
}

impl Event for PortReconfigurationCompleted {
    fn trigger(self: Box<Self>, _simulator: &Simulator) -> SimResult {
        self.switch
            .borrow_mut()
            .port_reconfiguration_ended(self.target_block)?;
        Ok(())
    }
}
