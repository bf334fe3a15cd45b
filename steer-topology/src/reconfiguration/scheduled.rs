// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! A planner driven by an explicit list of events.

use std::rc::Rc;

use steer_engine::simulator::Simulator;
use steer_engine::types::{SimResult, SimTimeNs};
use steer_track::entity::Entity;

use crate::device::DeviceRegistry;
use crate::errors::TopologyError;
use crate::reconfiguration::event::ReconfigurationEvent;
use crate::reconfiguration::{PlanRegistrar, ReconfigurationPlanner};

pub struct ScheduledPlanner {
    registrar: PlanRegistrar,
}

impl ScheduledPlanner {
    pub fn new(
        parent: &Rc<Entity>,
        devices: Rc<DeviceRegistry>,
        link_reconfig_latency_ns: SimTimeNs,
        events: Vec<ReconfigurationEvent>,
    ) -> Result<Self, TopologyError> {
        Ok(Self {
            registrar: PlanRegistrar::new(
                parent.child("scheduled_planner"),
                devices,
                link_reconfig_latency_ns,
                events,
            )?,
        })
    }

    /// The plan in the order it is registered.
    #[must_use]
    pub fn events(&self) -> &[ReconfigurationEvent] {
        self.registrar.events()
    }
}

impl ReconfigurationPlanner for ScheduledPlanner {
    fn plan_reconfiguration_events(&mut self, simulator: &Simulator) -> SimResult {
        self.registrar.register_all(simulator)
    }

    fn replan(&mut self, simulator: &Simulator, events: Vec<ReconfigurationEvent>) -> SimResult {
        self.registrar.replan(simulator, events)
    }

    fn num_registered(&self) -> usize {
        self.registrar.num_registered()
    }
}
