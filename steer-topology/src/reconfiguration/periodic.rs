// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! A planner that repeats a cycle of epochs for the whole run.
//!
//! Each epoch starts at a fixed offset into the cycle and reconfigures a set
//! of switches together with one pair of during/after weights. The cycle
//! repeats every `period_ns` and only events starting before `run_time_ns`
//! are planned.

use std::collections::BTreeMap;
use std::rc::Rc;

use steer_engine::simulator::Simulator;
use steer_engine::types::{BlockId, NodeId, SimResult, SimTimeNs};
use steer_routing::registry::InterBlockWeights;
use steer_track::entity::Entity;

use crate::device::DeviceRegistry;
use crate::errors::TopologyError;
use crate::reconfiguration::event::ReconfigurationEvent;
use crate::reconfiguration::{PlanRegistrar, ReconfigurationPlanner};

#[derive(Clone, Debug)]
pub struct Epoch {
    pub offset_ns: SimTimeNs,

    /// New port multiplicities per switch.
    pub switches: BTreeMap<NodeId, BTreeMap<BlockId, i64>>,

    pub during: Rc<InterBlockWeights>,
    pub after: Rc<InterBlockWeights>,
}

pub struct PeriodicPlanner {
    registrar: PlanRegistrar,
    period_ns: SimTimeNs,
}

impl PeriodicPlanner {
    pub fn new(
        parent: &Rc<Entity>,
        devices: Rc<DeviceRegistry>,
        link_reconfig_latency_ns: SimTimeNs,
        cycle: &[Epoch],
        period_ns: SimTimeNs,
        run_time_ns: SimTimeNs,
    ) -> Result<Self, TopologyError> {
        let events = expand_cycle(cycle, period_ns, run_time_ns)?;
        Ok(Self {
            registrar: PlanRegistrar::new(
                parent.child("periodic_planner"),
                devices,
                link_reconfig_latency_ns,
                events,
            )?,
            period_ns,
        })
    }

    #[must_use]
    pub fn period_ns(&self) -> SimTimeNs {
        self.period_ns
    }

    #[must_use]
    pub fn events(&self) -> &[ReconfigurationEvent] {
        self.registrar.events()
    }
}

/// Unroll `cycle` into one event per switch per epoch.
pub fn expand_cycle(
    cycle: &[Epoch],
    period_ns: SimTimeNs,
    run_time_ns: SimTimeNs,
) -> Result<Vec<ReconfigurationEvent>, TopologyError> {
    if period_ns == 0 {
        return Err(TopologyError::InvalidPlan(
            "reconfiguration period must be positive".to_string(),
        ));
    }
    if let Some(epoch) = cycle.iter().find(|e| e.offset_ns >= period_ns) {
        return Err(TopologyError::InvalidPlan(format!(
            "epoch offset {}ns is outside the {period_ns}ns period",
            epoch.offset_ns
        )));
    }

    let mut events = Vec::new();
    if cycle.is_empty() {
        return Ok(events);
    }

    let mut cycle_start_ns = 0;
    while cycle_start_ns < run_time_ns {
        for epoch in cycle {
            let time_ns = cycle_start_ns + epoch.offset_ns;
            if time_ns >= run_time_ns {
                continue;
            }
            for (device, details) in &epoch.switches {
                events.push(ReconfigurationEvent {
                    time_ns,
                    device: *device,
                    details: details.clone(),
                    during: epoch.during.clone(),
                    after: epoch.after.clone(),
                });
            }
        }
        cycle_start_ns += period_ns;
    }
    Ok(events)
}

impl ReconfigurationPlanner for PeriodicPlanner {
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
