// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Planning of topology reconfigurations.
//!
//! A planner turns its plan into one [`StartReconfiguration`] event per
//! planned change, registered with the simulator in time order. Plans are
//! checked when they are built so that two changes to the same switch that
//! would overlap are rejected before anything is registered.
//!
//! [`StartReconfiguration`]: event::StartReconfiguration

pub mod event;
pub mod periodic;
pub mod scheduled;

use std::collections::HashMap;
use std::rc::Rc;

use steer_engine::simulator::{EventHandle, Simulator};
use steer_engine::types::{NodeId, SimResult, SimTimeNs};
use steer_track::entity::Entity;
use steer_track::{debug, trace};

use crate::device::DeviceRegistry;
use crate::errors::TopologyError;
use crate::reconfiguration::event::{ReconfigurationEvent, StartReconfiguration};

pub trait ReconfigurationPlanner {
    /// Register every planned event with the simulator.
    fn plan_reconfiguration_events(&mut self, simulator: &Simulator) -> SimResult;

    /// Replace the remaining plan with `events`.
    ///
    /// Events of the old plan that are still pending are cancelled before
    /// any replacement is registered.
    fn replan(&mut self, simulator: &Simulator, events: Vec<ReconfigurationEvent>) -> SimResult;

    /// Number of events registered by the current plan.
    fn num_registered(&self) -> usize;
}

/// Sort `events` by time and check that each switch has finished one
/// reconfiguration before the next one starts. Every port named by an event
/// must exist on its switch.
///
/// Port completions are registered when a reconfiguration fires, so they
/// fire after any start already registered for the same time. The next
/// start must therefore be strictly later than the previous completion.
pub fn validate_plan(
    devices: &DeviceRegistry,
    link_reconfig_latency_ns: SimTimeNs,
    mut events: Vec<ReconfigurationEvent>,
) -> Result<Vec<ReconfigurationEvent>, TopologyError> {
    if link_reconfig_latency_ns == 0 {
        return Err(TopologyError::InvalidPlan(
            "link reconfiguration latency must be positive".to_string(),
        ));
    }

    // Stable so that same-time events keep their listed order
    events.sort_by_key(|e| e.time_ns);

    let mut last_start: HashMap<NodeId, SimTimeNs> = HashMap::new();
    for event in &events {
        let switch = devices.reconfigurable(event.device)?;
        let switch = switch.borrow();
        for (&target_block, &multiplicity) in &event.details {
            if target_block == switch.block() {
                continue;
            }
            switch.port(target_block)?;
            if multiplicity < 0 {
                return Err(TopologyError::InvalidMultiplicity { multiplicity });
            }
        }
        if let Some(previous_ns) = last_start.insert(event.device, event.time_ns) {
            if event.time_ns - previous_ns <= link_reconfig_latency_ns {
                return Err(TopologyError::OverlappingReconfiguration {
                    device: event.device,
                    first_ns: previous_ns,
                    second_ns: event.time_ns,
                });
            }
        }
    }
    Ok(events)
}

struct Registered {
    time_ns: SimTimeNs,
    device: NodeId,
    handle: EventHandle,
}

/// Registration bookkeeping shared by the planners.
pub(crate) struct PlanRegistrar {
    entity: Rc<Entity>,
    devices: Rc<DeviceRegistry>,
    link_reconfig_latency_ns: SimTimeNs,
    events: Vec<ReconfigurationEvent>,
    registered: Vec<Registered>,

    /// Events of earlier plans that have fired and whose ports may still be
    /// moving.
    fired: Vec<Registered>,
}

impl PlanRegistrar {
    pub(crate) fn new(
        entity: Rc<Entity>,
        devices: Rc<DeviceRegistry>,
        link_reconfig_latency_ns: SimTimeNs,
        events: Vec<ReconfigurationEvent>,
    ) -> Result<Self, TopologyError> {
        let events = validate_plan(&devices, link_reconfig_latency_ns, events)?;
        debug!(entity ; "planned {} reconfiguration events", events.len());
        Ok(Self {
            entity,
            devices,
            link_reconfig_latency_ns,
            events,
            registered: Vec::new(),
            fired: Vec::new(),
        })
    }

    pub(crate) fn events(&self) -> &[ReconfigurationEvent] {
        &self.events
    }

    pub(crate) fn num_registered(&self) -> usize {
        self.registered.len()
    }

    pub(crate) fn register_all(&mut self, simulator: &Simulator) -> SimResult {
        if !self.registered.is_empty() {
            return Err(
                TopologyError::InvalidPlan("events have already been registered".to_string())
                    .into(),
            );
        }
        for event in &self.events {
            let switch = self.devices.reconfigurable(event.device)?;
            let start = StartReconfiguration::new(switch, event, self.link_reconfig_latency_ns);
            let handle = simulator.schedule_at(event.time_ns, Box::new(start))?;
            trace!(self.entity ; "registered {handle} for device {} at {}ns", event.device, event.time_ns);
            self.registered.push(Registered {
                time_ns: event.time_ns,
                device: event.device,
                handle,
            });
        }
        debug!(self.entity ; "registered {} events", self.registered.len());
        Ok(())
    }

    /// Everything is checked before the old plan is touched so that a
    /// rejected replacement leaves the old plan registered.
    pub(crate) fn replan(
        &mut self,
        simulator: &Simulator,
        events: Vec<ReconfigurationEvent>,
    ) -> SimResult {
        let events = validate_plan(&self.devices, self.link_reconfig_latency_ns, events)?;

        let now_ns = simulator.time_now_ns();
        if let Some(late) = events.iter().find(|e| e.time_ns < now_ns) {
            return Err(TopologyError::InvalidPlan(format!(
                "device {} cannot be reconfigured at {}ns, time is already {now_ns}ns",
                late.device, late.time_ns
            ))
            .into());
        }

        // A fired event cannot be cancelled, so the new plan must leave room
        // for it to complete. This includes events of earlier plans.
        let latency_ns = self.link_reconfig_latency_ns;
        let still_completing = |r: &&Registered| {
            !simulator.is_pending(r.handle) && r.time_ns.saturating_add(latency_ns) >= now_ns
        };
        for fired in self
            .fired
            .iter()
            .chain(self.registered.iter())
            .filter(still_completing)
        {
            if let Some(clash) = events.iter().find(|e| {
                e.device == fired.device && e.time_ns.abs_diff(fired.time_ns) <= latency_ns
            }) {
                return Err(TopologyError::StalePlanConflict {
                    device: fired.device,
                    fired_ns: fired.time_ns,
                    replacement_ns: clash.time_ns,
                }
                .into());
            }
        }

        let mut num_cancelled = 0;
        for registered in std::mem::take(&mut self.registered) {
            if simulator.is_pending(registered.handle) {
                simulator.cancel(registered.handle)?;
                num_cancelled += 1;
            } else {
                self.fired.push(registered);
            }
        }
        self.fired.retain(|r| r.time_ns.saturating_add(latency_ns) >= now_ns);
        debug!(self.entity ; "replan: cancelled {num_cancelled} pending events, {} fired events still completing", self.fired.len());

        self.events = events;
        self.register_all(simulator)
    }
}
