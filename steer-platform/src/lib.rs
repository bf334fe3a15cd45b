// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Build a reconfigurable fabric from configuration.
//!
//! The fabric itself is described in YAML:
//!
//! ```yaml
//! switches:
//!   - { id: 10, block: 0, reconfigurable: true }
//!   - { id: 20, block: 1, reconfigurable: true }
//! links:
//!   - { from: 10, to: 20, multiplicity: 2 }
//!   - { from: 20, to: 10, multiplicity: 2 }
//! block_weights:
//!   - { source: 0, destination: 1, intermediate: 1, weight: 1.0 }
//!   - { source: 1, destination: 0, intermediate: 0, weight: 1.0 }
//! reconfiguration:
//!   events:
//!     - time_ns: 100
//!       device: 10
//!       details: { 1: 4 }
//!       during: [ { source: 0, destination: 1, intermediate: 1, weight: 1.0 } ]
//!       after: [ { source: 0, destination: 1, intermediate: 1, weight: 1.0 } ]
//! ```

use std::cell::RefCell;
use std::fmt::Display;
use std::path::Path;
use std::rc::Rc;

use steer_engine::engine::Engine;
use steer_engine::types::{NodeId, SimError, SimResult};
use steer_routing::registry::InterBlockWeights;
use steer_topology::device::DeviceRegistry;
use steer_topology::reconfiguration::ReconfigurationPlanner;
use steer_topology::switch::ReconfigurableSwitch;
use steer_track::entity::Entity;
use steer_track::info;

use crate::builder::{build_block_weights, build_devices, build_planner, build_routing};
use crate::routing::RoutingStrategy;
use crate::types::{FabricConfig, RunConfig};

pub mod builder;
pub mod routing;
pub mod types;

pub struct Platform {
    entity: Rc<Entity>,
    devices: Rc<DeviceRegistry>,
    weights: Rc<InterBlockWeights>,
    planner: Option<Box<dyn ReconfigurationPlanner>>,
    routing: RoutingStrategy,
    num_static_links: usize,
}

impl Platform {
    pub fn from_file(engine: &Engine, cfg: &RunConfig, fabric_path: &Path) -> Result<Self, SimError> {
        let s = std::fs::read_to_string(fabric_path)
            .map_err(|e| SimError(format!("Unable to read {}: {e}", fabric_path.display())))?;
        Platform::from_string(engine, cfg, &s)
    }

    pub fn from_string(engine: &Engine, cfg: &RunConfig, fabric_config: &str) -> Result<Self, SimError> {
        let fabric: FabricConfig = serde_yaml::from_str(fabric_config)
            .map_err(|e| SimError(format!("serde_yaml::from_str failed: {e}")))?;
        Platform::build(engine, cfg, &fabric)
    }

    fn build(engine: &Engine, cfg: &RunConfig, fabric: &FabricConfig) -> Result<Self, SimError> {
        cfg.validate()?;
        let entity = engine.top().child("platform");

        let weights = build_block_weights(fabric.block_weights.as_deref().unwrap_or_default())?;
        let (devices, num_static_links) = build_devices(&entity, cfg, fabric, &weights)?;
        let devices = Rc::new(devices);
        let planner = build_planner(&entity, cfg, fabric, &devices)?;
        let routing = build_routing(&entity, cfg)?;

        info!(entity ; "built {} devices, {} block weight tables, {} routing", devices.len(), weights.num_pairs(), routing.kind());
        Ok(Platform {
            entity,
            devices,
            weights,
            planner,
            routing,
            num_static_links,
        })
    }

    #[must_use]
    pub fn entity(&self) -> &Rc<Entity> {
        &self.entity
    }

    #[must_use]
    pub fn devices(&self) -> &Rc<DeviceRegistry> {
        &self.devices
    }

    #[must_use]
    pub fn weights(&self) -> &Rc<InterBlockWeights> {
        &self.weights
    }

    #[must_use]
    pub fn routing(&self) -> &RoutingStrategy {
        &self.routing
    }

    pub fn routing_mut(&mut self) -> &mut RoutingStrategy {
        &mut self.routing
    }

    #[must_use]
    pub fn num_static_links(&self) -> usize {
        self.num_static_links
    }

    pub fn switch(&self, id: NodeId) -> Result<Rc<RefCell<ReconfigurableSwitch>>, SimError> {
        Ok(self.devices.reconfigurable(id)?)
    }

    #[must_use]
    pub fn has_planner(&self) -> bool {
        self.planner.is_some()
    }

    /// Register the reconfiguration plan, if there is one.
    pub fn plan_reconfigurations(&mut self, engine: &Engine) -> SimResult {
        match &mut self.planner {
            Some(planner) => planner.plan_reconfiguration_events(engine.simulator()),
            None => Ok(()),
        }
    }

    #[must_use]
    pub fn num_planned(&self) -> usize {
        self.planner.as_ref().map_or(0, |p| p.num_registered())
    }
}

impl Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Routing: {}", self.routing.kind())?;
        writeln!(f, "Devices:")?;
        for id in self.devices.ids() {
            if let Ok(info) = self.devices.info(id) {
                let kind = if info.is_server { "server" } else { "switch" };
                writeln!(f, "  {id}: {kind} in block {}", info.block)?;
            }
        }
        writeln!(f, "\nReconfigurable ports:")?;
        for id in self.devices.ids() {
            if let Ok(switch) = self.devices.reconfigurable(id) {
                for port in switch.borrow().ports() {
                    writeln!(
                        f,
                        "  {id} -> block {}: x{}",
                        port.target_block(),
                        port.multiplicity()
                    )?;
                }
            }
        }
        Ok(())
    }
}
