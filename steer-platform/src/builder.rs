// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

use std::path::Path;
use std::rc::Rc;

use steer_engine::types::SimError;
use steer_routing::load_balancer::{LoadBalancer, StatefulLoadBalancer, StatelessLoadBalancer};
use steer_routing::flow_cache::FlowRouteCache;
use steer_routing::registry::{BlockWeightTuple, DEFAULT_WEIGHT_TOLERANCE, InterBlockWeights};
use steer_routing::ugal::{UgalGlobal, UgalLocal};
use steer_routing::valiant::{EcmpThenValiant, ValiantSelector};
use steer_topology::device::{DeviceHandle, DeviceRegistry};
use steer_topology::link::{
    DifferentInjectionLinkFactory, LinkFactory, PerfectSimpleLinkFactory,
    ReconfigurableLinkFactory,
};
use steer_topology::reconfiguration::ReconfigurationPlanner;
use steer_topology::reconfiguration::event::ReconfigurationEvent;
use steer_topology::reconfiguration::periodic::{Epoch, PeriodicPlanner};
use steer_topology::reconfiguration::scheduled::ScheduledPlanner;
use steer_topology::switch::ReconfigurableSwitch;
use steer_track::entity::Entity;
use steer_track::str_to_level;
use steer_track::tracker::{Tracker, file_tracker, stdout_tracker};

use crate::routing::RoutingStrategy;
use crate::types::{
    BlockWeightSection, FabricConfig, LinkKind, LoadBalancerKind, RoutingKind, RunConfig,
};

pub fn build_link_factory(cfg: &RunConfig) -> Box<dyn LinkFactory> {
    match cfg.link {
        LinkKind::PerfectSimple => Box::new(PerfectSimpleLinkFactory::new(
            cfg.link_delay_ns,
            cfg.link_bandwidth_bit_per_ns,
        )),
        LinkKind::PerfectSimpleDifferentInjectionBandwidth => {
            Box::new(DifferentInjectionLinkFactory::new(
                cfg.link_delay_ns,
                cfg.link_bandwidth_bit_per_ns,
                cfg.injection_link_bandwidth_bit_per_ns,
            ))
        }
        LinkKind::ReconfigurableLink => Box::new(ReconfigurableLinkFactory::new(
            cfg.link_delay_ns,
            cfg.server_link_delay_ns,
            cfg.link_bandwidth_bit_per_ns,
        )),
    }
}

pub fn build_load_balancer(cfg: &RunConfig) -> Box<dyn LoadBalancer> {
    match cfg.load_balancer {
        LoadBalancerKind::Stateless => Box::new(StatelessLoadBalancer::new(cfg.seed)),
        LoadBalancerKind::Stateful => Box::new(StatefulLoadBalancer::new()),
    }
}

pub fn build_valiant_selector(cfg: &RunConfig) -> Result<ValiantSelector, SimError> {
    Ok(ValiantSelector::new(
        cfg.routing_random_valiant_node_range_lower_incl,
        cfg.routing_random_valiant_node_range_upper_incl,
        cfg.seed,
    )?)
}

#[must_use]
pub fn build_ecmp_then_valiant(cfg: &RunConfig) -> EcmpThenValiant {
    EcmpThenValiant::new(cfg.routing_ecmp_then_valiant_switch_threshold_bytes)
}

pub fn build_routing(parent: &Rc<Entity>, cfg: &RunConfig) -> Result<RoutingStrategy, SimError> {
    let strategy = match cfg.routing {
        RoutingKind::Wcmp => RoutingStrategy::Wcmp {
            flows: FlowRouteCache::new(),
            balancer: build_load_balancer(cfg),
        },
        RoutingKind::Threshold => RoutingStrategy::Threshold {
            rate_bit_per_ns: cfg.threshold_rate_bit_per_ns,
            seed: cfg.seed,
        },
        RoutingKind::ReconfigurablePod => RoutingStrategy::ReconfigurablePod,
        RoutingKind::BlockValiant => RoutingStrategy::BlockValiant {
            selector: build_valiant_selector(cfg)?,
            mode: build_ecmp_then_valiant(cfg),
        },
        RoutingKind::BlockUgalG => {
            RoutingStrategy::BlockUgalG(UgalGlobal::new(parent, "ugal_g", cfg.seed))
        }
        RoutingKind::BlockUgalL => {
            RoutingStrategy::BlockUgalL(UgalLocal::new(parent, "ugal_l", cfg.seed))
        }
    };
    Ok(strategy)
}

pub fn build_tracker(cfg: &RunConfig) -> Result<Tracker, SimError> {
    let level: log::Level = str_to_level(&cfg.log_level)
        .ok_or_else(|| SimError(format!("Unknown log level '{}'", cfg.log_level)))?;
    if cfg.log_file == "-" {
        Ok(stdout_tracker(level))
    } else {
        file_tracker(Path::new(&cfg.log_file), level, None).map_err(|e| SimError(e.to_string()))
    }
}

pub fn build_block_weights(
    sections: &[BlockWeightSection],
) -> Result<Rc<InterBlockWeights>, SimError> {
    let tuples = sections.iter().map(|s| BlockWeightTuple {
        source: s.source,
        destination: s.destination,
        intermediate: s.intermediate,
        weight: s.weight,
    });
    Ok(Rc::new(InterBlockWeights::from_block_tuples(
        tuples,
        DEFAULT_WEIGHT_TOLERANCE,
    )?))
}

/// Register every device and attach the links leaving reconfigurable
/// switches. Returns the number of links that are not reconfigurable.
pub fn build_devices(
    parent: &Rc<Entity>,
    cfg: &RunConfig,
    fabric: &FabricConfig,
    weights: &Rc<InterBlockWeights>,
) -> Result<(DeviceRegistry, usize), SimError> {
    let mut devices = DeviceRegistry::new();
    if let Some(servers) = &fabric.servers {
        for server in servers {
            devices.add_server(server.id, server.block)?;
        }
    }
    if let Some(switches) = &fabric.switches {
        for switch in switches {
            if switch.reconfigurable {
                devices.add_reconfigurable_switch(ReconfigurableSwitch::new(
                    parent,
                    switch.id,
                    switch.block,
                    weights.clone(),
                ))?;
            } else {
                devices.add_switch(switch.id, switch.block)?;
            }
        }
    }

    let factory = build_link_factory(cfg);
    let mut num_static_links = 0;
    if let Some(links) = &fabric.links {
        for link in links {
            let multiplicity = link.multiplicity.unwrap_or(1);
            match devices.get(link.from)? {
                DeviceHandle::Reconfigurable(_) => {
                    devices.connect(link.from, link.to, multiplicity, factory.as_ref())?;
                }
                _ => {
                    let from = devices.info(link.from)?;
                    let to = devices.info(link.to)?;
                    factory.create(&from, &to, multiplicity)?;
                    num_static_links += 1;
                }
            }
        }
    }
    Ok((devices, num_static_links))
}

pub fn build_planner(
    parent: &Rc<Entity>,
    cfg: &RunConfig,
    fabric: &FabricConfig,
    devices: &Rc<DeviceRegistry>,
) -> Result<Option<Box<dyn ReconfigurationPlanner>>, SimError> {
    let Some(section) = &fabric.reconfiguration else {
        return Ok(None);
    };

    match (&section.events, &section.epochs) {
        (Some(_), Some(_)) => Err(SimError(
            "reconfiguration must list either events or epochs, not both".to_string(),
        )),
        (Some(events), None) => {
            let mut planned = Vec::with_capacity(events.len());
            for e in events {
                planned.push(ReconfigurationEvent {
                    time_ns: e.time_ns,
                    device: e.device,
                    details: e.details.clone(),
                    during: build_block_weights(&e.during)?,
                    after: build_block_weights(&e.after)?,
                });
            }
            let planner = ScheduledPlanner::new(
                parent,
                devices.clone(),
                cfg.link_reconfig_latency_ns,
                planned,
            )?;
            Ok(Some(Box::new(planner)))
        }
        (None, Some(epochs)) => {
            let mut cycle = Vec::with_capacity(epochs.len());
            for e in epochs {
                cycle.push(Epoch {
                    offset_ns: e.offset_ns,
                    switches: e.switches.clone(),
                    during: build_block_weights(&e.during)?,
                    after: build_block_weights(&e.after)?,
                });
            }
            let planner = PeriodicPlanner::new(
                parent,
                devices.clone(),
                cfg.link_reconfig_latency_ns,
                &cycle,
                cfg.reconfiguration_period_ns,
                cfg.run_time_ns,
            )?;
            Ok(Some(Box::new(planner)))
        }
        (None, None) => Ok(None),
    }
}
