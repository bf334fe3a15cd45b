// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use steer_engine::types::{BlockId, NodeId, SimTimeNs};
use steer_routing::registry::{BlockWeightTuple, DEFAULT_WEIGHT_TOLERANCE, InterBlockWeights};
use steer_topology::device::DeviceRegistry;
use steer_topology::link::ReconfigurableLinkFactory;
use steer_topology::reconfiguration::event::ReconfigurationEvent;
use steer_topology::switch::ReconfigurableSwitch;
use steer_track::entity::Entity;

pub const LATENCY_NS: SimTimeNs = 50;

/// Three blocks, each with one reconfigurable switch (10, 20 and 30) with
/// two links to each other block. Block 0 also has server 11.
pub struct Fabric {
    pub devices: Rc<DeviceRegistry>,
    pub switches: Vec<Rc<RefCell<ReconfigurableSwitch>>>,
}

impl Fabric {
    pub fn switch(&self, id: NodeId) -> Rc<RefCell<ReconfigurableSwitch>> {
        self.devices.reconfigurable(id).unwrap()
    }
}

pub fn block_weights(entries: &[(BlockId, BlockId, BlockId, f64)]) -> Rc<InterBlockWeights> {
    let tuples = entries.iter().map(|(s, d, i, w)| BlockWeightTuple {
        source: *s,
        destination: *d,
        intermediate: *i,
        weight: *w,
    });
    Rc::new(InterBlockWeights::from_block_tuples(tuples, DEFAULT_WEIGHT_TOLERANCE).unwrap())
}

pub fn direct_weights() -> Rc<InterBlockWeights> {
    let mut entries = Vec::new();
    for s in 0..3 {
        for d in 0..3 {
            if s != d {
                entries.push((s, d, d, 1.0));
            }
        }
    }
    block_weights(&entries)
}

pub fn fabric(parent: &Rc<Entity>) -> Fabric {
    let weights = direct_weights();
    let mut devices = DeviceRegistry::new();
    devices.add_server(11, 0).unwrap();
    let switches = [(10, 0), (20, 1), (30, 2)]
        .into_iter()
        .map(|(id, block)| {
            devices
                .add_reconfigurable_switch(ReconfigurableSwitch::new(
                    parent,
                    id,
                    block,
                    weights.clone(),
                ))
                .unwrap()
        })
        .collect();

    let factory = ReconfigurableLinkFactory::new(100, 10, 25);
    for from in [10, 20, 30] {
        for to in [10, 20, 30] {
            if from != to {
                devices.connect(from, to, 2, &factory).unwrap();
            }
        }
    }

    Fabric {
        devices: Rc::new(devices),
        switches,
    }
}

pub fn event(
    time_ns: SimTimeNs,
    device: NodeId,
    details: &[(BlockId, i64)],
    during: &Rc<InterBlockWeights>,
    after: &Rc<InterBlockWeights>,
) -> ReconfigurationEvent {
    ReconfigurationEvent {
        time_ns,
        device,
        details: details.iter().copied().collect::<BTreeMap<_, _>>(),
        during: during.clone(),
        after: after.clone(),
    }
}
