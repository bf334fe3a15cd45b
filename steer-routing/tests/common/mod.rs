// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

use std::collections::HashMap;

use steer_engine::types::{BlockId, NodeId};
use steer_routing::ugal::{BlockCongestion, CandidatePort};

/// A fabric whose queue occupancy is set directly by the test.
#[derive(Default)]
pub struct TestFabric {
    pub num_blocks: usize,
    pub between: HashMap<(BlockId, BlockId), Vec<CandidatePort>>,
    pub local: HashMap<(NodeId, BlockId), Vec<CandidatePort>>,
}

impl TestFabric {
    pub fn new(num_blocks: usize) -> Self {
        Self {
            num_blocks,
            ..Default::default()
        }
    }

    pub fn set_between(&mut self, from: BlockId, to: BlockId, ports: &[(NodeId, u64)]) {
        self.between.insert((from, to), to_ports(ports));
    }

    pub fn set_local(&mut self, switch: NodeId, to: BlockId, ports: &[(NodeId, u64)]) {
        self.local.insert((switch, to), to_ports(ports));
    }
}

fn to_ports(ports: &[(NodeId, u64)]) -> Vec<CandidatePort> {
    ports
        .iter()
        .map(|(owner, occupied_bits)| CandidatePort {
            owner: *owner,
            occupied_bits: *occupied_bits,
        })
        .collect()
}

impl BlockCongestion for TestFabric {
    fn num_blocks(&self) -> usize {
        self.num_blocks
    }

    fn ports_between(&self, from: BlockId, to: BlockId) -> Vec<CandidatePort> {
        self.between.get(&(from, to)).cloned().unwrap_or_default()
    }

    fn local_ports_toward(&self, switch: NodeId, to: BlockId) -> Vec<CandidatePort> {
        self.local.get(&(switch, to)).cloned().unwrap_or_default()
    }

    fn exit_switches(&self, block: BlockId, to: BlockId) -> Vec<NodeId> {
        self.ports_between(block, to)
            .iter()
            .map(|p| p.owner)
            .collect()
    }
}
