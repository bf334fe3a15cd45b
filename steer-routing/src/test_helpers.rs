// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! A minimal transport packet for exercising routing in tests.

use steer_engine::traits::{CongestionMarked, FlowPacket, TotalBits};
use steer_engine::types::{FlowId, NodeId};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TestPacket {
    pub flow_id: FlowId,
    pub source_id: NodeId,
    pub destination_id: NodeId,
    pub size_bits: u64,
    pub ecn: bool,
}

impl TestPacket {
    #[must_use]
    pub fn new(flow_id: FlowId, source_id: NodeId, destination_id: NodeId, size_bits: u64) -> Self {
        Self {
            flow_id,
            source_id,
            destination_id,
            size_bits,
            ecn: false,
        }
    }
}

impl TotalBits for TestPacket {
    fn total_bits(&self) -> u64 {
        self.size_bits
    }
}

impl CongestionMarked for TestPacket {
    fn mark_congestion_encountered(&mut self) {
        self.ecn = true;
    }

    fn congestion_encountered(&self) -> bool {
        self.ecn
    }
}

impl FlowPacket for TestPacket {
    fn flow_id(&self) -> FlowId {
        self.flow_id
    }

    fn source_id(&self) -> NodeId {
        self.source_id
    }

    fn destination_id(&self) -> NodeId {
        self.destination_id
    }
}
