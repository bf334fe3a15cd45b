// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

use std::collections::HashSet;

use steer_engine::test_helpers::start_test;
use steer_routing::encapsulation::{AdaptiveRouteEncapsulation, RouteStateKind};
use steer_routing::errors::RoutingError;
use steer_routing::test_helpers::TestPacket;
use steer_routing::ugal::{HopTarget, UgalChoice, UgalGlobal, UgalLocal, next_hop_target};

mod common;
use common::TestFabric;

// Blocks 0, 1 and 2 hold switches 10-11, 20-21 and 30-31.
fn three_blocks(direct_bits: u64) -> TestFabric {
    let mut fabric = TestFabric::new(3);
    fabric.set_between(0, 2, &[(10, direct_bits)]);
    fabric.set_between(0, 1, &[(11, 100)]);
    fabric.set_between(1, 2, &[(21, 200)]);
    fabric
}

fn packet_to_block_2() -> AdaptiveRouteEncapsulation<TestPacket> {
    AdaptiveRouteEncapsulation::new(TestPacket::new(5, 100, 300, 8000), 2)
}

#[test]
fn global_takes_cheaper_detour() {
    let engine = start_test(file!());
    let mut ugal = UgalGlobal::new(engine.top(), "ugal", 1);
    let fabric = three_blocks(5000);

    let mut enc = packet_to_block_2();
    let choice = ugal.decide(&mut enc, 0, 10, &fabric).unwrap();
    assert_eq!(choice, UgalChoice::Valiant { block: 1 });
    assert_eq!(enc.state(), RouteStateKind::ValiantChosen);
    assert_eq!(enc.entry_switch().unwrap(), 11);
    assert_eq!(enc.exit_switch().unwrap(), 21);

    // Walk the packet through the fabric
    assert_eq!(
        next_hop_target(&mut enc, 0, 10).unwrap(),
        HopTarget::TowardSwitch(11)
    );
    assert_eq!(
        next_hop_target(&mut enc, 0, 11).unwrap(),
        HopTarget::TowardBlock(1)
    );
    assert_eq!(
        next_hop_target(&mut enc, 1, 20).unwrap(),
        HopTarget::TowardSwitch(21)
    );
    assert_eq!(enc.state(), RouteStateKind::ValiantEntered);
    assert_eq!(
        next_hop_target(&mut enc, 1, 21).unwrap(),
        HopTarget::TowardBlock(2)
    );
    assert_eq!(next_hop_target(&mut enc, 2, 30).unwrap(), HopTarget::Deliver);
    assert_eq!(enc.state(), RouteStateKind::Delivered);
}

#[test]
fn global_keeps_direct_when_not_strictly_cheaper() {
    let engine = start_test(file!());
    let mut ugal = UgalGlobal::new(engine.top(), "ugal", 1);

    // Detour costs 300 bits, the same as the direct port
    let fabric = three_blocks(300);
    let mut enc = packet_to_block_2();
    assert_eq!(
        ugal.decide(&mut enc, 0, 10, &fabric).unwrap(),
        UgalChoice::Direct
    );

    // The direct path is modelled as entering the source block at once
    assert_eq!(enc.state(), RouteStateKind::ValiantEntered);
    assert_eq!(enc.valiant_block().unwrap(), 0);
    assert_eq!(enc.entry_switch().unwrap(), 10);
    assert_eq!(enc.exit_switch().unwrap(), 10);

    assert_eq!(
        next_hop_target(&mut enc, 0, 10).unwrap(),
        HopTarget::TowardBlock(2)
    );
    assert_eq!(next_hop_target(&mut enc, 2, 31).unwrap(), HopTarget::Deliver);
}

#[test]
fn direct_from_non_exit_switch() {
    let engine = start_test(file!());
    let mut ugal = UgalGlobal::new(engine.top(), "ugal", 1);
    let fabric = three_blocks(0);

    let mut enc = packet_to_block_2();
    ugal.decide(&mut enc, 0, 11, &fabric).unwrap();
    assert_eq!(
        next_hop_target(&mut enc, 0, 11).unwrap(),
        HopTarget::TowardSwitch(10)
    );
}

#[test]
fn two_blocks_always_direct() {
    let engine = start_test(file!());
    let mut ugal = UgalGlobal::new(engine.top(), "ugal", 1);
    let mut fabric = TestFabric::new(2);
    fabric.set_between(0, 1, &[(10, 1_000_000)]);

    let mut enc = AdaptiveRouteEncapsulation::new(TestPacket::new(1, 100, 200, 8000), 1);
    assert_eq!(
        ugal.decide(&mut enc, 0, 10, &fabric).unwrap(),
        UgalChoice::Direct
    );
}

#[test]
fn same_block_is_left_pending() {
    let engine = start_test(file!());
    let mut ugal = UgalGlobal::new(engine.top(), "ugal", 1);
    let fabric = three_blocks(0);

    let mut enc = AdaptiveRouteEncapsulation::new(TestPacket::new(1, 100, 101, 8000), 0);
    assert_eq!(
        ugal.decide(&mut enc, 0, 10, &fabric).unwrap(),
        UgalChoice::Direct
    );
    assert_eq!(enc.state(), RouteStateKind::DirectPending);
    assert_eq!(next_hop_target(&mut enc, 0, 10).unwrap(), HopTarget::Deliver);
}

#[test]
fn missing_direct_port() {
    let engine = start_test(file!());
    let mut ugal = UgalGlobal::new(engine.top(), "ugal", 1);
    let fabric = TestFabric::new(3);

    let mut enc = packet_to_block_2();
    assert_eq!(
        ugal.decide(&mut enc, 0, 10, &fabric),
        Err(RoutingError::NoPortBetweenBlocks { from: 0, to: 2 })
    );
    assert_eq!(enc.state(), RouteStateKind::DirectPending);
}

#[test]
fn ties_are_broken_randomly() {
    let engine = start_test(file!());
    let mut ugal = UgalGlobal::new(engine.top(), "ugal", 9);
    let mut fabric = TestFabric::new(2);
    fabric.set_between(0, 1, &[(10, 0), (11, 0), (12, 7)]);

    let mut exits = HashSet::new();
    for flow in 0..100 {
        let mut enc = AdaptiveRouteEncapsulation::new(TestPacket::new(flow, 100, 200, 8000), 1);
        ugal.decide(&mut enc, 0, 10, &fabric).unwrap();
        exits.insert(enc.exit_switch().unwrap());
    }
    assert_eq!(exits, HashSet::from([10, 11]));
}

#[test]
fn decision_is_made_once() {
    let engine = start_test(file!());
    let mut ugal = UgalGlobal::new(engine.top(), "ugal", 1);
    let fabric = three_blocks(5000);

    let mut enc = packet_to_block_2();
    ugal.decide(&mut enc, 0, 10, &fabric).unwrap();
    assert!(matches!(
        ugal.decide(&mut enc, 0, 10, &fabric),
        Err(RoutingError::RoutingDecisionAlreadyMade { .. })
    ));
}

#[test]
fn hop_before_decision_is_an_error() {
    let mut enc = packet_to_block_2();
    assert_eq!(
        next_hop_target(&mut enc, 0, 10),
        Err(RoutingError::UnresolvedValiantBlock)
    );
}

#[test]
fn local_picks_exit_inside_valiant_block() {
    let engine = start_test(file!());
    let mut ugal = UgalLocal::new(engine.top(), "ugal_l", 3);
    let mut fabric = three_blocks(0);
    fabric.set_local(10, 2, &[(10, 900)]);
    fabric.set_local(10, 1, &[(11, 50)]);

    let mut enc = packet_to_block_2();
    assert_eq!(
        ugal.decide(&mut enc, 0, 10, &fabric).unwrap(),
        UgalChoice::Valiant { block: 1 }
    );
    assert_eq!(
        enc.exit_switch(),
        Err(RoutingError::UnresolvedExitSwitch { valiant_block: 1 })
    );

    assert_eq!(
        ugal.next_hop_target(&mut enc, 0, 10, &fabric).unwrap(),
        HopTarget::TowardSwitch(11)
    );
    assert_eq!(
        ugal.next_hop_target(&mut enc, 0, 11, &fabric).unwrap(),
        HopTarget::TowardBlock(1)
    );
    assert_eq!(
        ugal.next_hop_target(&mut enc, 1, 20, &fabric).unwrap(),
        HopTarget::TowardSwitch(21)
    );
    assert_eq!(enc.exit_switch().unwrap(), 21);
    assert_eq!(
        ugal.next_hop_target(&mut enc, 1, 21, &fabric).unwrap(),
        HopTarget::TowardBlock(2)
    );
    assert_eq!(
        ugal.next_hop_target(&mut enc, 2, 30, &fabric).unwrap(),
        HopTarget::Deliver
    );
}

#[test]
fn local_prefers_direct_on_equal_queues() {
    let engine = start_test(file!());
    let mut ugal = UgalLocal::new(engine.top(), "ugal_l", 3);
    let mut fabric = three_blocks(0);
    fabric.set_local(10, 2, &[(11, 50)]);
    fabric.set_local(10, 1, &[(11, 50)]);

    let mut enc = packet_to_block_2();
    assert_eq!(
        ugal.decide(&mut enc, 0, 10, &fabric).unwrap(),
        UgalChoice::Direct
    );
    assert_eq!(enc.exit_switch().unwrap(), 11);
    assert_eq!(
        ugal.next_hop_target(&mut enc, 0, 10, &fabric).unwrap(),
        HopTarget::TowardSwitch(11)
    );
}

#[test]
fn congestion_does_not_change_route() {
    let engine = start_test(file!());
    let mut ugal = UgalGlobal::new(engine.top(), "ugal", 1);
    let fabric = three_blocks(5000);

    let mut enc = packet_to_block_2();
    ugal.decide(&mut enc, 0, 10, &fabric).unwrap();
    enc.mark_congestion_encountered().unwrap();

    assert!(enc.packet().ecn);
    assert_eq!(enc.state(), RouteStateKind::ValiantChosen);
    assert_eq!(enc.valiant_block().unwrap(), 1);
}
