// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use steer_engine::run_simulation;
use steer_engine::sim_error;
use steer_engine::simulator::Simulator;
use steer_engine::test_helpers::start_test;
use steer_engine::traits::Event;
use steer_engine::types::SimResult;

mod common;
use common::recorder;

struct Failing;

impl fmt::Display for Failing {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "failing")
    }
}

impl Event for Failing {
    fn trigger(self: Box<Self>, _simulator: &Simulator) -> SimResult {
        sim_error!("handler failed")
    }
}

#[test]
#[should_panic(expected = "handler failed")]
fn handler_error_stops_run() {
    let mut engine = start_test(file!());
    engine.simulator().schedule_at(5, Box::new(Failing)).unwrap();
    run_simulation!(engine);
}

#[test]
fn handler_error_is_returned() {
    let mut engine = start_test(file!());
    let record = Rc::new(RefCell::new(Vec::new()));

    let simulator = engine.simulator().clone();
    simulator.schedule_at(5, Box::new(Failing)).unwrap();
    simulator.schedule_at(10, recorder(1, &record)).unwrap();

    run_simulation!(engine, "Error: handler failed");

    // The later event is left unfired
    assert!(record.borrow().is_empty());
    assert_eq!(simulator.num_pending(), 1);
}

#[test]
fn schedule_in_the_past() {
    let mut engine = start_test(file!());
    let record = Rc::new(RefCell::new(Vec::new()));

    engine.run_until(100).unwrap();
    let result = engine.simulator().schedule_at(99, recorder(1, &record));
    match result {
        Ok(_) => panic!("Expected an error!"),
        Err(e) => assert!(format!("{e}").contains("time is already 100ns")),
    }
}

#[test]
fn cancel_after_fire() {
    let mut engine = start_test(file!());
    let record = Rc::new(RefCell::new(Vec::new()));

    let simulator = engine.simulator().clone();
    let handle = simulator.schedule_at(10, recorder(1, &record)).unwrap();
    run_simulation!(engine);

    let e = simulator.cancel(handle).unwrap_err();
    assert!(format!("{e}").contains("has already fired"));
}

#[test]
fn cancel_twice() {
    let engine = start_test(file!());
    let record = Rc::new(RefCell::new(Vec::new()));

    let simulator = engine.simulator().clone();
    let handle = simulator.schedule_at(10, recorder(1, &record)).unwrap();
    simulator.cancel(handle).unwrap();

    let e = simulator.cancel(handle).unwrap_err();
    assert!(format!("{e}").contains("has already been cancelled"));
}
