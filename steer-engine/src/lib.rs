// Copyright (c) 2023 Graphcore Ltd. All rights reserved.

#![doc(test(attr(warn(unused))))]

//! `STEER` - Simulation of Traffic Engineering and Elastic Reconfiguration
//!
//! This library provides the core of the STEER network simulator: the
//! [discrete-event scheduler](crate::simulator) that drives routing and
//! reconfiguration decisions, the [engine](crate::engine) that owns it and
//! the types shared by the rest of the workspace.
//!
//! # Simple Application
//!
//! ```rust
//! use std::fmt;
//!
//! use steer_engine::engine::Engine;
//! use steer_engine::run_simulation;
//! use steer_engine::simulator::Simulator;
//! use steer_engine::traits::Event;
//! use steer_engine::types::SimResult;
//!
//! struct Hello;
//!
//! impl fmt::Display for Hello {
//!     fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
//!         write!(f, "hello")
//!     }
//! }
//!
//! impl Event for Hello {
//!     fn trigger(self: Box<Self>, _simulator: &Simulator) -> SimResult {
//!         Ok(())
//!     }
//! }
//!
//! let mut engine = Engine::default();
//! engine.simulator().schedule_at(100, Box::new(Hello)).unwrap();
//! run_simulation!(engine);
//! assert_eq!(engine.time_now_ns(), 100);
//! ```

pub mod engine;
pub mod simulator;
pub mod test_helpers;
pub mod traits;
pub mod types;

#[macro_export]
/// Run the simulation until no events remain.
macro_rules! run_simulation {
    ($engine:ident) => {
        $engine.run().unwrap();
    };
    ($engine:ident, $expect:expr) => {
        match $engine.run() {
            Ok(()) => panic!("Expected an error!"),
            Err(e) => assert_eq!(format!("{e}").as_str(), $expect),
        }
    };
}
