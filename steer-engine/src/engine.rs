// Copyright (c) 2023 Graphcore Ltd. All rights reserved.

use std::rc::Rc;

use steer_track::Tracker;
use steer_track::entity::{Entity, toplevel};
use steer_track::tracker::stdout_tracker;

use crate::simulator::Simulator;
use crate::types::{SimResult, SimTimeNs};

pub struct Engine {
    simulator: Rc<Simulator>,
    toplevel: Rc<Entity>,
    tracker: Tracker,
}

impl Engine {
    /// Create a standalone engine.
    pub fn new(tracker: &Tracker) -> Self {
        let toplevel = toplevel(tracker, "top");
        let simulator = Rc::new(Simulator::new(&toplevel));
        Self {
            simulator,
            toplevel,
            tracker: tracker.clone(),
        }
    }

    pub fn run(&mut self) -> SimResult {
        let result = self.simulator.run();
        self.tracker.shutdown();
        result
    }

    pub fn run_until(&mut self, end_ns: SimTimeNs) -> SimResult {
        let result = self.simulator.run_until(end_ns);
        self.tracker.shutdown();
        result
    }

    pub fn simulator(&self) -> &Rc<Simulator> {
        &self.simulator
    }

    pub fn time_now_ns(&self) -> SimTimeNs {
        self.simulator.time_now_ns()
    }

    pub fn top(&self) -> &Rc<Entity> {
        &self.toplevel
    }

    pub fn tracker(&self) -> Tracker {
        self.tracker.clone()
    }
}

/// Create a default engine that sends [`Track`](steer_track::Track) events to
/// stdout.
///
/// This is provided to keep documentation examples simple.
impl Default for Engine {
    fn default() -> Self {
        let tracker = stdout_tracker(log::Level::Warn);
        Self::new(&tracker)
    }
}
