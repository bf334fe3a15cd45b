// Copyright (c) 2023 Graphcore Ltd. All rights reserved.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use steer_engine::simulator::Simulator;
use steer_engine::traits::Event;
use steer_engine::types::{SimResult, SimTimeNs};

/// Shared record of `(label, time)` for each event that fired.
pub type Record = Rc<RefCell<Vec<(u32, SimTimeNs)>>>;

pub struct Recorder {
    pub label: u32,
    pub record: Record,
}

impl fmt::Display for Recorder {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "recorder {}", self.label)
    }
}

impl Event for Recorder {
    fn trigger(self: Box<Self>, simulator: &Simulator) -> SimResult {
        self.record
            .borrow_mut()
            .push((self.label, simulator.time_now_ns()));
        Ok(())
    }
}

pub fn recorder(label: u32, record: &Record) -> Box<Recorder> {
    Box::new(Recorder {
        label,
        record: record.clone(),
    })
}

/// An event that re-registers itself every `period_ns` until `count` is zero.
pub struct Repeat {
    pub period_ns: SimTimeNs,
    pub count: u32,
    pub record: Record,
}

impl fmt::Display for Repeat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "repeat {}", self.count)
    }
}

impl Event for Repeat {
    fn trigger(self: Box<Self>, simulator: &Simulator) -> SimResult {
        self.record
            .borrow_mut()
            .push((self.count, simulator.time_now_ns()));
        if self.count > 1 {
            let period_ns = self.period_ns;
            simulator.schedule_in(
                period_ns,
                Box::new(Repeat {
                    period_ns,
                    count: self.count - 1,
                    record: self.record,
                }),
            )?;
        }
        Ok(())
    }
}
