// Copyright (c) 2023 Graphcore Ltd. All rights reserved.

//! The discrete-event scheduler.
//!
//! Events are registered at an absolute time in `ns` and fire in
//! non-decreasing time order. Events registered for the same time fire in
//! the order in which they were registered.
//!
//! ```rust
//! use std::fmt;
//! use std::rc::Rc;
//! use std::cell::Cell;
//!
//! use steer_engine::simulator::Simulator;
//! use steer_engine::traits::Event;
//! use steer_engine::types::SimResult;
//! use steer_track::entity::toplevel;
//! use steer_track::tracker::dev_null_tracker;
//!
//! struct Tick(Rc<Cell<u64>>);
//!
//! impl fmt::Display for Tick {
//!     fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
//!         write!(f, "tick")
//!     }
//! }
//!
//! impl Event for Tick {
//!     fn trigger(self: Box<Self>, simulator: &Simulator) -> SimResult {
//!         self.0.set(simulator.time_now_ns());
//!         Ok(())
//!     }
//! }
//!
//! let top = toplevel(&dev_null_tracker(), "top");
//! let simulator = Simulator::new(&top);
//! let seen = Rc::new(Cell::new(0));
//! simulator.schedule_at(25, Box::new(Tick(seen.clone()))).unwrap();
//! simulator.run().unwrap();
//! assert_eq!(seen.get(), 25);
//! ```

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

use steer_track::entity::Entity;
use steer_track::{set_time, trace};

use crate::sim_error;
use crate::traits::Event;
use crate::types::{SimError, SimResult, SimTimeNs};

/// Returned when an event is registered so that it can later be cancelled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventHandle(u64);

impl fmt::Display for EventHandle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

struct Scheduled {
    time_ns: SimTimeNs,
    handle: EventHandle,
    event: Box<dyn Event>,
}

impl Scheduled {
    fn key(&self) -> (SimTimeNs, EventHandle) {
        (self.time_ns, self.handle)
    }
}

pub struct Simulator {
    entity: Rc<Entity>,

    now_ns: Cell<SimTimeNs>,

    next_handle: Cell<u64>,

    /// Queue of events waiting for the right time. This is kept sorted by
    /// (time, handle) in descending order so that the last entry is the next
    /// to fire.
    queue: RefCell<Vec<Scheduled>>,

    cancelled: RefCell<HashSet<EventHandle>>,

    num_fired: Cell<u64>,
}

impl Simulator {
    #[must_use]
    pub fn new(parent: &Rc<Entity>) -> Self {
        Self {
            entity: parent.child("simulator"),
            now_ns: Cell::new(0),
            next_handle: Cell::new(0),
            queue: RefCell::new(Vec::new()),
            cancelled: RefCell::new(HashSet::new()),
            num_fired: Cell::new(0),
        }
    }

    #[must_use]
    pub fn entity(&self) -> &Rc<Entity> {
        &self.entity
    }

    /// Returns the current time in `ns`.
    #[must_use]
    pub fn time_now_ns(&self) -> SimTimeNs {
        self.now_ns.get()
    }

    /// Returns the time in `ns` of the next pending event.
    #[must_use]
    pub fn time_of_next(&self) -> Option<SimTimeNs> {
        self.queue.borrow().last().map(|s| s.time_ns)
    }

    #[must_use]
    pub fn num_pending(&self) -> usize {
        self.queue.borrow().len()
    }

    #[must_use]
    pub fn num_fired(&self) -> u64 {
        self.num_fired.get()
    }

    #[must_use]
    pub fn is_pending(&self, handle: EventHandle) -> bool {
        self.queue.borrow().iter().any(|s| s.handle == handle)
    }

    /// Register `event` to fire at the absolute time `time_ns`.
    pub fn schedule_at(
        &self,
        time_ns: SimTimeNs,
        event: Box<dyn Event>,
    ) -> Result<EventHandle, SimError> {
        let now_ns = self.time_now_ns();
        if time_ns < now_ns {
            return sim_error!(format!(
                "{}: cannot schedule '{event}' at {time_ns}ns, time is already {now_ns}ns",
                self.entity
            ));
        }

        let handle = EventHandle(self.next_handle.get());
        self.next_handle.set(handle.0 + 1);
        trace!(self.entity ; "schedule {handle} '{event}' at {time_ns}ns");

        let scheduled = Scheduled {
            time_ns,
            handle,
            event,
        };
        let key = scheduled.key();
        let mut queue = self.queue.borrow_mut();
        match queue.iter().position(|s| s.key() < key) {
            Some(index) => queue.insert(index, scheduled),
            None => queue.push(scheduled),
        }
        Ok(handle)
    }

    /// Register `event` to fire `delay_ns` after the current time.
    pub fn schedule_in(
        &self,
        delay_ns: SimTimeNs,
        event: Box<dyn Event>,
    ) -> Result<EventHandle, SimError> {
        self.schedule_at(self.time_now_ns().saturating_add(delay_ns), event)
    }

    /// Remove a pending event so that it never fires.
    ///
    /// Fails if the event has already fired, has already been cancelled or
    /// was never registered.
    pub fn cancel(&self, handle: EventHandle) -> SimResult {
        let removed = {
            let mut queue = self.queue.borrow_mut();
            queue
                .iter()
                .position(|s| s.handle == handle)
                .map(|index| queue.remove(index))
        };

        match removed {
            Some(scheduled) => {
                trace!(self.entity ; "cancel {handle} '{}' at {}ns", scheduled.event, scheduled.time_ns);
                self.cancelled.borrow_mut().insert(handle);
                Ok(())
            }
            None if self.cancelled.borrow().contains(&handle) => sim_error!(format!(
                "{}: event {handle} has already been cancelled",
                self.entity
            )),
            None if handle.0 < self.next_handle.get() => sim_error!(format!(
                "{}: event {handle} has already fired",
                self.entity
            )),
            None => sim_error!(format!("{}: unknown event {handle}", self.entity)),
        }
    }

    /// Fire events until none remain.
    pub fn run(&self) -> SimResult {
        while self.fire_next(SimTimeNs::MAX)? {}
        Ok(())
    }

    /// Fire all events registered at or before `end_ns` and then advance the
    /// time to `end_ns`.
    pub fn run_until(&self, end_ns: SimTimeNs) -> SimResult {
        while self.fire_next(end_ns)? {}
        if end_ns > self.time_now_ns() {
            self.advance_time(end_ns);
        }
        Ok(())
    }

    fn fire_next(&self, end_ns: SimTimeNs) -> Result<bool, SimError> {
        let next = {
            let mut queue = self.queue.borrow_mut();
            match queue.last() {
                Some(scheduled) if scheduled.time_ns <= end_ns => queue.pop(),
                _ => None,
            }
        };

        let Some(scheduled) = next else {
            return Ok(false);
        };

        self.advance_time(scheduled.time_ns);
        trace!(self.entity ; "fire {} '{}'", scheduled.handle, scheduled.event);
        self.num_fired.set(self.num_fired.get() + 1);
        scheduled.event.trigger(self)?;
        Ok(true)
    }

    fn advance_time(&self, to_ns: SimTimeNs) {
        let now_ns = self.now_ns.get();
        if to_ns != now_ns {
            assert!(to_ns > now_ns, "Time moving backwards");
            self.now_ns.set(to_ns);
            set_time!(self.entity ; to_ns);
        }
    }
}
