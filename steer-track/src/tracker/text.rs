// Copyright (c) 2020 Graphcore Ltd. All rights reserved.

//! Line-oriented text output.
//!
//! Each event becomes one line that starts with the ID of the entity that
//! emitted it, for example `12:DEBUG: switch 10 installed after weights`.

use std::cell::RefCell;
use std::fmt::Arguments;
use std::io::Write;

use crate::tracker::{EntityManager, Track};
use crate::{Id, Writer};

/// Writes track events as lines of text.
pub struct TextTracker {
    entity_manager: EntityManager,
    out: RefCell<Writer>,
}

impl TextTracker {
    /// Create a [`TextTracker`] that writes the events `entity_manager`
    /// enables to `out`.
    pub fn new(entity_manager: EntityManager, out: Writer) -> Self {
        Self {
            entity_manager,
            out: RefCell::new(out),
        }
    }

    fn emit(&self, source: Id, body: Arguments) {
        // A failed write must not stop the simulation
        let _ = writeln!(self.out.borrow_mut(), "{source}: {body}");
    }
}

impl Track for TextTracker {
    fn unique_id(&self) -> Id {
        self.entity_manager.unique_id()
    }

    fn is_entity_enabled(&self, id: Id, level: log::Level) -> bool {
        self.entity_manager.is_log_enabled_at_level(id, level)
    }

    fn add_entity(&self, id: Id, entity_name: &str) {
        self.entity_manager.add_entity(id, entity_name);
    }

    fn create(&self, created_by: Id, id: Id, name: &str) {
        self.emit(created_by, format_args!("created {id}, {name}"));
    }

    fn destroy(&self, destroyed_by: Id, id: Id) {
        self.emit(destroyed_by, format_args!("destroyed {id}"));
    }

    fn log(&self, id: Id, level: log::Level, msg: Arguments) {
        let _ = writeln!(self.out.borrow_mut(), "{id}:{level}: {msg}");
    }

    fn time(&self, set_by: Id, time_ns: u64) {
        self.emit(set_by, format_args!("time {time_ns}ns"));
    }

    fn shutdown(&self) {
        let _ = self.out.borrow_mut().flush();
    }
}
