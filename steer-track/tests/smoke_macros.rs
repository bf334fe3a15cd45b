// Copyright (c) 2020 Graphcore Ltd. All rights reserved.

//! Ensure that all version of each macro can be used

use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use steer_track::entity::{Entity, toplevel};
use steer_track::tracker::{EntityManager, TextTracker};
use steer_track::{Id, Tracker, debug, info, set_time, test_helpers, test_init, trace};

macro_rules! build_with_entity {
    ($name:ident, $macro:ident, $slvl:expr) => (
        #[test]
        fn $name() {
            let (test_tracker, tracker) = test_init!(100);

            let top = toplevel(&tracker, "top");
            test_helpers::check_and_clear(&test_tracker, &["0: created 100, top"]);
            assert_eq!(top.id, Id(100));

            $macro!(top ; "Switch with no args");
            test_helpers::check_and_clear(&test_tracker, &[concat!("100:", $slvl, ": Switch with no args")]);

            $macro!(top ; "Switch with {} argument", 1);
            test_helpers::check_and_clear(&test_tracker, &[concat!("100:", $slvl, ": Switch with 1 argument")]);

            $macro!(top ; "Switch with {}, {} arguments", 1, 1 + 1);
            test_helpers::check_and_clear(&test_tracker, &[concat!("100:", $slvl,": Switch with 1, 2 arguments")]);

            drop(top);
            test_helpers::check_and_clear(&test_tracker, &["0: destroyed 100"]);
        }
    );
}

build_with_entity!(trace_with_entity, trace, "TRACE");
build_with_entity!(info_with_entity, info, "INFO");
build_with_entity!(debug_with_entity, debug, "DEBUG");

#[test]
fn hierarchy_names() {
    let (test_tracker, tracker) = test_init!(10);

    let top = toplevel(&tracker, "top");
    let fabric = top.child("fabric");
    let switch = Entity::new(&fabric, "switch3");
    test_helpers::check_and_clear(
        &test_tracker,
        &[
            "0: created 10, top",
            "10: created 11, top::fabric",
            "11: created 12, top::fabric::switch3",
        ],
    );

    assert_eq!(switch.full_name(), "top::fabric::switch3");
    assert_eq!(format!("{switch}"), "top::fabric::switch3");

    drop(switch);
    test_helpers::check_and_clear(&test_tracker, &["11: destroyed 12"]);
}

#[test]
fn unique_ids() {
    let (test_tracker, tracker) = test_init!(40);

    let top = toplevel(&tracker, "top");
    let first = top.tracker.unique_id();
    let second = top.tracker.unique_id();
    assert_eq!(first, Id(41));
    assert_eq!(second, Id(42));
    test_helpers::check_and_clear(&test_tracker, &["0: created 40, top"]);
}

#[test]
fn set_time() {
    let (test_tracker, tracker) = test_init!(321);

    let top = toplevel(&tracker, "top");
    test_helpers::check_and_clear(&test_tracker, &["0: created 321, top"]);

    set_time!(top ; 1500);
    test_helpers::check_and_clear(&test_tracker, &["321: set time 1500ns"]);
}

#[test]
fn level_filters_suppress_output() {
    let mut manager = EntityManager::new(log::Level::Error);
    manager
        .add_entity_level_filter(r".*planner", log::Level::Debug)
        .unwrap();
    let tracker: Tracker = Rc::new(TextTracker::new(manager, Box::new(std::io::sink())));

    let top = toplevel(&tracker, "top");
    let planner = top.child("planner");

    assert!(!top.tracker.is_entity_enabled(top.id, log::Level::Debug));
    assert!(planner.tracker.is_entity_enabled(planner.id, log::Level::Debug));
    assert!(!planner.tracker.is_entity_enabled(planner.id, log::Level::Trace));
}

#[derive(Clone, Default)]
struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.borrow_mut().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[test]
fn text_lines() {
    let buffer = SharedBuffer::default();
    let manager = EntityManager::new(log::Level::Trace);
    let tracker: Tracker = Rc::new(TextTracker::new(manager, Box::new(buffer.clone())));

    let top = toplevel(&tracker, "top");
    let planner = top.child("planner");
    debug!(planner ; "registered {} events", 3);
    set_time!(top ; 250);
    drop(planner);
    tracker.shutdown();

    let text = String::from_utf8(buffer.0.borrow().clone()).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(
        lines,
        vec![
            format!("0: created {}, top", top.id),
            format!("{}: created {}, top::planner", top.id, Id(top.id.0 + 1)),
            format!("{}:DEBUG: registered 3 events", Id(top.id.0 + 1)),
            format!("{}: time 250ns", top.id),
            format!("{}: destroyed {}", top.id, Id(top.id.0 + 1)),
        ]
    );
}
