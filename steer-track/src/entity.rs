// Copyright (c) 2023 Graphcore Ltd. All rights reserved.

//! A simulation entity.
//!
//! Devices, planners and the simulator itself each own an entity so that their
//! log messages carry a hierarchical name such as `top::fabric::switch3` and a
//! unique ID.

use std::fmt;
use std::rc::Rc;

use crate::{Id, NO_ID, Tracker};

/// A simulation entity
///
/// Only the top-level entity, created with [`toplevel`], has no parent.
pub struct Entity {
    /// Name of this entity.
    pub name: String,

    /// Optional parent entity (only the top-level should be None).
    pub parent: Option<Rc<Entity>>,

    /// Unique simulation identifier used for log messages.
    pub id: Id,

    /// [`Tracker`] used to handle trace/log events.
    pub tracker: Tracker,

    full_name: String,
}

const JOIN: &str = "::";

impl Entity {
    /// Create a new entity below `parent`.
    #[must_use]
    pub fn new(parent: &Rc<Entity>, name: &str) -> Self {
        let full_name = format!("{}{JOIN}{name}", parent.full_name);

        let tracker = parent.tracker.clone();
        let id = tracker.unique_id();
        tracker.add_entity(id, &full_name);

        let entity = Self {
            name: String::from(name),
            parent: Some(parent.clone()),
            id,
            tracker,
            full_name,
        };

        entity.track_created();
        entity
    }

    /// Create a new shared entity below `self`.
    #[must_use]
    pub fn child(self: &Rc<Self>, name: &str) -> Rc<Entity> {
        Rc::new(Entity::new(self, name))
    }

    /// Returns the full hierarchical name of this entity
    #[must_use]
    pub fn full_name(&self) -> String {
        self.full_name.clone()
    }

    fn parent_id(&self) -> Id {
        self.parent.as_ref().map_or(NO_ID, |parent| parent.id)
    }

    fn is_tracked(&self) -> bool {
        self.tracker.is_entity_enabled(self.id, log::Level::Trace)
    }

    fn track_created(&self) {
        if self.is_tracked() {
            self.tracker.create(self.parent_id(), self.id, &self.full_name);
        }
    }
}

impl Drop for Entity {
    fn drop(&mut self) {
        if self.is_tracked() {
            self.tracker.destroy(self.parent_id(), self.id);
        }
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Entity")
            .field("full_name", &self.full_name)
            .field("id", &self.id)
            .finish()
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.full_name)
    }
}

/// Create the top-level entity. This should be the only entity without a
/// parent.
pub fn toplevel(tracker: &Tracker, name: &str) -> Rc<Entity> {
    let id = tracker.unique_id();
    tracker.add_entity(id, name);
    let top = Rc::new(Entity {
        parent: None,
        name: String::from(name),
        id,
        tracker: tracker.clone(),
        full_name: String::from(name),
    });
    top.track_created();
    top
}
