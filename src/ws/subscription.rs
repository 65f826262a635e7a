//! Per-connection delivery filter.
//!
//! A connection only ever sees events addressed to its own user. Within
//! that, the client may pause and resume individual event types.

use std::collections::HashSet;

use crate::domain::{CareEvent, UserId};

/// Decides which bus events are forwarded to one WebSocket connection.
#[derive(Debug)]
pub struct SubscriptionManager {
    user_id: UserId,
    /// Enabled event types; starts with every type.
    event_types: HashSet<&'static str>,
}

impl SubscriptionManager {
    /// Creates a filter for `user_id` with every event type enabled.
    #[must_use]
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            event_types: CareEvent::EVENT_TYPES.into_iter().collect(),
        }
    }

    /// Enables the named event types. Returns the names that were
    /// recognized.
    pub fn subscribe(&mut self, names: &[String]) -> Vec<&'static str> {
        let known = known_types(names);
        self.event_types.extend(known.iter().copied());
        known
    }

    /// Disables the named event types. Returns the names that were
    /// recognized.
    pub fn unsubscribe(&mut self, names: &[String]) -> Vec<&'static str> {
        let known = known_types(names);
        for name in &known {
            self.event_types.remove(name);
        }
        known
    }

    /// Returns `true` if `event` should be delivered on this connection.
    #[must_use]
    pub fn matches(&self, event: &CareEvent) -> bool {
        event.recipient() == self.user_id && self.event_types.contains(event.event_type_str())
    }

    /// Returns the enabled event types, sorted.
    #[must_use]
    pub fn active(&self) -> Vec<&'static str> {
        let mut active: Vec<_> = self.event_types.iter().copied().collect();
        active.sort_unstable();
        active
    }
}

fn known_types(names: &[String]) -> Vec<&'static str> {
    CareEvent::EVENT_TYPES
        .into_iter()
        .filter(|t| names.iter().any(|n| n == t))
        .collect()
}
