//! Presence / vanish deduplication for remote entities
//!
//! A server under test may send redundant update packets per entity; the
//! harness must report each entity's lifecycle exactly once per
//! appearance/disappearance pair to keep traces comparable across runs and
//! implementations. Attribute and position churn on an already-seen entity
//! is deliberately not the harness's concern.

use std::collections::HashMap;

use crate::encounter::EncounterLog;
use crate::types::EntityKind;

/// Tracks which remote entity identifiers are currently believed visible
///
/// Lives inside the session controller's mutex domain; entity ids are opaque
/// integers scoped to the current session.
#[derive(Debug, Default)]
pub struct PresenceTracker {
    seen: HashMap<u32, EntityKind>,
}

impl PresenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an object-update sighting, emitting `Sight / Presence` exactly
    /// once per appearance
    pub fn on_update(&mut self, local_id: u32, kind: EntityKind, log: &EncounterLog) {
        if self.seen.contains_key(&local_id) {
            return;
        }
        self.seen.insert(local_id, kind);
        log.emit(
            "Sight",
            &format!("Presence {}", kind.as_str()),
            &format!("LocalID: {local_id}"),
        );
    }

    /// Record an object-killed notification; removal of an entity never seen
    /// is not an error
    pub fn on_removed(&mut self, local_id: u32, log: &EncounterLog) {
        if self.seen.remove(&local_id).is_some() {
            log.emit("Sight", "Vanished", &format!("LocalID: {local_id}"));
        }
    }

    /// Visible (avatars, things) counts for the observation command
    pub fn counts(&self) -> (usize, usize) {
        let avatars = self
            .seen
            .values()
            .filter(|k| **k == EntityKind::Avatar)
            .count();
        (avatars, self.seen.len() - avatars)
    }

    pub fn contains(&self, local_id: u32) -> bool {
        self.seen.contains_key(&local_id)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    /// Forget everything; called when the session ends
    pub fn clear(&mut self) {
        self.seen.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encounter::DEFAULT_ACTOR;
    use crate::mock::MemoryWriter;
    use std::sync::Arc;

    fn capture() -> (Arc<EncounterLog>, MemoryWriter) {
        let writer = MemoryWriter::new();
        let log =
            EncounterLog::with_console_writer(DEFAULT_ACTOR, None, Box::new(writer.clone()));
        (Arc::new(log), writer)
    }

    #[test]
    fn repeated_updates_emit_one_presence_record() {
        let (log, writer) = capture();
        let mut tracker = PresenceTracker::new();

        for _ in 0..5 {
            tracker.on_update(42, EntityKind::Avatar, &log);
        }

        let lines = writer.lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("\"sig\": \"Presence Avatar\""));
        assert!(lines[0].contains("LocalID: 42"));
    }

    #[test]
    fn reappearance_after_removal_is_logged_again() {
        let (log, writer) = capture();
        let mut tracker = PresenceTracker::new();

        tracker.on_update(7, EntityKind::Thing, &log);
        tracker.on_removed(7, &log);
        tracker.on_update(7, EntityKind::Thing, &log);

        let signals: Vec<String> = writer
            .lines()
            .iter()
            .map(|l| l.split("\"sig\": \"").nth(1).unwrap().split('"').next().unwrap().to_string())
            .collect();
        assert_eq!(signals, vec!["Presence Thing", "Vanished", "Presence Thing"]);
    }

    #[test]
    fn removal_of_unseen_entity_is_silent() {
        let (log, writer) = capture();
        let mut tracker = PresenceTracker::new();

        tracker.on_removed(99, &log);

        assert!(writer.lines().is_empty());
        assert!(tracker.is_empty());
    }

    #[test]
    fn counts_split_avatars_from_things() {
        let (log, _writer) = capture();
        let mut tracker = PresenceTracker::new();

        tracker.on_update(1, EntityKind::Avatar, &log);
        tracker.on_update(2, EntityKind::Thing, &log);
        tracker.on_update(3, EntityKind::Thing, &log);

        assert_eq!(tracker.counts(), (1, 2));
        tracker.clear();
        assert_eq!(tracker.counts(), (0, 0));
    }
}
