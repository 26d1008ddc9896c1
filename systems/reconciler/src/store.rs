//! Shared store boundary and an in-process implementation.

use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard, PoisonError},
};

use crossbeam_channel::{unbounded, Receiver, Sender};
use lane_defence_core::{GameSnapshot, RoomId, StatePatch, Version, Versioned};
use tracing::trace;

/// Asynchronous, externally hosted record of a match.
///
/// Publishing is fire-and-forget; the store delivers whole snapshots to every
/// subscriber of the room, the publisher included.
pub trait SharedStore {
    /// Subscribes to snapshots of `room`.
    fn subscribe(&self, room: &RoomId) -> Receiver<GameSnapshot>;

    /// Writes the sub-objects carried by `patch` to the room record.
    fn publish(&self, room: &RoomId, patch: StatePatch);
}

#[derive(Debug, Default)]
struct Room {
    record: GameSnapshot,
    subscribers: Vec<Sender<GameSnapshot>>,
}

impl Room {
    fn is_blank(&self) -> bool {
        let blank = Version::default();
        self.record.towers.version == blank
            && self.record.enemies.version == blank
            && self.record.ledger.version == blank
            && self.record.progress.version == blank
    }

    fn broadcast(&mut self) {
        let record = &self.record;
        self.subscribers
            .retain(|subscriber| subscriber.send(record.clone()).is_ok());
    }
}

/// In-process store that keeps one record per room.
///
/// Each sub-object keeps the highest version written so far, so concurrent
/// writers converge regardless of arrival order.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    rooms: Mutex<HashMap<RoomId, Room>>,
}

impl InMemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current record of `room`, if anything was ever written to it.
    #[must_use]
    pub fn record(&self, room: &RoomId) -> Option<GameSnapshot> {
        self.rooms()
            .get(room)
            .filter(|room| !room.is_blank())
            .map(|room| room.record.clone())
    }

    fn rooms(&self) -> MutexGuard<'_, HashMap<RoomId, Room>> {
        self.rooms.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SharedStore for InMemoryStore {
    fn subscribe(&self, room: &RoomId) -> Receiver<GameSnapshot> {
        let (sender, receiver) = unbounded();
        let mut rooms = self.rooms();
        let entry = rooms.entry(room.clone()).or_default();
        if !entry.is_blank() {
            let _ = sender.send(entry.record.clone());
        }
        entry.subscribers.push(sender);
        receiver
    }

    fn publish(&self, room: &RoomId, patch: StatePatch) {
        let mut rooms = self.rooms();
        let entry = rooms.entry(room.clone()).or_default();
        let mut changed = merge(&mut entry.record.towers, patch.towers);
        changed |= merge(&mut entry.record.enemies, patch.enemies);
        changed |= merge(&mut entry.record.ledger, patch.ledger);
        changed |= merge(&mut entry.record.progress, patch.progress);
        if changed {
            trace!(room = room.as_str(), "room record updated");
            entry.broadcast();
        }
    }
}

fn merge<T>(slot: &mut Versioned<T>, incoming: Option<Versioned<T>>) -> bool {
    match incoming {
        Some(incoming) if incoming.version > slot.version => {
            *slot = incoming;
            true
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lane_defence_core::{LedgerSnapshot, ParticipantId};

    fn ledger_patch(counter: u64, writer: &str, resources: u64) -> StatePatch {
        StatePatch {
            ledger: Some(Versioned::new(
                Version::new(counter, ParticipantId::new(writer)),
                LedgerSnapshot {
                    resources,
                    ..LedgerSnapshot::default()
                },
            )),
            ..StatePatch::default()
        }
    }

    #[test]
    fn older_writes_do_not_overwrite_newer_ones() {
        let store = InMemoryStore::new();
        let room = RoomId::new("r");
        store.publish(&room, ledger_patch(2, "ana", 50));
        store.publish(&room, ledger_patch(1, "bo", 10));

        let record = store.record(&room).expect("record");
        assert_eq!(record.ledger.value.resources, 50);
    }

    #[test]
    fn equal_counters_resolve_by_writer() {
        let store = InMemoryStore::new();
        let room = RoomId::new("r");
        store.publish(&room, ledger_patch(3, "bo", 30));
        store.publish(&room, ledger_patch(3, "ana", 70));

        let record = store.record(&room).expect("record");
        assert_eq!(record.ledger.value.resources, 30);
    }

    #[test]
    fn late_subscribers_receive_the_current_record() {
        let store = InMemoryStore::new();
        let room = RoomId::new("r");
        let early = store.subscribe(&room);
        assert!(early.try_recv().is_err(), "blank rooms send nothing");

        store.publish(&room, ledger_patch(1, "ana", 90));
        let late = store.subscribe(&room);

        assert_eq!(early.try_iter().count(), 1);
        let snapshot = late.try_recv().expect("current record");
        assert_eq!(snapshot.ledger.value.resources, 90);
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let store = InMemoryStore::new();
        let room = RoomId::new("r");
        drop(store.subscribe(&room));
        store.publish(&room, ledger_patch(1, "ana", 90));

        assert!(store.rooms().get(&room).expect("room").subscribers.is_empty());
    }
}
