#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! State reconciler that keeps the local mirror and the shared room record
//! in agreement.
//!
//! Incoming snapshots are queued on a channel and only folded into the world
//! when [`Reconciler::drain`] runs at the top of a frame. Each shared
//! sub-object carries a [`Version`]; a received sub-object replaces the local
//! one only when its version is strictly newer than anything this participant
//! has applied or published. Outgoing writes carry only the sub-objects that
//! changed since the last exchange.

mod store;

use crossbeam_channel::Receiver;
use lane_defence_core::{
    Command, EnemySnapshot, GameSnapshot, LedgerSnapshot, ParticipantId, ProgressSnapshot,
    RoomId, SharedPatch, SharedState, StatePatch, TowerSnapshot, Version, Versioned,
};
use tracing::{debug, trace};

pub use store::{InMemoryStore, SharedStore};

/// Highest version known for every shared sub-object.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KnownVersions {
    /// Version of the tower collection.
    pub towers: Version,
    /// Version of the enemy collection.
    pub enemies: Version,
    /// Version of the ledger.
    pub ledger: Version,
    /// Version of the wave counter and status.
    pub progress: Version,
}

#[derive(Debug, Default)]
struct Slot<T> {
    known: Version,
    baseline: Option<T>,
}

impl<T: Clone + PartialEq> Slot<T> {
    /// Accepts `incoming` when strictly newer, returning the value to apply.
    fn accept(&mut self, incoming: Versioned<T>) -> Option<T> {
        if incoming.version <= self.known {
            return None;
        }
        self.known = incoming.version;
        self.baseline = Some(incoming.value.clone());
        Some(incoming.value)
    }

    /// Versions `current` for publication when it differs from the baseline.
    fn diff(&mut self, current: &T, writer: &ParticipantId) -> Option<Versioned<T>> {
        if self.baseline.as_ref() == Some(current) {
            return None;
        }
        let version = self.known.successor(writer);
        self.known = version.clone();
        self.baseline = Some(current.clone());
        Some(Versioned::new(version, current.clone()))
    }
}

/// Per-participant reconciler bound to one room.
#[derive(Debug)]
pub struct Reconciler {
    room: RoomId,
    participant: ParticipantId,
    inbox: Option<Receiver<GameSnapshot>>,
    towers: Slot<Vec<TowerSnapshot>>,
    enemies: Slot<Vec<EnemySnapshot>>,
    ledger: Slot<LedgerSnapshot>,
    progress: Slot<ProgressSnapshot>,
}

impl Reconciler {
    /// Subscribes to `room` on behalf of `participant`.
    pub fn connect<S>(room: RoomId, participant: ParticipantId, store: &S) -> Self
    where
        S: SharedStore + ?Sized,
    {
        let inbox = store.subscribe(&room);
        debug!(room = room.as_str(), participant = participant.as_str(), "subscribed");
        Self {
            room,
            participant,
            inbox: Some(inbox),
            towers: Slot::default(),
            enemies: Slot::default(),
            ledger: Slot::default(),
            progress: Slot::default(),
        }
    }

    /// Room the reconciler is bound to.
    #[must_use]
    pub fn room(&self) -> &RoomId {
        &self.room
    }

    /// Participant the reconciler publishes as.
    #[must_use]
    pub fn participant(&self) -> &ParticipantId {
        &self.participant
    }

    /// Reports whether the subscription is still open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.inbox.is_some()
    }

    /// Highest versions applied or published so far.
    #[must_use]
    pub fn known_versions(&self) -> KnownVersions {
        KnownVersions {
            towers: self.towers.known.clone(),
            enemies: self.enemies.known.clone(),
            ledger: self.ledger.known.clone(),
            progress: self.progress.known.clone(),
        }
    }

    /// Folds every queued snapshot into at most one remote-state command.
    ///
    /// Returns the number of snapshots consumed.
    pub fn drain(&mut self, out: &mut Vec<Command>) -> usize {
        let Some(inbox) = &self.inbox else {
            return 0;
        };
        let snapshots: Vec<GameSnapshot> = inbox.try_iter().collect();
        let received = snapshots.len();

        let mut patch = SharedPatch::default();
        for snapshot in snapshots {
            if let Some(towers) = self.towers.accept(snapshot.towers) {
                patch.towers = Some(towers);
            }
            if let Some(enemies) = self.enemies.accept(snapshot.enemies) {
                patch.enemies = Some(enemies);
            }
            if let Some(ledger) = self.ledger.accept(snapshot.ledger) {
                patch.ledger = Some(ledger);
            }
            if let Some(progress) = self.progress.accept(snapshot.progress) {
                patch.progress = Some(progress);
            }
        }

        if patch.is_empty() {
            if received > 0 {
                debug!(received, "discarded stale snapshots");
            }
        } else {
            out.push(Command::ApplyRemoteState { patch });
        }
        received
    }

    /// Publishes the sub-objects of `state` that changed since the last exchange.
    ///
    /// Returns whether anything was written.
    pub fn publish<S>(&mut self, state: &SharedState, store: &S) -> bool
    where
        S: SharedStore + ?Sized,
    {
        if self.inbox.is_none() {
            return false;
        }

        let patch = StatePatch {
            towers: self.towers.diff(&state.towers, &self.participant),
            enemies: self.enemies.diff(&state.enemies, &self.participant),
            ledger: self.ledger.diff(&state.ledger, &self.participant),
            progress: self.progress.diff(&state.progress, &self.participant),
        };
        if patch.is_empty() {
            return false;
        }

        trace!(
            room = self.room.as_str(),
            towers = patch.towers.is_some(),
            enemies = patch.enemies.is_some(),
            ledger = patch.ledger.is_some(),
            progress = patch.progress.is_some(),
            "publishing patch"
        );
        store.publish(&self.room, patch);
        true
    }

    /// Drops the subscription. Later drains and publishes do nothing.
    pub fn disconnect(&mut self) {
        if self.inbox.take().is_some() {
            debug!(room = self.room.as_str(), "unsubscribed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lane_defence_core::GameStatus;

    fn progress(counter: u64, writer: &str, wave: u32) -> Versioned<ProgressSnapshot> {
        Versioned::new(
            Version::new(counter, ParticipantId::new(writer)),
            ProgressSnapshot {
                wave,
                status: GameStatus::Waiting,
            },
        )
    }

    #[test]
    fn slot_accepts_only_strictly_newer_versions() {
        let mut slot = Slot::default();

        assert!(slot.accept(progress(0, "", 9)).is_none());
        assert_eq!(slot.accept(progress(2, "ana", 2)).map(|p| p.wave), Some(2));
        assert!(slot.accept(progress(2, "ana", 5)).is_none());
        assert!(slot.accept(progress(1, "zed", 5)).is_none());
        assert_eq!(slot.accept(progress(2, "bo", 3)).map(|p| p.wave), Some(3));
    }

    #[test]
    fn diff_bumps_the_known_version() {
        let mut slot = Slot::default();
        let writer = ParticipantId::new("ana");
        let _ = slot.accept(progress(4, "bo", 1));

        let changed = ProgressSnapshot {
            wave: 2,
            status: GameStatus::InProgress,
        };
        let published = slot.diff(&changed, &writer).expect("changed value");

        assert_eq!(published.version, Version::new(5, writer.clone()));
        assert!(slot.diff(&changed, &writer).is_none());
    }
}
