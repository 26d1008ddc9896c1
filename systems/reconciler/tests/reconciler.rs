use std::time::Duration;

use lane_defence_core::{
    CellCoord, Command, Event, GameSnapshot, LedgerSnapshot, ParticipantId, RoomId, StatePatch,
    TowerKind, Version, Versioned,
};
use lane_defence_system_reconciler::{InMemoryStore, Reconciler, SharedStore};
use lane_defence_world::{self as world, query, World};

struct Peer {
    world: World,
    reconciler: Reconciler,
}

impl Peer {
    fn join(store: &InMemoryStore, room: &RoomId, name: &str) -> Self {
        Self {
            world: World::new(),
            reconciler: Reconciler::connect(room.clone(), ParticipantId::new(name), store),
        }
    }

    fn drain(&mut self) -> Vec<Event> {
        let mut commands = Vec::new();
        let _ = self.reconciler.drain(&mut commands);
        let mut events = Vec::new();
        for command in commands {
            world::apply(&mut self.world, command, &mut events);
        }
        events
    }

    fn act(&mut self, command: Command) {
        world::apply(&mut self.world, command, &mut Vec::new());
    }

    fn publish(&mut self, store: &InMemoryStore) -> bool {
        let state = query::shared_state(&self.world);
        self.reconciler.publish(&state, store)
    }

    fn build(&mut self, cell: CellCoord) {
        let participant = self.reconciler.participant().clone();
        self.act(Command::BuildTower {
            participant,
            kind: TowerKind::Basic,
            cell,
        });
    }
}

#[test]
fn unchanged_state_publishes_nothing() {
    let store = InMemoryStore::new();
    let room = RoomId::new("quiet");
    let mut peer = Peer::join(&store, &room, "ana");

    assert!(peer.publish(&store), "initial state is published once");
    assert!(!peer.publish(&store));
    let _ = peer.drain();
    assert!(!peer.publish(&store), "own echo must not trigger a publish");

    peer.act(Command::Tick {
        dt: Duration::from_millis(16),
    });
    assert!(!peer.publish(&store), "idle ticks change no shared state");
}

#[test]
fn only_changed_sub_objects_are_written() {
    let store = InMemoryStore::new();
    let room = RoomId::new("diff");
    let mut peer = Peer::join(&store, &room, "ana");
    assert!(peer.publish(&store));
    let before = store.record(&room).expect("record");

    peer.build(CellCoord::new(1, 1));
    assert!(peer.publish(&store));

    let after = store.record(&room).expect("record");
    assert_eq!(after.towers.version.counter(), before.towers.version.counter() + 1);
    assert_eq!(after.ledger.version.counter(), before.ledger.version.counter() + 1);
    assert_eq!(after.enemies.version, before.enemies.version);
    assert_eq!(after.progress.version, before.progress.version);
}

#[test]
fn stale_snapshots_are_discarded() {
    let store = InMemoryStore::new();
    let room = RoomId::new("stale");
    let mut peer = Peer::join(&store, &room, "ana");
    peer.build(CellCoord::new(1, 1));
    assert!(peer.publish(&store));
    let _ = peer.drain();

    let stale = StatePatch {
        ledger: Some(Versioned::new(
            Version::new(0, ParticipantId::new("zed")),
            LedgerSnapshot {
                resources: 9_999,
                ..LedgerSnapshot::default()
            },
        )),
        ..StatePatch::default()
    };
    store.publish(&room, stale);

    let mut commands = Vec::new();
    let _ = peer.reconciler.drain(&mut commands);
    assert!(commands.is_empty());
    assert_eq!(query::ledger(&peer.world).resources, 75);
}

#[test]
fn disconnected_reconciler_ignores_the_store() {
    let store = InMemoryStore::new();
    let room = RoomId::new("gone");
    let mut peer = Peer::join(&store, &room, "ana");
    peer.reconciler.disconnect();

    assert!(!peer.publish(&store));
    assert!(store.record(&room).is_none());
    assert!(!peer.reconciler.is_connected());
}

#[test]
fn two_participants_converge_on_builds() {
    let store = InMemoryStore::new();
    let room = RoomId::new("duo");
    let mut ana = Peer::join(&store, &room, "ana");
    assert!(ana.publish(&store));

    let mut bo = Peer::join(&store, &room, "bo");
    let applied = bo.drain();
    assert!(applied
        .iter()
        .any(|event| matches!(event, Event::RemoteStateApplied { .. })));
    assert!(!bo.publish(&store), "freshly synced peer has nothing new");

    ana.build(CellCoord::new(1, 1));
    assert!(ana.publish(&store));
    let _ = bo.drain();
    bo.build(CellCoord::new(2, 2));
    assert!(bo.publish(&store));
    let _ = ana.drain();
    let _ = bo.drain();

    let ana_state = query::shared_state(&ana.world);
    let bo_state = query::shared_state(&bo.world);
    assert_eq!(ana_state, bo_state);
    assert_eq!(ana_state.towers.len(), 2);
    assert_eq!(ana_state.ledger.resources, 50);
    assert!(!ana.publish(&store));
    assert!(!bo.publish(&store));

    let record: GameSnapshot = store.record(&room).expect("record");
    assert_eq!(record.towers.value, bo_state.towers);
    assert_eq!(record.towers.version.writer(), &ParticipantId::new("bo"));
}

#[test]
fn simultaneous_writes_settle_on_the_higher_writer() {
    let store = InMemoryStore::new();
    let room = RoomId::new("race");
    let mut ana = Peer::join(&store, &room, "ana");
    let mut bo = Peer::join(&store, &room, "bo");

    ana.build(CellCoord::new(1, 1));
    bo.build(CellCoord::new(5, 5));
    assert!(ana.publish(&store));
    assert!(bo.publish(&store));
    let _ = ana.drain();
    let _ = bo.drain();

    let ana_towers = query::shared_state(&ana.world).towers;
    let bo_towers = query::shared_state(&bo.world).towers;
    assert_eq!(ana_towers, bo_towers);
    assert_eq!(ana_towers[0].cell, CellCoord::new(5, 5));
}
