//! Live enemy collection in spawn order.

use lane_defence_core::{EnemyId, EnemySnapshot, EnemySpawn, WorldPoint};

/// Ordered enemy store. Iteration order is spawn order and doubles as the
/// targeting tie-break, so entries are never reordered.
#[derive(Debug)]
pub(crate) struct EnemyStore {
    entries: Vec<EnemySnapshot>,
    next_enemy_id: EnemyId,
}

impl EnemyStore {
    pub(crate) fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_enemy_id: EnemyId::new(0),
        }
    }

    /// Appends a freshly spawned enemy at `position`.
    pub(crate) fn spawn(&mut self, spawn: EnemySpawn, position: WorldPoint) -> EnemyId {
        let id = self.next_enemy_id;
        self.next_enemy_id = EnemyId::new(id.get().saturating_add(1));
        let health = spawn.health as f32;
        self.entries.push(EnemySnapshot {
            id,
            kind: spawn.kind,
            health,
            max_health: health,
            speed: spawn.kind.speed(),
            position,
            path_index: 0,
            value: spawn.kind.value(),
            lane: spawn.lane,
        });
        id
    }

    pub(crate) fn as_slice(&self) -> &[EnemySnapshot] {
        &self.entries
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut EnemySnapshot> {
        self.entries.iter_mut()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes every enemy whose identifier appears in `ids`, keeping order.
    pub(crate) fn remove_all(&mut self, ids: &[EnemyId]) {
        if ids.is_empty() {
            return;
        }
        self.entries.retain(|enemy| !ids.contains(&enemy.id));
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
        self.next_enemy_id = EnemyId::new(0);
    }

    /// Replaces the collection wholesale, clamping health into `0..=max_health`.
    pub(crate) fn replace_all(&mut self, enemies: Vec<EnemySnapshot>) {
        self.entries = enemies;
        for enemy in &mut self.entries {
            enemy.health = enemy.health.clamp(0.0, enemy.max_health.max(0.0));
        }

        let next = self
            .entries
            .iter()
            .map(|enemy| enemy.id.get().saturating_add(1))
            .max()
            .unwrap_or(0);
        self.next_enemy_id = EnemyId::new(next.max(self.next_enemy_id.get()));
    }
}
