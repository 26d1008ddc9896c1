//! Authoritative tower state management utilities.

use std::collections::BTreeMap;

use lane_defence_core::{
    CellCoord, ParticipantId, TowerId, TowerKind, TowerSnapshot, FIRE_RATE_CAP,
};

/// Registry that stores towers and manages identifier allocation.
#[derive(Debug)]
pub(crate) struct TowerRegistry {
    entries: BTreeMap<TowerId, TowerSnapshot>,
    next_tower_id: TowerId,
}

impl TowerRegistry {
    /// Creates an empty tower registry with a reset identifier counter.
    pub(crate) fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            next_tower_id: TowerId::new(0),
        }
    }

    /// Stores a level-1 tower built from the kind's base stats.
    pub(crate) fn insert(
        &mut self,
        kind: TowerKind,
        cell: CellCoord,
        owner: ParticipantId,
        cell_size: f32,
    ) -> TowerId {
        let id = self.next_tower_id;
        self.next_tower_id = TowerId::new(id.get().saturating_add(1));
        let _ = self.entries.insert(
            id,
            TowerSnapshot {
                id,
                cell,
                kind,
                level: 1,
                range: kind.range(cell_size),
                damage: kind.damage(),
                fire_rate: kind.fire_rate(),
                last_fired_at: None,
                owner,
            },
        );
        id
    }

    pub(crate) fn get(&self, id: TowerId) -> Option<&TowerSnapshot> {
        self.entries.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: TowerId) -> Option<&mut TowerSnapshot> {
        self.entries.get_mut(&id)
    }

    /// Identifier of the tower occupying `cell`, if any.
    pub(crate) fn at(&self, cell: CellCoord) -> Option<TowerId> {
        self.entries
            .values()
            .find(|tower| tower.cell == cell)
            .map(|tower| tower.id)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &TowerSnapshot> {
        self.entries.values()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut TowerSnapshot> {
        self.entries.values_mut()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
        self.next_tower_id = TowerId::new(0);
    }

    /// Replaces every tower with the provided records.
    ///
    /// A record on a cell `buildable` refuses, or on a cell an earlier record
    /// already holds, is dropped so mirrored state keeps the placement rules.
    /// Fire rates are clamped into `[0, FIRE_RATE_CAP]`; a NaN rate becomes 0.
    /// Returns the number of dropped records.
    pub(crate) fn replace_all<F>(&mut self, towers: Vec<TowerSnapshot>, buildable: F) -> usize
    where
        F: Fn(CellCoord) -> bool,
    {
        self.entries.clear();
        let mut dropped = 0;
        for mut tower in towers {
            if !buildable(tower.cell)
                || self.at(tower.cell).is_some()
                || self.entries.contains_key(&tower.id)
            {
                dropped += 1;
                continue;
            }
            tower.fire_rate = sanitize_fire_rate(tower.fire_rate);
            let _ = self.entries.insert(tower.id, tower);
        }

        let next = self
            .entries
            .keys()
            .next_back()
            .map_or(0, |id| id.get().saturating_add(1));
        self.next_tower_id = TowerId::new(next.max(self.next_tower_id.get()));
        dropped
    }
}

fn sanitize_fire_rate(rate: f32) -> f32 {
    if rate.is_nan() {
        0.0
    } else {
        rate.clamp(0.0, FIRE_RATE_CAP)
    }
}

/// Applies one level of upgrade to the tower's combat stats.
pub(crate) fn upgrade(tower: &mut TowerSnapshot) {
    tower.level = tower.level.saturating_add(1);
    tower.damage *= 1.5;
    tower.fire_rate = (tower.fire_rate * 1.2).min(FIRE_RATE_CAP);
    tower.range *= 1.1;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner() -> ParticipantId {
        ParticipantId::new("ana")
    }

    #[test]
    fn registry_starts_empty_with_zero_identifier() {
        let registry = TowerRegistry::new();
        assert!(registry.entries.is_empty());
        assert_eq!(registry.next_tower_id.get(), 0);
    }

    #[test]
    fn inserted_tower_uses_base_stats() {
        let mut registry = TowerRegistry::new();
        let id = registry.insert(TowerKind::Fast, CellCoord::new(1, 2), owner(), 40.0);
        let tower = registry.get(id).expect("tower stored");

        assert_eq!(tower.level, 1);
        assert!((tower.range - 100.0).abs() < f32::EPSILON);
        assert!((tower.damage - 5.0).abs() < f32::EPSILON);
        assert!((tower.fire_rate - 3.0).abs() < f32::EPSILON);
        assert_eq!(tower.last_fired_at, None);
        assert_eq!(registry.at(CellCoord::new(1, 2)), Some(id));
    }

    #[test]
    fn upgrade_caps_fire_rate() {
        let mut registry = TowerRegistry::new();
        let id = registry.insert(TowerKind::Fast, CellCoord::new(0, 0), owner(), 40.0);
        let tower = registry.get_mut(id).expect("tower stored");

        upgrade(tower);
        assert!((tower.fire_rate - 3.6).abs() < 1e-5);
        upgrade(tower);
        upgrade(tower);
        assert!((tower.fire_rate - FIRE_RATE_CAP).abs() < f32::EPSILON);
        assert_eq!(tower.level, 4);
    }

    #[test]
    fn replace_all_drops_duplicate_cells_and_advances_identifiers() {
        let mut source = TowerRegistry::new();
        let first = source.insert(TowerKind::Basic, CellCoord::new(1, 1), owner(), 40.0);
        let _ = source.insert(TowerKind::Heavy, CellCoord::new(3, 1), owner(), 40.0);
        let mut records: Vec<_> = source.iter().cloned().collect();
        let mut clash = records[0].clone();
        clash.id = TowerId::new(9);
        records.push(clash);

        let mut registry = TowerRegistry::new();
        let dropped = registry.replace_all(records, |_| true);

        assert_eq!(dropped, 1);
        assert_eq!(registry.iter().count(), 2);
        assert_eq!(registry.at(CellCoord::new(1, 1)), Some(first));
        let next = registry.insert(TowerKind::Basic, CellCoord::new(2, 2), owner(), 40.0);
        assert_eq!(next, TowerId::new(2));
    }

    #[test]
    fn replace_all_drops_refused_cells_and_clamps_fire_rates() {
        let mut source = TowerRegistry::new();
        let _ = source.insert(TowerKind::Basic, CellCoord::new(0, 3), owner(), 40.0);
        let kept = source.insert(TowerKind::Fast, CellCoord::new(2, 2), owner(), 40.0);
        let slow = source.insert(TowerKind::Heavy, CellCoord::new(4, 2), owner(), 40.0);
        let broken = source.insert(TowerKind::Basic, CellCoord::new(5, 2), owner(), 40.0);
        let mut records: Vec<_> = source.iter().cloned().collect();
        records[1].fire_rate = 50.0;
        records[2].fire_rate = 1e-30;
        records[3].fire_rate = f32::NAN;

        let mut registry = TowerRegistry::new();
        let dropped = registry.replace_all(records, |cell| cell.row() != 3);

        assert_eq!(dropped, 1);
        assert_eq!(registry.at(CellCoord::new(0, 3)), None);
        let fast = registry.get(kept).expect("kept");
        assert!((fast.fire_rate - FIRE_RATE_CAP).abs() < f32::EPSILON);
        let slow = registry.get(slow).expect("slow");
        assert_eq!(slow.cooldown(), None);
        let broken = registry.get(broken).expect("broken");
        assert_eq!(broken.fire_rate, 0.0);
        assert_eq!(broken.cooldown(), None);
    }
}
