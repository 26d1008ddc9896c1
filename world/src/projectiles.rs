//! Local-only projectile bookkeeping. Nothing here is ever shared.

use std::time::Duration;

use lane_defence_core::{
    ParticipantId, ProjectileId, ProjectileSnapshot, TowerId, WorldPoint, PROJECTILE_FLIGHT,
};

#[derive(Debug)]
pub(crate) struct ProjectileQueue {
    in_flight: Vec<ProjectileSnapshot>,
    next_projectile_id: ProjectileId,
}

impl ProjectileQueue {
    pub(crate) fn new() -> Self {
        Self {
            in_flight: Vec::new(),
            next_projectile_id: ProjectileId::new(0),
        }
    }

    pub(crate) fn launch(
        &mut self,
        tower: TowerId,
        owner: ParticipantId,
        from: WorldPoint,
        to: WorldPoint,
        now: Duration,
        damage: f32,
    ) -> ProjectileId {
        let id = self.next_projectile_id;
        self.next_projectile_id = ProjectileId::new(id.get().wrapping_add(1));
        self.in_flight.push(ProjectileSnapshot {
            id,
            tower,
            owner,
            from,
            to,
            spawned_at: now,
            flight: PROJECTILE_FLIGHT,
            damage,
        });
        id
    }

    /// Removes and returns every projectile whose flight elapsed by `now`, in launch order.
    pub(crate) fn take_landed(&mut self, now: Duration) -> Vec<ProjectileSnapshot> {
        let (landed, flying): (Vec<_>, Vec<_>) = self
            .in_flight
            .drain(..)
            .partition(|projectile| now.saturating_sub(projectile.spawned_at) >= projectile.flight);
        self.in_flight = flying;
        landed
    }

    pub(crate) fn as_slice(&self) -> &[ProjectileSnapshot] {
        &self.in_flight
    }

    pub(crate) fn clear(&mut self) {
        self.in_flight.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn projectiles_land_once_flight_elapses() {
        let mut queue = ProjectileQueue::new();
        let owner = ParticipantId::new("ana");
        let early = queue.launch(
            TowerId::new(0),
            owner.clone(),
            WorldPoint::default(),
            WorldPoint::new(10.0, 0.0),
            Duration::ZERO,
            10.0,
        );
        let late = queue.launch(
            TowerId::new(1),
            owner,
            WorldPoint::default(),
            WorldPoint::new(10.0, 0.0),
            Duration::from_millis(100),
            10.0,
        );

        assert!(queue.take_landed(Duration::from_millis(149)).is_empty());

        let landed = queue.take_landed(PROJECTILE_FLIGHT);
        assert_eq!(landed.len(), 1);
        assert_eq!(landed[0].id, early);
        assert_eq!(queue.as_slice().len(), 1);

        let landed = queue.take_landed(Duration::from_millis(250));
        assert_eq!(landed[0].id, late);
        assert!(queue.as_slice().is_empty());
    }
}
