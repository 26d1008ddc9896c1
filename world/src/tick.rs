//! Per-frame simulation step.
//!
//! The step runs in a fixed order: enemy advance, base-health penalty, tower
//! firing, projectile resolution, damage and rewards, wave completion. An
//! enemy that reaches the end of its lane is removed before any tower fires,
//! so it can never also be charged to a kill reward.

use std::time::Duration;

use lane_defence_core::{
    EnemyId, EnemySnapshot, Event, GameStatus, Lane, ParticipantId, TowerSnapshot, WorldPoint,
    PROJECTILE_HIT_RADIUS, REFERENCE_FRAMES_PER_SECOND,
};
use tracing::{debug, info};

use crate::{enemies::EnemyStore, World};

struct Kill {
    enemy: EnemyId,
    owner: ParticipantId,
    value: u32,
}

pub(crate) fn run(world: &mut World, dt: Duration, out: &mut Vec<Event>) {
    if world.progress.status != GameStatus::InProgress {
        return;
    }
    let now = world.clock;

    let arrived = advance_enemies(&world.lanes, &mut world.enemies, dt);
    if !arrived.is_empty() && charge_base(world, &arrived, out) {
        return;
    }

    fire_towers(world, now, out);
    let kills = resolve_projectiles(world, now, out);
    grant_rewards(world, kills, out);
    complete_wave(world, out);
}

fn advance_enemies(lanes: &[Lane], enemies: &mut EnemyStore, dt: Duration) -> Vec<EnemyId> {
    let mut arrived = Vec::new();
    if lanes.is_empty() {
        return arrived;
    }

    let elapsed = dt.as_secs_f32();
    for enemy in enemies.iter_mut() {
        let Some(lane) = lanes.iter().find(|lane| lane.id() == enemy.lane) else {
            continue;
        };
        let Some(last) = lane.last_index() else {
            continue;
        };
        if enemy.path_index >= last {
            arrived.push(enemy.id);
            continue;
        }
        let Some(next) = lane.waypoints().get(enemy.path_index + 1).copied() else {
            continue;
        };

        let step = enemy.speed * elapsed * REFERENCE_FRAMES_PER_SECOND;
        let distance = enemy.position.distance(next);
        if distance < step || distance <= f32::EPSILON {
            enemy.position = next;
            enemy.path_index += 1;
        } else if step > 0.0 {
            enemy.position = WorldPoint::new(
                enemy.position.x + (next.x - enemy.position.x) / distance * step,
                enemy.position.y + (next.y - enemy.position.y) / distance * step,
            );
        }
    }
    arrived
}

/// Applies the arrival penalty once for the whole tick. Returns `true` when the base fell.
fn charge_base(world: &mut World, arrived: &[EnemyId], out: &mut Vec<Event>) -> bool {
    let amount = u32::try_from(arrived.len()).unwrap_or(u32::MAX);
    let remaining = world.ledger.damage_base(amount);
    for enemy in arrived {
        out.push(Event::EnemyArrived { enemy: *enemy });
    }
    out.push(Event::BaseDamaged { amount, remaining });
    world.enemies.remove_all(arrived);
    debug!(amount, remaining, "enemies reached the base");

    if remaining == 0 {
        world.transition(GameStatus::GameOverLoss, out);
        return true;
    }
    false
}

fn fire_towers(world: &mut World, now: Duration, out: &mut Vec<Event>) {
    let cell_size = world.grid.cell_size();
    let enemies = world.enemies.as_slice();
    for tower in world.towers.iter_mut() {
        if !ready_to_fire(tower, now) {
            continue;
        }
        let origin = tower.cell.center(cell_size);
        let Some(target) = nearest_in_range(enemies, origin, tower.range) else {
            continue;
        };

        let projectile = world.projectiles.launch(
            tower.id,
            tower.owner.clone(),
            origin,
            target.position,
            now,
            tower.damage,
        );
        tower.last_fired_at = Some(now);
        out.push(Event::ProjectileFired {
            projectile,
            tower: tower.id,
            target: target.id,
        });
    }
}

fn ready_to_fire(tower: &TowerSnapshot, now: Duration) -> bool {
    let Some(cooldown) = tower.cooldown() else {
        return false;
    };
    match tower.last_fired_at {
        Some(last) => now.saturating_sub(last) >= cooldown,
        None => true,
    }
}

/// Nearest live enemy strictly inside `range`. Equal distances keep the
/// enemy found first in store order.
fn nearest_in_range(
    enemies: &[EnemySnapshot],
    origin: WorldPoint,
    range: f32,
) -> Option<&EnemySnapshot> {
    let mut best: Option<(f32, &EnemySnapshot)> = None;
    for enemy in enemies {
        if enemy.health <= 0.0 {
            continue;
        }
        let distance = origin.distance(enemy.position);
        if distance >= range {
            continue;
        }
        match best {
            Some((closest, _)) if distance >= closest => {}
            _ => best = Some((distance, enemy)),
        }
    }
    best.map(|(_, enemy)| enemy)
}

fn resolve_projectiles(world: &mut World, now: Duration, out: &mut Vec<Event>) -> Vec<Kill> {
    let mut kills = Vec::new();
    for projectile in world.projectiles.take_landed(now) {
        let hit = world.enemies.iter_mut().find(|enemy| {
            enemy.health > 0.0 && enemy.position.distance(projectile.to) <= PROJECTILE_HIT_RADIUS
        });
        let Some(enemy) = hit else {
            out.push(Event::ProjectileMissed {
                projectile: projectile.id,
            });
            continue;
        };

        enemy.health = (enemy.health - projectile.damage).max(0.0);
        out.push(Event::EnemyHit {
            enemy: enemy.id,
            projectile: projectile.id,
            damage: projectile.damage,
            remaining: enemy.health,
        });
        if enemy.health <= 0.0 {
            kills.push(Kill {
                enemy: enemy.id,
                owner: projectile.owner,
                value: enemy.value,
            });
        }
    }
    kills
}

fn grant_rewards(world: &mut World, kills: Vec<Kill>, out: &mut Vec<Event>) {
    if kills.is_empty() {
        return;
    }

    let killed: Vec<EnemyId> = kills.iter().map(|kill| kill.enemy).collect();
    world.enemies.remove_all(&killed);

    let total: u64 = kills.iter().map(|kill| u64::from(kill.value)).sum();
    world.ledger.credit(total);
    for kill in kills {
        world.ledger.award(&kill.owner, u64::from(kill.value));
        out.push(Event::EnemyKilled {
            enemy: kill.enemy,
            owner: kill.owner,
            value: kill.value,
        });
    }
    out.push(Event::RewardsGranted { resources: total });
}

fn complete_wave(world: &mut World, out: &mut Vec<Event>) {
    let wave = world.progress.wave;
    if !world.enemies.is_empty() || wave == 0 {
        return;
    }

    out.push(Event::WaveCleared { wave });
    let next = match world.rules.max_waves {
        Some(max_waves) if wave >= max_waves => GameStatus::GameOverWin,
        _ => GameStatus::Waiting,
    };
    info!(wave, ?next, "wave cleared");
    world.transition(next, out);
}

#[cfg(test)]
mod tests {
    use super::*;
    use lane_defence_core::{EnemyKind, LaneId};

    fn enemy(id: u32, x: f32) -> EnemySnapshot {
        EnemySnapshot {
            id: EnemyId::new(id),
            kind: EnemyKind::Basic,
            health: 60.0,
            max_health: 60.0,
            speed: 1.0,
            position: WorldPoint::new(x, 0.0),
            path_index: 0,
            value: 10,
            lane: LaneId::new(0),
        }
    }

    #[test]
    fn nearest_target_prefers_store_order_on_ties() {
        let enemies = vec![enemy(4, 30.0), enemy(1, -30.0), enemy(2, 50.0)];

        let target = nearest_in_range(&enemies, WorldPoint::default(), 100.0).expect("target");

        assert_eq!(target.id, EnemyId::new(4));
    }

    #[test]
    fn range_boundary_is_exclusive() {
        let enemies = vec![enemy(0, 120.0)];

        assert!(nearest_in_range(&enemies, WorldPoint::default(), 120.0).is_none());
        assert!(nearest_in_range(&enemies, WorldPoint::default(), 120.5).is_some());
    }

    #[test]
    fn dead_enemies_are_never_targeted() {
        let mut corpse = enemy(0, 5.0);
        corpse.health = 0.0;
        let enemies = vec![corpse, enemy(1, 90.0)];

        let target = nearest_in_range(&enemies, WorldPoint::default(), 100.0).expect("target");

        assert_eq!(target.id, EnemyId::new(1));
    }
}
