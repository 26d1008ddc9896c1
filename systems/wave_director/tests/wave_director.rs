use std::time::Duration;

use lane_defence_core::{Command, EnemyKind, Event, GameStatus, DRIP_SPAWN_INTERVAL};
use lane_defence_system_wave_director::{Config, WaveDirector};
use lane_defence_world::{self as world, query, World};

fn start_wave(world: &mut World, director: &mut WaveDirector) -> Vec<Event> {
    let plan = director
        .plan_wave(query::progress(world), query::lanes(world))
        .expect("wave plan");
    let mut events = Vec::new();
    world::apply(world, Command::StartWave { plan }, &mut events);
    events
}

/// Runs one tick and feeds the director, applying any drip spawns.
fn frame(world: &mut World, director: &mut WaveDirector, dt: Duration) -> usize {
    let mut events = Vec::new();
    world::apply(world, Command::Tick { dt }, &mut events);

    let mut commands = Vec::new();
    director.handle(
        &events,
        query::progress(world),
        query::lanes(world),
        &mut commands,
    );
    let spawned = commands.len();
    for command in commands {
        world::apply(world, command, &mut Vec::new());
    }
    spawned
}

#[test]
fn first_wave_spawns_seven_basic_enemies() {
    let mut world = World::new();
    let mut director = WaveDirector::new(Config::new(0x5eed, DRIP_SPAWN_INTERVAL));

    let events = start_wave(&mut world, &mut director);

    assert_eq!(events.last(), Some(&Event::WaveStarted { wave: 1, enemies: 7 }));
    let enemies = query::enemies(&world);
    assert_eq!(enemies.len(), 7);
    assert!(enemies
        .iter()
        .all(|enemy| enemy.kind == EnemyKind::Basic && (enemy.max_health - 60.0).abs() < 1e-4));
}

#[test]
fn no_plan_while_a_wave_is_running() {
    let mut world = World::new();
    let mut director = WaveDirector::new(Config::new(1, DRIP_SPAWN_INTERVAL));
    let _ = start_wave(&mut world, &mut director);

    assert!(director
        .plan_wave(query::progress(&world), query::lanes(&world))
        .is_none());
}

#[test]
fn drip_spawns_one_enemy_every_interval() {
    let mut world = World::new();
    let mut director = WaveDirector::new(Config::new(2, DRIP_SPAWN_INTERVAL));
    let _ = start_wave(&mut world, &mut director);

    let mut spawned = 0;
    for _ in 0..5 {
        spawned += frame(&mut world, &mut director, Duration::from_millis(500));
    }
    assert_eq!(spawned, 0);

    spawned += frame(&mut world, &mut director, Duration::from_millis(500));
    assert_eq!(spawned, 1);
    assert_eq!(query::enemies(&world).len(), 8);
}

#[test]
fn leaving_the_wave_cancels_the_drip_timer() {
    let mut world = World::new();
    let mut director = WaveDirector::new(Config::new(4, DRIP_SPAWN_INTERVAL));
    let _ = start_wave(&mut world, &mut director);
    let _ = frame(&mut world, &mut director, Duration::from_secs(2));
    assert_eq!(director.pending(), Duration::from_secs(2));

    let mut events = Vec::new();
    world::apply(&mut world, Command::ResetGame, &mut events);
    let mut commands = Vec::new();
    director.handle(
        &events,
        query::progress(&world),
        query::lanes(&world),
        &mut commands,
    );

    assert_eq!(query::progress(&world).status, GameStatus::Waiting);
    assert!(commands.is_empty());
    assert_eq!(director.pending(), Duration::ZERO);
}

#[test]
fn same_seed_plans_identical_waves() {
    let world = World::new();
    let mut progress = query::progress(&world);
    progress.wave = 7;

    let mut first = WaveDirector::new(Config::new(99, DRIP_SPAWN_INTERVAL));
    let mut second = WaveDirector::new(Config::new(99, DRIP_SPAWN_INTERVAL));

    assert_eq!(
        first.plan_wave(progress, query::lanes(&world)),
        second.plan_wave(progress, query::lanes(&world))
    );
}
