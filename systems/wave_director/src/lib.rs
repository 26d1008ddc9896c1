#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Wave director that plans bulk wave spawns and drip-spawns enemies while a
//! wave is in progress.

use std::time::Duration;

use lane_defence_core::{
    wave_enemy_count, Command, EnemyKind, EnemySpawn, Event, GameStatus, Lane, ProgressSnapshot,
    RoomId, WavePlan, DRIP_SPAWN_INTERVAL,
};
use rand::Rng;
use rand_chacha::{rand_core::SeedableRng, ChaCha8Rng};
use sha2::{Digest, Sha256};
use tracing::{debug, trace};

/// Configuration parameters required to construct the wave director.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    rng_seed: u64,
    drip_interval: Duration,
}

impl Config {
    /// Creates a configuration from an explicit seed and drip cadence.
    #[must_use]
    pub const fn new(rng_seed: u64, drip_interval: Duration) -> Self {
        Self {
            rng_seed,
            drip_interval,
        }
    }

    /// Derives the seed from the room identifier so every participant of a
    /// room draws from the same stream. Uses the default drip cadence.
    #[must_use]
    pub fn from_room(room: &RoomId) -> Self {
        Self::new(derive_room_seed(room), DRIP_SPAWN_INTERVAL)
    }

    /// Seed feeding the spawn random number generator.
    #[must_use]
    pub const fn rng_seed(&self) -> u64 {
        self.rng_seed
    }

    /// Wall-clock time between drip spawns.
    #[must_use]
    pub const fn drip_interval(&self) -> Duration {
        self.drip_interval
    }
}

/// Pure system that turns wave requests and elapsed time into spawn commands.
#[derive(Debug)]
pub struct WaveDirector {
    drip_interval: Duration,
    accumulator: Duration,
    rng: ChaCha8Rng,
}

impl WaveDirector {
    /// Creates a new wave director using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            drip_interval: config.drip_interval,
            accumulator: Duration::ZERO,
            rng: ChaCha8Rng::seed_from_u64(config.rng_seed),
        }
    }

    /// Prepares the bulk spawn for the wave after `progress.wave`.
    ///
    /// Returns `None` when no wave may start: the match is not waiting or
    /// there are no lanes to spawn on.
    pub fn plan_wave(&mut self, progress: ProgressSnapshot, lanes: &[Lane]) -> Option<WavePlan> {
        if progress.status != GameStatus::Waiting || lanes.is_empty() {
            return None;
        }

        let wave = progress.wave.saturating_add(1);
        let spawns = (0..wave_enemy_count(wave))
            .map(|slot| self.roll_spawn(wave, slot, lanes))
            .collect();
        debug!(wave, "planned wave");
        Some(WavePlan { wave, spawns })
    }

    /// Consumes events and emits drip spawn commands for the live wave.
    pub fn handle(
        &mut self,
        events: &[Event],
        progress: ProgressSnapshot,
        lanes: &[Lane],
        out: &mut Vec<Command>,
    ) {
        for event in events {
            match event {
                Event::TimeAdvanced { dt } => {
                    self.accumulator = self.accumulator.saturating_add(*dt);
                }
                Event::StatusChanged { from, to }
                    if *from == GameStatus::InProgress || *to == GameStatus::InProgress =>
                {
                    self.cancel();
                }
                Event::GameReset => self.cancel(),
                _ => {}
            }
        }

        if progress.status != GameStatus::InProgress {
            self.cancel();
            return;
        }
        if self.drip_interval.is_zero() || lanes.is_empty() {
            return;
        }

        while self.accumulator >= self.drip_interval {
            self.accumulator -= self.drip_interval;
            let spawn = self.roll_spawn(progress.wave, 0, lanes);
            trace!(wave = progress.wave, kind = ?spawn.kind, "drip spawn");
            out.push(Command::SpawnEnemy { spawn });
        }
    }

    /// Cancels the pending drip timer.
    pub fn cancel(&mut self) {
        self.accumulator = Duration::ZERO;
    }

    /// Time accumulated towards the next drip spawn.
    #[must_use]
    pub fn pending(&self) -> Duration {
        self.accumulator
    }

    fn roll_spawn(&mut self, wave: u32, offset_slots: u32, lanes: &[Lane]) -> EnemySpawn {
        let lane = lanes[self.rng.gen_range(0..lanes.len())].id();
        let kind = select_kind(wave, &mut self.rng);
        EnemySpawn {
            kind,
            lane,
            health: kind.scaled_health(wave),
            offset_slots,
        }
    }
}

/// Picks an enemy type for `wave`.
///
/// Waves up to 3 only field basic enemies. From wave 4 a 30% share is special,
/// split evenly between fast and tank. From wave 6 half are special, with
/// tanks drawn 70% of the time.
pub fn select_kind<R: Rng + ?Sized>(wave: u32, rng: &mut R) -> EnemyKind {
    let (special_share, fast_share) = if wave > 5 {
        (0.5, 0.3)
    } else if wave > 3 {
        (0.3, 0.5)
    } else {
        return EnemyKind::Basic;
    };

    if !rng.gen_bool(special_share) {
        return EnemyKind::Basic;
    }
    if rng.gen_bool(fast_share) {
        EnemyKind::Fast
    } else {
        EnemyKind::Tank
    }
}

fn derive_room_seed(room: &RoomId) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(room.as_str().as_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0_u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}
