//! Match controller — the single entry point for running a delivery
//! match headless.
//!
//! `MatchEngine` owns all mutable state (grid, weather, couriers,
//! order pools) and advances it from `update(delta_seconds)`. There is
//! no wall clock anywhere: every timed behavior compares the engine's
//! `now` against a stored `last_*` timestamp, so matches are
//! frame-rate-independent and, with a fixed seed, fully reproducible.

use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use courier_logic::courier::{
    Courier, DeliveryReceipt, MoveOutcome, DEFAULT_CAPACITY, REPUTATION_LOSS_THRESHOLD,
};
use courier_logic::grid::CityGrid;
use courier_logic::orders::{Order, ReleaseQueue};
use courier_logic::placement::{place_point, DEFAULT_MAX_VISITED, DEFAULT_SEPARATION};
use courier_logic::scoring::{final_score, ScoreBreakdown};
use courier_logic::strategy::{CpuController, Difficulty};
use courier_logic::weather::{WeatherConfig, WeatherSystem, WeatherTables};

use crate::content::OrderDescriptor;

/// Feed of order descriptors. `fetch` returning `None` signals an
/// outage; the engine keeps running on what it already has.
pub trait OrderSource {
    fn fetch(&mut self) -> Option<Vec<OrderDescriptor>>;
}

/// Serves a fixed descriptor list on every poll. The engine's seen-id
/// dedupe makes the repetition harmless; this is the offline/local
/// stand-in for the remote feed.
pub struct StaticOrderSource {
    descriptors: Vec<OrderDescriptor>,
}

impl StaticOrderSource {
    pub fn new(descriptors: Vec<OrderDescriptor>) -> Self {
        Self { descriptors }
    }
}

impl OrderSource for StaticOrderSource {
    fn fetch(&mut self) -> Option<Vec<OrderDescriptor>> {
        Some(self.descriptors.clone())
    }
}

/// Match parameters. Defaults mirror the demo content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchConfig {
    /// Earnings target; first agent to reach it wins.
    pub income_goal: u64,
    /// Match length in sim seconds.
    pub duration: f64,
    /// Seconds between order releases from the pending queue.
    pub release_interval: f64,
    /// Cap on simultaneously active (on-map) orders.
    pub max_active: usize,
    /// Seconds between order-feed polls.
    pub poll_interval: f64,
    /// Seconds between seen-id set rebuilds.
    pub seen_cleanup_interval: f64,
    pub courier_capacity: u32,
    /// `None` runs a solo match with no CPU rival.
    pub cpu_difficulty: Option<Difficulty>,
    /// Seed for all engine randomness.
    pub seed: u64,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            income_goal: 5500,
            duration: 600.0,
            release_interval: 5.0,
            max_active: 5,
            poll_interval: 15.0,
            seen_cleanup_interval: 20.0,
            courier_capacity: DEFAULT_CAPACITY,
            cpu_difficulty: Some(Difficulty::Medium),
            seed: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgentId {
    Player,
    Cpu,
}

/// Terminal state of a match, checked at the top of each tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MatchOutcome {
    /// An agent reached the income goal.
    Win { winner: AgentId },
    /// The clock ran out; winner is whoever earned more.
    TimeUp { winner: AgentId },
    /// An agent's reputation collapsed.
    ReputationLoss { agent: AgentId },
}

/// Player input for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerCommand {
    Move(i32, i32),
    CancelLast,
}

pub struct MatchEngine {
    pub grid: CityGrid,
    pub weather: WeatherSystem,
    pub player: Courier,
    pub cpu: Option<(Courier, CpuController)>,
    /// Orders currently on the map, available for pickup.
    pub active: Vec<Order>,
    /// Orders waiting for release.
    pub queue: ReleaseQueue,

    config: MatchConfig,
    source: Option<Box<dyn OrderSource>>,
    seen: HashSet<String>,
    rng: StdRng,
    now: f64,
    last_release: f64,
    last_poll: f64,
    last_seen_cleanup: f64,
    outcome: Option<MatchOutcome>,
    /// Most recent player delivery, for HUD display.
    last_receipt: Option<DeliveryReceipt>,
}

impl MatchEngine {
    /// Build a match. The player spawns on the first passable tile in
    /// row-major order; the CPU spawns at the far corner, walked back
    /// to the first passable tile.
    pub fn new(
        grid: CityGrid,
        weather_config: WeatherConfig,
        config: MatchConfig,
        source: Option<Box<dyn OrderSource>>,
    ) -> Self {
        let mut rng = StdRng::seed_from_u64(config.seed);
        let weather = WeatherSystem::new(WeatherTables::default(), weather_config, 0.0, &mut rng);

        let (px, py) = first_passable(&grid).unwrap_or((0, 0));
        let player = Courier::new(px, py, config.courier_capacity);

        let cpu = config.cpu_difficulty.map(|difficulty| {
            let (cx, cy) = far_corner_spawn(&grid).unwrap_or((px, py));
            (
                Courier::new(cx, cy, config.courier_capacity),
                CpuController::new(difficulty),
            )
        });

        // Negative timestamps make the first poll and release fire on
        // the first tick instead of one interval in.
        let last_poll = -config.poll_interval;
        let last_release = -config.release_interval;

        Self {
            grid,
            weather,
            player,
            cpu,
            active: Vec::new(),
            queue: ReleaseQueue::new(),
            config,
            source,
            seen: HashSet::new(),
            rng,
            now: 0.0,
            last_release,
            last_poll,
            last_seen_cleanup: 0.0,
            outcome: None,
            last_receipt: None,
        }
    }

    pub fn now(&self) -> f64 {
        self.now
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    pub fn outcome(&self) -> Option<&MatchOutcome> {
        self.outcome.as_ref()
    }

    pub fn remaining_time(&self) -> f64 {
        (self.config.duration - self.now).max(0.0)
    }

    pub fn last_receipt(&self) -> Option<&DeliveryReceipt> {
        self.last_receipt.as_ref()
    }

    /// Final score for the player (valid any time, definitive once an
    /// outcome is set).
    pub fn player_score(&self) -> ScoreBreakdown {
        final_score(
            self.player.earnings(),
            self.player.reputation(),
            self.now.min(self.config.duration),
            self.config.duration,
            self.config.income_goal,
        )
    }

    /// Apply a player command. Commands are ignored once the match
    /// has ended.
    pub fn apply(&mut self, command: PlayerCommand) {
        if self.outcome.is_some() {
            return;
        }
        match command {
            PlayerCommand::Move(dx, dy) => {
                self.player_move(dx, dy);
            }
            PlayerCommand::CancelLast => {
                self.player.cancel_last();
            }
        }
    }

    /// Move the player one cell, with current weather applied.
    pub fn player_move(&mut self, dx: i32, dy: i32) -> MoveOutcome {
        let weather_mult = self.weather.speed_multiplier(self.now);
        let extra_drain = self.weather.extra_stamina_drain(self.now);
        self.player
            .try_move(dx, dy, &self.grid, weather_mult, extra_drain, self.now)
    }

    /// Advance the match by `delta_seconds` of sim time.
    pub fn update(&mut self, delta_seconds: f64) {
        if self.outcome.is_some() {
            return;
        }

        self.now += delta_seconds;

        // Terminal conditions are evaluated at the top of the tick,
        // on the state the previous tick left behind.
        if let Some(outcome) = self.evaluate_terminals() {
            self.outcome = Some(outcome);
            return;
        }

        self.weather.advance(self.now, &mut self.rng);

        self.player_phase();
        self.cpu_phase();

        if self.now - self.last_seen_cleanup >= self.config.seen_cleanup_interval {
            self.rebuild_seen();
            self.last_seen_cleanup = self.now;
        }

        if self.now - self.last_poll >= self.config.poll_interval {
            self.poll_feed();
            self.last_poll = self.now;
        }

        if self.now - self.last_release >= self.config.release_interval {
            self.release_one();
            self.last_release = self.now;
        }
    }

    fn evaluate_terminals(&self) -> Option<MatchOutcome> {
        let cpu_earnings = self.cpu.as_ref().map(|(c, _)| c.earnings()).unwrap_or(0);

        if self.player.earnings() >= self.config.income_goal {
            return Some(MatchOutcome::Win {
                winner: AgentId::Player,
            });
        }
        if cpu_earnings >= self.config.income_goal {
            return Some(MatchOutcome::Win {
                winner: AgentId::Cpu,
            });
        }

        if self.player.reputation() <= REPUTATION_LOSS_THRESHOLD {
            return Some(MatchOutcome::ReputationLoss {
                agent: AgentId::Player,
            });
        }
        if let Some((cpu, _)) = &self.cpu {
            if cpu.reputation() <= REPUTATION_LOSS_THRESHOLD {
                return Some(MatchOutcome::ReputationLoss {
                    agent: AgentId::Cpu,
                });
            }
        }

        if self.now >= self.config.duration {
            // Earnings ties go to the CPU; the player has to strictly
            // out-earn it to take a timeout win.
            let winner = if self.cpu.is_some() && cpu_earnings >= self.player.earnings() {
                AgentId::Cpu
            } else {
                AgentId::Player
            };
            return Some(MatchOutcome::TimeUp { winner });
        }

        None
    }

    /// Player recovery plus automatic pickup/delivery on the tile the
    /// player is standing on.
    fn player_phase(&mut self) {
        self.player.recover(self.now);

        while let Some(index) = self
            .active
            .iter()
            .position(|o| o.pickup == self.player.position())
        {
            let order = self.active[index].clone();
            if self.player.try_pickup(order, self.now).is_ok() {
                self.active.remove(index);
            } else {
                break;
            }
        }

        if let Some(receipt) = self.player.try_deliver(self.now) {
            self.last_receipt = Some(receipt);
        }
    }

    fn cpu_phase(&mut self) {
        let weather_mult = self.weather.speed_multiplier(self.now);
        let extra_drain = self.weather.extra_stamina_drain(self.now);
        if let Some((courier, controller)) = &mut self.cpu {
            controller.tick(
                courier,
                &mut self.active,
                &self.grid,
                weather_mult,
                extra_drain,
                self.now,
                &mut self.rng,
            );
        }
    }

    /// Drop seen ids that no longer correspond to a live order, so a
    /// long match cannot grow the set without bound.
    fn rebuild_seen(&mut self) {
        let mut live: HashSet<String> = HashSet::new();
        for order in &self.active {
            live.insert(order.id.clone());
        }
        for order in self.queue.pending_orders() {
            live.insert(order.id.clone());
        }
        for order in self.player.inventory() {
            live.insert(order.id.clone());
        }
        if let Some((cpu, _)) = &self.cpu {
            for order in cpu.inventory() {
                live.insert(order.id.clone());
            }
        }
        self.seen.retain(|id| live.contains(id));
    }

    /// Points that placement must keep clear of: every live order
    /// endpoint plus both agent positions.
    fn occupancy(&self) -> HashSet<(i32, i32)> {
        let mut occupied = HashSet::new();
        for order in self.active.iter().chain(self.queue.pending_orders()) {
            occupied.insert(order.pickup);
            occupied.insert(order.dropoff);
        }
        for order in self.player.inventory() {
            occupied.insert(order.pickup);
            occupied.insert(order.dropoff);
        }
        if let Some((cpu, _)) = &self.cpu {
            for order in cpu.inventory() {
                occupied.insert(order.pickup);
                occupied.insert(order.dropoff);
            }
        }
        occupied.insert(self.player.position());
        if let Some((cpu, _)) = &self.cpu {
            occupied.insert(cpu.position());
        }
        occupied
    }

    /// Poll the order feed, dedupe by id, place endpoints, and queue
    /// the newcomers. An outage (`None`) is silently tolerated.
    fn poll_feed(&mut self) {
        let descriptors = match self.source.as_mut().and_then(|s| s.fetch()) {
            Some(descriptors) => descriptors,
            None => return,
        };

        let mut occupied = self.occupancy();
        for descriptor in descriptors {
            let id = descriptor.order_id();
            if self.seen.contains(&id) {
                continue;
            }
            let pickup = place_point(
                &self.grid,
                descriptor.pickup,
                &mut occupied,
                DEFAULT_SEPARATION,
                DEFAULT_MAX_VISITED,
            );
            let dropoff = place_point(
                &self.grid,
                descriptor.dropoff,
                &mut occupied,
                DEFAULT_SEPARATION,
                DEFAULT_MAX_VISITED,
            );
            self.seen.insert(id);
            self.queue.push(descriptor.into_order(pickup, dropoff));
        }
    }

    /// Release the highest-priority pending order onto the map, if
    /// the active cap allows.
    fn release_one(&mut self) {
        if self.active.len() >= self.config.max_active {
            return;
        }
        if let Some(order) = self.queue.pop_highest() {
            self.active.push(order);
        }
    }

    /// Capture the full match state for saving or undo. The RNG is
    /// not captured; a restored match reseeds from the config.
    pub fn snapshot(&self) -> crate::persistence::SaveData {
        crate::persistence::SaveData {
            version: crate::persistence::SAVE_VERSION,
            elapsed: self.now,
            config: self.config.clone(),
            grid: self.grid.clone(),
            weather: self.weather.clone(),
            player: self.player.clone(),
            cpu: self.cpu.clone(),
            active: self.active.clone(),
            queue: self.queue.clone(),
            seen: self.seen.clone(),
            last_release: self.last_release,
            last_poll: self.last_poll,
            last_seen_cleanup: self.last_seen_cleanup,
            outcome: self.outcome.clone(),
        }
    }

    /// Rebuild a match from a snapshot. The order source is supplied
    /// fresh (trait objects do not serialize).
    pub fn from_snapshot(
        data: crate::persistence::SaveData,
        source: Option<Box<dyn OrderSource>>,
    ) -> Self {
        let rng = StdRng::seed_from_u64(data.config.seed);
        Self {
            grid: data.grid,
            weather: data.weather,
            player: data.player,
            cpu: data.cpu,
            active: data.active,
            queue: data.queue,
            config: data.config,
            source,
            seen: data.seen,
            rng,
            now: data.elapsed,
            last_release: data.last_release,
            last_poll: data.last_poll,
            last_seen_cleanup: data.last_seen_cleanup,
            outcome: data.outcome,
            last_receipt: None,
        }
    }

    /// Restore this engine in place from a snapshot, keeping the
    /// current order source.
    pub fn restore(&mut self, data: crate::persistence::SaveData) {
        let source = self.source.take();
        *self = Self::from_snapshot(data, source);
    }
}

/// First passable tile in row-major order.
fn first_passable(grid: &CityGrid) -> Option<(i32, i32)> {
    for y in 0..grid.height() {
        for x in 0..grid.width() {
            if !grid.is_blocked(x, y) {
                return Some((x, y));
            }
        }
    }
    None
}

/// Far-corner spawn: start at (width-1, height-1) and scan backwards
/// in row-major order to the first passable tile.
fn far_corner_spawn(grid: &CityGrid) -> Option<(i32, i32)> {
    for y in (0..grid.height()).rev() {
        for x in (0..grid.width()).rev() {
            if !grid.is_blocked(x, y) {
                return Some((x, y));
            }
        }
    }
    None
}
