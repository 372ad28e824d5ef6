//! CPU decision policies.
//!
//! A `CpuController` drives a plain [`Courier`] — composition, not a
//! subclass. Three tiers share the same scaffolding (recovery,
//! exhaustion wait, movement pacing, automatic pickup/delivery) and
//! differ in how they pick an objective and a step:
//!
//! - **Easy**: random walk; the objective only matters for what gets
//!   auto-collected or auto-delivered along the way.
//! - **Medium**: greedy heuristic target, one-step Manhattan descent.
//!   No lookahead, so it can oscillate against obstacles.
//! - **Hard**: nearest-neighbor delivery sequencing plus a fresh A*
//!   per tick, stepping one cell at a time.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::courier::Courier;
use crate::grid::CityGrid;
use crate::orders::Order;
use crate::pathfinding::{astar, DEFAULT_MAX_EXPANSIONS};

/// How often the easy policy re-rolls its objective.
const RETARGET_INTERVAL: f64 = 5.0;

/// Re-check cadence while exhausted.
const EXHAUSTED_WAIT: f64 = 2.0;

/// Easy-policy chance of targeting a carried dropoff over a pickup.
const DELIVER_BIAS: f64 = 0.7;

const DIRECTIONS: [(i32, i32); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

/// CPU difficulty tier. Harder tiers act more often.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    /// Seconds between decision ticks.
    pub fn move_interval(self) -> f64 {
        match self {
            Self::Easy => 0.2,
            Self::Medium => 0.15,
            Self::Hard => 0.1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectiveKind {
    Pickup,
    Dropoff,
}

/// Transient CPU target, re-evaluated on completion (and periodically
/// for the easy tier).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Objective {
    pub pos: (i32, i32),
    pub kind: ObjectiveKind,
}

/// Decision state for one CPU courier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CpuController {
    difficulty: Difficulty,
    objective: Option<Objective>,
    last_objective_change: f64,
    last_move: f64,
}

impl CpuController {
    pub fn new(difficulty: Difficulty) -> Self {
        Self {
            difficulty,
            objective: None,
            last_objective_change: 0.0,
            last_move: 0.0,
        }
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn objective(&self) -> Option<Objective> {
        self.objective
    }

    /// One decision tick. Recovers stamina, rate-limits actions, and
    /// dispatches to the policy for this difficulty. `active` is the
    /// shared on-map order list; collected orders are removed from it.
    pub fn tick(
        &mut self,
        courier: &mut Courier,
        active: &mut Vec<Order>,
        grid: &CityGrid,
        weather_mult: f64,
        extra_drain: f64,
        now: f64,
        rng: &mut impl Rng,
    ) {
        courier.recover(now);

        // Exhausted couriers just wait, re-checking every couple of
        // seconds rather than spinning.
        if courier.stamina() <= 0.0 {
            if now - self.last_move >= EXHAUSTED_WAIT {
                self.last_move = now;
            }
            return;
        }

        if now - self.last_move < self.difficulty.move_interval() {
            return;
        }

        match self.difficulty {
            Difficulty::Easy => self.act_easy(courier, active, grid, weather_mult, extra_drain, now, rng),
            Difficulty::Medium => {
                self.act_medium(courier, active, grid, weather_mult, extra_drain, now, rng)
            }
            Difficulty::Hard => {
                self.act_hard(courier, active, grid, weather_mult, extra_drain, now, rng)
            }
        }

        // Tick consumed even when no move happened.
        self.last_move = now;
    }

    // ── Shared auto-triggers ────────────────────────────────────────

    /// Pick up any active order whose pickup cell the courier stands
    /// on (capacity permitting) and retarget to its dropoff.
    fn auto_collect(&mut self, courier: &mut Courier, active: &mut Vec<Order>, now: f64) {
        while let Some(index) = active
            .iter()
            .position(|o| o.pickup == courier.position())
        {
            let order = active[index].clone();
            let dropoff = order.dropoff;
            if courier.try_pickup(order, now).is_ok() {
                active.remove(index);
                self.objective = Some(Objective {
                    pos: dropoff,
                    kind: ObjectiveKind::Dropoff,
                });
            } else {
                break;
            }
        }
    }

    fn auto_deliver(&mut self, courier: &mut Courier, now: f64) {
        if courier.try_deliver(now).is_some() {
            self.objective = None;
        }
    }

    fn valid_directions(courier: &Courier, grid: &CityGrid) -> Vec<(i32, i32)> {
        DIRECTIONS
            .iter()
            .copied()
            .filter(|&(dx, dy)| !grid.is_blocked(courier.x + dx, courier.y + dy))
            .collect()
    }

    fn random_step(
        courier: &mut Courier,
        grid: &CityGrid,
        weather_mult: f64,
        extra_drain: f64,
        now: f64,
        rng: &mut impl Rng,
    ) {
        if let Some(&(dx, dy)) = Self::valid_directions(courier, grid).choose(rng) {
            courier.try_move(dx, dy, grid, weather_mult, extra_drain, now);
        }
    }

    // ── Easy: random walk ───────────────────────────────────────────

    #[allow(clippy::too_many_arguments)]
    fn act_easy(
        &mut self,
        courier: &mut Courier,
        active: &mut Vec<Order>,
        grid: &CityGrid,
        weather_mult: f64,
        extra_drain: f64,
        now: f64,
        rng: &mut impl Rng,
    ) {
        self.auto_collect(courier, active, now);
        self.auto_deliver(courier, now);

        if self.objective.is_none() || now - self.last_objective_change > RETARGET_INTERVAL {
            self.objective = Self::random_objective(courier, active, rng);
            self.last_objective_change = now;
        }

        Self::random_step(courier, grid, weather_mult, extra_drain, now, rng);
    }

    /// 70% a carried dropoff (when carrying), else a random feasible
    /// pickup, else nothing. The objective does not steer the walk;
    /// it only primes the auto-triggers.
    fn random_objective(
        courier: &Courier,
        active: &[Order],
        rng: &mut impl Rng,
    ) -> Option<Objective> {
        let carried: Vec<&Order> = courier.inventory().collect();
        if !carried.is_empty() && rng.gen_bool(DELIVER_BIAS) {
            let order = carried.choose(rng)?;
            return Some(Objective {
                pos: order.dropoff,
                kind: ObjectiveKind::Dropoff,
            });
        }
        if !active.is_empty() && courier.carried_weight() < courier.capacity() {
            let order = active.choose(rng)?;
            return Some(Objective {
                pos: order.pickup,
                kind: ObjectiveKind::Pickup,
            });
        }
        None
    }

    // ── Medium: greedy heuristic ────────────────────────────────────

    #[allow(clippy::too_many_arguments)]
    fn act_medium(
        &mut self,
        courier: &mut Courier,
        active: &mut Vec<Order>,
        grid: &CityGrid,
        weather_mult: f64,
        extra_drain: f64,
        now: f64,
        rng: &mut impl Rng,
    ) {
        self.auto_collect(courier, active, now);
        self.auto_deliver(courier, now);

        if self.objective.is_none() {
            self.objective = Self::greedy_objective(courier, active);
        }

        if let Some(objective) = self.objective {
            if let Some((dx, dy)) = Self::descent_step(courier, grid, objective.pos) {
                courier.try_move(dx, dy, grid, weather_mult, extra_drain, now);
                return;
            }
        }

        Self::random_step(courier, grid, weather_mult, extra_drain, now, rng);
    }

    /// Score carried dropoffs and feasible pickups; take the best.
    /// Note the sign on priority: urgent orders score WORSE. That is
    /// the medium tier's deliberate blind spot, not a bug.
    fn greedy_objective(courier: &Courier, active: &[Order]) -> Option<Objective> {
        let (cx, cy) = courier.position();
        let mut best: Option<(f64, Objective)> = None;

        let mut consider = |score: f64, objective: Objective| {
            if best.map(|(s, _)| score > s).unwrap_or(true) {
                best = Some((score, objective));
            }
        };

        for order in courier.inventory() {
            let dist = manhattan((cx, cy), order.dropoff);
            let score = order.payout as f64 * 1.5 - dist * 10.0 - order.priority as f64 * 20.0;
            consider(
                score,
                Objective {
                    pos: order.dropoff,
                    kind: ObjectiveKind::Dropoff,
                },
            );
        }

        for order in active {
            if courier.carried_weight() + order.weight > courier.capacity() {
                continue;
            }
            let dist = manhattan((cx, cy), order.pickup);
            let score = order.payout as f64 * 1.2 - dist * 5.0 - order.priority as f64 * 15.0;
            consider(
                score,
                Objective {
                    pos: order.pickup,
                    kind: ObjectiveKind::Pickup,
                },
            );
        }

        best.map(|(_, objective)| objective)
    }

    /// Passable cardinal step minimizing Manhattan distance to the
    /// target. One-step descent with no lookahead.
    fn descent_step(courier: &Courier, grid: &CityGrid, target: (i32, i32)) -> Option<(i32, i32)> {
        Self::valid_directions(courier, grid)
            .into_iter()
            .min_by_key(|&(dx, dy)| {
                let next = (courier.x + dx, courier.y + dy);
                (next.0 - target.0).abs() + (next.1 - target.1).abs()
            })
    }

    // ── Hard: sequencing + A* ───────────────────────────────────────

    #[allow(clippy::too_many_arguments)]
    fn act_hard(
        &mut self,
        courier: &mut Courier,
        active: &mut Vec<Order>,
        grid: &CityGrid,
        weather_mult: f64,
        extra_drain: f64,
        now: f64,
        rng: &mut impl Rng,
    ) {
        self.auto_collect(courier, active, now);
        self.auto_deliver(courier, now);

        if self.objective.is_none() {
            self.objective = Self::planned_objective(courier, active);
        }

        if let Some(objective) = self.objective {
            // Replanned from scratch every tick; self-healing against
            // weather and map changes.
            if let Some(path) = astar(
                grid,
                courier.position(),
                objective.pos,
                weather_mult,
                DEFAULT_MAX_EXPANSIONS,
            ) {
                if path.len() > 1 {
                    let (nx, ny) = path[1];
                    courier.try_move(
                        nx - courier.x,
                        ny - courier.y,
                        grid,
                        weather_mult,
                        extra_drain,
                        now,
                    );
                    return;
                }
            }
        }

        Self::random_step(courier, grid, weather_mult, extra_drain, now, rng);
    }

    /// Carrying: first stop of a nearest-neighbor delivery sequence.
    /// Otherwise the best feasible pickup by the planning score.
    fn planned_objective(courier: &Courier, active: &[Order]) -> Option<Objective> {
        if courier.inventory_len() > 0 {
            if let Some(first) = delivery_sequence(courier).into_iter().next() {
                return Some(Objective {
                    pos: first,
                    kind: ObjectiveKind::Dropoff,
                });
            }
        }

        let (cx, cy) = courier.position();
        active
            .iter()
            .filter(|o| courier.carried_weight() + o.weight <= courier.capacity())
            .map(|o| {
                let total_dist = manhattan((cx, cy), o.pickup) + manhattan(o.pickup, o.dropoff);
                let score = o.payout as f64 * 2.0
                    - total_dist * 8.0
                    - o.weight as f64 * 5.0
                    - o.priority as f64 * 25.0;
                (score, o.pickup)
            })
            .max_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, pickup)| Objective {
                pos: pickup,
                kind: ObjectiveKind::Pickup,
            })
    }
}

fn manhattan(a: (i32, i32), b: (i32, i32)) -> f64 {
    ((a.0 - b.0).abs() + (a.1 - b.1).abs()) as f64
}

/// Greedy nearest-neighbor ordering of the carried dropoffs
/// (approximate TSP from the courier's position).
pub fn delivery_sequence(courier: &Courier) -> Vec<(i32, i32)> {
    let mut pending: Vec<(i32, i32)> = courier.inventory().map(|o| o.dropoff).collect();
    let mut sequence = Vec::with_capacity(pending.len());
    let mut current = courier.position();

    while !pending.is_empty() {
        let (index, _) = pending
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| manhattan(current, **a).total_cmp(&manhattan(current, **b)))
            .map(|(i, p)| (i, *p))
            .unwrap_or((0, pending[0]));
        current = pending.remove(index);
        sequence.push(current);
    }

    sequence
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::courier::DEFAULT_CAPACITY;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    fn open_grid(side: usize) -> CityGrid {
        let row = "C".repeat(side);
        let rows: Vec<String> = (0..side).map(|_| row.clone()).collect();
        CityGrid::from_rows(&rows).unwrap()
    }

    fn order(id: &str, pickup: (i32, i32), dropoff: (i32, i32)) -> Order {
        Order::new(id, pickup, dropoff, 1, 0, 100)
    }

    #[test]
    fn test_easy_moves_only_on_passable_cells() {
        let grid = CityGrid::from_rows(&["CBC", "CCC", "CBC"]).unwrap();
        let mut courier = Courier::new(1, 1, DEFAULT_CAPACITY);
        let mut cpu = CpuController::new(Difficulty::Easy);
        let mut active = Vec::new();
        let mut r = rng();

        let mut now = 0.0;
        for _ in 0..50 {
            now += 0.25;
            cpu.tick(&mut courier, &mut active, &grid, 1.0, 0.0, now, &mut r);
            let (x, y) = courier.position();
            assert!(!grid.is_blocked(x, y));
        }
    }

    #[test]
    fn test_pacing_gate_limits_actions() {
        let grid = open_grid(5);
        let mut courier = Courier::new(2, 2, DEFAULT_CAPACITY);
        let mut cpu = CpuController::new(Difficulty::Easy);
        let mut active = Vec::new();
        let mut r = rng();

        let stamina_before = courier.stamina();
        cpu.tick(&mut courier, &mut active, &grid, 1.0, 0.0, 0.3, &mut r);
        let after_first = courier.stamina();
        assert!(after_first < stamina_before, "first tick should move");

        // Immediately after, the interval has not elapsed: no move.
        cpu.tick(&mut courier, &mut active, &grid, 1.0, 0.0, 0.35, &mut r);
        assert_eq!(courier.stamina(), after_first);
    }

    #[test]
    fn test_exhausted_cpu_waits() {
        let grid = open_grid(5);
        let mut courier = Courier::new(2, 2, DEFAULT_CAPACITY);
        let mut cpu = CpuController::new(Difficulty::Hard);
        let mut active = vec![order("a", (0, 0), (4, 4))];
        let mut r = rng();

        // Force exhaustion without a recovery window.
        let before = courier.position();
        courier_drain(&mut courier, &grid);
        cpu.tick(&mut courier, &mut active, &grid, 1.0, 0.0, 0.9, &mut r);
        assert_eq!(courier.position(), before, "exhausted CPU must not act");
    }

    /// Burn stamina to zero with heavy extra drain, ping-ponging so
    /// the courier ends back on its starting cell.
    fn courier_drain(courier: &mut Courier, grid: &CityGrid) {
        let mut step = 1;
        while courier.stamina() > 0.0 {
            let dir = if step % 2 == 0 { 1 } else { -1 };
            courier.try_move(dir, 0, grid, 1.0, 60.0, step as f64 * 0.001);
            step += 1;
        }
    }

    #[test]
    fn test_auto_collect_and_retarget() {
        let grid = open_grid(6);
        let mut courier = Courier::new(3, 3, DEFAULT_CAPACITY);
        let mut cpu = CpuController::new(Difficulty::Easy);
        let mut active = vec![order("here", (3, 3), (5, 5))];
        let mut r = rng();

        cpu.tick(&mut courier, &mut active, &grid, 1.0, 0.0, 0.3, &mut r);

        assert_eq!(courier.inventory_len(), 1);
        assert!(active.is_empty());
        // After collecting, the easy policy may re-roll its objective,
        // but the pickup itself retargeted to the dropoff first.
        assert!(cpu.objective().is_some());
    }

    #[test]
    fn test_auto_deliver_clears_objective() {
        let grid = open_grid(6);
        let mut courier = Courier::new(3, 3, DEFAULT_CAPACITY);
        courier
            .try_pickup(order("a", (1, 1), (3, 3)), 0.0)
            .unwrap();
        let mut cpu = CpuController::new(Difficulty::Medium);
        let mut active = Vec::new();
        let mut r = rng();

        cpu.tick(&mut courier, &mut active, &grid, 1.0, 0.0, 0.3, &mut r);
        assert_eq!(courier.inventory_len(), 0);
        assert_eq!(courier.stats().deliveries, 1);
    }

    #[test]
    fn test_greedy_prefers_low_priority_quirk() {
        let courier = Courier::new(0, 0, DEFAULT_CAPACITY);
        let active = vec![
            Order::new("urgent", (2, 0), (5, 5), 1, 5, 100),
            Order::new("calm", (2, 0), (5, 5), 1, 0, 100),
        ];
        let objective = CpuController::greedy_objective(&courier, &active).unwrap();
        // Same position and payout; the high-priority order is
        // penalized by the heuristic, so the calm pickup wins.
        assert_eq!(objective.kind, ObjectiveKind::Pickup);
        assert_eq!(objective.pos, (2, 0));
    }

    #[test]
    fn test_medium_descends_toward_objective() {
        let grid = open_grid(9);
        let mut courier = Courier::new(0, 0, DEFAULT_CAPACITY);
        let mut cpu = CpuController::new(Difficulty::Medium);
        let mut active = vec![order("far", (8, 0), (8, 8))];
        let mut r = rng();

        // Strict descent on an open grid walks straight to the pickup;
        // the collect itself lands on the following tick.
        let mut now = 0.0;
        for _ in 0..12 {
            now += 0.2;
            cpu.tick(&mut courier, &mut active, &grid, 1.0, 0.0, now, &mut r);
            if courier.inventory_len() > 0 {
                break;
            }
        }
        assert_eq!(courier.inventory_len(), 1);
        assert_eq!(cpu.objective().map(|o| o.kind), Some(ObjectiveKind::Dropoff));
    }

    #[test]
    fn test_hard_routes_around_walls() {
        let grid = CityGrid::from_rows(&[
            "CCCCC", //
            "BBBBC", //
            "CCCCC",
        ])
        .unwrap();
        let mut courier = Courier::new(0, 0, DEFAULT_CAPACITY);
        let mut cpu = CpuController::new(Difficulty::Hard);
        let mut active = vec![order("below", (0, 2), (4, 2))];
        let mut r = rng();

        let mut now = 0.0;
        for _ in 0..40 {
            now += 0.15;
            cpu.tick(&mut courier, &mut active, &grid, 1.0, 0.0, now, &mut r);
            if courier.inventory_len() > 0 {
                break;
            }
        }
        assert_eq!(courier.inventory_len(), 1, "hard CPU should reach the pickup");
    }

    #[test]
    fn test_hard_falls_back_to_random_when_enclosed() {
        // Objective is walled off; A* fails and the CPU wanders
        // instead of freezing.
        let grid = CityGrid::from_rows(&["CCCBC", "CCCBC", "CCCBC"]).unwrap();
        let mut courier = Courier::new(0, 0, DEFAULT_CAPACITY);
        let mut cpu = CpuController::new(Difficulty::Hard);
        let mut active = vec![order("sealed", (4, 1), (4, 2))];
        let mut r = rng();

        let mut moved = false;
        let mut now = 0.0;
        for _ in 0..30 {
            now += 0.15;
            let before = courier.position();
            cpu.tick(&mut courier, &mut active, &grid, 1.0, 0.0, now, &mut r);
            if courier.position() != before {
                moved = true;
            }
        }
        assert!(moved, "fallback random movement expected");
        assert_eq!(courier.inventory_len(), 0);
    }

    #[test]
    fn test_delivery_sequence_is_nearest_neighbor() {
        let mut courier = Courier::new(0, 0, DEFAULT_CAPACITY);
        courier.try_pickup(order("far", (0, 0), (9, 9)), 0.0).unwrap();
        courier.try_pickup(order("near", (0, 0), (1, 0)), 0.0).unwrap();
        courier.try_pickup(order("mid", (0, 0), (4, 4)), 0.0).unwrap();

        assert_eq!(delivery_sequence(&courier), vec![(1, 0), (4, 4), (9, 9)]);
    }
}
