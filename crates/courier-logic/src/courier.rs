//! Courier state machine: movement physics, stamina, inventory,
//! reputation, and delivery scoring.
//!
//! Shared by the human-controlled courier and CPU couriers; the CPU
//! policies in [`crate::strategy`] drive a plain `Courier` rather
//! than extending it. All operations are non-fatal: violations come
//! back as outcome enums a HUD can display, never as panics.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::grid::CityGrid;
use crate::orders::Order;

/// Starting and maximum stamina.
pub const MAX_STAMINA: f64 = 100.0;

/// Starting reputation.
pub const STARTING_REPUTATION: i32 = 70;

/// Reputation at or below which the match is lost.
pub const REPUTATION_LOSS_THRESHOLD: i32 = 20;

/// Default carrying capacity (cumulative order weight).
pub const DEFAULT_CAPACITY: u32 = 10;

/// Base tiles-per-second speed before multipliers.
const BASE_SPEED: f64 = 3.0;

/// Stamina drained by every successful move.
const BASE_MOVE_DRAIN: f64 = 0.5;

/// Extra drain per unit of carried weight above this threshold.
const WEIGHT_DRAIN_THRESHOLD: u32 = 3;
const WEIGHT_DRAIN_RATE: f64 = 0.2;

/// Stamina recovered per elapsed second while resting.
const RECOVERY_PER_SECOND: f64 = 5.0;

/// Stamina needed to clear the blocked flag.
const UNBLOCK_THRESHOLD: f64 = 30.0;

/// Reputation penalty for cancelling a carried order.
const CANCEL_PENALTY: i32 = 4;

/// Every this many consecutive punctual deliveries grants +2.
const STREAK_LENGTH: u32 = 3;
const STREAK_BONUS: i32 = 2;

/// Reputation at which the speed bonus and payout bonus apply.
pub const HIGH_REPUTATION: i32 = 90;

/// Coarse stamina tiers. Only the first two affect speed; `Fatigued`
/// exists for status display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StaminaState {
    Exhausted,
    Tired,
    Fatigued,
    Normal,
}

impl StaminaState {
    pub fn from_stamina(stamina: f64) -> Self {
        if stamina <= 0.0 {
            Self::Exhausted
        } else if stamina <= 30.0 {
            Self::Tired
        } else if stamina <= 50.0 {
            Self::Fatigued
        } else {
            Self::Normal
        }
    }

    /// Speed factor for the movement formula.
    pub fn speed_factor(self) -> f64 {
        match self {
            Self::Exhausted => 0.0,
            Self::Tired => 0.8,
            Self::Fatigued | Self::Normal => 1.0,
        }
    }
}

/// Result of a movement attempt. Failures leave the courier unchanged
/// apart from the stuck counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    Moved,
    /// Stamina hit zero; waiting for recovery.
    Blocked,
    OutOfBounds,
    /// Destination tile is a building.
    Building,
    /// Computed speed was zero (exhausted or impassable surface).
    NoSpeed,
}

impl MoveOutcome {
    pub fn moved(self) -> bool {
        matches!(self, Self::Moved)
    }
}

/// Why a pickup was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickupError {
    /// Adding the order would exceed carrying capacity.
    OverCapacity { needed: u32, free: u32 },
}

/// Punctuality tier of a completed delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeliveryTiming {
    /// elapsed <= 16 s: +5 reputation.
    Early,
    /// elapsed <= 20 s: +3 reputation.
    OnTime,
    /// elapsed <= 50 s: -2 reputation.
    SlightlyLate,
    /// elapsed <= 140 s: -5 reputation.
    Late,
    /// beyond 140 s: -10 reputation.
    VeryLate,
}

impl DeliveryTiming {
    pub fn from_elapsed(elapsed: f64) -> Self {
        if elapsed <= 16.0 {
            Self::Early
        } else if elapsed <= 20.0 {
            Self::OnTime
        } else if elapsed <= 50.0 {
            Self::SlightlyLate
        } else if elapsed <= 140.0 {
            Self::Late
        } else {
            Self::VeryLate
        }
    }

    pub fn reputation_delta(self) -> i32 {
        match self {
            Self::Early => 5,
            Self::OnTime => 3,
            Self::SlightlyLate => -2,
            Self::Late => -5,
            Self::VeryLate => -10,
        }
    }

    pub fn is_punctual(self) -> bool {
        matches!(self, Self::Early | Self::OnTime)
    }
}

/// A completed delivery and its side effects.
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryReceipt {
    pub order: Order,
    pub timing: DeliveryTiming,
    pub payout: u64,
    /// 5% high-reputation bonus, already added to earnings.
    pub bonus: u64,
    /// +2 streak bonus applied with this delivery.
    pub streak_bonus: bool,
}

/// Derived per-courier statistics for display.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CourierStats {
    pub deliveries: u32,
    pub cancellations: u32,
    pub early_deliveries: u32,
    pub late_deliveries: u32,
    pub carried_weight: u32,
    pub free_capacity: u32,
    /// deliveries / (deliveries + cancellations), 1-clamped denominator.
    pub efficiency: f64,
    /// early deliveries / deliveries, 1-clamped denominator.
    pub punctuality: f64,
}

/// A courier on the grid: position, stamina, inventory, earnings,
/// reputation, and the counters that feed scoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Courier {
    pub x: i32,
    pub y: i32,
    stamina: f64,
    capacity: u32,
    inventory: VecDeque<Order>,
    earnings: u64,
    reputation: i32,
    blocked: bool,
    last_recovery: f64,
    stuck_ticks: u32,
    deliveries: u32,
    cancellations: u32,
    early_deliveries: u32,
    late_deliveries: u32,
    punctual_streak: u32,
}

impl Courier {
    pub fn new(x: i32, y: i32, capacity: u32) -> Self {
        Self {
            x,
            y,
            stamina: MAX_STAMINA,
            capacity,
            inventory: VecDeque::new(),
            earnings: 0,
            reputation: STARTING_REPUTATION,
            blocked: false,
            last_recovery: 0.0,
            stuck_ticks: 0,
            deliveries: 0,
            cancellations: 0,
            early_deliveries: 0,
            late_deliveries: 0,
            punctual_streak: 0,
        }
    }

    pub fn position(&self) -> (i32, i32) {
        (self.x, self.y)
    }

    pub fn stamina(&self) -> f64 {
        self.stamina
    }

    pub fn stamina_state(&self) -> StaminaState {
        StaminaState::from_stamina(self.stamina)
    }

    pub fn is_blocked(&self) -> bool {
        self.blocked
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn earnings(&self) -> u64 {
        self.earnings
    }

    pub fn reputation(&self) -> i32 {
        self.reputation
    }

    pub fn inventory(&self) -> impl Iterator<Item = &Order> {
        self.inventory.iter()
    }

    pub fn inventory_len(&self) -> usize {
        self.inventory.len()
    }

    /// Sum of carried order weights. Invariant: never exceeds capacity.
    pub fn carried_weight(&self) -> u32 {
        self.inventory.iter().map(|o| o.weight).sum()
    }

    fn clamp_reputation(&mut self, delta: i32) {
        self.reputation = (self.reputation + delta).clamp(0, 100);
    }

    /// Full movement-speed formula:
    /// `v0 * weather * weight * reputation * stamina * surface`.
    /// The surface weight is the DESTINATION tile's.
    pub fn speed_multiplier(&self, weather_mult: f64, surface_weight: f64) -> f64 {
        let weight_factor = (1.0 - 0.03 * self.carried_weight() as f64).max(0.8);
        let reputation_factor = if self.reputation >= HIGH_REPUTATION {
            1.03
        } else {
            1.0
        };
        let stamina_factor = self.stamina_state().speed_factor();
        (BASE_SPEED * weather_mult * weight_factor * reputation_factor * stamina_factor
            * surface_weight)
            .max(0.0)
    }

    /// Attempt a single-cell move. On success the position updates and
    /// stamina drains; hitting zero stamina blocks the courier until
    /// it recovers past the threshold.
    pub fn try_move(
        &mut self,
        dx: i32,
        dy: i32,
        grid: &CityGrid,
        weather_mult: f64,
        extra_drain: f64,
        now: f64,
    ) -> MoveOutcome {
        if self.blocked {
            return MoveOutcome::Blocked;
        }

        let (nx, ny) = (self.x + dx, self.y + dy);
        if !grid.in_bounds(nx, ny) {
            self.stuck_ticks += 1;
            return MoveOutcome::OutOfBounds;
        }
        let surface = grid.surface_weight(nx, ny);
        if surface <= 0.0 {
            self.stuck_ticks += 1;
            return MoveOutcome::Building;
        }

        if self.speed_multiplier(weather_mult, surface) <= 0.0 {
            return MoveOutcome::NoSpeed;
        }

        self.x = nx;
        self.y = ny;
        self.stuck_ticks = 0;

        let over = self.carried_weight().saturating_sub(WEIGHT_DRAIN_THRESHOLD);
        let drain = BASE_MOVE_DRAIN + WEIGHT_DRAIN_RATE * over as f64 + extra_drain;
        self.stamina = (self.stamina - drain).max(0.0);
        if self.stamina <= 0.0 {
            self.blocked = true;
            self.last_recovery = now;
        }

        MoveOutcome::Moved
    }

    /// Recover stamina once per elapsed second; unblock at the
    /// recovery threshold.
    pub fn recover(&mut self, now: f64) {
        if now - self.last_recovery >= 1.0 {
            self.stamina = (self.stamina + RECOVERY_PER_SECOND).min(MAX_STAMINA);
            self.last_recovery = now;
            if self.stamina >= UNBLOCK_THRESHOLD {
                self.blocked = false;
            }
        }
    }

    /// Pick up an order if capacity allows; stamps the pickup time.
    pub fn try_pickup(&mut self, mut order: Order, now: f64) -> Result<(), PickupError> {
        let carried = self.carried_weight();
        if carried + order.weight > self.capacity {
            return Err(PickupError::OverCapacity {
                needed: order.weight,
                free: self.capacity - carried,
            });
        }
        order.picked_up_at = Some(now);
        self.inventory.push_back(order);
        Ok(())
    }

    /// Cancel the most recently picked-up order (LIFO). The order is
    /// discarded, not returned to the pool. `None` when empty.
    pub fn cancel_last(&mut self) -> Option<Order> {
        let order = self.inventory.pop_back()?;
        self.clamp_reputation(-CANCEL_PENALTY);
        self.cancellations += 1;
        Some(order)
    }

    /// Deliver a carried order at the current position.
    ///
    /// Only orders at the maximum carried priority are candidates; a
    /// lower-priority order cannot be delivered while a higher one is
    /// outstanding, even from its own dropoff. `None` when nothing
    /// deliverable here.
    pub fn try_deliver(&mut self, now: f64) -> Option<DeliveryReceipt> {
        let max_priority = self.inventory.iter().map(|o| o.priority).max()?;
        let index = self.inventory.iter().position(|o| {
            o.priority == max_priority && o.dropoff == (self.x, self.y)
        })?;
        let order = self.inventory.remove(index)?;

        let elapsed = now - order.picked_up_at.unwrap_or(now);
        let timing = DeliveryTiming::from_elapsed(elapsed);

        // The 5% bonus keys off the reputation the courier walked in
        // with; the timing delta cannot retroactively earn it.
        let reputation_before = self.reputation;
        self.clamp_reputation(timing.reputation_delta());

        match timing {
            DeliveryTiming::Early => self.early_deliveries += 1,
            DeliveryTiming::OnTime => {}
            _ => self.late_deliveries += 1,
        }

        self.earnings += order.payout;
        let bonus = if reputation_before >= HIGH_REPUTATION {
            (order.payout as f64 * 0.05) as u64
        } else {
            0
        };
        self.earnings += bonus;
        self.deliveries += 1;

        let streak_bonus = if timing.is_punctual() {
            self.punctual_streak += 1;
            if self.punctual_streak >= STREAK_LENGTH {
                self.clamp_reputation(STREAK_BONUS);
                self.punctual_streak = 0;
                true
            } else {
                false
            }
        } else {
            self.punctual_streak = 0;
            false
        };

        let payout = order.payout;
        Some(DeliveryReceipt {
            order,
            timing,
            payout,
            bonus,
            streak_bonus,
        })
    }

    /// Carried orders sorted by priority, most urgent first.
    pub fn inventory_by_priority(&self) -> Vec<&Order> {
        let mut orders: Vec<&Order> = self.inventory.iter().collect();
        orders.sort_by(|a, b| b.priority.cmp(&a.priority));
        orders
    }

    /// Carried orders sorted by payout, highest first.
    pub fn inventory_by_payout(&self) -> Vec<&Order> {
        let mut orders: Vec<&Order> = self.inventory.iter().collect();
        orders.sort_by(|a, b| b.payout.cmp(&a.payout));
        orders
    }

    pub fn stats(&self) -> CourierStats {
        let carried = self.carried_weight();
        CourierStats {
            deliveries: self.deliveries,
            cancellations: self.cancellations,
            early_deliveries: self.early_deliveries,
            late_deliveries: self.late_deliveries,
            carried_weight: carried,
            free_capacity: self.capacity.saturating_sub(carried),
            efficiency: self.deliveries as f64
                / (self.deliveries + self.cancellations).max(1) as f64,
            punctuality: self.early_deliveries as f64 / self.deliveries.max(1) as f64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::CityGrid;

    fn open_grid() -> CityGrid {
        CityGrid::from_rows(&["CCCCC", "CCCCC", "CCCCC", "CCCCC", "CCCCC"]).unwrap()
    }

    fn order(id: &str, dropoff: (i32, i32), weight: u32, priority: u32, payout: u64) -> Order {
        Order::new(id, (0, 0), dropoff, weight, priority, payout)
    }

    #[test]
    fn test_plain_move_drains_half_point() {
        let grid = open_grid();
        let mut courier = Courier::new(0, 0, DEFAULT_CAPACITY);
        let outcome = courier.try_move(1, 0, &grid, 1.0, 0.0, 0.0);
        assert_eq!(outcome, MoveOutcome::Moved);
        assert_eq!(courier.position(), (1, 0));
        assert!((courier.stamina() - 99.5).abs() < 1e-9);
    }

    #[test]
    fn test_move_into_building_or_bounds_rejected() {
        let grid = CityGrid::from_rows(&["CB", "CC"]).unwrap();
        let mut courier = Courier::new(0, 0, DEFAULT_CAPACITY);

        assert_eq!(courier.try_move(1, 0, &grid, 1.0, 0.0, 0.0), MoveOutcome::Building);
        assert_eq!(courier.position(), (0, 0));
        assert_eq!(
            courier.try_move(-1, 0, &grid, 1.0, 0.0, 0.0),
            MoveOutcome::OutOfBounds
        );
        assert_eq!(courier.position(), (0, 0));
        assert_eq!(courier.stamina(), MAX_STAMINA);
    }

    #[test]
    fn test_heavy_load_drains_more() {
        let grid = open_grid();
        let mut courier = Courier::new(0, 0, DEFAULT_CAPACITY);
        courier.try_pickup(order("a", (4, 4), 5, 0, 100), 0.0).unwrap();

        courier.try_move(1, 0, &grid, 1.0, 0.0, 0.0);
        // 0.5 base + 0.2 * (5 - 3) = 0.9
        assert!((courier.stamina() - 99.1).abs() < 1e-9);
    }

    #[test]
    fn test_exhaustion_blocks_until_recovered() {
        let grid = open_grid();
        let mut courier = Courier::new(0, 0, DEFAULT_CAPACITY);
        courier.stamina = 0.4;

        assert!(courier.try_move(1, 0, &grid, 1.0, 0.0, 10.0).moved());
        assert_eq!(courier.stamina(), 0.0);
        assert!(courier.is_blocked());
        assert_eq!(courier.try_move(1, 0, &grid, 1.0, 0.0, 10.1), MoveOutcome::Blocked);

        // 5 points per second; unblocks at 30.
        for s in 1..=5 {
            courier.recover(10.0 + s as f64);
        }
        assert_eq!(courier.stamina(), 25.0);
        assert!(courier.is_blocked());
        courier.recover(16.0);
        assert_eq!(courier.stamina(), 30.0);
        assert!(!courier.is_blocked());
    }

    #[test]
    fn test_recovery_clamps_to_max() {
        let mut courier = Courier::new(0, 0, DEFAULT_CAPACITY);
        courier.stamina = 98.0;
        courier.recover(1.0);
        assert_eq!(courier.stamina(), MAX_STAMINA);
    }

    #[test]
    fn test_speed_formula_factors() {
        let mut courier = Courier::new(0, 0, DEFAULT_CAPACITY);
        // Fresh courier on road, clear weather: exactly base speed.
        assert!((courier.speed_multiplier(1.0, 1.0) - 3.0).abs() < 1e-9);

        // Weight factor floors at 0.8.
        courier.try_pickup(order("w", (4, 4), 10, 0, 100), 0.0).unwrap();
        assert!((courier.speed_multiplier(1.0, 1.0) - 3.0 * 0.8).abs() < 1e-9);
        courier.inventory.clear();

        // High reputation grants 1.03.
        courier.reputation = 95;
        assert!((courier.speed_multiplier(1.0, 1.0) - 3.0 * 1.03).abs() < 1e-9);
        courier.reputation = 70;

        // Tired tier multiplies by 0.8.
        courier.stamina = 25.0;
        assert!((courier.speed_multiplier(1.0, 1.0) - 3.0 * 0.8).abs() < 1e-9);

        // Exhausted tier zeroes speed.
        courier.stamina = 0.0;
        assert_eq!(courier.speed_multiplier(1.0, 1.0), 0.0);
    }

    #[test]
    fn test_pickup_capacity_gate() {
        let mut courier = Courier::new(0, 0, 10);
        courier.try_pickup(order("a", (1, 1), 7, 0, 100), 0.0).unwrap();

        let err = courier
            .try_pickup(order("b", (2, 2), 4, 0, 100), 0.0)
            .unwrap_err();
        assert_eq!(err, PickupError::OverCapacity { needed: 4, free: 3 });
        assert_eq!(courier.inventory_len(), 1);
        assert!(courier.carried_weight() <= courier.capacity());

        // Exactly filling capacity is fine.
        courier.try_pickup(order("c", (3, 3), 3, 0, 100), 0.0).unwrap();
        assert_eq!(courier.carried_weight(), 10);
    }

    #[test]
    fn test_cancel_is_lifo_and_penalized() {
        let mut courier = Courier::new(0, 0, DEFAULT_CAPACITY);
        courier.try_pickup(order("first", (1, 1), 1, 0, 100), 0.0).unwrap();
        courier.try_pickup(order("second", (2, 2), 1, 0, 100), 1.0).unwrap();

        let cancelled = courier.cancel_last().unwrap();
        assert_eq!(cancelled.id, "second");
        assert_eq!(courier.reputation(), STARTING_REPUTATION - 4);
        assert_eq!(courier.inventory_len(), 1);
        assert_eq!(courier.stats().cancellations, 1);

        courier.cancel_last().unwrap();
        assert!(courier.cancel_last().is_none());
        assert_eq!(courier.reputation(), STARTING_REPUTATION - 8);
    }

    #[test]
    fn test_cancel_penalty_clamps_at_zero() {
        let mut courier = Courier::new(0, 0, DEFAULT_CAPACITY);
        courier.reputation = 2;
        courier.try_pickup(order("a", (1, 1), 1, 0, 100), 0.0).unwrap();
        courier.cancel_last();
        assert_eq!(courier.reputation(), 0);
    }

    #[test]
    fn test_delivery_timing_tiers() {
        assert_eq!(DeliveryTiming::from_elapsed(10.0), DeliveryTiming::Early);
        assert_eq!(DeliveryTiming::from_elapsed(16.0), DeliveryTiming::Early);
        assert_eq!(DeliveryTiming::from_elapsed(18.0), DeliveryTiming::OnTime);
        assert_eq!(DeliveryTiming::from_elapsed(20.0), DeliveryTiming::OnTime);
        assert_eq!(DeliveryTiming::from_elapsed(35.0), DeliveryTiming::SlightlyLate);
        assert_eq!(DeliveryTiming::from_elapsed(100.0), DeliveryTiming::Late);
        assert_eq!(DeliveryTiming::from_elapsed(200.0), DeliveryTiming::VeryLate);
    }

    #[test]
    fn test_early_delivery_rewards() {
        let mut courier = Courier::new(0, 0, DEFAULT_CAPACITY);
        courier.try_pickup(order("a", (0, 0), 1, 0, 100), 0.0).unwrap();

        let receipt = courier.try_deliver(10.0).unwrap();
        assert_eq!(receipt.timing, DeliveryTiming::Early);
        assert_eq!(receipt.payout, 100);
        assert_eq!(receipt.bonus, 0);
        assert_eq!(courier.earnings(), 100);
        assert_eq!(courier.reputation(), 75);
        assert_eq!(courier.inventory_len(), 0);
    }

    #[test]
    fn test_bonus_uses_pre_delivery_reputation() {
        // At 89, the +5 lifts reputation to 94 but the bonus keys off
        // the pre-delivery value, so no bonus on this delivery.
        let mut courier = Courier::new(0, 0, DEFAULT_CAPACITY);
        courier.reputation = 89;
        courier.try_pickup(order("a", (0, 0), 1, 0, 100), 0.0).unwrap();
        let receipt = courier.try_deliver(5.0).unwrap();
        assert_eq!(receipt.bonus, 0);
        assert_eq!(courier.earnings(), 100);
        assert_eq!(courier.reputation(), 94);

        // The next delivery starts at 94 and earns the 5%.
        courier.try_pickup(order("b", (0, 0), 1, 0, 100), 100.0).unwrap();
        let receipt = courier.try_deliver(105.0).unwrap();
        assert_eq!(receipt.bonus, 5);
        assert_eq!(courier.earnings(), 205);
    }

    #[test]
    fn test_late_delivery_penalties() {
        let mut courier = Courier::new(0, 0, DEFAULT_CAPACITY);
        courier.try_pickup(order("a", (0, 0), 1, 0, 100), 0.0).unwrap();
        let receipt = courier.try_deliver(60.0).unwrap();
        assert_eq!(receipt.timing, DeliveryTiming::Late);
        assert_eq!(courier.reputation(), 65);
        assert_eq!(courier.stats().late_deliveries, 1);
        // Earnings still paid in full.
        assert_eq!(courier.earnings(), 100);
    }

    #[test]
    fn test_priority_gates_delivery() {
        let mut courier = Courier::new(2, 2, DEFAULT_CAPACITY);
        // Standing on the low-priority dropoff while carrying a
        // higher-priority order elsewhere: delivery must fail.
        courier.try_pickup(order("low", (2, 2), 1, 0, 100), 0.0).unwrap();
        courier.try_pickup(order("high", (4, 4), 1, 2, 100), 0.0).unwrap();

        assert!(courier.try_deliver(5.0).is_none());
        assert_eq!(courier.inventory_len(), 2);

        // Deliver the high one first, then the low one unlocks.
        courier.x = 4;
        courier.y = 4;
        let receipt = courier.try_deliver(5.0).unwrap();
        assert_eq!(receipt.order.id, "high");

        courier.x = 2;
        courier.y = 2;
        let receipt = courier.try_deliver(6.0).unwrap();
        assert_eq!(receipt.order.id, "low");
    }

    #[test]
    fn test_delivery_removes_exactly_that_order() {
        let mut courier = Courier::new(1, 1, DEFAULT_CAPACITY);
        courier.try_pickup(order("a", (1, 1), 1, 1, 50), 0.0).unwrap();
        courier.try_pickup(order("b", (3, 3), 1, 1, 60), 0.0).unwrap();

        let receipt = courier.try_deliver(5.0).unwrap();
        assert_eq!(receipt.order.id, "a");
        let remaining: Vec<&str> = courier.inventory().map(|o| o.id.as_str()).collect();
        assert_eq!(remaining, vec!["b"]);
    }

    #[test]
    fn test_punctual_streak_grants_bonus_every_third() {
        let mut courier = Courier::new(0, 0, DEFAULT_CAPACITY);
        let mut now = 0.0;
        let mut bonuses = 0;
        for i in 0..6 {
            courier
                .try_pickup(order(&format!("o{i}"), (0, 0), 1, 0, 10), now)
                .unwrap();
            let receipt = courier.try_deliver(now + 5.0).unwrap();
            if receipt.streak_bonus {
                bonuses += 1;
            }
            now += 30.0;
        }
        assert_eq!(bonuses, 2);
    }

    #[test]
    fn test_late_delivery_resets_streak() {
        let mut courier = Courier::new(0, 0, DEFAULT_CAPACITY);
        courier.try_pickup(order("a", (0, 0), 1, 0, 10), 0.0).unwrap();
        courier.try_deliver(5.0).unwrap();
        courier.try_pickup(order("b", (0, 0), 1, 0, 10), 10.0).unwrap();
        courier.try_deliver(15.0).unwrap();

        // Late delivery wipes the streak of 2.
        courier.try_pickup(order("c", (0, 0), 1, 0, 10), 20.0).unwrap();
        courier.try_deliver(90.0).unwrap();

        // Three more punctual ones needed for the next bonus.
        let mut now = 100.0;
        let mut saw_bonus = vec![];
        for i in 0..3 {
            courier
                .try_pickup(order(&format!("d{i}"), (0, 0), 1, 0, 10), now)
                .unwrap();
            saw_bonus.push(courier.try_deliver(now + 5.0).unwrap().streak_bonus);
            now += 30.0;
        }
        assert_eq!(saw_bonus, vec![false, false, true]);
    }

    #[test]
    fn test_inventory_sort_views() {
        let mut courier = Courier::new(0, 0, DEFAULT_CAPACITY);
        courier.try_pickup(order("cheap", (1, 1), 1, 2, 50), 0.0).unwrap();
        courier.try_pickup(order("rich", (2, 2), 1, 0, 300), 0.0).unwrap();
        courier.try_pickup(order("mid", (3, 3), 1, 1, 120), 0.0).unwrap();

        let by_priority: Vec<&str> = courier
            .inventory_by_priority()
            .iter()
            .map(|o| o.id.as_str())
            .collect();
        assert_eq!(by_priority, vec!["cheap", "mid", "rich"]);

        let by_payout: Vec<&str> = courier
            .inventory_by_payout()
            .iter()
            .map(|o| o.id.as_str())
            .collect();
        assert_eq!(by_payout, vec!["rich", "mid", "cheap"]);
    }

    #[test]
    fn test_reputation_stays_in_bounds() {
        let mut courier = Courier::new(0, 0, DEFAULT_CAPACITY);
        courier.reputation = 99;
        courier.try_pickup(order("a", (0, 0), 1, 0, 100), 0.0).unwrap();
        courier.try_deliver(5.0).unwrap();
        assert_eq!(courier.reputation(), 100);

        courier.reputation = 3;
        courier.try_pickup(order("b", (0, 0), 1, 0, 100), 200.0).unwrap();
        courier.try_deliver(400.0).unwrap();
        assert_eq!(courier.reputation(), 0);
    }
}
