//! Pure simulation logic for Courier Quest.
//!
//! This crate contains all game logic that is independent of any I/O,
//! clock, or runtime. Functions take plain data (and an injected `Rng`
//! plus a `now` timestamp where needed) and return results, making
//! them unit-testable and deterministic.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`courier`] | Courier state machine: movement, stamina, inventory, reputation |
//! | [`grid`] | Tile classification and the immutable city grid |
//! | [`orders`] | Order records and the priority release queue |
//! | [`pathfinding`] | Bounded A* over the weighted tile grid |
//! | [`placement`] | Separation-respecting order point placement |
//! | [`scoring`] | End-of-match score breakdown |
//! | [`strategy`] | CPU decision policies (random, greedy, planner) |
//! | [`weather`] | Markov weather with smoothed transitions |

pub mod courier;
pub mod grid;
pub mod orders;
pub mod pathfinding;
pub mod placement;
pub mod scoring;
pub mod strategy;
pub mod weather;
