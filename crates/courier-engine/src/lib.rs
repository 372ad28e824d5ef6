//! Courier Quest Engine - Delivery Match Controller
//!
//! Runs a complete delivery match headless: content ingestion from
//! the provider JSON payloads, the tick loop (weather, couriers,
//! order feed), and persistence (saves, undo, score board). All
//! simulation rules live in `courier-logic`; this crate wires them
//! together and owns the mutable match state.
//!
//! # Example
//!
//! ```rust,no_run
//! use courier_engine::content::{parse_map, DEFAULT_CITY_JSON};
//! use courier_engine::engine::{MatchConfig, MatchEngine, PlayerCommand};
//! use courier_logic::weather::WeatherConfig;
//!
//! let map = parse_map(DEFAULT_CITY_JSON).unwrap();
//! let mut engine = MatchEngine::new(map.grid, WeatherConfig::default(), MatchConfig::default(), None);
//!
//! // Run the match at 60 FPS
//! while engine.outcome().is_none() {
//!     engine.apply(PlayerCommand::Move(1, 0));
//!     engine.update(1.0 / 60.0);
//! }
//! ```

pub mod content;
pub mod engine;
pub mod persistence;

/// Commonly used types for convenient importing
pub mod prelude {
    pub use crate::content::{parse_map, parse_orders, parse_weather, OrderDescriptor};
    pub use crate::engine::{
        AgentId, MatchConfig, MatchEngine, MatchOutcome, OrderSource, PlayerCommand,
        StaticOrderSource,
    };
    pub use crate::persistence::{load_match, save_match, ScoreBoard, UndoHistory};
}
