//! Content ingestion: map, order, and weather payloads.
//!
//! All three providers wrap their payload in `{"data": ...}`. Parsing
//! is tolerant where the match can sensibly continue: order
//! descriptors fill in defaults for missing fields and synthesize an
//! id from the endpoints, and a malformed weather payload falls back
//! to the built-in config. Only the map is load-bearing enough to
//! fail hard.

use std::collections::HashMap;

use serde::Deserialize;

use courier_logic::grid::{CityGrid, MapParseError};
use courier_logic::orders::Order;
use courier_logic::weather::{Condition, WeatherConfig};

/// Default order weight when the provider omits it.
const DEFAULT_ORDER_WEIGHT: u32 = 1;

/// Default order payout when the provider omits it.
const DEFAULT_ORDER_PAYOUT: f64 = 100.0;

/// Built-in demo city, for fully offline operation.
pub const DEFAULT_CITY_JSON: &str = include_str!("../../../data/city.json");

/// Built-in demo order feed.
pub const DEFAULT_ORDERS_JSON: &str = include_str!("../../../data/orders.json");

/// Built-in demo weather config.
pub const DEFAULT_WEATHER_JSON: &str = include_str!("../../../data/weather.json");

/// Errors from parsing provider payloads.
#[derive(Debug)]
pub enum ContentError {
    Io(std::io::Error),
    Json(serde_json::Error),
    Map(MapParseError),
}

impl From<std::io::Error> for ContentError {
    fn from(e: std::io::Error) -> Self {
        ContentError::Io(e)
    }
}

impl From<serde_json::Error> for ContentError {
    fn from(e: serde_json::Error) -> Self {
        ContentError::Json(e)
    }
}

impl From<MapParseError> for ContentError {
    fn from(e: MapParseError) -> Self {
        ContentError::Map(e)
    }
}

impl std::fmt::Display for ContentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContentError::Io(e) => write!(f, "IO error: {}", e),
            ContentError::Json(e) => write!(f, "JSON error: {}", e),
            ContentError::Map(e) => write!(f, "Map error: {}", e),
        }
    }
}

impl std::error::Error for ContentError {}

/// Provider envelope: every payload arrives as `{"data": ...}`.
#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
}

// ── Map ─────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct MapPayload {
    #[serde(default)]
    name: Option<String>,
    tiles: Vec<Vec<char>>,
    #[serde(default)]
    goal: Option<u64>,
    #[serde(default)]
    max_time: Option<f64>,
}

/// Parsed map payload: the grid plus the match parameters the map
/// provider may carry.
#[derive(Debug, Clone)]
pub struct MapContent {
    pub name: Option<String>,
    pub grid: CityGrid,
    pub goal: Option<u64>,
    pub max_time: Option<f64>,
}

/// Parse a map payload. Tile rows are lists of single-character
/// codes; unknown codes or ragged rows are hard errors.
pub fn parse_map(json: &str) -> Result<MapContent, ContentError> {
    let envelope: Envelope<MapPayload> = serde_json::from_str(json)?;
    let rows: Vec<String> = envelope
        .data
        .tiles
        .iter()
        .map(|row| row.iter().collect())
        .collect();
    let grid = CityGrid::from_rows(&rows)?;
    Ok(MapContent {
        name: envelope.data.name,
        grid,
        goal: envelope.data.goal,
        max_time: envelope.data.max_time,
    })
}

// ── Orders ──────────────────────────────────────────────────────────

fn default_weight() -> u32 {
    DEFAULT_ORDER_WEIGHT
}

fn default_payout() -> f64 {
    DEFAULT_ORDER_PAYOUT
}

/// One order as the feed describes it. Everything but the endpoints
/// is optional.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderDescriptor {
    #[serde(default)]
    pub id: Option<String>,
    pub pickup: (i32, i32),
    pub dropoff: (i32, i32),
    #[serde(default = "default_weight")]
    pub weight: u32,
    #[serde(default)]
    pub priority: u32,
    #[serde(default = "default_payout")]
    pub payout: f64,
}

impl OrderDescriptor {
    /// The feed id, or one synthesized from the endpoints when the
    /// feed omits it. Synthesized ids are stable, so re-polling the
    /// same descriptor dedupes correctly.
    pub fn order_id(&self) -> String {
        match &self.id {
            Some(id) => id.clone(),
            None => format!(
                "order-{}-{}-{}-{}",
                self.pickup.0, self.pickup.1, self.dropoff.0, self.dropoff.1
            ),
        }
    }

    /// Build the simulation order. Placement may have moved the
    /// endpoints, so they are passed in rather than taken from the
    /// descriptor.
    pub fn into_order(self, pickup: (i32, i32), dropoff: (i32, i32)) -> Order {
        let id = self.order_id();
        Order::new(
            id,
            pickup,
            dropoff,
            self.weight,
            self.priority,
            self.payout.max(0.0) as u64,
        )
    }
}

/// Parse an order-feed payload into descriptors.
pub fn parse_orders(json: &str) -> Result<Vec<OrderDescriptor>, ContentError> {
    let envelope: Envelope<Vec<OrderDescriptor>> = serde_json::from_str(json)?;
    Ok(envelope.data)
}

// ── Weather ─────────────────────────────────────────────────────────

fn default_intensity() -> f64 {
    0.5
}

#[derive(Deserialize)]
struct InitialWeather {
    condition: String,
    #[serde(default = "default_intensity")]
    intensity: f64,
}

#[derive(Deserialize)]
struct WeatherPayload {
    #[serde(default)]
    conditions: Vec<String>,
    #[serde(default)]
    initial: Option<InitialWeather>,
    #[serde(default)]
    transition: HashMap<String, HashMap<String, f64>>,
}

/// Parse a weather payload into a normalized config. Any failure —
/// bad JSON, missing envelope, no recognizable conditions — falls
/// back to [`WeatherConfig::default`]; weather is never fatal.
pub fn parse_weather(json: &str) -> WeatherConfig {
    match try_parse_weather(json) {
        Some(config) => config,
        None => WeatherConfig::default().normalized(),
    }
}

fn try_parse_weather(json: &str) -> Option<WeatherConfig> {
    let envelope: Envelope<WeatherPayload> = serde_json::from_str(json).ok()?;
    let payload = envelope.data;

    // Unknown condition names are dropped rather than erroring.
    let conditions: Vec<Condition> = payload
        .conditions
        .iter()
        .filter_map(|name| Condition::from_name(name))
        .collect();
    if conditions.is_empty() {
        return None;
    }

    let (initial_condition, initial_intensity) = match payload.initial {
        Some(initial) => (
            Condition::from_name(&initial.condition)?,
            initial.intensity.clamp(0.0, 1.0),
        ),
        None => (conditions[0], default_intensity()),
    };

    let mut transitions = HashMap::new();
    for (from_name, row) in payload.transition {
        let from = match Condition::from_name(&from_name) {
            Some(condition) => condition,
            None => continue,
        };
        let entries: Vec<(Condition, f64)> = row
            .iter()
            .filter_map(|(to_name, prob)| Condition::from_name(to_name).map(|to| (to, *prob)))
            .collect();
        transitions.insert(from, entries);
    }

    Some(
        WeatherConfig {
            conditions,
            initial_condition,
            initial_intensity,
            transitions,
        }
        .normalized(),
    )
}

// ── Offline loading ladder ──────────────────────────────────────────

/// Load a map from disk, falling back to the built-in city when the
/// file is missing or malformed. A parse failure of the built-in
/// payload itself still errors; the map is load-bearing.
pub fn load_map_or_default(path: &std::path::Path) -> Result<MapContent, ContentError> {
    if let Ok(text) = std::fs::read_to_string(path) {
        if let Ok(map) = parse_map(&text) {
            return Ok(map);
        }
    }
    parse_map(DEFAULT_CITY_JSON)
}

/// Load an order feed from disk, falling back to the built-in feed
/// and then to an empty feed. Never fails; a match with no orders is
/// still a match.
pub fn load_orders_or_default(path: &std::path::Path) -> Vec<OrderDescriptor> {
    if let Ok(text) = std::fs::read_to_string(path) {
        if let Ok(descriptors) = parse_orders(&text) {
            return descriptors;
        }
    }
    parse_orders(DEFAULT_ORDERS_JSON).unwrap_or_default()
}

/// Load a weather config from disk, falling back to the built-in
/// payload and then to the hardcoded table. Never fails.
pub fn load_weather_or_default(path: &std::path::Path) -> WeatherConfig {
    match std::fs::read_to_string(path) {
        Ok(text) => parse_weather(&text),
        Err(_) => parse_weather(DEFAULT_WEATHER_JSON),
    }
}
