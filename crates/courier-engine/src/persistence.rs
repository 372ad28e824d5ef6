//! Save/load, undo history, and the score board.
//!
//! Match snapshots are bincode with a version check up front; the
//! score board is human-readable JSON. A failed save or load never
//! mutates engine state — snapshots are taken and applied whole.

use std::collections::{HashSet, VecDeque};
use std::io::{Read, Write};

use serde::{Deserialize, Serialize};

use courier_logic::courier::Courier;
use courier_logic::grid::CityGrid;
use courier_logic::orders::{Order, ReleaseQueue};
use courier_logic::strategy::CpuController;
use courier_logic::weather::WeatherSystem;

use crate::engine::{MatchConfig, MatchEngine, MatchOutcome, OrderSource};

/// Save format version (increment when the format changes).
pub const SAVE_VERSION: u32 = 1;

/// How many snapshots the undo history keeps.
pub const UNDO_CAPACITY: usize = 50;

/// How many entries the score board keeps.
pub const SCORE_BOARD_CAPACITY: usize = 10;

/// Serializable snapshot of a whole match.
#[derive(Clone, Serialize, Deserialize)]
pub struct SaveData {
    pub version: u32,
    pub elapsed: f64,
    pub config: MatchConfig,
    pub grid: CityGrid,
    pub weather: WeatherSystem,
    pub player: Courier,
    pub cpu: Option<(Courier, CpuController)>,
    pub active: Vec<Order>,
    pub queue: ReleaseQueue,
    pub seen: HashSet<String>,
    pub last_release: f64,
    pub last_poll: f64,
    pub last_seen_cleanup: f64,
    pub outcome: Option<MatchOutcome>,
}

/// Errors that can occur during save/load.
#[derive(Debug)]
pub enum SaveError {
    Io(std::io::Error),
    Bincode(Box<bincode::ErrorKind>),
    VersionMismatch { expected: u32, found: u32 },
}

impl From<std::io::Error> for SaveError {
    fn from(e: std::io::Error) -> Self {
        SaveError::Io(e)
    }
}

impl From<Box<bincode::ErrorKind>> for SaveError {
    fn from(e: Box<bincode::ErrorKind>) -> Self {
        SaveError::Bincode(e)
    }
}

impl std::fmt::Display for SaveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SaveError::Io(e) => write!(f, "IO error: {}", e),
            SaveError::Bincode(e) => write!(f, "Serialization error: {}", e),
            SaveError::VersionMismatch { expected, found } => {
                write!(
                    f,
                    "Save version mismatch: expected {}, found {}",
                    expected, found
                )
            }
        }
    }
}

impl std::error::Error for SaveError {}

/// Save a match to a writer.
pub fn save_match<W: Write>(writer: W, engine: &MatchEngine) -> Result<(), SaveError> {
    bincode::serialize_into(writer, &engine.snapshot())?;
    Ok(())
}

/// Load a match from a reader, attaching a fresh order source.
pub fn load_match<R: Read>(
    reader: R,
    source: Option<Box<dyn OrderSource>>,
) -> Result<MatchEngine, SaveError> {
    let data: SaveData = bincode::deserialize_from(reader)?;
    if data.version != SAVE_VERSION {
        return Err(SaveError::VersionMismatch {
            expected: SAVE_VERSION,
            found: data.version,
        });
    }
    Ok(MatchEngine::from_snapshot(data, source))
}

/// Bounded ring of in-memory snapshots for step-back undo.
///
/// By convention the newest entry is the *current* state, so undoing
/// drops it and restores the one before. With fewer than two entries
/// there is nothing to go back to.
#[derive(Default)]
pub struct UndoHistory {
    snapshots: VecDeque<SaveData>,
}

impl UndoHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Record the current state. The oldest snapshot falls off once
    /// the ring is full.
    pub fn push(&mut self, snapshot: SaveData) {
        if self.snapshots.len() == UNDO_CAPACITY {
            self.snapshots.pop_front();
        }
        self.snapshots.push_back(snapshot);
    }

    /// Step back one state: drop the newest snapshot and return a
    /// copy of the one now on top.
    pub fn undo(&mut self) -> Option<SaveData> {
        if self.snapshots.len() < 2 {
            return None;
        }
        self.snapshots.pop_back();
        self.snapshots.back().cloned()
    }
}

/// One finished match on the score board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub name: String,
    pub score: u64,
    /// Match time at which the score was recorded, in sim seconds.
    pub elapsed: f64,
}

/// Persistent top-10, stored as JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBoard {
    pub entries: Vec<ScoreEntry>,
}

impl ScoreBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry, keeping the board sorted descending and
    /// truncated to capacity. Returns true if the entry made the cut.
    pub fn record(&mut self, entry: ScoreEntry) -> bool {
        self.entries.push(entry.clone());
        self.entries.sort_by(|a, b| b.score.cmp(&a.score));
        self.entries.truncate(SCORE_BOARD_CAPACITY);
        self.entries.contains(&entry)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
