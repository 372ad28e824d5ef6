//! Tile classification and the immutable city grid.
//!
//! The grid is fixed for the lifetime of a match. Each tile kind maps
//! to a surface weight used both by the movement-speed formula and as
//! the path-cost function for search; buildings weigh 0.0 and are
//! impassable.

use serde::{Deserialize, Serialize};

/// Kind of a city tile, decoded from single-character map codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tile {
    /// 'C' — street, full speed.
    Road,
    /// 'P' — park, slightly slower.
    Park,
    /// 'B' — building, impassable.
    Building,
}

impl Tile {
    /// Decode a map character. Returns `None` for unknown codes.
    pub fn from_code(code: char) -> Option<Self> {
        match code {
            'C' => Some(Self::Road),
            'P' => Some(Self::Park),
            'B' => Some(Self::Building),
            _ => None,
        }
    }

    /// The single-character map code for this tile.
    pub fn code(self) -> char {
        match self {
            Self::Road => 'C',
            Self::Park => 'P',
            Self::Building => 'B',
        }
    }

    /// Speed/cost multiplier for standing on or entering this tile.
    pub fn surface_weight(self) -> f64 {
        match self {
            Self::Road => 1.0,
            Self::Park => 0.95,
            Self::Building => 0.0,
        }
    }

    pub fn is_passable(self) -> bool {
        !matches!(self, Self::Building)
    }
}

/// Problems found while decoding a character map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MapParseError {
    /// No rows, or a zero-width first row.
    Empty,
    /// Row `row` has a different width than row 0.
    RaggedRow { row: usize },
    /// Unrecognized tile code at (col, row).
    UnknownTile { row: usize, col: usize, code: char },
}

impl std::fmt::Display for MapParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "map has no tiles"),
            Self::RaggedRow { row } => write!(f, "row {row} has inconsistent width"),
            Self::UnknownTile { row, col, code } => {
                write!(f, "unknown tile code {code:?} at ({col}, {row})")
            }
        }
    }
}

impl std::error::Error for MapParseError {}

/// Rectangular, immutable grid of tiles. Row-major storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CityGrid {
    width: i32,
    height: i32,
    tiles: Vec<Tile>,
}

impl CityGrid {
    /// Build a grid from rows of single-character tile codes.
    pub fn from_rows<S: AsRef<str>>(rows: &[S]) -> Result<Self, MapParseError> {
        let height = rows.len();
        let width = rows.first().map(|r| r.as_ref().chars().count()).unwrap_or(0);
        if height == 0 || width == 0 {
            return Err(MapParseError::Empty);
        }

        let mut tiles = Vec::with_capacity(width * height);
        for (y, row) in rows.iter().enumerate() {
            let mut count = 0;
            for (x, code) in row.as_ref().chars().enumerate() {
                let tile = Tile::from_code(code)
                    .ok_or(MapParseError::UnknownTile { row: y, col: x, code })?;
                tiles.push(tile);
                count += 1;
            }
            if count != width {
                return Err(MapParseError::RaggedRow { row: y });
            }
        }

        Ok(Self {
            width: width as i32,
            height: height as i32,
            tiles,
        })
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && x < self.width && y >= 0 && y < self.height
    }

    /// Tile at (x, y), or `None` when out of bounds.
    pub fn tile(&self, x: i32, y: i32) -> Option<Tile> {
        if self.in_bounds(x, y) {
            Some(self.tiles[(y * self.width + x) as usize])
        } else {
            None
        }
    }

    /// True iff (x, y) is a building or out of bounds.
    pub fn is_blocked(&self, x: i32, y: i32) -> bool {
        match self.tile(x, y) {
            Some(tile) => !tile.is_passable(),
            None => true,
        }
    }

    /// Surface weight at (x, y); 0.0 when blocked.
    pub fn surface_weight(&self, x: i32, y: i32) -> f64 {
        self.tile(x, y).map(Tile::surface_weight).unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_grid() -> CityGrid {
        CityGrid::from_rows(&["CCB", "CPC", "BCC"]).unwrap()
    }

    #[test]
    fn test_tile_codes_round_trip() {
        for tile in [Tile::Road, Tile::Park, Tile::Building] {
            assert_eq!(Tile::from_code(tile.code()), Some(tile));
        }
        assert_eq!(Tile::from_code('X'), None);
    }

    #[test]
    fn test_surface_weights() {
        assert_eq!(Tile::Road.surface_weight(), 1.0);
        assert_eq!(Tile::Park.surface_weight(), 0.95);
        assert_eq!(Tile::Building.surface_weight(), 0.0);
    }

    #[test]
    fn test_grid_lookup() {
        let grid = small_grid();
        assert_eq!(grid.width(), 3);
        assert_eq!(grid.height(), 3);
        assert_eq!(grid.tile(0, 0), Some(Tile::Road));
        assert_eq!(grid.tile(1, 1), Some(Tile::Park));
        assert_eq!(grid.tile(2, 0), Some(Tile::Building));
        assert_eq!(grid.tile(3, 0), None);
        assert_eq!(grid.tile(-1, 0), None);
    }

    #[test]
    fn test_blocked_for_buildings_and_out_of_bounds() {
        let grid = small_grid();
        assert!(!grid.is_blocked(0, 0));
        assert!(grid.is_blocked(2, 0));
        assert!(grid.is_blocked(0, 3));
        assert!(grid.is_blocked(-1, -1));
        assert_eq!(grid.surface_weight(2, 0), 0.0);
        assert_eq!(grid.surface_weight(5, 5), 0.0);
        assert_eq!(grid.surface_weight(1, 1), 0.95);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            CityGrid::from_rows::<&str>(&[]).unwrap_err(),
            MapParseError::Empty
        );
        assert_eq!(
            CityGrid::from_rows(&["CC", "C"]).unwrap_err(),
            MapParseError::RaggedRow { row: 1 }
        );
        assert_eq!(
            CityGrid::from_rows(&["CC", "CX"]).unwrap_err(),
            MapParseError::UnknownTile {
                row: 1,
                col: 1,
                code: 'X'
            }
        );
    }
}
