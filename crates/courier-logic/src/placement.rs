//! Separation-respecting placement of order pickup/dropoff points.
//!
//! Callers maintain the occupancy set (active order points, carried
//! order points, agent positions). Placement keeps order-relevant
//! points off buildings and at least `separation` cells apart, and is
//! bounded: BFS stops after a visited-cell budget and falls back to a
//! best-effort scan so a nearly-full map can never loop forever.

use std::collections::{HashSet, VecDeque};

use crate::grid::CityGrid;

/// Default minimum spacing between order-relevant points.
pub const DEFAULT_SEPARATION: i32 = 4;

/// Default BFS visited-cell budget.
pub const DEFAULT_MAX_VISITED: usize = 2000;

const DIRECTIONS: [(i32, i32); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

/// True iff no occupied cell lies within the square window of radius
/// `separation` around (x, y).
fn is_separated(occupied: &HashSet<(i32, i32)>, x: i32, y: i32, separation: i32) -> bool {
    for sx in -separation..=separation {
        for sy in -separation..=separation {
            if occupied.contains(&(x + sx, y + sy)) {
                return false;
            }
        }
    }
    true
}

/// Place a point at or near `desired`, avoiding buildings and keeping
/// minimum separation from occupied cells.
///
/// The accepted point is inserted into `occupied`. If even the
/// fallback scan finds nothing the original point is returned
/// unmoved (callers tolerate potential overlap, per the degraded
/// path), and still registered as occupied.
pub fn place_point(
    grid: &CityGrid,
    desired: (i32, i32),
    occupied: &mut HashSet<(i32, i32)>,
    separation: i32,
    max_visited: usize,
) -> (i32, i32) {
    let (x0, y0) = desired;

    // Fast path: the desired cell itself is fine.
    if !grid.is_blocked(x0, y0) && !occupied.contains(&desired) {
        occupied.insert(desired);
        return desired;
    }

    // BFS outward, bounded by the visit budget. The frontier walks
    // through building cells (a point walled in by buildings still
    // needs to escape); only passable cells can be accepted.
    let mut visited: HashSet<(i32, i32)> = HashSet::new();
    let mut queue: VecDeque<(i32, i32)> = VecDeque::new();
    visited.insert(desired);
    queue.push_back(desired);

    while let Some((x, y)) = queue.pop_front() {
        if visited.len() > max_visited {
            break;
        }
        for (dx, dy) in DIRECTIONS {
            let (nx, ny) = (x + dx, y + dy);
            if !grid.in_bounds(nx, ny) || !visited.insert((nx, ny)) {
                continue;
            }
            if !grid.is_blocked(nx, ny)
                && !occupied.contains(&(nx, ny))
                && is_separated(occupied, nx, ny, separation)
            {
                occupied.insert((nx, ny));
                return (nx, ny);
            }
            queue.push_back((nx, ny));
        }
    }

    // Fallback: best-effort scan of a small window around the origin.
    // Spacing is no longer guaranteed here.
    for sy in -separation..=separation {
        for sx in -separation..=separation {
            let (nx, ny) = (x0 + sx, y0 + sy);
            if !grid.is_blocked(nx, ny) && !occupied.contains(&(nx, ny)) {
                occupied.insert((nx, ny));
                return (nx, ny);
            }
        }
    }

    // Nothing free anywhere nearby; leave the point unmoved.
    occupied.insert(desired);
    desired
}

/// Convenience wrapper with the default separation and budget.
pub fn place_point_default(
    grid: &CityGrid,
    desired: (i32, i32),
    occupied: &mut HashSet<(i32, i32)>,
) -> (i32, i32) {
    place_point(grid, desired, occupied, DEFAULT_SEPARATION, DEFAULT_MAX_VISITED)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::CityGrid;

    fn open_grid(side: usize) -> CityGrid {
        let row = "C".repeat(side);
        let rows: Vec<String> = (0..side).map(|_| row.clone()).collect();
        CityGrid::from_rows(&rows).unwrap()
    }

    #[test]
    fn test_free_point_stays_put() {
        let grid = open_grid(10);
        let mut occupied = HashSet::new();
        let placed = place_point_default(&grid, (3, 3), &mut occupied);
        assert_eq!(placed, (3, 3));
        assert!(occupied.contains(&(3, 3)));
    }

    #[test]
    fn test_blocked_point_relocates_to_passable_cell() {
        let grid = CityGrid::from_rows(&["BBB", "BBC", "CCC"]).unwrap();
        let mut occupied = HashSet::new();
        let placed = place_point(&grid, (0, 0), &mut occupied, 0, 100);
        assert!(!grid.is_blocked(placed.0, placed.1));
    }

    #[test]
    fn test_occupied_point_respects_separation() {
        let grid = open_grid(30);
        let mut occupied: HashSet<(i32, i32)> = HashSet::new();
        occupied.insert((15, 15));

        let placed = place_point(&grid, (15, 15), &mut occupied, 4, DEFAULT_MAX_VISITED);
        assert_ne!(placed, (15, 15));
        let dist = (placed.0 - 15).abs().max((placed.1 - 15).abs());
        assert!(dist > 4, "placed {placed:?} inside the separation window");
    }

    #[test]
    fn test_exhausted_budget_falls_back_to_nearby_cell() {
        // Everything within reach is occupied, so separation can never
        // be satisfied; the fallback must still yield a passable cell.
        let grid = open_grid(8);
        let mut occupied: HashSet<(i32, i32)> = HashSet::new();
        for x in 0..8 {
            for y in 0..8 {
                occupied.insert((x, y));
            }
        }

        let placed = place_point(&grid, (4, 4), &mut occupied, 4, 50);
        assert!(!grid.is_blocked(placed.0, placed.1));
    }

    #[test]
    fn test_full_building_map_returns_origin() {
        let grid = CityGrid::from_rows(&["BBB", "BBB", "BBB"]).unwrap();
        let mut occupied = HashSet::new();
        let placed = place_point(&grid, (1, 1), &mut occupied, 4, 100);
        assert_eq!(placed, (1, 1));
    }
}
