//! Bounded A* search over the weighted tile grid.
//!
//! Edge cost is the destination tile's surface cost divided by the
//! weather multiplier (floored at 0.1), so bad weather makes every
//! step pricier. The Manhattan heuristic stays admissible because the
//! cost per step is bounded below by the cheapest surface cost.
//! Expansion is capped so search latency stays bounded on large or
//! fully enclosed maps; exhaustion means "no route" and callers fall
//! back to random movement.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use crate::grid::CityGrid;

/// Default node-expansion budget.
pub const DEFAULT_MAX_EXPANSIONS: usize = 500;

const DIRECTIONS: [(i32, i32); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

/// Frontier entry ordered by lowest f-score first.
#[derive(Debug, Clone, Copy)]
struct FrontierNode {
    f: f64,
    pos: (i32, i32),
}

impl PartialEq for FrontierNode {
    fn eq(&self, other: &Self) -> bool {
        self.f == other.f && self.pos == other.pos
    }
}

impl Eq for FrontierNode {}

impl Ord for FrontierNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: BinaryHeap is a max-heap, we want cheapest first.
        other.f.total_cmp(&self.f)
    }
}

impl PartialOrd for FrontierNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn manhattan(a: (i32, i32), b: (i32, i32)) -> f64 {
    ((a.0 - b.0).abs() + (a.1 - b.1).abs()) as f64
}

fn step_cost(grid: &CityGrid, pos: (i32, i32), weather_mult: f64) -> f64 {
    grid.surface_weight(pos.0, pos.1) / weather_mult.max(0.1)
}

/// Find a cheapest path from `start` to `goal`, including both
/// endpoints. Returns `None` when no route exists or the expansion
/// budget runs out first.
pub fn astar(
    grid: &CityGrid,
    start: (i32, i32),
    goal: (i32, i32),
    weather_mult: f64,
    max_expansions: usize,
) -> Option<Vec<(i32, i32)>> {
    if grid.is_blocked(goal.0, goal.1) || grid.is_blocked(start.0, start.1) {
        return None;
    }

    let mut frontier = BinaryHeap::new();
    frontier.push(FrontierNode {
        f: manhattan(start, goal),
        pos: start,
    });
    let mut came_from: HashMap<(i32, i32), (i32, i32)> = HashMap::new();
    let mut cost_so_far: HashMap<(i32, i32), f64> = HashMap::new();
    cost_so_far.insert(start, 0.0);

    let mut expansions = 0;
    while let Some(FrontierNode { pos: current, .. }) = frontier.pop() {
        expansions += 1;
        if expansions > max_expansions {
            return None;
        }

        if current == goal {
            return Some(reconstruct(&came_from, start, goal));
        }

        for (dx, dy) in DIRECTIONS {
            let next = (current.0 + dx, current.1 + dy);
            if grid.is_blocked(next.0, next.1) {
                continue;
            }
            let new_cost = cost_so_far[&current] + step_cost(grid, next, weather_mult);
            let improves = cost_so_far
                .get(&next)
                .map(|&c| new_cost < c)
                .unwrap_or(true);
            if improves {
                cost_so_far.insert(next, new_cost);
                came_from.insert(next, current);
                frontier.push(FrontierNode {
                    f: new_cost + manhattan(next, goal),
                    pos: next,
                });
            }
        }
    }

    None
}

fn reconstruct(
    came_from: &HashMap<(i32, i32), (i32, i32)>,
    start: (i32, i32),
    goal: (i32, i32),
) -> Vec<(i32, i32)> {
    let mut path = vec![goal];
    let mut current = goal;
    while current != start {
        match came_from.get(&current) {
            Some(&prev) => {
                path.push(prev);
                current = prev;
            }
            // Unreachable when called on a completed search; bail
            // rather than loop.
            None => break,
        }
    }
    path.reverse();
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::CityGrid;

    fn grid(rows: &[&str]) -> CityGrid {
        CityGrid::from_rows(rows).unwrap()
    }

    #[test]
    fn test_straight_line() {
        let g = grid(&["CCCC"]);
        let path = astar(&g, (0, 0), (3, 0), 1.0, DEFAULT_MAX_EXPANSIONS).unwrap();
        assert_eq!(path, vec![(0, 0), (1, 0), (2, 0), (3, 0)]);
    }

    #[test]
    fn test_same_cell() {
        let g = grid(&["CC"]);
        let path = astar(&g, (0, 0), (0, 0), 1.0, DEFAULT_MAX_EXPANSIONS).unwrap();
        assert_eq!(path, vec![(0, 0)]);
    }

    #[test]
    fn test_routes_around_wall() {
        let g = grid(&[
            "CCC", //
            "BBC", //
            "CCC",
        ]);
        let path = astar(&g, (0, 0), (0, 2), 1.0, DEFAULT_MAX_EXPANSIONS).unwrap();
        assert_eq!(path.first(), Some(&(0, 0)));
        assert_eq!(path.last(), Some(&(0, 2)));
        // Must detour through the right column.
        assert!(path.contains(&(2, 1)));
        for &(x, y) in &path {
            assert!(!g.is_blocked(x, y));
        }
    }

    #[test]
    fn test_prefers_road_over_park() {
        // Two equal-length routes; the park row costs 0.95 per step so
        // the search may take either, but total cost must reflect the
        // cheaper one it picks. Simply assert a valid shortest path.
        let g = grid(&[
            "CCC", //
            "CPC",
        ]);
        let path = astar(&g, (0, 0), (2, 0), 1.0, DEFAULT_MAX_EXPANSIONS).unwrap();
        assert_eq!(path.len(), 3);
    }

    #[test]
    fn test_enclosed_goal_is_no_route() {
        let g = grid(&[
            "CCCCC", //
            "CBBBC", //
            "CBCBC", //
            "CBBBC", //
            "CCCCC",
        ]);
        assert_eq!(astar(&g, (0, 0), (2, 2), 1.0, DEFAULT_MAX_EXPANSIONS), None);
    }

    #[test]
    fn test_goal_on_building_is_no_route() {
        let g = grid(&["CB"]);
        assert_eq!(astar(&g, (0, 0), (1, 0), 1.0, DEFAULT_MAX_EXPANSIONS), None);
    }

    #[test]
    fn test_expansion_cap_exhaustion() {
        let row = "C".repeat(60);
        let rows: Vec<String> = (0..60).map(|_| row.clone()).collect();
        let g = CityGrid::from_rows(&rows).unwrap();
        // A 59+59 step path needs far more than 10 expansions.
        assert_eq!(astar(&g, (0, 0), (59, 59), 1.0, 10), None);
        assert!(astar(&g, (0, 0), (59, 59), 1.0, 100_000).is_some());
    }

    #[test]
    fn test_weather_scales_cost_not_route() {
        let g = grid(&["CCCC"]);
        let slow = astar(&g, (0, 0), (3, 0), 0.5, DEFAULT_MAX_EXPANSIONS).unwrap();
        let clear = astar(&g, (0, 0), (3, 0), 1.0, DEFAULT_MAX_EXPANSIONS).unwrap();
        assert_eq!(slow, clear);
    }
}
