/// Single-step BFS pathfinding over the labyrinth's free tiles.
///
/// `next_step` answers one question: from `start`, which adjacent cell
/// is the first hop of a shortest path to `target`? The warden asks it
/// once per move; it never needs the whole path.
///
/// Neighbor order is right, down, left, up — this fixes the tie-break
/// between equally short paths.

use std::collections::VecDeque;

use super::grid::{Labyrinth, Pos};

const DIRS: [(i32, i32); 4] = [(1, 0), (0, 1), (-1, 0), (0, -1)];

/// First hop of a shortest path from `start` toward `target`.
///
/// Returns `start` unchanged when the two coincide or when no chain of
/// free tiles connects them. Always returns an in-bounds position.
/// Both arguments must be in bounds; `start` need not be free (the
/// hero may stand on a trigger tile the warden cannot enter).
pub fn next_step(laby: &Labyrinth, start: Pos, target: Pos) -> Pos {
    if start == target {
        return start;
    }

    let width = laby.width();
    let height = laby.height();
    let mut distance = vec![vec![u32::MAX; width]; height];
    let mut prev: Vec<Vec<Option<Pos>>> = vec![vec![None; width]; height];
    distance[start.1][start.0] = 0;

    let mut queue: VecDeque<Pos> = VecDeque::new();
    queue.push_back(start);

    while let Some((x, y)) = queue.pop_front() {
        for &(dx, dy) in &DIRS {
            let nx = x as i32 + dx;
            let ny = y as i32 + dy;
            if nx < 0 || ny < 0 || nx >= width as i32 || ny >= height as i32 {
                continue;
            }
            let next = (nx as usize, ny as usize);
            // Visited-once: the first assignment is the shortest
            // distance, later arrivals are never an improvement.
            if laby.is_free(next) && distance[next.1][next.0] == u32::MAX {
                distance[next.1][next.0] = distance[y][x] + 1;
                prev[next.1][next.0] = Some((x, y));
                queue.push_back(next);
            }
        }
    }

    if distance[target.1][target.0] == u32::MAX {
        return start;
    }

    // Walk the predecessor chain back until the cell adjacent to start.
    let (mut x, mut y) = target;
    while prev[y][x] != Some(start) {
        let (px, py) = prev[y][x].expect("predecessor chain broken");
        x = px;
        y = py;
    }
    (x, y)
}

/// Shortest-path distance in steps, or None if unreachable.
/// Same traversal as `next_step`; used by the warden to decide whether
/// a chase is worth starting.
pub fn distance_to(laby: &Labyrinth, start: Pos, target: Pos) -> Option<u32> {
    if start == target {
        return Some(0);
    }

    let width = laby.width();
    let height = laby.height();
    let mut distance = vec![vec![u32::MAX; width]; height];
    distance[start.1][start.0] = 0;

    let mut queue: VecDeque<Pos> = VecDeque::new();
    queue.push_back(start);

    while let Some((x, y)) = queue.pop_front() {
        for &(dx, dy) in &DIRS {
            let nx = x as i32 + dx;
            let ny = y as i32 + dy;
            if nx < 0 || ny < 0 || nx >= width as i32 || ny >= height as i32 {
                continue;
            }
            let next = (nx as usize, ny as usize);
            if laby.is_free(next) && distance[next.1][next.0] == u32::MAX {
                distance[next.1][next.0] = distance[y][x] + 1;
                if next == target {
                    return Some(distance[next.1][next.0]);
                }
                queue.push_back(next);
            }
        }
    }

    None
}
