/// Labyrinth model: an immutable grid of tile identifiers plus the
/// mutable set of identifiers that count as walkable.
/// Tile semantics are queried via methods, not stored as flags,
/// so the walkability rules are centralized here.

use std::collections::HashSet;

/// Integer tag identifying a tile's type/appearance in the map grid.
pub type TileId = u16;

/// Grid cell coordinate, (x, y) with (0, 0) at the top-left.
pub type Pos = (usize, usize);

/// Capability interface for tile-map assets.
///
/// The grid core consumes a map only through this trait: dimensions
/// plus a per-cell identifier lookup. Whatever parses the asset on
/// disk stays on the other side of this seam.
pub trait TileSource {
    fn width(&self) -> usize;
    fn height(&self) -> usize;
    fn tile_id_at(&self, x: usize, y: usize) -> TileId;
}

/// The labyrinth: tile grid, free-tile set, finish tile.
///
/// The grid never changes after load. The only runtime mutation is
/// `add_free_tile`, which grows the free set (collecting a key opens
/// the door by making the door's tile id walkable). The free set
/// never shrinks during a level; loading a level rebuilds everything.
pub struct Labyrinth {
    width: usize,
    height: usize,
    tiles: Vec<Vec<TileId>>,
    free_tiles: HashSet<TileId>,
    finish_tile: TileId,
}

impl Labyrinth {
    /// Build from a tile-map source plus the initial free set.
    pub fn new(
        source: &dyn TileSource,
        free_tiles: HashSet<TileId>,
        finish_tile: TileId,
    ) -> Self {
        let width = source.width();
        let height = source.height();
        let mut tiles = vec![vec![0; width]; height];
        for (y, row) in tiles.iter_mut().enumerate() {
            for (x, id) in row.iter_mut().enumerate() {
                *id = source.tile_id_at(x, y);
            }
        }
        Labyrinth { width, height, tiles, free_tiles, finish_tile }
    }

    /// Placeholder before the first level loads; nothing queries it.
    pub fn empty() -> Self {
        Labyrinth {
            width: 0,
            height: 0,
            tiles: vec![],
            free_tiles: HashSet::new(),
            finish_tile: 0,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn in_bounds(&self, (x, y): Pos) -> bool {
        x < self.width && y < self.height
    }

    /// Identifier at `pos`. Out of bounds is a caller bug, not a
    /// recoverable condition.
    pub fn tile_at(&self, (x, y): Pos) -> TileId {
        debug_assert!(x < self.width && y < self.height);
        self.tiles[y][x]
    }

    /// Is the tile at `pos` walkable? Callers bounds-check first.
    pub fn is_free(&self, pos: Pos) -> bool {
        self.free_tiles.contains(&self.tile_at(pos))
    }

    /// Make a tile id walkable from now on. Idempotent.
    pub fn add_free_tile(&mut self, id: TileId) {
        self.free_tiles.insert(id);
    }

    /// Does standing at `pos` satisfy the level goal?
    pub fn is_finish(&self, pos: Pos) -> bool {
        self.tile_at(pos) == self.finish_tile
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Fixture source: rows of single-digit tile ids.
    pub struct DigitMap(pub Vec<Vec<TileId>>);

    impl TileSource for DigitMap {
        fn width(&self) -> usize { self.0[0].len() }
        fn height(&self) -> usize { self.0.len() }
        fn tile_id_at(&self, x: usize, y: usize) -> TileId { self.0[y][x] }
    }

    /// Helper: build a labyrinth from a string diagram where each char
    /// is a decimal digit tile id. `free` lists the walkable ids.
    pub fn laby_from(rows: &[&str], free: &[TileId], finish: TileId) -> Labyrinth {
        let grid: Vec<Vec<TileId>> = rows
            .iter()
            .map(|r| r.chars().map(|c| c.to_digit(10).unwrap() as TileId).collect())
            .collect();
        Labyrinth::new(&DigitMap(grid), free.iter().copied().collect(), finish)
    }

    #[test]
    fn tile_at_reads_source() {
        let l = laby_from(&["012", "345"], &[0], 5);
        assert_eq!(l.width(), 3);
        assert_eq!(l.height(), 2);
        assert_eq!(l.tile_at((0, 0)), 0);
        assert_eq!(l.tile_at((2, 0)), 2);
        assert_eq!(l.tile_at((1, 1)), 4);
    }

    #[test]
    fn is_free_follows_the_set() {
        let l = laby_from(&["010", "111"], &[0], 9);
        assert!(l.is_free((0, 0)));
        assert!(!l.is_free((1, 0)));
        assert!(!l.is_free((0, 1)));
    }

    #[test]
    fn add_free_tile_is_monotonic_and_idempotent() {
        let mut l = laby_from(&["012"], &[0], 9);
        assert!(!l.is_free((1, 0)));
        l.add_free_tile(1);
        assert!(l.is_free((1, 0)));
        // Stays free on repeated queries and repeated inserts.
        l.add_free_tile(1);
        assert!(l.is_free((1, 0)));
        assert!(l.is_free((0, 0)));
    }

    #[test]
    fn finish_is_a_plain_grid_query() {
        let l = laby_from(&["019"], &[0, 1, 9], 9);
        assert!(!l.is_finish((0, 0)));
        assert!(l.is_finish((2, 0)));
    }

    #[test]
    fn in_bounds_edges() {
        let l = laby_from(&["00", "00", "00"], &[0], 9);
        assert!(l.in_bounds((1, 2)));
        assert!(!l.in_bounds((2, 2)));
        assert!(!l.in_bounds((1, 3)));
    }
}
