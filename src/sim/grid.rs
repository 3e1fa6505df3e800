//! Grid geometry for the arena
//!
//! Cells are integer `(x, y)` coordinates: `x` is the column, `y` the row of
//! the layout text. A cell maps to the world position of its centre; the map is
//! centred on the world origin.

use glam::{IVec2, Vec2};
use serde::{Deserialize, Serialize};

/// The four sweep directions of a blast, in processing order
pub const CARDINALS: [IVec2; 4] = [IVec2::X, IVec2::NEG_X, IVec2::Y, IVec2::NEG_Y];

/// Static content of a layout cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Tile {
    #[default]
    Empty,
    /// Indestructible obstacle
    Wall,
    /// Destructible obstacle
    Crate,
}

impl Tile {
    /// Whether an obstacle occupies the tile
    pub fn is_solid(self) -> bool {
        matches!(self, Tile::Wall | Tile::Crate)
    }
}

/// Cell <-> world mapping
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    pub tile_size: f32,
    pub width: i32,
    pub height: i32,
    /// World position of the outer corner of cell (0, 0)
    pub origin: Vec2,
}

impl Grid {
    /// Grid of `width` x `height` cells centred on the world origin
    pub fn new(tile_size: f32, width: i32, height: i32) -> Self {
        let origin = -Vec2::new(width as f32, height as f32) * tile_size * 0.5;
        Self {
            tile_size,
            width,
            height,
            origin,
        }
    }

    #[inline]
    pub fn in_bounds(&self, cell: IVec2) -> bool {
        cell.x >= 0 && cell.y >= 0 && cell.x < self.width && cell.y < self.height
    }

    /// World position of a cell's centre
    #[inline]
    pub fn cell_to_world(&self, cell: IVec2) -> Vec2 {
        self.origin + (cell.as_vec2() + Vec2::splat(0.5)) * self.tile_size
    }

    /// Cell containing a world position (may be out of bounds)
    #[inline]
    pub fn world_to_cell(&self, pos: Vec2) -> IVec2 {
        ((pos - self.origin) / self.tile_size).floor().as_ivec2()
    }

    /// Snap a world position to the centre of its cell
    #[inline]
    pub fn snap(&self, pos: Vec2) -> Vec2 {
        self.cell_to_world(self.world_to_cell(pos))
    }

    /// Half extents of the whole map in world units
    pub fn half_extents(&self) -> Vec2 {
        Vec2::new(self.width as f32, self.height as f32) * self.tile_size * 0.5
    }

    /// Whether a world position lies inside the map
    pub fn contains(&self, pos: Vec2) -> bool {
        self.in_bounds(self.world_to_cell(pos))
    }
}

/// Parsed arena layout
#[derive(Debug, Clone, PartialEq)]
pub struct LevelLayout {
    pub width: i32,
    pub height: i32,
    tiles: Vec<Tile>,
    pub player_start: IVec2,
}

impl LevelLayout {
    /// Parse layout rows, collecting every problem found
    pub fn parse(rows: &[String]) -> Result<Self, Vec<String>> {
        let mut problems = Vec::new();
        let height = rows.len();
        let width = rows.first().map(|r| r.chars().count()).unwrap_or(0);
        if height == 0 || width == 0 {
            return Err(vec!["arena.layout must not be empty".to_string()]);
        }

        let mut tiles = Vec::with_capacity(width * height);
        let mut starts = Vec::new();
        for (y, row) in rows.iter().enumerate() {
            if row.chars().count() != width {
                problems.push(format!(
                    "arena.layout row {y} has {} columns, expected {width}",
                    row.chars().count()
                ));
                continue;
            }
            for (x, glyph) in row.chars().enumerate() {
                let tile = match glyph {
                    '#' => Tile::Wall,
                    '+' => Tile::Crate,
                    '.' | ' ' => Tile::Empty,
                    'P' => {
                        starts.push(IVec2::new(x as i32, y as i32));
                        Tile::Empty
                    }
                    other => {
                        problems.push(format!("arena.layout has unknown glyph {other:?} at ({x}, {y})"));
                        Tile::Empty
                    }
                };
                tiles.push(tile);
            }
        }

        if starts.len() != 1 {
            problems.push(format!(
                "arena.layout needs exactly one player start 'P' (found {})",
                starts.len()
            ));
        }

        if !problems.is_empty() {
            return Err(problems);
        }

        Ok(Self {
            width: width as i32,
            height: height as i32,
            tiles,
            player_start: starts[0],
        })
    }

    #[inline]
    pub fn in_bounds(&self, cell: IVec2) -> bool {
        cell.x >= 0 && cell.y >= 0 && cell.x < self.width && cell.y < self.height
    }

    /// Tile at a cell (out-of-bounds reads as a wall)
    pub fn tile(&self, cell: IVec2) -> Tile {
        if !self.in_bounds(cell) {
            return Tile::Wall;
        }
        self.tiles[(cell.y * self.width + cell.x) as usize]
    }

    /// All non-empty tiles in row-major order
    pub fn obstacles(&self) -> impl Iterator<Item = (IVec2, Tile)> + '_ {
        self.tiles.iter().enumerate().filter_map(|(i, tile)| {
            if tile.is_solid() {
                let i = i as i32;
                Some((IVec2::new(i % self.width, i / self.width), *tile))
            } else {
                None
            }
        })
    }

    /// Empty cells in row-major order
    pub fn empty_cells(&self) -> impl Iterator<Item = IVec2> + '_ {
        self.tiles.iter().enumerate().filter_map(|(i, tile)| {
            let i = i as i32;
            (!tile.is_solid()).then(|| IVec2::new(i % self.width, i / self.width))
        })
    }

    pub fn grid(&self, tile_size: f32) -> Grid {
        Grid::new(tile_size, self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn rows(lines: &[&str]) -> Vec<String> {
        lines.iter().map(|l| l.to_string()).collect()
    }

    #[test]
    fn test_cell_centres() {
        let grid = Grid::new(32.0, 4, 2);
        assert_eq!(grid.origin, Vec2::new(-64.0, -32.0));
        assert_eq!(grid.cell_to_world(IVec2::new(0, 0)), Vec2::new(-48.0, -16.0));
        assert_eq!(grid.cell_to_world(IVec2::new(3, 1)), Vec2::new(48.0, 16.0));
        assert_eq!(grid.world_to_cell(Vec2::new(-63.0, -31.0)), IVec2::new(0, 0));
        assert_eq!(grid.world_to_cell(Vec2::new(-65.0, 0.0)), IVec2::new(-1, 1));
        assert!(!grid.contains(Vec2::new(-65.0, 0.0)));
    }

    #[test]
    fn test_parse_layout() {
        let level = LevelLayout::parse(&rows(&["#####", "#P+.#", "#####"])).unwrap();
        assert_eq!((level.width, level.height), (5, 3));
        assert_eq!(level.player_start, IVec2::new(1, 1));
        assert_eq!(level.tile(IVec2::new(2, 1)), Tile::Crate);
        assert_eq!(level.tile(IVec2::new(3, 1)), Tile::Empty);
        assert_eq!(level.tile(IVec2::new(9, 9)), Tile::Wall);
        assert_eq!(level.obstacles().count(), 13);
        assert_eq!(level.empty_cells().count(), 2);
    }

    #[test]
    fn test_parse_reports_all_problems() {
        let problems = LevelLayout::parse(&rows(&["####", "#x?#", "#.."])).unwrap_err();
        // ragged row, two unknown glyphs, no player start
        assert_eq!(problems.len(), 4, "{problems:?}");
    }

    proptest! {
        #[test]
        fn prop_cell_world_roundtrip(
            tile in 1.0f32..64.0,
            w in 1i32..40,
            h in 1i32..40,
            x in 0i32..40,
            y in 0i32..40,
        ) {
            let grid = Grid::new(tile, w, h);
            let cell = IVec2::new(x % w, y % h);
            let pos = grid.cell_to_world(cell);
            prop_assert_eq!(grid.world_to_cell(pos), cell);
            prop_assert_eq!(grid.snap(pos), pos);
        }
    }
}
