// Copyright 2025 the Mapstory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use kurbo::Rect;

use crate::{Tile, TileGrid, TileIndex, TilePyramid, TileSource};

/// The set of tiles needed to draw one view, at one zoom level.
///
/// Cells are addressed by `(x, y)` relative to the cover, with `x` counted
/// from the west edge and `y` from the south edge, regardless of the
/// pyramid's row origin. Every cell starts absent; [`TileCover::fill`]
/// populates them.
#[derive(Clone, Debug)]
pub struct TileCover<'p> {
    pyramid: &'p TilePyramid,
    grid: TileGrid,
    x0: u32,
    y0: u32,
    width: u32,
    height: u32,
    tiles: Vec<Option<Tile>>,
}

/// One cell of a [`TileCover`], as yielded by [`TileCover::cells`].
#[derive(Copy, Clone, Debug)]
pub struct CoverCell<'c> {
    /// Column within the cover, from the west edge.
    pub x: u32,
    /// Row within the cover, from the south edge.
    pub y: u32,
    /// The tile's index in the source.
    pub index: TileIndex,
    /// World bounds of the tile.
    pub bounds: Rect,
    /// The fetched tile, if any.
    pub tile: Option<&'c Tile>,
}

impl<'p> TileCover<'p> {
    pub(crate) fn new(
        pyramid: &'p TilePyramid,
        grid: TileGrid,
        x0: u32,
        x1: u32,
        y0: u32,
        y1: u32,
    ) -> Self {
        let width = x1 - x0 + 1;
        let height = y1 - y0 + 1;
        let cells = width as usize * height as usize;
        Self {
            pyramid,
            grid,
            x0,
            y0,
            width,
            height,
            tiles: vec![None; cells],
        }
    }

    /// The pyramid this cover was computed from.
    #[must_use]
    pub fn pyramid(&self) -> &'p TilePyramid {
        self.pyramid
    }

    /// The selected zoom level.
    #[must_use]
    pub fn grid(&self) -> &TileGrid {
        &self.grid
    }

    /// Number of columns.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Number of rows.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    fn slot(&self, x: u32, y: u32) -> Option<usize> {
        (x < self.width && y < self.height).then(|| x as usize * self.height as usize + y as usize)
    }

    /// Source index of cell `(x, y)`.
    #[must_use]
    pub fn index(&self, x: u32, y: u32) -> TileIndex {
        let row = self.pyramid.flip_row(&self.grid, self.y0 + y);
        TileIndex::new(self.grid.z(), self.x0 + x, row)
    }

    /// World bounds of cell `(x, y)`.
    #[must_use]
    pub fn bounds_of(&self, x: u32, y: u32) -> Rect {
        self.pyramid
            .cell_bounds(&self.grid, self.x0 + x, self.y0 + y)
    }

    /// World bounds of the whole cover.
    #[must_use]
    pub fn world_bounds(&self) -> Rect {
        self.bounds_of(0, 0)
            .union(self.bounds_of(self.width - 1, self.height - 1))
    }

    /// The tile in cell `(x, y)`, if it was fetched.
    #[must_use]
    pub fn tile(&self, x: u32, y: u32) -> Option<&Tile> {
        self.slot(x, y).and_then(|i| self.tiles[i].as_ref())
    }

    /// Number of cells holding a tile.
    #[must_use]
    pub fn present(&self) -> usize {
        self.tiles.iter().filter(|t| t.is_some()).count()
    }

    /// Fetches every cell from `source`.
    ///
    /// A failed or missing fetch leaves its cell absent and does not stop the
    /// other cells from filling. Returns the number of cells now holding a
    /// tile.
    pub fn fill(&mut self, source: &dyn TileSource) -> usize {
        for x in 0..self.width {
            for y in 0..self.height {
                let index = self.index(x, y);
                let fetched = match source.fetch(index) {
                    Ok(Some(tile)) => Some(tile),
                    Ok(None) => {
                        log::trace!("{}: no tile at {index}", source.name());
                        None
                    }
                    Err(err) => {
                        log::warn!("{}: failed to fetch tile {index}: {err}", source.name());
                        None
                    }
                };
                if let Some(i) = self.slot(x, y) {
                    self.tiles[i] = fetched;
                }
            }
        }
        self.present()
    }

    /// All cells, column by column from the west, each column from the south.
    pub fn cells(&self) -> impl Iterator<Item = CoverCell<'_>> + '_ {
        (0..self.width).flat_map(move |x| {
            (0..self.height).map(move |y| CoverCell {
                x,
                y,
                index: self.index(x, y),
                bounds: self.bounds_of(x, y),
                tile: self.tile(x, y),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use kurbo::Rect;

    use crate::{Tile, TileError, TileIndex, TileLevel, TileOrigin, TilePyramid, TileSource};

    struct Checkerboard {
        requests: RefCell<Vec<TileIndex>>,
    }

    impl TileSource for Checkerboard {
        fn name(&self) -> &str {
            "checkerboard"
        }

        fn declared_bounds(&self) -> Rect {
            Rect::new(0.0, 0.0, 4.0, 4.0)
        }

        fn zoom_levels(&self) -> Vec<TileLevel> {
            vec![TileLevel::quadtree(1)]
        }

        fn tile_size(&self) -> (u32, u32) {
            (2, 2)
        }

        fn fetch(&self, index: TileIndex) -> Result<Option<Tile>, TileError> {
            self.requests.borrow_mut().push(index);
            match (index.x, index.y) {
                (1, 1) => Ok(None),
                (0, 1) => Err(TileError::Fetch {
                    index,
                    message: "corrupt row".into(),
                }),
                _ => Ok(Some(Tile::rgba8(index, 2, 2, vec![255; 16]))),
            }
        }
    }

    #[test]
    fn fill_tolerates_missing_and_failing_tiles() {
        let _ = env_logger::builder().is_test(true).try_init();
        let source = Checkerboard {
            requests: RefCell::new(Vec::new()),
        };
        let pyramid = TilePyramid::from_source(&source).unwrap();
        let mut cover = pyramid.cover(Rect::new(0.0, 0.0, 4.0, 4.0), 4, 4).unwrap();
        assert_eq!((cover.width(), cover.height()), (2, 2));

        assert_eq!(cover.fill(&source), 2);
        assert_eq!(source.requests.borrow().len(), 4);
        assert!(cover.tile(0, 0).is_some());
        assert!(cover.tile(0, 1).is_none());
        assert!(cover.tile(1, 0).is_some());
        assert!(cover.tile(1, 1).is_none());
        assert!(cover.tile(5, 5).is_none());
    }

    #[test]
    fn cells_walk_columns_then_rows_from_the_south() {
        let pyramid = TilePyramid::new(
            Rect::new(0.0, 0.0, 4.0, 4.0),
            2,
            2,
            TileOrigin::TopLeft,
            [TileLevel::quadtree(1)],
        )
        .unwrap();
        let cover = pyramid.cover(Rect::new(0.0, 0.0, 4.0, 4.0), 4, 4).unwrap();
        let order: Vec<(u32, u32, TileIndex)> =
            cover.cells().map(|c| (c.x, c.y, c.index)).collect();
        assert_eq!(
            order,
            [
                (0, 0, TileIndex::new(1, 0, 1)),
                (0, 1, TileIndex::new(1, 0, 0)),
                (1, 0, TileIndex::new(1, 1, 1)),
                (1, 1, TileIndex::new(1, 1, 0)),
            ]
        );
        let first = cover.cells().next().unwrap();
        assert_eq!(first.bounds, Rect::new(0.0, 0.0, 2.0, 2.0));
        assert_eq!(cover.world_bounds(), Rect::new(0.0, 0.0, 4.0, 4.0));
    }
}
