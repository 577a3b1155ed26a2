// Copyright 2025 the Mapstory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use kurbo::Rect;

use crate::{TileCover, TileError, TileIndex, TileSource};

/// Which edge tile rows are counted from.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum TileOrigin {
    /// Row 0 is the southernmost row (TMS, MBTiles).
    #[default]
    BottomLeft,
    /// Row 0 is the northernmost row (XYZ, "slippy map" tiles).
    TopLeft,
}

/// Shape of one zoom level: how many tiles across and down.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct TileLevel {
    /// Zoom level.
    pub z: u8,
    /// Tiles across.
    pub width: u32,
    /// Tiles down.
    pub height: u32,
}

impl TileLevel {
    /// A level of `width` × `height` tiles.
    #[must_use]
    pub const fn new(z: u8, width: u32, height: u32) -> Self {
        Self { z, width, height }
    }

    /// The quadtree level `z`: `2^z` × `2^z` tiles.
    #[must_use]
    pub const fn quadtree(z: u8) -> Self {
        let d = 1_u32 << z;
        Self::new(z, d, d)
    }
}

/// One zoom level of a [`TilePyramid`], with its resolution.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TileGrid {
    level: TileLevel,
    x_res: f64,
    y_res: f64,
}

impl TileGrid {
    /// Zoom level.
    #[must_use]
    pub fn z(&self) -> u8 {
        self.level.z
    }

    /// Tiles across.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.level.width
    }

    /// Tiles down.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.level.height
    }

    /// World units per tile pixel along X.
    #[must_use]
    pub fn x_res(&self) -> f64 {
        self.x_res
    }

    /// World units per tile pixel along Y.
    #[must_use]
    pub fn y_res(&self) -> f64 {
        self.y_res
    }
}

/// Pixel rectangle inside a tile, with half-open `left..right × top..bottom`.
///
/// `top` is the first row from the tile's north edge, as stored in images.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct SourceRect {
    /// First column.
    pub left: u32,
    /// First row.
    pub top: u32,
    /// One past the last column.
    pub right: u32,
    /// One past the last row.
    pub bottom: u32,
}

impl SourceRect {
    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.right.saturating_sub(self.left)
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.bottom.saturating_sub(self.top)
    }

    /// Returns `true` if no pixel is covered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// The rectangle as a [`Rect`] in image pixel coordinates.
    #[must_use]
    pub fn to_rect(&self) -> Rect {
        Rect::new(
            f64::from(self.left),
            f64::from(self.top),
            f64::from(self.right),
            f64::from(self.bottom),
        )
    }
}

#[expect(clippy::cast_possible_truncation, reason = "clamped to 0..=max first")]
fn trunc_px(v: f64, max: u32) -> u32 {
    v.clamp(0.0, f64::from(max)) as u32
}

/// The pixels of a tile that fall inside `view_bounds`.
///
/// The world intersection of the two rectangles is expressed as fractions of
/// the tile's extent and scaled to `tile_width` × `tile_height`, truncating
/// each edge toward the tile's interior origin. A tile fully inside the view
/// yields the full `0..tile_width × 0..tile_height` rectangle. Returns `None`
/// when the tile and the view do not overlap.
#[must_use]
pub fn clip_tile(
    tile_bounds: Rect,
    view_bounds: Rect,
    tile_width: u32,
    tile_height: u32,
) -> Option<SourceRect> {
    let i = tile_bounds.intersect(view_bounds);
    if i.width() <= 0.0 || i.height() <= 0.0 {
        return None;
    }
    let w = f64::from(tile_width);
    let h = f64::from(tile_height);
    let tw = tile_bounds.width();
    let th = tile_bounds.height();

    let left = trunc_px((i.x0 - tile_bounds.x0) / tw * w, tile_width);
    let right = trunc_px(w - (tile_bounds.x1 - i.x1) / tw * w, tile_width);
    // Image rows run north to south; world Y runs south to north.
    let top = trunc_px((tile_bounds.y1 - i.y1) / th * h, tile_height);
    let bottom = trunc_px(h - (i.y0 - tile_bounds.y0) / th * h, tile_height);
    Some(SourceRect {
        left,
        top,
        right,
        bottom,
    })
}

/// A tile set's partition of its world bounds into zoom levels.
///
/// Immutable once built.
#[derive(Clone, Debug, PartialEq)]
pub struct TilePyramid {
    bounds: Rect,
    tile_width: u32,
    tile_height: u32,
    origin: TileOrigin,
    grids: Vec<TileGrid>,
}

impl TilePyramid {
    /// Builds a pyramid over `bounds` from its zoom levels.
    ///
    /// Levels are sorted by zoom; a later duplicate of a zoom replaces an
    /// earlier one.
    ///
    /// # Errors
    ///
    /// Fails when the bounds are empty or not finite, the tile size is zero,
    /// or a level has no tiles.
    pub fn new(
        bounds: Rect,
        tile_width: u32,
        tile_height: u32,
        origin: TileOrigin,
        levels: impl IntoIterator<Item = TileLevel>,
    ) -> Result<Self, TileError> {
        let finite = bounds.x0.is_finite()
            && bounds.y0.is_finite()
            && bounds.x1.is_finite()
            && bounds.y1.is_finite();
        if !finite || bounds.width() <= 0.0 || bounds.height() <= 0.0 {
            return Err(TileError::InvalidBounds(bounds));
        }
        if tile_width == 0 || tile_height == 0 {
            return Err(TileError::EmptyTileSize {
                width: tile_width,
                height: tile_height,
            });
        }

        let mut grids: Vec<TileGrid> = Vec::new();
        for level in levels {
            if level.width == 0 || level.height == 0 {
                return Err(TileError::EmptyGrid {
                    z: level.z,
                    width: level.width,
                    height: level.height,
                });
            }
            let grid = TileGrid {
                level,
                x_res: bounds.width() / (f64::from(level.width) * f64::from(tile_width)),
                y_res: bounds.height() / (f64::from(level.height) * f64::from(tile_height)),
            };
            match grids.iter_mut().find(|g| g.z() == level.z) {
                Some(existing) => *existing = grid,
                None => grids.push(grid),
            }
        }
        grids.sort_by_key(TileGrid::z);

        Ok(Self {
            bounds,
            tile_width,
            tile_height,
            origin,
            grids,
        })
    }

    /// Builds the pyramid a [`TileSource`] declares.
    ///
    /// # Errors
    ///
    /// Same conditions as [`TilePyramid::new`].
    pub fn from_source(source: &dyn TileSource) -> Result<Self, TileError> {
        let (tile_width, tile_height) = source.tile_size();
        Self::new(
            source.declared_bounds(),
            tile_width,
            tile_height,
            source.origin(),
            source.zoom_levels(),
        )
    }

    /// World bounds covered by the pyramid.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    /// Tile width in pixels.
    #[must_use]
    pub fn tile_width(&self) -> u32 {
        self.tile_width
    }

    /// Tile height in pixels.
    #[must_use]
    pub fn tile_height(&self) -> u32 {
        self.tile_height
    }

    /// Row origin of tile indices.
    #[must_use]
    pub fn origin(&self) -> TileOrigin {
        self.origin
    }

    /// All grids, ordered by zoom level.
    #[must_use]
    pub fn grids(&self) -> &[TileGrid] {
        &self.grids
    }

    /// The grid at zoom level `z`.
    #[must_use]
    pub fn grid(&self, z: u8) -> Option<&TileGrid> {
        self.grids.iter().find(|g| g.z() == z)
    }

    /// The grid whose X resolution is closest to `res`.
    ///
    /// Ties go to the higher zoom level.
    #[must_use]
    pub fn match_grid(&self, res: f64) -> Option<&TileGrid> {
        let mut best: Option<&TileGrid> = None;
        for grid in &self.grids {
            let better = match best {
                None => true,
                Some(b) => (grid.x_res - res).abs() <= (b.x_res - res).abs(),
            };
            if better {
                best = Some(grid);
            }
        }
        best
    }

    /// Converts a row counted from the south edge into the pyramid's row origin.
    ///
    /// The conversion is its own inverse.
    #[must_use]
    pub fn flip_row(&self, grid: &TileGrid, row: u32) -> u32 {
        match self.origin {
            TileOrigin::BottomLeft => row,
            TileOrigin::TopLeft => grid.height().saturating_sub(1).saturating_sub(row),
        }
    }

    /// World bounds of the tile at `index`, or `None` if its zoom level or
    /// position is outside the pyramid.
    #[must_use]
    pub fn bounds_of(&self, index: TileIndex) -> Option<Rect> {
        let grid = self.grid(index.z)?;
        if index.x >= grid.width() || index.y >= grid.height() {
            return None;
        }
        let row = self.flip_row(grid, index.y);
        Some(self.cell_bounds(grid, index.x, row))
    }

    /// World bounds of column `x`, south-up row `row` of `grid`.
    pub(crate) fn cell_bounds(&self, grid: &TileGrid, x: u32, row: u32) -> Rect {
        let tw = grid.x_res * f64::from(self.tile_width);
        let th = grid.y_res * f64::from(self.tile_height);
        let x0 = self.bounds.x0 + f64::from(x) * tw;
        let y0 = self.bounds.y0 + f64::from(row) * th;
        Rect::new(x0, y0, x0 + tw, y0 + th)
    }

    /// The tiles needed to draw `bounds` onto `width` × `height` pixels.
    ///
    /// Picks the grid whose resolution is closest to `bounds.width() / width`
    /// and the range of its tiles that intersect `bounds`. A tile that only
    /// touches the view edge is not included. Returns `None` when the view
    /// misses the pyramid or is degenerate.
    #[must_use]
    pub fn cover(&self, bounds: Rect, width: u32, height: u32) -> Option<TileCover<'_>> {
        if width == 0 || height == 0 || bounds.width() <= 0.0 || bounds.height() <= 0.0 {
            return None;
        }
        let res = bounds.width() / f64::from(width);
        let grid = *self.match_grid(res)?;

        let tw = grid.x_res * f64::from(self.tile_width);
        let th = grid.y_res * f64::from(self.tile_height);
        let (x0, x1) = index_range(bounds.x0, bounds.x1, self.bounds.x0, tw, grid.width())?;
        let (y0, y1) = index_range(bounds.y0, bounds.y1, self.bounds.y0, th, grid.height())?;

        log::debug!(
            "tile cover z={} res={res} columns {x0}..={x1} rows {y0}..={y1}",
            grid.z()
        );
        Some(TileCover::new(self, grid, x0, x1, y0, y1))
    }
}

/// Inclusive index range of cells of size `step` starting at `origin` that
/// intersect the half-open interval `lo..hi`, clamped to `0..count`.
#[expect(clippy::cast_possible_truncation, reason = "clamped to 0..count first")]
fn index_range(lo: f64, hi: f64, origin: f64, step: f64, count: u32) -> Option<(u32, u32)> {
    let first = ((lo - origin) / step).floor();
    let last = ((hi - origin) / step).ceil() - 1.0;
    let max = f64::from(count) - 1.0;
    if last < 0.0 || first > max || last < first {
        return None;
    }
    Some((first.max(0.0) as u32, last.min(max) as u32))
}

#[cfg(test)]
mod tests {
    use kurbo::Rect;

    use super::{SourceRect, TileLevel, TileOrigin, TilePyramid, clip_tile};
    use crate::{TileError, TileIndex};

    fn pyramid(origin: TileOrigin) -> TilePyramid {
        TilePyramid::new(
            Rect::new(0.0, 0.0, 1024.0, 1024.0),
            256,
            256,
            origin,
            (0..=3).map(TileLevel::quadtree),
        )
        .unwrap()
    }

    #[test]
    fn grid_resolutions_halve_per_level() {
        let p = pyramid(TileOrigin::BottomLeft);
        let res: Vec<f64> = p.grids().iter().map(|g| g.x_res()).collect();
        assert_eq!(res, [4.0, 2.0, 1.0, 0.5]);
        assert_eq!(p.grid(2).map(|g| (g.width(), g.height())), Some((4, 4)));
    }

    #[test]
    fn rejects_bad_pyramids() {
        let bad = TilePyramid::new(Rect::ZERO, 256, 256, TileOrigin::BottomLeft, []);
        assert!(matches!(bad, Err(TileError::InvalidBounds(_))));
        let bad = TilePyramid::new(
            Rect::new(0.0, 0.0, 1.0, 1.0),
            0,
            256,
            TileOrigin::BottomLeft,
            [],
        );
        assert!(matches!(bad, Err(TileError::EmptyTileSize { .. })));
        let bad = TilePyramid::new(
            Rect::new(0.0, 0.0, 1.0, 1.0),
            256,
            256,
            TileOrigin::BottomLeft,
            [TileLevel::new(4, 0, 1)],
        );
        assert!(matches!(bad, Err(TileError::EmptyGrid { z: 4, .. })));
    }

    #[test]
    fn match_grid_prefers_closest_then_higher_zoom() {
        let p = pyramid(TileOrigin::BottomLeft);
        assert_eq!(p.match_grid(1.1).map(|g| g.z()), Some(2));
        assert_eq!(p.match_grid(100.0).map(|g| g.z()), Some(0));
        // Exactly between 2.0 and 1.0.
        assert_eq!(p.match_grid(1.5).map(|g| g.z()), Some(2));
    }

    #[test]
    fn bounds_of_respects_row_origin() {
        let tms = pyramid(TileOrigin::BottomLeft);
        let xyz = pyramid(TileOrigin::TopLeft);
        let south_west = Rect::new(0.0, 0.0, 512.0, 512.0);
        assert_eq!(tms.bounds_of(TileIndex::new(1, 0, 0)), Some(south_west));
        assert_eq!(xyz.bounds_of(TileIndex::new(1, 0, 1)), Some(south_west));
        assert_eq!(tms.bounds_of(TileIndex::new(1, 2, 0)), None);
        assert_eq!(tms.bounds_of(TileIndex::new(9, 0, 0)), None);
    }

    #[test]
    fn full_inside_tile_clips_to_full_source() {
        let tile = Rect::new(0.0, 0.0, 256.0, 256.0);
        let view = Rect::new(-10.0, -10.0, 1000.0, 1000.0);
        assert_eq!(
            clip_tile(tile, view, 256, 256),
            Some(SourceRect {
                left: 0,
                top: 0,
                right: 256,
                bottom: 256
            })
        );
    }

    #[test]
    fn partial_tile_clip_flips_rows() {
        // View covers the east half and the south quarter of the tile.
        let tile = Rect::new(0.0, 0.0, 100.0, 100.0);
        let view = Rect::new(50.0, -20.0, 300.0, 25.0);
        let src = clip_tile(tile, view, 256, 256).unwrap();
        assert_eq!(
            src,
            SourceRect {
                left: 128,
                top: 192,
                right: 256,
                bottom: 256
            }
        );
        assert_eq!((src.width(), src.height()), (128, 64));
        assert_eq!(clip_tile(tile, Rect::new(100.0, 0.0, 200.0, 50.0), 256, 256), None);
    }

    #[test]
    fn cover_excludes_tiles_touching_the_edge() {
        let p = pyramid(TileOrigin::BottomLeft);
        // Exactly tiles (1..=2, 1..=2) of zoom 2 at 1 unit/px.
        let cover = p.cover(Rect::new(256.0, 256.0, 768.0, 768.0), 512, 512).unwrap();
        assert_eq!(cover.grid().z(), 2);
        assert_eq!((cover.width(), cover.height()), (2, 2));
        assert_eq!(cover.index(0, 0), TileIndex::new(2, 1, 1));
        assert_eq!(cover.index(1, 1), TileIndex::new(2, 2, 2));
    }

    #[test]
    fn cover_is_clamped_and_misses_are_none() {
        let p = pyramid(TileOrigin::BottomLeft);
        let cover = p
            .cover(Rect::new(-500.0, -500.0, 300.0, 300.0), 200, 200)
            .unwrap();
        assert_eq!(cover.grid().z(), 0);
        assert_eq!((cover.width(), cover.height()), (1, 1));
        assert!(p.cover(Rect::new(2000.0, 0.0, 3000.0, 100.0), 100, 100).is_none());
        assert!(p.cover(Rect::new(0.0, 0.0, 10.0, 10.0), 0, 10).is_none());
    }

    #[test]
    fn cover_index_translates_rows_for_top_left_sources() {
        let p = pyramid(TileOrigin::TopLeft);
        let cover = p.cover(Rect::new(0.0, 0.0, 256.0, 256.0), 256, 256).unwrap();
        // South-west tile of a 4x4 XYZ grid is row 3.
        assert_eq!(cover.index(0, 0), TileIndex::new(2, 0, 3));
    }
}
