// Copyright 2025 the Mapstory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use kurbo::Rect;

use crate::{Tile, TileError, TileIndex, TileLevel, TileOrigin};

/// A provider of tiles, such as an MBTiles or GeoPackage tile table.
///
/// The renderer only reads through this trait; opening and caching the
/// underlying store is up to the implementation.
pub trait TileSource {
    /// Name used in log messages.
    fn name(&self) -> &str;

    /// World bounds the tile set partitions.
    fn declared_bounds(&self) -> Rect;

    /// Zoom levels present in the tile set.
    fn zoom_levels(&self) -> Vec<TileLevel>;

    /// Tile size in pixels. Defaults to 256 × 256.
    fn tile_size(&self) -> (u32, u32) {
        (256, 256)
    }

    /// Row origin of the source's tile indices. Defaults to
    /// [`TileOrigin::BottomLeft`] as used by MBTiles.
    fn origin(&self) -> TileOrigin {
        TileOrigin::BottomLeft
    }

    /// Fetches one tile.
    ///
    /// `Ok(None)` means the tile set has no tile at `index`.
    ///
    /// # Errors
    ///
    /// Any failure to read the tile from the underlying store.
    fn fetch(&self, index: TileIndex) -> Result<Option<Tile>, TileError>;
}
