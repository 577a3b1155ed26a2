// Copyright 2025 the Mapstory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use kurbo::Rect;

use crate::TileIndex;

/// Errors raised while describing, fetching or decoding tiles.
#[derive(Debug, thiserror::Error)]
pub enum TileError {
    /// Pyramid bounds have no area or are not finite.
    #[error("tile pyramid bounds {0:?} are empty or not finite")]
    InvalidBounds(Rect),
    /// Tile pixel size is zero.
    #[error("tile size {width}x{height} is empty")]
    EmptyTileSize {
        /// Tile width in pixels.
        width: u32,
        /// Tile height in pixels.
        height: u32,
    },
    /// A zoom level has no tiles.
    #[error("zoom level {z} has an empty {width}x{height} grid")]
    EmptyGrid {
        /// Zoom level.
        z: u8,
        /// Tiles across.
        width: u32,
        /// Tiles down.
        height: u32,
    },
    /// The encoded tile payload could not be decoded.
    #[error("failed to decode tile {index}")]
    Decode {
        /// The tile that failed.
        index: TileIndex,
        /// Decoder error.
        #[source]
        source: image::ImageError,
    },
    /// Raw pixels do not match the declared tile size.
    #[error("tile {index} has {actual} bytes of pixels, expected {expected}")]
    PixelSize {
        /// The tile that failed.
        index: TileIndex,
        /// Expected byte count (`width * height * 4`).
        expected: usize,
        /// Actual byte count.
        actual: usize,
    },
    /// The tile source failed to produce the tile.
    #[error("tile source failed to fetch {index}: {message}")]
    Fetch {
        /// The requested tile.
        index: TileIndex,
        /// Source-specific description.
        message: String,
    },
}
