// Copyright 2025 the Mapstory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use core::fmt;

use crate::TileError;

/// Address of one tile: zoom level, column and row.
///
/// The row is counted in the source's own [`TileOrigin`](crate::TileOrigin).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileIndex {
    /// Zoom level.
    pub z: u8,
    /// Column, from the west edge.
    pub x: u32,
    /// Row.
    pub y: u32,
}

impl TileIndex {
    /// Creates a tile index.
    #[must_use]
    pub const fn new(z: u8, x: u32, y: u32) -> Self {
        Self { z, x, y }
    }
}

impl fmt::Display for TileIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}

/// Decoded straight-alpha RGBA8 tile pixels.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TileImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Row-major RGBA8 pixels, `width * height * 4` bytes.
    pub pixels: Vec<u8>,
}

/// Tile payload as delivered by a source.
#[derive(Clone, PartialEq, Eq)]
pub enum TileData {
    /// Already decoded pixels.
    Rgba8(TileImage),
    /// An encoded image (PNG or JPEG) to be decoded on use.
    Encoded(Vec<u8>),
}

impl fmt::Debug for TileData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rgba8(img) => f
                .debug_struct("Rgba8")
                .field("width", &img.width)
                .field("height", &img.height)
                .finish_non_exhaustive(),
            Self::Encoded(bytes) => f.debug_tuple("Encoded").field(&bytes.len()).finish(),
        }
    }
}

/// One fetched tile.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tile {
    /// Where the tile sits in its pyramid.
    pub index: TileIndex,
    /// The tile's pixels.
    pub data: TileData,
}

impl Tile {
    /// A tile carrying encoded image bytes.
    #[must_use]
    pub fn encoded(index: TileIndex, bytes: Vec<u8>) -> Self {
        Self {
            index,
            data: TileData::Encoded(bytes),
        }
    }

    /// A tile carrying decoded RGBA8 pixels.
    #[must_use]
    pub fn rgba8(index: TileIndex, width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self {
            index,
            data: TileData::Rgba8(TileImage {
                width,
                height,
                pixels,
            }),
        }
    }

    /// Decodes the tile into straight-alpha RGBA8 pixels.
    ///
    /// # Errors
    ///
    /// Fails if an encoded payload is not a readable image, or raw pixels do
    /// not match their declared size.
    pub fn decode(&self) -> Result<TileImage, TileError> {
        match &self.data {
            TileData::Rgba8(img) => {
                let expected = img.width as usize * img.height as usize * 4;
                if img.pixels.len() != expected {
                    return Err(TileError::PixelSize {
                        index: self.index,
                        expected,
                        actual: img.pixels.len(),
                    });
                }
                Ok(img.clone())
            }
            TileData::Encoded(bytes) => {
                let decoded = image::load_from_memory(bytes)
                    .map_err(|source| TileError::Decode {
                        index: self.index,
                        source,
                    })?
                    .to_rgba8();
                let (width, height) = decoded.dimensions();
                Ok(TileImage {
                    width,
                    height,
                    pixels: decoded.into_raw(),
                })
            }
        }
    }
}
