// Copyright 2025 the Mapstory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Mapstory Tile: tile pyramids and the tile covers drawn by raster layers.
//!
//! A [`TilePyramid`] describes how a tile set partitions its world bounds:
//! one [`TileGrid`] per zoom level, each with a fixed number of equally
//! sized tiles. For a requested view, [`TilePyramid::cover`] picks the grid
//! whose resolution best matches the view and the range of tiles that
//! intersect it; [`TileCover::fill`] then fetches those tiles from a
//! [`TileSource`].
//!
//! [`clip_tile`] computes which pixels of a tile fall inside the view.
//!
//! Tile rows can be counted from the south edge ([`TileOrigin::BottomLeft`],
//! as in TMS and MBTiles) or from the north edge ([`TileOrigin::TopLeft`], as
//! in XYZ). A cover always walks its cells from the south-west corner;
//! [`TileCover::index`] translates a cell into the source's own index.
//!
//! ```rust
//! use kurbo::Rect;
//! use mapstory_tile::{TileLevel, TileOrigin, TilePyramid};
//!
//! let pyramid = TilePyramid::new(
//!     Rect::new(0.0, 0.0, 512.0, 512.0),
//!     256,
//!     256,
//!     TileOrigin::BottomLeft,
//!     (0..3).map(TileLevel::quadtree),
//! )
//! .unwrap();
//!
//! // A 256 px view of the whole pyramid matches zoom 0 exactly.
//! let cover = pyramid.cover(Rect::new(0.0, 0.0, 512.0, 512.0), 256, 256).unwrap();
//! assert_eq!(cover.grid().z(), 0);
//! assert_eq!((cover.width(), cover.height()), (1, 1));
//! ```

mod cover;
mod error;
mod pyramid;
mod source;
mod tile;

pub use cover::{CoverCell, TileCover};
pub use error::TileError;
pub use pyramid::{SourceRect, TileGrid, TileLevel, TileOrigin, TilePyramid, clip_tile};
pub use source::TileSource;
pub use tile::{Tile, TileData, TileImage, TileIndex};
