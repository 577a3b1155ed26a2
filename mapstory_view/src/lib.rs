// Copyright 2025 the Mapstory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Mapstory View: the geographic view of one render pass and the
//! world↔device transform derived from it.
//!
//! A [`View`] pairs north-up world bounds with a pixel size. The
//! [`TransformPipeline`] turns it into the affine mapping world coordinates
//! onto the device (pixel) grid, with the origin at the top-left of the
//! surface and Y growing downward.
//!
//! Some primitives are drawn in pixel space (markers, raster tiles, labels).
//! [`TransformPipeline::pixel_space`] returns a [`PixelSpace`] guard that
//! installs the identity transform immediately and reinstalls the world
//! transform when it goes out of scope, so the two can never be unbalanced.
//!
//! ## Minimal example
//!
//! ```rust
//! use kurbo::{Point, Rect};
//! use mapstory_view::{TransformPipeline, View};
//!
//! let view = View::new(Rect::new(0.0, 0.0, 100.0, 50.0), 200, 100).unwrap();
//! let pipeline = TransformPipeline::new(&view);
//!
//! // The north-west corner of the world bounds is the device origin.
//! assert_eq!(pipeline.to_device(Point::new(0.0, 50.0)), Point::new(0.0, 0.0));
//! // The south-east corner is the far device corner.
//! assert_eq!(pipeline.to_device(Point::new(100.0, 0.0)), Point::new(200.0, 100.0));
//! ```
//!
//! This crate is `no_std`.

#![no_std]

mod pipeline;
mod view;

pub use pipeline::{PixelSpace, TransformPipeline};
pub use view::{View, ViewError};
