// Copyright 2025 the Mapstory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Mapstory Geom: feature geometry and pixel-resolution generalization.
//!
//! - [`Geometry`] is the closed set of simple-feature shapes a data source
//!   yields, with coordinates as [`kurbo::Point`] in world units.
//! - [`CoordinatePath`] walks a geometry as a lazy sequence of
//!   [`PathStep`]s, optionally dropping vertices that would land on the same
//!   pixel as the previously emitted one.
//! - [`anchor`] has the helpers labels use to find where text goes
//!   (area-weighted ring centroid, line midpoint and direction, clipping to
//!   the visible surface).
//!
//! ```rust
//! use kurbo::Point;
//! use mapstory_geom::{CoordinatePath, Geometry, PathStep};
//!
//! let line = Geometry::LineString(vec![
//!     Point::new(0.0, 0.0),
//!     Point::new(0.1, 0.0),
//!     Point::new(10.0, 0.0),
//! ]);
//! let steps: Vec<_> = CoordinatePath::new(&line).generalize(1.0, 1.0).collect();
//! assert_eq!(
//!     steps,
//!     [
//!         PathStep::MoveTo(Point::new(0.0, 0.0)),
//!         PathStep::LineTo(Point::new(10.0, 0.0)),
//!     ]
//! );
//! ```
//!
//! This crate is `no_std`.

#![no_std]

extern crate alloc;

pub mod anchor;
mod geometry;
mod path;

pub use geometry::{Geometry, GeometryKind, Polygon};
pub use path::{CoordinatePath, PathStep};
