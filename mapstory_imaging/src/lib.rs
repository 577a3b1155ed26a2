// Copyright 2025 the Mapstory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Mapstory Imaging: the drawing-surface capability used by the map renderer.
//!
//! This crate defines a small, plain‑old‑data (POD) friendly imaging
//! intermediate representation and the traits a drawing surface implements
//! to consume it. The renderer in `mapstory_render` is written once against
//! these traits; concrete surfaces (the recording surface in
//! `mapstory_imaging_ref`, the software bitmap surface in
//! `mapstory_imaging_vello_cpu`) implement them.
//!
//! # Core concepts
//!
//! - **Resources**: small, opaque handles ([`PathId`], [`ImageId`],
//!   [`PaintId`]) whose lifetimes are managed via [`ResourceBackend`].
//!   The renderer creates them per feature or per tile and destroys them
//!   right after the draw, so surfaces should keep creation cheap.
//! - **Imaging operations**: [`StateOp`] (mutate state) and [`DrawOp`]
//!   (produce pixels), combined into [`ImagingOp`] for recording.
//! - **Surfaces**: [`ImagingBackend`] accepts imaging ops;
//!   [`ImagingBackendExt`] adds scoped layer helpers.
//!
//! Coordinates are `f64` throughout. Map geometry lives in projected world
//! units (easily `1e7` in Web Mercator), and `f32` does not have the
//! precision to draw such coordinates at street-level zoom.
//!
//! # Example
//!
//! ```ignore
//! # use mapstory_imaging::*;
//! # use peniko::{Brush, Color};
//! let mut surface = MySurface::default();
//!
//! let paint = surface.create_paint(PaintDesc {
//!     brush: Brush::Solid(Color::WHITE),
//! });
//! surface.state(StateOp::SetPaint(paint));
//! surface.draw(DrawOp::FillOval(Rect::new(0.0, 0.0, 10.0, 10.0)));
//! surface.destroy_paint(paint);
//! ```

#![no_std]

extern crate alloc;

use alloc::boxed::Box;
use alloc::vec::Vec;
use kurbo::{BezPath, PathEl};
use peniko::Brush;
pub use peniko::{Fill as FillRule, ImageAlphaType, ImageFormat, ImageSampler};

/// Affine transform type used by the imaging IR.
pub type Affine = kurbo::Affine;

/// Axis-aligned rectangle type used by the imaging IR.
pub type Rect = kurbo::Rect;

/// Stroke style used for stroking paths, rects and ovals.
///
/// This is a re-export of [`kurbo::Stroke`], which captures width,
/// joins, caps, dashes, and related stroke parameters.
pub type StrokeStyle = kurbo::Stroke;

/// Identifier for a path resource.
#[repr(transparent)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct PathId(pub u32);

/// Identifier for an image resource.
///
/// Images are created from tightly packed RGBA8 pixels (for example a
/// decoded map tile) and are valid until explicitly destroyed.
#[repr(transparent)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ImageId(pub u32);

/// Identifier for a paint resource.
#[repr(transparent)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct PaintId(pub u32);

/// A scoped layer pushed with [`StateOp::PushLayer`].
///
/// Layers group subsequent draws so they are composited with a group
/// opacity.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LayerOp {
    /// Optional group opacity in `[0, 1]`.
    pub opacity: Option<f32>,
}

impl LayerOp {
    /// Layer that only applies a group opacity.
    #[inline]
    pub const fn opacity(opacity: f32) -> Self {
        Self {
            opacity: Some(opacity),
        }
    }

    /// Returns `true` if this layer has no effect on its content.
    #[inline]
    pub fn is_noop(&self) -> bool {
        self.opacity.is_none_or(|o| o >= 1.0)
    }
}

/// State operations that mutate the current imaging state.
#[derive(Clone, Debug, PartialEq)]
pub enum StateOp {
    /// Set the current transform matrix.
    SetTransform(Affine),
    /// Push a new layer onto the layer stack.
    ///
    /// Layers must be well-nested: every `PushLayer` must eventually be
    /// matched by a [`StateOp::PopLayer`].
    PushLayer(LayerOp),
    /// Pop the most recently pushed layer.
    PopLayer,
    /// Set the current paint resource.
    SetPaint(PaintId),
    /// Set the current stroke style.
    SetStroke(StrokeStyle),
    /// Set the current fill rule used by [`DrawOp::FillPath`].
    ///
    /// The default fill rule is [`FillRule::NonZero`].
    SetFillRule(FillRule),
}

/// Draw operations that produce pixels given the current state.
#[derive(Clone, Debug, PartialEq)]
pub enum DrawOp {
    /// Fill the given path with the current paint.
    FillPath(PathId),
    /// Stroke the given path with the current stroke and paint.
    StrokePath(PathId),
    /// Fill an axis-aligned rectangle with the current paint.
    FillRect(Rect),
    /// Fill the oval inscribed in the rectangle with the current paint.
    FillOval(Rect),
    /// Stroke the oval inscribed in the rectangle with the current stroke and paint.
    StrokeOval(Rect),
    /// Draw an image mapped to a destination rect, optionally sampling from a source rect.
    ///
    /// - `dst` is in local coordinates (subject to the current transform).
    /// - `src` is in image pixel coordinates; `None` means the full image.
    ///
    /// Pixels in `dst` map linearly into `src`. Nothing outside `dst` is touched.
    DrawImageRect {
        /// Image resource to draw.
        image: ImageId,
        /// Optional source rectangle in image pixel coordinates.
        src: Option<Rect>,
        /// Destination rectangle in local coordinates.
        dst: Rect,
        /// Parameters that specify how to sample the image.
        sampler: ImageSampler,
    },
}

/// Description of a path resource.
#[derive(Clone, Debug, PartialEq)]
pub struct PathDesc {
    /// Command buffer describing the path geometry.
    pub commands: Box<[PathCmd]>,
}

impl PathDesc {
    /// Build a path description from a [`BezPath`].
    pub fn from_bez_path(path: &BezPath) -> Self {
        let commands: Vec<PathCmd> = path
            .elements()
            .iter()
            .map(|el| match *el {
                PathEl::MoveTo(p) => PathCmd::MoveTo { x: p.x, y: p.y },
                PathEl::LineTo(p) => PathCmd::LineTo { x: p.x, y: p.y },
                PathEl::QuadTo(p1, p) => PathCmd::QuadTo {
                    x1: p1.x,
                    y1: p1.y,
                    x: p.x,
                    y: p.y,
                },
                PathEl::CurveTo(p1, p2, p) => PathCmd::CurveTo {
                    x1: p1.x,
                    y1: p1.y,
                    x2: p2.x,
                    y2: p2.y,
                    x: p.x,
                    y: p.y,
                },
                PathEl::ClosePath => PathCmd::Close,
            })
            .collect();
        Self {
            commands: commands.into_boxed_slice(),
        }
    }

    /// Convert the command buffer back into a [`BezPath`].
    pub fn to_bez_path(&self) -> BezPath {
        let mut p = BezPath::new();
        for cmd in self.commands.iter() {
            match *cmd {
                PathCmd::MoveTo { x, y } => p.move_to((x, y)),
                PathCmd::LineTo { x, y } => p.line_to((x, y)),
                PathCmd::QuadTo { x1, y1, x, y } => p.quad_to((x1, y1), (x, y)),
                PathCmd::CurveTo {
                    x1,
                    y1,
                    x2,
                    y2,
                    x,
                    y,
                } => p.curve_to((x1, y1), (x2, y2), (x, y)),
                PathCmd::Close => p.close_path(),
            }
        }
        p
    }

    /// Returns `true` if the path has no commands.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

/// Simple path command enumeration.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum PathCmd {
    /// Move the current point without drawing.
    MoveTo {
        /// X coordinate of the new point.
        x: f64,
        /// Y coordinate of the new point.
        y: f64,
    },
    /// Draw a line from the current point to the given point.
    LineTo {
        /// X coordinate of the line end.
        x: f64,
        /// Y coordinate of the line end.
        y: f64,
    },
    /// Quadratic Bézier curve to the given point, using a single control point.
    QuadTo {
        /// X coordinate of the control point.
        x1: f64,
        /// Y coordinate of the control point.
        y1: f64,
        /// X coordinate of the curve end.
        x: f64,
        /// Y coordinate of the curve end.
        y: f64,
    },
    /// Cubic Bézier curve to the given point, using two control points.
    CurveTo {
        /// X coordinate of the first control point.
        x1: f64,
        /// Y coordinate of the first control point.
        y1: f64,
        /// X coordinate of the second control point.
        x2: f64,
        /// Y coordinate of the second control point.
        y2: f64,
        /// X coordinate of the curve end.
        x: f64,
        /// Y coordinate of the curve end.
        y: f64,
    },
    /// Close the current subpath.
    Close,
}

/// Description of an image resource.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageDesc {
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// Pixel format of the image buffer.
    pub format: ImageFormat,
    /// Alpha encoding of the pixels (straight vs premultiplied).
    pub alpha_type: ImageAlphaType,
}

impl ImageDesc {
    /// Straight-alpha RGBA8 image of the given size.
    #[inline]
    pub const fn rgba8(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            format: ImageFormat::Rgba8,
            alpha_type: ImageAlphaType::Alpha,
        }
    }
}

/// Description of a paint resource.
#[derive(Clone, Debug, PartialEq)]
pub struct PaintDesc {
    /// Brush used when rendering.
    ///
    /// This is a [`peniko::Brush`], so surfaces can directly map it onto their
    /// native paint representation.
    pub brush: Brush,
}

/// Resource lifetime interface.
///
/// Surfaces must ensure that IDs remain valid and refer to the same logical
/// resource until the corresponding `destroy_*` function is called.
/// Destroying an unknown or already destroyed ID is a no-op.
pub trait ResourceBackend {
    /// Create a path resource.
    fn create_path(&mut self, desc: PathDesc) -> PathId;
    /// Destroy a previously created path.
    fn destroy_path(&mut self, id: PathId);

    /// Create an image resource from raw pixels.
    ///
    /// The `pixels` slice contains tightly packed, row-major image data in
    /// the format given by `desc`.
    fn create_image(&mut self, desc: ImageDesc, pixels: &[u8]) -> ImageId;
    /// Destroy a previously created image.
    fn destroy_image(&mut self, id: ImageId);

    /// Create a paint resource.
    fn create_paint(&mut self, desc: PaintDesc) -> PaintId;
    /// Destroy a previously created paint.
    fn destroy_paint(&mut self, id: PaintId);
}

/// Unified imaging operation used by recordings.
#[derive(Clone, Debug, PartialEq)]
pub enum ImagingOp {
    /// State-changing operation.
    State(StateOp),
    /// Drawing operation.
    Draw(DrawOp),
}

/// Drawing surface trait.
///
/// A surface owns its pixels (or its recording) and applies state and draw
/// operations in order. The renderer never retains a surface beyond one
/// render call's lifetime.
pub trait ImagingBackend: ResourceBackend {
    /// Apply a state operation.
    fn state(&mut self, op: StateOp);

    /// Apply a draw operation.
    fn draw(&mut self, op: DrawOp);

    /// Install `transform` as the current transform.
    ///
    /// This is equivalent to `self.state(StateOp::SetTransform(transform))`.
    #[inline]
    fn set_transform(&mut self, transform: Affine) {
        self.state(StateOp::SetTransform(transform));
    }

    /// Push a new layer onto the layer stack.
    ///
    /// This is equivalent to `self.state(StateOp::PushLayer(op))`.
    #[inline]
    fn layer_push(&mut self, op: LayerOp) {
        self.state(StateOp::PushLayer(op));
    }

    /// Pop the most recently pushed layer.
    ///
    /// This is equivalent to `self.state(StateOp::PopLayer)`.
    #[inline]
    fn layer_pop(&mut self) {
        self.state(StateOp::PopLayer);
    }
}

/// Convenience helpers for `ImagingBackend` implementations and callers.
///
/// This is separate from [`ImagingBackend`] so that methods can accept closures and return values
/// without complicating trait object usage (`&mut dyn ImagingBackend`).
pub trait ImagingBackendExt: ImagingBackend {
    /// Run `f` inside a pushed layer, popping it afterwards.
    ///
    /// A no-op layer is not pushed at all.
    ///
    /// Note: if `f` panics, the layer will not be popped.
    #[inline]
    fn with_layer<R>(&mut self, op: LayerOp, f: impl FnOnce(&mut Self) -> R) -> R {
        if op.is_noop() {
            return f(self);
        }
        self.layer_push(op);
        let out = f(self);
        self.layer_pop();
        out
    }

    /// Run `f` inside a group-opacity layer.
    #[inline]
    fn with_opacity_layer<R>(&mut self, opacity: f32, f: impl FnOnce(&mut Self) -> R) -> R {
        self.with_layer(LayerOp::opacity(opacity), f)
    }

    /// Create a solid paint, run `f` with it installed, and destroy it afterwards.
    #[inline]
    fn with_paint<R>(&mut self, brush: Brush, f: impl FnOnce(&mut Self) -> R) -> R {
        let paint = self.create_paint(PaintDesc { brush });
        self.state(StateOp::SetPaint(paint));
        let out = f(self);
        self.destroy_paint(paint);
        out
    }
}

impl<B: ImagingBackend + ?Sized> ImagingBackendExt for B {}
