// Copyright 2025 the Mapstory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Vello CPU–backed software bitmap surface.
//!
//! This crate implements [`ImagingBackend`] on top of the sparse-strips
//! [`vello_cpu::RenderContext`], so the map renderer can draw into an
//! in-memory bitmap. [`RasterTarget`] owns the render context and the output
//! size, hands out a borrowing [`VelloCpuImagingBackend`] for the duration of
//! a render, and afterwards reads the pixels back as straight-alpha RGBA8 or
//! compresses them to PNG.

#![deny(unsafe_code)]
#![no_std]

extern crate alloc;
#[cfg(feature = "std")]
extern crate std;

use alloc::vec::Vec;
use core::fmt;
use kurbo::{Affine, Cap, Join};
use peniko::{Brush, Fill, ImageData};
use mapstory_imaging::{
    DrawOp, FillRule, ImageDesc, ImageId, ImagingBackend, LayerOp, PaintDesc, PaintId, PathCmd,
    PathDesc, PathId, ResourceBackend, StateOp, StrokeStyle,
};
use vello_cpu::kurbo::{
    Affine as CpuAffine, BezPath, Cap as CpuCap, Ellipse, Join as CpuJoin, Rect, Shape, Stroke,
};
use vello_cpu::{Image as CpuImage, ImageSource, Pixmap, RenderContext, RenderMode, RenderSettings};

const OVAL_TOLERANCE: f64 = 0.1;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum StackEntry {
    Noop,
    Pushed,
}

/// CPU-backed implementation of the imaging backend using `vello_cpu`.
pub struct VelloCpuImagingBackend<'ctx> {
    /// Underlying Vello CPU render context to draw into.
    pub ctx: &'ctx mut RenderContext,
    paths: Vec<Option<BezPath>>,
    images: Vec<Option<(ImageDesc, Vec<u8>)>>,
    paints: Vec<Option<PaintDesc>>,

    stack: Vec<StackEntry>,
    current_paint: Option<PaintId>,
    current_transform: Affine,
}

impl fmt::Debug for VelloCpuImagingBackend<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("VelloCpuImagingBackend { .. }")
    }
}

fn rect_to_cpu(r: mapstory_imaging::Rect) -> Rect {
    Rect::new(r.x0, r.y0, r.x1, r.y1)
}

fn stroke_to_cpu(style: &StrokeStyle) -> Stroke {
    let mut stroke = Stroke::new(style.width);
    stroke.miter_limit = style.miter_limit;
    stroke.join = match style.join {
        Join::Bevel => CpuJoin::Bevel,
        Join::Miter => CpuJoin::Miter,
        Join::Round => CpuJoin::Round,
    };
    stroke.start_cap = match style.start_cap {
        Cap::Butt => CpuCap::Butt,
        Cap::Round => CpuCap::Round,
        Cap::Square => CpuCap::Square,
    };
    stroke.end_cap = match style.end_cap {
        Cap::Butt => CpuCap::Butt,
        Cap::Round => CpuCap::Round,
        Cap::Square => CpuCap::Square,
    };
    stroke
}

impl<'ctx> VelloCpuImagingBackend<'ctx> {
    /// Create a new backend that renders into the given CPU render context.
    pub fn new(ctx: &'ctx mut RenderContext) -> Self {
        Self {
            ctx,
            paths: Vec::new(),
            images: Vec::new(),
            paints: Vec::new(),
            stack: Vec::new(),
            current_paint: None,
            current_transform: Affine::IDENTITY,
        }
    }

    /// Returns the transform most recently installed with [`StateOp::SetTransform`].
    pub fn current_transform(&self) -> Affine {
        self.current_transform
    }

    fn affine_to_cpu(xf: Affine) -> CpuAffine {
        CpuAffine::new(xf.as_coeffs())
    }

    fn oval_path(rect: mapstory_imaging::Rect) -> BezPath {
        Ellipse::from_rect(rect_to_cpu(rect)).to_path(OVAL_TOLERANCE)
    }

    fn apply_current_paint(&mut self) {
        let Some(id) = self.current_paint else {
            return;
        };
        let idx = id.0 as usize;
        if let Some(Some(PaintDesc { brush })) = self.paints.get(idx) {
            match brush.clone() {
                Brush::Solid(color) => {
                    self.ctx.set_paint(color);
                }
                Brush::Gradient(gradient) => {
                    self.ctx.set_paint(gradient);
                }
                Brush::Image(image_brush) => {
                    let source = ImageSource::from_peniko_image_data(&image_brush.image);
                    let image = CpuImage {
                        image: source,
                        sampler: image_brush.sampler,
                    };
                    self.ctx.set_paint(image);
                }
            }
        }
    }

    fn draw_image_rect(
        &mut self,
        image: ImageId,
        src: Option<mapstory_imaging::Rect>,
        dst: mapstory_imaging::Rect,
        sampler: peniko::ImageSampler,
    ) {
        let idx = image.0 as usize;
        let Some(Some((desc, pixels))) = self.images.get(idx) else {
            return;
        };
        let src = src.unwrap_or(mapstory_imaging::Rect::new(
            0.0,
            0.0,
            f64::from(desc.width),
            f64::from(desc.height),
        ));
        if dst.width().abs() < f64::EPSILON
            || dst.height().abs() < f64::EPSILON
            || src.width().abs() < f64::EPSILON
            || src.height().abs() < f64::EPSILON
        {
            return;
        }

        let local = Affine::translate((dst.x0, dst.y0))
            * Affine::scale_non_uniform(dst.width() / src.width(), dst.height() / src.height())
            * Affine::translate((-src.x0, -src.y0));

        let image_data = ImageData {
            data: peniko::Blob::from(pixels.clone()),
            format: desc.format,
            alpha_type: desc.alpha_type,
            width: desc.width,
            height: desc.height,
        };
        let image_paint = CpuImage {
            image: ImageSource::from_peniko_image_data(&image_data),
            sampler,
        };
        let full = Rect::new(0.0, 0.0, f64::from(desc.width), f64::from(desc.height));

        let saved_transform = *self.ctx.transform();
        let saved_paint = self.ctx.paint().clone();

        // Clip to the destination in the current (non-image) transform so a
        // source sub-rectangle never bleeds into neighbouring tiles.
        self.ctx.push_clip_layer(&rect_to_cpu(dst).to_path(OVAL_TOLERANCE));
        self.ctx.set_paint(image_paint);
        self.ctx
            .set_transform(saved_transform * Self::affine_to_cpu(local));
        self.ctx.fill_rect(&full);
        self.ctx.set_transform(saved_transform);
        self.ctx.set_paint(saved_paint);
        self.ctx.pop_layer();
    }
}

impl ResourceBackend for VelloCpuImagingBackend<'_> {
    fn create_path(&mut self, desc: PathDesc) -> PathId {
        let mut p = BezPath::new();
        for cmd in desc.commands.iter() {
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
        let id = u32::try_from(self.paths.len())
            .expect("VelloCpuImagingBackend: too many paths for u32 PathId");
        self.paths.push(Some(p));
        PathId(id)
    }

    fn destroy_path(&mut self, id: PathId) {
        if let Some(slot) = self.paths.get_mut(id.0 as usize) {
            *slot = None;
        }
    }

    fn create_image(&mut self, desc: ImageDesc, pixels: &[u8]) -> ImageId {
        let id = u32::try_from(self.images.len())
            .expect("VelloCpuImagingBackend: too many images for u32 ImageId");
        self.images.push(Some((desc, pixels.to_vec())));
        ImageId(id)
    }

    fn destroy_image(&mut self, id: ImageId) {
        if let Some(slot) = self.images.get_mut(id.0 as usize) {
            *slot = None;
        }
    }

    fn create_paint(&mut self, desc: PaintDesc) -> PaintId {
        let id = u32::try_from(self.paints.len())
            .expect("VelloCpuImagingBackend: too many paints for u32 PaintId");
        self.paints.push(Some(desc));
        PaintId(id)
    }

    fn destroy_paint(&mut self, id: PaintId) {
        if let Some(slot) = self.paints.get_mut(id.0 as usize) {
            *slot = None;
        }
    }
}

impl ImagingBackend for VelloCpuImagingBackend<'_> {
    fn state(&mut self, op: StateOp) {
        match op {
            StateOp::SetTransform(xf) => {
                self.current_transform = xf;
                self.ctx.set_transform(Self::affine_to_cpu(xf));
            }
            StateOp::PushLayer(layer) => {
                if layer.is_noop() {
                    self.stack.push(StackEntry::Noop);
                } else {
                    let LayerOp { opacity } = layer;
                    self.ctx.push_layer(None, None, opacity, None, None);
                    self.stack.push(StackEntry::Pushed);
                }
            }
            StateOp::PopLayer => match self.stack.pop() {
                Some(StackEntry::Noop) | None => {}
                Some(StackEntry::Pushed) => self.ctx.pop_layer(),
            },
            StateOp::SetPaint(id) => {
                self.current_paint = Some(id);
                self.apply_current_paint();
            }
            StateOp::SetStroke(style) => {
                self.ctx.set_stroke(stroke_to_cpu(&style));
            }
            StateOp::SetFillRule(rule) => {
                // vello_cpu uses peniko::Fill for fill rules.
                let fill = match rule {
                    FillRule::NonZero => Fill::NonZero,
                    FillRule::EvenOdd => Fill::EvenOdd,
                };
                self.ctx.set_fill_rule(fill);
            }
        }
    }

    fn draw(&mut self, op: DrawOp) {
        match op {
            DrawOp::FillPath(id) => {
                if let Some(Some(path)) = self.paths.get(id.0 as usize) {
                    self.ctx.fill_path(path);
                }
            }
            DrawOp::StrokePath(id) => {
                if let Some(Some(path)) = self.paths.get(id.0 as usize) {
                    self.ctx.stroke_path(path);
                }
            }
            DrawOp::FillRect(rect) => self.ctx.fill_rect(&rect_to_cpu(rect)),
            DrawOp::FillOval(rect) => self.ctx.fill_path(&Self::oval_path(rect)),
            DrawOp::StrokeOval(rect) => self.ctx.stroke_path(&Self::oval_path(rect)),
            DrawOp::DrawImageRect {
                image,
                src,
                dst,
                sampler,
            } => self.draw_image_rect(image, src, dst, sampler),
        }
    }
}

/// An owned software bitmap to render a map into.
///
/// The target owns the [`RenderContext`]; [`RasterTarget::backend`] lends it
/// out to a [`VelloCpuImagingBackend`] for one render call. Once the backend
/// is dropped (for example after the renderer is closed), the pixels can be
/// read back.
pub struct RasterTarget {
    ctx: RenderContext,
    width: u16,
    height: u16,
}

impl fmt::Debug for RasterTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RasterTarget")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

impl RasterTarget {
    /// Create a transparent target of `width` × `height` pixels.
    pub fn new(width: u16, height: u16) -> Self {
        let settings = RenderSettings {
            // Stable u8 output regardless of which pipelines are enabled elsewhere.
            render_mode: RenderMode::OptimizeSpeed,
            ..RenderSettings::default()
        };
        Self {
            ctx: RenderContext::new_with(width, height, settings),
            width,
            height,
        }
    }

    /// Width in pixels.
    pub fn width(&self) -> u16 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u16 {
        self.height
    }

    /// Borrow the target as an imaging surface.
    pub fn backend(&mut self) -> VelloCpuImagingBackend<'_> {
        VelloCpuImagingBackend::new(&mut self.ctx)
    }

    /// Rasterize everything drawn so far and return straight-alpha RGBA8 rows.
    pub fn rgba8(&mut self) -> Vec<u8> {
        let mut pixmap = Pixmap::new(self.width, self.height);
        self.ctx.flush();
        self.ctx.render_to_pixmap(&mut pixmap);

        let unpremul = pixmap.take_unpremultiplied();
        let mut bytes = Vec::with_capacity(unpremul.len() * 4);
        for p in unpremul {
            bytes.extend_from_slice(&[p.r, p.g, p.b, p.a]);
        }
        bytes
    }

    /// Rasterize and compress the bitmap to PNG.
    ///
    /// # Errors
    ///
    /// Returns the encoder error if the PNG stream cannot be written.
    #[cfg(feature = "std")]
    pub fn encode_png(&mut self) -> Result<Vec<u8>, png::EncodingError> {
        let rgba = self.rgba8();
        let mut out = Vec::new();
        {
            let mut encoder =
                png::Encoder::new(&mut out, u32::from(self.width), u32::from(self.height));
            encoder.set_color(png::ColorType::Rgba);
            encoder.set_depth(png::BitDepth::Eight);
            let mut writer = encoder.write_header()?;
            writer.write_image_data(&rgba)?;
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mapstory_imaging::ImagingBackendExt;
    use peniko::Color;

    fn pixel(rgba: &[u8], width: u16, x: usize, y: usize) -> [u8; 4] {
        let i = (y * usize::from(width) + x) * 4;
        [rgba[i], rgba[i + 1], rgba[i + 2], rgba[i + 3]]
    }

    #[test]
    fn fill_rect_writes_pixels() {
        let mut target = RasterTarget::new(8, 8);
        {
            let mut backend = target.backend();
            backend.with_paint(Brush::Solid(Color::from_rgb8(255, 0, 0)), |b| {
                b.draw(DrawOp::FillRect(mapstory_imaging::Rect::new(0.0, 0.0, 4.0, 8.0)));
            });
        }
        let rgba = target.rgba8();
        assert_eq!(pixel(&rgba, 8, 1, 1), [255, 0, 0, 255]);
        assert_eq!(pixel(&rgba, 8, 6, 1)[3], 0);
    }

    #[test]
    fn image_rect_is_clipped_to_destination() {
        let mut target = RasterTarget::new(8, 8);
        {
            let mut backend = target.backend();
            let pixels: Vec<u8> = [0_u8, 0, 255, 255].repeat(16);
            let image = backend.create_image(ImageDesc::rgba8(4, 4), &pixels);
            backend.draw(DrawOp::DrawImageRect {
                image,
                src: Some(mapstory_imaging::Rect::new(0.0, 0.0, 2.0, 4.0)),
                dst: mapstory_imaging::Rect::new(0.0, 0.0, 4.0, 8.0),
                sampler: peniko::ImageSampler::default(),
            });
            backend.destroy_image(image);
        }
        let rgba = target.rgba8();
        assert_eq!(pixel(&rgba, 8, 2, 4), [0, 0, 255, 255]);
        assert_eq!(pixel(&rgba, 8, 5, 4)[3], 0);
    }

    #[test]
    fn encode_png_produces_signature() {
        let mut target = RasterTarget::new(2, 2);
        let png = target.encode_png().expect("encode");
        assert_eq!(&png[..8], &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]);
    }
}
