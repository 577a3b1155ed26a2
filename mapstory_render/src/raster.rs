// Copyright 2025 the Mapstory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Raster layers: tile compositing and single-image blits.
//!
//! Tiles are placed with cumulative device cursors. For each column (west
//! to east) the clipped world width is converted to pixels and added to a
//! running `f64` total; the column's right edge is that total truncated, and
//! its left edge is the previous column's right edge. Rows work the same
//! way, counting pixels up from the bottom of the surface. Adjacent tiles therefore
//! share edges exactly, a pixel on a fractional boundary belongs to the
//! later (east or north) tile, and the rounding error over a whole row or
//! column stays below one pixel.

use kurbo::Rect;
use mapstory_imaging::{DrawOp, ImageDesc, ImageSampler, ImagingBackend, ImagingBackendExt};
use mapstory_tile::{Tile, TileCover, TileError, TileIndex, TilePyramid, TileSource, clip_tile};
use mapstory_view::{TransformPipeline, View};

use crate::{RasterSource, RenderError};

/// Tile counts for one composited layer.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct TileCounts {
    pub(crate) drawn: usize,
    pub(crate) missing: usize,
    /// Present but left no pixels: an empty image or destination.
    pub(crate) skipped: usize,
}

/// Where one cover cell lands on the device.
#[derive(Copy, Clone, Debug, PartialEq)]
pub(crate) struct Placement {
    pub(crate) x: u32,
    pub(crate) y: u32,
    pub(crate) index: TileIndex,
    /// World bounds of the whole tile.
    pub(crate) world: Rect,
    /// Device rectangle, integer edges, half-open.
    pub(crate) dst: Rect,
}

/// Device placement of every cell of `cover` that overlaps the view.
///
/// Cells come column by column from the west, each column from the south.
pub(crate) fn placements(cover: &TileCover<'_>, view: &View) -> Vec<Placement> {
    let bounds = view.bounds();
    let (ix, iy) = (view.iscale_x(), view.iscale_y());
    let height = f64::from(view.height());
    let mut out = Vec::new();

    let mut x_acc: Option<f64> = None;
    let mut left = 0.0;
    for x in 0..cover.width() {
        let column = cover.bounds_of(x, 0).intersect(bounds);
        if column.width() <= 0.0 {
            continue;
        }
        let acc = x_acc.get_or_insert_with(|| {
            let start = (column.x0 - bounds.x0) * ix;
            left = start.trunc();
            start
        });
        *acc += column.width() * ix;
        let right = acc.trunc();

        // Rows count pixels up from the bottom edge of the surface.
        let mut y_acc: Option<f64> = None;
        let mut lower = 0.0;
        for y in 0..cover.height() {
            let world = cover.bounds_of(x, y);
            let cell = world.intersect(bounds);
            if cell.height() <= 0.0 {
                continue;
            }
            let acc = y_acc.get_or_insert_with(|| {
                let start = (cell.y0 - bounds.y0) * iy;
                lower = start.trunc();
                start
            });
            *acc += cell.height() * iy;
            let upper = acc.trunc().min(height);
            out.push(Placement {
                x,
                y,
                index: cover.index(x, y),
                world,
                dst: Rect::new(left, height - upper, right, height - lower),
            });
            lower = upper;
        }
        left = right;
    }
    out
}

#[expect(clippy::cast_possible_truncation, reason = "clamped to 0..=u32::MAX first")]
fn whole_px(v: f64) -> u32 {
    v.clamp(0.0, f64::from(u32::MAX)) as u32
}

/// Draws raster layers onto a surface that carries the world transform.
pub(crate) struct RasterCompositor<'r, B: ImagingBackend + ?Sized> {
    pub(crate) surface: &'r mut B,
    pub(crate) pipeline: &'r TransformPipeline,
    pub(crate) view: &'r View,
}

impl<B: ImagingBackend + ?Sized> RasterCompositor<'_, B> {
    /// Covers the view with tiles from `source` and blits them.
    ///
    /// Missing, failed and undecodable tiles are skipped and counted. Every
    /// cell of the cover lands in exactly one of the counts.
    pub(crate) fn draw_tiles(
        &mut self,
        layer: &str,
        source: &dyn TileSource,
        opacity: f32,
    ) -> Result<TileCounts, RenderError> {
        let pyramid = TilePyramid::from_source(source).map_err(|source| RenderError::Tiles {
            layer: layer.to_owned(),
            source,
        })?;
        let view_bounds = self.view.bounds();
        let Some(mut cover) = pyramid.cover(view_bounds, self.view.width(), self.view.height())
        else {
            log::debug!("{layer}: view misses the tile set");
            return Ok(TileCounts::default());
        };
        cover.fill(source);
        let placements = placements(&cover, self.view);

        let mut px = self.pipeline.pixel_space(&mut *self.surface);
        let counts = px.with_opacity_layer(opacity, |s| {
            let mut counts = TileCounts::default();
            for p in &placements {
                let Some(tile) = cover.tile(p.x, p.y) else {
                    counts.missing += 1;
                    continue;
                };
                match blit_tile(s, tile, p, view_bounds) {
                    Ok(true) => counts.drawn += 1,
                    Ok(false) => {
                        log::trace!("{layer}: tile {} covers no pixels", p.index);
                        counts.skipped += 1;
                    }
                    Err(err) => {
                        log::warn!("{layer}: skipping tile {}: {err}", p.index);
                        counts.missing += 1;
                    }
                }
            }
            counts
        });
        log::debug!(
            "{layer}: z={} drew {} tiles, {} missing, {} skipped",
            cover.grid().z(),
            counts.drawn,
            counts.missing,
            counts.skipped
        );
        Ok(counts)
    }

    /// Reads the part of `source` inside the view and blits it once.
    ///
    /// Returns `false` when the source does not overlap the view.
    pub(crate) fn draw_raster(
        &mut self,
        layer: &str,
        source: &dyn RasterSource,
        opacity: f32,
    ) -> Result<bool, RenderError> {
        let failed = |source| RenderError::Source {
            layer: layer.to_owned(),
            source,
        };
        let area = source.bounds().intersect(self.view.bounds());
        if area.width() <= 0.0 || area.height() <= 0.0 {
            log::debug!("{layer}: raster misses the view");
            return Ok(false);
        }
        let dst = self.pipeline.to_device_rect(area).round();
        let (width, height) = (whole_px(dst.width()), whole_px(dst.height()));
        if width == 0 || height == 0 {
            return Ok(false);
        }
        let raster = source.read(area, width, height).map_err(failed)?;
        let desc = ImageDesc::rgba8(raster.width, raster.height);
        let pixels = raster.into_rgba8().map_err(failed)?;

        let mut px = self.pipeline.pixel_space(&mut *self.surface);
        px.with_opacity_layer(opacity, |s| {
            let image = s.create_image(desc, &pixels);
            s.draw(DrawOp::DrawImageRect {
                image,
                src: None,
                dst,
                sampler: ImageSampler::default(),
            });
            s.destroy_image(image);
        });
        log::trace!("{layer}: raster {width}x{height} at {dst:?}");
        Ok(true)
    }
}

/// Decodes `tile` and draws the part of it inside the view at `p.dst`.
fn blit_tile<B: ImagingBackend + ?Sized>(
    surface: &mut B,
    tile: &Tile,
    p: &Placement,
    view_bounds: Rect,
) -> Result<bool, TileError> {
    if p.dst.width() <= 0.0 || p.dst.height() <= 0.0 {
        return Ok(false);
    }
    let image = tile.decode()?;
    let Some(src) = clip_tile(p.world, view_bounds, image.width, image.height) else {
        return Ok(false);
    };
    if src.is_empty() {
        return Ok(false);
    }
    let id = surface.create_image(ImageDesc::rgba8(image.width, image.height), &image.pixels);
    surface.draw(DrawOp::DrawImageRect {
        image: id,
        src: Some(src.to_rect()),
        dst: p.dst,
        sampler: ImageSampler::default(),
    });
    surface.destroy_image(id);
    log::trace!("tile {} {src:?} -> {:?}", p.index, p.dst);
    Ok(true)
}
