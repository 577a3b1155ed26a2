// Copyright 2025 the Mapstory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use kurbo::Rect;
use mapstory_imaging::{DrawOp, ImagingBackend, ImagingBackendExt};
use mapstory_view::{TransformPipeline, View};
use peniko::Brush;

use crate::label::{Labeller, Labels};
use crate::raster::RasterCompositor;
use crate::style::{collapsed, unit_f32};
use crate::vector::VectorRenderer;
use crate::{Layer, LayerSource, Map, Property, RenderError, RenderOptions, StyleValue};

/// What one [`Renderer::render`] call managed to draw.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// Layers drawn to completion.
    pub layers_drawn: usize,
    /// Layers aborted by an error.
    pub layers_failed: usize,
    /// Vector features drawn.
    pub features_drawn: usize,
    /// Tiles blitted.
    pub tiles_drawn: usize,
    /// Covered tiles that were absent, failed to fetch or failed to decode.
    pub tiles_missing: usize,
    /// Covered tiles that were present but left no pixels.
    pub tiles_skipped: usize,
    /// Labels that found a position.
    pub labels_placed: usize,
    /// Labels dropped for lack of space.
    pub labels_dropped: usize,
}

/// Draws [`Map`]s onto a surface for one [`View`].
///
/// The renderer owns the surface from [`Renderer::init`] until
/// [`Renderer::close`] hands it back. Between render calls the surface
/// carries the view's world→device transform.
#[derive(Debug)]
pub struct Renderer<B: ImagingBackend> {
    surface: B,
    view: View,
    pipeline: TransformPipeline,
    options: RenderOptions,
}

impl<B: ImagingBackend> Renderer<B> {
    /// Takes over `surface` to draw `view`.
    ///
    /// # Errors
    ///
    /// Fails when an option is out of range.
    pub fn init(mut surface: B, view: View, options: RenderOptions) -> Result<Self, RenderError> {
        options.validate()?;
        let pipeline = TransformPipeline::new(&view);
        pipeline.apply(&mut surface);
        log::debug!(
            "renderer: {}x{} px over {:?}",
            view.width(),
            view.height(),
            view.bounds()
        );
        Ok(Self {
            surface,
            view,
            pipeline,
            options,
        })
    }

    /// The view being drawn.
    #[must_use]
    pub fn view(&self) -> &View {
        &self.view
    }

    /// The view's transforms.
    #[must_use]
    pub fn pipeline(&self) -> &TransformPipeline {
        &self.pipeline
    }

    /// The surface.
    #[must_use]
    pub fn surface(&self) -> &B {
        &self.surface
    }

    /// Draws the background, every visible layer bottom to top, then labels.
    ///
    /// A failing layer is logged and skipped; the others still draw.
    pub fn render<F>(&mut self, map: &Map<'_, F>) -> RenderStats {
        let mut stats = RenderStats::default();
        let mut labels = Labels::new();

        if let Some(color) = self.options.background {
            let device = self.view.device_rect();
            let mut px = self.pipeline.pixel_space(&mut self.surface);
            px.with_paint(Brush::Solid(color), |s| s.draw(DrawOp::FillRect(device)));
        }

        for layer in map.layers.iter().filter(|l| l.visible) {
            log::debug!("layer {}: begin", layer.name);
            match self.draw_layer(map, layer, &mut labels, &mut stats) {
                Ok(()) => {
                    stats.layers_drawn += 1;
                    log::debug!("layer {}: end", layer.name);
                }
                Err(err) => {
                    stats.layers_failed += 1;
                    log::error!("{err}");
                }
            }
        }

        self.draw_labels(&labels, &mut stats);
        stats
    }

    fn draw_layer<F>(
        &mut self,
        map: &Map<'_, F>,
        layer: &Layer<'_, F>,
        labels: &mut Labels<F>,
        stats: &mut RenderStats,
    ) -> Result<(), RenderError> {
        match layer.source {
            LayerSource::Vector(source) => {
                let mut vector = VectorRenderer {
                    surface: &mut self.surface,
                    pipeline: &self.pipeline,
                    view: &self.view,
                    options: &self.options,
                    style: map.style,
                    labels,
                };
                stats.features_drawn += vector.draw_layer(&layer.name, source, &layer.rules)?;
            }
            LayerSource::Tiles(source) => {
                let opacity = raster_opacity(map, layer);
                let counts = self.compositor().draw_tiles(&layer.name, source, opacity)?;
                stats.tiles_drawn += counts.drawn;
                stats.tiles_missing += counts.missing;
                stats.tiles_skipped += counts.skipped;
            }
            LayerSource::Raster(source) => {
                let opacity = raster_opacity(map, layer);
                self.compositor()
                    .draw_raster(&layer.name, source, opacity)?;
            }
        }
        Ok(())
    }

    fn compositor(&mut self) -> RasterCompositor<'_, B> {
        RasterCompositor {
            surface: &mut self.surface,
            pipeline: &self.pipeline,
            view: &self.view,
        }
    }

    fn draw_labels<F>(&mut self, labels: &Labels<F>, stats: &mut RenderStats) {
        if labels.is_empty() {
            return;
        }
        let device: Rect = self.view.device_rect();
        let mut labeller = Labeller::new(device, &self.options);
        let layout = labeller.layout(labels);
        stats.labels_placed = layout.placed.len();
        stats.labels_dropped = layout.dropped;

        let mut px = self.pipeline.pixel_space(&mut self.surface);
        let drawn = labeller.render(&mut *px, labels, &layout);
        if drawn == 0 && !layout.placed.is_empty() && self.options.label_text.is_none() {
            log::warn!(
                "{} labels placed but not drawn: no text engine configured",
                layout.placed.len()
            );
        }
    }

    /// Ends rendering and hands the surface back.
    pub fn close(self) -> B {
        self.surface
    }
}

fn raster_opacity<F>(map: &Map<'_, F>, layer: &Layer<'_, F>) -> f32 {
    match collapsed(map.style, &layer.rules, Property::RasterOpacity) {
        Some(StyleValue::Number(o)) if o.is_finite() => unit_f32(o),
        _ => 1.0,
    }
}
