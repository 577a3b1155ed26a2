// Copyright 2025 the Mapstory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Styled drawing of vector features.
//!
//! Every feature is drawn once per rule, in rule order. Geometry is
//! generalized to the view's pixel resolution before it reaches the
//! surface. Polygon fills are drawn in world space under the view
//! transform. Markers and strokes are drawn in pixel space, so marker sizes
//! and line widths stay in pixels at any zoom level and on views whose two
//! axes have different scales.

use std::rc::Rc;

use kurbo::{BezPath, Cap, Join, Point, Rect, Stroke, Vec2};
use mapstory_geom::{CoordinatePath, Geometry, GeometryKind, anchor};
use mapstory_imaging::{DrawOp, FillRule, ImagingBackend, ImagingBackendExt, PathDesc, StateOp};
use mapstory_view::{TransformPipeline, View};
use peniko::{Brush, Color};

use crate::label::{Label, LabelAnchor, Labels};
use crate::style::Resolved;
use crate::{
    FeatureSource, Halo, LabelPaint, Property, RenderError, RenderOptions, RuleId, StyleEvaluator,
};

/// Draws the features of vector layers and collects their labels.
pub(crate) struct VectorRenderer<'r, B: ImagingBackend + ?Sized, F> {
    pub(crate) surface: &'r mut B,
    pub(crate) pipeline: &'r TransformPipeline,
    pub(crate) view: &'r View,
    pub(crate) options: &'r RenderOptions,
    pub(crate) style: &'r dyn StyleEvaluator<F>,
    pub(crate) labels: &'r mut Labels<F>,
}

impl<B: ImagingBackend + ?Sized, F> VectorRenderer<'_, B, F> {
    /// Queries `source` for the view and draws every feature it yields.
    ///
    /// Returns the number of features drawn. A failing query or feature
    /// aborts the layer; what was drawn before the failure stays.
    pub(crate) fn draw_layer(
        &mut self,
        layer: &str,
        source: &dyn FeatureSource<F>,
        rules: &[RuleId],
    ) -> Result<usize, RenderError> {
        let failed = |source| RenderError::Source {
            layer: layer.to_owned(),
            source,
        };
        let features = source.query(self.view.bounds()).map_err(failed)?;
        let mut drawn = 0;
        for item in features {
            let (feature, geometry) = item.map_err(failed)?;
            self.draw_feature(&Rc::new(feature), &geometry, rules);
            drawn += 1;
        }
        Ok(drawn)
    }

    /// Draws one feature under each rule that applies to it.
    pub(crate) fn draw_feature(&mut self, feature: &Rc<F>, geometry: &Geometry, rules: &[RuleId]) {
        if geometry.is_empty() {
            return;
        }
        for &rule in rules {
            if !self.style.applies(feature, rule) {
                continue;
            }
            let paint = Resolved::new(self.style, Some(feature.as_ref()), rule);
            self.draw_geometry(&paint, geometry);
            self.register_label(feature, rule, &paint, geometry);
        }
    }

    fn draw_geometry(&mut self, paint: &Resolved<'_, F>, geometry: &Geometry) {
        match (geometry.kind(), geometry) {
            (GeometryKind::Collection, Geometry::Collection(members)) => {
                for member in members {
                    self.draw_geometry(paint, member);
                }
            }
            (GeometryKind::Point, _) => self.draw_markers(paint, geometry),
            (GeometryKind::Line, _) => self.draw_line(paint, geometry),
            (GeometryKind::Polygon, _) => self.draw_polygon(paint, geometry),
            (GeometryKind::Collection, _) => {}
        }
    }

    fn generalized<'g>(&self, geometry: &'g Geometry) -> CoordinatePath<'g> {
        CoordinatePath::new(geometry).generalize(self.view.scale_x(), self.view.scale_y())
    }

    fn marker_size(&self, paint: &Resolved<'_, F>) -> (f64, f64) {
        let width = paint
            .number(Property::MarkerWidth)
            .filter(|w| *w > 0.0)
            .unwrap_or(self.options.default_marker_size);
        let height = paint
            .number(Property::MarkerHeight)
            .filter(|h| *h > 0.0)
            .unwrap_or(width);
        (width, height)
    }

    fn draw_markers(&mut self, paint: &Resolved<'_, F>, geometry: &Geometry) {
        let fill = paint.color_with_opacity(Property::MarkerFill, Property::MarkerFillOpacity);
        let line = paint.color_with_opacity(Property::MarkerLineColor, Property::MarkerLineOpacity);
        if fill.is_none() && line.is_none() {
            return;
        }
        let size = self.marker_size(paint);
        let ovals: Vec<Rect> = self
            .generalized(geometry)
            .coordinates()
            .map(|pt| Rect::from_center_size(self.pipeline.to_device(pt), size))
            .collect();

        let mut px = self.pipeline.pixel_space(&mut *self.surface);
        if let Some(color) = fill {
            px.with_paint(Brush::Solid(color), |s| {
                for oval in &ovals {
                    s.draw(DrawOp::FillOval(*oval));
                }
            });
        }
        if let Some(color) = line {
            let width = paint
                .number(Property::MarkerLineWidth)
                .filter(|w| *w > 0.0)
                .unwrap_or(1.0);
            px.state(StateOp::SetStroke(Stroke::new(width)));
            px.with_paint(Brush::Solid(color), |s| {
                for oval in &ovals {
                    s.draw(DrawOp::StrokeOval(*oval));
                }
            });
        }
    }

    /// Pixel-space stroke for the rule's line width.
    fn line_stroke(paint: &Resolved<'_, F>) -> Option<(Color, Stroke)> {
        let color = paint.color_with_opacity(Property::LineColor, Property::LineOpacity)?;
        let px = paint
            .number(Property::LineWidth)
            .filter(|w| *w > 0.0)
            .unwrap_or(1.0);
        let stroke = Stroke::new(px).with_caps(Cap::Round).with_join(Join::Round);
        Some((color, stroke))
    }

    /// Strokes a world-space path on the pixel grid.
    fn stroke_path(&mut self, path: &BezPath, color: Color, stroke: Stroke) {
        let mut device = path.clone();
        device.apply_affine(self.pipeline.world_to_device());
        let mut px = self.pipeline.pixel_space(&mut *self.surface);
        let id = px.create_path(PathDesc::from_bez_path(&device));
        px.state(StateOp::SetStroke(stroke));
        px.with_paint(Brush::Solid(color), |s| {
            s.draw(DrawOp::StrokePath(id));
        });
        px.destroy_path(id);
    }

    fn draw_line(&mut self, paint: &Resolved<'_, F>, geometry: &Geometry) {
        let Some((color, stroke)) = Self::line_stroke(paint) else {
            return;
        };
        let path = self.generalized(geometry).to_bez_path();
        if path.elements().len() > 1 {
            self.stroke_path(&path, color, stroke);
        }
    }

    fn draw_polygon(&mut self, paint: &Resolved<'_, F>, geometry: &Geometry) {
        let fill = paint.color_with_opacity(Property::PolygonFill, Property::PolygonOpacity);
        let line = Self::line_stroke(paint);
        if fill.is_none() && line.is_none() {
            return;
        }
        let path = self.generalized(geometry).to_bez_path();
        if let Some(color) = fill {
            let id = self.surface.create_path(PathDesc::from_bez_path(&path));
            self.surface.state(StateOp::SetFillRule(FillRule::EvenOdd));
            self.surface.with_paint(Brush::Solid(color), |s| {
                s.draw(DrawOp::FillPath(id));
            });
            self.surface.destroy_path(id);
        }
        if let Some((color, stroke)) = line {
            self.stroke_path(&path, color, stroke);
        }
    }

    fn label_paint(&self, paint: &Resolved<'_, F>) -> LabelPaint {
        let defaults = self.options.label_defaults;
        let halo = match paint.color(Property::TextHaloFill) {
            Some(color) => {
                let radius = paint
                    .number(Property::TextHaloRadius)
                    .or(defaults.halo.map(|h| h.radius))
                    .unwrap_or(1.0);
                Some(Halo { color, radius })
            }
            None => defaults.halo,
        };
        LabelPaint {
            color: paint.color(Property::TextFill).unwrap_or(defaults.color),
            size: paint
                .number(Property::TextSize)
                .filter(|s| *s > 0.0)
                .unwrap_or(defaults.size),
            halo,
        }
    }

    /// Device-space parts of the generalized geometry.
    fn device_parts(&self, geometry: &Geometry) -> Vec<Vec<Point>> {
        self.generalized(geometry)
            .sub_paths()
            .into_iter()
            .map(|part| part.into_iter().map(|pt| self.pipeline.to_device(pt)).collect())
            .collect()
    }

    /// Anchor for a label, from the visible part of the generalized geometry
    /// that was drawn.
    fn label_anchor(&self, paint: &Resolved<'_, F>, geometry: &Geometry) -> Option<LabelAnchor> {
        let device = self.view.device_rect();
        match geometry.kind() {
            GeometryKind::Point => {
                let at = self
                    .generalized(geometry)
                    .coordinates()
                    .map(|pt| self.pipeline.to_device(pt))
                    .find(|at| device.contains(*at))?;
                Some(self.point_anchor(paint, at))
            }
            GeometryKind::Line => {
                // Longest visible run.
                let run = self
                    .device_parts(geometry)
                    .iter()
                    .flat_map(|part| anchor::clip_polyline(part, device))
                    .max_by(|a, b| polyline_length(a).total_cmp(&polyline_length(b)))?;
                let (at, angle) = anchor::line_midpoint(&run)?;
                Some(LabelAnchor::Line { at, angle })
            }
            GeometryKind::Polygon => {
                let rings: Vec<Vec<Point>> = self
                    .device_parts(geometry)
                    .iter()
                    .map(|ring| anchor::clip_ring(ring, device))
                    .collect();
                let ring = anchor::largest_ring(rings.iter().map(Vec::as_slice))?;
                Some(LabelAnchor::Polygon(anchor::ring_centroid(ring)?))
            }
            GeometryKind::Collection => match geometry {
                Geometry::Collection(members) => {
                    members.iter().find_map(|m| self.label_anchor(paint, m))
                }
                _ => None,
            },
        }
    }

    fn point_anchor(&self, paint: &Resolved<'_, F>, at: Point) -> LabelAnchor {
        let (w, h) = self.marker_size(paint);
        LabelAnchor::Point {
            at,
            offset: Vec2::new(w * 0.5, h * 0.5),
        }
    }

    fn register_label(
        &mut self,
        feature: &Rc<F>,
        rule: RuleId,
        paint: &Resolved<'_, F>,
        geometry: &Geometry,
    ) {
        let Some(text) = paint.text(Property::TextName) else {
            return;
        };
        if text.trim().is_empty() {
            return;
        }
        let Some(anchor) = self.label_anchor(paint, geometry) else {
            return;
        };
        let paint = self.label_paint(paint);
        self.labels.push(Label {
            text,
            feature: Rc::clone(feature),
            rule,
            anchor,
            paint,
        });
    }
}

fn polyline_length(line: &[Point]) -> f64 {
    line.windows(2).map(|w| w[0].distance(w[1])).sum()
}
