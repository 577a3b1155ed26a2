// Copyright 2025 the Mapstory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Label collection, placement and drawing.
//!
//! Vector layers register a [`Label`] for every feature whose rule names
//! some text. Once every layer has drawn, the [`Labeller`] places the
//! labels first-come-first-served: each label tries its candidate
//! positions in order and takes the first one that stays on the device and
//! does not overlap a label already placed. Placed labels are then drawn in
//! pixel space, on top of everything else.

use std::rc::Rc;

use kurbo::{Affine, Point, Rect, Shape, Size, Stroke, Vec2};
use mapstory_imaging::{
    DrawOp, FillRule, ImagingBackend, ImagingBackendExt, PathDesc, StateOp,
};
use mapstory_text::TextShaper;
use peniko::Brush;

use crate::collision::CollisionGrid;
use crate::{LabelPaint, RenderOptions, RuleId};

/// Where a label attaches, in device pixels.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum LabelAnchor {
    /// Beside a marker centered at `at`, keeping clear of its half-size `offset`.
    Point {
        /// Marker center.
        at: Point,
        /// Half the marker's width and height.
        offset: Vec2,
    },
    /// Along a line, centered on `at` and rotated by `angle` radians.
    Line {
        /// Midpoint of the line.
        at: Point,
        /// Direction of the line at `at`, kept upright.
        angle: f64,
    },
    /// Centered inside a polygon.
    Polygon(Point),
}

/// A label waiting to be placed.
#[derive(Debug)]
pub struct Label<F> {
    /// Text to draw.
    pub text: String,
    /// Feature the label belongs to.
    pub feature: Rc<F>,
    /// Rule that produced the label.
    pub rule: RuleId,
    /// Attachment point.
    pub anchor: LabelAnchor,
    /// Paint.
    pub paint: LabelPaint,
}

/// Labels collected during one render pass, in registration order.
#[derive(Debug)]
pub struct Labels<F> {
    labels: Vec<Label<F>>,
}

impl<F> Default for Labels<F> {
    fn default() -> Self {
        Self { labels: Vec::new() }
    }
}

impl<F> Labels<F> {
    /// An empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a label. Earlier labels win placement conflicts.
    pub fn push(&mut self, label: Label<F>) {
        self.labels.push(label);
    }

    /// All labels, in registration order.
    #[must_use]
    pub fn all(&self) -> &[Label<F>] {
        &self.labels
    }

    /// Number of labels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Returns `true` if no label was registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// A label that found a free position.
#[derive(Clone, Debug, PartialEq)]
pub struct PlacedLabel {
    /// Position of the label in [`Labels::all`].
    pub label: usize,
    /// Size of the text box.
    pub size: Size,
    /// Maps the text box (origin top-left, y down) to device pixels.
    pub transform: Affine,
    /// Device-space bounding box of the text box.
    pub bounds: Rect,
}

/// Result of [`Labeller::layout`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LabelLayout {
    /// Placed labels, in registration order.
    pub placed: Vec<PlacedLabel>,
    /// Labels that found no free position.
    pub dropped: usize,
}

/// Places and draws labels for one render pass.
pub struct Labeller<'s> {
    shaper: Option<&'s dyn TextShaper>,
    device: Rect,
    padding: f64,
    grid: CollisionGrid,
}

impl core::fmt::Debug for Labeller<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Labeller")
            .field("shaper", &self.shaper.is_some())
            .field("device", &self.device)
            .field("padding", &self.padding)
            .field("placed", &self.grid.len())
            .finish()
    }
}

/// Size of text drawn without a text engine: a rough average glyph width.
fn estimate(text: &str, size: f64) -> Size {
    let chars = text.chars().filter(|c| !c.is_control()).count();
    #[expect(clippy::cast_precision_loss, reason = "label lengths are small")]
    let chars = chars as f64;
    Size::new(chars * size * 0.6, size * 1.2)
}

impl<'s> Labeller<'s> {
    /// A labeller for a surface covering `device`.
    #[must_use]
    pub fn new(device: Rect, options: &'s RenderOptions) -> Self {
        Self {
            shaper: options.label_text.as_deref(),
            device,
            padding: options.label_padding,
            grid: CollisionGrid::new(options.collision_cell),
        }
    }

    fn measure(&self, text: &str, size: f64) -> Size {
        match self.shaper {
            Some(shaper) => shaper.measure(text, size),
            None => estimate(text, size),
        }
    }

    /// Candidate text-box transforms for an anchor, in preference order.
    fn candidates(&self, anchor: LabelAnchor, size: Size) -> Vec<Affine> {
        let (w, h) = (size.width, size.height);
        match anchor {
            LabelAnchor::Point { at, offset } => {
                let gx = offset.x + self.padding;
                let gy = offset.y + self.padding;
                [
                    // right, above, left, below
                    (at.x + gx, at.y - h * 0.5),
                    (at.x - w * 0.5, at.y - gy - h),
                    (at.x - gx - w, at.y - h * 0.5),
                    (at.x - w * 0.5, at.y + gy),
                ]
                .into_iter()
                .map(|(x, y)| Affine::translate((x, y)))
                .collect()
            }
            LabelAnchor::Line { at, angle } => vec![
                Affine::translate(at.to_vec2())
                    * Affine::rotate(angle)
                    * Affine::translate((-w * 0.5, -h * 0.5)),
            ],
            LabelAnchor::Polygon(at) => vec![Affine::translate((at.x - w * 0.5, at.y - h * 0.5))],
        }
    }

    /// Places `labels` in registration order.
    pub fn layout<F>(&mut self, labels: &Labels<F>) -> LabelLayout {
        let mut out = LabelLayout::default();
        for (i, label) in labels.all().iter().enumerate() {
            let size = self.measure(&label.text, label.paint.size);
            if size.width <= 0.0 || size.height <= 0.0 {
                out.dropped += 1;
                continue;
            }
            let text_box = Rect::from_origin_size(Point::ORIGIN, size);
            let found = self.candidates(label.anchor, size).into_iter().find_map(|transform| {
                let bounds = transform.transform_rect_bbox(text_box);
                let on_device = self.device.contains(bounds.origin())
                    && bounds.x1 <= self.device.x1
                    && bounds.y1 <= self.device.y1;
                let padded = bounds.inflate(self.padding, self.padding);
                (on_device && !self.grid.collides(padded)).then_some((transform, bounds, padded))
            });
            match found {
                Some((transform, bounds, padded)) => {
                    self.grid.insert(padded);
                    out.placed.push(PlacedLabel {
                        label: i,
                        size,
                        transform,
                        bounds,
                    });
                }
                None => {
                    log::trace!("label {:?} dropped: no free position", label.text);
                    out.dropped += 1;
                }
            }
        }
        out
    }

    /// Draws placed labels: halo first, then the text fill.
    ///
    /// `surface` must already be in pixel space. Returns the number of
    /// labels drawn, which is zero without a text engine.
    pub fn render<F, B: ImagingBackend + ?Sized>(
        &self,
        surface: &mut B,
        labels: &Labels<F>,
        layout: &LabelLayout,
    ) -> usize {
        let Some(shaper) = self.shaper else {
            return 0;
        };
        let mut drawn = 0;
        for placed in &layout.placed {
            let Some(label) = labels.all().get(placed.label) else {
                continue;
            };
            let Some(mut outline) = shaper.outline(&label.text, label.paint.size) else {
                continue;
            };
            outline.apply_affine(placed.transform);
            let path = surface.create_path(PathDesc::from_bez_path(&outline.to_path(0.1)));

            if let Some(halo) = label.paint.halo.filter(|h| h.radius > 0.0) {
                surface.state(StateOp::SetStroke(
                    Stroke::new(halo.radius * 2.0).with_join(kurbo::Join::Round),
                ));
                surface.with_paint(Brush::Solid(halo.color), |s| {
                    s.draw(DrawOp::StrokePath(path));
                });
            }
            surface.state(StateOp::SetFillRule(FillRule::NonZero));
            surface.with_paint(Brush::Solid(label.paint.color), |s| {
                s.draw(DrawOp::FillPath(path));
            });
            surface.destroy_path(path);
            drawn += 1;
        }
        drawn
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;
    use std::sync::Arc;

    use kurbo::{BezPath, Point, Rect, Shape, Size, Vec2};
    use mapstory_imaging::DrawOp;
    use mapstory_imaging_ref::RefBackend;
    use mapstory_text::TextShaper;

    use super::{Label, LabelAnchor, Labeller, Labels};
    use crate::{Halo, LabelPaint, RenderOptions, RuleId};

    struct BoxShaper;

    impl TextShaper for BoxShaper {
        fn measure(&self, text: &str, size_px: f64) -> Size {
            Size::new(text.len() as f64 * size_px * 0.5, size_px)
        }

        fn outline(&self, text: &str, size_px: f64) -> Option<BezPath> {
            Some(Rect::from_origin_size(Point::ORIGIN, self.measure(text, size_px)).to_path(0.1))
        }
    }

    fn label(text: &str, anchor: LabelAnchor) -> Label<()> {
        Label {
            text: text.into(),
            feature: Rc::new(()),
            rule: RuleId(0),
            anchor,
            paint: LabelPaint {
                size: 10.0,
                ..LabelPaint::default()
            },
        }
    }

    fn options() -> RenderOptions {
        RenderOptions::default()
            .with_label_text(Arc::new(BoxShaper))
            .with_label_padding(0.0)
            .with_collision_cell(16.0)
    }

    #[test]
    fn first_come_first_served() {
        let opts = options();
        let mut labeller = Labeller::new(Rect::new(0.0, 0.0, 200.0, 200.0), &opts);
        let mut labels = Labels::new();
        labels.push(label("AAAA", LabelAnchor::Polygon(Point::new(100.0, 100.0))));
        labels.push(label("BBBB", LabelAnchor::Polygon(Point::new(105.0, 102.0))));
        labels.push(label("CCCC", LabelAnchor::Polygon(Point::new(20.0, 20.0))));

        let layout = labeller.layout(&labels);
        let placed: Vec<usize> = layout.placed.iter().map(|p| p.label).collect();
        assert_eq!(placed, [0, 2]);
        assert_eq!(layout.dropped, 1);
        assert_eq!(layout.placed[0].bounds, Rect::new(90.0, 95.0, 110.0, 105.0));
    }

    #[test]
    fn point_labels_fall_back_to_other_sides() {
        let opts = options();
        let mut labeller = Labeller::new(Rect::new(0.0, 0.0, 100.0, 100.0), &opts);
        let mut labels = Labels::new();
        let offset = Vec2::new(5.0, 5.0);
        // Too close to the right edge for the preferred right-hand position.
        labels.push(label(
            "EAST",
            LabelAnchor::Point {
                at: Point::new(90.0, 50.0),
                offset,
            },
        ));
        let layout = labeller.layout(&labels);
        assert_eq!(layout.placed.len(), 1);
        // Above: centered horizontally, bottom edge at the marker top.
        assert_eq!(layout.placed[0].bounds, Rect::new(80.0, 35.0, 100.0, 45.0));
    }

    #[test]
    fn labels_off_the_device_are_dropped() {
        let opts = options();
        let mut labeller = Labeller::new(Rect::new(0.0, 0.0, 50.0, 50.0), &opts);
        let mut labels = Labels::new();
        labels.push(label("FAR", LabelAnchor::Polygon(Point::new(200.0, 200.0))));
        let layout = labeller.layout(&labels);
        assert!(layout.placed.is_empty());
        assert_eq!(layout.dropped, 1);
    }

    #[test]
    fn line_labels_rotate_with_the_line() {
        let opts = options();
        let mut labeller = Labeller::new(Rect::new(0.0, 0.0, 100.0, 100.0), &opts);
        let mut labels = Labels::new();
        labels.push(label(
            "RD",
            LabelAnchor::Line {
                at: Point::new(50.0, 50.0),
                angle: core::f64::consts::FRAC_PI_2,
            },
        ));
        let layout = labeller.layout(&labels);
        let b = layout.placed[0].bounds;
        // A 10x10 box rotated a quarter turn stays 10x10 around the anchor.
        assert!((b.x0 - 45.0).abs() < 1e-9 && (b.y1 - 55.0).abs() < 1e-9);
    }

    #[test]
    fn render_draws_halo_before_fill_and_releases_resources() {
        let opts = options();
        let mut labeller = Labeller::new(Rect::new(0.0, 0.0, 100.0, 100.0), &opts);
        let mut labels = Labels::new();
        let mut l = label("HI", LabelAnchor::Polygon(Point::new(50.0, 50.0)));
        l.paint.halo = Some(Halo {
            color: peniko::Color::WHITE,
            radius: 1.5,
        });
        labels.push(l);
        let layout = labeller.layout(&labels);

        let mut surface = RefBackend::default();
        assert_eq!(labeller.render(&mut surface, &labels, &layout), 1);
        let draws: Vec<&DrawOp> = surface.draws().map(|(op, _)| op).collect();
        assert!(matches!(draws[..], [DrawOp::StrokePath(_), DrawOp::FillPath(_)]));
        assert_eq!(surface.live_resources(), 0);
    }

    #[test]
    fn without_shaper_labels_are_laid_out_but_not_drawn() {
        let opts = RenderOptions::default();
        let mut labeller = Labeller::new(Rect::new(0.0, 0.0, 100.0, 100.0), &opts);
        let mut labels = Labels::new();
        labels.push(label("X", LabelAnchor::Polygon(Point::new(50.0, 50.0))));
        let layout = labeller.layout(&labels);
        assert_eq!(layout.placed.len(), 1);
        let mut surface = RefBackend::default();
        assert_eq!(labeller.render(&mut surface, &labels, &layout), 0);
        assert!(surface.events().is_empty());
    }
}
