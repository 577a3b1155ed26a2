// Copyright 2025 the Mapstory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use alloc::vec::Vec;
#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;
use kurbo::{BezPath, Point};

use crate::{Geometry, Polygon};

/// One step of a [`CoordinatePath`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum PathStep {
    /// Start a new part at the given vertex.
    MoveTo(Point),
    /// Continue the current part to the given vertex.
    LineTo(Point),
    /// Close the current ring.
    Close,
}

#[derive(Copy, Clone, Debug)]
struct Part<'a> {
    points: &'a [Point],
    closed: bool,
}

/// Lazy walk over the vertices of a [`Geometry`], one sub-path per part.
///
/// Points and multi-points emit a single [`PathStep::MoveTo`] per position.
/// Lines emit `MoveTo` followed by `LineTo`s; polygon rings additionally end
/// with [`PathStep::Close`]. Collections walk their members in order.
///
/// With [`CoordinatePath::generalize`], a vertex is dropped when it lies
/// within `dx` horizontally *and* `dy` vertically of the last emitted vertex
/// of the same part. The first vertex of a part always starts it and the
/// last vertex of a line or ring is always emitted, so a part never
/// collapses below its end points.
#[derive(Clone, Debug)]
pub struct CoordinatePath<'a> {
    parts: Vec<Part<'a>>,
    tolerance: Option<(f64, f64)>,
    part: usize,
    vertex: usize,
    last: Option<Point>,
}

fn push_polygon<'a>(parts: &mut Vec<Part<'a>>, poly: &'a Polygon) {
    parts.extend(poly.rings().map(|points| Part {
        points,
        closed: true,
    }));
}

fn collect_parts<'a>(parts: &mut Vec<Part<'a>>, geom: &'a Geometry) {
    match geom {
        Geometry::Point(pt) => parts.push(Part {
            points: core::slice::from_ref(pt),
            closed: false,
        }),
        Geometry::MultiPoint(pts) => parts.extend(pts.iter().map(|pt| Part {
            points: core::slice::from_ref(pt),
            closed: false,
        })),
        Geometry::LineString(pts) => parts.push(Part {
            points: pts,
            closed: false,
        }),
        Geometry::MultiLineString(lines) => parts.extend(lines.iter().map(|points| Part {
            points,
            closed: false,
        })),
        Geometry::Polygon(poly) => push_polygon(parts, poly),
        Geometry::MultiPolygon(polys) => {
            for poly in polys {
                push_polygon(parts, poly);
            }
        }
        Geometry::Collection(members) => {
            for member in members {
                collect_parts(parts, member);
            }
        }
    }
}

impl<'a> CoordinatePath<'a> {
    /// Walks every vertex of `geom`.
    #[must_use]
    pub fn new(geom: &'a Geometry) -> Self {
        let mut parts = Vec::new();
        collect_parts(&mut parts, geom);
        parts.retain(|p| !p.points.is_empty());
        Self {
            parts,
            tolerance: None,
            part: 0,
            vertex: 0,
            last: None,
        }
    }

    /// Drops vertices closer than `dx` × `dy` to the last emitted vertex.
    ///
    /// Pass the view's per-pixel world scales to generalize to pixel
    /// resolution. The walk restarts from the beginning.
    #[must_use]
    pub fn generalize(mut self, dx: f64, dy: f64) -> Self {
        self.tolerance = Some((dx.abs(), dy.abs()));
        self.reset();
        self
    }

    /// Restarts the walk from the first vertex.
    pub fn reset(&mut self) {
        self.part = 0;
        self.vertex = 0;
        self.last = None;
    }

    /// Number of parts (sub-paths) the walk will produce.
    #[must_use]
    pub fn part_count(&self) -> usize {
        self.parts.len()
    }

    /// The emitted vertices of the remaining walk, without sub-path structure.
    pub fn coordinates(&self) -> impl Iterator<Item = Point> + 'a {
        self.clone().filter_map(|step| match step {
            PathStep::MoveTo(pt) | PathStep::LineTo(pt) => Some(pt),
            PathStep::Close => None,
        })
    }

    /// The emitted vertices of the remaining walk, grouped per part.
    #[must_use]
    pub fn sub_paths(&self) -> Vec<Vec<Point>> {
        let mut out: Vec<Vec<Point>> = Vec::new();
        for step in self.clone() {
            match step {
                PathStep::MoveTo(pt) => out.push(alloc::vec![pt]),
                PathStep::LineTo(pt) => {
                    if let Some(current) = out.last_mut() {
                        current.push(pt);
                    }
                }
                PathStep::Close => {}
            }
        }
        out
    }

    /// Builds a [`BezPath`] from the remaining walk.
    #[must_use]
    pub fn to_bez_path(&self) -> BezPath {
        let mut path = BezPath::new();
        for step in self.clone() {
            match step {
                PathStep::MoveTo(pt) => path.move_to(pt),
                PathStep::LineTo(pt) => path.line_to(pt),
                PathStep::Close => path.close_path(),
            }
        }
        path
    }

    fn skips(&self, pt: Point, last: Point) -> bool {
        match self.tolerance {
            Some((dx, dy)) => (pt.x - last.x).abs() <= dx && (pt.y - last.y).abs() <= dy,
            None => false,
        }
    }
}

impl Iterator for CoordinatePath<'_> {
    type Item = PathStep;

    fn next(&mut self) -> Option<PathStep> {
        loop {
            let part = *self.parts.get(self.part)?;
            let Some(&pt) = part.points.get(self.vertex) else {
                self.part += 1;
                self.vertex = 0;
                self.last = None;
                if part.closed {
                    return Some(PathStep::Close);
                }
                continue;
            };
            self.vertex += 1;

            let Some(last) = self.last else {
                self.last = Some(pt);
                return Some(PathStep::MoveTo(pt));
            };
            let is_final = self.vertex == part.points.len();
            if !is_final && self.skips(pt, last) {
                continue;
            }
            self.last = Some(pt);
            return Some(PathStep::LineTo(pt));
        }
    }
}
