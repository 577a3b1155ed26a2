// Copyright 2025 the Mapstory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use alloc::vec::Vec;
use kurbo::{Point, Rect};

/// A polygon: one exterior ring and any number of holes.
///
/// Rings are stored open or closed; a closing vertex equal to the first is
/// allowed but not required.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Polygon {
    /// Exterior ring.
    pub exterior: Vec<Point>,
    /// Interior rings (holes).
    pub interiors: Vec<Vec<Point>>,
}

impl Polygon {
    /// A polygon without holes.
    #[must_use]
    pub fn new(exterior: Vec<Point>) -> Self {
        Self {
            exterior,
            interiors: Vec::new(),
        }
    }

    /// Adds a hole.
    #[must_use]
    pub fn with_interior(mut self, ring: Vec<Point>) -> Self {
        self.interiors.push(ring);
        self
    }

    /// All rings, exterior first.
    pub fn rings(&self) -> impl Iterator<Item = &[Point]> + '_ {
        core::iter::once(self.exterior.as_slice()).chain(self.interiors.iter().map(Vec::as_slice))
    }
}

/// Broad drawing category of a geometry.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum GeometryKind {
    /// Drawn as markers.
    Point,
    /// Drawn as a stroked path.
    Line,
    /// Drawn as a filled and stroked path.
    Polygon,
    /// A heterogeneous collection; each member is drawn by its own kind.
    Collection,
}

/// Feature geometry in world coordinates.
#[derive(Clone, Debug, PartialEq)]
pub enum Geometry {
    /// A single position.
    Point(Point),
    /// An open polyline.
    LineString(Vec<Point>),
    /// A polygon with optional holes.
    Polygon(Polygon),
    /// Several positions.
    MultiPoint(Vec<Point>),
    /// Several polylines.
    MultiLineString(Vec<Vec<Point>>),
    /// Several polygons.
    MultiPolygon(Vec<Polygon>),
    /// Any mix of the above.
    Collection(Vec<Self>),
}

impl Geometry {
    /// The drawing category of this geometry.
    #[must_use]
    pub fn kind(&self) -> GeometryKind {
        match self {
            Self::Point(_) | Self::MultiPoint(_) => GeometryKind::Point,
            Self::LineString(_) | Self::MultiLineString(_) => GeometryKind::Line,
            Self::Polygon(_) | Self::MultiPolygon(_) => GeometryKind::Polygon,
            Self::Collection(_) => GeometryKind::Collection,
        }
    }

    /// Returns `true` if the geometry has no vertices at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Point(_) => false,
            Self::LineString(pts) | Self::MultiPoint(pts) => pts.is_empty(),
            Self::Polygon(poly) => poly.exterior.is_empty(),
            Self::MultiLineString(lines) => lines.iter().all(Vec::is_empty),
            Self::MultiPolygon(polys) => polys.iter().all(|p| p.exterior.is_empty()),
            Self::Collection(members) => members.iter().all(Self::is_empty),
        }
    }

    /// Bounding box of all vertices, or `None` for an empty geometry.
    #[must_use]
    pub fn bounds(&self) -> Option<Rect> {
        let mut bounds: Option<Rect> = None;
        self.for_each_vertex(&mut |pt| {
            bounds = Some(match bounds {
                Some(r) => r.union_pt(pt),
                None => Rect::from_points(pt, pt),
            });
        });
        bounds
    }

    fn for_each_vertex(&self, f: &mut impl FnMut(Point)) {
        match self {
            Self::Point(pt) => f(*pt),
            Self::LineString(pts) | Self::MultiPoint(pts) => pts.iter().copied().for_each(f),
            Self::Polygon(poly) => poly.rings().flatten().copied().for_each(f),
            Self::MultiLineString(lines) => lines.iter().flatten().copied().for_each(f),
            Self::MultiPolygon(polys) => polys
                .iter()
                .flat_map(Polygon::rings)
                .flatten()
                .copied()
                .for_each(f),
            Self::Collection(members) => {
                for member in members {
                    member.for_each_vertex(f);
                }
            }
        }
    }
}
