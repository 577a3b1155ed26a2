// Copyright 2025 the Mapstory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Label anchor helpers.
//!
//! These work on plain vertex slices so they can be fed the device-space
//! vertices of a generalized geometry, i.e. exactly what was drawn. The
//! clipping helpers cut those vertices to the visible surface first.

use alloc::vec::Vec;
use core::f64::consts::{FRAC_PI_2, PI};
#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;
use kurbo::{Point, Rect};

/// Signed shoelace area of a ring. Open and closed rings give the same result.
#[must_use]
pub fn ring_area(ring: &[Point]) -> f64 {
    let n = ring.len();
    if n < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..n {
        let a = ring[i];
        let b = ring[(i + 1) % n];
        sum += a.x * b.y - b.x * a.y;
    }
    sum * 0.5
}

/// Area-weighted centroid of a ring.
///
/// Degenerate rings (no area) fall back to the center of their bounding
/// box. Returns `None` for an empty ring.
#[must_use]
pub fn ring_centroid(ring: &[Point]) -> Option<Point> {
    let first = *ring.first()?;
    let area = ring_area(ring);
    if area.abs() <= f64::EPSILON {
        let bbox = ring
            .iter()
            .fold(Rect::from_points(first, first), |r, &p| r.union_pt(p));
        return Some(bbox.center());
    }
    let n = ring.len();
    let (mut cx, mut cy) = (0.0, 0.0);
    for i in 0..n {
        // Relative to the first vertex to keep large world coordinates precise.
        let a = ring[i] - first;
        let b = ring[(i + 1) % n] - first;
        let cross = a.x * b.y - b.x * a.y;
        cx += (a.x + b.x) * cross;
        cy += (a.y + b.y) * cross;
    }
    let k = 1.0 / (6.0 * area);
    Some(Point::new(first.x + cx * k, first.y + cy * k))
}

/// The ring with the largest absolute area.
#[must_use]
pub fn largest_ring<'a>(rings: impl IntoIterator<Item = &'a [Point]>) -> Option<&'a [Point]> {
    rings
        .into_iter()
        .filter(|r| !r.is_empty())
        .map(|r| (ring_area(r).abs(), r))
        .fold(None, |best: Option<(f64, &'a [Point])>, (area, r)| match best {
            Some((best_area, _)) if best_area >= area => best,
            _ => Some((area, r)),
        })
        .map(|(_, r)| r)
}

/// Point halfway along a polyline and the direction of the segment it lies on.
///
/// The angle is in radians, normalized to `(-π/2, π/2]` so text placed along
/// it never reads upside down. A single-vertex line yields that vertex and
/// angle zero.
#[must_use]
pub fn line_midpoint(line: &[Point]) -> Option<(Point, f64)> {
    let first = *line.first()?;
    let total: f64 = line.windows(2).map(|w| w[0].distance(w[1])).sum();
    if total <= 0.0 {
        return Some((first, 0.0));
    }
    let mut remaining = total * 0.5;
    for w in line.windows(2) {
        let (a, b) = (w[0], w[1]);
        let len = a.distance(b);
        if len <= 0.0 {
            continue;
        }
        if remaining <= len {
            let pt = a.lerp(b, remaining / len);
            return Some((pt, upright(b - a)));
        }
        remaining -= len;
    }
    let n = line.len();
    Some((line[n - 1], upright(line[n - 1] - line[n - 2])))
}

/// The runs of a polyline that lie inside `rect`.
///
/// Each run is a connected piece of the line with its end points cut at the
/// rectangle's edges. A line that leaves and re-enters yields several runs.
#[must_use]
pub fn clip_polyline(line: &[Point], rect: Rect) -> Vec<Vec<Point>> {
    let mut runs = Vec::new();
    if let [only] = line {
        if inside(rect, *only) {
            runs.push(alloc::vec![*only]);
        }
        return runs;
    }
    let mut run: Vec<Point> = Vec::new();
    for w in line.windows(2) {
        match clip_segment(w[0], w[1], rect) {
            Some((a, b)) => {
                if run.last() != Some(&a) && !run.is_empty() {
                    runs.push(core::mem::take(&mut run));
                }
                if run.is_empty() {
                    run.push(a);
                }
                run.push(b);
            }
            None if !run.is_empty() => runs.push(core::mem::take(&mut run)),
            None => {}
        }
    }
    if !run.is_empty() {
        runs.push(run);
    }
    runs
}

/// The part of a ring inside `rect`, as a single ring.
///
/// Empty when the ring misses the rectangle.
#[must_use]
pub fn clip_ring(ring: &[Point], rect: Rect) -> Vec<Point> {
    let mut out = ring.to_vec();
    for edge in [Edge::West, Edge::East, Edge::South, Edge::North] {
        let input = core::mem::take(&mut out);
        let Some(&last) = input.last() else {
            break;
        };
        let mut prev = last;
        for &p in &input {
            match (edge.keeps(rect, prev), edge.keeps(rect, p)) {
                (true, true) => out.push(p),
                (true, false) => out.push(edge.cross(rect, prev, p)),
                (false, true) => {
                    out.push(edge.cross(rect, prev, p));
                    out.push(p);
                }
                (false, false) => {}
            }
            prev = p;
        }
    }
    out
}

fn inside(rect: Rect, p: Point) -> bool {
    (rect.x0..=rect.x1).contains(&p.x) && (rect.y0..=rect.y1).contains(&p.y)
}

/// Liang-Barsky. End points inside the rectangle are returned unchanged.
fn clip_segment(a: Point, b: Point, rect: Rect) -> Option<(Point, Point)> {
    let d = b - a;
    let (mut t0, mut t1) = (0.0_f64, 1.0_f64);
    for (p, q) in [
        (-d.x, a.x - rect.x0),
        (d.x, rect.x1 - a.x),
        (-d.y, a.y - rect.y0),
        (d.y, rect.y1 - a.y),
    ] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let t = q / p;
        if p < 0.0 {
            if t > t1 {
                return None;
            }
            t0 = t0.max(t);
        } else {
            if t < t0 {
                return None;
            }
            t1 = t1.min(t);
        }
    }
    let start = if t0 > 0.0 { a + d * t0 } else { a };
    let end = if t1 < 1.0 { a + d * t1 } else { b };
    Some((start, end))
}

#[derive(Copy, Clone)]
enum Edge {
    West,
    East,
    South,
    North,
}

impl Edge {
    fn keeps(self, rect: Rect, p: Point) -> bool {
        match self {
            Self::West => p.x >= rect.x0,
            Self::East => p.x <= rect.x1,
            Self::South => p.y >= rect.y0,
            Self::North => p.y <= rect.y1,
        }
    }

    /// Where `a → b` crosses this edge; one end must be on each side.
    fn cross(self, rect: Rect, a: Point, b: Point) -> Point {
        let t = match self {
            Self::West => (rect.x0 - a.x) / (b.x - a.x),
            Self::East => (rect.x1 - a.x) / (b.x - a.x),
            Self::South => (rect.y0 - a.y) / (b.y - a.y),
            Self::North => (rect.y1 - a.y) / (b.y - a.y),
        };
        a.lerp(b, t)
    }
}

fn upright(dir: kurbo::Vec2) -> f64 {
    let mut angle = dir.y.atan2(dir.x);
    if angle > FRAC_PI_2 {
        angle -= PI;
    } else if angle <= -FRAC_PI_2 {
        angle += PI;
    }
    angle
}

#[cfg(test)]
mod tests {
    use alloc::vec;
    use core::f64::consts::FRAC_PI_4;
    use kurbo::{Point, Rect};

    use super::{
        clip_polyline, clip_ring, largest_ring, line_midpoint, ring_area, ring_centroid,
    };

    fn square(x: f64, y: f64, s: f64) -> [Point; 4] {
        [
            Point::new(x, y),
            Point::new(x + s, y),
            Point::new(x + s, y + s),
            Point::new(x, y + s),
        ]
    }

    #[test]
    fn square_area_and_centroid() {
        let sq = square(1.0e6, 2.0e6, 10.0);
        assert_eq!(ring_area(&sq), 100.0);
        let c = ring_centroid(&sq).unwrap();
        assert!((c.x - (1.0e6 + 5.0)).abs() < 1e-6);
        assert!((c.y - (2.0e6 + 5.0)).abs() < 1e-6);
    }

    #[test]
    fn centroid_is_area_weighted() {
        // An L shape: the centroid is pulled toward the heavier arm.
        let l = [
            Point::new(0.0, 0.0),
            Point::new(4.0, 0.0),
            Point::new(4.0, 1.0),
            Point::new(1.0, 1.0),
            Point::new(1.0, 4.0),
            Point::new(0.0, 4.0),
        ];
        let c = ring_centroid(&l).unwrap();
        let bbox_center = Point::new(2.0, 2.0);
        assert!(c.x < bbox_center.x && c.y < bbox_center.y);
    }

    #[test]
    fn degenerate_ring_falls_back_to_bbox_center() {
        let flat = [Point::new(0.0, 0.0), Point::new(4.0, 0.0), Point::new(2.0, 0.0)];
        assert_eq!(ring_centroid(&flat), Some(Point::new(2.0, 0.0)));
        assert_eq!(ring_centroid(&[]), None);
    }

    #[test]
    fn largest_ring_by_absolute_area() {
        let small = square(0.0, 0.0, 1.0);
        let mut big = square(10.0, 10.0, 3.0);
        big.reverse();
        let got = largest_ring([&small[..], &big[..]]).unwrap();
        assert_eq!(got, &big[..]);
    }

    #[test]
    fn midpoint_and_upright_direction() {
        let line = [Point::new(0.0, 0.0), Point::new(2.0, 0.0), Point::new(2.0, 2.0)];
        let (mid, angle) = line_midpoint(&line).unwrap();
        assert_eq!(mid, Point::new(2.0, 0.0));
        assert!(angle.abs() < 1e-12);

        // Right-to-left diagonal is flipped to read left-to-right.
        let back = [Point::new(4.0, 4.0), Point::new(0.0, 0.0)];
        let (mid, angle) = line_midpoint(&back).unwrap();
        assert_eq!(mid, Point::new(2.0, 2.0));
        assert!((angle - FRAC_PI_4).abs() < 1e-12);

        assert_eq!(line_midpoint(&[Point::new(1.0, 1.0)]), Some((Point::new(1.0, 1.0), 0.0)));
        assert_eq!(line_midpoint(&[]), None);
    }

    fn assert_runs(got: &[vec::Vec<Point>], want: &[&[Point]]) {
        assert_eq!(got.len(), want.len(), "{got:?}");
        for (g, w) in got.iter().zip(want) {
            assert_eq!(g.len(), w.len(), "{got:?}");
            for (a, b) in g.iter().zip(w.iter()) {
                assert!((*a - *b).hypot() < 1e-9, "{got:?}");
            }
        }
    }

    #[test]
    fn polyline_is_cut_at_the_rectangle() {
        let rect = Rect::new(0.0, 0.0, 100.0, 100.0);
        let road = [Point::new(-1000.0, 50.0), Point::new(90.0, 50.0)];
        assert_runs(
            &clip_polyline(&road, rect),
            &[&[Point::new(0.0, 50.0), Point::new(90.0, 50.0)]],
        );

        // Out, in, out and back in: two runs, inner vertices kept as is.
        let zigzag = [
            Point::new(-10.0, 10.0),
            Point::new(10.0, 10.0),
            Point::new(50.0, 10.0),
            Point::new(50.0, 200.0),
            Point::new(80.0, 200.0),
            Point::new(80.0, 20.0),
        ];
        assert_runs(
            &clip_polyline(&zigzag, rect),
            &[
                &[
                    Point::new(0.0, 10.0),
                    Point::new(10.0, 10.0),
                    Point::new(50.0, 10.0),
                    Point::new(50.0, 100.0),
                ],
                &[Point::new(80.0, 100.0), Point::new(80.0, 20.0)],
            ],
        );

        let away = [Point::new(200.0, 0.0), Point::new(300.0, 50.0)];
        assert!(clip_polyline(&away, rect).is_empty());
    }

    #[test]
    fn ring_is_cut_to_the_rectangle() {
        let rect = Rect::new(0.0, 0.0, 10.0, 10.0);
        // Half of this square hangs off the west edge.
        let ring = square(-5.0, 0.0, 10.0);
        let clipped = clip_ring(&ring, rect);
        assert_eq!(ring_area(&clipped).abs(), 50.0);
        let c = ring_centroid(&clipped).unwrap();
        assert!((c - Point::new(2.5, 5.0)).hypot() < 1e-9, "{c:?}");

        let inner = square(2.0, 2.0, 3.0);
        assert_eq!(clip_ring(&inner, rect), inner);
        assert!(clip_ring(&square(20.0, 20.0, 3.0), rect).is_empty());
    }
}
