// Copyright 2025 the Mapstory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use kurbo::{Point, Rect, Size};

/// Reasons a [`View`] cannot be constructed.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum ViewError {
    /// The pixel width or height is zero.
    #[error("view has an empty pixel size {width}x{height}")]
    EmptySize {
        /// Requested width in pixels.
        width: u32,
        /// Requested height in pixels.
        height: u32,
    },
    /// The world bounds have no area or are inverted.
    #[error("view bounds {0:?} are empty or inverted")]
    EmptyBounds(Rect),
    /// The world bounds contain NaN or infinite coordinates.
    #[error("view bounds {0:?} are not finite")]
    NonFiniteBounds(Rect),
}

/// A geographic view: north-up world bounds rendered onto `width` × `height` pixels.
///
/// Scales are per axis, so a view whose bounds and pixel size have different
/// aspect ratios stretches rather than letterboxes. A view is immutable for
/// the duration of a render pass.
#[derive(Clone, Debug, PartialEq)]
pub struct View {
    bounds: Rect,
    width: u32,
    height: u32,
}

impl View {
    /// Creates a view over `bounds` with the given pixel size.
    ///
    /// `bounds` uses `x0/y0` as the south-west corner and `x1/y1` as the
    /// north-east corner, in world units.
    ///
    /// # Errors
    ///
    /// Fails when the pixel size is zero or the bounds are empty, inverted or
    /// not finite.
    pub fn new(bounds: Rect, width: u32, height: u32) -> Result<Self, ViewError> {
        if width == 0 || height == 0 {
            return Err(ViewError::EmptySize { width, height });
        }
        if !(bounds.x0.is_finite()
            && bounds.y0.is_finite()
            && bounds.x1.is_finite()
            && bounds.y1.is_finite())
        {
            return Err(ViewError::NonFiniteBounds(bounds));
        }
        if bounds.x1 <= bounds.x0 || bounds.y1 <= bounds.y0 {
            return Err(ViewError::EmptyBounds(bounds));
        }
        Ok(Self {
            bounds,
            width,
            height,
        })
    }

    /// Creates a view of the given pixel size centered on `center`, with
    /// `resolution` world units per pixel on both axes.
    ///
    /// # Errors
    ///
    /// Same conditions as [`View::new`]; a non-positive resolution yields
    /// empty bounds.
    pub fn centered(
        center: Point,
        resolution: f64,
        width: u32,
        height: u32,
    ) -> Result<Self, ViewError> {
        let half_w = f64::from(width) * resolution * 0.5;
        let half_h = f64::from(height) * resolution * 0.5;
        Self::new(
            Rect::new(
                center.x - half_w,
                center.y - half_h,
                center.x + half_w,
                center.y + half_h,
            ),
            width,
            height,
        )
    }

    /// World bounds of the view.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Pixel size as a [`Size`].
    #[must_use]
    pub fn size(&self) -> Size {
        Size::new(f64::from(self.width), f64::from(self.height))
    }

    /// The device rectangle `0..width × 0..height`.
    #[must_use]
    pub fn device_rect(&self) -> Rect {
        Rect::from_origin_size(Point::ORIGIN, self.size())
    }

    /// World units per pixel along X.
    #[must_use]
    pub fn scale_x(&self) -> f64 {
        self.bounds.width() / f64::from(self.width)
    }

    /// World units per pixel along Y.
    #[must_use]
    pub fn scale_y(&self) -> f64 {
        self.bounds.height() / f64::from(self.height)
    }

    /// Pixels per world unit along X.
    #[must_use]
    pub fn iscale_x(&self) -> f64 {
        f64::from(self.width) / self.bounds.width()
    }

    /// Pixels per world unit along Y.
    #[must_use]
    pub fn iscale_y(&self) -> f64 {
        f64::from(self.height) / self.bounds.height()
    }
}

#[cfg(test)]
mod tests {
    use kurbo::{Point, Rect};

    use super::{View, ViewError};

    #[test]
    fn scales_are_per_axis() {
        let view = View::new(Rect::new(0.0, 0.0, 100.0, 10.0), 50, 20).unwrap();
        assert_eq!(view.scale_x(), 2.0);
        assert_eq!(view.scale_y(), 0.5);
        assert_eq!(view.iscale_x(), 0.5);
        assert_eq!(view.iscale_y(), 2.0);
        assert_eq!(view.device_rect(), Rect::new(0.0, 0.0, 50.0, 20.0));
    }

    #[test]
    fn rejects_degenerate_views() {
        assert_eq!(
            View::new(Rect::new(0.0, 0.0, 1.0, 1.0), 0, 10),
            Err(ViewError::EmptySize {
                width: 0,
                height: 10
            })
        );
        assert!(matches!(
            View::new(Rect::new(5.0, 0.0, 1.0, 1.0), 10, 10),
            Err(ViewError::EmptyBounds(_))
        ));
        assert!(matches!(
            View::new(Rect::new(0.0, 0.0, f64::NAN, 1.0), 10, 10),
            Err(ViewError::NonFiniteBounds(_))
        ));
    }

    #[test]
    fn centered_view_has_requested_resolution() {
        let view = View::centered(Point::new(100.0, -40.0), 0.25, 400, 200).unwrap();
        assert_eq!(view.bounds(), Rect::new(50.0, -65.0, 150.0, -15.0));
        assert_eq!(view.scale_x(), 0.25);
        assert_eq!(view.scale_y(), 0.25);
    }
}
