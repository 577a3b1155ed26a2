// Copyright 2025 the Mapstory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use core::fmt;
use core::ops::{Deref, DerefMut};

use kurbo::{Affine, Point, Rect};
use mapstory_imaging::ImagingBackend;

use crate::View;

/// Bidirectional world↔device transform for one render pass.
///
/// World coordinates are north-up; device coordinates have their origin at
/// the top-left pixel corner with Y growing downward. The world→device
/// mapping is `scale(iscale_x, -iscale_y) * translate(-min_x, -max_y)`.
#[derive(Clone, Debug, PartialEq)]
pub struct TransformPipeline {
    world_to_device: Affine,
    device_to_world: Affine,
}

impl TransformPipeline {
    /// Derives the transform pair from `view`.
    #[must_use]
    pub fn new(view: &View) -> Self {
        let bounds = view.bounds();
        let world_to_device = Affine::scale_non_uniform(view.iscale_x(), -view.iscale_y())
            * Affine::translate((-bounds.x0, -bounds.y1));
        let device_to_world = Affine::translate((bounds.x0, bounds.y1))
            * Affine::scale_non_uniform(view.scale_x(), -view.scale_y());
        Self {
            world_to_device,
            device_to_world,
        }
    }

    /// The world→device affine.
    #[must_use]
    pub fn world_to_device(&self) -> Affine {
        self.world_to_device
    }

    /// The device→world affine.
    #[must_use]
    pub fn device_to_world(&self) -> Affine {
        self.device_to_world
    }

    /// Maps a world point to device pixels.
    #[must_use]
    pub fn to_device(&self, pt: Point) -> Point {
        self.world_to_device * pt
    }

    /// Maps a device point back to world coordinates.
    #[must_use]
    pub fn to_world(&self, pt: Point) -> Point {
        self.device_to_world * pt
    }

    /// Maps a world rectangle to the device rectangle covering it.
    ///
    /// The result is normalized (`x0 <= x1`, `y0 <= y1`) even though the Y
    /// axis flips.
    #[must_use]
    pub fn to_device_rect(&self, rect: Rect) -> Rect {
        let a = self.to_device(Point::new(rect.x0, rect.y0));
        let b = self.to_device(Point::new(rect.x1, rect.y1));
        Rect::from_points(a, b)
    }

    /// Maps a device rectangle to the world rectangle it covers.
    #[must_use]
    pub fn to_world_rect(&self, rect: Rect) -> Rect {
        let a = self.to_world(Point::new(rect.x0, rect.y0));
        let b = self.to_world(Point::new(rect.x1, rect.y1));
        Rect::from_points(a, b)
    }

    /// Installs the world→device transform on `surface`.
    pub fn apply<B: ImagingBackend + ?Sized>(&self, surface: &mut B) {
        surface.set_transform(self.world_to_device);
    }

    /// Installs the identity transform on `surface`, so draws are in pixels.
    pub fn reset<B: ImagingBackend + ?Sized>(&self, surface: &mut B) {
        surface.set_transform(Affine::IDENTITY);
    }

    /// Switches `surface` to pixel space until the returned guard is dropped.
    ///
    /// The guard derefs to the surface. Dropping it reinstalls the world
    /// transform, on every exit path including early returns and unwinding.
    pub fn pixel_space<'a, B: ImagingBackend + ?Sized>(
        &'a self,
        surface: &'a mut B,
    ) -> PixelSpace<'a, B> {
        self.reset(surface);
        PixelSpace {
            pipeline: self,
            surface,
        }
    }
}

/// Scope in which the surface draws in device pixels.
///
/// Created by [`TransformPipeline::pixel_space`].
pub struct PixelSpace<'a, B: ImagingBackend + ?Sized> {
    pipeline: &'a TransformPipeline,
    surface: &'a mut B,
}

impl<B: ImagingBackend + ?Sized> fmt::Debug for PixelSpace<'_, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PixelSpace")
            .field("pipeline", self.pipeline)
            .finish_non_exhaustive()
    }
}

impl<B: ImagingBackend + ?Sized> Deref for PixelSpace<'_, B> {
    type Target = B;

    fn deref(&self) -> &B {
        self.surface
    }
}

impl<B: ImagingBackend + ?Sized> DerefMut for PixelSpace<'_, B> {
    fn deref_mut(&mut self) -> &mut B {
        self.surface
    }
}

impl<B: ImagingBackend + ?Sized> Drop for PixelSpace<'_, B> {
    fn drop(&mut self) {
        self.pipeline.apply(self.surface);
    }
}

#[cfg(test)]
mod tests {
    use kurbo::{Affine, Point, Rect};
    use mapstory_imaging::{DrawOp, ImagingBackend, StateOp};
    use mapstory_imaging_ref::{Event, RefBackend};

    use super::TransformPipeline;
    use crate::View;

    fn close(a: Point, b: Point) -> bool {
        (a.x - b.x).abs() < 1e-9 && (a.y - b.y).abs() < 1e-9
    }

    #[test]
    fn corners_map_to_device_corners() {
        let view = View::new(Rect::new(-180.0, -90.0, 180.0, 90.0), 360, 180).unwrap();
        let p = TransformPipeline::new(&view);
        assert!(close(p.to_device(Point::new(-180.0, 90.0)), Point::new(0.0, 0.0)));
        assert!(close(p.to_device(Point::new(180.0, -90.0)), Point::new(360.0, 180.0)));
        assert!(close(p.to_device(Point::new(0.0, 0.0)), Point::new(180.0, 90.0)));
    }

    #[test]
    fn inverse_round_trips() {
        let view = View::new(Rect::new(1.0e6, 5.0e6, 1.0e6 + 2500.0, 5.0e6 + 1000.0), 250, 100)
            .unwrap();
        let p = TransformPipeline::new(&view);
        let world = Point::new(1.0e6 + 1234.5, 5.0e6 + 321.25);
        assert!(close(p.to_world(p.to_device(world)), world));
        let identity = p.world_to_device() * p.device_to_world();
        for (a, b) in identity.as_coeffs().iter().zip(Affine::IDENTITY.as_coeffs()) {
            assert!((a - b).abs() < 1e-9, "{identity:?} is not the identity");
        }
    }

    #[test]
    fn device_rect_is_normalized() {
        let view = View::new(Rect::new(0.0, 0.0, 10.0, 10.0), 100, 100).unwrap();
        let p = TransformPipeline::new(&view);
        let r = p.to_device_rect(Rect::new(2.0, 2.0, 4.0, 6.0));
        assert_eq!(r, Rect::new(20.0, 40.0, 40.0, 80.0));
        let back = p.to_world_rect(r);
        assert!((back.x0 - 2.0).abs() < 1e-9 && (back.y1 - 6.0).abs() < 1e-9);
    }

    #[test]
    fn reset_then_apply_restores_previous_transform() {
        let view = View::new(Rect::new(10.0, 20.0, 30.0, 60.0), 64, 32).unwrap();
        let p = TransformPipeline::new(&view);
        let mut surface = RefBackend::default();

        p.apply(&mut surface);
        let before = surface.current_state().transform;
        p.reset(&mut surface);
        assert_eq!(surface.current_state().transform, Affine::IDENTITY);
        p.apply(&mut surface);
        assert_eq!(surface.current_state().transform, before);
    }

    #[test]
    fn pixel_space_guard_restores_on_drop() {
        let view = View::new(Rect::new(0.0, 0.0, 8.0, 8.0), 16, 16).unwrap();
        let p = TransformPipeline::new(&view);
        let mut surface = RefBackend::default();
        p.apply(&mut surface);

        {
            let mut px = p.pixel_space(&mut surface);
            px.draw(DrawOp::FillRect(Rect::new(0.0, 0.0, 1.0, 1.0)));
        }

        let draw_transform = surface
            .draws()
            .next()
            .map(|(_, state)| state.transform)
            .unwrap();
        assert_eq!(draw_transform, Affine::IDENTITY);
        assert_eq!(surface.current_state().transform, p.world_to_device());
        let Some(Event::State {
            op: StateOp::SetTransform(last),
            ..
        }) = surface.events().last()
        else {
            panic!("guard should end with a transform change");
        };
        assert_eq!(*last, p.world_to_device());
    }

    #[test]
    fn pixel_space_guard_restores_on_early_return() {
        fn draw_or_bail(
            p: &TransformPipeline,
            surface: &mut RefBackend,
            bail: bool,
        ) -> Result<(), ()> {
            let mut px = p.pixel_space(surface);
            if bail {
                return Err(());
            }
            px.draw(DrawOp::FillRect(Rect::new(0.0, 0.0, 1.0, 1.0)));
            Ok(())
        }

        let view = View::new(Rect::new(0.0, 0.0, 8.0, 8.0), 16, 16).unwrap();
        let p = TransformPipeline::new(&view);
        let mut surface = RefBackend::default();
        p.apply(&mut surface);

        assert!(draw_or_bail(&p, &mut surface, true).is_err());
        assert_eq!(surface.current_state().transform, p.world_to_device());
        assert!(draw_or_bail(&p, &mut surface, false).is_ok());
        assert_eq!(surface.current_state().transform, p.world_to_device());
    }
}
