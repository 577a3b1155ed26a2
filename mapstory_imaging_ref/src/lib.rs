// Copyright 2025 the Mapstory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Mapstory Imaging Reference Surface.
//!
//! This crate provides a small, stateful implementation of
//! [`ImagingBackend`] and [`ResourceBackend`]
//! for **op recording and state tracing**.
//!
//! It is intentionally *not* a rasterizer:
//! - It does **not** produce pixels.
//! - It is intended for tests and debugging that want to assert on
//!   emitted ops and the imaging state at the time each op was applied
//!   (for example, that labels are drawn after every other primitive, or
//!   that a tile blit happened in device space).
//!
//! Resource descriptors are kept after `destroy_*` so a test can still
//! inspect what a recorded op referred to; [`RefBackend::live_resources`]
//! reports what the caller failed to release.

#![no_std]

extern crate alloc;

use alloc::vec::Vec;

use mapstory_imaging::{
    Affine, DrawOp, FillRule, ImageDesc, ImageId, ImagingBackend, ImagingOp, LayerOp, PaintDesc,
    PaintId, PathDesc, PathId, ResourceBackend, StateOp, StrokeStyle,
};

/// Snapshot of the current imaging state inside the backend.
#[derive(Clone, Debug)]
pub struct StateSnapshot {
    /// Current transform.
    pub transform: Affine,
    /// Number of active layers on the layer stack.
    pub layer_stack_depth: u32,
    /// The most recently pushed layer op, if any.
    pub layer_top: Option<LayerOp>,
    /// Current paint, if set.
    pub paint: Option<PaintId>,
    /// Current stroke style, if set.
    pub stroke: Option<StrokeStyle>,
    /// Current fill rule used for filling paths.
    pub fill_rule: FillRule,
}

impl Default for StateSnapshot {
    fn default() -> Self {
        Self {
            transform: Affine::IDENTITY,
            layer_stack_depth: 0,
            layer_top: None,
            paint: None,
            stroke: None,
            fill_rule: FillRule::NonZero,
        }
    }
}

/// Event recorded by the reference backend.
#[derive(Clone, Debug)]
pub enum Event {
    /// State operation and the resulting state snapshot.
    State {
        /// State operation that was applied.
        op: StateOp,
        /// Snapshot after applying the state operation.
        state: StateSnapshot,
    },
    /// Draw operation and the state snapshot used for drawing.
    Draw {
        /// Draw operation that was applied.
        op: DrawOp,
        /// Snapshot at the time of drawing.
        state: StateSnapshot,
    },
}

#[derive(Debug)]
struct Slot<T> {
    desc: T,
    live: bool,
}

/// Simple reference implementation of the imaging backend.
///
/// This backend:
/// - Stores resource descriptors in vectors keyed by their IDs,
/// - Tracks current imaging state,
/// - Records high-level [`Event`]s as state and draw operations are applied.
#[derive(Default, Debug)]
pub struct RefBackend {
    paths: Vec<Slot<PathDesc>>,
    images: Vec<Slot<(ImageDesc, Vec<u8>)>>,
    paints: Vec<Slot<PaintDesc>>,

    /// Log of events in the order they were applied.
    events: Vec<Event>,
    /// Underlying imaging ops.
    ops: Vec<ImagingOp>,
    /// Current imaging state.
    state: StateSnapshot,
    layer_stack: Vec<LayerOp>,
}

fn next_id<T>(slots: &[Slot<T>], what: &str) -> u32 {
    u32::try_from(slots.len()).unwrap_or_else(|_| panic!("RefBackend: too many {what} for u32 id"))
}

fn release<T>(slots: &mut [Slot<T>], idx: u32) {
    if let Some(slot) = slots.get_mut(idx as usize) {
        slot.live = false;
    }
}

impl RefBackend {
    /// Returns a slice of recorded events.
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Returns a slice of raw imaging operations.
    pub fn ops(&self) -> &[ImagingOp] {
        &self.ops
    }

    /// Iterate over recorded draw operations with their state snapshots.
    pub fn draws(&self) -> impl Iterator<Item = (&DrawOp, &StateSnapshot)> + '_ {
        self.events.iter().filter_map(|e| match e {
            Event::Draw { op, state } => Some((op, state)),
            Event::State { .. } => None,
        })
    }

    /// Returns the current imaging state.
    pub fn current_state(&self) -> &StateSnapshot {
        &self.state
    }

    /// Look up a path descriptor, including destroyed ones.
    pub fn path(&self, id: PathId) -> Option<&PathDesc> {
        self.paths.get(id.0 as usize).map(|s| &s.desc)
    }

    /// Look up a paint descriptor, including destroyed ones.
    pub fn paint(&self, id: PaintId) -> Option<&PaintDesc> {
        self.paints.get(id.0 as usize).map(|s| &s.desc)
    }

    /// Look up an image descriptor and its pixels, including destroyed ones.
    pub fn image(&self, id: ImageId) -> Option<(&ImageDesc, &[u8])> {
        self.images
            .get(id.0 as usize)
            .map(|s| (&s.desc.0, s.desc.1.as_slice()))
    }

    /// Number of resources (paths, images, paints) created but not yet destroyed.
    pub fn live_resources(&self) -> usize {
        self.paths.iter().filter(|s| s.live).count()
            + self.images.iter().filter(|s| s.live).count()
            + self.paints.iter().filter(|s| s.live).count()
    }

    /// Clears all recorded events and ops but keeps resources.
    pub fn clear_events(&mut self) {
        self.events.clear();
        self.ops.clear();
    }
}

impl ResourceBackend for RefBackend {
    fn create_path(&mut self, desc: PathDesc) -> PathId {
        let id = next_id(&self.paths, "paths");
        self.paths.push(Slot { desc, live: true });
        PathId(id)
    }

    fn destroy_path(&mut self, id: PathId) {
        release(&mut self.paths, id.0);
    }

    fn create_image(&mut self, desc: ImageDesc, pixels: &[u8]) -> ImageId {
        let id = next_id(&self.images, "images");
        self.images.push(Slot {
            desc: (desc, pixels.to_vec()),
            live: true,
        });
        ImageId(id)
    }

    fn destroy_image(&mut self, id: ImageId) {
        release(&mut self.images, id.0);
    }

    fn create_paint(&mut self, desc: PaintDesc) -> PaintId {
        let id = next_id(&self.paints, "paints");
        self.paints.push(Slot { desc, live: true });
        PaintId(id)
    }

    fn destroy_paint(&mut self, id: PaintId) {
        release(&mut self.paints, id.0);
    }
}

impl ImagingBackend for RefBackend {
    fn state(&mut self, op: StateOp) {
        match &op {
            StateOp::SetTransform(tx) => self.state.transform = *tx,
            StateOp::PushLayer(layer) => {
                self.layer_stack.push(layer.clone());
                self.state.layer_stack_depth = u32::try_from(self.layer_stack.len())
                    .expect("RefBackend: too many layer stack entries for u32");
                self.state.layer_top = self.layer_stack.last().cloned();
            }
            StateOp::PopLayer => {
                self.layer_stack.pop();
                self.state.layer_stack_depth = u32::try_from(self.layer_stack.len())
                    .expect("RefBackend: too many layer stack entries for u32");
                self.state.layer_top = self.layer_stack.last().cloned();
            }
            StateOp::SetPaint(id) => self.state.paint = Some(*id),
            StateOp::SetStroke(style) => self.state.stroke = Some(style.clone()),
            StateOp::SetFillRule(rule) => self.state.fill_rule = *rule,
        }

        self.ops.push(ImagingOp::State(op.clone()));
        self.events.push(Event::State {
            op,
            state: self.state.clone(),
        });
    }

    fn draw(&mut self, op: DrawOp) {
        self.ops.push(ImagingOp::Draw(op.clone()));
        self.events.push(Event::Draw {
            op,
            state: self.state.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use mapstory_imaging::{ImageSampler, PathCmd, Rect};
    use peniko::{Brush, Color};

    #[test]
    fn basic_state_and_draw() {
        let mut backend = RefBackend::default();

        let paint = backend.create_paint(PaintDesc {
            brush: Brush::Solid(Color::WHITE),
        });
        let path = backend.create_path(PathDesc {
            commands: vec![PathCmd::MoveTo { x: 0.0, y: 0.0 }].into_boxed_slice(),
        });

        backend.state(StateOp::SetPaint(paint));
        backend.draw(DrawOp::FillPath(path));

        assert_eq!(backend.events().len(), 2);
        assert_eq!(backend.ops().len(), 2);
        let (op, state) = backend.draws().next().expect("one draw");
        assert_eq!(*op, DrawOp::FillPath(path));
        assert_eq!(state.paint, Some(paint));
    }

    #[test]
    fn state_snapshot_updates() {
        let mut backend = RefBackend::default();

        backend.state(StateOp::SetTransform(Affine::scale(2.0)));
        backend.state(StateOp::PushLayer(LayerOp::opacity(0.25)));

        let last = backend.events().last().expect("at least one event");
        let Event::State { state, .. } = last else {
            panic!("expected final event to be State");
        };

        assert_eq!(state.transform, Affine::scale(2.0));
        assert_eq!(state.layer_stack_depth, 1);
        assert!(state.layer_top.is_some());

        backend.state(StateOp::PopLayer);
        assert_eq!(backend.current_state().layer_stack_depth, 0);
    }

    #[test]
    fn destroyed_resources_stay_inspectable() {
        let mut backend = RefBackend::default();

        let img = backend.create_image(ImageDesc::rgba8(1, 1), &[1_u8, 2, 3, 4]);
        backend.draw(DrawOp::DrawImageRect {
            image: img,
            src: None,
            dst: Rect::new(0.0, 0.0, 1.0, 1.0),
            sampler: ImageSampler::default(),
        });
        assert_eq!(backend.live_resources(), 1);
        backend.destroy_image(img);
        assert_eq!(backend.live_resources(), 0);

        let (desc, pixels) = backend.image(img).expect("image descriptor kept");
        assert_eq!(desc.width, 1);
        assert_eq!(pixels, &[1, 2, 3, 4]);
    }

    #[test]
    fn resource_destroy_is_tolerant() {
        let mut backend = RefBackend::default();

        let path = backend.create_path(PathDesc {
            commands: vec![PathCmd::MoveTo { x: 0.0, y: 0.0 }].into_boxed_slice(),
        });
        let paint = backend.create_paint(PaintDesc {
            brush: Brush::Solid(Color::WHITE),
        });

        backend.destroy_path(path);
        backend.destroy_paint(paint);

        // Double-destroy and unknown ids should not panic.
        backend.destroy_path(path);
        backend.destroy_paint(paint);
        backend.destroy_image(ImageId(42));
        assert_eq!(backend.live_resources(), 0);
    }

    #[test]
    fn clear_events_keeps_resources_usable() {
        let mut backend = RefBackend::default();

        let paint = backend.create_paint(PaintDesc {
            brush: Brush::Solid(Color::WHITE),
        });
        backend.state(StateOp::SetPaint(paint));
        backend.draw(DrawOp::FillRect(Rect::new(0.0, 0.0, 1.0, 1.0)));
        assert_eq!(backend.events().len(), 2);

        backend.clear_events();
        assert!(backend.events().is_empty());
        assert!(backend.ops().is_empty());

        backend.state(StateOp::SetPaint(paint));
        assert!(backend.paint(paint).is_some());
    }
}
