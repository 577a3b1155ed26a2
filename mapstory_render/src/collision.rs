// Copyright 2025 the Mapstory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Uniform-grid index of the boxes of already placed labels.

use hashbrown::HashMap;
use kurbo::Rect;
use smallvec::SmallVec;

#[derive(Clone, Debug)]
pub(crate) struct CollisionGrid {
    cell: f64,
    boxes: Vec<Rect>,
    cells: HashMap<(i64, i64), SmallVec<[u32; 4]>>,
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "device coordinates divided by a positive cell size are far inside i64"
)]
fn cell_coord(v: f64, cell: f64) -> i64 {
    (v / cell).floor() as i64
}

impl CollisionGrid {
    pub(crate) fn new(cell: f64) -> Self {
        Self {
            cell,
            boxes: Vec::new(),
            cells: HashMap::new(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.boxes.len()
    }

    fn visit_cells(&self, r: Rect, mut f: impl FnMut((i64, i64))) {
        let (x0, x1) = (cell_coord(r.x0, self.cell), cell_coord(r.x1, self.cell));
        let (y0, y1) = (cell_coord(r.y0, self.cell), cell_coord(r.y1, self.cell));
        for cx in x0..=x1 {
            for cy in y0..=y1 {
                f((cx, cy));
            }
        }
    }

    /// Returns `true` if `r` overlaps (with positive area) any inserted box.
    pub(crate) fn collides(&self, r: Rect) -> bool {
        let mut hit = false;
        self.visit_cells(r, |key| {
            if hit {
                return;
            }
            if let Some(slots) = self.cells.get(&key) {
                hit = slots.iter().any(|&i| {
                    let o = self.boxes[i as usize].intersect(r);
                    o.width() > 0.0 && o.height() > 0.0
                });
            }
        });
        hit
    }

    pub(crate) fn insert(&mut self, r: Rect) {
        let id = u32::try_from(self.boxes.len()).expect("CollisionGrid: too many boxes for u32");
        self.boxes.push(r);
        let mut keys: SmallVec<[(i64, i64); 8]> = SmallVec::new();
        self.visit_cells(r, |key| keys.push(key));
        for key in keys {
            self.cells.entry(key).or_default().push(id);
        }
    }
}
