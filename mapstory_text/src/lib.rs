// Copyright 2025 the Mapstory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Mapstory Text: label text as outline paths.
//!
//! Map labels are short single-line strings. The renderer needs two things
//! from a text engine: how big a label is, so it can be placed without
//! overlapping others, and the glyph outlines to fill and halo. Both go
//! through the [`TextShaper`] trait so the renderer does not depend on a
//! particular font stack.
//!
//! [`FontShaper`] implements it on top of Skrifa for a single font face. It
//! maps characters through the font's `cmap` and advances glyphs by their
//! horizontal metrics; there is no complex shaping, bidi or line breaking.
//!
//! Outlines are emitted in a y-down coordinate system whose origin is the
//! top-left corner of the text box: the baseline sits at the font's ascent.

#![no_std]
#![deny(unsafe_code)]

extern crate alloc;

use kurbo::{BezPath, Size};
use peniko::{Blob, FontData};
use skrifa::instance::{LocationRef, Size as FontSize};
use skrifa::metrics::GlyphMetrics;
use skrifa::outline::OutlinePen;
use skrifa::{FontRef, GlyphId, MetadataProvider};

/// Measures and outlines single-line label text.
pub trait TextShaper {
    /// Size of the text box for `text` at `size_px`.
    ///
    /// The width is the sum of glyph advances; the height is ascent plus
    /// descent.
    fn measure(&self, text: &str, size_px: f64) -> Size;

    /// Glyph outlines of `text` at `size_px`, with the origin at the top-left
    /// of the box returned by [`TextShaper::measure`] and Y growing downward.
    ///
    /// Returns `None` when nothing in `text` has an outline.
    fn outline(&self, text: &str, size_px: f64) -> Option<BezPath>;
}

/// Errors loading a font for [`FontShaper`].
#[derive(Clone, Debug, thiserror::Error)]
pub enum FontError {
    /// The bytes are not a readable font (or collection index).
    #[error("font data could not be parsed: {0}")]
    Parse(skrifa::raw::ReadError),
}

/// [`TextShaper`] for one font face, backed by Skrifa.
#[derive(Clone)]
pub struct FontShaper {
    font: FontData,
}

impl core::fmt::Debug for FontShaper {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FontShaper")
            .field("bytes", &self.font.data.len())
            .field("index", &self.font.index)
            .finish()
    }
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "label sizes are small; f32 precision is what Skrifa takes"
)]
fn font_size(size_px: f64) -> FontSize {
    FontSize::new(size_px as f32)
}

impl FontShaper {
    /// Loads face 0 of the given font file.
    ///
    /// # Errors
    ///
    /// Fails if the bytes are not a font Skrifa can read.
    pub fn new(bytes: alloc::vec::Vec<u8>) -> Result<Self, FontError> {
        Self::from_font_data(FontData::new(Blob::from(bytes), 0))
    }

    /// Uses an already loaded font (possibly a face of a collection).
    ///
    /// # Errors
    ///
    /// Fails if the data is not a font Skrifa can read.
    pub fn from_font_data(font: FontData) -> Result<Self, FontError> {
        FontRef::from_index(font.data.as_ref(), font.index).map_err(FontError::Parse)?;
        Ok(Self { font })
    }

    fn font_ref(&self) -> Option<FontRef<'_>> {
        FontRef::from_index(self.font.data.as_ref(), self.font.index).ok()
    }

    fn glyph_ids<'a>(font: &'a FontRef<'a>, text: &'a str) -> impl Iterator<Item = GlyphId> + 'a {
        let charmap = font.charmap();
        text.chars()
            .filter(|ch| !ch.is_control())
            .map(move |ch| charmap.map(ch).unwrap_or(GlyphId::NOTDEF))
    }
}

/// Collects Skrifa outline callbacks into a [`BezPath`], flipping Y and
/// offsetting by the pen position.
struct PathPen<'a> {
    path: &'a mut BezPath,
    x: f64,
    baseline: f64,
}

impl PathPen<'_> {
    fn pt(&self, x: f32, y: f32) -> (f64, f64) {
        (self.x + f64::from(x), self.baseline - f64::from(y))
    }
}

impl OutlinePen for PathPen<'_> {
    fn move_to(&mut self, x: f32, y: f32) {
        let p = self.pt(x, y);
        self.path.move_to(p);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        let p = self.pt(x, y);
        self.path.line_to(p);
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        let (c, p) = (self.pt(x1, y1), self.pt(x, y));
        self.path.quad_to(c, p);
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        let (c1, c2, p) = (self.pt(x1, y1), self.pt(x2, y2), self.pt(x, y));
        self.path.curve_to(c1, c2, p);
    }

    fn close(&mut self) {
        self.path.close_path();
    }
}

impl TextShaper for FontShaper {
    fn measure(&self, text: &str, size_px: f64) -> Size {
        let Some(font) = self.font_ref() else {
            return Size::ZERO;
        };
        let size = font_size(size_px);
        let location = LocationRef::default();
        let metrics = font.metrics(size, location);
        let glyph_metrics = GlyphMetrics::new(&font, size, location);
        let width: f64 = Self::glyph_ids(&font, text)
            .map(|gid| f64::from(glyph_metrics.advance_width(gid).unwrap_or_default()))
            .sum();
        Size::new(width, f64::from(metrics.ascent - metrics.descent))
    }

    fn outline(&self, text: &str, size_px: f64) -> Option<BezPath> {
        let font = self.font_ref()?;
        let size = font_size(size_px);
        let location = LocationRef::default();
        let ascent = f64::from(font.metrics(size, location).ascent);
        let glyph_metrics = GlyphMetrics::new(&font, size, location);
        let outlines = font.outline_glyphs();

        let mut path = BezPath::new();
        let mut x = 0.0;
        for gid in Self::glyph_ids(&font, text) {
            if let Some(glyph) = outlines.get(gid) {
                let mut pen = PathPen {
                    path: &mut path,
                    x,
                    baseline: ascent,
                };
                // A glyph that fails to draw is left out; the rest still render.
                if let Err(err) = glyph.draw((size, location), &mut pen) {
                    log::debug!("skipping outline of glyph {gid:?} in {text:?}: {err}");
                }
            }
            x += f64::from(glyph_metrics.advance_width(gid).unwrap_or_default());
        }
        (!path.elements().is_empty()).then_some(path)
    }
}
