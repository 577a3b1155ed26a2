// Copyright 2025 the Mapstory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::sync::Arc;

use mapstory_text::TextShaper;
use peniko::Color;

use crate::RenderError;

/// Outline drawn behind label text.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Halo {
    /// Halo color.
    pub color: Color,
    /// Halo radius in pixels.
    pub radius: f64,
}

/// How a label's text is painted.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LabelPaint {
    /// Text color.
    pub color: Color,
    /// Text size in pixels.
    pub size: f64,
    /// Optional halo.
    pub halo: Option<Halo>,
}

impl Default for LabelPaint {
    fn default() -> Self {
        Self {
            color: Color::BLACK,
            size: 12.0,
            halo: None,
        }
    }
}

/// Renderer configuration.
///
/// All fields have working defaults; use the `with_*` setters to change them.
#[derive(Clone)]
pub struct RenderOptions {
    /// Fill drawn under every layer. `None` leaves the surface as is.
    pub background: Option<Color>,
    /// Marker size in pixels when a rule sets no `MarkerWidth`.
    pub default_marker_size: f64,
    /// Text engine used to measure and draw labels.
    ///
    /// Without one, labels are still laid out (with an estimated size) but
    /// not drawn.
    pub label_text: Option<Arc<dyn TextShaper>>,
    /// Label paint used where rules set no `Text*` properties.
    pub label_defaults: LabelPaint,
    /// Free space kept around each label, in pixels.
    pub label_padding: f64,
    /// Cell size of the label collision grid, in pixels.
    pub collision_cell: f64,
}

impl core::fmt::Debug for RenderOptions {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RenderOptions")
            .field("background", &self.background)
            .field("default_marker_size", &self.default_marker_size)
            .field("label_text", &self.label_text.is_some())
            .field("label_defaults", &self.label_defaults)
            .field("label_padding", &self.label_padding)
            .field("collision_cell", &self.collision_cell)
            .finish()
    }
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            background: None,
            default_marker_size: 10.0,
            label_text: None,
            label_defaults: LabelPaint::default(),
            label_padding: 2.0,
            collision_cell: 64.0,
        }
    }
}

impl RenderOptions {
    /// Fill the surface with `color` before drawing layers.
    #[must_use]
    pub fn with_background(mut self, color: Color) -> Self {
        self.background = Some(color);
        self
    }

    /// Marker size used when a rule does not set one.
    #[must_use]
    pub fn with_default_marker_size(mut self, px: f64) -> Self {
        self.default_marker_size = px;
        self
    }

    /// Text engine for labels.
    #[must_use]
    pub fn with_label_text(mut self, shaper: Arc<dyn TextShaper>) -> Self {
        self.label_text = Some(shaper);
        self
    }

    /// Default label paint.
    #[must_use]
    pub fn with_label_defaults(mut self, paint: LabelPaint) -> Self {
        self.label_defaults = paint;
        self
    }

    /// Space kept around labels.
    #[must_use]
    pub fn with_label_padding(mut self, px: f64) -> Self {
        self.label_padding = px;
        self
    }

    /// Collision grid cell size.
    #[must_use]
    pub fn with_collision_cell(mut self, px: f64) -> Self {
        self.collision_cell = px;
        self
    }

    pub(crate) fn validate(&self) -> Result<(), RenderError> {
        let checks = [
            ("default_marker_size", self.default_marker_size, false),
            ("label_defaults.size", self.label_defaults.size, false),
            ("label_padding", self.label_padding, true),
            ("collision_cell", self.collision_cell, false),
        ];
        for (name, value, zero_ok) in checks {
            let ok = value.is_finite() && (value > 0.0 || (zero_ok && value == 0.0));
            if !ok {
                return Err(RenderError::InvalidOption { name, value });
            }
        }
        Ok(())
    }
}
