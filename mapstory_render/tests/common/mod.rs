// Copyright 2025 the Mapstory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Shared sources and styles for the renderer integration tests.

#![allow(
    missing_docs,
    reason = "Integration-test helper module; not part of the public API."
)]
#![allow(
    dead_code,
    reason = "Each test binary uses a different subset of the helpers."
)]

use kurbo::Rect;
use mapstory_geom::Geometry;
use mapstory_render::{
    FeatureIter, FeatureSource, Property, RuleId, SourceError, StyleEvaluator, StyleValue,
};
use mapstory_tile::{Tile, TileError, TileIndex, TileLevel, TileOrigin, TileSource};
use peniko::Color;

pub(crate) fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A tile set whose tiles are single colors.
pub(crate) struct SolidTiles {
    pub(crate) bounds: Rect,
    pub(crate) tile_size: u32,
    pub(crate) levels: Vec<TileLevel>,
    pub(crate) origin: TileOrigin,
    pub(crate) tiles: Vec<(TileIndex, [u8; 4])>,
    /// Indices whose fetch fails.
    pub(crate) broken: Vec<TileIndex>,
    /// Indices delivered as bytes that are not an image.
    pub(crate) garbage: Vec<TileIndex>,
    /// Indices delivered as images with no pixels.
    pub(crate) empty: Vec<TileIndex>,
}

impl SolidTiles {
    pub(crate) fn new(bounds: Rect, tile_size: u32, levels: Vec<TileLevel>) -> Self {
        Self {
            bounds,
            tile_size,
            levels,
            origin: TileOrigin::BottomLeft,
            tiles: Vec::new(),
            broken: Vec::new(),
            garbage: Vec::new(),
            empty: Vec::new(),
        }
    }

    pub(crate) fn with_tile(mut self, index: TileIndex, rgba: [u8; 4]) -> Self {
        self.tiles.push((index, rgba));
        self
    }
}

impl TileSource for SolidTiles {
    fn name(&self) -> &str {
        "solid"
    }

    fn declared_bounds(&self) -> Rect {
        self.bounds
    }

    fn zoom_levels(&self) -> Vec<TileLevel> {
        self.levels.clone()
    }

    fn tile_size(&self) -> (u32, u32) {
        (self.tile_size, self.tile_size)
    }

    fn origin(&self) -> TileOrigin {
        self.origin
    }

    fn fetch(&self, index: TileIndex) -> Result<Option<Tile>, TileError> {
        if self.broken.contains(&index) {
            return Err(TileError::Fetch {
                index,
                message: "connection reset".into(),
            });
        }
        if self.garbage.contains(&index) {
            return Ok(Some(Tile::encoded(index, b"not an image".to_vec())));
        }
        if self.empty.contains(&index) {
            return Ok(Some(Tile::rgba8(index, 0, 0, Vec::new())));
        }
        Ok(self
            .tiles
            .iter()
            .find(|(i, _)| *i == index)
            .map(|(_, rgba)| {
                let n = (self.tile_size * self.tile_size) as usize;
                let pixels = rgba.iter().copied().cycle().take(n * 4).collect();
                Tile::rgba8(index, self.tile_size, self.tile_size, pixels)
            }))
    }
}

/// Features held in memory; `fail_after` makes the query fail midway.
pub(crate) struct MemFeatures {
    pub(crate) name: &'static str,
    pub(crate) features: Vec<(&'static str, Geometry)>,
    pub(crate) fail_after: Option<usize>,
}

impl MemFeatures {
    pub(crate) fn new(name: &'static str, features: Vec<(&'static str, Geometry)>) -> Self {
        Self {
            name,
            features,
            fail_after: None,
        }
    }
}

impl FeatureSource<&'static str> for MemFeatures {
    fn name(&self) -> &str {
        self.name
    }

    fn query(&self, _bounds: Rect) -> Result<FeatureIter<'_, &'static str>, SourceError> {
        let fail_after = self.fail_after.unwrap_or(usize::MAX);
        Ok(Box::new(self.features.iter().enumerate().map(
            move |(i, (name, geometry))| {
                if i >= fail_after {
                    Err(SourceError::msg("feature table is corrupt"))
                } else {
                    Ok((*name, geometry.clone()))
                }
            },
        )))
    }
}

pub(crate) const MARKERS: RuleId = RuleId(0);
pub(crate) const ROADS: RuleId = RuleId(1);
pub(crate) const LABELS: RuleId = RuleId(2);
pub(crate) const HALF_OPAQUE: RuleId = RuleId(3);

/// A small fixed style: red markers, blue roads, labels from the feature name.
pub(crate) struct TestStyle;

impl StyleEvaluator<&'static str> for TestStyle {
    fn paint_for(
        &self,
        feature: Option<&&'static str>,
        rule: RuleId,
        property: Property,
    ) -> Option<StyleValue> {
        match (rule, property) {
            (MARKERS, Property::MarkerFill) => Some(StyleValue::Color(Color::from_rgb8(255, 0, 0))),
            (ROADS, Property::LineColor) => Some(StyleValue::Color(Color::from_rgb8(0, 0, 255))),
            (ROADS, Property::LineWidth) => Some(StyleValue::Number(3.0)),
            (LABELS, Property::TextName) => feature.map(|f| StyleValue::Text((*f).to_owned())),
            (HALF_OPAQUE, Property::RasterOpacity) => Some(StyleValue::Number(0.5)),
            _ => None,
        }
    }
}

/// Text engine that draws every label as its own bounding box.
pub(crate) struct BoxShaper;

impl mapstory_text::TextShaper for BoxShaper {
    fn measure(&self, text: &str, size_px: f64) -> kurbo::Size {
        kurbo::Size::new(text.chars().count() as f64 * size_px * 0.5, size_px)
    }

    fn outline(&self, text: &str, size_px: f64) -> Option<kurbo::BezPath> {
        use kurbo::Shape;
        let size = self.measure(text, size_px);
        Some(Rect::from_origin_size(kurbo::Point::ORIGIN, size).to_path(0.1))
    }
}
