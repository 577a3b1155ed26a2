// Copyright 2025 the Mapstory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use mapstory_tile::TileSource;

use crate::{FeatureSource, RasterSource, RuleId, StyleEvaluator};

/// Where a layer's content comes from.
pub enum LayerSource<'a, F> {
    /// Raster tiles composited from a pyramid.
    Tiles(&'a dyn TileSource),
    /// Vector features.
    Vector(&'a dyn FeatureSource<F>),
    /// Non-tiled raster imagery.
    Raster(&'a dyn RasterSource),
}

impl<F> core::fmt::Debug for LayerSource<'_, F> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Tiles(s) => f.debug_tuple("Tiles").field(&s.name()).finish(),
            Self::Vector(s) => f.debug_tuple("Vector").field(&s.name()).finish(),
            Self::Raster(s) => f.debug_tuple("Raster").field(&s.name()).finish(),
        }
    }
}

/// One layer of a [`Map`]: a source plus the rules that style it.
pub struct Layer<'a, F> {
    /// Name used in log messages and errors.
    pub name: String,
    /// Content.
    pub source: LayerSource<'a, F>,
    /// Rules in paint order.
    pub rules: Vec<RuleId>,
    /// Hidden layers are skipped.
    pub visible: bool,
}

impl<F> core::fmt::Debug for Layer<'_, F> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Layer")
            .field("name", &self.name)
            .field("source", &self.source)
            .field("rules", &self.rules)
            .field("visible", &self.visible)
            .finish()
    }
}

impl<'a, F> Layer<'a, F> {
    fn new(name: impl Into<String>, source: LayerSource<'a, F>) -> Self {
        Self {
            name: name.into(),
            source,
            rules: Vec::new(),
            visible: true,
        }
    }

    /// A raster tile layer.
    pub fn tiles(name: impl Into<String>, source: &'a dyn TileSource) -> Self {
        Self::new(name, LayerSource::Tiles(source))
    }

    /// A vector layer.
    pub fn vector(name: impl Into<String>, source: &'a dyn FeatureSource<F>) -> Self {
        Self::new(name, LayerSource::Vector(source))
    }

    /// A non-tiled raster layer.
    pub fn raster(name: impl Into<String>, source: &'a dyn RasterSource) -> Self {
        Self::new(name, LayerSource::Raster(source))
    }

    /// Sets the rules, in paint order.
    #[must_use]
    pub fn with_rules(mut self, rules: impl IntoIterator<Item = RuleId>) -> Self {
        self.rules = rules.into_iter().collect();
        self
    }

    /// Shows or hides the layer.
    #[must_use]
    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }
}

/// An ordered stack of layers and the style that paints them.
///
/// Layers draw bottom to top in `layers` order.
pub struct Map<'a, F> {
    /// Layers, bottom first.
    pub layers: Vec<Layer<'a, F>>,
    /// Style evaluator for every layer's rules.
    pub style: &'a dyn StyleEvaluator<F>,
}

impl<F> core::fmt::Debug for Map<'_, F> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Map")
            .field("layers", &self.layers)
            .finish_non_exhaustive()
    }
}

impl<'a, F> Map<'a, F> {
    /// An empty map styled by `style`.
    pub fn new(style: &'a dyn StyleEvaluator<F>) -> Self {
        Self {
            layers: Vec::new(),
            style,
        }
    }

    /// Appends a layer on top.
    #[must_use]
    pub fn with_layer(mut self, layer: Layer<'a, F>) -> Self {
        self.layers.push(layer);
        self
    }
}
