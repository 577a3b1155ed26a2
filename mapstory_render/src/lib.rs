// Copyright 2025 the Mapstory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Mapstory Render: draws a stack of map layers for one view.
//!
//! A [`Map`] is an ordered list of [`Layer`]s, each reading from a tile,
//! feature or raster source and styled by rules that a [`StyleEvaluator`]
//! resolves per feature at draw time. A [`Renderer`] owns a drawing surface
//! (any [`ImagingBackend`]) for one [`View`] and draws:
//!
//! 1. the background, if [`RenderOptions::background`] is set;
//! 2. every visible layer, bottom to top:
//!    - tile layers by compositing the best-matching zoom level of the tile
//!      pyramid, seam-free, at the device resolution;
//!    - raster layers by reading the visible part once and blitting it;
//!    - vector layers feature by feature and rule by rule, with geometry
//!      generalized to the pixel grid;
//! 3. the labels collected from vector layers, placed greedily so none
//!    overlap.
//!
//! A layer that fails is logged and counted in [`RenderStats`]; the rest of
//! the map still draws.
//!
//! ## Minimal example
//!
//! ```rust
//! use kurbo::{Point, Rect};
//! use mapstory_geom::Geometry;
//! use mapstory_imaging_ref::RefBackend;
//! use mapstory_render::{
//!     FeatureIter, FeatureSource, Layer, Map, Property, RenderOptions, Renderer, RuleId,
//!     SourceError, StyleEvaluator, StyleValue,
//! };
//! use mapstory_view::View;
//! use peniko::Color;
//!
//! struct Cities;
//!
//! impl FeatureSource<&'static str> for Cities {
//!     fn name(&self) -> &str {
//!         "cities"
//!     }
//!
//!     fn query(&self, _bounds: Rect) -> Result<FeatureIter<'_, &'static str>, SourceError> {
//!         Ok(Box::new(
//!             [("Lyon", Geometry::Point(Point::new(4.8, 45.7)))].into_iter().map(Ok::<_, SourceError>),
//!         ))
//!     }
//! }
//!
//! struct RedDots;
//!
//! impl StyleEvaluator<&'static str> for RedDots {
//!     fn paint_for(
//!         &self,
//!         _feature: Option<&&'static str>,
//!         _rule: RuleId,
//!         property: Property,
//!     ) -> Option<StyleValue> {
//!         (property == Property::MarkerFill).then(|| StyleValue::Color(Color::from_rgb8(255, 0, 0)))
//!     }
//! }
//!
//! let map = Map::new(&RedDots).with_layer(Layer::vector("cities", &Cities).with_rules([RuleId(0)]));
//! let view = View::new(Rect::new(0.0, 40.0, 10.0, 50.0), 100, 100).unwrap();
//!
//! let mut renderer = Renderer::init(RefBackend::default(), view, RenderOptions::default()).unwrap();
//! let stats = renderer.render(&map);
//! assert_eq!(stats.features_drawn, 1);
//! assert_eq!(renderer.close().draws().count(), 1);
//! ```
//!
//! With the default `cpu` feature, [`render_png`] draws a map on a software
//! surface and encodes the result.
//!
//! [`ImagingBackend`]: mapstory_imaging::ImagingBackend
//! [`View`]: mapstory_view::View

mod collision;
mod error;
mod label;
mod map;
mod options;
mod raster;
mod renderer;
mod source;
mod style;
mod vector;

pub use error::{RenderError, SourceError};
pub use label::{Label, LabelAnchor, LabelLayout, Labeller, Labels, PlacedLabel};
pub use map::{Layer, LayerSource, Map};
pub use options::{Halo, LabelPaint, RenderOptions};
pub use renderer::{RenderStats, Renderer};
pub use source::{FeatureIter, FeatureSource, Raster, RasterData, RasterSource};
pub use style::{Property, RuleId, StyleEvaluator, StyleValue};

/// Renders `map` for `view` on a software surface and encodes it as PNG.
///
/// # Errors
///
/// Fails when the view is too large for the software surface, an option is
/// out of range, or encoding fails. Layer failures are logged, not returned.
#[cfg(feature = "cpu")]
pub fn render_png<F>(
    view: mapstory_view::View,
    map: &Map<'_, F>,
    options: RenderOptions,
) -> Result<Vec<u8>, RenderError> {
    use mapstory_imaging_vello_cpu::RasterTarget;

    let size = |v: u32| {
        u16::try_from(v).map_err(|_| RenderError::InvalidOption {
            name: "view size",
            value: f64::from(v),
        })
    };
    let mut target = RasterTarget::new(size(view.width())?, size(view.height())?);
    {
        let mut renderer = Renderer::init(target.backend(), view, options)?;
        let stats = renderer.render(map);
        log::debug!("render_png: {stats:?}");
        renderer.close();
    }
    target
        .encode_png()
        .map_err(|err| RenderError::Encode(err.to_string()))
}
