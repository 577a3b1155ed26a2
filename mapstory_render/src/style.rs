// Copyright 2025 the Mapstory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Style contracts.
//!
//! Rule parsing, selector matching and cascading live outside this crate.
//! The renderer only sees opaque [`RuleId`]s and asks a [`StyleEvaluator`]
//! for one [`Property`] at a time, per feature, at draw time. Nothing is
//! cached, so a value may depend on the feature's attributes.

use peniko::Color;

/// Opaque handle to a style rule, owned by the [`StyleEvaluator`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuleId(pub u32);

/// Style properties the renderer reads.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Property {
    /// Marker width in pixels.
    MarkerWidth,
    /// Marker height in pixels; defaults to the width.
    MarkerHeight,
    /// Marker fill color.
    MarkerFill,
    /// Marker fill opacity in `[0, 1]`.
    MarkerFillOpacity,
    /// Marker outline color.
    MarkerLineColor,
    /// Marker outline width in pixels.
    MarkerLineWidth,
    /// Marker outline opacity in `[0, 1]`.
    MarkerLineOpacity,
    /// Line (and polygon outline) color.
    LineColor,
    /// Line width in pixels.
    LineWidth,
    /// Line opacity in `[0, 1]`.
    LineOpacity,
    /// Polygon fill color.
    PolygonFill,
    /// Polygon fill opacity in `[0, 1]`.
    PolygonOpacity,
    /// Label text; a label is created when present and non-empty.
    TextName,
    /// Label text color.
    TextFill,
    /// Label text size in pixels.
    TextSize,
    /// Label halo color.
    TextHaloFill,
    /// Label halo radius in pixels.
    TextHaloRadius,
    /// Raster layer opacity in `[0, 1]`.
    RasterOpacity,
}

/// A resolved property value.
#[derive(Clone, Debug, PartialEq)]
pub enum StyleValue {
    /// A color.
    Color(Color),
    /// A number.
    Number(f64),
    /// A string.
    Text(String),
}

/// Evaluates style rules for features of type `F`.
pub trait StyleEvaluator<F> {
    /// Value of `property` under `rule` for `feature`.
    ///
    /// `feature` is `None` for layers without features (tiles, rasters).
    /// Returns `None` when the rule does not set the property.
    fn paint_for(&self, feature: Option<&F>, rule: RuleId, property: Property)
    -> Option<StyleValue>;

    /// Whether `rule` applies to `feature` at all. Defaults to `true`.
    fn applies(&self, feature: &F, rule: RuleId) -> bool {
        let _ = (feature, rule);
        true
    }
}

/// Typed access to one feature's values under one rule.
pub(crate) struct Resolved<'a, F> {
    style: &'a dyn StyleEvaluator<F>,
    feature: Option<&'a F>,
    rule: RuleId,
}

impl<'a, F> Resolved<'a, F> {
    pub(crate) fn new(style: &'a dyn StyleEvaluator<F>, feature: Option<&'a F>, rule: RuleId) -> Self {
        Self {
            style,
            feature,
            rule,
        }
    }

    pub(crate) fn get(&self, property: Property) -> Option<StyleValue> {
        self.style.paint_for(self.feature, self.rule, property)
    }

    pub(crate) fn color(&self, property: Property) -> Option<Color> {
        match self.get(property)? {
            StyleValue::Color(c) => Some(c),
            other => {
                log::debug!("{property:?} expects a color, got {other:?}");
                None
            }
        }
    }

    pub(crate) fn number(&self, property: Property) -> Option<f64> {
        match self.get(property)? {
            StyleValue::Number(n) if n.is_finite() => Some(n),
            StyleValue::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            other => {
                log::debug!("{property:?} expects a number, got {other:?}");
                None
            }
        }
    }

    pub(crate) fn text(&self, property: Property) -> Option<String> {
        match self.get(property)? {
            StyleValue::Text(s) => Some(s),
            StyleValue::Number(n) => Some(n.to_string()),
            StyleValue::Color(_) => None,
        }
    }

    /// `color` with its alpha multiplied by `opacity`, if both are present.
    pub(crate) fn color_with_opacity(&self, color: Property, opacity: Property) -> Option<Color> {
        let base = self.color(color)?;
        Some(match self.number(opacity) {
            Some(o) => base.multiply_alpha(unit_f32(o)),
            None => base,
        })
    }
}

/// Clamps to `[0, 1]` and narrows to `f32`.
#[expect(clippy::cast_possible_truncation, reason = "clamped to [0, 1] first")]
pub(crate) fn unit_f32(v: f64) -> f32 {
    v.clamp(0.0, 1.0) as f32
}

/// Collapses a layer's rules into one value per property.
///
/// Used for layers without features: the first rule that sets a property wins.
pub(crate) fn collapsed<F>(
    style: &dyn StyleEvaluator<F>,
    rules: &[RuleId],
    property: Property,
) -> Option<StyleValue> {
    rules
        .iter()
        .find_map(|&rule| style.paint_for(None, rule, property))
}

#[cfg(test)]
mod tests {
    use peniko::Color;

    use super::{Property, Resolved, RuleId, StyleEvaluator, StyleValue, collapsed};

    struct Fixed;

    impl StyleEvaluator<u32> for Fixed {
        fn paint_for(
            &self,
            feature: Option<&u32>,
            rule: RuleId,
            property: Property,
        ) -> Option<StyleValue> {
            match (rule.0, property) {
                (0, Property::MarkerFill) => Some(StyleValue::Color(Color::from_rgb8(255, 0, 0))),
                (0, Property::MarkerFillOpacity) => Some(StyleValue::Number(0.5)),
                (0, Property::MarkerWidth) => Some(StyleValue::Text(" 12 ".into())),
                (0, Property::TextName) => feature.map(|f| StyleValue::Number(f64::from(*f))),
                (1, Property::RasterOpacity) => Some(StyleValue::Number(0.25)),
                (2, Property::RasterOpacity) => Some(StyleValue::Number(0.75)),
                (_, Property::LineWidth) => Some(StyleValue::Color(Color::BLACK)),
                _ => None,
            }
        }
    }

    #[test]
    fn typed_access_coerces() {
        let feature = 7_u32;
        let r = Resolved::new(&Fixed, Some(&feature), RuleId(0));
        assert_eq!(r.number(Property::MarkerWidth), Some(12.0));
        assert_eq!(r.text(Property::TextName).as_deref(), Some("7"));
        assert_eq!(r.number(Property::LineWidth), None);
        let fill = r
            .color_with_opacity(Property::MarkerFill, Property::MarkerFillOpacity)
            .unwrap();
        assert_eq!(fill, Color::from_rgb8(255, 0, 0).multiply_alpha(0.5));
        assert_eq!(r.color(Property::PolygonFill), None);
    }

    #[test]
    fn collapse_takes_first_present_value() {
        let rules = [RuleId(0), RuleId(2), RuleId(1)];
        assert_eq!(
            collapsed::<u32>(&Fixed, &rules, Property::RasterOpacity),
            Some(StyleValue::Number(0.75))
        );
        assert_eq!(collapsed::<u32>(&Fixed, &rules, Property::TextFill), None);
    }
}
