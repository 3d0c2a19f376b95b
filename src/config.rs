//! The immutable plot configuration record.
//!
//! A [`PlotConfig`] is a plain value. Every `with_*` helper copies the record and
//! overrides one field, so earlier configurations stay valid and can be branched.

use crate::error::{PlotError, Result};
use crate::theme::{Palette, ThemeName};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Chart kind selected by an initialization verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Geometry {
    Scatter,
    Line,
    Bar,
    Histogram,
    Box,
    Violin,
    Density,
    Heatmap,
    Contour,
}

impl Geometry {
    pub const ALL: [Geometry; 9] = [
        Geometry::Scatter,
        Geometry::Line,
        Geometry::Bar,
        Geometry::Histogram,
        Geometry::Box,
        Geometry::Violin,
        Geometry::Density,
        Geometry::Heatmap,
        Geometry::Contour,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Geometry::Scatter => "scatter",
            Geometry::Line => "line",
            Geometry::Bar => "bar",
            Geometry::Histogram => "histogram",
            Geometry::Box => "box",
            Geometry::Violin => "violin",
            Geometry::Density => "density",
            Geometry::Heatmap => "heatmap",
            Geometry::Contour => "contour",
        }
    }

    /// Aesthetics that must be mapped to a column before this geometry can render.
    pub fn required_aesthetics(self) -> &'static [Aesthetic] {
        match self {
            Geometry::Scatter | Geometry::Line => &[Aesthetic::X, Aesthetic::Y],
            Geometry::Bar | Geometry::Histogram | Geometry::Density => &[Aesthetic::X],
            Geometry::Box | Geometry::Violin => &[Aesthetic::Y],
            Geometry::Heatmap => &[Aesthetic::X, Aesthetic::Y, Aesthetic::Color],
            Geometry::Contour => &[Aesthetic::X, Aesthetic::Y, Aesthetic::Z],
        }
    }
}

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Visual channel a column or fixed value can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aesthetic {
    X,
    Y,
    Z,
    Color,
    Fill,
    Size,
    Shape,
    Alpha,
}

impl Aesthetic {
    pub fn as_str(self) -> &'static str {
        match self {
            Aesthetic::X => "x",
            Aesthetic::Y => "y",
            Aesthetic::Z => "z",
            Aesthetic::Color => "color",
            Aesthetic::Fill => "fill",
            Aesthetic::Size => "size",
            Aesthetic::Shape => "shape",
            Aesthetic::Alpha => "alpha",
        }
    }
}

impl fmt::Display for Aesthetic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Aesthetic {
    type Err = PlotError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "x" => Ok(Aesthetic::X),
            "y" => Ok(Aesthetic::Y),
            "z" => Ok(Aesthetic::Z),
            "color" | "colour" => Ok(Aesthetic::Color),
            "fill" => Ok(Aesthetic::Fill),
            "size" => Ok(Aesthetic::Size),
            "shape" => Ok(Aesthetic::Shape),
            "alpha" => Ok(Aesthetic::Alpha),
            other => Err(PlotError::InvalidArgument(format!(
                "unknown aesthetic '{}'",
                other
            ))),
        }
    }
}

/// A fixed aesthetic value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    Number(f64),
    Bool(bool),
    Text(String),
}

impl Literal {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Literal::Number(n) => Some(*n),
            Literal::Text(s) => s.parse().ok(),
            Literal::Bool(_) => None,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Number(n) => write!(f, "{}", n),
            Literal::Bool(b) => write!(f, "{}", b),
            Literal::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for Literal {
    fn from(v: f64) -> Self {
        Literal::Number(v)
    }
}

impl From<i32> for Literal {
    fn from(v: i32) -> Self {
        Literal::Number(v as f64)
    }
}

impl From<bool> for Literal {
    fn from(v: bool) -> Self {
        Literal::Bool(v)
    }
}

impl From<&str> for Literal {
    fn from(v: &str) -> Self {
        Literal::Text(v.to_string())
    }
}

impl From<String> for Literal {
    fn from(v: String) -> Self {
        Literal::Text(v)
    }
}

/// What an aesthetic is bound to: a data column or a fixed value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AestheticValue {
    Column(String),
    Literal(Literal),
}

impl AestheticValue {
    pub fn column(&self) -> Option<&str> {
        match self {
            AestheticValue::Column(c) => Some(c),
            AestheticValue::Literal(_) => None,
        }
    }

    pub fn literal(&self) -> Option<&Literal> {
        match self {
            AestheticValue::Literal(l) => Some(l),
            AestheticValue::Column(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Axis {
    X,
    Y,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::X => f.write_str("x"),
            Axis::Y => f.write_str("y"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleTransform {
    Log10,
    Reverse,
}

/// Per-axis directives. Transform and limits are set independently.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AxisScale {
    pub transform: Option<ScaleTransform>,
    pub limits: Option<(f64, f64)>,
}

impl AxisScale {
    pub fn is_log(&self) -> bool {
        self.transform == Some(ScaleTransform::Log10)
    }

    pub fn is_reversed(&self) -> bool {
        self.transform == Some(ScaleTransform::Reverse)
    }

    /// Position of a data value on this axis: `log10(v)` on a log scale, `-v` when reversed.
    /// Non-finite values pass through; non-positive values have no log position.
    pub fn transform_value(&self, axis: Axis, v: f64) -> Result<f64> {
        if !v.is_finite() {
            return Ok(v);
        }
        match self.transform {
            Some(ScaleTransform::Log10) if v <= 0.0 => Err(PlotError::ScaleDomain(format!(
                "log scale on the {} axis cannot show {}",
                axis, v
            ))),
            Some(ScaleTransform::Log10) => Ok(v.log10()),
            Some(ScaleTransform::Reverse) => Ok(-v),
            None => Ok(v),
        }
    }
}

/// Small-multiple layout: a grid by `rows`/`cols`, or a wrapped strip by `wrap`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Facets {
    pub rows: Option<String>,
    pub cols: Option<String>,
    pub wrap: Option<String>,
}

impl Facets {
    pub fn is_empty(&self) -> bool {
        self.rows.is_none() && self.cols.is_none() && self.wrap.is_none()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        [&self.rows, &self.cols, &self.wrap]
            .into_iter()
            .filter_map(|c| c.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Labels {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,
}

impl Labels {
    /// Fields set in `other` replace ours; unset fields are kept.
    pub fn merged(&self, other: &Labels) -> Labels {
        Labels {
            title: other.title.clone().or_else(|| self.title.clone()),
            x: other.x.clone().or_else(|| self.x.clone()),
            y: other.y.clone().or_else(|| self.y.clone()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Coord {
    pub flip: bool,
    pub fixed_ratio: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LegendPosition {
    #[default]
    Right,
    Left,
    Top,
    Bottom,
    None,
}

impl LegendPosition {
    pub fn as_str(self) -> &'static str {
        match self {
            LegendPosition::Right => "right",
            LegendPosition::Left => "left",
            LegendPosition::Top => "top",
            LegendPosition::Bottom => "bottom",
            LegendPosition::None => "none",
        }
    }
}

impl FromStr for LegendPosition {
    type Err = PlotError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "right" => Ok(LegendPosition::Right),
            "left" => Ok(LegendPosition::Left),
            "top" => Ok(LegendPosition::Top),
            "bottom" => Ok(LegendPosition::Bottom),
            "none" => Ok(LegendPosition::None),
            other => Err(PlotError::InvalidArgument(format!(
                "unknown legend position '{}' (expected right, left, top, bottom or none)",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SmoothMethod {
    #[default]
    Loess,
    Linear,
}

impl SmoothMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            SmoothMethod::Loess => "loess",
            SmoothMethod::Linear => "lm",
        }
    }
}

impl FromStr for SmoothMethod {
    type Err = PlotError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "loess" | "lowess" => Ok(SmoothMethod::Loess),
            "lm" | "linear" => Ok(SmoothMethod::Linear),
            other => Err(PlotError::InvalidArgument(format!(
                "unknown smoothing method '{}' (expected loess or lm)",
                other
            ))),
        }
    }
}

/// Statistical layer drawn on top of the base geometry.
#[derive(Debug, Clone, PartialEq)]
pub enum Overlay {
    Smooth {
        method: SmoothMethod,
        /// Loess neighbourhood as a fraction of the data; ignored for `lm`.
        span: Option<f64>,
    },
}

impl Overlay {
    fn same_kind(&self, other: &Overlay) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Static,
    Interactive,
}

impl Backend {
    pub fn as_str(self) -> &'static str {
        match self {
            Backend::Static => "static",
            Backend::Interactive => "interactive",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Full declarative state of one chart.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlotConfig {
    pub geometry: Option<Geometry>,
    pub mappings: BTreeMap<Aesthetic, AestheticValue>,
    pub scales: BTreeMap<Axis, AxisScale>,
    pub facets: Facets,
    pub labels: Labels,
    pub theme: ThemeName,
    pub backend: Backend,
    pub overlays: Vec<Overlay>,
    pub bins: Option<usize>,
    pub coord: Coord,
    pub legend: LegendPosition,
    pub palette: Option<Palette>,
}

impl PlotConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mapping(&self, aesthetic: Aesthetic) -> Option<&AestheticValue> {
        self.mappings.get(&aesthetic)
    }

    /// Column bound to `aesthetic`, if it is data-driven.
    pub fn column(&self, aesthetic: Aesthetic) -> Option<&str> {
        self.mapping(aesthetic).and_then(AestheticValue::column)
    }

    /// Fixed value bound to `aesthetic`, if any.
    pub fn literal(&self, aesthetic: Aesthetic) -> Option<&Literal> {
        self.mapping(aesthetic).and_then(AestheticValue::literal)
    }

    pub fn scale(&self, axis: Axis) -> AxisScale {
        self.scales.get(&axis).copied().unwrap_or_default()
    }

    pub fn smooth(&self) -> Option<(SmoothMethod, Option<f64>)> {
        self.overlays.iter().find_map(|o| match o {
            Overlay::Smooth { method, span } => Some((*method, *span)),
        })
    }

    /// Every column name the configuration refers to, in a stable order.
    pub fn referenced_columns(&self) -> Vec<&str> {
        let mut columns: Vec<&str> = self
            .mappings
            .values()
            .filter_map(AestheticValue::column)
            .collect();
        for c in self.facets.columns() {
            if !columns.contains(&c) {
                columns.push(c);
            }
        }
        columns
    }

    /// First required aesthetic of the geometry that is not mapped to a column.
    pub fn missing_required(&self) -> Option<Aesthetic> {
        let geometry = self.geometry?;
        geometry
            .required_aesthetics()
            .iter()
            .copied()
            .find(|aes| self.column(*aes).is_none())
    }

    pub fn with_geometry(&self, geometry: Geometry) -> Self {
        Self {
            geometry: Some(geometry),
            ..self.clone()
        }
    }

    pub fn with_mapping(&self, aesthetic: Aesthetic, value: AestheticValue) -> Self {
        let mut mappings = self.mappings.clone();
        mappings.insert(aesthetic, value);
        Self {
            mappings,
            ..self.clone()
        }
    }

    pub fn with_scale(&self, axis: Axis, scale: AxisScale) -> Self {
        let mut scales = self.scales.clone();
        scales.insert(axis, scale);
        Self {
            scales,
            ..self.clone()
        }
    }

    pub fn with_facets(&self, facets: Facets) -> Self {
        Self {
            facets,
            ..self.clone()
        }
    }

    pub fn with_labels(&self, labels: Labels) -> Self {
        Self {
            labels,
            ..self.clone()
        }
    }

    pub fn with_theme(&self, theme: ThemeName) -> Self {
        Self {
            theme,
            ..self.clone()
        }
    }

    pub fn with_backend(&self, backend: Backend) -> Self {
        Self {
            backend,
            ..self.clone()
        }
    }

    /// Add an overlay, replacing one of the same kind.
    pub fn with_overlay(&self, overlay: Overlay) -> Self {
        let mut overlays: Vec<Overlay> = self
            .overlays
            .iter()
            .filter(|o| !o.same_kind(&overlay))
            .cloned()
            .collect();
        overlays.push(overlay);
        Self {
            overlays,
            ..self.clone()
        }
    }

    pub fn with_bins(&self, bins: Option<usize>) -> Self {
        Self {
            bins,
            ..self.clone()
        }
    }

    pub fn with_coord(&self, coord: Coord) -> Self {
        Self {
            coord,
            ..self.clone()
        }
    }

    pub fn with_legend(&self, legend: LegendPosition) -> Self {
        Self {
            legend,
            ..self.clone()
        }
    }

    pub fn with_palette(&self, palette: Palette) -> Self {
        Self {
            palette: Some(palette),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PlotConfig::new();
        assert_eq!(config.geometry, None);
        assert_eq!(config.theme, ThemeName::Default);
        assert_eq!(config.backend, Backend::Static);
        assert!(config.mappings.is_empty());
    }

    #[test]
    fn test_with_mapping_leaves_source_untouched() {
        let base = PlotConfig::new().with_mapping(Aesthetic::X, AestheticValue::Column("a".into()));
        let next = base.with_mapping(Aesthetic::X, AestheticValue::Column("b".into()));
        assert_eq!(base.column(Aesthetic::X), Some("a"));
        assert_eq!(next.column(Aesthetic::X), Some("b"));
    }

    #[test]
    fn test_missing_required_heatmap() {
        let config = PlotConfig::new()
            .with_geometry(Geometry::Heatmap)
            .with_mapping(Aesthetic::X, AestheticValue::Column("x".into()))
            .with_mapping(Aesthetic::Y, AestheticValue::Column("y".into()));
        assert_eq!(config.missing_required(), Some(Aesthetic::Color));
    }

    #[test]
    fn test_literal_does_not_satisfy_required_mapping() {
        let config = PlotConfig::new()
            .with_geometry(Geometry::Density)
            .with_mapping(Aesthetic::X, AestheticValue::Literal(Literal::Number(1.0)));
        assert_eq!(config.missing_required(), Some(Aesthetic::X));
    }

    #[test]
    fn test_overlay_replaces_same_kind() {
        let config = PlotConfig::new()
            .with_overlay(Overlay::Smooth {
                method: SmoothMethod::Loess,
                span: None,
            })
            .with_overlay(Overlay::Smooth {
                method: SmoothMethod::Linear,
                span: None,
            });
        assert_eq!(config.overlays.len(), 1);
        assert_eq!(config.smooth(), Some((SmoothMethod::Linear, None)));
    }

    #[test]
    fn test_referenced_columns_include_facets() {
        let config = PlotConfig::new()
            .with_mapping(Aesthetic::X, AestheticValue::Column("x".into()))
            .with_mapping(Aesthetic::Color, AestheticValue::Column("g".into()))
            .with_facets(Facets {
                wrap: Some("g".into()),
                ..Facets::default()
            });
        assert_eq!(config.referenced_columns(), vec!["x", "g"]);
    }

    #[test]
    fn test_labels_merge() {
        let base = Labels {
            title: Some("T".into()),
            x: Some("X".into()),
            y: None,
        };
        let merged = base.merged(&Labels {
            y: Some("Y".into()),
            ..Labels::default()
        });
        assert_eq!(merged.title.as_deref(), Some("T"));
        assert_eq!(merged.x.as_deref(), Some("X"));
        assert_eq!(merged.y.as_deref(), Some("Y"));
    }

    #[test]
    fn test_smooth_method_aliases() {
        assert_eq!("lm".parse::<SmoothMethod>().unwrap(), SmoothMethod::Linear);
        assert_eq!("LOESS".parse::<SmoothMethod>().unwrap(), SmoothMethod::Loess);
        assert!("spline".parse::<SmoothMethod>().is_err());
    }

    #[test]
    fn test_transform_value() {
        let log = AxisScale {
            transform: Some(ScaleTransform::Log10),
            limits: None,
        };
        assert_eq!(log.transform_value(Axis::Y, 100.0).unwrap(), 2.0);
        assert!(log.transform_value(Axis::Y, f64::NAN).unwrap().is_nan());
        assert!(matches!(log.transform_value(Axis::X, 0.0), Err(PlotError::ScaleDomain(_))));

        let rev = AxisScale {
            transform: Some(ScaleTransform::Reverse),
            limits: None,
        };
        assert_eq!(rev.transform_value(Axis::X, 3.0).unwrap(), -3.0);
        assert_eq!(AxisScale::default().transform_value(Axis::X, 3.0).unwrap(), 3.0);
    }
}
