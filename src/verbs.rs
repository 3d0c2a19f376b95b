//! Deferred transformations of a [`PlotConfig`].
//!
//! A [`Verb`] binds its parameters when it is constructed and does nothing until
//! [`Verb::apply`] is called. That is what lets `plot >> add_color("species")` and
//! `plot.add_color("species")` share one implementation.

use crate::config::{
    Aesthetic, AestheticValue, Axis, AxisScale, Backend, Coord, Facets, Geometry, Labels,
    LegendPosition, Literal, Overlay, PlotConfig, ScaleTransform, SmoothMethod,
};
use crate::error::{PlotError, Result};
use crate::theme::{parse_color, Palette, PaletteName, ThemeName};
use log::debug;
use std::path::PathBuf;

/// Argument of an aesthetic verb: a column, a fixed value, or (invalidly) both.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AesArg {
    pub column: Option<String>,
    pub value: Option<Literal>,
}

impl AesArg {
    pub fn new(column: Option<String>, value: Option<Literal>) -> Self {
        Self { column, value }
    }

    fn resolve(&self, aesthetic: Aesthetic) -> Result<AestheticValue> {
        match (&self.column, &self.value) {
            (Some(_), Some(_)) => Err(PlotError::AmbiguousAesthetic {
                aesthetic: aesthetic.to_string(),
            }),
            (Some(c), None) => Ok(AestheticValue::Column(c.clone())),
            (None, Some(v)) => Ok(AestheticValue::Literal(v.clone())),
            (None, None) => Err(PlotError::InvalidArgument(format!(
                "{} needs either a column or a fixed value",
                aesthetic
            ))),
        }
    }
}

/// Data-driven aesthetic argument.
pub fn col(name: impl Into<String>) -> AesArg {
    AesArg {
        column: Some(name.into()),
        value: None,
    }
}

/// Fixed aesthetic argument.
pub fn lit(value: impl Into<Literal>) -> AesArg {
    AesArg {
        column: None,
        value: Some(value.into()),
    }
}

/// A bare string names a column.
impl From<&str> for AesArg {
    fn from(name: &str) -> Self {
        col(name)
    }
}

impl From<String> for AesArg {
    fn from(name: String) -> Self {
        col(name)
    }
}

impl From<Literal> for AesArg {
    fn from(value: Literal) -> Self {
        lit(value)
    }
}

/// Palette request, validated when the verb is applied.
#[derive(Debug, Clone, PartialEq)]
pub enum PaletteArg {
    Named(String),
    Custom(Vec<String>),
}

impl PaletteArg {
    fn resolve(&self) -> Result<Palette> {
        match self {
            PaletteArg::Named(name) => Ok(Palette::Named(name.parse::<PaletteName>()?)),
            PaletteArg::Custom(colors) => {
                if colors.is_empty() {
                    return Err(PlotError::InvalidArgument(
                        "custom palette needs at least one colour".to_string(),
                    ));
                }
                if let Some(bad) = colors.iter().find(|c| parse_color(c).is_none()) {
                    return Err(PlotError::InvalidArgument(format!(
                        "invalid colour '{}' in palette",
                        bad
                    )));
                }
                Ok(Palette::Custom(colors.clone()))
            }
        }
    }
}

impl From<&str> for PaletteArg {
    fn from(name: &str) -> Self {
        PaletteArg::Named(name.to_string())
    }
}

impl From<Vec<String>> for PaletteArg {
    fn from(colors: Vec<String>) -> Self {
        PaletteArg::Custom(colors)
    }
}

/// One declarative intent with its parameters already bound.
#[derive(Debug, Clone, PartialEq)]
pub enum Verb {
    Init {
        geometry: Geometry,
        mappings: Vec<(Aesthetic, String)>,
        bins: Option<usize>,
    },
    Aesthetic {
        aesthetic: Aesthetic,
        arg: AesArg,
        palette: Option<PaletteArg>,
    },
    Smooth {
        method: SmoothMethod,
        span: Option<f64>,
    },
    Facets(Facets),
    Labels(Labels),
    Scale {
        axis: Axis,
        transform: ScaleTransform,
    },
    Limits {
        axis: Axis,
        min: f64,
        max: f64,
    },
    CoordFlip,
    CoordFixed(f64),
    Theme(String),
    Legend(String),
    Palette(PaletteArg),
    Backend(Backend),
}

impl Verb {
    /// Short name used in logs and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Verb::Init { geometry, .. } => match geometry {
                Geometry::Scatter => "plot_points",
                Geometry::Line => "plot_lines",
                Geometry::Bar => "plot_bars",
                Geometry::Histogram => "plot_histogram",
                Geometry::Box => "plot_box",
                Geometry::Violin => "plot_violin",
                Geometry::Density => "plot_density",
                Geometry::Heatmap => "plot_heatmap",
                Geometry::Contour => "plot_contour",
            },
            Verb::Aesthetic { aesthetic, .. } => match aesthetic {
                Aesthetic::Color => "add_color",
                Aesthetic::Fill => "add_fill",
                Aesthetic::Size => "add_size",
                Aesthetic::Shape => "add_shape",
                Aesthetic::Alpha => "add_alpha",
                Aesthetic::X | Aesthetic::Y | Aesthetic::Z => "add_position",
            },
            Verb::Smooth { .. } => "add_smooth",
            Verb::Facets(_) => "add_facets",
            Verb::Labels(_) => "add_labels",
            Verb::Scale {
                axis: Axis::X,
                transform: ScaleTransform::Log10,
            } => "scale_x_log",
            Verb::Scale {
                axis: Axis::Y,
                transform: ScaleTransform::Log10,
            } => "scale_y_log",
            Verb::Scale {
                axis: Axis::X,
                transform: ScaleTransform::Reverse,
            } => "scale_x_reverse",
            Verb::Scale {
                axis: Axis::Y,
                transform: ScaleTransform::Reverse,
            } => "scale_y_reverse",
            Verb::Limits { axis: Axis::X, .. } => "xlim",
            Verb::Limits { axis: Axis::Y, .. } => "ylim",
            Verb::CoordFlip => "coord_flip",
            Verb::CoordFixed(_) => "coord_fixed",
            Verb::Theme(_) => "set_theme",
            Verb::Legend(_) => "set_legend",
            Verb::Palette(_) => "set_palette",
            Verb::Backend(Backend::Interactive) => "to_interactive",
            Verb::Backend(Backend::Static) => "to_static",
        }
    }

    /// Produce a new configuration; `config` is never modified.
    pub fn apply(&self, config: &PlotConfig) -> Result<PlotConfig> {
        debug!("applying {}", self.name());
        match self {
            Verb::Init {
                geometry,
                mappings,
                bins,
            } => {
                if let Some(existing) = config.geometry {
                    return Err(PlotError::ConflictingGeometry {
                        existing: existing.to_string(),
                        requested: geometry.to_string(),
                    });
                }
                if *bins == Some(0) {
                    return Err(PlotError::InvalidArgument(
                        "histogram needs at least one bin".to_string(),
                    ));
                }
                let mut next = config.with_geometry(*geometry);
                for (aes, column) in mappings {
                    next = next.with_mapping(*aes, AestheticValue::Column(column.clone()));
                }
                if bins.is_some() {
                    next = next.with_bins(*bins);
                }
                Ok(next)
            }
            Verb::Aesthetic {
                aesthetic,
                arg,
                palette,
            } => {
                let value = arg.resolve(*aesthetic)?;
                if let (Aesthetic::Alpha, AestheticValue::Literal(lit)) = (*aesthetic, &value) {
                    if !lit.as_f64().is_some_and(|n| (0.0..=1.0).contains(&n)) {
                        return Err(PlotError::InvalidArgument(format!(
                            "alpha must be a number between 0 and 1, got {}",
                            lit
                        )));
                    }
                }
                let next = config.with_mapping(*aesthetic, value);
                match palette {
                    Some(p) => Ok(next.with_palette(p.resolve()?)),
                    None => Ok(next),
                }
            }
            Verb::Smooth { method, span } => {
                if let Some(s) = span {
                    if !(*s > 0.0 && *s <= 1.0) {
                        return Err(PlotError::InvalidArgument(format!(
                            "smoothing span must be in (0, 1], got {}",
                            s
                        )));
                    }
                }
                Ok(config.with_overlay(Overlay::Smooth {
                    method: *method,
                    span: *span,
                }))
            }
            Verb::Facets(facets) => {
                if facets.is_empty() {
                    return Err(PlotError::InvalidArgument(
                        "add_facets needs rows, cols or wrap".to_string(),
                    ));
                }
                if facets.wrap.is_some() && (facets.rows.is_some() || facets.cols.is_some()) {
                    return Err(PlotError::InvalidArgument(
                        "facet wrap cannot be combined with rows or cols".to_string(),
                    ));
                }
                Ok(config.with_facets(facets.clone()))
            }
            Verb::Labels(labels) => Ok(config.with_labels(config.labels.merged(labels))),
            Verb::Scale { axis, transform } => {
                let scale = AxisScale {
                    transform: Some(*transform),
                    ..config.scale(*axis)
                };
                Ok(config.with_scale(*axis, scale))
            }
            Verb::Limits { axis, min, max } => {
                if !min.is_finite() || !max.is_finite() || min >= max {
                    return Err(PlotError::InvalidArgument(format!(
                        "{}lim needs finite min < max, got ({}, {})",
                        axis, min, max
                    )));
                }
                let scale = AxisScale {
                    limits: Some((*min, *max)),
                    ..config.scale(*axis)
                };
                Ok(config.with_scale(*axis, scale))
            }
            Verb::CoordFlip => Ok(config.with_coord(Coord {
                flip: true,
                ..config.coord
            })),
            Verb::CoordFixed(ratio) => {
                if !(ratio.is_finite() && *ratio > 0.0) {
                    return Err(PlotError::InvalidArgument(format!(
                        "coord_fixed ratio must be positive, got {}",
                        ratio
                    )));
                }
                Ok(config.with_coord(Coord {
                    fixed_ratio: Some(*ratio),
                    ..config.coord
                }))
            }
            Verb::Theme(name) => Ok(config.with_theme(name.parse::<ThemeName>()?)),
            Verb::Legend(position) => Ok(config.with_legend(position.parse::<LegendPosition>()?)),
            Verb::Palette(palette) => Ok(config.with_palette(palette.resolve()?)),
            Verb::Backend(backend) => {
                if config.backend == *backend {
                    Ok(config.clone())
                } else {
                    Ok(config.with_backend(*backend))
                }
            }
        }
    }
}

/// Terminal step of a pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum Output {
    Show,
    Save {
        path: PathBuf,
        width: Option<u32>,
        height: Option<u32>,
        dpi: Option<u32>,
    },
    /// HTML fragment, written to `path` or displayed when no path is given.
    Html { path: Option<PathBuf> },
}

/// One element of a parsed pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Verb(Verb),
    Output(Output),
}

/// Marker produced by [`plot`]; `table >> plot()` starts a chain.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlotSeed;

pub fn plot() -> PlotSeed {
    PlotSeed
}

fn init(geometry: Geometry, mappings: Vec<(Aesthetic, &str)>) -> Verb {
    Verb::Init {
        geometry,
        mappings: mappings
            .into_iter()
            .map(|(aes, c)| (aes, c.to_string()))
            .collect(),
        bins: None,
    }
}

pub fn plot_points(x: &str, y: &str) -> Verb {
    init(Geometry::Scatter, vec![(Aesthetic::X, x), (Aesthetic::Y, y)])
}

pub fn plot_lines(x: &str, y: &str) -> Verb {
    init(Geometry::Line, vec![(Aesthetic::X, x), (Aesthetic::Y, y)])
}

/// Bars of `y` per `x`; without `y` the bars count rows.
pub fn plot_bars(x: &str, y: Option<&str>) -> Verb {
    let mut mappings = vec![(Aesthetic::X, x)];
    if let Some(y) = y {
        mappings.push((Aesthetic::Y, y));
    }
    init(Geometry::Bar, mappings)
}

pub fn plot_histogram(x: &str, bins: Option<usize>) -> Verb {
    Verb::Init {
        geometry: Geometry::Histogram,
        mappings: vec![(Aesthetic::X, x.to_string())],
        bins,
    }
}

pub fn plot_box(x: Option<&str>, y: &str) -> Verb {
    let mut mappings = vec![(Aesthetic::Y, y)];
    if let Some(x) = x {
        mappings.insert(0, (Aesthetic::X, x));
    }
    init(Geometry::Box, mappings)
}

pub fn plot_violin(x: Option<&str>, y: &str) -> Verb {
    let mut mappings = vec![(Aesthetic::Y, y)];
    if let Some(x) = x {
        mappings.insert(0, (Aesthetic::X, x));
    }
    init(Geometry::Violin, mappings)
}

pub fn plot_density(x: &str) -> Verb {
    init(Geometry::Density, vec![(Aesthetic::X, x)])
}

/// Heatmap of `value` over the `x`/`y` grid; `value` is bound to colour.
pub fn plot_heatmap(x: &str, y: &str, value: &str) -> Verb {
    init(
        Geometry::Heatmap,
        vec![(Aesthetic::X, x), (Aesthetic::Y, y), (Aesthetic::Color, value)],
    )
}

pub fn plot_contour(x: &str, y: &str, z: &str) -> Verb {
    init(
        Geometry::Contour,
        vec![(Aesthetic::X, x), (Aesthetic::Y, y), (Aesthetic::Z, z)],
    )
}

fn aesthetic(aesthetic: Aesthetic, arg: impl Into<AesArg>) -> Verb {
    Verb::Aesthetic {
        aesthetic,
        arg: arg.into(),
        palette: None,
    }
}

pub fn add_color(arg: impl Into<AesArg>) -> Verb {
    aesthetic(Aesthetic::Color, arg)
}

/// Colour mapping together with the palette to draw it with.
pub fn add_color_with_palette(arg: impl Into<AesArg>, palette: impl Into<PaletteArg>) -> Verb {
    Verb::Aesthetic {
        aesthetic: Aesthetic::Color,
        arg: arg.into(),
        palette: Some(palette.into()),
    }
}

pub fn add_fill(arg: impl Into<AesArg>) -> Verb {
    aesthetic(Aesthetic::Fill, arg)
}

pub fn add_size(arg: impl Into<AesArg>) -> Verb {
    aesthetic(Aesthetic::Size, arg)
}

pub fn add_shape(arg: impl Into<AesArg>) -> Verb {
    aesthetic(Aesthetic::Shape, arg)
}

pub fn add_alpha(arg: impl Into<AesArg>) -> Verb {
    aesthetic(Aesthetic::Alpha, arg)
}

pub fn add_smooth(method: SmoothMethod, span: Option<f64>) -> Verb {
    Verb::Smooth { method, span }
}

pub fn add_facets(rows: Option<&str>, cols: Option<&str>, wrap: Option<&str>) -> Verb {
    Verb::Facets(Facets {
        rows: rows.map(str::to_string),
        cols: cols.map(str::to_string),
        wrap: wrap.map(str::to_string),
    })
}

/// Set the given labels; labels passed as `None` keep their current value.
pub fn add_labels(title: Option<&str>, x: Option<&str>, y: Option<&str>) -> Verb {
    Verb::Labels(Labels {
        title: title.map(str::to_string),
        x: x.map(str::to_string),
        y: y.map(str::to_string),
    })
}

pub fn scale_x_log() -> Verb {
    Verb::Scale {
        axis: Axis::X,
        transform: ScaleTransform::Log10,
    }
}

pub fn scale_y_log() -> Verb {
    Verb::Scale {
        axis: Axis::Y,
        transform: ScaleTransform::Log10,
    }
}

pub fn scale_x_reverse() -> Verb {
    Verb::Scale {
        axis: Axis::X,
        transform: ScaleTransform::Reverse,
    }
}

pub fn scale_y_reverse() -> Verb {
    Verb::Scale {
        axis: Axis::Y,
        transform: ScaleTransform::Reverse,
    }
}

pub fn xlim(min: f64, max: f64) -> Verb {
    Verb::Limits {
        axis: Axis::X,
        min,
        max,
    }
}

pub fn ylim(min: f64, max: f64) -> Verb {
    Verb::Limits {
        axis: Axis::Y,
        min,
        max,
    }
}

pub fn coord_flip() -> Verb {
    Verb::CoordFlip
}

pub fn coord_fixed(ratio: f64) -> Verb {
    Verb::CoordFixed(ratio)
}

pub fn set_theme(name: &str) -> Verb {
    Verb::Theme(name.to_string())
}

pub fn set_legend(position: &str) -> Verb {
    Verb::Legend(position.to_string())
}

pub fn set_palette(palette: impl Into<PaletteArg>) -> Verb {
    Verb::Palette(palette.into())
}

pub fn to_interactive() -> Verb {
    Verb::Backend(Backend::Interactive)
}

pub fn to_static() -> Verb {
    Verb::Backend(Backend::Static)
}

/// Output step: display the figure on stdout.
pub fn show() -> Output {
    Output::Show
}

/// Output step: write the figure to `path`, encoded by its extension.
pub fn save(path: impl Into<PathBuf>) -> Output {
    Output::Save {
        path: path.into(),
        width: None,
        height: None,
        dpi: None,
    }
}

pub fn to_html() -> Output {
    Output::Html { path: None }
}
