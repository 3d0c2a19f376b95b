//! Static grammar-of-graphics backend.
//!
//! The adapter translates a [`PlotConfig`] into a ggplot-style list of construction
//! calls ([`GgPlot`]); the raster renderer then draws that list with plotters.

use super::Adapter;
use crate::artifact::{extension, unsupported_format, Capability, Figure, FigureSummary, Rendered, Sink};
use crate::config::{
    Aesthetic, AestheticValue, Axis, AxisScale, Backend, Coord, Facets, Geometry, Labels,
    LegendPosition, Literal, PlotConfig, ScaleTransform, SmoothMethod,
};
use crate::data::DataTable;
use crate::error::{PlotError, Result};
use crate::raster::{self, SceneGraph};
use crate::theme::{ThemeName, Palette};
use crate::{OutputFormat, RenderOptions};
use log::{debug, warn};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

// Geometry -> geom call. Bar has two calls: geom_col when y is mapped.
const GEOM_CALLS: &[(Geometry, &str)] = &[
    (Geometry::Scatter, "geom_point"),
    (Geometry::Line, "geom_line"),
    (Geometry::Bar, "geom_bar"),
    (Geometry::Bar, "geom_col"),
    (Geometry::Histogram, "geom_histogram"),
    (Geometry::Box, "geom_boxplot"),
    (Geometry::Violin, "geom_violin"),
    (Geometry::Density, "geom_density"),
    (Geometry::Heatmap, "geom_tile"),
];

const AES_NAMES: &[(Aesthetic, &str)] = &[
    (Aesthetic::X, "x"),
    (Aesthetic::Y, "y"),
    (Aesthetic::Z, "z"),
    (Aesthetic::Color, "colour"),
    (Aesthetic::Fill, "fill"),
    (Aesthetic::Size, "size"),
    (Aesthetic::Shape, "shape"),
    (Aesthetic::Alpha, "alpha"),
];

fn geom_call(geometry: Geometry, has_y: bool) -> Option<&'static str> {
    if geometry == Geometry::Bar && has_y {
        return Some("geom_col");
    }
    GEOM_CALLS
        .iter()
        .find(|(g, _)| *g == geometry)
        .map(|(_, call)| *call)
}

fn geometry_of(call: &str) -> Option<Geometry> {
    GEOM_CALLS
        .iter()
        .find(|(_, c)| *c == call)
        .map(|(g, _)| *g)
}

fn native_name(geometry: Geometry, aesthetic: Aesthetic) -> &'static str {
    // tiles are coloured by fill
    if geometry == Geometry::Heatmap && aesthetic == Aesthetic::Color {
        return "fill";
    }
    AES_NAMES
        .iter()
        .find(|(a, _)| *a == aesthetic)
        .map(|(_, n)| *n)
        .unwrap_or("unknown")
}

/// Aesthetic mapped to a column inside `aes()`.
#[derive(Debug, Clone, PartialEq)]
pub struct AesBinding {
    pub aesthetic: Aesthetic,
    pub native: &'static str,
    pub column: String,
}

/// Fixed aesthetic passed as a geom parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct GeomParam {
    pub aesthetic: Aesthetic,
    pub native: &'static str,
    pub value: Literal,
}

/// One construction call of a static figure.
#[derive(Debug, Clone, PartialEq)]
pub enum GgComponent {
    Geom {
        call: &'static str,
        params: Vec<GeomParam>,
        bins: Option<usize>,
    },
    Aes(Vec<AesBinding>),
    ScaleManual {
        native: &'static str,
        values: Vec<String>,
    },
    Smooth {
        method: SmoothMethod,
        span: Option<f64>,
    },
    FacetWrap {
        column: String,
    },
    FacetGrid {
        rows: Option<String>,
        cols: Option<String>,
    },
    Scale {
        axis: Axis,
        transform: ScaleTransform,
    },
    Lims {
        axis: Axis,
        min: f64,
        max: f64,
    },
    CoordFlip,
    CoordFixed {
        ratio: f64,
    },
    Labs(Labels),
    Theme {
        name: ThemeName,
        legend: LegendPosition,
    },
}

/// A static figure as an ordered list of ggplot-style calls.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GgPlot {
    pub components: Vec<GgComponent>,
}

impl GgPlot {
    pub fn geometry(&self) -> Option<Geometry> {
        self.components.iter().find_map(|c| match c {
            GgComponent::Geom { call, .. } => geometry_of(call),
            _ => None,
        })
    }

    pub fn bins(&self) -> Option<usize> {
        self.components.iter().find_map(|c| match c {
            GgComponent::Geom { bins, .. } => *bins,
            _ => None,
        })
    }

    pub fn aes_column(&self, aesthetic: Aesthetic) -> Option<&str> {
        self.components.iter().find_map(|c| match c {
            GgComponent::Aes(bindings) => bindings
                .iter()
                .find(|b| b.aesthetic == aesthetic)
                .map(|b| b.column.as_str()),
            _ => None,
        })
    }

    pub fn param(&self, aesthetic: Aesthetic) -> Option<&Literal> {
        self.components.iter().find_map(|c| match c {
            GgComponent::Geom { params, .. } => params
                .iter()
                .find(|p| p.aesthetic == aesthetic)
                .map(|p| &p.value),
            _ => None,
        })
    }

    pub fn palette(&self) -> Option<Palette> {
        self.components.iter().find_map(|c| match c {
            GgComponent::ScaleManual { values, .. } => Some(Palette::Custom(values.clone())),
            _ => None,
        })
    }

    pub fn smooth(&self) -> Option<(SmoothMethod, Option<f64>)> {
        self.components.iter().find_map(|c| match c {
            GgComponent::Smooth { method, span } => Some((*method, *span)),
            _ => None,
        })
    }

    pub fn facets(&self) -> Facets {
        self.components
            .iter()
            .find_map(|c| match c {
                GgComponent::FacetWrap { column } => Some(Facets {
                    wrap: Some(column.clone()),
                    ..Facets::default()
                }),
                GgComponent::FacetGrid { rows, cols } => Some(Facets {
                    rows: rows.clone(),
                    cols: cols.clone(),
                    wrap: None,
                }),
                _ => None,
            })
            .unwrap_or_default()
    }

    pub fn scale(&self, axis: Axis) -> AxisScale {
        let mut scale = AxisScale::default();
        for c in &self.components {
            match c {
                GgComponent::Scale { axis: a, transform } if *a == axis => {
                    scale.transform = Some(*transform)
                }
                GgComponent::Lims { axis: a, min, max } if *a == axis => {
                    scale.limits = Some((*min, *max))
                }
                _ => {}
            }
        }
        scale
    }

    pub fn coord(&self) -> Coord {
        let mut coord = Coord::default();
        for c in &self.components {
            match c {
                GgComponent::CoordFlip => coord.flip = true,
                GgComponent::CoordFixed { ratio } => coord.fixed_ratio = Some(*ratio),
                _ => {}
            }
        }
        coord
    }

    pub fn labels(&self) -> Labels {
        self.components
            .iter()
            .find_map(|c| match c {
                GgComponent::Labs(l) => Some(l.clone()),
                _ => None,
            })
            .unwrap_or_default()
    }

    pub fn theme(&self) -> (ThemeName, LegendPosition) {
        self.components
            .iter()
            .find_map(|c| match c {
                GgComponent::Theme { name, legend } => Some((*name, *legend)),
                _ => None,
            })
            .unwrap_or_default()
    }

    /// Mappings as recovered from the calls, keyed by abstract aesthetic.
    pub fn mappings(&self) -> BTreeMap<Aesthetic, AestheticValue> {
        let mut out = BTreeMap::new();
        for c in &self.components {
            match c {
                GgComponent::Aes(bindings) => {
                    for b in bindings {
                        out.insert(b.aesthetic, AestheticValue::Column(b.column.clone()));
                    }
                }
                GgComponent::Geom { params, .. } => {
                    for p in params {
                        out.insert(p.aesthetic, AestheticValue::Literal(p.value.clone()));
                    }
                }
                _ => {}
            }
        }
        out
    }

    /// The figure written as a ggplot expression.
    pub fn to_code(&self) -> String {
        let mut head = String::from("ggplot(data");
        let mut layers = Vec::new();

        for c in &self.components {
            match c {
                GgComponent::Aes(bindings) => {
                    let args: Vec<String> = bindings
                        .iter()
                        .map(|b| format!("{} = {}", b.native, b.column))
                        .collect();
                    head.push_str(&format!(", aes({})", args.join(", ")));
                }
                GgComponent::Geom { call, params, bins } => {
                    let mut args: Vec<String> = params
                        .iter()
                        .map(|p| match &p.value {
                            Literal::Text(s) => format!("{} = \"{}\"", p.native, s),
                            other => format!("{} = {}", p.native, other),
                        })
                        .collect();
                    if let Some(b) = bins {
                        args.push(format!("bins = {}", b));
                    }
                    layers.push(format!("{}({})", call, args.join(", ")));
                }
                GgComponent::ScaleManual { native, values } => {
                    let quoted: Vec<String> = values.iter().map(|v| format!("\"{}\"", v)).collect();
                    layers.push(format!("scale_{}_manual(values = c({}))", native, quoted.join(", ")));
                }
                GgComponent::Smooth { method, span } => match span {
                    Some(s) => layers.push(format!("geom_smooth(method = \"{}\", span = {})", method.as_str(), s)),
                    None => layers.push(format!("geom_smooth(method = \"{}\")", method.as_str())),
                },
                GgComponent::FacetWrap { column } => layers.push(format!("facet_wrap(~{})", column)),
                GgComponent::FacetGrid { rows, cols } => layers.push(format!(
                    "facet_grid({} ~ {})",
                    rows.as_deref().unwrap_or("."),
                    cols.as_deref().unwrap_or(".")
                )),
                GgComponent::Scale { axis, transform } => layers.push(match transform {
                    ScaleTransform::Log10 => format!("scale_{}_log10()", axis),
                    ScaleTransform::Reverse => format!("scale_{}_reverse()", axis),
                }),
                GgComponent::Lims { axis, min, max } => layers.push(format!("{}lim({}, {})", axis, min, max)),
                GgComponent::CoordFlip => layers.push("coord_flip()".to_string()),
                GgComponent::CoordFixed { ratio } => layers.push(format!("coord_fixed(ratio = {})", ratio)),
                GgComponent::Labs(l) => {
                    let mut args = Vec::new();
                    if let Some(t) = &l.title {
                        args.push(format!("title = \"{}\"", t));
                    }
                    if let Some(x) = &l.x {
                        args.push(format!("x = \"{}\"", x));
                    }
                    if let Some(y) = &l.y {
                        args.push(format!("y = \"{}\"", y));
                    }
                    if !args.is_empty() {
                        layers.push(format!("labs({})", args.join(", ")));
                    }
                }
                GgComponent::Theme { name, legend } => {
                    layers.push(format!("{}()", name.preset().ggplot_theme));
                    if *legend != LegendPosition::Right {
                        layers.push(format!("theme(legend.position = \"{}\")", legend.as_str()));
                    }
                }
            }
        }

        head.push(')');
        std::iter::once(head)
            .chain(layers)
            .collect::<Vec<_>>()
            .join(" + ")
    }
}

/// Translate a configuration into calls, in the fixed order
/// geometry, aesthetics, overlays, facets, scales and coords, labels, theme.
pub fn translate(config: &PlotConfig) -> Result<GgPlot> {
    let geometry = config.geometry.ok_or(PlotError::MissingGeometry)?;
    let call = geom_call(geometry, config.column(Aesthetic::Y).is_some()).ok_or_else(|| {
        PlotError::UnsupportedGeometryForBackend {
            geometry: geometry.to_string(),
            backend: Backend::Static.to_string(),
        }
    })?;

    let mut bindings = Vec::new();
    let mut params = Vec::new();
    for (aes, value) in &config.mappings {
        let native = native_name(geometry, *aes);
        match value {
            AestheticValue::Column(c) => bindings.push(AesBinding {
                aesthetic: *aes,
                native,
                column: c.clone(),
            }),
            AestheticValue::Literal(l) => params.push(GeomParam {
                aesthetic: *aes,
                native,
                value: l.clone(),
            }),
        }
    }

    let mut components = vec![
        GgComponent::Geom {
            call,
            params,
            bins: if geometry == Geometry::Histogram { config.bins } else { None },
        },
        GgComponent::Aes(bindings),
    ];

    if let Some(palette) = &config.palette {
        let native = if geometry == Geometry::Heatmap || config.column(Aesthetic::Fill).is_some() {
            "fill"
        } else {
            "colour"
        };
        components.push(GgComponent::ScaleManual {
            native,
            values: palette.color_strings(),
        });
    }

    if let Some((method, span)) = config.smooth() {
        if matches!(geometry, Geometry::Scatter | Geometry::Line) {
            components.push(GgComponent::Smooth { method, span });
        } else {
            warn!("smoothing is only drawn over scatter and line plots; ignored for {}", geometry);
        }
    }

    let facets = &config.facets;
    if let Some(wrap) = &facets.wrap {
        components.push(GgComponent::FacetWrap { column: wrap.clone() });
    } else if facets.rows.is_some() || facets.cols.is_some() {
        components.push(GgComponent::FacetGrid {
            rows: facets.rows.clone(),
            cols: facets.cols.clone(),
        });
    }

    for (axis, scale) in &config.scales {
        if let Some(transform) = scale.transform {
            components.push(GgComponent::Scale { axis: *axis, transform });
        }
        if let Some((min, max)) = scale.limits {
            components.push(GgComponent::Lims { axis: *axis, min, max });
        }
    }
    if config.coord.flip {
        components.push(GgComponent::CoordFlip);
    }
    if let Some(ratio) = config.coord.fixed_ratio {
        components.push(GgComponent::CoordFixed { ratio });
    }

    components.push(GgComponent::Labs(config.labels.clone()));
    components.push(GgComponent::Theme {
        name: config.theme,
        legend: config.legend,
    });

    Ok(GgPlot { components })
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StaticAdapter;

impl Adapter for StaticAdapter {
    type Figure = StaticFigure;

    fn backend(&self) -> Backend {
        Backend::Static
    }

    fn supports(&self, geometry: Geometry) -> bool {
        GEOM_CALLS.iter().any(|(g, _)| *g == geometry)
    }

    fn build(&self, table: &Arc<dyn DataTable>, config: &PlotConfig) -> Result<StaticFigure> {
        let plot = translate(config)?;
        debug!("static figure: {}", plot.to_code());
        let scene = raster::compile(&plot, table.as_ref())?;
        Ok(StaticFigure { plot, scene })
    }
}

/// Static artifact: the call list plus the resolved scene it draws.
#[derive(Debug, Clone)]
pub struct StaticFigure {
    pub plot: GgPlot,
    scene: SceneGraph,
}

impl StaticFigure {
    pub fn scene(&self) -> &SceneGraph {
        &self.scene
    }

    fn encode(&self, format: OutputFormat, options: &RenderOptions) -> Result<Rendered> {
        let size = options.pixel_size()?;
        match format {
            OutputFormat::Png => Ok(Rendered::Png(raster::render_png(&self.scene, size)?)),
            OutputFormat::Svg => Ok(Rendered::Svg(raster::render_svg(&self.scene, size)?)),
        }
    }
}

impl Figure for StaticFigure {
    fn display(&self, options: &RenderOptions, sink: &mut dyn Sink) -> Result<()> {
        sink.display(&self.encode(options.format, options)?)
    }

    fn save(&self, path: &Path, options: &RenderOptions, sink: &mut dyn Sink) -> Result<()> {
        let format = match extension(path).as_deref() {
            Some("png") => OutputFormat::Png,
            Some("svg") => OutputFormat::Svg,
            _ => return Err(unsupported_format(path, Backend::Static)),
        };
        sink.write(&self.encode(format, options)?, path)
    }

    fn to_html(&self, _options: &RenderOptions) -> Result<String> {
        Err(PlotError::HtmlExportNotSupported {
            backend: Backend::Static.to_string(),
        })
    }

    fn summary(&self) -> FigureSummary {
        FigureSummary {
            backend: Backend::Static,
            geometry: self.plot.geometry().unwrap_or(Geometry::Scatter),
            mappings: self.plot.mappings(),
            labels: self.plot.labels(),
            theme: self.plot.theme().0,
        }
    }

    fn capabilities(&self) -> &'static [Capability] {
        &[Capability::Display, Capability::File]
    }
}
