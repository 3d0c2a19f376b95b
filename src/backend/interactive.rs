//! Interactive backend: a serde model of a Plotly figure.
//!
//! The adapter resolves the data up front, so the figure is plain JSON that a browser
//! renders with plotly.js. Statistics the client library cannot compute itself
//! (densities, smoothing) are evaluated here.

use super::{gradient_colors, group_colors, rescale, Adapter, DEFAULT_MARK};
use crate::artifact::{extension, unsupported_format, Capability, Figure, FigureSummary, Rendered, Sink};
use crate::config::{
    Aesthetic, AestheticValue, Axis, AxisScale, Backend, Geometry, Labels, LegendPosition,
    PlotConfig, SmoothMethod,
};
use crate::data::DataTable;
use crate::error::{PlotError, Result};
use crate::frame::{self, distinct, group_rows, is_numeric, numeric_column, text_column};
use crate::stat;
use crate::theme::{parse_color, to_hex, ThemeName};
use crate::RenderOptions;
use log::{debug, warn};
use plotters::style::RGBColor;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::sync::Arc;

const PLOTLY_CDN: &str = "https://cdn.plot.ly/plotly-2.27.0.min.js";
const PANEL_GAP: f64 = 0.04;

// Geometry -> trace type.
const TRACE_TYPES: &[(Geometry, &str)] = &[
    (Geometry::Scatter, "scatter"),
    (Geometry::Line, "scatter"),
    (Geometry::Bar, "bar"),
    (Geometry::Histogram, "histogram"),
    (Geometry::Box, "box"),
    (Geometry::Violin, "violin"),
    (Geometry::Density, "scatter"),
    (Geometry::Heatmap, "heatmap"),
    (Geometry::Contour, "contour"),
];

const SYMBOLS: [&str; 4] = ["circle", "triangle-up", "square", "cross"];

fn trace_type(geometry: Geometry) -> &'static str {
    TRACE_TYPES
        .iter()
        .find(|(g, _)| *g == geometry)
        .map(|(_, t)| *t)
        .unwrap_or("scatter")
}

fn symbol(name: &str) -> &'static str {
    match name.trim().to_lowercase().as_str() {
        "square" => "square",
        "triangle" => "triangle-up",
        "cross" | "plus" => "cross",
        _ => "circle",
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MarkerStyle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub colorscale: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub showscale: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub colorbar: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LineStyle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
}

/// One Plotly trace. Only the attributes this crate emits are modelled.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Trace {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub x: Vec<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub y: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marker: Option<MarkerStyle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<LineStyle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xaxis: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub yaxis: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbinsx: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbinsy: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orientation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub showlegend: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legendgroup: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub colorscale: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub colorbar: Option<Value>,
}

impl Trace {
    fn new(kind: &str) -> Self {
        Trace {
            kind: kind.to_string(),
            ..Trace::default()
        }
    }

    fn flipped(mut self) -> Trace {
        std::mem::swap(&mut self.x, &mut self.y);
        match self.kind.as_str() {
            "bar" | "box" | "violin" => self.orientation = Some("h".to_string()),
            "histogram" => self.nbinsy = self.nbinsx.take(),
            "heatmap" => self.z = self.z.take().map(transpose),
            _ => {}
        }
        self
    }
}

fn transpose(z: Value) -> Value {
    let Value::Array(rows) = z else { return z };
    let rows: Vec<Vec<Value>> = rows
        .into_iter()
        .map(|r| match r {
            Value::Array(cells) => cells,
            other => vec![other],
        })
        .collect();
    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    let columns: Vec<Value> = (0..width)
        .map(|c| {
            Value::Array(
                rows.iter()
                    .map(|r| r.get(c).cloned().unwrap_or(Value::Null))
                    .collect(),
            )
        })
        .collect();
    Value::Array(columns)
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Title {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AxisLayout {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<Title>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub autorange: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<[f64; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<[f64; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub showgrid: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gridcolor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub showline: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linecolor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mirror: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zeroline: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scaleanchor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scaleratio: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub xref: String,
    pub yref: String,
    pub xanchor: String,
    pub yanchor: String,
    pub showarrow: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LegendLayout {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<Title>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orientation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xanchor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub yanchor: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Font {
    pub color: String,
}

/// Backend-independent description carried inside the figure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FigureMeta {
    pub geometry: Geometry,
    pub mappings: BTreeMap<Aesthetic, AestheticValue>,
    pub labels: Labels,
    pub theme: ThemeName,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<Title>,
    pub template: String,
    /// `xaxis`, `yaxis`, `xaxis2`, ... keyed as Plotly expects them.
    #[serde(flatten)]
    pub axes: BTreeMap<String, AxisLayout>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<Annotation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legend: Option<LegendLayout>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub showlegend: Option<bool>,
    pub paper_bgcolor: String,
    pub plot_bgcolor: String,
    pub font: Font,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub barmode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boxmode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub violinmode: Option<String>,
    pub meta: FigureMeta,
}

/// Interactive artifact: the Plotly `data` and `layout` objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotlyFigure {
    pub data: Vec<Trace>,
    pub layout: Layout,
}

impl PlotlyFigure {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    fn sized(&self, options: &RenderOptions) -> Result<PlotlyFigure> {
        let (width, height) = options.pixel_size()?;
        let mut figure = self.clone();
        figure.layout.width = Some(width);
        figure.layout.height = Some(height);
        Ok(figure)
    }

    /// Embeddable `<div>` plus the scripts that draw into it.
    pub fn html_fragment(&self, options: &RenderOptions) -> Result<String> {
        let figure = self.sized(options)?;
        // keep "</script>" inside string values from closing the tag
        let json = figure.to_json()?.replace("</", "<\\/");

        let mut hasher = DefaultHasher::new();
        json.hash(&mut hasher);
        let id = format!("pipeplot-{:016x}", hasher.finish());

        Ok(format!(
            "<div id=\"{id}\" class=\"pipeplot\" style=\"width:{w}px;height:{h}px;\"></div>\n\
             <script src=\"{cdn}\"></script>\n\
             <script>\n\
             (function() {{\n  var fig = {json};\n  Plotly.newPlot(\"{id}\", fig.data, fig.layout, {{responsive: true}});\n}})();\n\
             </script>\n",
            id = id,
            w = figure.layout.width.unwrap_or(0),
            h = figure.layout.height.unwrap_or(0),
            cdn = PLOTLY_CDN,
            json = json,
        ))
    }

    /// Standalone HTML document.
    pub fn html_document(&self, options: &RenderOptions) -> Result<String> {
        let title = self
            .layout
            .title
            .as_ref()
            .map(|t| escape_html(&t.text))
            .unwrap_or_else(|| "pipeplot".to_string());
        Ok(format!(
            "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n</head>\n<body>\n{}</body>\n</html>\n",
            title,
            self.html_fragment(options)?
        ))
    }
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

impl Figure for PlotlyFigure {
    fn display(&self, options: &RenderOptions, sink: &mut dyn Sink) -> Result<()> {
        sink.display(&Rendered::Html(self.html_fragment(options)?))
    }

    fn save(&self, path: &Path, options: &RenderOptions, sink: &mut dyn Sink) -> Result<()> {
        let rendered = match extension(path).as_deref() {
            Some("html") | Some("htm") => Rendered::Html(self.html_document(options)?),
            Some("json") => Rendered::Json(self.sized(options)?.to_json_pretty()?),
            _ => return Err(unsupported_format(path, Backend::Interactive)),
        };
        sink.write(&rendered, path)
    }

    fn to_html(&self, options: &RenderOptions) -> Result<String> {
        self.html_fragment(options)
    }

    fn summary(&self) -> FigureSummary {
        let meta = &self.layout.meta;
        FigureSummary {
            backend: Backend::Interactive,
            geometry: meta.geometry,
            mappings: meta.mappings.clone(),
            labels: meta.labels.clone(),
            theme: meta.theme,
        }
    }

    fn capabilities(&self) -> &'static [Capability] {
        &[Capability::Display, Capability::File, Capability::Html]
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct InteractiveAdapter;

impl Adapter for InteractiveAdapter {
    type Figure = PlotlyFigure;

    fn backend(&self) -> Backend {
        Backend::Interactive
    }

    fn supports(&self, geometry: Geometry) -> bool {
        TRACE_TYPES.iter().any(|(g, _)| *g == geometry)
    }

    fn build(&self, table: &Arc<dyn DataTable>, config: &PlotConfig) -> Result<PlotlyFigure> {
        let figure = translate(table.as_ref(), config)?;
        debug!(
            "interactive figure: {} trace(s), {} axis object(s)",
            figure.data.len(),
            figure.layout.axes.len()
        );
        Ok(figure)
    }
}

/// Discrete groups from the colour (or fill) column.
struct Groups {
    column: String,
    cells: Vec<String>,
    keys: Vec<String>,
    colors: Vec<String>,
}

/// Continuous colour column on a scatter plot.
struct ColorScale {
    column: String,
    values: Vec<f64>,
}

fn colorscale(colors: &[RGBColor]) -> Value {
    let stops: Vec<Value> = match colors.len() {
        0 => vec![json!([0.0, "#000000"]), json!([1.0, "#000000"])],
        1 => vec![json!([0.0, to_hex(&colors[0])]), json!([1.0, to_hex(&colors[0])])],
        n => colors
            .iter()
            .enumerate()
            .map(|(i, c)| json!([i as f64 / (n - 1) as f64, to_hex(c)]))
            .collect(),
    };
    Value::Array(stops)
}

fn num(v: f64) -> Value {
    // non-finite becomes null
    Value::from(v)
}

fn check_positions(values: &[f64], scale: &AxisScale, axis: Axis) -> Result<()> {
    for &v in values {
        scale.transform_value(axis, v)?;
    }
    Ok(())
}

struct Translator<'a> {
    table: &'a dyn DataTable,
    config: &'a PlotConfig,
    geometry: Geometry,
    groups: Option<Groups>,
    color_scale: Option<ColorScale>,
    base_color: String,
    categorical_x: bool,
}

impl<'a> Translator<'a> {
    fn new(table: &'a dyn DataTable, config: &'a PlotConfig, geometry: Geometry) -> Result<Self> {
        let palette = config.palette.as_ref();
        let mut groups = None;
        let mut color_scale = None;

        let color_col = config.column(Aesthetic::Color);
        let group_col = if matches!(geometry, Geometry::Heatmap | Geometry::Contour) {
            None
        } else {
            color_col.or_else(|| config.column(Aesthetic::Fill))
        };
        if let Some(col) = group_col {
            let cells = text_column(table, col)?;
            if geometry == Geometry::Scatter && is_numeric(&cells) {
                color_scale = Some(ColorScale {
                    column: col.to_string(),
                    values: numeric_column(table, col)?,
                });
            } else {
                let keys = distinct(&cells);
                let colors = group_colors(palette, keys.len()).iter().map(to_hex).collect();
                groups = Some(Groups {
                    column: col.to_string(),
                    cells,
                    keys,
                    colors,
                });
            }
        }

        let base_color = match config
            .literal(Aesthetic::Color)
            .or_else(|| config.literal(Aesthetic::Fill))
        {
            Some(lit) => {
                let text = lit.to_string();
                parse_color(&text).map(|c| to_hex(&c)).unwrap_or(text)
            }
            None => palette
                .and_then(|p| p.rgb().first().map(to_hex))
                .unwrap_or_else(|| to_hex(&DEFAULT_MARK)),
        };

        // Text x columns on scatter and line plots become category axes.
        let categorical_x = matches!(geometry, Geometry::Scatter | Geometry::Line)
            && config
                .column(Aesthetic::X)
                .map(|c| text_column(table, c).map(|cells| !is_numeric(&cells)))
                .transpose()?
                .unwrap_or(false);

        Ok(Translator {
            table,
            config,
            geometry,
            groups,
            color_scale,
            base_color,
            categorical_x,
        })
    }

    fn split(&self, rows: &[usize]) -> Vec<(Option<usize>, Vec<usize>)> {
        match &self.groups {
            Some(g) => group_rows(&g.cells, rows)
                .into_iter()
                .filter_map(|(key, idx)| {
                    let rank = g.keys.iter().position(|k| *k == key)?;
                    Some((Some(rank), idx))
                })
                .collect(),
            None => vec![(None, rows.to_vec())],
        }
    }

    fn name(&self, rank: Option<usize>) -> Option<String> {
        let g = self.groups.as_ref()?;
        g.keys.get(rank?).cloned()
    }

    fn color(&self, rank: Option<usize>) -> String {
        rank.and_then(|r| self.groups.as_ref()?.colors.get(r).cloned())
            .unwrap_or_else(|| self.base_color.clone())
    }

    fn numeric(&self, aes: Aesthetic) -> Result<Vec<f64>> {
        let column = self.config.column(aes).ok_or_else(|| PlotError::MissingRequiredMapping {
            geometry: self.geometry.to_string(),
            aesthetic: aes.to_string(),
        })?;
        let values = numeric_column(self.table, column)?;
        match aes {
            Aesthetic::X => check_positions(&values, &self.config.scale(Axis::X), Axis::X)?,
            Aesthetic::Y => check_positions(&values, &self.config.scale(Axis::Y), Axis::Y)?,
            _ => {}
        }
        Ok(values)
    }

    fn text(&self, aes: Aesthetic) -> Result<Option<Vec<String>>> {
        self.config
            .column(aes)
            .map(|c| text_column(self.table, c))
            .transpose()
    }

    /// x cells as trace values: strings on a category axis, numbers otherwise.
    fn x_values(&self) -> Result<Vec<Value>> {
        if self.categorical_x {
            let cells = self.text(Aesthetic::X)?.unwrap_or_default();
            return Ok(cells.into_iter().map(Value::from).collect());
        }
        Ok(self.numeric(Aesthetic::X)?.into_iter().map(num).collect())
    }

    fn grouped_trace(&self, kind: &str, rank: Option<usize>) -> Trace {
        let mut trace = Trace::new(kind);
        trace.name = self.name(rank);
        trace.legendgroup = trace.name.clone();
        trace
    }

    fn traces(&self, rows: &[usize]) -> Result<Vec<Trace>> {
        let mut traces = match self.geometry {
            Geometry::Scatter => self.scatter(rows)?,
            Geometry::Line => self.lines(rows)?,
            Geometry::Bar => self.bars(rows)?,
            Geometry::Histogram => self.histogram(rows)?,
            Geometry::Density => self.density(rows)?,
            Geometry::Box | Geometry::Violin => self.distributions(rows)?,
            Geometry::Heatmap => self.heatmap(rows)?,
            Geometry::Contour => self.contour(rows)?,
        };
        if let Some((method, span)) = self.config.smooth() {
            if self.categorical_x {
                warn!("smoothing needs a numeric x column; ignored");
            } else if matches!(self.geometry, Geometry::Scatter | Geometry::Line) {
                traces.extend(self.smooth(rows, method, span)?);
            }
        }
        Ok(traces)
    }

    fn scatter(&self, rows: &[usize]) -> Result<Vec<Trace>> {
        let xs = self.x_values()?;
        let ys = self.numeric(Aesthetic::Y)?;
        let sizes = self
            .config
            .column(Aesthetic::Size)
            .map(|c| numeric_column(self.table, c))
            .transpose()?;
        let alphas = self
            .config
            .column(Aesthetic::Alpha)
            .map(|c| numeric_column(self.table, c))
            .transpose()?;
        let shapes = self.text(Aesthetic::Shape)?;
        let shape_keys = shapes.as_deref().map(distinct).unwrap_or_default();

        let mut traces = Vec::new();
        for (rank, idx) in self.split(rows) {
            let mut trace = self.grouped_trace("scatter", rank);
            trace.mode = Some("markers".to_string());
            trace.x = idx.iter().map(|&r| xs[r].clone()).collect();
            trace.y = idx.iter().map(|&r| num(ys[r])).collect();

            let mut marker = MarkerStyle::default();
            marker.color = Some(match &self.color_scale {
                Some(scale) => {
                    marker.colorscale = Some(colorscale(&gradient_colors(self.config.palette.as_ref())));
                    marker.showscale = Some(true);
                    marker.colorbar = Some(json!({ "title": { "text": scale.column } }));
                    Value::Array(idx.iter().map(|&r| num(scale.values[r])).collect())
                }
                None => Value::from(self.color(rank)),
            });
            marker.size = match &sizes {
                Some(values) => {
                    let domain = stat::min_max(values).unwrap_or((0.0, 1.0));
                    Some(Value::Array(
                        idx.iter()
                            .map(|&r| num(rescale(values[r], domain, (6.0, 20.0))))
                            .collect(),
                    ))
                }
                None => self
                    .config
                    .literal(Aesthetic::Size)
                    .and_then(|l| l.as_f64())
                    .map(|s| Value::from(s * 2.0)),
            };
            marker.opacity = match &alphas {
                Some(values) => {
                    let domain = stat::min_max(values).unwrap_or((0.0, 1.0));
                    Some(Value::Array(
                        idx.iter()
                            .map(|&r| num(rescale(values[r], domain, (0.2, 1.0))))
                            .collect(),
                    ))
                }
                None => self
                    .config
                    .literal(Aesthetic::Alpha)
                    .and_then(|l| l.as_f64())
                    .map(Value::from),
            };
            marker.symbol = match &shapes {
                Some(cells) => Some(Value::Array(
                    idx.iter()
                        .map(|&r| {
                            let i = shape_keys.iter().position(|k| *k == cells[r]).unwrap_or(0);
                            Value::from(SYMBOLS[i % SYMBOLS.len()])
                        })
                        .collect(),
                )),
                None => self
                    .config
                    .literal(Aesthetic::Shape)
                    .map(|l| Value::from(symbol(&l.to_string()))),
            };
            trace.marker = Some(marker);
            traces.push(trace);
        }
        Ok(traces)
    }

    fn line_trace(&self, rank: Option<usize>, points: Vec<(f64, f64)>) -> Trace {
        let mut trace = self.grouped_trace("scatter", rank);
        trace.mode = Some("lines".to_string());
        trace.x = points.iter().map(|p| num(p.0)).collect();
        trace.y = points.iter().map(|p| num(p.1)).collect();
        trace.line = Some(LineStyle {
            color: Some(self.color(rank)),
            width: Some(2.0),
        });
        trace.opacity = self.config.literal(Aesthetic::Alpha).and_then(|l| l.as_f64());
        trace
    }

    fn lines(&self, rows: &[usize]) -> Result<Vec<Trace>> {
        let ys = self.numeric(Aesthetic::Y)?;
        if self.categorical_x {
            let cells = self.text(Aesthetic::X)?.unwrap_or_default();
            let order = distinct(&cells);
            return Ok(self
                .split(rows)
                .into_iter()
                .map(|(rank, idx)| {
                    // (category position, label, y), drawn in category order
                    let mut points: Vec<(usize, &str, f64)> = idx
                        .iter()
                        .filter(|&&r| ys[r].is_finite())
                        .filter_map(|&r| {
                            let pos = order.iter().position(|k| *k == cells[r])?;
                            Some((pos, cells[r].as_str(), ys[r]))
                        })
                        .collect();
                    points.sort_by_key(|p| p.0);
                    let mut trace = self.line_trace(rank, Vec::new());
                    trace.x = points.iter().map(|p| Value::from(p.1)).collect();
                    trace.y = points.iter().map(|p| num(p.2)).collect();
                    trace
                })
                .collect());
        }
        let xs = self.numeric(Aesthetic::X)?;
        Ok(self
            .split(rows)
            .into_iter()
            .map(|(rank, idx)| {
                let mut points: Vec<(f64, f64)> = idx
                    .iter()
                    .map(|&r| (xs[r], ys[r]))
                    .filter(|(x, y)| x.is_finite() && y.is_finite())
                    .collect();
                points.sort_by(|a, b| a.0.total_cmp(&b.0));
                self.line_trace(rank, points)
            })
            .collect())
    }

    fn bars(&self, rows: &[usize]) -> Result<Vec<Trace>> {
        let cells = self.text(Aesthetic::X)?.unwrap_or_default();
        let categories = distinct(&cells);
        let ys = match self.config.column(Aesthetic::Y) {
            Some(_) => Some(self.numeric(Aesthetic::Y)?),
            None => None,
        };

        let mut traces = Vec::new();
        for (rank, idx) in self.split(rows) {
            let mut totals: Vec<Option<f64>> = vec![None; categories.len()];
            for &r in &idx {
                let Some(ci) = cells.get(r).and_then(|c| categories.iter().position(|k| k == c)) else {
                    continue;
                };
                let v = ys.as_ref().map_or(1.0, |ys| ys[r]);
                if v.is_finite() {
                    *totals[ci].get_or_insert(0.0) += v;
                }
            }
            let mut trace = self.grouped_trace("bar", rank);
            for (cat, total) in categories.iter().zip(totals) {
                if let Some(total) = total {
                    trace.x.push(Value::from(cat.as_str()));
                    trace.y.push(num(total));
                }
            }
            trace.marker = Some(MarkerStyle {
                color: Some(Value::from(self.color(rank))),
                opacity: self.config.literal(Aesthetic::Alpha).and_then(|l| l.as_f64()).map(Value::from),
                ..MarkerStyle::default()
            });
            traces.push(trace);
        }
        Ok(traces)
    }

    fn histogram(&self, rows: &[usize]) -> Result<Vec<Trace>> {
        let xs = self.numeric(Aesthetic::X)?;
        Ok(self
            .split(rows)
            .into_iter()
            .map(|(rank, idx)| {
                let mut trace = self.grouped_trace("histogram", rank);
                trace.x = idx.iter().map(|&r| num(xs[r])).collect();
                trace.nbinsx = Some(self.config.bins.unwrap_or(stat::DEFAULT_BINS));
                trace.marker = Some(MarkerStyle {
                    color: Some(Value::from(self.color(rank))),
                    ..MarkerStyle::default()
                });
                trace
            })
            .collect())
    }

    fn density(&self, rows: &[usize]) -> Result<Vec<Trace>> {
        let xs = self.numeric(Aesthetic::X)?;
        Ok(self
            .split(rows)
            .into_iter()
            .filter_map(|(rank, idx)| {
                let values: Vec<f64> = idx.iter().map(|&r| xs[r]).collect();
                let (grid, density) = stat::kde(&values);
                if grid.is_empty() {
                    return None;
                }
                Some(self.line_trace(rank, grid.into_iter().zip(density).collect()))
            })
            .collect())
    }

    /// Box and violin traces share their shape: optional x categories, numeric y.
    fn distributions(&self, rows: &[usize]) -> Result<Vec<Trace>> {
        let ys = self.numeric(Aesthetic::Y)?;
        let xs = self.text(Aesthetic::X)?;
        let kind = trace_type(self.geometry);

        Ok(self
            .split(rows)
            .into_iter()
            .map(|(rank, idx)| {
                let mut trace = self.grouped_trace(kind, rank);
                trace.y = idx.iter().map(|&r| num(ys[r])).collect();
                if let Some(cells) = &xs {
                    trace.x = idx.iter().map(|&r| Value::from(cells[r].as_str())).collect();
                }
                trace.marker = Some(MarkerStyle {
                    color: Some(Value::from(self.color(rank))),
                    ..MarkerStyle::default()
                });
                trace
            })
            .collect())
    }

    fn heatmap(&self, rows: &[usize]) -> Result<Vec<Trace>> {
        let x_cells = self.text(Aesthetic::X)?.unwrap_or_default();
        let y_cells = self.text(Aesthetic::Y)?.unwrap_or_default();
        let values = self.numeric(Aesthetic::Color)?;
        let x_keys = distinct(&x_cells);
        let y_keys = distinct(&y_cells);

        let mut sums = vec![vec![(0.0, 0usize); x_keys.len()]; y_keys.len()];
        for &r in rows {
            let xi = x_keys.iter().position(|k| *k == x_cells[r]);
            let yi = y_keys.iter().position(|k| *k == y_cells[r]);
            if let (Some(xi), Some(yi)) = (xi, yi) {
                if values[r].is_finite() {
                    sums[yi][xi].0 += values[r];
                    sums[yi][xi].1 += 1;
                }
            }
        }
        let z: Vec<Value> = sums
            .iter()
            .map(|row| {
                Value::Array(
                    row.iter()
                        .map(|&(sum, n)| if n == 0 { Value::Null } else { num(sum / n as f64) })
                        .collect(),
                )
            })
            .collect();

        let mut trace = Trace::new("heatmap");
        trace.x = x_keys.iter().map(|k| Value::from(k.as_str())).collect();
        trace.y = y_keys.iter().map(|k| Value::from(k.as_str())).collect();
        trace.z = Some(Value::Array(z));
        trace.colorscale = Some(colorscale(&gradient_colors(self.config.palette.as_ref())));
        trace.colorbar = self
            .config
            .column(Aesthetic::Color)
            .map(|c| json!({ "title": { "text": c } }));
        Ok(vec![trace])
    }

    fn contour(&self, rows: &[usize]) -> Result<Vec<Trace>> {
        let xs = self.numeric(Aesthetic::X)?;
        let ys = self.numeric(Aesthetic::Y)?;
        let zs = self.numeric(Aesthetic::Z)?;
        let mut trace = Trace::new("contour");
        trace.x = rows.iter().map(|&r| num(xs[r])).collect();
        trace.y = rows.iter().map(|&r| num(ys[r])).collect();
        trace.z = Some(Value::Array(rows.iter().map(|&r| num(zs[r])).collect()));
        trace.colorscale = Some(colorscale(&gradient_colors(self.config.palette.as_ref())));
        Ok(vec![trace])
    }

    fn smooth(&self, rows: &[usize], method: SmoothMethod, span: Option<f64>) -> Result<Vec<Trace>> {
        let xs = self.numeric(Aesthetic::X)?;
        let ys = self.numeric(Aesthetic::Y)?;
        let mut traces = Vec::new();
        for (rank, idx) in self.split(rows) {
            let gx: Vec<f64> = idx.iter().map(|&r| xs[r]).collect();
            let gy: Vec<f64> = idx.iter().map(|&r| ys[r]).collect();
            let points = match method {
                SmoothMethod::Linear => {
                    let (Some((slope, intercept)), Some((lo, hi))) =
                        (stat::linear_fit(&gx, &gy), stat::min_max(&gx))
                    else {
                        continue;
                    };
                    vec![(lo, slope * lo + intercept), (hi, slope * hi + intercept)]
                }
                SmoothMethod::Loess => stat::loess(&gx, &gy, span.unwrap_or(stat::DEFAULT_SPAN))
                    .into_iter()
                    .filter(|(_, y)| y.is_finite())
                    .collect(),
            };
            if points.len() < 2 {
                continue;
            }
            let mut trace = self.line_trace(rank, points);
            trace.name = Some(match self.name(rank) {
                Some(n) => format!("{} ({})", method.as_str(), n),
                None => method.as_str().to_string(),
            });
            trace.showlegend = Some(false);
            trace.opacity = None;
            if self.groups.is_none() {
                trace.line = Some(LineStyle {
                    color: Some("#3366ff".to_string()),
                    width: Some(2.0),
                });
            }
            traces.push(trace);
        }
        Ok(traces)
    }

    fn axis_titles(&self) -> (String, String) {
        let labels = &self.config.labels;
        let x = labels
            .x
            .clone()
            .or_else(|| self.config.column(Aesthetic::X).map(str::to_string))
            .unwrap_or_default();
        let y = labels
            .y
            .clone()
            .or_else(|| self.config.column(Aesthetic::Y).map(str::to_string))
            .unwrap_or_else(|| match self.geometry {
                Geometry::Histogram | Geometry::Bar => "count".to_string(),
                Geometry::Density => "density".to_string(),
                _ => String::new(),
            });
        (x, y)
    }
}

fn axis_suffix(panel: usize) -> String {
    if panel == 0 {
        String::new()
    } else {
        (panel + 1).to_string()
    }
}

/// Range/type settings for one axis from its scale directives.
///
/// Category axes only honour reversal.
fn apply_scale(axis: &mut AxisLayout, scale: &AxisScale, which: Axis, discrete: bool) -> Result<()> {
    if discrete {
        if scale.is_log() || scale.limits.is_some() {
            warn!("log scales and limits do not apply to the discrete {} axis; ignored", which);
        }
        if scale.is_reversed() {
            axis.autorange = Some(Value::from("reversed"));
        }
        return Ok(());
    }
    if scale.is_log() {
        axis.kind = Some("log".to_string());
    }
    match scale.limits {
        Some((lo, hi)) => {
            let (lo, hi) = if scale.is_log() {
                (scale.transform_value(which, lo)?, scale.transform_value(which, hi)?)
            } else {
                (lo, hi)
            };
            axis.range = Some(if scale.is_reversed() { [hi, lo] } else { [lo, hi] });
        }
        None if scale.is_reversed() => axis.autorange = Some(Value::from("reversed")),
        None => {}
    }
    Ok(())
}

fn legend_layout(position: LegendPosition, title: Option<String>) -> Option<LegendLayout> {
    let title = title.map(|text| Title { text });
    let layout = match position {
        LegendPosition::Right => LegendLayout::default(),
        LegendPosition::Left => LegendLayout {
            x: Some(-0.15),
            y: Some(1.0),
            xanchor: Some("right".to_string()),
            ..LegendLayout::default()
        },
        LegendPosition::Top => LegendLayout {
            orientation: Some("h".to_string()),
            x: Some(0.0),
            y: Some(1.08),
            yanchor: Some("bottom".to_string()),
            ..LegendLayout::default()
        },
        LegendPosition::Bottom => LegendLayout {
            orientation: Some("h".to_string()),
            x: Some(0.0),
            y: Some(-0.15),
            yanchor: Some("top".to_string()),
            ..LegendLayout::default()
        },
        LegendPosition::None => return None,
    };
    Some(LegendLayout { title, ..layout })
}

/// Translate a configuration and its data into a Plotly figure.
pub fn translate(table: &dyn DataTable, config: &PlotConfig) -> Result<PlotlyFigure> {
    let geometry = config.geometry.ok_or(PlotError::MissingGeometry)?;
    if table.row_count() == 0 {
        return Err(PlotError::EmptyData("the table has no rows".to_string()));
    }
    let translator = Translator::new(table, config, geometry)?;
    let grid = frame::partition(table, &config.facets)?;
    let flip = config.coord.flip;

    if config.smooth().is_some() && !matches!(geometry, Geometry::Scatter | Geometry::Line) {
        warn!("smoothing is only drawn over scatter and line plots; ignored for {}", geometry);
    }

    // geometry and aesthetics, per facet panel
    let mut data = Vec::new();
    for (i, panel) in grid.panels.iter().enumerate() {
        let suffix = axis_suffix(i);
        for trace in translator.traces(&panel.rows)? {
            let mut trace = if flip { trace.flipped() } else { trace };
            trace.xaxis = Some(format!("x{}", suffix));
            trace.yaxis = Some(format!("y{}", suffix));
            if i > 0 {
                trace.showlegend = Some(false);
            }
            data.push(trace);
        }
    }

    // facets, scales and coords
    let preset = config.theme.preset();
    let (mut x_title, mut y_title) = translator.axis_titles();
    let (mut x_scale, mut y_scale) = (config.scale(Axis::X), config.scale(Axis::Y));
    if flip {
        std::mem::swap(&mut x_title, &mut y_title);
        std::mem::swap(&mut x_scale, &mut y_scale);
    }
    let (h_axis, v_axis) = if flip { (Axis::Y, Axis::X) } else { (Axis::X, Axis::Y) };
    let (mut x_discrete, mut y_discrete) = match geometry {
        Geometry::Bar => (true, false),
        Geometry::Box | Geometry::Violin => (config.column(Aesthetic::X).is_some(), false),
        Geometry::Heatmap => (true, true),
        Geometry::Scatter | Geometry::Line => (translator.categorical_x, false),
        _ => (false, false),
    };
    if flip {
        std::mem::swap(&mut x_discrete, &mut y_discrete);
    }

    let mut axes = BTreeMap::new();
    let mut annotations = Vec::new();
    let (nrow, ncol) = (grid.nrow.max(1) as f64, grid.ncol.max(1) as f64);
    let faceted = grid.panels.len() > 1;
    for (i, panel) in grid.panels.iter().enumerate() {
        let suffix = axis_suffix(i);
        let gap = if faceted { PANEL_GAP } else { 0.0 };
        let x_domain = [
            panel.col as f64 / ncol + gap,
            (panel.col + 1) as f64 / ncol - gap,
        ];
        let y_domain = [
            1.0 - (panel.row + 1) as f64 / nrow + gap,
            1.0 - panel.row as f64 / nrow - gap * 2.0,
        ];

        let themed = |title: Option<String>| AxisLayout {
            title: title.map(|text| Title { text }),
            showgrid: Some(preset.grid.is_some()),
            gridcolor: preset.grid.as_ref().map(to_hex),
            showline: Some(preset.axis_line.is_some() || preset.panel_border.is_some()),
            linecolor: preset
                .axis_line
                .or(preset.panel_border)
                .as_ref()
                .map(to_hex),
            mirror: preset.panel_border.map(|_| true),
            zeroline: Some(false),
            visible: (!preset.show_axes).then_some(false),
            ..AxisLayout::default()
        };

        let bottom_row = panel.row + 1 == grid.nrow.max(1);
        let mut x_axis = themed(bottom_row.then(|| x_title.clone()));
        let mut y_axis = themed((panel.col == 0).then(|| y_title.clone()));
        apply_scale(&mut x_axis, &x_scale, h_axis, x_discrete)?;
        apply_scale(&mut y_axis, &y_scale, v_axis, y_discrete)?;
        if faceted {
            x_axis.domain = Some(x_domain);
            y_axis.domain = Some(y_domain);
            x_axis.anchor = Some(format!("y{}", suffix));
            y_axis.anchor = Some(format!("x{}", suffix));
        }
        if let Some(ratio) = config.coord.fixed_ratio {
            y_axis.scaleanchor = Some(format!("x{}", suffix));
            y_axis.scaleratio = Some(ratio);
        }
        axes.insert(format!("xaxis{}", suffix), x_axis);
        axes.insert(format!("yaxis{}", suffix), y_axis);

        if let (true, Some(label)) = (faceted, &panel.label) {
            annotations.push(Annotation {
                text: label.clone(),
                x: (x_domain[0] + x_domain[1]) / 2.0,
                y: y_domain[1],
                xref: "paper".to_string(),
                yref: "paper".to_string(),
                xanchor: "center".to_string(),
                yanchor: "bottom".to_string(),
                showarrow: false,
            });
        }
    }

    // labels and theme
    let legend_title = translator
        .groups
        .as_ref()
        .map(|g| g.column.clone())
        .or_else(|| translator.color_scale.as_ref().map(|c| c.column.clone()));
    let legend = legend_layout(config.legend, legend_title);
    let grouped = translator.groups.is_some();

    let layout = Layout {
        title: config.labels.title.clone().map(|text| Title { text }),
        template: preset.plotly_template.to_string(),
        axes,
        annotations,
        showlegend: match (&legend, grouped) {
            (None, _) => Some(false),
            (Some(_), true) => Some(true),
            (Some(_), false) => None,
        },
        legend,
        paper_bgcolor: to_hex(&preset.plot_background),
        plot_bgcolor: to_hex(&preset.panel_background),
        font: Font {
            color: to_hex(&preset.text),
        },
        width: None,
        height: None,
        barmode: match geometry {
            Geometry::Bar => Some("group".to_string()),
            Geometry::Histogram => Some("stack".to_string()),
            _ => None,
        },
        boxmode: (geometry == Geometry::Box && grouped).then(|| "group".to_string()),
        violinmode: (geometry == Geometry::Violin && grouped).then(|| "group".to_string()),
        meta: FigureMeta {
            geometry,
            mappings: config.mappings.clone(),
            labels: config.labels.clone(),
            theme: config.theme,
        },
    };

    Ok(PlotlyFigure { data, layout })
}
