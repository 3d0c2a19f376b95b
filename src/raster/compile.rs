//! Build a [`SceneGraph`] from a static figure's calls and the data table.

use super::scene::{
    DrawCommand, Legend, LegendKind, Marker, PanelScene, PointShape, Scale, SceneGraph,
};
use crate::backend::static_gg::GgPlot;
use crate::backend::{gradient_colors, group_colors, rescale, DEFAULT_MARK};
use crate::config::{Aesthetic, Axis, AxisScale, Backend, Geometry, LegendPosition, ScaleTransform, SmoothMethod};
use crate::data::DataTable;
use crate::error::{PlotError, Result};
use crate::frame::{self, distinct, group_rows, is_numeric, numeric_column, text_column};
use crate::stat;
use crate::theme::{gradient, parse_color};
use log::{debug, warn};
use plotters::style::RGBColor;

const SMOOTH_COLOR: RGBColor = RGBColor(51, 102, 255);
const MEDIAN_COLOR: RGBColor = RGBColor(255, 255, 255);
const BAR_WIDTH: f64 = 0.8;
const BOX_WIDTH: f64 = 0.75;
const DEFAULT_POINT_SIZE: f64 = 3.0;

/// Discrete grouping by the colour (or fill) column.
struct Groups {
    column: String,
    cells: Vec<String>,
    keys: Vec<String>,
    colors: Vec<RGBColor>,
}

impl Groups {
    /// `(rank, rows)` per group present in `rows`; rank is global so colours and dodge slots
    /// stay stable across panels.
    fn split(&self, rows: &[usize]) -> Vec<(usize, Vec<usize>)> {
        group_rows(&self.cells, rows)
            .into_iter()
            .filter_map(|(key, idx)| {
                let rank = self.keys.iter().position(|k| *k == key)?;
                Some((rank, idx))
            })
            .collect()
    }

    fn color_of(&self, row: usize) -> Option<RGBColor> {
        let cell = self.cells.get(row)?;
        let rank = self.keys.iter().position(|k| k == cell)?;
        self.colors.get(rank).copied()
    }
}

/// Continuous colour scale over a numeric column.
struct Gradient {
    column: String,
    values: Vec<f64>,
    domain: (f64, f64),
    colors: Vec<RGBColor>,
}

impl Gradient {
    fn color(&self, v: f64) -> RGBColor {
        gradient(&self.colors, rescale(v, self.domain, (0.0, 1.0)))
    }
}

/// Numeric column mapped onto a visual range.
struct Channel {
    values: Vec<f64>,
    domain: (f64, f64),
    range: (f64, f64),
}

impl Channel {
    fn read(table: &dyn DataTable, column: &str, range: (f64, f64)) -> Result<Channel> {
        let values = numeric_column(table, column)?;
        let domain = stat::min_max(&values).unwrap_or((0.0, 1.0));
        Ok(Channel { values, domain, range })
    }

    fn at(&self, row: usize) -> Option<f64> {
        let v = *self.values.get(row)?;
        v.is_finite().then(|| rescale(v, self.domain, self.range))
    }
}

// Computed values (counts, densities) drop out of a log scale instead of failing.
fn transform_stat(scale: &AxisScale, v: f64) -> Option<f64> {
    match scale.transform {
        Some(ScaleTransform::Log10) => (v > 0.0).then(|| v.log10()),
        Some(ScaleTransform::Reverse) => Some(-v),
        None => Some(v),
    }
}

fn dodge(rank: usize, n: usize, slot: f64) -> f64 {
    (rank as f64 - (n as f64 - 1.0) / 2.0) * slot
}

struct Context<'a> {
    plot: &'a GgPlot,
    geometry: Geometry,
    x_scale: AxisScale,
    y_scale: AxisScale,
    categorical_x: bool,
    xs: Vec<f64>,
    ys: Vec<f64>,
    x_cells: Vec<String>,
    y_cells: Vec<String>,
    x_categories: Vec<String>,
    y_categories: Vec<String>,
    groups: Option<Groups>,
    gradient: Option<Gradient>,
    base_color: RGBColor,
    alpha: Option<f64>,
    size: f64,
    sizes: Option<Channel>,
    alphas: Option<Channel>,
    shape: PointShape,
    shapes: Option<(Vec<String>, Vec<String>)>,
}

impl<'a> Context<'a> {
    fn new(plot: &'a GgPlot, table: &'a dyn DataTable, geometry: Geometry) -> Result<Self> {
        let palette = plot.palette();
        let x_scale = plot.scale(Axis::X);
        let y_scale = plot.scale(Axis::Y);
        let x_col = plot.aes_column(Aesthetic::X);
        let y_col = plot.aes_column(Aesthetic::Y);

        // Text x columns on scatter and line plots sit on a category axis.
        let categorical_x = matches!(geometry, Geometry::Scatter | Geometry::Line)
            && x_col
                .map(|c| text_column(table, c).map(|cells| !is_numeric(&cells)))
                .transpose()?
                .unwrap_or(false);
        let discrete_x = categorical_x
            || matches!(
                geometry,
                Geometry::Bar | Geometry::Box | Geometry::Violin | Geometry::Heatmap
            );
        let numeric = |col: Option<&str>| -> Result<Vec<f64>> {
            col.map(|c| numeric_column(table, c))
                .transpose()
                .map(Option::unwrap_or_default)
        };
        let xs = if discrete_x { Vec::new() } else { numeric(x_col)? };
        let ys = if geometry == Geometry::Heatmap { Vec::new() } else { numeric(y_col)? };

        let (x_cells, mut x_categories) = match (discrete_x, x_col) {
            (true, Some(c)) => {
                let cells = text_column(table, c)?;
                let cats = distinct(&cells);
                (cells, cats)
            }
            (true, None) => (Vec::new(), vec![String::new()]),
            _ => (Vec::new(), Vec::new()),
        };
        let (y_cells, mut y_categories) = match (geometry, y_col) {
            (Geometry::Heatmap, Some(c)) => {
                let cells = text_column(table, c)?;
                let cats = distinct(&cells);
                (cells, cats)
            }
            _ => (Vec::new(), Vec::new()),
        };
        if discrete_x {
            discrete_axis_directives(&x_scale, Axis::X, &mut x_categories);
        }
        if geometry == Geometry::Heatmap {
            discrete_axis_directives(&y_scale, Axis::Y, &mut y_categories);
        }

        let mut groups = None;
        let mut grad = None;
        let color_col = plot.aes_column(Aesthetic::Color);
        if geometry == Geometry::Heatmap {
            if let Some(col) = color_col {
                let values = numeric_column(table, col)?;
                let domain = stat::min_max(&values).ok_or_else(|| {
                    PlotError::EmptyData(format!("column '{}' has no numeric values", col))
                })?;
                grad = Some(Gradient {
                    column: col.to_string(),
                    values,
                    domain,
                    colors: gradient_colors(palette.as_ref()),
                });
            }
        } else if let Some(col) = color_col.or_else(|| plot.aes_column(Aesthetic::Fill)) {
            let cells = text_column(table, col)?;
            if geometry == Geometry::Scatter && is_numeric(&cells) {
                let values = numeric_column(table, col)?;
                if let Some(domain) = stat::min_max(&values) {
                    grad = Some(Gradient {
                        column: col.to_string(),
                        values,
                        domain,
                        colors: gradient_colors(palette.as_ref()),
                    });
                }
            } else {
                let keys = distinct(&cells);
                let colors = group_colors(palette.as_ref(), keys.len());
                groups = Some(Groups {
                    column: col.to_string(),
                    cells,
                    keys,
                    colors,
                });
            }
        }

        let base_color = match plot.param(Aesthetic::Color).or_else(|| plot.param(Aesthetic::Fill)) {
            Some(lit) => parse_color(&lit.to_string()).unwrap_or_else(|| {
                warn!("unrecognised colour '{}', using the default", lit);
                DEFAULT_MARK
            }),
            None => palette
                .as_ref()
                .and_then(|p| p.rgb().first().copied())
                .unwrap_or(DEFAULT_MARK),
        };

        let sizes = plot
            .aes_column(Aesthetic::Size)
            .map(|c| Channel::read(table, c, (2.0, 8.0)))
            .transpose()?;
        let alphas = plot
            .aes_column(Aesthetic::Alpha)
            .map(|c| Channel::read(table, c, (0.2, 1.0)))
            .transpose()?;
        let shapes = plot
            .aes_column(Aesthetic::Shape)
            .map(|c| -> Result<_> {
                let cells = text_column(table, c)?;
                let keys = distinct(&cells);
                Ok((cells, keys))
            })
            .transpose()?;

        Ok(Context {
            plot,
            geometry,
            x_scale,
            y_scale,
            categorical_x,
            xs,
            ys,
            x_cells,
            y_cells,
            x_categories,
            y_categories,
            groups,
            gradient: grad,
            base_color,
            alpha: plot.param(Aesthetic::Alpha).and_then(|l| l.as_f64()),
            size: plot
                .param(Aesthetic::Size)
                .and_then(|l| l.as_f64())
                .unwrap_or(DEFAULT_POINT_SIZE),
            sizes,
            alphas,
            shape: plot
                .param(Aesthetic::Shape)
                .map(|l| PointShape::from_name(&l.to_string()))
                .unwrap_or_default(),
            shapes,
        })
    }

    fn tx(&self, axis: Axis, v: f64) -> Result<f64> {
        match axis {
            Axis::X => self.x_scale.transform_value(axis, v),
            Axis::Y => self.y_scale.transform_value(axis, v),
        }
    }

    fn baseline_y(&self, v: f64) -> f64 {
        if v == 0.0 {
            0.0
        } else {
            transform_stat(&self.y_scale, v).unwrap_or(0.0)
        }
    }

    fn split(&self, rows: &[usize]) -> Vec<(usize, Vec<usize>)> {
        match &self.groups {
            Some(g) => g.split(rows),
            None => vec![(0, rows.to_vec())],
        }
    }

    fn group_count(&self) -> usize {
        self.groups.as_ref().map_or(1, |g| g.keys.len().max(1))
    }

    fn group_color(&self, rank: usize) -> RGBColor {
        self.groups
            .as_ref()
            .and_then(|g| g.colors.get(rank).copied())
            .unwrap_or(self.base_color)
    }

    fn x_index(&self, row: usize) -> Option<usize> {
        if self.x_cells.is_empty() {
            return Some(0);
        }
        let cell = self.x_cells.get(row)?;
        self.x_categories.iter().position(|c| c == cell)
    }

    fn y_index(&self, row: usize) -> Option<usize> {
        let cell = self.y_cells.get(row)?;
        self.y_categories.iter().position(|c| c == cell)
    }

    fn point_color(&self, row: usize) -> RGBColor {
        if let Some(g) = &self.gradient {
            if let Some(v) = g.values.get(row).filter(|v| v.is_finite()) {
                return g.color(*v);
            }
        }
        self.groups
            .as_ref()
            .and_then(|g| g.color_of(row))
            .unwrap_or(self.base_color)
    }

    fn point_shape(&self, row: usize) -> PointShape {
        match &self.shapes {
            Some((cells, keys)) => cells
                .get(row)
                .and_then(|cell| keys.iter().position(|k| k == cell))
                .map(|i| PointShape::CYCLE[i % PointShape::CYCLE.len()])
                .unwrap_or(self.shape),
            None => self.shape,
        }
    }

    fn line_alpha(&self) -> f64 {
        self.alpha.unwrap_or(1.0)
    }

    fn marks(&self, rows: &[usize]) -> Result<Vec<DrawCommand>> {
        let mut commands = match self.geometry {
            Geometry::Scatter => self.scatter(rows)?,
            Geometry::Line => self.lines(rows)?,
            Geometry::Bar => self.bars(rows)?,
            Geometry::Histogram => self.histogram(rows)?,
            Geometry::Density => self.density(rows)?,
            Geometry::Box => self.boxes(rows)?,
            Geometry::Violin => self.violins(rows)?,
            Geometry::Heatmap => self.heatmap(rows),
            Geometry::Contour => {
                return Err(PlotError::UnsupportedGeometryForBackend {
                    geometry: self.geometry.to_string(),
                    backend: Backend::Static.to_string(),
                })
            }
        };
        if let Some((method, span)) = self.plot.smooth() {
            if self.categorical_x {
                warn!("smoothing needs a numeric x column; ignored");
            } else if matches!(self.geometry, Geometry::Scatter | Geometry::Line) {
                commands.extend(self.smooth(rows, method, span)?);
            }
        }
        Ok(commands)
    }

    fn xy(&self, row: usize) -> Result<Option<(f64, f64)>> {
        let x = if self.categorical_x {
            self.x_index(row).map(|i| i as f64)
        } else {
            self.xs.get(row).copied()
        };
        let (Some(x), Some(&y)) = (x, self.ys.get(row)) else {
            return Ok(None);
        };
        if !x.is_finite() || !y.is_finite() {
            return Ok(None);
        }
        let x = if self.categorical_x { x } else { self.tx(Axis::X, x)? };
        Ok(Some((x, self.tx(Axis::Y, y)?)))
    }

    fn scatter(&self, rows: &[usize]) -> Result<Vec<DrawCommand>> {
        let mut markers = Vec::with_capacity(rows.len());
        for &r in rows {
            let Some((x, y)) = self.xy(r)? else { continue };
            markers.push(Marker {
                x,
                y,
                color: self.point_color(r),
                alpha: self
                    .alphas
                    .as_ref()
                    .and_then(|c| c.at(r))
                    .or(self.alpha)
                    .unwrap_or(1.0),
                size: self.sizes.as_ref().and_then(|c| c.at(r)).unwrap_or(self.size),
                shape: self.point_shape(r),
            });
        }
        Ok(vec![DrawCommand::Points { markers }])
    }

    fn lines(&self, rows: &[usize]) -> Result<Vec<DrawCommand>> {
        let mut commands = Vec::new();
        for (rank, idx) in self.split(rows) {
            let mut points = Vec::with_capacity(idx.len());
            for r in idx {
                if let Some(p) = self.xy(r)? {
                    points.push(p);
                }
            }
            points.sort_by(|a, b| a.0.total_cmp(&b.0));
            commands.push(DrawCommand::Line {
                points,
                color: self.group_color(rank),
                width: 2,
                alpha: self.line_alpha(),
            });
        }
        Ok(commands)
    }

    /// Bars sum y per category (or count rows without y), dodged by group.
    fn bars(&self, rows: &[usize]) -> Result<Vec<DrawCommand>> {
        let n = self.group_count();
        let slot = BAR_WIDTH / n as f64;
        let mut commands = Vec::new();

        for (rank, idx) in self.split(rows) {
            let mut totals = vec![None; self.x_categories.len()];
            for r in idx {
                let Some(ci) = self.x_index(r) else { continue };
                let v = if self.ys.is_empty() { 1.0 } else { self.ys.get(r).copied().unwrap_or(f64::NAN) };
                if v.is_finite() {
                    *totals[ci].get_or_insert(0.0) += v;
                }
            }
            for (ci, total) in totals.into_iter().enumerate() {
                let Some(total) = total else { continue };
                let Some(top) = transform_stat(&self.y_scale, total) else {
                    warn!("bar value {} cannot be shown on a log scale", total);
                    continue;
                };
                let center = ci as f64 + dodge(rank, n, slot);
                commands.push(DrawCommand::Rect {
                    tl: (center - slot / 2.0, top),
                    br: (center + slot / 2.0, 0.0),
                    color: self.group_color(rank),
                    alpha: self.alpha.unwrap_or(1.0),
                });
            }
        }
        Ok(commands)
    }

    /// Histogram bars stacked by group over bins shared by every panel.
    fn histogram(&self, rows: &[usize]) -> Result<Vec<DrawCommand>> {
        let all = self
            .xs
            .iter()
            .map(|v| self.tx(Axis::X, *v))
            .collect::<Result<Vec<f64>>>()?;
        let Some(range) = stat::min_max(&all) else {
            return Ok(Vec::new());
        };
        let bins = self.plot.bins().unwrap_or(stat::DEFAULT_BINS);
        let mut stack = vec![0.0; bins];
        let mut commands = Vec::new();

        for (rank, idx) in self.split(rows) {
            let values: Vec<f64> = idx.iter().map(|&r| all[r]).collect();
            for (i, bin) in stat::histogram(&values, bins, Some(range)).iter().enumerate() {
                if bin.count == 0 {
                    continue;
                }
                let lo = stack[i];
                let hi = lo + bin.count as f64;
                stack[i] = hi;
                let Some(top) = transform_stat(&self.y_scale, hi) else { continue };
                commands.push(DrawCommand::Rect {
                    tl: (bin.start, top),
                    br: (bin.end, self.baseline_y(lo)),
                    color: self.group_color(rank),
                    alpha: self.alpha.unwrap_or(1.0),
                });
            }
        }
        Ok(commands)
    }

    fn density(&self, rows: &[usize]) -> Result<Vec<DrawCommand>> {
        let mut commands = Vec::new();
        for (rank, idx) in self.split(rows) {
            let values = idx
                .iter()
                .filter_map(|&r| self.xs.get(r))
                .map(|&v| self.tx(Axis::X, v))
                .collect::<Result<Vec<f64>>>()?;
            let (grid, density) = stat::kde(&values);
            let points: Vec<(f64, f64)> = grid
                .into_iter()
                .zip(density)
                .filter_map(|(x, d)| transform_stat(&self.y_scale, d).map(|y| (x, y)))
                .collect();
            if points.is_empty() {
                continue;
            }
            commands.push(DrawCommand::Line {
                points,
                color: self.group_color(rank),
                width: 2,
                alpha: self.line_alpha(),
            });
        }
        Ok(commands)
    }

    /// Transformed y values per x category for one group.
    fn category_values(&self, idx: &[usize]) -> Result<Vec<Vec<f64>>> {
        let mut out = vec![Vec::new(); self.x_categories.len()];
        for &r in idx {
            let (Some(ci), Some(&y)) = (self.x_index(r), self.ys.get(r)) else { continue };
            let v = self.tx(Axis::Y, y)?;
            if v.is_finite() {
                out[ci].push(v);
            }
        }
        Ok(out)
    }

    fn boxes(&self, rows: &[usize]) -> Result<Vec<DrawCommand>> {
        let n = self.group_count();
        let slot = BOX_WIDTH / n as f64;
        let half = slot * 0.45;
        let cap = slot * 0.2;
        let mut commands = Vec::new();

        for (rank, idx) in self.split(rows) {
            let color = self.group_color(rank);
            for (ci, values) in self.category_values(&idx)?.into_iter().enumerate() {
                let Some(s) = stat::box_stats(&values) else { continue };
                let c = ci as f64 + dodge(rank, n, slot);
                let line = |points: Vec<(f64, f64)>, color: RGBColor| DrawCommand::Line {
                    points,
                    color,
                    width: 2,
                    alpha: 1.0,
                };

                commands.push(line(vec![(c, s.lower_whisker), (c, s.q1)], color));
                commands.push(line(vec![(c, s.q3), (c, s.upper_whisker)], color));
                commands.push(line(vec![(c - cap, s.lower_whisker), (c + cap, s.lower_whisker)], color));
                commands.push(line(vec![(c - cap, s.upper_whisker), (c + cap, s.upper_whisker)], color));
                commands.push(DrawCommand::Rect {
                    tl: (c - half, s.q3),
                    br: (c + half, s.q1),
                    color,
                    alpha: self.alpha.unwrap_or(0.7),
                });
                commands.push(line(vec![(c - half, s.median), (c + half, s.median)], MEDIAN_COLOR));
                if !s.outliers.is_empty() {
                    commands.push(DrawCommand::Points {
                        markers: s
                            .outliers
                            .iter()
                            .map(|&y| Marker {
                                x: c,
                                y,
                                color,
                                alpha: 1.0,
                                size: 2.0,
                                shape: PointShape::Circle,
                            })
                            .collect(),
                    });
                }
            }
        }
        Ok(commands)
    }

    fn violins(&self, rows: &[usize]) -> Result<Vec<DrawCommand>> {
        let n = self.group_count();
        let slot = BOX_WIDTH / n as f64;
        let half = slot * 0.48;
        let mut commands = Vec::new();

        for (rank, idx) in self.split(rows) {
            let color = self.group_color(rank);
            for (ci, values) in self.category_values(&idx)?.into_iter().enumerate() {
                if values.len() < 2 {
                    continue;
                }
                let c = ci as f64 + dodge(rank, n, slot);
                let (grid, density) = stat::kde_normalized(&values);
                let mut outline: Vec<(f64, f64)> = grid
                    .iter()
                    .zip(&density)
                    .map(|(&y, &d)| (c - d * half, y))
                    .collect();
                outline.extend(grid.iter().zip(&density).rev().map(|(&y, &d)| (c + d * half, y)));
                commands.push(DrawCommand::Polygon {
                    points: outline,
                    color,
                    alpha: self.alpha.unwrap_or(0.7),
                });

                let sorted = stat::sorted_finite(&values);
                let median = stat::percentile(&sorted, 0.5);
                commands.push(DrawCommand::Line {
                    points: vec![(c - half * 0.3, median), (c + half * 0.3, median)],
                    color: MEDIAN_COLOR,
                    width: 2,
                    alpha: 1.0,
                });
            }
        }
        Ok(commands)
    }

    /// Tiles coloured by the mean value of each x/y cell.
    fn heatmap(&self, rows: &[usize]) -> Vec<DrawCommand> {
        let Some(grad) = &self.gradient else {
            return Vec::new();
        };
        let (nx, ny) = (self.x_categories.len(), self.y_categories.len());
        let mut sums = vec![(0.0, 0usize); nx * ny];
        for &r in rows {
            let (Some(xi), Some(yi)) = (self.x_index(r), self.y_index(r)) else { continue };
            let Some(v) = grad.values.get(r).copied().filter(|v| v.is_finite()) else { continue };
            let cell = &mut sums[yi * nx + xi];
            cell.0 += v;
            cell.1 += 1;
        }

        sums.iter()
            .enumerate()
            .filter(|(_, (_, count))| *count > 0)
            .map(|(i, (sum, count))| {
                let (xi, yi) = ((i % nx) as f64, (i / nx) as f64);
                DrawCommand::Rect {
                    tl: (xi - 0.5, yi + 0.5),
                    br: (xi + 0.5, yi - 0.5),
                    color: grad.color(sum / *count as f64),
                    alpha: self.alpha.unwrap_or(1.0),
                }
            })
            .collect()
    }

    fn smooth(&self, rows: &[usize], method: SmoothMethod, span: Option<f64>) -> Result<Vec<DrawCommand>> {
        let mut commands = Vec::new();
        for (rank, idx) in self.split(rows) {
            let mut xs = Vec::with_capacity(idx.len());
            let mut ys = Vec::with_capacity(idx.len());
            for r in idx {
                if let Some((x, y)) = self.xy(r)? {
                    xs.push(x);
                    ys.push(y);
                }
            }
            let points = match method {
                SmoothMethod::Linear => {
                    let (Some((slope, intercept)), Some((lo, hi))) =
                        (stat::linear_fit(&xs, &ys), stat::min_max(&xs))
                    else {
                        continue;
                    };
                    vec![(lo, slope * lo + intercept), (hi, slope * hi + intercept)]
                }
                SmoothMethod::Loess => stat::loess(&xs, &ys, span.unwrap_or(stat::DEFAULT_SPAN))
                    .into_iter()
                    .filter(|(_, y)| y.is_finite())
                    .collect(),
            };
            if points.len() < 2 {
                continue;
            }
            let color = if self.groups.is_some() {
                self.group_color(rank)
            } else {
                SMOOTH_COLOR
            };
            commands.push(DrawCommand::Line {
                points,
                color,
                width: 2,
                alpha: 1.0,
            });
        }
        Ok(commands)
    }

    fn legend(&self) -> Option<Legend> {
        let position = self.plot.theme().1;
        if position == LegendPosition::None {
            return None;
        }
        if let Some(g) = &self.groups {
            return Some(Legend {
                title: g.column.clone(),
                position,
                kind: LegendKind::Discrete(g.keys.iter().cloned().zip(g.colors.iter().copied()).collect()),
            });
        }
        self.gradient.as_ref().map(|g| Legend {
            title: g.column.clone(),
            position,
            kind: LegendKind::Continuous {
                min: g.domain.0,
                max: g.domain.1,
                colors: g.colors.clone(),
            },
        })
    }

    fn axis_titles(&self) -> (String, String) {
        let labels = self.plot.labels();
        let x = labels
            .x
            .or_else(|| self.plot.aes_column(Aesthetic::X).map(str::to_string))
            .unwrap_or_default();
        let y = labels.y.or_else(|| {
            self.plot.aes_column(Aesthetic::Y).map(str::to_string)
        });
        let y = y.unwrap_or_else(|| match self.geometry {
            Geometry::Histogram | Geometry::Bar => "count".to_string(),
            Geometry::Density => "density".to_string(),
            _ => String::new(),
        });
        (x, y)
    }
}

fn discrete_axis_directives(scale: &AxisScale, axis: Axis, categories: &mut [String]) {
    match scale.transform {
        Some(ScaleTransform::Reverse) => categories.reverse(),
        Some(ScaleTransform::Log10) => warn!("log scale ignored on the discrete {} axis", axis),
        None => {}
    }
    if scale.limits.is_some() {
        warn!("limits ignored on the discrete {} axis", axis);
    }
}

/// Shared continuous scale over every panel's marks.
fn continuous_scale(
    coords: impl Iterator<Item = f64>,
    scale: &AxisScale,
    axis: Axis,
    include_zero: bool,
) -> Result<Scale> {
    let mut values: Vec<f64> = coords.collect();
    if include_zero {
        values.push(0.0);
    }
    let range = match scale.limits {
        Some((lo, hi)) => {
            let (a, b) = (scale.transform_value(axis, lo)?, scale.transform_value(axis, hi)?);
            (a.min(b), a.max(b))
        }
        None => {
            let (lo, hi) = stat::min_max(&values).ok_or_else(|| {
                PlotError::EmptyData(format!("no finite values on the {} axis", axis))
            })?;
            stat::pad_range(lo, hi)
        }
    };
    Ok(Scale::continuous(range, scale.transform))
}

/// Resolve a static figure against its data.
pub fn compile(plot: &GgPlot, table: &dyn DataTable) -> Result<SceneGraph> {
    let geometry = plot.geometry().ok_or(PlotError::MissingGeometry)?;
    if table.row_count() == 0 {
        return Err(PlotError::EmptyData("the table has no rows".to_string()));
    }

    let ctx = Context::new(plot, table, geometry)?;
    let grid = frame::partition(table, &plot.facets())?;
    debug!(
        "compiling {} into {} panel(s) ({}x{})",
        geometry,
        grid.panels.len(),
        grid.nrow,
        grid.ncol
    );

    let mut marks = Vec::with_capacity(grid.panels.len());
    for panel in &grid.panels {
        marks.push(ctx.marks(&panel.rows)?);
    }

    let all_coords = || marks.iter().flatten().flat_map(DrawCommand::coords);
    let x_scale = if ctx.x_categories.is_empty() {
        continuous_scale(all_coords().map(|p| p.0), &ctx.x_scale, Axis::X, false)?
    } else {
        Scale::discrete(ctx.x_categories.clone())
    };
    let y_scale = if ctx.y_categories.is_empty() {
        let baseline = matches!(geometry, Geometry::Bar | Geometry::Histogram | Geometry::Density);
        continuous_scale(all_coords().map(|p| p.1), &ctx.y_scale, Axis::Y, baseline)?
    } else {
        Scale::discrete(ctx.y_categories.clone())
    };

    let coord = plot.coord();
    let (mut x_label, mut y_label) = ctx.axis_titles();
    let (x_scale, y_scale) = if coord.flip {
        std::mem::swap(&mut x_label, &mut y_label);
        (y_scale, x_scale)
    } else {
        (x_scale, y_scale)
    };

    let panels = grid
        .panels
        .iter()
        .zip(marks)
        .map(|(panel, commands)| PanelScene {
            row: panel.row,
            col: panel.col,
            title: panel.label.clone(),
            x_scale: x_scale.clone(),
            y_scale: y_scale.clone(),
            commands: if coord.flip {
                commands.into_iter().map(DrawCommand::flipped).collect()
            } else {
                commands
            },
        })
        .collect();

    Ok(SceneGraph {
        nrow: grid.nrow,
        ncol: grid.ncol,
        panels,
        title: plot.labels().title,
        x_label,
        y_label,
        theme: plot.theme().0,
        legend: ctx.legend(),
        fixed_ratio: coord.fixed_ratio,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::static_gg::translate;
    use crate::config::PlotConfig;
    use crate::data::PlotData;
    use crate::verbs::*;

    fn scene(table: &PlotData, verbs: &[Verb]) -> Result<SceneGraph> {
        let config = verbs
            .iter()
            .try_fold(PlotConfig::new(), |c, v| v.apply(&c))
            .unwrap();
        compile(&translate(&config)?, table)
    }

    fn table() -> PlotData {
        PlotData::from_columns([
            ("x", vec!["1", "2", "3", "4", "5", "6"]),
            ("y", vec!["2", "4", "6", "8", "10", "12"]),
            ("g", vec!["a", "b", "a", "b", "a", "b"]),
            ("neg", vec!["-1", "2", "3", "4", "5", "6"]),
        ])
    }

    fn rects(panel: &PanelScene) -> usize {
        panel
            .commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::Rect { .. }))
            .count()
    }

    #[test]
    fn test_scatter_single_panel() {
        let s = scene(&table(), &[plot_points("x", "y")]).unwrap();
        assert_eq!(s.panels.len(), 1);
        match &s.panels[0].commands[0] {
            DrawCommand::Points { markers } => assert_eq!(markers.len(), 6),
            other => panic!("unexpected command: {other:?}"),
        }
        assert_eq!(s.x_label, "x");
        assert_eq!(s.y_label, "y");
        assert!(s.legend.is_none());
    }

    #[test]
    fn test_color_groups_build_legend() {
        let s = scene(&table(), &[plot_lines("x", "y"), add_color("g")]).unwrap();
        assert_eq!(s.panels[0].commands.len(), 2);
        match &s.legend {
            Some(Legend {
                kind: LegendKind::Discrete(entries),
                ..
            }) => assert_eq!(entries.len(), 2),
            other => panic!("unexpected legend: {other:?}"),
        }
    }

    #[test]
    fn test_legend_none_hides_legend() {
        let s = scene(&table(), &[plot_lines("x", "y"), add_color("g"), set_legend("none")]).unwrap();
        assert!(s.legend.is_none());
    }

    #[test]
    fn test_bars_dodge_by_group() {
        let s = scene(&table(), &[plot_bars("g", Some("y")), add_fill("g")]).unwrap();
        assert_eq!(rects(&s.panels[0]), 2);
        assert!(s.panels[0].x_scale.is_discrete());
    }

    #[test]
    fn test_histogram_bins() {
        let s = scene(&table(), &[plot_histogram("x", Some(3))]).unwrap();
        assert_eq!(rects(&s.panels[0]), 3);
        assert_eq!(s.y_label, "count");
    }

    #[test]
    fn test_log_scale_rejects_non_positive() {
        let err = scene(&table(), &[plot_points("neg", "y"), scale_x_log()]).unwrap_err();
        assert!(matches!(err, PlotError::ScaleDomain(_)));
    }

    #[test]
    fn test_limits_override_range() {
        let s = scene(&table(), &[plot_points("x", "y"), xlim(0.0, 100.0)]).unwrap();
        assert_eq!(s.panels[0].x_scale.range, (0.0, 100.0));
    }

    #[test]
    fn test_reverse_negates_coordinates() {
        let s = scene(&table(), &[plot_points("x", "y"), scale_x_reverse()]).unwrap();
        let range = s.panels[0].x_scale.range;
        assert!(range.0 < -6.0 && range.1 < 0.0);
        assert_eq!(s.panels[0].x_scale.label(-3.0), "3");
    }

    #[test]
    fn test_facet_wrap_panels_share_scales() {
        let s = scene(&table(), &[plot_points("x", "y"), add_facets(None, None, Some("g"))]).unwrap();
        assert_eq!(s.panels.len(), 2);
        assert_eq!(s.panels[0].x_scale, s.panels[1].x_scale);
        assert_eq!(s.panels[0].title.as_deref(), Some("g = a"));
    }

    #[test]
    fn test_coord_flip_swaps_axes() {
        let s = scene(&table(), &[plot_bars("g", Some("y")), coord_flip()]).unwrap();
        assert!(s.panels[0].y_scale.is_discrete());
        assert_eq!(s.x_label, "y");
        assert_eq!(s.y_label, "g");
    }

    #[test]
    fn test_heatmap_continuous_legend() {
        let table = PlotData::from_columns([
            ("a", vec!["p", "q", "p", "q"]),
            ("b", vec!["u", "u", "v", "v"]),
            ("v", vec!["1", "2", "3", "4"]),
        ]);
        let s = scene(&table, &[plot_heatmap("a", "b", "v")]).unwrap();
        assert_eq!(rects(&s.panels[0]), 4);
        assert!(matches!(
            s.legend.map(|l| l.kind),
            Some(LegendKind::Continuous { min, max, .. }) if min == 1.0 && max == 4.0
        ));
    }

    #[test]
    fn test_box_plot_draws_box_per_category() {
        let s = scene(&table(), &[plot_box(Some("g"), "y")]).unwrap();
        assert_eq!(rects(&s.panels[0]), 2);
    }

    #[test]
    fn test_smooth_adds_line() {
        let s = scene(
            &table(),
            &[plot_points("x", "y"), add_smooth(SmoothMethod::Linear, None)],
        )
        .unwrap();
        assert!(matches!(s.panels[0].commands.last(), Some(DrawCommand::Line { points, .. }) if points.len() == 2));
    }

    #[test]
    fn test_non_numeric_column_errors() {
        let err = scene(&table(), &[plot_points("x", "g")]).unwrap_err();
        assert!(matches!(err, PlotError::NonNumeric { .. }));
    }

    #[test]
    fn test_text_x_uses_category_axis() {
        let days = PlotData::from_columns([
            ("day", vec!["mon", "tue", "wed"]),
            ("v", vec!["1", "3", "2"]),
        ]);
        let s = scene(&days, &[plot_points("day", "v")]).unwrap();
        let panel = &s.panels[0];
        assert!(panel.x_scale.is_discrete());
        assert_eq!(panel.x_scale.label(1.0), "tue");
        let coords: Vec<_> = panel.commands.iter().flat_map(DrawCommand::coords).collect();
        assert_eq!(coords, vec![(0.0, 1.0), (1.0, 3.0), (2.0, 2.0)]);

        let s = scene(&days, &[plot_lines("day", "v")]).unwrap();
        assert!(matches!(&s.panels[0].commands[0], DrawCommand::Line { points, .. } if points.len() == 3));
    }
}
