//! Draw a [`SceneGraph`] onto any plotters backend.

use super::scene::{DrawCommand, Legend, LegendKind, PanelScene, PointShape, SceneGraph};
use crate::config::LegendPosition;
use crate::error::{PlotError, Result};
use crate::theme::{gradient, ThemePreset};
use image::ImageEncoder;
use plotters::coord::Shift;
use plotters::prelude::*;
use std::fmt::Display;

const LEGEND_WIDTH: i32 = 130;
const LEGEND_HEIGHT: i32 = 50;
const SWATCH: i32 = 12;

fn render_err<E: Display>(e: E) -> PlotError {
    PlotError::Render(e.to_string())
}

/// Draw into an RGB buffer and encode it as PNG.
pub fn render_png(scene: &SceneGraph, (width, height): (u32, u32)) -> Result<Vec<u8>> {
    let mut buffer = vec![0u8; width as usize * height as usize * 3];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
        draw_scene(&root, scene)?;
        root.present().map_err(render_err)?;
    }

    let mut png_bytes = Vec::new();
    let encoder = image::codecs::png::PngEncoder::new(&mut png_bytes);
    encoder.write_image(&buffer, width, height, image::ColorType::Rgb8)?;
    Ok(png_bytes)
}

pub fn render_svg(scene: &SceneGraph, size: (u32, u32)) -> Result<String> {
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, size).into_drawing_area();
        draw_scene(&root, scene)?;
        root.present().map_err(render_err)?;
    }
    Ok(svg)
}

fn draw_scene<DB: DrawingBackend>(root: &DrawingArea<DB, Shift>, scene: &SceneGraph) -> Result<()> {
    let preset = scene.theme.preset();
    root.fill(&preset.plot_background).map_err(render_err)?;

    let body = match &scene.title {
        Some(title) => root
            .titled(title, ("sans-serif", 22).into_font().color(&preset.text))
            .map_err(render_err)?,
        None => root.clone(),
    };

    let (plot_area, legend_area) = split_legend(&body, scene.legend.as_ref());
    if let (Some(legend), Some(area)) = (&scene.legend, &legend_area) {
        draw_legend(area, legend, preset)?;
    }

    let areas = plot_area.split_evenly((scene.nrow.max(1), scene.ncol.max(1)));
    for panel in &scene.panels {
        let Some(area) = areas.get(panel.row * scene.ncol + panel.col) else {
            continue;
        };
        let area = letterbox(area, scene.fixed_ratio, panel);
        draw_panel(&area, panel, scene, preset)?;
    }
    Ok(())
}

fn split_legend<DB: DrawingBackend>(
    body: &DrawingArea<DB, Shift>,
    legend: Option<&Legend>,
) -> (DrawingArea<DB, Shift>, Option<DrawingArea<DB, Shift>>) {
    let Some(legend) = legend else {
        return (body.clone(), None);
    };
    let (w, h) = body.dim_in_pixel();
    match legend.position {
        LegendPosition::Right => {
            let (plot, side) = body.split_horizontally((w as i32 - LEGEND_WIDTH).max(0));
            (plot, Some(side))
        }
        LegendPosition::Left => {
            let (side, plot) = body.split_horizontally(LEGEND_WIDTH);
            (plot, Some(side))
        }
        LegendPosition::Top => {
            let (side, plot) = body.split_vertically(LEGEND_HEIGHT);
            (plot, Some(side))
        }
        LegendPosition::Bottom => {
            let (plot, side) = body.split_vertically((h as i32 - LEGEND_HEIGHT).max(0));
            (plot, Some(side))
        }
        LegendPosition::None => (body.clone(), None),
    }
}

fn draw_legend<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    legend: &Legend,
    preset: &ThemePreset,
) -> Result<()> {
    let text = ("sans-serif", 13).into_font().color(&preset.text);
    let horizontal = matches!(legend.position, LegendPosition::Top | LegendPosition::Bottom);
    area.draw(&Text::new(legend.title.clone(), (10, 8), text.clone()))
        .map_err(render_err)?;

    let entries: Vec<(String, RGBColor)> = match &legend.kind {
        LegendKind::Discrete(entries) => entries.clone(),
        LegendKind::Continuous { min, max, colors } => {
            // five stops from min to max
            (0..5)
                .map(|i| {
                    let t = i as f64 / 4.0;
                    let label = format!("{:.3}", min + t * (max - min));
                    let label = label.trim_end_matches('0').trim_end_matches('.').to_string();
                    (label, gradient(colors, t))
                })
                .collect()
        }
    };

    for (i, (label, color)) in entries.iter().enumerate() {
        let (x, y) = if horizontal {
            (10 + i as i32 * 90, 26)
        } else {
            (10, 28 + i as i32 * 20)
        };
        area.draw(&Rectangle::new([(x, y), (x + SWATCH, y + SWATCH)], color.filled()))
            .map_err(render_err)?;
        area.draw(&Text::new(label.clone(), (x + SWATCH + 6, y), text.clone()))
            .map_err(render_err)?;
    }
    Ok(())
}

/// Shrink the panel so one y unit is `ratio` times one x unit on screen.
fn letterbox<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    ratio: Option<f64>,
    panel: &PanelScene,
) -> DrawingArea<DB, Shift> {
    let Some(ratio) = ratio else {
        return area.clone();
    };
    let (w, h) = area.dim_in_pixel();
    let dx = panel.x_scale.range.1 - panel.x_scale.range.0;
    let dy = panel.y_scale.range.1 - panel.y_scale.range.0;
    if dx <= 0.0 || dy <= 0.0 || w == 0 || h == 0 {
        return area.clone();
    }

    let target = ratio * dy / dx;
    let (w, h) = (w as f64, h as f64);
    if h / w > target {
        let pad = ((h - w * target) / 2.0).max(0.0) as i32;
        area.margin(pad, pad, 0, 0)
    } else {
        let pad = ((w - h / target) / 2.0).max(0.0) as i32;
        area.margin(0, 0, pad, pad)
    }
}

fn draw_panel<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    panel: &PanelScene,
    scene: &SceneGraph,
    preset: &ThemePreset,
) -> Result<()> {
    let (x_range, y_range) = (panel.x_scale.range, panel.y_scale.range);
    let label_area = |size: i32| if preset.show_axes { size } else { 0 };

    let mut builder = ChartBuilder::on(area);
    builder
        .margin(10)
        .x_label_area_size(label_area(40))
        .y_label_area_size(label_area(50));
    if let Some(title) = &panel.title {
        builder.caption(title, ("sans-serif", 14).into_font().color(&preset.text));
    }
    let mut chart = builder
        .build_cartesian_2d(x_range.0..x_range.1, y_range.0..y_range.1)
        .map_err(render_err)?;

    chart
        .plotting_area()
        .fill(&preset.panel_background)
        .map_err(render_err)?;

    let x_fmt = |v: &f64| panel.x_scale.label(*v);
    let y_fmt = |v: &f64| panel.y_scale.label(*v);
    let mut mesh = chart.configure_mesh();
    mesh.x_labels(panel.x_scale.tick_count())
        .y_labels(panel.y_scale.tick_count())
        .x_label_formatter(&x_fmt)
        .y_label_formatter(&y_fmt)
        .x_desc(scene.x_label.as_str())
        .y_desc(scene.y_label.as_str())
        .label_style(("sans-serif", 12).into_font().color(&preset.text))
        .axis_desc_style(("sans-serif", 14).into_font().color(&preset.text));
    match preset.grid {
        Some(grid) => {
            mesh.bold_line_style(grid.stroke_width(1))
                .light_line_style(grid.mix(0.5).stroke_width(1));
        }
        None => {
            mesh.disable_mesh();
        }
    }
    match preset.axis_line {
        Some(axis) => {
            mesh.axis_style(axis.stroke_width(1));
        }
        None => {
            mesh.axis_style(TRANSPARENT.stroke_width(0));
        }
    }
    if !preset.show_axes {
        mesh.disable_axes();
    }
    mesh.draw().map_err(render_err)?;

    for command in &panel.commands {
        match command {
            DrawCommand::Line {
                points,
                color,
                width,
                alpha,
            } => {
                chart
                    .draw_series(LineSeries::new(
                        points.iter().copied(),
                        color.mix(*alpha).stroke_width(*width),
                    ))
                    .map_err(render_err)?;
            }
            DrawCommand::Rect { tl, br, color, alpha } => {
                chart
                    .draw_series(std::iter::once(Rectangle::new(
                        [*tl, *br],
                        color.mix(*alpha).filled(),
                    )))
                    .map_err(render_err)?;
            }
            DrawCommand::Polygon { points, color, alpha } => {
                chart
                    .draw_series(std::iter::once(Polygon::new(
                        points.clone(),
                        color.mix(*alpha).filled(),
                    )))
                    .map_err(render_err)?;
            }
            DrawCommand::Points { markers } => {
                let of = |shape: PointShape| markers.iter().filter(move |m| m.shape == shape);
                chart
                    .draw_series(of(PointShape::Circle).map(|m| {
                        Circle::new((m.x, m.y), m.size.round() as i32, m.color.mix(m.alpha).filled())
                    }))
                    .map_err(render_err)?;
                chart
                    .draw_series(of(PointShape::Triangle).map(|m| {
                        TriangleMarker::new((m.x, m.y), m.size.round() as i32 + 1, m.color.mix(m.alpha).filled())
                    }))
                    .map_err(render_err)?;
                chart
                    .draw_series(of(PointShape::Square).map(|m| {
                        let s = m.size.round() as i32;
                        EmptyElement::at((m.x, m.y))
                            + Rectangle::new([(-s, -s), (s, s)], m.color.mix(m.alpha).filled())
                    }))
                    .map_err(render_err)?;
                chart
                    .draw_series(of(PointShape::Cross).map(|m| {
                        Cross::new((m.x, m.y), m.size.round() as i32, m.color.mix(m.alpha).stroke_width(2))
                    }))
                    .map_err(render_err)?;
            }
        }
    }

    if let Some(border) = preset.panel_border {
        chart
            .draw_series(std::iter::once(Rectangle::new(
                [(x_range.0, y_range.1), (x_range.1, y_range.0)],
                border.stroke_width(1),
            )))
            .map_err(render_err)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::scene::{Marker, Scale};
    use crate::theme::ThemeName;

    fn scene(theme: ThemeName) -> SceneGraph {
        SceneGraph {
            nrow: 1,
            ncol: 2,
            panels: (0..2)
                .map(|col| PanelScene {
                    row: 0,
                    col,
                    title: Some(format!("panel {}", col)),
                    x_scale: Scale::continuous((0.0, 10.0), None),
                    y_scale: Scale::discrete(vec!["a".into(), "b".into()]),
                    commands: vec![
                        DrawCommand::Points {
                            markers: vec![Marker {
                                x: 5.0,
                                y: 1.0,
                                color: RGBColor(255, 0, 0),
                                alpha: 1.0,
                                size: 3.0,
                                shape: PointShape::Square,
                            }],
                        },
                        DrawCommand::Rect {
                            tl: (1.0, 0.4),
                            br: (2.0, -0.4),
                            color: RGBColor(0, 0, 255),
                            alpha: 0.5,
                        },
                    ],
                })
                .collect(),
            title: Some("Title".into()),
            x_label: "x".into(),
            y_label: "y".into(),
            theme,
            legend: Some(Legend {
                title: "g".into(),
                position: LegendPosition::Bottom,
                kind: LegendKind::Discrete(vec![("a".into(), RGBColor(255, 0, 0))]),
            }),
            fixed_ratio: Some(1.0),
        }
    }

    #[test]
    fn test_render_png_signature() {
        let png = render_png(&scene(ThemeName::Classic), (320, 240)).unwrap();
        assert_eq!(&png[..8], &[137, 80, 78, 71, 13, 10, 26, 10]);
    }

    #[test]
    fn test_render_svg_every_theme() {
        for theme in ThemeName::ALL {
            let svg = render_svg(&scene(theme), (320, 240)).unwrap();
            assert!(svg.contains("<svg"), "theme {}", theme);
        }
    }
}
