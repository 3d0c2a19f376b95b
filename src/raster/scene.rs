//! Resolved drawing primitives for the raster renderer.
//!
//! All coordinates live in scale space: log axes hold `log10(v)` and reversed axes hold `-v`,
//! so every range is ascending and the drawing layer never needs to know about transforms.

use crate::config::{LegendPosition, ScaleTransform};
use crate::theme::ThemeName;
use plotters::style::RGBColor;

#[derive(Debug, Clone, PartialEq)]
pub struct Scale {
    pub range: (f64, f64),
    /// Index -> label for discrete axes; empty for continuous ones.
    pub categories: Vec<String>,
    pub transform: Option<ScaleTransform>,
}

impl Scale {
    pub fn continuous(range: (f64, f64), transform: Option<ScaleTransform>) -> Self {
        Scale {
            range,
            categories: Vec::new(),
            transform,
        }
    }

    pub fn discrete(categories: Vec<String>) -> Self {
        let n = categories.len().max(1) as f64;
        Scale {
            range: (-0.5, n - 0.5),
            categories,
            transform: None,
        }
    }

    pub fn is_discrete(&self) -> bool {
        !self.categories.is_empty()
    }

    /// Tick label for a scale-space position.
    pub fn label(&self, v: f64) -> String {
        if self.is_discrete() {
            let i = v.round();
            if (v - i).abs() > 1e-6 || i < 0.0 {
                return String::new();
            }
            return self.categories.get(i as usize).cloned().unwrap_or_default();
        }
        let v = match self.transform {
            Some(ScaleTransform::Log10) => 10f64.powf(v),
            Some(ScaleTransform::Reverse) => -v,
            None => v,
        };
        format_number(v)
    }

    /// Number of tick labels to ask for.
    pub fn tick_count(&self) -> usize {
        if self.is_discrete() {
            self.categories.len()
        } else {
            8
        }
    }
}

fn format_number(v: f64) -> String {
    if v == 0.0 {
        return "0".to_string();
    }
    if v.abs() >= 1e5 || v.abs() < 1e-3 {
        return format!("{:.1e}", v);
    }
    let s = format!("{:.3}", v);
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PointShape {
    #[default]
    Circle,
    Square,
    Triangle,
    Cross,
}

impl PointShape {
    pub const CYCLE: [PointShape; 4] = [
        PointShape::Circle,
        PointShape::Triangle,
        PointShape::Square,
        PointShape::Cross,
    ];

    pub fn from_name(name: &str) -> PointShape {
        match name.trim().to_lowercase().as_str() {
            "square" | "15" => PointShape::Square,
            "triangle" | "17" => PointShape::Triangle,
            "cross" | "plus" | "3" | "4" => PointShape::Cross,
            _ => PointShape::Circle,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub x: f64,
    pub y: f64,
    pub color: RGBColor,
    pub alpha: f64,
    pub size: f64,
    pub shape: PointShape,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Line {
        points: Vec<(f64, f64)>,
        color: RGBColor,
        width: u32,
        alpha: f64,
    },
    Points {
        markers: Vec<Marker>,
    },
    Rect {
        tl: (f64, f64),
        br: (f64, f64),
        color: RGBColor,
        alpha: f64,
    },
    Polygon {
        points: Vec<(f64, f64)>,
        color: RGBColor,
        alpha: f64,
    },
}

impl DrawCommand {
    /// Every coordinate the command touches.
    pub fn coords(&self) -> Vec<(f64, f64)> {
        match self {
            DrawCommand::Line { points, .. } | DrawCommand::Polygon { points, .. } => points.clone(),
            DrawCommand::Points { markers } => markers.iter().map(|m| (m.x, m.y)).collect(),
            DrawCommand::Rect { tl, br, .. } => vec![*tl, *br],
        }
    }

    /// Swap x and y everywhere.
    pub fn flipped(self) -> DrawCommand {
        let swap = |(x, y): (f64, f64)| (y, x);
        match self {
            DrawCommand::Line {
                points,
                color,
                width,
                alpha,
            } => DrawCommand::Line {
                points: points.into_iter().map(swap).collect(),
                color,
                width,
                alpha,
            },
            DrawCommand::Points { markers } => DrawCommand::Points {
                markers: markers
                    .into_iter()
                    .map(|m| Marker { x: m.y, y: m.x, ..m })
                    .collect(),
            },
            DrawCommand::Rect { tl, br, color, alpha } => DrawCommand::Rect {
                tl: swap(tl),
                br: swap(br),
                color,
                alpha,
            },
            DrawCommand::Polygon { points, color, alpha } => DrawCommand::Polygon {
                points: points.into_iter().map(swap).collect(),
                color,
                alpha,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LegendKind {
    Discrete(Vec<(String, RGBColor)>),
    Continuous {
        min: f64,
        max: f64,
        colors: Vec<RGBColor>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Legend {
    pub title: String,
    pub position: LegendPosition,
    pub kind: LegendKind,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PanelScene {
    pub row: usize,
    pub col: usize,
    pub title: Option<String>,
    pub x_scale: Scale,
    pub y_scale: Scale,
    pub commands: Vec<DrawCommand>,
}

/// Everything needed to draw one static figure at any size.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneGraph {
    pub nrow: usize,
    pub ncol: usize,
    pub panels: Vec<PanelScene>,
    pub title: Option<String>,
    pub x_label: String,
    pub y_label: String,
    pub theme: ThemeName,
    pub legend: Option<Legend>,
    /// y/x aspect of one data unit, from coord_fixed.
    pub fixed_ratio: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discrete_labels() {
        let scale = Scale::discrete(vec!["a".into(), "b".into()]);
        assert_eq!(scale.range, (-0.5, 1.5));
        assert_eq!(scale.label(1.0), "b");
        assert_eq!(scale.label(0.5), "");
    }

    #[test]
    fn test_transformed_labels() {
        let log = Scale::continuous((0.0, 3.0), Some(ScaleTransform::Log10));
        assert_eq!(log.label(2.0), "100");
        let rev = Scale::continuous((-10.0, 0.0), Some(ScaleTransform::Reverse));
        assert_eq!(rev.label(-2.5), "2.5");
    }

    #[test]
    fn test_flip_swaps_rect() {
        let rect = DrawCommand::Rect {
            tl: (1.0, 2.0),
            br: (3.0, 4.0),
            color: RGBColor(0, 0, 0),
            alpha: 1.0,
        };
        assert_eq!(rect.flipped().coords(), vec![(2.0, 1.0), (4.0, 3.0)]);
    }
}
