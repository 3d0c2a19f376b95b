//! Theme presets and colour palettes.
//!
//! Both backends read the same constant tables, so a theme name means the same
//! background, grid and axis treatment whichever renderer draws it.

use crate::error::{PlotError, Result};
use plotters::style::RGBColor;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Built-in visual themes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeName {
    #[default]
    Default,
    Minimal,
    Classic,
    Dark,
    Light,
    #[serde(rename = "bw")]
    BlackAndWhite,
    Void,
}

impl ThemeName {
    pub const ALL: [ThemeName; 7] = [
        ThemeName::Default,
        ThemeName::Minimal,
        ThemeName::Classic,
        ThemeName::Dark,
        ThemeName::Light,
        ThemeName::BlackAndWhite,
        ThemeName::Void,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ThemeName::Default => "default",
            ThemeName::Minimal => "minimal",
            ThemeName::Classic => "classic",
            ThemeName::Dark => "dark",
            ThemeName::Light => "light",
            ThemeName::BlackAndWhite => "bw",
            ThemeName::Void => "void",
        }
    }

    /// Visual parameters for this theme.
    pub fn preset(self) -> &'static ThemePreset {
        &PRESETS[self as usize]
    }
}

impl fmt::Display for ThemeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ThemeName {
    type Err = PlotError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "default" => Ok(ThemeName::Default),
            "minimal" => Ok(ThemeName::Minimal),
            "classic" => Ok(ThemeName::Classic),
            "dark" => Ok(ThemeName::Dark),
            "light" => Ok(ThemeName::Light),
            "bw" | "blackandwhite" | "black_and_white" => Ok(ThemeName::BlackAndWhite),
            "void" => Ok(ThemeName::Void),
            _ => Err(PlotError::UnknownTheme {
                name: s.to_string(),
                expected: ThemeName::ALL
                    .iter()
                    .map(|t| t.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            }),
        }
    }
}

/// Fixed background/gridline/axis parameters of one theme.
#[derive(Debug, Clone, PartialEq)]
pub struct ThemePreset {
    pub name: ThemeName,
    pub plot_background: RGBColor,
    pub panel_background: RGBColor,
    /// Major grid colour; `None` hides the grid.
    pub grid: Option<RGBColor>,
    /// Axis line colour; `None` hides the axis lines.
    pub axis_line: Option<RGBColor>,
    /// Panel border colour; `None` draws no border.
    pub panel_border: Option<RGBColor>,
    pub text: RGBColor,
    /// Void hides ticks, labels and axis titles entirely.
    pub show_axes: bool,
    /// Name of the closest ggplot theme function.
    pub ggplot_theme: &'static str,
    /// Name of the closest Plotly template.
    pub plotly_template: &'static str,
}

const WHITE: RGBColor = RGBColor(255, 255, 255);
const BLACK: RGBColor = RGBColor(0, 0, 0);

// Indexed by `ThemeName as usize`.
static PRESETS: [ThemePreset; 7] = [
    ThemePreset {
        name: ThemeName::Default,
        plot_background: WHITE,
        panel_background: RGBColor(235, 235, 235),
        grid: Some(WHITE),
        axis_line: None,
        panel_border: None,
        text: RGBColor(77, 77, 77),
        show_axes: true,
        ggplot_theme: "theme_gray",
        plotly_template: "plotly",
    },
    ThemePreset {
        name: ThemeName::Minimal,
        plot_background: WHITE,
        panel_background: WHITE,
        grid: Some(RGBColor(235, 235, 235)),
        axis_line: None,
        panel_border: None,
        text: RGBColor(77, 77, 77),
        show_axes: true,
        ggplot_theme: "theme_minimal",
        plotly_template: "simple_white",
    },
    ThemePreset {
        name: ThemeName::Classic,
        plot_background: WHITE,
        panel_background: WHITE,
        grid: None,
        axis_line: Some(BLACK),
        panel_border: None,
        text: BLACK,
        show_axes: true,
        ggplot_theme: "theme_classic",
        plotly_template: "plotly_white",
    },
    ThemePreset {
        name: ThemeName::Dark,
        plot_background: WHITE,
        panel_background: RGBColor(127, 127, 127),
        grid: Some(RGBColor(107, 107, 107)),
        axis_line: None,
        panel_border: None,
        text: RGBColor(77, 77, 77),
        show_axes: true,
        ggplot_theme: "theme_dark",
        plotly_template: "plotly_dark",
    },
    ThemePreset {
        name: ThemeName::Light,
        plot_background: WHITE,
        panel_background: WHITE,
        grid: Some(RGBColor(222, 222, 222)),
        axis_line: None,
        panel_border: Some(RGBColor(179, 179, 179)),
        text: RGBColor(77, 77, 77),
        show_axes: true,
        ggplot_theme: "theme_light",
        plotly_template: "plotly_white",
    },
    ThemePreset {
        name: ThemeName::BlackAndWhite,
        plot_background: WHITE,
        panel_background: WHITE,
        grid: Some(RGBColor(235, 235, 235)),
        axis_line: None,
        panel_border: Some(RGBColor(51, 51, 51)),
        text: BLACK,
        show_axes: true,
        ggplot_theme: "theme_bw",
        plotly_template: "plotly_white",
    },
    ThemePreset {
        name: ThemeName::Void,
        plot_background: WHITE,
        panel_background: WHITE,
        grid: None,
        axis_line: None,
        panel_border: None,
        text: BLACK,
        show_axes: false,
        ggplot_theme: "theme_void",
        plotly_template: "none",
    },
];

/// Named colour palettes shared by both backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaletteName {
    Default,
    Viridis,
    Plasma,
    Colorblind,
    Pastel,
}

impl PaletteName {
    pub const ALL: [PaletteName; 5] = [
        PaletteName::Default,
        PaletteName::Viridis,
        PaletteName::Plasma,
        PaletteName::Colorblind,
        PaletteName::Pastel,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PaletteName::Default => "default",
            PaletteName::Viridis => "viridis",
            PaletteName::Plasma => "plasma",
            PaletteName::Colorblind => "colorblind",
            PaletteName::Pastel => "pastel",
        }
    }

    pub fn colors(self) -> &'static [&'static str] {
        match self {
            PaletteName::Default => &[
                "#F8766D", "#00BA38", "#619CFF", "#C77CFF", "#00BFC4", "#B79F00", "#F564E3",
            ],
            PaletteName::Viridis => &[
                "#440154", "#414487", "#2a788e", "#22a884", "#7ad151", "#fde725",
            ],
            PaletteName::Plasma => &[
                "#0d0887", "#5302a3", "#8b0aa5", "#b83289", "#db5c68", "#f48849", "#febd2a",
                "#f0f921",
            ],
            PaletteName::Colorblind => &[
                "#0173B2", "#DE8F05", "#029E73", "#CC78BC", "#CA9161", "#949494", "#ECE133",
            ],
            PaletteName::Pastel => &["#B4E7CE", "#FFD6BA", "#F7D4D4", "#C5D5EA", "#F5E6CC"],
        }
    }
}

impl FromStr for PaletteName {
    type Err = PlotError;

    fn from_str(s: &str) -> Result<Self> {
        PaletteName::ALL
            .iter()
            .copied()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| PlotError::UnknownPalette {
                name: s.to_string(),
                expected: PaletteName::ALL
                    .iter()
                    .map(|p| p.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }
}

/// Palette directive carried by a configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum Palette {
    Named(PaletteName),
    Custom(Vec<String>),
}

impl Palette {
    /// Colour strings in order; custom palettes are returned as given.
    pub fn color_strings(&self) -> Vec<String> {
        match self {
            Palette::Named(name) => name.colors().iter().map(|c| c.to_string()).collect(),
            Palette::Custom(colors) => colors.clone(),
        }
    }

    /// Parsed colours; entries that fail to parse are skipped.
    pub fn rgb(&self) -> Vec<RGBColor> {
        self.color_strings()
            .iter()
            .filter_map(|c| parse_color(c))
            .collect()
    }
}

/// Parse a colour string into RGBColor, supporting hex (#RRGGBB, #RGB) and named colours
pub fn parse_color(color_str: &str) -> Option<RGBColor> {
    let color_str = color_str.trim();

    if color_str.starts_with('#') {
        return parse_hex_color(color_str);
    }

    match color_str.to_lowercase().as_str() {
        "white" => Some(RGBColor(255, 255, 255)),
        "black" => Some(RGBColor(0, 0, 0)),
        "red" => Some(RGBColor(255, 0, 0)),
        "green" => Some(RGBColor(0, 128, 0)),
        "blue" => Some(RGBColor(0, 0, 255)),
        "yellow" => Some(RGBColor(255, 255, 0)),
        "cyan" => Some(RGBColor(0, 255, 255)),
        "magenta" => Some(RGBColor(255, 0, 255)),
        "orange" => Some(RGBColor(255, 165, 0)),
        "purple" => Some(RGBColor(128, 0, 128)),
        "pink" => Some(RGBColor(255, 192, 203)),
        "brown" => Some(RGBColor(139, 69, 19)),
        "steelblue" => Some(RGBColor(70, 130, 180)),
        "gray" | "grey" => Some(RGBColor(128, 128, 128)),
        "darkgray" | "darkgrey" => Some(RGBColor(64, 64, 64)),
        "lightgray" | "lightgrey" => Some(RGBColor(192, 192, 192)),
        // gray0 = black, gray100 = white
        s if s.starts_with("gray") || s.starts_with("grey") => {
            let n = s[4..].parse::<u8>().ok().filter(|n| *n <= 100)?;
            let v = (n as f64 * 2.55).round() as u8;
            Some(RGBColor(v, v, v))
        }
        _ => None,
    }
}

fn parse_hex_color(hex: &str) -> Option<RGBColor> {
    let hex = hex.trim_start_matches('#');
    match hex.len() {
        6 => {
            let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
            let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
            let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
            Some(RGBColor(r, g, b))
        }
        3 => {
            let r = u8::from_str_radix(&hex[0..1], 16).ok()? * 17;
            let g = u8::from_str_radix(&hex[1..2], 16).ok()? * 17;
            let b = u8::from_str_radix(&hex[2..3], 16).ok()? * 17;
            Some(RGBColor(r, g, b))
        }
        _ => None,
    }
}

/// `#rrggbb` form of a colour, as the interactive backend expects it.
pub fn to_hex(color: &RGBColor) -> String {
    format!("#{:02x}{:02x}{:02x}", color.0, color.1, color.2)
}

/// Linear interpolation along a palette, `t` in `[0, 1]`.
pub fn gradient(colors: &[RGBColor], t: f64) -> RGBColor {
    match colors.len() {
        0 => RGBColor(0, 0, 0),
        1 => colors[0],
        n => {
            let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
            let pos = t * (n - 1) as f64;
            let lo = pos.floor() as usize;
            let hi = (lo + 1).min(n - 1);
            let w = pos - lo as f64;
            let mix = |a: u8, b: u8| (a as f64 * (1.0 - w) + b as f64 * w).round() as u8;
            let (a, b) = (colors[lo], colors[hi]);
            RGBColor(mix(a.0, b.0), mix(a.1, b.1), mix(a.2, b.2))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_theme_names_round_trip() {
        for theme in ThemeName::ALL {
            assert_eq!(theme.as_str().parse::<ThemeName>().unwrap(), theme);
            assert_eq!(theme.preset().name, theme);
        }
    }

    #[test]
    fn test_unknown_theme() {
        let err = "neon".parse::<ThemeName>().unwrap_err();
        match err {
            PlotError::UnknownTheme { name, expected } => {
                assert_eq!(name, "neon");
                assert!(expected.contains("minimal"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_classic_has_axis_lines_and_no_grid() {
        let preset = ThemeName::Classic.preset();
        assert!(preset.grid.is_none());
        assert_eq!(preset.axis_line, Some(RGBColor(0, 0, 0)));
    }

    #[test]
    fn test_void_hides_axes() {
        assert!(!ThemeName::Void.preset().show_axes);
    }

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(parse_color("#FF0000"), Some(RGBColor(255, 0, 0)));
        assert_eq!(parse_color("#F00"), Some(RGBColor(255, 0, 0)));
        assert_eq!(parse_color("#CCCCCC"), Some(RGBColor(204, 204, 204)));
        assert_eq!(parse_color("#12345"), None);
    }

    #[test]
    fn test_parse_gray_scale() {
        assert_eq!(parse_color("gray0"), Some(RGBColor(0, 0, 0)));
        assert_eq!(parse_color("gray100"), Some(RGBColor(255, 255, 255)));
        assert_eq!(parse_color("grey90"), Some(RGBColor(229, 229, 229)));
        assert_eq!(parse_color("gray200"), None);
    }

    #[test]
    fn test_palette_lookup() {
        assert_eq!("Viridis".parse::<PaletteName>().unwrap(), PaletteName::Viridis);
        assert!(matches!(
            "rainbow".parse::<PaletteName>(),
            Err(PlotError::UnknownPalette { .. })
        ));
    }

    #[test]
    fn test_gradient_endpoints() {
        let colors = [RGBColor(0, 0, 0), RGBColor(200, 100, 50)];
        assert_eq!(gradient(&colors, 0.0), RGBColor(0, 0, 0));
        assert_eq!(gradient(&colors, 1.0), RGBColor(200, 100, 50));
        assert_eq!(gradient(&colors, 0.5), RGBColor(100, 50, 25));
    }

    #[test]
    fn test_to_hex() {
        assert_eq!(to_hex(&RGBColor(255, 16, 0)), "#ff1000");
    }
}
