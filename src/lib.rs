// Library exports for pipeplot

pub mod artifact;
pub mod backend;
pub mod config;
pub mod data;
pub mod dispatch;
pub mod error;
pub mod frame;
pub mod parser;
pub mod plot;
pub mod preprocessor;
pub mod raster;
pub mod stat;
pub mod theme;
pub mod verbs;

pub use artifact::{Artifact, Capability, Figure, FigureSummary, MemorySink, Rendered, Sink, StdSink};
pub use config::{
    Aesthetic, AestheticValue, Axis, AxisScale, Backend, Geometry, Labels, Literal, PlotConfig,
    SmoothMethod,
};
pub use data::{DataTable, PlotData};
pub use error::{PlotError, Result};
pub use plot::{pipe, Plot};
pub use theme::ThemeName;
pub use verbs::*;

use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
pub enum OutputFormat {
    #[serde(rename = "png")]
    #[default]
    Png,
    #[serde(rename = "svg")]
    Svg,
}

impl std::str::FromStr for OutputFormat {
    type Err = PlotError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Ok(OutputFormat::Png),
            "svg" => Ok(OutputFormat::Svg),
            other => Err(PlotError::InvalidArgument(format!(
                "unknown output format '{}' (expected png or svg)",
                other
            ))),
        }
    }
}

/// Output size and encoding. `width`/`height` are pixels at 100 dpi.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RenderOptions {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_dpi")]
    pub dpi: u32,
    #[serde(default, rename = "type")]
    pub format: OutputFormat,
}

fn default_width() -> u32 { 800 }
fn default_height() -> u32 { 600 }
fn default_dpi() -> u32 { 100 }

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            dpi: 100,
            format: OutputFormat::Png,
        }
    }
}

impl RenderOptions {
    /// Device size in pixels after applying `dpi`.
    pub fn pixel_size(&self) -> Result<(u32, u32)> {
        if self.width == 0 || self.height == 0 || self.dpi == 0 {
            return Err(PlotError::InvalidArgument(format!(
                "output size must be positive, got {}x{} at {} dpi",
                self.width, self.height, self.dpi
            )));
        }
        let scale = |v: u32| ((v as u64 * self.dpi as u64) / 100).max(1) as u32;
        Ok((scale(self.width), scale(self.height)))
    }

    /// Copy with the given overrides applied.
    pub fn with_overrides(&self, width: Option<u32>, height: Option<u32>, dpi: Option<u32>) -> Self {
        Self {
            width: width.unwrap_or(self.width),
            height: height.unwrap_or(self.height),
            dpi: dpi.unwrap_or(self.dpi),
            format: self.format,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_options_defaults_from_json() {
        let options: RenderOptions = serde_json::from_str(r#"{"width": 400}"#).unwrap();
        assert_eq!(options.width, 400);
        assert_eq!(options.height, 600);
        assert_eq!(options.dpi, 100);
        assert_eq!(options.format, OutputFormat::Png);
    }

    #[test]
    fn test_render_options_format_rename() {
        let options: RenderOptions = serde_json::from_str(r#"{"type": "svg"}"#).unwrap();
        assert_eq!(options.format, OutputFormat::Svg);
    }

    #[test]
    fn test_pixel_size_scales_with_dpi() {
        let options = RenderOptions::default().with_overrides(Some(400), Some(300), Some(200));
        assert_eq!(options.pixel_size().unwrap(), (800, 600));
        let zero = RenderOptions::default().with_overrides(Some(0), None, None);
        assert!(zero.pixel_size().is_err());
    }
}
