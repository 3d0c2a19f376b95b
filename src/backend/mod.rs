//! Rendering adapters, one per backend.

pub mod interactive;
pub mod static_gg;

use crate::config::{Backend, Geometry, PlotConfig};
use crate::data::DataTable;
use crate::error::Result;
use crate::theme::{Palette, PaletteName};
use plotters::style::RGBColor;
use std::sync::Arc;

/// Translates a validated configuration into one backend's native figure.
pub trait Adapter {
    type Figure;

    fn backend(&self) -> Backend;

    fn supports(&self, geometry: Geometry) -> bool;

    fn build(&self, table: &Arc<dyn DataTable>, config: &PlotConfig) -> Result<Self::Figure>;
}

/// Colour used for ungrouped marks.
pub(crate) const DEFAULT_MARK: RGBColor = RGBColor(51, 102, 204);

/// `n` discrete colours, cycling through the palette.
pub(crate) fn group_colors(palette: Option<&Palette>, n: usize) -> Vec<RGBColor> {
    let colors = match palette {
        Some(p) => p.rgb(),
        None => Palette::Named(PaletteName::Default).rgb(),
    };
    if colors.is_empty() {
        return vec![DEFAULT_MARK; n];
    }
    (0..n).map(|i| colors[i % colors.len()]).collect()
}

/// Colour stops for continuous scales; viridis unless a palette is set.
pub(crate) fn gradient_colors(palette: Option<&Palette>) -> Vec<RGBColor> {
    match palette {
        Some(p) => p.rgb(),
        None => Palette::Named(PaletteName::Viridis).rgb(),
    }
}

/// Linear rescale of `v` from `domain` into `range`; a flat domain maps to the midpoint.
pub(crate) fn rescale(v: f64, domain: (f64, f64), range: (f64, f64)) -> f64 {
    let span = domain.1 - domain.0;
    if span.abs() < f64::EPSILON {
        return (range.0 + range.1) / 2.0;
    }
    range.0 + (v - domain.0) / span * (range.1 - range.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_colors_cycle() {
        let palette = Palette::Custom(vec!["#000000".into(), "#ffffff".into()]);
        let colors = group_colors(Some(&palette), 3);
        assert_eq!(colors[0], RGBColor(0, 0, 0));
        assert_eq!(colors[2], RGBColor(0, 0, 0));
    }

    #[test]
    fn test_rescale() {
        assert_eq!(rescale(5.0, (0.0, 10.0), (0.0, 1.0)), 0.5);
        assert_eq!(rescale(3.0, (3.0, 3.0), (2.0, 8.0)), 5.0);
    }
}
