//! Error types for pipeplot.

use std::io;
use thiserror::Error;

/// Result type alias using [`PlotError`].
pub type Result<T> = std::result::Result<T, PlotError>;

/// Errors raised while building, validating or rendering a plot.
///
/// Every variant is a caller error surfaced synchronously; nothing here is retryable.
#[derive(Error, Debug)]
pub enum PlotError {
    /// A second initialization verb was applied to a configuration that already has a geometry.
    #[error("plot geometry is already '{existing}', cannot re-initialize as '{requested}'")]
    ConflictingGeometry {
        existing: String,
        requested: String,
    },

    /// Both a column and a literal were given for one aesthetic.
    #[error("aesthetic '{aesthetic}' was given both a column and a fixed value")]
    AmbiguousAesthetic { aesthetic: String },

    #[error("unknown theme '{name}' (expected one of: {expected})")]
    UnknownTheme { name: String, expected: String },

    #[error("unknown palette '{name}' (expected one of: {expected})")]
    UnknownPalette { name: String, expected: String },

    /// Render was requested before any initialization verb.
    #[error("plot geometry must be specified (use plot_points, plot_lines, ...)")]
    MissingGeometry,

    #[error("geometry '{geometry}' requires a column mapped to '{aesthetic}'")]
    MissingRequiredMapping { geometry: String, aesthetic: String },

    #[error("geometry '{geometry}' is not supported by the {backend} backend")]
    UnsupportedGeometryForBackend { geometry: String, backend: String },

    #[error("HTML export is not supported by the {backend} backend (switch with to_interactive)")]
    HtmlExportNotSupported { backend: String },

    #[error("column '{column}' not found (available: {available})")]
    UnknownColumn { column: String, available: String },

    #[error("the {backend} backend cannot write '{path}'")]
    UnsupportedOutputFormat { path: String, backend: String },

    #[error("failed to parse '{value}' as number in column '{column}' at row {row}")]
    NonNumeric {
        column: String,
        value: String,
        row: usize,
    },

    /// Scale domain error, e.g. log of a non-positive value.
    #[error("scale domain error: {0}")]
    ScaleDomain(String),

    #[error("no data to draw: {0}")]
    EmptyData(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("variable '${0}' not defined")]
    UndefinedVariable(String),

    #[error("rendering error: {0}")]
    Render(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("image encoding error: {0}")]
    Image(#[from] image::ImageError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflicting_geometry_names_both() {
        let err = PlotError::ConflictingGeometry {
            existing: "scatter".to_string(),
            requested: "line".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("scatter"));
        assert!(msg.contains("line"));
    }

    #[test]
    fn test_unsupported_geometry_names_backend() {
        let err = PlotError::UnsupportedGeometryForBackend {
            geometry: "contour".to_string(),
            backend: "static".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "geometry 'contour' is not supported by the static backend"
        );
    }

    #[test]
    fn test_io_error_converts() {
        let err: PlotError = io::Error::new(io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(err, PlotError::Io(_)));
    }
}
