//! Rendered artifacts, their shared capability trait, and output sinks.

use crate::backend::interactive::PlotlyFigure;
use crate::backend::static_gg::StaticFigure;
use crate::config::{Aesthetic, AestheticValue, Backend, Geometry, Labels};
use crate::error::{PlotError, Result};
use crate::theme::ThemeName;
use crate::RenderOptions;
use log::info;
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

/// Encoded output ready for a sink.
#[derive(Debug, Clone, PartialEq)]
pub enum Rendered {
    Png(Vec<u8>),
    Svg(String),
    Html(String),
    Json(String),
}

impl Rendered {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Rendered::Png(bytes) => bytes,
            Rendered::Svg(s) | Rendered::Html(s) | Rendered::Json(s) => s.as_bytes(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Rendered::Png(_) => "png",
            Rendered::Svg(_) => "svg",
            Rendered::Html(_) => "html",
            Rendered::Json(_) => "json",
        }
    }
}

/// Where rendered output goes: a screen stand-in and the filesystem.
pub trait Sink {
    fn display(&mut self, rendered: &Rendered) -> Result<()>;

    fn write(&mut self, rendered: &Rendered, path: &Path) -> Result<()>;
}

/// Displays on stdout and writes real files.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdSink;

impl Sink for StdSink {
    fn display(&mut self, rendered: &Rendered) -> Result<()> {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle.write_all(rendered.as_bytes())?;
        handle.flush()?;
        Ok(())
    }

    fn write(&mut self, rendered: &Rendered, path: &Path) -> Result<()> {
        fs::write(path, rendered.as_bytes())?;
        info!("wrote {} output to {}", rendered.kind(), path.display());
        Ok(())
    }
}

/// Keeps everything in memory.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    pub displayed: Vec<Rendered>,
    pub written: Vec<(std::path::PathBuf, Rendered)>,
}

impl Sink for MemorySink {
    fn display(&mut self, rendered: &Rendered) -> Result<()> {
        self.displayed.push(rendered.clone());
        Ok(())
    }

    fn write(&mut self, rendered: &Rendered, path: &Path) -> Result<()> {
        self.written.push((path.to_path_buf(), rendered.clone()));
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Render to the display sink.
    Display,
    /// Render to a file.
    File,
    /// Render to an embeddable HTML fragment.
    Html,
}

/// Backend-independent description of what a figure shows.
#[derive(Debug, Clone, PartialEq)]
pub struct FigureSummary {
    pub backend: Backend,
    pub geometry: Geometry,
    pub mappings: BTreeMap<Aesthetic, AestheticValue>,
    pub labels: Labels,
    pub theme: ThemeName,
}

impl FigureSummary {
    /// Same geometry, mappings, labels and theme, regardless of backend.
    pub fn same_content(&self, other: &FigureSummary) -> bool {
        self.geometry == other.geometry
            && self.mappings == other.mappings
            && self.labels == other.labels
            && self.theme == other.theme
    }
}

/// Capability set shared by both backends' figures.
pub trait Figure {
    fn display(&self, options: &RenderOptions, sink: &mut dyn Sink) -> Result<()>;

    fn save(&self, path: &Path, options: &RenderOptions, sink: &mut dyn Sink) -> Result<()>;

    fn to_html(&self, options: &RenderOptions) -> Result<String>;

    fn summary(&self) -> FigureSummary;

    fn capabilities(&self) -> &'static [Capability];

    fn supports(&self, capability: Capability) -> bool {
        self.capabilities().contains(&capability)
    }
}

/// Output of the dispatcher, uniform over both backends.
#[derive(Debug, Clone)]
pub enum Artifact {
    Static(StaticFigure),
    Interactive(PlotlyFigure),
}

impl Artifact {
    pub fn backend(&self) -> Backend {
        match self {
            Artifact::Static(_) => Backend::Static,
            Artifact::Interactive(_) => Backend::Interactive,
        }
    }

    fn figure(&self) -> &dyn Figure {
        match self {
            Artifact::Static(f) => f,
            Artifact::Interactive(f) => f,
        }
    }
}

impl Figure for Artifact {
    fn display(&self, options: &RenderOptions, sink: &mut dyn Sink) -> Result<()> {
        self.figure().display(options, sink)
    }

    fn save(&self, path: &Path, options: &RenderOptions, sink: &mut dyn Sink) -> Result<()> {
        self.figure().save(path, options, sink)
    }

    fn to_html(&self, options: &RenderOptions) -> Result<String> {
        self.figure().to_html(options)
    }

    fn summary(&self) -> FigureSummary {
        self.figure().summary()
    }

    fn capabilities(&self) -> &'static [Capability] {
        self.figure().capabilities()
    }
}

/// Lower-cased extension of `path`, for picking an encoder.
pub(crate) fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
}

pub(crate) fn unsupported_format(path: &Path, backend: Backend) -> PlotError {
    PlotError::UnsupportedOutputFormat {
        path: path.display().to_string(),
        backend: backend.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rendered_bytes() {
        assert_eq!(Rendered::Html("<div>".into()).as_bytes(), b"<div>");
        assert_eq!(Rendered::Png(vec![1, 2]).kind(), "png");
    }

    #[test]
    fn test_memory_sink_records() {
        let mut sink = MemorySink::default();
        sink.display(&Rendered::Json("{}".into())).unwrap();
        sink.write(&Rendered::Svg("<svg/>".into()), Path::new("a.svg"))
            .unwrap();
        assert_eq!(sink.displayed.len(), 1);
        assert_eq!(sink.written[0].0, Path::new("a.svg"));
    }

    #[test]
    fn test_extension_is_lowercased() {
        assert_eq!(extension(Path::new("out/Plot.PNG")).as_deref(), Some("png"));
        assert_eq!(extension(Path::new("noext")), None);
    }

    #[test]
    fn test_std_sink_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        StdSink
            .write(&Rendered::Json("{\"a\":1}".into()), &path)
            .unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{\"a\":1}");
    }
}
