//! Chain wrapper: a table plus an immutable configuration.
//!
//! Every verb method returns a new [`Plot`]; the receiver is left untouched, so an
//! intermediate wrapper can be branched freely.
//!
//! ```no_run
//! use pipeplot::{plot, plot_points, add_color, set_theme, PlotData};
//!
//! let table = PlotData::from_csv_reader(std::io::stdin()).unwrap();
//! let p = (table >> plot()) >> plot_points("x", "y") >> add_color("group") >> set_theme("minimal");
//! let html = p.unwrap().to_html().unwrap();
//! ```

use crate::artifact::{Artifact, Figure, Sink, StdSink};
use crate::config::{Aesthetic, PlotConfig, SmoothMethod};
use crate::data::{DataTable, PlotData};
use crate::dispatch;
use crate::error::Result;
use crate::verbs::{self, AesArg, Output, PaletteArg, PlotSeed, Step, Verb};
use crate::RenderOptions;
use log::debug;
use std::ops::Shr;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct Plot {
    table: Arc<dyn DataTable>,
    config: PlotConfig,
}

impl PartialEq for Plot {
    /// Same table instance and equal configuration.
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.table, &other.table) && self.config == other.config
    }
}

impl Plot {
    pub fn new(table: Arc<dyn DataTable>) -> Self {
        Plot {
            table,
            config: PlotConfig::new(),
        }
    }

    pub fn from_table<T: DataTable + 'static>(table: T) -> Self {
        Plot::new(Arc::new(table))
    }

    pub fn table(&self) -> &Arc<dyn DataTable> {
        &self.table
    }

    pub fn config(&self) -> &PlotConfig {
        &self.config
    }

    /// Apply one verb, returning a new wrapper over the same table.
    pub fn apply(&self, verb: &Verb) -> Result<Plot> {
        Ok(Plot {
            table: Arc::clone(&self.table),
            config: verb.apply(&self.config)?,
        })
    }

    // initialization

    pub fn plot_points(&self, x: &str, y: &str) -> Result<Plot> {
        self.apply(&verbs::plot_points(x, y))
    }

    pub fn plot_lines(&self, x: &str, y: &str) -> Result<Plot> {
        self.apply(&verbs::plot_lines(x, y))
    }

    pub fn plot_bars(&self, x: &str, y: Option<&str>) -> Result<Plot> {
        self.apply(&verbs::plot_bars(x, y))
    }

    pub fn plot_histogram(&self, x: &str, bins: Option<usize>) -> Result<Plot> {
        self.apply(&verbs::plot_histogram(x, bins))
    }

    pub fn plot_box(&self, x: Option<&str>, y: &str) -> Result<Plot> {
        self.apply(&verbs::plot_box(x, y))
    }

    pub fn plot_violin(&self, x: Option<&str>, y: &str) -> Result<Plot> {
        self.apply(&verbs::plot_violin(x, y))
    }

    pub fn plot_density(&self, x: &str) -> Result<Plot> {
        self.apply(&verbs::plot_density(x))
    }

    pub fn plot_heatmap(&self, x: &str, y: &str, value: &str) -> Result<Plot> {
        self.apply(&verbs::plot_heatmap(x, y, value))
    }

    pub fn plot_contour(&self, x: &str, y: &str, z: &str) -> Result<Plot> {
        self.apply(&verbs::plot_contour(x, y, z))
    }

    // aesthetics

    pub fn add_color(&self, arg: impl Into<AesArg>) -> Result<Plot> {
        self.apply(&verbs::add_color(arg))
    }

    pub fn add_color_with_palette(
        &self,
        arg: impl Into<AesArg>,
        palette: impl Into<PaletteArg>,
    ) -> Result<Plot> {
        self.apply(&verbs::add_color_with_palette(arg, palette))
    }

    pub fn add_fill(&self, arg: impl Into<AesArg>) -> Result<Plot> {
        self.apply(&verbs::add_fill(arg))
    }

    pub fn add_size(&self, arg: impl Into<AesArg>) -> Result<Plot> {
        self.apply(&verbs::add_size(arg))
    }

    pub fn add_shape(&self, arg: impl Into<AesArg>) -> Result<Plot> {
        self.apply(&verbs::add_shape(arg))
    }

    pub fn add_alpha(&self, arg: impl Into<AesArg>) -> Result<Plot> {
        self.apply(&verbs::add_alpha(arg))
    }

    pub fn add_smooth(&self, method: SmoothMethod, span: Option<f64>) -> Result<Plot> {
        self.apply(&verbs::add_smooth(method, span))
    }

    pub fn add_facets(
        &self,
        rows: Option<&str>,
        cols: Option<&str>,
        wrap: Option<&str>,
    ) -> Result<Plot> {
        self.apply(&verbs::add_facets(rows, cols, wrap))
    }

    pub fn add_labels(
        &self,
        title: Option<&str>,
        x: Option<&str>,
        y: Option<&str>,
    ) -> Result<Plot> {
        self.apply(&verbs::add_labels(title, x, y))
    }

    // transformations

    pub fn scale_x_log(&self) -> Result<Plot> {
        self.apply(&verbs::scale_x_log())
    }

    pub fn scale_y_log(&self) -> Result<Plot> {
        self.apply(&verbs::scale_y_log())
    }

    pub fn scale_x_reverse(&self) -> Result<Plot> {
        self.apply(&verbs::scale_x_reverse())
    }

    pub fn scale_y_reverse(&self) -> Result<Plot> {
        self.apply(&verbs::scale_y_reverse())
    }

    pub fn xlim(&self, min: f64, max: f64) -> Result<Plot> {
        self.apply(&verbs::xlim(min, max))
    }

    pub fn ylim(&self, min: f64, max: f64) -> Result<Plot> {
        self.apply(&verbs::ylim(min, max))
    }

    pub fn coord_flip(&self) -> Result<Plot> {
        self.apply(&verbs::coord_flip())
    }

    pub fn coord_fixed(&self, ratio: f64) -> Result<Plot> {
        self.apply(&verbs::coord_fixed(ratio))
    }

    // theme and backend

    pub fn set_theme(&self, name: &str) -> Result<Plot> {
        self.apply(&verbs::set_theme(name))
    }

    pub fn set_legend(&self, position: &str) -> Result<Plot> {
        self.apply(&verbs::set_legend(position))
    }

    pub fn set_palette(&self, palette: impl Into<PaletteArg>) -> Result<Plot> {
        self.apply(&verbs::set_palette(palette))
    }

    pub fn to_interactive(&self) -> Result<Plot> {
        self.apply(&verbs::to_interactive())
    }

    pub fn to_static(&self) -> Result<Plot> {
        self.apply(&verbs::to_static())
    }

    // output

    /// Validate and build the backend's artifact.
    pub fn render(&self) -> Result<Artifact> {
        dispatch::render(&self.table, &self.config)
    }

    /// Display on stdout with default options.
    pub fn show(&self) -> Result<Plot> {
        self.show_with(&RenderOptions::default(), &mut StdSink)
    }

    pub fn show_with(&self, options: &RenderOptions, sink: &mut dyn Sink) -> Result<Plot> {
        self.render()?.display(options, sink)?;
        Ok(self.clone())
    }

    /// Write to `path`; the extension picks the encoding.
    pub fn save(&self, path: impl AsRef<Path>, options: &RenderOptions) -> Result<Plot> {
        self.save_with(path, options, &mut StdSink)
    }

    pub fn save_with(
        &self,
        path: impl AsRef<Path>,
        options: &RenderOptions,
        sink: &mut dyn Sink,
    ) -> Result<Plot> {
        self.render()?.save(path.as_ref(), options, sink)?;
        Ok(self.clone())
    }

    pub fn to_html(&self) -> Result<String> {
        self.to_html_with(&RenderOptions::default())
    }

    pub fn to_html_with(&self, options: &RenderOptions) -> Result<String> {
        self.render()?.to_html(options)
    }

    /// Execute one output step against `sink`.
    pub fn output(&self, output: &Output, options: &RenderOptions, sink: &mut dyn Sink) -> Result<Plot> {
        match output {
            Output::Show => self.show_with(options, sink),
            Output::Save {
                path,
                width,
                height,
                dpi,
            } => self.save_with(path, &options.with_overrides(*width, *height, *dpi), sink),
            Output::Html { path } => {
                let html = crate::artifact::Rendered::Html(self.to_html_with(options)?);
                match path {
                    Some(p) => sink.write(&html, p)?,
                    None => sink.display(&html)?,
                }
                Ok(self.clone())
            }
        }
    }

    /// Run a parsed pipeline. Returns the final wrapper and whether any output step ran.
    pub fn run(&self, steps: &[Step], options: &RenderOptions, sink: &mut dyn Sink) -> Result<(Plot, bool)> {
        let mut current = self.clone();
        let mut produced = false;
        for step in steps {
            current = match step {
                Step::Verb(verb) => current.apply(verb)?,
                Step::Output(output) => {
                    debug!("running output step {:?}", output);
                    produced = true;
                    current.output(output, options, sink)?
                }
            };
        }
        Ok((current, produced))
    }

    /// Column mapped to `aesthetic`, if any.
    pub fn column(&self, aesthetic: Aesthetic) -> Option<&str> {
        self.config.column(aesthetic)
    }
}

/// Apply `verbs` left to right, stopping at the first error.
pub fn pipe<I>(plot: Plot, verbs: I) -> Result<Plot>
where
    I: IntoIterator<Item = Verb>,
{
    verbs
        .into_iter()
        .try_fold(plot, |current, verb| current.apply(&verb))
}

impl Shr<PlotSeed> for Arc<dyn DataTable> {
    type Output = Plot;

    fn shr(self, _seed: PlotSeed) -> Plot {
        Plot::new(self)
    }
}

impl Shr<PlotSeed> for PlotData {
    type Output = Plot;

    fn shr(self, _seed: PlotSeed) -> Plot {
        Plot::from_table(self)
    }
}

impl Shr<Verb> for Plot {
    type Output = Result<Plot>;

    fn shr(self, verb: Verb) -> Result<Plot> {
        self.apply(&verb)
    }
}

impl Shr<Verb> for &Plot {
    type Output = Result<Plot>;

    fn shr(self, verb: Verb) -> Result<Plot> {
        self.apply(&verb)
    }
}

impl Shr<Verb> for Result<Plot> {
    type Output = Result<Plot>;

    fn shr(self, verb: Verb) -> Result<Plot> {
        self?.apply(&verb)
    }
}

impl Shr<Output> for Plot {
    type Output = Result<Plot>;

    fn shr(self, output: Output) -> Result<Plot> {
        self.output(&output, &RenderOptions::default(), &mut StdSink)
    }
}

impl Shr<Output> for &Plot {
    type Output = Result<Plot>;

    fn shr(self, output: Output) -> Result<Plot> {
        self.output(&output, &RenderOptions::default(), &mut StdSink)
    }
}

impl Shr<Output> for Result<Plot> {
    type Output = Result<Plot>;

    fn shr(self, output: Output) -> Result<Plot> {
        self?.output(&output, &RenderOptions::default(), &mut StdSink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::{MemorySink, Rendered};
    use crate::config::{AestheticValue, Backend, Geometry};
    use crate::error::PlotError;
    use crate::verbs::*;

    fn base() -> Plot {
        PlotData::from_columns([
            ("x", vec!["1", "2", "3"]),
            ("y", vec!["2", "4", "3"]),
            ("g", vec!["a", "b", "a"]),
        ]) >> plot()
    }

    #[test]
    fn test_plot_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Plot>();
    }

    #[test]
    fn test_method_and_operator_agree() {
        let p = base();
        let by_method = p.plot_points("x", "y").unwrap().add_color("g").unwrap();
        let by_operator = (&p >> plot_points("x", "y")) >> add_color("g");
        assert_eq!(by_method, by_operator.unwrap());
    }

    #[test]
    fn test_pipe_matches_chain() {
        let p = base();
        let piped = pipe(p.clone(), vec![plot_points("x", "y"), set_theme("dark")]).unwrap();
        let chained = p.plot_points("x", "y").unwrap().set_theme("dark").unwrap();
        assert_eq!(piped, chained);
    }

    #[test]
    fn test_error_short_circuits() {
        let result = base() >> plot_points("x", "y") >> set_theme("neon") >> add_color("g");
        assert!(matches!(result, Err(PlotError::UnknownTheme { .. })));
    }

    #[test]
    fn test_receiver_unchanged() {
        let p = base().plot_points("x", "y").unwrap();
        let before = p.config().clone();
        let _ = p.add_color("g").unwrap();
        assert_eq!(p.config(), &before);
        assert_eq!(p.column(Aesthetic::Color), None);
    }

    #[test]
    fn test_run_steps_to_sink() {
        let steps = vec![
            Step::Verb(plot_points("x", "y")),
            Step::Verb(to_interactive()),
            Step::Output(Output::Html { path: None }),
            Step::Output(Output::Save {
                path: "fig.json".into(),
                width: Some(300),
                height: None,
                dpi: None,
            }),
        ];
        let mut sink = MemorySink::default();
        let (p, produced) = base()
            .run(&steps, &RenderOptions::default(), &mut sink)
            .unwrap();
        assert!(produced);
        assert_eq!(p.config().backend, Backend::Interactive);
        assert!(matches!(&sink.displayed[0], Rendered::Html(h) if h.contains("Plotly.newPlot")));
        assert!(matches!(&sink.written[0].1, Rendered::Json(j) if j.contains("\"width\": 300")));
    }

    #[test]
    fn test_show_static_png() {
        let mut sink = MemorySink::default();
        base()
            .plot_points("x", "y")
            .unwrap()
            .show_with(&RenderOptions::default().with_overrides(Some(200), Some(150), None), &mut sink)
            .unwrap();
        assert!(matches!(&sink.displayed[0], Rendered::Png(b) if b.starts_with(b"\x89PNG")));
    }

    #[test]
    fn test_output_step_on_borrowed_plot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("points.svg");
        let p = base().plot_points("x", "y").unwrap();
        let saved = (&p >> save(&path)).unwrap();
        assert_eq!(saved, p);
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("<svg"));

        let again = (&p >> add_color("g") >> save(dir.path().join("groups.svg"))).unwrap();
        assert_eq!(again.column(Aesthetic::Color), Some("g"));
    }

    #[test]
    fn test_static_to_html_fails() {
        let err = base().plot_points("x", "y").unwrap().to_html().unwrap_err();
        assert!(matches!(err, PlotError::HtmlExportNotSupported { .. }));
    }

    #[test]
    fn test_literal_aesthetic() {
        let p = base()
            .plot_points("x", "y")
            .unwrap()
            .add_size(lit(3.0))
            .unwrap();
        assert_eq!(p.config().geometry, Some(Geometry::Scatter));
        assert!(matches!(
            p.config().mapping(Aesthetic::Size),
            Some(AestheticValue::Literal(_))
        ));
    }
}
