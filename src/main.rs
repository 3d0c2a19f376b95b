use anyhow::{anyhow, Context, Result};
use clap::Parser;
use log::{LevelFilter, Log, Metadata, Record};
use pipeplot::parser::parse_pipeline;
use pipeplot::preprocessor::{expand_variables, parse_assignment};
use pipeplot::{plot, OutputFormat, PlotData, RenderOptions, StdSink};
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "pipeplot")]
#[command(about = "Plot CSV data with a pipeline of plotting verbs", long_about = None)]
struct Args {
    /// Verb pipeline (e.g., 'plot_points(x: time, y: temp) | add_color(site) | to_interactive()')
    dsl: String,

    /// CSV file to read instead of stdin
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Define a variable for $name expansion (e.g., --var col=temp)
    #[arg(long = "var", value_name = "NAME=VALUE")]
    vars: Vec<String>,

    /// Output width in pixels at 100 dpi
    #[arg(long)]
    width: Option<u32>,

    /// Output height in pixels at 100 dpi
    #[arg(long)]
    height: Option<u32>,

    #[arg(long)]
    dpi: Option<u32>,

    /// Encoding for static output shown on stdout (png or svg)
    #[arg(long)]
    format: Option<OutputFormat>,

    /// JSON file with render options ({"width": .., "height": .., "dpi": .., "type": ..})
    #[arg(long)]
    options: Option<PathBuf>,

    /// Log more (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Writes log records to stderr; the level is filtered by `log::max_level`.
struct StderrLogger;

static LOGGER: StderrLogger = StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let _ = writeln!(io::stderr(), "[{}] {}", record.level(), record.args());
        }
    }

    fn flush(&self) {
        let _ = io::stderr().flush();
    }
}

fn init_logger(verbose: u8) -> Result<()> {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    log::set_logger(&LOGGER).map_err(|e| anyhow!("Failed to install logger: {}", e))?;
    log::set_max_level(level);
    Ok(())
}

fn render_options(args: &Args) -> Result<RenderOptions> {
    let mut options = match &args.options {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read options file {}", path.display()))?;
            serde_json::from_str::<RenderOptions>(&text)
                .with_context(|| format!("Invalid options file {}", path.display()))?
        }
        None => RenderOptions::default(),
    };
    options = options.with_overrides(args.width, args.height, args.dpi);
    if let Some(format) = args.format {
        options.format = format;
    }
    Ok(options)
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logger(args.verbose)?;

    let variables = args
        .vars
        .iter()
        .map(|v| parse_assignment(v))
        .collect::<pipeplot::Result<HashMap<_, _>>>()
        .context("Invalid --var")?;
    let dsl = expand_variables(&args.dsl, &variables).context("Failed to expand variables")?;

    let steps = parse_pipeline(&dsl).context("Failed to parse pipeline")?;
    let options = render_options(&args)?;

    let table = match &args.input {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("Failed to open {}", path.display()))?;
            PlotData::from_csv_reader(BufReader::new(file))
        }
        None => PlotData::from_csv_reader(io::stdin().lock()),
    }
    .context("Failed to read CSV input")?;

    let mut sink = StdSink;
    let (chain, produced) = (table >> plot())
        .run(&steps, &options, &mut sink)
        .context("Failed to render plot")?;

    // Without an output step, show the result
    if !produced {
        chain
            .show_with(&options, &mut sink)
            .context("Failed to write plot to stdout")?;
    }

    Ok(())
}
