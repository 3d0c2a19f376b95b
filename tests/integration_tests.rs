use pipeplot::*;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::thread;

fn data_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/data/penguins.csv")
}

fn penguins() -> PlotData {
    let file = fs::File::open(data_path()).expect("Failed to open test CSV");
    PlotData::from_csv_reader(file).expect("Failed to parse test CSV")
}

fn scatter() -> Plot {
    (penguins() >> plot() >> plot_points("bill_length", "bill_depth")).unwrap()
}

/// Run the pipeplot binary with the given args and stdin
fn run_pipeplot(args: &[&str], stdin: &str) -> std::result::Result<Vec<u8>, String> {
    let mut child = Command::new(env!("CARGO_BIN_EXE_pipeplot"))
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| format!("Failed to spawn process: {}", e))?;

    if let Some(mut input) = child.stdin.take() {
        input
            .write_all(stdin.as_bytes())
            .map_err(|e| format!("Failed to write to stdin: {}", e))?;
    }

    let output = child
        .wait_with_output()
        .map_err(|e| format!("Failed to wait for process: {}", e))?;

    if output.status.success() {
        Ok(output.stdout)
    } else {
        Err(String::from_utf8_lossy(&output.stderr).to_string())
    }
}

/// Check if bytes are a valid PNG
fn is_valid_png(bytes: &[u8]) -> bool {
    bytes.len() > 8 && bytes[0..8] == [137, 80, 78, 71, 13, 10, 26, 10]
}

#[test]
fn test_verbs_leave_input_unchanged() {
    let base = scatter();
    let before = base.config().clone();
    let _ = base.add_color("species").unwrap();
    let _ = base.set_theme("dark").unwrap();
    let _ = base.to_interactive().unwrap();
    assert_eq!(base.config(), &before);
}

#[test]
fn test_chain_forms_are_equivalent() {
    let by_operator = penguins() >> plot() >> plot_points("bill_length", "bill_depth")
        >> add_color("species")
        >> scale_y_log();
    let by_operator = by_operator.unwrap();

    let by_method = Plot::new(Arc::clone(by_operator.table()))
        .plot_points("bill_length", "bill_depth")
        .unwrap()
        .add_color("species")
        .unwrap()
        .scale_y_log()
        .unwrap();

    let by_pipe = pipe(
        Plot::new(Arc::clone(by_operator.table())),
        vec![
            plot_points("bill_length", "bill_depth"),
            add_color("species"),
            scale_y_log(),
        ],
    )
    .unwrap();

    assert_eq!(by_operator, by_method);
    assert_eq!(by_operator, by_pipe);
}

#[test]
fn test_branches_are_independent() {
    let shared = scatter();
    let before = shared.config().clone();

    let a = {
        let shared = shared.clone();
        thread::spawn(move || shared.add_color("species").unwrap().set_theme("minimal").unwrap())
    };
    let b = {
        let shared = shared.clone();
        thread::spawn(move || shared.add_color("island").unwrap().to_interactive().unwrap())
    };
    let (a, b) = (a.join().unwrap(), b.join().unwrap());

    assert_eq!(a.column(Aesthetic::Color), Some("species"));
    assert_eq!(b.column(Aesthetic::Color), Some("island"));
    assert_eq!(a.config().backend, Backend::Static);
    assert_eq!(b.config().backend, Backend::Interactive);
    assert_eq!(shared.config(), &before);
}

#[test]
fn test_backend_switch_is_idempotent() {
    let p = scatter();
    assert_eq!(p.to_static().unwrap(), p);
    let i = p.to_interactive().unwrap();
    assert_eq!(i.to_interactive().unwrap(), i);
}

#[test]
fn test_last_write_wins() {
    let p = scatter()
        .add_color("species")
        .unwrap()
        .add_color("island")
        .unwrap()
        .set_theme("dark")
        .unwrap()
        .set_theme("bw")
        .unwrap();
    assert_eq!(p.column(Aesthetic::Color), Some("island"));
    assert_eq!(p.config().theme, ThemeName::BlackAndWhite);
}

#[test]
fn test_second_geometry_conflicts() {
    let err = (scatter() >> plot_lines("bill_length", "bill_depth")).unwrap_err();
    assert!(matches!(err, PlotError::ConflictingGeometry { .. }));
}

#[test]
fn test_heatmap_with_two_mappings_fails_at_render() {
    let verb = Verb::Init {
        geometry: Geometry::Heatmap,
        mappings: vec![
            (Aesthetic::X, "species".to_string()),
            (Aesthetic::Y, "island".to_string()),
        ],
        bins: None,
    };
    // building the chain succeeds; validation happens at render
    let p = (penguins() >> plot() >> verb).unwrap();
    for p in [p.clone(), p.to_interactive().unwrap()] {
        let err = p.render().unwrap_err();
        assert!(matches!(
            err,
            PlotError::MissingRequiredMapping { ref geometry, ref aesthetic }
                if geometry == "heatmap" && aesthetic == "color"
        ));
    }
}

#[test]
fn test_unknown_column_is_reported() {
    let err = (penguins() >> plot() >> plot_points("bill_length", "flipper"))
        .unwrap()
        .render()
        .unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("flipper"));
    assert!(msg.contains("bill_depth"));
}

#[test]
fn test_scatter_on_both_backends() {
    let p = scatter()
        .add_color("species")
        .unwrap()
        .add_labels(Some("Bills"), Some("Length (mm)"), None)
        .unwrap()
        .set_theme("minimal")
        .unwrap();

    let s = p.render().unwrap();
    let i = p.to_interactive().unwrap().render().unwrap();
    assert_eq!(s.backend(), Backend::Static);
    assert_eq!(i.backend(), Backend::Interactive);
    assert!(s.summary().same_content(&i.summary()));
    assert!(s.supports(Capability::File));
    assert!(!s.supports(Capability::Html));
    assert!(i.supports(Capability::Html));

    let summary = i.summary();
    assert_eq!(summary.geometry, Geometry::Scatter);
    assert_eq!(summary.labels.title.as_deref(), Some("Bills"));
    assert_eq!(summary.theme, ThemeName::Minimal);
}

#[test]
fn test_text_x_column_on_both_backends() {
    for p in [
        (penguins() >> plot() >> plot_points("island", "body_mass")).unwrap(),
        (penguins() >> plot() >> plot_lines("island", "body_mass") >> add_color("species")).unwrap(),
    ] {
        let options = RenderOptions::default().with_overrides(Some(300), Some(200), None);
        let mut sink = MemorySink::default();
        p.show_with(&options, &mut sink).unwrap();
        assert!(matches!(&sink.displayed[0], Rendered::Png(b) if is_valid_png(b)));

        let html = p.to_interactive().unwrap().to_html().unwrap();
        assert!(html.contains("\"Torgersen\""));
    }
}

#[test]
fn test_static_save_png_and_svg() {
    let dir = tempfile::tempdir().unwrap();
    let png = dir.path().join("bills.png");
    let svg = dir.path().join("bills.svg");
    let options = RenderOptions::default().with_overrides(Some(400), Some(300), None);

    let p = scatter().add_color("species").unwrap();
    let returned = p.save(&png, &options).unwrap().save(&svg, &options).unwrap();
    assert_eq!(returned, p);

    assert!(is_valid_png(&fs::read(&png).unwrap()));
    assert!(fs::read_to_string(&svg).unwrap().contains("<svg"));

    let err = p.save(dir.path().join("bills.html"), &options).unwrap_err();
    assert!(matches!(err, PlotError::UnsupportedOutputFormat { .. }));
}

#[test]
fn test_interactive_save_html_and_json() {
    let dir = tempfile::tempdir().unwrap();
    let html = dir.path().join("bills.html");
    let json = dir.path().join("bills.json");
    let p = scatter().add_color("species").unwrap().to_interactive().unwrap();

    p.save(&html, &RenderOptions::default()).unwrap();
    p.save(&json, &RenderOptions::default()).unwrap();

    let page = fs::read_to_string(&html).unwrap();
    assert!(page.starts_with("<!DOCTYPE html>"));
    assert!(page.contains("Plotly.newPlot"));

    let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(&json).unwrap()).unwrap();
    // one trace per species
    assert_eq!(value["data"].as_array().map(Vec::len), Some(3));
    assert_eq!(value["layout"]["meta"]["geometry"], "scatter");
}

#[test]
fn test_html_fragment_embeds_figure() {
    let html = scatter().to_interactive().unwrap().to_html().unwrap();
    assert!(html.starts_with("<div id=\"pipeplot-"));
    assert!(html.contains("\"type\":\"scatter\""));
    assert!(html.contains("\"mode\":\"markers\""));

    let err = scatter().to_html().unwrap_err();
    assert!(matches!(err, PlotError::HtmlExportNotSupported { .. }));
}

#[test]
fn test_contour_needs_interactive() {
    let p = (penguins() >> plot() >> plot_contour("bill_length", "bill_depth", "body_mass")).unwrap();
    assert!(matches!(
        p.render().unwrap_err(),
        PlotError::UnsupportedGeometryForBackend { .. }
    ));
    assert!(p.to_interactive().unwrap().render().is_ok());
}

#[test]
fn test_every_static_geometry_renders() {
    let chains = vec![
        vec![plot_points("bill_length", "bill_depth"), add_smooth(SmoothMethod::Linear, None)],
        vec![plot_lines("year", "body_mass"), add_color("species")],
        vec![plot_bars("species", None)],
        vec![plot_bars("island", Some("body_mass")), add_fill("species")],
        vec![plot_histogram("body_mass", Some(5)), add_color("species")],
        vec![plot_box(Some("species"), "body_mass"), coord_flip()],
        vec![plot_violin(Some("species"), "bill_length")],
        vec![plot_density("bill_length"), add_facets(None, None, Some("species"))],
        vec![plot_heatmap("species", "island", "body_mass"), set_palette("viridis")],
    ];
    let options = RenderOptions::default().with_overrides(Some(320), Some(240), None);
    for verbs in chains {
        let p = pipe(penguins() >> plot(), verbs.clone()).unwrap();
        for p in [p.clone(), p.to_interactive().unwrap()] {
            let mut sink = MemorySink::default();
            p.show_with(&options, &mut sink)
                .unwrap_or_else(|e| panic!("{:?} failed: {}", verbs, e));
            assert_eq!(sink.displayed.len(), 1);
        }
    }
}

#[test]
fn test_log_scale_rejects_non_positive() {
    let table = PlotData::from_columns([("x", vec!["1", "2", "3"]), ("y", vec!["0", "1", "2"])]);
    let p = (table >> plot() >> plot_points("x", "y") >> scale_y_log()).unwrap();
    assert!(matches!(p.render().unwrap_err(), PlotError::ScaleDomain(_)));
    assert!(matches!(
        p.to_interactive().unwrap().render().unwrap_err(),
        PlotError::ScaleDomain(_)
    ));
}

#[test]
fn test_dsl_pipeline_runs() {
    let steps = parser::parse_pipeline(
        r#"plot_points(x: bill_length, y: bill_depth) | add_color(species) | add_size(value: 3)
           | set_theme("minimal") | labs(title: "Bills") | to_interactive() | to_html()"#,
    )
    .unwrap();
    let mut sink = MemorySink::default();
    let (p, produced) = (penguins() >> plot())
        .run(&steps, &RenderOptions::default(), &mut sink)
        .unwrap();
    assert!(produced);
    assert_eq!(p.config().labels.title.as_deref(), Some("Bills"));
    assert!(matches!(&sink.displayed[0], Rendered::Html(h) if h.contains("\"text\":\"Bills\"")));
}

#[test]
fn test_cli_png_from_stdin() {
    let csv = fs::read_to_string(data_path()).unwrap();
    let result = run_pipeplot(
        &["plot_points(x: bill_length, y: bill_depth) | add_color(species)", "--width", "300", "--height", "200"],
        &csv,
    );
    assert!(result.is_ok(), "Failed: {:?}", result.err());
    assert!(is_valid_png(&result.unwrap()));
}

#[test]
fn test_cli_svg_format() {
    let csv = fs::read_to_string(data_path()).unwrap();
    let out = run_pipeplot(&["plot_density(bill_length)", "--format", "svg"], &csv).unwrap();
    assert!(String::from_utf8_lossy(&out).contains("<svg"));
}

#[test]
fn test_cli_interactive_with_input_and_vars() {
    let input = data_path();
    let out = run_pipeplot(
        &[
            "plot_box($group, body_mass) | to_interactive()",
            "--input",
            input.to_str().unwrap(),
            "--var",
            "group=species",
        ],
        "",
    )
    .unwrap();
    let html = String::from_utf8(out).unwrap();
    assert!(html.contains("Plotly.newPlot"));
    assert!(html.contains("\"type\":\"box\""));
}

#[test]
fn test_cli_save_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("hist.png");
    let dsl = format!("plot_histogram(body_mass, bins: 6) | save(\"{}\", dpi: 50)", path.display());
    let csv = fs::read_to_string(data_path()).unwrap();
    let out = run_pipeplot(&[&dsl], &csv).unwrap();
    assert!(out.is_empty());
    assert!(is_valid_png(&fs::read(&path).unwrap()));
}

#[test]
fn test_cli_reports_errors() {
    let csv = fs::read_to_string(data_path()).unwrap();
    let err = run_pipeplot(&["plot_pie(species)"], &csv).unwrap_err();
    assert!(err.contains("unknown verb 'plot_pie'"), "stderr: {}", err);

    let err = run_pipeplot(&["plot_points(species, nope)"], &csv).unwrap_err();
    assert!(err.contains("column 'nope' not found"), "stderr: {}", err);

    let err = run_pipeplot(&["plot_density($missing)"], &csv).unwrap_err();
    assert!(err.contains("$missing"), "stderr: {}", err);
}
