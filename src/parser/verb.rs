// Binds parsed calls to verbs and output steps

use super::ast::{Arg, ArgValue, Call};
use crate::config::{Aesthetic, Axis, Backend, Facets, Geometry, Labels, Literal, SmoothMethod};
use crate::error::{PlotError, Result};
use crate::verbs::{self, AesArg, Output, PaletteArg, Step, Verb};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Arguments of one call, matched against its parameter names.
struct Bound<'a> {
    verb: &'a str,
    values: BTreeMap<&'static str, &'a ArgValue>,
}

impl<'a> Bound<'a> {
    /// Positional arguments fill `params` in order; named ones must be listed in `params`.
    fn new(call: &'a Call, params: &[&'static str]) -> Result<Self> {
        Self::with_positional(call, params, params.len())
    }

    /// Like [`Bound::new`], but only the first `positional` params may be given by position.
    fn with_positional(call: &'a Call, params: &[&'static str], positional: usize) -> Result<Self> {
        let mut values = BTreeMap::new();
        let mut next = 0;
        for Arg { name, value } in &call.args {
            let param = match name {
                Some(n) => *params.iter().find(|p| **p == n.as_str()).ok_or_else(|| {
                    PlotError::Parse(format!(
                        "{}() has no parameter '{}' (expected: {})",
                        call.name,
                        n,
                        params.join(", ")
                    ))
                })?,
                None => {
                    // skip parameters already given by name
                    while next < positional && values.contains_key(params[next]) {
                        next += 1;
                    }
                    let p = *params.iter().take(positional).nth(next).ok_or_else(|| {
                        PlotError::Parse(format!(
                            "{}() takes at most {} positional argument(s)",
                            call.name, positional
                        ))
                    })?;
                    next += 1;
                    p
                }
            };
            if values.insert(param, value).is_some() {
                return Err(PlotError::Parse(format!(
                    "{}() got '{}' more than once",
                    call.name, param
                )));
            }
        }
        Ok(Bound {
            verb: &call.name,
            values,
        })
    }

    fn get(&self, param: &str) -> Option<&'a ArgValue> {
        self.values.get(param).copied()
    }

    fn invalid(&self, param: &str, expected: &str, got: &ArgValue) -> PlotError {
        PlotError::Parse(format!(
            "{}(): '{}' must be {}, got a {}",
            self.verb,
            param,
            expected,
            got.kind()
        ))
    }

    fn required<T>(&self, param: &str, value: Option<T>) -> Result<T> {
        value.ok_or_else(|| PlotError::Parse(format!("{}() needs '{}'", self.verb, param)))
    }

    /// Column name: identifier or quoted string.
    fn column(&self, param: &str) -> Result<Option<String>> {
        match self.get(param) {
            None => Ok(None),
            Some(ArgValue::Ident(s)) | Some(ArgValue::Str(s)) => Ok(Some(s.clone())),
            Some(other) => Err(self.invalid(param, "a column name", other)),
        }
    }

    fn text(&self, param: &str) -> Result<Option<String>> {
        match self.get(param) {
            None => Ok(None),
            Some(ArgValue::Str(s)) | Some(ArgValue::Ident(s)) => Ok(Some(s.clone())),
            Some(ArgValue::Number(n)) => Ok(Some(n.to_string())),
            Some(other) => Err(self.invalid(param, "text", other)),
        }
    }

    fn number(&self, param: &str) -> Result<Option<f64>> {
        match self.get(param) {
            None => Ok(None),
            Some(ArgValue::Number(n)) => Ok(Some(*n)),
            Some(other) => Err(self.invalid(param, "a number", other)),
        }
    }

    fn count(&self, param: &str) -> Result<Option<u32>> {
        match self.number(param)? {
            None => Ok(None),
            Some(n) if n >= 0.0 && n.fract() == 0.0 && n <= u32::MAX as f64 => Ok(Some(n as u32)),
            Some(n) => Err(PlotError::Parse(format!(
                "{}(): '{}' must be a whole number, got {}",
                self.verb, param, n
            ))),
        }
    }

    fn literal(&self, param: &str) -> Result<Option<Literal>> {
        match self.get(param) {
            None => Ok(None),
            Some(ArgValue::Str(s)) | Some(ArgValue::Ident(s)) => Ok(Some(Literal::Text(s.clone()))),
            Some(ArgValue::Number(n)) => Ok(Some(Literal::Number(*n))),
            Some(ArgValue::Bool(b)) => Ok(Some(Literal::Bool(*b))),
            Some(other) => Err(self.invalid(param, "a fixed value", other)),
        }
    }

    fn palette(&self, param: &str) -> Result<Option<PaletteArg>> {
        match self.get(param) {
            None => Ok(None),
            Some(ArgValue::Str(s)) | Some(ArgValue::Ident(s)) => Ok(Some(PaletteArg::Named(s.clone()))),
            Some(ArgValue::List(items)) => {
                let colors = items
                    .iter()
                    .map(|v| match v {
                        ArgValue::Str(s) | ArgValue::Ident(s) => Ok(s.clone()),
                        other => Err(self.invalid(param, "a list of colours", other)),
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(Some(PaletteArg::Custom(colors)))
            }
            Some(other) => Err(self.invalid(param, "a palette name or list of colours", other)),
        }
    }
}

fn init(call: &Call, geometry: Geometry, params: &[(&'static str, Aesthetic, bool)]) -> Result<Verb> {
    let names: Vec<&'static str> = params.iter().map(|(n, _, _)| *n).collect();
    let bound = Bound::new(call, &names)?;
    let mut mappings = Vec::new();
    for (name, aesthetic, required) in params {
        match bound.column(name)? {
            Some(column) => mappings.push((*aesthetic, column)),
            None if *required => return Err(PlotError::Parse(format!("{}() needs '{}'", call.name, name))),
            None => {}
        }
    }
    Ok(Verb::Init {
        geometry,
        mappings,
        bins: None,
    })
}

/// `plot_box(y)` reads its single positional argument as `y`.
fn init_distribution(call: &Call, geometry: Geometry) -> Result<Verb> {
    let positional = call.args.iter().filter(|a| a.name.is_none()).count();
    if positional == 1 && call.args.len() == 1 {
        init(call, geometry, &[("y", Aesthetic::Y, true)])
    } else {
        init(
            call,
            geometry,
            &[("x", Aesthetic::X, false), ("y", Aesthetic::Y, true)],
        )
    }
}

fn aesthetic(call: &Call, aesthetic: Aesthetic) -> Result<Verb> {
    // column, value and palette are keyword-only
    let bound = Bound::with_positional(call, &["arg", "column", "value", "palette"], 1)?;
    let (mut column, mut value) = (bound.column("column")?, bound.literal("value")?);
    // bare identifier is a column; anything else is a fixed value
    match bound.get("arg") {
        Some(ArgValue::Ident(c)) if column.is_none() => column = Some(c.clone()),
        Some(_) if value.is_none() => value = bound.literal("arg")?,
        Some(_) => {
            return Err(PlotError::AmbiguousAesthetic {
                aesthetic: aesthetic.to_string(),
            })
        }
        None => {}
    }
    Ok(Verb::Aesthetic {
        aesthetic,
        arg: AesArg::new(column, value),
        palette: bound.palette("palette")?,
    })
}

fn limits(call: &Call, axis: Axis) -> Result<Verb> {
    let bound = Bound::new(call, &["min", "max"])?;
    Ok(Verb::Limits {
        axis,
        min: bound.required("min", bound.number("min")?)?,
        max: bound.required("max", bound.number("max")?)?,
    })
}

fn no_args(call: &Call, verb: Verb) -> Result<Verb> {
    Bound::new(call, &[])?;
    Ok(verb)
}

/// Translate one parsed call into a pipeline step.
pub fn bind_call(call: &Call) -> Result<Step> {
    let verb = match call.name.as_str() {
        "plot_points" => init(
            call,
            Geometry::Scatter,
            &[("x", Aesthetic::X, true), ("y", Aesthetic::Y, true)],
        )?,
        "plot_lines" => init(
            call,
            Geometry::Line,
            &[("x", Aesthetic::X, true), ("y", Aesthetic::Y, true)],
        )?,
        "plot_bars" => init(
            call,
            Geometry::Bar,
            &[("x", Aesthetic::X, true), ("y", Aesthetic::Y, false)],
        )?,
        "plot_histogram" => {
            let bound = Bound::new(call, &["x", "bins"])?;
            let x = bound.required("x", bound.column("x")?)?;
            Verb::Init {
                geometry: Geometry::Histogram,
                mappings: vec![(Aesthetic::X, x)],
                bins: bound.count("bins")?.map(|b| b as usize),
            }
        }
        "plot_box" => init_distribution(call, Geometry::Box)?,
        "plot_violin" => init_distribution(call, Geometry::Violin)?,
        "plot_density" => init(call, Geometry::Density, &[("x", Aesthetic::X, true)])?,
        "plot_heatmap" => init(
            call,
            Geometry::Heatmap,
            &[
                ("x", Aesthetic::X, true),
                ("y", Aesthetic::Y, true),
                ("value", Aesthetic::Color, true),
            ],
        )?,
        "plot_contour" => init(
            call,
            Geometry::Contour,
            &[
                ("x", Aesthetic::X, true),
                ("y", Aesthetic::Y, true),
                ("z", Aesthetic::Z, true),
            ],
        )?,
        "add_color" | "add_colour" => aesthetic(call, Aesthetic::Color)?,
        "add_fill" => aesthetic(call, Aesthetic::Fill)?,
        "add_size" => aesthetic(call, Aesthetic::Size)?,
        "add_shape" => aesthetic(call, Aesthetic::Shape)?,
        "add_alpha" => aesthetic(call, Aesthetic::Alpha)?,
        "add_smooth" => {
            let bound = Bound::new(call, &["method", "span"])?;
            let method = match bound.text("method")? {
                Some(m) => m.parse::<SmoothMethod>()?,
                None => SmoothMethod::default(),
            };
            Verb::Smooth {
                method,
                span: bound.number("span")?,
            }
        }
        "add_facets" => {
            let bound = Bound::new(call, &["rows", "cols", "wrap"])?;
            Verb::Facets(Facets {
                rows: bound.column("rows")?,
                cols: bound.column("cols")?,
                wrap: bound.column("wrap")?,
            })
        }
        "facet_wrap" => {
            let bound = Bound::new(call, &["wrap"])?;
            Verb::Facets(Facets {
                wrap: Some(bound.required("wrap", bound.column("wrap")?)?),
                ..Facets::default()
            })
        }
        "add_labels" | "labs" => {
            let bound = Bound::new(call, &["title", "x", "y"])?;
            Verb::Labels(Labels {
                title: bound.text("title")?,
                x: bound.text("x")?,
                y: bound.text("y")?,
            })
        }
        "scale_x_log" => no_args(call, verbs::scale_x_log())?,
        "scale_y_log" => no_args(call, verbs::scale_y_log())?,
        "scale_x_reverse" => no_args(call, verbs::scale_x_reverse())?,
        "scale_y_reverse" => no_args(call, verbs::scale_y_reverse())?,
        "xlim" => limits(call, Axis::X)?,
        "ylim" => limits(call, Axis::Y)?,
        "coord_flip" => no_args(call, Verb::CoordFlip)?,
        "coord_fixed" => {
            let bound = Bound::new(call, &["ratio"])?;
            Verb::CoordFixed(bound.number("ratio")?.unwrap_or(1.0))
        }
        "set_theme" | "theme" => {
            let bound = Bound::new(call, &["name"])?;
            Verb::Theme(bound.required("name", bound.text("name")?)?)
        }
        "set_legend" => {
            let bound = Bound::new(call, &["position"])?;
            Verb::Legend(bound.required("position", bound.text("position")?)?)
        }
        "set_palette" => {
            let bound = Bound::new(call, &["palette"])?;
            Verb::Palette(bound.required("palette", bound.palette("palette")?)?)
        }
        "to_interactive" => no_args(call, Verb::Backend(Backend::Interactive))?,
        "to_static" => no_args(call, Verb::Backend(Backend::Static))?,
        "show" => {
            Bound::new(call, &[])?;
            return Ok(Step::Output(Output::Show));
        }
        "save" => {
            let bound = Bound::new(call, &["path", "width", "height", "dpi"])?;
            let path = bound.required("path", bound.text("path")?)?;
            return Ok(Step::Output(Output::Save {
                path: PathBuf::from(path),
                width: bound.count("width")?,
                height: bound.count("height")?,
                dpi: bound.count("dpi")?,
            }));
        }
        "to_html" => {
            let bound = Bound::new(call, &["path"])?;
            return Ok(Step::Output(Output::Html {
                path: bound.text("path")?.map(PathBuf::from),
            }));
        }
        other => return Err(PlotError::Parse(format!("unknown verb '{}'", other))),
    };
    Ok(Step::Verb(verb))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(name: &str, args: Vec<(Option<&str>, ArgValue)>) -> Call {
        Call {
            name: name.to_string(),
            args: args
                .into_iter()
                .map(|(n, value)| Arg {
                    name: n.map(str::to_string),
                    value,
                })
                .collect(),
        }
    }

    fn ident(s: &str) -> ArgValue {
        ArgValue::Ident(s.to_string())
    }

    #[test]
    fn test_positional_and_named() {
        let step = bind_call(&call(
            "plot_points",
            vec![(Some("y"), ident("w")), (None, ident("h"))],
        ))
        .unwrap();
        assert_eq!(step, Step::Verb(verbs::plot_points("h", "w")));
    }

    #[test]
    fn test_box_single_argument_is_y() {
        let step = bind_call(&call("plot_box", vec![(None, ident("v"))])).unwrap();
        assert_eq!(step, Step::Verb(verbs::plot_box(None, "v")));
    }

    #[test]
    fn test_aesthetic_literal_and_column() {
        let step = bind_call(&call("add_size", vec![(Some("value"), ArgValue::Number(3.0))])).unwrap();
        assert_eq!(step, Step::Verb(verbs::add_size(verbs::lit(3.0))));
        let step = bind_call(&call("add_color", vec![(None, ident("species"))])).unwrap();
        assert_eq!(step, Step::Verb(verbs::add_color("species")));
    }

    #[test]
    fn test_aesthetic_extra_positional_rejected() {
        let err = bind_call(&call(
            "add_color",
            vec![(None, ident("species")), (None, ArgValue::Str("viridis".into()))],
        ))
        .unwrap_err();
        assert!(matches!(err, PlotError::Parse(_)));
        assert!(err.to_string().contains("at most 1 positional"));

        let step = bind_call(&call(
            "add_color",
            vec![(None, ident("species")), (Some("palette"), ArgValue::Str("viridis".into()))],
        ))
        .unwrap();
        assert!(matches!(step, Step::Verb(Verb::Aesthetic { palette: Some(_), .. })));
    }

    #[test]
    fn test_aesthetic_column_and_value_is_ambiguous() {
        let step = bind_call(&call(
            "add_color",
            vec![(Some("column"), ident("a")), (Some("value"), ArgValue::Str("red".into()))],
        ))
        .unwrap();
        let Step::Verb(verb) = step else {
            panic!("expected a verb, got {:?}", step);
        };
        let err = verb.apply(&crate::config::PlotConfig::new()).unwrap_err();
        assert!(matches!(err, PlotError::AmbiguousAesthetic { .. }));
    }

    #[test]
    fn test_too_many_arguments() {
        let err = bind_call(&call("plot_density", vec![(None, ident("a")), (None, ident("b"))])).unwrap_err();
        assert!(matches!(err, PlotError::Parse(_)));
    }

    #[test]
    fn test_unknown_parameter() {
        let err = bind_call(&call("coord_flip", vec![(Some("angle"), ArgValue::Number(1.0))])).unwrap_err();
        assert!(err.to_string().contains("no parameter 'angle'"));
    }

    #[test]
    fn test_save_output() {
        let step = bind_call(&call(
            "save",
            vec![
                (None, ArgValue::Str("out.png".into())),
                (Some("dpi"), ArgValue::Number(200.0)),
            ],
        ))
        .unwrap();
        assert_eq!(
            step,
            Step::Output(Output::Save {
                path: PathBuf::from("out.png"),
                width: None,
                height: None,
                dpi: Some(200),
            })
        );
    }

    #[test]
    fn test_unknown_verb() {
        let err = bind_call(&call("plot_pie", vec![])).unwrap_err();
        assert_eq!(err.to_string(), "parse error: unknown verb 'plot_pie'");
    }
}
