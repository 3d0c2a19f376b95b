// Pipeline parser for the verb DSL

use super::ast::{Arg, ArgValue, Call};
use super::lexer::{identifier, number_literal, string_literal, ws};
use super::verb::bind_call;
use crate::error::{PlotError, Result};
use crate::verbs::Step;
use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::char,
    combinator::{eof, map, opt},
    multi::{separated_list0, separated_list1},
    sequence::{delimited, terminated},
    Finish, IResult,
};

fn parse_value(input: &str) -> IResult<&str, ArgValue> {
    alt((
        map(
            delimited(
                ws(char('[')),
                terminated(separated_list0(ws(char(',')), parse_value), opt(ws(char(',')))),
                ws(char(']')),
            ),
            ArgValue::List,
        ),
        map(string_literal, ArgValue::Str),
        map(number_literal, ArgValue::Number),
        map(identifier, |s| match s.as_str() {
            "true" => ArgValue::Bool(true),
            "false" => ArgValue::Bool(false),
            _ => ArgValue::Ident(s),
        }),
    ))(input)
}

/// Parse one argument
/// Format: value or name: value
fn parse_arg(input: &str) -> IResult<&str, Arg> {
    let (input, name) = opt(terminated(ws(identifier), ws(char(':'))))(input)?;
    let (input, value) = ws(parse_value)(input)?;
    Ok((input, Arg { name, value }))
}

/// Parse one call
/// Format: name(arg, name: arg, ...)
pub fn parse_call(input: &str) -> IResult<&str, Call> {
    let (input, name) = ws(identifier)(input)?;
    let (input, _) = ws(char('('))(input)?;
    let (input, args) = separated_list0(ws(char(',')), parse_arg)(input)?;
    let (input, _) = opt(ws(char(',')))(input)?;
    let (input, _) = ws(char(')'))(input)?;
    Ok((input, Call { name, args }))
}

/// Parse calls separated by `|` (or `>>`) up to the end of input
pub fn parse_calls(input: &str) -> IResult<&str, Vec<Call>> {
    // Optional leading "|"
    let (input, _) = opt(ws(tag("|")))(input)?;
    let (input, calls) = separated_list1(ws(alt((tag("|"), tag(">>")))), parse_call)(input)?;
    let (input, _) = ws(eof)(input)?;
    Ok((input, calls))
}

/// Parse a complete pipeline into bound verbs and output steps.
pub fn parse_pipeline(input: &str) -> Result<Vec<Step>> {
    let (_, calls) = parse_calls(input).finish().map_err(|e| {
        let rest: String = e.input.chars().take(30).collect();
        if rest.trim().is_empty() {
            PlotError::Parse("unexpected end of input".to_string())
        } else {
            PlotError::Parse(format!("unexpected input at '{}'", rest.trim_end()))
        }
    })?;
    calls.iter().map(bind_call).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verbs::*;
    use std::path::PathBuf;

    #[test]
    fn test_parse_call_mixed_args() {
        let (rest, call) = parse_call(r##"add_color(species, palette: ["red", "#00ff00"],)"##).unwrap();
        assert_eq!(rest, "");
        assert_eq!(call.name, "add_color");
        assert_eq!(call.args.len(), 2);
        assert_eq!(
            call.args[1].value,
            ArgValue::List(vec![ArgValue::Str("red".into()), ArgValue::Str("#00ff00".into())])
        );
    }

    #[test]
    fn test_parse_full_pipeline() {
        let steps = parse_pipeline(
            r#"plot_points(x: height, y: weight) | add_color(species) | add_size(value: 3)
               | set_theme("minimal") | labs(title: "Heights") | to_interactive() | save("out.html")"#,
        )
        .unwrap();
        assert_eq!(
            steps,
            vec![
                Step::Verb(plot_points("height", "weight")),
                Step::Verb(add_color("species")),
                Step::Verb(add_size(lit(3.0))),
                Step::Verb(set_theme("minimal")),
                Step::Verb(add_labels(Some("Heights"), None, None)),
                Step::Verb(to_interactive()),
                Step::Output(Output::Save {
                    path: PathBuf::from("out.html"),
                    width: None,
                    height: None,
                    dpi: None,
                }),
            ]
        );
    }

    #[test]
    fn test_arrow_separator() {
        let steps = parse_pipeline("plot_density(v) >> scale_x_log() >> show()").unwrap();
        assert_eq!(steps.len(), 3);
        assert_eq!(steps[2], Step::Output(Output::Show));
    }

    #[test]
    fn test_literal_without_name() {
        let steps = parse_pipeline(r#"plot_points(a, b) | add_color("red") | add_alpha(0.5)"#).unwrap();
        assert_eq!(steps[1], Step::Verb(add_color(lit("red"))));
        assert_eq!(steps[2], Step::Verb(add_alpha(lit(0.5))));
    }

    #[test]
    fn test_syntax_error_reports_position() {
        let err = parse_pipeline("plot_points(a, b) | add_color(").unwrap_err();
        assert!(matches!(err, PlotError::Parse(_)));
        let err = parse_pipeline("plot_points(a b)").unwrap_err();
        assert!(err.to_string().contains("unexpected input"));
    }

    #[test]
    fn test_empty_pipeline_rejected() {
        assert!(parse_pipeline("   ").is_err());
    }

    #[test]
    fn test_histogram_bins() {
        let steps = parse_pipeline("plot_histogram(x: v, bins: 12)").unwrap();
        assert_eq!(steps[0], Step::Verb(plot_histogram("v", Some(12))));
    }
}
