// Lexical helpers for the pipeline DSL

use nom::{
    branch::alt,
    bytes::complete::{escaped_transform, is_not, tag},
    character::complete::{alpha1, alphanumeric1, char, multispace0},
    combinator::{map, map_res, opt, recognize, value},
    multi::many0_count,
    number::complete::recognize_float,
    sequence::{delimited, pair},
    IResult,
};

/// Wrap a parser so it skips surrounding whitespace
pub fn ws<'a, F, O>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    delimited(multispace0, inner, multispace0)
}

/// Column or verb name: a letter or underscore, then letters, digits, `_` or `.`
pub fn identifier(input: &str) -> IResult<&str, String> {
    map(
        recognize(pair(
            alt((alpha1, tag("_"))),
            many0_count(alt((alphanumeric1, tag("_"), tag(".")))),
        )),
        |s: &str| s.to_string(),
    )(input)
}

/// Double-quoted string with `\"`, `\\`, `\n` and `\t` escapes
pub fn string_literal(input: &str) -> IResult<&str, String> {
    delimited(
        char('"'),
        map(
            opt(escaped_transform(
                is_not("\\\""),
                '\\',
                alt((
                    value("\\", tag("\\")),
                    value("\"", tag("\"")),
                    value("\n", tag("n")),
                    value("\t", tag("t")),
                )),
            )),
            Option::unwrap_or_default,
        ),
        char('"'),
    )(input)
}

/// Decimal number, optionally signed, with optional exponent
pub fn number_literal(input: &str) -> IResult<&str, f64> {
    map_res(recognize_float, |s: &str| s.parse::<f64>())(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier() {
        assert_eq!(identifier("sepal.length)"), Ok((")", "sepal.length".to_string())));
        assert_eq!(identifier("_tmp1 |"), Ok((" |", "_tmp1".to_string())));
        assert!(identifier("1abc").is_err());
    }

    #[test]
    fn test_string_literal_escapes() {
        let (rest, s) = string_literal(r#""say \"hi\"\n" tail"#).unwrap();
        assert_eq!(s, "say \"hi\"\n");
        assert_eq!(rest, " tail");
    }

    #[test]
    fn test_empty_string_literal() {
        assert_eq!(string_literal(r#""""#), Ok(("", String::new())));
    }

    #[test]
    fn test_number_literal() {
        assert_eq!(number_literal("3"), Ok(("", 3.0)));
        assert_eq!(number_literal("-0.5)"), Ok((")", -0.5)));
        assert_eq!(number_literal("1e3"), Ok(("", 1000.0)));
        assert!(number_literal("nan").is_err());
    }

    #[test]
    fn test_ws() {
        let mut p = ws(tag("|"));
        assert_eq!(p("  |  x"), Ok(("x", "|")));
    }
}
