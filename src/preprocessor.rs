// Variable expansion applied to DSL text before parsing

use crate::error::{PlotError, Result};
use std::collections::HashMap;
use std::iter::Peekable;
use std::str::Chars;

/// Replace `$name` and `${name}` with their values. `$$` is a literal `$`.
pub fn expand_variables(input: &str, variables: &HashMap<String, String>) -> Result<String> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            output.push(c);
            continue;
        }
        let name = match chars.peek() {
            Some('$') => {
                chars.next();
                output.push('$');
                continue;
            }
            Some('{') => {
                chars.next();
                let name = consume_identifier(&mut chars);
                if chars.next() != Some('}') || name.is_empty() {
                    return Err(PlotError::Parse(format!(
                        "unterminated variable reference '${{{}'",
                        name
                    )));
                }
                name
            }
            _ => consume_identifier(&mut chars),
        };
        if name.is_empty() {
            // lone '$'
            output.push('$');
            continue;
        }
        match variables.get(&name) {
            Some(value) => output.push_str(value),
            None => return Err(PlotError::UndefinedVariable(name)),
        }
    }

    Ok(output)
}

fn consume_identifier(chars: &mut Peekable<Chars>) -> String {
    let mut name = String::new();
    if let Some(&c) = chars.peek() {
        if !c.is_alphabetic() && c != '_' {
            return name;
        }
    }
    while let Some(&c) = chars.peek() {
        if c.is_alphanumeric() || c == '_' {
            name.push(c);
            chars.next();
        } else {
            break;
        }
    }
    name
}

/// Split a `name=value` command-line assignment.
pub fn parse_assignment(s: &str) -> Result<(String, String)> {
    match s.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.to_string()))
        }
        _ => Err(PlotError::InvalidArgument(format!(
            "expected name=value, got '{}'",
            s
        ))),
    }
}
