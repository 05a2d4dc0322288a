//! Liquid variable resolution.
//!
//! Only the variable subset is supported: `{% assign name = 'literal' %}`
//! and `{{ name }}` / `{{ name | default: 'x' }}`. Both passes run over
//! the whole document before any markup scanning, so an assignment may
//! appear after its use. Other Liquid tags and moustaches are kept as-is.

use std::collections::HashMap;
use winnow::ascii::{multispace0, multispace1};
use winnow::combinator::{alt, delimited, eof, opt, preceded};
use winnow::prelude::*;
use winnow::token::{take_till, take_while};

/// Apply assignments and substitute variable expressions.
pub fn resolve(input: &str) -> String {
    let (stripped, vars) = collect_assigns(input);
    substitute(&stripped, &vars)
}

/// Remove every `{% assign %}` tag and return the variables it defined.
/// Later assignments to the same name win.
fn collect_assigns(input: &str) -> (String, HashMap<String, String>) {
    let mut vars = HashMap::new();
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(open) = rest.find("{%") {
        out.push_str(&rest[..open]);
        let after = &rest[open + 2..];
        let Some(close) = after.find("%}") else {
            out.push_str(&rest[open..]);
            return (out, vars);
        };
        let mut body = trim_markers(&after[..close]);
        match parse_assign.parse_next(&mut body) {
            Ok((name, value)) => {
                log::trace!("liquid assign {name} = {value:?}");
                vars.insert(name.to_string(), value.to_string());
            }
            Err(_) => out.push_str(&rest[open..open + 2 + close + 2]),
        }
        rest = &after[close + 2..];
    }
    out.push_str(rest);
    (out, vars)
}

/// Replace `{{ name }}` expressions. Unresolved names without a default
/// become the empty string.
fn substitute(input: &str, vars: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(open) = rest.find("{{") {
        out.push_str(&rest[..open]);
        let after = &rest[open + 2..];
        let Some(close) = after.find("}}") else {
            out.push_str(&rest[open..]);
            return out;
        };
        let mut body = trim_markers(&after[..close]);
        match parse_output.parse_next(&mut body) {
            Ok((name, default)) => {
                let value = vars
                    .get(name)
                    .map(String::as_str)
                    .or(default)
                    .unwrap_or("");
                out.push_str(value);
            }
            Err(_) => out.push_str(&rest[open..open + 2 + close + 2]),
        }
        rest = &after[close + 2..];
    }
    out.push_str(rest);
    out
}

/// Strip the `-` whitespace-control markers of `{%- -%}` / `{{- -}}`.
fn trim_markers(body: &str) -> &str {
    let body = body.strip_prefix('-').unwrap_or(body);
    body.strip_suffix('-').unwrap_or(body)
}

// ─── Expression parsers ──────────────────────────────────────────────────

fn parse_var_name<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    take_while(1.., |c: char| c.is_alphanumeric() || matches!(c, '_' | '.' | '-')).parse_next(input)
}

fn parse_literal<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    alt((
        delimited('"', take_till(0.., '"'), '"'),
        delimited('\'', take_till(0.., '\''), '\''),
        take_while(1.., |c: char| !c.is_whitespace() && !matches!(c, '|' | '%' | '}')),
    ))
    .parse_next(input)
}

fn parse_assign<'a>(input: &mut &'a str) -> ModalResult<(&'a str, &'a str)> {
    let _ = multispace0.parse_next(input)?;
    let _ = "assign".parse_next(input)?;
    let _ = multispace1.parse_next(input)?;
    let name = parse_var_name.parse_next(input)?;
    let _ = (multispace0, '=', multispace0).parse_next(input)?;
    let value = parse_literal.parse_next(input)?;
    let _ = (multispace0, eof).parse_next(input)?;
    Ok((name, value))
}

fn parse_output<'a>(input: &mut &'a str) -> ModalResult<(&'a str, Option<&'a str>)> {
    let _ = multispace0.parse_next(input)?;
    let name = parse_var_name.parse_next(input)?;
    let _ = multispace0.parse_next(input)?;
    let default = opt(preceded(
        ('|', multispace0, "default", multispace0, ':', multispace0),
        parse_literal,
    ))
    .parse_next(input)?;
    let _ = (multispace0, eof).parse_next(input)?;
    Ok((name, default))
}
