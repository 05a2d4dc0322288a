//! Widget query description: `<datasource/>` attributes, moustache binding
//! pairs and the `where="…"` rule language.
//!
//! Nothing here runs a query. The output is a `DataSource` value the data
//! API resolves later.

use crate::markup::Attrs;
use crate::model::{DataSource, WhereRule};
use winnow::prelude::*;
use winnow::token::{one_of, take_while};

// ─── DataSource construction ─────────────────────────────────────────────

/// Build a `DataSource` from the attributes of a `<datasource/>` tag.
pub fn data_source_from_attrs(attrs: &Attrs) -> DataSource {
    let mut ds = DataSource::default();
    for (key, value) in attrs.iter() {
        apply_binding(&mut ds, key, value);
    }
    finish(&mut ds);
    ds
}

/// Build a `DataSource` from `(key, value)` binding pairs. Keys that do not
/// name a query field are ignored.
pub fn data_source_from_pairs(pairs: &[(String, String)]) -> DataSource {
    let mut ds = DataSource::default();
    for (key, value) in pairs {
        apply_binding(&mut ds, key, value);
    }
    finish(&mut ds);
    ds
}

/// Write one `key = value` into the matching field. Returns `false` for
/// keys that are not query fields.
pub fn apply_binding(ds: &mut DataSource, key: &str, value: &str) -> bool {
    let value = value.trim();
    let text = || (!value.is_empty()).then(|| value.to_string());
    match key.trim() {
        "schema" => ds.schema = text(),
        "table" => ds.table = text(),
        "dimension" => ds.dimension = text(),
        "dimensions" => ds.dimensions = split_top_level(value),
        "measure" => ds.measure = text(),
        "measures" => ds.measures = split_top_level(value),
        "agg" | "aggregation" => ds.aggregation = text().map(|a| a.to_ascii_uppercase()),
        "limit" => match value.parse::<u32>() {
            Ok(n) => ds.limit = Some(n),
            Err(_) => log::debug!("ignoring non-numeric limit {value:?}"),
        },
        "where" => ds.where_rules = parse_where(value),
        "dateColumn" | "date-column" => ds.date_column = text(),
        "orderBy" | "order-by" => ds.order_by = text(),
        _ => return false,
    }
    true
}

/// Split `schema.table` written into `table` when no schema was given.
fn finish(ds: &mut DataSource) {
    let (schema, table) = normalize_schema_table(ds.schema.as_deref(), ds.table.as_deref());
    ds.schema = schema;
    ds.table = table;
}

/// `(schema, "s.t")` → `(schema or "s", "t")`. Blank inputs become `None`.
pub fn normalize_schema_table(
    schema: Option<&str>,
    table: Option<&str>,
) -> (Option<String>, Option<String>) {
    let schema = schema.map(str::trim).filter(|s| !s.is_empty());
    let table = table.map(str::trim).filter(|t| !t.is_empty());
    match table.and_then(|t| t.split_once('.')) {
        Some((prefix, name)) => (
            Some(schema.unwrap_or(prefix).to_string()),
            Some(name.to_string()),
        ),
        None => (schema.map(str::to_string), table.map(str::to_string)),
    }
}

/// Aggregate expression for a metric column: `AGG(metric)`. Unknown or
/// missing aggregations fall back to `SUM`.
pub fn build_measure_expr(metric: &str, agg: Option<&str>) -> Option<String> {
    let metric = metric.trim();
    if metric.is_empty() {
        return None;
    }
    let agg = agg.map(|a| a.trim().to_ascii_uppercase()).unwrap_or_default();
    let agg = match agg.as_str() {
        "SUM" | "COUNT" | "AVG" | "MIN" | "MAX" => agg.as_str(),
        _ => "SUM",
    };
    Some(format!("{agg}({metric})"))
}

/// Split on commas that are not inside parentheses.
fn split_top_level(s: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, ch) in s.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => depth -= 1,
            ',' if depth == 0 => {
                items.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    items.push(&s[start..]);
    items
        .into_iter()
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

// ─── Binding pairs ───────────────────────────────────────────────────────

/// Read `{{ key: value; key2: value2 }}` pairs from the first moustache
/// block in `text`. Each pair splits on its first `:`.
pub fn parse_binding_pairs(text: &str) -> Vec<(String, String)> {
    let Some(open) = text.find("{{") else {
        return Vec::new();
    };
    let body = &text[open + 2..];
    let body = match body.find("}}") {
        Some(close) => &body[..close],
        None => body,
    };
    body.split(';')
        .filter_map(|pair| pair.split_once(':'))
        .map(|(k, v)| (k.trim().to_string(), strip_outer_quotes(v).to_string()))
        .filter(|(k, _)| !k.is_empty())
        .collect()
}

fn strip_outer_quotes(s: &str) -> &str {
    let t = s.trim();
    if t.len() >= 2
        && ((t.starts_with('"') && t.ends_with('"')) || (t.starts_with('\'') && t.ends_with('\'')))
    {
        &t[1..t.len() - 1]
    } else {
        t
    }
}

// ─── Where rules ─────────────────────────────────────────────────────────

/// Parse `where="a = 1; b in ('x','y'); c between 1..9; d like '%z%'"`.
/// Rules are AND-combined by the consumer. Malformed rules are dropped.
pub fn parse_where(raw: &str) -> Vec<WhereRule> {
    raw.split(';')
        .map(|part| part.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|part| !part.is_empty())
        .filter_map(|part| {
            let rule = parse_rule(&part);
            if rule.is_none() {
                log::debug!("dropping malformed where rule {part:?}");
            }
            rule
        })
        .collect()
}

fn parse_column<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    (
        one_of(|c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(0.., |c: char| c.is_alphanumeric() || matches!(c, '_' | '.' | '-')),
    )
        .take()
        .parse_next(input)
}

fn parse_rule(s: &str) -> Option<WhereRule> {
    let mut input = s;
    let col = parse_column.parse_next(&mut input).ok()?.to_string();
    let rest = input;
    let rule = |op: &str| WhereRule {
        col: col.clone(),
        op: op.to_string(),
        val: None,
        vals: Vec::new(),
        start: None,
        end: None,
    };

    if let Some(after) = rest.strip_prefix(' ') {
        for op in ["not in", "in"] {
            if let Some(list) = strip_keyword(after, op) {
                let list = list.trim_start();
                let inside = list.strip_prefix('(')?.strip_suffix(')')?;
                let vals: Vec<String> = inside
                    .split(',')
                    .map(strip_outer_quotes)
                    .filter(|v| !v.is_empty())
                    .map(str::to_string)
                    .collect();
                if vals.is_empty() {
                    return None;
                }
                return Some(WhereRule { vals, ..rule(op) });
            }
        }
        if let Some(bounds) = strip_keyword(after, "between") {
            let (start, end) = bounds.trim_start().split_once("..")?;
            let (start, end) = (strip_outer_quotes(start), strip_outer_quotes(end));
            if start.is_empty() || end.is_empty() {
                return None;
            }
            return Some(WhereRule {
                start: Some(start.to_string()),
                end: Some(end.to_string()),
                ..rule("between")
            });
        }
        if let Some(pattern) = strip_keyword(after, "like") {
            let val = strip_outer_quotes(pattern);
            if val.is_empty() {
                return None;
            }
            return Some(WhereRule {
                val: Some(val.to_string()),
                ..rule("like")
            });
        }
    }

    let rest = rest.trim_start();
    let op = ["!=", ">=", "<=", "=", ">", "<"]
        .into_iter()
        .find(|op| rest.starts_with(op))?;
    let val = strip_outer_quotes(&rest[op.len()..]);
    if val.is_empty() {
        return None;
    }
    Some(WhereRule {
        val: Some(val.to_string()),
        ..rule(op)
    })
}

/// Case-insensitive keyword prefix followed by a space or `(`.
fn strip_keyword<'a>(s: &'a str, keyword: &str) -> Option<&'a str> {
    let n = keyword.len();
    if s.len() < n || !s.as_bytes()[..n].eq_ignore_ascii_case(keyword.as_bytes()) {
        return None;
    }
    let rest = &s[n..];
    rest.starts_with([' ', '(']).then_some(rest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attrs_map_to_fields() {
        let attrs = Attrs::parse(
            r#"schema="sales" table="orders" dimension="region" measure="SUM(total)" limit="5" order-by="total""#,
        );
        let ds = data_source_from_attrs(&attrs);
        assert_eq!(ds.schema.as_deref(), Some("sales"));
        assert_eq!(ds.table.as_deref(), Some("orders"));
        assert_eq!(ds.dimension.as_deref(), Some("region"));
        assert_eq!(ds.measure.as_deref(), Some("SUM(total)"));
        assert_eq!(ds.limit, Some(5));
        assert_eq!(ds.order_by.as_deref(), Some("total"));
    }

    #[test]
    fn table_with_schema_prefix_is_split() {
        let ds = data_source_from_attrs(&Attrs::parse(r#"table="sales.orders""#));
        assert_eq!(ds.schema.as_deref(), Some("sales"));
        assert_eq!(ds.table.as_deref(), Some("orders"));

        let ds = data_source_from_attrs(&Attrs::parse(r#"schema="crm" table="sales.orders""#));
        assert_eq!(ds.schema.as_deref(), Some("crm"));
    }

    #[test]
    fn measures_split_outside_parens() {
        let ds = data_source_from_attrs(&Attrs::parse(
            r#"measures="SUM(a), ROUND(AVG(b), 2)""#,
        ));
        assert_eq!(ds.measures, vec!["SUM(a)", "ROUND(AVG(b), 2)"]);
    }

    #[test]
    fn binding_pairs_split_on_first_colon() {
        let pairs = parse_binding_pairs("{{ title: Revenue: total; table: 'orders'; measure: SUM(x) }}");
        assert_eq!(
            pairs,
            vec![
                ("title".to_string(), "Revenue: total".to_string()),
                ("table".to_string(), "orders".to_string()),
                ("measure".to_string(), "SUM(x)".to_string()),
            ]
        );
        let ds = data_source_from_pairs(&pairs);
        assert_eq!(ds.table.as_deref(), Some("orders"));
        assert_eq!(ds.measure.as_deref(), Some("SUM(x)"));
    }

    #[test]
    fn where_rule_language() {
        let rules = parse_where(
            "status = 'paid'; region in ('N','S'); total between 10..100; name LIKE '%a%'; x !=",
        );
        assert_eq!(rules.len(), 4);
        assert_eq!(rules[0].op, "=");
        assert_eq!(rules[0].val.as_deref(), Some("paid"));
        assert_eq!(rules[1].op, "in");
        assert_eq!(rules[1].vals, vec!["N", "S"]);
        assert_eq!(rules[2].start.as_deref(), Some("10"));
        assert_eq!(rules[2].end.as_deref(), Some("100"));
        assert_eq!(rules[3].op, "like");
        assert_eq!(rules[3].val.as_deref(), Some("%a%"));
    }

    #[test]
    fn where_not_in_and_comparators() {
        let rules = parse_where("kind not in (a, b);amount>=10");
        assert_eq!(rules[0].op, "not in");
        assert_eq!(rules[0].vals, vec!["a", "b"]);
        assert_eq!(rules[1].op, ">=");
        assert_eq!(rules[1].col, "amount");
        assert_eq!(rules[1].val.as_deref(), Some("10"));
    }

    #[test]
    fn measure_expr_defaults_to_sum() {
        assert_eq!(build_measure_expr("total", None).as_deref(), Some("SUM(total)"));
        assert_eq!(build_measure_expr("id", Some("count")).as_deref(), Some("COUNT(id)"));
        assert_eq!(build_measure_expr("x", Some("median")).as_deref(), Some("SUM(x)"));
        assert_eq!(build_measure_expr("  ", Some("sum")), None);
    }
}
