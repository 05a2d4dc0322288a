//! Source-level rewrites of dashboard documents.
//!
//! The visual builder edits the DSL text directly so that hand-written
//! formatting, comments and Liquid survive. Every helper takes the current
//! text and returns the new text. A document the scanner cannot read, or
//! one without the target element, comes back unchanged.
//!
//! Edited open tags are re-rendered from their attribute list with values
//! escaped for double quotes; untouched markup is copied byte for byte.

use crate::markup::{Attrs, Element, SyntaxError, escape_attr, find_elements, find_first};
use crate::model::{DateRange, JsonObject, Orientation, Sizing};
use std::ops::Range;

pub use crate::query::{build_measure_expr, normalize_schema_table};

/// Elements that may contain addressable nodes.
const CONTAINERS: &[&str] = &["dashboard", "row", "group", "column", "section"];
/// Elements that carry widget content.
const WIDGETS: &[&str] = &["kpi", "chart", "widget"];
/// Elements [`set_attr_on_node`] may target.
const NODES: &[&str] = &["kpi", "chart", "widget", "group"];

// ─── Specs ───────────────────────────────────────────────────────────────

/// A group to create with [`ensure_group`].
#[derive(Debug, Clone, PartialEq)]
pub struct NewGroup {
    pub id: String,
    /// Defaults to the id.
    pub title: Option<String>,
    pub orientation: Orientation,
    pub sizing: Sizing,
    pub cols_d: u32,
    pub gap_x: u32,
    pub gap_y: u32,
    /// Written as a `<style>` JSON island when non-empty.
    pub style: Option<JsonObject>,
}

impl NewGroup {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: None,
            orientation: Orientation::Horizontal,
            sizing: Sizing::Fr,
            cols_d: 12,
            gap_x: 16,
            gap_y: 16,
            style: None,
        }
    }
}

/// Query fields collected by the builder dialogs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataBinding {
    pub schema: Option<String>,
    pub table: Option<String>,
    pub dimension: Option<String>,
    /// Bare metric column, or a full expression.
    pub measure: Option<String>,
    pub agg: Option<String>,
}

impl DataBinding {
    /// `<datasource …/>` attributes in writing order.
    fn attrs(&self, with_dimension: bool) -> Vec<(String, String)> {
        let (schema, table) = normalize_schema_table(self.schema.as_deref(), self.table.as_deref());
        let measure = self.measure.as_deref().and_then(|m| {
            if m.contains('(') {
                Some(m.trim().to_string())
            } else {
                build_measure_expr(m, self.agg.as_deref())
            }
        });
        let dimension = if with_dimension {
            self.dimension.clone().filter(|d| !d.trim().is_empty())
        } else {
            None
        };
        [
            ("schema", schema),
            ("table", table),
            ("dimension", dimension),
            ("measure", measure),
        ]
        .into_iter()
        .filter_map(|(k, v)| Some((k.to_string(), v?)))
        .collect()
    }
}

/// A KPI to insert with [`insert_kpi_in_group`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewKpi {
    pub id: String,
    pub title: Option<String>,
    /// Appended to `tw` as `kpi:unit:…`.
    pub unit: Option<String>,
    pub height: u32,
    pub width_fr: String,
    pub data: DataBinding,
    pub tw: Option<String>,
}

impl NewKpi {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: None,
            unit: None,
            height: 150,
            width_fr: "1fr".to_string(),
            data: DataBinding::default(),
            tw: None,
        }
    }
}

/// A chart to insert with [`insert_chart_in_group`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewChart {
    pub id: String,
    pub title: Option<String>,
    pub kind: String,
    pub height: u32,
    pub width_fr: String,
    pub data: DataBinding,
    pub tw: Option<String>,
}

impl NewChart {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: None,
            kind: "bar".to_string(),
            height: 360,
            width_fr: "1fr".to_string(),
            data: DataBinding::default(),
            tw: None,
        }
    }
}

/// Dashboard-level changes for [`set_dashboard_attrs`]. `None` leaves the
/// attribute as it is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DashboardAttrs {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub theme: Option<String>,
    pub date_range: Option<DateRange>,
}

// ─── Public API ───────────────────────────────────────────────────────────

/// Set `name="value"` on every kpi, chart, widget or group whose id is `id`.
#[must_use]
pub fn set_attr_on_node(source: &str, id: &str, name: &str, value: &str) -> String {
    rewrite(source, |src| {
        Ok(find_by_id(src, NODES, id)?
            .iter()
            .map(|el| Splice {
                range: el.start..el.open_end,
                text: render_open_tag(el.name, &with_attrs(&el.attrs, &[(name, Some(value))]), el.self_closing),
            })
            .collect())
    })
}

/// Merge `attrs` into the `<datasource/>` of the first widget with id `id`,
/// creating the block when missing. Blank values are skipped.
#[must_use]
pub fn set_datasource_attrs(source: &str, id: &str, attrs: &[(&str, &str)]) -> String {
    let updates: Vec<(&str, Option<&str>)> = attrs
        .iter()
        .filter(|(_, v)| !v.trim().is_empty())
        .map(|(k, v)| (*k, Some(*v)))
        .collect();
    rewrite(source, |src| {
        let Some(widget) = find_by_id(src, WIDGETS, id)?.into_iter().next() else {
            return Ok(Vec::new());
        };
        let existing = match &widget.inner {
            Some(inner) => find_first(src, inner.clone(), "datasource")?,
            None => None,
        };
        Ok(match existing {
            Some(ds) => vec![Splice {
                range: ds.span(),
                text: render_open_tag("datasource", &with_attrs(&ds.attrs, &updates), true),
            }],
            None => {
                let tag = render_open_tag("datasource", &with_attrs(&Attrs::default(), &updates), true);
                insert_child(src, &widget, &tag, false).into_iter().collect()
            }
        })
    })
}

/// Rewrite the `<config>` JSON of the first widget with id `id` through
/// `update`. A missing or unreadable config starts from an empty object.
#[must_use]
pub fn set_config_on_node(
    source: &str,
    id: &str,
    update: impl FnOnce(JsonObject) -> JsonObject,
) -> String {
    rewrite(source, |src| {
        let Some(widget) = find_by_id(src, WIDGETS, id)?.into_iter().next() else {
            return Ok(Vec::new());
        };
        let existing = match &widget.inner {
            Some(inner) => find_first(src, inner.clone(), "config")?,
            None => None,
        };
        let current = existing
            .as_ref()
            .and_then(|c| serde_json::from_str::<JsonObject>(c.inner_str(src).trim()).ok())
            .unwrap_or_default();
        let json = match serde_json::to_string_pretty(&update(current)) {
            Ok(json) => json,
            Err(e) => {
                log::warn!("could not serialize config for {id}: {e}");
                return Ok(Vec::new());
            }
        };
        let block = format!("<config>\n{json}\n</config>");
        Ok(match existing {
            Some(config) => vec![Splice {
                range: config.span(),
                text: block,
            }],
            None => insert_child(src, &widget, &block, false).into_iter().collect(),
        })
    })
}

/// Remove every kpi, chart or widget with id `id`. Returns the new text and
/// the number of elements removed.
#[must_use]
pub fn remove_widget(source: &str, id: &str) -> (String, usize) {
    remove_lines(source, |src| {
        Ok(find_by_id(src, WIDGETS, id)?
            .into_iter()
            .filter(|el| el.closed)
            .collect())
    })
}

/// Keep the first kpi, chart or widget with id `id` and remove the rest.
/// Returns the new text and the number of duplicates removed.
#[must_use]
pub fn dedupe_widget(source: &str, id: &str) -> (String, usize) {
    remove_lines(source, |src| {
        Ok(find_by_id(src, WIDGETS, id)?
            .into_iter()
            .skip(1)
            .filter(|el| el.closed)
            .collect())
    })
}

/// Set the `tw` token list of the first widget with id `id`, creating its
/// `<styling/>` block when missing. Other attributes of the block stay.
#[must_use]
pub fn set_styling_tw(source: &str, id: &str, tw: &str) -> String {
    rewrite(source, |src| {
        let Some(widget) = find_by_id(src, WIDGETS, id)?.into_iter().next() else {
            return Ok(Vec::new());
        };
        let existing = match &widget.inner {
            Some(inner) => find_first(src, inner.clone(), "styling")?,
            None => None,
        };
        Ok(match existing {
            Some(styling) => vec![Splice {
                range: styling.span(),
                text: render_open_tag(
                    "styling",
                    &with_attrs(&styling.attrs, &[("tw", Some(tw)), ("class", None)]),
                    true,
                ),
            }],
            None => {
                let tag = render_open_tag("styling", &[("tw".to_string(), tw.to_string())], true);
                insert_child(src, &widget, &tag, true).into_iter().collect()
            }
        })
    })
}

/// Replace the `<style>` JSON of the group `id` with `style`. The group's
/// own block is the one outside its widgets; one is created when missing.
#[must_use]
pub fn set_group_style(source: &str, id: &str, style: &JsonObject) -> String {
    let block = format!("<style>{}</style>", serde_json::Value::Object(style.clone()));
    rewrite(source, |src| {
        let Some(group) = find_by_id(src, &["group"], id)?.into_iter().next() else {
            return Ok(Vec::new());
        };
        let own = match &group.inner {
            Some(inner) => find_elements(src, inner.clone(), &["style", "kpi", "chart", "widget"])?
                .into_iter()
                .find(|el| el.name == "style"),
            None => None,
        };
        Ok(match own {
            Some(el) => vec![Splice {
                range: el.span(),
                text: block,
            }],
            None => insert_child(src, &group, &block, false).into_iter().collect(),
        })
    })
}

/// Remove every group with id `id` together with its widgets. Returns the
/// new text and the number of groups removed.
#[must_use]
pub fn remove_group(source: &str, id: &str) -> (String, usize) {
    remove_lines(source, |src| {
        Ok(find_by_id(src, &["group"], id)?
            .into_iter()
            .filter(|el| el.closed)
            .collect())
    })
}

/// Append `group` before `</dashboard>` unless a group with its id exists.
/// Returns the new text and whether a group was created.
#[must_use]
pub fn ensure_group(source: &str, group: &NewGroup) -> (String, bool) {
    match find_by_id(source, &["group"], &group.id) {
        Ok(found) if !found.is_empty() => return (source.to_string(), false),
        Ok(_) => {}
        Err(e) => {
            log::debug!("ensure_group: {e}");
            return (source.to_string(), false);
        }
    }

    let title = group.title.as_deref().unwrap_or(&group.id);
    let orientation = match group.orientation {
        Orientation::Horizontal => "horizontal",
        Orientation::Vertical => "vertical",
    };
    let sizing = match group.sizing {
        Sizing::Fr => "fr",
        Sizing::Auto => "auto",
    };
    let style = match &group.style {
        Some(style) if !style.is_empty() => {
            format!("\n    <style>{}</style>", serde_json::Value::Object(style.clone()))
        }
        _ => String::new(),
    };
    let block = format!(
        "\n  <group id=\"{}\" title=\"{}\" sizing=\"{sizing}\" orientation=\"{orientation}\" cols-d=\"{}\" gap-x=\"{}\" gap-y=\"{}\">{style}\n  </group>\n",
        escape_attr(&group.id),
        escape_attr(title),
        group.cols_d,
        group.gap_x,
        group.gap_y,
    );

    let at = match find_first(source, 0..source.len(), "dashboard") {
        Ok(Some(dash)) => match &dash.inner {
            Some(inner) => inner.end,
            None => dash.open_end,
        },
        _ => source.len(),
    };
    let mut out = source.to_string();
    out.insert_str(at, &block);
    (out, true)
}

/// Append a KPI to the group `group_id`. The group must exist.
#[must_use]
pub fn insert_kpi_in_group(source: &str, group_id: &str, kpi: &NewKpi) -> String {
    let tw = [
        kpi.tw.clone().filter(|t| !t.trim().is_empty()),
        kpi.unit.as_deref().map(|u| format!("kpi:unit:{u}")),
    ]
    .into_iter()
    .flatten()
    .collect::<Vec<_>>()
    .join(" ");
    let open = render_open_tag(
        "kpi",
        &[
            ("id".to_string(), kpi.id.clone()),
            ("width".to_string(), kpi.width_fr.clone()),
            ("height".to_string(), kpi.height.to_string()),
            ("title".to_string(), kpi.title.clone().unwrap_or_else(|| kpi.id.clone())),
        ],
        false,
    );
    let block = widget_block("kpi", &open, &kpi.data.attrs(false), &tw);
    insert_in_group(source, group_id, &block)
}

/// Append a chart to the group `group_id`. The group must exist.
#[must_use]
pub fn insert_chart_in_group(source: &str, group_id: &str, chart: &NewChart) -> String {
    let open = render_open_tag(
        "chart",
        &[
            ("id".to_string(), chart.id.clone()),
            ("type".to_string(), chart.kind.clone()),
            ("width".to_string(), chart.width_fr.clone()),
            ("height".to_string(), chart.height.to_string()),
            ("title".to_string(), chart.title.clone().unwrap_or_else(|| chart.id.clone())),
        ],
        false,
    );
    let tw = chart.tw.clone().unwrap_or_default();
    let block = widget_block("chart", &open, &chart.data.attrs(true), &tw);
    insert_in_group(source, group_id, &block)
}

/// Update `title`, `subtitle`, `theme` and the initial date range on the
/// `<dashboard>` open tag. A preset range drops `date-start`/`date-end`.
#[must_use]
pub fn set_dashboard_attrs(source: &str, changes: &DashboardAttrs) -> String {
    let mut updates: Vec<(&str, Option<&str>)> = Vec::new();
    if let Some(title) = &changes.title {
        updates.push(("title", Some(title.as_str())));
    }
    if let Some(subtitle) = &changes.subtitle {
        updates.push(("subtitle", Some(subtitle.as_str())));
    }
    if let Some(theme) = &changes.theme {
        updates.push(("theme", Some(theme.as_str())));
    }
    if let Some(range) = &changes.date_range {
        if range.kind == "custom" {
            updates.push(("date-type", Some("custom")));
            if let Some(start) = range.start_date.as_deref().filter(|s| !s.is_empty()) {
                updates.push(("date-start", Some(start)));
            }
            if let Some(end) = range.end_date.as_deref().filter(|s| !s.is_empty()) {
                updates.push(("date-end", Some(end)));
            }
        } else if !range.kind.is_empty() {
            updates.push(("date-type", Some(range.kind.as_str())));
            updates.push(("date-start", None));
            updates.push(("date-end", None));
        }
    }
    rewrite(source, |src| {
        let Some(dash) = find_first(src, 0..src.len(), "dashboard")? else {
            return Ok(Vec::new());
        };
        Ok(vec![Splice {
            range: dash.start..dash.open_end,
            text: render_open_tag("dashboard", &with_attrs(&dash.attrs, &updates), dash.self_closing),
        }])
    })
}

// ─── Splicing ────────────────────────────────────────────────────────────

/// Replace `range` of the source with `text`.
#[derive(Debug)]
struct Splice {
    range: Range<usize>,
    text: String,
}

/// Run `plan` over `source` and apply its splices. Scanner failures leave
/// the source unchanged.
fn rewrite(
    source: &str,
    plan: impl FnOnce(&str) -> Result<Vec<Splice>, SyntaxError>,
) -> String {
    let mut splices = match plan(source) {
        Ok(splices) => splices,
        Err(e) => {
            log::debug!("edit skipped: {e}");
            return source.to_string();
        }
    };
    splices.sort_by_key(|s| std::cmp::Reverse(s.range.start));
    let mut out = source.to_string();
    for splice in splices {
        out.replace_range(splice.range, &splice.text);
    }
    out
}

/// Cut the elements picked by `pick`, each with the lines it sits alone on.
fn remove_lines(
    source: &str,
    pick: impl FnOnce(&str) -> Result<Vec<Element>, SyntaxError>,
) -> (String, usize) {
    let mut removed = 0;
    let out = rewrite(source, |src| {
        let splices: Vec<Splice> = pick(src)?
            .iter()
            .map(|el| Splice {
                range: whole_lines(src, el.span()),
                text: String::new(),
            })
            .collect();
        removed = splices.len();
        Ok(splices)
    });
    if removed == 0 {
        return (out, 0);
    }
    (collapse_blank_lines(&out), removed)
}

/// Elements named in `names` with the given id, at any nesting depth.
fn find_by_id(src: &str, names: &[&'static str], id: &str) -> Result<Vec<Element>, SyntaxError> {
    let mut search: Vec<&'static str> = CONTAINERS.to_vec();
    search.extend(names.iter().filter(|n| !CONTAINERS.contains(n)));
    let mut out = Vec::new();
    walk(src, 0..src.len(), &search, names, id, &mut out)?;
    Ok(out)
}

fn walk(
    src: &str,
    range: Range<usize>,
    search: &[&'static str],
    names: &[&'static str],
    id: &str,
    out: &mut Vec<Element>,
) -> Result<(), SyntaxError> {
    for el in find_elements(src, range, search)? {
        if names.contains(&el.name) && el.attrs.get("id").map(str::trim) == Some(id) {
            out.push(el.clone());
        }
        if CONTAINERS.contains(&el.name)
            && let Some(inner) = el.inner.clone()
        {
            walk(src, inner, search, names, id, out)?;
        }
    }
    Ok(())
}

/// Insert `block` as the first (or last) child of `el`. A self-closing
/// element is rewritten as a paired one. Unclosed elements are left alone.
fn insert_child(src: &str, el: &Element, block: &str, at_end: bool) -> Option<Splice> {
    let indent = format!("{}  ", line_indent(src, el.start));
    if el.self_closing {
        let open = render_open_tag(el.name, &attr_pairs(&el.attrs), false);
        return Some(Splice {
            range: el.span(),
            text: format!(
                "{open}\n{indent}{}\n{}</{}>",
                block.trim(),
                line_indent(src, el.start),
                el.name
            ),
        });
    }
    let inner = el.inner.clone()?;
    let at = if at_end { inner.end } else { inner.start };
    Some(Splice {
        range: at..at,
        text: format!("\n{indent}{}", block.trim()),
    })
}

fn insert_in_group(source: &str, group_id: &str, block: &str) -> String {
    rewrite(source, |src| {
        let Some(group) = find_by_id(src, &["group"], group_id)?.into_iter().next() else {
            log::debug!("insert skipped: no group {group_id:?}");
            return Ok(Vec::new());
        };
        let Some(inner) = &group.inner else {
            return Ok(insert_child(src, &group, block, true).into_iter().collect());
        };
        // the close tag keeps its own line and indentation
        let tail = src[..inner.end].trim_end_matches([' ', '\t']).len();
        Ok(vec![Splice {
            range: tail..inner.end,
            text: format!("{block}{}", &src[tail..inner.end]),
        }])
    })
}

fn widget_block(name: &str, open: &str, data: &[(String, String)], tw: &str) -> String {
    let datasource = render_open_tag("datasource", data, true);
    let styling = render_open_tag("styling", &[("tw".to_string(), tw.to_string())], true);
    format!("\n    {open}\n      {datasource}\n      {styling}\n    </{name}>\n")
}

// ─── Tag rendering ───────────────────────────────────────────────────────

fn attr_pairs(attrs: &Attrs) -> Vec<(String, String)> {
    attrs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Apply `updates` to an attribute list: `Some` replaces in place or
/// appends, `None` removes.
fn with_attrs(attrs: &Attrs, updates: &[(&str, Option<&str>)]) -> Vec<(String, String)> {
    let mut pairs = attr_pairs(attrs);
    for (name, value) in updates {
        match value {
            Some(value) => match pairs.iter_mut().find(|(k, _)| k == name) {
                Some(pair) => pair.1 = value.to_string(),
                None => pairs.push((name.to_string(), value.to_string())),
            },
            None => pairs.retain(|(k, _)| k != name),
        }
    }
    pairs
}

fn render_open_tag(name: &str, attrs: &[(String, String)], self_closing: bool) -> String {
    let mut tag = format!("<{name}");
    for (k, v) in attrs {
        tag.push_str(&format!(" {k}=\"{}\"", escape_attr(v)));
    }
    tag.push_str(if self_closing { " />" } else { ">" });
    tag
}

// ─── Whitespace ──────────────────────────────────────────────────────────

/// Leading whitespace of the line holding `at`, when nothing else precedes
/// `at` on that line.
fn line_indent(src: &str, at: usize) -> &str {
    let line_start = src[..at].rfind('\n').map_or(0, |i| i + 1);
    let prefix = &src[line_start..at];
    if prefix.chars().all(|c| c == ' ' || c == '\t') {
        prefix
    } else {
        ""
    }
}

/// Grow `range` over the indentation before it and the line break after it
/// when the element sits alone on its lines.
fn whole_lines(src: &str, range: Range<usize>) -> Range<usize> {
    let indent = line_indent(src, range.start);
    let start = range.start - indent.len();
    let after = &src[range.end..];
    let trailing = after.len() - after.trim_start_matches([' ', '\t']).len();
    let rest = &after[trailing..];
    let end = if rest.starts_with("\r\n") {
        range.end + trailing + 2
    } else if rest.starts_with('\n') {
        range.end + trailing + 1
    } else {
        range.end
    };
    start..end
}

/// Squeeze runs of three or more newlines down to one blank line.
fn collapse_blank_lines(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut newlines = 0;
    for ch in s.chars() {
        if ch == '\n' {
            newlines += 1;
            if newlines > 2 {
                continue;
            }
        } else if !ch.is_whitespace() {
            newlines = 0;
        }
        out.push(ch);
    }
    out
}

// ─── Tests ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GridLayout, WidgetType};
    use crate::parser::parse;
    use pretty_assertions::assert_eq;

    const DOC: &str = r#"<dashboard layout-mode="grid" theme="light">
  <group id="sales" title="Sales" cols-d="12">
    <kpi id="rev" title="Revenue">
      <datasource table="orders" measure="SUM(total)" />
    </kpi>
    <chart id="trend" type="line"></chart>
  </group>
  <chart id="loose" type="bar"/>
</dashboard>"#;

    #[test]
    fn set_attr_replaces_or_appends() {
        let out = set_attr_on_node(DOC, "rev", "title", "Net \"revenue\" & tax");
        assert!(out.contains(r#"<kpi id="rev" title="Net &quot;revenue&quot; &amp; tax">"#));
        let result = parse(&out);
        assert_eq!(
            result.widget("rev").unwrap().title.as_deref(),
            Some("Net \"revenue\" & tax")
        );

        let out = set_attr_on_node(DOC, "loose", "height", "240");
        assert!(out.contains(r#"<chart id="loose" type="bar" height="240" />"#));
        assert_eq!(parse(&out).widget("loose").unwrap().height_px, Some(240));
    }

    #[test]
    fn set_attr_reaches_groups() {
        let out = set_attr_on_node(DOC, "sales", "title", "Revenue");
        let result = parse(&out);
        assert_eq!(
            result.grid_config.layout.groups().unwrap()[0].title.as_deref(),
            Some("Revenue")
        );
    }

    #[test]
    fn unknown_id_is_a_no_op() {
        assert_eq!(set_attr_on_node(DOC, "nope", "title", "x"), DOC);
        assert_eq!(remove_widget(DOC, "nope"), (DOC.to_string(), 0));
    }

    #[test]
    fn datasource_merge_and_create() {
        let out = set_datasource_attrs(DOC, "rev", &[("measure", "AVG(total)"), ("schema", "")]);
        let ds = parse(&out).widget("rev").unwrap().data_source.clone().unwrap();
        assert_eq!(ds.measure.as_deref(), Some("AVG(total)"));
        assert_eq!(ds.table.as_deref(), Some("orders"));
        assert!(ds.schema.is_none());

        let out = set_datasource_attrs(DOC, "trend", &[("table", "sales.orders"), ("dimension", "month")]);
        let ds = parse(&out).widget("trend").unwrap().data_source.clone().unwrap();
        assert_eq!(ds.schema.as_deref(), Some("sales"));
        assert_eq!(ds.dimension.as_deref(), Some("month"));

        // self-closing chart is expanded into a paired element
        let out = set_datasource_attrs(DOC, "loose", &[("table", "t")]);
        let result = parse(&out);
        assert!(result.is_valid, "{:?}", result.errors);
        assert_eq!(
            result.widget("loose").unwrap().data_source.as_ref().unwrap().table.as_deref(),
            Some("t")
        );
    }

    #[test]
    fn config_is_rewritten_as_json() {
        let out = set_config_on_node(DOC, "trend", |mut cfg| {
            cfg.insert("styling".to_string(), serde_json::json!({ "showLegend": true }));
            cfg
        });
        let result = parse(&out);
        assert!(result.is_valid, "{:?}", result.errors);
        let styling = result.widget("trend").unwrap().styling().unwrap();
        assert_eq!(styling.show_legend, Some(true));

        let again = set_config_on_node(&out, "trend", |mut cfg| {
            cfg.insert("styling".to_string(), serde_json::json!({ "showLegend": false }));
            cfg
        });
        assert_eq!(again.matches("<config>").count(), 1);
        let result = parse(&again);
        assert_eq!(result.widget("trend").unwrap().styling().unwrap().show_legend, Some(false));
    }

    #[test]
    fn remove_widget_drops_lines() {
        let (out, removed) = remove_widget(DOC, "rev");
        assert_eq!(removed, 1);
        assert!(!out.contains("rev"));
        assert!(!out.contains("\n\n\n"));
        let result = parse(&out);
        assert!(result.is_valid, "{:?}", result.errors);
        let ids: Vec<_> = result.widgets.iter().map(|w| w.id.as_str()).collect();
        assert_eq!(ids, ["trend", "loose"]);

        let (out, removed) = remove_widget(DOC, "loose");
        assert_eq!(removed, 1);
        assert_eq!(parse(&out).widgets.len(), 2);
    }

    #[test]
    fn remove_group_takes_its_widgets() {
        let (out, removed) = remove_group(DOC, "sales");
        assert_eq!(removed, 1);
        assert!(!out.contains("<group"));
        let result = parse(&out);
        assert!(result.is_valid, "{:?}", result.errors);
        let ids: Vec<_> = result.widgets.iter().map(|w| w.id.as_str()).collect();
        assert_eq!(ids, ["loose"]);
        assert!(result.grid_config.layout.groups().unwrap().is_empty());

        // widget ids never match a group
        assert_eq!(remove_group(DOC, "rev"), (DOC.to_string(), 0));
    }

    #[test]
    fn styling_tw_set_or_inserted() {
        let out = set_styling_tw(DOC, "trend", "legend:on");
        let result = parse(&out);
        assert!(result.is_valid, "{:?}", result.errors);
        assert_eq!(result.widget("trend").unwrap().styling().unwrap().show_legend, Some(true));

        let again = set_styling_tw(&out, "trend", "legend:off");
        assert_eq!(again.matches("<styling").count(), 1);
        assert_eq!(
            parse(&again).widget("trend").unwrap().styling().unwrap().show_legend,
            Some(false)
        );

        let out = set_styling_tw(DOC, "loose", "legend:on");
        assert!(parse(&out).is_valid);
        assert!(out.contains("</chart>"));
    }

    #[test]
    fn group_style_replaces_only_its_own_block() {
        let mut style = JsonObject::new();
        style.insert("backgroundColor".to_string(), serde_json::json!("#fafafa"));
        let doc = DOC.replace(
            r#"<kpi id="rev" title="Revenue">"#,
            "<kpi id=\"rev\" title=\"Revenue\">\n      <style>{\"padding\": 4}</style>",
        );
        let out = set_group_style(&doc, "sales", &style);
        let out = set_group_style(&out, "sales", &style);
        assert_eq!(out.matches("<style>").count(), 2);

        let result = parse(&out);
        assert!(result.is_valid, "{:?}", result.errors);
        let group = &result.grid_config.layout.groups().unwrap()[0];
        assert_eq!(group.style.as_ref().unwrap()["backgroundColor"], "#fafafa");
        assert!(group.style.as_ref().unwrap().get("padding").is_none());
        assert_eq!(
            result.widget("rev").unwrap().container_style.as_ref().unwrap()["padding"],
            4
        );
    }

    #[test]
    fn dedupe_keeps_the_first_widget() {
        let doubled = DOC.replace(
            r#"<chart id="trend" type="line"></chart>"#,
            "<chart id=\"trend\" type=\"line\"></chart>\n    <chart id=\"trend\" type=\"bar\"></chart>",
        );
        assert_eq!(parse(&doubled).widgets.len(), 4);
        let (out, removed) = dedupe_widget(&doubled, "trend");
        assert_eq!(removed, 1);
        let result = parse(&out);
        assert_eq!(result.widgets.len(), 3);
        assert_eq!(result.widget("trend").unwrap().kind, WidgetType::Line);
        assert_eq!(dedupe_widget(DOC, "trend"), (DOC.to_string(), 0));
    }

    #[test]
    fn ensure_group_is_idempotent() {
        let (out, created) = ensure_group(DOC, &NewGroup::new("sales"));
        assert!(!created);
        assert_eq!(out, DOC);

        let mut spec = NewGroup::new("ops");
        spec.orientation = Orientation::Vertical;
        let (out, created) = ensure_group(DOC, &spec);
        assert!(created);
        assert!(out.trim_end().ends_with("</dashboard>"));
        let result = parse(&out);
        assert!(result.is_valid, "{:?}", result.errors);
        let GridLayout::Grid(layout) = &result.grid_config.layout else {
            panic!("expected grid layout");
        };
        let ops = layout.groups.iter().find(|g| g.id == "ops").unwrap();
        assert_eq!(ops.title.as_deref(), Some("ops"));
        assert_eq!(ops.orientation, Orientation::Vertical);
        assert_eq!(ops.columns.unwrap().desktop, 12);
        assert_eq!(ops.gap_x, Some(16));

        let (again, created) = ensure_group(&out, &spec);
        assert!(!created);
        assert_eq!(again, out);
    }

    #[test]
    fn insert_widgets_into_group() {
        let mut kpi = NewKpi::new("orders");
        kpi.unit = Some("R$".to_string());
        kpi.data = DataBinding {
            table: Some("sales.orders".to_string()),
            measure: Some("id".to_string()),
            agg: Some("count".to_string()),
            ..DataBinding::default()
        };
        let out = insert_kpi_in_group(DOC, "sales", &kpi);

        let mut chart = NewChart::new("mix");
        chart.kind = "pie".to_string();
        chart.data = DataBinding {
            table: Some("orders".to_string()),
            dimension: Some("channel".to_string()),
            measure: Some("total".to_string()),
            ..DataBinding::default()
        };
        let out = insert_chart_in_group(&out, "sales", &chart);

        let result = parse(&out);
        assert!(result.is_valid, "{:?}", result.errors);
        let group = &result.grid_config.layout.groups().unwrap()[0];
        assert_eq!(group.children, vec!["rev", "trend", "orders", "mix"]);

        let orders = result.widget("orders").unwrap();
        assert_eq!(orders.kind, WidgetType::Kpi);
        assert_eq!(orders.height_px, Some(150));
        assert_eq!(orders.title.as_deref(), Some("orders"));
        let ds = orders.data_source.as_ref().unwrap();
        assert_eq!(ds.schema.as_deref(), Some("sales"));
        assert_eq!(ds.measure.as_deref(), Some("COUNT(id)"));
        assert_eq!(orders.styling().unwrap().unit.as_deref(), Some("R$"));

        let mix = result.widget("mix").unwrap();
        assert_eq!(mix.kind, WidgetType::Pie);
        assert_eq!(mix.height_px, Some(360));
        let ds = mix.data_source.as_ref().unwrap();
        assert_eq!(ds.dimension.as_deref(), Some("channel"));
        assert_eq!(ds.measure.as_deref(), Some("SUM(total)"));
    }

    #[test]
    fn insert_into_missing_group_is_a_no_op() {
        assert_eq!(insert_kpi_in_group(DOC, "nope", &NewKpi::new("k")), DOC);
    }

    #[test]
    fn dashboard_attrs_and_date_range() {
        let custom = DashboardAttrs {
            theme: Some("dark".to_string()),
            date_range: Some(DateRange {
                kind: "custom".to_string(),
                start_date: Some("2024-01-01".to_string()),
                end_date: Some("2024-01-31".to_string()),
            }),
            ..DashboardAttrs::default()
        };
        let out = set_dashboard_attrs(DOC, &custom);
        assert!(out.starts_with(
            r#"<dashboard layout-mode="grid" theme="dark" date-type="custom" date-start="2024-01-01" date-end="2024-01-31">"#
        ));
        let range = parse(&out).global_filters.unwrap().date_range.unwrap();
        assert_eq!(range.end_date.as_deref(), Some("2024-01-31"));

        let preset = DashboardAttrs {
            date_range: Some(DateRange {
                kind: "last_7_days".to_string(),
                start_date: None,
                end_date: None,
            }),
            ..DashboardAttrs::default()
        };
        let out = set_dashboard_attrs(&out, &preset);
        assert!(!out.contains("date-start"));
        let range = parse(&out).global_filters.unwrap().date_range.unwrap();
        assert_eq!(range.kind, "last_7_days");
    }

    #[test]
    fn measure_helpers() {
        assert_eq!(build_measure_expr("total", Some("avg")).as_deref(), Some("AVG(total)"));
        assert_eq!(build_measure_expr("total", Some("median")).as_deref(), Some("SUM(total)"));
        assert_eq!(build_measure_expr(" ", None), None);
        assert_eq!(
            normalize_schema_table(None, Some("s.t")),
            (Some("s".to_string()), Some("t".to_string()))
        );
    }
}
