//! Dashboard DSL → `ParseResult`.
//!
//! Pipeline: Liquid resolution over the whole document, then the
//! `<dashboard>` root, header and global date range, dashboard-level
//! `<style>` islands, the semantic-HTML sections pass, exactly one
//! layout-mode pass, and finally the theme pass.
//!
//! Author mistakes are collected as `ParseError` values and parsing goes
//! on. Only structural failures (a tag without `>`, an unclosed container)
//! abandon the parse, and `parse` turns those into a single syntax error.

mod columns;
mod grid;
mod header;
mod rows;
mod sections;
mod visual;

use crate::liquid;
use crate::markup::{Attrs, SyntaxError, find_elements, find_first, line_col};
use crate::model::*;
use crate::theme::{apply_theme_to_grid, apply_theme_to_widgets};
use serde_json::Value;
use std::ops::Range;

/// Tags that produce widgets in the layout-mode passes.
pub(crate) const VISUAL_TAGS: &[&str] = &["kpi", "chart", "widget"];

/// Parse a dashboard document. Never fails: problems are reported in
/// `ParseResult::errors`.
#[must_use = "parsing result should be used"]
pub fn parse(input: &str) -> ParseResult {
    match parse_liquid(input) {
        Ok(result) => result,
        Err(err) => {
            log::debug!("parse abandoned: {}", err.message);
            ParseResult::failed(err)
        }
    }
}

/// Resolve Liquid variables and parse the markup.
///
/// Fails with one `validation` error when the resolved text does not start
/// with `<`, and with one `syntax` error, positioned in the resolved
/// document, on structural failures.
pub fn parse_liquid(input: &str) -> Result<ParseResult, ParseError> {
    let doc = liquid::resolve(input);
    if !doc.trim_start().starts_with('<') {
        return Err(ParseError::new(
            ErrorKind::Validation,
            "Only the HTML-like dashboard DSL is supported: the document must start with '<'",
        ));
    }
    parse_document(&doc).map_err(|err| {
        let (line, column) = line_col(&doc, err.offset);
        ParseError {
            line,
            column,
            message: err.message,
            kind: ErrorKind::Syntax,
        }
    })
}

// ─── Parse context ───────────────────────────────────────────────────────

/// Per-call working state shared by the passes.
pub(crate) struct Ctx<'a> {
    pub doc: &'a str,
    pub errors: Vec<ParseError>,
    pub widgets: Vec<Widget>,
}

impl<'a> Ctx<'a> {
    fn new(doc: &'a str) -> Self {
        Self {
            doc,
            errors: Vec::new(),
            widgets: Vec::new(),
        }
    }

    fn report(&mut self, kind: ErrorKind, offset: usize, message: String) {
        let (line, column) = line_col(self.doc, offset);
        log::trace!("{kind:?} at {line}:{column}: {message}");
        self.errors.push(ParseError {
            line,
            column,
            message,
            kind,
        });
    }

    pub fn validation(&mut self, offset: usize, message: impl Into<String>) {
        self.report(ErrorKind::Validation, offset, message.into());
    }

    pub fn warning(&mut self, offset: usize, message: impl Into<String>) {
        self.report(ErrorKind::Warning, offset, message.into());
    }
}

// ─── Document ────────────────────────────────────────────────────────────

fn parse_document(doc: &str) -> Result<ParseResult, SyntaxError> {
    let mut ctx = Ctx::new(doc);

    let root = find_first(doc, 0..doc.len(), "dashboard")?;
    let (dash, dash_at, body) = match root {
        Some(el) => {
            let body = match &el.inner {
                Some(inner) => inner.clone(),
                None if el.closed => el.open_end..el.open_end,
                None => el.open_end..doc.len(),
            };
            (el.attrs, el.start, body)
        }
        None => (Attrs::default(), 0, 0..doc.len()),
    };

    let mut config = GridConfig::default();
    if let Some(n) = dash.get_any(&["max-rows", "maxRows"]).and_then(parse_count) {
        config.max_rows = n;
    }
    if let Some(n) = dash.get_any(&["row-height", "rowHeight"]).and_then(parse_count) {
        config.row_height = n;
    }
    if let Some(n) = dash.get("cols").and_then(parse_count) {
        config.cols = n;
    }

    let header = header::parse_header(&mut ctx, &dash, dash_at, body.clone())?;
    let global_filters =
        header::parse_global_filters(&mut ctx, &dash, dash_at, header.config.as_ref());

    apply_dashboard_attrs(&dash, &mut config.style);
    let mut theme = dash.get("theme").map(str::trim).filter(|t| !t.is_empty()).map(str::to_string);
    if let Some(json_theme) = apply_style_islands(&mut ctx, body.clone(), &mut config.style)? {
        theme = Some(json_theme);
    }

    sections::parse_sections(&mut ctx, body.clone(), &mut config.layout_rows)?;

    let mode = match dash.get_any(&["layout-mode", "layoutMode"]) {
        None => LayoutMode::default(),
        Some(raw) => LayoutMode::parse(raw).unwrap_or_else(|| {
            ctx.validation(
                dash_at,
                format!("Unknown layout-mode \"{raw}\": falling back to grid-per-row"),
            );
            LayoutMode::default()
        }),
    };
    log::trace!("layout mode {}", mode.as_str());
    config.layout = match mode {
        LayoutMode::GridPerRow => rows::parse_rows(&mut ctx, body)?,
        LayoutMode::Grid => grid::parse_grid(&mut ctx, &dash, body)?,
        LayoutMode::GridPerColumn => columns::parse_columns(&mut ctx, &dash, body)?,
    };

    let Ctx {
        mut widgets,
        errors,
        ..
    } = ctx;
    if let Some(name) = theme.as_deref() {
        widgets = apply_theme_to_widgets(&widgets, name);
        config = apply_theme_to_grid(&config, name);
    }

    Ok(ParseResult {
        is_valid: errors.is_empty(),
        widgets,
        grid_config: config,
        errors,
        dashboard_title: header.title,
        dashboard_subtitle: header.subtitle,
        header_config: header.config,
        global_filters,
    })
}

// ─── Dashboard style ─────────────────────────────────────────────────────

/// Visual overrides written as dashboard attributes.
fn apply_dashboard_attrs(dash: &Attrs, style: &mut GridStyle) {
    let text = |names: &[&str]| dash.get_any(names).map(str::to_string);
    if let Some(v) = text(&["background-color", "backgroundColor"]) {
        style.background_color = Some(v);
    }
    if let Some(v) = text(&["border-color", "borderColor"]) {
        style.border_color = Some(v);
    }
    if let Some(v) = dash.get_any(&["border-width", "borderWidth"]).and_then(parse_number) {
        style.border_width = Some(v);
    }
    if let Some(v) = dash.get_any(&["border-radius", "borderRadius"]).and_then(parse_number) {
        style.border_radius = Some(v);
    }
    if let Some(v) = text(&["box-shadow", "boxShadow", "shadow"]) {
        style.box_shadow = Some(v);
    }
    if let Some(v) = dash.get_any(&["padding"]).and_then(parse_number) {
        style.padding = Some(v);
    }
    if let Some(v) = text(&["letter-spacing", "letterSpacing"]) {
        style.letter_spacing = Some(v);
    }
}

/// Read dashboard-level `<style>{json}</style>` blocks (those not nested in
/// a row, group, column, section, article, header or visual). Returns the `theme` key
/// of the last block that sets one.
fn apply_style_islands(
    ctx: &mut Ctx<'_>,
    body: Range<usize>,
    style: &mut GridStyle,
) -> Result<Option<String>, SyntaxError> {
    let doc = ctx.doc;
    let scopes = find_elements(
        doc,
        body,
        &[
            "style", "group", "row", "kpi", "chart", "widget", "section", "article",
            "column", "header",
        ],
    )?;
    let mut theme = None;
    for el in scopes.iter().filter(|el| el.name == "style") {
        let Some(obj) = parse_json_island(ctx, el.inner_str(doc), el.start, "dashboard <style>")
        else {
            continue;
        };
        if let Some(name) = obj.get("theme").and_then(Value::as_str) {
            theme = Some(name.to_string());
        }
        apply_style_json(style, &obj);
    }
    Ok(theme)
}

fn apply_style_json(style: &mut GridStyle, obj: &JsonObject) {
    let text = |names: &[&str]| {
        names
            .iter()
            .find_map(|n| obj.get(*n))
            .and_then(json_text)
    };
    let number = |names: &[&str]| {
        names
            .iter()
            .find_map(|n| obj.get(*n))
            .and_then(json_number)
    };
    if let Some(v) = text(&["backgroundColor", "background-color"]) {
        style.background_color = Some(v);
    }
    if let Some(v) = text(&["backgroundGradient", "background-gradient"]) {
        style.background_gradient = Some(v);
    }
    if let Some(v) = text(&["borderColor", "border-color"]) {
        style.border_color = Some(v);
    }
    if let Some(v) = number(&["borderWidth", "border-width"]) {
        style.border_width = Some(v);
    }
    if let Some(v) = number(&["borderRadius", "border-radius"]) {
        style.border_radius = Some(v);
    }
    if let Some(v) = text(&["boxShadow", "box-shadow"]) {
        style.box_shadow = Some(v);
    }
    if let Some(v) = text(&["backdropFilter", "backdrop-filter"]) {
        style.backdrop_filter = Some(v);
    }
    if let Some(v) = number(&["padding"]) {
        style.padding = Some(v);
    }
    if let Some(v) = text(&["letterSpacing", "letter-spacing"]) {
        style.letter_spacing = Some(v);
    }
}

// ─── Shared helpers ──────────────────────────────────────────────────────

/// Parse the body of a `<style>` / `<config>` island as a JSON object.
///
/// Bodies that do not start with `{` are plain CSS and skipped silently.
/// Malformed JSON is a validation error.
pub(crate) fn parse_json_island(
    ctx: &mut Ctx<'_>,
    body: &str,
    offset: usize,
    what: &str,
) -> Option<JsonObject> {
    let body = body.trim();
    if !body.starts_with('{') {
        if !body.is_empty() {
            log::debug!("ignoring non-JSON {what} block");
        }
        return None;
    }
    match serde_json::from_str::<JsonObject>(body) {
        Ok(obj) => Some(obj),
        Err(e) => {
            ctx.validation(offset, format!("Invalid JSON in {what}: {e}"));
            None
        }
    }
}

/// Non-negative integer attribute value. Accepts a `px` suffix.
pub(crate) fn parse_count(s: &str) -> Option<u32> {
    let s = s.trim();
    s.strip_suffix("px").unwrap_or(s).trim().parse().ok()
}

/// Positive integer (column counts, spans).
pub(crate) fn parse_positive(s: &str) -> Option<u32> {
    parse_count(s).filter(|n| *n > 0)
}

pub(crate) fn parse_number(s: &str) -> Option<f64> {
    let s = s.trim();
    s.strip_suffix("px")
        .unwrap_or(s)
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
}

fn json_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn json_number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_number(s),
        _ => None,
    }
}

/// Per-breakpoint `{prefix}-d/-t/-m` values, falling back to `{prefix}` and
/// then to `default`.
pub(crate) fn read_breakpoints(
    attrs: &Attrs,
    prefix: &str,
    default: Breakpoints<u32>,
) -> Breakpoints<u32> {
    let shared = attrs.get_any(&[prefix]).and_then(parse_positive);
    let at = |suffix: &str, fallback: u32| {
        let key = format!("{prefix}-{suffix}");
        attrs
            .get_any(&[key.as_str()])
            .and_then(parse_positive)
            .or(shared)
            .unwrap_or(fallback)
    };
    Breakpoints {
        desktop: at("d", default.desktop),
        tablet: at("t", default.tablet),
        mobile: at("m", default.mobile),
    }
}

/// Gap attributes shared by rows, sections and grids.
pub(crate) fn read_gaps(attrs: &Attrs) -> (Option<u32>, Option<u32>) {
    (
        attrs.get_any(&["gap-x", "gapX"]).and_then(parse_count),
        attrs.get_any(&["gap-y", "gapY"]).and_then(parse_count),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_markup_input_is_rejected() {
        let result = parse("  {\"widgets\": []}");
        assert!(!result.is_valid);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].kind, ErrorKind::Validation);
        assert!(result.widgets.is_empty());
    }

    #[test]
    fn empty_dashboard_is_valid() {
        let result = parse("<dashboard></dashboard>");
        assert!(result.is_valid, "{:?}", result.errors);
        assert!(result.widgets.is_empty());
        assert_eq!(result.grid_config.layout.mode(), LayoutMode::GridPerRow);
        assert_eq!(result.grid_config.max_rows, 12);
        assert_eq!(result.grid_config.row_height, 30);
    }

    #[test]
    fn legacy_grid_overrides() {
        let result = parse(r#"<dashboard max-rows="20" rowHeight="48px" cols="6"></dashboard>"#);
        assert!(result.is_valid, "{:?}", result.errors);
        assert_eq!(result.grid_config.max_rows, 20);
        assert_eq!(result.grid_config.row_height, 48);
        assert_eq!(result.grid_config.cols, 6);

        let defaults = parse(r#"<dashboard max-rows="lots" cols=""></dashboard>"#);
        assert_eq!(defaults.grid_config.max_rows, 12);
        assert_eq!(defaults.grid_config.cols, 12);
    }

    #[test]
    fn syntax_error_has_position() {
        let result = parse("<dashboard>\n  <row id=\"r1\" cols-d=\"1\" cols-t=\"1\" cols-m=\"1\">\n</dashboard>");
        assert_eq!(result.errors.len(), 1);
        let err = &result.errors[0];
        assert_eq!(err.kind, ErrorKind::Syntax);
        assert_eq!((err.line, err.column), (2, 3));
        assert!(result.widgets.is_empty());
        assert!(!result.is_valid);
    }

    #[test]
    fn unknown_layout_mode_falls_back() {
        let result = parse(r#"<dashboard layout-mode="masonry"></dashboard>"#);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].kind, ErrorKind::Validation);
        assert_eq!(result.grid_config.layout.mode(), LayoutMode::GridPerRow);
    }

    #[test]
    fn style_island_sets_overrides_and_theme() {
        let doc = r##"<dashboard theme="light" background-color="#fff" padding="12">
  <style>{"theme": "dark", "backgroundColor": "#000", "borderRadius": "6px"}</style>
</dashboard>"##;
        let result = parse(doc);
        assert!(result.is_valid, "{:?}", result.errors);
        let style = &result.grid_config.style;
        assert_eq!(style.background_color.as_deref(), Some("#000"));
        assert_eq!(style.border_radius, Some(6.0));
        assert_eq!(style.padding, Some(12.0));
        // dark theme filled the rest
        assert_eq!(style.border_color.as_deref(), Some("#404040"));
    }

    #[test]
    fn row_style_block_stays_with_the_row() {
        let doc = r##"<dashboard theme="light">
  <row id="r" cols-d="1" cols-t="1" cols-m="1">
    <style>{"theme": "dark", "backgroundColor": "#000"}</style>
    <kpi id="k"/>
  </row>
</dashboard>"##;
        let result = parse(doc);
        assert!(result.is_valid, "{:?}", result.errors);
        let style = &result.grid_config.style;
        // the light theme filled the grid, not the row's island
        assert_eq!(style.background_color.as_deref(), Some("#ffffff"));
        assert_eq!(style.border_color.as_deref(), Some("#e2e8f0"));
    }

    #[test]
    fn invalid_style_json_is_reported() {
        let result = parse("<dashboard><style>{ nope }</style></dashboard>");
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].kind, ErrorKind::Validation);
    }

    #[test]
    fn css_style_block_is_ignored() {
        let result = parse("<dashboard><style>.card { color: red }</style></dashboard>");
        assert!(result.is_valid);
    }

    #[test]
    fn breakpoint_helpers() {
        let attrs = Attrs::parse(r#"span="2" span-m="1" cols-d="0""#);
        assert_eq!(
            read_breakpoints(&attrs, "span", Breakpoints::uniform(1)),
            Breakpoints { desktop: 2, tablet: 2, mobile: 1 }
        );
        assert_eq!(
            read_breakpoints(&attrs, "cols", Breakpoints::uniform(3)),
            Breakpoints::uniform(3)
        );
        assert_eq!(parse_count("24px"), Some(24));
        assert_eq!(parse_positive("0"), None);
    }
}
