//! Lint diagnostics for parsed dashboards.
//!
//! Reports authoring issues the parser accepts without complaint. Never
//! touches `ParseResult::errors` or `is_valid`.

use crate::id::WidgetId;
use crate::model::{GridLayout, ParseResult, WidgetType};
use std::collections::HashSet;

// ─── Diagnostic types ────────────────────────────────────────────────────

/// Severity of a lint finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LintSeverity {
    /// Should be fixed; likely a mistake.
    Warning,
    /// Informational.
    Info,
}

/// What a diagnostic points at. Serialized as `{"kind": "widget", "id": "…"}`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum LintTarget {
    Widget(WidgetId),
    Group(String),
}

impl LintTarget {
    pub fn id(&self) -> &str {
        match self {
            LintTarget::Widget(id) => id.as_str(),
            LintTarget::Group(id) => id,
        }
    }
}

/// A single lint diagnostic.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LintDiagnostic {
    pub target: LintTarget,
    /// Human-readable message.
    pub message: String,
    /// Severity level.
    pub severity: LintSeverity,
    /// Short rule identifier (e.g. "duplicate-id", "dangling-row").
    pub rule: &'static str,
}

// ─── Public API ───────────────────────────────────────────────────────────

/// Run all lint rules over a parse result and return diagnostics.
#[must_use]
pub fn lint_result(result: &ParseResult) -> Vec<LintDiagnostic> {
    let mut diags = Vec::new();
    lint_duplicate_ids(result, &mut diags);
    lint_dangling_rows(result, &mut diags);
    lint_empty_groups(result, &mut diags);
    lint_missing_datasource(result, &mut diags);
    diags
}

// ─── Rules ────────────────────────────────────────────────────────────────

/// Warn once per repeated widget id.
fn lint_duplicate_ids(result: &ParseResult, diags: &mut Vec<LintDiagnostic>) {
    let mut seen = HashSet::new();
    let mut reported = HashSet::new();
    for widget in &result.widgets {
        if !seen.insert(&widget.id) && reported.insert(&widget.id) {
            diags.push(LintDiagnostic {
                target: LintTarget::Widget(widget.id.clone()),
                message: format!(
                    "Widget id `{}` is used more than once; edits and filters will hit the first one only.",
                    widget.id
                ),
                severity: LintSeverity::Warning,
                rule: "duplicate-id",
            });
        }
    }
}

/// Warn on widgets whose `row` names neither a layout row nor a section.
fn lint_dangling_rows(result: &ParseResult, diags: &mut Vec<LintDiagnostic>) {
    let config = &result.grid_config;
    for widget in &result.widgets {
        let Some(row) = widget.row.as_deref() else {
            continue;
        };
        let declared = config.layout_rows.contains_key(row)
            || config.layout.rows().is_some_and(|rows| rows.contains_key(row));
        if !declared {
            diags.push(LintDiagnostic {
                target: LintTarget::Widget(widget.id.clone()),
                message: format!("Widget `{}` refers to undeclared row `{row}`.", widget.id),
                severity: LintSeverity::Warning,
                rule: "dangling-row",
            });
        }
    }
}

fn lint_empty_groups(result: &ParseResult, diags: &mut Vec<LintDiagnostic>) {
    let GridLayout::Grid(layout) = &result.grid_config.layout else {
        return;
    };
    for group in layout.groups.iter().filter(|g| g.children.is_empty()) {
        diags.push(LintDiagnostic {
            target: LintTarget::Group(group.id.clone()),
            message: format!("Group `{}` has no widgets.", group.id),
            severity: LintSeverity::Warning,
            rule: "empty-group",
        });
    }
}

/// Info on charts and KPIs with nothing to query.
fn lint_missing_datasource(result: &ParseResult, diags: &mut Vec<LintDiagnostic>) {
    for widget in &result.widgets {
        let wants_data = widget.kind == WidgetType::Kpi || widget.kind.has_chart_config();
        let has_data = widget.data_source.as_ref().is_some_and(|ds| !ds.is_empty());
        if wants_data && !has_data {
            diags.push(LintDiagnostic {
                target: LintTarget::Widget(widget.id.clone()),
                message: format!("{} `{}` has no data source.", widget.kind, widget.id),
                severity: LintSeverity::Info,
                rule: "missing-datasource",
            });
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn rules(doc: &str) -> Vec<&'static str> {
        lint_result(&parse(doc)).iter().map(|d| d.rule).collect()
    }

    #[test]
    fn lint_duplicate_id() {
        let doc = r#"<dashboard layout-mode="grid">
  <kpi id="k"><datasource table="t" measure="SUM(x)"/></kpi>
  <kpi id="k"><datasource table="t" measure="SUM(y)"/></kpi>
  <kpi id="k"><datasource table="t" measure="SUM(z)"/></kpi>
</dashboard>"#;
        assert_eq!(rules(doc), ["duplicate-id"]);
    }

    #[test]
    fn lint_dangling_row() {
        let mut result = parse(
            r#"<dashboard><row id="r" cols-d="1" cols-t="1" cols-m="1"><kpi id="k"><datasource table="t"/></kpi></row></dashboard>"#,
        );
        assert!(lint_result(&result).is_empty());
        result.widgets[0].row = Some("gone".to_string());
        let diags = lint_result(&result);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].rule, "dangling-row");
        assert_eq!(diags[0].target, LintTarget::Widget(WidgetId::new("k")));
    }

    #[test]
    fn lint_section_rows_are_declared() {
        let doc = r#"<dashboard><section data-type="kpis" id="s"><article id="a"><main>{{ table: t }}</main></article></section></dashboard>"#;
        assert!(rules(doc).is_empty());
    }

    #[test]
    fn lint_empty_group() {
        let doc = r#"<dashboard layout-mode="grid"><group id="g"></group></dashboard>"#;
        assert_eq!(rules(doc), ["empty-group"]);
        let diags = lint_result(&parse(doc));
        assert_eq!(diags[0].target, LintTarget::Group("g".to_string()));
        assert_eq!(diags[0].target.id(), "g");
        let json = serde_json::to_value(&diags[0]).unwrap();
        assert_eq!(json["target"], serde_json::json!({"kind": "group", "id": "g"}));
    }

    #[test]
    fn lint_missing_datasource_is_info() {
        let doc = r#"<dashboard layout-mode="grid"><chart id="c" type="bar"/><widget id="i" type="insights"/></dashboard>"#;
        let result = parse(doc);
        let diags = lint_result(&result);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].severity, LintSeverity::Info);
        assert_eq!(diags[0].target.id(), "c");
        // lint never changes validity
        assert!(result.is_valid);
    }
}
