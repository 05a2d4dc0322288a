//! `grid-per-column` mode: vertical columns, optionally declared with
//! numbered `<column>` wrappers.

use super::visual::parse_visual_attributes;
use super::{Ctx, VISUAL_TAGS, parse_positive, read_breakpoints};
use crate::markup::{Attrs, SyntaxError, find_elements};
use crate::model::*;
use indexmap::IndexMap;
use std::ops::Range;

pub(crate) fn parse_columns(
    ctx: &mut Ctx<'_>,
    dash: &Attrs,
    body: Range<usize>,
) -> Result<GridLayout, SyntaxError> {
    let doc = ctx.doc;
    let columns = read_breakpoints(
        dash,
        "cols",
        Breakpoints {
            desktop: 3,
            tablet: 2,
            mobile: 1,
        },
    );
    let text = |key: &str| dash.get_any(&[key]).map(str::to_string);
    let template = ColumnsTemplate {
        desktop: text("template-d"),
        tablet: text("template-t"),
        mobile: text("template-m"),
    };

    let wrappers = find_elements(doc, body.clone(), &["column"])?;
    let columns_inner = if wrappers.is_empty() {
        for el in find_elements(doc, body, VISUAL_TAGS)? {
            if let Some(widget) = parse_visual_attributes(ctx, &el, None)? {
                ctx.widgets.push(widget);
            }
        }
        None
    } else {
        let mut inner_specs = IndexMap::new();
        for col in wrappers {
            if !col.closed {
                return Err(SyntaxError::unclosed(&col));
            }
            let raw_id = col.attrs.get_any(&["id"]).unwrap_or("");
            let Some(number) = parse_positive(raw_id) else {
                ctx.validation(
                    col.start,
                    format!("<column> id must be a positive integer, got \"{raw_id}\"; column skipped"),
                );
                continue;
            };
            inner_specs.insert(
                number.to_string(),
                ColumnSpec {
                    span: read_breakpoints(&col.attrs, "cols", Breakpoints::uniform(1)),
                    label: col.attrs.get_any(&["label", "title"]).map(str::to_string),
                },
            );
            let Some(inner) = col.inner.clone() else {
                continue;
            };
            for el in find_elements(doc, inner, VISUAL_TAGS)? {
                if let Some(widget) = parse_visual_attributes(ctx, &el, Some(number))? {
                    ctx.widgets.push(widget);
                }
            }
        }
        Some(inner_specs)
    };

    Ok(GridLayout::GridPerColumn(ColumnModeLayout {
        columns,
        columns_template: (!template.is_empty()).then_some(template),
        columns_inner,
    }))
}

#[cfg(test)]
mod tests {
    use crate::model::*;
    use crate::parser::parse;

    #[test]
    fn numbered_columns_seed_grid_start() {
        let doc = r#"<dashboard layout-mode="grid-per-column" cols-d="2" template-d="2fr 1fr">
  <column id="1" label="Left"><kpi id="a"/><chart id="b" type="bar" col-d="2"/></column>
  <column id="2"><chart id="c" type="pie"/></column>
</dashboard>"#;
        let result = parse(doc);
        assert!(result.is_valid, "{:?}", result.errors);
        let GridLayout::GridPerColumn(layout) = &result.grid_config.layout else {
            panic!("expected grid-per-column layout");
        };
        assert_eq!(layout.columns.desktop, 2);
        assert_eq!(
            layout.columns_template.as_ref().unwrap().desktop.as_deref(),
            Some("2fr 1fr")
        );
        let inner = layout.columns_inner.as_ref().unwrap();
        assert_eq!(inner["1"].label.as_deref(), Some("Left"));
        assert_eq!(inner.len(), 2);

        let a = result.widget("a").unwrap().grid_start.clone().unwrap();
        assert_eq!((a.desktop, a.mobile), (Some(1), Some(1)));
        let b = result.widget("b").unwrap().grid_start.clone().unwrap();
        assert_eq!((b.desktop, b.tablet), (Some(2), Some(1)));
        assert_eq!(result.widget("c").unwrap().grid_start.clone().unwrap().desktop, Some(2));
    }

    #[test]
    fn without_wrappers_visuals_are_global() {
        let doc = r#"<dashboard layout-mode="grid-per-column"><kpi id="a"/><chart id="b" type="area"/></dashboard>"#;
        let result = parse(doc);
        assert!(result.is_valid);
        assert_eq!(result.widgets.len(), 2);
        assert!(result.widget("a").unwrap().grid_start.is_none());
        let GridLayout::GridPerColumn(layout) = &result.grid_config.layout else {
            panic!("expected grid-per-column layout");
        };
        assert!(layout.columns_inner.is_none());
        assert!(layout.columns_template.is_none());
    }

    #[test]
    fn bad_column_id_is_skipped() {
        let doc = r#"<dashboard layout-mode="grid-per-column"><column id="left"><kpi id="a"/></column></dashboard>"#;
        let result = parse(doc);
        assert_eq!(result.errors.len(), 1);
        assert!(result.widgets.is_empty());
    }
}
