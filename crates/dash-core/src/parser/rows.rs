//! `grid-per-row` mode: `<row>` blocks with per-breakpoint column counts.

use super::visual::{apply_inner_blocks, build_widget_from_attrs_with_default};
use super::{Ctx, VISUAL_TAGS, parse_positive, read_gaps};
use crate::markup::{SyntaxError, find_elements};
use crate::model::*;
use indexmap::IndexMap;
use std::ops::Range;

pub(crate) fn parse_rows(ctx: &mut Ctx<'_>, body: Range<usize>) -> Result<GridLayout, SyntaxError> {
    let doc = ctx.doc;
    let mut rows = IndexMap::new();

    for (ordinal, row) in find_elements(doc, body, &["row"])?.into_iter().enumerate() {
        if !row.closed {
            return Err(SyntaxError::unclosed(&row));
        }
        let id = match row.attrs.get_any(&["id"]) {
            Some(id) => id.to_string(),
            None => {
                let id = format!("row-{}", ordinal + 1);
                ctx.validation(row.start, format!("<row> is missing an id; using \"{id}\""));
                id
            }
        };

        let mut missing = Vec::new();
        let mut count = |key: &'static str| match row.attrs.get_any(&[key]).and_then(parse_positive) {
            Some(n) => n,
            None => {
                missing.push(key);
                1
            }
        };
        let columns = Breakpoints {
            desktop: count("cols-d"),
            tablet: count("cols-t"),
            mobile: count("cols-m"),
        };
        if !missing.is_empty() {
            ctx.validation(
                row.start,
                format!(
                    "Row \"{id}\" must declare {} with a positive integer; using 1",
                    missing.join(", ")
                ),
            );
        }

        let (gap_x, gap_y) = read_gaps(&row.attrs);
        let mut spec = RowSpec::new(columns, gap_x, gap_y);
        spec.title = row.attrs.get_any(&["title"]).map(str::to_string);
        rows.insert(id.clone(), spec);

        let Some(inner) = row.inner.clone() else {
            continue;
        };
        let mut cursor = inner.start;
        for el in find_elements(doc, inner, VISUAL_TAGS)? {
            let pre_html = doc[cursor..el.start].trim();
            cursor = el.end;
            let default_type = (el.name == "kpi").then_some(WidgetType::Kpi);
            let Some(mut widget) =
                build_widget_from_attrs_with_default(ctx, &el.attrs, el.start, &id, default_type)
            else {
                continue;
            };
            if !pre_html.is_empty() {
                widget.pre_html = Some(pre_html.to_string());
            }
            apply_inner_blocks(ctx, &mut widget, &el)?;
            ctx.widgets.push(widget);
        }
    }

    log::trace!("rows mode: {} rows", rows.len());
    Ok(GridLayout::GridPerRow(RowModeLayout { rows }))
}

#[cfg(test)]
mod tests {
    use crate::model::*;
    use crate::parser::parse;

    #[test]
    fn rows_and_widgets() {
        let doc = r#"<dashboard>
  <row id="r1" cols-d="4" cols-t="2" cols-m="1" gap-x="16">
    <kpi id="k1" title="Revenue" span-d="2"/>
    <chart id="c1" type="bar"></chart>
  </row>
</dashboard>"#;
        let result = parse(doc);
        assert!(result.is_valid, "{:?}", result.errors);
        let rows = result.grid_config.layout.rows().unwrap();
        let r1 = &rows["r1"];
        assert_eq!(r1.desktop.columns, 4);
        assert_eq!(r1.tablet.columns, 2);
        assert_eq!(r1.mobile.gap_x, Some(16));
        assert_eq!(result.widgets.len(), 2);
        let k1 = result.widget("k1").unwrap();
        assert_eq!(k1.row.as_deref(), Some("r1"));
        assert_eq!(k1.span.unwrap().desktop, 2);
        assert_eq!(result.widget("c1").unwrap().kind, WidgetType::Bar);
    }

    #[test]
    fn missing_breakpoint_is_one_error() {
        let doc = r#"<dashboard><row id="r1" cols-d="3" cols-m="1"><kpi id="k"/></row></dashboard>"#;
        let result = parse(doc);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].message.contains("cols-t"));
        let r1 = &result.grid_config.layout.rows().unwrap()["r1"];
        assert_eq!(r1.tablet.columns, 1);
        assert_eq!(r1.desktop.columns, 3);
        assert_eq!(result.widgets.len(), 1);
    }

    #[test]
    fn row_without_id_uses_ordinal() {
        let doc = r#"<dashboard><row cols-d="1" cols-t="1" cols-m="1"><kpi id="k"/></row></dashboard>"#;
        let result = parse(doc);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.widget("k").unwrap().row.as_deref(), Some("row-1"));
    }

    #[test]
    fn markup_between_visuals_becomes_pre_html() {
        let doc = r#"<dashboard><row id="r" cols-d="2" cols-t="1" cols-m="1">
  <kpi id="a"/>
  <h3>Trends</h3>
  <chart id="b" type="line"/>
</row></dashboard>"#;
        let result = parse(doc);
        assert!(result.widget("a").unwrap().pre_html.is_none());
        assert_eq!(result.widget("b").unwrap().pre_html.as_deref(), Some("<h3>Trends</h3>"));
    }

    #[test]
    fn chart_requires_type() {
        let doc = r#"<dashboard><row id="r" cols-d="1" cols-t="1" cols-m="1"><chart id="c"/></row></dashboard>"#;
        let result = parse(doc);
        assert_eq!(result.errors.len(), 1);
        assert!(result.widgets.is_empty());
    }
}
