//! Widget builders shared by the layout passes.

use super::{Ctx, parse_count, parse_json_island, parse_positive, read_breakpoints};
use crate::id::WidgetId;
use crate::markup::{Attrs, Element, SyntaxError, find_elements, text_content};
use crate::model::*;
use crate::query::data_source_from_attrs;
use crate::styling::apply_styling_tokens;

/// Row-mode builder: identity, title, order, spans and height from the
/// attributes only. Inner blocks are the caller's job.
///
/// Returns `None` after reporting a validation error when `id` is missing
/// or the type is missing or unknown.
pub(crate) fn build_widget_from_attrs_with_default(
    ctx: &mut Ctx<'_>,
    attrs: &Attrs,
    offset: usize,
    row_id: &str,
    default_type: Option<WidgetType>,
) -> Option<Widget> {
    let (id, kind) = identify(ctx, attrs, offset, default_type)?;
    let mut widget = Widget::new(id, kind);
    apply_common_attrs(&mut widget, attrs);
    widget.row = Some(row_id.to_string());
    Some(widget)
}

/// Grid and grid-per-column builder. Besides the common attributes it
/// reads explicit start columns (`col`, `col-d/-t/-m`, falling back to
/// `default_start`), fractional widths and every inner block.
pub(crate) fn parse_visual_attributes(
    ctx: &mut Ctx<'_>,
    el: &Element,
    default_start: Option<u32>,
) -> Result<Option<Widget>, SyntaxError> {
    let default_type = (el.name == "kpi").then_some(WidgetType::Kpi);
    let Some((id, kind)) = identify(ctx, &el.attrs, el.start, default_type) else {
        return Ok(None);
    };
    let mut widget = Widget::new(id, kind);
    apply_common_attrs(&mut widget, &el.attrs);

    let attrs = &el.attrs;
    let shared_col = attrs.get_any(&["col"]).and_then(parse_positive);
    let start = |key: &str| {
        attrs
            .get_any(&[key])
            .and_then(parse_positive)
            .or(shared_col)
            .or(default_start)
    };
    let grid_start = GridStart {
        desktop: start("col-d"),
        tablet: start("col-t"),
        mobile: start("col-m"),
    };
    if !grid_start.is_empty() {
        widget.grid_start = Some(grid_start);
    }

    let shared_width = attrs.get_any(&["width"]).and_then(fraction);
    let width = |key: &str| {
        attrs
            .get_any(&[key])
            .and_then(fraction)
            .or_else(|| shared_width.clone())
    };
    let width_fr = WidthFr {
        desktop: width("width-d"),
        tablet: width("width-t"),
        mobile: width("width-m"),
    };
    if !width_fr.is_empty() {
        widget.width_fr = Some(width_fr);
    }

    apply_inner_blocks(ctx, &mut widget, el)?;
    Ok(Some(widget))
}

fn identify(
    ctx: &mut Ctx<'_>,
    attrs: &Attrs,
    offset: usize,
    default_type: Option<WidgetType>,
) -> Option<(WidgetId, WidgetType)> {
    let Some(id) = attrs.get_any(&["id"]) else {
        ctx.validation(offset, "Widget is missing required attribute \"id\"");
        return None;
    };
    let kind = match (attrs.get_any(&["type"]), default_type) {
        (Some(raw), _) => match WidgetType::parse(raw) {
            Some(kind) => kind,
            None => {
                ctx.validation(offset, format!("Widget \"{id}\" has unknown type \"{raw}\""));
                return None;
            }
        },
        (None, Some(kind)) => kind,
        (None, None) => {
            ctx.validation(
                offset,
                format!("Widget \"{id}\" is missing required attribute \"type\""),
            );
            return None;
        }
    };
    Some((WidgetId::new(id), kind))
}

fn apply_common_attrs(widget: &mut Widget, attrs: &Attrs) {
    widget.title = attrs.get_any(&["title"]).map(str::to_string);
    widget.order = attrs
        .get_any(&["order"])
        .and_then(|o| o.parse::<i32>().ok());
    widget.height_px = attrs.get_any(&["height"]).and_then(parse_count);
    widget.span = Some(read_breakpoints(attrs, "span", Breakpoints::uniform(1)));
    if let Some(order) = attrs.get_any(&["titles-order", "titlesOrder"]) {
        let parts: smallvec::SmallVec<[String; 4]> = order
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect();
        if !parts.is_empty() {
            widget.kpi_titles_order = Some(parts);
        }
    }
}

/// Width values are only honoured in `fr` units.
fn fraction(s: &str) -> Option<String> {
    let s = s.trim();
    let number = s.strip_suffix("fr")?;
    number.trim().parse::<f64>().ok()?;
    Some(s.to_string())
}

// ─── Inner blocks ────────────────────────────────────────────────────────

/// Apply `<config>`, `<datasource/>`, `<styling/>`, `<style>` and `<items>`
/// children of a paired visual or article.
pub(crate) fn apply_inner_blocks(
    ctx: &mut Ctx<'_>,
    widget: &mut Widget,
    el: &Element,
) -> Result<(), SyntaxError> {
    let Some(inner) = el.inner.clone() else {
        return Ok(());
    };
    let doc = ctx.doc;
    let blocks = find_elements(doc, inner, &["config", "datasource", "styling", "style", "items"])?;
    for block in blocks {
        match block.name {
            "config" => apply_config(ctx, widget, &block),
            "datasource" => widget.data_source = Some(data_source_from_attrs(&block.attrs)),
            "styling" => {
                if let Some(tw) = block.attrs.get_any(&["tw", "class"]) {
                    apply_styling_tokens(widget.styling_target(), tw);
                }
            }
            "style" => {
                let what = format!("<style> of widget \"{}\"", widget.id);
                if let Some(obj) = parse_json_island(ctx, block.inner_str(doc), block.start, &what) {
                    widget
                        .container_style
                        .get_or_insert_with(JsonObject::new)
                        .extend(obj);
                }
            }
            "items" => apply_items(ctx, widget, &block)?,
            _ => {}
        }
    }
    Ok(())
}

fn apply_config(ctx: &mut Ctx<'_>, widget: &mut Widget, block: &Element) {
    let body = block.inner_str(ctx.doc).trim();
    if body.is_empty() {
        return;
    }
    let obj = match serde_json::from_str::<JsonObject>(body) {
        Ok(obj) => obj,
        Err(e) => {
            ctx.validation(
                block.start,
                format!("Invalid JSON in <config> of widget \"{}\": {e}", widget.id),
            );
            return;
        }
    };
    if let Err(e) = widget.config_mut().merge_json(obj) {
        ctx.validation(
            block.start,
            format!(
                "<config> of widget \"{}\" does not fit a {} widget: {e}",
                widget.id, widget.kind
            ),
        );
    }
}

fn apply_items(ctx: &mut Ctx<'_>, widget: &mut Widget, block: &Element) -> Result<(), SyntaxError> {
    if widget.kind != WidgetType::Insights2 {
        log::debug!("ignoring <items> on {} widget {}", widget.kind, widget.id);
        return Ok(());
    }
    let doc = ctx.doc;
    let mut items = Vec::new();
    if let Some(inner) = block.inner.clone() {
        for item in find_elements(doc, inner, &["item"])? {
            let a = &item.attrs;
            let Some(id) = a.get_any(&["id"]) else {
                ctx.validation(item.start, format!("<item> in widget \"{}\" has no id", widget.id));
                continue;
            };
            let text = |names: &[&str]| a.get_any(names).map(str::to_string);
            let link = ItemLink {
                text: text(&["link-text", "linkText"]),
                href: text(&["link-href", "linkHref", "href"]),
            };
            let label = text(&["label"]).or_else(|| {
                let body = text_content(item.inner_str(doc));
                (!body.is_empty()).then_some(body)
            });
            items.push(InsightItem {
                id: id.to_string(),
                variant: text(&["variant"]),
                icon: text(&["icon"]),
                label,
                link: (link != ItemLink::default()).then_some(link),
                tail: text(&["tail"]),
            });
        }
    }
    let title = block.attrs.get_any(&["title"]).map(str::to_string);
    if let WidgetConfig::Insights2(cfg) = widget.config_mut() {
        if title.is_some() {
            cfg.title = title;
        }
        cfg.items.extend(items);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::model::*;
    use crate::parser::parse;

    fn grid_doc(visuals: &str) -> String {
        format!(r#"<dashboard layout-mode="grid" cols-d="12">{visuals}</dashboard>"#)
    }

    #[test]
    fn missing_id_and_type_are_reported() {
        let result = parse(&grid_doc(r#"<chart type="bar"/><chart id="c"/><chart id="d" type="donut"/>"#));
        assert_eq!(result.errors.len(), 3);
        assert!(result.widgets.is_empty());
    }

    #[test]
    fn kpi_tag_defaults_type() {
        let result = parse(&grid_doc(r#"<kpi id="k1" title="Revenue" order="2" height="120px"/>"#));
        let w = result.widget("k1").unwrap();
        assert_eq!(w.kind, WidgetType::Kpi);
        assert_eq!(w.title.as_deref(), Some("Revenue"));
        assert_eq!(w.order, Some(2));
        assert_eq!(w.height_px, Some(120));
        assert_eq!(w.span, Some(Breakpoints::uniform(1)));
    }

    #[test]
    fn titles_order_is_split_and_trimmed() {
        let result = parse(&grid_doc(
            r#"<kpi id="k" titles-order="Revenue, Orders,,Ticket "/><kpi id="bare"/>"#,
        ));
        let order = result.widget("k").unwrap().kpi_titles_order.clone().unwrap();
        assert_eq!(order.as_slice(), ["Revenue", "Orders", "Ticket"]);
        assert!(result.widget("bare").unwrap().kpi_titles_order.is_none());

        let json = serde_json::to_value(result.widget("k").unwrap()).unwrap();
        assert_eq!(json["kpiTitlesOrder"], serde_json::json!(["Revenue", "Orders", "Ticket"]));
    }

    #[test]
    fn width_only_in_fr() {
        let result = parse(&grid_doc(r#"<chart id="c" type="line" width="2fr" width-m="100px"/>"#));
        let width = result.widget("c").unwrap().width_fr.clone().unwrap();
        assert_eq!(width.desktop.as_deref(), Some("2fr"));
        assert_eq!(width.tablet.as_deref(), Some("2fr"));
        assert_eq!(width.mobile.as_deref(), Some("2fr"));
    }

    #[test]
    fn shared_width_fills_every_unset_breakpoint() {
        let result = parse(&grid_doc(
            r#"<chart id="a" type="bar" width="1fr" width-t="3fr"/><kpi id="b" width-d="2fr"/>"#,
        ));
        let a = result.widget("a").unwrap().width_fr.clone().unwrap();
        assert_eq!(a.desktop.as_deref(), Some("1fr"));
        assert_eq!(a.tablet.as_deref(), Some("3fr"));
        assert_eq!(a.mobile.as_deref(), Some("1fr"));
        let b = result.widget("b").unwrap().width_fr.clone().unwrap();
        assert_eq!(b.desktop.as_deref(), Some("2fr"));
        assert!(b.tablet.is_none());
        assert!(b.mobile.is_none());
    }

    #[test]
    fn grid_start_per_breakpoint() {
        let result = parse(&grid_doc(r#"<chart id="c" type="bar" col="3" col-m="1"/>"#));
        let start = result.widget("c").unwrap().grid_start.clone().unwrap();
        assert_eq!(start.desktop, Some(3));
        assert_eq!(start.tablet, Some(3));
        assert_eq!(start.mobile, Some(1));
    }

    #[test]
    fn inner_blocks() {
        let doc = grid_doc(
            r##"<chart id="c" type="pie">
  <config>{"innerRadius": 0.5, "styling": {"showLegend": false}}</config>
  <datasource table="sales.orders" dimension="region" measure="SUM(total)"/>
  <styling tw="legend:on color:#ff0000"/>
  <style>{"boxShadow": "none"}</style>
</chart>"##,
        );
        let result = parse(&doc);
        assert!(result.is_valid, "{:?}", result.errors);
        let w = result.widget("c").unwrap();
        let styling = w.styling().unwrap();
        assert_eq!(styling.show_legend, Some(true));
        assert_eq!(styling.colors.as_ref().unwrap()[0], "#ff0000");
        let chart = w.config.as_ref().and_then(WidgetConfig::as_chart).unwrap();
        assert_eq!(chart.extra["innerRadius"], 0.5);
        let ds = w.data_source.as_ref().unwrap();
        assert_eq!(ds.schema.as_deref(), Some("sales"));
        assert_eq!(w.container_style.as_ref().unwrap()["boxShadow"], "none");
    }

    #[test]
    fn invalid_config_keeps_widget() {
        let result = parse(&grid_doc(r#"<kpi id="k"><config>{oops</config></kpi>"#));
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].kind, ErrorKind::Validation);
        assert!(result.widget("k").is_some());
    }

    #[test]
    fn insights2_items() {
        let doc = grid_doc(
            r#"<chart id="ins" type="insights2">
  <items title="Highlights">
    <item id="i1" variant="risk" label="Churn up" link-text="See" link-href="/churn" tail="3d"/>
    <item id="i2" icon="star">Top seller</item>
  </items>
</chart>"#,
        );
        let result = parse(&doc);
        assert!(result.is_valid, "{:?}", result.errors);
        match &result.widget("ins").unwrap().config {
            Some(WidgetConfig::Insights2(cfg)) => {
                assert_eq!(cfg.title.as_deref(), Some("Highlights"));
                assert_eq!(cfg.items.len(), 2);
                assert_eq!(cfg.items[0].link.as_ref().unwrap().href.as_deref(), Some("/churn"));
                assert_eq!(cfg.items[1].label.as_deref(), Some("Top seller"));
                assert!(cfg.items[1].link.is_none());
            }
            other => panic!("expected insights2 config, got {other:?}"),
        }
    }

    #[test]
    fn items_ignored_on_other_types() {
        let result = parse(&grid_doc(
            r#"<chart id="b" type="bar"><items><item id="x"/></items></chart>"#,
        ));
        assert!(result.is_valid);
        assert!(result.widget("b").unwrap().config.is_none());
    }
}
