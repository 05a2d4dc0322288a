//! `grid` mode: one shared column grid, optional `<group>` clusters.

use super::visual::parse_visual_attributes;
use super::{Ctx, VISUAL_TAGS, parse_json_island, parse_positive, read_breakpoints, read_gaps};
use crate::markup::{Attrs, SyntaxError, exclude_ranges, find_elements};
use crate::model::*;
use std::ops::Range;

/// Dashboard grid: `cols-d` (default 12), `cols-t` (default desktop),
/// `cols-m` (default 1).
pub(crate) fn dashboard_columns(dash: &Attrs) -> Breakpoints<u32> {
    let desktop = dash
        .get_any(&["cols-d"])
        .and_then(parse_positive)
        .unwrap_or(12);
    Breakpoints {
        desktop,
        tablet: dash
            .get_any(&["cols-t"])
            .and_then(parse_positive)
            .unwrap_or(desktop),
        mobile: dash
            .get_any(&["cols-m"])
            .and_then(parse_positive)
            .unwrap_or(1),
    }
}

pub(crate) fn parse_grid(
    ctx: &mut Ctx<'_>,
    dash: &Attrs,
    body: Range<usize>,
) -> Result<GridLayout, SyntaxError> {
    let doc = ctx.doc;
    let columns = dashboard_columns(dash);
    let (gap_x, gap_y) = read_gaps(dash);

    let mut groups = Vec::new();
    let mut holes = Vec::new();
    for el in find_elements(doc, body.clone(), &["group"])? {
        if !el.closed {
            return Err(SyntaxError::unclosed(&el));
        }
        holes.push(el.span());
        let Some(id) = el.attrs.get_any(&["id"]) else {
            ctx.validation(el.start, "<group> is missing an id; group skipped");
            continue;
        };

        let a = &el.attrs;
        let has_grid = ["cols", "cols-d", "cols-t", "cols-m"].iter().any(|k| a.has(k));
        let (group_gap_x, group_gap_y) = read_gaps(a);
        let mut group = GroupSpec {
            id: id.to_string(),
            title: a.get_any(&["title"]).map(str::to_string),
            orientation: match a.get_any(&["orientation"]) {
                Some(o) if o.eq_ignore_ascii_case("vertical") => Orientation::Vertical,
                _ => Orientation::Horizontal,
            },
            sizing: match a.get_any(&["sizing"]) {
                Some(s) if s.eq_ignore_ascii_case("auto") => Sizing::Auto,
                _ => Sizing::Fr,
            },
            columns: has_grid.then(|| read_breakpoints(a, "cols", columns)),
            gap_x: group_gap_x,
            gap_y: group_gap_y,
            style: None,
            children: Vec::new(),
        };

        let Some(inner) = el.inner.clone() else {
            groups.push(group);
            continue;
        };
        let mut scopes = Vec::new();
        for child in find_elements(doc, inner, &["style", "kpi", "chart", "widget"])? {
            if child.name == "style" {
                let what = format!("<style> of group \"{}\"", group.id);
                if let Some(obj) = parse_json_island(ctx, child.inner_str(doc), child.start, &what) {
                    group.style.get_or_insert_with(JsonObject::new).extend(obj);
                }
            } else {
                scopes.push(child);
            }
        }
        for child in scopes {
            if let Some(widget) = parse_visual_attributes(ctx, &child, None)? {
                group.children.push(widget.id.clone());
                ctx.widgets.push(widget);
            }
        }
        groups.push(group);
    }

    for range in exclude_ranges(body, &holes) {
        for el in find_elements(doc, range, VISUAL_TAGS)? {
            if let Some(widget) = parse_visual_attributes(ctx, &el, None)? {
                ctx.widgets.push(widget);
            }
        }
    }

    log::trace!("grid mode: {} groups", groups.len());
    Ok(GridLayout::Grid(GridModeLayout {
        columns,
        gap_x,
        gap_y,
        groups,
    }))
}
