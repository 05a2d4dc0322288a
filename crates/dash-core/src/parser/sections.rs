//! Semantic-HTML authoring style:
//!
//! ```text
//! <section data-type="kpis" id="top" cols-d="4">
//!   <h2>Overview</h2>
//!   <article id="rev"><p>Revenue</p><main>{{ table: orders; measure: SUM(total) }}</main></article>
//! </section>
//! ```
//!
//! Runs before, and independently of, the layout-mode pass. Widgets from
//! both are kept side by side.

use super::visual::apply_inner_blocks;
use super::{Ctx, parse_count, read_breakpoints, read_gaps};
use crate::id::WidgetId;
use crate::markup::{Element, SyntaxError, find_elements, find_first, text_content};
use crate::model::*;
use crate::query::{data_source_from_pairs, parse_binding_pairs};
use indexmap::IndexMap;
use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SectionKind {
    Kpis,
    Charts,
}

impl SectionKind {
    fn default_columns(self) -> Breakpoints<u32> {
        match self {
            Self::Kpis => Breakpoints {
                desktop: 4,
                tablet: 2,
                mobile: 1,
            },
            Self::Charts => Breakpoints {
                desktop: 2,
                tablet: 1,
                mobile: 1,
            },
        }
    }
}

pub(crate) fn parse_sections(
    ctx: &mut Ctx<'_>,
    body: Range<usize>,
    layout_rows: &mut IndexMap<String, RowSpec>,
) -> Result<(), SyntaxError> {
    let doc = ctx.doc;
    for (ordinal, section) in find_elements(doc, body, &["section"])?.into_iter().enumerate() {
        if !section.closed {
            return Err(SyntaxError::unclosed(&section));
        }
        let kind = match section.attrs.get_any(&["data-type"]) {
            Some("kpis") => SectionKind::Kpis,
            Some("charts") => SectionKind::Charts,
            other => {
                log::debug!("ignoring <section> with data-type {other:?}");
                continue;
            }
        };
        let section_id = section
            .attrs
            .get_any(&["id"])
            .map(str::to_string)
            .unwrap_or_else(|| format!("section-{}", ordinal + 1));

        let columns = read_breakpoints(&section.attrs, "cols", kind.default_columns());
        let (gap_x, gap_y) = read_gaps(&section.attrs);
        let mut spec = RowSpec::new(columns, gap_x, gap_y);

        let inner = section
            .inner
            .clone()
            .unwrap_or(section.open_end..section.open_end);
        let articles = find_elements(doc, inner.clone(), &["article"])?;
        let heading_end = articles.first().map_or(inner.end, |a| a.start);
        spec.title = find_elements(doc, inner.start..heading_end, &["h1", "h2", "h3"])?
            .first()
            .map(|h| text_content(h.inner_str(doc)))
            .filter(|t| !t.is_empty());
        layout_rows.insert(section_id.clone(), spec);

        for (index, article) in articles.iter().enumerate() {
            let Some(id) = article.attrs.get_any(&["id"]) else {
                ctx.validation(
                    article.start,
                    format!("<article> in section \"{section_id}\" is missing an id; skipped"),
                );
                continue;
            };
            let widget = build_article(ctx, article, id, &section_id, kind, index)?;
            ctx.widgets.push(widget);
        }
    }
    Ok(())
}

fn build_article(
    ctx: &mut Ctx<'_>,
    article: &Element,
    id: &str,
    section_id: &str,
    kind: SectionKind,
    index: usize,
) -> Result<Widget, SyntaxError> {
    let doc = ctx.doc;
    let inner = article
        .inner
        .clone()
        .unwrap_or(article.open_end..article.open_end);
    let main = find_first(doc, inner.clone(), "main")?;

    let widget_type = match (kind, &main) {
        (SectionKind::Kpis, _) => WidgetType::Kpi,
        (SectionKind::Charts, Some(main)) => match main.attrs.get_any(&["chart", "type"]) {
            Some(raw) => WidgetType::parse(raw).unwrap_or_else(|| {
                ctx.validation(
                    main.start,
                    format!("Article \"{id}\" has unknown chart type \"{raw}\"; using bar"),
                );
                WidgetType::Bar
            }),
            None => WidgetType::Bar,
        },
        (SectionKind::Charts, None) => WidgetType::Bar,
    };

    let mut widget = Widget::new(WidgetId::new(id), widget_type);
    widget.row = Some(section_id.to_string());

    // Title: first heading or paragraph outside <main>.
    widget.title = find_elements(doc, inner.clone(), &["main", "p", "h1", "h2", "h3"])?
        .iter()
        .filter(|el| el.name != "main")
        .map(|el| text_content(el.inner_str(doc)))
        .find(|t| !t.is_empty());

    let bindings_text = match &main {
        Some(main) => main.inner_str(doc),
        None => &doc[inner.clone()],
    };
    let pairs = parse_binding_pairs(bindings_text);
    if let Some((_, title)) = pairs.iter().find(|(k, _)| k == "title") {
        widget.title = Some(title.clone());
    }
    let data_source = data_source_from_pairs(&pairs);
    if !data_source.is_empty() {
        widget.data_source = Some(data_source);
    }

    let a = &article.attrs;
    widget.order = a
        .get_any(&["order"])
        .and_then(|o| o.parse::<i32>().ok())
        .or(Some(index as i32 + 1));
    widget.span = Some(read_breakpoints(a, "span", Breakpoints::uniform(1)));
    widget.height_px = a.get_any(&["height"]).and_then(parse_count);

    apply_inner_blocks(ctx, &mut widget, article)?;
    Ok(widget)
}
