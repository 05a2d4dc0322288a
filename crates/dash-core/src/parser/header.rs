//! Dashboard header (`<header>` or legacy title attributes) and the
//! initial global date range.

use super::{Ctx, parse_number};
use crate::markup::{Attrs, SyntaxError, find_elements, find_first, text_content};
use crate::model::*;
use std::ops::Range;

/// What the header pass contributes to the result.
#[derive(Debug, Default)]
pub(crate) struct HeaderInfo {
    pub config: Option<HeaderConfig>,
    pub title: Option<String>,
    pub subtitle: Option<String>,
}

pub(crate) fn parse_header(
    ctx: &mut Ctx<'_>,
    dash: &Attrs,
    dash_at: usize,
    body: Range<usize>,
) -> Result<HeaderInfo, SyntaxError> {
    let doc = ctx.doc;
    let legacy_title = dash.get_any(&["title"]);
    let legacy_subtitle = dash.get_any(&["subtitle"]);

    let Some(header) = find_first(doc, body, "header")? else {
        if legacy_title.is_none() && legacy_subtitle.is_none() {
            return Ok(HeaderInfo::default());
        }
        ctx.warning(
            dash_at,
            "<dashboard title/subtitle> attributes are deprecated; use a <header> block",
        );
        let line = |text: &str| HeaderText {
            text: text.to_string(),
            typography: Typography::default(),
        };
        return Ok(HeaderInfo {
            config: Some(HeaderConfig {
                title: legacy_title.map(line),
                subtitle: legacy_subtitle.map(line),
                ..HeaderConfig::default()
            }),
            title: legacy_title.map(str::to_string),
            subtitle: legacy_subtitle.map(str::to_string),
        });
    };
    if !header.closed {
        return Err(SyntaxError::unclosed(&header));
    }

    let inner = header
        .inner
        .clone()
        .unwrap_or(header.open_end..header.open_end);
    let mut lines = find_elements(doc, inner.clone(), &["p"])?
        .into_iter()
        .map(|p| HeaderText {
            text: text_content(p.inner_str(doc)),
            typography: read_typography(&p.attrs),
        });
    let title = lines.next();
    let subtitle = lines.next();

    let picker = find_elements(doc, inner, &["daterange", "datepicker"])?
        .into_iter()
        .next()
        .map(|el| read_date_picker(&el.attrs));

    let a = &header.attrs;
    let config = HeaderConfig {
        background_color: a
            .get_any(&["background-color", "backgroundColor"])
            .map(str::to_string),
        align: a.get_any(&["align", "text-align"]).map(str::to_string),
        date_picker: picker,
        title,
        subtitle,
    };
    Ok(HeaderInfo {
        title: config.title.as_ref().map(|t| t.text.clone()),
        subtitle: config.subtitle.as_ref().map(|t| t.text.clone()),
        config: Some(config),
    })
}

fn read_typography(a: &Attrs) -> Typography {
    let text = |names: &[&str]| a.get_any(names).map(str::to_string);
    let number = |names: &[&str]| a.get_any(names).and_then(parse_number);
    Typography {
        font_family: text(&["font-family", "fontFamily"]),
        font_size: number(&["font-size", "fontSize"]),
        font_weight: text(&["font-weight", "fontWeight"]),
        color: text(&["color"]),
        letter_spacing: text(&["letter-spacing", "letterSpacing"]),
        line_height: text(&["line-height", "lineHeight"]),
        margin_top: number(&["margin-top", "marginTop"]),
        margin_bottom: number(&["margin-bottom", "marginBottom"]),
        text_align: text(&["align", "text-align", "textAlign"]),
        text_transform: text(&["text-transform", "textTransform"]),
    }
}

fn read_date_picker(a: &Attrs) -> DatePickerConfig {
    let text = |names: &[&str]| a.get_any(names).map(str::to_string);
    DatePickerConfig {
        visible: !matches!(a.get_any(&["visible"]), Some("false" | "off" | "0")),
        kind: text(&["type", "default"]),
        start_date: text(&["start", "start-date", "startDate"]),
        end_date: text(&["end", "end-date", "endDate"]),
        label: text(&["label"]),
        align: text(&["align"]),
        show_presets: a
            .get_any(&["show-presets", "showPresets"])
            .map(|v| matches!(v, "true" | "on" | "1")),
    }
}

// ─── Global date range ───────────────────────────────────────────────────

/// Initial `globalFilters.dateRange`. A dashboard `date-type`/`data-type`
/// attribute wins over the header picker's default.
pub(crate) fn parse_global_filters(
    ctx: &mut Ctx<'_>,
    dash: &Attrs,
    dash_at: usize,
    header: Option<&HeaderConfig>,
) -> Option<GlobalFilters> {
    let range = match dash.get_any(&["date-type", "data-type", "dateType"]) {
        Some(raw) => dashboard_range(ctx, dash, dash_at, raw)?,
        None => {
            let picker = header?.date_picker.as_ref()?;
            DateRange {
                kind: picker.kind.clone()?,
                start_date: picker.start_date.clone(),
                end_date: picker.end_date.clone(),
            }
        }
    };
    Some(GlobalFilters {
        date_range: Some(range),
    })
}

fn dashboard_range(ctx: &mut Ctx<'_>, dash: &Attrs, dash_at: usize, raw: &str) -> Option<DateRange> {
    let custom = |start: &str, end: &str| DateRange {
        kind: "custom".to_string(),
        start_date: Some(start.trim().to_string()),
        end_date: Some(end.trim().to_string()),
    };

    if let Some(bounds) = raw.strip_prefix("custom:") {
        return match bounds.split_once(',') {
            Some((start, end)) if is_date(start) && is_date(end) => Some(custom(start, end)),
            _ => {
                ctx.validation(
                    dash_at,
                    format!("Malformed custom date range \"{raw}\": expected custom:START,END"),
                );
                None
            }
        };
    }
    if raw == "custom" {
        let start = dash.get_any(&["date-start", "dateStart"]);
        let end = dash.get_any(&["date-end", "dateEnd"]);
        return match (start, end) {
            (Some(start), Some(end)) if is_date(start) && is_date(end) => Some(custom(start, end)),
            _ => {
                ctx.validation(
                    dash_at,
                    "date-type=\"custom\" needs date-start and date-end (YYYY-MM-DD)",
                );
                None
            }
        };
    }
    Some(DateRange {
        kind: raw.to_string(),
        start_date: None,
        end_date: None,
    })
}

/// `YYYY-MM-DD`, shape only.
fn is_date(s: &str) -> bool {
    let b = s.trim().as_bytes();
    b.len() == 10
        && b[4] == b'-'
        && b[7] == b'-'
        && b
            .iter()
            .enumerate()
            .all(|(i, c)| i == 4 || i == 7 || c.is_ascii_digit())
}
