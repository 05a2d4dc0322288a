//! Interpreter for `tw="…"` styling tokens.
//!
//! Tokens are whitespace-separated and colon-split into `key:value` or
//! `key:sub:value`. Examples: `legend:off`, `mb:40`, `bar:color:#10b981`,
//! `axisbottom:tickrotation:45`, `kpi:unit:R$`.
//!
//! Unknown tokens are ignored so documents written for newer renderers
//! still parse.

use crate::model::{AxisStyling, Styling};
use smallvec::smallvec;

/// Apply every token of `tw` to `target`, left to right.
pub fn apply_styling_tokens(target: &mut Styling, tw: &str) {
    for token in tw.split_whitespace() {
        if !apply_token(target, token) {
            log::debug!("ignoring styling token {token:?}");
        }
    }
}

/// Returns `false` when the token was not understood.
fn apply_token(s: &mut Styling, token: &str) -> bool {
    let Some((key, rest)) = token.split_once(':') else {
        return false;
    };
    let key = key.to_ascii_lowercase();
    match key.as_str() {
        "legend" => set_flag(&mut s.show_legend, rest),
        "grid" => set_flag(&mut s.show_grid, rest),
        "gridx" => set_flag(&mut s.enable_grid_x, rest),
        "gridy" => set_flag(&mut s.enable_grid_y, rest),
        "area" if !rest.contains(':') => set_flag(&mut s.enable_area, rest),
        "compact" => set_flag(&mut s.compact, rest),
        "mb" => set_number(&mut s.margin_bottom, rest),
        "radius" => set_number(&mut s.border_radius, rest),
        "layout" => set_text(&mut s.layout, rest),
        "group" => match rest {
            "grouped" | "stacked" => set_text(&mut s.group_mode, rest),
            _ => false,
        },
        "color" => set_colors(s, rest),
        "bg" => set_text(&mut s.background_color, rest),
        _ => {
            let Some((sub, value)) = rest.split_once(':') else {
                return false;
            };
            apply_sub_token(s, &key, &sub.to_ascii_lowercase(), value)
        }
    }
}

fn apply_sub_token(s: &mut Styling, key: &str, sub: &str, value: &str) -> bool {
    match (key, sub) {
        ("bar" | "line" | "pie" | "area", "color") => set_colors(s, value),

        ("axisbottom", field) => {
            let axis = s.axis_bottom.get_or_insert_with(AxisStyling::default);
            match field {
                "ticksize" => set_number(&mut axis.tick_size, value),
                "tickpadding" => set_number(&mut axis.tick_padding, value),
                "tickrotation" => set_number(&mut axis.tick_rotation, value),
                _ => false,
            }
        }

        ("radial", "start") => set_number(&mut s.start_angle, value),
        ("radial", "end") => set_number(&mut s.end_angle, value),
        ("radial", "inner") => set_number(&mut s.inner_radius, value),
        ("radial", "outer") => set_number(&mut s.outer_radius, value),
        ("radial", "corner") => set_number(&mut s.corner_radius, value),

        ("title", "font") => set_text(&mut s.title_font_family, value),
        ("title", "size") => set_number(&mut s.title_font_size, value),
        ("title", "color") => set_text(&mut s.title_color, value),
        ("title", "mb") => set_number(&mut s.title_margin_bottom, value),

        ("kpi", "viz") => set_text(&mut s.visualization_type, value),
        ("kpi", "unit") => set_text(&mut s.unit, value),

        ("border", "variant") => set_text(&mut s.border_variant, value),
        ("border", "width") => set_number(&mut s.border_width, value),
        ("border", "color") => set_text(&mut s.border_color, value),

        _ => false,
    }
}

fn set_flag(field: &mut Option<bool>, value: &str) -> bool {
    match value.to_ascii_lowercase().as_str() {
        "on" | "true" => *field = Some(true),
        "off" | "false" => *field = Some(false),
        _ => return false,
    }
    true
}

fn set_number(field: &mut Option<f64>, value: &str) -> bool {
    match value.trim_end_matches("px").parse::<f64>() {
        Ok(n) if n.is_finite() => {
            *field = Some(n);
            true
        }
        _ => false,
    }
}

fn set_text(field: &mut Option<String>, value: &str) -> bool {
    if value.is_empty() {
        return false;
    }
    *field = Some(value.to_string());
    true
}

/// Colors are replaced, never appended.
fn set_colors(s: &mut Styling, value: &str) -> bool {
    if value.is_empty() {
        return false;
    }
    s.colors = Some(smallvec![value.to_string()]);
    true
}
