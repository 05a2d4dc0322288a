//! Named color themes and the post-parse theme pass.
//!
//! The pass is pure: it clones its input and fills only fields the author
//! left unset, so explicit attributes and styling tokens always win over
//! the theme.

use crate::model::{GridConfig, JsonObject, Widget, WidgetType};
use serde_json::Value;
use smallvec::smallvec;

/// Token table of one theme.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Theme {
    pub name: &'static str,
    pub font_family: &'static str,
    pub primary: &'static str,
    pub background: &'static str,
    pub surface: &'static str,
    pub border: &'static str,
    pub text_primary: &'static str,
    pub text_secondary: &'static str,
    pub bar: &'static str,
    pub line: &'static str,
    pub area: &'static str,
    pub pie_border: &'static str,
    pub grid_background: &'static str,
    pub grid_border: &'static str,
    pub shadow: &'static str,
    pub radius: f64,
    pub gradient: Option<&'static str>,
    pub backdrop: Option<&'static str>,
}

// ─── Typography presets ──────────────────────────────────────────────────

const INTER: &str = "Inter, -apple-system, BlinkMacSystemFont, sans-serif";
const OPEN_SANS: &str = "Open Sans, -apple-system, BlinkMacSystemFont, sans-serif";
const ROBOTO: &str = "Roboto, -apple-system, BlinkMacSystemFont, sans-serif";
const LATO: &str = "Lato, -apple-system, BlinkMacSystemFont, sans-serif";
const ARIAL: &str = "Arial, Helvetica, sans-serif";
const GEORGIA: &str = "Georgia, Times New Roman, serif";
const SEGOE: &str = "Segoe UI, Tahoma, Geneva, sans-serif";
const MONTSERRAT: &str = "Montserrat, -apple-system, BlinkMacSystemFont, sans-serif";
const PLAYFAIR: &str = "Playfair Display, Georgia, serif";
const MERRIWEATHER: &str = "Merriweather, Georgia, serif";

const DARK_SHADOW: &str = "0 4px 12px rgba(0, 0, 0, 0.5)";
const LIGHT_SHADOW: &str = "0 4px 12px rgba(0, 0, 0, 0.15)";

// ─── Theme table ─────────────────────────────────────────────────────────

pub static THEMES: [Theme; 10] = [
    Theme {
        name: "light",
        font_family: OPEN_SANS,
        primary: "#2563eb",
        background: "#ffffff",
        surface: "#f8fafc",
        border: "#e2e8f0",
        text_primary: "#0f172a",
        text_secondary: "#475569",
        bar: "#1d4ed8",
        line: "#059669",
        area: "#7c2d12",
        pie_border: "#ffffff",
        grid_background: "#ffffff",
        grid_border: "#e2e8f0",
        shadow: LIGHT_SHADOW,
        radius: 8.0,
        gradient: None,
        backdrop: None,
    },
    Theme {
        name: "dark",
        font_family: INTER,
        primary: "#3b82f6",
        background: "#0a0a0a",
        surface: "#171717",
        border: "#404040",
        text_primary: "#ffffff",
        text_secondary: "#d1d5db",
        bar: "#60a5fa",
        line: "#34d399",
        area: "#a78bfa",
        pie_border: "#374151",
        grid_background: "#171717",
        grid_border: "#404040",
        shadow: DARK_SHADOW,
        radius: 8.0,
        gradient: None,
        backdrop: None,
    },
    Theme {
        name: "blue",
        font_family: ROBOTO,
        primary: "#60a5fa",
        background: "#0f172a",
        surface: "#1e293b",
        border: "#475569",
        text_primary: "#f1f5f9",
        text_secondary: "#cbd5e1",
        bar: "#3b82f6",
        line: "#60a5fa",
        area: "#1e40af",
        pie_border: "#475569",
        grid_background: "#1e293b",
        grid_border: "#475569",
        shadow: DARK_SHADOW,
        radius: 8.0,
        gradient: Some("linear-gradient(180deg, #1e293b 0%, #0f172a 100%)"),
        backdrop: None,
    },
    Theme {
        name: "green",
        font_family: LATO,
        primary: "#34d399",
        background: "#064e3b",
        surface: "#065f46",
        border: "#059669",
        text_primary: "#ecfdf5",
        text_secondary: "#d1fae5",
        bar: "#10b981",
        line: "#34d399",
        area: "#047857",
        pie_border: "#059669",
        grid_background: "#065f46",
        grid_border: "#059669",
        shadow: DARK_SHADOW,
        radius: 8.0,
        gradient: Some("linear-gradient(180deg, #065f46 0%, #064e3b 100%)"),
        backdrop: None,
    },
    Theme {
        name: "corporate",
        font_family: ARIAL,
        primary: "#475569",
        background: "#f8fafc",
        surface: "#ffffff",
        border: "#e2e8f0",
        text_primary: "#0f172a",
        text_secondary: "#334155",
        bar: "#475569",
        line: "#64748b",
        area: "#334155",
        pie_border: "#e2e8f0",
        grid_background: "#ffffff",
        grid_border: "#e2e8f0",
        shadow: LIGHT_SHADOW,
        radius: 8.0,
        gradient: None,
        backdrop: None,
    },
    Theme {
        name: "navy",
        font_family: GEORGIA,
        primary: "#1e40af",
        background: "#0f172a",
        surface: "#1e293b",
        border: "#475569",
        text_primary: "#f1f5f9",
        text_secondary: "#cbd5e1",
        bar: "#1e40af",
        line: "#3b82f6",
        area: "#1e3a8a",
        pie_border: "#475569",
        grid_background: "#1e293b",
        grid_border: "#475569",
        shadow: DARK_SHADOW,
        radius: 8.0,
        gradient: Some("linear-gradient(180deg, #1e293b 0%, #0f172a 100%)"),
        backdrop: None,
    },
    Theme {
        name: "slate",
        font_family: SEGOE,
        primary: "#475569",
        background: "#0f172a",
        surface: "#1e293b",
        border: "#374151",
        text_primary: "#f8fafc",
        text_secondary: "#e2e8f0",
        bar: "#64748b",
        line: "#94a3b8",
        area: "#475569",
        pie_border: "#374151",
        grid_background: "#1e293b",
        grid_border: "#374151",
        shadow: DARK_SHADOW,
        radius: 8.0,
        gradient: None,
        backdrop: Some("blur(8px)"),
    },
    Theme {
        name: "forest",
        font_family: MONTSERRAT,
        primary: "#16a34a",
        background: "#14532d",
        surface: "#166534",
        border: "#15803d",
        text_primary: "#f0fdf4",
        text_secondary: "#dcfce7",
        bar: "#16a34a",
        line: "#22c55e",
        area: "#15803d",
        pie_border: "#15803d",
        grid_background: "#166534",
        grid_border: "#15803d",
        shadow: DARK_SHADOW,
        radius: 8.0,
        gradient: Some("linear-gradient(180deg, #166534 0%, #14532d 100%)"),
        backdrop: None,
    },
    Theme {
        name: "burgundy",
        font_family: PLAYFAIR,
        primary: "#dc2626",
        background: "#450a0a",
        surface: "#7f1d1d",
        border: "#991b1b",
        text_primary: "#fef2f2",
        text_secondary: "#fee2e2",
        bar: "#dc2626",
        line: "#ef4444",
        area: "#991b1b",
        pie_border: "#991b1b",
        grid_background: "#7f1d1d",
        grid_border: "#991b1b",
        shadow: DARK_SHADOW,
        radius: 8.0,
        gradient: Some("linear-gradient(180deg, #7f1d1d 0%, #450a0a 100%)"),
        backdrop: None,
    },
    Theme {
        name: "platinum",
        font_family: MERRIWEATHER,
        primary: "#71717a",
        background: "#18181b",
        surface: "#27272a",
        border: "#3f3f46",
        text_primary: "#fafafa",
        text_secondary: "#f4f4f5",
        bar: "#71717a",
        line: "#a1a1aa",
        area: "#52525b",
        pie_border: "#3f3f46",
        grid_background: "#27272a",
        grid_border: "#3f3f46",
        shadow: DARK_SHADOW,
        radius: 8.0,
        gradient: None,
        backdrop: Some("blur(12px)"),
    },
];

/// Look up a theme by name. ASCII case-insensitive; `branco` is `light`.
pub fn find_theme(name: &str) -> Option<&'static Theme> {
    let name = name.trim().to_ascii_lowercase();
    let name = match name.as_str() {
        "branco" | "white" => "light",
        other => other,
    };
    THEMES.iter().find(|t| t.name == name)
}

pub fn theme_names() -> impl Iterator<Item = &'static str> {
    THEMES.iter().map(|t| t.name)
}

impl Theme {
    /// Series color for a widget kind, `None` for kinds without a palette.
    fn series_color(&self, kind: WidgetType) -> Option<&'static str> {
        match kind {
            WidgetType::Bar
            | WidgetType::StackedBar
            | WidgetType::GroupedBar
            | WidgetType::PivotBar => Some(self.bar),
            WidgetType::Line | WidgetType::StackedLines => Some(self.line),
            WidgetType::Area => Some(self.area),
            WidgetType::Pie | WidgetType::RadialStacked | WidgetType::Kpi => Some(self.primary),
            _ => None,
        }
    }
}

// ─── Theme pass ──────────────────────────────────────────────────────────

/// Themed copies of `widgets`. Unknown theme → unchanged copies.
#[must_use]
pub fn apply_theme_to_widgets(widgets: &[Widget], name: &str) -> Vec<Widget> {
    let Some(theme) = find_theme(name) else {
        log::warn!("unknown theme {name:?}, widgets left unstyled");
        return widgets.to_vec();
    };
    log::trace!("applying theme {} to {} widgets", theme.name, widgets.len());
    widgets.iter().map(|w| theme_widget(w, theme)).collect()
}

/// Themed copy of the grid config. Unknown theme → unchanged copy.
#[must_use]
pub fn apply_theme_to_grid(grid: &GridConfig, name: &str) -> GridConfig {
    let mut out = grid.clone();
    let Some(theme) = find_theme(name) else {
        log::warn!("unknown theme {name:?}, grid left unstyled");
        return out;
    };
    let style = &mut out.style;
    style
        .background_color
        .get_or_insert_with(|| theme.grid_background.to_string());
    style
        .border_color
        .get_or_insert_with(|| theme.grid_border.to_string());
    style.box_shadow.get_or_insert_with(|| theme.shadow.to_string());
    if let Some(gradient) = theme.gradient {
        style
            .background_gradient
            .get_or_insert_with(|| gradient.to_string());
    }
    if let Some(backdrop) = theme.backdrop {
        style
            .backdrop_filter
            .get_or_insert_with(|| backdrop.to_string());
    }
    out
}

fn theme_widget(widget: &Widget, theme: &Theme) -> Widget {
    let mut w = widget.clone();
    let series = theme.series_color(w.kind);

    let styling = w.styling_target();
    styling
        .title_font_family
        .get_or_insert_with(|| theme.font_family.to_string());
    styling
        .title_color
        .get_or_insert_with(|| theme.text_primary.to_string());
    styling
        .background_color
        .get_or_insert_with(|| theme.surface.to_string());
    styling
        .border_color
        .get_or_insert_with(|| theme.border.to_string());
    styling.border_radius.get_or_insert(theme.radius);
    if let Some(color) = series {
        styling
            .colors
            .get_or_insert_with(|| smallvec![color.to_string()]);
    }

    let container = w.container_style.get_or_insert_with(JsonObject::new);
    fill_key(container, "boxShadow", Some(theme.shadow));
    fill_key(container, "backgroundGradient", theme.gradient);
    fill_key(container, "backdropFilter", theme.backdrop);
    w
}

fn fill_key(map: &mut JsonObject, key: &str, value: Option<&str>) {
    if let Some(value) = value {
        map.entry(key)
            .or_insert_with(|| Value::String(value.to_string()));
    }
}
