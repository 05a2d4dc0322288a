//! WASM bridge for the dashboard DSL. Exposes parsing, lint and source
//! edits to the browser application.
//!
//! Compiled via `wasm-pack build --target web`. Every entry point takes and
//! returns plain strings; structured values travel as JSON.

use dash_core::{DashboardAttrs, LintDiagnostic, ParseResult};
use serde::Serialize;
use wasm_bindgen::prelude::*;

// ─── Logging ─────────────────────────────────────────────────────────────

/// Forwards `log` records to the browser console.
struct ConsoleLogger;

static LOGGER: ConsoleLogger = ConsoleLogger;

impl log::Log for ConsoleLogger {
    fn enabled(&self, metadata: &log::Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let msg = format!("[{}] {}: {}", record.level(), record.target(), record.args());
        #[cfg(target_arch = "wasm32")]
        {
            let msg = JsValue::from(msg);
            match record.level() {
                log::Level::Error => web_sys::console::error_1(&msg),
                log::Level::Warn => web_sys::console::warn_1(&msg),
                log::Level::Info => web_sys::console::info_1(&msg),
                log::Level::Debug | log::Level::Trace => web_sys::console::debug_1(&msg),
            }
        }
        #[cfg(not(target_arch = "wasm32"))]
        let _ = msg;
    }

    fn flush(&self) {}
}

/// Install the console logger and panic hook. `level` is a `log` level name
/// (`"warn"`, `"debug"`, …); anything unreadable means `warn`.
#[wasm_bindgen]
pub fn init_logging(level: &str) {
    console_error_panic_hook_setup();
    let filter = level
        .parse::<log::LevelFilter>()
        .unwrap_or(log::LevelFilter::Warn);
    // a second call only adjusts the level
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(filter);
}

// ─── Panic hook for WASM debugging ───────────────────────────────────────

fn console_error_panic_hook_setup() {
    #[cfg(target_arch = "wasm32")]
    {
        use std::sync::Once;
        static SET_HOOK: Once = Once::new();
        SET_HOOK.call_once(|| {
            std::panic::set_hook(Box::new(|info| {
                let msg = format!("dashboard WASM panic: {info}");
                web_sys::console::error_1(&msg.into());
            }));
        });
    }
}

// ─── JSON helpers ────────────────────────────────────────────────────────

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| {
        log::error!("serialization error: {e}");
        let escaped = e.to_string().replace('\\', "\\\\").replace('"', "\\\"");
        format!(r#"{{"ok":false,"error":"Serialization error: {escaped}"}}"#)
    })
}

#[derive(Serialize)]
struct RemoveResponse {
    code: String,
    removed: usize,
}

// ─── Entry points ────────────────────────────────────────────────────────

/// Parse DSL source. Returns the `ParseResult` as camelCase JSON.
#[wasm_bindgen]
pub fn parse_dashboard(source: &str) -> String {
    let result: ParseResult = dash_core::parse(source);
    to_json(&result)
}

/// Parse and lint DSL source. Returns a JSON array of diagnostics.
#[wasm_bindgen]
pub fn lint_dashboard(source: &str) -> String {
    let diags: Vec<LintDiagnostic> = dash_core::lint_result(&dash_core::parse(source));
    to_json(&diags)
}

/// Set one attribute on the widget or group with the given id. Returns the
/// edited source.
#[wasm_bindgen]
pub fn set_widget_attr(source: &str, id: &str, name: &str, value: &str) -> String {
    dash_core::set_attr_on_node(source, id, name, value)
}

/// Remove a widget. Returns JSON `{"code": "...", "removed": n}`.
#[wasm_bindgen]
pub fn remove_widget(source: &str, id: &str) -> String {
    let (code, removed) = dash_core::remove_widget(source, id);
    log::debug!("removed {removed} element(s) with id {id:?}");
    to_json(&RemoveResponse { code, removed })
}

/// Remove a group and its widgets. Returns JSON `{"code": "...", "removed": n}`.
#[wasm_bindgen]
pub fn remove_group(source: &str, id: &str) -> String {
    let (code, removed) = dash_core::remove_group(source, id);
    log::debug!("removed {removed} group(s) with id {id:?}");
    to_json(&RemoveResponse { code, removed })
}

/// Replace the `tw` styling tokens of a widget. Returns the edited source.
#[wasm_bindgen]
pub fn set_widget_styling(source: &str, id: &str, tw: &str) -> String {
    dash_core::set_styling_tw(source, id, tw)
}

/// Set the dashboard `theme` attribute. Returns the edited source.
#[wasm_bindgen]
pub fn set_dashboard_theme(source: &str, theme: &str) -> String {
    let known = dash_core::find_theme(theme).is_some();
    if !known {
        log::warn!("theme {theme:?} is not built in; it will render unstyled");
    }
    dash_core::set_dashboard_attrs(
        source,
        &DashboardAttrs {
            theme: Some(theme.to_string()),
            ..DashboardAttrs::default()
        },
    )
}

/// Names of the built-in themes as a JSON array.
#[wasm_bindgen]
pub fn theme_names() -> String {
    to_json(&dash_core::theme_names().collect::<Vec<_>>())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::Value;

    const DOC: &str = r#"<dashboard layout-mode="grid">
  <group id="g">
    <chart id="c" type="bar"></chart>
    <kpi id="k"><datasource table="orders" measure="SUM(total)"/></kpi>
  </group>
</dashboard>"#;

    fn json(s: &str) -> Value {
        serde_json::from_str(s).unwrap()
    }

    #[test]
    fn parse_returns_result_json() {
        let value = json(&parse_dashboard(DOC));
        assert_eq!(value["isValid"], true);
        assert_eq!(value["widgets"].as_array().unwrap().len(), 2);
        assert_eq!(value["gridConfig"]["layout"]["mode"], "grid");

        let value = json(&parse_dashboard("plain text"));
        assert_eq!(value["isValid"], false);
        assert_eq!(value["errors"][0]["type"], "validation");
    }

    #[test]
    fn lint_returns_diagnostics() {
        let value = json(&lint_dashboard(DOC));
        let diags = value.as_array().unwrap();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0]["target"]["kind"], "widget");
        assert_eq!(diags[0]["target"]["id"], "c");
        assert_eq!(diags[0]["rule"], "missing-datasource");
        assert_eq!(diags[0]["severity"], "info");
    }

    #[test]
    fn edits_round_trip() {
        let edited = set_widget_attr(DOC, "c", "title", "Sales");
        let value = json(&parse_dashboard(&edited));
        assert_eq!(value["widgets"][0]["title"], "Sales");

        let value = json(&remove_widget(DOC, "k"));
        assert_eq!(value["removed"], 1);
        let code = value["code"].as_str().unwrap();
        assert!(!code.contains("id=\"k\""));

        let value = json(&remove_group(DOC, "g"));
        assert_eq!(value["removed"], 1);
        let value = json(&parse_dashboard(value["code"].as_str().unwrap()));
        assert_eq!(value["widgets"].as_array().unwrap().len(), 0);

        let styled = set_widget_styling(DOC, "c", "legend:off");
        assert!(styled.contains(r#"<styling tw="legend:off" />"#));

        let themed = set_dashboard_theme(DOC, "navy");
        assert!(themed.starts_with(r#"<dashboard layout-mode="grid" theme="navy">"#));
    }

    #[test]
    fn logger_installs_once() {
        init_logging("debug");
        init_logging("nonsense");
        assert_eq!(log::max_level(), log::LevelFilter::Warn);
    }

    #[test]
    fn lists_themes() {
        let value = json(&theme_names());
        assert!(value.as_array().unwrap().iter().any(|t| t == "platinum"));
    }
}
