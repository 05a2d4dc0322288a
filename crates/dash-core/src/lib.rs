pub mod edit;
pub mod id;
pub mod lint;
pub mod liquid;
pub mod markup;
pub mod model;
pub mod parser;
pub mod query;
pub mod styling;
pub mod theme;

pub use edit::{
    DashboardAttrs, DataBinding, NewChart, NewGroup, NewKpi, dedupe_widget, ensure_group,
    insert_chart_in_group, insert_kpi_in_group, remove_group, remove_widget, set_attr_on_node,
    set_config_on_node, set_dashboard_attrs, set_datasource_attrs, set_group_style,
    set_styling_tw,
};
pub use id::WidgetId;
pub use lint::{LintDiagnostic, LintSeverity, LintTarget, lint_result};
pub use model::*;
pub use parser::{parse, parse_liquid};
pub use query::{build_measure_expr, normalize_schema_table};
pub use styling::apply_styling_tokens;
pub use theme::{apply_theme_to_grid, apply_theme_to_widgets, find_theme, theme_names};
