//! Dashboard data model produced by the parser.
//!
//! A parse yields a flat list of `Widget` values plus one `GridConfig`
//! describing the canvas. Widgets reference layout structures by id
//! (`row` → a row spec, group children → widget ids); there is no tree.
//! Every type serializes to the camelCase JSON shape the rendering layer
//! consumes.

use crate::id::WidgetId;
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use smallvec::SmallVec;
use std::fmt;

/// Free-form JSON object (`<config>` / `<style>` islands).
pub type JsonObject = Map<String, Value>;

// ─── Widget types ────────────────────────────────────────────────────────

/// The closed set of widget kinds the renderer knows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WidgetType {
    Bar,
    Line,
    Pie,
    Area,
    Kpi,
    Insights,
    Alerts,
    Recommendations,
    #[serde(rename = "insightsHero")]
    InsightsHero,
    Insights2,
    StackedBar,
    GroupedBar,
    StackedLines,
    RadialStacked,
    PivotBar,
    Treemap,
    Scatter,
    Funnel,
}

impl WidgetType {
    /// Parse a `type` attribute. ASCII case-insensitive; `comparebar` is an
    /// alias of `groupedbar`.
    pub fn parse(s: &str) -> Option<Self> {
        let lowered = s.trim().to_ascii_lowercase();
        let kind = match lowered.as_str() {
            "bar" => Self::Bar,
            "line" => Self::Line,
            "pie" => Self::Pie,
            "area" => Self::Area,
            "kpi" => Self::Kpi,
            "insights" => Self::Insights,
            "alerts" => Self::Alerts,
            "recommendations" => Self::Recommendations,
            "insightshero" => Self::InsightsHero,
            "insights2" => Self::Insights2,
            "stackedbar" => Self::StackedBar,
            "groupedbar" | "comparebar" => Self::GroupedBar,
            "stackedlines" => Self::StackedLines,
            "radialstacked" => Self::RadialStacked,
            "pivotbar" => Self::PivotBar,
            "treemap" => Self::Treemap,
            "scatter" => Self::Scatter,
            "funnel" => Self::Funnel,
            _ => return None,
        };
        Some(kind)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bar => "bar",
            Self::Line => "line",
            Self::Pie => "pie",
            Self::Area => "area",
            Self::Kpi => "kpi",
            Self::Insights => "insights",
            Self::Alerts => "alerts",
            Self::Recommendations => "recommendations",
            Self::InsightsHero => "insightsHero",
            Self::Insights2 => "insights2",
            Self::StackedBar => "stackedbar",
            Self::GroupedBar => "groupedbar",
            Self::StackedLines => "stackedlines",
            Self::RadialStacked => "radialstacked",
            Self::PivotBar => "pivotbar",
            Self::Treemap => "treemap",
            Self::Scatter => "scatter",
            Self::Funnel => "funnel",
        }
    }

    /// Chart kinds that own a `<type>Config.styling` object.
    pub fn has_chart_config(&self) -> bool {
        matches!(
            self,
            Self::Bar
                | Self::Line
                | Self::Pie
                | Self::Area
                | Self::StackedBar
                | Self::GroupedBar
                | Self::StackedLines
                | Self::RadialStacked
                | Self::PivotBar
        )
    }
}

impl fmt::Display for WidgetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Breakpoints ─────────────────────────────────────────────────────────

/// One value per responsive breakpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breakpoints<T> {
    pub desktop: T,
    pub tablet: T,
    pub mobile: T,
}

impl<T: Clone> Breakpoints<T> {
    pub fn uniform(value: T) -> Self {
        Self {
            desktop: value.clone(),
            tablet: value.clone(),
            mobile: value,
        }
    }
}

/// Per-breakpoint values where each breakpoint may be absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialBreakpoints<T> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desktop: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tablet: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mobile: Option<T>,
}

impl<T> PartialBreakpoints<T> {
    pub fn is_empty(&self) -> bool {
        self.desktop.is_none() && self.tablet.is_none() && self.mobile.is_none()
    }
}

impl<T> Default for PartialBreakpoints<T> {
    fn default() -> Self {
        Self {
            desktop: None,
            tablet: None,
            mobile: None,
        }
    }
}

/// Explicit starting column per breakpoint (grid modes only).
pub type GridStart = PartialBreakpoints<u32>;
/// Fractional widths such as `"2fr"`.
pub type WidthFr = PartialBreakpoints<String>;
/// Raw CSS `grid-template-columns` strings.
pub type ColumnsTemplate = PartialBreakpoints<String>;

// ─── Data source ─────────────────────────────────────────────────────────

/// One AND-combined filter rule from a `where="…"` attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhereRule {
    pub col: String,
    /// `=`, `!=`, `>`, `>=`, `<`, `<=`, `in`, `not in`, `between`, `like`.
    pub op: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub val: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub vals: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
}

/// The query a widget will issue. Resolved by the data API, never here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSource {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimension: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dimensions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub measure: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub measures: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(rename = "where", default, skip_serializing_if = "Vec::is_empty")]
    pub where_rules: Vec<WhereRule>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_column: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_by: Option<String>,
}

impl DataSource {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

// ─── Styling ─────────────────────────────────────────────────────────────

/// Bottom-axis tick settings (`axisbottom:*` tokens).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AxisStyling {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tick_size: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tick_padding: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tick_rotation: Option<f64>,
}

/// The object `tw="…"` tokens write into.
///
/// Where it lives depends on the widget type, see `Widget::styling_target`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Styling {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_legend: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_grid: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_grid_x: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_grid_y: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_area: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compact: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub margin_bottom: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_radius: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layout: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub axis_bottom: Option<AxisStyling>,
    /// `grouped` or `stacked`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_mode: Option<String>,
    /// Series palette. Tokens always overwrite with a single entry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub colors: Option<SmallVec<[String; 2]>>,

    // Radial geometry
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_angle: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_angle: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inner_radius: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outer_radius: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub corner_radius: Option<f64>,

    // Title typography
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title_font_family: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title_font_size: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title_margin_bottom: Option<f64>,

    // KPI
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visualization_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,

    // Container
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_variant: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_width: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
}

// ─── Per-type configs ────────────────────────────────────────────────────

/// Config bag of every chart kind (`barConfig`, `lineConfig`, …).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub styling: Option<Styling>,
    /// Keys merged in from `<config>` that have no typed field.
    #[serde(flatten)]
    pub extra: JsonObject,
}

/// KPI config. Styling tokens land directly on this object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KpiConfig {
    #[serde(flatten)]
    pub styling: Styling,
    #[serde(flatten)]
    pub extra: JsonObject,
}

/// Link rendered inside an insight card.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemLink {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
}

/// One `<item/>` of an `insights2` widget.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsightItem {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<ItemLink>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tail: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Insights2Config {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<InsightItem>,
    #[serde(flatten)]
    pub extra: JsonObject,
}

/// The typed config slot of a widget, serialized under its variant key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WidgetConfig {
    #[serde(rename = "kpiConfig")]
    Kpi(KpiConfig),
    #[serde(rename = "barConfig")]
    Bar(ChartConfig),
    #[serde(rename = "lineConfig")]
    Line(ChartConfig),
    #[serde(rename = "pieConfig")]
    Pie(ChartConfig),
    #[serde(rename = "areaConfig")]
    Area(ChartConfig),
    #[serde(rename = "stackedBarConfig")]
    StackedBar(ChartConfig),
    #[serde(rename = "groupedBarConfig")]
    GroupedBar(ChartConfig),
    #[serde(rename = "stackedLinesConfig")]
    StackedLines(ChartConfig),
    #[serde(rename = "radialStackedConfig")]
    RadialStacked(ChartConfig),
    #[serde(rename = "pivotBarConfig")]
    PivotBar(ChartConfig),
    #[serde(rename = "insights2Config")]
    Insights2(Insights2Config),
    /// Every other widget type: an untyped bag.
    #[serde(rename = "config")]
    Other(JsonObject),
}

impl WidgetConfig {
    /// The empty config slot matching a widget type.
    pub fn for_type(kind: WidgetType) -> Self {
        match kind {
            WidgetType::Kpi => Self::Kpi(KpiConfig::default()),
            WidgetType::Bar => Self::Bar(ChartConfig::default()),
            WidgetType::Line => Self::Line(ChartConfig::default()),
            WidgetType::Pie => Self::Pie(ChartConfig::default()),
            WidgetType::Area => Self::Area(ChartConfig::default()),
            WidgetType::StackedBar => Self::StackedBar(ChartConfig::default()),
            WidgetType::GroupedBar => Self::GroupedBar(ChartConfig::default()),
            WidgetType::StackedLines => Self::StackedLines(ChartConfig::default()),
            WidgetType::RadialStacked => Self::RadialStacked(ChartConfig::default()),
            WidgetType::PivotBar => Self::PivotBar(ChartConfig::default()),
            WidgetType::Insights2 => Self::Insights2(Insights2Config::default()),
            _ => Self::Other(JsonObject::new()),
        }
    }

    pub fn as_chart(&self) -> Option<&ChartConfig> {
        match self {
            Self::Bar(c)
            | Self::Line(c)
            | Self::Pie(c)
            | Self::Area(c)
            | Self::StackedBar(c)
            | Self::GroupedBar(c)
            | Self::StackedLines(c)
            | Self::RadialStacked(c)
            | Self::PivotBar(c) => Some(c),
            _ => None,
        }
    }

    /// The styling object owned by this slot, created on first access.
    /// `None` for slots that do not own one (`insights2`, untyped).
    pub fn styling_mut(&mut self) -> Option<&mut Styling> {
        match self {
            Self::Kpi(c) => Some(&mut c.styling),
            Self::Bar(c)
            | Self::Line(c)
            | Self::Pie(c)
            | Self::Area(c)
            | Self::StackedBar(c)
            | Self::GroupedBar(c)
            | Self::StackedLines(c)
            | Self::RadialStacked(c)
            | Self::PivotBar(c) => Some(c.styling.get_or_insert_with(Styling::default)),
            Self::Insights2(_) | Self::Other(_) => None,
        }
    }

    pub fn styling(&self) -> Option<&Styling> {
        match self {
            Self::Kpi(c) => Some(&c.styling),
            other => other.as_chart().and_then(|c| c.styling.as_ref()),
        }
    }

    /// Shallow-merge a `<config>` object into this slot.
    ///
    /// Keys that match typed fields must have the right JSON shape; on a
    /// shape mismatch the slot is left untouched and the error returned.
    pub fn merge_json(&mut self, patch: JsonObject) -> Result<(), serde_json::Error> {
        match self {
            Self::Kpi(c) => merge_into(c, patch),
            Self::Bar(c)
            | Self::Line(c)
            | Self::Pie(c)
            | Self::Area(c)
            | Self::StackedBar(c)
            | Self::GroupedBar(c)
            | Self::StackedLines(c)
            | Self::RadialStacked(c)
            | Self::PivotBar(c) => merge_into(c, patch),
            Self::Insights2(c) => merge_into(c, patch),
            Self::Other(map) => {
                map.extend(patch);
                Ok(())
            }
        }
    }
}

fn merge_into<T: Serialize + DeserializeOwned>(
    target: &mut T,
    patch: JsonObject,
) -> Result<(), serde_json::Error> {
    let mut value = serde_json::to_value(&*target)?;
    if let Value::Object(obj) = &mut value {
        obj.extend(patch);
    }
    *target = serde_json::from_value(value)?;
    Ok(())
}

// ─── Widget ──────────────────────────────────────────────────────────────

/// One renderable dashboard element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Widget {
    /// Unique within a parse result (not enforced, see `lint`).
    pub id: WidgetId,

    #[serde(rename = "type")]
    pub kind: WidgetType,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Row id this widget belongs to (rows mode and semantic sections).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row: Option<String>,

    /// Column span per breakpoint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<Breakpoints<u32>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub grid_start: Option<GridStart>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub height_px: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub width_fr: Option<WidthFr>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_source: Option<DataSource>,

    /// Typed per-kind config (`kpiConfig`, `barConfig`, …).
    #[serde(flatten)]
    pub config: Option<WidgetConfig>,

    /// Generic styling bag for kinds without a typed styling target.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub styling: Option<Styling>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_style: Option<JsonObject>,

    /// Verbatim markup rendered before the widget.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pre_html: Option<String>,

    /// Display order of KPI sub-elements.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kpi_titles_order: Option<SmallVec<[String; 4]>>,
}

impl Widget {
    pub fn new(id: WidgetId, kind: WidgetType) -> Self {
        Self {
            id,
            kind,
            title: None,
            row: None,
            span: None,
            grid_start: None,
            order: None,
            height_px: None,
            width_fr: None,
            data_source: None,
            config: None,
            styling: None,
            container_style: None,
            pre_html: None,
            kpi_titles_order: None,
        }
    }

    /// The typed config slot, created for this widget's kind on first access.
    pub fn config_mut(&mut self) -> &mut WidgetConfig {
        let kind = self.kind;
        self.config
            .get_or_insert_with(|| WidgetConfig::for_type(kind))
    }

    /// Where styling tokens are written for this widget:
    /// chart kinds → `<type>Config.styling`, `kpi` → `kpiConfig`,
    /// anything else → the generic `styling` bag.
    pub fn styling_target(&mut self) -> &mut Styling {
        let kind = self.kind;
        if kind == WidgetType::Kpi || kind.has_chart_config() {
            let config = self
                .config
                .get_or_insert_with(|| WidgetConfig::for_type(kind));
            if config.styling_mut().is_none() {
                *config = WidgetConfig::for_type(kind);
            }
            if let Some(styling) = config.styling_mut() {
                return styling;
            }
        }
        self.styling.get_or_insert_with(Styling::default)
    }

    /// Read-only view of whatever `styling_target` would write to.
    pub fn styling(&self) -> Option<&Styling> {
        if self.kind == WidgetType::Kpi || self.kind.has_chart_config() {
            self.config.as_ref().and_then(WidgetConfig::styling)
        } else {
            self.styling.as_ref()
        }
    }
}

// ─── Grid ────────────────────────────────────────────────────────────────

/// Columns and gaps of one row at one breakpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowBreakpoint {
    pub columns: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gap_x: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gap_y: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub desktop: RowBreakpoint,
    pub tablet: RowBreakpoint,
    pub mobile: RowBreakpoint,
}

impl RowSpec {
    pub fn new(columns: Breakpoints<u32>, gap_x: Option<u32>, gap_y: Option<u32>) -> Self {
        let at = |columns| RowBreakpoint {
            columns,
            gap_x,
            gap_y,
        };
        Self {
            title: None,
            desktop: at(columns.desktop),
            tablet: at(columns.tablet),
            mobile: at(columns.mobile),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Horizontal,
    Vertical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sizing {
    #[default]
    Fr,
    Auto,
}

/// A named visual cluster of widgets (grid mode).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupSpec {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub orientation: Orientation,
    pub sizing: Sizing,
    /// The group's own sub-grid.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub columns: Option<Breakpoints<u32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gap_x: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gap_y: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<JsonObject>,
    pub children: Vec<WidgetId>,
}

/// Inner span and label of one numbered column (grid-per-column mode).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub span: Breakpoints<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridModeLayout {
    pub columns: Breakpoints<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gap_x: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gap_y: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<GroupSpec>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RowModeLayout {
    pub rows: IndexMap<String, RowSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnModeLayout {
    pub columns: Breakpoints<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub columns_template: Option<ColumnsTemplate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub columns_inner: Option<IndexMap<String, ColumnSpec>>,
}

/// Layout mode names as written in `layout-mode="…"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LayoutMode {
    Grid,
    #[default]
    GridPerRow,
    GridPerColumn,
}

impl LayoutMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "grid" => Some(Self::Grid),
            "grid-per-row" | "rows" => Some(Self::GridPerRow),
            "grid-per-column" | "columns" => Some(Self::GridPerColumn),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Grid => "grid",
            Self::GridPerRow => "grid-per-row",
            Self::GridPerColumn => "grid-per-column",
        }
    }
}

/// Exactly one active layout strategy; the sub-structures of different
/// modes cannot coexist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum GridLayout {
    Grid(GridModeLayout),
    GridPerRow(RowModeLayout),
    GridPerColumn(ColumnModeLayout),
}

impl GridLayout {
    pub fn mode(&self) -> LayoutMode {
        match self {
            Self::Grid(_) => LayoutMode::Grid,
            Self::GridPerRow(_) => LayoutMode::GridPerRow,
            Self::GridPerColumn(_) => LayoutMode::GridPerColumn,
        }
    }

    pub fn rows(&self) -> Option<&IndexMap<String, RowSpec>> {
        match self {
            Self::GridPerRow(layout) => Some(&layout.rows),
            _ => None,
        }
    }

    pub fn groups(&self) -> Option<&[GroupSpec]> {
        match self {
            Self::Grid(layout) => Some(&layout.groups),
            _ => None,
        }
    }
}

impl Default for GridLayout {
    fn default() -> Self {
        Self::GridPerRow(RowModeLayout::default())
    }
}

/// Canvas-level visual overrides (dashboard attributes, `<style>` JSON, theme).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GridStyle {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_gradient: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_width: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_radius: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub box_shadow: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backdrop_filter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub padding: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub letter_spacing: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridConfig {
    /// Legacy absolute-grid settings.
    pub max_rows: u32,
    pub row_height: u32,
    pub cols: u32,

    pub layout: GridLayout,

    /// Rows declared by `<section>` blocks, keyed by section id.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub layout_rows: IndexMap<String, RowSpec>,

    #[serde(flatten)]
    pub style: GridStyle,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            max_rows: 12,
            row_height: 30,
            cols: 12,
            layout: GridLayout::default(),
            layout_rows: IndexMap::new(),
            style: GridStyle::default(),
        }
    }
}

// ─── Header & filters ────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Typography {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_weight: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub letter_spacing: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_height: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub margin_top: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub margin_bottom: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_align: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_transform: Option<String>,
}

/// A header line (title or subtitle) and its typography.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeaderText {
    pub text: String,
    #[serde(flatten)]
    pub typography: Typography,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatePickerConfig {
    pub visible: bool,
    /// Preset the picker starts on (`last_30_days`, `custom`, …).
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub align: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_presets: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<HeaderText>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<HeaderText>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub align: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_picker: Option<DatePickerConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalFilters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_range: Option<DateRange>,
}

// ─── Errors & result ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    /// Structural failure; the whole parse was abandoned.
    Syntax,
    /// A construct was malformed and skipped.
    Validation,
    /// Deprecated but still honoured.
    Warning,
}

/// A diagnostic attached to a parse. Positions are 1-based and refer to the
/// document after Liquid substitution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseError {
    pub line: u32,
    pub column: u32,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: ErrorKind,
}

impl ParseError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            line: 1,
            column: 1,
            message: message.into(),
            kind,
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            ErrorKind::Syntax => "syntax",
            ErrorKind::Validation => "validation",
            ErrorKind::Warning => "warning",
        };
        write!(f, "{}:{}: {kind}: {}", self.line, self.column, self.message)
    }
}

/// Everything one parse call produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseResult {
    pub widgets: Vec<Widget>,
    pub grid_config: GridConfig,
    pub errors: Vec<ParseError>,
    /// `errors.is_empty()`; a warning alone makes a parse invalid.
    pub is_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dashboard_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dashboard_subtitle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header_config: Option<HeaderConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub global_filters: Option<GlobalFilters>,
}

impl ParseResult {
    /// An empty, invalid result carrying a single error.
    pub fn failed(error: ParseError) -> Self {
        Self {
            widgets: Vec::new(),
            grid_config: GridConfig::default(),
            errors: vec![error],
            is_valid: false,
            dashboard_title: None,
            dashboard_subtitle: None,
            header_config: None,
            global_filters: None,
        }
    }

    /// First widget with the given id.
    pub fn widget(&self, id: &str) -> Option<&Widget> {
        self.widgets.iter().find(|w| w.id.as_str() == id)
    }

    pub fn errors_of(&self, kind: ErrorKind) -> impl Iterator<Item = &ParseError> {
        self.errors.iter().filter(move |e| e.kind == kind)
    }
}
