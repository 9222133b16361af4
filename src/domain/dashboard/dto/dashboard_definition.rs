//! Grafana-style dashboard JSON. Only the parts that drive queries are modelled;
//! everything else is ignored on parse.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::state::runtime::dashboard::dashboard_state::{PanelTarget, Variable};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardDefinition {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub panels: Vec<Panel>,
    /// Legacy row layout.
    #[serde(default)]
    pub rows: Vec<Row>,
    #[serde(default)]
    pub templating: Templating,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Panel {
    pub id: Option<i64>,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "type", default)]
    pub panel_type: String,
    #[serde(default)]
    pub targets: Vec<Target>,
    /// Children of a collapsed row panel.
    #[serde(default)]
    pub panels: Vec<Panel>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Row {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub panels: Vec<Panel>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Target {
    pub expr: Option<String>,
    pub ref_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Templating {
    #[serde(default)]
    pub list: Vec<TemplateVariable>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateVariable {
    pub name: String,
    #[serde(rename = "type", default)]
    pub variable_type: String,
    /// A string, or `{"query": "..."}` in newer dashboards.
    #[serde(default)]
    pub query: Value,
    #[serde(default)]
    pub options: Vec<TemplateOption>,
    #[serde(default)]
    pub include_all: bool,
    #[serde(default)]
    pub hide: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemplateOption {
    #[serde(default)]
    pub value: Value,
    #[serde(default)]
    pub selected: bool,
}

impl TemplateOption {
    pub fn value_text(&self) -> Option<String> {
        match &self.value {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Array(values) => values.first().and_then(|v| v.as_str()).map(str::to_string),
            _ => None,
        }
    }
}

impl TemplateVariable {
    pub fn query_text(&self) -> Option<String> {
        match &self.query {
            Value::String(s) => Some(s.clone()),
            Value::Object(map) => map.get("query").and_then(|q| q.as_str()).map(str::to_string),
            _ => None,
        }
    }

    fn is_supported(&self) -> bool {
        matches!(self.variable_type.as_str(), "query" | "interval")
    }
}

impl DashboardDefinition {
    /// Every panel in layout order, with row and collapsed-row children flattened.
    pub fn all_panels(&self) -> Vec<&Panel> {
        fn collect<'a>(panels: &'a [Panel], out: &mut Vec<&'a Panel>) {
            for panel in panels {
                out.push(panel);
                collect(&panel.panels, out);
            }
        }

        let mut out = Vec::new();
        collect(&self.panels, &mut out);
        for row in &self.rows {
            collect(&row.panels, &mut out);
        }
        out
    }

    /// Query-bearing targets keyed `"{panel_id}/{target_index}"`. Panels without
    /// an id are keyed by their layout position.
    pub fn panel_targets(&self) -> Vec<PanelTarget> {
        self.all_panels()
            .into_iter()
            .enumerate()
            .flat_map(|(position, panel)| {
                let panel_key = panel
                    .id
                    .map(|id| id.to_string())
                    .unwrap_or_else(|| format!("p{position}"));
                panel
                    .targets
                    .iter()
                    .enumerate()
                    .filter_map(move |(index, target)| {
                        let expr = target.expr.as_deref().map(str::trim).filter(|e| !e.is_empty())?;
                        Some(PanelTarget {
                            key: format!("{panel_key}/{index}"),
                            panel_title: panel.title.clone(),
                            expr: expr.to_string(),
                        })
                    })
            })
            .collect()
    }

    /// Initial variable state for a freshly selected dashboard. A value from
    /// the URL wins over the option marked `selected`, which wins over the first option.
    pub fn seed_variables(&self, url_values: &BTreeMap<String, String>) -> BTreeMap<String, Variable> {
        self.templating
            .list
            .iter()
            .filter(|v| v.is_supported() && !v.name.is_empty())
            .map(|v| {
                let options: Vec<String> = v.options.iter().filter_map(TemplateOption::value_text).collect();
                let selected = v
                    .options
                    .iter()
                    .find(|o| o.selected)
                    .and_then(TemplateOption::value_text);
                let value = url_values
                    .get(&v.name)
                    .cloned()
                    .or(selected)
                    .or_else(|| options.first().cloned());
                let is_query = v.variable_type == "query";

                let variable = Variable {
                    query: if is_query { v.query_text() } else { None },
                    options,
                    value,
                    include_all: v.include_all,
                    is_hidden: v.hide != 0,
                    is_loading: is_query,
                };
                (v.name.clone(), variable)
            })
            .collect()
    }
}
