use serde_json::{Map, Value};

use crate::analysis::{IntentKind, Operation, QueryIntent};
use crate::models::ChartType;

/// Lenient extraction of a structured intent from model output. Missing or
/// malformed fields take defaults; `None` only when the payload is not an
/// object at all.
pub fn parse_intent(output: &Value) -> Option<QueryIntent> {
    let object = output.as_object()?;

    let intent = object
        .get("intent")
        .and_then(Value::as_str)
        .map_or(IntentKind::Summarize, IntentKind::from_str_lossy);

    let columns = object
        .get("columns")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(ToString::to_string)
                .collect()
        })
        .unwrap_or_default();

    let operation = object
        .get("operation")
        .and_then(Value::as_str)
        .map_or(Operation::Describe, Operation::from_str_lossy);

    let filters = object
        .get("filters")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();

    let chart_type = object
        .get("chart_type")
        .and_then(Value::as_str)
        .filter(|label| !label.is_empty() && *label != "null" && *label != "none")
        .map(|label| ChartType::from(label.to_string()));

    Some(QueryIntent {
        intent,
        columns,
        operation,
        filters,
        chart_type,
    })
}

/// Keyword classification used when the model is unavailable or returns
/// garbage. Mirrors the model's contract so downstream execution is
/// identical either way.
pub fn fallback_intent(query: &str, column_names: &[String]) -> QueryIntent {
    let query_lower = query.to_lowercase();

    let intent = if contains_any(&query_lower, &["chart", "plot", "graph", "visualize"]) {
        IntentKind::Visualize
    } else if contains_any(&query_lower, &["filter", "where", "only"]) {
        IntentKind::Filter
    } else if contains_any(&query_lower, &["average", "sum", "total", "count", "mean"]) {
        IntentKind::Aggregate
    } else if contains_any(&query_lower, &["compare", "versus", "vs"]) {
        IntentKind::Compare
    } else if contains_any(&query_lower, &["correlation", "relate"]) {
        IntentKind::Correlation
    } else {
        IntentKind::Summarize
    };

    let mut mentioned: Vec<String> = column_names
        .iter()
        .filter(|name| query_lower.contains(&name.to_lowercase()))
        .cloned()
        .collect();
    if mentioned.is_empty() {
        mentioned = column_names.iter().take(2).cloned().collect();
    }

    let chart_type = if query_lower.contains("bar") {
        Some(ChartType::Bar)
    } else if query_lower.contains("line") {
        Some(ChartType::Line)
    } else if query_lower.contains("pie") {
        Some(ChartType::Pie)
    } else {
        None
    };

    QueryIntent {
        intent,
        columns: mentioned,
        operation: detect_operation(&query_lower),
        filters: Map::new(),
        chart_type,
    }
}

fn detect_operation(query_lower: &str) -> Operation {
    if contains_any(query_lower, &["sum", "total"]) {
        Operation::Sum
    } else if contains_any(query_lower, &["average", "mean"]) {
        Operation::Mean
    } else if query_lower.contains("count") {
        Operation::Count
    } else if contains_any(query_lower, &["max", "maximum"]) {
        Operation::Max
    } else if contains_any(query_lower, &["min", "minimum"]) {
        Operation::Min
    } else {
        Operation::Describe
    }
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}
