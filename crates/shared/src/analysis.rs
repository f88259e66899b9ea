use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::charts;
use crate::models::{ChartType, QueryResponse};
use crate::table::{ColumnType, DataTable, number_to_json};

const FILTER_ROW_LIMIT: usize = 20;
const SUMMARY_COLUMN_LIMIT: usize = 5;
const SUMMARY_ROW_LIMIT: usize = 10;
const CORRELATION_THRESHOLD: f64 = 0.5;
const STRONG_CORRELATION: f64 = 0.7;
const COMPARE_SAMPLE_LIMIT: usize = 100;
const CHART_GROUP_LIMIT: usize = 20;
const HISTOGRAM_BINS: usize = 10;

/// What the user wants done with the table, as classified by the language
/// model or the keyword fallback.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryIntent {
    pub intent: IntentKind,
    pub columns: Vec<String>,
    pub operation: Operation,
    pub filters: Map<String, Value>,
    pub chart_type: Option<ChartType>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentKind {
    Summarize,
    Filter,
    Aggregate,
    Visualize,
    Compare,
    Correlation,
}

impl IntentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Summarize => "summarize",
            Self::Filter => "filter",
            Self::Aggregate => "aggregate",
            Self::Visualize => "visualize",
            Self::Compare => "compare",
            Self::Correlation => "correlation",
        }
    }

    /// Unknown labels degrade to summarize rather than failing the query.
    pub fn from_str_lossy(value: &str) -> Self {
        match value {
            "filter" => Self::Filter,
            "aggregate" => Self::Aggregate,
            "visualize" => Self::Visualize,
            "compare" => Self::Compare,
            "correlation" => Self::Correlation,
            _ => Self::Summarize,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Sum,
    Mean,
    Count,
    Max,
    Min,
    Describe,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sum => "sum",
            Self::Mean => "mean",
            Self::Count => "count",
            Self::Max => "max",
            Self::Min => "min",
            Self::Describe => "describe",
        }
    }

    pub fn from_str_lossy(value: &str) -> Self {
        match value {
            "sum" => Self::Sum,
            "mean" => Self::Mean,
            "count" => Self::Count,
            "max" => Self::Max,
            "min" => Self::Min,
            _ => Self::Describe,
        }
    }

    /// Aggregates a group of values; `Describe` behaves as mean when a
    /// single figure per group is needed.
    pub fn apply(self, values: &[f64]) -> Option<f64> {
        if values.is_empty() {
            return None;
        }
        match self {
            Self::Sum => Some(values.iter().sum()),
            Self::Mean | Self::Describe => Some(mean(values)),
            Self::Count => Some(values.len() as f64),
            Self::Max => values.iter().cloned().reduce(f64::max),
            Self::Min => values.iter().cloned().reduce(f64::min),
        }
    }
}

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("the table has no columns to analyze")]
    NoColumns,
    #[error("chart construction produced an inconsistent spec: {0}")]
    InvalidChart(String),
}

/// Runs a classified intent against the session table, producing the reply
/// the client renders. Graceful degradations (no matches, no numeric
/// columns) are successful replies; only internal inconsistencies error.
pub fn execute_intent(
    table: &DataTable,
    intent: &QueryIntent,
) -> Result<QueryResponse, AnalysisError> {
    if table.column_count() == 0 {
        return Err(AnalysisError::NoColumns);
    }

    if intent.intent == IntentKind::Visualize || intent.chart_type.is_some() {
        return visualize(table, &intent.columns, intent.chart_type.clone(), intent.operation);
    }

    Ok(match intent.intent {
        IntentKind::Aggregate => aggregate(table, &intent.columns, intent.operation),
        IntentKind::Filter => filter_rows(table, &intent.filters),
        IntentKind::Compare => compare_columns(table, &intent.columns),
        IntentKind::Correlation => find_correlations(table),
        IntentKind::Summarize | IntentKind::Visualize => summarize_rows(table, &intent.columns),
    })
}

fn visualize(
    table: &DataTable,
    requested: &[String],
    requested_type: Option<ChartType>,
    operation: Operation,
) -> Result<QueryResponse, AnalysisError> {
    let mut columns = resolve_columns(table, requested);
    if columns.is_empty() {
        columns = (0..table.column_count().min(2)).collect();
    }

    let (data, x_axis, y_axis) = if columns.len() == 1 {
        let column = columns[0];
        if table.is_numeric(column) {
            let data = charts::histogram(table, column, HISTOGRAM_BINS);
            (data, charts::RANGE_KEY.to_string(), charts::COUNT_KEY.to_string())
        } else {
            let data = charts::category_counts(table, column, 10);
            (
                data,
                table.columns[column].name.clone(),
                charts::COUNT_KEY.to_string(),
            )
        }
    } else {
        let (x, y) = (columns[0], columns[1]);
        if table.is_numeric(y) {
            if table.is_numeric(x) {
                let data = charts::numeric_pairs(table, x, y, 200);
                (
                    data,
                    table.columns[x].name.clone(),
                    table.columns[y].name.clone(),
                )
            } else {
                let data = charts::grouped_aggregate(table, x, y, operation, CHART_GROUP_LIMIT);
                (
                    data,
                    table.columns[x].name.clone(),
                    table.columns[y].name.clone(),
                )
            }
        } else {
            let data = charts::combination_counts(table, x, y, CHART_GROUP_LIMIT);
            (
                data,
                table.columns[x].name.clone(),
                charts::COUNT_KEY.to_string(),
            )
        }
    };

    let x_is_numeric = table.is_numeric(columns[0]);
    let chart_type = charts::choose_chart_type(requested_type, data.len(), x_is_numeric);
    let mut data = data;
    if chart_type == ChartType::Pie {
        charts::add_percentages(&mut data, &y_axis);
    }

    let point_count = data.len();
    let chart = charts::spec(
        chart_type.clone(),
        data,
        x_axis.clone(),
        y_axis.clone(),
        format!("{y_axis} by {x_axis}"),
    );
    chart
        .validate()
        .map_err(|err| AnalysisError::InvalidChart(err.to_string()))?;

    Ok(QueryResponse::text(format!(
        "Here's a {} chart showing {y_axis} by {x_axis}. Showing up to {point_count} items.",
        chart_type.as_str()
    ))
    .with_chart(chart))
}

fn aggregate(table: &DataTable, requested: &[String], operation: Operation) -> QueryResponse {
    let numeric: Vec<usize> = (0..table.column_count())
        .filter(|&index| table.is_numeric(index))
        .collect();

    let wants_all = requested.is_empty() || requested.iter().any(|name| name == "*");
    let columns: Vec<usize> = if wants_all {
        numeric
    } else {
        resolve_columns(table, requested)
            .into_iter()
            .filter(|&index| table.is_numeric(index))
            .collect()
    };

    if columns.is_empty() {
        return QueryResponse::text(
            "No numeric columns found for aggregation. Please specify numeric columns.",
        );
    }

    let data: Vec<Map<String, Value>> = if operation == Operation::Describe {
        columns
            .iter()
            .map(|&index| {
                let values = table.numeric_values(index);
                let mut record = Map::new();
                record.insert(
                    "Column".to_string(),
                    Value::String(table.columns[index].name.clone()),
                );
                record.insert("Count".to_string(), Value::from(values.len()));
                record.insert("Mean".to_string(), optional_stat(&values, mean));
                record.insert(
                    "Min".to_string(),
                    optional_stat(&values, |v| v.iter().cloned().fold(f64::INFINITY, f64::min)),
                );
                record.insert(
                    "Max".to_string(),
                    optional_stat(&values, |v| {
                        v.iter().cloned().fold(f64::NEG_INFINITY, f64::max)
                    }),
                );
                record
            })
            .collect()
    } else {
        columns
            .iter()
            .map(|&index| {
                let values = table.numeric_values(index);
                let mut record = Map::new();
                record.insert(
                    "Column".to_string(),
                    Value::String(table.columns[index].name.clone()),
                );
                record.insert(
                    "Value".to_string(),
                    operation
                        .apply(&values)
                        .map_or(Value::Null, |v| number_to_json(round2(v))),
                );
                record
            })
            .collect()
    };

    QueryResponse::text(format!(
        "Here are the {} values for the requested columns:",
        operation.as_str()
    ))
    .with_data(data)
}

fn filter_rows(table: &DataTable, filters: &Map<String, Value>) -> QueryResponse {
    let active: Vec<(usize, &Value)> = filters
        .iter()
        .filter_map(|(name, value)| table.column_index(name).map(|index| (index, value)))
        .collect();

    let matching: Vec<usize> = table
        .rows
        .iter()
        .enumerate()
        .filter(|(_, row)| {
            active
                .iter()
                .all(|(index, value)| cell_matches(&row[*index], value))
        })
        .map(|(index, _)| index)
        .collect();

    if matching.is_empty() {
        return QueryResponse::text(
            "No data matches the specified filters. Try adjusting your criteria.",
        );
    }

    let all_columns: Vec<usize> = (0..table.column_count()).collect();
    let data: Vec<Map<String, Value>> = matching
        .iter()
        .take(FILTER_ROW_LIMIT)
        .map(|&row_index| row_record(table, row_index, &all_columns))
        .collect();

    QueryResponse::text(format!(
        "Found {} matching records. Showing the first {FILTER_ROW_LIMIT}:",
        matching.len()
    ))
    .with_data(data)
}

fn compare_columns(table: &DataTable, requested: &[String]) -> QueryResponse {
    let columns = resolve_columns(table, requested);
    if columns.len() < 2 {
        return QueryResponse::text("Please specify at least two columns to compare.");
    }
    let columns: Vec<usize> = columns.into_iter().take(3).collect();

    let numeric: Vec<usize> = columns
        .iter()
        .copied()
        .filter(|&index| table.is_numeric(index))
        .collect();

    let mut data: Vec<Map<String, Value>> = Vec::new();
    for &index in &numeric {
        let values = table.numeric_values(index);
        let mut record = Map::new();
        record.insert(
            "Column".to_string(),
            Value::String(table.columns[index].name.clone()),
        );
        record.insert("Mean".to_string(), optional_stat(&values, mean));
        record.insert("Median".to_string(), optional_stat(&values, median));
        record.insert("Std Dev".to_string(), optional_stat(&values, std_dev));
        record.insert(
            "Min".to_string(),
            optional_stat(&values, |v| v.iter().cloned().fold(f64::INFINITY, f64::min)),
        );
        record.insert(
            "Max".to_string(),
            optional_stat(&values, |v| {
                v.iter().cloned().fold(f64::NEG_INFINITY, f64::max)
            }),
        );
        data.push(record);
    }
    for index in columns.iter().copied().filter(|index| !numeric.contains(index)) {
        let mut record = Map::new();
        record.insert(
            "Column".to_string(),
            Value::String(table.columns[index].name.clone()),
        );
        record.insert(
            "Unique Values".to_string(),
            Value::from(table.unique_count(index)),
        );
        record.insert(
            "Most Common".to_string(),
            table
                .mode(index)
                .map_or(Value::String("N/A".to_string()), Value::String),
        );
        record.insert(
            "Missing Values".to_string(),
            Value::from(table.null_count(index)),
        );
        data.push(record);
    }

    let names: Vec<String> = columns
        .iter()
        .map(|&index| table.columns[index].name.clone())
        .collect();
    let mut response =
        QueryResponse::text(format!("Comparison of {}:", names.join(", "))).with_data(data);

    if numeric.len() >= 2 {
        let (x, y) = (numeric[0], numeric[1]);
        let series = charts::line_sample(table, x, y, COMPARE_SAMPLE_LIMIT);
        let chart = charts::spec(
            ChartType::Line,
            series,
            table.columns[x].name.clone(),
            table.columns[y].name.clone(),
            format!(
                "Comparison: {} vs {}",
                table.columns[x].name, table.columns[y].name
            ),
        );
        response = response.with_chart(chart);
    }

    response
}

fn find_correlations(table: &DataTable) -> QueryResponse {
    let numeric: Vec<usize> = (0..table.column_count())
        .filter(|&index| table.is_numeric(index))
        .collect();
    if numeric.is_empty() {
        return QueryResponse::text("No numeric columns found for correlation analysis.");
    }

    let mut correlations: Vec<(f64, Map<String, Value>)> = Vec::new();
    for (position, &left) in numeric.iter().enumerate() {
        for &right in &numeric[position + 1..] {
            let Some(r) = pearson(table, left, right) else {
                continue;
            };
            if r.abs() <= CORRELATION_THRESHOLD {
                continue;
            }
            let mut record = Map::new();
            record.insert(
                "Column 1".to_string(),
                Value::String(table.columns[left].name.clone()),
            );
            record.insert(
                "Column 2".to_string(),
                Value::String(table.columns[right].name.clone()),
            );
            record.insert("Correlation".to_string(), number_to_json(round3(r)));
            record.insert(
                "Strength".to_string(),
                Value::String(
                    if r.abs() > STRONG_CORRELATION {
                        "Strong"
                    } else {
                        "Moderate"
                    }
                    .to_string(),
                ),
            );
            correlations.push((r.abs(), record));
        }
    }

    correlations.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    if correlations.is_empty() {
        return QueryResponse::text(
            "No strong correlations found between numeric columns (threshold: |r| > 0.5).",
        );
    }

    let count = correlations.len();
    let data: Vec<Map<String, Value>> = correlations
        .into_iter()
        .take(10)
        .map(|(_, record)| record)
        .collect();
    QueryResponse::text(format!("Found {count} significant correlations:")).with_data(data)
}

fn summarize_rows(table: &DataTable, requested: &[String]) -> QueryResponse {
    let mut columns = resolve_columns(table, requested);
    if columns.is_empty() {
        columns = (0..table.column_count()).collect();
    }
    let columns: Vec<usize> = columns.into_iter().take(SUMMARY_COLUMN_LIMIT).collect();

    let names: Vec<String> = columns
        .iter()
        .map(|&index| table.columns[index].name.clone())
        .collect();
    let data = table.records(&columns, SUMMARY_ROW_LIMIT);
    QueryResponse::text(format!("Summary of {}:", names.join(", "))).with_data(data)
}

/// Per-column overview persisted with the session and returned from upload.
#[derive(Debug, Clone, Serialize)]
pub struct TableSummary {
    pub row_count: usize,
    pub column_count: usize,
    pub columns: Vec<ColumnSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ColumnSummary {
    pub name: String,
    pub dtype: ColumnType,
    pub non_null_count: usize,
    pub null_count: usize,
    pub unique_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub most_common: Option<String>,
}

pub fn summarize_table(table: &DataTable) -> TableSummary {
    let columns = (0..table.column_count())
        .map(|index| {
            let dtype = table.column_type(index);
            let (mean_value, min_value, max_value, most_common) = if dtype == ColumnType::Number {
                let values = table.numeric_values(index);
                if values.is_empty() {
                    (None, None, None, None)
                } else {
                    (
                        Some(round2(mean(&values))),
                        Some(round2(values.iter().cloned().fold(f64::INFINITY, f64::min))),
                        Some(round2(
                            values.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
                        )),
                        None,
                    )
                }
            } else {
                (None, None, None, table.mode(index))
            };
            ColumnSummary {
                name: table.columns[index].name.clone(),
                dtype,
                non_null_count: table.non_null_count(index),
                null_count: table.null_count(index),
                unique_count: table.unique_count(index),
                mean: mean_value,
                min: min_value,
                max: max_value,
                most_common,
            }
        })
        .collect();

    TableSummary {
        row_count: table.row_count(),
        column_count: table.column_count(),
        columns,
    }
}

fn resolve_columns(table: &DataTable, requested: &[String]) -> Vec<usize> {
    requested
        .iter()
        .filter_map(|name| table.column_index(name))
        .collect()
}

fn row_record(table: &DataTable, row_index: usize, columns: &[usize]) -> Map<String, Value> {
    let mut record = Map::new();
    for &index in columns {
        record.insert(
            table.columns[index].name.clone(),
            table.rows[row_index][index].to_json(),
        );
    }
    record
}

fn cell_matches(cell: &crate::table::Cell, expected: &Value) -> bool {
    match expected {
        Value::Null => cell.is_null(),
        Value::Bool(flag) => matches!(cell, crate::table::Cell::Bool(value) if value == flag),
        Value::Number(number) => number
            .as_f64()
            .is_some_and(|expected| cell.as_number() == Some(expected)),
        Value::String(text) => cell.display().as_deref() == Some(text.as_str()),
        _ => false,
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Sample standard deviation; zero for a single observation.
fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance =
        values.iter().map(|value| (value - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

/// Pearson correlation over rows where both cells are numeric. `None` when
/// fewer than two complete pairs exist or either side is constant.
fn pearson(table: &DataTable, left: usize, right: usize) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = table
        .rows
        .iter()
        .filter_map(|row| match (row[left].as_number(), row[right].as_number()) {
            (Some(a), Some(b)) => Some((a, b)),
            _ => None,
        })
        .collect();
    if pairs.len() < 2 {
        return None;
    }

    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|(_, y)| y).sum::<f64>() / n;
    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in &pairs {
        cov += (x - mean_x) * (y - mean_y);
        var_x += (x - mean_x).powi(2);
        var_y += (y - mean_y).powi(2);
    }
    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }
    Some(cov / (var_x.sqrt() * var_y.sqrt()))
}

fn optional_stat(values: &[f64], stat: impl Fn(&[f64]) -> f64) -> Value {
    if values.is_empty() {
        Value::Null
    } else {
        number_to_json(round2(stat(values)))
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{Cell, Column};
    use serde_json::json;

    fn sales_table() -> DataTable {
        DataTable {
            columns: vec![
                Column {
                    name: "region".to_string(),
                    column_type: ColumnType::Text,
                },
                Column {
                    name: "units".to_string(),
                    column_type: ColumnType::Number,
                },
                Column {
                    name: "revenue".to_string(),
                    column_type: ColumnType::Number,
                },
            ],
            rows: vec![
                vec![
                    Cell::Text("west".to_string()),
                    Cell::Number(1.0),
                    Cell::Number(10.0),
                ],
                vec![
                    Cell::Text("east".to_string()),
                    Cell::Number(2.0),
                    Cell::Number(20.0),
                ],
                vec![
                    Cell::Text("west".to_string()),
                    Cell::Number(3.0),
                    Cell::Number(30.0),
                ],
                vec![
                    Cell::Text("north".to_string()),
                    Cell::Number(4.0),
                    Cell::Number(40.0),
                ],
            ],
        }
    }

    fn intent(kind: IntentKind) -> QueryIntent {
        QueryIntent {
            intent: kind,
            columns: Vec::new(),
            operation: Operation::Describe,
            filters: Map::new(),
            chart_type: None,
        }
    }

    #[test]
    fn aggregate_sums_numeric_columns() {
        let table = sales_table();
        let response = aggregate(&table, &["units".to_string()], Operation::Sum);
        let data = response.data.expect("data present");
        assert_eq!(data.len(), 1);
        assert_eq!(data[0]["Column"], json!("units"));
        assert_eq!(data[0]["Value"], json!(10.0));
    }

    #[test]
    fn aggregate_without_numeric_columns_degrades_to_text() {
        let table = DataTable {
            columns: vec![Column {
                name: "name".to_string(),
                column_type: ColumnType::Text,
            }],
            rows: vec![vec![Cell::Text("a".to_string())]],
        };
        let response = aggregate(&table, &[], Operation::Sum);
        assert!(response.data.is_none());
        assert!(response.text.contains("No numeric columns"));
    }

    #[test]
    fn filter_matches_equality_and_caps_rows() {
        let table = sales_table();
        let mut filters = Map::new();
        filters.insert("region".to_string(), json!("west"));
        let response = filter_rows(&table, &filters);
        let data = response.data.expect("data present");
        assert_eq!(data.len(), 2);
        assert!(response.text.starts_with("Found 2 matching records"));
    }

    #[test]
    fn filter_with_no_matches_degrades_to_text() {
        let table = sales_table();
        let mut filters = Map::new();
        filters.insert("region".to_string(), json!("atlantis"));
        let response = filter_rows(&table, &filters);
        assert!(response.data.is_none());
        assert!(response.text.contains("No data matches"));
    }

    #[test]
    fn correlation_reports_perfectly_related_columns() {
        let table = sales_table();
        let response = find_correlations(&table);
        let data = response.data.expect("data present");
        assert_eq!(data.len(), 1);
        assert_eq!(data[0]["Correlation"], json!(1.0));
        assert_eq!(data[0]["Strength"], json!("Strong"));
    }

    #[test]
    fn compare_emits_stats_and_line_chart() {
        let table = sales_table();
        let response =
            compare_columns(&table, &["units".to_string(), "revenue".to_string()]);
        let data = response.data.expect("data present");
        assert_eq!(data.len(), 2);
        assert_eq!(data[0]["Mean"], json!(2.5));
        let chart = response.chart.expect("chart present");
        assert_eq!(chart.chart_type, ChartType::Line);
        assert!(chart.validate().is_ok());
    }

    #[test]
    fn summarize_caps_columns_and_rows() {
        let table = sales_table();
        let response = summarize_rows(&table, &[]);
        let data = response.data.expect("data present");
        assert_eq!(data.len(), 4);
        assert!(data[0].contains_key("region"));
        assert!(response.text.starts_with("Summary of"));
    }

    #[test]
    fn visualize_categorical_column_counts_values() {
        let table = sales_table();
        let mut request = intent(IntentKind::Visualize);
        request.columns = vec!["region".to_string()];
        let response = execute_intent(&table, &request).expect("visualize succeeds");
        let chart = response.chart.expect("chart present");
        assert_eq!(chart.x_axis, "region");
        assert_eq!(chart.y_axis, "count");
        assert_eq!(chart.chart_type, ChartType::Pie);
        assert!(chart.validate().is_ok());
    }

    #[test]
    fn chart_request_forces_visualization() {
        let table = sales_table();
        let mut request = intent(IntentKind::Summarize);
        request.chart_type = Some(ChartType::Bar);
        request.columns = vec!["region".to_string(), "units".to_string()];
        let response = execute_intent(&table, &request).expect("visualize succeeds");
        let chart = response.chart.expect("chart present");
        assert_eq!(chart.chart_type, ChartType::Bar);
    }

    #[test]
    fn table_summary_covers_all_columns() {
        let table = sales_table();
        let summary = summarize_table(&table);
        assert_eq!(summary.row_count, 4);
        assert_eq!(summary.columns.len(), 3);
        assert_eq!(summary.columns[0].most_common.as_deref(), Some("west"));
        assert_eq!(summary.columns[1].mean, Some(2.5));
    }
}
