use serde_json::{Map, Value};

use crate::analysis::Operation;
use crate::models::{ChartSpec, ChartType};
use crate::table::{DataTable, number_to_json};

pub const COUNT_KEY: &str = "count";
pub const RANGE_KEY: &str = "range";

/// Resolves the chart type for a dataset. An explicit supported request
/// wins; unsupported requests (e.g. scatter) fall back to the automatic
/// choice so the client always receives something it can draw.
pub fn choose_chart_type(
    requested: Option<ChartType>,
    data_len: usize,
    x_is_numeric: bool,
) -> ChartType {
    if let Some(requested) = requested
        && requested.is_supported()
    {
        return requested;
    }
    if data_len <= 5 {
        ChartType::Pie
    } else if x_is_numeric {
        ChartType::Line
    } else {
        ChartType::Bar
    }
}

pub fn spec(
    chart_type: ChartType,
    data: Vec<Map<String, Value>>,
    x_axis: impl Into<String>,
    y_axis: impl Into<String>,
    title: impl Into<String>,
) -> ChartSpec {
    ChartSpec {
        chart_type,
        data,
        x_axis: x_axis.into(),
        y_axis: y_axis.into(),
        title: Some(title.into()),
    }
}

/// Equal-width binned counts of a numeric column, as `range`/`count`
/// records.
pub fn histogram(table: &DataTable, column: usize, bins: usize) -> Vec<Map<String, Value>> {
    let values = table.numeric_values(column);
    if values.is_empty() || bins == 0 {
        return Vec::new();
    }

    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let width = if max > min {
        (max - min) / bins as f64
    } else {
        1.0
    };

    let mut counts = vec![0_usize; bins];
    for value in &values {
        let mut bin = ((value - min) / width) as usize;
        if bin >= bins {
            bin = bins - 1;
        }
        counts[bin] += 1;
    }

    counts
        .iter()
        .enumerate()
        .map(|(bin, count)| {
            let start = min + width * bin as f64;
            let end = start + width;
            let mut record = Map::new();
            record.insert(
                RANGE_KEY.to_string(),
                Value::String(format!("{}-{}", fmt_bound(start), fmt_bound(end))),
            );
            record.insert(COUNT_KEY.to_string(), Value::from(*count));
            record
        })
        .collect()
}

/// Value frequencies of a column as `{column: value, count: n}` records,
/// most frequent first.
pub fn category_counts(table: &DataTable, column: usize, limit: usize) -> Vec<Map<String, Value>> {
    let name = table.columns[column].name.clone();
    table
        .value_counts(column)
        .into_iter()
        .take(limit)
        .map(|(value, count)| {
            let mut record = Map::new();
            record.insert(name.clone(), Value::String(value));
            record.insert(COUNT_KEY.to_string(), Value::from(count));
            record
        })
        .collect()
}

/// Groups rows by the x column and aggregates the numeric y column,
/// preserving first-appearance group order.
pub fn grouped_aggregate(
    table: &DataTable,
    x: usize,
    y: usize,
    operation: Operation,
    limit: usize,
) -> Vec<Map<String, Value>> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: std::collections::HashMap<String, Vec<f64>> = std::collections::HashMap::new();
    for row in &table.rows {
        let Some(key) = row[x].display() else {
            continue;
        };
        let Some(value) = row[y].as_number() else {
            continue;
        };
        if !groups.contains_key(&key) {
            order.push(key.clone());
        }
        groups.entry(key).or_default().push(value);
    }

    let x_name = table.columns[x].name.clone();
    let y_name = table.columns[y].name.clone();
    order
        .into_iter()
        .take(limit)
        .map(|key| {
            let aggregated = operation.apply(&groups[&key]);
            let mut record = Map::new();
            record.insert(x_name.clone(), Value::String(key));
            record.insert(
                y_name.clone(),
                aggregated.map_or(Value::Null, number_to_json),
            );
            record
        })
        .collect()
}

/// Raw (x, y) pairs where both cells are numeric, capped at `limit`.
pub fn numeric_pairs(table: &DataTable, x: usize, y: usize, limit: usize) -> Vec<Map<String, Value>> {
    let x_name = table.columns[x].name.clone();
    let y_name = table.columns[y].name.clone();
    table
        .rows
        .iter()
        .filter_map(|row| match (row[x].as_number(), row[y].as_number()) {
            (Some(x_value), Some(y_value)) => Some((x_value, y_value)),
            _ => None,
        })
        .take(limit)
        .map(|(x_value, y_value)| {
            let mut record = Map::new();
            record.insert(x_name.clone(), number_to_json(x_value));
            record.insert(y_name.clone(), number_to_json(y_value));
            record
        })
        .collect()
}

/// Counts of (x, y) value combinations, largest first, as records keyed by
/// both column names plus `count`.
pub fn combination_counts(
    table: &DataTable,
    x: usize,
    y: usize,
    limit: usize,
) -> Vec<Map<String, Value>> {
    let mut order: Vec<(String, String)> = Vec::new();
    let mut counts: std::collections::HashMap<(String, String), usize> =
        std::collections::HashMap::new();
    for row in &table.rows {
        let (Some(x_value), Some(y_value)) = (row[x].display(), row[y].display()) else {
            continue;
        };
        let key = (x_value, y_value);
        if !counts.contains_key(&key) {
            order.push(key.clone());
        }
        *counts.entry(key).or_insert(0) += 1;
    }
    order.sort_by(|a, b| counts[b].cmp(&counts[a]).then_with(|| a.cmp(b)));

    let x_name = table.columns[x].name.clone();
    let y_name = table.columns[y].name.clone();
    order
        .into_iter()
        .take(limit)
        .map(|key| {
            let count = counts[&key];
            let mut record = Map::new();
            record.insert(x_name.clone(), Value::String(key.0));
            record.insert(y_name.clone(), Value::String(key.1));
            record.insert(COUNT_KEY.to_string(), Value::from(count));
            record
        })
        .collect()
}

/// Sorted, evenly sampled (x, y) series for line charts over large tables.
pub fn line_sample(table: &DataTable, x: usize, y: usize, limit: usize) -> Vec<Map<String, Value>> {
    let mut pairs: Vec<(f64, f64)> = table
        .rows
        .iter()
        .filter_map(|row| match (row[x].as_number(), row[y].as_number()) {
            (Some(x_value), Some(y_value)) => Some((x_value, y_value)),
            _ => None,
        })
        .collect();
    pairs.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

    let sampled: Vec<(f64, f64)> = if pairs.len() > limit && limit > 1 {
        let step = (pairs.len() - 1) as f64 / (limit - 1) as f64;
        (0..limit)
            .map(|index| pairs[(index as f64 * step).round() as usize])
            .collect()
    } else {
        pairs
    };

    let x_name = table.columns[x].name.clone();
    let y_name = table.columns[y].name.clone();
    sampled
        .into_iter()
        .map(|(x_value, y_value)| {
            let mut record = Map::new();
            record.insert(x_name.clone(), number_to_json(x_value));
            record.insert(y_name.clone(), number_to_json(y_value));
            record
        })
        .collect()
}

/// Pie slices carry their share of the total as an extra `percentage` key.
pub fn add_percentages(data: &mut [Map<String, Value>], y_axis: &str) {
    let total: f64 = data
        .iter()
        .filter_map(|record| record.get(y_axis).and_then(Value::as_f64))
        .sum();
    if total == 0.0 {
        return;
    }
    for record in data.iter_mut() {
        let Some(value) = record.get(y_axis).and_then(Value::as_f64) else {
            continue;
        };
        let percentage = (value / total * 1000.0).round() / 10.0;
        record.insert("percentage".to_string(), number_to_json(percentage));
    }
}

fn fmt_bound(value: f64) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    if rounded.fract() == 0.0 && rounded.abs() < 1e15 {
        format!("{}", rounded as i64)
    } else {
        format!("{rounded}")
    }
}
