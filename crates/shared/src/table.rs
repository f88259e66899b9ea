use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

/// Inferred type of a column after ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Number,
    Bool,
    Text,
}

impl ColumnType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Number => "number",
            Self::Bool => "bool",
            Self::Text => "text",
        }
    }
}

/// A single table cell. Serializes to the natural JSON scalar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl Cell {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            _ => None,
        }
    }

    /// Display form used for grouping and value counts. Null has no form.
    pub fn display(&self) -> Option<String> {
        match self {
            Self::Null => None,
            Self::Bool(value) => Some(value.to_string()),
            Self::Number(value) => Some(format_number(*value)),
            Self::Text(value) => Some(value.clone()),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Bool(value) => Value::Bool(*value),
            Self::Number(value) => number_to_json(*value),
            Self::Text(value) => Value::String(value.clone()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub column_type: ColumnType,
}

/// Immutable snapshot of an uploaded spreadsheet: ordered named columns and
/// row-major cells. Every row has exactly `columns.len()` cells.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataTable {
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<Cell>>,
}

impl DataTable {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|col| col.name.clone()).collect()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|col| col.name == name)
    }

    pub fn column_type(&self, index: usize) -> ColumnType {
        self.columns[index].column_type
    }

    pub fn is_numeric(&self, index: usize) -> bool {
        self.columns[index].column_type == ColumnType::Number
    }

    pub fn cells(&self, index: usize) -> impl Iterator<Item = &Cell> {
        self.rows.iter().map(move |row| &row[index])
    }

    /// Non-null numeric values of a column, in row order.
    pub fn numeric_values(&self, index: usize) -> Vec<f64> {
        self.cells(index).filter_map(Cell::as_number).collect()
    }

    pub fn null_count(&self, index: usize) -> usize {
        self.cells(index).filter(|cell| cell.is_null()).count()
    }

    pub fn non_null_count(&self, index: usize) -> usize {
        self.row_count() - self.null_count(index)
    }

    pub fn unique_count(&self, index: usize) -> usize {
        let mut seen = std::collections::HashSet::new();
        for cell in self.cells(index) {
            if let Some(display) = cell.display() {
                seen.insert(display);
            }
        }
        seen.len()
    }

    /// Most frequent non-null value of a column.
    pub fn mode(&self, index: usize) -> Option<String> {
        self.value_counts(index).into_iter().next().map(|(v, _)| v)
    }

    /// Non-null value frequencies, most frequent first. Ties break on the
    /// value itself so the ordering is deterministic.
    pub fn value_counts(&self, index: usize) -> Vec<(String, usize)> {
        let mut counts: HashMap<String, usize> = HashMap::new();
        for cell in self.cells(index) {
            if let Some(display) = cell.display() {
                *counts.entry(display).or_insert(0) += 1;
            }
        }
        let mut counts: Vec<(String, usize)> = counts.into_iter().collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        counts
    }

    /// The first `limit` rows of the given columns as JSON records.
    pub fn records(&self, column_indexes: &[usize], limit: usize) -> Vec<Map<String, Value>> {
        self.rows
            .iter()
            .take(limit)
            .map(|row| {
                let mut record = Map::new();
                for &index in column_indexes {
                    record.insert(self.columns[index].name.clone(), row[index].to_json());
                }
                record
            })
            .collect()
    }
}

/// Non-finite floats have no JSON representation and become null.
pub fn number_to_json(value: f64) -> Value {
    Number::from_f64(value).map_or(Value::Null, Value::Number)
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> DataTable {
        DataTable {
            columns: vec![
                Column {
                    name: "region".to_string(),
                    column_type: ColumnType::Text,
                },
                Column {
                    name: "sales".to_string(),
                    column_type: ColumnType::Number,
                },
            ],
            rows: vec![
                vec![Cell::Text("west".to_string()), Cell::Number(10.0)],
                vec![Cell::Text("east".to_string()), Cell::Number(20.0)],
                vec![Cell::Text("west".to_string()), Cell::Null],
            ],
        }
    }

    #[test]
    fn value_counts_order_most_frequent_first() {
        let table = sample_table();
        let counts = table.value_counts(0);
        assert_eq!(
            counts,
            vec![("west".to_string(), 2), ("east".to_string(), 1)]
        );
    }

    #[test]
    fn numeric_values_skip_nulls() {
        let table = sample_table();
        assert_eq!(table.numeric_values(1), vec![10.0, 20.0]);
        assert_eq!(table.null_count(1), 1);
        assert_eq!(table.non_null_count(1), 2);
    }

    #[test]
    fn records_respect_limit_and_column_selection() {
        let table = sample_table();
        let records = table.records(&[1], 2);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["sales"], serde_json::json!(10.0));
        assert!(!records[0].contains_key("region"));
    }

    #[test]
    fn cells_round_trip_through_json() {
        let table = sample_table();
        let json = serde_json::to_value(&table).expect("table serializes");
        let restored: DataTable = serde_json::from_value(json).expect("table deserializes");
        assert_eq!(restored.rows, table.rows);
        assert_eq!(restored.column_names(), table.column_names());
    }

    #[test]
    fn non_finite_numbers_become_null_json() {
        assert_eq!(number_to_json(f64::NAN), Value::Null);
        assert_eq!(number_to_json(1.5), serde_json::json!(1.5));
    }
}
