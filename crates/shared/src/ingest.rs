use std::collections::{HashMap, HashSet};
use std::io::Cursor;

use calamine::{Data, Reader, open_workbook_auto_from_rs};
use thiserror::Error;
use tracing::debug;

use crate::table::{Cell, Column, ColumnType, DataTable};

pub const ALLOWED_EXTENSIONS: &str = ".csv, .xls, .xlsx";

/// Share of values that must parse for a column to be treated as numeric.
const NUMERIC_THRESHOLD: f64 = 0.5;
/// Columns with more missing values than this are dropped.
const MISSING_DROP_THRESHOLD: f64 = 0.9;
/// Numeric columns missing less than this share get median imputation.
const IMPUTE_THRESHOLD: f64 = 0.5;

// Textual markers treated as absent. Normalized only after the empty-row
// pass so a row of markers survives as a null-bearing row.
const MISSING_MARKERS: &[&str] = &["nan", "NaN", "NULL", "null", "None"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpreadsheetKind {
    Csv,
    Excel,
}

impl SpreadsheetKind {
    /// Extension-based detection, case-insensitive. `None` means the file
    /// must be rejected before any parsing work.
    pub fn from_file_name(name: &str) -> Option<Self> {
        let lower = name.trim().to_ascii_lowercase();
        if lower.len() > 4 && lower.ends_with(".csv") {
            Some(Self::Csv)
        } else if (lower.len() > 4 && lower.ends_with(".xls"))
            || (lower.len() > 5 && lower.ends_with(".xlsx"))
        {
            Some(Self::Excel)
        } else {
            None
        }
    }
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("file is empty")]
    Empty,
    #[error("csv parse failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("workbook parse failed: {0}")]
    Workbook(String),
    #[error("no usable columns found")]
    NoColumns,
}

#[derive(Debug, Clone, PartialEq)]
enum RawCell {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl RawCell {
    fn display(&self) -> Option<String> {
        match self {
            Self::Empty => None,
            Self::Text(value) => Some(value.clone()),
            Self::Number(value) => Some(value.to_string()),
            Self::Bool(value) => Some(value.to_string()),
        }
    }
}

/// Parses raw upload bytes into a cleaned, typed table.
pub fn parse_spreadsheet(bytes: &[u8], kind: SpreadsheetKind) -> Result<DataTable, IngestError> {
    if bytes.is_empty() {
        return Err(IngestError::Empty);
    }

    let (headers, rows) = match kind {
        SpreadsheetKind::Csv => read_csv(bytes)?,
        SpreadsheetKind::Excel => read_workbook(bytes)?,
    };

    let table = build_table(headers, rows)?;
    debug!(
        rows = table.row_count(),
        columns = table.column_count(),
        "spreadsheet parsed"
    );
    Ok(table)
}

fn read_csv(bytes: &[u8]) -> Result<(Vec<String>, Vec<Vec<RawCell>>), IngestError> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(bytes);
    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|header| header.to_string())
        .collect();
    if headers.is_empty() {
        return Err(IngestError::NoColumns);
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let mut row: Vec<RawCell> = record.iter().map(raw_from_str).collect();
        row.resize(headers.len(), RawCell::Empty);
        row.truncate(headers.len());
        rows.push(row);
    }
    Ok((headers, rows))
}

fn read_workbook(bytes: &[u8]) -> Result<(Vec<String>, Vec<Vec<RawCell>>), IngestError> {
    let cursor = Cursor::new(bytes.to_vec());
    let mut workbook =
        open_workbook_auto_from_rs(cursor).map_err(|err| IngestError::Workbook(err.to_string()))?;

    let sheet_names = workbook.sheet_names().to_vec();
    let mut sheets: Vec<(String, Vec<String>, Vec<Vec<RawCell>>)> = Vec::new();
    for name in &sheet_names {
        let range = workbook
            .worksheet_range(name)
            .map_err(|err| IngestError::Workbook(err.to_string()))?;
        let mut row_iter = range.rows();
        let Some(header_row) = row_iter.next() else {
            continue;
        };
        let headers: Vec<String> = header_row.iter().map(data_display).collect();
        let rows: Vec<Vec<RawCell>> = row_iter
            .map(|row| row.iter().map(raw_from_data).collect())
            .collect();
        if headers.iter().any(|header| !header.trim().is_empty()) {
            sheets.push((name.clone(), headers, rows));
        }
    }

    match sheets.len() {
        0 => Err(IngestError::NoColumns),
        1 => {
            let (_, headers, rows) = sheets.remove(0);
            Ok((headers, rows))
        }
        _ => Ok(concat_sheets(sheets)),
    }
}

/// Multi-sheet workbooks are stacked into one table over the union of
/// their columns, with the source sheet recorded in `_sheet_name`.
fn concat_sheets(
    sheets: Vec<(String, Vec<String>, Vec<Vec<RawCell>>)>,
) -> (Vec<String>, Vec<Vec<RawCell>>) {
    let mut merged_headers: Vec<String> = Vec::new();
    for (_, headers, _) in &sheets {
        for header in headers {
            if !merged_headers.contains(header) {
                merged_headers.push(header.clone());
            }
        }
    }

    let mut merged_rows = Vec::new();
    for (sheet_name, headers, rows) in &sheets {
        let positions: Vec<Option<usize>> = merged_headers
            .iter()
            .map(|merged| headers.iter().position(|header| header == merged))
            .collect();
        for row in rows {
            let mut merged_row: Vec<RawCell> = positions
                .iter()
                .map(|position| match position {
                    Some(index) => row.get(*index).cloned().unwrap_or(RawCell::Empty),
                    None => RawCell::Empty,
                })
                .collect();
            merged_row.push(RawCell::Text(sheet_name.clone()));
            merged_rows.push(merged_row);
        }
    }

    merged_headers.push("_sheet_name".to_string());
    (merged_headers, merged_rows)
}

fn raw_from_str(value: &str) -> RawCell {
    let normalized = normalize_text(value);
    match normalized {
        Some(text) => RawCell::Text(text),
        None => RawCell::Empty,
    }
}

fn raw_from_data(value: &Data) -> RawCell {
    match value {
        Data::Empty | Data::Error(_) => RawCell::Empty,
        Data::String(text) => raw_from_str(text),
        Data::Float(number) => RawCell::Number(*number),
        Data::Int(number) => RawCell::Number(*number as f64),
        Data::Bool(flag) => RawCell::Bool(*flag),
        Data::DateTime(stamp) => match stamp.as_datetime() {
            Some(datetime) => RawCell::Text(datetime.to_string()),
            None => RawCell::Number(stamp.as_f64()),
        },
        Data::DateTimeIso(text) | Data::DurationIso(text) => RawCell::Text(text.clone()),
    }
}

fn data_display(value: &Data) -> String {
    match raw_from_data(value) {
        RawCell::Empty => String::new(),
        cell => cell.display().unwrap_or_default(),
    }
}

/// Trims and collapses internal whitespace. Missing markers pass through
/// untouched here; they are stripped during typing.
fn normalize_text(value: &str) -> Option<String> {
    let collapsed = value.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return None;
    }
    Some(collapsed)
}

fn build_table(headers: Vec<String>, rows: Vec<Vec<RawCell>>) -> Result<DataTable, IngestError> {
    let names = resolve_column_names(&headers);

    // Drop empty and near-empty columns before typing the rest.
    let total_rows = rows.len();
    let mut kept: Vec<usize> = Vec::new();
    for index in 0..names.len() {
        let missing = rows
            .iter()
            .filter(|row| matches!(row.get(index), None | Some(RawCell::Empty)))
            .count();
        let keep = if total_rows == 0 {
            true
        } else {
            (missing as f64) / (total_rows as f64) <= MISSING_DROP_THRESHOLD
        };
        if keep {
            kept.push(index);
        }
    }
    if kept.is_empty() {
        return Err(IngestError::NoColumns);
    }

    let mut clean_rows: Vec<Vec<RawCell>> = Vec::new();
    let mut seen_rows: HashSet<String> = HashSet::new();
    for row in &rows {
        let projected: Vec<RawCell> = kept
            .iter()
            .map(|&index| row.get(index).cloned().unwrap_or(RawCell::Empty))
            .collect();
        if projected.iter().all(|cell| matches!(cell, RawCell::Empty)) {
            continue;
        }
        let key = projected
            .iter()
            .map(|cell| cell.display().unwrap_or_default())
            .collect::<Vec<_>>()
            .join("\u{1f}");
        if seen_rows.insert(key) {
            clean_rows.push(projected);
        }
    }

    let row_count = clean_rows.len();
    let mut columns = Vec::new();
    let mut typed_columns: Vec<Vec<Cell>> = Vec::new();
    for (position, &source_index) in kept.iter().enumerate() {
        let values: Vec<Option<String>> = clean_rows
            .iter()
            .map(|row| {
                row[position]
                    .display()
                    .filter(|text| !MISSING_MARKERS.contains(&text.as_str()))
            })
            .collect();
        let column_type = infer_column_type(&values);
        let mut cells: Vec<Cell> = values
            .iter()
            .map(|value| materialize_cell(value.as_deref(), column_type))
            .collect();
        if column_type == ColumnType::Number {
            impute_numeric_nulls(&mut cells, row_count);
        }
        columns.push(Column {
            name: names[source_index].clone(),
            column_type,
        });
        typed_columns.push(cells);
    }
    let mut table_rows = Vec::with_capacity(row_count);
    for row_index in 0..row_count {
        let row = typed_columns
            .iter()
            .map(|column| column[row_index].clone())
            .collect();
        table_rows.push(row);
    }

    Ok(DataTable {
        columns,
        rows: table_rows,
    })
}

/// Cleans header names and resolves collisions: punctuation is stripped,
/// whitespace becomes underscores, unnamed columns get a placeholder, and
/// duplicates are suffixed `_1`, `_2`, ...
fn resolve_column_names(headers: &[String]) -> Vec<String> {
    let mut unnamed = 0_usize;
    let mut cleaned: Vec<String> = headers
        .iter()
        .map(|header| {
            let trimmed = header.trim();
            if trimmed.is_empty() || trimmed.starts_with("Unnamed") {
                unnamed += 1;
                format!("Column_{unnamed}")
            } else {
                clean_column_name(trimmed)
            }
        })
        .collect();

    let mut counts: HashMap<String, usize> = HashMap::new();
    for name in &cleaned {
        *counts.entry(name.clone()).or_insert(0) += 1;
    }
    let mut seen: HashMap<String, usize> = HashMap::new();
    for name in cleaned.iter_mut() {
        if counts[name.as_str()] > 1 {
            let occurrence = seen.entry(name.clone()).or_insert(0);
            if *occurrence > 0 {
                let suffixed = format!("{name}_{occurrence}");
                *occurrence += 1;
                *name = suffixed;
                continue;
            }
            *occurrence += 1;
        }
    }
    cleaned
}

fn clean_column_name(name: &str) -> String {
    let mut cleaned = String::new();
    for ch in name.chars() {
        if ch.is_alphanumeric() || ch == '_' {
            cleaned.push(ch);
        } else if ch.is_whitespace() {
            cleaned.push(' ');
        }
    }
    let cleaned = cleaned
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .split('_')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_");

    if cleaned.is_empty() {
        "Column".to_string()
    } else {
        cleaned
    }
}

fn infer_column_type(values: &[Option<String>]) -> ColumnType {
    let present: Vec<&str> = values
        .iter()
        .filter_map(|value| value.as_deref())
        .collect();
    if present.is_empty() {
        return ColumnType::Text;
    }

    let numeric = present
        .iter()
        .filter(|value| parse_numeric(value).is_some())
        .count();
    if (numeric as f64) / (present.len() as f64) > NUMERIC_THRESHOLD {
        return ColumnType::Number;
    }

    let distinct: HashSet<String> = present
        .iter()
        .map(|value| value.to_ascii_lowercase())
        .collect();
    if distinct.len() <= 3
        && distinct
            .iter()
            .all(|value| matches!(value.as_str(), "true" | "false" | "yes" | "no"))
    {
        return ColumnType::Bool;
    }

    ColumnType::Text
}

fn materialize_cell(value: Option<&str>, column_type: ColumnType) -> Cell {
    let Some(value) = value else {
        return Cell::Null;
    };
    match column_type {
        ColumnType::Number => parse_numeric(value).map_or(Cell::Null, Cell::Number),
        ColumnType::Bool => match value.to_ascii_lowercase().as_str() {
            "true" | "yes" => Cell::Bool(true),
            "false" | "no" => Cell::Bool(false),
            _ => Cell::Null,
        },
        ColumnType::Text => Cell::Text(value.to_string()),
    }
}

/// Fills nulls in a numeric column with the column median, but only when
/// less than half the values are missing; sparser columns keep their nulls.
fn impute_numeric_nulls(cells: &mut [Cell], row_count: usize) {
    if row_count == 0 {
        return;
    }
    let nulls = cells.iter().filter(|cell| cell.is_null()).count();
    if nulls == 0 || (nulls as f64) / (row_count as f64) >= IMPUTE_THRESHOLD {
        return;
    }

    let mut present: Vec<f64> = cells.iter().filter_map(Cell::as_number).collect();
    present.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = present.len() / 2;
    let median = if present.len() % 2 == 0 {
        (present[mid - 1] + present[mid]) / 2.0
    } else {
        present[mid]
    };

    for cell in cells.iter_mut() {
        if cell.is_null() {
            *cell = Cell::Number(median);
        }
    }
}

/// Numeric parse tolerant of currency and thousands separators. Rejects
/// non-finite values so cells always serialize to JSON numbers.
fn parse_numeric(value: &str) -> Option<f64> {
    let stripped: String = value
        .chars()
        .filter(|ch| *ch != ',' && *ch != '$')
        .collect();
    let trimmed = stripped.trim();
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.parse::<f64>() {
        Ok(parsed) if parsed.is_finite() => Some(parsed),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_spreadsheet_kind_from_extension() {
        assert_eq!(
            SpreadsheetKind::from_file_name("sales.csv"),
            Some(SpreadsheetKind::Csv)
        );
        assert_eq!(
            SpreadsheetKind::from_file_name("Report.XLSX"),
            Some(SpreadsheetKind::Excel)
        );
        assert_eq!(
            SpreadsheetKind::from_file_name("legacy.xls"),
            Some(SpreadsheetKind::Excel)
        );
        assert_eq!(SpreadsheetKind::from_file_name("notes.txt"), None);
        assert_eq!(SpreadsheetKind::from_file_name(".csv"), None);
    }

    #[test]
    fn parses_csv_with_type_inference() {
        let bytes = b"region,revenue\nwest,\"$1,200\"\neast,300\nsouth,450.5\n";
        let table = parse_spreadsheet(bytes, SpreadsheetKind::Csv).expect("csv parses");
        assert_eq!(table.column_names(), vec!["region", "revenue"]);
        assert_eq!(table.column_type(1), ColumnType::Number);
        assert_eq!(table.numeric_values(1), vec![1200.0, 300.0, 450.5]);
    }

    #[test]
    fn cleans_and_deduplicates_column_names() {
        let bytes = b"Total Sales ($),Total Sales ($),,notes!\na,b,c,d\n";
        let table = parse_spreadsheet(bytes, SpreadsheetKind::Csv).expect("csv parses");
        assert_eq!(
            table.column_names(),
            vec!["Total_Sales", "Total_Sales_1", "Column_1", "notes"]
        );
    }

    #[test]
    fn drops_empty_columns_and_duplicate_rows() {
        let bytes = b"a,b,empty\n1,x,\n1,x,\n2,y,\n,,\n";
        let table = parse_spreadsheet(bytes, SpreadsheetKind::Csv).expect("csv parses");
        assert_eq!(table.column_names(), vec!["a", "b"]);
        assert_eq!(table.row_count(), 2);
    }

    #[test]
    fn missing_markers_become_null() {
        let bytes = b"name,score\nalice,10\nNULL,nan\n";
        let table = parse_spreadsheet(bytes, SpreadsheetKind::Csv).expect("csv parses");
        assert_eq!(table.null_count(0), 1);
        assert_eq!(table.null_count(1), 1);
    }

    #[test]
    fn all_marker_rows_survive_instead_of_being_dropped() {
        let bytes = b"name,score\nalice,10\nbob,20\nNULL,nan\n";
        let table = parse_spreadsheet(bytes, SpreadsheetKind::Csv).expect("csv parses");
        assert_eq!(table.row_count(), 3);
        assert!(table.rows[2][0].is_null());
        // The sparse numeric cell is median-imputed rather than left null.
        assert_eq!(table.rows[2][1], crate::table::Cell::Number(15.0));
    }

    #[test]
    fn sparse_numeric_columns_get_median_imputation() {
        let bytes = b"name,v\na,1\nb,2\nc,3\nd,\n";
        let table = parse_spreadsheet(bytes, SpreadsheetKind::Csv).expect("csv parses");
        assert_eq!(table.null_count(1), 0);
        assert_eq!(table.numeric_values(1), vec![1.0, 2.0, 3.0, 2.0]);
    }

    #[test]
    fn mostly_missing_numeric_columns_keep_their_nulls() {
        let bytes = b"name,v\na,1\nb,\nc,\nd,4\n";
        let table = parse_spreadsheet(bytes, SpreadsheetKind::Csv).expect("csv parses");
        assert_eq!(table.column_type(1), ColumnType::Number);
        assert_eq!(table.null_count(1), 2);
    }

    #[test]
    fn infers_boolean_columns() {
        let bytes = b"name,active\na,yes\nb,no\nc,yes\n";
        let table = parse_spreadsheet(bytes, SpreadsheetKind::Csv).expect("csv parses");
        assert_eq!(table.column_type(1), ColumnType::Bool);
        assert_eq!(
            table.rows[0][1],
            crate::table::Cell::Bool(true)
        );
    }

    #[test]
    fn rejects_empty_input() {
        assert!(matches!(
            parse_spreadsheet(b"", SpreadsheetKind::Csv),
            Err(IngestError::Empty)
        ));
    }
}
