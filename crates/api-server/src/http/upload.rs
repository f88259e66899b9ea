use axum::Json;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use shared::analysis::{TableSummary, summarize_table};
use shared::ingest::{ALLOWED_EXTENSIONS, SpreadsheetKind, parse_spreadsheet};
use shared::models::UploadResponse;
use shared::table::{ColumnType, DataTable};
use tracing::{debug, error, info};
use uuid::Uuid;

use super::AppState;
use super::errors::{
    bad_request_response, internal_error_response, payload_too_large_response,
    store_error_response,
};

pub(super) async fn upload_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Response {
    let mut upload: Option<(String, Vec<u8>)> = None;
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(err) => {
                debug!("rejecting unreadable multipart body: {err}");
                return bad_request_response("Malformed multipart body");
            }
        };
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field
            .file_name()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(ToString::to_string);
        let Some(file_name) = file_name else {
            return bad_request_response("No file provided");
        };

        let bytes = match field.bytes().await {
            Ok(bytes) => bytes,
            Err(err) => {
                debug!("failed to read upload body: {err}");
                return read_failure_response(err.status());
            }
        };
        upload = Some((file_name, bytes.to_vec()));
        break;
    }

    let Some((file_name, bytes)) = upload else {
        return bad_request_response("No file provided");
    };

    let Some(kind) = SpreadsheetKind::from_file_name(&file_name) else {
        return bad_request_response(format!(
            "File type not supported. Allowed: {ALLOWED_EXTENSIONS}"
        ));
    };

    if bytes.len() > state.max_file_size_bytes {
        return payload_too_large_response("Uploaded file exceeds the size limit");
    }

    let session_id = Uuid::new_v4();
    let stored_name = format!("{session_id}_{}", sanitize_file_name(&file_name));
    let stored_path = state.upload_dir.join(&stored_name);
    if let Err(err) = tokio::fs::write(&stored_path, &bytes).await {
        error!("failed to persist upload {}: {err}", stored_path.display());
        return internal_error_response("Failed to store uploaded file");
    }

    let table = match parse_spreadsheet(&bytes, kind) {
        Ok(table) => table,
        Err(err) => {
            debug!("rejecting unparseable upload {file_name}: {err}");
            return bad_request_response(format!("Could not read the uploaded file: {err}"));
        }
    };

    let summary = summarize_table(&table);
    let summary_json = match serde_json::to_value(&summary) {
        Ok(value) => value,
        Err(err) => {
            error!("summary serialization failed: {err}");
            return internal_error_response("Unexpected server error");
        }
    };

    let ttl_seconds = i64::try_from(state.session_ttl_seconds).unwrap_or(i64::MAX);
    if let Err(err) = state
        .store
        .create_data_session(
            session_id,
            &file_name,
            &table,
            &summary_json,
            Utc::now(),
            ttl_seconds,
        )
        .await
    {
        return store_error_response(err);
    }

    info!(
        "created session {session_id} from {file_name} ({} bytes): {} rows, {} columns",
        bytes.len(),
        table.row_count(),
        table.column_count()
    );

    Json(UploadResponse {
        session_id,
        message: build_initial_message(&table, &summary),
        data_summary: summary_json,
    })
    .into_response()
}

/// Only the body-limit layer surfaces a 413 from the multipart reader; any
/// other read failure is a malformed request, not an oversize one.
fn read_failure_response(status: StatusCode) -> Response {
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        payload_too_large_response("Uploaded file exceeds the size limit")
    } else {
        bad_request_response("Malformed multipart body")
    }
}

/// Strips path separators and control characters so the stored name cannot
/// escape the upload directory.
fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|ch| {
            if ch.is_control() || matches!(ch, '/' | '\\' | ':') {
                '_'
            } else {
                ch
            }
        })
        .collect();
    let trimmed = cleaned.trim_matches(['.', ' ']);
    if trimmed.is_empty() {
        "upload".to_string()
    } else {
        trimmed.to_string()
    }
}

fn build_initial_message(table: &DataTable, summary: &TableSummary) -> String {
    let names = table.column_names();
    let mut shown: Vec<&str> = names.iter().take(5).map(String::as_str).collect();
    let column_list = if names.len() > 5 {
        shown.push("...");
        shown.join(", ")
    } else {
        shown.join(", ")
    };

    let numeric_count = summary
        .columns
        .iter()
        .filter(|column| column.dtype == ColumnType::Number)
        .count();
    let text_count = summary
        .columns
        .iter()
        .filter(|column| column.dtype == ColumnType::Text)
        .count();
    let missing_note = if summary.columns.iter().any(|column| column.null_count > 0) {
        "Yes, in some columns"
    } else {
        "No missing values"
    };

    format!(
        "I've successfully loaded your data!\n\
         Here's what I found:\n\n\
         Data Overview:\n\
         - {} rows x {} columns\n\
         - Columns: {column_list}\n\n\
         Quick Insights:\n\
         - Numeric columns: {numeric_count}\n\
         - Text columns: {text_count}\n\
         - Missing values: {missing_note}\n\n\
         Feel free to ask me anything about your data!\n\
         For example:\n\
         - \"Show me the distribution of [column name]\"\n\
         - \"What are the top 5 [category]?\"\n\
         - \"Create a chart comparing [column1] vs [column2]\"\n\
         - \"Find correlations between numeric columns\"",
        table.row_count(),
        table.column_count()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::table::{Cell, Column};

    #[test]
    fn only_body_limit_read_failures_map_to_413() {
        assert_eq!(
            read_failure_response(StatusCode::PAYLOAD_TOO_LARGE).status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            read_failure_response(StatusCode::BAD_REQUEST).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            read_failure_response(StatusCode::INTERNAL_SERVER_ERROR).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn sanitize_strips_path_components() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "etc_passwd");
        assert_eq!(sanitize_file_name("report Q3.xlsx"), "report Q3.xlsx");
        assert_eq!(sanitize_file_name("a\\b:c.csv"), "a_b_c.csv");
        assert_eq!(sanitize_file_name("..."), "upload");
    }

    #[test]
    fn initial_message_reports_shape_and_types() {
        let table = DataTable {
            columns: vec![
                Column {
                    name: "city".to_string(),
                    column_type: ColumnType::Text,
                },
                Column {
                    name: "population".to_string(),
                    column_type: ColumnType::Number,
                },
            ],
            rows: vec![vec![
                Cell::Text("Oslo".to_string()),
                Cell::Number(700_000.0),
            ]],
        };
        let summary = summarize_table(&table);
        let message = build_initial_message(&table, &summary);
        assert!(message.contains("1 rows x 2 columns"));
        assert!(message.contains("city, population"));
        assert!(message.contains("Numeric columns: 1"));
        assert!(message.contains("No missing values"));
    }

    #[test]
    fn initial_message_truncates_long_column_lists() {
        let columns: Vec<Column> = (0..7)
            .map(|n| Column {
                name: format!("col{n}"),
                column_type: ColumnType::Number,
            })
            .collect();
        let table = DataTable {
            columns,
            rows: Vec::new(),
        };
        let summary = summarize_table(&table);
        let message = build_initial_message(&table, &summary);
        assert!(message.contains("col0, col1, col2, col3, col4, ..."));
        assert!(!message.contains("col5"));
    }
}
