use axum::Json;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use serde_json::json;
use shared::analysis::{QueryIntent, execute_intent};
use shared::llm::LlmGatewayRequest;
use shared::llm::intent::{fallback_intent, parse_intent};
use shared::llm::prompts::intent_analysis_template;
use shared::models::{QueryRequest, QueryResponse};
use shared::table::DataTable;
use tracing::{debug, warn};
use uuid::Uuid;

use super::AppState;
use super::errors::{bad_request_response, store_error_response};

const SESSION_NOT_FOUND: &str = "Session not found. Please upload a file first.";

pub(super) async fn process_query(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Response {
    let query = request.query.trim();
    if query.is_empty() {
        return bad_request_response("Query must not be empty");
    }

    // Session ids are opaque to the client; a malformed one is just an
    // unknown session, never a 4xx.
    let Some(session_id) = parse_session_id(&request.session_id) else {
        return Json(QueryResponse::text(SESSION_NOT_FOUND)).into_response();
    };

    let session = match state.store.load_data_session(session_id, Utc::now()).await {
        Ok(Some(session)) => session,
        Ok(None) => {
            return Json(QueryResponse::text(SESSION_NOT_FOUND)).into_response();
        }
        Err(err) => return store_error_response(err),
    };

    let intent = classify_query(&state, &session.table, query).await;
    debug!(
        "session {}: intent {:?} for query {query:?}",
        session.id, intent.intent
    );

    let response = match execute_intent(&session.table, &intent) {
        Ok(response) => response,
        Err(err) => QueryResponse::text(format!(
            "I encountered an error processing your request: {err}. \
             Could you please rephrase your question?"
        )),
    };

    // History is best effort; the reply is already computed.
    match serde_json::to_value(&response) {
        Ok(response_json) => {
            if let Err(err) = state
                .store
                .record_query(session.id, query, &response_json, Utc::now())
                .await
            {
                warn!("failed to save query history: {err}");
            }
        }
        Err(err) => warn!("failed to serialize query response for history: {err}"),
    }

    Json(response).into_response()
}

/// Asks the model to classify the query; any failure or unusable payload
/// degrades to keyword analysis so the endpoint never errors on the model's
/// account.
async fn classify_query(state: &AppState, table: &DataTable, query: &str) -> QueryIntent {
    let column_names = table.column_names();
    let context = json!({
        "columns": column_names,
        "dtypes": dtype_map(table),
        "row_count": table.row_count(),
        "query": query,
    });

    let request = LlmGatewayRequest::from_template(intent_analysis_template(), context);
    match state.llm.generate(request).await {
        Ok(response) => match parse_intent(&response.output) {
            Some(intent) => intent,
            None => {
                warn!("model output was not an intent object, using keyword fallback");
                fallback_intent(query, &column_names)
            }
        },
        Err(err) => {
            warn!("llm analysis failed, using keyword fallback: {err}");
            fallback_intent(query, &column_names)
        }
    }
}

fn parse_session_id(raw: &str) -> Option<Uuid> {
    Uuid::parse_str(raw.trim()).ok()
}

fn dtype_map(table: &DataTable) -> serde_json::Map<String, serde_json::Value> {
    table
        .columns
        .iter()
        .map(|column| {
            (
                column.name.clone(),
                serde_json::Value::String(column.column_type.as_str().to_string()),
            )
        })
        .collect()
}
