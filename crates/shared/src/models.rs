use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Ai,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub session_id: Uuid,
    pub message: String,
    pub data_summary: Value,
}

/// The session id is opaque to the client; it stays a string here so a
/// malformed id reaches the handler and gets the session-not-found reply
/// instead of a deserialization rejection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    pub session_id: String,
    pub query: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub sender: Sender,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<Map<String, Value>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart: Option<ChartSpec>,
}

impl QueryResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::Ai,
            text: text.into(),
            data: None,
            chart: None,
        }
    }

    pub fn with_data(mut self, data: Vec<Map<String, Value>>) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_chart(mut self, chart: ChartSpec) -> Self {
        self.chart = Some(chart);
        self
    }
}

/// Chart kind understood by the renderer. Anything else round-trips as
/// `Other` so a client can degrade to its textual fallback instead of
/// failing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ChartType {
    Bar,
    Line,
    Pie,
    Other(String),
}

impl ChartType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Bar => "bar",
            Self::Line => "line",
            Self::Pie => "pie",
            Self::Other(name) => name,
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Other(_))
    }

    /// Text a renderer shows in place of an unsupported chart.
    pub fn fallback_text(&self) -> String {
        format!("Unsupported chart type: {}", self.as_str())
    }
}

impl From<String> for ChartType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "bar" => Self::Bar,
            "line" => Self::Line,
            "pie" => Self::Pie,
            _ => Self::Other(value),
        }
    }
}

impl From<ChartType> for String {
    fn from(value: ChartType) -> Self {
        value.as_str().to_string()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartSpec {
    #[serde(rename = "type")]
    pub chart_type: ChartType,
    pub data: Vec<Map<String, Value>>,
    pub x_axis: String,
    pub y_axis: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl ChartSpec {
    /// Every data record must carry both axis keys, otherwise a renderer
    /// has nothing to plot.
    pub fn validate(&self) -> Result<(), ChartSpecError> {
        for (index, record) in self.data.iter().enumerate() {
            for axis in [&self.x_axis, &self.y_axis] {
                if !record.contains_key(axis.as_str()) {
                    return Err(ChartSpecError::MissingAxisKey {
                        index,
                        axis: axis.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ChartSpecError {
    #[error("chart record {index} is missing axis key '{axis}'")]
    MissingAxisKey { index: usize, axis: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OkResponse {
    pub ok: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn chart_type_parses_known_kinds() {
        let parsed: ChartType = serde_json::from_value(json!("bar")).expect("bar parses");
        assert_eq!(parsed, ChartType::Bar);
        assert_eq!(
            serde_json::to_value(ChartType::Pie).expect("pie serializes"),
            json!("pie")
        );
    }

    #[test]
    fn unknown_chart_type_degrades_to_fallback_text() {
        let parsed: ChartType = serde_json::from_value(json!("scatter")).expect("scatter parses");
        assert!(!parsed.is_supported());
        assert_eq!(parsed.fallback_text(), "Unsupported chart type: scatter");
    }

    #[test]
    fn chart_spec_validates_axis_keys() {
        let spec: ChartSpec = serde_json::from_value(json!({
            "type": "bar",
            "data": [{"month": "Jan", "sales": 10}],
            "x_axis": "month",
            "y_axis": "sales",
        }))
        .expect("spec parses");
        assert!(spec.validate().is_ok());

        let broken: ChartSpec = serde_json::from_value(json!({
            "type": "bar",
            "data": [{"month": "Jan"}],
            "x_axis": "month",
            "y_axis": "sales",
        }))
        .expect("spec parses");
        assert!(broken.validate().is_err());
    }

    #[test]
    fn query_request_accepts_opaque_session_ids() {
        let request: QueryRequest =
            serde_json::from_str(r#"{"session_id":"not-a-uuid","query":"hi"}"#)
                .expect("opaque id parses");
        assert_eq!(request.session_id, "not-a-uuid");
    }

    #[test]
    fn query_response_omits_empty_sections() {
        let response = QueryResponse::text("hello");
        let value = serde_json::to_value(&response).expect("response serializes");
        assert_eq!(value, json!({"sender": "ai", "text": "hello"}));
    }
}
