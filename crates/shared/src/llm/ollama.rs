use std::env;
use std::time::Duration;

use serde::Deserialize;
use serde_json::{Value, json};
use thiserror::Error;

use super::gateway::{
    LlmGateway, LlmGatewayError, LlmGatewayFuture, LlmGatewayRequest, LlmGatewayResponse,
    LlmTokenUsage,
};

const DEFAULT_HOST: &str = "http://localhost:11434";
const DEFAULT_MODEL: &str = "llama3.2:3b";
const DEFAULT_TIMEOUT_MS: u64 = 15_000;

const GENERATE_PATH: &str = "/api/generate";

#[derive(Debug, Clone)]
pub struct OllamaGatewayConfig {
    pub generate_url: String,
    pub model: String,
    pub timeout_ms: u64,
}

impl OllamaGatewayConfig {
    pub fn from_env() -> Result<Self, OllamaConfigError> {
        let host =
            optional_trimmed_env("OLLAMA_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
        if !host.starts_with("http://") && !host.starts_with("https://") {
            return Err(OllamaConfigError::InvalidConfiguration(
                "OLLAMA_HOST must start with http:// or https://".to_string(),
            ));
        }

        Ok(Self {
            generate_url: format!("{}{GENERATE_PATH}", host.trim_end_matches('/')),
            model: optional_trimmed_env("OLLAMA_MODEL")
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            timeout_ms: parse_u64_env("OLLAMA_TIMEOUT_MS", DEFAULT_TIMEOUT_MS)?,
        })
    }
}

#[derive(Debug, Error)]
pub enum OllamaConfigError {
    #[error("invalid integer in env var {key}: {value}")]
    ParseInt { key: String, value: String },
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("failed to build Ollama http client: {0}")]
    HttpClient(String),
}

/// Client for a locally hosted Ollama model. A single attempt per request;
/// the caller degrades to keyword analysis when this fails.
#[derive(Clone)]
pub struct OllamaGateway {
    client: reqwest::Client,
    config: OllamaGatewayConfig,
}

impl OllamaGateway {
    pub fn new(config: OllamaGatewayConfig) -> Result<Self, OllamaConfigError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|err| OllamaConfigError::HttpClient(err.to_string()))?;

        Ok(Self { client, config })
    }

    async fn send_once(
        &self,
        request: &LlmGatewayRequest,
    ) -> Result<LlmGatewayResponse, LlmGatewayError> {
        let prompt = json!({
            "instruction": request.context_prompt,
            "output_schema": request.output_schema,
            "context_payload": request.context_payload,
        })
        .to_string();

        let request_body = json!({
            "model": self.config.model,
            "system": request.system_prompt,
            "prompt": prompt,
            "format": "json",
            "stream": false,
        });

        let response = self
            .client
            .post(&self.config.generate_url)
            .json(&request_body)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    LlmGatewayError::Timeout
                } else {
                    LlmGatewayError::ProviderFailure("request_unavailable".to_string())
                }
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|_| {
            LlmGatewayError::InvalidProviderPayload("response_body_read_failed".to_string())
        })?;

        if !status.is_success() {
            return Err(LlmGatewayError::ProviderFailure(format!(
                "status={}",
                status.as_u16()
            )));
        }

        let parsed: OllamaGenerateResponse = serde_json::from_str(&body).map_err(|_| {
            LlmGatewayError::InvalidProviderPayload("response_json_parse_failed".to_string())
        })?;

        let output = serde_json::from_str::<Value>(&parsed.response).map_err(|_| {
            LlmGatewayError::InvalidProviderPayload("response_not_json".to_string())
        })?;
        if !output.is_object() {
            return Err(LlmGatewayError::InvalidProviderPayload(
                "unsupported_output_shape".to_string(),
            ));
        }

        let usage = match (parsed.prompt_eval_count, parsed.eval_count) {
            (None, None) => None,
            (prompt_tokens, completion_tokens) => {
                let prompt_tokens = clamp_u64_to_u32(prompt_tokens.unwrap_or(0));
                let completion_tokens = clamp_u64_to_u32(completion_tokens.unwrap_or(0));
                Some(LlmTokenUsage {
                    prompt_tokens,
                    completion_tokens,
                    total_tokens: prompt_tokens.saturating_add(completion_tokens),
                })
            }
        };

        Ok(LlmGatewayResponse {
            model: parsed.model.unwrap_or_else(|| self.config.model.clone()),
            output,
            usage,
        })
    }
}

impl LlmGateway for OllamaGateway {
    fn generate<'a>(&'a self, request: LlmGatewayRequest) -> LlmGatewayFuture<'a> {
        Box::pin(async move { self.send_once(&request).await })
    }
}

#[derive(Debug, Deserialize)]
struct OllamaGenerateResponse {
    model: Option<String>,
    response: String,
    prompt_eval_count: Option<u64>,
    eval_count: Option<u64>,
}

fn parse_u64_env(key: &str, default: u64) -> Result<u64, OllamaConfigError> {
    match optional_trimmed_env(key) {
        Some(value) => value
            .parse::<u64>()
            .map_err(|_| OllamaConfigError::ParseInt {
                key: key.to_string(),
                value,
            }),
        None => Ok(default),
    }
}

fn optional_trimmed_env(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn clamp_u64_to_u32(value: u64) -> u32 {
    value.min(u32::MAX as u64) as u32
}
