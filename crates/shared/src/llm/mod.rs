pub mod gateway;
pub mod intent;
pub mod ollama;
pub mod prompts;

pub use gateway::{
    LlmGateway, LlmGatewayError, LlmGatewayFuture, LlmGatewayRequest, LlmGatewayResponse,
    LlmTokenUsage,
};
pub use ollama::{OllamaConfigError, OllamaGateway, OllamaGatewayConfig};
