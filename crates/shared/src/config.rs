use std::env;
use std::path::PathBuf;

use thiserror::Error;

use crate::config_env::{parse_list_env, parse_u32_env, parse_u64_env, parse_usize_env, require_env};

const DEFAULT_MAX_FILE_SIZE_BYTES: usize = 10 * 1024 * 1024;
const DEFAULT_SESSION_TTL_SECONDS: u64 = 86_400;
const DEFAULT_CORS_ORIGINS: &[&str] = &[
    "http://localhost:5173",
    "http://localhost:3000",
    "http://127.0.0.1:5173",
];

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub bind_addr: String,
    pub database_url: String,
    pub database_max_connections: u32,
    pub migrations_dir: PathBuf,
    pub upload_dir: PathBuf,
    pub max_file_size_bytes: usize,
    pub session_ttl_seconds: u64,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required env var {0}")]
    MissingVar(String),
    #[error("invalid integer in env var {0}")]
    ParseInt(String),
    #[error("failed to load .env file: {0}")]
    DotEnv(String),
}

/// Loads a `.env` file when one exists; a missing file is not an error.
pub fn load_dotenv() -> Result<(), ConfigError> {
    match dotenvy::dotenv() {
        Ok(_) => Ok(()),
        Err(err) if err.not_found() => Ok(()),
        Err(err) => Err(ConfigError::DotEnv(err.to_string())),
    }
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            bind_addr: env::var("API_BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string()),
            database_url: require_env("DATABASE_URL")?,
            database_max_connections: parse_u32_env("DATABASE_MAX_CONNECTIONS", 10)?,
            migrations_dir: env::var("MIGRATIONS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| {
                    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../db/migrations")
                }),
            upload_dir: env::var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./uploads")),
            max_file_size_bytes: parse_usize_env("MAX_FILE_SIZE_BYTES", DEFAULT_MAX_FILE_SIZE_BYTES)?,
            session_ttl_seconds: parse_u64_env("SESSION_TTL_SECONDS", DEFAULT_SESSION_TTL_SECONDS)?,
            cors_origins: parse_list_env("CORS_ORIGINS", DEFAULT_CORS_ORIGINS),
        })
    }
}
