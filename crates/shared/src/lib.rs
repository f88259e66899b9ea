pub mod analysis;
pub mod charts;
pub mod config;
mod config_env;
pub mod ingest;
pub mod llm;
pub mod models;
pub mod repos;
pub mod table;
