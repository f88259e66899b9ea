use std::net::SocketAddr;
use std::sync::Arc;

use shared::config::{ApiConfig, load_dotenv};
use shared::llm::{OllamaGateway, OllamaGatewayConfig};
use shared::repos::Store;
use tracing::{error, info};

mod http;

#[tokio::main]
async fn main() {
    if let Err(err) = load_dotenv() {
        eprintln!("failed to load .env file: {err}");
        std::process::exit(1);
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "api_server=debug,axum=info,tower_http=info".to_string()),
        )
        .init();

    let config = match ApiConfig::from_env() {
        Ok(cfg) => cfg,
        Err(err) => {
            error!("failed to read config: {err}");
            std::process::exit(1);
        }
    };

    if let Err(err) = tokio::fs::create_dir_all(&config.upload_dir).await {
        error!(
            "failed to create upload dir {}: {err}",
            config.upload_dir.display()
        );
        std::process::exit(1);
    }

    let store = match Store::connect(&config.database_url, config.database_max_connections).await {
        Ok(store) => store,
        Err(err) => {
            error!("failed to connect to postgres: {err}");
            std::process::exit(1);
        }
    };

    let migrator = match sqlx::migrate::Migrator::new(config.migrations_dir.clone()).await {
        Ok(migrator) => migrator,
        Err(err) => {
            error!("failed to load migrations: {err}");
            std::process::exit(1);
        }
    };

    if let Err(err) = migrator.run(store.pool()).await {
        error!("failed to run migrations: {err}");
        std::process::exit(1);
    }

    let gateway_config = match OllamaGatewayConfig::from_env() {
        Ok(cfg) => cfg,
        Err(err) => {
            error!("failed to read ollama config: {err}");
            std::process::exit(1);
        }
    };
    info!(
        "using ollama model {} at {}",
        gateway_config.model, gateway_config.generate_url
    );
    let gateway = match OllamaGateway::new(gateway_config) {
        Ok(gateway) => gateway,
        Err(err) => {
            error!("failed to build ollama gateway: {err}");
            std::process::exit(1);
        }
    };

    let app = http::build_router(http::AppState {
        store,
        llm: Arc::new(gateway),
        upload_dir: config.upload_dir,
        max_file_size_bytes: config.max_file_size_bytes,
        session_ttl_seconds: config.session_ttl_seconds,
        cors_origins: config.cors_origins,
    });

    let addr: SocketAddr = config
        .bind_addr
        .parse()
        .unwrap_or_else(|_| "127.0.0.1:8080".parse().expect("valid default bind addr"));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("bind should succeed");

    info!(
        "api server listening on {}",
        listener.local_addr().unwrap_or(addr)
    );
    axum::serve(listener, app).await.expect("server should run");
}
