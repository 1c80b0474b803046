use std::{env, sync::Arc};

use anyhow::{Result, bail};
use axum::{Router, serve};
use dotenv::dotenv;
use rmcp::{
    ServiceExt,
    transport::{
        StreamableHttpServerConfig, StreamableHttpService, stdio,
        streamable_http_server::session::local::LocalSessionManager,
    },
};
use tokio::{net::TcpListener, signal};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod mcp;
use mcp::{
    BambooHrMcpFactory,
    http::{BambooHrClient, ClientConfig},
};

const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

#[tokio::main]
async fn main() -> Result<()> {
    // Load variables from .env file if it exists into the environment
    dotenv().ok();

    // Initialize tracing. Logs go to stderr; stdout belongs to the stdio transport.
    let json_logs = env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".to_string().into()),
        )
        .with(json_logs.then(|| tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr)))
        .with((!json_logs).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
        .init();

    // Fail fast on missing or invalid configuration
    let config = ClientConfig::from_env()?;
    info!(subdomain = %config.subdomain, base_url = %config.base_url, "BambooHR client configured");
    let client = Arc::new(BambooHrClient::new(config)?);

    let transport = env::var("MCP_TRANSPORT").unwrap_or_else(|_| "stdio".to_string());
    match transport.to_lowercase().as_str() {
        "stdio" => serve_stdio(client.clone()).await?,
        "http" => serve_http(client.clone()).await?,
        other => bail!("MCP_TRANSPORT must be 'stdio' or 'http', got '{other}'"),
    }

    client.clear_cache();
    info!("BambooHR MCP server stopped");
    Ok(())
}

async fn serve_stdio(client: Arc<BambooHrClient>) -> Result<()> {
    info!("Starting BambooHR MCP server on stdio");
    let service = BambooHrMcpFactory::new(client)
        .serve(stdio())
        .await
        .inspect_err(|e| error!("failed to start stdio server: {e}"))?;

    tokio::select! {
        quit_reason = service.waiting() => {
            info!(?quit_reason, "stdio session ended");
        }
        () = shutdown_signal() => {}
    }
    Ok(())
}

async fn serve_http(client: Arc<BambooHrClient>) -> Result<()> {
    let bind_address =
        env::var("MCP_BIND_ADDRESS").unwrap_or_else(|_| DEFAULT_BIND_ADDRESS.to_string());

    // Setting up the Streamable HTTP Service; every session shares one client
    info!("Setting up the Streamable HTTP Service");
    let service = StreamableHttpService::new(
        move || Ok(BambooHrMcpFactory::new(client.clone())),
        LocalSessionManager::default().into(),
        StreamableHttpServerConfig::default(),
    );

    // Starting the server... Setting up the router and TCP listener
    info!("Starting server on {bind_address}");
    let router = Router::new().nest_service("/mcp", service);
    let tcp_listener = TcpListener::bind(&bind_address).await?;

    // Finally start the server with graceful shutdown
    serve(tcp_listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

// Graceful shutdown on CTRL+C
async fn shutdown_signal() {
    signal::ctrl_c().await.unwrap_or_else(|e| {
        error!("failed to install CTRL+C handler: {e}");
    });
    info!("Shutdown signal received");
}
