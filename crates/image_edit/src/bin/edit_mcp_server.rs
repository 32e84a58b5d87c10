//cargo run --package image_edit --bin edit_mcp_server
use std::sync::Arc;

use image_edit::{ClientConfig, EditError, ImageEditClient, ImageEditServer, InMemoryExampleStore, InMemorySessions};
use rmcp::{transport::stdio, ServiceExt};
use tracing_subscriber::{util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    // Set up logging to stderr (MCP uses stdout for protocol communication)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .finish()
        .init();

    tracing::info!("Starting Image Edit MCP server");

    let client = match ClientConfig::from_env() {
        Ok(config) => Some(ImageEditClient::new(config)?),
        Err(EditError::MissingApiKey) => {
            tracing::warn!("OPENAI_API_KEY is not set, get_edited_image will be refused");
            None
        }
        Err(e) => return Err(e.into()),
    };

    let sessions = Arc::new(InMemorySessions::default());
    if let Ok(user) = std::env::var("MCP_SESSION_USER") {
        let token = sessions.sign_in(user.clone());
        tracing::info!("Session token for {}: {}", user, token);
    }

    let seed = match std::env::var("MCP_SEED_EXAMPLES") {
        Ok(raw) => raw
            .trim()
            .parse::<usize>()
            .map_err(|_| color_eyre::eyre::eyre!("MCP_SEED_EXAMPLES must be a row count, got '{}'", raw))?,
        Err(_) => 0,
    };
    let store = Arc::new(InMemoryExampleStore::seeded(seed));
    tracing::info!("Example store seeded with {} rows", seed);

    let server = ImageEditServer::new(client, sessions, store);

    // Serve over stdio transport
    let service = match server.serve(stdio()).await {
        Ok(service) => service,
        Err(e) => {
            tracing::error!("Failed to start MCP server: {:?}", e);
            return Err(e.into());
        }
    };

    tracing::info!("MCP server started, listening on stdio");

    tokio::select! {
        result = service.waiting() => {
            match result {
                Ok(_) => tracing::info!("MCP server completed successfully"),
                Err(e) => {
                    tracing::error!("MCP server error: {:?}", e);
                    return Err(e.into());
                }
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received Ctrl+C, shutting down gracefully");
        }
    }

    tracing::info!("MCP server shut down");
    Ok(())
}
