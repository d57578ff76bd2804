use std::sync::Arc;

use clap::Parser as ClapParser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use rci_service::config::RagConfig;
use rci_service::embedding::openai::OpenAiEmbeddingProvider;
use rci_service::embedding::Embedder;
use rci_service::http::{create_router, AppState};
use rci_service::service::{RciService, SyncRequest};

#[derive(Debug, ClapParser)]
#[command(name = "rci-service", about = "Retrieval-Augmented Component Index service")]
struct Cli {
    /// Run one blocking Sync over this path before the HTTP listener starts.
    #[arg(long)]
    sync_on_start: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = RagConfig::from_env()?;

    let embedder = Embedder::new(Box::new(OpenAiEmbeddingProvider::new(
        config.embeddings.api_key.clone(),
        config.embeddings.model.clone(),
    )?));

    let service = Arc::new(RciService::new(config.clone(), embedder).await?);

    if let Some(path) = cli.sync_on_start {
        info!(path = %path, "running sync-on-start");
        let response = service
            .sync(SyncRequest {
                source_path: path,
                packages: None,
                force_reindex: false,
            })
            .await?;
        info!(
            status = ?response.status,
            processed_count = response.processed_count,
            success_count = response.success_count,
            failed_count = response.failed_count,
            "sync-on-start finished"
        );
    }

    let app = create_router(AppState { service });
    let listener = tokio::net::TcpListener::bind(config.server_addr()).await?;
    info!(addr = %config.server_addr(), "listening");

    let shutdown = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install ctrl-c handler");
        info!("shutdown signal received");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
