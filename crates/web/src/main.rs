//! Web form server for narration script generation.

use anyhow::{Context, Result};
use pptscript_core::Config;
use pptscript_openai::OpenAiChatModel;
use pptscript_pptx::PptxLoader;
use pptscript_web::{create_router, AppState};
use std::net::SocketAddr;
use std::sync::Arc;

const DEFAULT_ADDR: &str = "127.0.0.1:8501";

fn main() -> Result<()> {
    let config = Config::from_env().context("Failed to read configuration")?;

    // Initialize logging
    let default_filter = if config.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    let addr: SocketAddr = std::env::var("PPTSCRIPT_ADDR")
        .unwrap_or_else(|_| DEFAULT_ADDR.to_string())
        .parse()
        .context("PPTSCRIPT_ADDR must be a socket address such as 127.0.0.1:8501")?;

    // The blocking HTTP client owns its own runtime, so it must be built and
    // dropped outside of tokio. Holding a handle here keeps the last drop out.
    let model = Arc::new(OpenAiChatModel::from_env()?);
    let state = AppState::new(config, Arc::new(PptxLoader::new()), model.clone());

    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    let result = runtime.block_on(serve(addr, state));
    drop(runtime);
    drop(model);
    result
}

async fn serve(addr: SocketAddr, state: AppState) -> Result<()> {
    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    log::info!("Script generator listening on http://{}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            log::info!("Shutting down");
        })
        .await
        .context("Server error")?;
    Ok(())
}
