mod config;
mod input;
mod render;

use std::sync::Arc;

use anyhow::{Context, Result};
use murmur_client::{PendingSession, SessionView};
use murmur_store::SqliteStore;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use crate::config::CliConfig;
use crate::input::{input_loop, prompt_name};
use crate::render::Renderer;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Logs go to stderr; stdout carries the conversation
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "murmur=info,murmur_client=info,murmur_store=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = CliConfig::from_env()?;

    let store = SqliteStore::open(&config.db_path, config.poll_interval)
        .await
        .with_context(|| format!("opening message store at {}", config.db_path.display()))?;
    info!("Using message store at {}", config.db_path.display());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let pending = PendingSession::new(Arc::new(store), config.platform.clone());

    let session = match config.name.clone() {
        Some(name) => pending.enter_name(name)?,
        None => match prompt_name(pending, &mut lines).await? {
            Some(session) => session,
            None => return Ok(()),
        },
    };

    let renderer = tokio::spawn(render_loop(session.subscribe()));

    tokio::select! {
        result = input_loop(&session, &mut lines) => result?,
        _ = shutdown_signal() => {}
    }

    session.shutdown().await;
    renderer.abort();
    Ok(())
}

async fn render_loop(mut view_rx: tokio::sync::watch::Receiver<SessionView>) {
    let mut renderer = Renderer::new();
    let mut last_error: Option<String> = None;

    loop {
        let view = view_rx.borrow_and_update().clone();

        if let Some(out) = renderer.update(&view) {
            print!("{}", out);
        }
        if view.last_send_error != last_error {
            if let Some(e) = &view.last_send_error {
                println!("!! message not sent: {}", e);
            }
            last_error = view.last_send_error.clone();
        }

        if view_rx.changed().await.is_err() {
            break;
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(sigterm) => sigterm,
                Err(e) => {
                    warn!("Failed to install SIGTERM handler: {}", e);
                    ctrl_c.await.ok();
                    return;
                }
            };
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, leaving chat..."),
            _ = sigterm.recv() => info!("Received SIGTERM, leaving chat..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, leaving chat...");
    }
}
