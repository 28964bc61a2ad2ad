mod config;
mod error;
mod http;
mod realtime;
mod service;
mod state;
#[cfg(test)]
mod testing;

use anyhow::Context;
use dotenvy::dotenv;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::{SeedSettings, Settings};
use http::router::build_router;
use realtime::TopicRegistry;
use service::{CommentService, ServiceOptions};
use state::AppState;
use storage::{CommentStore, Db, MemoryStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = Settings::new().context("Failed to load configuration")?;

    let store = open_store(&settings.database.url, &settings.seed).await?;

    let cancel_token = CancellationToken::new();
    let (notifications, mail_worker) = mailer::start_with_cancel_token(
        settings.mail.to_mail_config()?,
        settings.mail.queue_capacity,
        cancel_token.clone(),
    )?;

    let registry = Arc::new(TopicRegistry::new());
    let comments = CommentService::new(
        store,
        registry.clone(),
        notifications,
        ServiceOptions {
            max_content_length: settings.comments.max_length,
            sink_capacity: settings.stream.sink_capacity,
        },
    );

    let state = AppState {
        comments,
        registry: registry.clone(),
        keep_alive: Duration::from_secs(settings.stream.keep_alive_secs),
    };

    let app = build_router(state, &settings.server.cors_origins);

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to address: {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(registry))
        .await?;

    cancel_token.cancel();
    if let Err(e) = mail_worker.await {
        warn!("Mail worker ended abnormally: {:?}", e);
    }
    info!("Shutdown complete");

    Ok(())
}

async fn open_store(url: &str, seed: &SeedSettings) -> anyhow::Result<Arc<dyn CommentStore>> {
    let posts = seed.posts()?;
    let users = seed.users()?;

    if url.starts_with("memory://") {
        warn!("Using the in-memory comment store, data is lost on restart");
        let store = MemoryStore::new();
        for post in posts.iter().cloned() {
            store.upsert_post(post);
        }
        for user in users.iter().cloned() {
            store.upsert_user(user);
        }
        info!(posts = posts.len(), users = users.len(), "Seeded comment store");
        return Ok(Arc::new(store));
    }

    let db = Db::new(url)
        .await
        .with_context(|| format!("Failed to open database: {}", url))?;
    for post in &posts {
        db.upsert_post(post).await.context("Failed to seed post")?;
    }
    for user in &users {
        db.upsert_user(user).await.context("Failed to seed user")?;
    }
    info!(posts = posts.len(), users = users.len(), "Seeded comment store");
    Ok(Arc::new(db))
}

async fn shutdown_signal(registry: Arc<TopicRegistry>) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down gracefully...");
        },
        _ = terminate => {
            info!("Received SIGTERM, shutting down gracefully...");
        },
    }

    // open SSE responses never finish on their own
    registry.shutdown();
}
