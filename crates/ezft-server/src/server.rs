use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::config::ServerConfig;
use crate::handlers::{self, AppState};
use crate::middleware;

/// Build the application router. Creates the root directory if missing.
pub fn router(config: &ServerConfig) -> Result<Router> {
    std::fs::create_dir_all(&config.root)
        .with_context(|| format!("failed to create root directory {}", config.root.display()))?;
    let root = std::fs::canonicalize(&config.root)
        .with_context(|| format!("failed to resolve root directory {}", config.root.display()))?;
    let state = AppState {
        root: Arc::new(root),
    };

    let mut app = Router::new()
        .route("/download/{*path}", get(handlers::download))
        .route("/download/", get(handlers::empty_path))
        .route("/info/{*path}", get(handlers::info))
        .route("/info/", get(handlers::empty_path))
        .route("/health", get(handlers::health))
        .with_state(state);

    if let Some(auth) = &config.basic_auth {
        app = app.layer(axum::middleware::from_fn_with_state(
            Arc::new(auth.clone()),
            middleware::basic_auth,
        ));
    }
    Ok(app.layer(axum::middleware::from_fn(middleware::log_requests)))
}

/// Bind `0.0.0.0:<port>` and serve until `shutdown` is cancelled.
pub async fn serve(config: ServerConfig, shutdown: CancellationToken) -> Result<()> {
    let addr = config.bind_addr();
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    serve_on(listener, config, shutdown).await
}

/// Serve on an already bound listener (tests bind port 0).
pub async fn serve_on(
    listener: TcpListener,
    config: ServerConfig,
    shutdown: CancellationToken,
) -> Result<()> {
    let app = router(&config)?;
    let local = listener.local_addr()?;
    tracing::info!(
        addr = %local,
        root = %config.root.display(),
        auth = config.basic_auth.is_some(),
        "file server started"
    );
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        shutdown.cancelled().await;
        tracing::info!("file server received shutdown signal");
    })
    .await
    .context("server error")?;
    tracing::info!("file server stopped");
    Ok(())
}
