use crate::{create_router, AppState};
use anyhow::{Context, Result};
use archcanvas_core::ConfigManager;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};

pub struct Server {
    state: AppState,
    addr: SocketAddr,
}

impl Server {
    pub fn new(addr: SocketAddr, config: Arc<ConfigManager>) -> Self {
        Self {
            state: AppState::new(config),
            addr,
        }
    }

    /// Address from `server.host` / `server.port`.
    pub fn from_config(config: Arc<ConfigManager>) -> Result<Self> {
        let server = &config.settings().server;
        let addr: SocketAddr = format!("{}:{}", server.host, server.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", server.host, server.port))?;
        Ok(Self::new(addr, config))
    }

    pub async fn run(self) -> Result<()> {
        let router = create_router(self.state);

        info!("Starting ArchCanvas API server on {}", self.addr);
        let listener = tokio::net::TcpListener::bind(self.addr)
            .await
            .with_context(|| format!("binding {}", self.addr))?;

        info!("Server listening on http://{}", self.addr);
        info!("  GET /health - Liveness");
        info!("  GET /api-docs/openapi.json - OpenAPI document");
        info!("  /v1/risks, /v1/mitigations, /v1/mappings - Libraries");
        info!("  /v1/projects/{{name}}/... - Projects, canvas, summary, export");

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("serving HTTP")?;

        info!("Server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down gracefully");
        },
        _ = terminate => {
            info!("Received SIGTERM, shutting down gracefully");
        },
    }
}
