mod redirect;
pub mod stun;
mod ui;
mod ws;

use anyhow::{Context, Result};
use axum::{
    routing::{any, get},
    Router,
};
use axum_server::tls_rustls::RustlsConfig;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::Config;
use crate::signaling::SignalingHub;

pub use redirect::redirect_router;
pub use ui::controller_page;
pub use ws::ws_handler;

/// State shared by the HTTP routes.
#[derive(Clone)]
pub struct AppState {
    pub hub: Arc<SignalingHub>,
    /// Port of the built-in STUN server, 0 when disabled. The controller
    /// page points its ICE configuration here.
    pub stun_port: u16,
}

pub struct LancastServer {
    hub: Arc<SignalingHub>,
    config: Config,
}

impl LancastServer {
    pub fn new(config: Config) -> Self {
        Self {
            hub: Arc::new(SignalingHub::new()),
            config,
        }
    }

    /// Handle to the membership set shared with every connection.
    pub fn hub(&self) -> Arc<SignalingHub> {
        self.hub.clone()
    }

    /// The HTTP surface: controller page at `/`, signaling socket at `/ws`.
    pub fn router(&self) -> Router {
        let state = AppState {
            hub: self.hub.clone(),
            stun_port: self.config.server.stun_port,
        };

        Router::new()
            .route("/", get(ui::index))
            .route("/ws", any(ws_handler))
            .with_state(state)
    }

    pub async fn run(self) -> Result<()> {
        let bind = self.config.server.bind_address.clone();
        let https_port = self.config.server.https_port;
        let app = self.router();

        if !self.config.tls.enabled {
            let addr = format!("{}:{}", bind, https_port);
            let listener = tokio::net::TcpListener::bind(&addr).await?;
            info!("Serving plain HTTP on {}", addr);
            axum::serve(listener, app).await?;
            return Ok(());
        }

        // Plain-HTTP helper that forwards browsers to the TLS listener.
        if self.config.server.http_port > 0 {
            let redirect_addr: SocketAddr = format!("{}:{}", bind, self.config.server.http_port)
                .parse()
                .context("Invalid HTTP bind address")?;
            tokio::spawn(async move {
                let app = redirect::redirect_router(https_port);
                match tokio::net::TcpListener::bind(redirect_addr).await {
                    Ok(listener) => {
                        if let Err(e) = axum::serve(listener, app).await {
                            warn!("HTTP redirect listener failed: {}", e);
                        }
                    }
                    Err(e) => {
                        warn!(
                            "Could not bind HTTP redirect listener on {}: {}",
                            redirect_addr, e
                        );
                    }
                }
            });
        }

        let addr: SocketAddr = format!("{}:{}", bind, https_port)
            .parse()
            .context("Invalid HTTPS bind address")?;
        let tls = RustlsConfig::from_pem_file(&self.config.tls.cert_file, &self.config.tls.key_file)
            .await
            .context("Failed to load the TLS certificate or key")?;

        info!("Serving HTTPS on {}", addr);
        axum_server::bind_rustls(addr, tls)
            .serve(app.into_make_service())
            .await?;

        Ok(())
    }
}
