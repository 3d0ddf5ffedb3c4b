//! Network module with deferred startup lifecycle.
//!
//! `new()` wires shared state, `start()` binds the TCP listener, and
//! `serve()` accepts connections until the shutdown future resolves. Binding
//! separately from serving lets callers learn an OS-assigned port first.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context as _;
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tracing::{info, warn};

use super::config::{NetworkConfig, TlsConfig};
use super::handlers::{
    get_post_properties_handler, health_handler, liveness_handler, patch_post_properties_handler,
    readiness_handler, team_flagging_status_handler, AppState,
};
use super::middleware::{build_http_layers, track_in_flight};
use super::shutdown::ShutdownController;
use crate::service::{ContentFlaggingSettings, PatchPipeline};
use crate::traits::PropertyStore;

/// Manages the HTTP server lifecycle.
pub struct NetworkModule {
    listener: Option<TcpListener>,
    state: AppState,
}

impl NetworkModule {
    /// Creates the module without binding any port.
    #[must_use]
    pub fn new(
        config: NetworkConfig,
        pipeline: Arc<PatchPipeline>,
        store: Arc<dyn PropertyStore>,
        content_flagging: Arc<ContentFlaggingSettings>,
    ) -> Self {
        Self {
            listener: None,
            state: AppState {
                pipeline,
                store,
                content_flagging,
                shutdown: Arc::new(ShutdownController::new()),
                config: Arc::new(config),
                start_time: Instant::now(),
            },
        }
    }

    /// Returns a shared reference to the shutdown controller.
    #[must_use]
    pub fn shutdown_controller(&self) -> Arc<ShutdownController> {
        Arc::clone(&self.state.shutdown)
    }

    /// Assembles the axum router with all routes and middleware.
    ///
    /// Routes:
    /// - `GET /health`, `/health/live`, `/health/ready` -- probes
    /// - `PATCH /api/v4/properties/posts/{post_id}` -- apply a property patch
    /// - `GET /api/v4/properties/posts/{post_id}` -- read stored properties
    /// - `GET /api/v4/content_flagging/teams/{team_id}/status` -- feature status
    ///
    /// Only the `/api` routes are refused during draining; probes keep
    /// answering so orchestrators can watch the shutdown.
    pub fn build_router(&self) -> Router {
        let api = Router::new()
            .route(
                "/api/v4/properties/posts/{post_id}",
                get(get_post_properties_handler).patch(patch_post_properties_handler),
            )
            .route(
                "/api/v4/content_flagging/teams/{team_id}/status",
                get(team_flagging_status_handler),
            )
            .route_layer(axum::middleware::from_fn_with_state(
                Arc::clone(&self.state.shutdown),
                track_in_flight,
            ));

        Router::new()
            .route("/health", get(health_handler))
            .route("/health/live", get(liveness_handler))
            .route("/health/ready", get(readiness_handler))
            .merge(api)
            .layer(build_http_layers(&self.state.config))
            .with_state(self.state.clone())
    }

    /// Binds the TCP listener to the configured host and port.
    ///
    /// Returns the bound port, which differs from the configured one when
    /// port 0 is used.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound.
    pub async fn start(&mut self) -> anyhow::Result<u16> {
        let config = &self.state.config;
        let addr = format!("{}:{}", config.host, config.port);
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("binding {addr}"))?;
        let port = listener.local_addr()?.port();

        info!("TCP listener bound to {}:{}", config.host, port);

        self.listener = Some(listener);
        Ok(port)
    }

    /// Serves until `shutdown` resolves, then drains in-flight requests.
    ///
    /// On the shutdown signal the health state moves to `Draining`, new API
    /// requests get 503, and the server waits up to `drain_timeout` for
    /// in-flight patches before reporting `Stopped`.
    ///
    /// # Errors
    ///
    /// Returns an error if `start()` was not called, TLS material cannot be
    /// loaded, or the server hits a fatal I/O error.
    pub async fn serve(
        mut self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> anyhow::Result<()> {
        let listener = self
            .listener
            .take()
            .context("start() must be called before serve()")?;
        let router = self.build_router();
        let controller = Arc::clone(&self.state.shutdown);
        let config = Arc::clone(&self.state.config);

        let signal_ctrl = Arc::clone(&controller);
        let signal = async move {
            shutdown.await;
            info!("shutdown signal received, draining");
            signal_ctrl.trigger_shutdown();
        };

        controller.set_ready();

        if let Some(tls) = &config.tls {
            serve_tls(listener, router, tls, signal).await?;
        } else {
            info!("Serving plain HTTP connections");
            axum::serve(listener, router)
                .with_graceful_shutdown(signal)
                .await?;
        }

        // Covers the TLS path where the signal may race the server exit.
        controller.trigger_shutdown();
        if controller.wait_for_drain(config.drain_timeout).await {
            info!("All in-flight requests drained");
        } else {
            warn!(
                in_flight = controller.in_flight_count(),
                "Drain timeout expired with in-flight requests remaining"
            );
        }
        Ok(())
    }
}

/// Serves TLS connections using `axum-server` with rustls, reusing the
/// pre-bound listener.
async fn serve_tls(
    listener: TcpListener,
    router: Router,
    tls: &TlsConfig,
    signal: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    use axum_server::tls_rustls::RustlsConfig;

    let rustls_config = RustlsConfig::from_pem_file(&tls.cert_path, &tls.key_path)
        .await
        .context("loading TLS certificates")?;

    let addr = listener.local_addr()?;
    let std_listener = listener.into_std()?;
    let handle = axum_server::Handle::new();
    let shutdown_handle = handle.clone();

    tokio::spawn(async move {
        signal.await;
        shutdown_handle.graceful_shutdown(None);
    });

    info!("Serving TLS connections on {}", addr);

    axum_server::from_tcp_rustls(std_listener, rustls_config)
        .handle(handle)
        .serve(router.into_make_service())
        .await?;
    Ok(())
}
