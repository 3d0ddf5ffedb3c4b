//! postprop-server: standalone property patch server.
//!
//! Seeds field/group definitions and content flagging settings from JSON
//! files, then serves the patch API until Ctrl-C.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use clap::{Parser, ValueEnum};
use metrics_exporter_prometheus::PrometheusBuilder;
use postprop_core::HandlerRegistry;
use postprop_server::network::{NetworkConfig, NetworkModule, TlsConfig};
use postprop_server::service::ContentFlaggingSettings;
use postprop_server::storage::{InMemoryPropertyStore, PropertyDefinitions};
use postprop_server::{DispatchMode, PatchPipeline, PipelineConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Dispatch {
    Concurrent,
    Sequential,
}

impl From<Dispatch> for DispatchMode {
    fn from(value: Dispatch) -> Self {
        match value {
            Dispatch::Concurrent => Self::Concurrent,
            Dispatch::Sequential => Self::Sequential,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "postprop-server", version, about = "Post property patch server")]
struct Args {
    /// Address to bind.
    #[arg(long, env = "POSTPROP_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on (0 = OS-assigned).
    #[arg(long, env = "POSTPROP_PORT", default_value_t = 8065)]
    port: u16,

    /// JSON file with `groups` and `fields` to declare at startup.
    #[arg(long, env = "POSTPROP_DEFINITIONS")]
    definitions: Option<PathBuf>,

    /// JSON file with content flagging settings.
    #[arg(long, env = "POSTPROP_CONTENT_FLAGGING")]
    content_flagging: Option<PathBuf>,

    /// How permission handlers are scheduled within a request.
    #[arg(long, env = "POSTPROP_DISPATCH", value_enum, default_value = "concurrent")]
    dispatch: Dispatch,

    /// Largest number of fields accepted in one patch.
    #[arg(long, env = "POSTPROP_MAX_FIELDS", default_value_t = 100)]
    max_fields_per_patch: usize,

    /// Header carrying the authenticated requester ID.
    #[arg(long, env = "POSTPROP_REQUESTER_HEADER", default_value = "x-requester-id")]
    requester_header: String,

    /// Allowed CORS origins, comma separated.
    #[arg(long, env = "POSTPROP_CORS_ORIGINS", value_delimiter = ',', default_value = "*")]
    cors_origins: Vec<String>,

    /// Request deadline in seconds.
    #[arg(long, env = "POSTPROP_REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    request_timeout_secs: u64,

    /// TLS certificate (PEM). Requires `--tls-key`.
    #[arg(long, env = "POSTPROP_TLS_CERT", requires = "tls_key")]
    tls_cert: Option<PathBuf>,

    /// TLS private key (PEM). Requires `--tls-cert`.
    #[arg(long, env = "POSTPROP_TLS_KEY", requires = "tls_cert")]
    tls_key: Option<PathBuf>,

    /// Expose Prometheus metrics on this address.
    #[arg(long, env = "POSTPROP_METRICS_ADDR")]
    metrics_addr: Option<SocketAddr>,

    /// Emit logs as JSON lines.
    #[arg(long, env = "POSTPROP_LOG_JSON")]
    log_json: bool,
}

impl Args {
    fn network_config(&self) -> NetworkConfig {
        let tls = match (&self.tls_cert, &self.tls_key) {
            (Some(cert_path), Some(key_path)) => Some(TlsConfig {
                cert_path: cert_path.clone(),
                key_path: key_path.clone(),
            }),
            _ => None,
        };
        NetworkConfig {
            host: self.host.clone(),
            port: self.port,
            tls,
            cors_origins: self.cors_origins.clone(),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            requester_header: self.requester_header.to_ascii_lowercase(),
            ..NetworkConfig::default()
        }
    }

    fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            dispatch: self.dispatch.into(),
            max_fields_per_patch: self.max_fields_per_patch,
        }
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,postprop_server=debug,postprop_core=debug".into());
    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.log_json);

    if let Some(addr) = args.metrics_addr {
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .context("installing Prometheus exporter")?;
        info!("Prometheus metrics on {addr}");
    }

    let definitions = match &args.definitions {
        Some(path) => PropertyDefinitions::load(path)?,
        None => PropertyDefinitions::new(),
    };
    let definitions = Arc::new(definitions);

    let content_flagging = match &args.content_flagging {
        Some(path) => ContentFlaggingSettings::load(path)?,
        None => ContentFlaggingSettings::default(),
    };

    let handlers = HandlerRegistry::with_defaults();
    info!(groups = ?handlers.group_names(), "permission handlers registered");

    let pipeline = PatchPipeline::new(
        definitions.clone(),
        definitions.clone(),
        Arc::new(handlers),
        args.pipeline_config(),
    );

    let mut module = NetworkModule::new(
        args.network_config(),
        Arc::new(pipeline),
        Arc::new(InMemoryPropertyStore::new(definitions)),
        Arc::new(content_flagging),
    );
    let port = module.start().await?;
    info!("postprop-server listening on {}:{port}", args.host);

    module
        .serve(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("failed to listen for Ctrl-C: {e}");
                std::future::pending::<()>().await;
            }
        })
        .await
}
