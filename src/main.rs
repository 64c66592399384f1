//! Local Volume Provisioner
//!
//! Node agent that discovers local directories and block devices under the
//! configured discovery paths and keeps a PersistentVolume for each of them.

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use local_volume_provisioner::cluster::get_node_info;
use local_volume_provisioner::config::{
    DEFAULT_CONFIG_PATH, DEFAULT_NODE_LABEL_KEY, PROVISIONER_NAME_PREFIX,
};
use local_volume_provisioner::{
    Discoverer, DiscoveryMetrics, Error, HostVolumeUtil, KubeEventRecorder, KubeVolumeApi,
    ProvisionerConfig, Result, RuntimeConfig,
};

// =============================================================================
// CLI Arguments
// =============================================================================

/// Local Volume Provisioner - discovers local disks and registers PersistentVolumes
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Storage class map (YAML)
    #[arg(long, env = "PROVISIONER_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Name of the node this provisioner runs on
    #[arg(long, env = "MY_NODE_NAME")]
    node_name: String,

    /// Node label used for volume node affinity
    #[arg(long, env = "NODE_LABEL_KEY", default_value = DEFAULT_NODE_LABEL_KEY)]
    node_label_key: String,

    /// Discovery interval in seconds
    #[arg(long, env = "DISCOVERY_PERIOD", default_value = "10")]
    discovery_period_secs: u64,

    /// Health server bind address
    #[arg(long, env = "HEALTH_ADDR", default_value = "0.0.0.0:8081")]
    health_addr: String,

    /// Metrics server bind address
    #[arg(long, env = "METRICS_ADDR", default_value = "0.0.0.0:8080")]
    metrics_addr: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    init_logging(&args);

    info!("Starting {}", local_volume_provisioner::NAME);
    info!("  Version: {}", local_volume_provisioner::VERSION);
    info!("  Node: {}", args.node_name);
    info!("  Config: {}", args.config.display());

    let discovery = ProvisionerConfig::load(&args.config)?;
    for (class, mount) in &discovery.storage_class_map {
        info!(
            "  Storage class {}: hostDir {}, mountDir {}",
            class, mount.host_dir, mount.mount_dir
        );
    }

    let client = kube::Client::try_default().await?;
    let node = get_node_info(client.clone(), &args.node_name).await?;
    let name = RuntimeConfig::provisioner_name(&node);
    info!("Provisioner identity: {}", name);

    let runtime = RuntimeConfig {
        recorder: Arc::new(KubeEventRecorder::new(
            client.clone(),
            PROVISIONER_NAME_PREFIX,
            &name,
        )),
        api: Arc::new(KubeVolumeApi::new(client)),
        vol_util: Arc::new(HostVolumeUtil::new()),
        name,
        node,
        node_label_key: args.node_label_key.clone(),
        discovery_map: discovery.storage_class_map,
    };

    let metrics = DiscoveryMetrics::new()?;
    let discoverer = Discoverer::new(runtime, metrics.clone())?;

    // Start health server
    let health_addr = args.health_addr.clone();
    tokio::spawn(async move {
        if let Err(e) = run_health_server(&health_addr).await {
            error!("Health server error: {}", e);
        }
    });

    // Start metrics server
    let metrics_addr = args.metrics_addr.clone();
    tokio::spawn(async move {
        if let Err(e) = run_metrics_server(&metrics_addr, metrics).await {
            error!("Metrics server error: {}", e);
        }
    });

    discoverer
        .run(Duration::from_secs(args.discovery_period_secs.max(1)), shutdown_signal())
        .await;

    info!("Provisioner shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let mut filter = EnvFilter::from_default_env().add_directive(level.into());
    for directive in ["hyper=warn", "kube=info", "tower=warn"] {
        if let Ok(d) = directive.parse() {
            filter = filter.add_directive(d);
        }
    }

    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .init();
    }
}

// =============================================================================
// Health Server
// =============================================================================

async fn run_health_server(addr: &str) -> Result<()> {
    use hyper::service::{make_service_fn, service_fn};
    use hyper::{Body, Request, Response, Server, StatusCode};

    let make_svc = make_service_fn(|_conn| async {
        Ok::<_, std::convert::Infallible>(service_fn(|req: Request<Body>| async move {
            let response = match req.uri().path() {
                "/healthz" | "/livez" | "/readyz" => Response::new(Body::from("ok")),
                _ => {
                    let mut r = Response::new(Body::from("not found"));
                    *r.status_mut() = StatusCode::NOT_FOUND;
                    r
                }
            };
            Ok::<_, std::convert::Infallible>(response)
        }))
    });

    let addr: SocketAddr = addr.parse().map_err(|e| {
        Error::Configuration(format!("Invalid health server address: {}", e))
    })?;

    info!("Health server listening on {}", addr);
    Server::bind(&addr)
        .serve(make_svc)
        .await
        .map_err(|e| Error::Internal(format!("Health server error: {}", e)))?;

    Ok(())
}

// =============================================================================
// Metrics Server
// =============================================================================

async fn run_metrics_server(addr: &str, metrics: DiscoveryMetrics) -> Result<()> {
    use hyper::service::{make_service_fn, service_fn};
    use hyper::{Body, Request, Response, Server, StatusCode};

    let make_svc = make_service_fn(move |_conn| {
        let metrics = metrics.clone();
        async move {
            Ok::<_, std::convert::Infallible>(service_fn(move |req: Request<Body>| {
                let metrics = metrics.clone();
                async move {
                    let response = match req.uri().path() {
                        "/metrics" => match metrics.encode() {
                            Ok(text) => Response::new(Body::from(text)),
                            Err(e) => {
                                let mut r = Response::new(Body::from(e.to_string()));
                                *r.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
                                r
                            }
                        },
                        _ => {
                            let mut r = Response::new(Body::from("not found"));
                            *r.status_mut() = StatusCode::NOT_FOUND;
                            r
                        }
                    };
                    Ok::<_, std::convert::Infallible>(response)
                }
            }))
        }
    });

    let addr: SocketAddr = addr.parse().map_err(|e| {
        Error::Configuration(format!("Invalid metrics server address: {}", e))
    })?;

    info!("Metrics server listening on {}", addr);
    Server::bind(&addr)
        .serve(make_svc)
        .await
        .map_err(|e| Error::Internal(format!("Metrics server error: {}", e)))?;

    Ok(())
}
