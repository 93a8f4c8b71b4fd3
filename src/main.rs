use std::path::PathBuf;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use vakt::audit::{spawn_audit_writer, AuditSink};
use vakt::config::{Config, LoggingConfig};
use vakt::gateway::Gateway;
use vakt::providers::build_registry;
use vakt::{build_app, AppState};

const USAGE: &str = "\
vakt - policy-enforcing LLM API gateway

USAGE:
    vakt [OPTIONS]

OPTIONS:
    -c, --config <PATH>    Path to the TOML config file
                           (default: vakt.toml, or $VAKT_CONFIG)
    -h, --help             Print this help
    -V, --version          Print version
";

struct CliArgs {
    config_path: PathBuf,
}

fn parse_args() -> anyhow::Result<Option<CliArgs>> {
    let mut config_path: Option<PathBuf> = None;
    let mut args = std::env::args().skip(1);

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                print!("{USAGE}");
                return Ok(None);
            }
            "-V" | "--version" => {
                println!("vakt {}", env!("CARGO_PKG_VERSION"));
                return Ok(None);
            }
            "-c" | "--config" => {
                let value = args
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("{arg} requires a path argument"))?;
                config_path = Some(PathBuf::from(value));
            }
            other => anyhow::bail!("unknown argument: {other}\n\n{USAGE}"),
        }
    }

    let config_path = config_path
        .or_else(|| std::env::var("VAKT_CONFIG").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("vakt.toml"));

    Ok(Some(CliArgs { config_path }))
}

fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    if logging.json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let Some(args) = parse_args()? else {
        return Ok(());
    };

    let config = Arc::new(Config::load(&args.config_path)?);
    init_tracing(&config.logging);
    tracing::info!(
        config = %args.config_path.display(),
        config_version = %config.config_version,
        "Starting vakt"
    );

    let registry = build_registry(&config.providers)?;
    if registry.is_empty() {
        tracing::warn!("No providers configured; every chat request will fail");
    }

    let (audit, audit_rx) = AuditSink::new();
    let audit_writer = spawn_audit_writer(audit_rx, std::io::stdout());

    let gateway = Arc::new(Gateway::new(Arc::clone(&config), registry, audit)?);
    let state = AppState {
        config: Arc::clone(&config),
        gateway,
    };
    let app = build_app(state);

    let addr = config.listen_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Dropping the state drops the last AuditSink; drain the channel before
    // exiting so no event is lost.
    audit_writer.await?;
    Ok(())
}
