use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use rodforge_jobs::{JobOrchestrator, OrchestratorConfig};
use rodforge_server::{router, AppState};
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "rodforge-server")]
#[command(about = "HTTP server turning prompts into rod simulations")]
struct Cli {
    /// TCP address to bind the web server
    #[arg(long, default_value = "0.0.0.0:8000")]
    bind: SocketAddr,

    /// YAML orchestrator configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Root directory for job directories (overrides the config file)
    #[arg(long)]
    generated_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rodforge_server=info,rodforge_jobs=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => match OrchestratorConfig::load(path) {
            Ok(config) => config,
            Err(err) => {
                error!("Failed to load {}: {err}", path.display());
                std::process::exit(1);
            }
        },
        None => OrchestratorConfig::default(),
    };
    if let Some(dir) = cli.generated_dir {
        config.generated_dir = dir;
    }

    if let Err(err) = std::fs::create_dir_all(&config.generated_dir) {
        error!("Failed to create {}: {err}", config.generated_dir.display());
        std::process::exit(1);
    }
    info!("Job directories under: {}", config.generated_dir.display());

    let orchestrator = match JobOrchestrator::from_config(config) {
        Ok(orchestrator) => orchestrator,
        Err(err) => {
            error!("{err}");
            std::process::exit(1);
        }
    };

    let app = router(AppState::new(orchestrator));

    let listener = match TcpListener::bind(cli.bind).await {
        Ok(listener) => listener,
        Err(err) => {
            error!("Failed to bind {}: {err}", cli.bind);
            std::process::exit(1);
        }
    };

    info!("rodforge server: http://{}", cli.bind);

    if let Err(err) = axum::serve(listener, app).await {
        error!("Server error: {err}");
    }
}
