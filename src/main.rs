use anyhow::Context;
use clap::Parser;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use finance_tracker_api::app::{build_router, cors_layer, AppState};
use finance_tracker_api::config::config;
use finance_tracker_api::is_production;

#[derive(Parser)]
#[command(name = "finance-tracker-api")]
#[command(about = "Finance tracker API server")]
#[command(version)]
struct Cli {
    #[arg(long, env = "FINANCE_API_PORT", help = "Port to listen on (falls back to PORT, then 3000)")]
    port: Option<u16>,

    #[arg(long, default_value = "0.0.0.0", help = "Address to bind")]
    host: String,
}

impl Cli {
    fn port(&self) -> u16 {
        self.port
            .or_else(|| std::env::var("PORT").ok().and_then(|s| s.parse::<u16>().ok()))
            .unwrap_or(3000)
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if is_production!() {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up OPENAI_KEY, DATABASE_URL, etc.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing();

    let config = config();
    tracing::info!("Starting finance tracker API in {:?} mode", config.environment);

    let state = AppState::from_config(config).await?;
    let mut app = build_router(state);
    if let Some(cors) = cors_layer(&config.security) {
        app = app.layer(cors);
    }
    if config.api.enable_request_logging {
        app = app.layer(TraceLayer::new_for_http());
    }

    let bind_addr = format!("{}:{}", cli.host, cli.port());
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("Finance tracker API listening on http://{}", bind_addr);
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
