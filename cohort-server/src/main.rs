use anyhow::Context;
use clap::Parser;
use cohort_server::{
    create_app,
    infra::{
        config::Config,
        startup::{Backend, build_state},
    },
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "cohort-server", about = "Enrollment and course progress server")]
struct Cli {
    /// Server host (overrides SERVER_HOST)
    #[arg(long, env = "SERVER_HOST")]
    host: Option<String>,

    /// Server port (overrides SERVER_PORT)
    #[arg(short, long, env = "SERVER_PORT")]
    port: Option<u16>,

    /// Use the in-memory store and offline gateway instead of PostgreSQL
    #[arg(long, env = "COHORT_IN_MEMORY")]
    in_memory: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env before clap reads env-backed arguments
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = Config::from_env().context("failed to load configuration")?;
    if let Some(host) = cli.host {
        config.server_host = host;
    }
    if let Some(port) = cli.port {
        config.server_port = port;
    }

    let backend = if cli.in_memory {
        Backend::InMemory
    } else {
        Backend::Postgres
    };

    let addr = config.bind_address();
    info!(
        %addr,
        ?backend,
        fee_minor = config.enrollment.fee_minor,
        currency = %config.enrollment.currency,
        requires_confirmation = config.enrollment.requires_confirmation,
        "starting cohort server"
    );

    let state = build_state(config, backend).await?;
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
