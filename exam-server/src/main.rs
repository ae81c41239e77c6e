use std::sync::Arc;

use clap::Parser;
use exam_core::ExamConfig;
use tokio::sync::broadcast;
use tracing_subscriber::{fmt, EnvFilter};

use exam_server::services::AppServices;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "exam.toml")]
    config: String,

    /// Check storage connectivity and exit
    #[arg(long)]
    health: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (dev convenience)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Load config
    let config = match ExamConfig::load(&args.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {}", args.config, e);
            std::process::exit(1);
        }
    };

    // Init logging: RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.service.log_level));
    fmt().with_env_filter(filter).init();

    let services = match AppServices::from_config(&config).await {
        Ok(s) => Arc::new(s),
        Err(e) => {
            eprintln!("Failed to initialise storage: {}", e);
            std::process::exit(1);
        }
    };

    if args.health {
        match services.states.health_check().await {
            Ok(v) => println!("✅ Storage connected: {}", v),
            Err(e) => {
                println!("❌ Storage check failed: {}", e);
                std::process::exit(1);
            }
        }
        println!("✅ Exam Builder health check passed");
        return Ok(());
    }

    let (tx, _rx) = broadcast::channel(1);
    let shutdown_tx = tx.clone();

    tokio::spawn(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to listen for Ctrl+C");
        tracing::info!("Shutdown signal received");
        let _ = shutdown_tx.send(());
    });

    // Background cache sweep
    let sweep_services = services.clone();
    let sweep_interval = config.cache.sweep_interval_minutes;
    let sweep_shutdown = tx.subscribe();
    tokio::spawn(async move {
        exam_server::subsystems::sweep::run_cache_sweep_loop(
            sweep_services,
            sweep_interval,
            sweep_shutdown,
        )
        .await;
    });

    exam_server::http::start_http_server(services, config, tx.subscribe()).await?;

    Ok(())
}
