use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use server::config::{AppConfig, CONFIG_FILE};
use server::{create_router, state::AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "showrunner")]
#[command(about = "Live running order and judging for competitions", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[arg(short, long, global = true, default_value = CONFIG_FILE)]
    config: PathBuf,

    /// Overrides `server.port` from the config file.
    #[arg(short, long, global = true)]
    port: Option<u16>,

    /// Overrides `server.database_url` from the config file.
    #[arg(long, global = true)]
    database_url: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config and create the database.
    Init,
    Serve,
    /// Summarize the events stored in the database.
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Init) => init(&cli.config, cli.port, cli.database_url).await,
        Some(Commands::Status) => {
            let config = load_config(&cli.config, cli.port, cli.database_url).await?;
            status(&config).await
        }
        Some(Commands::Serve) | None => {
            let config = load_config(&cli.config, cli.port, cli.database_url).await?;
            serve(config).await
        }
    }
}

async fn load_config(
    path: &Path,
    port: Option<u16>,
    database_url: Option<String>,
) -> Result<AppConfig> {
    let mut config = AppConfig::load(path)
        .await
        .with_context(|| format!("Failed to load {}", path.display()))?;
    apply_overrides(&mut config, port, database_url);
    Ok(config)
}

fn apply_overrides(config: &mut AppConfig, port: Option<u16>, database_url: Option<String>) {
    if let Some(port) = port {
        config.server.port = port;
    }
    if let Some(database_url) = database_url {
        config.server.database_url = database_url;
    }
}

async fn init(path: &Path, port: Option<u16>, database_url: Option<String>) -> Result<()> {
    if path.exists() {
        println!("Already initialized: {}", path.display());
        return Ok(());
    }

    let mut config = AppConfig::default();
    apply_overrides(&mut config, port, database_url);
    config.write(path).await?;

    let pool = open_database(&config).await?;
    pool.close().await;

    println!();
    println!("Initialized Showrunner");
    println!();
    println!("Created:");
    println!("  {}", path.display());
    println!("  {}", config.server.database_url);
    println!();
    println!("Next steps:");
    println!("  Run 'showrunner serve' to start the server");

    Ok(())
}

async fn open_database(config: &AppConfig) -> Result<sqlx::SqlitePool> {
    let pool = db::create_pool(&config.server.database_url)
        .await
        .context("Failed to create database pool")?;
    db::run_migrations(&pool)
        .await
        .context("Failed to run migrations")?;
    Ok(pool)
}

async fn serve(config: AppConfig) -> Result<()> {
    init_tracing();

    tracing::info!("Database: {}", config.server.database_url);
    let pool = open_database(&config).await?;

    let address = config.bind_address();
    let port = config.server.port;
    let state = AppState::with_config(pool, config);
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;

    println!();
    println!("Showrunner");
    println!("════════════════════════════════════════");
    println!();
    println!("  API Server:  http://localhost:{}", port);
    println!("  Swagger UI:  http://localhost:{}/swagger-ui", port);
    println!("  Live feed:   ws://localhost:{}/ws", port);
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    tracing::info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn status(config: &AppConfig) -> Result<()> {
    let pool = open_database(config).await?;
    let events = db::EventRepository::new(pool.clone()).find_all().await?;
    let performances = db::PerformanceRepository::new(pool);

    println!();
    println!("Database: {}", config.server.database_url);
    println!();

    if events.is_empty() {
        println!("No events yet.");
    } else {
        println!("Events ({}):", events.len());
        for event in &events {
            let (total, numbered, withdrawn) = performances.count_by_event(event.id).await?;
            println!(
                "  {} [v{}] {} performances, {} numbered, {} withdrawn",
                event.name, event.sequence_version, total, numbered, withdrawn
            );
        }
    }

    println!();

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "showrunner=info,server=info,tower_http=info".into()),
        )
        .init();
}
