use anyhow::Result;
use clap::{Parser, Subcommand};
use sea_orm_migration::MigratorTrait;
use tracing::info;
use tracing_subscriber::EnvFilter;

use datalens::config::AppConfig;
use datalens::database::{establish_connection, migrations::Migrator};
use datalens::server;

#[derive(Parser)]
#[command(name = "datalens", version, about = "Multi-tenant data-import and quality-analysis service")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Bind address, e.g. 0.0.0.0:3000 (overrides DATALENS_BIND_ADDR)
        #[arg(short, long)]
        bind: Option<String>,
        /// Database URL (overrides DATALENS_DATABASE_URL)
        #[arg(long)]
        database_url: Option<String>,
        /// Allowed CORS origin (overrides DATALENS_CORS_ORIGIN)
        #[arg(long)]
        cors_origin: Option<String>,
    },
    /// Run database migrations
    Migrate {
        #[command(subcommand)]
        direction: MigrateDirection,
    },
}

#[derive(Subcommand, Debug)]
enum MigrateDirection {
    Up,
    Down,
    Fresh,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            bind,
            database_url,
            cors_origin,
        } => {
            // CLI flags take precedence over environment configuration
            if let Some(url) = database_url {
                std::env::set_var("DATALENS_DATABASE_URL", url);
            }
            let mut config = AppConfig::from_env()?;
            if let Some(bind) = bind {
                config.bind_addr = bind;
            }
            if let Some(origin) = cors_origin {
                config.cors_origin = Some(origin);
            }
            server::start_server(config).await?;
        }
        Commands::Migrate { direction } => {
            let config = AppConfig::from_env()?;
            let db = establish_connection(&config.database_url).await?;
            match direction {
                MigrateDirection::Up => Migrator::up(&db, None).await?,
                MigrateDirection::Down => Migrator::down(&db, None).await?,
                MigrateDirection::Fresh => Migrator::fresh(&db).await?,
            }
            info!("Migration {direction:?} completed");
        }
    }

    Ok(())
}
