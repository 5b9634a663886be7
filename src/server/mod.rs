pub mod app;
pub mod handlers;

use anyhow::Result;
use tracing::info;

use crate::config::AppConfig;
use crate::database::{establish_connection, setup_database};

pub async fn start_server(config: AppConfig) -> Result<()> {
    let db = establish_connection(&config.database_url).await?;

    setup_database(&db).await?;
    info!("Database migrations completed");

    let bind_addr = config.bind_addr.clone();
    let app = app::create_app(db, &config).await?;

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("Server running on http://{}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
