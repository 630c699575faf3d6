//! BookSmart lending core bootstrap
//!
//! Loads the configuration, installs logging, opens the configured storage
//! (running database migrations) and reports what the catalog holds.

use booksmart_lending::{bootstrap, models::BookQuery, telemetry, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = bootstrap::load_config()?;
    telemetry::init_tracing(&config.logging)?;

    tracing::info!("Starting BookSmart lending core v{}", env!("CARGO_PKG_VERSION"));

    let backend = config.storage.backend;
    let state = AppState::build(config).await?;
    let books = state.services.catalog.list_books(&BookQuery::default()).await?;

    tracing::info!(
        "Lending core ready on {:?} storage, {} books in the catalog",
        backend,
        books.len()
    );
    Ok(())
}
