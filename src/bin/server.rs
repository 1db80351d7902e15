//! Table Server Binary
//!
//! Accepts antenna reads over HTTP, keeps the table state in PostgreSQL (or
//! in memory when no database is configured), and streams the projection to
//! viewers over WebSocket.

use clap::Parser;
use rfid_poker::args::Args;
use rfid_poker::catalog::Catalog;
use rfid_poker::equity::Showdown;
use rfid_poker::hosting::Server;
use rfid_poker::store::Database;
use rfid_poker::store::Memory;
use rfid_poker::table::Table;
use rfid_poker::watchdog::Watchdog;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    rfid_poker::log()?;
    let args = Args::parse();
    let shutdown = rfid_poker::interrupt();
    let catalog = Catalog::load(&args.config)?;
    match args.database.as_deref() {
        #[cfg(feature = "database")]
        Some(url) => {
            let db = rfid_poker::store::Postgres::connect(url).await?;
            serve(Arc::new(db), catalog, &args, shutdown).await
        }
        #[cfg(not(feature = "database"))]
        Some(_) => anyhow::bail!("built without the database feature"),
        None => {
            log::warn!("no database configured, table state lives in memory");
            serve(Arc::new(Memory::default()), catalog, &args, shutdown).await
        }
    }
}

async fn serve<D: Database>(db: Arc<D>, catalog: Catalog, args: &Args, shutdown: rfid_poker::Shutdown) -> anyhow::Result<()> {
    let watchdog = Watchdog::new(args.game_timeout(), args.tick());
    let table = Table::new(db, catalog, Arc::new(Showdown::default()), watchdog, shutdown);
    table.rehydrate().await?;
    let watchdog = table.clone().watch();
    Server::run(table.clone(), &args.bind, args.grace()).await?;
    if let Some(watchdog) = watchdog {
        watchdog.await?;
    }
    table.drain().await;
    log::info!("shut down cleanly");
    Ok(())
}
