//! Live RFID poker table.
//!
//! Turns an unordered, duplicate-prone stream of antenna reads (tag UID plus
//! device identity) into a continuously broadcast game state: hole cards per
//! player, the board, mucked hands, and live equity for every hand still in
//! contention.
pub mod antenna;
pub mod args;
pub mod assembler;
pub mod cards;
pub mod catalog;
pub mod equity;
pub mod error;
pub mod hosting;
pub mod id;
pub mod lifecycle;
pub mod notify;
pub mod projection;
pub mod store;
pub mod table;
pub mod watchdog;

pub use error::Error;
pub use id::ID;

// ============================================================================
// TYPE ALIASES
// ============================================================================
/// Win probability of a hand still in contention.
pub type Probability = f32;
/// Process-wide shutdown flag, flipped to `true` exactly once.
pub type Shutdown = tokio::sync::watch::Receiver<bool>;

// ============================================================================
// TABLE PARAMETERS
// ============================================================================
/// Community cards a single game can hold.
pub const BOARD_LIMIT: usize = 5;
/// Runouts at or below this many missing board cards are enumerated exhaustively.
pub const EXHAUSTIVE_DEPTH: usize = 2;
/// Random runouts sampled when more board cards are missing.
pub const EQUITY_SAMPLES: usize = 20_000;
/// Padding appended to raw reader UIDs before catalog lookup.
pub const UID_PADDING: &str = "000000";

// ============================================================================
// RUNTIME UTILITIES
// ============================================================================
/// Initialize dual logging (terminal + file) with timestamped log files.
/// Creates `logs/` directory and writes DEBUG level to file, INFO to terminal.
pub fn log() -> anyhow::Result<()> {
    std::fs::create_dir_all("logs")?;
    let config = simplelog::ConfigBuilder::new()
        .set_location_level(log::LevelFilter::Off)
        .set_target_level(log::LevelFilter::Off)
        .set_thread_level(log::LevelFilter::Off)
        .build();
    let time = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)?
        .as_secs();
    let file = simplelog::WriteLogger::new(
        log::LevelFilter::Debug,
        config.clone(),
        std::fs::File::create(format!("logs/{}.log", time))?,
    );
    let term = simplelog::TermLogger::new(
        log::LevelFilter::Info,
        config.clone(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    );
    simplelog::CombinedLogger::init(vec![term, file])?;
    Ok(())
}

/// Register the Ctrl+C handler and hand back the shutdown flag that
/// background tasks and viewer sessions observe.
pub fn interrupt() -> Shutdown {
    let (tx, rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                log::warn!("interrupt received, shutting down");
                let _ = tx.send(true);
            }
            Err(e) => {
                log::error!("cannot listen for interrupt: {}", e);
                std::future::pending::<()>().await;
            }
        }
    });
    rx
}

/// Resolves once shutdown has been requested or the flag's owner is gone.
pub async fn stopped(shutdown: &mut Shutdown) {
    let _ = shutdown.wait_for(|flag| *flag).await;
}
