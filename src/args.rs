use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Process configuration. Every flag can also come from the environment.
#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// YAML file mapping tag UIDs to card labels
    #[arg(long, env = "RFID_POKER_CONFIG_PATH", default_value = "./config.yaml")]
    pub config: PathBuf,
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:8080")]
    pub bind: String,
    /// PostgreSQL connection string; state stays in memory when absent
    #[arg(long, env = "DB_URL")]
    pub database: Option<String>,
    /// seconds of table silence before a started game is cleared; 0 disables
    #[arg(long, env = "GAME_TIMEOUT", default_value_t = 0)]
    pub game_timeout: u64,
    /// seconds between watchdog polls
    #[arg(long, env = "WATCHDOG_TICK", default_value_t = 5)]
    pub tick: u64,
    /// seconds in-flight requests get to finish on shutdown
    #[arg(long, env = "SHUTDOWN_GRACE", default_value_t = 10)]
    pub grace: u64,
}

impl Args {
    pub fn game_timeout(&self) -> Duration {
        Duration::from_secs(self.game_timeout)
    }
    pub fn tick(&self) -> Duration {
        Duration::from_secs(self.tick)
    }
    pub fn grace(&self) -> Duration {
        Duration::from_secs(self.grace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_defaults() {
        let args = Args::try_parse_from([
            "rfid-poker",
            "--config",
            "cards.yaml",
            "--bind",
            "127.0.0.1:9000",
            "--game-timeout",
            "120",
        ])
        .unwrap();
        assert_eq!(args.config, PathBuf::from("cards.yaml"));
        assert_eq!(args.bind, "127.0.0.1:9000");
        assert_eq!(args.game_timeout(), Duration::from_secs(120));
    }

    #[test]
    fn rejects_negative_timeout() {
        assert!(Args::try_parse_from(["rfid-poker", "--game-timeout", "-5"]).is_err());
    }
}
