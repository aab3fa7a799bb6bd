use std::net::SocketAddr;
use std::time::Duration as StdDuration;

use chrono::Duration;
use clap::{Parser, Subcommand};
use review_core::model::DeckId;
use review_core::scheduler::SchedulerConfig;
use services::RetryPolicy;

/// Spaced-repetition review server for flashcard decks.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// `SQLite` database URL or file path.
    #[arg(
        long = "db",
        env = "SRS_DB_URL",
        default_value = "sqlite://srs.sqlite3",
        global = true
    )]
    pub db_url: String,

    /// Address the HTTP API listens on.
    #[arg(long, env = "SRS_BIND", default_value = "0.0.0.0:8080", global = true)]
    pub bind: SocketAddr,

    /// Interval after the first review of a card, in seconds.
    #[arg(
        long,
        env = "SRS_SEED_INTERVAL_SECS",
        value_parser = clap::value_parser!(i64).range(1..),
        global = true
    )]
    pub seed_interval_secs: Option<i64>,

    /// Interval after a missed card, in seconds.
    #[arg(
        long,
        env = "SRS_RESET_INTERVAL_SECS",
        value_parser = clap::value_parser!(i64).range(1..),
        global = true
    )]
    pub reset_interval_secs: Option<i64>,

    /// Attempts per review write before reporting the store unavailable.
    #[arg(
        long,
        env = "SRS_MAX_ATTEMPTS",
        value_parser = clap::value_parser!(u32).range(1..),
        global = true
    )]
    pub max_attempts: Option<u32>,

    /// Deadline for a single store call, in milliseconds.
    #[arg(
        long,
        env = "SRS_OP_TIMEOUT_MS",
        value_parser = clap::value_parser!(u64).range(1..),
        global = true
    )]
    pub op_timeout_ms: Option<u64>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Serve the JSON API (default).
    Serve,
    /// Review a deck's due cards in the terminal.
    Study {
        #[arg(long)]
        deck_id: DeckId,
    },
    /// Create a small demo deck.
    Seed,
}

impl Cli {
    #[must_use]
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Serve)
    }

    /// Scheduler constants with any overrides applied.
    #[must_use]
    pub fn scheduler_config(&self) -> SchedulerConfig {
        let mut config = SchedulerConfig::default();
        if let Some(secs) = self.seed_interval_secs {
            config.seed_interval = Duration::seconds(secs);
        }
        if let Some(secs) = self.reset_interval_secs {
            config.reset_interval = Duration::seconds(secs);
        }
        config
    }

    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        let mut policy = RetryPolicy::default();
        if let Some(attempts) = self.max_attempts {
            policy.max_attempts = attempts;
        }
        if let Some(ms) = self.op_timeout_ms {
            policy.op_timeout = StdDuration::from_millis(ms);
        }
        policy
    }
}
