//! CLI argument definitions for coinsight.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `dominance` | Market dominance breakdown |
//! | `markets` | Top markets by market cap |
//! | `coin` | Metadata for one coin |
//! | `policy` | Inspect and change blocking and source preferences |
//! | `endpoints` | List configured endpoints |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--timeout-ms` | `COINSIGHT_TIMEOUT_MS` or `30000` | Per-call timeout |
//! | `--home` | `COINSIGHT_HOME` or `~/.coinsight` | Policy snapshot directory |
//! | `--memory` | `false` | Keep policy in memory only |
//!
//! # Examples
//!
//! ```bash
//! coinsight dominance --pretty
//! coinsight markets --page 2 --limit 50
//! coinsight policy global-block --provider coingecko
//! coinsight policy prefer --feature markets --source secondary --fallback false
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Crypto market metrics from a backend proxy with public-API fallback.
#[derive(Debug, Parser)]
#[command(name = "coinsight", author, version, about)]
pub struct Cli {
    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Per-call timeout in milliseconds.
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,

    /// Data home holding the persisted policy snapshot.
    #[arg(long, global = true)]
    pub home: Option<PathBuf>,

    /// Use an in-memory policy store; nothing is read from or written to disk.
    #[arg(long, global = true, default_value_t = false)]
    pub memory: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch BTC, ETH, stablecoin and other market dominance.
    ///
    /// Falls back to deriving dominance from raw market caps when the
    /// backend is unavailable or blocked.
    Dominance,

    /// Fetch the top markets listing.
    Markets(MarketsArgs),

    /// Fetch metadata for a single coin.
    Coin(CoinArgs),

    /// Inspect or change blocking rules and source preferences.
    Policy(PolicyArgs),

    /// List configured endpoints.
    Endpoints,
}

#[derive(Debug, Args)]
pub struct MarketsArgs {
    /// Page number, starting at 1.
    #[arg(long, default_value_t = 1)]
    pub page: u32,

    /// Rows per page.
    #[arg(long, default_value_t = 100)]
    pub limit: u32,
}

#[derive(Debug, Args)]
pub struct CoinArgs {
    /// Coin id (e.g. bitcoin).
    pub id: String,
}

#[derive(Debug, Args)]
pub struct PolicyArgs {
    #[command(subcommand)]
    pub command: PolicyCommand,
}

#[derive(Debug, Subcommand)]
pub enum PolicyCommand {
    /// Print stored policy and effective preferences.
    Show,
    /// Block one data source for a feature.
    Block(FeatureSourceArgs),
    /// Unblock one data source for a feature.
    Unblock(FeatureSourceArgs),
    /// Block a provider for every feature.
    GlobalBlock(ProviderArgs),
    /// Lift a provider-wide block.
    GlobalUnblock(ProviderArgs),
    /// Set source preferences, globally or for one feature.
    Prefer(PreferArgs),
    /// Restore every policy partition to its defaults.
    Reset,
}

#[derive(Debug, Args)]
pub struct FeatureSourceArgs {
    /// Feature id (e.g. dominance, markets).
    #[arg(long)]
    pub feature: String,

    /// Data source: primary or secondary.
    #[arg(long)]
    pub source: String,
}

#[derive(Debug, Args)]
pub struct ProviderArgs {
    /// Provider: backend or coingecko.
    #[arg(long)]
    pub provider: String,
}

#[derive(Debug, Args)]
pub struct PreferArgs {
    /// Feature id; omit to change the global preferences.
    #[arg(long)]
    pub feature: Option<String>,

    /// Preferred data source: primary or secondary.
    #[arg(long)]
    pub source: Option<String>,

    /// Whether to try the alternate source on failure.
    #[arg(long)]
    pub fallback: Option<bool>,

    /// Whether the feature inherits the global preferences (feature only).
    #[arg(long)]
    pub use_global: Option<bool>,
}
