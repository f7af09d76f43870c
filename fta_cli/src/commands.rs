use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "fta")]
#[command(about = "friend.tech keys assistant: mirror sells of your key holders")]
#[command(version)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml", env = "FTA_CONFIG_PATH")]
    pub config: PathBuf,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq)]
pub enum OutputFormat {
    Plain,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compute how many keys to sell after a holder sold some of yours
    SellAmount {
        /// Keys of the trader you own
        #[arg(allow_hyphen_values = true)]
        local: String,
        /// Keys of yours the trader still holds after the sell
        #[arg(allow_hyphen_values = true)]
        remaining: String,
        /// Keys of yours the trader just sold
        #[arg(allow_hyphen_values = true)]
        sold: String,
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Plain)]
        format: OutputFormat,
    },

    /// Watch Trade events and sell keys of traders who sell yours
    WatchSells {
        /// Telegram chat to notify, overrides `telegram_user_id`
        #[arg(long)]
        telegram_user_id: Option<i64>,
        /// Log sells instead of sending transactions
        #[arg(long)]
        dry_run: bool,
    },

    /// Sell keys of one trader right away
    Sell {
        /// Trader whose keys to sell
        address: String,
        /// Number of keys to sell
        #[arg(allow_hyphen_values = true)]
        quantity: String,
        /// Log the sell instead of sending a transaction
        #[arg(long)]
        dry_run: bool,
    },

    /// List the keys a wallet holds
    ListKeys {
        /// Wallet to list, defaults to the watched address
        #[arg(short, long)]
        address: Option<String>,
        /// Only traders not seen online for this many days
        #[arg(long)]
        inactive_days: Option<u32>,
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Plain)]
        format: OutputFormat,
    },

    /// Configuration management commands
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completion scripts
    Completion {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommands {
    /// Show configuration
    Show {
        #[arg(short, long)]
        sensitive: bool,
    },

    /// Validate configuration
    Validate,
}
