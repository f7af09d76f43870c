mod commands;
mod health;

use clap::{CommandFactory, Parser};
use clap_complete::generate;
use colored::Colorize;
use commands::{Cli, Commands, ConfigCommands, OutputFormat};
use fta_core::native::{
    wallet_address_from_key, FileStorage, FriendTechApi, FriendTechContract, FriendTechEventSource,
    TelegramNotifier,
};
use fta_core::format::{pluralize, shorten_hash};
use fta_core::settings::is_hex_address;
use fta_core::{
    compute_sell_amount, filter_holdings, parse_quantity, sell_owned, CachedProfileLookup, CoreError, DryRunSeller,
    KeyHolding, LogNotifier, Notifier, PolicyConfig, SellExecutor, Settings, SharesLedger, TradeDispatcher,
    TradeEventPolicy,
};
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

/// How long cached trader profiles stay fresh
const PROFILE_CACHE_TTL_HOURS: i64 = 24;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    if cli.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    }

    if let Err(error) = handle_command(cli).await {
        eprintln!("{} {}", "ERROR:".red(), error);
        std::process::exit(1);
    }

    Ok(())
}

async fn handle_command(cli: Cli) -> Result<(), String> {
    match &cli.command {
        Commands::SellAmount {
            local,
            remaining,
            sold,
            format,
        } => {
            let output = sell_amount_output(local, remaining, sold, *format).map_err(|e| e.to_string())?;
            println!("{}", output);
            Ok(())
        }

        Commands::WatchSells {
            telegram_user_id,
            dry_run,
        } => {
            let mut settings = load_config(&cli.config)?;
            if let Some(id) = telegram_user_id {
                settings.telegram_user_id = Some(*id);
            }
            settings.validate().map_err(|e| e.to_string())?;
            watch_sells(settings, *dry_run).await
        }

        Commands::Sell {
            address,
            quantity,
            dry_run,
        } => {
            let quantity = parse_quantity(quantity).map_err(|e| e.to_string())?;
            if !is_hex_address(address) {
                return Err(format!("Not a valid address: {}", address));
            }
            let settings = load_config(&cli.config)?;
            settings.validate().map_err(|e| e.to_string())?;
            manual_sell(settings, address, quantity, *dry_run).await
        }

        Commands::ListKeys {
            address,
            inactive_days,
            format,
        } => {
            let settings = load_config(&cli.config)?;
            let owner = match address {
                Some(address) => address.clone(),
                None => {
                    let private_key = settings.resolve_private_key().map_err(|e| e.to_string())?;
                    owner_address(&settings, private_key.as_deref())?
                }
            };
            let api = FriendTechApi::new(&settings.profile_api_url).map_err(|e| e.to_string())?;
            let holdings = api.token_holdings(&owner).await.map_err(|e| e.to_string())?;
            let holdings = filter_holdings(holdings, &owner, *inactive_days, chrono::Utc::now().timestamp_millis());
            println!("{}", holdings_output(&holdings, *format).map_err(|e| e.to_string())?);
            Ok(())
        }

        Commands::Config { command } => handle_config_command(command, &cli),

        Commands::Completion { shell, output } => handle_completion_generation(*shell, output.clone()),
    }
}

fn sell_amount_output(local: &str, remaining: &str, sold: &str, format: OutputFormat) -> Result<String, CoreError> {
    let local = parse_quantity(local)?;
    let remaining = parse_quantity(remaining)?;
    let sold = parse_quantity(sold)?;
    let to_sell = compute_sell_amount(local, remaining, sold);

    Ok(match format {
        OutputFormat::Plain => to_sell.to_string(),
        OutputFormat::Json => serde_json::json!({
            "local": local,
            "remaining": remaining,
            "sold": sold,
            "sell_amount": to_sell,
        })
        .to_string(),
    })
}

fn holdings_output(holdings: &[KeyHolding], format: OutputFormat) -> Result<String, CoreError> {
    Ok(match format {
        OutputFormat::Plain => holdings
            .iter()
            .map(|h| {
                let name = h.twitter_username.as_deref().map(|u| format!(" @{}", u)).unwrap_or_default();
                format!("{}{}\t{} {}", h.address, name, h.balance, pluralize("key", h.balance))
            })
            .collect::<Vec<_>>()
            .join("\n"),
        OutputFormat::Json => serde_json::to_string_pretty(holdings)?,
    })
}

/// Wallet whose key holders are watched: `watched_address`, else the wallet
/// of the configured private key.
fn owner_address(settings: &Settings, private_key: Option<&str>) -> Result<String, String> {
    match (&settings.watched_address, private_key) {
        (Some(address), _) => Ok(address.clone()),
        (None, Some(key)) => wallet_address_from_key(key).map_err(|e| e.to_string()),
        (None, None) => Err("watched_address is not set and no private key is configured".to_string()),
    }
}

async fn manual_sell(settings: Settings, subject: &str, quantity: u64, dry_run: bool) -> Result<(), String> {
    let private_key = settings.resolve_private_key().map_err(|e| e.to_string())?;
    let owner = owner_address(&settings, private_key.as_deref())?;
    let (ledger, seller) = connect_trading(&settings, private_key.as_deref(), dry_run).await?;

    let receipt = sell_owned(ledger.as_ref(), seller.as_ref(), subject, &owner, quantity)
        .await
        .map_err(|e| e.to_string())?;
    println!(
        "Sold {} {} of {} (tx {})",
        receipt.amount,
        pluralize("key", receipt.amount),
        subject,
        shorten_hash(&receipt.transaction_hash)
    );
    Ok(())
}

/// Balance reader and seller for the configured node; dry runs only need a
/// read-only connection.
async fn connect_trading(
    settings: &Settings,
    private_key: Option<&str>,
    dry_run: bool,
) -> Result<(Arc<dyn SharesLedger>, Arc<dyn SellExecutor>), String> {
    match (private_key, dry_run) {
        (Some(key), false) => {
            let contract = Arc::new(
                FriendTechContract::connect(&settings.node_ws_url, &settings.contract_address, key)
                    .await
                    .map_err(|e| e.to_string())?,
            );
            let ledger: Arc<dyn SharesLedger> = contract.clone();
            let seller: Arc<dyn SellExecutor> = contract;
            Ok((ledger, seller))
        }
        (None, false) => Err("A private key is required to sell; use --dry-run instead".to_string()),
        (_, true) => {
            info!("Dry run: sells are logged, not sent");
            let contract = FriendTechContract::connect_read_only(&settings.node_ws_url, &settings.contract_address)
                .await
                .map_err(|e| e.to_string())?;
            let ledger: Arc<dyn SharesLedger> = Arc::new(contract);
            let seller: Arc<dyn SellExecutor> = Arc::new(DryRunSeller::new());
            Ok((ledger, seller))
        }
    }
}

async fn watch_sells(settings: Settings, dry_run: bool) -> Result<(), String> {
    let private_key = settings.resolve_private_key().map_err(|e| e.to_string())?;
    let watched_address = owner_address(&settings, private_key.as_deref())?;
    let (ledger, seller) = connect_trading(&settings, private_key.as_deref(), dry_run).await?;

    let notifier: Arc<dyn Notifier> = match (&settings.telegram_api_key, settings.telegram_user_id) {
        (Some(key), Some(user_id)) => Arc::new(TelegramNotifier::new(&settings.telegram_api_url, key, user_id)),
        _ => {
            warn!("No Telegram user configured, notifications go to the log only");
            Arc::new(LogNotifier)
        }
    };

    let profiles = CachedProfileLookup::load(
        FriendTechApi::new(&settings.profile_api_url).map_err(|e| e.to_string())?,
        FileStorage::new(&settings.cache_dir),
        chrono::Duration::hours(PROFILE_CACHE_TTL_HOURS),
    )
    .await
    .map_err(|e| e.to_string())?;

    let policy = Arc::new(
        TradeEventPolicy::new(
            PolicyConfig {
                watched_address: watched_address.clone(),
                dev_mode: settings.dev_mode,
                throttle: Duration::from_secs(settings.throttle_secs),
            },
            ledger,
            seller,
            notifier,
        )
        .with_profiles(Arc::new(profiles)),
    );

    let source = FriendTechEventSource::new(
        &settings.node_ws_url,
        &settings.contract_address,
        Duration::from_secs(settings.reconnect_delay_secs),
    )
    .map_err(|e| e.to_string())?;

    let (tx, rx) = mpsc::channel(settings.event_channel_capacity);
    let dispatcher_handle = tokio::spawn(TradeDispatcher::new(rx, policy).run());
    let source_handle = tokio::spawn(async move {
        if let Err(e) = source.run(tx).await {
            error!("Trade event source failed: {}", e);
        }
    });
    let health_port = settings.health_port;
    let health_handle = tokio::spawn(async move {
        if let Err(e) = health::serve(health_port).await {
            error!("Health server failed on port {}: {}", health_port, e);
        }
    });

    info!("Watching sells of {} (dev_mode={})", watched_address, settings.dev_mode);

    if let Err(e) = wait_for_shutdown_signal().await {
        eprintln!("Failed to listen for shutdown signal: {}", e);
    }

    // Dropping the source's sender lets the dispatcher drain and stop
    source_handle.abort();
    health_handle.abort();
    match tokio::time::timeout(Duration::from_secs(15), dispatcher_handle).await {
        Ok(Ok(stats)) => {
            println!(
                "Handled {} events: {} sold, {} no action, {} ignored, {} failed",
                stats.received, stats.sold, stats.no_action, stats.ignored, stats.failed
            );
            Ok(())
        }
        Ok(Err(e)) => Err(format!("Dispatcher task failed: {}", e)),
        Err(_) => Err("Graceful shutdown timed out".to_string()),
    }
}

/// Wait for an OS shutdown signal (SIGINT/Ctrl+C or SIGTERM) and return once received.
async fn wait_for_shutdown_signal() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    #[cfg(unix)]
    {
        let mut sigint_stream = signal(SignalKind::interrupt())?;
        let mut sigterm_stream = signal(SignalKind::terminate())?;

        tokio::select! {
            _ = sigint_stream.recv() => {
                info!("SIGINT/Ctrl+C signal received");
            }
            _ = sigterm_stream.recv() => {
                info!("SIGTERM signal received");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        info!("Ctrl+C signal received");
    }
    Ok(())
}

fn handle_config_command(command: &ConfigCommands, cli: &Cli) -> Result<(), String> {
    match command {
        ConfigCommands::Show { sensitive } => {
            let settings = load_config(&cli.config)?;
            let toml = settings.to_toml_string(*sensitive).map_err(|e| e.to_string())?;
            print!("{}", toml);
            Ok(())
        }
        ConfigCommands::Validate => {
            let settings = load_config(&cli.config)?;
            settings.validate().map_err(|e| e.to_string())?;
            println!("{}", "Configuration validation passed".green());
            Ok(())
        }
    }
}

fn handle_completion_generation(shell: clap_complete::Shell, output: Option<PathBuf>) -> Result<(), String> {
    let mut cmd = Cli::command();

    let mut buf = Vec::new();
    generate(shell, &mut cmd, "fta", &mut buf);

    match output {
        Some(output_path) => {
            std::fs::write(&output_path, buf).map_err(|e| e.to_string())?;
            println!("Completions written to: {}", output_path.display());
        }
        None => {
            print!("{}", String::from_utf8_lossy(&buf));
        }
    }

    Ok(())
}

fn load_config(path: &Path) -> Result<Settings, String> {
    if !path.exists() {
        return Err(format!(
            "Configuration file not found: {} (copy config.example.toml to get started)",
            path.display()
        ));
    }
    Settings::from_file(&path.to_string_lossy()).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sell_amount_plain_and_json() {
        assert_eq!(sell_amount_output("12", "1", "4", OutputFormat::Plain).unwrap(), "10");

        let json: serde_json::Value =
            serde_json::from_str(&sell_amount_output("5", "4", "8", OutputFormat::Json).unwrap()).unwrap();
        assert_eq!(json["sell_amount"], 4);
        assert_eq!(json["local"], 5);
    }

    #[test]
    fn sell_amount_rejects_bad_quantities() {
        let err = sell_amount_output("-1", "0", "1", OutputFormat::Plain).unwrap_err();
        assert!(err.to_string().starts_with("Invalid input:"));
        assert!(sell_amount_output("1.5", "0", "1", OutputFormat::Plain).is_err());
    }

    #[test]
    fn lists_holdings_as_text_and_json() {
        let holdings = vec![
            KeyHolding {
                address: "0x01".to_string(),
                twitter_username: Some("bob".to_string()),
                twitter_name: None,
                balance: 2,
                last_online: 0,
            },
            KeyHolding {
                address: "0x02".to_string(),
                twitter_username: None,
                twitter_name: None,
                balance: 1,
                last_online: 0,
            },
        ];

        assert_eq!(
            holdings_output(&holdings, OutputFormat::Plain).unwrap(),
            "0x01 @bob\t2 keys\n0x02\t1 key"
        );
        let json: serde_json::Value =
            serde_json::from_str(&holdings_output(&holdings, OutputFormat::Json).unwrap()).unwrap();
        assert_eq!(json[0]["balance"], 2);
    }

    #[test]
    fn owner_address_prefers_watched_address() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "node_ws_url = \"wss://example.org/ws\"\nwatched_address = \"0x0000000000000000000000000000000000000001\"\n",
        )
        .unwrap();
        let mut settings = load_config(&path).unwrap();
        assert_eq!(
            owner_address(&settings, None).unwrap(),
            "0x0000000000000000000000000000000000000001"
        );

        settings.watched_address = None;
        assert!(owner_address(&settings, None).is_err());
    }

    #[test]
    fn missing_config_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(&dir.path().join("nope.toml")).unwrap_err();
        assert!(err.contains("Configuration file not found"));
    }

    #[test]
    fn loads_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "node_ws_url = \"wss://example.org/ws\"\nwatched_address = \"0x0000000000000000000000000000000000000001\"\n",
        )
        .unwrap();

        let settings = load_config(&path).unwrap();
        assert_eq!(settings.node_ws_url, "wss://example.org/ws");
        assert!(settings.validate().is_ok());
    }
}
