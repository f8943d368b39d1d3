//! Sentinel - High-availability failover coordinator
//!
//! Watches a cluster of nodes, detects a failed primary and promotes the
//! best-suited replacement.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use sentinel_core::config::SentinelConfig;
use sentinel_core::types::FailoverMode;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "sentinel")]
#[command(author = "Sentinel Team")]
#[command(version = sentinel_core::VERSION)]
#[command(about = "High-availability failover coordinator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration file path
    #[arg(short, long, global = true, env = "SENTINEL_CONFIG")]
    config: Option<String>,

    /// Admin API bind address
    #[arg(long, env = "SENTINEL_BIND_ADDRESS")]
    bind: Option<String>,

    /// Admin API port
    #[arg(short, long, env = "SENTINEL_PORT")]
    port: Option<u16>,

    /// Failover mode (automatic, manual, scheduled, health_based)
    #[arg(long, env = "SENTINEL_FAILOVER_MODE")]
    mode: Option<FailoverMode>,

    /// Append every failover event as a JSON line to this file
    #[arg(long, env = "SENTINEL_EVENT_LOG")]
    event_log: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "SENTINEL_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format (text, json)
    #[arg(long, global = true, env = "SENTINEL_LOG_FORMAT")]
    log_format: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the coordinator and the admin API
    Run,

    /// Validate the configuration and print the cluster layout
    CheckConfig,

    /// Query a running coordinator
    Status {
        /// Admin API base URL
        #[arg(long, default_value = "http://127.0.0.1:9400")]
        url: String,
    },

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let mut config = if let Some(config_path) = &cli.config {
        SentinelConfig::from_file(config_path)?
    } else {
        SentinelConfig::from_env()
    };
    apply_overrides(&mut config, &cli);

    init_logging(&config.logging.level, &config.logging.format);

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            print_banner();
            commands::run::execute(config).await?;
        }
        Commands::CheckConfig => commands::check::execute(&config)?,
        Commands::Status { url } => commands::status::execute(&url).await?,
        Commands::Version => print_banner(),
    }

    Ok(())
}

/// Command-line flags win over the file and the environment
fn apply_overrides(config: &mut SentinelConfig, cli: &Cli) {
    if let Some(bind) = &cli.bind {
        config.server.bind_address = bind.clone();
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(mode) = cli.mode {
        config.failover.failover_mode = mode;
    }
    if let Some(path) = &cli.event_log {
        config.failover.event_log_path = Some(path.clone());
    }
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
    if let Some(format) = &cli.log_format {
        config.logging.format = format.clone();
    }
}

fn init_logging(level: &str, format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let registry = tracing_subscriber::registry().with(filter);

    if format.eq_ignore_ascii_case("json") {
        registry.with(fmt::layer().json().with_target(true)).init();
    } else {
        registry.with(fmt::layer().with_target(true)).init();
    }
}

fn print_banner() {
    println!(
        r#"
    ____             __  _            __
   / __/__ ___  ___ / /_(_)__  ___ _ / /
  _\ \/ -_) _ \/ _ `/ __/ / _ \/ -_) / /
 /___/\__/_//_/\__/\__/_/_//_/\__/_/_/

   High-Availability Failover Coordinator
   Version: {}
"#,
        sentinel_core::VERSION
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_run() {
        let cli = Cli::try_parse_from(["sentinel"]).unwrap();
        assert!(cli.command.is_none());
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_overrides_apply() {
        let cli = Cli::try_parse_from([
            "sentinel",
            "--port",
            "9600",
            "--mode",
            "health_based",
            "--log-format",
            "json",
            "check-config",
        ])
        .unwrap();
        assert!(matches!(cli.command, Some(Commands::CheckConfig)));

        let mut config = SentinelConfig::default();
        apply_overrides(&mut config, &cli);
        assert_eq!(config.server.port, 9600);
        assert_eq!(config.failover.failover_mode, FailoverMode::HealthBased);
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.server.bind_address, "0.0.0.0");
    }

    #[test]
    fn test_rejects_unknown_mode() {
        assert!(Cli::try_parse_from(["sentinel", "--mode", "whenever"]).is_err());
    }

    #[test]
    fn test_status_url() {
        let cli = Cli::try_parse_from(["sentinel", "status", "--url", "http://db:9400"]).unwrap();
        match cli.command {
            Some(Commands::Status { url }) => assert_eq!(url, "http://db:9400"),
            _ => panic!("expected status command"),
        }
    }
}
