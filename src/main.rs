//! Nagapi CLI - HTTP API for Nagios
//!
//! Serve Nagios service status over HTTP and relay passive check results to
//! the Nagios external command pipe.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use nagapi::api::{AppState, build_cors_layer, start_api_server};
use nagapi::command::{CommandWriter, FileSink};
use nagapi::config::Config;
use nagapi::statusdata::{DEFAULT_STATUS_FILE, Repository, RepositoryOptions};
use nagapi::xdata::DecoderOptions;

/// How long background tasks get to finish after shutdown
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Nagapi - HTTP API for Nagios status and passive check results
#[derive(Debug, Parser)]
#[command(name = "nagapi")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve {
        /// Path to configuration file; defaults apply when omitted
        #[arg(short, long, env = "NAGAPI_CONFIG")]
        config: Option<PathBuf>,

        /// Listen address, overrides api.addr
        #[arg(long, env = "NAGAPI_API_ADDR")]
        addr: Option<SocketAddr>,

        /// Path to status.dat, overrides nagios.status_file
        #[arg(long, env = "NAGAPI_STATUS_FILE")]
        status_file: Option<PathBuf>,

        /// Path to the external command file, overrides nagios.external_commands_file
        #[arg(long, env = "NAGAPI_EXTERNAL_COMMANDS_FILE")]
        external_commands_file: Option<PathBuf>,
    },

    /// Generate a default configuration file
    Init {
        /// Output file path
        #[arg(short, long, default_value = "nagapi.yaml")]
        output: String,
    },

    /// Validate a configuration file
    Validate {
        /// Path to configuration file
        #[arg(short, long, default_value = "nagapi.yaml")]
        config: String,
    },

    /// Print the status of one service from a status file
    Lookup {
        /// Path to status.dat
        #[arg(short, long, default_value = DEFAULT_STATUS_FILE)]
        status_file: PathBuf,

        /// Keep decoding when a value has the wrong type
        #[arg(long)]
        ignore_invalid_types: bool,

        /// Keep decoding when a line is malformed
        #[arg(long)]
        ignore_invalid_lines: bool,

        /// Host name
        host: String,

        /// Service description
        service: String,
    },
}

fn setup_logging(verbose: bool, json: bool) {
    let env_filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose, cli.json);

    match cli.command {
        Commands::Serve {
            config,
            addr,
            status_file,
            external_commands_file,
        } => {
            let mut config = match config {
                Some(path) => Config::from_file(&path)
                    .with_context(|| format!("Failed to load config from {}", path.display()))?,
                None => Config::default_config(),
            };
            if let Some(addr) = addr {
                config.api.addr = addr;
            }
            if let Some(path) = status_file {
                config.nagios.status_file = path;
            }
            if let Some(path) = external_commands_file {
                config.nagios.external_commands_file = path;
            }
            serve(config).await
        }

        Commands::Init { output } => init_config(&output),

        Commands::Validate {
            config: config_path,
        } => validate_config(&config_path),

        Commands::Lookup {
            status_file,
            ignore_invalid_types,
            ignore_invalid_lines,
            host,
            service,
        } => {
            let options = RepositoryOptions {
                decoder: DecoderOptions {
                    ignore_invalid_types,
                    ignore_invalid_lines,
                },
            };
            lookup(&status_file, options, &host, &service)
        }
    }
}

/// Run the API with the status refresh and command delivery tasks
async fn serve(config: Config) -> Result<()> {
    config.validate().context("Invalid configuration")?;
    let cors = build_cors_layer(&config.api.cors).context("Invalid CORS configuration")?;

    let repository = Repository::open(&config.nagios.status_file, config.repository_options())
        .context("Failed to load Nagios status")?;
    let repository = Arc::new(repository);

    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    let (writer, delivery) = CommandWriter::new(
        config.writer_config(),
        FileSink::new(&config.nagios.external_commands_file),
    );
    let delivery_handle = tokio::spawn(delivery.run(shutdown_tx.subscribe()));

    let refresh_handle = if config.nagios.reload_status_file {
        Some(repository.spawn_refresh(config.nagios.reload_interval, shutdown_tx.subscribe()))
    } else {
        tracing::info!("Status file reloading disabled");
        None
    };

    let signal_tx = shutdown_tx.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            return;
        }
        tracing::info!("Shutdown requested");
        let _ = signal_tx.send(());
    });

    let state = AppState::new(Arc::clone(&repository), writer);
    let mut server_shutdown = shutdown_tx.subscribe();
    let result = start_api_server(config.api.addr, state.clone(), cors, async move {
        let _ = server_shutdown.recv().await;
    })
    .await;

    // Stop the background tasks as well when the server exits on its own
    let _ = shutdown_tx.send(());

    let background = futures::future::join(delivery_handle, async move {
        if let Some(handle) = refresh_handle {
            let _ = handle.await;
        }
    });
    if tokio::time::timeout(SHUTDOWN_GRACE, background).await.is_err() {
        tracing::warn!("Background tasks did not stop in time");
    }

    let pending = state.writer().stats().queued;
    if pending > 0 {
        tracing::warn!(pending, "Exiting with undelivered commands");
    }

    result.map_err(|e| anyhow::anyhow!(e)).context("API server error")
}

/// Generate a default configuration file
fn init_config(output: &str) -> Result<()> {
    let config = Config::default_config();
    let yaml = config.to_yaml().context("Failed to serialize config")?;

    std::fs::write(output, &yaml).with_context(|| format!("Failed to write config to {output}"))?;

    tracing::info!(path = %output, "Configuration file created");
    println!("Created {output}");
    println!();
    println!("Edit the file to point at your Nagios installation, then run:");
    println!("  nagapi serve --config {output}");

    Ok(())
}

/// Validate a configuration file
fn validate_config(config_path: &str) -> Result<()> {
    tracing::info!(config = %config_path, "Validating configuration");

    let config = Config::from_file(config_path)
        .with_context(|| format!("Failed to load config from {config_path}"))?;
    config.validate().context("Invalid configuration")?;
    build_cors_layer(&config.api.cors).context("Invalid CORS configuration")?;

    let nagios = &config.nagios;
    println!("Configuration is valid!");
    println!();
    println!("API address: {}", config.api.addr);
    println!(
        "CORS: {}",
        if config.api.cors.enabled {
            "enabled"
        } else {
            "disabled"
        }
    );
    println!("Status file: {}", nagios.status_file.display());
    if nagios.reload_status_file {
        println!(
            "  reloaded every {}",
            humantime_serde::re::humantime::format_duration(nagios.reload_interval)
        );
    } else {
        println!("  loaded once");
    }
    println!(
        "External command file: {}",
        nagios.external_commands_file.display()
    );
    println!(
        "  queue capacity {} ({})",
        nagios.queue_capacity,
        if nagios.non_blocking {
            "non-blocking"
        } else {
            "blocking"
        }
    );

    Ok(())
}

/// Print one service's status as JSON
fn lookup(status_file: &Path, options: RepositoryOptions, host: &str, service: &str) -> Result<()> {
    let repository = Repository::open(status_file, options).context("Failed to load Nagios status")?;

    let status = repository
        .lookup(host, service)
        .with_context(|| format!("No status for {host}/{service}"))?;

    let json = serde_json::to_string_pretty(&*status).context("Failed to serialize status")?;
    println!("{json}");

    Ok(())
}
