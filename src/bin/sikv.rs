//! SiKV Server Binary
//!
//! # Examples
//!
//! ```bash
//! # Start server on the default port (8007)
//! sikv serve
//!
//! # Typed table with pooled payloads
//! sikv serve --port 9000 --value-type int64 --pool
//!
//! # Print the effective configuration
//! sikv --config sikv.toml config
//! ```

use clap::{Args, Parser, Subcommand};
use parking_lot::Mutex;
use sikv::config::Config;
use sikv::logging::setup_logging;
use sikv::network::{shutdown_on_ctrl_c, ProtocolServer, ShutdownReason};
use sikv::storage::{HashMap, ValueType};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};

/// SiKV - in-memory key/value server
#[derive(Parser, Debug)]
#[command(name = "sikv")]
#[command(version = sikv::VERSION)]
#[command(about = "SiKV - in-memory key/value server", long_about = None)]
struct Cli {
    /// Subcommand to execute (defaults to `serve`)
    #[command(subcommand)]
    command: Option<Commands>,

    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Directory for rolling log files
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the SiKV server
    Serve(ServeArgs),

    /// Print the effective configuration as TOML
    Config,
}

/// Server overrides, applied on top of the configuration file
#[derive(Args, Debug, Default)]
struct ServeArgs {
    /// Bind address
    #[arg(short, long)]
    bind: Option<IpAddr>,

    /// TCP port
    #[arg(short, long)]
    port: Option<u16>,

    /// Initial table capacity (power of two)
    #[arg(long)]
    capacity: Option<usize>,

    /// Value type (int16, int32, int64, float, double, string)
    #[arg(long)]
    value_type: Option<ValueType>,

    /// Carve payloads from the arena pool
    #[arg(long)]
    pool: bool,
}

impl Cli {
    /// Resolve file and environment configuration, apply flags, then
    /// validate the result once
    fn resolve_config(&self) -> anyhow::Result<Config> {
        let mut config = Config::load_layers(self.config.as_deref())?;

        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
        if let Some(dir) = &self.log_dir {
            config.logging.directory = Some(dir.clone());
        }
        if self.no_color {
            config.logging.ansi = false;
        }

        if let Some(Commands::Serve(args)) = &self.command {
            args.apply(&mut config);
        }

        config.validate()?;
        Ok(config)
    }
}

impl ServeArgs {
    fn apply(&self, config: &mut Config) {
        let bind = self.bind.unwrap_or(config.server.bind.ip());
        let port = self.port.unwrap_or(config.server.bind.port());
        config.server.bind = SocketAddr::new(bind, port);

        if let Some(capacity) = self.capacity {
            config.table.initial_capacity = capacity;
        }
        if let Some(value_type) = self.value_type {
            config.table.value_type = value_type;
        }
        if self.pool {
            config.table.pool.enabled = true;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let config = cli.resolve_config()?;

    match cli.command {
        None | Some(Commands::Serve(_)) => {
            // Keep the guard alive so file output is flushed on exit
            let _guard = setup_logging(&config.logging)?;
            serve_command(config).await
        }
        Some(Commands::Config) => {
            print!("{}", config.to_toml()?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Serve command - run until Ctrl-C or a fatal engine error
async fn serve_command(config: Config) -> anyhow::Result<ExitCode> {
    info!(version = %sikv::VERSION, "SiKV starting");

    let table = HashMap::from_config(&config.table)?;
    info!(
        capacity = table.capacity(),
        value_type = %table.value_type(),
        pooled = table.is_pooled(),
        "Hash table initialized"
    );
    let table = Arc::new(Mutex::new(table));

    let server = ProtocolServer::new(config.server.clone(), table.clone());
    tokio::spawn(shutdown_on_ctrl_c(server.shutdown_handle()));

    let result = server.serve().await;

    // Release every payload before leaving, whatever stopped the server
    {
        let mut table = table.lock();
        let stats = table.stats();
        info!(
            live = table.live(),
            hits = stats.hits,
            misses = stats.misses,
            resizes = stats.resizes,
            "Destroying hash table"
        );
        table.destroy();
    }

    match result {
        Ok(reason) => {
            match reason {
                ShutdownReason::Requested => info!("SiKV stopped"),
                ShutdownReason::Fatal => error!("Fatal engine error, exiting"),
            }
            Ok(ExitCode::from(reason.exit_status()))
        }
        Err(e) => {
            error!("Server error: {:#}", e);
            Err(e)
        }
    }
}
