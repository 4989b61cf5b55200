//! CanvOS - build configuration for Palette Edge provider images
//!
//! Non-interactive entry point. The core library never exits the
//! process; exit codes are decided here.

use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use canvos_core::build_params::{DEFAULT_ARG_FILE, DEFAULT_USER_DATA_FILE};
use canvos_core::catalog::DEFAULT_CANVOS_DIR;
use canvos_core::config::EXAMPLE_CONFIG_FILE;

mod commands;

/// Log levels
#[derive(Debug, Clone, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_filter_directive(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

#[derive(Parser, Debug)]
#[clap(
    name = "canvos",
    about = "Resolve, build and publish CanvOS Edge artifacts",
    version
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,

    /// Set log level
    #[clap(long, default_value = "info", global = true)]
    log_level: LogLevel,

    /// Emit logs as JSON
    #[clap(long, global = true)]
    log_json: bool,

    /// CanvOS working directory
    #[clap(long, default_value = DEFAULT_CANVOS_DIR, global = true)]
    canvos_dir: PathBuf,
}

#[derive(Parser, Debug)]
enum Command {
    /// Download pack templates and build the option index
    Init {
        /// Read Palette credentials from this config file
        #[clap(long)]
        config: Option<PathBuf>,

        /// Fail if any catalog query fails
        #[clap(long)]
        strict: bool,
    },

    /// List the available families and versions
    Options {
        /// Output as JSON
        #[clap(long)]
        json: bool,
    },

    /// Write the build-parameter and installer user-data files
    Generate {
        /// Configuration file (.yaml or .yml)
        #[clap(long)]
        config: PathBuf,

        #[clap(long, default_value = DEFAULT_ARG_FILE)]
        arg_file: PathBuf,

        #[clap(long, default_value = DEFAULT_USER_DATA_FILE)]
        user_data: PathBuf,
    },

    /// Push the built provider images to the registry
    Push {
        /// Configuration file (.yaml or .yml)
        #[clap(long)]
        config: PathBuf,
    },

    /// Assemble the Edge cluster profile and publish it to Palette
    Profile {
        /// Configuration file (.yaml or .yml)
        #[clap(long)]
        config: PathBuf,

        /// Print the payload instead of submitting it
        #[clap(long)]
        dry_run: bool,

        /// Also write the payload to this file
        #[clap(long)]
        output: Option<PathBuf>,
    },

    /// Write an example configuration file
    ExampleConfig {
        #[clap(long, default_value = EXAMPLE_CONFIG_FILE)]
        output: PathBuf,
    },
}

/// Initialize tracing with CLI flags
///
/// Logs always go to stderr so command output on stdout stays clean.
fn initialize_tracing(log_level: &LogLevel, json: bool) {
    let filter = EnvFilter::new(log_level.to_filter_directive());

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    initialize_tracing(&cli.log_level, cli.log_json);

    let canvos_dir = cli.canvos_dir;

    match cli.command {
        Command::Init { config, strict } => {
            commands::execute_init(&canvos_dir, config.as_deref(), strict).await
        }
        Command::Options { json } => commands::execute_options(&canvos_dir, json),
        Command::Generate {
            config,
            arg_file,
            user_data,
        } => commands::execute_generate(&config, &arg_file, &user_data),
        Command::Push { config } => commands::execute_push(&config).await,
        Command::Profile {
            config,
            dry_run,
            output,
        } => commands::execute_profile(&canvos_dir, &config, dry_run, output.as_deref()).await,
        Command::ExampleConfig { output } => commands::execute_example_config(&output),
    }
}
