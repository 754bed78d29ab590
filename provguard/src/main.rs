//! provguard: validate project configuration and inspect provenance sidecars.
//!
//! Usage:
//!   provguard validate --template config.template.toml --config config.toml
//!   provguard init --template config.template.toml --config config.toml
//!   provguard show data/processed/glm/sub-01/beta.json

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use provguard::config::{self, Configuration};
use provguard::errors::{GuardError, MissingConfigError};
use provguard::layout::Layout;
use provguard::observability::{init_logging, LoggingOptions};
use provguard::provenance::{read_sidecar, sidecar_path};

#[derive(Parser)]
#[command(
    name = "provguard",
    about = "Configuration and provenance guard for analysis projects",
    version = env!("CARGO_PKG_VERSION")
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Console log level (RUST_LOG takes precedence)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a configuration against its template and print the resolved options
    Validate {
        /// Template the configuration was copied from
        #[arg(short, long, default_value = "config.template.toml")]
        template: PathBuf,

        /// Local configuration file
        #[arg(short, long, default_value = "config.toml")]
        config: PathBuf,

        /// Print the options as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Create the local configuration from its template if it does not exist
    Init {
        /// Template to copy
        #[arg(short, long, default_value = "config.template.toml")]
        template: PathBuf,

        /// Local configuration file to create
        #[arg(short, long, default_value = "config.toml")]
        config: PathBuf,
    },
    /// Print the provenance sidecar of an output (or the sidecar itself)
    Show {
        /// Sidecar or output path
        path: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _logging = init_logging(&LoggingOptions::new("provguard").with_level(&cli.log_level))
        .map_err(explain)?;

    match cli.command {
        Commands::Validate {
            template,
            config,
            json,
        } => validate(&template, &config, json),
        Commands::Init { template, config } => init(&template, &config),
        Commands::Show { path } => show(&path),
    }
}

fn explain(error: GuardError) -> anyhow::Error {
    anyhow::anyhow!(error.info().render())
}

fn validate(template: &Path, config_path: &Path, json: bool) -> anyhow::Result<()> {
    let config = config::load(template, config_path).map_err(explain)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&config.to_json())?);
        return Ok(());
    }

    print_options(&config);
    let layout = Layout::from_config(&config);
    println!();
    println!("data root:  {}", layout.root().display());
    if !layout.raw_dir().is_dir() {
        println!("warning:    {} does not exist yet", layout.raw_dir().display());
    }
    Ok(())
}

fn print_options(config: &Configuration) {
    println!("{} is valid ({} options)", config.source().display(), config.len());
    for key in config.keys() {
        if let Some(value) = config.get(key) {
            println!("  {key} = {value}");
        }
    }
}

fn init(template: &Path, config_path: &Path) -> anyhow::Result<()> {
    if config_path.exists() {
        println!("{} already exists; leaving it unchanged", config_path.display());
        return Ok(());
    }
    if !template.is_file() {
        return Err(explain(MissingConfigError::template(template).into()));
    }

    fs::copy(template, config_path).with_context(|| {
        format!("copying {} to {}", template.display(), config_path.display())
    })?;
    info!(template = %template.display(), config = %config_path.display(), "Configuration created");
    println!(
        "Created {}. Replace every <placeholder> value before running.",
        config_path.display()
    );
    Ok(())
}

fn show(path: &Path) -> anyhow::Result<()> {
    let record = read_sidecar(path)
        .or_else(|_| read_sidecar(&sidecar_path(path)))
        .map_err(explain)?;
    println!("{}", record.to_json_pretty()?);
    Ok(())
}
