//! CLI configuration management.
//!
//! ```text
//! Cli
//! └── command: Command
//!     ├── run: RunArgs
//!     │   ├── demo: Demo           # Bundled workflow to execute
//!     │   ├── engine: EngineArgs   # Engine kind, parallelism, limits
//!     │   └── format: OutputFormat # How result datasets are printed
//!     └── derive: DeriveArgs       # Schema derivation preview
//! ```
//!
//! Engine options can be provided via CLI arguments or `TABULA_*`
//! environment variables.
//!
//! # Example
//!
//! ```bash
//! tabula run countries --engine distributed --parallelism 4
//! TABULA_ENGINE=distributed TABULA_FORMAT=json tabula run temperatures
//! tabula derive "id:str,price:float" "*,-price,+total:float"
//! ```

mod engine;

use std::process;

use clap::{Args, Parser, Subcommand, ValueEnum};
pub use engine::{EngineArgs, EngineKind};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

use crate::TRACING_TARGET_STARTUP;
use crate::demo::Demo;

/// Complete CLI configuration.
#[derive(Debug, Clone, Parser, Serialize, Deserialize)]
#[command(name = "tabula")]
#[command(about = "Runs declarative workflows over tabular datasets")]
#[command(version)]
pub struct Cli {
    /// Action to perform.
    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands.
#[derive(Debug, Clone, Subcommand, Serialize, Deserialize)]
pub enum Command {
    /// Executes one of the bundled demo workflows.
    Run(RunArgs),
    /// Prints the schema produced by applying a derivation to a schema.
    Derive(DeriveArgs),
}

/// Arguments of `tabula run`.
#[derive(Debug, Clone, Args, Serialize, Deserialize)]
pub struct RunArgs {
    /// Workflow to execute.
    #[arg(value_enum)]
    pub demo: Demo,

    /// Engine selection and limits.
    #[clap(flatten)]
    pub engine: EngineArgs,

    /// Output format of the result datasets.
    #[arg(long, env = "TABULA_FORMAT", value_enum, default_value_t = OutputFormat::Pretty)]
    pub format: OutputFormat,
}

/// Arguments of `tabula derive`.
#[derive(Debug, Clone, Args, Serialize, Deserialize)]
pub struct DeriveArgs {
    /// Base schema, for example `id:str,price:float`.
    pub schema: String,

    /// Derivation applied to the base schema, for example `*,-price`.
    #[arg(allow_hyphen_values = true)]
    pub derivation: String,
}

/// How result datasets are printed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[derive(AsRefStr, Display, ValueEnum)]
#[derive(Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One JSON document with every dataset.
    Json,
    /// Aligned text tables.
    #[default]
    Pretty,
}

impl Cli {
    /// Loads environment variables from .env file (if enabled) and parses CLI arguments.
    pub fn init() -> Self {
        Self::load_dotenv();
        Self::parse()
    }

    /// Loads environment variables from .env file if the dotenv feature is enabled.
    #[cfg(feature = "dotenv")]
    fn load_dotenv() {
        if let Err(err) = dotenvy::dotenv()
            && !err.not_found()
        {
            eprintln!("Warning: failed to load .env file: {err}");
        }
    }

    /// No-op when dotenv feature is disabled.
    #[cfg(not(feature = "dotenv"))]
    fn load_dotenv() {}

    /// Logs build information at debug level.
    pub fn log_build_info() {
        tracing::debug!(
            target: TRACING_TARGET_STARTUP,
            version = env!("CARGO_PKG_VERSION"),
            pid = process::id(),
            arch = std::env::consts::ARCH,
            os = std::env::consts::OS,
            features = ?Self::enabled_features(),
            "Build information"
        );
    }

    /// Returns a list of enabled compile-time features.
    fn enabled_features() -> Vec<&'static str> {
        [cfg!(feature = "dotenv").then_some("dotenv")]
            .into_iter()
            .flatten()
            .collect()
    }
}
