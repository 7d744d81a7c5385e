//! Command-line argument definitions.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Custos - object-level access control
#[derive(Parser, Debug)]
#[command(name = "custos")]
#[command(about = "Evaluate and administer object-level ACLs", long_about = None)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Evaluate one permission check against a fixture
    Check(CheckArgs),

    /// Inspect or create the configuration file
    Config {
        /// Config action
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Arguments of `custos check`.
#[derive(Args, Debug, Clone)]
pub struct CheckArgs {
    /// TOML file with `[[acl]]` tables
    #[arg(long)]
    pub fixture: PathBuf,

    /// Type of the object to check
    #[arg(long)]
    pub object_type: String,

    /// Identifier of the object to check
    #[arg(long)]
    pub object_id: String,

    /// Security identity: `role:<name>` or `user:<username>:<type>` (repeatable)
    #[arg(long = "sid", required = true)]
    pub sids: Vec<String>,

    /// Permission name such as VIEW or EDIT
    #[arg(long, conflicts_with = "mask", required_unless_present = "mask")]
    pub permission: Option<String>,

    /// Raw required mask
    #[arg(long)]
    pub mask: Option<u32>,

    /// Restrict the check to one field
    #[arg(long)]
    pub field: Option<String>,

    /// Evaluate without writing audit records
    #[arg(long)]
    pub admin: bool,
}

/// Config subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Show the resolved config file path
    Path,

    /// Print the value at a dotted key, e.g. `granting.max_inheritance_depth`
    Get {
        /// Dotted key
        key: String,
    },

    /// Set the value at a dotted key in the config file
    Set {
        /// Dotted key
        key: String,
        /// New value; booleans and numbers are detected
        value: String,
    },

    /// Write a default config file
    Init {
        /// Target file instead of the default location
        #[arg(long)]
        file: Option<String>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the configuration as environment variables
    Export {
        /// Format as `--env KEY=VALUE` for docker run
        #[arg(long)]
        docker_env: bool,
    },
}
