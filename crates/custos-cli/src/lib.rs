//! # custos-cli
//!
//! Command-line front end for the Custos ACL engine.
//!
//! - `custos check` loads ACLs from a TOML fixture and evaluates one
//!   permission check against them
//! - `custos config` inspects and creates the configuration file

#![warn(missing_docs)]
#![warn(clippy::all)]
#![forbid(unsafe_code)]

pub mod check;
pub mod cli;
pub mod config_handlers;
pub mod error;
pub mod fixture;

pub use error::{Error, Result};
