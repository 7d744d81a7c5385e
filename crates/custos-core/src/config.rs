//! Configuration for the Custos engine.
//!
//! Configuration lives in a TOML file. Every section and key is optional;
//! anything left out takes its default. The file is resolved in this order:
//! an explicit path, then `$CUSTOS_CONFIG`, then
//! `<config dir>/custos/config.toml`.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use std::path::PathBuf;

/// Behaviour shared by loadable project configurations.
pub trait ConfigManager: Serialize + DeserializeOwned + Default {
    /// Short project name, used for the config directory and env prefix.
    fn project_name() -> &'static str;

    /// Resolves the config file path (explicit path, env var, then default).
    fn resolve_config_path(explicit: Option<&str>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(PathBuf::from(path));
        }
        let env_var = format!("{}_CONFIG", Self::project_name().to_uppercase());
        if let Ok(path) = std::env::var(env_var) {
            if !path.is_empty() {
                return Some(PathBuf::from(path));
            }
        }
        Self::default_config_path()
    }

    /// Platform default location of the config file.
    fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(Self::project_name()).join("config.toml"))
    }

    /// Loads the configuration, falling back to defaults if the file is missing.
    fn load(explicit: Option<&str>) -> Result<Self> {
        let Some(path) = Self::resolve_config_path(explicit) else {
            log::debug!("no config directory on this platform, using defaults");
            return Ok(Self::default());
        };
        if !path.exists() {
            log::debug!("config file {} not found, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path).map_err(|e| Error::io_with_path(e, &path))?;
        toml::from_str(&content)
            .map_err(|e| Error::config(format!("Failed to parse {}: {e}", path.display())))
    }

    /// Renders the configuration as pretty TOML.
    fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Flattens the configuration into `PROJECT_SECTION_KEY=value` pairs.
    fn to_env_vars(&self) -> Result<Vec<(String, String)>> {
        let value = toml::Value::try_from(self)?;
        let mut vars = Vec::new();
        flatten_env(&Self::project_name().to_uppercase(), &value, &mut vars);
        Ok(vars)
    }
}

fn flatten_env(prefix: &str, value: &toml::Value, out: &mut Vec<(String, String)>) {
    match value {
        toml::Value::Table(table) => {
            for (key, v) in table {
                flatten_env(&format!("{prefix}_{}", key.to_uppercase()), v, out);
            }
        }
        toml::Value::String(s) => out.push((prefix.to_string(), s.clone())),
        other => out.push((prefix.to_string(), other.to_string())),
    }
}

// ============================================================================
// Sections
// ============================================================================

/// Top-level Custos configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustosConfig {
    /// Permission evaluation settings.
    #[serde(default)]
    pub granting: GrantingConfig,

    /// Audit logging settings.
    #[serde(default)]
    pub audit: AuditConfig,

    /// ACL cache settings.
    #[serde(default)]
    pub cache: CacheConfig,
}

impl ConfigManager for CustosConfig {
    fn project_name() -> &'static str {
        "custos"
    }
}

/// Settings for the permission-granting strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrantingConfig {
    /// Consult the parent ACL when local entries exist but none match.
    ///
    /// When `false` only an ACL with no entries at all defers to its parent.
    #[serde(default)]
    pub inherit_when_unmatched: bool,

    /// Maximum number of parent hops followed during evaluation.
    #[serde(default = "default_max_inheritance_depth")]
    pub max_inheritance_depth: usize,
}

fn default_max_inheritance_depth() -> usize {
    64
}

impl Default for GrantingConfig {
    fn default() -> Self {
        Self {
            inherit_when_unmatched: false,
            max_inheritance_depth: default_max_inheritance_depth(),
        }
    }
}

/// Settings for the audit logger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Emit audit records at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Log target audit records are written under.
    #[serde(default = "default_audit_target")]
    pub target: String,
}

fn default_true() -> bool {
    true
}

fn default_audit_target() -> String {
    "custos::audit".to_string()
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            target: default_audit_target(),
        }
    }
}

/// Settings for the ACL cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Attach a cache to providers.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Prefix for every cache key.
    #[serde(default = "default_cache_prefix")]
    pub prefix: String,
}

fn default_cache_prefix() -> String {
    "custos_acl_".to_string()
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            prefix: default_cache_prefix(),
        }
    }
}
