//! Audit hooks for permission decisions.

use crate::entry::Entry;
use custos_core::AuditConfig;

/// Receives the entry that decided a permission check.
pub trait AuditLogger: Send + Sync {
    /// Logs the decision if the entry asks for it.
    ///
    /// Grants are logged when the entry audits successes, denials when it
    /// audits failures.
    fn log_if_needed(&self, granted: bool, entry: &Entry) {
        if (granted && entry.is_audit_success()) || (!granted && entry.is_audit_failure()) {
            self.do_log(granted, entry);
        }
    }

    /// Writes the audit record.
    fn do_log(&self, granted: bool, entry: &Entry);
}

/// Audit logger that writes through the `log` facade.
#[derive(Debug, Clone)]
pub struct LogAuditLogger {
    enabled: bool,
    target: String,
}

impl LogAuditLogger {
    /// Creates a logger with the default target.
    pub fn new() -> Self {
        Self::from_config(&AuditConfig::default())
    }

    /// Creates a logger from the `[audit]` config section.
    pub fn from_config(config: &AuditConfig) -> Self {
        Self {
            enabled: config.enabled,
            target: config.target.clone(),
        }
    }

    /// Log target records are written under.
    pub fn target(&self) -> &str {
        &self.target
    }
}

impl Default for LogAuditLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl AuditLogger for LogAuditLogger {
    fn do_log(&self, granted: bool, entry: &Entry) {
        if !self.enabled {
            return;
        }
        let verdict = if granted { "GRANTED" } else { "DENIED" };
        log::info!(
            target: self.target.as_str(),
            "{verdict} by {} (sid={}, mask={}, strategy={}, field={})",
            entry.id().map_or_else(|| entry.key().to_string(), |id| format!("ace {id}")),
            entry.security_identity(),
            entry.mask(),
            entry.strategy(),
            entry.field().unwrap_or("-"),
        );
    }
}
