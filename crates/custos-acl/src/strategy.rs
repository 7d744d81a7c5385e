//! Permission granting strategies.
//!
//! The default strategy checks object-scope entries before class-scope
//! entries and takes the first entry whose identity and mask match. An ACL
//! with no entries of its own defers to its parent when it inherits.

use crate::acl::Acl;
use crate::audit::AuditLogger;
use crate::change::AclKey;
use crate::entry::Entry;
use crate::error::{Error, Result};
use crate::mask::Mask;
use custos_core::{GrantingConfig, SecurityIdentity};
use std::sync::Arc;

/// Decides permission checks against an ACL.
pub trait PermissionGrantingStrategy: Send + Sync {
    /// Decides whether any of `sids` holds any of `masks` on the ACL's object.
    ///
    /// # Errors
    ///
    /// [`Error::NoApplicableEntry`] if no entry applies anywhere in the chain.
    fn is_granted(
        &self,
        acl: &Acl,
        masks: &[Mask],
        sids: &[SecurityIdentity],
        administrative_mode: bool,
    ) -> Result<bool>;

    /// Decides a check restricted to one field of the object.
    fn is_field_granted(
        &self,
        acl: &Acl,
        field: &str,
        masks: &[Mask],
        sids: &[SecurityIdentity],
        administrative_mode: bool,
    ) -> Result<bool>;
}

/// The standard first-match strategy with optional auditing.
#[derive(Clone, Default)]
pub struct DefaultPermissionGrantingStrategy {
    audit_logger: Option<Arc<dyn AuditLogger>>,
    config: GrantingConfig,
}

impl DefaultPermissionGrantingStrategy {
    /// Creates a strategy with default settings and no audit logger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a strategy from the `[granting]` config section.
    pub fn with_config(config: GrantingConfig) -> Self {
        Self {
            audit_logger: None,
            config,
        }
    }

    /// Attaches an audit logger.
    pub fn with_audit_logger(mut self, logger: Arc<dyn AuditLogger>) -> Self {
        self.audit_logger = Some(logger);
        self
    }

    /// Replaces the audit logger.
    pub fn set_audit_logger(&mut self, logger: Option<Arc<dyn AuditLogger>>) {
        self.audit_logger = logger;
    }

    /// Active settings.
    pub fn config(&self) -> &GrantingConfig {
        &self.config
    }

    fn evaluate(
        &self,
        acl: &Acl,
        field: Option<&str>,
        request: &Request<'_>,
        visited: &mut Vec<AclKey>,
    ) -> Result<bool> {
        if visited.len() > self.config.max_inheritance_depth {
            return Err(Error::invalid_state(format!(
                "parent chain of {} exceeds {} levels",
                acl.object_identity(),
                self.config.max_inheritance_depth
            )));
        }
        visited.push(acl.key());

        let (object_aces, class_aces) = match field {
            None => (acl.object_aces(), acl.class_aces()),
            Some(f) => (acl.object_field_aces(f), acl.class_field_aces(f)),
        };
        for aces in [object_aces, class_aces] {
            if let Some(granted) = self.decide(aces, request) {
                return Ok(granted);
            }
        }

        let has_local = !object_aces.is_empty() || !class_aces.is_empty();
        if acl.is_entries_inheriting()
            && (!has_local || self.config.inherit_when_unmatched)
            && let Some(parent) = acl.parent_acl()
        {
            if visited.contains(&parent.key()) {
                return Err(Error::invalid_state(format!(
                    "cyclic parent chain at {}",
                    acl.object_identity()
                )));
            }
            let parent = parent.read();
            log::trace!(
                "deferring {} to parent {}",
                acl.object_identity(),
                parent.object_identity()
            );
            return self.evaluate(&parent, field, request, visited);
        }

        Err(Error::NoApplicableEntry)
    }

    fn decide(&self, aces: &[Entry], request: &Request<'_>) -> Option<bool> {
        let ace = aces.iter().find(|ace| {
            request.sids.contains(ace.security_identity())
                && request
                    .masks
                    .iter()
                    .any(|required| ace.strategy().matches(ace.mask(), *required))
        })?;

        if !request.administrative_mode
            && let Some(logger) = &self.audit_logger
        {
            logger.log_if_needed(ace.is_granting(), ace);
        }
        log::trace!(
            "{} decided by {} for {}",
            if ace.is_granting() { "granted" } else { "denied" },
            ace.key(),
            ace.security_identity()
        );
        Some(ace.is_granting())
    }
}

struct Request<'a> {
    masks: &'a [Mask],
    sids: &'a [SecurityIdentity],
    administrative_mode: bool,
}

impl PermissionGrantingStrategy for DefaultPermissionGrantingStrategy {
    fn is_granted(
        &self,
        acl: &Acl,
        masks: &[Mask],
        sids: &[SecurityIdentity],
        administrative_mode: bool,
    ) -> Result<bool> {
        let request = Request {
            masks,
            sids,
            administrative_mode,
        };
        self.evaluate(acl, None, &request, &mut Vec::new())
    }

    fn is_field_granted(
        &self,
        acl: &Acl,
        field: &str,
        masks: &[Mask],
        sids: &[SecurityIdentity],
        administrative_mode: bool,
    ) -> Result<bool> {
        let request = Request {
            masks,
            sids,
            administrative_mode,
        };
        self.evaluate(acl, Some(field), &request, &mut Vec::new())
    }
}
