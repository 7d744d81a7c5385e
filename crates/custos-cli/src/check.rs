//! `custos check`: one permission decision against a fixture.

use crate::cli::CheckArgs;
use crate::error::{Error, Result};
use crate::fixture::Fixture;
use custos_acl::{
    AclProvider, BasicPermissionMap, DefaultPermissionGrantingStrategy, LogAuditLogger, Mask,
    MemoryAclCache, MemoryAclProvider, MemoryAclStore, PermissionGrantingStrategy, PermissionMap,
};
use custos_core::{CustosConfig, ObjectIdentity, SecurityIdentity};
use std::fmt;
use std::sync::Arc;

/// Result of a check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A granting entry matched.
    Granted,
    /// A denying entry matched.
    Denied,
    /// Nothing in the ACL or its ancestors applied.
    NoApplicableEntry,
}

impl Outcome {
    /// Whether access is allowed.
    pub fn is_granted(self) -> bool {
        self == Self::Granted
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Granted => "granted",
            Self::Denied => "denied",
            Self::NoApplicableEntry => "no applicable entry",
        })
    }
}

/// A fully resolved check.
#[derive(Debug, Clone)]
pub struct CheckRequest {
    /// Object being accessed.
    pub object: ObjectIdentity,
    /// Identities of the caller.
    pub sids: Vec<SecurityIdentity>,
    /// Any of these masks suffices.
    pub masks: Vec<Mask>,
    /// Field to check, if any.
    pub field: Option<String>,
    /// Skip auditing.
    pub administrative: bool,
}

impl CheckRequest {
    /// Resolves command-line arguments; permission names go through `map`.
    pub fn from_args(args: &CheckArgs, map: &dyn PermissionMap) -> Result<Self> {
        let object = ObjectIdentity::new(args.object_id.clone(), args.object_type.clone())?;
        let sids = args
            .sids
            .iter()
            .map(|s| s.parse::<SecurityIdentity>())
            .collect::<custos_core::Result<Vec<_>>>()?;

        let masks = match (&args.permission, args.mask) {
            (Some(name), None) => {
                let upper = name.to_ascii_uppercase();
                map.masks(&upper)
                    .ok_or_else(|| Error::Request(format!("unknown permission \"{name}\"")))?
                    .to_vec()
            }
            (None, Some(mask)) => vec![mask],
            _ => {
                return Err(Error::Request(
                    "give exactly one of --permission or --mask".into(),
                ));
            }
        };

        Ok(Self {
            object,
            sids,
            masks,
            field: args.field.clone(),
            administrative: args.admin,
        })
    }
}

/// Builds a provider over an empty store, configured from `config`.
pub fn build_provider(config: &CustosConfig) -> Result<MemoryAclProvider> {
    let mut strategy = DefaultPermissionGrantingStrategy::with_config(config.granting.clone());
    if config.audit.enabled {
        strategy = strategy.with_audit_logger(Arc::new(LogAuditLogger::from_config(&config.audit)));
    }
    let strategy: Arc<dyn PermissionGrantingStrategy> = Arc::new(strategy);

    let provider = MemoryAclProvider::new(MemoryAclStore::new(), strategy.clone());
    if config.cache.enabled {
        let cache = MemoryAclCache::from_config(&config.cache, strategy)?;
        return Ok(provider.with_cache(Arc::new(cache)));
    }
    Ok(provider)
}

/// Decides `request` against the ACLs of `provider`.
pub fn evaluate(provider: &dyn AclProvider, request: &CheckRequest) -> Result<Outcome> {
    let acl = provider.find_acl(&request.object, &request.sids)?;
    let acl = acl.read();
    let decision = match &request.field {
        Some(field) => acl.is_field_granted(
            field,
            &request.masks,
            &request.sids,
            request.administrative,
        ),
        None => acl.is_granted(&request.masks, &request.sids, request.administrative),
    };
    match decision {
        Ok(true) => Ok(Outcome::Granted),
        Ok(false) => Ok(Outcome::Denied),
        Err(custos_acl::Error::NoApplicableEntry) => Ok(Outcome::NoApplicableEntry),
        Err(e) => Err(e.into()),
    }
}

/// Runs `custos check`.
pub fn run_check(args: &CheckArgs, config: &CustosConfig) -> Result<Outcome> {
    let provider = build_provider(config)?;
    Fixture::load(&args.fixture)?.install(&provider)?;
    let request = CheckRequest::from_args(args, &BasicPermissionMap::new())?;
    let outcome = evaluate(&provider, &request)?;
    log::debug!("{} on {}: {outcome}", request.masks.len(), request.object);
    Ok(outcome)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const FIXTURE: &str = r#"
[[acl]]
type = "Blog"
id = "1"

[[acl.ace]]
scope = "object"
sid = "role:ROLE_EDITOR"
permissions = ["EDIT"]

[[acl]]
type = "Post"
id = "7"
parent = { type = "Blog", id = "1" }

[[acl.ace]]
scope = "object"
field = "title"
sid = "role:ROLE_EDITOR"
permissions = ["EDIT"]
granting = false
"#;

    fn args(fixture: PathBuf) -> CheckArgs {
        CheckArgs {
            fixture,
            object_type: "Post".into(),
            object_id: "7".into(),
            sids: vec!["role:ROLE_EDITOR".into()],
            permission: Some("edit".into()),
            mask: None,
            field: None,
            admin: false,
        }
    }

    fn write_fixture(dir: &tempfile::TempDir) -> PathBuf {
        let path = dir.path().join("acls.toml");
        std::fs::write(&path, FIXTURE).unwrap();
        path
    }

    #[test]
    fn test_outcome_display() {
        assert_eq!(Outcome::Granted.to_string(), "granted");
        assert_eq!(Outcome::NoApplicableEntry.to_string(), "no applicable entry");
        assert!(!Outcome::Denied.is_granted());
    }

    #[test]
    fn test_inherited_grant() {
        let dir = tempfile::TempDir::new().unwrap();
        let outcome = run_check(&args(write_fixture(&dir)), &CustosConfig::default()).unwrap();
        assert_eq!(outcome, Outcome::Granted);
    }

    #[test]
    fn test_field_denial() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut args = args(write_fixture(&dir));
        args.field = Some("title".into());
        let outcome = run_check(&args, &CustosConfig::default()).unwrap();
        assert_eq!(outcome, Outcome::Denied);
    }

    #[test]
    fn test_no_applicable_entry() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut args = args(write_fixture(&dir));
        args.sids = vec!["user:bob:App\\User".into()];
        let outcome = run_check(&args, &CustosConfig::default()).unwrap();
        assert_eq!(outcome, Outcome::NoApplicableEntry);
    }

    #[test]
    fn test_request_from_args() {
        let mut args = args(PathBuf::from("unused.toml"));
        let request = CheckRequest::from_args(&args, &BasicPermissionMap::new()).unwrap();
        assert_eq!(request.masks.first(), Some(&custos_acl::MaskBuilder::EDIT));

        args.permission = Some("FLY".into());
        assert!(matches!(
            CheckRequest::from_args(&args, &BasicPermissionMap::new()),
            Err(Error::Request(_))
        ));

        args.permission = None;
        args.mask = Some(3);
        let request = CheckRequest::from_args(&args, &BasicPermissionMap::new()).unwrap();
        assert_eq!(request.masks, vec![3]);
    }

    #[test]
    fn test_build_provider_without_cache() {
        let mut config = CustosConfig::default();
        config.cache.enabled = false;
        config.audit.enabled = false;
        assert!(build_provider(&config).is_ok());
    }
}
