//! Retrieval of security and object identities.
//!
//! These strategies sit between an application's authentication layer and
//! the ACL engine: one turns an authenticated principal into the ordered
//! list of [`SecurityIdentity`] values to check, the other turns a domain
//! object into its [`ObjectIdentity`].

use custos_core::{DomainObject, ObjectIdentity, RoleIdentity, SecurityIdentity, UserIdentity};
use std::collections::{HashMap, HashSet, VecDeque};

/// Role granted to fully authenticated principals.
pub const IS_AUTHENTICATED_FULLY: &str = "IS_AUTHENTICATED_FULLY";
/// Role granted to principals authenticated by a remember-me token or better.
pub const IS_AUTHENTICATED_REMEMBERED: &str = "IS_AUTHENTICATED_REMEMBERED";
/// Role granted to every principal, including anonymous ones.
pub const IS_AUTHENTICATED_ANONYMOUSLY: &str = "IS_AUTHENTICATED_ANONYMOUSLY";
/// Role granted to every principal, including anonymous ones.
pub const PUBLIC_ACCESS: &str = "PUBLIC_ACCESS";

/// How strongly the current principal is authenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrustLevel {
    /// No authenticated user.
    Anonymous,
    /// Authenticated through a remember-me token.
    Remembered,
    /// Authenticated in this session.
    Full,
}

/// The principal an authorization check is made for.
#[derive(Debug, Clone)]
pub struct AuthenticationContext {
    /// The authenticated user, if any.
    pub user: Option<UserIdentity>,
    /// Roles assigned directly to the principal.
    pub roles: Vec<String>,
    /// Authentication strength.
    pub trust: TrustLevel,
}

impl AuthenticationContext {
    /// An anonymous principal with no roles.
    pub fn anonymous() -> Self {
        Self {
            user: None,
            roles: Vec::new(),
            trust: TrustLevel::Anonymous,
        }
    }

    /// A fully authenticated user with the given roles.
    pub fn user(user: UserIdentity, roles: Vec<String>) -> Self {
        Self {
            user: Some(user),
            roles,
            trust: TrustLevel::Full,
        }
    }
}

// ============================================================================
// Role hierarchy
// ============================================================================

/// Expands directly assigned roles into every role they imply.
pub trait RoleHierarchy: Send + Sync {
    /// Reachable roles, starting with `roles` themselves.
    fn reachable_roles(&self, roles: &[String]) -> Vec<String>;
}

/// Role hierarchy backed by a map of role to implied roles.
#[derive(Debug, Clone, Default)]
pub struct MapRoleHierarchy {
    implied: HashMap<String, Vec<String>>,
}

impl MapRoleHierarchy {
    /// Creates an empty hierarchy where every role reaches only itself.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares that `role` implies each of `implied`.
    pub fn with_role<I, S>(mut self, role: impl Into<String>, implied: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.implied
            .entry(role.into())
            .or_default()
            .extend(implied.into_iter().map(Into::into));
        self
    }
}

impl RoleHierarchy for MapRoleHierarchy {
    fn reachable_roles(&self, roles: &[String]) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        let mut queue: VecDeque<&str> = roles.iter().map(String::as_str).collect();
        while let Some(role) = queue.pop_front() {
            if !seen.insert(role) {
                continue;
            }
            out.push(role.to_string());
            if let Some(implied) = self.implied.get(role) {
                queue.extend(implied.iter().map(String::as_str));
            }
        }
        out
    }
}

// ============================================================================
// Security identities
// ============================================================================

/// Produces the security identities an ACL check is made with.
pub trait SecurityIdentityRetrieval: Send + Sync {
    /// Identities in priority order: user, roles, then implicit status roles.
    fn security_identities(&self, context: &AuthenticationContext) -> Vec<SecurityIdentity>;
}

/// Standard retrieval: user identity, reachable roles, authentication roles.
#[derive(Debug, Clone, Default)]
pub struct DefaultSecurityIdentityRetrieval<H> {
    hierarchy: H,
}

impl<H: RoleHierarchy> DefaultSecurityIdentityRetrieval<H> {
    /// Creates the strategy over a role hierarchy.
    pub fn new(hierarchy: H) -> Self {
        Self { hierarchy }
    }
}

impl<H: RoleHierarchy> SecurityIdentityRetrieval for DefaultSecurityIdentityRetrieval<H> {
    fn security_identities(&self, context: &AuthenticationContext) -> Vec<SecurityIdentity> {
        let mut sids = Vec::new();

        if context.trust != TrustLevel::Anonymous {
            if let Some(user) = &context.user {
                sids.push(SecurityIdentity::User(user.clone()));
            }
        }

        let implicit: &[&str] = match context.trust {
            TrustLevel::Full => &[
                IS_AUTHENTICATED_FULLY,
                IS_AUTHENTICATED_REMEMBERED,
                IS_AUTHENTICATED_ANONYMOUSLY,
                PUBLIC_ACCESS,
            ],
            TrustLevel::Remembered => &[
                IS_AUTHENTICATED_REMEMBERED,
                IS_AUTHENTICATED_ANONYMOUSLY,
                PUBLIC_ACCESS,
            ],
            TrustLevel::Anonymous => &[IS_AUTHENTICATED_ANONYMOUSLY, PUBLIC_ACCESS],
        };

        let roles = self
            .hierarchy
            .reachable_roles(&context.roles)
            .into_iter()
            .chain(implicit.iter().map(|r| r.to_string()));
        for role in roles {
            match RoleIdentity::new(role) {
                Ok(role) => {
                    let sid = SecurityIdentity::Role(role);
                    if !sids.contains(&sid) {
                        sids.push(sid);
                    }
                }
                Err(e) => log::warn!("skipping role: {e}"),
            }
        }
        sids
    }
}

// ============================================================================
// Object identities
// ============================================================================

/// Produces the object identity of a domain object.
pub trait ObjectIdentityRetrieval: Send + Sync {
    /// The identity, or `None` when the object cannot be identified.
    fn object_identity(&self, object: &dyn DomainObject) -> Option<ObjectIdentity>;
}

/// Retrieval through [`DomainObject`] itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct DomainObjectIdentityRetrieval;

impl ObjectIdentityRetrieval for DomainObjectIdentityRetrieval {
    fn object_identity(&self, object: &dyn DomainObject) -> Option<ObjectIdentity> {
        match ObjectIdentity::from_domain_object(object) {
            Ok(oid) => Some(oid),
            Err(e) => {
                log::debug!("domain object has no identity: {e}");
                None
            }
        }
    }
}
