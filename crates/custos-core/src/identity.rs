//! Object and security identities.
//!
//! An [`ObjectIdentity`] names a protected domain object by value (type tag +
//! identifier) so an ACL never holds a reference to the object itself. A
//! [`SecurityIdentity`] names a principal, either a role or a concrete user,
//! and is what access control entries are matched against.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

fn require(field: &str, value: String) -> Result<String> {
    if value.is_empty() {
        return Err(Error::invalid_field(field, format!("{field} must not be empty")));
    }
    Ok(value)
}

// ============================================================================
// Domain objects
// ============================================================================

/// A domain object that can describe its own object identity.
///
/// Implemented by application types that are protected by ACLs.
pub trait DomainObject {
    /// Identifier of this instance, unique within its type.
    fn object_identifier(&self) -> String;

    /// Type tag shared by all instances of this kind of object.
    fn object_type(&self) -> String;
}

// ============================================================================
// ObjectIdentity
// ============================================================================

/// Value identity of a protected object.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawObjectIdentity")]
pub struct ObjectIdentity {
    identifier: String,
    #[serde(rename = "type")]
    object_type: String,
}

#[derive(Deserialize)]
struct RawObjectIdentity {
    identifier: String,
    #[serde(rename = "type")]
    object_type: String,
}

impl TryFrom<RawObjectIdentity> for ObjectIdentity {
    type Error = Error;

    fn try_from(raw: RawObjectIdentity) -> Result<Self> {
        Self::new(raw.identifier, raw.object_type)
    }
}

impl ObjectIdentity {
    /// Creates an object identity.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if either part is empty.
    ///
    /// # Examples
    ///
    /// ```
    /// use custos_core::ObjectIdentity;
    ///
    /// let oid = ObjectIdentity::new("42", "Invoice").unwrap();
    /// assert_eq!(oid.to_string(), "ObjectIdentity(42, Invoice)");
    /// ```
    pub fn new(identifier: impl Into<String>, object_type: impl Into<String>) -> Result<Self> {
        Ok(Self {
            identifier: require("identifier", identifier.into())?,
            object_type: require("type", object_type.into())?,
        })
    }

    /// Builds the identity of a domain object.
    pub fn from_domain_object<D: DomainObject + ?Sized>(object: &D) -> Result<Self> {
        Self::new(object.object_identifier(), object.object_type())
    }

    /// Identifier part.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Type tag part.
    pub fn object_type(&self) -> &str {
        &self.object_type
    }
}

impl fmt::Display for ObjectIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectIdentity({}, {})", self.identifier, self.object_type)
    }
}

// ============================================================================
// Security identities
// ============================================================================

/// A role-based security identity such as `ROLE_ADMIN`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawRoleIdentity")]
pub struct RoleIdentity {
    role: String,
}

#[derive(Deserialize)]
struct RawRoleIdentity {
    role: String,
}

impl TryFrom<RawRoleIdentity> for RoleIdentity {
    type Error = Error;

    fn try_from(raw: RawRoleIdentity) -> Result<Self> {
        Self::new(raw.role)
    }
}

impl RoleIdentity {
    /// Creates a role identity; the name must not be empty.
    pub fn new(role: impl Into<String>) -> Result<Self> {
        Ok(Self {
            role: require("role", role.into())?,
        })
    }

    /// Role name.
    pub fn role(&self) -> &str {
        &self.role
    }
}

/// A user-based security identity: a username qualified by the user type.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawUserIdentity")]
pub struct UserIdentity {
    username: String,
    #[serde(rename = "type")]
    user_type: String,
}

#[derive(Deserialize)]
struct RawUserIdentity {
    username: String,
    #[serde(rename = "type")]
    user_type: String,
}

impl TryFrom<RawUserIdentity> for UserIdentity {
    type Error = Error;

    fn try_from(raw: RawUserIdentity) -> Result<Self> {
        Self::new(raw.username, raw.user_type)
    }
}

impl UserIdentity {
    /// Creates a user identity; both parts must be non-empty.
    pub fn new(username: impl Into<String>, user_type: impl Into<String>) -> Result<Self> {
        Ok(Self {
            username: require("username", username.into())?,
            user_type: require("type", user_type.into())?,
        })
    }

    /// Username.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Type of the user account (e.g. the user class name).
    pub fn user_type(&self) -> &str {
        &self.user_type
    }
}

/// Identity of a principal that access control entries are matched against.
///
/// Equality is by variant and value: a role never equals a user even if the
/// strings coincide.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SecurityIdentity {
    /// A role.
    Role(RoleIdentity),
    /// A concrete user.
    User(UserIdentity),
}

impl SecurityIdentity {
    /// Shorthand for a role identity.
    pub fn role(role: impl Into<String>) -> Result<Self> {
        Ok(Self::Role(RoleIdentity::new(role)?))
    }

    /// Shorthand for a user identity.
    pub fn user(username: impl Into<String>, user_type: impl Into<String>) -> Result<Self> {
        Ok(Self::User(UserIdentity::new(username, user_type)?))
    }

    /// Returns the user identity if this is a user.
    pub fn as_user(&self) -> Option<&UserIdentity> {
        match self {
            Self::User(user) => Some(user),
            Self::Role(_) => None,
        }
    }
}

impl From<RoleIdentity> for SecurityIdentity {
    fn from(role: RoleIdentity) -> Self {
        Self::Role(role)
    }
}

impl From<UserIdentity> for SecurityIdentity {
    fn from(user: UserIdentity) -> Self {
        Self::User(user)
    }
}

impl fmt::Display for SecurityIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Role(r) => write!(f, "RoleSecurityIdentity({})", r.role),
            Self::User(u) => write!(f, "UserSecurityIdentity({}, {})", u.username, u.user_type),
        }
    }
}

/// Parses `role:<name>` or `user:<username>:<type>`.
impl std::str::FromStr for SecurityIdentity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.splitn(3, ':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some("role"), Some(role), None) => Self::role(role),
            (Some("user"), Some(username), Some(user_type)) => Self::user(username, user_type),
            _ => Err(Error::invalid_field(
                "sid",
                format!("expected 'role:<name>' or 'user:<username>:<type>', got '{s}'"),
            )),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    struct Invoice {
        id: u32,
    }

    impl DomainObject for Invoice {
        fn object_identifier(&self) -> String {
            self.id.to_string()
        }

        fn object_type(&self) -> String {
            "Invoice".to_string()
        }
    }

    // ------------------------------------------------------------------------
    // ObjectIdentity tests
    // ------------------------------------------------------------------------

    #[test]
    fn test_object_identity_rejects_empty_parts() {
        assert!(matches!(
            ObjectIdentity::new("", "Foo"),
            Err(Error::InvalidInput { .. })
        ));
        assert!(matches!(
            ObjectIdentity::new("1", ""),
            Err(Error::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_object_identity_value_equality() {
        let a = ObjectIdentity::new("1", "Foo").unwrap();
        let b = ObjectIdentity::new("1", "Foo").unwrap();
        let c = ObjectIdentity::new("1", "Bar").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_object_identity_from_domain_object() {
        let oid = ObjectIdentity::from_domain_object(&Invoice { id: 5 }).unwrap();
        assert_eq!(oid.identifier(), "5");
        assert_eq!(oid.object_type(), "Invoice");
    }

    #[test]
    fn test_object_identity_deserialize_validates() {
        let err = serde_json::from_str::<ObjectIdentity>(r#"{"identifier":"","type":"Foo"}"#);
        assert!(err.is_err());
        let ok: ObjectIdentity =
            serde_json::from_str(r#"{"identifier":"1","type":"Foo"}"#).unwrap();
        assert_eq!(ok, ObjectIdentity::new("1", "Foo").unwrap());
    }

    // ------------------------------------------------------------------------
    // SecurityIdentity tests
    // ------------------------------------------------------------------------

    #[test]
    fn test_role_and_user_never_equal() {
        let role = SecurityIdentity::role("alice").unwrap();
        let user = SecurityIdentity::user("alice", "alice").unwrap();
        assert_ne!(role, user);
    }

    #[test]
    fn test_user_identity_equality_includes_type() {
        let a = SecurityIdentity::user("bob", "App\\User").unwrap();
        let b = SecurityIdentity::user("bob", "App\\Admin").unwrap();
        assert_ne!(a, b);
        assert_eq!(a, SecurityIdentity::user("bob", "App\\User").unwrap());
    }

    #[test]
    fn test_security_identity_rejects_empty() {
        assert!(SecurityIdentity::role("").is_err());
        assert!(SecurityIdentity::user("", "T").is_err());
        assert!(SecurityIdentity::user("u", "").is_err());
    }

    #[test]
    fn test_security_identity_display() {
        assert_eq!(
            SecurityIdentity::role("ROLE_USER").unwrap().to_string(),
            "RoleSecurityIdentity(ROLE_USER)"
        );
        assert_eq!(
            SecurityIdentity::user("joe", "Acme").unwrap().to_string(),
            "UserSecurityIdentity(joe, Acme)"
        );
    }

    #[test]
    fn test_security_identity_parse() {
        let role: SecurityIdentity = "role:ROLE_ADMIN".parse().unwrap();
        assert_eq!(role, SecurityIdentity::role("ROLE_ADMIN").unwrap());

        let user: SecurityIdentity = "user:joe:App:User".parse().unwrap();
        assert_eq!(user, SecurityIdentity::user("joe", "App:User").unwrap());

        assert!("group:x".parse::<SecurityIdentity>().is_err());
        assert!("role:".parse::<SecurityIdentity>().is_err());
    }

    #[test]
    fn test_security_identity_serde_tagging() {
        let sid = SecurityIdentity::user("joe", "Acme").unwrap();
        let json = serde_json::to_string(&sid).unwrap();
        assert!(json.contains(r#""kind":"user""#));
        let back: SecurityIdentity = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sid);
    }
}
