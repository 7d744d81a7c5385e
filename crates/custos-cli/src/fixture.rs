//! TOML fixtures describing ACLs to load into a provider.
//!
//! ```toml
//! [[acl]]
//! type = "Post"
//! id = "1"
//! parent = { type = "Blog", id = "1" }
//!
//! [[acl.ace]]
//! scope = "object"
//! sid = "user:alice:App\\User"
//! permissions = ["VIEW", "EDIT"]
//! ```
//!
//! Every ACL is created before any parent is linked, so parents may appear
//! after their children. Entries are appended to their bucket in file order.

use crate::error::{Error, Result};
use custos_acl::{
    Acl, AclProvider, GrantingStrategy, Mask, MaskBuilder, MemoryAclProvider, MutableAclProvider,
};
use custos_core::{ObjectIdentity, SecurityIdentity};
use serde::Deserialize;
use std::path::Path;

/// A parsed fixture file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Fixture {
    /// ACL definitions.
    #[serde(default, rename = "acl")]
    pub acls: Vec<AclFixture>,
}

/// One `[[acl]]` table.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AclFixture {
    /// Object type.
    #[serde(rename = "type")]
    pub object_type: String,
    /// Object identifier.
    pub id: String,
    /// Parent object, which must be defined in the same fixture.
    pub parent: Option<ObjectRef>,
    /// Overrides the default of `true`.
    pub entries_inheriting: Option<bool>,
    /// Entries in bucket order.
    #[serde(default, rename = "ace")]
    pub aces: Vec<AceFixture>,
}

/// Inline `{ type, id }` reference.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ObjectRef {
    /// Object type.
    #[serde(rename = "type")]
    pub object_type: String,
    /// Object identifier.
    pub id: String,
}

/// Entry scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// Shared by every object of the type.
    Class,
    /// This object only.
    Object,
}

/// One `[[acl.ace]]` table.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AceFixture {
    /// Bucket scope.
    pub scope: Scope,
    /// Field, for field-scoped entries.
    pub field: Option<String>,
    /// `role:<name>` or `user:<username>:<type>`.
    pub sid: String,
    /// Raw mask; exclusive with `permissions`.
    pub mask: Option<Mask>,
    /// Mask names such as `VIEW`; exclusive with `mask`.
    #[serde(default)]
    pub permissions: Vec<String>,
    /// Grant (default) or deny.
    #[serde(default = "default_granting")]
    pub granting: bool,
    /// Defaults to `all` for grants and `any` for denials.
    pub strategy: Option<GrantingStrategy>,
    /// Audit when this entry grants.
    #[serde(default)]
    pub audit_success: bool,
    /// Audit when this entry denies.
    #[serde(default)]
    pub audit_failure: bool,
}

fn default_granting() -> bool {
    true
}

impl ObjectRef {
    fn identity(&self) -> Result<ObjectIdentity> {
        Ok(ObjectIdentity::new(self.id.clone(), self.object_type.clone())?)
    }
}

impl AclFixture {
    /// Object identity of this ACL.
    pub fn identity(&self) -> Result<ObjectIdentity> {
        Ok(ObjectIdentity::new(self.id.clone(), self.object_type.clone())?)
    }
}

impl AceFixture {
    /// Resolved entry mask.
    pub fn resolve_mask(&self) -> Result<Mask> {
        match (self.mask, self.permissions.is_empty()) {
            (Some(mask), true) => Ok(mask),
            (None, false) => {
                let mut builder = MaskBuilder::new();
                for name in &self.permissions {
                    builder.add_named(name)?;
                }
                Ok(builder.get())
            }
            (Some(_), false) => Err(Error::fixture(format!(
                "entry for {} sets both mask and permissions",
                self.sid
            ))),
            (None, true) => Err(Error::fixture(format!(
                "entry for {} needs a mask or permissions",
                self.sid
            ))),
        }
    }

    /// Appends this entry to its bucket in `acl`.
    fn append_to(&self, acl: &mut Acl) -> Result<()> {
        let sid: SecurityIdentity = self.sid.parse()?;
        let mask = self.resolve_mask()?;
        let (granting, strategy) = (self.granting, self.strategy);

        match (self.scope, self.field.as_deref()) {
            (Scope::Class, None) => {
                let index = acl.class_aces().len();
                acl.insert_class_ace(sid, mask, index, granting, strategy)?;
                acl.update_class_auditing(index, self.audit_success, self.audit_failure)?;
            }
            (Scope::Object, None) => {
                let index = acl.object_aces().len();
                acl.insert_object_ace(sid, mask, index, granting, strategy)?;
                acl.update_object_auditing(index, self.audit_success, self.audit_failure)?;
            }
            (Scope::Class, Some(field)) => {
                let index = acl.class_field_aces(field).len();
                acl.insert_class_field_ace(field, sid, mask, index, granting, strategy)?;
                acl.update_class_field_auditing(
                    index,
                    field,
                    self.audit_success,
                    self.audit_failure,
                )?;
            }
            (Scope::Object, Some(field)) => {
                let index = acl.object_field_aces(field).len();
                acl.insert_object_field_ace(field, sid, mask, index, granting, strategy)?;
                acl.update_object_field_auditing(
                    index,
                    field,
                    self.audit_success,
                    self.audit_failure,
                )?;
            }
        }
        Ok(())
    }
}

impl Fixture {
    /// Parses fixture TOML.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| Error::fixture(e.to_string()))
    }

    /// Reads and parses a fixture file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| custos_core::Error::io_with_path(e, path))?;
        Self::from_toml_str(&content).map_err(|e| e.in_file(path))
    }

    /// Creates and commits every ACL of the fixture.
    pub fn install(&self, provider: &MemoryAclProvider) -> Result<()> {
        for acl in &self.acls {
            provider.create_acl(&acl.identity()?)?;
        }

        for def in &self.acls {
            let oid = def.identity()?;
            let acl = provider.find_acl(&oid, &[])?;
            let parent = match &def.parent {
                Some(parent) => {
                    let parent_oid = parent.identity()?;
                    match provider.find_acl(&parent_oid, &[]) {
                        Ok(found) => Some(found),
                        Err(custos_acl::Error::AclNotFound(_)) => {
                            return Err(Error::fixture(format!(
                                "parent {parent_oid} of {oid} is not defined"
                            )));
                        }
                        Err(e) => return Err(e.into()),
                    }
                }
                None => None,
            };

            {
                let mut acl = acl.write();
                if parent.is_some() {
                    acl.set_parent_acl(parent)?;
                }
                if let Some(inheriting) = def.entries_inheriting {
                    acl.set_entries_inheriting(inheriting)?;
                }
                for ace in &def.aces {
                    ace.append_to(&mut acl)?;
                }
            }
            provider.update_acl(&acl)?;
            log::debug!("installed fixture ACL {oid} with {} entries", def.aces.len());
        }
        Ok(())
    }
}
