//! # custos-core
//!
//! Shared types for the Custos ACL engine.
//!
//! This crate provides the level-0 building blocks used by every other
//! Custos crate:
//! - Object identities (what is protected)
//! - Security identities (who is asking)
//! - Persisted id newtypes
//! - Configuration loading
//! - The common error type

#![warn(missing_docs)]
#![warn(clippy::all)]
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod identity;
pub mod ids;

mod proptests;

pub use config::{AuditConfig, CacheConfig, ConfigManager, CustosConfig, GrantingConfig};
pub use error::{Error, Result};
pub use identity::{DomainObject, ObjectIdentity, RoleIdentity, SecurityIdentity, UserIdentity};
pub use ids::{AclId, EntryId};
