//! Error types for custos-acl

use crate::provider::AclMap;
use crate::change::PropertyName;
use custos_core::ObjectIdentity;
use thiserror::Error;

/// Result type alias for custos-acl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in custos-acl
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Error from custos-core
    #[error("Core error: {0}")]
    Core(#[from] custos_core::Error),

    /// Malformed argument to an ACL operation
    #[error("Invalid input: {message}")]
    InvalidInput {
        /// What went wrong
        message: String,
    },

    /// Index-based mutation addressed a position that does not exist
    #[error("Index {index} is out of range (bucket holds {len} entries)")]
    OutOfRange {
        /// Requested index
        index: usize,
        /// Current bucket length
        len: usize,
    },

    /// No entry in the ACL or its ancestors applies to the request
    #[error("No applicable ACE was found")]
    NoApplicableEntry,

    /// The object identity has no ACL
    #[error("There is no ACL for the given object identity: {0}")]
    AclNotFound(ObjectIdentity),

    /// A batch lookup found only some of the requested ACLs
    #[error("ACLs were found for {} of {} object identities", found.len(), found.len() + missing.len())]
    NotAllAclsFound {
        /// ACLs that were found
        found: AclMap,
        /// Identities without an ACL
        missing: Vec<ObjectIdentity>,
    },

    /// An ACL already exists for the object identity
    #[error("An ACL for {0} already exists")]
    AlreadyExists(ObjectIdentity),

    /// A commit found stored state different from the expected old value
    #[error("The \"{property}\" property has been modified concurrently")]
    ConcurrentModification {
        /// Name of the conflicting property
        property: PropertyName,
    },

    /// The target is not managed by this tracker or provider
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// What went wrong
        message: String,
    },

    /// The engine reached a state it cannot proceed from
    #[error("Invalid state: {message}")]
    InvalidState {
        /// What went wrong
        message: String,
    },

    /// Snapshot encoding/decoding error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Creates an invalid input error.
    pub fn invalid_input<S: Into<String>>(message: S) -> Self {
        Error::InvalidInput {
            message: message.into(),
        }
    }

    /// Creates an invalid argument error.
    pub fn invalid_argument<S: Into<String>>(message: S) -> Self {
        Error::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates an invalid state error.
    pub fn invalid_state<S: Into<String>>(message: S) -> Self {
        Error::InvalidState {
            message: message.into(),
        }
    }

    /// Creates a concurrent modification error for a property.
    pub fn concurrent(property: impl Into<PropertyName>) -> Self {
        Error::ConcurrentModification {
            property: property.into(),
        }
    }

    /// Returns whether this is a denial by absence of any applicable entry.
    pub fn is_denial(&self) -> bool {
        matches!(self, Error::NoApplicableEntry)
    }

    /// Returns whether this is an optimistic concurrency conflict.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::ConcurrentModification { .. })
    }
}
