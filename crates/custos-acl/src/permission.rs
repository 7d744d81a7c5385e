//! Standard permission bits and the permission-to-mask map.
//!
//! [`MaskBuilder`] composes masks from the eight standard capability bits.
//! A [`PermissionMap`] turns a named permission such as `"VIEW"` into the
//! list of masks any of which satisfies it: holding `EDIT` implies `VIEW`,
//! holding `OWNER` implies everything.

use crate::error::{Error, Result};
use crate::mask::Mask;
use std::collections::HashMap;

const PATTERN_LEN: usize = 32;
const OFF: char = '.';
const ON: char = '*';

/// Builder for permission masks.
///
/// # Examples
///
/// ```
/// use custos_acl::MaskBuilder;
///
/// let mut builder = MaskBuilder::new();
/// builder.add(MaskBuilder::VIEW).add(MaskBuilder::EDIT);
/// assert_eq!(builder.get(), 5);
/// assert!(builder.pattern().ends_with(".....E.V"));
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MaskBuilder {
    mask: Mask,
}

impl MaskBuilder {
    /// Read access.
    pub const VIEW: Mask = 1;
    /// Create access.
    pub const CREATE: Mask = 2;
    /// Write access.
    pub const EDIT: Mask = 4;
    /// Delete access.
    pub const DELETE: Mask = 8;
    /// Restore access.
    pub const UNDELETE: Mask = 16;
    /// All of the above.
    pub const OPERATOR: Mask = 32;
    /// Operator plus granting operator rights to others.
    pub const MASTER: Mask = 64;
    /// Master plus granting master rights to others.
    pub const OWNER: Mask = 128;
    /// Every bit up to bit 29.
    pub const IDDQD: Mask = (1 << 30) - 1;

    const NAMED: [(&'static str, Mask, char); 9] = [
        ("VIEW", Self::VIEW, 'V'),
        ("CREATE", Self::CREATE, 'C'),
        ("EDIT", Self::EDIT, 'E'),
        ("DELETE", Self::DELETE, 'D'),
        ("UNDELETE", Self::UNDELETE, 'U'),
        ("OPERATOR", Self::OPERATOR, 'O'),
        ("MASTER", Self::MASTER, 'M'),
        ("OWNER", Self::OWNER, 'N'),
        ("IDDQD", Self::IDDQD, ON),
    ];

    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder starting from `mask`.
    pub fn with_mask(mask: Mask) -> Self {
        Self { mask }
    }

    /// Sets the given bits.
    pub fn add(&mut self, mask: Mask) -> &mut Self {
        self.mask |= mask;
        self
    }

    /// Sets the bits of a named mask.
    pub fn add_named(&mut self, name: &str) -> Result<&mut Self> {
        let mask = Self::resolve_mask(name)?;
        Ok(self.add(mask))
    }

    /// Clears the given bits.
    pub fn remove(&mut self, mask: Mask) -> &mut Self {
        self.mask &= !mask;
        self
    }

    /// Clears the bits of a named mask.
    pub fn remove_named(&mut self, name: &str) -> Result<&mut Self> {
        let mask = Self::resolve_mask(name)?;
        Ok(self.remove(mask))
    }

    /// Replaces the mask.
    pub fn set(&mut self, mask: Mask) -> &mut Self {
        self.mask = mask;
        self
    }

    /// Clears every bit.
    pub fn reset(&mut self) -> &mut Self {
        self.mask = 0;
        self
    }

    /// Current mask.
    pub fn get(&self) -> Mask {
        self.mask
    }

    /// Human-readable pattern, most significant bit first.
    ///
    /// Unset bits show as `.`, named bits by their letter and any other
    /// set bit as `*`.
    pub fn pattern(&self) -> String {
        (0..PATTERN_LEN)
            .rev()
            .map(|bit| {
                let flag: Mask = 1 << bit;
                if self.mask & flag == 0 {
                    OFF
                } else {
                    Self::code(flag).unwrap_or(ON)
                }
            })
            .collect()
    }

    /// Letter code of a single named bit.
    pub fn code(mask: Mask) -> Result<char> {
        Self::NAMED
            .iter()
            .find(|(_, m, code)| *m == mask && *code != ON)
            .map(|(_, _, code)| *code)
            .ok_or_else(|| Error::invalid_input(format!("no code for mask {mask}")))
    }

    /// Resolves a mask name (case-insensitive) such as `"view"`.
    pub fn resolve_mask(name: &str) -> Result<Mask> {
        let upper = name.to_ascii_uppercase();
        Self::NAMED
            .iter()
            .find(|(n, _, _)| *n == upper)
            .map(|(_, m, _)| *m)
            .ok_or_else(|| Error::invalid_input(format!("the mask \"{name}\" is not supported")))
    }
}

// ============================================================================
// Permission maps
// ============================================================================

/// Maps permission names to the masks that satisfy them.
pub trait PermissionMap: Send + Sync {
    /// Masks any of which grants `permission`, or `None` if unknown.
    fn masks(&self, permission: &str) -> Option<&[Mask]>;

    /// Whether the map knows `permission`.
    fn contains(&self, permission: &str) -> bool {
        self.masks(permission).is_some()
    }
}

/// Permission names understood by [`BasicPermissionMap`].
pub mod permissions {
    /// View the object.
    pub const VIEW: &str = "VIEW";
    /// Edit the object.
    pub const EDIT: &str = "EDIT";
    /// Create objects.
    pub const CREATE: &str = "CREATE";
    /// Delete the object.
    pub const DELETE: &str = "DELETE";
    /// Restore the object.
    pub const UNDELETE: &str = "UNDELETE";
    /// Perform any action.
    pub const OPERATOR: &str = "OPERATOR";
    /// Operator plus delegation of operator rights.
    pub const MASTER: &str = "MASTER";
    /// Full ownership.
    pub const OWNER: &str = "OWNER";
}

/// The standard hierarchical map: higher capabilities imply lower ones.
#[derive(Debug, Clone)]
pub struct BasicPermissionMap {
    map: HashMap<&'static str, Vec<Mask>>,
}

impl BasicPermissionMap {
    /// Creates the standard map.
    pub fn new() -> Self {
        use MaskBuilder as M;
        use permissions::*;

        let tail = [M::OPERATOR, M::MASTER, M::OWNER];
        let with_tail = |first: Mask| {
            let mut masks = vec![first];
            masks.extend_from_slice(&tail);
            masks
        };

        let map = HashMap::from([
            (VIEW, vec![M::VIEW, M::EDIT, M::OPERATOR, M::MASTER, M::OWNER]),
            (EDIT, with_tail(M::EDIT)),
            (CREATE, with_tail(M::CREATE)),
            (DELETE, with_tail(M::DELETE)),
            (UNDELETE, with_tail(M::UNDELETE)),
            (OPERATOR, vec![M::OPERATOR, M::MASTER, M::OWNER]),
            (MASTER, vec![M::MASTER, M::OWNER]),
            (OWNER, vec![M::OWNER]),
        ]);
        Self { map }
    }
}

impl Default for BasicPermissionMap {
    fn default() -> Self {
        Self::new()
    }
}

impl PermissionMap for BasicPermissionMap {
    fn masks(&self, permission: &str) -> Option<&[Mask]> {
        self.map.get(permission).map(Vec::as_slice)
    }
}
