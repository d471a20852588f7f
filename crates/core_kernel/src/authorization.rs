//! Claims, permission levels and the authorization filter
//!
//! A [`Claim`] grants a [`PermissionLevel`] on a data type, either for every
//! instance or for a single item. Claims come from the caller's token and
//! from shares; the repository only consumes them through an
//! [`AuthorizationFilter`].
//!
//! # String form
//!
//! Claims travel in tokens as `level:DataType` or `level:DataType{id}`:
//!
//! ```rust
//! use core_kernel::authorization::{Claim, PermissionLevel};
//!
//! let claim: Claim = "view:Country".parse().unwrap();
//! assert_eq!(claim.level, PermissionLevel::View);
//! assert_eq!(claim.to_string(), "view:Country");
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::identifiers::ItemId;

/// Data type wildcard: a claim on `*` applies to every type
pub const ANY_DATA_TYPE: &str = "*";

/// Ordered permission levels; each level includes the ones below it
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionLevel {
    None,
    View,
    Edit,
    Add,
    All,
}

impl PermissionLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionLevel::None => "none",
            PermissionLevel::View => "view",
            PermissionLevel::Edit => "edit",
            PermissionLevel::Add => "add",
            PermissionLevel::All => "all",
        }
    }

    /// Whether this level covers `required`
    pub fn allows(&self, required: PermissionLevel) -> bool {
        *self >= required
    }
}

impl fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PermissionLevel {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(PermissionLevel::None),
            "view" => Ok(PermissionLevel::View),
            "edit" => Ok(PermissionLevel::Edit),
            "add" => Ok(PermissionLevel::Add),
            "all" => Ok(PermissionLevel::All),
            other => Err(CoreError::validation(format!("unknown permission level '{}'", other))),
        }
    }
}

/// Which instances of a data type a claim covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "id")]
pub enum ClaimScope {
    AllInstances,
    Instance(ItemId),
}

/// An authorization grant
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claim {
    pub data_type: String,
    pub level: PermissionLevel,
    pub scope: ClaimScope,
}

impl Claim {
    /// A claim on every instance of a data type
    pub fn for_type(data_type: impl Into<String>, level: PermissionLevel) -> Self {
        Self {
            data_type: data_type.into(),
            level,
            scope: ClaimScope::AllInstances,
        }
    }

    /// A claim on one item
    pub fn for_item(data_type: impl Into<String>, id: ItemId, level: PermissionLevel) -> Self {
        Self {
            data_type: data_type.into(),
            level,
            scope: ClaimScope::Instance(id),
        }
    }

    /// A claim on every data type
    pub fn for_all_types(level: PermissionLevel) -> Self {
        Self::for_type(ANY_DATA_TYPE, level)
    }

    pub fn applies_to_type(&self, data_type: &str) -> bool {
        self.data_type == ANY_DATA_TYPE || self.data_type == data_type
    }

    /// Whether this claim covers `id` (or, when `id` is `None`, the whole type)
    pub fn covers(&self, data_type: &str, id: Option<ItemId>) -> bool {
        if !self.applies_to_type(data_type) {
            return false;
        }
        match (self.scope, id) {
            (ClaimScope::AllInstances, _) => true,
            (ClaimScope::Instance(claimed), Some(id)) => claimed == id,
            (ClaimScope::Instance(_), None) => false,
        }
    }
}

impl fmt::Display for Claim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.scope {
            ClaimScope::AllInstances => write!(f, "{}:{}", self.level, self.data_type),
            ClaimScope::Instance(id) => write!(f, "{}:{}{{{}}}", self.level, self.data_type, id),
        }
    }
}

impl FromStr for Claim {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CoreError::validation(format!("malformed claim '{}'", s));

        let (level, target) = s.split_once(':').ok_or_else(invalid)?;
        let level: PermissionLevel = level.parse()?;

        match target.split_once('{') {
            Some((data_type, rest)) => {
                let id = rest.strip_suffix('}').ok_or_else(invalid)?;
                let id: ItemId = id.parse().map_err(|_| invalid())?;
                if data_type.is_empty() {
                    return Err(invalid());
                }
                Ok(Claim::for_item(data_type, id, level))
            }
            None if !target.is_empty() => Ok(Claim::for_type(target, level)),
            None => Err(invalid()),
        }
    }
}

/// Computes the effective permission a set of claims grants
pub trait AuthorizationFilter: Send + Sync {
    /// Effective level on one item, or on the whole type when `id` is `None`
    fn permission(&self, claims: &[Claim], data_type: &str, id: Option<ItemId>) -> PermissionLevel;

    /// Whether the claims grant at least `view` on every instance of the type
    fn has_full_type_claim(&self, claims: &[Claim], data_type: &str) -> bool {
        self.permission(claims, data_type, None).allows(PermissionLevel::View)
    }

    fn is_authorized(
        &self,
        claims: &[Claim],
        data_type: &str,
        id: Option<ItemId>,
        required: PermissionLevel,
    ) -> bool {
        self.permission(claims, data_type, id).allows(required)
    }
}

/// Default filter: the highest level among the claims that cover the target
#[derive(Debug, Clone, Copy, Default)]
pub struct ClaimAuthorizer;

impl AuthorizationFilter for ClaimAuthorizer {
    fn permission(&self, claims: &[Claim], data_type: &str, id: Option<ItemId>) -> PermissionLevel {
        claims
            .iter()
            .filter(|c| c.covers(data_type, id))
            .map(|c| c.level)
            .max()
            .unwrap_or(PermissionLevel::None)
    }
}
