//! Persisted data shares
//!
//! A [`Share`] grants a permission level on a data type (or one item of it)
//! to everybody, to a group or to a single user. Shares are turned into
//! [`Claim`]s and merged with the caller's token claims before a repository
//! call.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::authorization::{Claim, PermissionLevel};
use crate::identifiers::{ItemId, ShareId};
use crate::ports::{DomainPort, HealthCheckable, PortError};

/// Who a share is granted to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "name")]
pub enum ShareTarget {
    All,
    Group(String),
    User(String),
}

impl ShareTarget {
    /// Whether a user with the given groups receives this share
    pub fn includes(&self, user: &str, groups: &[String]) -> bool {
        match self {
            ShareTarget::All => true,
            ShareTarget::Group(group) => groups.iter().any(|g| g == group),
            ShareTarget::User(name) => name == user,
        }
    }
}

impl fmt::Display for ShareTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShareTarget::All => f.write_str("all"),
            ShareTarget::Group(name) => write!(f, "group:{}", name),
            ShareTarget::User(name) => write!(f, "user:{}", name),
        }
    }
}

/// A persisted grant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Share {
    pub id: ShareId,
    pub target: ShareTarget,
    pub data_type: String,
    pub level: PermissionLevel,
    /// `None` shares every instance of the type
    pub item: Option<ItemId>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl Share {
    pub fn new(
        target: ShareTarget,
        data_type: impl Into<String>,
        level: PermissionLevel,
        item: Option<ItemId>,
        created_by: impl Into<String>,
    ) -> Self {
        Self {
            id: ShareId::new_v7(),
            target,
            data_type: data_type.into(),
            level,
            item,
            created_by: created_by.into(),
            created_at: Utc::now(),
        }
    }

    /// Shares with the same target, type and item replace each other
    pub fn same_grant(&self, other: &Share) -> bool {
        self.target == other.target && self.data_type == other.data_type && self.item == other.item
    }

    pub fn to_claim(&self) -> Claim {
        match self.item {
            Some(id) => Claim::for_item(self.data_type.clone(), id, self.level),
            None => Claim::for_type(self.data_type.clone(), self.level),
        }
    }
}

/// Storage for shares
#[async_trait]
pub trait SharePort: DomainPort + HealthCheckable {
    /// Stores a share, replacing any share for the same grant
    async fn upsert(&self, share: Share) -> Result<Share, PortError>;

    /// Removes the share for a grant; returns whether one existed
    async fn remove(
        &self,
        target: &ShareTarget,
        data_type: &str,
        item: Option<ItemId>,
    ) -> Result<bool, PortError>;

    /// Shares on a data type, restricted to one item's grants when `item` is set
    async fn list_for_type(
        &self,
        data_type: &str,
        item: Option<ItemId>,
    ) -> Result<Vec<Share>, PortError>;

    /// Shares that apply to a user or any of their groups
    async fn list_for_principal(&self, user: &str, groups: &[String]) -> Result<Vec<Share>, PortError>;

    /// The claims a user receives through shares
    async fn claims_for(&self, user: &str, groups: &[String]) -> Result<Vec<Claim>, PortError> {
        Ok(self
            .list_for_principal(user, groups)
            .await?
            .iter()
            .map(Share::to_claim)
            .collect())
    }
}
