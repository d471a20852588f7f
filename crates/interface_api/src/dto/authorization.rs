//! Authorization and sharing DTOs

use serde::{Deserialize, Serialize};
use validator::Validate;

use core_kernel::{ItemId, PermissionLevel, Share, ShareTarget};

pub const AUTHORIZED: &str = "authorized";
pub const UNAUTHORIZED: &str = "unauthorized";
/// The caller may share with every user, groups and single users
pub const SHARE_ANY: &str = "any";
/// The caller may share with their own groups and single users
pub const SHARE_GROUP: &str = "group";

/// Query of `Authorize`
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizeQuery {
    #[validate(length(min = 1, max = 100))]
    pub data_type: Option<String>,
    /// Permission level name, `view` when absent
    pub operation: Option<String>,
    pub id: Option<ItemId>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationResponse {
    /// `authorized` or `unauthorized`
    pub authorization: String,
    /// `any`, `group`, or empty when the caller may not share the data
    pub can_share: String,
    pub username: String,
    pub is_admin: bool,
}

/// Query of the share and hide endpoints
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareQuery {
    pub operation: Option<String>,
    pub id: Option<ItemId>,
}

/// Query of `GetCurrentShares`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentSharesQuery {
    pub id: Option<ItemId>,
}

/// Outcome of a share or hide request
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
}

impl ApiResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            error: None,
            response: Some(message.into()),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            response: None,
        }
    }
}

/// One grant as listed by `GetCurrentShares`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareResponse {
    /// `all`, `group` or `user`
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub level: PermissionLevel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<ItemId>,
}

impl From<&Share> for ShareResponse {
    fn from(share: &Share) -> Self {
        let (kind, name) = match &share.target {
            ShareTarget::All => ("all", "All Users".to_string()),
            ShareTarget::Group(name) => ("group", name.clone()),
            ShareTarget::User(name) => ("user", name.clone()),
        };
        Self {
            kind: kind.to_string(),
            name,
            level: share.level,
            id: share.item,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_share_response_shape() {
        let share = Share::new(
            ShareTarget::Group("pilots".into()),
            "Airline",
            PermissionLevel::Edit,
            None,
            "admin",
        );
        let body = serde_json::to_value(ShareResponse::from(&share)).unwrap();
        assert_eq!(body, json!({ "type": "group", "name": "pilots", "level": "edit" }));
    }

    #[test]
    fn test_api_response_omits_empty_parts() {
        let body = serde_json::to_value(ApiResponse::ok("done")).unwrap();
        assert_eq!(body, json!({ "response": "done" }));
    }
}
