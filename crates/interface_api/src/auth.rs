//! Authentication and the caller's effective claims

use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use core_kernel::{AuthorizationFilter, Claim, ItemId, PermissionLevel};

/// Role names carried in tokens
pub mod roles {
    /// Full access to every data type, may share with everybody
    pub const ADMIN: &str = "admin";
}

/// JWT claims
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject (user name)
    pub sub: String,
    /// User's roles
    #[serde(default)]
    pub roles: Vec<String>,
    /// Groups the user belongs to
    #[serde(default)]
    pub groups: Vec<String>,
    /// Data claims in string form (`view:Country`, `all:City{id}`)
    #[serde(default)]
    pub permissions: Vec<String>,
    /// Expiration timestamp
    pub exp: i64,
    /// Issued at timestamp
    pub iat: i64,
}

impl TokenClaims {
    /// Claims for `user_id` valid for `expiration_secs`
    pub fn new(user_id: impl Into<String>, expiration_secs: u64) -> Self {
        let now = Utc::now();
        let exp = now + Duration::seconds(expiration_secs.min(u64::from(u32::MAX)) as i64);
        Self {
            sub: user_id.into(),
            roles: Vec::new(),
            groups: Vec::new(),
            permissions: Vec::new(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.push(role.into());
        self
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.groups.push(group.into());
        self
    }

    pub fn with_claim(mut self, claim: &Claim) -> Self {
        self.permissions.push(claim.to_string());
        self
    }

    pub fn is_admin(&self) -> bool {
        has_role(self, roles::ADMIN)
    }

    /// Data claims granted by the token itself
    ///
    /// Admins hold `all` on every type. Malformed entries are skipped.
    pub fn data_claims(&self) -> Vec<Claim> {
        let mut claims: Vec<Claim> = self
            .permissions
            .iter()
            .filter_map(|p| match p.parse::<Claim>() {
                Ok(claim) => Some(claim),
                Err(e) => {
                    warn!(user = %self.sub, permission = %p, error = %e, "Ignoring malformed permission");
                    None
                }
            })
            .collect();
        if self.is_admin() {
            claims.push(Claim::for_all_types(PermissionLevel::All));
        }
        claims
    }
}

/// Auth errors
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid token")]
    InvalidToken,
    #[error("Token expired")]
    TokenExpired,
}

/// Signs a token
pub fn create_token(claims: &TokenClaims, secret: &str) -> Result<String, AuthError> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|_| AuthError::InvalidToken)
}

/// Validates a JWT token
///
/// # Arguments
///
/// * `token` - The JWT token to validate
/// * `secret` - JWT secret key
pub fn validate_token(token: &str, secret: &str) -> Result<TokenClaims, AuthError> {
    let token_data = decode::<TokenClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        _ => AuthError::InvalidToken,
    })?;

    Ok(token_data.claims)
}

/// Checks if user has required role
pub fn has_role(claims: &TokenClaims, required_role: &str) -> bool {
    claims
        .roles
        .iter()
        .any(|r| r == required_role || r == roles::ADMIN)
}

/// The authenticated caller of a request
///
/// `claims` holds the token's data claims merged with every share that
/// applies to the user or one of their groups.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub username: String,
    pub groups: Vec<String>,
    pub is_admin: bool,
    pub claims: Vec<Claim>,
}

impl CurrentUser {
    pub fn new(token: &TokenClaims, shared: Vec<Claim>) -> Self {
        let mut claims = token.data_claims();
        claims.extend(shared);
        Self {
            username: token.sub.clone(),
            groups: token.groups.clone(),
            is_admin: token.is_admin(),
            claims,
        }
    }

    pub fn in_group(&self, group: &str) -> bool {
        self.groups.iter().any(|g| g == group)
    }

    /// Effective level on an item, or on the whole type when `id` is `None`
    pub fn permission(
        &self,
        authorizer: &dyn AuthorizationFilter,
        data_type: &str,
        id: Option<ItemId>,
    ) -> PermissionLevel {
        authorizer.permission(&self.claims, data_type, id)
    }

    /// Whether any claim lets the user see some part of a type
    pub fn sees_type(&self, data_type: &str) -> bool {
        self.claims
            .iter()
            .any(|c| c.applies_to_type(data_type) && c.level.allows(PermissionLevel::View))
    }
}
