//! Permission checks and data sharing
//!
//! Sharing or hiding data requires the admin role or `all` permission on the
//! target, and a grant never exceeds the granting user's own level. Sharing
//! with everybody is reserved to admins; sharing with a group requires
//! membership in it. The groups a caller may share with come from the
//! `groups` of their token.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use tracing::info;
use validator::Validate;

use core_kernel::{ItemId, PermissionLevel, Share, ShareTarget};

use crate::auth::CurrentUser;
use crate::dto::authorization::*;
use crate::error::ApiError;
use crate::AppState;

type ShareOutcome = Result<(StatusCode, Json<ApiResponse>), ApiError>;

/// Checks the caller's permission on a type or item
pub async fn authorize(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<AuthorizeQuery>,
) -> Result<Json<AuthorizationResponse>, ApiError> {
    query.validate()?;

    let (authorized, own) = match &query.data_type {
        None => (true, None),
        Some(data_type) => {
            let required = parse_level(query.operation.as_deref().unwrap_or("view"))?;
            let own = permission_on(&state, &user, data_type, query.id).await?;
            (own.allows(required), Some(own))
        }
    };

    Ok(Json(AuthorizationResponse {
        authorization: if authorized { AUTHORIZED } else { UNAUTHORIZED }.to_string(),
        can_share: share_scope(&user, own).to_string(),
        username: user.username,
        is_admin: user.is_admin,
    }))
}

/// Groups the caller may share data with, sorted
pub async fn get_shareable_group_subset(
    Extension(user): Extension<CurrentUser>,
) -> Json<Vec<String>> {
    let mut groups = user.groups;
    groups.sort();
    groups.dedup();
    Json(groups)
}

pub async fn share_with_all(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(data_type): Path<String>,
    Query(query): Query<ShareQuery>,
) -> ShareOutcome {
    share(&state, &user, ShareTarget::All, &data_type, query).await
}

pub async fn share_with_group(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path((group, data_type)): Path<(String, String)>,
    Query(query): Query<ShareQuery>,
) -> ShareOutcome {
    share(&state, &user, ShareTarget::Group(group), &data_type, query).await
}

pub async fn share_with_user(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path((name, data_type)): Path<(String, String)>,
    Query(query): Query<ShareQuery>,
) -> ShareOutcome {
    share(&state, &user, ShareTarget::User(name), &data_type, query).await
}

pub async fn hide_from_all(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(data_type): Path<String>,
    Query(query): Query<ShareQuery>,
) -> ShareOutcome {
    hide(&state, &user, ShareTarget::All, &data_type, query).await
}

pub async fn hide_from_group(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path((group, data_type)): Path<(String, String)>,
    Query(query): Query<ShareQuery>,
) -> ShareOutcome {
    hide(&state, &user, ShareTarget::Group(group), &data_type, query).await
}

pub async fn hide_from_user(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path((name, data_type)): Path<(String, String)>,
    Query(query): Query<ShareQuery>,
) -> ShareOutcome {
    hide(&state, &user, ShareTarget::User(name), &data_type, query).await
}

/// Lists the grants on a type, or on one item of it
pub async fn get_current_shares(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(data_type): Path<String>,
    Query(query): Query<CurrentSharesQuery>,
) -> Result<Json<Vec<ShareResponse>>, ApiError> {
    let own = permission_on(&state, &user, &data_type, query.id).await?;
    if !may_share(&user, own) {
        return Err(ApiError::Forbidden(format!(
            "{} may not manage shares of {}",
            user.username, data_type
        )));
    }

    let shares = state.shares.list_for_type(&data_type, query.id).await?;
    Ok(Json(shares.iter().map(ShareResponse::from).collect()))
}

async fn share(
    state: &AppState,
    user: &CurrentUser,
    target: ShareTarget,
    data_type: &str,
    query: ShareQuery,
) -> ShareOutcome {
    let level = match query.operation.as_deref() {
        Some(operation) => parse_level(operation)?,
        None => return Err(ApiError::validation("'operation' is required")),
    };
    if level == PermissionLevel::None {
        return Err(ApiError::validation("cannot share permission level 'none'"));
    }

    let own = permission_on(state, user, data_type, query.id).await?;
    if let Some(denied) = check_target(user, &target, own) {
        return Ok(denied);
    }
    if !own.allows(level) {
        return Ok(forbidden(format!(
            "cannot grant '{}' while holding '{}' on {}",
            level, own, data_type
        )));
    }

    let share = Share::new(target, data_type, level, query.id, user.username.clone());
    let stored = state.shares.upsert(share).await?;
    info!(
        grantee = %stored.target,
        data_type = %stored.data_type,
        level = %stored.level,
        by = %user.username,
        "Shared data"
    );

    Ok((
        StatusCode::OK,
        Json(ApiResponse::ok(format!(
            "{} shared with {}",
            data_type, stored.target
        ))),
    ))
}

async fn hide(
    state: &AppState,
    user: &CurrentUser,
    target: ShareTarget,
    data_type: &str,
    query: ShareQuery,
) -> ShareOutcome {
    let own = permission_on(state, user, data_type, query.id).await?;
    if let Some(denied) = check_target(user, &target, own) {
        return Ok(denied);
    }

    if !state.shares.remove(&target, data_type, query.id).await? {
        return Ok((
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error(format!(
                "{} is not shared with {}",
                data_type, target
            ))),
        ));
    }
    info!(grantee = %target, data_type = %data_type, by = %user.username, "Hid data");

    Ok((
        StatusCode::OK,
        Json(ApiResponse::ok(format!("{} hidden from {}", data_type, target))),
    ))
}

/// Denial response when the caller may not manage this target's grants
fn check_target(
    user: &CurrentUser,
    target: &ShareTarget,
    own: PermissionLevel,
) -> Option<(StatusCode, Json<ApiResponse>)> {
    if !may_share(user, own) {
        return Some(forbidden("sharing requires the admin role or 'all' permission"));
    }
    match target {
        ShareTarget::All if !user.is_admin => {
            Some(forbidden("only admins can share with all users"))
        }
        ShareTarget::Group(group) if !user.is_admin && !user.in_group(group) => {
            Some(forbidden(format!("not a member of group '{}'", group)))
        }
        _ => None,
    }
}

fn forbidden(message: impl Into<String>) -> (StatusCode, Json<ApiResponse>) {
    (StatusCode::FORBIDDEN, Json(ApiResponse::error(message)))
}

fn may_share(user: &CurrentUser, own: PermissionLevel) -> bool {
    user.is_admin || own == PermissionLevel::All
}

/// How widely the caller may share; `own` is `None` when no data was named
fn share_scope(user: &CurrentUser, own: Option<PermissionLevel>) -> &'static str {
    match own {
        _ if user.is_admin => SHARE_ANY,
        Some(PermissionLevel::All) => SHARE_GROUP,
        _ => "",
    }
}

fn parse_level(operation: &str) -> Result<PermissionLevel, ApiError> {
    Ok(operation.parse::<PermissionLevel>()?)
}

/// The caller's level on a registered type or an existing item of it
async fn permission_on(
    state: &AppState,
    user: &CurrentUser,
    data_type: &str,
    id: Option<ItemId>,
) -> Result<PermissionLevel, ApiError> {
    let repo = state.context.repository(data_type)?;
    if let Some(id) = id {
        if repo.find_item(id).await?.is_none() {
            return Err(ApiError::NotFound(format!("{} '{}' not found", data_type, id)));
        }
    }
    Ok(state.permission(user, data_type, id))
}
