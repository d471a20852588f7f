//! Generic data handlers
//!
//! Every route is nested under `/api/Data/{dataType}`; the data type picks
//! the repository. Each handler checks the caller's permission before the
//! repository call: `view` to read, `edit` to change an item or its links,
//! `add` to create and `all` on every item the call may delete. Removing a
//! child from its parent deletes it, as does unlinking a child whose
//! reference is required or displacing a one-to-one child nothing else owns.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde_json::{Map, Value};
use validator::Validate;

use core_kernel::{FieldDefinition, ItemId, ItemView, PageResult, PermissionLevel};
use infra_db::Repository;

use crate::auth::CurrentUser;
use crate::dto::data::*;
use crate::error::ApiError;
use crate::AppState;

fn repository(state: &AppState, data_type: &str) -> Result<Repository, ApiError> {
    Ok(state.context.repository(data_type)?)
}

/// Data type on the other side of a navigation of `repo`
fn navigation_target(repo: &Repository, navigation: &str) -> Result<String, ApiError> {
    Ok(repo.descriptor().navigation(navigation)?.target.clone())
}

/// Creates a default-valued item, optionally attached to a parent
pub async fn add(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(data_type): Path<String>,
    Query(query): Query<AddQuery>,
) -> Result<(StatusCode, Json<ItemView>), ApiError> {
    query.validate()?;
    let repo = repository(&state, &data_type)?;
    state.require(&user, &data_type, None, PermissionLevel::Add)?;

    if let (Some(child_prop), Some(parent_id)) = (&query.child_prop, query.parent_id) {
        let parent_type = navigation_target(&repo, child_prop)?;
        state.require(&user, &parent_type, Some(parent_id), PermissionLevel::Edit)?;
    }

    let view = repo
        .add(query.child_prop.as_deref(), query.parent_id)
        .await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// Gets an item by ID
pub async fn find(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path((data_type, id)): Path<(String, ItemId)>,
) -> Result<Json<ItemView>, ApiError> {
    let repo = repository(&state, &data_type)?;
    state.require(&user, &data_type, Some(id), PermissionLevel::View)?;

    repo.find(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("{} '{}' not found", data_type, id)))
}

/// A searched, sorted page of the items the caller may view
pub async fn get_page(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(data_type): Path<String>,
    Json(request): Json<GetPageRequest>,
) -> Result<Json<PageResult<ItemView>>, ApiError> {
    request.validate()?;
    let repo = repository(&state, &data_type)?;
    Ok(Json(repo.get_page(request.into(), &user.claims).await?))
}

/// Display metadata of a type's fields and navigations
pub async fn get_field_definitions(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(data_type): Path<String>,
) -> Result<Json<Vec<FieldDefinition>>, ApiError> {
    let repo = repository(&state, &data_type)?;
    if !user.sees_type(&data_type) {
        return Err(ApiError::Forbidden(format!(
            "{} has no access to {}",
            user.username, data_type
        )));
    }
    Ok(Json(repo.field_definitions().to_vec()))
}

/// Number of items the caller may view
pub async fn get_total(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(data_type): Path<String>,
) -> Result<Json<usize>, ApiError> {
    let repo = repository(&state, &data_type)?;
    Ok(Json(repo.get_total(&user.claims).await?))
}

/// Applies a submitted view object
pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(data_type): Path<String>,
    Json(object): Json<Map<String, Value>>,
) -> Result<Json<ItemView>, ApiError> {
    let repo = repository(&state, &data_type)?;
    let update = repo.update_from_view(object)?;
    state.require(&user, &data_type, Some(update.id), PermissionLevel::Edit)?;

    Ok(Json(repo.update(update).await?))
}

/// Deletes an item and everything it owns
pub async fn remove(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path((data_type, id)): Path<(String, ItemId)>,
) -> Result<StatusCode, ApiError> {
    let repo = repository(&state, &data_type)?;
    state.require(&user, &data_type, Some(id), PermissionLevel::All)?;

    repo.remove(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Deletes several items; returns the ids that existed
pub async fn remove_range(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(data_type): Path<String>,
    Json(ids): Json<Vec<ItemId>>,
) -> Result<Json<Vec<ItemId>>, ApiError> {
    let repo = repository(&state, &data_type)?;
    for id in &ids {
        state.require(&user, &data_type, Some(*id), PermissionLevel::All)?;
    }

    Ok(Json(repo.remove_range(&ids).await?))
}

/// Removes a child from its parent through `childProp`
pub async fn remove_from_parent(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path((data_type, id)): Path<(String, ItemId)>,
    Query(query): Query<ChildPropQuery>,
) -> Result<Json<RemovedResponse>, ApiError> {
    query.validate()?;
    let repo = repository(&state, &data_type)?;
    state.require(&user, &data_type, Some(id), PermissionLevel::All)?;

    let removed = repo.remove_from_parent(id, &query.child_prop).await?;
    Ok(Json(RemovedResponse { removed }))
}

/// Removes several children from their parents; returns the removed ids
pub async fn remove_range_from_parent(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(data_type): Path<String>,
    Query(query): Query<ChildPropQuery>,
    Json(ids): Json<Vec<ItemId>>,
) -> Result<Json<Vec<ItemId>>, ApiError> {
    query.validate()?;
    let repo = repository(&state, &data_type)?;
    for id in &ids {
        state.require(&user, &data_type, Some(*id), PermissionLevel::All)?;
    }

    Ok(Json(repo.remove_range_from_parent(&ids, &query.child_prop).await?))
}

/// Links existing items into a collection of the parent
pub async fn add_children_to_collection(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path((data_type, id)): Path<(String, ItemId)>,
    Query(query): Query<ChildPropQuery>,
    Json(child_ids): Json<Vec<ItemId>>,
) -> Result<Json<CountResponse>, ApiError> {
    query.validate()?;
    let repo = repository(&state, &data_type)?;
    require_collection_access(
        &state,
        &user,
        &repo,
        id,
        &query.child_prop,
        &child_ids,
        PermissionLevel::Edit,
    )?;

    let count = repo
        .add_children_to_collection(id, &query.child_prop, &child_ids)
        .await?;
    Ok(Json(CountResponse { count }))
}

/// Unlinks items from a collection of the parent
pub async fn remove_children_from_collection(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path((data_type, id)): Path<(String, ItemId)>,
    Query(query): Query<ChildPropQuery>,
    Json(child_ids): Json<Vec<ItemId>>,
) -> Result<Json<CountResponse>, ApiError> {
    query.validate()?;
    let repo = repository(&state, &data_type)?;
    let level = if repo.unlinking_deletes(&query.child_prop)? {
        PermissionLevel::All
    } else {
        PermissionLevel::Edit
    };
    require_collection_access(&state, &user, &repo, id, &query.child_prop, &child_ids, level)?;

    let count = repo
        .remove_children_from_collection(id, &query.child_prop, &child_ids)
        .await?;
    Ok(Json(CountResponse { count }))
}

/// Collection changes edit the parent and need `child_level` on every
/// child they touch
fn require_collection_access(
    state: &AppState,
    user: &CurrentUser,
    repo: &Repository,
    parent_id: ItemId,
    navigation: &str,
    child_ids: &[ItemId],
    child_level: PermissionLevel,
) -> Result<(), ApiError> {
    state.require(user, repo.data_type(), Some(parent_id), PermissionLevel::Edit)?;
    let child_type = navigation_target(repo, navigation)?;
    for child_id in child_ids {
        state.require(user, &child_type, Some(*child_id), child_level)?;
    }
    Ok(())
}

/// Id of the item behind a one-to-one navigation
pub async fn get_child_id(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path((data_type, id)): Path<(String, ItemId)>,
    Query(query): Query<ChildPropQuery>,
) -> Result<Json<Option<ItemId>>, ApiError> {
    query.validate()?;
    let repo = repository(&state, &data_type)?;
    state.require(&user, &data_type, Some(id), PermissionLevel::View)?;

    Ok(Json(repo.get_child_id(id, &query.child_prop).await?))
}

/// Number of items behind a navigation
pub async fn get_child_total(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path((data_type, id)): Path<(String, ItemId)>,
    Query(query): Query<ChildPropQuery>,
) -> Result<Json<usize>, ApiError> {
    query.validate()?;
    let repo = repository(&state, &data_type)?;
    state.require(&user, &data_type, Some(id), PermissionLevel::View)?;

    Ok(Json(repo.get_child_total(id, &query.child_prop).await?))
}

/// A page of the items behind a navigation, filtered by the caller's claims
pub async fn get_child_page(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path((data_type, id)): Path<(String, ItemId)>,
    Query(query): Query<ChildPropQuery>,
    Json(request): Json<GetPageRequest>,
) -> Result<Json<PageResult<ItemView>>, ApiError> {
    query.validate()?;
    request.validate()?;
    let repo = repository(&state, &data_type)?;
    state.require(&user, &data_type, Some(id), PermissionLevel::View)?;

    let page = repo
        .get_child_page(id, &query.child_prop, request.into(), &user.claims)
        .await?;
    Ok(Json(page))
}

/// Makes `newChildId` the parent's one-to-one child
pub async fn replace_child(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path((data_type, parent_id, new_child_id)): Path<(String, ItemId, ItemId)>,
    Query(query): Query<ChildPropQuery>,
) -> Result<Json<ReplaceChildResponse>, ApiError> {
    query.validate()?;
    let repo = repository(&state, &data_type)?;
    let parent_type = navigation_target(&repo, &query.child_prop)?;
    state.require(&user, &parent_type, Some(parent_id), PermissionLevel::Edit)?;
    state.require(&user, &data_type, Some(new_child_id), PermissionLevel::Edit)?;
    // the displaced child may be deleted
    if let Some(current) = repo
        .displaced_child(parent_id, new_child_id, &query.child_prop)
        .await?
    {
        state.require(&user, &data_type, Some(current), PermissionLevel::All)?;
    }

    let displaced = repo
        .replace_child(parent_id, new_child_id, &query.child_prop)
        .await?;
    Ok(Json(ReplaceChildResponse { displaced }))
}

/// Copies an item's own fields into a new item
pub async fn duplicate(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path((data_type, id)): Path<(String, ItemId)>,
) -> Result<(StatusCode, Json<ItemView>), ApiError> {
    let repo = repository(&state, &data_type)?;
    state.require(&user, &data_type, Some(id), PermissionLevel::View)?;
    state.require(&user, &data_type, None, PermissionLevel::Add)?;

    Ok((StatusCode::CREATED, Json(repo.duplicate(id).await?)))
}
