//! HTTP API Layer
//!
//! This crate exposes the generic repository over HTTP using Axum.
//!
//! # Architecture
//!
//! - **Handlers**: `/api/Data/{dataType}/...` for records, `/api/Authorization/...`
//!   for permission checks and sharing
//! - **Middleware**: Bearer authentication, audit logging, tracing
//! - **DTOs**: Request/Response data transfer objects
//! - **Error Handling**: Consistent `{ error, message }` responses
//!
//! # Example
//!
//! ```rust,ignore
//! use interface_api::{create_router, AppState};
//!
//! let state = AppState::new(context, Arc::new(MemoryShareStore::new()), config);
//! axum::serve(listener, create_router(state)).await?;
//! ```

pub mod auth;
pub mod config;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;

use std::fmt;
use std::sync::Arc;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use core_kernel::{ItemId, PermissionLevel, SharePort};
use infra_db::DataContext;

use crate::auth::CurrentUser;
use crate::config::ApiConfig;
use crate::error::ApiError;
use crate::handlers::{authorization, data, health};
use crate::middleware::{audit_middleware, auth_middleware};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub context: DataContext,
    pub shares: Arc<dyn SharePort>,
    pub config: ApiConfig,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("context", &self.context)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl AppState {
    pub fn new(context: DataContext, shares: Arc<dyn SharePort>, config: ApiConfig) -> Self {
        Self {
            context,
            shares,
            config,
        }
    }

    /// The caller's effective level on an item, or on the whole type
    pub fn permission(&self, user: &CurrentUser, data_type: &str, id: Option<ItemId>) -> PermissionLevel {
        user.permission(self.context.authorizer().as_ref(), data_type, id)
    }

    /// Fails with `Forbidden` unless the caller holds `required`
    pub fn require(
        &self,
        user: &CurrentUser,
        data_type: &str,
        id: Option<ItemId>,
        required: PermissionLevel,
    ) -> Result<(), ApiError> {
        if self.permission(user, data_type, id).allows(required) {
            return Ok(());
        }
        let target = match id {
            Some(id) => format!("{} '{}'", data_type, id),
            None => data_type.to_string(),
        };
        Err(ApiError::Forbidden(format!(
            "{} lacks '{}' permission on {}",
            user.username, required, target
        )))
    }
}

/// Creates the main API router
///
/// # Arguments
///
/// * `state` - Repository context, share store and configuration
///
/// # Returns
///
/// Configured Axum router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check));

    let data_routes = Router::new()
        .route("/Add", post(data::add))
        .route("/Find/:id", get(data::find))
        .route("/GetPage", post(data::get_page))
        .route("/GetFieldDefinitions", get(data::get_field_definitions))
        .route("/GetTotal", get(data::get_total))
        .route("/Update", post(data::update))
        .route("/Remove/:id", post(data::remove))
        .route("/RemoveRange", post(data::remove_range))
        .route("/RemoveFromParent/:id", post(data::remove_from_parent))
        .route("/RemoveRangeFromParent", post(data::remove_range_from_parent))
        .route("/AddChildrenToCollection/:id", post(data::add_children_to_collection))
        .route(
            "/RemoveChildrenFromCollection/:id",
            post(data::remove_children_from_collection),
        )
        .route("/GetChildId/:id", get(data::get_child_id))
        .route("/GetChildTotal/:id", get(data::get_child_total))
        .route("/GetChildPage/:id", post(data::get_child_page))
        .route("/ReplaceChild/:parent_id/:new_child_id", post(data::replace_child))
        .route("/Duplicate/:id", post(data::duplicate));

    let authorization_routes = Router::new()
        .route("/Authorize", get(authorization::authorize))
        .route("/ShareDataWithAll/:data_type", post(authorization::share_with_all))
        .route(
            "/ShareDataWithGroup/:group/:data_type",
            post(authorization::share_with_group),
        )
        .route(
            "/ShareDataWithUser/:user/:data_type",
            post(authorization::share_with_user),
        )
        .route("/HideDataFromAll/:data_type", post(authorization::hide_from_all))
        .route(
            "/HideDataFromGroup/:group/:data_type",
            post(authorization::hide_from_group),
        )
        .route("/HideDataFromUser/:user/:data_type", post(authorization::hide_from_user))
        .route("/GetCurrentShares/:data_type", get(authorization::get_current_shares))
        .route(
            "/GetShareableGroupSubset",
            get(authorization::get_shareable_group_subset),
        );

    // Protected API routes
    let api_routes = Router::new()
        .nest("/Data/:data_type", data_routes)
        .nest("/Authorization", authorization_routes)
        .layer(axum_middleware::from_fn(audit_middleware))
        .layer(axum_middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Combine all routes
    Router::new()
        .merge(public_routes)
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
