use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query};
use axum::routing::{post, put};
use axum::{Router, extract::State, http::StatusCode, routing::get};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::AppError;
use crate::models::*;
use crate::progress::CourseFilter;
use crate::services::{MarkAllOutcome, SessionScope, ToggleOutcome, with_timeout};
use crate::session::SessionView;
use crate::state::AppState;
use crate::views::{self, CourseListView, ModuleListView, ProfilePage};

#[derive(Deserialize)]
struct CourseQueryParams {
    #[serde(default)]
    filter: CourseFilter,
}

#[derive(Deserialize)]
struct SignInRequest {
    access_token: String,
}

#[derive(Serialize)]
struct RefreshResponse {
    loaded_at: Option<chrono::DateTime<chrono::Utc>>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/session", post(sign_in).delete(sign_out))
        .route("/courses", get(list_courses))
        .route("/courses/{id}", get(course_modules))
        .route("/courses/{id}/complete-all", post(complete_all))
        .route("/modules/{id}/toggle", post(toggle_module))
        .route("/refresh", post(refresh))
        .route("/profile", get(profile).patch(update_profile))
        .route("/profile/theme", put(update_theme))
        .with_state(state)
}

async fn health() -> StatusCode {
    StatusCode::OK
}

/// Resolves the scope of the signed-in learner or asks them to sign in.
async fn current_scope(state: &AppState) -> Result<Arc<SessionScope>, AppError> {
    let session = state.session.current().ok_or(AppError::AuthRequired)?;
    state.dashboard.scope_for(&session).await
}

async fn sign_in(
    State(state): State<AppState>,
    Json(req): Json<SignInRequest>
) -> Result<Json<SessionView>, AppError> {
    if req.access_token.trim().is_empty() {
        return Err(AppError::BadRequest("access_token is required".to_string()));
    }
    let session = with_timeout(
        state.dashboard.timeout(),
        "signing in",
        state.auth.resolve_session(&req.access_token),
    )
    .await?;

    let view = SessionView::from(&session);
    state.session.sign_in(session);
    Ok(Json(view))
}

async fn sign_out(State(state): State<AppState>) -> StatusCode {
    if let Some(session) = state.session.sign_out() {
        state.dashboard.close().await;
        let remote = with_timeout(state.dashboard.timeout(), "signing out", state.auth.sign_out(&session)).await;
        if let Err(e) = remote {
            warn!("remote sign-out for {} failed: {}", session.user_id, e);
        }
    }
    StatusCode::NO_CONTENT
}

async fn list_courses(
    State(state): State<AppState>,
    Query(params): Query<CourseQueryParams>
) -> Result<Json<CourseListView>, AppError> {
    let scope = current_scope(&state).await?;
    let snapshot = scope.snapshot().await;
    Ok(Json(views::course_list(&snapshot, params.filter)))
}

async fn course_modules(
    State(state): State<AppState>,
    Path(id): Path<String>
) -> Result<Json<ModuleListView>, AppError> {
    let scope = current_scope(&state).await?;
    let snapshot = scope.snapshot().await;
    views::module_list(&snapshot, &id)
        .map(Json)
        .ok_or(AppError::NotFound)
}

async fn toggle_module(
    State(state): State<AppState>,
    Path(id): Path<String>
) -> Result<Json<ToggleOutcome>, AppError> {
    let scope = current_scope(&state).await?;
    let outcome = state.dashboard.toggle_module(&scope, &id).await?;
    Ok(Json(outcome))
}

async fn complete_all(
    State(state): State<AppState>,
    Path(id): Path<String>
) -> Result<Json<MarkAllOutcome>, AppError> {
    let scope = current_scope(&state).await?;
    let outcome = state.dashboard.mark_all_complete(&scope, &id).await?;
    Ok(Json(outcome))
}

async fn refresh(State(state): State<AppState>) -> Result<Json<RefreshResponse>, AppError> {
    let scope = current_scope(&state).await?;
    state.dashboard.refresh(&scope).await?;
    Ok(Json(RefreshResponse {
        loaded_at: scope.snapshot().await.loaded_at,
    }))
}

async fn profile(State(state): State<AppState>) -> Result<Json<ProfilePage>, AppError> {
    let scope = current_scope(&state).await?;
    let snapshot = scope.snapshot().await;
    views::profile_page(&snapshot)
        .map(Json)
        .ok_or(AppError::NotFound)
}

async fn update_profile(
    State(state): State<AppState>,
    Json(req): Json<ProfileEditRequest>
) -> Result<Json<Profile>, AppError> {
    let scope = current_scope(&state).await?;
    let profile = state.dashboard.update_profile(&scope, req.into()).await?;
    Ok(Json(profile))
}

async fn update_theme(
    State(state): State<AppState>,
    Json(req): Json<ThemeRequest>
) -> Result<Json<Profile>, AppError> {
    let scope = current_scope(&state).await?;
    let profile = state.dashboard.update_profile(&scope, req.theme.into()).await?;
    Ok(Json(profile))
}
