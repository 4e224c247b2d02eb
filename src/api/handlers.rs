//! Portal HTTP handlers.
//!
//! Handlers stay thin: extract, call into `portal`, wrap the result.

use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};

use super::types::*;
use super::{AppState, CurrentUser};
use crate::error::{Result, ServerError};
use crate::portal::claims::{self, ClaimUpdate, Decision, NewClaim};
use crate::portal::items::{self, ItemUpdate, NewItem};
use crate::portal::lookups::{self, NewCategory, NewLocation};
use crate::portal::reports::{self, NewReport};
use crate::portal::users::{self, NewUser};
use crate::portal::{
    CategoryView, ClaimView, ImageView, ItemView, LocationView, PendingClaimRow, ReportView,
    StudentReportRow, UserView,
};

type AppStateRef = State<Arc<AppState>>;

// ============================================================================
// Authentication
// ============================================================================

/// POST /auth/register
pub async fn register(
    State(state): AppStateRef,
    Json(req): Json<NewUser>,
) -> Result<(StatusCode, Json<RegisteredResponse>)> {
    let user = users::register(&state.db, req).await?;
    Ok((
        StatusCode::CREATED,
        Json(RegisteredResponse {
            message: "Registration successful",
            user_id: user.id,
        }),
    ))
}

/// POST /auth/login
pub async fn login(State(state): AppStateRef, form: LoginForm) -> Result<Json<TokenResponse>> {
    let user = users::authenticate(&state.db, &form.username, &form.password)
        .await?
        .ok_or_else(|| {
            tracing::debug!("Failed login for {}", form.username.trim());
            ServerError::Unauthorized
        })?;

    let issued = state.auth.issue_token(user.id)?;
    Ok(Json(TokenResponse {
        access_token: issued.token,
        token_type: "bearer",
        expires_at: issued.expires_at,
        user: UserView::from(&user),
    }))
}

/// GET /auth/me, GET /users/me
pub async fn me(CurrentUser(user): CurrentUser) -> Json<UserView> {
    Json(UserView::from(&user))
}

// ============================================================================
// Users and Dashboards
// ============================================================================

/// GET /users
pub async fn list_users(
    State(state): AppStateRef,
    CurrentUser(actor): CurrentUser,
    Query(q): Query<PageQuery>,
) -> Result<Json<Vec<UserView>>> {
    Ok(Json(users::list_users(&state.db, &actor, q.page()).await?))
}

/// GET /users/dashboard/student
pub async fn student_dashboard(
    State(state): AppStateRef,
    CurrentUser(actor): CurrentUser,
) -> Result<Json<Vec<StudentReportRow>>> {
    Ok(Json(users::student_dashboard(&state.db, &actor).await?))
}

/// GET /users/dashboard/admin/pending_claims
pub async fn pending_claims(
    State(state): AppStateRef,
    CurrentUser(actor): CurrentUser,
) -> Result<Json<Vec<PendingClaimRow>>> {
    Ok(Json(users::pending_claims(&state.db, &actor).await?))
}

// ============================================================================
// Items
// ============================================================================

/// GET /items
pub async fn list_items(State(state): AppStateRef, Query(q): Query<ItemListQuery>) -> Result<Json<Vec<ItemView>>> {
    Ok(Json(items::list_items(&state.db, q.status, q.page()).await?))
}

/// POST /items
pub async fn create_item(
    State(state): AppStateRef,
    CurrentUser(actor): CurrentUser,
    Json(req): Json<NewItem>,
) -> Result<(StatusCode, Json<ItemView>)> {
    let view = items::create_item(&state.db, &actor, req).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// GET /items/:id
pub async fn get_item(State(state): AppStateRef, Path(item_id): Path<i32>) -> Result<Json<ItemView>> {
    Ok(Json(items::get_item(&state.db, item_id).await?))
}

/// PUT /items/:id
pub async fn update_item(
    State(state): AppStateRef,
    CurrentUser(actor): CurrentUser,
    Path(item_id): Path<i32>,
    Json(req): Json<ItemUpdate>,
) -> Result<Json<ItemView>> {
    Ok(Json(items::update_item(&state.db, &actor, item_id, req).await?))
}

/// PUT /items/:id/status?status=
pub async fn force_item_status(
    State(state): AppStateRef,
    CurrentUser(actor): CurrentUser,
    Path(item_id): Path<i32>,
    Query(q): Query<ItemStatusQuery>,
) -> Result<Json<ItemView>> {
    Ok(Json(items::force_status(&state.db, &actor, item_id, q.status).await?))
}

/// DELETE /items/:id
pub async fn delete_item(
    State(state): AppStateRef,
    CurrentUser(actor): CurrentUser,
    Path(item_id): Path<i32>,
) -> Result<StatusCode> {
    let paths = items::delete_item(&state.db, &actor, item_id).await?;
    items::remove_image_files(state.uploads.as_ref(), &paths).await;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /items/:id/images (multipart field `file`)
pub async fn upload_image(
    State(state): AppStateRef,
    CurrentUser(actor): CurrentUser,
    Path(item_id): Path<i32>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ImageView>)> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::Validation(e.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|e| ServerError::Validation(e.body_text()))?;

        let image = items::attach_image(
            &state.db,
            state.uploads.as_ref(),
            &actor,
            item_id,
            file_name.as_deref(),
            data,
        )
        .await?;
        return Ok((StatusCode::CREATED, Json(image)));
    }
    Err(ServerError::Validation("Multipart field 'file' is required".to_string()))
}

// ============================================================================
// Reports
// ============================================================================

/// GET /reports
pub async fn list_reports(
    State(state): AppStateRef,
    Query(q): Query<ReportListQuery>,
) -> Result<Json<Vec<ReportView>>> {
    Ok(Json(reports::list_reports(&state.db, q.filter(), q.page()).await?))
}

/// POST /reports
pub async fn create_report(
    State(state): AppStateRef,
    CurrentUser(actor): CurrentUser,
    Json(req): Json<NewReport>,
) -> Result<Json<ReportView>> {
    Ok(Json(reports::create_report(&state.db, &actor, req).await?))
}

/// GET /reports/:id
pub async fn get_report(State(state): AppStateRef, Path(report_id): Path<i32>) -> Result<Json<ReportView>> {
    Ok(Json(reports::get_report(&state.db, report_id).await?))
}

/// PUT /reports/:id/status?status=
pub async fn set_report_status(
    State(state): AppStateRef,
    CurrentUser(actor): CurrentUser,
    Path(report_id): Path<i32>,
    Query(q): Query<ReportStatusQuery>,
) -> Result<Json<ReportView>> {
    Ok(Json(
        reports::set_report_status(&state.db, &actor, report_id, q.status).await?,
    ))
}

// ============================================================================
// Claims
// ============================================================================

/// GET /claims
pub async fn list_claims(
    State(state): AppStateRef,
    CurrentUser(_actor): CurrentUser,
    Query(q): Query<ClaimListQuery>,
) -> Result<Json<Vec<ClaimView>>> {
    Ok(Json(claims::list_claims(&state.db, q.status, q.page()).await?))
}

/// POST /claims
pub async fn create_claim(
    State(state): AppStateRef,
    CurrentUser(actor): CurrentUser,
    Json(req): Json<NewClaim>,
) -> Result<(StatusCode, Json<ClaimView>)> {
    let view = claims::create_claim(&state.db, &actor, req).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// GET /claims/:id
pub async fn get_claim(
    State(state): AppStateRef,
    CurrentUser(_actor): CurrentUser,
    Path(claim_id): Path<i32>,
) -> Result<Json<ClaimView>> {
    Ok(Json(claims::get_claim(&state.db, claim_id).await?))
}

/// PUT /claims/:id
pub async fn update_claim(
    State(state): AppStateRef,
    CurrentUser(actor): CurrentUser,
    Path(claim_id): Path<i32>,
    Json(req): Json<ClaimUpdate>,
) -> Result<Json<ClaimView>> {
    Ok(Json(claims::update_claim_text(&state.db, &actor, claim_id, req).await?))
}

/// POST /claims/:id/approve
pub async fn approve_claim(
    State(state): AppStateRef,
    CurrentUser(actor): CurrentUser,
    Path(claim_id): Path<i32>,
) -> Result<Json<ClaimView>> {
    Ok(Json(
        claims::decide_claim(&state.db, &actor, claim_id, Decision::Approve).await?,
    ))
}

/// POST /claims/:id/reject
pub async fn reject_claim(
    State(state): AppStateRef,
    CurrentUser(actor): CurrentUser,
    Path(claim_id): Path<i32>,
) -> Result<Json<ClaimView>> {
    Ok(Json(
        claims::decide_claim(&state.db, &actor, claim_id, Decision::Reject).await?,
    ))
}

/// DELETE /claims/:id
pub async fn delete_claim(
    State(state): AppStateRef,
    CurrentUser(actor): CurrentUser,
    Path(claim_id): Path<i32>,
) -> Result<StatusCode> {
    claims::delete_claim(&state.db, &actor, claim_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Lookups
// ============================================================================

/// GET /categories, GET /items/categories/all
pub async fn list_categories(State(state): AppStateRef) -> Result<Json<Vec<CategoryView>>> {
    Ok(Json(lookups::list_categories(&state.db).await?))
}

/// POST /categories
pub async fn create_category(
    State(state): AppStateRef,
    CurrentUser(actor): CurrentUser,
    Json(req): Json<NewCategory>,
) -> Result<(StatusCode, Json<CategoryView>)> {
    let view = lookups::create_category(&state.db, &actor, req).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// GET /locations, GET /items/locations/all
pub async fn list_locations(State(state): AppStateRef) -> Result<Json<Vec<LocationView>>> {
    Ok(Json(lookups::list_locations(&state.db).await?))
}

/// POST /locations
pub async fn create_location(
    State(state): AppStateRef,
    CurrentUser(actor): CurrentUser,
    Json(req): Json<NewLocation>,
) -> Result<(StatusCode, Json<LocationView>)> {
    let view = lookups::create_location(&state.db, &actor, req).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

// ============================================================================
// Misc
// ============================================================================

/// GET /notifications
pub async fn notifications(CurrentUser(_actor): CurrentUser) -> Json<NotificationsResponse> {
    Json(NotificationsResponse {
        message: "Notifications feature coming soon",
        notifications: Vec::new(),
    })
}

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
