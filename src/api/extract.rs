//! Request extractors for the authenticated caller

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use sea_orm::ConnectionTrait;

use super::auth::AuthManager;
use super::AppState;
use crate::db::entities::user;
use crate::error::{Result, ServerError};
use crate::portal::users::find_user;

/// Resolve a bearer token to the user it was issued for
pub async fn current_user<C: ConnectionTrait>(db: &C, auth: &AuthManager, token: &str) -> Result<user::Model> {
    let user_id = auth.resolve_token(token)?;
    find_user(db, user_id).await?.ok_or_else(|| {
        tracing::debug!("Token subject {} no longer exists", user_id);
        ServerError::Unauthorized
    })
}

/// The user named by the request's `Authorization: Bearer` header
pub struct CurrentUser(pub user::Model);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> std::result::Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(ServerError::Unauthorized)?;
        let token = AuthManager::bearer_token(header)?;
        current_user(&state.db, &state.auth, token).await.map(CurrentUser)
    }
}
