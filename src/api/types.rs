//! HTTP request and response types.

use async_trait::async_trait;
use axum::extract::{FromRequest, Multipart, Request};
use axum::http::header::CONTENT_TYPE;
use axum::Form;
use serde::{Deserialize, Serialize};

use crate::db::entities::status::{ClaimStatus, ItemStatus, ReportStatus, ReportType};
use crate::error::ServerError;
use crate::portal::reports::ReportFilter;
use crate::portal::{Page, UserView};

// ============================================================================
// Request Types
// ============================================================================

/// POST /auth/login credentials. `username` carries the roll number.
///
/// Accepted as `application/x-www-form-urlencoded` or `multipart/form-data`.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

fn bad_request(detail: String) -> ServerError {
    ServerError::Validation(detail)
}

#[async_trait]
impl<S> FromRequest<S> for LoginForm
where
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.starts_with("multipart/form-data"))
            .unwrap_or(false);

        if !is_multipart {
            let Form(form) = Form::<LoginForm>::from_request(req, state)
                .await
                .map_err(|e| bad_request(e.body_text()))?;
            return Ok(form);
        }

        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|e| bad_request(e.body_text()))?;
        let mut username = None;
        let mut password = None;
        while let Some(field) = multipart.next_field().await.map_err(|e| bad_request(e.body_text()))? {
            let name = field.name().unwrap_or_default().to_string();
            let value = field.text().await.map_err(|e| bad_request(e.body_text()))?;
            match name.as_str() {
                "username" => username = Some(value),
                "password" => password = Some(value),
                _ => {}
            }
        }

        match (username, password) {
            (Some(username), Some(password)) => Ok(LoginForm { username, password }),
            (None, _) => Err(bad_request("'username' is required".to_string())),
            (_, None) => Err(bad_request("'password' is required".to_string())),
        }
    }
}

/// GET /items query
#[derive(Debug, Default, Deserialize)]
pub struct ItemListQuery {
    pub skip: Option<u64>,
    pub limit: Option<u64>,
    pub status: Option<ItemStatus>,
}

/// GET /reports query
#[derive(Debug, Default, Deserialize)]
pub struct ReportListQuery {
    pub skip: Option<u64>,
    pub limit: Option<u64>,
    pub report_type: Option<ReportType>,
    pub status: Option<ReportStatus>,
}

/// GET /claims query
#[derive(Debug, Default, Deserialize)]
pub struct ClaimListQuery {
    pub skip: Option<u64>,
    pub limit: Option<u64>,
    pub status: Option<ClaimStatus>,
}

/// GET /users pagination
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub skip: Option<u64>,
    pub limit: Option<u64>,
}

impl PageQuery {
    pub fn page(&self) -> Page {
        Page::new(self.skip, self.limit)
    }
}

impl ItemListQuery {
    pub fn page(&self) -> Page {
        Page::new(self.skip, self.limit)
    }
}

impl ReportListQuery {
    pub fn page(&self) -> Page {
        Page::new(self.skip, self.limit)
    }

    pub fn filter(&self) -> ReportFilter {
        ReportFilter {
            report_type: self.report_type,
            status: self.status,
        }
    }
}

impl ClaimListQuery {
    pub fn page(&self) -> Page {
        Page::new(self.skip, self.limit)
    }
}

/// PUT /reports/:id/status query
#[derive(Debug, Deserialize)]
pub struct ReportStatusQuery {
    pub status: ReportStatus,
}

/// PUT /items/:id/status query
#[derive(Debug, Deserialize)]
pub struct ItemStatusQuery {
    pub status: ItemStatus,
}

// ============================================================================
// Response Types
// ============================================================================

/// POST /auth/login response
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_at: i64,
    pub user: UserView,
}

/// POST /auth/register response
#[derive(Debug, Serialize)]
pub struct RegisteredResponse {
    pub message: &'static str,
    pub user_id: i32,
}

/// GET /notifications response
#[derive(Debug, Serialize)]
pub struct NotificationsResponse {
    pub message: &'static str,
    pub notifications: Vec<serde_json::Value>,
}

/// GET /health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}
