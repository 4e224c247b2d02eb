//! Portal route definitions.

use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Router,
};

use super::handlers;
use super::AppState;

/// Create the portal API router.
///
/// Collection routes answer with and without a trailing slash since the web
/// client uses both forms.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        // ================================================================
        // Authentication
        // ================================================================
        .route("/auth/register", post(handlers::register))
        .route("/auth/login", post(handlers::login))
        .route("/auth/me", get(handlers::me))
        // ================================================================
        // Users and Dashboards
        // ================================================================
        .route("/users", get(handlers::list_users))
        .route("/users/", get(handlers::list_users))
        .route("/users/me", get(handlers::me))
        .route("/users/dashboard/student", get(handlers::student_dashboard))
        .route(
            "/users/dashboard/admin/pending_claims",
            get(handlers::pending_claims),
        )
        // ================================================================
        // Items
        // ================================================================
        .route("/items", get(handlers::list_items).post(handlers::create_item))
        .route("/items/", get(handlers::list_items).post(handlers::create_item))
        .route("/items/categories/all", get(handlers::list_categories))
        .route("/items/locations/all", get(handlers::list_locations))
        .route(
            "/items/:id",
            get(handlers::get_item)
                .put(handlers::update_item)
                .delete(handlers::delete_item),
        )
        .route("/items/:id/status", put(handlers::force_item_status))
        .route("/items/:id/images", post(handlers::upload_image))
        // ================================================================
        // Reports
        // ================================================================
        .route("/reports", get(handlers::list_reports).post(handlers::create_report))
        .route("/reports/", get(handlers::list_reports).post(handlers::create_report))
        .route("/reports/:id", get(handlers::get_report))
        .route("/reports/:id/status", put(handlers::set_report_status))
        // ================================================================
        // Claims
        // ================================================================
        .route("/claims", get(handlers::list_claims).post(handlers::create_claim))
        .route("/claims/", get(handlers::list_claims).post(handlers::create_claim))
        .route(
            "/claims/:id",
            get(handlers::get_claim)
                .put(handlers::update_claim)
                .delete(handlers::delete_claim),
        )
        .route("/claims/:id/approve", post(handlers::approve_claim))
        .route("/claims/:id/reject", post(handlers::reject_claim))
        // ================================================================
        // Lookups
        // ================================================================
        .route(
            "/categories",
            get(handlers::list_categories).post(handlers::create_category),
        )
        .route(
            "/categories/",
            get(handlers::list_categories).post(handlers::create_category),
        )
        .route(
            "/locations",
            get(handlers::list_locations).post(handlers::create_location),
        )
        .route(
            "/locations/",
            get(handlers::list_locations).post(handlers::create_location),
        )
        // ================================================================
        // Misc
        // ================================================================
        .route("/notifications", get(handlers::notifications))
        .route("/notifications/", get(handlers::notifications))
        .route("/health", get(handlers::health))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::db::test_database;
    use crate::portal::users::ensure_admin;
    use crate::storage::LocalStorage;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use tower::ServiceExt;

    struct TestApp {
        app: Router,
        _uploads: TempDir,
    }

    async fn test_app() -> TestApp {
        let db = test_database().await;
        ensure_admin(&db, "ADMIN", "admin-pass").await.unwrap();
        let uploads = TempDir::new().unwrap();
        let config = Config::from_lookup(|key| match key {
            "SECRET_KEY" => Some("router-test-secret".to_string()),
            _ => None,
        })
        .unwrap();
        let store = Arc::new(LocalStorage::new(uploads.path().to_path_buf()));
        let state = Arc::new(AppState::new(db, &config, store));
        TestApp {
            app: router().with_state(state),
            _uploads: uploads,
        }
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, body)
    }

    fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn empty_request(method: &str, uri: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn register(app: &Router, name: &str, roll: &str, password: &str) {
        let (status, _) = send(
            app,
            json_request(
                "POST",
                "/auth/register",
                None,
                json!({"name": name, "roll_number": roll, "password": password}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    async fn login(app: &Router, roll: &str, password: &str) -> String {
        let req = Request::builder()
            .method("POST")
            .uri("/auth/login")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(format!("username={}&password={}", roll, password)))
            .unwrap();
        let (status, body) = send(app, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["token_type"], "bearer");
        body["access_token"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_health() {
        let t = test_app().await;
        let (status, body) = send(&t.app, empty_request("GET", "/health", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_unauthenticated_requests_get_bearer_challenge() {
        let t = test_app().await;
        let response = t
            .app
            .clone()
            .oneshot(empty_request("GET", "/auth/me", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
            "Bearer"
        );

        let (status, _) = send(&t.app, empty_request("GET", "/claims/", Some("not-a-token"))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_register_validation_and_duplicates() {
        let t = test_app().await;
        let (status, body) = send(
            &t.app,
            json_request("POST", "/auth/register", None, json!({"name": "X", "roll_number": "R9"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"].as_str().unwrap().contains("password"));

        register(&t.app, "X", "R9", "pw").await;
        let (status, body) = send(
            &t.app,
            json_request(
                "POST",
                "/auth/register",
                None,
                json!({"name": "Y", "roll_number": "R9", "password": "pw"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["detail"], "Roll number already registered");
    }

    #[tokio::test]
    async fn test_login_accepts_multipart() {
        let t = test_app().await;
        register(&t.app, "Mia", "M1", "secret").await;

        let boundary = "XBOUNDARY";
        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"username\"\r\n\r\nM1\r\n\
             --{b}\r\nContent-Disposition: form-data; name=\"password\"\r\n\r\nsecret\r\n--{b}--\r\n",
            b = boundary
        );
        let req = Request::builder()
            .method("POST")
            .uri("/auth/login")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", boundary),
            )
            .body(Body::from(body))
            .unwrap();
        let (status, body) = send(&t.app, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["roll_number"], "M1");
        assert_eq!(body["user"]["role_name"], "student");

        let bad = Request::builder()
            .method("POST")
            .uri("/auth/login")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from("username=M1&password=wrong"))
            .unwrap();
        let (status, _) = send(&t.app, bad).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_item_claim_approval_over_http() {
        let t = test_app().await;
        register(&t.app, "Alice", "A1", "alice").await;
        register(&t.app, "Bob", "B1", "bob").await;
        let alice = login(&t.app, "A1", "alice").await;
        let bob = login(&t.app, "B1", "bob").await;
        let admin = login(&t.app, "ADMIN", "admin-pass").await;

        let (status, item) = send(
            &t.app,
            json_request(
                "POST",
                "/items/",
                Some(&alice),
                json!({"title": "Blue Backpack", "current_status": "lost"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let item_id = item["item_id"].as_i64().unwrap();

        let (status, claim) = send(
            &t.app,
            json_request("POST", "/claims", Some(&bob), json!({"item_id": item_id, "claim_text": "mine"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let claim_id = claim["claim_id"].as_i64().unwrap();

        let approve_uri = format!("/claims/{}/approve", claim_id);
        let (status, _) = send(&t.app, empty_request("POST", &approve_uri, Some(&bob))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, pending) = send(
            &t.app,
            empty_request("GET", "/users/dashboard/admin/pending_claims", Some(&admin)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(pending.as_array().unwrap().len(), 1);

        let (status, decided) = send(&t.app, empty_request("POST", &approve_uri, Some(&admin))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(decided["claim_status"], "approved");

        let (status, _) = send(&t.app, empty_request("POST", &approve_uri, Some(&admin))).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (_, fetched) = send(&t.app, empty_request("GET", &format!("/items/{}", item_id), None)).await;
        assert_eq!(fetched["current_status"], "claimed");

        let (_, claimed) = send(&t.app, empty_request("GET", "/items?status=claimed", None)).await;
        assert_eq!(claimed.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_report_resolution_over_http() {
        let t = test_app().await;
        register(&t.app, "Rita", "R1", "rita").await;
        let rita = login(&t.app, "R1", "rita").await;

        let (status, report) = send(
            &t.app,
            json_request(
                "POST",
                "/reports/",
                Some(&rita),
                json!({
                    "item_title": "Red Scarf",
                    "report_type": "found",
                    "location_name": "Gym",
                    "reported_date": "2024-05-02"
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(report["location_name"], "Gym");
        let report_id = report["report_id"].as_i64().unwrap();
        let item_id = report["item_id"].as_i64().unwrap();

        let uri = format!("/reports/{}/status?status=resolved", report_id);
        let (status, updated) = send(&t.app, empty_request("PUT", &uri, Some(&rita))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["status"], "resolved");

        let (_, item) = send(&t.app, empty_request("GET", &format!("/items/{}", item_id), None)).await;
        assert_eq!(item["current_status"], "completed");
        assert_eq!(item["last_report_type"], "found");
        assert_eq!(item["last_location_name"], "Gym");

        let (_, dashboard) = send(&t.app, empty_request("GET", "/users/dashboard/student", Some(&rita))).await;
        assert_eq!(dashboard[0]["item_title"], "Red Scarf");
        assert_eq!(dashboard[0]["current_status"], "completed");

        let (_, locations) = send(&t.app, empty_request("GET", "/items/locations/all", None)).await;
        assert_eq!(locations[0]["location_name"], "Gym");
    }

    #[tokio::test]
    async fn test_image_upload_over_http() {
        let t = test_app().await;
        register(&t.app, "Ivy", "I1", "ivy").await;
        let ivy = login(&t.app, "I1", "ivy").await;
        let (_, item) = send(
            &t.app,
            json_request("POST", "/items", Some(&ivy), json!({"title": "Keys"})),
        )
        .await;
        let item_id = item["item_id"].as_i64().unwrap();

        let boundary = "IMGBOUNDARY";
        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"keys.jpg\"\r\n\
             Content-Type: image/jpeg\r\n\r\nJPEGDATA\r\n--{b}--\r\n",
            b = boundary
        );
        let req = Request::builder()
            .method("POST")
            .uri(format!("/items/{}/images", item_id))
            .header(header::AUTHORIZATION, format!("Bearer {}", ivy))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", boundary),
            )
            .body(Body::from(body))
            .unwrap();
        let (status, image) = send(&t.app, req).await;
        assert_eq!(status, StatusCode::CREATED);
        let path = image["file_path"].as_str().unwrap();
        assert!(path.starts_with("/uploads/") && path.ends_with(".jpg"));

        let (_, fetched) = send(&t.app, empty_request("GET", &format!("/items/{}", item_id), None)).await;
        assert_eq!(fetched["images"].as_array().unwrap().len(), 1);

        let (status, _) = send(
            &t.app,
            empty_request("DELETE", &format!("/items/{}", item_id), Some(&ivy)),
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(std::fs::read_dir(t._uploads.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_invalid_status_rejected_at_boundary() {
        let t = test_app().await;
        let (status, _) = send(&t.app, empty_request("GET", "/items?status=misplaced", None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_oversized_pagination_is_bounded() {
        let t = test_app().await;
        register(&t.app, "Ivy", "I1", "ivy").await;
        let ivy = login(&t.app, "I1", "ivy").await;
        let admin = login(&t.app, "ADMIN", "admin-pass").await;
        let (status, _) = send(
            &t.app,
            json_request("POST", "/items", Some(&ivy), json!({"title": "Calculator"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, all) = send(&t.app, empty_request("GET", "/items?limit=18446744073709551615", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(all.as_array().unwrap().len(), 1);

        let huge = "skip=18446744073709551615&limit=18446744073709551615";
        for uri in [
            format!("/items?{}", huge),
            format!("/reports?{}", huge),
            format!("/claims?{}", huge),
            format!("/users?{}", huge),
        ] {
            let (status, rows) = send(&t.app, empty_request("GET", &uri, Some(&admin))).await;
            assert_eq!(status, StatusCode::OK, "{}", uri);
            assert!(rows.as_array().unwrap().is_empty(), "{}", uri);
        }
    }
}
