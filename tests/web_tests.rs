#![cfg(feature = "web")]

mod common;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use common::roster;
use hr_dashboard::app::{AppState, router};
use hr_dashboard::config::Config;
use hr_dashboard::{Field, export};
use hr_dashboard::report::Table;
use serde_json::{Value, json};
use std::io::Write;
use tempfile::NamedTempFile;
use tower::ServiceExt;

struct Harness {
    app: Router,
    // keeps the data file alive
    _data: NamedTempFile,
}

async fn harness() -> Harness {
    harness_with(None).await
}

async fn harness_with(database_url: Option<&str>) -> Harness {
    let mut data = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
    let csv = export::to_csv(&Table::from_view(&roster().full_view())).unwrap();
    data.write_all(&csv).unwrap();
    data.flush().unwrap();

    let config = Config {
        data_file: data.path().to_path_buf(),
        bootstrap_admin_password: Some("admin-pw".into()),
        database_url: database_url.map(str::to_string),
        ..Config::default()
    };
    let state = AppState::build(config).await.unwrap();
    Harness {
        app: router(state),
        _data: data,
    }
}

async fn login(app: &Router, login_id: &str, password: &str) -> Option<String> {
    let req = Request::post("/login")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(format!("login_id={login_id}&password={password}")))
        .unwrap();
    let res = app.clone().oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    let cookie = res.headers().get(header::SET_COOKIE)?.to_str().unwrap();
    Some(cookie.split(';').next().unwrap().to_string())
}

async fn post_file(app: &Router, uri: &str, cookie: &str, file_name: &str, body: &str) -> (StatusCode, Value) {
    let multipart = format!(
        "--XBOUNDARY\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n\
         Content-Type: text/csv\r\n\r\n{body}\r\n--XBOUNDARY--\r\n"
    );
    let req = Request::post(uri)
        .header(header::COOKIE, cookie)
        .header(header::CONTENT_TYPE, "multipart/form-data; boundary=XBOUNDARY")
        .body(Body::from(multipart))
        .unwrap();
    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

fn sparse_csv() -> String {
    let header: Vec<&str> = Field::ALL.iter().map(|f| f.label()).collect();
    format!("{}\nAli,,N1\nOmar,,N2\nSara,1003,N3,1962-01-20\n", header.join(","))
}

async fn call(app: &Router, method: &str, uri: &str, cookie: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::COOKIE, cookie);
    let req = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

#[tokio::test]
async fn api_requires_a_session() {
    let h = harness().await;
    let (status, body) = call(&h.app, "GET", "/api/table", "session=nope", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["status"], "error");

    let page = Request::get("/").body(Body::empty()).unwrap();
    let res = h.app.clone().oneshot(page).await.unwrap();
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn wrong_password_goes_back_to_the_form() {
    let h = harness().await;
    let req = Request::post("/login")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("login_id=admin&password=nope"))
        .unwrap();
    let res = h.app.clone().oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(res.headers()[header::LOCATION], "/login?error=1");
    assert!(res.headers().get(header::SET_COOKIE).is_none());
}

#[tokio::test]
async fn filter_and_page_through_the_default_data() {
    let h = harness().await;
    let cookie = login(&h.app, "admin", "admin-pw").await.unwrap();

    let (status, body) = call(&h.app, "GET", "/api/table", &cookie, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total_rows"], 5);
    assert_eq!(body["data"]["rows"][0][1], "Ahmed Ali");

    let filter = json!({ "search_text": "Ahmed,Sales" });
    let (status, body) = call(&h.app, "POST", "/api/filter", &cookie, Some(filter)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total_rows"], 1);

    let bad = json!({ "date_from": "2000-01-02", "date_to": "2000-01-01" });
    let (status, _) = call(&h.app, "POST", "/api/filter", &cookie, Some(bad)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // the previous filter survives the rejected one
    let (_, body) = call(&h.app, "GET", "/api/summary", &cookie, None).await;
    assert_eq!(body["data"]["summary"]["total_employees"], 1);

    let (status, body) = call(&h.app, "POST", "/api/table/jump", &cookie, Some(json!({ "page": 9 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "out_of_range");

    let (_, body) = call(&h.app, "POST", "/api/filter/reset", &cookie, None).await;
    assert_eq!(body["data"]["total_rows"], 5);
}

#[tokio::test]
async fn reports_answer_json_or_files() {
    let h = harness().await;
    let cookie = login(&h.app, "admin", "admin-pw").await.unwrap();

    let (status, body) = call(
        &h.app,
        "GET",
        "/api/reports/aggregate?fields=department",
        &cookie,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["rows"][0], json!(["Sales", "3"]));

    let (status, _) = call(&h.app, "GET", "/api/reports/aggregate?fields=bogus", &cookie, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let req = Request::get("/api/export?format=csv")
        .header(header::COOKIE, &cookie)
        .body(Body::empty())
        .unwrap();
    let res = h.app.clone().oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let disposition = res.headers()[header::CONTENT_DISPOSITION].to_str().unwrap().to_string();
    assert!(disposition.contains("data_export_"));
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    assert!(bytes.starts_with(b"\xEF\xBB\xBF"));
}

#[tokio::test]
async fn admin_routes_are_for_admins_only() {
    let h = harness().await;
    let admin = login(&h.app, "admin", "admin-pw").await.unwrap();

    let user = json!({ "login_id": "clerk", "password": "pw" });
    let (status, _) = call(&h.app, "POST", "/api/admin/users", &admin, Some(user.clone())).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = call(&h.app, "POST", "/api/admin/users", &admin, Some(user)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = call(&h.app, "DELETE", "/api/admin/users/admin", &admin, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (_, body) = call(&h.app, "GET", "/api/admin/users", &admin, None).await;
    assert_eq!(body["protected"], "admin");
    assert_eq!(body["data"].as_array().map(Vec::len), Some(2));

    let clerk = login(&h.app, "clerk", "pw").await.unwrap();
    let (status, _) = call(&h.app, "GET", "/api/admin/users", &clerk, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // deleting a user ends their sessions
    let (status, _) = call(&h.app, "DELETE", "/api/admin/users/clerk", &admin, None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = call(&h.app, "GET", "/api/me", &clerk, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn database_routes_fail_cleanly_without_a_database() {
    let h = harness().await;
    let admin = login(&h.app, "admin", "admin-pw").await.unwrap();
    let (status, body) = call(
        &h.app,
        "POST",
        "/api/source",
        &admin,
        Some(json!({ "source": "database" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation");
}

#[tokio::test]
async fn import_counts_rows_without_an_employee_number() {
    let h = harness_with(Some("sqlite::memory:")).await;
    let admin = login(&h.app, "admin", "admin-pw").await.unwrap();

    let (status, body) = post_file(&h.app, "/api/admin/import", &admin, "staff.csv", &sparse_csv()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!({ "inserted": 1, "updated": 0, "errors": 2 }));
}

#[tokio::test]
async fn uploaded_rows_missing_numbers_raise_one_alert_each() {
    let h = harness().await;
    let admin = login(&h.app, "admin", "admin-pw").await.unwrap();

    let (status, _) = post_file(&h.app, "/api/upload", &admin, "staff.csv", &sparse_csv()).await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = call(&h.app, "GET", "/api/notifications", &admin, None).await;
    let incomplete = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|n| n["kind"] == "incomplete_data")
        .count();
    assert_eq!(incomplete, 3);
}

#[tokio::test]
async fn charts_cover_crosstabs_and_average_age() {
    let h = harness().await;
    let cookie = login(&h.app, "admin", "admin-pw").await.unwrap();

    for uri in [
        "/api/charts/department?by=job_category",
        "/api/charts/average_age",
        "/api/charts/workplace",
    ] {
        let req = Request::get(uri)
            .header(header::COOKIE, &cookie)
            .body(Body::empty())
            .unwrap();
        let res = h.app.clone().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK, "{uri}");
        assert_eq!(res.headers()[header::CONTENT_TYPE], "image/svg+xml");
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        assert!(bytes.starts_with(b"<svg"), "{uri}");
    }

    let (status, _) = call(&h.app, "GET", "/api/charts/department?by=name", &cookie, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn admins_manage_employees_in_the_database() {
    let h = harness_with(Some("sqlite::memory:")).await;
    let admin = login(&h.app, "admin", "admin-pw").await.unwrap();

    let new = json!({ "name": "Huda", "employee_id": "3001", "national_id": "N3001" });
    let (status, _) = call(&h.app, "POST", "/api/admin/employees", &admin, Some(new.clone())).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = call(&h.app, "POST", "/api/admin/employees", &admin, Some(new)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let patch = json!({ "department": "HR" });
    let (status, body) = call(&h.app, "PUT", "/api/admin/employees/3001", &admin, Some(patch)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["department"], "HR");

    let (status, _) = call(&h.app, "DELETE", "/api/admin/employees/3001", &admin, None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = call(&h.app, "DELETE", "/api/admin/employees/3001", &admin, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "not_found");
}
