//! Page-level tests driving the router with `oneshot`

use axum::{
    body::Body,
    http::{header, Request, Response, StatusCode},
    Router,
};
use chrono::Utc;
use http_body_util::BodyExt;
use ptra_common::config::AppConfig;
use ptra_common::db::{self, activities, images, projects, users, ActivityKind, NewUser, ProjectInput};
use ptra_common::password::hash_password;
use ptra_common::Role;
use ptra_web::session::{SessionUser, SESSION_COOKIE};
use ptra_web::AppState;
use tempfile::TempDir;
use tower::util::ServiceExt;

struct TestApp {
    _dir: TempDir,
    state: AppState,
    router: Router,
}

impl TestApp {
    async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    async fn with_config(tweak: impl FnOnce(&mut AppConfig)) -> Self {
        let dir = TempDir::new().unwrap();
        let mut config = AppConfig::with_root(dir.path());
        tweak(&mut config);
        config.ensure_directories().unwrap();

        let pool = db::init_database(&config.database_path()).await.unwrap();
        let state = AppState::new(pool, config);
        let router = ptra_web::build_router(state.clone());
        Self {
            _dir: dir,
            state,
            router,
        }
    }

    async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    async fn add_user(&self, username: &str, role: Role) -> SessionUser {
        let id = users::create_user(
            &self.state.db,
            &NewUser {
                username: username.to_string(),
                email: format!("{}@example.com", username),
                full_name: format!("{} Person", username),
                role,
                password_hash: hash_password("secret1").unwrap(),
                is_active: true,
            },
        )
        .await
        .unwrap();

        SessionUser {
            id,
            username: username.to_string(),
            email: format!("{}@example.com", username),
            full_name: format!("{} Person", username),
            role,
        }
    }

    /// Logged-in session for `user`: (cookie header value, csrf token)
    async fn login_as(&self, user: SessionUser) -> (String, String) {
        let now = Utc::now();
        let id = self.state.sessions.create_authenticated(user, now).await;
        let token = self
            .state
            .sessions
            .issue_csrf(&id, now, self.state.config.csrf_token_ttl())
            .await;
        (format!("{}={}", SESSION_COOKIE, id), token)
    }

    async fn add_project(&self, name: &str, created_by: i64) -> i64 {
        let input = ProjectInput {
            project_name: name.to_string(),
            contract_value_ngn: 1_000_000.0,
            ..Default::default()
        };
        projects::create_project(&self.state.db, &input, created_by)
            .await
            .unwrap()
    }
}

fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

fn post_form(uri: &str, cookie: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::COOKIE, cookie)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

const BOUNDARY: &str = "ptra-test-boundary";

fn post_multipart(uri: &str, cookie: &str, token: &str, filename: &str, data: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"csrf_token\"\r\n\r\n{t}\r\n\
             --{b}\r\nContent-Disposition: form-data; name=\"caption\"\r\n\r\nSite visit\r\n\
             --{b}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"{f}\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n",
            b = BOUNDARY,
            t = token,
            f = filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::COOKIE, cookie)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

fn location(response: &Response<Body>) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

fn session_cookie_from(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with(SESSION_COOKIE))
        .and_then(|v| v.split(';').next())
        .map(str::to_string)
}

async fn body_text(response: Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn csrf_from_html(html: &str) -> String {
    let marker = r#"name="csrf_token" value=""#;
    let start = html.find(marker).expect("csrf field present") + marker.len();
    let end = html[start..].find('"').unwrap();
    html[start..start + end].to_string()
}

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([200, 100, 50]));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = TestApp::new().await;

    let response = app.send(get("/health", None)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["module"], "ptra-web");
    assert_eq!(json["build"], ptra_web::BUILD_ID);
}

#[tokio::test]
async fn test_unauthenticated_redirects_to_login() {
    let app = TestApp::new().await;

    for uri in ["/admin/dashboard", "/admin/projects", "/admin/reports", "/projects/1"] {
        let response = app.send(get(uri, None)).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "{}", uri);
        assert_eq!(location(&response), "/?error=session_expired", "{}", uri);
    }
}

#[tokio::test]
async fn test_non_numeric_ids_redirect_to_not_found() {
    let app = TestApp::new().await;

    let response = app.send(get("/projects/abc", None)).await;
    assert_eq!(location(&response), "/?error=session_expired");

    let admin = app.add_user("root", Role::Admin).await;
    let (cookie, _) = app.login_as(admin).await;

    for uri in [
        "/projects/abc",
        "/projects/0",
        "/admin/projects/abc/edit",
        "/admin/projects/abc/progress",
        "/admin/projects/abc/activities?type=monthly",
    ] {
        let response = app.send(get(uri, Some(&cookie))).await;
        assert_eq!(location(&response), "/admin/dashboard?error=project_not_found", "{}", uri);
    }

    let response = app.send(get("/admin/users/abc/edit", Some(&cookie))).await;
    assert_eq!(location(&response), "/admin/users?error=user_not_found");
}

#[tokio::test]
async fn test_sessions_created_only_when_needed() {
    let app = TestApp::new().await;

    for uri in ["/health", "/uploads/missing.png", "/admin/dashboard"] {
        let response = app.send(get(uri, None)).await;
        assert!(session_cookie_from(&response).is_none(), "{}", uri);
    }
    assert!(app.state.sessions.is_empty().await);

    // The login form needs a CSRF token, so it starts a session
    let response = app.send(get("/", None)).await;
    let cookie = session_cookie_from(&response).expect("session cookie issued");
    assert_eq!(app.state.sessions.len().await, 1);

    // Resuming it issues no new cookie
    let response = app.send(get("/", Some(&cookie))).await;
    assert!(session_cookie_from(&response).is_none());
    assert_eq!(app.state.sessions.len().await, 1);
}

#[tokio::test]
async fn test_viewer_denied_management_pages() {
    let app = TestApp::new().await;
    let viewer = app.add_user("victor", Role::Viewer).await;
    let (cookie, _) = app.login_as(viewer).await;

    for uri in ["/admin/projects/new", "/admin/users", "/admin/users/new"] {
        let response = app.send(get(uri, Some(&cookie))).await;
        assert_eq!(
            location(&response),
            "/admin/dashboard?error=insufficient_permissions",
            "{}",
            uri
        );
    }

    // Read-only pages stay open to viewers
    let response = app.send(get("/admin/projects", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_pm_denied_admin_pages() {
    let app = TestApp::new().await;
    let pm = app.add_user("pat", Role::Pm).await;
    let (cookie, token) = app.login_as(pm).await;
    let project_id = app.add_project("Substation", 1).await;

    let response = app.send(get("/admin/users", Some(&cookie))).await;
    assert_eq!(location(&response), "/admin/dashboard?error=insufficient_permissions");

    let body = format!("csrf_token={}&project_id={}", token, project_id);
    let response = app.send(post_form("/admin/projects/delete", &cookie, &body)).await;
    assert_eq!(location(&response), "/admin/dashboard?error=insufficient_permissions");
    assert!(projects::find_active_project(&app.state.db, project_id)
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn test_login_flow() {
    let app = TestApp::new().await;
    app.add_user("alice", Role::Pm).await;

    let response = app.send(get("/", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let anon_cookie = session_cookie_from(&response).expect("session cookie issued");
    let token = csrf_from_html(&body_text(response).await);

    let body = format!("csrf_token={}&username=alice&password=secret1", token);
    let response = app.send(post_form("/", &anon_cookie, &body)).await;
    assert_eq!(location(&response), "/admin/dashboard");
    let user_cookie = session_cookie_from(&response).expect("rotated session cookie");
    assert_ne!(user_cookie, anon_cookie);

    let response = app.send(get("/admin/dashboard", Some(&user_cookie))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("alice Person"));

    // The pre-login session id no longer authenticates
    let response = app.send(get("/admin/dashboard", Some(&anon_cookie))).await;
    assert_eq!(location(&response), "/?error=session_expired");

    let response = app.send(get("/logout", Some(&user_cookie))).await;
    assert_eq!(location(&response), "/?message=logged_out");
    let response = app.send(get("/admin/dashboard", Some(&user_cookie))).await;
    assert_eq!(location(&response), "/?error=session_expired");
}

#[tokio::test]
async fn test_login_rejects_bad_credentials() {
    let app = TestApp::new().await;
    app.add_user("alice", Role::Pm).await;

    let response = app.send(get("/", None)).await;
    let cookie = session_cookie_from(&response).unwrap();
    let token = csrf_from_html(&body_text(response).await);

    let body = format!("csrf_token={}&username=alice&password=wrong", token);
    let response = app.send(post_form("/", &cookie, &body)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("Invalid username or password."));
}

#[tokio::test]
async fn test_csrf_mismatch_rejected() {
    let app = TestApp::new().await;
    app.add_user("alice", Role::Pm).await;

    let response = app.send(get("/", None)).await;
    let cookie = session_cookie_from(&response).unwrap();

    let body = "csrf_token=forged&username=alice&password=secret1";
    let response = app.send(post_form("/", &cookie, body)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response)
        .await
        .contains("Security token validation failed."));
}

#[tokio::test]
async fn test_create_and_soft_delete_project() {
    let app = TestApp::new().await;
    let admin = app.add_user("root", Role::Admin).await;
    let (cookie, token) = app.login_as(admin).await;

    let body = format!(
        "csrf_token={}&project_name=Ring+Road&contract_value_ngn=2%2C500%2C000&contract_value_usd=1600&contractual_completion=2026-03-31",
        token
    );
    let response = app.send(post_form("/admin/projects/new", &cookie, &body)).await;
    let target = location(&response);
    assert!(target.starts_with("/projects/"), "{}", target);
    assert!(target.ends_with("?success=project_created"), "{}", target);

    let overviews = projects::list_project_overviews(&app.state.db).await.unwrap();
    assert_eq!(overviews.len(), 1);
    let project_id = overviews[0].id;
    assert_eq!(overviews[0].contract_value_ngn, 2_500_000.0);
    assert_eq!(overviews[0].overall_progress(), 0.0);

    let response = app
        .send(get(&format!("/projects/{}", project_id), Some(&cookie)))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("Ring Road"));

    let body = format!("csrf_token={}&project_id={}", token, project_id);
    let response = app.send(post_form("/admin/projects/delete", &cookie, &body)).await;
    assert_eq!(location(&response), "/admin/projects?success=project_deleted");

    let response = app
        .send(get(&format!("/projects/{}", project_id), Some(&cookie)))
        .await;
    assert_eq!(location(&response), "/admin/dashboard?error=project_not_found");
    let response = app
        .send(get(&format!("/admin/projects/{}/edit", project_id), Some(&cookie)))
        .await;
    assert_eq!(location(&response), "/admin/dashboard?error=project_not_found");

    let response = app.send(get("/admin/projects", Some(&cookie))).await;
    assert!(!body_text(response).await.contains("Ring Road"));
}

#[tokio::test]
async fn test_project_validation_rerenders_form() {
    let app = TestApp::new().await;
    let pm = app.add_user("pat", Role::Pm).await;
    let (cookie, token) = app.login_as(pm).await;

    let body = format!("csrf_token={}&project_name=&contract_value_ngn=0", token);
    let response = app.send(post_form("/admin/projects/new", &cookie, &body)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("Project name is required."));
    assert!(html.contains("Contract value (NGN) must be greater than zero."));
    assert!(projects::list_project_overviews(&app.state.db).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_progress_update_clamps() {
    let app = TestApp::new().await;
    let pm = app.add_user("pat", Role::Pm).await;
    let pm_id = pm.id;
    let (cookie, token) = app.login_as(pm).await;
    let project_id = app.add_project("Dam", pm_id).await;

    let body = format!(
        "csrf_token={}&engineering_design=150&procurement=100&civil=100&installation=100&testing_commissioning=-5&actual_progress=40",
        token
    );
    let uri = format!("/admin/projects/{}/progress", project_id);
    let response = app.send(post_form(&uri, &cookie, &body)).await;
    assert_eq!(
        location(&response),
        format!("/projects/{}?success=progress_updated", project_id)
    );

    let record = ptra_common::db::progress::get_progress(&app.state.db, project_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.engineering_design, 100.0);
    assert_eq!(record.testing_commissioning, 0.0);
    assert_eq!(record.actual_progress, 40.0);
    assert!((record.phases().overall() - 95.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_activity_serials_increment() {
    let app = TestApp::new().await;
    let pm = app.add_user("pat", Role::Pm).await;
    let pm_id = pm.id;
    let (cookie, token) = app.login_as(pm).await;
    let project_id = app.add_project("Pipeline", pm_id).await;
    let uri = format!("/admin/projects/{}/activities?type=monthly", project_id);

    for description in ["Survey", "Trenching"] {
        let body = format!(
            "csrf_token={}&action=add&activity_description={}&duration_weeks=3",
            token, description
        );
        let response = app.send(post_form(&uri, &cookie, &body)).await;
        assert_eq!(location(&response), format!("{}&success=activity_added", uri));
    }

    let month = ActivityKind::Monthly.month_year(chrono::Local::now().date_naive());
    let list = activities::list_activities(&app.state.db, ActivityKind::Monthly, project_id, &month)
        .await
        .unwrap();
    let serials: Vec<i64> = list.iter().map(|a| a.serial_number).collect();
    assert_eq!(serials, vec![1, 2]);

    // Missing duration is rejected without inserting
    let body = format!("csrf_token={}&action=add&activity_description=Backfill", token);
    let response = app.send(post_form(&uri, &cookie, &body)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response)
        .await
        .contains("Activity description and duration are required."));

    let body = format!("csrf_token={}&action=delete&activity_id={}", token, list[0].id);
    let response = app.send(post_form(&uri, &cookie, &body)).await;
    assert_eq!(location(&response), format!("{}&success=activity_deleted", uri));
}

#[tokio::test]
async fn test_planned_activities_use_next_month() {
    let app = TestApp::new().await;
    let pm = app.add_user("pat", Role::Pm).await;
    let pm_id = pm.id;
    let (cookie, token) = app.login_as(pm).await;
    let project_id = app.add_project("Pipeline", pm_id).await;
    let uri = format!("/admin/projects/{}/activities?type=planned", project_id);

    let body = format!(
        "csrf_token={}&action=add&activity_description=Tie-in&duration_weeks=2&responsible_party=Contractor&remarks=Weather+permitting",
        token
    );
    app.send(post_form(&uri, &cookie, &body)).await;

    let next = ActivityKind::Planned.month_year(chrono::Local::now().date_naive());
    let list = activities::list_activities(&app.state.db, ActivityKind::Planned, project_id, &next)
        .await
        .unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].responsible_party.as_deref(), Some("Contractor"));
}

#[tokio::test]
async fn test_upload_rejects_disallowed_extension() {
    let app = TestApp::new().await;
    let pm = app.add_user("pat", Role::Pm).await;
    let pm_id = pm.id;
    let (cookie, token) = app.login_as(pm).await;
    let project_id = app.add_project("Depot", pm_id).await;

    let uri = format!("/projects/{}/images", project_id);
    let response = app
        .send(post_multipart(&uri, &cookie, &token, "notes.txt", b"hello"))
        .await;
    let target = location(&response);
    assert!(
        target.starts_with(&format!("/projects/{}?error=Invalid%20file%20type", project_id)),
        "{}",
        target
    );

    assert!(images::list_images(&app.state.db, project_id).await.unwrap().is_empty());
    let stored = std::fs::read_dir(app.state.config.upload_dir()).unwrap().count();
    assert_eq!(stored, 0);
}

#[tokio::test]
async fn test_upload_rejects_oversized_file() {
    let app = TestApp::with_config(|config| config.uploads.max_file_size = 1024).await;
    let pm = app.add_user("pat", Role::Pm).await;
    let pm_id = pm.id;
    let (cookie, token) = app.login_as(pm).await;
    let project_id = app.add_project("Depot", pm_id).await;

    let uri = format!("/projects/{}/images", project_id);
    let response = app
        .send(post_multipart(&uri, &cookie, &token, "big.png", &vec![0u8; 4096]))
        .await;
    let target = location(&response);
    assert!(target.contains("error=File%20size%20exceeds"), "{}", target);
    assert!(images::list_images(&app.state.db, project_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_upload_stores_and_downsamples() {
    let app = TestApp::with_config(|config| {
        config.uploads.max_width = 40;
        config.uploads.max_height = 30;
    })
    .await;
    let pm = app.add_user("pat", Role::Pm).await;
    let pm_id = pm.id;
    let (cookie, token) = app.login_as(pm).await;
    let project_id = app.add_project("Depot", pm_id).await;

    let uri = format!("/projects/{}/images", project_id);
    let response = app
        .send(post_multipart(&uri, &cookie, &token, "site.PNG", &png_bytes(200, 100)))
        .await;
    assert_eq!(
        location(&response),
        format!("/projects/{}?success=image_uploaded", project_id)
    );

    let list = images::list_images(&app.state.db, project_id).await.unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].image_caption.as_deref(), Some("Site visit"));
    assert!(list[0].image_filename.ends_with(".png"));

    let path = app.state.config.upload_dir().join(&list[0].image_filename);
    let stored = image::open(&path).unwrap();
    assert_eq!((stored.width(), stored.height()), (40, 20));

    let response = app
        .send(get(&format!("/uploads/{}", list[0].image_filename), None))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_admin_cannot_deactivate_self() {
    let app = TestApp::new().await;
    let admin = app.add_user("root", Role::Admin).await;
    let admin_id = admin.id;
    let (cookie, token) = app.login_as(admin).await;

    let body = format!("csrf_token={}&user_id={}", token, admin_id);
    let response = app.send(post_form("/admin/users/toggle", &cookie, &body)).await;
    assert_eq!(location(&response), "/admin/users?error=cannot_deactivate_self");

    let me = users::find_user(&app.state.db, admin_id).await.unwrap().unwrap();
    assert!(me.is_active);
}

#[tokio::test]
async fn test_deactivation_ends_target_sessions() {
    let app = TestApp::new().await;
    let admin = app.add_user("root", Role::Admin).await;
    let viewer = app.add_user("victor", Role::Viewer).await;
    let viewer_id = viewer.id;
    let (admin_cookie, token) = app.login_as(admin).await;
    let (viewer_cookie, _) = app.login_as(viewer).await;

    let body = format!("csrf_token={}&user_id={}", token, viewer_id);
    let response = app.send(post_form("/admin/users/toggle", &admin_cookie, &body)).await;
    assert_eq!(location(&response), "/admin/users?success=user_deactivated");

    let response = app.send(get("/admin/dashboard", Some(&viewer_cookie))).await;
    assert_eq!(location(&response), "/?error=session_expired");

    let response = app.send(post_form("/admin/users/toggle", &admin_cookie, &body)).await;
    assert_eq!(location(&response), "/admin/users?success=user_activated");
}

#[tokio::test]
async fn test_create_user_rejects_duplicate() {
    let app = TestApp::new().await;
    let admin = app.add_user("root", Role::Admin).await;
    let (cookie, token) = app.login_as(admin).await;

    let body = format!(
        "csrf_token={}&username=jdoe&email=jdoe%40example.com&full_name=Jane+Doe&role=pm&password=secret1&confirm_password=secret1&is_active=1",
        token
    );
    let response = app.send(post_form("/admin/users/new", &cookie, &body)).await;
    assert_eq!(location(&response), "/admin/users?success=user_created");

    let response = app.send(post_form("/admin/users/new", &cookie, &body)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("Username or email already exists."));
    assert_eq!(users::count_users(&app.state.db).await.unwrap(), 2);
}

#[tokio::test]
async fn test_pm_cannot_change_own_role_via_account() {
    let app = TestApp::new().await;
    let pm = app.add_user("pat", Role::Pm).await;
    let pm_id = pm.id;
    let (cookie, token) = app.login_as(pm).await;

    let body = format!(
        "csrf_token={}&username=pat&email=pat%40example.com&full_name=Pat+Person&role=admin&is_active=1",
        token
    );
    let response = app.send(post_form("/admin/account", &cookie, &body)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("You cannot change your own role."));

    let body = format!(
        "csrf_token={}&username=pat&email=pat%40example.com&full_name=Patricia&role=pm&is_active=1",
        token
    );
    let response = app.send(post_form("/admin/account", &cookie, &body)).await;
    assert_eq!(location(&response), "/admin/account?success=account_updated");

    let me = users::find_user(&app.state.db, pm_id).await.unwrap().unwrap();
    assert_eq!(me.full_name, "Patricia");
    assert_eq!(me.role, Role::Pm);
}
