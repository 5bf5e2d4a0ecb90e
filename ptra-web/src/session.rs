//! Server-side sessions
//!
//! Sessions live in memory, keyed by a random id carried in the
//! `ptra_session` cookie. A session holds the logged-in user (if any) and
//! the CSRF token slot. A logged-in session idle for longer than the
//! configured timeout is logged out on its next request.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Duration, Utc};
use cookie::{Cookie, SameSite};
use ptra_common::csrf::{self, CsrfToken};
use ptra_common::db::User;
use ptra_common::Role;
use rand::RngCore;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::error::PageError;
use crate::AppState;

pub const SESSION_COOKIE: &str = "ptra_session";

const SESSION_ID_BYTES: usize = 32;

/// Identity of the logged-in user, captured at login
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUser {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub role: Role,
}

impl From<&User> for SessionUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            role: user.role,
        }
    }
}

#[derive(Debug, Clone)]
struct Session {
    user: Option<SessionUser>,
    csrf: Option<CsrfToken>,
    last_activity: DateTime<Utc>,
}

impl Session {
    fn new(now: DateTime<Utc>) -> Self {
        Self {
            user: None,
            csrf: None,
            last_activity: now,
        }
    }
}

/// Result of looking up a session for an incoming request
#[derive(Debug, Clone)]
pub struct SessionLookup {
    pub user: Option<SessionUser>,
    /// The session was logged in but sat idle past the timeout
    pub timed_out: bool,
}

fn new_session_id() -> String {
    let mut bytes = [0u8; SESSION_ID_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Shared in-memory session table
#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<HashMap<String, Session>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start an anonymous session and return its id
    pub async fn create(&self, now: DateTime<Utc>) -> String {
        let id = new_session_id();
        self.inner.write().await.insert(id.clone(), Session::new(now));
        id
    }

    /// Start a logged-in session and return its id
    pub async fn create_authenticated(&self, user: SessionUser, now: DateTime<Utc>) -> String {
        let id = new_session_id();
        let mut session = Session::new(now);
        session.user = Some(user);
        self.inner.write().await.insert(id.clone(), session);
        id
    }

    /// Look up and touch a session. `None` when the id is unknown.
    pub async fn touch(
        &self,
        id: &str,
        now: DateTime<Utc>,
        idle_timeout: Duration,
    ) -> Option<SessionLookup> {
        let mut sessions = self.inner.write().await;
        let session = sessions.get_mut(id)?;

        let mut timed_out = false;
        if session.user.is_some() && now - session.last_activity > idle_timeout {
            session.user = None;
            session.csrf = None;
            timed_out = true;
        }
        session.last_activity = now;

        Some(SessionLookup {
            user: session.user.clone(),
            timed_out,
        })
    }

    /// Replace `old_id` with a fresh logged-in session (id rotation)
    pub async fn login(&self, old_id: &str, user: SessionUser, now: DateTime<Utc>) -> String {
        self.inner.write().await.remove(old_id);
        self.create_authenticated(user, now).await
    }

    pub async fn destroy(&self, id: &str) {
        self.inner.write().await.remove(id);
    }

    /// Refresh the cached identity of every session belonging to `user.id`
    pub async fn update_user(&self, user: &SessionUser) {
        let mut sessions = self.inner.write().await;
        for session in sessions.values_mut() {
            if session.user.as_ref().is_some_and(|u| u.id == user.id) {
                session.user = Some(user.clone());
            }
        }
    }

    /// Log out every session of a user (used on deactivation)
    pub async fn logout_user(&self, user_id: i64) {
        let mut sessions = self.inner.write().await;
        sessions.retain(|_, session| session.user.as_ref().map_or(true, |u| u.id != user_id));
    }

    /// Current CSRF token of a session, regenerated when missing or expired
    pub async fn issue_csrf(&self, id: &str, now: DateTime<Utc>, ttl: Duration) -> String {
        let mut sessions = self.inner.write().await;
        match sessions.get_mut(id) {
            Some(session) => csrf::issue_token(&mut session.csrf, now, ttl),
            None => String::new(),
        }
    }

    pub async fn verify_csrf(
        &self,
        id: &str,
        provided: &str,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> bool {
        let sessions = self.inner.read().await;
        let slot = sessions.get(id).and_then(|s| s.csrf.as_ref());
        csrf::verify_token(slot, provided, now, ttl)
    }

    /// Drop sessions idle for longer than `idle_timeout`. Returns the number removed.
    pub async fn purge_expired(&self, now: DateTime<Utc>, idle_timeout: Duration) -> usize {
        let mut sessions = self.inner.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| now - session.last_activity <= idle_timeout);
        before - sessions.len()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Per-request session handle, inserted into request extensions.
///
/// The stored session is created on first need (CSRF token or login), so
/// requests that never render a form leave nothing behind in the store.
#[derive(Clone)]
pub struct RequestContext {
    pub user: Option<SessionUser>,
    session_id: Arc<Mutex<Option<String>>>,
    store: SessionStore,
    csrf_ttl: Duration,
}

impl RequestContext {
    pub fn require_login(&self) -> Result<&SessionUser, PageError> {
        self.user.as_ref().ok_or(PageError::Unauthenticated)
    }

    pub fn require_role(&self, required: Role) -> Result<&SessionUser, PageError> {
        let user = self.require_login()?;
        if user.role.satisfies(required) {
            Ok(user)
        } else {
            warn!(
                "Permission denied: user '{}' ({}) needs {}",
                user.username, user.role, required
            );
            Err(PageError::Forbidden)
        }
    }

    /// Id of the stored session, if this request has one
    pub async fn session_id(&self) -> Option<String> {
        self.session_id.lock().await.clone()
    }

    async fn ensure_session(&self) -> String {
        let mut slot = self.session_id.lock().await;
        match slot.as_ref() {
            Some(id) => id.clone(),
            None => {
                let id = self.store.create(Utc::now()).await;
                *slot = Some(id.clone());
                id
            }
        }
    }

    pub async fn csrf_token(&self) -> String {
        let id = self.ensure_session().await;
        self.store.issue_csrf(&id, Utc::now(), self.csrf_ttl).await
    }

    pub async fn verify_csrf(&self, provided: &str) -> bool {
        let valid = match self.session_id().await {
            Some(id) => {
                self.store
                    .verify_csrf(&id, provided, Utc::now(), self.csrf_ttl)
                    .await
            }
            None => false,
        };
        if !valid {
            warn!(
                "CSRF validation failed for {}",
                self.user.as_ref().map_or("anonymous", |u| u.username.as_str())
            );
        }
        valid
    }

    /// Rotate into a logged-in session; returns the `Set-Cookie` value
    pub async fn login(&self, user: SessionUser) -> HeaderValue {
        let mut slot = self.session_id.lock().await;
        let now = Utc::now();
        let id = match slot.take() {
            Some(old_id) => self.store.login(&old_id, user, now).await,
            None => self.store.create_authenticated(user, now).await,
        };
        let cookie = session_cookie(&id);
        *slot = Some(id);
        cookie
    }

    /// Destroy the session; returns a `Set-Cookie` value clearing the cookie
    pub async fn logout(&self) -> HeaderValue {
        if let Some(id) = self.session_id.lock().await.take() {
            self.store.destroy(&id).await;
        }
        removal_cookie()
    }
}

fn cookie_header(cookie: Cookie<'_>) -> HeaderValue {
    // Session ids are hex, so formatting never yields an invalid header
    HeaderValue::from_str(&cookie.to_string()).unwrap_or_else(|_| HeaderValue::from_static(""))
}

pub fn session_cookie(id: &str) -> HeaderValue {
    cookie_header(
        Cookie::build((SESSION_COOKIE, id.to_string()))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .build(),
    )
}

fn removal_cookie() -> HeaderValue {
    let mut cookie = Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build();
    cookie.make_removal();
    cookie_header(cookie)
}

/// Session id from the request's `Cookie` header(s)
pub fn session_id_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(|cookie| cookie.ok())
        .find(|cookie| cookie.name() == SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
}

fn sets_session_cookie(response: &Response) -> bool {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| v.starts_with(SESSION_COOKIE))
}

/// Attach a [`RequestContext`] to every request.
///
/// A cookie naming a live session is resumed; anything else starts the
/// request without a session. A `Set-Cookie` is added only when the
/// handler created one.
pub async fn session_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let now = Utc::now();
    let idle_timeout = state.config.session_timeout();

    let mut known_id = None;
    let mut user = None;
    if let Some(id) = session_id_from_headers(request.headers()) {
        if let Some(lookup) = state.sessions.touch(&id, now, idle_timeout).await {
            if lookup.timed_out {
                debug!("Session idle past timeout, logged out");
            }
            user = lookup.user;
            known_id = Some(id);
        }
    }

    let slot = Arc::new(Mutex::new(known_id.clone()));
    request.extensions_mut().insert(RequestContext {
        user,
        session_id: slot.clone(),
        store: state.sessions.clone(),
        csrf_ttl: state.config.csrf_token_ttl(),
    });

    let mut response = next.run(request).await;

    let current = slot.lock().await.clone();
    if let Some(id) = current {
        if known_id.as_deref() != Some(id.as_str()) && !sets_session_cookie(&response) {
            response
                .headers_mut()
                .append(header::SET_COOKIE, session_cookie(&id));
        }
    }

    response
}

/// Periodically drop idle sessions
pub fn spawn_purge_task(store: SessionStore, idle_timeout: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(300));
        loop {
            interval.tick().await;
            let removed = store.purge_expired(Utc::now(), idle_timeout).await;
            if removed > 0 {
                debug!("Purged {} idle sessions", removed);
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: i64, role: Role) -> SessionUser {
        SessionUser {
            id,
            username: format!("user{}", id),
            email: format!("user{}@example.com", id),
            full_name: format!("User {}", id),
            role,
        }
    }

    fn timeout() -> Duration {
        Duration::seconds(3600)
    }

    #[tokio::test]
    async fn test_unknown_session_is_none() {
        let store = SessionStore::new();
        assert!(store.touch("missing", Utc::now(), timeout()).await.is_none());
    }

    #[tokio::test]
    async fn test_idle_session_logged_out() {
        let store = SessionStore::new();
        let now = Utc::now();
        let id = store.create_authenticated(user(1, Role::Pm), now).await;

        let lookup = store.touch(&id, now + Duration::seconds(60), timeout()).await.unwrap();
        assert!(lookup.user.is_some());
        assert!(!lookup.timed_out);

        let later = now + Duration::seconds(60 + 3601);
        let lookup = store.touch(&id, later, timeout()).await.unwrap();
        assert!(lookup.user.is_none());
        assert!(lookup.timed_out);
    }

    #[tokio::test]
    async fn test_login_rotates_session_id() {
        let store = SessionStore::new();
        let now = Utc::now();
        let anon = store.create(now).await;

        let logged_in = store.login(&anon, user(1, Role::Viewer), now).await;
        assert_ne!(anon, logged_in);
        assert!(store.touch(&anon, now, timeout()).await.is_none());
        assert_eq!(
            store.touch(&logged_in, now, timeout()).await.unwrap().user.unwrap().id,
            1
        );
    }

    #[tokio::test]
    async fn test_csrf_bound_to_session() {
        let store = SessionStore::new();
        let now = Utc::now();
        let ttl = Duration::seconds(1800);
        let a = store.create(now).await;
        let b = store.create(now).await;

        let token = store.issue_csrf(&a, now, ttl).await;
        assert!(store.verify_csrf(&a, &token, now, ttl).await);
        assert!(!store.verify_csrf(&b, &token, now, ttl).await);
        assert!(!store.verify_csrf(&a, &token, now + Duration::seconds(1801), ttl).await);
    }

    #[tokio::test]
    async fn test_purge_and_logout_user() {
        let store = SessionStore::new();
        let now = Utc::now();
        store.create(now - Duration::seconds(7200)).await;
        let keep = store.create_authenticated(user(2, Role::Admin), now).await;
        store.create_authenticated(user(3, Role::Pm), now).await;

        assert_eq!(store.purge_expired(now, timeout()).await, 1);
        assert_eq!(store.len().await, 2);

        store.logout_user(3).await;
        assert_eq!(store.len().await, 1);
        assert!(store.touch(&keep, now, timeout()).await.is_some());
    }

    #[tokio::test]
    async fn test_context_creates_session_on_demand() {
        let store = SessionStore::new();
        let ctx = RequestContext {
            user: None,
            session_id: Arc::new(Mutex::new(None)),
            store: store.clone(),
            csrf_ttl: Duration::seconds(1800),
        };

        assert!(!ctx.verify_csrf("anything").await);
        assert!(store.is_empty().await);

        let token = ctx.csrf_token().await;
        assert_eq!(store.len().await, 1);
        assert!(ctx.verify_csrf(&token).await);
        assert_eq!(ctx.csrf_token().await, token);
        assert_eq!(store.len().await, 1);

        ctx.logout().await;
        assert!(store.is_empty().await);
        assert!(ctx.session_id().await.is_none());
    }

    #[test]
    fn test_cookie_parsing() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; ptra_session=abc123; other=1"),
        );
        assert_eq!(session_id_from_headers(&headers).as_deref(), Some("abc123"));

        let cookie = session_cookie("abc123");
        let text = cookie.to_str().unwrap();
        assert!(text.starts_with("ptra_session=abc123"));
        assert!(text.contains("HttpOnly"));
        assert!(text.contains("SameSite=Lax"));
    }
}
