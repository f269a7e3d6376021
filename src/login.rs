//! Auth Gate: login ids with argon2 password digests, the bootstrap
//! administrator, and the cookie-based session handlers.

use crate::error::{DashboardError, Result};
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{NaiveDateTime, Utc};
use log::{debug, info, warn};
use serde::Serialize;
use sqlx::SqlitePool;
use uuid::Uuid;

#[cfg(feature = "web")]
use crate::app::{AppState, ok, ok_message};
#[cfg(feature = "web")]
use crate::session::{SessionContext, expiry_after};
#[cfg(feature = "web")]
use axum::{
    Extension, Form, Json,
    extract::{Path, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{Html, IntoResponse, Redirect, Response},
};
#[cfg(feature = "web")]
use serde::Deserialize;
#[cfg(feature = "web")]
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "session";

const USERS_SCHEMA: &str = "CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    login_id TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    is_admin INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
)";

/// The authenticated identity carried by a session
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub login_id: String,
    pub is_admin: bool,
}

/// A user as listed in the admin panel; never carries the digest
#[derive(Clone, Debug, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct UserSummary {
    pub login_id: String,
    pub is_admin: bool,
    pub created_at: NaiveDateTime,
}

#[derive(sqlx::FromRow)]
struct UserRow {
    login_id: String,
    password_hash: String,
    is_admin: bool,
}

/// Credential check and user administration over the `users` table
#[derive(Clone, Debug)]
pub struct AuthGate {
    pool: SqlitePool,
    bootstrap_id: String,
}

impl AuthGate {
    /// Create the users table and make sure the bootstrap administrator
    /// exists.
    ///
    /// When `bootstrap_password` is `None` and the administrator has to be
    /// created, a random password is generated and logged once.
    pub async fn new(pool: SqlitePool, bootstrap_id: &str, bootstrap_password: Option<&str>) -> Result<Self> {
        let bootstrap_id = bootstrap_id.trim();
        if bootstrap_id.is_empty() {
            return Err(DashboardError::validation("bootstrap admin id must not be empty"));
        }
        sqlx::query(USERS_SCHEMA).execute(&pool).await?;
        let gate = AuthGate {
            pool,
            bootstrap_id: bootstrap_id.to_string(),
        };
        gate.ensure_bootstrap(bootstrap_password).await?;
        Ok(gate)
    }

    async fn ensure_bootstrap(&self, password: Option<&str>) -> Result<()> {
        if self.find(&self.bootstrap_id).await?.is_some() {
            return Ok(());
        }
        let password = match password {
            Some(p) => p.to_string(),
            None => {
                let generated = Uuid::new_v4().simple().to_string();
                warn!(
                    "Created bootstrap admin `{}` with generated password {}; change it after first login",
                    self.bootstrap_id, generated
                );
                generated
            }
        };
        self.insert(&self.bootstrap_id, &password, true).await?;
        info!("Bootstrap admin `{}` ready", self.bootstrap_id);
        Ok(())
    }

    pub fn bootstrap_id(&self) -> &str {
        &self.bootstrap_id
    }

    async fn find(&self, login_id: &str) -> Result<Option<UserRow>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT login_id, password_hash, is_admin FROM users WHERE login_id = ?",
        )
        .bind(login_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn insert(&self, login_id: &str, password: &str, is_admin: bool) -> Result<()> {
        let hash = hash_password(password)?;
        sqlx::query("INSERT INTO users (login_id, password_hash, is_admin, created_at) VALUES (?, ?, ?, ?)")
            .bind(login_id)
            .bind(hash)
            .bind(is_admin)
            .bind(Utc::now().naive_utc())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Check a credential pair. Unknown ids and wrong passwords fail the same way.
    pub async fn verify(&self, login_id: &str, password: &str) -> Result<Principal> {
        let login_id = login_id.trim();
        let Some(user) = self.find(login_id).await? else {
            warn!("Login rejected for unknown id `{}`", login_id);
            return Err(DashboardError::Auth);
        };
        if !verify_password(password, &user.password_hash)? {
            warn!("Login rejected for `{}`: wrong password", login_id);
            return Err(DashboardError::Auth);
        }
        Ok(Principal {
            login_id: user.login_id,
            is_admin: user.is_admin,
        })
    }

    pub async fn add_user(&self, login_id: &str, password: &str, is_admin: bool) -> Result<()> {
        let login_id = login_id.trim();
        if login_id.is_empty() || password.is_empty() {
            return Err(DashboardError::validation("login id and password are required"));
        }
        if self.find(login_id).await?.is_some() {
            return Err(DashboardError::DuplicateKey(format!("user `{login_id}` already exists")));
        }
        self.insert(login_id, password, is_admin).await?;
        info!("Added user `{}` (admin: {})", login_id, is_admin);
        Ok(())
    }

    pub async fn list_users(&self) -> Result<Vec<UserSummary>> {
        let users = sqlx::query_as::<_, UserSummary>(
            "SELECT login_id, is_admin, created_at FROM users ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    /// Remove a user; the bootstrap administrator can never be removed
    pub async fn delete_user(&self, login_id: &str) -> Result<()> {
        let login_id = login_id.trim();
        if login_id == self.bootstrap_id {
            return Err(DashboardError::Forbidden(format!(
                "the bootstrap admin `{login_id}` cannot be deleted"
            )));
        }
        let deleted = sqlx::query("DELETE FROM users WHERE login_id = ?")
            .bind(login_id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        if deleted == 0 {
            return Err(DashboardError::NotFound(format!("user `{login_id}`")));
        }
        info!("Deleted user `{}`", login_id);
        Ok(())
    }

    /// Replace a password after checking the current one
    pub async fn change_password(&self, login_id: &str, old: &str, new: &str) -> Result<()> {
        if new.is_empty() {
            return Err(DashboardError::validation("the new password must not be empty"));
        }
        let principal = self.verify(login_id, old).await?;
        sqlx::query("UPDATE users SET password_hash = ? WHERE login_id = ?")
            .bind(hash_password(new)?)
            .bind(&principal.login_id)
            .execute(&self.pool)
            .await?;
        info!("Password changed for `{}`", principal.login_id);
        Ok(())
    }
}

/// Hash a password with a fresh random salt
fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| DashboardError::validation(format!("password hashing failed: {e}")))
}

/// `Ok(false)` on mismatch; a digest that cannot be parsed is an error
fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| DashboardError::validation(format!("invalid password hash format: {e}")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Session id of an authenticated request, set by [`require_auth`]
#[cfg(feature = "web")]
#[derive(Clone, Debug)]
pub struct SessionId(pub String);

#[cfg(feature = "web")]
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub login_id: String,
    pub password: String,
}

#[cfg(feature = "web")]
#[derive(Debug, Deserialize)]
pub struct NewUser {
    pub login_id: String,
    pub password: String,
    #[serde(default)]
    pub is_admin: bool,
}

#[cfg(feature = "web")]
#[derive(Debug, Deserialize)]
pub struct PasswordChange {
    pub old_password: String,
    pub new_password: String,
}

#[cfg(feature = "web")]
pub async fn serve_login_page() -> Html<&'static str> {
    Html(include_str!("static/login.html"))
}

/// Check the submitted credentials and open a session.
///
/// The new session starts on the process-wide default record store.
#[cfg(feature = "web")]
pub async fn handle_login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Response {
    match state.auth.verify(&form.login_id, &form.password).await {
        Ok(principal) => {
            info!("User `{}` logged in", principal.login_id);
            let (store, source) = state.default_data();
            let context = SessionContext::new(
                principal,
                store,
                source,
                state.config.page_size,
                expiry_after(state.config.session_hours),
            );
            let purged = state.sessions.purge_expired().await;
            if purged > 0 {
                debug!("Dropped {} expired sessions", purged);
            }
            let session_id = state.sessions.insert(context).await;
            let cookie = Cookie::build((SESSION_COOKIE, session_id))
                .path("/")
                .http_only(true)
                .same_site(SameSite::Lax);
            (jar.add(cookie), Redirect::to("/")).into_response()
        }
        Err(DashboardError::Auth) => Redirect::to("/login?error=1").into_response(),
        Err(e) => {
            log::error!("Login failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Authentication error").into_response()
        }
    }
}

#[cfg(feature = "web")]
pub async fn handle_logout(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Redirect) {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        state.sessions.remove(cookie.value()).await;
    }
    (
        jar.remove(Cookie::build(SESSION_COOKIE).path("/")),
        Redirect::to("/login"),
    )
}

/// Authentication middleware.
///
/// A live session puts its [`SessionId`] and [`Principal`] into the request
/// extensions. Otherwise API calls get 401 and pages redirect to the login
/// form.
#[cfg(feature = "web")]
pub async fn require_auth(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        let id = cookie.value().to_string();
        if let Some(principal) = state.sessions.principal(&id).await {
            request.extensions_mut().insert(SessionId(id));
            request.extensions_mut().insert(principal);
            return next.run(request).await;
        }
    }
    if request.uri().path().starts_with("/api/") {
        DashboardError::Auth.into_response()
    } else {
        Redirect::to("/login").into_response()
    }
}

/// Admin-only gate; must run inside [`require_auth`]
#[cfg(feature = "web")]
pub async fn require_admin(request: Request, next: Next) -> Response {
    match request.extensions().get::<Principal>() {
        Some(p) if p.is_admin => next.run(request).await,
        Some(_) => DashboardError::Forbidden("administrators only".into()).into_response(),
        None => DashboardError::Auth.into_response(),
    }
}

#[cfg(feature = "web")]
pub async fn whoami(Extension(principal): Extension<Principal>) -> Json<serde_json::Value> {
    ok(&principal)
}

#[cfg(feature = "web")]
/// Users plus the login id that can never be deleted
pub async fn list_users(State(state): State<AppState>) -> Result<Json<serde_json::Value>> {
    let users = state.auth.list_users().await?;
    Ok(Json(serde_json::json!({
        "status": "ok",
        "data": users,
        "protected": state.auth.bootstrap_id(),
    })))
}

#[cfg(feature = "web")]
pub async fn add_user(
    State(state): State<AppState>,
    Json(user): Json<NewUser>,
) -> Result<Json<serde_json::Value>> {
    state
        .auth
        .add_user(&user.login_id, &user.password, user.is_admin)
        .await?;
    Ok(ok_message(format!("تم إضافة المستخدم {}", user.login_id.trim())))
}

#[cfg(feature = "web")]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(login_id): Path<String>,
) -> Result<Json<serde_json::Value>> {
    state.auth.delete_user(&login_id).await?;
    state.sessions.remove_user(login_id.trim()).await;
    Ok(ok_message("تم حذف المستخدم"))
}

#[cfg(feature = "web")]
pub async fn change_password(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(change): Json<PasswordChange>,
) -> Result<Json<serde_json::Value>> {
    state
        .auth
        .change_password(&principal.login_id, &change.old_password, &change.new_password)
        .await?;
    Ok(ok_message("تم تغيير كلمة المرور"))
}
