//! # Authentication & Access Gates
//!
//! Two layers guard every protected route; handlers that mutate data check the
//! module a third time before touching storage.
//!
//! ```text
//! request ──► require_auth ──► require_module(M) ──► handler
//!              │                 │                    │
//!              │ cookie/token    │ role × module      │ user.require(M)
//!              │ account active  │ table              │ (mutations)
//!              ▼                 ▼                    ▼
//!             401               403 + redirectTo     403 + redirectTo
//!                               + activity row       + activity row
//! ```

use axum::extract::{FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::Response;
use chrono::{DateTime, Utc};
use tracing::{debug, error, warn};

use koperasi_core::permissions::ensure_access;
use koperasi_core::{ActivityAction, CoreError, Module, NewActivity, Role, User};

use crate::error::{ApiError, ApiResult};
use crate::session::token_from_headers;
use crate::state::AppState;

// =============================================================================
// Current User
// =============================================================================

/// The authenticated account behind a request.
///
/// Inserted into the request extensions by [`require_auth`]; extracting it on
/// a route without that layer fails with 401.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: String,
    pub username: String,
    pub full_name: String,
    pub role: Role,
    pub expires_at: DateTime<Utc>,
}

impl CurrentUser {
    fn from_user(user: &User, expires_at: DateTime<Utc>) -> Self {
        CurrentUser {
            id: user.id.clone(),
            username: user.username.clone(),
            full_name: user.full_name.clone(),
            role: user.role,
            expires_at,
        }
    }

    /// Checks the role against `module`, logging and recording a denial.
    pub async fn require(&self, state: &AppState, module: Module) -> ApiResult<()> {
        match ensure_access(self.role, module) {
            Ok(()) => Ok(()),
            Err(denied) => Err(deny(state, self, module, denied).await),
        }
    }
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or_else(|| ApiError::unauthenticated("Login required"))
    }
}

// =============================================================================
// Middleware
// =============================================================================

/// Requires a valid session for an active account.
///
/// The account is reloaded so deactivation and role changes apply at once,
/// not when the cookie runs out.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(token) = token_from_headers(req.headers()) else {
        debug!(uri = %req.uri(), "Request without session");
        return Err(ApiError::unauthenticated("Login required"));
    };

    let claims = match state.sessions.verify(token) {
        Ok(claims) => claims,
        Err(err) => {
            warn!(uri = %req.uri(), reason = %err.message, "Session rejected");
            return Err(err);
        }
    };

    let user = state
        .db
        .users()
        .get_by_id(&claims.user_id)
        .await?
        .ok_or_else(|| ApiError::unauthenticated("Invalid session"))?;

    if !user.is_active {
        warn!(username = %user.username, "Session of deactivated account refused");
        return Err(CoreError::AccountDeactivated.into());
    }

    req.extensions_mut()
        .insert(CurrentUser::from_user(&user, claims.expires_at));
    Ok(next.run(req).await)
}

/// Requires the session's role to hold a module.
///
/// ```rust,ignore
/// Router::new()
///     .route("/suppliers", get(list))
///     .route_layer(middleware::from_fn_with_state((state.clone(), Module::Suppliers), require_module));
/// ```
pub async fn require_module(
    State((state, module)): State<(AppState, Module)>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = req
        .extensions()
        .get::<CurrentUser>()
        .cloned()
        .ok_or_else(|| ApiError::unauthenticated("Login required"))?;

    user.require(&state, module).await?;
    Ok(next.run(req).await)
}

async fn deny(state: &AppState, user: &CurrentUser, module: Module, denied: CoreError) -> ApiError {
    warn!(
        user_id = %user.id,
        username = %user.username,
        role = %user.role,
        module = %module,
        "Access denied"
    );

    let entry = NewActivity::new(
        &user.id,
        module,
        ActivityAction::AccessDenied,
        format!("'{}' ({}) was denied access to {}", user.username, user.role, module),
    );
    if let Err(e) = state.db.activity().append(&entry).await {
        error!(error = %e, "Failed to record access denial");
    }

    ApiError::from(denied)
}
