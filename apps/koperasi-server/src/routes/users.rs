//! Staff accounts. Never deleted, only switched off.

use axum::extract::{Path, State};
use axum::routing::{get, put};
use axum::{Json, Router};

use koperasi_core::input::{CreateUserInput, SetActiveInput, UpdateUserInput};
use koperasi_core::{Module, User};

use super::gated;
use crate::auth::CurrentUser;
use crate::error::{ApiError, ApiResult};
use crate::extract::ApiJson;
use crate::state::AppState;

pub fn router(state: &AppState) -> Router<AppState> {
    let routes = Router::new()
        .route("/users", get(list).post(create))
        .route("/users/{id}", get(get_by_id).put(update))
        .route("/users/{id}/active", put(set_active));
    gated(routes, state, Module::Users)
}

/// GET /api/users
pub async fn list(State(state): State<AppState>) -> ApiResult<Json<Vec<User>>> {
    Ok(Json(state.db.users().list().await?))
}

/// GET /api/users/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<User>> {
    let user = state
        .db
        .users()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("User", &id))?;
    Ok(Json(user))
}

/// POST /api/users
pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(input): ApiJson<CreateUserInput>,
) -> ApiResult<Json<User>> {
    user.require(&state, Module::Users).await?;
    Ok(Json(state.db.users().create(&input, Some(&user.id)).await?))
}

/// PUT /api/users/{id}
pub async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<UpdateUserInput>,
) -> ApiResult<Json<User>> {
    user.require(&state, Module::Users).await?;
    Ok(Json(state.db.users().update(&id, &input, &user.id).await?))
}

/// PUT /api/users/{id}/active
pub async fn set_active(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<SetActiveInput>,
) -> ApiResult<Json<User>> {
    user.require(&state, Module::Users).await?;
    Ok(Json(state.db.users().set_active(&id, input.is_active, &user.id).await?))
}
