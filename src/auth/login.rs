use std::sync::LazyLock;

use axum::{debug_handler, extract::State};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{AppError, AppResult, Json, AppState};

use super::{users, verify_password, Keys, Role};

/// Verified against when the email is unknown.
static DUMMY_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| super::hash_password("not a real password").ok());

#[derive(Deserialize)]
pub(crate) struct LoginRequest {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

#[derive(Serialize)]
pub(crate) struct LoginResponse {
    token: String,
    id: Uuid,
    role: Role,
    name: String,
}

#[debug_handler(state = AppState)]
pub(crate) async fn login(
    State(db_pool): State<SqlitePool>,
    State(keys): State<Keys>,
    Json(LoginRequest { email, password }): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let invalid = || AppError::Unauthenticated("Invalid credentials".to_owned());

    let email = email.trim().to_lowercase();
    let Some(user) = users::find_by_email(&db_pool, &email).await? else {
        if let Some(dummy) = DUMMY_HASH.as_deref() {
            verify_password(&password, dummy)?;
        }
        return Err(invalid());
    };

    if !verify_password(&password, &user.password_hash)? {
        tracing::info!(user_id = %user.id, "failed login");
        return Err(invalid());
    }

    let id = Uuid::parse_str(&user.id)?;
    let role: Role = user.role.parse()?;
    let token = keys.issue(id, role)?;

    tracing::info!(user_id = %id, "welcome back");
    Ok(Json(LoginResponse {
        token,
        id,
        role,
        name: user.name,
    }))
}
