use axum::{debug_handler, extract::State};
use chrono::Utc;
use serde::Deserialize;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{db, AppError, AppResult, Json};

use super::{hash_password, users::{self, Profile}, Role};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RegisterRequest {
    name: Option<String>,
    email: Option<String>,
    password: Option<String>,
    role: Option<String>,
    institution: Option<String>,
    google_scholar: Option<String>,
    scopus_link: Option<String>,
    phone_number: Option<String>,
}

fn required(field: Option<String>) -> Option<String> {
    field.filter(|s| !s.trim().is_empty())
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn register(
    State(db_pool): State<SqlitePool>,
    Json(req): Json<RegisterRequest>,
) -> AppResult<Json<Profile>> {
    let (Some(name), Some(email), Some(password), Some(role)) = (
        required(req.name),
        required(req.email),
        required(req.password),
        required(req.role),
    ) else {
        return Err(AppError::validation("All required fields must be provided"));
    };
    let role: Role = role.parse()?;
    let institution = required(req.institution);

    if matches!(role, Role::Researcher | Role::Investor) && institution.is_none() {
        return Err(AppError::validation(
            "Institution is required for researchers and investors",
        ));
    }

    let email = email.trim().to_lowercase();
    let password_hash = hash_password(&password)?;
    let id = Uuid::now_v7();
    let now = db::to_millis(Utc::now());

    let inserted = sqlx::query(
        "INSERT INTO users (id,name,email,password_hash,role,institution,google_scholar,scopus_link,phone_number,created_at,updated_at) VALUES (?,?,?,?,?,?,?,?,?,?,?)",
    )
    .bind(id.to_string())
    .bind(name.trim())
    .bind(&email)
    .bind(password_hash)
    .bind(role.as_str())
    .bind(institution)
    .bind(req.google_scholar)
    .bind(req.scopus_link)
    .bind(req.phone_number)
    .bind(now)
    .bind(now)
    .execute(&db_pool)
    .await;

    match inserted {
        Ok(_) => {}
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            return Err(AppError::Conflict("Email already registered".to_owned()));
        }
        Err(e) => return Err(e.into()),
    }

    tracing::info!(user_id = %id, role = %role, "registered user");

    let row = users::find_by_id(&db_pool, id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("user {id} vanished after insert"))?;
    Ok(Json(row.try_into()?))
}
