use axum::{debug_handler, extract::{Path, State}};
use chrono::Utc;
use serde_json::{json, Value};
use sqlx::SqlitePool;

use crate::{auth::{Identity, Role}, db, AppError, AppResult, Json, AppState};

use super::model::{parse_project_id, project_owner};

#[debug_handler(state = AppState)]
pub(crate) async fn add(
    State(db_pool): State<SqlitePool>,
    identity: Identity,
    Path(id): Path<String>,
) -> AppResult<Json<Value>> {
    identity.require(&[Role::Investor])?;
    let id = parse_project_id(&id)?;
    if project_owner(&db_pool, id).await?.is_none() {
        return Err(AppError::not_found("Project not found"));
    }

    let inserted = sqlx::query("INSERT INTO project_interests (project_id,user_id,created_at) VALUES (?,?,?)")
        .bind(id.to_string())
        .bind(identity.id.to_string())
        .bind(db::to_millis(Utc::now()))
        .execute(&db_pool)
        .await;

    match inserted {
        Ok(_) => Ok(Json(json!({ "message": "Interest expressed successfully" }))),
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            Err(AppError::validation("Already expressed interest"))
        }
        Err(e) => Err(e.into()),
    }
}

#[debug_handler(state = AppState)]
pub(crate) async fn remove(
    State(db_pool): State<SqlitePool>,
    identity: Identity,
    Path(id): Path<String>,
) -> AppResult<Json<Value>> {
    identity.require(&[Role::Investor])?;
    let id = parse_project_id(&id)?;
    if project_owner(&db_pool, id).await?.is_none() {
        return Err(AppError::not_found("Project not found"));
    }

    sqlx::query("DELETE FROM project_interests WHERE project_id=? AND user_id=?")
        .bind(id.to_string())
        .bind(identity.id.to_string())
        .execute(&db_pool)
        .await?;

    Ok(Json(json!({ "message": "Removed from interested projects" })))
}
