use axum::{debug_handler, extract::{Path, State}};
use chrono::Utc;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{auth::{Identity, Role}, db, AppError, AppResult, Json, AppState};

use super::model::{load_project, parse_project_id, project_owner, Project, ProjectFields};

/// Only the researcher who created the project may change it.
async fn require_owner(db_pool: &SqlitePool, id: Uuid, identity: &Identity) -> AppResult<()> {
    identity.require(&[Role::Researcher])?;
    match project_owner(db_pool, id).await? {
        None => Err(AppError::not_found("Project not found")),
        Some(owner) if owner == Some(identity.id) => Ok(()),
        Some(_) => Err(AppError::forbidden()),
    }
}

#[debug_handler(state = AppState)]
pub(crate) async fn update(
    State(db_pool): State<SqlitePool>,
    identity: Identity,
    Path(id): Path<String>,
    Json(fields): Json<ProjectFields>,
) -> AppResult<Json<Project>> {
    let id = parse_project_id(&id)?;
    require_owner(&db_pool, id, &identity).await?;
    fields.validate()?;

    sqlx::query(
        "UPDATE projects SET title=COALESCE(?,title), abstract=COALESCE(?,abstract), trl=COALESCE(?,trl), ip_status=COALESCE(?,ip_status), funding_required=COALESCE(?,funding_required), updated_at=? WHERE id=?",
    )
    .bind(fields.title.as_deref().map(str::trim))
    .bind(&fields.abstract_text)
    .bind(fields.trl)
    .bind(&fields.ip_status)
    .bind(fields.funding_required)
    .bind(db::to_millis(Utc::now()))
    .bind(id.to_string())
    .execute(&db_pool)
    .await?;

    let Some(project) = load_project(&db_pool, id).await? else {
        return Err(AppError::not_found("Project not found"));
    };
    Ok(Json(project))
}

#[debug_handler(state = AppState)]
pub(crate) async fn delete(
    State(db_pool): State<SqlitePool>,
    identity: Identity,
    Path(id): Path<String>,
) -> AppResult<Json<Value>> {
    let id = parse_project_id(&id)?;
    require_owner(&db_pool, id, &identity).await?;

    let mut tx = db_pool.begin().await?;
    sqlx::query("DELETE FROM project_interests WHERE project_id=?")
        .bind(id.to_string())
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM projects WHERE id=?")
        .bind(id.to_string())
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    tracing::info!(project_id = %id, by = %identity.id, "project deleted");
    Ok(Json(json!({ "message": "Deleted" })))
}
