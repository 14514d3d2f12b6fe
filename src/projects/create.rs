use axum::{debug_handler, extract::State};
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{auth::{Identity, Role}, db, AppError, AppResult, Json, AppState};

use super::model::{load_project, Project, ProjectFields};

#[debug_handler(state = AppState)]
pub(crate) async fn create(
    State(db_pool): State<SqlitePool>,
    identity: Identity,
    Json(fields): Json<ProjectFields>,
) -> AppResult<Json<Project>> {
    identity.require(&[Role::Researcher])?;
    fields.validate()?;
    let Some(title) = fields.title.as_deref().map(str::trim) else {
        return Err(AppError::validation("Title is required"));
    };

    let id = Uuid::now_v7();
    let now = db::to_millis(Utc::now());
    sqlx::query(
        "INSERT INTO projects (id,title,abstract,trl,ip_status,funding_required,created_by,created_at,updated_at) VALUES (?,?,?,?,?,?,?,?,?)",
    )
    .bind(id.to_string())
    .bind(title)
    .bind(&fields.abstract_text)
    .bind(fields.trl)
    .bind(&fields.ip_status)
    .bind(fields.funding_required)
    .bind(identity.id.to_string())
    .bind(now)
    .bind(now)
    .execute(&db_pool)
    .await?;

    tracing::info!(project_id = %id, owner = %identity.id, "project created");

    let project = load_project(&db_pool, id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("project {id} vanished after insert"))?;
    Ok(Json(project))
}
