use axum::{debug_handler, extract::State};
use sqlx::SqlitePool;

use crate::{auth::{Identity, Role}, AppResult, Json, AppState};

use super::model::{load_projects, Project, ProjectFilter};

#[debug_handler(state = AppState)]
pub(crate) async fn all(
    State(db_pool): State<SqlitePool>,
    identity: Identity,
) -> AppResult<Json<Vec<Project>>> {
    identity.require(&[Role::Investor, Role::Admin])?;
    Ok(Json(load_projects(&db_pool, ProjectFilter::All).await?))
}

#[debug_handler(state = AppState)]
pub(crate) async fn mine(
    State(db_pool): State<SqlitePool>,
    identity: Identity,
) -> AppResult<Json<Vec<Project>>> {
    identity.require(&[Role::Researcher])?;
    Ok(Json(load_projects(&db_pool, ProjectFilter::OwnedBy(identity.id)).await?))
}

#[debug_handler(state = AppState)]
pub(crate) async fn interested(
    State(db_pool): State<SqlitePool>,
    identity: Identity,
) -> AppResult<Json<Vec<Project>>> {
    identity.require(&[Role::Investor])?;
    Ok(Json(load_projects(&db_pool, ProjectFilter::InterestedBy(identity.id)).await?))
}
