use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqlitePool};
use uuid::Uuid;

use crate::{auth::ProjectOwner, db, AppError, AppResult};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: Uuid,
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    pub trl: Option<i64>,
    pub ip_status: Option<String>,
    pub funding_required: Option<f64>,
    pub created_by: Option<ProjectOwner>,
    pub interested_users: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body of create and update; on update, absent fields are left alone.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ProjectFields {
    pub title: Option<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    pub trl: Option<i64>,
    pub ip_status: Option<String>,
    pub funding_required: Option<f64>,
}

impl ProjectFields {
    pub fn validate(&self) -> AppResult<()> {
        if self.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
            return Err(AppError::validation("Title cannot be empty"));
        }
        if self.trl.is_some_and(|trl| !(1..=9).contains(&trl)) {
            return Err(AppError::validation("TRL must be between 1 and 9"));
        }
        if self.funding_required.is_some_and(|f| !f.is_finite() || f < 0.0) {
            return Err(AppError::validation("Funding required must be a non-negative number"));
        }
        Ok(())
    }
}

pub(crate) enum ProjectFilter {
    All,
    Id(Uuid),
    OwnedBy(Uuid),
    InterestedBy(Uuid),
}

#[derive(FromRow)]
struct ProjectRow {
    id: String,
    title: String,
    abstract_text: Option<String>,
    trl: Option<i64>,
    ip_status: Option<String>,
    funding_required: Option<f64>,
    created_by: Option<String>,
    owner_name: Option<String>,
    owner_role: Option<String>,
    created_at: i64,
    updated_at: i64,
}

impl ProjectRow {
    fn into_project(self, interested_users: Vec<Uuid>) -> AppResult<Project> {
        // LEFT JOIN: owner columns are NULL when created_by points nowhere
        let created_by = match (self.created_by, self.owner_name, self.owner_role) {
            (Some(id), Some(name), Some(role)) => Some(ProjectOwner {
                id: Uuid::parse_str(&id)?,
                name,
                role: role.parse()?,
            }),
            _ => None,
        };

        Ok(Project {
            id: Uuid::parse_str(&self.id)?,
            title: self.title,
            abstract_text: self.abstract_text,
            trl: self.trl,
            ip_status: self.ip_status,
            funding_required: self.funding_required,
            created_by,
            interested_users,
            created_at: db::from_millis(self.created_at)?,
            updated_at: db::from_millis(self.updated_at)?,
        })
    }
}

pub(crate) async fn load_projects(db_pool: &SqlitePool, filter: ProjectFilter) -> AppResult<Vec<Project>> {
    let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(
        "SELECT p.id, p.title, p.abstract AS abstract_text, p.trl, p.ip_status, p.funding_required, \
         p.created_by, u.name AS owner_name, u.role AS owner_role, p.created_at, p.updated_at \
         FROM projects p LEFT JOIN users u ON u.id = p.created_by",
    );
    match filter {
        ProjectFilter::All => {}
        ProjectFilter::Id(id) => {
            query.push(" WHERE p.id = ").push_bind(id.to_string());
        }
        ProjectFilter::OwnedBy(owner) => {
            query.push(" WHERE p.created_by = ").push_bind(owner.to_string());
        }
        ProjectFilter::InterestedBy(user) => {
            query
                .push(" WHERE p.id IN (SELECT project_id FROM project_interests WHERE user_id = ")
                .push_bind(user.to_string())
                .push(")");
        }
    }
    query.push(" ORDER BY p.created_at, p.rowid");

    let rows: Vec<ProjectRow> = query.build_query_as().fetch_all(db_pool).await?;
    let ids: Vec<&str> = rows.iter().map(|r| r.id.as_str()).collect();
    let mut interests = interested_users(db_pool, &ids).await?;

    rows.into_iter()
        .map(|row| {
            let users = interests.remove(&row.id).unwrap_or_default();
            row.into_project(users)
        })
        .collect()
}

pub(crate) async fn load_project(db_pool: &SqlitePool, id: Uuid) -> AppResult<Option<Project>> {
    Ok(load_projects(db_pool, ProjectFilter::Id(id)).await?.pop())
}

async fn interested_users(db_pool: &SqlitePool, project_ids: &[&str]) -> AppResult<HashMap<String, Vec<Uuid>>> {
    let mut map: HashMap<String, Vec<Uuid>> = HashMap::new();
    if project_ids.is_empty() {
        return Ok(map);
    }

    let mut query: QueryBuilder<Sqlite> =
        QueryBuilder::new("SELECT project_id, user_id FROM project_interests WHERE project_id IN (");
    let mut separated = query.separated(",");
    for id in project_ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(") ORDER BY created_at, rowid");

    let rows: Vec<(String, String)> = query.build_query_as().fetch_all(db_pool).await?;
    for (project_id, user_id) in rows {
        map.entry(project_id).or_default().push(Uuid::parse_str(&user_id)?);
    }
    Ok(map)
}

/// Owner of a project, or `None` when it does not exist. A stored project
/// without owner comes back as `Some(None)`.
pub(crate) async fn project_owner(db_pool: &SqlitePool, id: Uuid) -> AppResult<Option<Option<Uuid>>> {
    let row: Option<(Option<String>,)> = sqlx::query_as("SELECT created_by FROM projects WHERE id=?")
        .bind(id.to_string())
        .fetch_optional(db_pool)
        .await?;

    row.map(|(owner,)| owner.as_deref().map(Uuid::parse_str).transpose())
        .transpose()
        .map_err(AppError::from)
}

pub(crate) fn parse_project_id(raw: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| AppError::not_found("Project not found"))
}
