use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, QueryBuilder, Sqlite, SqlitePool};
use uuid::Uuid;

use crate::{db, AppResult};

use super::Role;

#[derive(Debug, FromRow)]
pub(crate) struct UserRow {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub institution: Option<String>,
    pub google_scholar: Option<String>,
    pub scopus_link: Option<String>,
    pub phone_number: Option<String>,
    pub created_at: i64,
}

/// A user as shown to themself. Never carries the password hash.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub institution: Option<String>,
    pub google_scholar: Option<String>,
    pub scopus_link: Option<String>,
    pub phone_number: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for Profile {
    type Error = crate::AppError;

    fn try_from(row: UserRow) -> AppResult<Self> {
        Ok(Profile {
            id: Uuid::parse_str(&row.id)?,
            name: row.name,
            email: row.email,
            role: row.role.parse()?,
            institution: row.institution,
            google_scholar: row.google_scholar,
            scopus_link: row.scopus_link,
            phone_number: row.phone_number,
            created_at: db::from_millis(row.created_at)?,
        })
    }
}

/// Display form of a message participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
}

/// Display form of a project's `createdBy`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectOwner {
    pub id: Uuid,
    pub name: String,
    pub role: Role,
}

const USER_COLUMNS: &str = "id,name,email,password_hash,role,institution,google_scholar,scopus_link,phone_number,created_at";

pub(crate) async fn find_by_email(db_pool: &SqlitePool, email: &str) -> AppResult<Option<UserRow>> {
    Ok(
        sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE email=?"))
            .bind(email)
            .fetch_optional(db_pool)
            .await?,
    )
}

pub(crate) async fn find_by_id(db_pool: &SqlitePool, id: Uuid) -> AppResult<Option<UserRow>> {
    Ok(
        sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id=?"))
            .bind(id.to_string())
            .fetch_optional(db_pool)
            .await?,
    )
}

/// Names for a set of users. Unknown ids are simply absent from the map.
pub(crate) async fn summaries(
    db_pool: &SqlitePool,
    ids: &[Uuid],
) -> AppResult<HashMap<Uuid, UserSummary>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let mut query: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT id,name FROM users WHERE id IN (");
    let mut separated = query.separated(",");
    for id in ids {
        separated.push_bind(id.to_string());
    }
    separated.push_unseparated(")");

    let rows: Vec<(String, String)> = query.build_query_as().fetch_all(db_pool).await?;
    rows.into_iter()
        .map(|(id, name)| {
            let id = Uuid::parse_str(&id)?;
            Ok::<_, crate::AppError>((id, UserSummary { id, name }))
        })
        .collect()
}
