use axum::{debug_handler, extract::State};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::{db, AppError, AppResult, Json, AppState};

use super::{users::{self, Profile}, Identity, Role};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ProfileView {
    name: String,
    institution: Option<String>,
    role: Role,
    email: String,
    google_scholar: Option<String>,
    scopus_link: Option<String>,
    phone_number: Option<String>,
}

impl From<Profile> for ProfileView {
    fn from(profile: Profile) -> Self {
        ProfileView {
            name: profile.name,
            institution: profile.institution,
            role: profile.role,
            email: profile.email,
            google_scholar: profile.google_scholar,
            scopus_link: profile.scopus_link,
            phone_number: profile.phone_number,
        }
    }
}

/// What `PUT /profile` hands back: the fields it can change.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EditableProfile {
    name: String,
    institution: Option<String>,
    google_scholar: Option<String>,
    scopus_link: Option<String>,
    phone_number: Option<String>,
}

impl From<Profile> for EditableProfile {
    fn from(profile: Profile) -> Self {
        EditableProfile {
            name: profile.name,
            institution: profile.institution,
            google_scholar: profile.google_scholar,
            scopus_link: profile.scopus_link,
            phone_number: profile.phone_number,
        }
    }
}

async fn load(db_pool: &SqlitePool, identity: &Identity) -> AppResult<Profile> {
    let Some(row) = users::find_by_id(db_pool, identity.id).await? else {
        return Err(AppError::not_found("User not found"));
    };
    row.try_into()
}

#[debug_handler(state = AppState)]
pub(crate) async fn get_profile(
    State(db_pool): State<SqlitePool>,
    identity: Identity,
) -> AppResult<Json<ProfileView>> {
    Ok(Json(load(&db_pool, &identity).await?.into()))
}

/// Fields left out of the body keep their stored value.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UpdateProfile {
    name: Option<String>,
    institution: Option<String>,
    google_scholar: Option<String>,
    scopus_link: Option<String>,
    phone_number: Option<String>,
}

#[debug_handler(state = AppState)]
pub(crate) async fn update_profile(
    State(db_pool): State<SqlitePool>,
    identity: Identity,
    Json(update): Json<UpdateProfile>,
) -> AppResult<Json<EditableProfile>> {
    let name = update.name.filter(|n| !n.trim().is_empty());

    let result = sqlx::query(
        "UPDATE users SET name=COALESCE(?,name), institution=COALESCE(?,institution), google_scholar=COALESCE(?,google_scholar), scopus_link=COALESCE(?,scopus_link), phone_number=COALESCE(?,phone_number), updated_at=? WHERE id=?",
    )
    .bind(name)
    .bind(update.institution)
    .bind(update.google_scholar)
    .bind(update.scopus_link)
    .bind(update.phone_number)
    .bind(db::to_millis(Utc::now()))
    .bind(identity.id.to_string())
    .execute(&db_pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("User not found"));
    }

    Ok(Json(load(&db_pool, &identity).await?.into()))
}
