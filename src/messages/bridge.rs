//! Turns "I'm interested in this project" into a conversation with its owner.
//!
//! The existing-conversation check is keyed on the investor/researcher pair,
//! so interest in several projects of one researcher lands in one thread.
//! Two simultaneous calls for a fresh pair can both miss the check and both
//! write a greeting; nothing here prevents that.

use axum::{debug_handler, extract::State};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{auth::Identity, AppError, AppResult, Json, AppState};

use super::{
    model::{Message, MessageView, NewMessage},
    store::{populate, MessageStore, ProjectLookup, UserDirectory},
};

pub fn greeting(project_title: &str) -> String {
    format!("Hi! I'm interested in your project \"{project_title}\". Let's discuss!")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterestOutcome {
    /// The pair had already exchanged messages; nothing was written.
    Existing { researcher_id: Uuid },
    /// A seed message was written.
    Created { researcher_id: Uuid, seed: Message },
}

impl InterestOutcome {
    pub fn researcher_id(&self) -> Uuid {
        match self {
            InterestOutcome::Existing { researcher_id }
            | InterestOutcome::Created { researcher_id, .. } => *researcher_id,
        }
    }
}

pub async fn express_interest<S>(store: &S, project_id: Uuid, investor: Uuid) -> AppResult<InterestOutcome>
where
    S: MessageStore + ProjectLookup,
{
    let Some(project) = store.find_project(project_id).await? else {
        return Err(AppError::not_found("Project not found"));
    };
    let Some(researcher_id) = project.created_by else {
        return Err(anyhow::anyhow!("project {project_id} has no owner").into());
    };
    if researcher_id == investor {
        return Err(AppError::validation("You cannot start a chat about your own project"));
    }

    if store.find_between(investor, researcher_id).await?.is_some() {
        return Ok(InterestOutcome::Existing { researcher_id });
    }

    let seed = store
        .create(NewMessage {
            sender: investor,
            receiver: researcher_id,
            content: greeting(&project.title),
        })
        .await?;
    tracing::info!(%project_id, %investor, %researcher_id, "conversation seeded");

    Ok(InterestOutcome::Created { researcher_id, seed })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ExpressInterestRequest {
    project_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ExpressInterestResponse {
    message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    chat: Option<MessageView>,
    researcher_id: Uuid,
}

pub(crate) async fn respond<S>(store: &S, outcome: InterestOutcome) -> AppResult<ExpressInterestResponse>
where
    S: UserDirectory + ?Sized,
{
    let researcher_id = outcome.researcher_id();
    Ok(match outcome {
        InterestOutcome::Existing { .. } => ExpressInterestResponse {
            message: "Chat already exists",
            chat: None,
            researcher_id,
        },
        InterestOutcome::Created { seed, .. } => ExpressInterestResponse {
            message: "Interest expressed successfully",
            chat: populate(store, vec![seed]).await?.pop(),
            researcher_id,
        },
    })
}

#[debug_handler(state = AppState)]
pub(crate) async fn express_interest_handler(
    State(db_pool): State<SqlitePool>,
    identity: Identity,
    Json(ExpressInterestRequest { project_id }): Json<ExpressInterestRequest>,
) -> AppResult<Json<ExpressInterestResponse>> {
    let Some(project_id) = project_id.filter(|p| !p.trim().is_empty()) else {
        return Err(AppError::validation("Project id is required"));
    };
    let project_id =
        Uuid::parse_str(project_id.trim()).map_err(|_| AppError::not_found("Project not found"))?;

    let outcome = express_interest(&db_pool, project_id, identity.id).await?;
    Ok(Json(respond(&db_pool, outcome).await?))
}
