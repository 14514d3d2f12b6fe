use axum::{debug_handler, extract::{Path, State}};
use serde_json::{json, Value};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{auth::Identity, AppError, AppResult, Json, AppState};

use super::{model::Message, store::MessageStore};

/// Marks a message read on behalf of its receiver. Repeat calls are no-ops.
pub async fn mark_read<S>(store: &S, message_id: Uuid, reader: Uuid) -> AppResult<Message>
where
    S: MessageStore + ?Sized,
{
    let Some(mut message) = store.find_by_id(message_id).await? else {
        return Err(AppError::not_found("Message not found"));
    };
    if message.receiver != reader {
        return Err(AppError::forbidden());
    }

    if !message.read {
        message.read = true;
        store.save(&message).await?;
    }
    Ok(message)
}

#[debug_handler(state = AppState)]
pub(crate) async fn read(
    State(db_pool): State<SqlitePool>,
    identity: Identity,
    Path(id): Path<String>,
) -> AppResult<Json<Value>> {
    let id = Uuid::parse_str(&id).map_err(|_| AppError::not_found("Message not found"))?;
    mark_read(&db_pool, id, identity.id).await?;
    Ok(Json(json!({ "message": "Marked as read" })))
}
