use axum::{debug_handler, extract::State};
use serde::Deserialize;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{auth::Identity, AppError, AppResult, Json, AppState};

use super::{
    model::{MessageView, NewMessage},
    store::{populate, MessageStore, UserDirectory},
};

#[derive(Debug, Deserialize)]
pub(crate) struct SendMessageRequest {
    receiver: Option<String>,
    content: Option<String>,
}

pub async fn send_message<S>(
    store: &S,
    sender: Uuid,
    receiver: Option<Uuid>,
    content: Option<String>,
) -> AppResult<MessageView>
where
    S: MessageStore + UserDirectory,
{
    let Some(content) = content.filter(|c| !c.trim().is_empty()) else {
        return Err(AppError::validation("Message content is required"));
    };
    let Some(receiver) = receiver else {
        return Err(AppError::validation("Receiver is required"));
    };
    if !store.summaries(&[receiver]).await?.contains_key(&receiver) {
        return Err(AppError::not_found("Receiver not found"));
    }

    let message = store
        .create(NewMessage {
            sender,
            receiver,
            content,
        })
        .await?;
    tracing::debug!(message_id = %message.id, %sender, %receiver, "message sent");

    populate(store, vec![message])
        .await?
        .pop()
        .ok_or_else(|| anyhow::anyhow!("populate dropped a message").into())
}

#[debug_handler(state = AppState)]
pub(crate) async fn send(
    State(db_pool): State<SqlitePool>,
    identity: Identity,
    Json(SendMessageRequest { receiver, content }): Json<SendMessageRequest>,
) -> AppResult<Json<MessageView>> {
    let receiver = receiver
        .filter(|r| !r.trim().is_empty())
        .map(|r| Uuid::parse_str(r.trim()).map_err(|_| AppError::not_found("Receiver not found")))
        .transpose()?;

    Ok(Json(send_message(&db_pool, identity.id, receiver, content).await?))
}
