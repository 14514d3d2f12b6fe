use axum::{debug_handler, extract::State};
use serde::Serialize;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{auth::{Identity, UserSummary}, AppResult, Json, AppState};

use super::{
    conversation::{aggregate, Conversation},
    model::MessageView,
    store::{populate, MessageStore, UserDirectory},
};

/// Everything `viewer` sent or received, oldest first, with names resolved.
pub async fn list_messages<S>(store: &S, viewer: Uuid) -> AppResult<Vec<MessageView>>
where
    S: MessageStore + UserDirectory,
{
    let messages = store.find_for_participant(viewer).await?;
    populate(store, messages).await
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationView {
    pub counterparty: UserSummary,
    pub messages: Vec<MessageView>,
    pub last_message: MessageView,
    pub unread_count: usize,
}

impl From<Conversation<MessageView>> for ConversationView {
    fn from(conversation: Conversation<MessageView>) -> Self {
        let last = &conversation.last_message;
        let counterparty = [&last.sender, &last.receiver]
            .into_iter()
            .flatten()
            .find(|p| p.id == conversation.counterparty)
            .cloned()
            .unwrap_or_else(|| UserSummary {
                id: conversation.counterparty,
                name: String::new(),
            });

        Self {
            counterparty,
            messages: conversation.messages,
            last_message: conversation.last_message,
            unread_count: conversation.unread_count,
        }
    }
}

pub async fn list_conversations<S>(store: &S, viewer: Uuid) -> AppResult<Vec<ConversationView>>
where
    S: MessageStore + UserDirectory,
{
    let messages = list_messages(store, viewer).await?;
    Ok(aggregate(messages, viewer)
        .into_iter()
        .map(ConversationView::from)
        .collect())
}

#[debug_handler(state = AppState)]
pub(crate) async fn messages(
    State(db_pool): State<SqlitePool>,
    identity: Identity,
) -> AppResult<Json<Vec<MessageView>>> {
    Ok(Json(list_messages(&db_pool, identity.id).await?))
}

#[debug_handler(state = AppState)]
pub(crate) async fn conversations(
    State(db_pool): State<SqlitePool>,
    identity: Identity,
) -> AppResult<Json<Vec<ConversationView>>> {
    let conversations = list_conversations(&db_pool, identity.id).await?;
    tracing::debug!(
        user_id = %identity.id,
        count = conversations.len(),
        unread = conversations.iter().map(|c| c.unread_count).sum::<usize>(),
        "listed conversations"
    );
    Ok(Json(conversations))
}
