use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::auth::UserSummary;

/// A stored direct message. Only `read` ever changes after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: Uuid,
    pub sender: Uuid,
    pub receiver: Uuid,
    pub content: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewMessage {
    pub sender: Uuid,
    pub receiver: Uuid,
    pub content: String,
}

/// A message with its participants resolved to display names.
///
/// A participant is `None` when the referenced user no longer exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
    pub id: Uuid,
    pub sender: Option<UserSummary>,
    pub receiver: Option<UserSummary>,
    pub content: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl MessageView {
    pub fn new(message: Message, names: &HashMap<Uuid, UserSummary>) -> Self {
        Self {
            id: message.id,
            sender: names.get(&message.sender).cloned(),
            receiver: names.get(&message.receiver).cloned(),
            content: message.content,
            read: message.read,
            created_at: message.created_at,
        }
    }
}
