use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::{auth::{users, UserSummary}, db, AppError, AppResult};

use super::model::{Message, MessageView, NewMessage};

/// Persistence for message records.
#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn create(&self, new: NewMessage) -> AppResult<Message>;

    /// Every message `user` sent or received, oldest first.
    async fn find_for_participant(&self, user: Uuid) -> AppResult<Vec<Message>>;

    /// The oldest message exchanged between `a` and `b`, in either direction.
    async fn find_between(&self, a: Uuid, b: Uuid) -> AppResult<Option<Message>>;

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Message>>;

    async fn save(&self, message: &Message) -> AppResult<()>;
}

/// What the messaging core needs to know about a project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectRef {
    pub id: Uuid,
    pub created_by: Option<Uuid>,
    pub title: String,
}

#[async_trait]
pub trait ProjectLookup: Send + Sync {
    async fn find_project(&self, id: Uuid) -> AppResult<Option<ProjectRef>>;
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn summaries(&self, ids: &[Uuid]) -> AppResult<HashMap<Uuid, UserSummary>>;
}

/// Resolves sender and receiver names for a batch of messages.
pub async fn populate<D>(directory: &D, messages: Vec<Message>) -> AppResult<Vec<MessageView>>
where
    D: UserDirectory + ?Sized,
{
    let mut ids: Vec<Uuid> = messages
        .iter()
        .flat_map(|m| [m.sender, m.receiver])
        .collect();
    ids.sort_unstable();
    ids.dedup();

    let names = directory.summaries(&ids).await?;
    Ok(messages
        .into_iter()
        .map(|m| MessageView::new(m, &names))
        .collect())
}

#[derive(FromRow)]
struct MessageRow {
    id: String,
    sender: String,
    receiver: String,
    content: String,
    read: bool,
    created_at: i64,
}

impl TryFrom<MessageRow> for Message {
    type Error = AppError;

    fn try_from(row: MessageRow) -> AppResult<Self> {
        Ok(Message {
            id: Uuid::parse_str(&row.id)?,
            sender: Uuid::parse_str(&row.sender)?,
            receiver: Uuid::parse_str(&row.receiver)?,
            content: row.content,
            read: row.read,
            created_at: db::from_millis(row.created_at)?,
        })
    }
}

const MESSAGE_COLUMNS: &str = "id,sender,receiver,content,read,created_at";

#[async_trait]
impl MessageStore for SqlitePool {
    async fn create(&self, NewMessage { sender, receiver, content }: NewMessage) -> AppResult<Message> {
        let message = Message {
            id: Uuid::now_v7(),
            sender,
            receiver,
            content,
            read: false,
            // stored at millisecond precision, so keep the in-memory copy identical
            created_at: db::from_millis(db::to_millis(Utc::now()))?,
        };

        sqlx::query("INSERT INTO messages (id,sender,receiver,content,read,created_at) VALUES (?,?,?,?,?,?)")
            .bind(message.id.to_string())
            .bind(message.sender.to_string())
            .bind(message.receiver.to_string())
            .bind(&message.content)
            .bind(message.read)
            .bind(db::to_millis(message.created_at))
            .execute(self)
            .await?;

        Ok(message)
    }

    async fn find_for_participant(&self, user: Uuid) -> AppResult<Vec<Message>> {
        let user = user.to_string();
        let rows: Vec<MessageRow> = sqlx::query_as(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE sender=? OR receiver=? ORDER BY created_at, rowid"
        ))
        .bind(&user)
        .bind(&user)
        .fetch_all(self)
        .await?;

        rows.into_iter().map(Message::try_from).collect()
    }

    async fn find_between(&self, a: Uuid, b: Uuid) -> AppResult<Option<Message>> {
        let (a, b) = (a.to_string(), b.to_string());
        let row: Option<MessageRow> = sqlx::query_as(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE (sender=? AND receiver=?) OR (sender=? AND receiver=?) ORDER BY created_at, rowid LIMIT 1"
        ))
        .bind(&a)
        .bind(&b)
        .bind(&b)
        .bind(&a)
        .fetch_optional(self)
        .await?;

        row.map(Message::try_from).transpose()
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Message>> {
        let row: Option<MessageRow> = sqlx::query_as(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE id=?"
        ))
        .bind(id.to_string())
        .fetch_optional(self)
        .await?;

        row.map(Message::try_from).transpose()
    }

    async fn save(&self, message: &Message) -> AppResult<()> {
        sqlx::query("UPDATE messages SET read=? WHERE id=?")
            .bind(message.read)
            .bind(message.id.to_string())
            .execute(self)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl ProjectLookup for SqlitePool {
    async fn find_project(&self, id: Uuid) -> AppResult<Option<ProjectRef>> {
        let row: Option<(Option<String>, String)> =
            sqlx::query_as("SELECT created_by,title FROM projects WHERE id=?")
                .bind(id.to_string())
                .fetch_optional(self)
                .await?;

        let Some((created_by, title)) = row else {
            return Ok(None);
        };
        let created_by = created_by.as_deref().map(Uuid::parse_str).transpose()?;

        Ok(Some(ProjectRef { id, created_by, title }))
    }
}

#[async_trait]
impl UserDirectory for SqlitePool {
    async fn summaries(&self, ids: &[Uuid]) -> AppResult<HashMap<Uuid, UserSummary>> {
        users::summaries(self, ids).await
    }
}
