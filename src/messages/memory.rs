use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicI64, Ordering},
        Mutex,
    },
};

use async_trait::async_trait;
use uuid::Uuid;

use crate::{auth::UserSummary, db, AppResult};

use super::{
    model::{Message, NewMessage},
    store::{MessageStore, ProjectLookup, ProjectRef, UserDirectory},
};

/// In-process stand-in for the SQLite store; one tick of the clock per insert.
#[derive(Default)]
pub(crate) struct MemoryStore {
    messages: Mutex<Vec<Message>>,
    projects: Mutex<HashMap<Uuid, ProjectRef>>,
    users: Mutex<HashMap<Uuid, UserSummary>>,
    clock: AtomicI64,
}

impl MemoryStore {
    pub(crate) fn add_user(&self, name: &str) -> Uuid {
        let id = Uuid::now_v7();
        self.users.lock().unwrap().insert(
            id,
            UserSummary {
                id,
                name: name.to_owned(),
            },
        );
        id
    }

    pub(crate) fn add_project(&self, created_by: Option<Uuid>, title: &str) -> Uuid {
        let id = Uuid::now_v7();
        self.projects.lock().unwrap().insert(
            id,
            ProjectRef {
                id,
                created_by,
                title: title.to_owned(),
            },
        );
        id
    }

    pub(crate) fn all(&self) -> Vec<Message> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn create(&self, new: NewMessage) -> AppResult<Message> {
        let tick = self.clock.fetch_add(1, Ordering::SeqCst) + 1;
        let message = Message {
            id: Uuid::now_v7(),
            sender: new.sender,
            receiver: new.receiver,
            content: new.content,
            read: false,
            created_at: db::from_millis(tick)?,
        };
        self.messages.lock().unwrap().push(message.clone());
        Ok(message)
    }

    async fn find_for_participant(&self, user: Uuid) -> AppResult<Vec<Message>> {
        Ok(self
            .all()
            .into_iter()
            .filter(|m| m.sender == user || m.receiver == user)
            .collect())
    }

    async fn find_between(&self, a: Uuid, b: Uuid) -> AppResult<Option<Message>> {
        Ok(self.all().into_iter().find(|m| {
            (m.sender == a && m.receiver == b) || (m.sender == b && m.receiver == a)
        }))
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Message>> {
        Ok(self.all().into_iter().find(|m| m.id == id))
    }

    async fn save(&self, message: &Message) -> AppResult<()> {
        let mut messages = self.messages.lock().unwrap();
        if let Some(stored) = messages.iter_mut().find(|m| m.id == message.id) {
            stored.read = message.read;
        }
        Ok(())
    }
}

#[async_trait]
impl ProjectLookup for MemoryStore {
    async fn find_project(&self, id: Uuid) -> AppResult<Option<ProjectRef>> {
        Ok(self.projects.lock().unwrap().get(&id).cloned())
    }
}

#[async_trait]
impl UserDirectory for MemoryStore {
    async fn summaries(&self, ids: &[Uuid]) -> AppResult<HashMap<Uuid, UserSummary>> {
        let users = self.users.lock().unwrap();
        Ok(ids
            .iter()
            .filter_map(|id| users.get(id).map(|u| (*id, u.clone())))
            .collect())
    }
}
