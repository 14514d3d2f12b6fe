//! Per-counterparty view over a user's flat message list.
//!
//! Conversations are never stored; they are rebuilt from the messages on every
//! request, so the rules here (self messages dropped, unread counted only for
//! the viewer) apply to every client alike.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::model::{Message, MessageView};

/// The parts of a message the aggregator looks at.
pub trait Envelope {
    fn sender_id(&self) -> Option<Uuid>;
    fn receiver_id(&self) -> Option<Uuid>;
    fn is_read(&self) -> bool;
    fn created_at(&self) -> DateTime<Utc>;
}

impl Envelope for Message {
    fn sender_id(&self) -> Option<Uuid> {
        Some(self.sender)
    }

    fn receiver_id(&self) -> Option<Uuid> {
        Some(self.receiver)
    }

    fn is_read(&self) -> bool {
        self.read
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Envelope for MessageView {
    fn sender_id(&self) -> Option<Uuid> {
        self.sender.as_ref().map(|s| s.id)
    }

    fn receiver_id(&self) -> Option<Uuid> {
        self.receiver.as_ref().map(|r| r.id)
    }

    fn is_read(&self) -> bool {
        self.read
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation<M> {
    pub counterparty: Uuid,
    /// Oldest first.
    pub messages: Vec<M>,
    pub last_message: M,
    /// Unread messages addressed to the viewer.
    pub unread_count: usize,
}

/// Groups `messages` by the participant that is not `viewer`, most recently
/// active conversation first.
///
/// Messages addressed from the viewer to themself, messages missing a
/// participant and messages the viewer is not part of are skipped.
pub fn aggregate<M, I>(messages: I, viewer: Uuid) -> Vec<Conversation<M>>
where
    M: Envelope + Clone,
    I: IntoIterator<Item = M>,
{
    let mut conversations: Vec<Conversation<M>> = Vec::new();
    let mut by_counterparty: HashMap<Uuid, usize> = HashMap::new();

    for message in messages {
        let (Some(sender), Some(receiver)) = (message.sender_id(), message.receiver_id()) else {
            continue;
        };
        let counterparty = if sender == viewer {
            receiver
        } else if receiver == viewer {
            sender
        } else {
            continue;
        };
        if counterparty == viewer {
            continue;
        }

        let unread = receiver == viewer && !message.is_read();

        match by_counterparty.get(&counterparty) {
            Some(&idx) => {
                let conversation = &mut conversations[idx];
                if message.created_at() >= conversation.last_message.created_at() {
                    conversation.last_message = message.clone();
                }
                conversation.messages.push(message);
                if unread {
                    conversation.unread_count += 1;
                }
            }
            None => {
                by_counterparty.insert(counterparty, conversations.len());
                conversations.push(Conversation {
                    counterparty,
                    last_message: message.clone(),
                    messages: vec![message],
                    unread_count: usize::from(unread),
                });
            }
        }
    }

    // both sorts are stable: equal timestamps keep arrival order
    for conversation in &mut conversations {
        conversation.messages.sort_by_key(Envelope::created_at);
    }
    conversations.sort_by(|a, b| {
        b.last_message
            .created_at()
            .cmp(&a.last_message.created_at())
    });

    conversations
}
