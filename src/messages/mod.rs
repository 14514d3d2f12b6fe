mod bridge;
pub mod conversation;
mod list;
#[cfg(test)]
pub(crate) mod memory;
pub mod model;
mod read;
mod send;
pub mod store;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::AppState;

pub use bridge::{express_interest, greeting, InterestOutcome};
pub use list::{list_conversations, list_messages, ConversationView};
pub use read::mark_read;
pub use send::send_message;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(send::send).get(list::messages))
        .route("/conversations", get(list::conversations))
        .route("/{id}/read", put(read::read))
        .route("/express-interest", post(bridge::express_interest_handler))
}
