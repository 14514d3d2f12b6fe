mod create;
mod edit;
mod interest;
mod list;
mod model;

use axum::{
    routing::{delete, get, post, put},
    Router,
};

use crate::AppState;

pub use model::Project;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create::create).get(list::all))
        .route("/mine", get(list::mine))
        .route("/interested", get(list::interested))
        .route("/interested/{id}", delete(interest::remove))
        .route("/{id}/interest", post(interest::add))
        .route("/{id}", put(edit::update).delete(edit::delete))
}
