//! Publishing entries over HTTP

use crate::entry_store::NewEntry;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use tracing::error;

use super::state::{GuardedPublisher, ServerState};

async fn post_entry(
    State(publisher): State<GuardedPublisher>,
    Json(entry): Json<NewEntry>,
) -> Response {
    match publisher.publish(entry) {
        // Delivery keeps running in the background after the handle is dropped.
        Ok(published) => (StatusCode::CREATED, Json(published.entry)).into_response(),
        Err(err) => {
            error!("Failed to publish entry: {:#}", err);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub fn make_entry_routes(state: ServerState) -> Router {
    Router::new()
        .route("/entry", post(post_entry))
        .with_state(state)
}
