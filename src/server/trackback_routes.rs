//! Trackback protocol endpoint and read-only record API

use crate::inbound::{PingError, PingRequest, XmlResponse};

use axum::{
    extract::{
        rejection::{FormRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde::Deserialize;
use tracing::{debug, error};

use super::http_layers::ClientIp;
use super::state::{GuardedEntryStore, GuardedPingReceiver, GuardedTrackbackStore, ServerState};

#[derive(Deserialize, Default)]
struct EntryIdQuery {
    #[serde(rename = "entryID")]
    entry_id: Option<String>,
}

async fn handle_ping(
    receiver: &GuardedPingReceiver,
    client_ip: &str,
    entry_id: Option<&str>,
    form: Result<Form<PingRequest>, FormRejection>,
) -> XmlResponse {
    let request = match form {
        Ok(Form(request)) => request,
        Err(rejection) => {
            debug!("Unreadable ping form from {}: {}", client_ip, rejection);
            return receiver.reject_unreadable(client_ip).into();
        }
    };

    match receiver.receive(client_ip, entry_id, &request).await {
        Ok(_) => XmlResponse::success(),
        Err(err) => err.into(),
    }
}

async fn post_trackback(
    ClientIp(client_ip): ClientIp,
    State(receiver): State<GuardedPingReceiver>,
    query: Result<Query<EntryIdQuery>, QueryRejection>,
    form: Result<Form<PingRequest>, FormRejection>,
) -> XmlResponse {
    let query = query.map(|Query(query)| query).unwrap_or_default();
    handle_ping(&receiver, &client_ip, query.entry_id.as_deref(), form).await
}

async fn post_trackback_for_entry(
    ClientIp(client_ip): ClientIp,
    State(receiver): State<GuardedPingReceiver>,
    Path(entry_id): Path<String>,
    form: Result<Form<PingRequest>, FormRejection>,
) -> XmlResponse {
    handle_ping(&receiver, &client_ip, Some(&entry_id), form).await
}

async fn get_entry_trackbacks(
    State(entries): State<GuardedEntryStore>,
    State(trackbacks): State<GuardedTrackbackStore>,
    Path(entry_id): Path<i64>,
) -> Response {
    match entries.get_entry(entry_id) {
        Ok(Some(entry)) if entry.security.is_public() => {}
        Ok(Some(_)) => {
            return (StatusCode::FORBIDDEN, PingError::Forbidden.to_string()).into_response()
        }
        Ok(None) => {
            return (StatusCode::NOT_FOUND, PingError::NotFound.to_string()).into_response()
        }
        Err(err) => {
            error!("Failed to load entry {}: {:#}", entry_id, err);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    }

    match trackbacks.get_by_entry(entry_id) {
        Ok(records) => Json(records).into_response(),
        Err(err) => {
            error!("Failed to list trackbacks of entry {}: {:#}", entry_id, err);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn get_trackback(
    State(trackbacks): State<GuardedTrackbackStore>,
    Path(id): Path<i64>,
) -> Response {
    match trackbacks.get_by_id(id) {
        Ok(Some(record)) => Json(record).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => {
            error!("Failed to load trackback {}: {:#}", id, err);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub fn make_trackback_routes(state: ServerState) -> Router {
    Router::new()
        .route("/trackback", post(post_trackback))
        .route("/trackback/{entry_id}", post(post_trackback_for_entry))
        .with_state(state)
}

pub fn make_record_routes(state: ServerState) -> Router {
    Router::new()
        .route("/entry/{entry_id}/trackbacks", get(get_entry_trackbacks))
        .route("/trackback/{id}", get(get_trackback))
        .with_state(state)
}
