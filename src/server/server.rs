use anyhow::{Context, Result};
use std::{
    future::IntoFuture,
    net::SocketAddr,
    time::{Duration, Instant},
};

use tracing::info;

use axum::{extract::State, middleware, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;

use super::entry_routes::make_entry_routes;
use super::metrics::metrics_handler;
use super::trackback_routes::{make_record_routes, make_trackback_routes};
use super::{log_requests, state::*, ServerConfig};

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
    pub hash: String,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

async fn home(State(state): State<ServerState>) -> impl IntoResponse {
    let stats = ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        hash: state.hash.clone(),
    };
    Json(stats)
}

impl ServerState {
    fn new(
        config: ServerConfig,
        entry_store: GuardedEntryStore,
        trackback_store: GuardedTrackbackStore,
        ping_receiver: GuardedPingReceiver,
        publisher: GuardedPublisher,
    ) -> ServerState {
        ServerState {
            config,
            start_time: Instant::now(),
            entry_store,
            trackback_store,
            ping_receiver,
            publisher,
            hash: env!("BUILD_GIT_HASH").to_owned(),
        }
    }
}

pub fn make_app(
    config: ServerConfig,
    entry_store: GuardedEntryStore,
    trackback_store: GuardedTrackbackStore,
    ping_receiver: GuardedPingReceiver,
    publisher: GuardedPublisher,
) -> Result<Router> {
    let state = ServerState::new(
        config,
        entry_store,
        trackback_store,
        ping_receiver,
        publisher,
    );

    let home_router: Router = Router::new()
        .route("/", get(home))
        .with_state(state.clone());

    let app: Router = home_router
        .merge(make_trackback_routes(state.clone()))
        .nest(
            "/v1",
            make_record_routes(state.clone()).merge(make_entry_routes(state.clone())),
        )
        .layer(middleware::from_fn_with_state(state.clone(), log_requests));

    Ok(app)
}

fn make_metrics_app() -> Router {
    Router::new().route("/metrics", get(metrics_handler))
}

pub async fn run_server(
    config: ServerConfig,
    metrics_port: u16,
    entry_store: GuardedEntryStore,
    trackback_store: GuardedTrackbackStore,
    ping_receiver: GuardedPingReceiver,
    publisher: GuardedPublisher,
) -> Result<()> {
    let port = config.port;
    let app = make_app(
        config,
        entry_store,
        trackback_store,
        ping_receiver,
        publisher,
    )?;

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port))
        .await
        .with_context(|| format!("Failed to bind port {}", port))?;
    let metrics_listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", metrics_port))
        .await
        .with_context(|| format!("Failed to bind metrics port {}", metrics_port))?;

    info!("Ready to serve at port {}!", port);
    info!("Metrics available at port {}!", metrics_port);

    let main_server = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    );
    let metrics_server = axum::serve(metrics_listener, make_metrics_app());

    tokio::try_join!(main_server.into_future(), metrics_server.into_future())?;
    Ok(())
}
