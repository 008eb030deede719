//! In-memory stand-in for the competition backend.
//!
//! Serves the routes the referee client calls, with cookie sessions and the same
//! role rules, so the client can be exercised without the real service.
//!
//! # Demo data
//! - `admin@trial.test` / `admin` with `admin:*`
//! - `referee@trial.test` / `referee` with `referee:7`
//! - `organizer@trial.test` / `organizer` with `create:competition`
//! - Competitions 7 and 8, zone `A` in category `Open` and dossard 42 in competition 7
use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    Router,
    http::{Method, header::CONTENT_TYPE},
    routing::{get, post},
};
use tokio::{net::TcpListener, signal::ctrl_c};
use tower_http::cors::CorsLayer;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

pub mod error;
pub mod routes;
pub mod state;

use routes::{
    add_zone_handler, competitions_handler, create_competition_handler, delete_run_handler,
    delete_zone_handler, login_handler, logout_handler, participant_handler,
    participant_runs_handler, run_handler, update_run_handler, update_zone_handler,
    zones_handler,
};
use state::MockState;

pub fn router(state: Arc<MockState>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/login", post(login_handler))
        .route("/logout", post(logout_handler))
        .route(
            "/competition/{competition_id}/participant/{dossard}",
            get(participant_handler),
        )
        .route(
            "/competition",
            get(competitions_handler).post(create_competition_handler),
        )
        .route(
            "/competition/{competition_id}/participant/{dossard}/runs",
            get(participant_runs_handler),
        )
        .route(
            "/run",
            post(run_handler)
                .put(update_run_handler)
                .delete(delete_run_handler),
        )
        .route("/competition/{competition_id}/zones", get(zones_handler))
        .route(
            "/competition/zone",
            post(add_zone_handler)
                .put(update_zone_handler)
                .delete(delete_zone_handler),
        )
        .layer(cors)
        .with_state(state)
}

/// Serves on an ephemeral local port in the background.
pub async fn spawn(state: Arc<MockState>) -> anyhow::Result<SocketAddr> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let address = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router(state)).await {
            warn!("Mock backend stopped: {e}");
        }
    });

    Ok(address)
}

pub async fn start_tester(port: u16) -> anyhow::Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Seeding demo data...");
    let state = MockState::demo();

    let address = format!("0.0.0.0:{port}");
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address).await?;
    info!("Mock backend running on {address}");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            if ctrl_c().await.is_ok() {
                info!("Received Ctrl+C, shutting down");
            }
        })
        .await?;

    Ok(())
}
