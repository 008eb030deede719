//! Referee client for bicycle-trial competitions.
//!
//! Signs a referee in against the competition backend, then drives the run
//! registration of one zone from a terminal.
//!
//!
//!
//! # Layout
//! - [`api`] talks HTTP to the backend behind the [`api::Backend`] trait
//! - [`session`] keeps roles and cookie between invocations
//! - [`console`] is the interactive referee screen
//! - [`commands`] glues configuration, session and backend for each CLI subcommand
//!
//! Scoring rules, the stopwatch and the registration state machine live in the
//! `scoring` crate and never touch the network.
//!
//!
//!
//! # Setup
//!
//! Start the local mock backend.
//! ```sh
//! cargo run -p tester
//! ```
//!
//! Sign in and referee zone A of competition 7.
//! ```sh
//! cargo run -p referee -- login --email referee@trial.test --password referee
//! cargo run -p referee -- referee --competition 7 --zone A --category Open
//! ```
//!
//! Logs go to stderr, filtered with `RUST_LOG`.
//! ```sh
//! RUST_LOG=client=debug cargo run -p referee -- whoami
//! ```
use tokio::signal::ctrl_c;
#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

pub mod api;
pub mod commands;
pub mod config;
pub mod console;
pub mod error;
pub mod session;

pub fn init_tracing() {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
}

pub async fn shutdown_signal() {
    let ctrl_c = async {
        match ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                warn!("Failed to install Ctrl+C handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                terminate.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                warn!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
