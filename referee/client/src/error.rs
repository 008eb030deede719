use scoring::{CompetitionError, Failure, FlowError, zone::ZoneError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("{0}")]
    Rejected(Failure),

    #[error("Malformed payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),

    #[error("Session file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid {key} value: {reason}")]
    Config { key: String, reason: String },

    #[error("Not signed in, run `referee login` first")]
    SignedOut,

    #[error("{0}")]
    Denied(String),

    #[error("Zone {zone} ({category}) not found in competition {competition_id}")]
    UnknownZone {
        competition_id: u64,
        zone: String,
        category: String,
    },

    #[error("Run {run_number} of dossard {dossard} not found in competition {competition_id}")]
    UnknownRun {
        competition_id: u64,
        dossard: u32,
        run_number: u32,
    },

    #[error(transparent)]
    Flow(#[from] FlowError),

    #[error(transparent)]
    Zone(#[from] ZoneError),

    #[error(transparent)]
    Competition(#[from] CompetitionError),
}

impl AppError {
    pub fn denied() -> Self {
        AppError::Denied("You do not have permission to perform this action.".to_string())
    }

    /// Operator-facing classification of a failed backend call.
    pub fn failure(&self) -> Failure {
        match self {
            AppError::Rejected(failure) => failure.clone(),
            AppError::Request(error) if error.is_decode() => Failure::unexpected(),
            AppError::Request(error) => match error.status() {
                Some(status) => Failure::from_status(status.as_u16(), None),
                None => Failure::network(),
            },
            _ => Failure::unexpected(),
        }
    }
}
