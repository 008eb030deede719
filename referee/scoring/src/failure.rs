//! Classification of failed backend calls into operator-facing messages.
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// No response received.
    Network,
    Authentication,
    Authorization,
    NotFound,
    Validation,
    Server,
    Unexpected,
}

impl FailureKind {
    pub fn from_status(status: u16) -> Self {
        match status {
            401 => FailureKind::Authentication,
            403 => FailureKind::Authorization,
            404 => FailureKind::NotFound,
            400..=499 => FailureKind::Validation,
            500..=599 => FailureKind::Server,
            _ => FailureKind::Unexpected,
        }
    }

    /// Permission denials stay denied; everything else may be retried by the operator.
    pub fn is_retryable(self) -> bool {
        self != FailureKind::Authorization
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct Failure {
    pub kind: FailureKind,
    pub status: Option<u16>,
    pub message: String,
}

impl Failure {
    pub fn network() -> Self {
        Self {
            kind: FailureKind::Network,
            status: None,
            message: "Unable to connect to the server. Please check your internet connection and try again."
                .to_string(),
        }
    }

    pub fn unexpected() -> Self {
        Self {
            kind: FailureKind::Unexpected,
            status: None,
            message: "An unexpected error occurred. Please try again.".to_string(),
        }
    }

    /// A non-blank message from the server wins over the default for the status.
    pub fn from_status(status: u16, server_message: Option<&str>) -> Self {
        let message = server_message
            .map(str::trim)
            .filter(|message| !message.is_empty())
            .map_or_else(|| default_message(status), ToString::to_string);

        Self {
            kind: FailureKind::from_status(status),
            status: Some(status),
            message,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

fn default_message(status: u16) -> String {
    match status {
        401 => "Session expired or invalid credentials. Please login again.".to_string(),
        403 => "You do not have permission to perform this action.".to_string(),
        404 => "The requested resource was not found.".to_string(),
        500 => "Internal server error. Please try again later or contact support.".to_string(),
        502..=504 => "The server is temporarily unavailable. Please try again later.".to_string(),
        other => format!("An unexpected error occurred ({other}). Please try again."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_kinds() {
        assert_eq!(FailureKind::from_status(401), FailureKind::Authentication);
        assert_eq!(FailureKind::from_status(403), FailureKind::Authorization);
        assert_eq!(FailureKind::from_status(404), FailureKind::NotFound);
        assert_eq!(FailureKind::from_status(422), FailureKind::Validation);
        assert_eq!(FailureKind::from_status(503), FailureKind::Server);
        assert_eq!(FailureKind::from_status(302), FailureKind::Unexpected);
    }

    #[test]
    fn test_default_messages() {
        assert_eq!(
            Failure::from_status(404, None).message,
            "The requested resource was not found."
        );
        assert_eq!(
            Failure::from_status(504, Some("   ")).message,
            "The server is temporarily unavailable. Please try again later."
        );
        assert_eq!(
            Failure::from_status(418, None).message,
            "An unexpected error occurred (418). Please try again."
        );
    }

    #[test]
    fn test_server_message_wins() {
        let failure = Failure::from_status(400, Some("dossard already has 3 runs"));

        assert_eq!(failure.kind, FailureKind::Validation);
        assert_eq!(failure.to_string(), "dossard already has 3 runs");
    }

    #[test]
    fn test_authorization_not_retryable() {
        assert!(!Failure::from_status(403, None).is_retryable());
        assert!(Failure::from_status(401, None).is_retryable());
        assert!(Failure::network().is_retryable());
    }
}
