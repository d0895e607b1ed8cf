//! Error types for the expense tracker client.

use thiserror::Error;

/// Errors returned by [`crate::ApiClient`] and the query layer.
///
/// `Clone` so a failure can be shared by every caller waiting on the same
/// cache entry.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClientError {
    /// The request never produced a response
    #[error("Request failed: {0}")]
    Network(String),

    /// Envelope or transport status 401 or 403
    #[error("Not authorized ({status}): {message}")]
    Auth { status: u16, message: String },

    /// Envelope with `success: false`
    #[error("Request was not successful ({status}): {message}")]
    Unsuccessful { status: u16, message: String },

    /// Response body did not match the expected shape
    #[error("Unexpected response data: {0}")]
    Data(String),

    #[error("Invalid server URL: {0}")]
    InvalidUrl(String),
}

impl ClientError {
    /// Classifies a failed request by its envelope or transport status.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 | 403 => ClientError::Auth { status, message },
            _ => ClientError::Unsuccessful { status, message },
        }
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, ClientError::Auth { .. })
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert!(ClientError::from_status(401, "These credentials do not match our records.").is_auth());
        assert!(ClientError::from_status(403, "This action is unauthorized.").is_auth());
        assert_eq!(
            ClientError::from_status(400, "Unauthenticated."),
            ClientError::Unsuccessful {
                status: 400,
                message: "Unauthenticated.".to_string()
            }
        );
    }
}
