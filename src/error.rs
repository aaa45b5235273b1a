use thiserror::Error;

/// Failures scoped to a single collection operation.
///
/// None of these abort the sibling operation; the orchestrator records them
/// in the run summary instead.
#[derive(Error, Debug)]
pub enum CollectorError {
    #[error("secret not found: {name}")]
    CredentialNotFound { name: String },

    #[error("malformed secret {name}: {reason}")]
    CredentialFormat { name: String, reason: String },

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("API request failed: {0}")]
    ApiRequest(String),

    #[error("unexpected API response: {0}")]
    ApiResponseFormat(String),

    #[error("failed to write {key}: {reason}")]
    StorageWrite { key: String, reason: String },
}

impl CollectorError {
    /// Stable identifier reported in the run summary.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CredentialNotFound { .. } => "credential_not_found",
            Self::CredentialFormat { .. } => "credential_format",
            Self::Authentication(_) => "authentication",
            Self::ApiRequest(_) => "api_request",
            Self::ApiResponseFormat(_) => "api_response_format",
            Self::StorageWrite { .. } => "storage_write",
        }
    }
}
