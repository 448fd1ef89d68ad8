use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoachError {
    /// No API credential could be resolved for the completion provider.
    #[error("{0} not configured")]
    Configuration(String),
    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),
    #[error("Invalid credential: {0}")]
    InvalidCredential(String),
    /// Any other upstream failure; carries the upstream message verbatim.
    #[error("{0}")]
    Provider(String),
    #[error("Config load error: {0}")]
    ConfigLoad(String),
}

impl CoachError {
    /// Short machine-readable code for the variant.
    pub fn code(&self) -> &'static str {
        match self {
            CoachError::Configuration(_) => "configuration_error",
            CoachError::QuotaExceeded(_) => "quota_exceeded",
            CoachError::InvalidCredential(_) => "invalid_credential",
            CoachError::Provider(_) => "provider_error",
            CoachError::ConfigLoad(_) => "config_error",
        }
    }
}

pub type Result<T> = std::result::Result<T, CoachError>;
