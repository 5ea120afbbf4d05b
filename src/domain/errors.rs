use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Entity not found: {0}")]
    NotFound(String),
    #[error("Assignment not processable: {0}")]
    NotProcessable(String),
    #[error("Cannot determine LTI instance: {0}")]
    Indeterminable(String),
    #[error("Invalid protocol body: {0}")]
    InvalidProtocolBody(String),
    #[error("Invalid signature: {0}")]
    SignatureInvalid(String),
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

pub type DomainResult<T> = Result<T, DomainError>;
