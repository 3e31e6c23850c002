use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("malformed `{entity}` document: {message}")]
    Malformed {
        entity: &'static str,
        message: String,
    },
}

impl DomainError {
    pub fn malformed(entity: &'static str, message: impl Into<String>) -> Self {
        Self::Malformed {
            entity,
            message: message.into(),
        }
    }
}
