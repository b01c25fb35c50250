//! Error types for handlers and the endpoint.

/// Failure raised by a resource handler or a Block1 callback.
///
/// The engine never lets one of these escape to the transport: it becomes
/// an error-class response (and, inside a transfer, an abnormal end).
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error("handler failed: {0}")]
    Failed(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl HandlerError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EndpointError {
    #[error("protocol loop is closed")]
    Closed,
    #[error("a handler is already registered at /{0}")]
    DuplicateResource(String),
}
