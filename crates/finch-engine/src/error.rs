use finch_core::errors::ProviderError;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("agent {0} does not exist")]
    UnknownAgent(String),

    #[error("output channel closed by consumer")]
    OutputClosed,

    #[error("internal error: {0}")]
    Internal(String),
}
