use thiserror::Error;

#[derive(Error, Debug)]
pub enum MpcError {
    #[error("Repository operation failed: {source}")]
    Repository {
        #[from]
        source: crate::repository::RepositoryError,
    },

    #[error("Encoding failed: {source}")]
    Encoding {
        #[from]
        source: crate::encoding::EncodingError,
    },

    #[error("Invalid configuration: {source}")]
    Config {
        #[from]
        source: crate::config::ConfigError,
    },

    #[error("Operation not supported: {operation}")]
    Unsupported { operation: &'static str },
}

pub type MpcResult<T> = Result<T, MpcError>;
