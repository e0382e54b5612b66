use gf_client::FetchError;
use gf_engine::StoreError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// Messages from the core parsers (config, document, pair shorthand).
    #[error("{0}")]
    Invalid(String),

    #[error("mapping store: {0}")]
    Store(#[from] StoreError),

    #[error("feed: {0}")]
    Fetch(#[from] FetchError),

    #[error("encoding output: {0}")]
    Output(#[from] serde_json::Error),
}

impl From<String> for CliError {
    fn from(message: String) -> Self {
        CliError::Invalid(message)
    }
}
