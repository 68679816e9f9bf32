use thiserror::Error;

/// Fatal feed problems, surfaced from the build step. Recoverable data
/// issues (a stop with unusable coordinates, a trip whose times go
/// backwards) are logged and repaired during indexing instead.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("required feed file missing: {0}")]
    Missing(String),
    #[error("{file}: {message}")]
    Malformed { file: String, message: String },
}

impl FeedError {
    pub(crate) fn malformed(file: &str, err: anyhow::Error) -> Self {
        Self::Malformed {
            file: file.to_string(),
            message: format!("{err:#}"),
        }
    }
}
