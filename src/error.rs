use thiserror::Error;

/// Errors surfaced across the source operation boundary.
///
/// Degraded-data conditions (secondary metadata, filler data, curated
/// releases, token logins) never reach this type - the service clients
/// downgrade them to empty results and log instead.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Missing or malformed user configuration. Not retryable.
    #[error("{0}")]
    Config(String),

    /// An upstream service rejected the request outright.
    #[error("{0}")]
    Api(String),

    /// The episode identifier carries none of the IDs the aggregator accepts.
    #[error("no usable ID found in episode identifier")]
    NoUsableId,

    /// The aggregator response had no data object.
    #[error("aggregator returned no data")]
    NoData,

    /// The aggregator returned an empty result set.
    #[error("no streams found")]
    NoStreams,

    /// Any other upstream failure, with context attached.
    #[error(transparent)]
    Upstream(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, SourceError>;
