use chrono::{DateTime, Utc};

pub type Result<T> = std::result::Result<T, BlockDatetimeError>;

#[derive(Debug, thiserror::Error)]
pub enum BlockDatetimeError {
    #[error("Timestamp {0} is before the earliest block.")]
    TimestampBeforeEarliestBlock(DateTime<Utc>),

    #[error("Block {0} not found on chain.")]
    BlockNotFound(u64),

    #[error("Failed to parse datetime: {0}.")]
    InvalidDatetime(String),

    #[error("Datetime is out of the representable range.")]
    DatetimeOutOfRange,

    #[error("Range duration must be non-zero.")]
    InvalidRangeDuration,

    #[error("No public block explorer API known for chain id {0}.")]
    ExplorerNotSupported(u64),

    #[error("Unexpected response from block explorer: {0}.")]
    UnexpectedExplorerResponse(String),

    #[error("Failed to parse URL: {0}. (Error: {1:?})")]
    UrlParsingFailed(String, url::ParseError),

    #[error(transparent)]
    TransportError(#[from] alloy::transports::TransportError),

    #[error(transparent)]
    ReqwestError(#[from] reqwest::Error),
}
