use reqwest::Error as ReqwestError;
use thiserror::Error;

/// Errors raised while talking to Reddit or while working with the comment tree
#[derive(Debug, Error)]
pub enum RedditClientError {
    #[error("Request error: {0}")]
    RequestError(#[from] ReqwestError),

    #[error("Reddit API error: {0}")]
    ApiError(String),

    #[error("Parse error: {0}")]
    ParseError(#[from] serde_json::Error),

    /// A fetched object was neither a comment nor a "more" placeholder
    #[error("Unexpected thing of kind '{kind}', expecting t1 or more")]
    UnexpectedThing { kind: String },

    /// An operation that makes no sense for the given node, e.g. asking the root for its parent
    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Expecting a fullname, got '{0}'")]
    InvalidFullname(String),

    #[error("{0} environment variable must be set")]
    MissingConfig(&'static str),
}
