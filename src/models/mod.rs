use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

use crate::error::RedditClientError;

pub mod comment;
pub mod more_children;
pub mod submission;

pub use comment::{Comment, Reply};
pub use more_children::MoreChildren;
pub use submission::Submission;

/// Kind prefix for comments
pub const KIND_COMMENT: &str = "t1";
/// Kind prefix for submissions (links and self posts)
pub const KIND_SUBMISSION: &str = "t3";
/// Kind used by "load more comments" placeholders
pub const KIND_MORE: &str = "more";

/// A raw Reddit envelope: every object the API returns carries a `kind` and a `data` payload.
/// The payload is kept as JSON until the kind has been checked.
#[derive(Deserialize, Debug, Clone)]
pub struct Thing {
    /// An identifier that specifies the type of object that this is.
    /// - t1 - Comment
    /// - t3 - Link
    /// - more - Placeholder for comments that were not returned
    pub kind: String,
    pub data: serde_json::Value,
}

impl Thing {
    /// Convert the envelope into a typed comment or placeholder.
    ///
    /// Any kind other than `t1` or `more` is a protocol error.
    pub fn into_reply(self) -> Result<Reply, RedditClientError> {
        match self.kind.as_str() {
            KIND_COMMENT => Ok(Reply::Comment(Box::new(serde_json::from_value(self.data)?))),
            KIND_MORE => Ok(Reply::More(serde_json::from_value(self.data)?)),
            _ => Err(RedditClientError::UnexpectedThing { kind: self.kind }),
        }
    }
}

/// Top-level response for Reddit listings
#[derive(Deserialize, Debug)]
pub struct Listing<T> {
    pub kind: String,
    pub data: ListingData<T>,
}

/// Page of children in a listing
#[derive(Deserialize, Debug)]
pub struct ListingData<T> {
    pub after: Option<String>,
    pub before: Option<String>,
    #[serde(default)]
    pub modhash: Option<String>,
    pub children: Vec<T>,
}

/// Sort orders accepted by the comments and morechildren endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommentSort {
    #[default]
    Confidence,
    Top,
    New,
    Hot,
    Controversial,
    Old,
    Qa,
    Random,
}

impl CommentSort {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommentSort::Confidence => "confidence",
            CommentSort::Top => "top",
            CommentSort::New => "new",
            CommentSort::Hot => "hot",
            CommentSort::Controversial => "controversial",
            CommentSort::Old => "old",
            CommentSort::Qa => "qa",
            CommentSort::Random => "random",
        }
    }
}

impl fmt::Display for CommentSort {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommentSort {
    type Err = RedditClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "confidence" | "best" => Ok(CommentSort::Confidence),
            "top" => Ok(CommentSort::Top),
            "new" => Ok(CommentSort::New),
            "hot" => Ok(CommentSort::Hot),
            "controversial" => Ok(CommentSort::Controversial),
            "old" => Ok(CommentSort::Old),
            "qa" => Ok(CommentSort::Qa),
            "random" => Ok(CommentSort::Random),
            other => Err(RedditClientError::ApiError(format!(
                "Unknown comment sort: {}",
                other
            ))),
        }
    }
}

/// Checks if a string looks like a fullname, e.g. "t3_92dd8" or "t1_c0b75sp"
pub fn is_fullname(name: &str) -> bool {
    match name.split_once('_') {
        Some((kind, id)) => {
            kind.len() == 2
                && kind.starts_with('t')
                && kind[1..].chars().all(|c| c.is_ascii_digit())
                && !id.is_empty()
                && id.chars().all(|c| c.is_ascii_alphanumeric())
        }
        None => false,
    }
}

/// Build a submission fullname from a bare id, leaving existing fullnames alone
pub fn submission_fullname(id: &str) -> String {
    if id.starts_with("t3_") {
        id.to_string()
    } else {
        format!("{}_{}", KIND_SUBMISSION, id)
    }
}

/// Strip the kind prefix from a fullname
pub fn strip_kind(fullname: &str) -> &str {
    match fullname.split_once('_') {
        Some((_, id)) if is_fullname(fullname) => id,
        _ => fullname,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn recognises_fullnames() {
        assert!(is_fullname("t3_92dd8"));
        assert!(is_fullname("t1_c0b75sp"));
        assert!(!is_fullname("92dd8"));
        assert!(!is_fullname("t3_"));
        assert!(!is_fullname("x3_abc"));
        assert!(!is_fullname("t3_ab-c"));
    }

    #[test]
    fn builds_submission_fullnames() {
        assert_eq!(submission_fullname("92dd8"), "t3_92dd8");
        assert_eq!(submission_fullname("t3_92dd8"), "t3_92dd8");
        assert_eq!(strip_kind("t3_92dd8"), "92dd8");
        assert_eq!(strip_kind("92dd8"), "92dd8");
    }

    #[test]
    fn parses_sort_names() {
        assert_eq!("top".parse::<CommentSort>().unwrap(), CommentSort::Top);
        assert_eq!("Best".parse::<CommentSort>().unwrap(), CommentSort::Confidence);
        assert!("sideways".parse::<CommentSort>().is_err());
        assert_eq!(CommentSort::default().to_string(), "confidence");
    }

    #[test]
    fn rejects_unknown_kinds() {
        let thing = Thing {
            kind: "t5".to_string(),
            data: json!({}),
        };
        match thing.into_reply() {
            Err(RedditClientError::UnexpectedThing { kind }) => assert_eq!(kind, "t5"),
            other => panic!("expected UnexpectedThing, got {:?}", other),
        }
    }
}
