use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

/// The submission half of a comments page. Only the fields needed to head a comment tree are
/// modelled; everything else is kept in `additional_fields`.
#[derive(Deserialize, Debug, Clone)]
pub struct Submission {
    pub id: String,
    pub name: String,
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub subreddit_name_prefixed: String,
    #[serde(default)]
    pub permalink: String,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub num_comments: i64,
    #[serde(default)]
    pub is_self: bool,
    #[serde(default)]
    pub selftext: String,
    #[serde(default)]
    pub url: String,

    // Additional fields we don't explicitly model
    #[serde(flatten)]
    pub additional_fields: HashMap<String, Value>,
}

impl Submission {
    /// Get a short summary for the submission (title, author, score)
    pub fn format_short_summary(&self) -> String {
        format!(
            "[{} | {} pts | {} comments] {} - by u/{}",
            self.subreddit_name_prefixed, self.score, self.num_comments, self.title, self.author
        )
    }
}
