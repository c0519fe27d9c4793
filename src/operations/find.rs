use crate::client::RedditClient;
use crate::error::RedditClientError;
use crate::models::{is_fullname, CommentSort, KIND_COMMENT};
use crate::tree::{CommentTree, LocationHint};
use chrono_tz::Tz;
use log::{error, info};

/// Configuration options for looking up a single comment in a submission's tree
#[derive(Debug, Clone)]
pub struct FindOptions {
    /// The submission's id or fullname
    pub submission: String,
    /// The comment to look for, as an id or a fullname (ex: c0b75sp or t1_c0b75sp)
    pub comment: String,
    /// Where the comment is expected to be, which decides the search order
    pub hint: LocationHint,
    pub sort: CommentSort,
    /// Keep expanding placeholders until the comment turns up or nothing is left to load
    pub load_all: bool,
    pub request_limit: Option<usize>,
    pub timezone: Tz,
}

/// Result of a find operation
#[derive(Debug)]
pub struct FindResult {
    pub found: bool,
    /// Depth of the comment, 1 for top-level comments
    pub depth: Option<usize>,
    /// Fullname of the thing the comment replies to
    pub parent_id: Option<String>,
    pub formatted_output: String,
}

/// Operation for finding a comment by fullname
pub struct FindOperation {
    options: FindOptions,
    client: RedditClient,
}

impl FindOperation {
    pub fn new(options: FindOptions) -> Result<Self, RedditClientError> {
        let client = RedditClient::new()?;
        Ok(Self { options, client })
    }

    pub fn with_client(options: FindOptions, client: RedditClient) -> Self {
        Self { options, client }
    }

    pub async fn execute(&self) -> Result<FindResult, RedditClientError> {
        let fullname = comment_fullname(&self.options.comment);
        info!(
            "Looking for {} in {} ({:?})",
            fullname, self.options.submission, self.options.hint
        );

        let mut tree = self
            .client
            .fetch_comments(&self.options.submission, self.options.sort, None)
            .await?
            .comments;

        if tree.find_child(&fullname, self.options.hint).is_none() && self.options.load_all {
            let root = tree.root().id();
            let requests = tree
                .load_fully(root, &self.client, None, self.options.request_limit)
                .await?;
            info!("Expanded the tree with {} requests", requests);
        }

        describe(&tree, &fullname, self.options.hint, &self.options.timezone)
    }
}

/// Turn a bare comment id into a fullname, leaving fullnames alone
pub fn comment_fullname(comment: &str) -> String {
    if is_fullname(comment) {
        comment.to_string()
    } else {
        format!("{}_{}", KIND_COMMENT, comment)
    }
}

fn describe(
    tree: &CommentTree,
    fullname: &str,
    hint: LocationHint,
    tz: &Tz,
) -> Result<FindResult, RedditClientError> {
    let Some(node) = tree.find_child(fullname, hint) else {
        return Ok(FindResult {
            found: false,
            depth: None,
            parent_id: None,
            formatted_output: format!("{} not found in {}\n", fullname, tree.submission_fullname()),
        });
    };

    let parent_id = tree.parent_comment_id(node.id())?.to_string();
    let mut output = format!(
        "Found {} at depth {}, replying to {}\n",
        fullname,
        node.depth(),
        parent_id
    );
    output.push_str(&tree.visualize(node.id(), tz)?);

    Ok(FindResult {
        found: true,
        depth: Some(node.depth()),
        parent_id: Some(parent_id),
        formatted_output: output,
    })
}

/// CLI handler function for find command that accepts a preconfigured client
pub async fn handle_find_command_with_client(
    options: FindOptions,
    client: RedditClient,
) -> Result<(), RedditClientError> {
    let operation = FindOperation::with_client(options, client);
    match operation.execute().await {
        Ok(result) => {
            if result.found {
                print!("{}", result.formatted_output);
            } else {
                eprint!("{}", result.formatted_output);
            }
            Ok(())
        }
        Err(err) => {
            error!("Error finding comment: {:?}", err);
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::tests::simple_tree;

    #[test]
    fn normalises_comment_ids() {
        assert_eq!(comment_fullname("abc"), "t1_abc");
        assert_eq!(comment_fullname("t1_abc"), "t1_abc");
    }

    #[test]
    fn describes_found_comments() {
        let tree = simple_tree();
        for hint in LocationHint::ALL {
            let result = describe(&tree, "t1_g", hint, &chrono_tz::UTC).unwrap();
            assert!(result.found);
            assert_eq!(result.depth, Some(3));
            assert_eq!(result.parent_id.as_deref(), Some("t1_c"));
            assert!(result.formatted_output.starts_with("Found t1_g at depth 3, replying to t1_c\n"));
        }
    }

    #[test]
    fn describes_missing_comments() {
        let tree = simple_tree();
        let result = describe(&tree, "t1_nope", LocationHint::NearTop, &chrono_tz::UTC).unwrap();
        assert!(!result.found);
        assert_eq!(result.depth, None);
    }
}
