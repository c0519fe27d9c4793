use crate::client::RedditClient;
use crate::error::RedditClientError;
use crate::models::{CommentSort, Submission};
use crate::tree::{CommentTree, MoreChildrenFetcher};
use chrono_tz::Tz;
use log::{error, info};

/// Configuration options for fetching a comment tree
#[derive(Debug, Clone)]
pub struct CommentsOptions {
    /// The submission's id or fullname (ex: 92dd8 or t3_92dd8)
    pub submission: String,
    /// Sort order for the initial listing and every later morechildren request
    pub sort: CommentSort,
    /// Only show this comment (id without prefix) and its replies
    pub focus: Option<String>,
    /// Expand every "load more comments" placeholder before rendering
    pub load_all: bool,
    /// Do not expand placeholders below this depth
    pub depth_limit: Option<usize>,
    /// Send at most this many morechildren requests
    pub request_limit: Option<usize>,
    /// Timezone used to display comment timestamps
    pub timezone: Tz,
}

impl Default for CommentsOptions {
    fn default() -> Self {
        Self {
            submission: String::new(),
            sort: CommentSort::default(),
            focus: None,
            load_all: false,
            depth_limit: None,
            request_limit: None,
            timezone: chrono_tz::America::Los_Angeles,
        }
    }
}

/// Result of a comments fetch operation
#[derive(Debug)]
pub struct CommentsResult {
    pub submission: Submission,
    pub tree: CommentTree,
    /// Number of morechildren requests sent while expanding
    pub requests: usize,
    /// Formatted output (for CLI display)
    pub formatted_output: String,
}

/// Operation for fetching, expanding and rendering the comments of a submission
pub struct CommentsOperation {
    options: CommentsOptions,
    client: RedditClient,
}

impl CommentsOperation {
    /// Create a new comments operation with an anonymous client
    pub fn new(options: CommentsOptions) -> Result<Self, RedditClientError> {
        let client = RedditClient::new()?;
        Ok(Self { options, client })
    }

    /// Create a new comments operation with a custom Reddit client
    pub fn with_client(options: CommentsOptions, client: RedditClient) -> Self {
        Self { options, client }
    }

    pub async fn execute(&self) -> Result<CommentsResult, RedditClientError> {
        info!(
            "Fetching comments of {} sorted by {}",
            self.options.submission, self.options.sort
        );

        let page = self
            .client
            .fetch_comments(
                &self.options.submission,
                self.options.sort,
                self.options.focus.as_deref(),
            )
            .await?;
        let submission = page.submission;
        let mut tree = page.comments;

        let requests = expand(&self.options, &mut tree, &self.client).await?;
        let formatted_output = format_tree(&submission, &tree, &self.options.timezone)?;

        Ok(CommentsResult {
            submission,
            tree,
            requests,
            formatted_output,
        })
    }
}

/// Load hidden comments if the options ask for it. Returns the number of requests sent.
async fn expand<F>(
    options: &CommentsOptions,
    tree: &mut CommentTree,
    fetcher: &F,
) -> Result<usize, RedditClientError>
where
    F: MoreChildrenFetcher,
{
    if !options.load_all {
        return Ok(0);
    }

    let root = tree.root().id();
    let requests = tree
        .load_fully(root, fetcher, options.depth_limit, options.request_limit)
        .await?;
    info!(
        "Expanded {} with {} requests, {} comments loaded",
        tree.submission_fullname(),
        requests,
        tree.len()
    );
    Ok(requests)
}

pub(crate) fn format_tree(
    submission: &Submission,
    tree: &CommentTree,
    tz: &Tz,
) -> Result<String, RedditClientError> {
    let mut output = String::new();
    output.push_str(&submission.format_short_summary());
    output.push('\n');

    if tree.is_empty() && !tree.root().has_more_children() {
        output.push_str("No comments found.\n");
    } else {
        output.push_str(&tree.visualize(tree.root().id(), tz)?);
    }
    Ok(output)
}

/// CLI handler function for comments command that accepts a preconfigured client
pub async fn handle_comments_command_with_client(
    options: CommentsOptions,
    client: RedditClient,
) -> Result<(), RedditClientError> {
    let operation = CommentsOperation::with_client(options, client);
    match operation.execute().await {
        Ok(result) => {
            print!("{}", result.formatted_output);
            Ok(())
        }
        Err(err) => {
            error!("Error fetching comments: {:?}", err);
            Err(err)
        }
    }
}
