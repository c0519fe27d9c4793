use crate::config::AppConfig;
use crate::error::RedditClientError;
use crate::models::{
    strip_kind, submission_fullname, CommentSort, Listing, Reply, Submission, Thing, KIND_COMMENT,
    KIND_SUBMISSION,
};
use crate::tree::{
    CommentTree, MoreChildrenFetcher, MoreChildrenLock, MoreChildrenRequest,
    ThreadContinuationRequest,
};
use log::debug;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use url::Url;

const OAUTH_BASE_URL: &str = "https://oauth.reddit.com";
const PUBLIC_BASE_URL: &str = "https://www.reddit.com";
const ACCESS_TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";

/// Body of a `/api/morechildren` response
#[derive(Deserialize, Debug)]
struct MoreChildrenResponse {
    json: MoreChildrenJson,
}

#[derive(Deserialize, Debug)]
struct MoreChildrenJson {
    #[serde(default)]
    errors: Vec<serde_json::Value>,
    data: Option<ThingList>,
}

#[derive(Deserialize, Debug)]
struct ThingList {
    things: Vec<Thing>,
}

/// A submission together with its comment tree
#[derive(Debug)]
pub struct CommentsPage {
    pub submission: Submission,
    pub comments: CommentTree,
}

#[derive(Clone)]
pub struct RedditClient {
    pub client: Client,
    pub access_token: Option<String>,
    pub user_agent: String,
    /// Shared by every clone of this client so morechildren requests never overlap
    more_children_lock: Arc<MoreChildrenLock>,
}

impl RedditClient {
    pub fn new() -> Result<Self, RedditClientError> {
        Self::with_user_agent(format!("redtree/{}", env!("CARGO_PKG_VERSION")))
    }

    pub fn with_user_agent(user_agent: String) -> Result<Self, RedditClientError> {
        Ok(Self {
            client: Self::get_client(&user_agent)?,
            access_token: None,
            user_agent,
            more_children_lock: Arc::new(MoreChildrenLock::new()),
        })
    }

    /// Create a client from a configuration object
    pub fn from_config(config: &AppConfig) -> Result<Self, RedditClientError> {
        debug!(
            "Creating RedditClient with user_agent: {}",
            config.user_agent
        );
        let mut client = Self::with_user_agent(config.user_agent.clone())?;

        // If we have a direct access token, use it
        if let Some(token) = &config.access_token {
            client.access_token = Some(token.clone());
        }

        Ok(client)
    }

    fn get_client(user_agent: &str) -> Result<Client, RedditClientError> {
        Ok(Client::builder().user_agent(user_agent).build()?)
    }

    /// Get an application-only access token for reading public data.
    ///
    /// This token cannot be used for actions that require a user account.
    pub async fn get_access_token(&mut self, client_id: &str) -> Result<String, RedditClientError> {
        let params = [
            (
                "grant_type",
                "https://oauth.reddit.com/grants/installed_client",
            ),
            ("device_id", "DO_NOT_TRACK_THIS_DEVICE"),
        ];

        // Installed apps have no secret, so the client_id is followed by an empty password
        let token = self.request_token(client_id, "", &params).await?;
        debug!("Application-only access token successfully obtained");
        Ok(token)
    }

    /// Authenticate with Reddit using API credentials for a script app (password grant).
    ///
    /// # Arguments
    /// * `client_id` - Your Reddit API client ID
    /// * `client_secret` - Your Reddit API client secret
    /// * `username` - Your Reddit username
    /// * `password` - Your Reddit password
    pub async fn authenticate_with_api_credentials(
        &mut self,
        client_id: &str,
        client_secret: &str,
        username: &str,
        password: &str,
    ) -> Result<String, RedditClientError> {
        let params = [
            ("grant_type", "password"),
            ("username", username),
            ("password", password),
            ("scope", "identity read"),
        ];

        let token = self
            .request_token(client_id, client_secret, &params)
            .await?;
        debug!("API authentication successful for {}", username);
        Ok(token)
    }

    async fn request_token(
        &mut self,
        client_id: &str,
        client_secret: &str,
        params: &[(&str, &str)],
    ) -> Result<String, RedditClientError> {
        let auth = base64::encode(format!("{}:{}", client_id, client_secret));

        let res = self
            .client
            .post(ACCESS_TOKEN_URL)
            .header("Authorization", format!("Basic {}", auth))
            .form(params)
            .send()
            .await?;

        // Check for HTTP errors
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await?;
            return Err(RedditClientError::ApiError(format!(
                "Authentication failed: HTTP {}: {}",
                status, body
            )));
        }

        let json: serde_json::Value = res.json().await?;

        // Check for API errors
        if let Some(error) = json["error"].as_str() {
            return Err(RedditClientError::ApiError(format!(
                "Authentication failed: {}",
                error
            )));
        }

        let token = json["access_token"]
            .as_str()
            .ok_or_else(|| {
                RedditClientError::ApiError(
                    "Failed to extract access token from response".to_string(),
                )
            })?
            .to_string();

        // Store the token for future use
        self.access_token = Some(token.clone());
        Ok(token)
    }

    fn base_url(&self) -> &'static str {
        if self.access_token.is_some() {
            OAUTH_BASE_URL
        } else {
            PUBLIC_BASE_URL
        }
    }

    fn endpoint(&self, path: &str, query: &[(&str, &str)]) -> Result<Url, RedditClientError> {
        build_url(self.base_url(), path, query)
    }

    /// Send a GET request and parse the JSON body
    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, RedditClientError> {
        debug!("Fetching {}", url);

        let mut req_builder = self.client.get(url);
        if let Some(token) = &self.access_token {
            req_builder = req_builder.header("Authorization", format!("Bearer {}", token));
        }

        let response = req_builder.send().await?;
        let status = response.status();
        debug!("Response status: {}", status);

        if !status.is_success() {
            return Err(RedditClientError::ApiError(format!(
                "Server returned error status: {}",
                status
            )));
        }

        let body = response.text().await?;
        debug!("Response body length: {} bytes", body.len());

        serde_json::from_str(&body).map_err(|e| {
            debug!("First 100 chars: {}", body.chars().take(100).collect::<String>());
            RedditClientError::ParseError(e)
        })
    }

    /// Fetch a submission and its comment tree.
    ///
    /// # Arguments
    /// * `submission_id` - The submission's id or fullname (ex: 92dd8 or t3_92dd8)
    /// * `sort` - How comments should be sorted, also used when loading more later
    /// * `focus` - Only return this comment (id without prefix) and its replies
    pub async fn fetch_comments(
        &self,
        submission_id: &str,
        sort: CommentSort,
        focus: Option<&str>,
    ) -> Result<CommentsPage, RedditClientError> {
        let path = format!("/comments/{}.json", strip_kind(submission_id));
        let mut query = vec![("sort", sort.as_str()), ("raw_json", "1")];
        if let Some(focus) = focus {
            query.push(("comment", focus));
        }

        let (submissions, comments): (Listing<Thing>, Listing<Reply>) =
            self.get_json(self.endpoint(&path, &query)?).await?;

        parse_comments_page(
            &submission_fullname(submission_id),
            submissions,
            comments,
            sort,
        )
    }

    /// Call `/api/morechildren`. Callers should hold the client's morechildren lock; going through
    /// [`CommentTree::load_more_comments`] takes care of that.
    pub async fn fetch_more_children(
        &self,
        request: &MoreChildrenRequest,
    ) -> Result<Vec<Thing>, RedditClientError> {
        let children = request.children.join(",");
        let query = [
            ("api_type", "json"),
            ("children", children.as_str()),
            ("link_id", request.link_id.as_str()),
            ("sort", request.sort.as_str()),
            ("raw_json", "1"),
        ];

        let response: MoreChildrenResponse = self
            .get_json(self.endpoint("/api/morechildren.json", &query)?)
            .await?;
        things_from_response(response)
    }
}

impl MoreChildrenFetcher for RedditClient {
    fn more_children_lock(&self) -> &MoreChildrenLock {
        &self.more_children_lock
    }

    async fn fetch_more_children(
        &self,
        request: &MoreChildrenRequest,
    ) -> Result<Vec<Thing>, RedditClientError> {
        RedditClient::fetch_more_children(self, request).await
    }

    async fn fetch_thread_continuation(
        &self,
        request: &ThreadContinuationRequest,
    ) -> Result<Vec<Thing>, RedditClientError> {
        let path = format!("/comments/{}.json", strip_kind(&request.link_id));
        let query = [
            ("sort", request.sort.as_str()),
            ("comment", request.focus.as_str()),
            ("raw_json", "1"),
        ];

        let (_, comments): (serde_json::Value, Listing<Thing>) =
            self.get_json(self.endpoint(&path, &query)?).await?;
        thread_replies(comments, &request.focus)
    }
}

fn build_url(base: &str, path: &str, query: &[(&str, &str)]) -> Result<Url, RedditClientError> {
    Url::parse_with_params(&format!("{}{}", base, path), query)
        .map_err(|e| RedditClientError::ApiError(format!("Invalid URL for {}: {}", path, e)))
}

fn parse_comments_page(
    fullname: &str,
    submissions: Listing<Thing>,
    comments: Listing<Reply>,
    sort: CommentSort,
) -> Result<CommentsPage, RedditClientError> {
    let thing = submissions
        .data
        .children
        .into_iter()
        .find(|thing| thing.kind == KIND_SUBMISSION)
        .ok_or_else(|| {
            RedditClientError::ApiError(format!("No submission returned for {}", fullname))
        })?;
    let submission: Submission = serde_json::from_value(thing.data)?;

    let comments = CommentTree::from_replies(&submission.name, comments.data.children, sort)?;
    debug!(
        "Built comment tree for {} with {} comments",
        submission.name,
        comments.len()
    );

    Ok(CommentsPage {
        submission,
        comments,
    })
}

fn things_from_response(response: MoreChildrenResponse) -> Result<Vec<Thing>, RedditClientError> {
    if !response.json.errors.is_empty() {
        return Err(RedditClientError::ApiError(format!(
            "Reddit API returned an error: {:?}",
            response.json.errors
        )));
    }

    let things = response
        .json
        .data
        .map(|data| data.things)
        .unwrap_or_default();
    debug!("morechildren returned {} things", things.len());
    Ok(things)
}

/// Pull the replies of the focused comment out of a comments listing, in pre-order
fn thread_replies(comments: Listing<Thing>, focus: &str) -> Result<Vec<Thing>, RedditClientError> {
    let focus_fullname = format!("{}_{}", KIND_COMMENT, focus);
    let focused = comments
        .data
        .children
        .into_iter()
        .find(|thing| thing.kind == KIND_COMMENT && thing.data["name"] == focus_fullname.as_str())
        .ok_or_else(|| {
            RedditClientError::ApiError(format!("Comment {} was not returned", focus_fullname))
        })?;

    match &focused.data["replies"] {
        serde_json::Value::Object(_) => {
            let replies: Listing<Thing> = serde_json::from_value(focused.data["replies"].clone())?;
            Ok(replies.data.children)
        }
        _ => Ok(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{LocationHint, TraversalOrder};
    use serde_json::json;

    fn comments_listing(children: serde_json::Value) -> serde_json::Value {
        json!({"kind": "Listing", "data": {"after": null, "before": null, "children": children}})
    }

    #[test]
    fn builds_endpoint_urls() {
        let url = build_url(
            PUBLIC_BASE_URL,
            "/api/morechildren.json",
            &[("children", "a,b"), ("link_id", "t3_x")],
        )
        .unwrap();
        assert_eq!(
            url.as_str(),
            "https://www.reddit.com/api/morechildren.json?children=a%2Cb&link_id=t3_x"
        );
    }

    #[test]
    fn parses_a_comments_page() {
        let body = json!([
            comments_listing(json!([{"kind": "t3", "data": {
                "id": "x", "name": "t3_x", "title": "Title", "author": "op"
            }}])),
            comments_listing(json!([
                {"kind": "t1", "data": {
                    "id": "a", "name": "t1_a", "parent_id": "t3_x", "body": "first",
                    "replies": comments_listing(json!([
                        {"kind": "t1", "data": {"id": "b", "name": "t1_b", "parent_id": "t1_a", "replies": ""}}
                    ]))
                }},
                {"kind": "more", "data": {
                    "id": "c", "name": "t1_c", "parent_id": "t3_x", "count": 1, "children": ["c"]
                }}
            ]))
        ]);

        let (submissions, comments): (Listing<Thing>, Listing<Reply>) =
            serde_json::from_value(body).unwrap();
        let page = parse_comments_page("t3_x", submissions, comments, CommentSort::New).unwrap();

        assert_eq!(page.submission.title, "Title");
        let tree = page.comments;
        assert_eq!(tree.submission_fullname(), "t3_x");
        assert_eq!(tree.sort(), CommentSort::New);
        assert_eq!(tree.walk(TraversalOrder::PreOrder).count(), 2);
        assert_eq!(tree.find_child("t1_b", LocationHint::NearBottom).unwrap().depth(), 2);
        assert_eq!(tree.root().more_children().unwrap().children, ["c"]);
    }

    #[test]
    fn page_without_submission_is_an_error() {
        let submissions: Listing<Thing> = serde_json::from_value(comments_listing(json!([]))).unwrap();
        let comments: Listing<Reply> = serde_json::from_value(comments_listing(json!([]))).unwrap();
        assert!(matches!(
            parse_comments_page("t3_x", submissions, comments, CommentSort::New),
            Err(RedditClientError::ApiError(_))
        ));
    }

    #[test]
    fn morechildren_errors_are_reported() {
        let response: MoreChildrenResponse = serde_json::from_value(json!({
            "json": {"errors": [["TOO_MANY_REQUESTS", "slow down", null]]}
        }))
        .unwrap();
        assert!(matches!(
            things_from_response(response),
            Err(RedditClientError::ApiError(_))
        ));

        let response: MoreChildrenResponse = serde_json::from_value(json!({
            "json": {"errors": [], "data": {"things": [
                {"kind": "t1", "data": {}},
                {"kind": "more", "data": {}}
            ]}}
        }))
        .unwrap();
        let things = things_from_response(response).unwrap();
        assert_eq!(things.len(), 2);
        assert_eq!(things[1].kind, "more");
    }

    #[test]
    fn extracts_replies_of_the_focused_comment() {
        let listing: Listing<Thing> = serde_json::from_value(comments_listing(json!([
            {"kind": "t1", "data": {
                "id": "k", "name": "t1_k", "parent_id": "t1_j",
                "replies": comments_listing(json!([
                    {"kind": "t1", "data": {"id": "l", "name": "t1_l", "parent_id": "t1_k"}},
                    {"kind": "more", "data": {"id": "m", "parent_id": "t1_k", "children": ["m"]}}
                ]))
            }}
        ])))
        .unwrap();

        let things = thread_replies(listing, "k").unwrap();
        assert_eq!(things.len(), 2);
        assert_eq!(things[0].data["name"], "t1_l");

        let listing: Listing<Thing> = serde_json::from_value(comments_listing(json!([
            {"kind": "t1", "data": {"id": "k", "name": "t1_k", "parent_id": "t1_j", "replies": ""}}
        ])))
        .unwrap();
        assert!(thread_replies(listing, "k").unwrap().is_empty());
    }

    #[test]
    fn clones_share_the_morechildren_lock() {
        let client = RedditClient::new().unwrap();
        let clone = client.clone();
        assert!(std::ptr::eq(
            client.more_children_lock(),
            clone.more_children_lock()
        ));
    }
}
