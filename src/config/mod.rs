//! Configuration module for handling environment variables and .env files

use crate::client::RedditClient;
use crate::error::RedditClientError;
use crate::models::CommentSort;
use chrono_tz::Tz;
use dotenv::dotenv;
use log::{info, warn};
use std::env;

/// Application configuration derived from environment variables and .env file
#[derive(Debug, Clone)]
pub struct AppConfig {
    // Reddit API credentials
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,

    // Reddit API settings
    pub user_agent: String,

    // OAuth token (if provided directly)
    pub access_token: Option<String>,

    // Comment tree settings
    pub comment_sort: CommentSort,
    pub timezone: Tz,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            username: None,
            password: None,
            user_agent: format!("redtree/{}", env!("CARGO_PKG_VERSION")),
            access_token: None,
            comment_sort: CommentSort::default(),
            timezone: chrono_tz::America::Los_Angeles,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables and .env file
    pub fn load() -> Self {
        // Try to load .env file, but continue even if it doesn't exist
        match dotenv() {
            Ok(_) => info!("Loaded environment from .env file"),
            Err(_) => info!("No .env file found, using system environment variables only"),
        }

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a configuration from any key lookup. Unparseable values are logged and the default
    /// is kept.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        config.client_id = lookup("REDDIT_CLIENT_ID");
        config.client_secret = lookup("REDDIT_CLIENT_SECRET");
        config.username = lookup("REDDIT_USERNAME");
        config.password = lookup("REDDIT_PASSWORD");
        config.access_token = lookup("REDDIT_ACCESS_TOKEN");

        // User agent - use environment variable if available, otherwise use default
        if let Some(user_agent) = lookup("REDDIT_USER_AGENT") {
            config.user_agent = user_agent;
        }

        if let Some(sort) = lookup("REDDIT_COMMENT_SORT") {
            match sort.parse::<CommentSort>() {
                Ok(sort) => config.comment_sort = sort,
                Err(err) => warn!("Ignoring REDDIT_COMMENT_SORT: {}", err),
            }
        }

        if let Some(zone) = lookup("REDDIT_TIMEZONE") {
            match zone.parse::<Tz>() {
                Ok(tz) => config.timezone = tz,
                Err(err) => warn!("Ignoring REDDIT_TIMEZONE: {}", err),
            }
        }

        config
    }

    fn require(
        value: &Option<String>,
        name: &'static str,
    ) -> Result<String, RedditClientError> {
        value.clone().ok_or(RedditClientError::MissingConfig(name))
    }

    pub fn require_client_id(&self) -> Result<String, RedditClientError> {
        Self::require(&self.client_id, "REDDIT_CLIENT_ID")
    }

    pub fn require_client_secret(&self) -> Result<String, RedditClientError> {
        Self::require(&self.client_secret, "REDDIT_CLIENT_SECRET")
    }

    pub fn require_username(&self) -> Result<String, RedditClientError> {
        Self::require(&self.username, "REDDIT_USERNAME")
    }

    pub fn require_password(&self) -> Result<String, RedditClientError> {
        Self::require(&self.password, "REDDIT_PASSWORD")
    }

    /// Whether username/password credentials for a script app are all present
    pub fn has_script_credentials(&self) -> bool {
        self.client_id.is_some()
            && self.client_secret.is_some()
            && self.username.is_some()
            && self.password.is_some()
    }

    /// Create a RedditClient from this configuration
    pub fn create_client(&self) -> Result<RedditClient, RedditClientError> {
        RedditClient::from_config(self)
    }

    /// Create a RedditClient and authenticate it with whatever credentials are configured.
    ///
    /// A configured access token is used as is. Otherwise script credentials are preferred over
    /// an app-only token, and with no credentials at all the client stays anonymous.
    pub async fn create_authenticated_client(&self) -> Result<RedditClient, RedditClientError> {
        let mut client = self.create_client()?;
        if client.access_token.is_some() {
            return Ok(client);
        }

        if self.has_script_credentials() {
            client
                .authenticate_with_api_credentials(
                    &self.require_client_id()?,
                    &self.require_client_secret()?,
                    &self.require_username()?,
                    &self.require_password()?,
                )
                .await?;
        } else if let Some(client_id) = &self.client_id {
            client.get_access_token(client_id).await?;
        } else {
            info!("No Reddit credentials configured, using the public API");
        }

        Ok(client)
    }
}
