use reqwest::{Client, Method, Response};
use serde::{Deserialize, Serialize};
use synth_core::{CoreError, Flair, RedditApiError, RedditPost};
use std::time::Duration;
use tracing::{debug, error, info, warn};

pub const REDDIT_API_BASE: &str = "https://oauth.reddit.com";
pub const LISTING_LIMIT: u32 = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListing<T> {
    pub kind: String,
    pub data: RedditListingData<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListingData<T> {
    pub children: Vec<RedditListingChild<T>>,
    pub after: Option<String>,
    pub before: Option<String>,
    pub dist: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListingChild<T> {
    pub kind: String,
    pub data: T,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditPostData {
    pub title: String,
    pub permalink: String,
    #[serde(default)]
    pub selftext: String,
    #[serde(default)]
    pub ups: i64,
    #[serde(default)]
    pub link_flair_text: Option<String>,
}

impl RedditListing<RedditPostData> {
    pub fn into_posts(self) -> Vec<RedditPost> {
        self.data
            .children
            .into_iter()
            .map(|child| child.data.into())
            .collect()
    }
}

/// Query parameters for a subreddit listing (`/new`, `/top`, ...).
pub fn listing_params() -> Vec<(&'static str, String)> {
    vec![("t", "day".to_string()), ("limit", LISTING_LIMIT.to_string())]
}

/// Query parameters for a flair search on the symbol of the day, restricted
/// to the subreddit being searched.
pub fn search_params(symbol: &str, flair: Flair) -> Vec<(&'static str, String)> {
    vec![
        ("t", "week".to_string()),
        ("limit", LISTING_LIMIT.to_string()),
        ("q", symbol.to_string()),
        ("f", flair.label().to_string()),
        ("restrict_sr", "1".to_string()),
    ]
}

#[derive(Debug, Clone)]
pub struct RedditApiClient {
    http_client: Client,
    base_url: String,
    user_agent: String,
}

impl RedditApiClient {
    pub fn new(http_client: Client, user_agent: String) -> Self {
        Self {
            http_client,
            base_url: REDDIT_API_BASE.to_string(),
            user_agent,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub async fn make_request(
        &self,
        method: Method,
        endpoint: &str,
        access_token: &str,
        query_params: &[(&str, String)],
    ) -> Result<Response, CoreError> {
        let url = format!("{}{}", self.base_url, endpoint);

        let request_builder = self
            .http_client
            .request(method.clone(), &url)
            .bearer_auth(access_token)
            .header("User-Agent", &self.user_agent)
            .query(query_params);

        info!("Making Reddit API request: {} {}", method, endpoint);
        let response = request_builder.send().await.map_err(|e| {
            error!("Network error for {} {}: {}", method, endpoint, e);
            if e.is_timeout() {
                CoreError::RedditApi(RedditApiError::RequestTimeout)
            } else {
                CoreError::Network(e)
            }
        })?;

        let status = response.status();
        info!("Reddit responded {} for {}", status, endpoint);
        if status.is_success() {
            return Ok(response);
        }

        error!("Request failed with status: {} for {}", status, endpoint);
        let err = match status.as_u16() {
            429 => {
                let retry_after = response
                    .headers()
                    .get("retry-after")
                    .and_then(|value| value.to_str().ok())
                    .and_then(|value| value.parse::<u64>().ok())
                    .unwrap_or(60);
                warn!("Rate limited, retry after {} seconds", retry_after);
                RedditApiError::RateLimitExceeded { retry_after }
            }
            401 => RedditApiError::InvalidToken,
            403 => RedditApiError::Forbidden {
                resource: endpoint.to_string(),
            },
            404 => RedditApiError::SubredditNotFound {
                subreddit: endpoint.to_string(),
            },
            code if status.is_server_error() => RedditApiError::ServerError { status_code: code },
            code => RedditApiError::InvalidResponse {
                details: format!("Unexpected status {} for {}", code, endpoint),
            },
        };
        Err(CoreError::RedditApi(err))
    }

    async fn get_posts(
        &self,
        access_token: &str,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Result<RedditListing<RedditPostData>, CoreError> {
        let response = self
            .make_request(Method::GET, endpoint, access_token, params)
            .await?;

        let listing: RedditListing<RedditPostData> = response.json().await.map_err(|e| {
            error!("Failed to parse listing from {}: {}", endpoint, e);
            CoreError::RedditApi(RedditApiError::InvalidResponse {
                details: format!("Failed to parse posts from {}", endpoint),
            })
        })?;

        debug!(
            "Retrieved {} posts from {}",
            listing.data.children.len(),
            endpoint
        );
        Ok(listing)
    }

    /// Fetches today's posts from `/r/{subreddit}/{category}`.
    pub async fn get_subreddit_posts(
        &self,
        access_token: &str,
        subreddit: &str,
        category: &str,
    ) -> Result<RedditListing<RedditPostData>, CoreError> {
        let endpoint = format!("/r/{}/{}", subreddit, category);
        info!("Fetching {} posts today from r/{}", category, subreddit);
        self.get_posts(access_token, &endpoint, &listing_params())
            .await
    }

    /// Searches this week's posts in a subreddit for `symbol` under `flair`.
    pub async fn search_subreddit(
        &self,
        access_token: &str,
        subreddit: &str,
        symbol: &str,
        flair: Flair,
    ) -> Result<RedditListing<RedditPostData>, CoreError> {
        let endpoint = format!("/r/{}/search", subreddit);
        info!("Searching r/{} for {} posts about {}", subreddit, flair, symbol);
        self.get_posts(access_token, &endpoint, &search_params(symbol, flair))
            .await
    }
}

pub fn build_http_client(user_agent: &str) -> Result<Client, CoreError> {
    Client::builder()
        .user_agent(user_agent)
        .timeout(Duration::from_secs(30))
        .build()
        .map_err(CoreError::Network)
}

impl From<RedditPostData> for RedditPost {
    fn from(post_data: RedditPostData) -> Self {
        Self {
            title: post_data.title,
            selftext: post_data.selftext,
            permalink: post_data.permalink,
            ups: post_data.ups,
            flair: post_data.link_flair_text,
        }
    }
}
