use oauth2::basic::BasicClient;
use oauth2::{
    AuthUrl, ClientId, ClientSecret, HttpRequest, HttpResponse, RequestTokenError, TokenResponse,
    TokenUrl,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use synth_core::{ConfigError, CoreError, RedditApiError, RedditConfig};
use std::time::{Duration, SystemTime};
use tracing::{debug, error, info};

pub const REDDIT_AUTH_URL: &str = "https://www.reddit.com/api/v1/authorize";
pub const REDDIT_TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";

/// Tokens are treated as expired this long before Reddit says they are.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);
/// Reddit's application-only tokens last a day when `expires_in` is absent.
const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone)]
pub struct RedditOAuth2Config {
    pub client_id: String,
    pub client_secret: String,
    pub user_agent: String,
    pub token_url: String,
}

impl RedditOAuth2Config {
    pub fn new(client_id: String, client_secret: String, user_agent: String) -> Self {
        Self {
            client_id,
            client_secret,
            user_agent,
            token_url: REDDIT_TOKEN_URL.to_string(),
        }
    }

    pub fn with_token_url(mut self, token_url: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self
    }
}

impl From<&RedditConfig> for RedditOAuth2Config {
    fn from(config: &RedditConfig) -> Self {
        Self::new(
            config.client_id.clone(),
            config.client_secret.clone(),
            config.user_agent.clone(),
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditToken {
    pub access_token: String,
    pub expires_at: SystemTime,
    pub scope: Vec<String>,
}

impl RedditToken {
    pub fn is_expired(&self) -> bool {
        SystemTime::now() + EXPIRY_MARGIN >= self.expires_at
    }
}

#[derive(Debug, Clone)]
pub enum AuthState {
    NotAuthenticated,
    Authenticated { token: RedditToken },
    TokenExpired { token: RedditToken },
}

/// Exchanges the application credentials for a bearer token using the
/// client-credentials grant.
#[derive(Debug)]
pub struct TokenProvider {
    oauth_client: BasicClient,
    http_client: Client,
}

impl TokenProvider {
    pub fn new(config: &RedditOAuth2Config, http_client: Client) -> Result<Self, CoreError> {
        let auth_url = AuthUrl::new(REDDIT_AUTH_URL.to_string()).map_err(|e| {
            ConfigError::InvalidValue {
                field: "reddit.auth_url".to_string(),
                value: e.to_string(),
            }
        })?;
        let token_url = TokenUrl::new(config.token_url.clone()).map_err(|e| {
            ConfigError::InvalidValue {
                field: "reddit.token_url".to_string(),
                value: e.to_string(),
            }
        })?;

        let oauth_client = BasicClient::new(
            ClientId::new(config.client_id.clone()),
            Some(ClientSecret::new(config.client_secret.clone())),
            auth_url,
            Some(token_url),
        );

        Ok(Self {
            oauth_client,
            http_client,
        })
    }

    pub async fn fetch_token(&self) -> Result<RedditToken, CoreError> {
        info!("Requesting application-only Reddit token");

        let response = self
            .oauth_client
            .exchange_client_credentials()
            .request_async(|request| send_token_request(&self.http_client, request))
            .await
            .map_err(|e| match e {
                RequestTokenError::ServerResponse(response) => {
                    error!("Reddit rejected the credentials: {:?}", response.error());
                    CoreError::RedditApi(RedditApiError::AuthenticationFailed {
                        reason: response.error().to_string(),
                    })
                }
                RequestTokenError::Request(e) => {
                    error!("Network error while requesting token: {}", e);
                    CoreError::Network(e)
                }
                RequestTokenError::Parse(e, _) => {
                    error!("Failed to parse token response: {}", e);
                    CoreError::RedditApi(RedditApiError::InvalidResponse {
                        details: "Failed to parse token response".to_string(),
                    })
                }
                RequestTokenError::Other(reason) => {
                    CoreError::RedditApi(RedditApiError::AuthenticationFailed { reason })
                }
            })?;

        let lifetime = response.expires_in().unwrap_or(DEFAULT_TOKEN_LIFETIME);
        let scope = response
            .scopes()
            .map(|scopes| scopes.iter().map(|s| (**s).clone()).collect())
            .unwrap_or_default();

        debug!("Received token valid for {:?}", lifetime);
        Ok(RedditToken {
            access_token: response.access_token().secret().clone(),
            expires_at: SystemTime::now() + lifetime,
            scope,
        })
    }
}

// The token request goes through the shared client so it carries the
// configured User-Agent, which Reddit requires.
async fn send_token_request(
    client: &Client,
    request: HttpRequest,
) -> Result<HttpResponse, reqwest::Error> {
    let response = client
        .request(request.method, request.url.as_str())
        .headers(request.headers)
        .body(request.body)
        .send()
        .await?;

    debug!("Token endpoint responded with {}", response.status());
    let status_code = response.status();
    let headers = response.headers().clone();
    let body = response.bytes().await?.to_vec();

    Ok(HttpResponse {
        status_code,
        headers,
        body,
    })
}
