pub mod api;
pub mod auth;

#[cfg(test)]
mod tests;

pub use api::{build_http_client, RedditApiClient, RedditListing, RedditPostData};
pub use auth::{AuthState, RedditOAuth2Config, RedditToken, TokenProvider};

use synth_core::{CoreError, Flair, RedditApiError, RedditConfig, RedditPost};
use tracing::{debug, info};

/// An authenticated Reddit session: credentials, HTTP client and the current
/// bearer token, created once at startup and handed to whoever needs Reddit.
#[derive(Debug)]
pub struct RedditClient {
    config: RedditOAuth2Config,
    api: RedditApiClient,
    token_provider: TokenProvider,
    auth_state: AuthState,
    subreddit: String,
    category: String,
}

impl RedditClient {
    pub fn new(config: RedditOAuth2Config) -> Result<Self, CoreError> {
        let http_client = build_http_client(&config.user_agent)?;
        let token_provider = TokenProvider::new(&config, http_client.clone())?;
        let api = RedditApiClient::new(http_client, config.user_agent.clone());

        Ok(Self {
            config,
            api,
            token_provider,
            auth_state: AuthState::NotAuthenticated,
            subreddit: "wallstreetbets".to_string(),
            category: "top".to_string(),
        })
    }

    pub fn from_app_config(config: &RedditConfig) -> Result<Self, CoreError> {
        let mut client = Self::new(RedditOAuth2Config::from(config))?;
        client.subreddit = config.subreddit.clone();
        client.category = config.category.clone();
        Ok(client)
    }

    pub fn config(&self) -> &RedditOAuth2Config {
        &self.config
    }

    pub fn subreddit(&self) -> &str {
        &self.subreddit
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn get_auth_state(&self) -> &AuthState {
        &self.auth_state
    }

    pub fn set_token(&mut self, token: RedditToken) {
        self.auth_state = if token.is_expired() {
            AuthState::TokenExpired { token }
        } else {
            AuthState::Authenticated { token }
        };
    }

    pub fn is_authenticated(&self) -> bool {
        match &self.auth_state {
            AuthState::Authenticated { token } => !token.is_expired(),
            _ => false,
        }
    }

    pub fn needs_refresh(&self) -> bool {
        match &self.auth_state {
            AuthState::Authenticated { token } => token.is_expired(),
            AuthState::TokenExpired { .. } => true,
            AuthState::NotAuthenticated => false,
        }
    }

    pub async fn authenticate(&mut self) -> Result<(), CoreError> {
        let token = self.token_provider.fetch_token().await?;
        info!("Authenticated with Reddit (scope: {:?})", token.scope);
        self.set_token(token);
        Ok(())
    }

    /// Returns a valid access token, fetching a new one when there is none
    /// or the current one has expired.
    pub async fn ensure_authenticated(&mut self) -> Result<String, CoreError> {
        if !self.is_authenticated() {
            if self.needs_refresh() {
                debug!("Reddit token expired, requesting a new one");
            }
            self.authenticate().await?;
        }

        match &self.auth_state {
            AuthState::Authenticated { token } => Ok(token.access_token.clone()),
            _ => Err(CoreError::RedditApi(RedditApiError::AuthenticationFailed {
                reason: "Token endpoint returned an already expired token".to_string(),
            })),
        }
    }

    /// Today's listing for the configured subreddit and category.
    pub async fn fetch_posts(&mut self) -> Result<Vec<RedditPost>, CoreError> {
        let access_token = self.ensure_authenticated().await?;
        let listing = self
            .api
            .get_subreddit_posts(&access_token, &self.subreddit, &self.category)
            .await?;
        Ok(listing.into_posts())
    }

    /// This week's posts mentioning `symbol` under `flair`.
    pub async fn search_flair(
        &mut self,
        symbol: &str,
        flair: Flair,
    ) -> Result<Vec<RedditPost>, CoreError> {
        let access_token = self.ensure_authenticated().await?;
        let listing = self
            .api
            .search_subreddit(&access_token, &self.subreddit, symbol, flair)
            .await?;
        Ok(listing.into_posts())
    }
}
