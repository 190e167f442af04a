#[cfg(test)]
mod tests {
    use crate::{api, AuthState, RedditClient, RedditOAuth2Config, RedditToken};
    use synth_core::{CoreError, RedditApiError, RedditConfig};
    use std::time::{Duration, SystemTime};

    fn create_test_config() -> RedditOAuth2Config {
        RedditOAuth2Config::new(
            "test_client_id".to_string(),
            "test_client_secret".to_string(),
            "wsb-synthesizer/0.1 by test_user".to_string(),
        )
    }

    fn token_expiring_at(expires_at: SystemTime) -> RedditToken {
        RedditToken {
            access_token: "token".to_string(),
            expires_at,
            scope: vec!["*".to_string()],
        }
    }

    #[test]
    fn test_config_creation() {
        let config = create_test_config();
        assert_eq!(config.client_id, "test_client_id");
        assert_eq!(config.client_secret, "test_client_secret");
        assert_eq!(config.user_agent, "wsb-synthesizer/0.1 by test_user");
        assert_eq!(config.token_url, "https://www.reddit.com/api/v1/access_token");
    }

    #[test]
    fn test_client_creation() {
        let config = create_test_config();
        let client = RedditClient::new(config);
        assert!(client.is_ok());

        let client = client.unwrap();
        assert!(!client.is_authenticated());
        assert!(!client.needs_refresh());
        assert!(matches!(
            client.get_auth_state(),
            AuthState::NotAuthenticated
        ));
        assert_eq!(client.subreddit(), "wallstreetbets");
        assert_eq!(client.category(), "top");
    }

    #[test]
    fn test_client_from_app_config() {
        let app_config = RedditConfig {
            client_id: "id".to_string(),
            client_secret: "secret".to_string(),
            user_agent: "agent/1.0".to_string(),
            subreddit: "stocks".to_string(),
            category: "new".to_string(),
        };
        let client = RedditClient::from_app_config(&app_config).unwrap();
        assert_eq!(client.config().client_id, "id");
        assert_eq!(client.config().user_agent, "agent/1.0");
        assert_eq!(client.subreddit(), "stocks");
        assert_eq!(client.category(), "new");
    }

    #[test]
    fn test_invalid_token_url_is_a_config_error() {
        let config = create_test_config().with_token_url("not a url");
        let result = RedditClient::new(config);
        assert!(matches!(result, Err(CoreError::Config(_))));
    }

    #[test]
    fn test_token_creation_and_expiry() {
        let now = SystemTime::now();
        let valid_token = token_expiring_at(now + Duration::from_secs(3600));
        let expired_token = token_expiring_at(now - Duration::from_secs(3600));
        let nearly_expired = token_expiring_at(now + Duration::from_secs(10));

        let mut client = RedditClient::new(create_test_config()).unwrap();

        client.set_token(valid_token);
        assert!(client.is_authenticated());
        assert!(!client.needs_refresh());

        client.set_token(expired_token);
        assert!(!client.is_authenticated());
        assert!(client.needs_refresh());
        assert!(matches!(
            client.get_auth_state(),
            AuthState::TokenExpired { .. }
        ));

        assert!(nearly_expired.is_expired());
    }

    #[tokio::test]
    async fn test_ensure_authenticated_reuses_valid_token() {
        let mut client = RedditClient::new(create_test_config()).unwrap();
        client.set_token(RedditToken {
            access_token: "cached_token".to_string(),
            expires_at: SystemTime::now() + Duration::from_secs(3600),
            scope: vec!["*".to_string()],
        });

        let token = client.ensure_authenticated().await.unwrap();
        assert_eq!(token, "cached_token");
    }

    #[test]
    fn test_expired_token_triggers_token_request() {
        // Port 9 on localhost refuses connections, so the refresh attempt
        // fails without leaving the machine.
        let config = create_test_config().with_token_url("http://127.0.0.1:9/api/v1/access_token");
        let mut client = RedditClient::new(config).unwrap();
        client.set_token(token_expiring_at(SystemTime::now() - Duration::from_secs(1)));

        let result = tokio_test::block_on(client.ensure_authenticated());
        assert!(matches!(
            result,
            Err(CoreError::Network(_))
                | Err(CoreError::RedditApi(RedditApiError::AuthenticationFailed { .. }))
        ));
        assert!(client.needs_refresh());
    }

    #[test]
    fn test_token_serialization() {
        let token = RedditToken {
            access_token: "test_access_token".to_string(),
            expires_at: SystemTime::UNIX_EPOCH + Duration::from_secs(1640995200),
            scope: vec!["*".to_string()],
        };

        let serialized = serde_json::to_string(&token).unwrap();
        assert!(serialized.contains("test_access_token"));

        let deserialized: RedditToken = serde_json::from_str(&serialized).unwrap();
        assert_eq!(deserialized.access_token, token.access_token);
        assert_eq!(deserialized.expires_at, token.expires_at);
        assert_eq!(deserialized.scope, token.scope);
    }

    #[tokio::test]
    async fn test_listing_request_against_unreachable_host_fails() {
        let http_client = api::build_http_client("test-user-agent/1.0").unwrap();
        let api_client = api::RedditApiClient::new(http_client, "test-user-agent/1.0".to_string())
            .with_base_url("http://127.0.0.1:9");

        let result = api_client
            .get_subreddit_posts("token", "wallstreetbets", "top")
            .await;
        assert!(matches!(
            result,
            Err(CoreError::Network(_)) | Err(CoreError::RedditApi(RedditApiError::RequestTimeout))
        ));
    }
}
