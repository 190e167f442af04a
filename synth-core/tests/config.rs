use std::collections::HashMap;
use std::env;
use std::path::Path;
use synth_core::{AppConfig, ConfigError, DEFAULT_DATABASE_URL, DEFAULT_USER_AGENT};

const SAMPLE: &str = r#"
database_url = "sqlite://test.sqlite"

[reddit]
client_id = "id"
client_secret = "secret"
user_agent = "wsb-synthesizer-test/0.1"
category = "hot"

[market_data]
api_key = "demo"
"#;

fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn test_parse_full_config() {
    let config = AppConfig::from_toml_str(SAMPLE).unwrap();
    assert_eq!(config.database_url, "sqlite://test.sqlite");
    assert_eq!(config.reddit.client_id, "id");
    assert_eq!(config.reddit.category, "hot");
    assert_eq!(config.reddit.subreddit, "wallstreetbets");
    assert_eq!(config.market_data.api_key, "demo");
    assert!(config.validate().is_ok());
}

#[test]
fn test_defaults_fill_missing_sections() {
    let config = AppConfig::from_toml_str("").unwrap();
    assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
    assert_eq!(config.reddit.user_agent, DEFAULT_USER_AGENT);
    assert_eq!(config.reddit.category, "top");

    let err = config.validate().unwrap_err();
    assert!(matches!(err, ConfigError::MissingField { ref field } if field == "reddit.client_id"));
}

#[test]
fn test_environment_overrides_file_values() {
    let mut config = AppConfig::from_toml_str(SAMPLE).unwrap();
    config.apply_overrides(&vars(&[
        ("REDDIT_CLIENT_ID", "env-id"),
        ("ALPHAVANTAGE_API_KEY", " env-key "),
        ("REDDIT_CLIENT_SECRET", "   "),
        ("UNRELATED", "ignored"),
    ]));

    assert_eq!(config.reddit.client_id, "env-id");
    assert_eq!(config.market_data.api_key, "env-key");
    assert_eq!(config.reddit.client_secret, "secret");
}

#[test]
fn test_environment_alone_is_enough() {
    let mut config = AppConfig::default();
    config.apply_overrides(&vars(&[
        ("REDDIT_CLIENT_ID", "id"),
        ("REDDIT_CLIENT_SECRET", "secret"),
        ("ALPHAVANTAGE_API_KEY", "key"),
    ]));
    assert!(config.validate().is_ok());
}

#[test]
fn test_missing_api_key_is_rejected() {
    let mut config = AppConfig::from_toml_str(SAMPLE).unwrap();
    config.market_data.api_key.clear();
    let err = config.validate().unwrap_err();
    assert!(
        matches!(err, ConfigError::MissingField { ref field } if field == "market_data.api_key")
    );
}

#[test]
fn test_unknown_category_is_rejected() {
    let mut config = AppConfig::from_toml_str(SAMPLE).unwrap();
    config.reddit.category = "controversial".to_string();
    let err = config.validate().unwrap_err();
    assert!(matches!(
        err,
        ConfigError::InvalidValue { ref field, ref value }
            if field == "reddit.category" && value == "controversial"
    ));
}

#[test]
fn test_malformed_toml_is_a_parse_error() {
    let err = AppConfig::from_toml_str("database_url = [").unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
fn test_from_file_reads_toml_and_tolerates_missing_file() {
    let path = env::temp_dir().join(format!("wsb_synth_config_{}.toml", uuid::Uuid::new_v4()));
    std::fs::write(&path, SAMPLE).unwrap();
    let config = AppConfig::from_file(&path).unwrap();
    assert_eq!(config.reddit.client_secret, "secret");
    std::fs::remove_file(&path).unwrap();

    let missing = AppConfig::from_file(Path::new("/nonexistent/synthesizer.toml")).unwrap();
    assert_eq!(missing.database_url, DEFAULT_DATABASE_URL);
}
