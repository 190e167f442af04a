use crate::QuoteSource;
use chrono::NaiveDate;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use synth_core::{AnnualEarnings, CoreError, MarketDataError};
use tracing::{debug, info, warn};

pub const ALPHA_VANTAGE_URL: &str = "https://www.alphavantage.co/query";

pub const TIME_SERIES_DAILY_ADJUSTED: &str = "TIME_SERIES_DAILY_ADJUSTED";
pub const OVERVIEW: &str = "OVERVIEW";
pub const EARNINGS: &str = "EARNINGS";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Prices and dividend for the most recent trading day.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub dividend: f64,
}

#[derive(Clone)]
pub struct AlphaVantageClient {
    api_key: String,
    client: Client,
}

impl AlphaVantageClient {
    pub fn new(api_key: String) -> Result<Self, CoreError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(CoreError::Network)?;
        Ok(Self { api_key, client })
    }

    async fn query(&self, function: &str, symbol: &str) -> Result<Value, CoreError> {
        info!("Requesting {} for {} from Alpha Vantage", function, symbol);
        let response = self
            .client
            .get(ALPHA_VANTAGE_URL)
            .query(&[
                ("function", function),
                ("symbol", symbol),
                ("apikey", self.api_key.as_str()),
            ])
            .send()
            .await?;

        debug!("Alpha Vantage responded {} for {}", response.status(), function);
        let json: Value = response.json().await?;
        check_response(&json, symbol)?;
        Ok(json)
    }
}

impl QuoteSource for AlphaVantageClient {
    async fn latest_daily(&self, symbol: &str) -> Result<DailyBar, CoreError> {
        let json = self.query(TIME_SERIES_DAILY_ADJUSTED, symbol).await?;
        Ok(parse_daily_adjusted(&json, symbol)?)
    }

    async fn company_description(&self, symbol: &str) -> Result<String, CoreError> {
        let json = self.query(OVERVIEW, symbol).await?;
        Ok(parse_description(&json, symbol)?)
    }

    async fn annual_earnings(&self, symbol: &str) -> Result<Vec<AnnualEarnings>, CoreError> {
        let json = self.query(EARNINGS, symbol).await?;
        Ok(parse_annual_earnings(&json, symbol)?)
    }
}

/// Alpha Vantage answers errors and throttling with a 200 and a message body.
pub fn check_response(json: &Value, symbol: &str) -> Result<(), MarketDataError> {
    if let Some(message) = json.get("Error Message").and_then(Value::as_str) {
        return Err(MarketDataError::Upstream {
            symbol: symbol.to_string(),
            message: message.to_string(),
        });
    }

    for key in ["Note", "Information"] {
        if let Some(message) = json.get(key).and_then(Value::as_str) {
            warn!("Alpha Vantage throttled request for {}: {}", symbol, message);
            return Err(MarketDataError::Throttled {
                message: message.to_string(),
            });
        }
    }
    Ok(())
}

fn field<'a>(
    json: &'a Value,
    key: &str,
    function: &str,
    symbol: &str,
) -> Result<&'a Value, MarketDataError> {
    json.get(key).ok_or_else(|| MarketDataError::MissingField {
        function: function.to_string(),
        symbol: symbol.to_string(),
        field: key.to_string(),
    })
}

fn str_field<'a>(
    json: &'a Value,
    key: &str,
    function: &str,
    symbol: &str,
) -> Result<&'a str, MarketDataError> {
    field(json, key, function, symbol)?
        .as_str()
        .ok_or_else(|| MarketDataError::MissingField {
            function: function.to_string(),
            symbol: symbol.to_string(),
            field: key.to_string(),
        })
}

fn parse_number(value: &str, key: &str, function: &str) -> Result<f64, MarketDataError> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|_| MarketDataError::InvalidNumber {
            function: function.to_string(),
            field: key.to_string(),
            value: value.to_string(),
        })
}

fn parse_date(value: &str, key: &str, function: &str) -> Result<NaiveDate, MarketDataError> {
    let day = value.get(..10).unwrap_or(value);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").map_err(|_| MarketDataError::InvalidNumber {
        function: function.to_string(),
        field: key.to_string(),
        value: value.to_string(),
    })
}

/// Picks the bar for the "Last Refreshed" day out of a daily-adjusted series.
pub fn parse_daily_adjusted(json: &Value, symbol: &str) -> Result<DailyBar, MarketDataError> {
    let function = TIME_SERIES_DAILY_ADJUSTED;
    let meta = field(json, "Meta Data", function, symbol)?;
    let refreshed = str_field(meta, "3. Last Refreshed", function, symbol)?;
    let date = parse_date(refreshed, "3. Last Refreshed", function)?;

    let series = field(json, "Time Series (Daily)", function, symbol)?;
    let day_key = date.format("%Y-%m-%d").to_string();
    let day = field(series, &day_key, function, symbol)?;

    let number = |key: &str| -> Result<f64, MarketDataError> {
        parse_number(str_field(day, key, function, symbol)?, key, function)
    };

    Ok(DailyBar {
        date,
        open: number("1. open")?,
        high: number("2. high")?,
        low: number("3. low")?,
        close: number("4. close")?,
        dividend: number("7. dividend amount")?,
    })
}

pub fn parse_description(json: &Value, symbol: &str) -> Result<String, MarketDataError> {
    Ok(str_field(json, "Description", OVERVIEW, symbol)?.to_string())
}

/// Annual reported EPS, oldest fiscal year first. Years reported as "None"
/// are skipped.
pub fn parse_annual_earnings(
    json: &Value,
    symbol: &str,
) -> Result<Vec<AnnualEarnings>, MarketDataError> {
    let entries = field(json, "annualEarnings", EARNINGS, symbol)?
        .as_array()
        .ok_or_else(|| MarketDataError::MissingField {
            function: EARNINGS.to_string(),
            symbol: symbol.to_string(),
            field: "annualEarnings".to_string(),
        })?;

    let mut earnings = Vec::with_capacity(entries.len());
    for entry in entries {
        let fiscal = str_field(entry, "fiscalDateEnding", EARNINGS, symbol)?;
        let reported = str_field(entry, "reportedEPS", EARNINGS, symbol)?;
        if reported.eq_ignore_ascii_case("none") {
            debug!("Skipping {} fiscal year {} without EPS", symbol, fiscal);
            continue;
        }
        earnings.push(AnnualEarnings {
            fiscal_date_ending: parse_date(fiscal, "fiscalDateEnding", EARNINGS)?,
            reported_eps: parse_number(reported, "reportedEPS", EARNINGS)?,
        });
    }

    earnings.sort_by_key(|e| e.fiscal_date_ending);
    Ok(earnings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn daily_fixture() -> Value {
        json!({
            "Meta Data": {
                "1. Information": "Daily Time Series with Splits and Dividend Events",
                "2. Symbol": "GME",
                "3. Last Refreshed": "2021-01-27",
                "4. Output Size": "Compact",
                "5. Time Zone": "US/Eastern"
            },
            "Time Series (Daily)": {
                "2021-01-27": {
                    "1. open": "354.83",
                    "2. high": "380.00",
                    "3. low": "249.00",
                    "4. close": "347.51",
                    "5. adjusted close": "347.51",
                    "6. volume": "93396666",
                    "7. dividend amount": "0.0000",
                    "8. split coefficient": "1.0"
                },
                "2021-01-26": {
                    "1. open": "88.56",
                    "2. high": "150.00",
                    "3. low": "80.20",
                    "4. close": "147.98",
                    "5. adjusted close": "147.98",
                    "6. volume": "178588000",
                    "7. dividend amount": "0.0000",
                    "8. split coefficient": "1.0"
                }
            }
        })
    }

    #[test]
    fn test_parse_daily_adjusted_uses_last_refreshed_day() {
        let bar = parse_daily_adjusted(&daily_fixture(), "GME").unwrap();
        assert_eq!(bar.date, NaiveDate::from_ymd_opt(2021, 1, 27).unwrap());
        assert_eq!(bar.open, 354.83);
        assert_eq!(bar.high, 380.0);
        assert_eq!(bar.low, 249.0);
        assert_eq!(bar.close, 347.51);
        assert_eq!(bar.dividend, 0.0);
    }

    #[test]
    fn test_parse_daily_adjusted_missing_day_is_an_error() {
        let mut json = daily_fixture();
        json["Meta Data"]["3. Last Refreshed"] = json!("2021-01-28");
        let err = parse_daily_adjusted(&json, "GME").unwrap_err();
        assert!(matches!(
            err,
            MarketDataError::MissingField { ref field, .. } if field == "2021-01-28"
        ));
    }

    #[test]
    fn test_parse_daily_adjusted_missing_meta_data() {
        let err = parse_daily_adjusted(&json!({}), "GME").unwrap_err();
        assert!(matches!(
            err,
            MarketDataError::MissingField { ref field, .. } if field == "Meta Data"
        ));
    }

    #[test]
    fn test_parse_daily_adjusted_bad_number() {
        let mut json = daily_fixture();
        json["Time Series (Daily)"]["2021-01-27"]["4. close"] = json!("n/a");
        assert!(matches!(
            parse_daily_adjusted(&json, "GME"),
            Err(MarketDataError::InvalidNumber { .. })
        ));
    }

    #[test]
    fn test_parse_description() {
        let json = json!({ "Symbol": "GME", "Description": "GameStop Corp. is a retailer." });
        assert_eq!(
            parse_description(&json, "GME").unwrap(),
            "GameStop Corp. is a retailer."
        );
        assert!(parse_description(&json!({}), "ZZZZ").is_err());
    }

    #[test]
    fn test_parse_annual_earnings_sorted_and_skips_none() {
        let json = json!({
            "symbol": "GME",
            "annualEarnings": [
                { "fiscalDateEnding": "2020-01-31", "reportedEPS": "-0.5" },
                { "fiscalDateEnding": "2019-01-31", "reportedEPS": "2.04" },
                { "fiscalDateEnding": "2018-01-31", "reportedEPS": "None" }
            ]
        });
        let earnings = parse_annual_earnings(&json, "GME").unwrap();
        assert_eq!(earnings.len(), 2);
        assert_eq!(earnings[0].reported_eps, 2.04);
        assert_eq!(earnings[1].reported_eps, -0.5);
        assert!(earnings[0].fiscal_date_ending < earnings[1].fiscal_date_ending);
    }

    #[test]
    fn test_client_creation() {
        let client = AlphaVantageClient::new("demo".to_string()).unwrap();
        assert_eq!(client.api_key, "demo");
    }

    #[test]
    fn test_check_response_errors() {
        assert!(check_response(&daily_fixture(), "GME").is_ok());

        let err = check_response(&json!({ "Error Message": "Invalid API call." }), "ZZZZ")
            .unwrap_err();
        assert!(matches!(err, MarketDataError::Upstream { ref symbol, .. } if symbol == "ZZZZ"));

        let err = check_response(
            &json!({ "Note": "Thank you for using Alpha Vantage! Our standard API call frequency is 5 calls per minute." }),
            "GME",
        )
        .unwrap_err();
        assert!(matches!(err, MarketDataError::Throttled { .. }));

        let err = check_response(&json!({ "Information": "Daily limit reached" }), "GME")
            .unwrap_err();
        assert!(matches!(err, MarketDataError::Throttled { .. }));
    }
}
