pub mod alpha_vantage;

pub use alpha_vantage::{AlphaVantageClient, DailyBar};

use chrono::{Local, NaiveDate};
use database::Database;
use std::sync::Arc;
use synth_core::{AnnualEarnings, CoreError, ErrorExt, QuoteLookup, StockQuote};
use tracing::{debug, info};

/// Upstream market data for a single symbol.
#[allow(async_fn_in_trait)]
pub trait QuoteSource {
    async fn latest_daily(&self, symbol: &str) -> Result<DailyBar, CoreError>;

    async fn company_description(&self, symbol: &str) -> Result<String, CoreError>;

    async fn annual_earnings(&self, symbol: &str) -> Result<Vec<AnnualEarnings>, CoreError>;
}

/// Looks up quotes through the local cache so each symbol is fetched from
/// upstream at most once per calendar day.
pub struct MarketDataFetcher<S> {
    source: S,
    database: Arc<Database>,
}

impl<S: QuoteSource> MarketDataFetcher<S> {
    pub fn new(source: S, database: Arc<Database>) -> Self {
        Self { source, database }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub async fn lookup(&self, symbol: &str) -> Result<QuoteLookup, CoreError> {
        self.lookup_on(symbol, Local::now().date_naive()).await
    }

    pub async fn lookup_on(&self, symbol: &str, date: NaiveDate) -> Result<QuoteLookup, CoreError> {
        let symbol_date = StockQuote::cache_key(symbol, date);

        if self.database.has_quote(&symbol_date).await? {
            let quotes = self.database.get_quotes(symbol).await?;
            info!("Loaded {} cached quotes for {}", quotes.len(), symbol);
            return Ok(QuoteLookup::CacheHit(quotes));
        }

        let bar = self.source.latest_daily(symbol).await?;
        let description = self.source.company_description(symbol).await?;
        debug!("Latest {} bar is from {}", symbol, bar.date);

        let quote = StockQuote {
            symbol_date,
            symbol: symbol.to_string(),
            date,
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            dividend: bar.dividend,
            description,
        };

        if let Err(e) = self.database.save_quote(&quote).await {
            e.log_error();
        }

        Ok(QuoteLookup::Fresh(quote))
    }

    pub async fn annual_earnings(&self, symbol: &str) -> Result<Vec<AnnualEarnings>, CoreError> {
        self.source.annual_earnings(symbol).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::env;
    use synth_core::MarketDataError;

    #[derive(Default)]
    struct CountingSource {
        daily_calls: Cell<usize>,
        overview_calls: Cell<usize>,
        malformed: bool,
    }

    impl QuoteSource for CountingSource {
        async fn latest_daily(&self, symbol: &str) -> Result<DailyBar, CoreError> {
            self.daily_calls.set(self.daily_calls.get() + 1);
            if self.malformed {
                return Err(MarketDataError::MissingField {
                    function: "TIME_SERIES_DAILY_ADJUSTED".to_string(),
                    symbol: symbol.to_string(),
                    field: "Meta Data".to_string(),
                }
                .into());
            }
            Ok(DailyBar {
                date: NaiveDate::from_ymd_opt(2021, 1, 27).unwrap(),
                open: 354.83,
                high: 380.0,
                low: 249.0,
                close: 347.51,
                dividend: 0.0,
            })
        }

        async fn company_description(&self, symbol: &str) -> Result<String, CoreError> {
            self.overview_calls.set(self.overview_calls.get() + 1);
            Ok(format!("{} is a company", symbol))
        }

        async fn annual_earnings(&self, _symbol: &str) -> Result<Vec<AnnualEarnings>, CoreError> {
            Ok(Vec::new())
        }
    }

    async fn setup_test_db() -> Arc<Database> {
        let db_path = env::temp_dir().join(format!("test_wsb_quotes_{}.db", uuid::Uuid::new_v4()));
        let mut db = Database::new(format!("sqlite://{}", db_path.display()));
        db.connect().await.expect("Failed to connect to test database");
        db.run_migrations().await.expect("Failed to run migrations");
        Arc::new(db)
    }

    #[tokio::test]
    async fn test_second_lookup_same_day_is_served_from_cache() {
        let fetcher = MarketDataFetcher::new(CountingSource::default(), setup_test_db().await);
        let today = NaiveDate::from_ymd_opt(2021, 1, 27).unwrap();

        let first = fetcher.lookup_on("GME", today).await.unwrap();
        match &first {
            QuoteLookup::Fresh(quote) => {
                assert_eq!(quote.symbol_date, "GME_2021-01-27");
                assert_eq!(quote.close, 347.51);
                assert_eq!(quote.description, "GME is a company");
            }
            other => panic!("Expected a fresh quote, got {:?}", other),
        }
        assert_eq!(fetcher.source().daily_calls.get(), 1);
        assert_eq!(fetcher.source().overview_calls.get(), 1);

        let second = fetcher.lookup_on("GME", today).await.unwrap();
        assert!(second.is_cache_hit());
        assert_eq!(second.quotes(), first.quotes());
        assert_eq!(fetcher.source().daily_calls.get(), 1);
        assert_eq!(fetcher.source().overview_calls.get(), 1);
    }

    #[tokio::test]
    async fn test_new_day_fetches_again_and_hit_returns_history() {
        let fetcher = MarketDataFetcher::new(CountingSource::default(), setup_test_db().await);
        let monday = NaiveDate::from_ymd_opt(2021, 1, 25).unwrap();
        let tuesday = NaiveDate::from_ymd_opt(2021, 1, 26).unwrap();

        fetcher.lookup_on("GME", monday).await.unwrap();
        let fresh = fetcher.lookup_on("GME", tuesday).await.unwrap();
        assert!(!fresh.is_cache_hit());
        assert_eq!(fetcher.source().daily_calls.get(), 2);

        match fetcher.lookup_on("GME", tuesday).await.unwrap() {
            QuoteLookup::CacheHit(history) => {
                assert_eq!(history.len(), 2);
                assert_eq!(history[0].date, monday);
                assert_eq!(history[1].date, tuesday);
            }
            other => panic!("Expected cached history, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_upstream_response_is_fatal_and_not_cached() {
        let source = CountingSource {
            malformed: true,
            ..CountingSource::default()
        };
        let database = setup_test_db().await;
        let fetcher = MarketDataFetcher::new(source, database.clone());
        let today = NaiveDate::from_ymd_opt(2021, 1, 27).unwrap();

        let result = fetcher.lookup_on("GME", today).await;
        assert!(matches!(
            result,
            Err(CoreError::MarketData(MarketDataError::MissingField { .. }))
        ));
        assert_eq!(fetcher.source().overview_calls.get(), 0);
        assert!(!database.has_quote("GME_2021-01-27").await.unwrap());
    }
}
