use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::str::FromStr;
use synth_core::{CoreError, DatabaseError, Post, StockQuote};
use tracing::{debug, info};


const POST_TABLE: &str = "wsb_posts";

const CREATE_POSTS: &str = r#"
    CREATE TABLE IF NOT EXISTS wsb_posts(
        url TEXT PRIMARY KEY,
        stock TEXT,
        upvote INTEGER,
        title TEXT,
        post_text TEXT,
        flair TEXT,
        rank INTEGER
    )
"#;

const CREATE_QUOTES: &str = r#"
    CREATE TABLE IF NOT EXISTS stock_quotes(
        symbol_date TEXT PRIMARY KEY,
        symbol TEXT,
        date TEXT,
        open REAL,
        high REAL,
        low REAL,
        close REAL,
        dividend REAL,
        description TEXT
    )
"#;

/// The local cache: a session-scoped post table and a durable quote table.
pub struct Database {
    connection_string: String,
    pool: Option<SqlitePool>,
}

impl Database {
    pub fn new(connection_string: String) -> Self {
        Self {
            connection_string,
            pool: None,
        }
    }

    pub async fn connect(&mut self) -> Result<(), CoreError> {
        let options = SqliteConnectOptions::from_str(&self.connection_string)
            .map_err(|e| DatabaseError::ConnectionFailed {
                reason: e.to_string(),
            })?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| DatabaseError::ConnectionFailed {
                reason: e.to_string(),
            })?;

        info!("Connected to local cache at {}", self.connection_string);
        self.pool = Some(pool);
        Ok(())
    }

    fn pool(&self) -> Result<&SqlitePool, CoreError> {
        self.pool
            .as_ref()
            .ok_or(CoreError::Database(DatabaseError::NotConnected))
    }

    /// Creates the quote table. The post table is created by the first
    /// post insert after [`Database::reset_post_cache`] drops it.
    pub async fn run_migrations(&self) -> Result<(), CoreError> {
        sqlx::query(CREATE_QUOTES)
            .execute(self.pool()?)
            .await
            .map_err(|e| DatabaseError::MigrationFailed {
                migration: format!("stock_quotes: {}", e),
            })?;
        debug!("Quote cache table ready");
        Ok(())
    }

    /// Drops the post cache so this session starts from a fresh fetch.
    pub async fn reset_post_cache(&self) -> Result<(), CoreError> {
        sqlx::query("DROP TABLE IF EXISTS wsb_posts")
            .execute(self.pool()?)
            .await
            .map_err(DatabaseError::Sql)?;
        info!("Cleared post cache");
        Ok(())
    }

    pub async fn post_cache_exists(&self) -> Result<bool, CoreError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT count(name) FROM sqlite_master WHERE type = 'table' AND name = ?",
        )
        .bind(POST_TABLE)
        .fetch_one(self.pool()?)
        .await
        .map_err(DatabaseError::Sql)?;
        Ok(count == 1)
    }

    /// Inserts a post unless its url is already cached. Returns whether a row
    /// was written.
    pub async fn save_post(&self, post: &Post) -> Result<bool, CoreError> {
        let pool = self.pool()?;
        sqlx::query(CREATE_POSTS)
            .execute(pool)
            .await
            .map_err(DatabaseError::Sql)?;

        let result = sqlx::query(
            "INSERT OR IGNORE INTO wsb_posts (url, stock, upvote, title, post_text, flair, rank) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&post.url)
        .bind(&post.stock)
        .bind(post.upvote)
        .bind(&post.title)
        .bind(&post.post_text)
        .bind(&post.flair)
        .bind(post.rank)
        .execute(pool)
        .await
        .map_err(DatabaseError::Sql)?;

        let inserted = result.rows_affected() == 1;
        if inserted {
            debug!("Cached post {}", post.url);
        } else {
            debug!("Post {} already cached, ignoring", post.url);
        }
        Ok(inserted)
    }

    /// Cached posts in rank order, or `None` when the post table does not
    /// exist yet this session.
    pub async fn get_cached_posts(&self) -> Result<Option<Vec<Post>>, CoreError> {
        if !self.post_cache_exists().await? {
            return Ok(None);
        }

        let rows = sqlx::query(
            "SELECT url, stock, upvote, title, post_text, flair, rank FROM wsb_posts ORDER BY rank",
        )
        .fetch_all(self.pool()?)
        .await
        .map_err(DatabaseError::Sql)?;

        let posts = rows
            .into_iter()
            .map(|row| {
                Ok(Post {
                    url: row.try_get("url")?,
                    stock: row.try_get("stock")?,
                    upvote: row.try_get("upvote")?,
                    title: row.try_get("title")?,
                    post_text: row.try_get("post_text")?,
                    flair: row.try_get("flair")?,
                    rank: row.try_get("rank")?,
                })
            })
            .collect::<Result<Vec<Post>, sqlx::Error>>()
            .map_err(DatabaseError::Sql)?;

        info!("Loaded {} posts from cache", posts.len());
        Ok(Some(posts))
    }

    pub async fn has_quote(&self, symbol_date: &str) -> Result<bool, CoreError> {
        let count: i64 =
            sqlx::query_scalar("SELECT count(*) FROM stock_quotes WHERE symbol_date = ?")
                .bind(symbol_date)
                .fetch_one(self.pool()?)
                .await
                .map_err(DatabaseError::Sql)?;
        Ok(count > 0)
    }

    pub async fn save_quote(&self, quote: &StockQuote) -> Result<(), CoreError> {
        sqlx::query(
            "INSERT OR IGNORE INTO stock_quotes \
             (symbol_date, symbol, date, open, high, low, close, dividend, description) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&quote.symbol_date)
        .bind(&quote.symbol)
        .bind(quote.date)
        .bind(quote.open)
        .bind(quote.high)
        .bind(quote.low)
        .bind(quote.close)
        .bind(quote.dividend)
        .bind(&quote.description)
        .execute(self.pool()?)
        .await
        .map_err(DatabaseError::Sql)?;

        debug!("Cached quote {}", quote.symbol_date);
        Ok(())
    }

    /// Every cached day for `symbol`, oldest first.
    pub async fn get_quotes(&self, symbol: &str) -> Result<Vec<StockQuote>, CoreError> {
        let rows = sqlx::query(
            "SELECT symbol_date, symbol, date, open, high, low, close, dividend, description \
             FROM stock_quotes WHERE symbol = ? ORDER BY date",
        )
        .bind(symbol)
        .fetch_all(self.pool()?)
        .await
        .map_err(DatabaseError::Sql)?;

        rows.into_iter()
            .map(|row| {
                Ok(StockQuote {
                    symbol_date: row.try_get("symbol_date")?,
                    symbol: row.try_get("symbol")?,
                    date: row.try_get("date")?,
                    open: row.try_get("open")?,
                    high: row.try_get("high")?,
                    low: row.try_get("low")?,
                    close: row.try_get("close")?,
                    dividend: row.try_get("dividend")?,
                    description: row.try_get("description")?,
                })
            })
            .collect::<Result<Vec<StockQuote>, sqlx::Error>>()
            .map_err(|e| CoreError::Database(DatabaseError::Sql(e)))
    }

    pub async fn close(&self) {
        if let Some(pool) = &self.pool {
            pool.close().await;
        }
    }
}
