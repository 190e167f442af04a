use database::Database;
use market_data::{AlphaVantageClient, MarketDataFetcher};
use reddit_client::RedditClient;
use std::future::Future;
use std::sync::Arc;
use synth_core::{
    most_popular_symbol, select_posts, AnnualEarnings, CoreError, ErrorExt, Flair, Post,
    PostBoard, QuoteLookup, RedditPost,
};
use terminal::{presenter, Backend};
use tracing::{info, warn};

/// Wires Reddit, the local cache and Alpha Vantage behind the prompt.
pub struct Synthesizer {
    reddit: RedditClient,
    database: Arc<Database>,
    market: MarketDataFetcher<AlphaVantageClient>,
}

impl Synthesizer {
    pub fn new(
        reddit: RedditClient,
        database: Arc<Database>,
        api_key: String,
    ) -> Result<Self, CoreError> {
        let market = MarketDataFetcher::new(AlphaVantageClient::new(api_key)?, database.clone());
        Ok(Self {
            reddit,
            database,
            market,
        })
    }
}

/// The board cached earlier this session, if the post table has any rows.
pub async fn cached_board(database: &Database) -> Result<Option<PostBoard>, CoreError> {
    let Some(posts) = database.get_cached_posts().await? else {
        return Ok(None);
    };
    let Some(symbol) = posts.first().map(|post| post.stock.clone()) else {
        return Ok(None);
    };
    info!("Serving {} cached posts for {}", posts.len(), symbol);
    Ok(Some(PostBoard {
        symbol,
        posts,
        from_cache: true,
    }))
}

/// Picks the symbol of the day from `listing` and caches the posts that
/// mention it. Failed writes are logged and skipped.
pub async fn board_from_listing(
    database: &Database,
    listing: &[RedditPost],
) -> Result<PostBoard, CoreError> {
    let symbol = most_popular_symbol(listing)?;
    let posts = select_posts(&symbol, listing);
    info!("{} of {} posts mention {}", posts.len(), listing.len(), symbol);

    let mut stored = 0;
    for post in &posts {
        match database.save_post(post).await {
            Ok(true) => stored += 1,
            Ok(false) => {}
            Err(e) => {
                e.log_error();
            }
        }
    }
    if stored < posts.len() {
        warn!("Cached {} of {} posts", stored, posts.len());
    }

    Ok(PostBoard {
        symbol,
        posts,
        from_cache: false,
    })
}

/// Serves the cached board when there is one, otherwise runs `fetch` and
/// builds a fresh board from the listing it returns.
pub async fn load_or_fetch<F, Fut>(database: &Database, fetch: F) -> Result<PostBoard, CoreError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Vec<RedditPost>, CoreError>>,
{
    if let Some(board) = cached_board(database).await? {
        return Ok(board);
    }
    let listing = fetch().await?;
    board_from_listing(database, &listing).await
}

impl Backend for Synthesizer {
    async fn load_board(&mut self) -> Result<PostBoard, CoreError> {
        let subreddit = self.reddit.subreddit().to_string();
        let category = self.reddit.category().to_string();
        let reddit = &mut self.reddit;
        load_or_fetch(&self.database, || async move {
            let listing = reddit.fetch_posts().await?;
            info!("Fetched {} posts from r/{}/{}", listing.len(), subreddit, category);
            Ok(listing)
        })
        .await
    }

    async fn quote(&mut self, symbol: &str) -> Result<QuoteLookup, CoreError> {
        self.market.lookup(symbol).await
    }

    async fn annual_earnings(&mut self, symbol: &str) -> Result<Vec<AnnualEarnings>, CoreError> {
        self.market.annual_earnings(symbol).await
    }

    async fn search_flair(&mut self, symbol: &str, flair: Flair) -> Result<Vec<Post>, CoreError> {
        let results = self.reddit.search_flair(symbol, flair).await?;
        info!("{} {} posts mention {}", results.len(), flair, symbol);
        Ok(results
            .iter()
            .enumerate()
            .map(|(rank, post)| Post::from_listing(post, symbol, rank as i64))
            .collect())
    }

    fn open_url(&mut self, url: &str) -> Result<(), CoreError> {
        presenter::open_in_browser(url)
    }
}
