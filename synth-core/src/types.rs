use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const REDDIT_WEB_BASE: &str = "https://reddit.com";

/// A post as it arrives in a subreddit listing, before any symbol is known.
#[derive(Debug, Clone, PartialEq)]
pub struct RedditPost {
    pub title: String,
    pub selftext: String,
    pub permalink: String,
    pub ups: i64,
    pub flair: Option<String>,
}

impl RedditPost {
    pub fn url(&self) -> String {
        format!("{}{}", REDDIT_WEB_BASE, self.permalink)
    }
}

/// A post that mentions the symbol of the day, as stored in the post cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub url: String,
    pub stock: String,
    pub upvote: i64,
    pub title: String,
    pub post_text: String,
    pub flair: Option<String>,
    /// Zero-based position among the matching posts, in listing order.
    pub rank: i64,
}

impl Post {
    pub fn from_listing(post: &RedditPost, stock: &str, rank: i64) -> Self {
        Self {
            url: post.url(),
            stock: stock.to_string(),
            upvote: post.ups,
            title: post.title.clone(),
            post_text: post.selftext.clone(),
            flair: post.flair.clone(),
            rank,
        }
    }
}

/// One day of market data for a symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockQuote {
    pub symbol_date: String,
    pub symbol: String,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub dividend: f64,
    pub description: String,
}

impl StockQuote {
    pub fn cache_key(symbol: &str, date: NaiveDate) -> String {
        format!("{}_{}", symbol, date.format("%Y-%m-%d"))
    }
}

/// Outcome of a market-data lookup. A cache hit carries every stored day for
/// the symbol, oldest first; a miss carries the single record just fetched.
#[derive(Debug, Clone, PartialEq)]
pub enum QuoteLookup {
    CacheHit(Vec<StockQuote>),
    Fresh(StockQuote),
}

impl QuoteLookup {
    pub fn quotes(&self) -> &[StockQuote] {
        match self {
            QuoteLookup::CacheHit(quotes) => quotes,
            QuoteLookup::Fresh(quote) => std::slice::from_ref(quote),
        }
    }

    pub fn is_cache_hit(&self) -> bool {
        matches!(self, QuoteLookup::CacheHit(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnnualEarnings {
    pub fiscal_date_ending: NaiveDate,
    pub reported_eps: f64,
}

/// Post category tags that can be searched from the interactive prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flair {
    Yolo,
    DueDiligence,
    TechnicalAnalysis,
}

impl Flair {
    pub const ALL: [Flair; 3] = [Flair::Yolo, Flair::DueDiligence, Flair::TechnicalAnalysis];

    /// The short command typed at the prompt.
    pub fn key(&self) -> &'static str {
        match self {
            Flair::Yolo => "YOLO",
            Flair::DueDiligence => "DD",
            Flair::TechnicalAnalysis => "TECH",
        }
    }

    /// The flair text as it appears on the board.
    pub fn label(&self) -> &'static str {
        match self {
            Flair::Yolo => "YOLO",
            Flair::DueDiligence => "DD",
            Flair::TechnicalAnalysis => "Technical Analysis",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Flair::Yolo => "nonserious posts",
            Flair::DueDiligence => "due diligence",
            Flair::TechnicalAnalysis => "technical analysis",
        }
    }

    pub fn from_key(input: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|flair| flair.key().eq_ignore_ascii_case(input.trim()))
    }
}

impl fmt::Display for Flair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The posts shown on the main screen and the symbol they were selected for.
#[derive(Debug, Clone, PartialEq)]
pub struct PostBoard {
    pub symbol: String,
    pub posts: Vec<Post>,
    pub from_cache: bool,
}
