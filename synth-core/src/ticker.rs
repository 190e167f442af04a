//! Ticker extraction from post titles and selection of the posts that mention it.

use crate::error::CoreError;
use crate::types::{Post, RedditPost};
use std::collections::HashMap;
use tracing::{debug, info};

/// All-caps chat words that look like tickers but are not.
pub const STOP_WORDS: [&str; 4] = ["YOLO", "I", "AND", "HOLD"];

/// Occurrence counts per candidate symbol, kept in first-seen order.
#[derive(Debug, Default, Clone)]
pub struct SymbolFrequencyTable {
    entries: Vec<(String, usize)>,
    index: HashMap<String, usize>,
}

impl SymbolFrequencyTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, symbol: &str) {
        match self.index.get(symbol) {
            Some(&position) => self.entries[position].1 += 1,
            None => {
                self.index.insert(symbol.to_string(), self.entries.len());
                self.entries.push((symbol.to_string(), 1));
            }
        }
    }

    pub fn count(&self, symbol: &str) -> usize {
        self.index
            .get(symbol)
            .map(|&position| self.entries[position].1)
            .unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.entries
            .iter()
            .map(|(symbol, count)| (symbol.as_str(), *count))
    }

    /// The symbol with the highest count. Ties go to the symbol seen first.
    pub fn most_frequent(&self) -> Option<(&str, usize)> {
        let mut best: Option<(&str, usize)> = None;
        for (symbol, count) in self.iter() {
            if best.map_or(true, |(_, best_count)| count > best_count) {
                best = Some((symbol, count));
            }
        }
        best
    }
}

// Tokens made only of punctuation or symbols (`!`, `--`, `...`) never name a
// ticker.
fn is_stop_word(token: &str) -> bool {
    STOP_WORDS.contains(&token) || !token.chars().any(char::is_alphabetic)
}

fn looks_like_symbol(token: &str) -> bool {
    !token.is_empty() && !token.chars().any(|c| c.is_lowercase() || c.is_numeric())
}

/// Strips one leading `$`, then one trailing `.`, `,` and `!` in that order.
pub fn strip_symbol(token: &str) -> &str {
    let token = token.strip_prefix('$').unwrap_or(token);
    let token = token.strip_suffix('.').unwrap_or(token);
    let token = token.strip_suffix(',').unwrap_or(token);
    token.strip_suffix('!').unwrap_or(token)
}

/// Returns the cleaned symbol for a title token, or `None` if the token is
/// not a ticker candidate.
pub fn candidate_symbol(token: &str) -> Option<&str> {
    if !looks_like_symbol(token) || is_stop_word(token) {
        return None;
    }
    let symbol = strip_symbol(token);
    if symbol.is_empty() || is_stop_word(symbol) {
        return None;
    }
    Some(symbol)
}

pub fn count_symbols<'a, I>(titles: I) -> SymbolFrequencyTable
where
    I: IntoIterator<Item = &'a str>,
{
    let mut table = SymbolFrequencyTable::new();
    for title in titles {
        for symbol in title.split_whitespace().filter_map(candidate_symbol) {
            table.record(symbol);
        }
    }
    table
}

/// Finds the most talked-about symbol across the titles of a listing.
pub fn most_popular_symbol(posts: &[RedditPost]) -> Result<String, CoreError> {
    let table = count_symbols(posts.iter().map(|post| post.title.as_str()));
    debug!(
        "Symbol counts: {:?}",
        table.iter().collect::<Vec<(&str, usize)>>()
    );

    let (symbol, count) = table.most_frequent().ok_or(CoreError::NoCandidateSymbol)?;
    info!(
        "Most popular symbol: {} ({} mentions across {} posts)",
        symbol,
        count,
        posts.len()
    );
    Ok(symbol.to_string())
}

/// Selects the posts whose title or body contains `symbol` verbatim.
///
/// Matching is a case-sensitive substring test, so `GME` also matches
/// `GMEGOOD`. Ranks are assigned in listing order starting at zero.
pub fn select_posts(symbol: &str, posts: &[RedditPost]) -> Vec<Post> {
    posts
        .iter()
        .filter(|post| post.title.contains(symbol) || post.selftext.contains(symbol))
        .enumerate()
        .map(|(rank, post)| Post::from_listing(post, symbol, rank as i64))
        .collect()
}
