use std::io::{self, Write};
use synth_core::{AnnualEarnings, CoreError, Flair, Post, PostBoard, QuoteLookup};
use tracing::info;

pub const TITLE_WIDTH: usize = 50;
pub const CHART_WIDTH: usize = 40;
const RULE: &str = "-------------------------------------------------------------------------";

pub fn truncate_title(title: &str) -> String {
    title.chars().take(TITLE_WIDTH).collect()
}

pub fn render_welcome<W: Write>(out: &mut W) -> io::Result<()> {
    writeln!(out, "Welcome to r/wsb synthesizer!")?;
    write!(
        out,
        "Press Enter to see today's most talked about stock on r/wallstreetbets! "
    )?;
    out.flush()
}

pub fn render_posts<W: Write>(out: &mut W, posts: &[Post]) -> io::Result<()> {
    for (index, post) in posts.iter().enumerate() {
        writeln!(out, "[{}] {}", index, truncate_title(&post.title))?;
    }
    Ok(())
}

pub fn render_board<W: Write>(out: &mut W, board: &PostBoard) -> io::Result<()> {
    if board.from_cache {
        writeln!(out, "\nLoading posts from cache ...\n")?;
    }
    writeln!(
        out,
        "\nMost popular r/wsb stock of the day: \n♔ ♔  {} ♔ ♔\n",
        board.symbol
    )?;
    render_posts(out, &board.posts)
}

pub fn render_menu<W: Write>(out: &mut W) -> io::Result<()> {
    let flairs: Vec<String> = Flair::ALL
        .iter()
        .map(|flair| format!("`{}`", flair.key()))
        .collect();
    let legend: Vec<String> = Flair::ALL
        .iter()
        .map(|flair| format!("{} = {}", flair.key(), flair.description()))
        .collect();

    writeln!(out, "\n{}", RULE)?;
    writeln!(
        out,
        "\ntype `info` for more stock info, or type flairs: {} for other r/wsb posts this week.",
        flairs.join(", ")
    )?;
    writeln!(out, "{}", legend.join(", "))?;
    writeln!(
        out,
        "type a post number to open it in your browser, `reload` to start over, `exit` to exit"
    )?;
    write!(out, "> ")?;
    out.flush()
}

pub fn render_search_results<W: Write>(
    out: &mut W,
    symbol: &str,
    flair: Flair,
    results: &[Post],
) -> io::Result<()> {
    writeln!(out, "\n{} posts about {} this week:\n", flair, symbol)?;
    if results.is_empty() {
        writeln!(out, "No {} posts mention {} this week.", flair, symbol)?;
    }
    render_posts(out, results)
}

pub fn render_search_menu<W: Write>(out: &mut W) -> io::Result<()> {
    writeln!(out, "\n{}", RULE)?;
    writeln!(
        out,
        "type a result number to open it in your browser, `back` to return to today's posts, `exit` to exit"
    )?;
    write!(out, "> ")?;
    out.flush()
}

pub fn render_out_of_range<W: Write>(out: &mut W, index: i64, count: usize) -> io::Result<()> {
    if count == 0 {
        writeln!(out, "There is nothing to open.")
    } else {
        writeln!(
            out,
            "No entry numbered {}. Choose a number from 0 to {}.",
            index,
            count - 1
        )
    }
}

pub fn render_quotes<W: Write>(out: &mut W, lookup: &QuoteLookup) -> io::Result<()> {
    let quotes = lookup.quotes();
    let Some(latest) = quotes.last() else {
        return writeln!(out, "No market data available.");
    };

    let source = if lookup.is_cache_hit() {
        "cached"
    } else {
        "fresh"
    };
    writeln!(out, "\n{} market data ({}):\n", latest.symbol, source)?;
    writeln!(
        out,
        "{:<12}{:>10}{:>10}{:>10}{:>10}{:>10}",
        "date", "open", "high", "low", "close", "dividend"
    )?;
    for quote in quotes {
        writeln!(
            out,
            "{:<12}{:>10.2}{:>10.2}{:>10.2}{:>10.2}{:>10.4}",
            quote.date.format("%Y-%m-%d"),
            quote.open,
            quote.high,
            quote.low,
            quote.close,
            quote.dividend
        )?;
    }
    writeln!(out, "\n{}", latest.description)
}

fn bar_length(value: f64, max_abs: f64) -> usize {
    if max_abs <= 0.0 {
        return 0;
    }
    ((value.abs() / max_abs) * CHART_WIDTH as f64).round() as usize
}

/// Horizontal bar chart of reported EPS per fiscal year. Losses are drawn
/// with a lighter shade.
pub fn render_earnings_chart<W: Write>(
    out: &mut W,
    symbol: &str,
    earnings: &[AnnualEarnings],
) -> io::Result<()> {
    writeln!(out, "\nAnnual reported EPS for {}:\n", symbol)?;
    if earnings.is_empty() {
        return writeln!(out, "No annual earnings reported.");
    }

    let max_abs = earnings
        .iter()
        .map(|e| e.reported_eps.abs())
        .fold(0.0_f64, f64::max);

    for entry in earnings {
        let shade = if entry.reported_eps < 0.0 { "░" } else { "█" };
        writeln!(
            out,
            "{}  {:<width$} {:>8.2}",
            entry.fiscal_date_ending.format("%Y"),
            shade.repeat(bar_length(entry.reported_eps, max_abs)),
            entry.reported_eps,
            width = CHART_WIDTH
        )?;
    }
    Ok(())
}

pub fn open_in_browser(url: &str) -> Result<(), CoreError> {
    info!("Opening {} in browser", url);
    webbrowser::open(url).map_err(|e| CoreError::Browser {
        url: url.to_string(),
        reason: e.to_string(),
    })
}
