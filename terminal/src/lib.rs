pub mod presenter;

use std::io::{BufRead, Write};
use synth_core::{AnnualEarnings, CoreError, ErrorExt, Flair, Post, PostBoard, QuoteLookup};
use tracing::{debug, info};

/// Everything the prompt needs from the outside world.
#[allow(async_fn_in_trait)]
pub trait Backend {
    /// Cached posts if this session already has them, otherwise a fresh
    /// fetch, symbol extraction and cache fill.
    async fn load_board(&mut self) -> Result<PostBoard, CoreError>;

    async fn quote(&mut self, symbol: &str) -> Result<QuoteLookup, CoreError>;

    async fn annual_earnings(&mut self, symbol: &str) -> Result<Vec<AnnualEarnings>, CoreError>;

    async fn search_flair(&mut self, symbol: &str, flair: Flair) -> Result<Vec<Post>, CoreError>;

    fn open_url(&mut self, url: &str) -> Result<(), CoreError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    AwaitingFirstKeypress,
    ShowingList,
    AwaitingCommand,
    ShowingSearchResults,
    AwaitingSearchSelection,
    Exited,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Info,
    Reload,
    Flair(Flair),
    Select(i64),
    Back,
    Exit,
    Unknown(String),
}

impl Command {
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        if let Ok(index) = input.parse::<i64>() {
            return Command::Select(index);
        }
        if let Some(flair) = Flair::from_key(input) {
            return Command::Flair(flair);
        }
        match input.to_ascii_lowercase().as_str() {
            "info" => Command::Info,
            "reload" => Command::Reload,
            "back" => Command::Back,
            "exit" => Command::Exit,
            _ => Command::Unknown(input.to_string()),
        }
    }
}

/// The read-eval-print loop over a line-oriented input and an output sink.
pub struct App<B, R, W> {
    backend: B,
    input: R,
    output: W,
    state: State,
    board: Option<PostBoard>,
    search_results: Vec<Post>,
}

impl<B: Backend, R: BufRead, W: Write> App<B, R, W> {
    pub fn new(backend: B, input: R, output: W) -> Self {
        Self {
            backend,
            input,
            output,
            state: State::AwaitingFirstKeypress,
            board: None,
            search_results: Vec::new(),
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn output(&self) -> &W {
        &self.output
    }

    pub async fn run(&mut self) -> Result<(), CoreError> {
        info!("Starting interactive session");
        while self.state != State::Exited {
            self.step().await?;
        }
        info!("Interactive session ended");
        Ok(())
    }

    /// Advances the state machine by one transition.
    pub async fn step(&mut self) -> Result<State, CoreError> {
        let next = match self.state {
            State::AwaitingFirstKeypress => self.await_first_keypress().await?,
            State::ShowingList => {
                if let Some(board) = &self.board {
                    presenter::render_board(&mut self.output, board)?;
                }
                presenter::render_menu(&mut self.output)?;
                State::AwaitingCommand
            }
            State::AwaitingCommand => self.handle_command().await?,
            State::ShowingSearchResults => {
                presenter::render_search_menu(&mut self.output)?;
                State::AwaitingSearchSelection
            }
            State::AwaitingSearchSelection => self.handle_search_selection()?,
            State::Exited => State::Exited,
        };

        if next != self.state {
            debug!("State {:?} -> {:?}", self.state, next);
        }
        self.state = next;
        Ok(next)
    }

    fn read_command(&mut self) -> Result<Command, CoreError> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(Command::Exit);
        }
        Ok(Command::parse(&line))
    }

    async fn await_first_keypress(&mut self) -> Result<State, CoreError> {
        presenter::render_welcome(&mut self.output)?;
        if self.read_command()? == Command::Exit {
            return Ok(State::Exited);
        }

        self.board = Some(self.backend.load_board().await?);
        Ok(State::ShowingList)
    }

    fn symbol(&self) -> Result<String, CoreError> {
        self.board
            .as_ref()
            .map(|board| board.symbol.clone())
            .ok_or_else(|| CoreError::InvalidInput {
                message: "No posts have been loaded yet".to_string(),
            })
    }

    async fn handle_command(&mut self) -> Result<State, CoreError> {
        match self.read_command()? {
            Command::Exit => Ok(State::Exited),
            Command::Reload => Ok(State::AwaitingFirstKeypress),
            Command::Info => {
                let symbol = self.symbol()?;
                let lookup = self.backend.quote(&symbol).await?;
                presenter::render_quotes(&mut self.output, &lookup)?;
                let earnings = self.backend.annual_earnings(&symbol).await?;
                presenter::render_earnings_chart(&mut self.output, &symbol, &earnings)?;
                presenter::render_menu(&mut self.output)?;
                Ok(State::AwaitingCommand)
            }
            Command::Flair(flair) => {
                let symbol = self.symbol()?;
                self.search_results = self.backend.search_flair(&symbol, flair).await?;
                presenter::render_search_results(
                    &mut self.output,
                    &symbol,
                    flair,
                    &self.search_results,
                )?;
                Ok(State::ShowingSearchResults)
            }
            Command::Select(index) => {
                let url = self
                    .board
                    .as_ref()
                    .and_then(|board| select_url(&board.posts, index));
                let count = self.board.as_ref().map_or(0, |board| board.posts.len());
                self.open_or_reject(url, index, count)?;
                Ok(State::AwaitingCommand)
            }
            Command::Back | Command::Unknown(_) => {
                presenter::render_menu(&mut self.output)?;
                Ok(State::AwaitingCommand)
            }
        }
    }

    fn handle_search_selection(&mut self) -> Result<State, CoreError> {
        match self.read_command()? {
            Command::Exit => Ok(State::Exited),
            Command::Back => Ok(State::ShowingList),
            Command::Select(index) => {
                let url = select_url(&self.search_results, index);
                let count = self.search_results.len();
                self.open_or_reject(url, index, count)?;
                Ok(State::AwaitingSearchSelection)
            }
            _ => {
                presenter::render_search_menu(&mut self.output)?;
                Ok(State::AwaitingSearchSelection)
            }
        }
    }

    fn open_or_reject(
        &mut self,
        url: Option<String>,
        index: i64,
        count: usize,
    ) -> Result<(), CoreError> {
        match url {
            Some(url) => {
                writeln!(self.output, "Opening {}", url)?;
                if let Err(e) = self.backend.open_url(&url) {
                    e.log_warn();
                    writeln!(self.output, "{}", e.user_friendly_message())?;
                }
            }
            None => presenter::render_out_of_range(&mut self.output, index, count)?,
        }
        write!(self.output, "> ")?;
        self.output.flush()?;
        Ok(())
    }
}

fn select_url(posts: &[Post], index: i64) -> Option<String> {
    usize::try_from(index)
        .ok()
        .and_then(|i| posts.get(i))
        .map(|post| post.url.clone())
}
