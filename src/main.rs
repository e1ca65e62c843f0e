use std::{
    fs::{self, OpenOptions},
    io::{self, stdin},
    path::PathBuf,
    process::ExitCode,
    time::Duration,
};

use anyhow::Context;
use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    cursor::{SetCursorStyle, Show},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use log::info;
use ratatui::{backend::CrosstermBackend, Terminal};

use typeline::{
    app_dirs::AppDirs,
    canvas::RatatuiCanvas,
    config::{Config, ConfigStore, FileConfigStore},
    result_log::CsvResultLog,
    runtime::{CrosstermKeySource, FixedTicker, Runner},
    session::SessionController,
    text_source::{EmbeddedTextSource, QuoteLength},
    theme::Theme,
};

const TICK_RATE_MS: u64 = 100;

/// terminal typing trainer with a smooth caret
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "A terminal typing trainer: pick words, timed, or zen mode, type the text, and get your words per minute. Results are appended to ~/.local/state/typeline/results.csv."
)]
pub struct Cli {
    /// number of words in words mode
    #[clap(short = 'w', long)]
    words_count: Option<usize>,

    /// number of seconds in timed mode
    #[clap(short = 's', long)]
    timed_secs: Option<u64>,

    /// number of words offered in timed mode
    #[clap(long)]
    timed_words: Option<usize>,

    /// language to pull words from
    #[clap(short = 'l', long)]
    language: Option<String>,

    /// `default` or a path to a CSS theme file
    #[clap(short = 't', long)]
    theme: Option<String>,

    /// type a quote of this length in words mode instead of random words
    #[clap(short = 'q', long, value_enum)]
    quote: Option<QuoteLength>,

    /// move the caret in one step instead of animating it
    #[clap(long)]
    no_smooth_caret: bool,

    /// longest caret animation frame in microseconds
    #[clap(long)]
    caret_wait: Option<u64>,

    /// use the terminal's own bar cursor as the caret
    #[clap(long)]
    xterm: bool,

    /// do not draw a caret
    #[clap(long)]
    hide_caret: bool,

    /// show wpm with two decimal places
    #[clap(long)]
    decimals: bool,

    /// read configuration from this file instead of the default location
    #[clap(long)]
    config: Option<PathBuf>,

    /// write the merged configuration back to the config file
    #[clap(long)]
    save_config: bool,
}

impl Cli {
    /// Config file values overridden by whatever was given on the command line.
    fn overlay(&self, mut config: Config) -> Config {
        if let Some(n) = self.words_count {
            config.words_count = n;
        }
        if let Some(secs) = self.timed_secs {
            config.timed_secs = secs;
        }
        if let Some(n) = self.timed_words {
            config.timed_words = n;
        }
        if let Some(language) = &self.language {
            config.language = language.clone();
        }
        if let Some(theme) = &self.theme {
            config.theme = theme.clone();
        }
        if self.quote.is_some() {
            config.quote = self.quote;
        }
        if let Some(wait) = self.caret_wait {
            config.caret_wait = wait;
        }
        config.smooth_caret &= !self.no_smooth_caret;
        config.xterm_support |= self.xterm;
        config.hide_caret |= self.hide_caret;
        config.show_decimal_places |= self.decimals;
        config
    }

    fn config_store(&self) -> anyhow::Result<FileConfigStore> {
        match &self.config {
            Some(path) => Ok(FileConfigStore::with_path(path)),
            None => FileConfigStore::new().context("config"),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    init_logging();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("fatal: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Logs go to a file in the state dir; the terminal belongs to the TUI.
fn init_logging() {
    let Some(path) = AppDirs::log_path() else {
        return;
    };
    if let Some(parent) = path.parent() {
        if fs::create_dir_all(parent).is_err() {
            return;
        }
    }
    let Ok(file) = OpenOptions::new().create(true).append(true).open(&path) else {
        return;
    };
    env_logger::Builder::from_env(env_logger::Env::new().filter_or("TYPELINE_LOG", "info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let store = cli.config_store()?;
    let config = cli.overlay(store.load().context("config")?);
    config.validate().context("config")?;
    if cli.save_config {
        store
            .save(&config)
            .with_context(|| format!("config: saving {}", store.path().display()))?;
    }

    let theme = Theme::load(&config.theme).context("theme")?;
    let texts = EmbeddedTextSource::new(&config.language).context("words")?;
    let results_path = AppDirs::results_path().context("result log: no state directory")?;
    info!("starting with {config:?}");

    enable_raw_mode().context("terminal")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("terminal")?;

    let outcome = run_tui(config, theme, texts, CsvResultLog::new(results_path));

    // restore even when the session failed
    let restored = restore_terminal();
    outcome?;
    restored.context("terminal")
}

fn run_tui(
    config: Config,
    theme: Theme,
    texts: EmbeddedTextSource,
    log: CsvResultLog,
) -> anyhow::Result<()> {
    let terminal = Terminal::new(CrosstermBackend::new(io::stdout())).context("terminal")?;
    let canvas = RatatuiCanvas::new(terminal, theme).context("terminal")?;
    let runner = Runner::new(
        CrosstermKeySource::new(),
        FixedTicker::new(Duration::from_millis(TICK_RATE_MS)),
    );
    let mut controller =
        SessionController::new(canvas, runner, Box::new(texts), Box::new(log), config);
    controller.run().context("session")?;
    info!("exiting after {} sessions", controller.history().len());
    Ok(())
}

fn restore_terminal() -> io::Result<()> {
    disable_raw_mode()?;
    execute!(
        io::stdout(),
        LeaveAlternateScreen,
        SetCursorStyle::DefaultUserShape,
        Show
    )
}
