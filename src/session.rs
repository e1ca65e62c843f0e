use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use log::{debug, info, warn};
use rand::{rngs::StdRng, SeedableRng};

use crate::{
    canvas::TerminalCanvas,
    caret::{lock_screen, SharedScreen},
    config::Config,
    error::{Error, Result},
    result_log::{LogEntry, ResultLog},
    runtime::{InputEvent, KeySource, Runner, Ticker},
    text_source::TextSource,
    ui::Screen,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Mode {
    Words,
    Timed,
    Zen,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum State {
    Selecting,
    Typing(Mode),
    Help,
    AskRepeat { mode: Mode, wpm: f64 },
    Exit,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionResult {
    pub mode: Mode,
    pub correct_chars: usize,
    pub elapsed: Duration,
    pub wpm: f64,
    pub broken: bool,
    pub word_count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Completed(SessionResult),
    Broken(SessionResult),
    /// The text source had nothing to type; the user was told and dismissed it.
    Unavailable,
    /// Input ended.
    Closed,
}

fn is_ctrl_c(key: &KeyEvent) -> bool {
    key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL)
}

/// Menu key to next state. `None` redraws the menu.
pub fn menu_choice(key: KeyEvent) -> Option<State> {
    if is_ctrl_c(&key) {
        return Some(State::Exit);
    }
    match key.code {
        KeyCode::Char('t') => Some(State::Typing(Mode::Timed)),
        KeyCode::Char('w') => Some(State::Typing(Mode::Words)),
        KeyCode::Char('z') => Some(State::Typing(Mode::Zen)),
        KeyCode::Char('h') => Some(State::Help),
        KeyCode::Char('q') | KeyCode::Esc => Some(State::Exit),
        _ => None,
    }
}

/// Answer to the repeat prompt. `None` keeps asking.
pub fn repeat_choice(mode: Mode, key: KeyEvent) -> Option<State> {
    if is_ctrl_c(&key) {
        return Some(State::Exit);
    }
    match key.code {
        KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter | KeyCode::Tab => {
            Some(State::Typing(mode))
        }
        KeyCode::Char('n')
        | KeyCode::Char('N')
        | KeyCode::Backspace
        | KeyCode::Delete
        | KeyCode::Esc => Some(State::Selecting),
        _ => None,
    }
}

/// Drives the mode state machine over one shared screen.
pub struct SessionController<C, E: KeySource, T: Ticker> {
    pub(crate) screen: SharedScreen<C>,
    pub(crate) runner: Runner<E, T>,
    pub(crate) texts: Box<dyn TextSource>,
    pub(crate) log: Box<dyn ResultLog>,
    pub(crate) config: Config,
    pub(crate) rng: StdRng,
    history: Vec<SessionResult>,
}

impl<C, E, T> SessionController<C, E, T>
where
    C: TerminalCanvas + Send + 'static,
    E: KeySource,
    T: Ticker,
{
    pub fn new(
        canvas: C,
        runner: Runner<E, T>,
        texts: Box<dyn TextSource>,
        log: Box<dyn ResultLog>,
        config: Config,
    ) -> Self {
        Self {
            screen: Arc::new(Mutex::new(Screen::new(canvas))),
            runner,
            texts,
            log,
            config,
            rng: StdRng::from_entropy(),
            history: Vec::new(),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn screen(&self) -> SharedScreen<C> {
        Arc::clone(&self.screen)
    }

    /// Sessions finished (completed or broken) so far, oldest first.
    pub fn history(&self) -> &[SessionResult] {
        &self.history
    }

    pub fn run(&mut self) -> Result<()> {
        self.run_from(State::Selecting)
    }

    pub fn run_from(&mut self, mut state: State) -> Result<()> {
        while state != State::Exit {
            state = self.step(state)?;
            debug!("state -> {state:?}");
        }
        Ok(())
    }

    /// Performs one state and returns the next.
    pub fn step(&mut self, state: State) -> Result<State> {
        match state {
            State::Selecting => self.select(),
            State::Help => self.help(),
            State::AskRepeat { mode, wpm } => self.ask_repeat(mode, wpm),
            State::Exit => Ok(State::Exit),
            State::Typing(mode) => {
                let outcome = match mode {
                    Mode::Words | Mode::Timed => self.run_typing(mode)?,
                    Mode::Zen => self.run_zen()?,
                };
                Ok(self.finish(outcome))
            }
        }
    }

    fn finish(&mut self, outcome: Outcome) -> State {
        match outcome {
            Outcome::Completed(result) => {
                info!(
                    "{} session completed: {:.2} wpm over {:.1}s",
                    result.mode,
                    result.wpm,
                    result.elapsed.as_secs_f64()
                );
                self.record(&result);
                let next = State::AskRepeat {
                    mode: result.mode,
                    wpm: result.wpm,
                };
                self.history.push(result);
                next
            }
            Outcome::Broken(result) => {
                info!("{} session broken", result.mode);
                self.record(&result);
                self.history.push(result);
                State::Selecting
            }
            Outcome::Unavailable => State::Selecting,
            Outcome::Closed => State::Exit,
        }
    }

    fn record(&mut self, result: &SessionResult) {
        let entry = LogEntry::new(result, Utc::now());
        if let Err(e) = self.log.append(&entry) {
            warn!("could not append to result log: {e}");
        }
    }

    /// Waits for a key, repainting with `paint` first and after every resize.
    pub(crate) fn prompt<F>(&mut self, mut paint: F) -> Result<Option<KeyEvent>>
    where
        F: FnMut(&mut Screen<C>),
    {
        self.repaint(&mut paint, false)?;
        loop {
            match self.runner.next_key() {
                InputEvent::Key(key) => return Ok(Some(key)),
                InputEvent::Resize => self.repaint(&mut paint, true)?,
                InputEvent::Closed => return Ok(None),
                InputEvent::Tick => {}
            }
        }
    }

    fn repaint<F>(&self, paint: &mut F, resized: bool) -> Result<()>
    where
        F: FnMut(&mut Screen<C>),
    {
        let mut screen = lock_screen(&self.screen);
        if resized {
            screen.canvas.resize().map_err(Error::Terminal)?;
            screen.relayout();
        }
        paint(&mut screen);
        screen.flush().map_err(Error::Terminal)
    }

    fn select(&mut self) -> Result<State> {
        loop {
            let Some(key) = self.prompt(|screen| screen.paint_menu())? else {
                return Ok(State::Exit);
            };
            if let Some(next) = menu_choice(key) {
                return Ok(next);
            }
        }
    }

    fn help(&mut self) -> Result<State> {
        match self.prompt(|screen| screen.paint_help())? {
            Some(_) => Ok(State::Selecting),
            None => Ok(State::Exit),
        }
    }

    fn ask_repeat(&mut self, mode: Mode, wpm: f64) -> Result<State> {
        let decimals = self.config.show_decimal_places;
        loop {
            let Some(key) = self.prompt(|screen| screen.paint_result(wpm, decimals))? else {
                return Ok(State::Exit);
            };
            if let Some(next) = repeat_choice(mode, key) {
                return Ok(next);
            }
        }
    }
}
