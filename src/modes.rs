//! Typing modes: words, timed, zen.

use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, info};

use crate::{
    canvas::{CursorShape, TerminalCanvas},
    caret::{lock_screen, CaretAnimator, CaretMode, CursorMoved, FRAMES_PER_CELL},
    diff::{Applied, Keystroke},
    error::{Error, Result},
    runtime::{InputEvent, KeySource, Ticker},
    session::{Mode, Outcome, SessionController, SessionResult},
    text_source::{build_target, pick_quote},
    timing::{wpm, TimingRecorder},
    zen::{ZenPad, ZenStep},
};

/// Longest wait for input in timed mode before the deadline is checked again.
const TIMED_POLL: Duration = Duration::from_millis(50);

enum TypingEnd {
    Completed(Instant),
    Broken(Instant),
    Closed,
}

impl<C, E, T> SessionController<C, E, T>
where
    C: TerminalCanvas + Send + 'static,
    E: KeySource,
    T: Ticker,
{
    fn target_for(&mut self, mode: Mode) -> Result<String> {
        match (mode, self.config.quote) {
            (Mode::Words, Some(length)) => {
                let quotes = self.texts.quotes(length)?;
                Ok(pick_quote(&quotes, &mut self.rng).unwrap_or_default())
            }
            (Mode::Words, None) => {
                let mut words = self.texts.word_list()?;
                Ok(build_target(&mut words, self.config.words_count, &mut self.rng))
            }
            (Mode::Timed, _) => {
                let mut words = self.texts.word_list()?;
                Ok(build_target(&mut words, self.config.timed_words, &mut self.rng))
            }
            (Mode::Zen, _) => Ok(String::new()),
        }
    }

    /// Words and timed sessions: diff engine, caret animator, and result.
    pub(crate) fn run_typing(&mut self, mode: Mode) -> Result<Outcome> {
        let target = self.target_for(mode)?;
        if target.is_empty() {
            let message = format!("error: mode {mode}: wordstring was empty");
            return Ok(match self.prompt(|screen| screen.paint_error(&message))? {
                Some(_) => Outcome::Unavailable,
                None => Outcome::Closed,
            });
        }

        let budget = (mode == Mode::Timed).then(|| self.config.timed_budget());
        info!(
            "{mode} session started with {} words",
            target.split(' ').count()
        );
        let caret = CaretMode::from_config(&self.config);
        {
            let mut screen = lock_screen(&self.screen);
            screen.begin(&target);
            screen.set_caret_mode(caret);
            screen.canvas.clear();
            screen.paint_all();
            if let Some(budget) = budget {
                screen.paint_timer(budget);
            }
            screen.flush().map_err(Error::Terminal)?;
        }

        let animator = CaretAnimator::spawn(Arc::clone(&self.screen), caret);
        let ended = self.typing_loop(&animator, budget);
        animator.stop();

        let mut screen = lock_screen(&self.screen);
        screen.set_caret_mode(CaretMode::Hidden);
        screen.paint_all();
        screen.canvas.set_cursor_shape(CursorShape::Hidden);
        screen.flush().map_err(Error::Terminal)?;

        let (end, broken) = match ended? {
            TypingEnd::Completed(at) => (at, false),
            TypingEnd::Broken(at) => (at, true),
            TypingEnd::Closed => return Ok(Outcome::Closed),
        };
        let elapsed = match budget {
            Some(budget) => screen.timing.elapsed_until(end).min(budget),
            None => screen.timing.elapsed(),
        };
        let correct = screen.engine.correct_count();
        let result = SessionResult {
            mode,
            correct_chars: correct,
            elapsed,
            wpm: wpm(correct, elapsed),
            broken,
            word_count: screen.engine.word_count(),
        };
        Ok(if broken {
            Outcome::Broken(result)
        } else {
            Outcome::Completed(result)
        })
    }

    fn typing_loop(&self, animator: &CaretAnimator, budget: Option<Duration>) -> Result<TypingEnd> {
        let caret_wait = self.config.caret_wait();
        loop {
            let started_at = lock_screen(&self.screen).timing.started_at();
            let event = match (budget, started_at) {
                (Some(budget), Some(start)) => {
                    let elapsed = start.elapsed();
                    if elapsed >= budget {
                        return Ok(TypingEnd::Completed(start + budget));
                    }
                    self.runner.poll((budget - elapsed).min(TIMED_POLL))
                }
                _ => self.runner.step(),
            };

            match event {
                InputEvent::Closed => return Ok(TypingEnd::Closed),
                InputEvent::Tick => {
                    if let (Some(budget), Some(start)) = (budget, started_at) {
                        let mut screen = lock_screen(&self.screen);
                        screen.paint_timer(budget.saturating_sub(start.elapsed()));
                        screen.flush().map_err(Error::Terminal)?;
                    }
                }
                InputEvent::Resize => {
                    let mut screen = lock_screen(&self.screen);
                    screen.resize().map_err(Error::Terminal)?;
                    if let Some(budget) = budget {
                        let left = started_at.map_or(budget, |s| budget.saturating_sub(s.elapsed()));
                        screen.paint_timer(left);
                    }
                    screen.flush().map_err(Error::Terminal)?;
                }
                InputEvent::Key(key) => {
                    let keystroke = Keystroke::from(key);
                    let mut screen = lock_screen(&self.screen);
                    if let (Some(budget), Some(start)) = (budget, screen.timing.started_at()) {
                        if start.elapsed() >= budget {
                            debug!("{keystroke:?} arrived after the deadline");
                            return Ok(TypingEnd::Completed(start + budget));
                        }
                    }
                    match screen.engine.apply(keystroke) {
                        Applied::Broken => return Ok(TypingEnd::Broken(Instant::now())),
                        Applied::Ignored => {}
                        Applied::Render(delta) => {
                            let at = screen.timing.record();
                            screen.paint_delta(&delta);
                            if let (Some(budget), Some(start)) = (budget, screen.timing.started_at()) {
                                screen.paint_timer(budget.saturating_sub(at - start));
                            }
                            screen.flush().map_err(Error::Terminal)?;

                            let cells = delta.moved.distance().max(1) as u32;
                            let delay = screen.timing.frame_delay(caret_wait, FRAMES_PER_CELL * cells);
                            let complete = screen.engine.is_complete();
                            drop(screen);

                            animator.notify(CursorMoved::new(delta.moved, delay));
                            if complete {
                                return Ok(TypingEnd::Completed(at));
                            }
                        }
                    }
                }
            }
        }
    }

    /// Free typing until tab. Speed counts every typed character.
    pub(crate) fn run_zen(&mut self) -> Result<Outcome> {
        let mut pad = ZenPad::new();
        let mut timing = TimingRecorder::new();
        info!("zen session started");

        let finished = loop {
            let Some(key) = self.prompt(|screen| screen.paint_zen(&pad))? else {
                break false;
            };
            match pad.apply(Keystroke::from(key)) {
                ZenStep::Finished => break true,
                ZenStep::Edited => {
                    timing.record();
                }
                ZenStep::Ignored => {}
            }
        };

        {
            let mut screen = lock_screen(&self.screen);
            screen.begin("");
            screen.canvas.clear();
            screen.canvas.set_cursor_shape(CursorShape::Hidden);
            screen.flush().map_err(Error::Terminal)?;
        }
        if !finished {
            return Ok(Outcome::Closed);
        }

        let elapsed = timing.elapsed_until(Instant::now());
        let typed = pad.typed_chars();
        Ok(Outcome::Completed(SessionResult {
            mode: Mode::Zen,
            correct_chars: typed,
            elapsed,
            wpm: wpm(typed, elapsed),
            broken: false,
            word_count: pad.word_count(),
        }))
    }
}
