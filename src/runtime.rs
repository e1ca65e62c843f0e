use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::Duration;

use crossterm::event::{self, Event as CtEvent, KeyEvent, KeyEventKind};
use log::{debug, warn};

/// Input consumed by the session controller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InputEvent {
    Key(KeyEvent),
    Resize,
    Tick,
    /// The key source is gone; nothing more will arrive.
    Closed,
}

/// Source of key and resize events.
pub trait KeySource: Send + 'static {
    /// Block for up to `timeout` waiting for an event.
    fn recv_timeout(&self, timeout: Duration) -> Result<InputEvent, RecvTimeoutError>;
}

/// Reads crossterm events on a dedicated thread.
pub struct CrosstermKeySource {
    rx: Receiver<InputEvent>,
}

impl CrosstermKeySource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || loop {
            let forwarded = match event::read() {
                Ok(CtEvent::Key(key)) if key.kind != KeyEventKind::Release => {
                    tx.send(InputEvent::Key(key))
                }
                Ok(CtEvent::Resize(cols, rows)) => {
                    debug!("terminal resized to {cols}x{rows}");
                    tx.send(InputEvent::Resize)
                }
                Ok(_) => Ok(()),
                Err(e) => {
                    warn!("reading terminal events failed: {e}");
                    break;
                }
            };
            if forwarded.is_err() {
                break;
            }
        });

        Self { rx }
    }
}

impl Default for CrosstermKeySource {
    fn default() -> Self {
        Self::new()
    }
}

impl KeySource for CrosstermKeySource {
    fn recv_timeout(&self, timeout: Duration) -> Result<InputEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Scripted key source fed through a channel.
pub struct TestKeySource {
    rx: Receiver<InputEvent>,
}

impl TestKeySource {
    pub fn new(rx: Receiver<InputEvent>) -> Self {
        Self { rx }
    }
}

impl KeySource for TestKeySource {
    fn recv_timeout(&self, timeout: Duration) -> Result<InputEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

pub trait Ticker: Send + Sync + 'static {
    fn interval(&self) -> Duration;
}

#[derive(Clone, Copy, Debug)]
pub struct FixedTicker {
    interval: Duration,
}

impl FixedTicker {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Ticker for FixedTicker {
    fn interval(&self) -> Duration {
        self.interval
    }
}

/// Hands out one event (or tick) at a time.
pub struct Runner<E: KeySource, T: Ticker> {
    source: E,
    ticker: T,
}

impl<E: KeySource, T: Ticker> Runner<E, T> {
    pub fn new(source: E, ticker: T) -> Self {
        Self { source, ticker }
    }

    /// Blocks up to the tick interval and returns the next event, or Tick on timeout.
    pub fn step(&self) -> InputEvent {
        self.poll(self.ticker.interval())
    }

    pub fn poll(&self, timeout: Duration) -> InputEvent {
        match self.source.recv_timeout(timeout) {
            Ok(ev) => ev,
            Err(RecvTimeoutError::Timeout) => InputEvent::Tick,
            Err(RecvTimeoutError::Disconnected) => InputEvent::Closed,
        }
    }

    /// Blocks until a key arrives, passing resizes through. Ticks are swallowed.
    pub fn next_key(&self) -> InputEvent {
        loop {
            match self.step() {
                InputEvent::Tick => continue,
                other => return other,
            }
        }
    }
}
