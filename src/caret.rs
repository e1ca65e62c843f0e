//! Background caret animation.
//!
//! The animator owns no screen state. It shares the [`Screen`] with the input
//! thread through one mutex, takes it for a single frame at a time, and sleeps
//! with the lock released. Cursor moves arrive over a channel; a queued move
//! supersedes the transition in flight.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use log::{debug, warn};

use crate::{
    canvas::{GlyphStyle, TerminalCanvas},
    config::Config,
    diff::{CursorMove, Direction},
    theme::Role,
    ui::Screen,
};

/// Left-anchored partial blocks, one eighth wider each step.
pub const FILL: [char; 8] = ['▏', '▎', '▍', '▌', '▋', '▊', '▉', '█'];

/// Frames in one cell transition: the full fill plus a drain that stops one short of empty.
pub const FRAMES_PER_CELL: u32 = 15;

const IDLE_POLL: Duration = Duration::from_millis(50);

pub type SharedScreen<C> = Arc<Mutex<Screen<C>>>;

/// Locks the screen, recovering it if a previous holder panicked.
pub fn lock_screen<C>(screen: &Mutex<Screen<C>>) -> MutexGuard<'_, Screen<C>> {
    screen.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaretMode {
    /// No caret at all.
    Hidden,
    /// Steady block placed in one step.
    Instant,
    /// Steady block reached through per-cell fill and drain frames.
    Smooth,
    /// The terminal's own steady bar cursor.
    Native,
}

impl CaretMode {
    pub fn from_config(config: &Config) -> Self {
        if config.hide_caret {
            CaretMode::Hidden
        } else if config.xterm_support {
            CaretMode::Native
        } else if config.smooth_caret {
            CaretMode::Smooth
        } else {
            CaretMode::Instant
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CursorMoved {
    pub from: usize,
    pub to: usize,
    pub frame_delay: Duration,
}

impl CursorMoved {
    pub fn new(moved: CursorMove, frame_delay: Duration) -> Self {
        Self {
            from: moved.from,
            to: moved.to,
            frame_delay,
        }
    }

    pub fn direction(&self) -> Direction {
        CursorMove {
            from: self.from,
            to: self.to,
        }
        .direction()
    }

    pub fn distance(&self) -> usize {
        self.from.abs_diff(self.to)
    }

    /// Folds a later move into this one: the caret travels from the earliest origin to the latest target.
    ///
    /// A merged move longer than `later` keeps `later`'s total duration, so its per-frame delay shrinks.
    pub fn merge(self, later: CursorMoved) -> Self {
        let mut merged = Self {
            from: self.from,
            to: later.to,
            frame_delay: later.frame_delay,
        };
        let (cells, later_cells) = (merged.distance(), later.distance().max(1));
        if cells > later_cells {
            merged.frame_delay = later.frame_delay * later_cells as u32 / cells as u32;
        }
        merged
    }
}

#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Glyph and role of every frame played over one cell.
///
/// Forward: the caret grows in from the left, then drains out to the right.
/// Backward: the mirror image, entering from the right.
pub fn frames(direction: Direction) -> Vec<(char, Role)> {
    let fill = FILL.iter().map(|&g| (g, Role::Caret));
    let drain = FILL[..7].iter().map(|&g| (g, Role::CaretInverse));
    match direction {
        Direction::Forward => fill.chain(drain).collect(),
        Direction::Backward => {
            let enter = FILL.iter().rev().map(|&g| (g, Role::CaretInverse));
            let leave = FILL[1..].iter().rev().map(|&g| (g, Role::Caret));
            enter.chain(leave).collect()
        }
    }
}

/// Cells the caret passes over for a move, in the order they are animated.
pub fn path(moved: &CursorMoved) -> Vec<usize> {
    match moved.direction() {
        Direction::Forward => (moved.from..moved.to).collect(),
        Direction::Backward => (moved.to..moved.from).rev().collect(),
    }
}

enum Transition {
    Landed,
    Superseded,
    Cancelled,
}

/// Handle to a running animator thread. Dropping it cancels and joins.
pub struct CaretAnimator {
    tx: Option<Sender<CursorMoved>>,
    cancel: CancelToken,
    handle: Option<JoinHandle<()>>,
}

impl CaretAnimator {
    pub fn spawn<C>(screen: SharedScreen<C>, mode: CaretMode) -> Self
    where
        C: TerminalCanvas + Send + 'static,
    {
        let (tx, rx) = unbounded();
        let cancel = CancelToken::new();
        let worker = Worker {
            screen,
            rx,
            cancel: cancel.clone(),
            mode,
        };
        let handle = thread::Builder::new()
            .name("caret".to_string())
            .spawn(move || worker.run());
        let handle = match handle {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!("could not start caret animator: {e}");
                None
            }
        };
        Self {
            tx: Some(tx),
            cancel,
            handle,
        }
    }

    pub fn notify(&self, moved: CursorMoved) {
        if let Some(tx) = &self.tx {
            // a closed channel means the worker already exited
            let _ = tx.send(moved);
        }
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Cancels the worker and waits for it. The last frame drawn may be partial.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.cancel.cancel();
        self.tx.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("caret animator panicked");
            }
        }
    }
}

impl Drop for CaretAnimator {
    fn drop(&mut self) {
        self.shutdown();
    }
}

struct Worker<C> {
    screen: SharedScreen<C>,
    rx: Receiver<CursorMoved>,
    cancel: CancelToken,
    mode: CaretMode,
}

impl<C: TerminalCanvas> Worker<C> {
    fn run(self) {
        debug!("caret animator started ({:?})", self.mode);
        match self.animate() {
            Ok(()) => debug!("caret animator stopped"),
            Err(e) => warn!("caret animator stopped: frame failed: {e}"),
        }
    }

    fn animate(&self) -> io::Result<()> {
        self.land()?;
        loop {
            if self.cancel.is_cancelled() {
                return Ok(());
            }
            let mut moved = match self.rx.recv_timeout(IDLE_POLL) {
                Ok(moved) => moved,
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => return Ok(()),
            };
            while let Ok(later) = self.rx.try_recv() {
                moved = moved.merge(later);
            }
            if self.cancel.is_cancelled() {
                return Ok(());
            }

            let outcome = if self.mode == CaretMode::Smooth && moved.distance() > 0 {
                self.transition(&moved)?
            } else {
                Transition::Landed
            };
            match outcome {
                Transition::Landed => self.land()?,
                Transition::Superseded => continue,
                Transition::Cancelled => return Ok(()),
            }
        }
    }

    fn transition(&self, moved: &CursorMoved) -> io::Result<Transition> {
        let frames = frames(moved.direction());
        for cell in path(moved) {
            self.frame(|screen| {
                screen.clear_caret();
                screen.paint_cell(cell);
            })?;
            for &(glyph, role) in &frames {
                if self.cancel.is_cancelled() {
                    return Ok(Transition::Cancelled);
                }
                if !self.rx.is_empty() {
                    self.frame(|screen| screen.paint_cell(cell))?;
                    return Ok(Transition::Superseded);
                }
                self.frame(|screen| screen.paint_glyph(cell, glyph, GlyphStyle::new(role)))?;
                thread::sleep(moved.frame_delay);
            }
            self.frame(|screen| screen.paint_cell(cell))?;
        }
        Ok(Transition::Landed)
    }

    fn land(&self) -> io::Result<()> {
        let mode = self.mode;
        self.frame(|screen| screen.place_caret(mode))
    }

    /// Runs `draw` and flushes while holding the screen lock.
    fn frame(&self, draw: impl FnOnce(&mut Screen<C>)) -> io::Result<()> {
        let mut screen = lock_screen(&self.screen);
        draw(&mut screen);
        screen.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::RatatuiCanvas;
    use crate::diff::{Applied, Keystroke};
    use crate::theme::Theme;
    use ratatui::{backend::TestBackend, Terminal};
    use std::time::Instant;

    fn shared(target: &str) -> SharedScreen<RatatuiCanvas<TestBackend>> {
        let terminal = Terminal::new(TestBackend::new(40, 6)).unwrap();
        let canvas = RatatuiCanvas::headless(terminal, Theme::default()).unwrap();
        let mut screen = Screen::new(canvas);
        screen.begin(target);
        screen.paint_all();
        Arc::new(Mutex::new(screen))
    }

    fn wait_for(mut done: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(2);
        while !done() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(2));
        }
    }

    #[test]
    fn test_forward_frames() {
        let frames = frames(Direction::Forward);
        assert_eq!(frames.len(), FRAMES_PER_CELL as usize);
        assert_eq!(frames[0], ('▏', Role::Caret));
        assert_eq!(frames[7], ('█', Role::Caret));
        assert_eq!(frames[8], ('▏', Role::CaretInverse));
        assert_eq!(frames[14], ('▉', Role::CaretInverse));
    }

    #[test]
    fn test_backward_frames_mirror_forward() {
        let frames = frames(Direction::Backward);
        assert_eq!(frames.len(), FRAMES_PER_CELL as usize);
        assert_eq!(frames[0], ('█', Role::CaretInverse));
        assert_eq!(frames[7], ('▏', Role::CaretInverse));
        assert_eq!(frames[8], ('█', Role::Caret));
        assert_eq!(frames[14], ('▎', Role::Caret));
    }

    #[test]
    fn test_path_per_direction() {
        let fwd = CursorMoved {
            from: 2,
            to: 5,
            frame_delay: Duration::ZERO,
        };
        assert_eq!(path(&fwd), vec![2, 3, 4]);
        let back = CursorMoved {
            from: 5,
            to: 3,
            frame_delay: Duration::ZERO,
        };
        assert_eq!(path(&back), vec![4, 3]);
    }

    #[test]
    fn test_merge_keeps_origin() {
        let first = CursorMoved {
            from: 1,
            to: 2,
            frame_delay: Duration::from_millis(5),
        };
        let later = CursorMoved {
            from: 2,
            to: 1,
            frame_delay: Duration::from_millis(1),
        };
        let merged = first.merge(later);
        assert_eq!((merged.from, merged.to), (1, 1));
        assert_eq!(merged.distance(), 0);
        assert_eq!(merged.frame_delay, Duration::from_millis(1));
    }

    #[test]
    fn test_merge_spreads_delay_over_longer_move() {
        let first = CursorMoved {
            from: 0,
            to: 1,
            frame_delay: Duration::from_millis(4),
        };
        let later = CursorMoved {
            from: 1,
            to: 4,
            frame_delay: Duration::from_millis(4),
        };
        let merged = first.merge(later);
        assert_eq!((merged.from, merged.to), (0, 4));
        // three cells' worth of frames now cover four cells
        assert_eq!(merged.frame_delay, Duration::from_millis(3));
    }

    #[test]
    fn test_merge_zero_distance_later_move() {
        let first = CursorMoved {
            from: 0,
            to: 2,
            frame_delay: Duration::from_millis(2),
        };
        let later = CursorMoved {
            from: 2,
            to: 2,
            frame_delay: Duration::from_millis(6),
        };
        assert_eq!(first.merge(later).frame_delay, Duration::from_millis(3));
    }

    #[test]
    fn test_mode_from_config() {
        let mut config = Config::default();
        assert_eq!(CaretMode::from_config(&config), CaretMode::Smooth);
        config.smooth_caret = false;
        assert_eq!(CaretMode::from_config(&config), CaretMode::Instant);
        config.xterm_support = true;
        assert_eq!(CaretMode::from_config(&config), CaretMode::Native);
        config.hide_caret = true;
        assert_eq!(CaretMode::from_config(&config), CaretMode::Hidden);
    }

    #[test]
    fn test_animator_lands_on_cursor() {
        let screen = shared("ab");
        let animator = CaretAnimator::spawn(screen.clone(), CaretMode::Smooth);
        wait_for(|| lock_screen(&screen).caret_at() == Some(0));

        let moved = {
            let mut s = lock_screen(&screen);
            let Applied::Render(delta) = s.engine.apply(Keystroke::Char('a')) else {
                panic!("expected a render");
            };
            s.paint_delta(&delta);
            delta.moved
        };
        animator.notify(CursorMoved::new(moved, Duration::from_micros(100)));
        wait_for(|| lock_screen(&screen).caret_at() == Some(1));
        animator.stop();

        let s = lock_screen(&screen);
        assert_eq!(s.caret_at(), Some(1));
        let (row, col) = s.layout.position(1);
        let cell = s.canvas.grid().cell((col, row)).unwrap();
        assert_eq!(cell.symbol(), "b");
        assert_eq!(cell.bg, Theme::default().caret);
        // the cell left behind is back to its typed state
        let (row, col) = s.layout.position(0);
        assert_eq!(s.canvas.grid().cell((col, row)).unwrap().fg, Theme::default().main);
    }

    #[test]
    fn test_cancel_stops_mid_transition() {
        let screen = shared("abcdef");
        let animator = CaretAnimator::spawn(screen.clone(), CaretMode::Smooth);
        animator.notify(CursorMoved {
            from: 0,
            to: 6,
            frame_delay: Duration::from_millis(20),
        });
        thread::sleep(Duration::from_millis(30));
        let started = Instant::now();
        animator.stop();
        // 6 cells x 15 frames x 20ms would take well over a second
        assert!(started.elapsed() < Duration::from_millis(500));
    }

    #[test]
    fn test_hidden_mode_draws_nothing() {
        let screen = shared("ab");
        let animator = CaretAnimator::spawn(screen.clone(), CaretMode::Hidden);
        animator.notify(CursorMoved {
            from: 0,
            to: 1,
            frame_delay: Duration::ZERO,
        });
        thread::sleep(Duration::from_millis(20));
        drop(animator);
        assert_eq!(lock_screen(&screen).caret_at(), None);
    }
}
