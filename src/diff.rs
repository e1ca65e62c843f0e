//! Keystroke-driven diff of typed input against a target text.
//!
//! The engine owns an annotated copy of the target (one [`CharCell`] per
//! character, plus injected cells for characters typed where none were
//! expected) and the logical cursor. Every keystroke is absorbed into a
//! defined buffer transition; there is no invalid input.

use std::ops::Range;

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use log::trace;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CellState {
    Original,
    Correct,
    Error,
    /// Typed where the target had no character (inside a word's tail or past the end).
    ExtraError,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CharCell {
    pub ch: char,
    pub state: CellState,
}

impl CharCell {
    pub fn original(ch: char) -> Self {
        Self {
            ch,
            state: CellState::Original,
        }
    }

    pub fn is_space(&self) -> bool {
        self.ch == ' '
    }
}

/// Input as seen by the engine, decoupled from the terminal key encoding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Keystroke {
    Char(char),
    Backspace,
    Enter,
    /// Tab, delete, or ctrl+c: ends the session without a result.
    Abort,
    Other,
}

impl Keystroke {
    pub fn from_key(key: KeyEvent) -> Self {
        if key.kind == KeyEventKind::Release {
            return Keystroke::Other;
        }
        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                Keystroke::Abort
            }
            KeyCode::Tab | KeyCode::BackTab | KeyCode::Delete => Keystroke::Abort,
            KeyCode::Backspace => Keystroke::Backspace,
            KeyCode::Enter => Keystroke::Enter,
            KeyCode::Char(c) => Keystroke::Char(c),
            _ => Keystroke::Other,
        }
    }
}

impl From<KeyEvent> for Keystroke {
    fn from(key: KeyEvent) -> Self {
        Keystroke::from_key(key)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CursorMove {
    pub from: usize,
    pub to: usize,
}

impl CursorMove {
    pub fn direction(&self) -> Direction {
        if self.to < self.from {
            Direction::Backward
        } else {
            Direction::Forward
        }
    }

    pub fn distance(&self) -> usize {
        self.from.abs_diff(self.to)
    }
}

/// What the renderer has to repaint after an accepted keystroke.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderDelta {
    /// Buffer cells whose glyph, state, or screen position changed.
    pub dirty: Range<usize>,
    /// Screen cells past the new buffer end that must be blanked after a removal.
    pub cleared_tail: usize,
    pub moved: CursorMove,
    /// The cursor crossed a word boundary, so underline decoration may have changed anywhere.
    pub word_changed: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Applied {
    Render(RenderDelta),
    /// No state change and no timestamp.
    Ignored,
    Broken,
}

/// One flag per word of the buffer.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IncorrectWords(Vec<bool>);

impl IncorrectWords {
    pub fn is_incorrect(&self, word: usize) -> bool {
        self.0.get(word).copied().unwrap_or(false)
    }

    pub fn any(&self) -> bool {
        self.0.iter().any(|w| *w)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Clone, Debug)]
pub struct DiffEngine {
    buffer: Vec<CharCell>,
    cursor: usize,
    correct: usize,
    incorrect_words: IncorrectWords,
}

impl DiffEngine {
    pub fn new(target: &str) -> Self {
        let mut engine = Self {
            buffer: target.chars().map(CharCell::original).collect(),
            cursor: 0,
            correct: 0,
            incorrect_words: IncorrectWords::default(),
        };
        engine.refresh_incorrect_words();
        engine
    }

    pub fn buffer(&self) -> &[CharCell] {
        &self.buffer
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn correct_count(&self) -> usize {
        self.correct
    }

    pub fn count(&self, state: CellState) -> usize {
        self.buffer.iter().filter(|c| c.state == state).count()
    }

    pub fn word_count(&self) -> usize {
        self.buffer.iter().filter(|c| c.is_space()).count() + 1
    }

    pub fn is_complete(&self) -> bool {
        self.cursor >= self.buffer.len()
    }

    pub fn incorrect_words(&self) -> &IncorrectWords {
        &self.incorrect_words
    }

    /// Index of the word the cursor is in (number of spaces behind it).
    pub fn current_word(&self) -> usize {
        self.buffer[..self.cursor]
            .iter()
            .filter(|c| c.is_space())
            .count()
    }

    /// Whether the cell at `idx` is drawn underlined: a non-space cell of a
    /// finished word that contains a mistake.
    pub fn is_underlined(&self, idx: usize) -> bool {
        match self.buffer.get(idx) {
            Some(cell) if !cell.is_space() => {
                let word = self.buffer[..idx].iter().filter(|c| c.is_space()).count();
                word < self.current_word() && self.incorrect_words.is_incorrect(word)
            }
            _ => false,
        }
    }

    /// Cells paired with their underline decoration, in buffer order.
    pub fn decorated(&self) -> impl Iterator<Item = (usize, CharCell, bool)> + '_ {
        let current = self.current_word();
        let mut word = 0;
        self.buffer.iter().enumerate().map(move |(idx, cell)| {
            if cell.is_space() {
                word += 1;
                return (idx, *cell, false);
            }
            let underlined = word < current && self.incorrect_words.is_incorrect(word);
            (idx, *cell, underlined)
        })
    }

    pub fn apply(&mut self, key: Keystroke) -> Applied {
        let from = self.cursor;
        let word_before = self.current_word();

        let change = match key {
            Keystroke::Abort => return Applied::Broken,
            Keystroke::Enter | Keystroke::Other => None,
            Keystroke::Backspace => self.backspace(),
            Keystroke::Char(c) => self.type_char(c),
        };
        let Some((dirty, cleared_tail)) = change else {
            return Applied::Ignored;
        };

        self.refresh_incorrect_words();
        let delta = RenderDelta {
            dirty,
            cleared_tail,
            moved: CursorMove {
                from,
                to: self.cursor,
            },
            word_changed: self.current_word() != word_before,
        };
        trace!("{key:?} -> {delta:?}");
        Applied::Render(delta)
    }

    fn is_boundary(&self, idx: usize) -> bool {
        self.buffer.get(idx).map_or(true, CharCell::is_space)
    }

    fn backspace(&mut self) -> Option<(Range<usize>, usize)> {
        if self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        let at = self.cursor;
        match self.buffer[at].state {
            CellState::Correct => {
                self.correct -= 1;
                self.buffer[at].state = CellState::Original;
            }
            CellState::Error => self.buffer[at].state = CellState::Original,
            CellState::ExtraError if self.is_boundary(at + 1) => {
                self.buffer.remove(at);
                return Some((at..self.buffer.len(), 1));
            }
            CellState::ExtraError | CellState::Original => {}
        }
        Some((at..at + 1, 0))
    }

    fn type_char(&mut self, c: char) -> Option<(Range<usize>, usize)> {
        let at = self.cursor;

        if let Some(cell) = self.buffer.get_mut(at) {
            if cell.ch == c {
                cell.state = CellState::Correct;
                self.correct += 1;
                self.cursor += 1;
                return Some((at..at + 1, 0));
            }
        }

        if c == ' ' {
            let word_start = at == 0 || self.buffer[at - 1].is_space();
            if word_start || at >= self.buffer.len() {
                return None;
            }
            self.cursor = self.buffer[at..]
                .iter()
                .position(CharCell::is_space)
                .map_or(self.buffer.len(), |offset| at + offset + 1);
            return Some((at..at, 0));
        }

        if self.is_boundary(at) {
            self.buffer.insert(
                at,
                CharCell {
                    ch: c,
                    state: CellState::ExtraError,
                },
            );
            self.cursor += 1;
            return Some((at..self.buffer.len(), 0));
        }

        self.buffer[at].state = CellState::Error;
        self.cursor += 1;
        Some((at..at + 1, 0))
    }

    fn refresh_incorrect_words(&mut self) {
        let mut words = vec![false; self.word_count()];
        let mut word = 0;
        for (idx, cell) in self.buffer.iter().enumerate() {
            if cell.is_space() {
                word += 1;
                continue;
            }
            let wrong = match cell.state {
                CellState::Error | CellState::ExtraError => true,
                CellState::Original => idx < self.cursor,
                CellState::Correct => false,
            };
            if wrong {
                words[word] = true;
            }
        }
        self.incorrect_words = IncorrectWords(words);
    }
}
