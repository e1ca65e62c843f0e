//! Free typing with no target text.

use crate::diff::Keystroke;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ZenStep {
    Edited,
    Finished,
    Ignored,
}

/// Lines typed so far. Every typed character counts toward speed, erased or not.
#[derive(Clone, Debug)]
pub struct ZenPad {
    lines: Vec<String>,
    typed: usize,
}

impl Default for ZenPad {
    fn default() -> Self {
        Self {
            lines: vec![String::new()],
            typed: 0,
        }
    }
}

impl ZenPad {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, key: Keystroke) -> ZenStep {
        match key {
            Keystroke::Abort => ZenStep::Finished,
            Keystroke::Enter => {
                self.lines.push(String::new());
                ZenStep::Edited
            }
            Keystroke::Backspace => {
                let erased = self.lines.last_mut().and_then(String::pop).is_some();
                if erased {
                    ZenStep::Edited
                } else if self.lines.len() > 1 {
                    self.lines.pop();
                    ZenStep::Edited
                } else {
                    ZenStep::Ignored
                }
            }
            Keystroke::Char(c) => {
                if let Some(line) = self.lines.last_mut() {
                    line.push(c);
                }
                self.typed += 1;
                ZenStep::Edited
            }
            Keystroke::Other => ZenStep::Ignored,
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn typed_chars(&self) -> usize {
        self.typed
    }

    pub fn word_count(&self) -> usize {
        self.lines.iter().map(|l| l.split_whitespace().count()).sum()
    }
}
