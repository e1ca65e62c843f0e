use std::io;
use std::time::Duration;

use ratatui::layout::Rect;

use crate::{
    canvas::{CursorShape, GlyphStyle, TerminalCanvas},
    caret::CaretMode,
    diff::{CellState, CharCell, DiffEngine, RenderDelta},
    theme::Role,
    timing::TimingRecorder,
    zen::ZenPad,
};

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 2;

pub const MENU_PROMPT: &str = "mode [timed, words, zen, help, quit]? ";
pub const REPEAT_PROMPT: &str = "again [yes, no]? ";

const HELP: &[&str] = &[
    "typeline: a terminal typing trainer",
    "",
    "words  type a handful of random words (or a quote)",
    "timed  type as much as you can before the clock runs out",
    "zen    type anything; tab finishes",
    "",
    "while typing:",
    "  backspace      erase the previous character",
    "  space          skip to the next word",
    "  tab/del/ctrl+c abandon the session",
    "",
    "press any key to return",
];

/// Where buffer cells land on screen. Text wraps at a fixed width, one cell per character.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextLayout {
    pub top: u16,
    pub left: u16,
    pub width: u16,
}

impl TextLayout {
    pub fn for_area(cols: u16, rows: u16, text_len: usize) -> Self {
        let left = if cols > HORIZONTAL_MARGIN * 2 + 1 {
            HORIZONTAL_MARGIN
        } else {
            0
        };
        let width = cols.saturating_sub(left * 2).max(1);
        let lines = Self::lines_for(width, text_len + 1);
        let top = rows.saturating_sub(lines) / 2;
        Self { top, left, width }
    }

    fn lines_for(width: u16, cells: usize) -> u16 {
        cells.div_ceil(width as usize).min(u16::MAX as usize) as u16
    }

    /// `(row, col)` of buffer index `idx`.
    pub fn position(&self, idx: usize) -> (u16, u16) {
        let width = self.width as usize;
        let row = self.top as usize + idx / width;
        let col = self.left as usize + idx % width;
        (
            row.min(u16::MAX as usize) as u16,
            col.min(u16::MAX as usize) as u16,
        )
    }

    pub fn rows_for(&self, cells: usize) -> u16 {
        Self::lines_for(self.width, cells)
    }

    pub fn timer_row(&self) -> u16 {
        self.top.saturating_sub(VERTICAL_MARGIN)
    }
}

pub fn cell_style(cell: CharCell, underlined: bool) -> GlyphStyle {
    let role = match cell.state {
        CellState::Original => Role::Sub,
        CellState::Correct => Role::Main,
        CellState::Error => Role::ColorfulError,
        CellState::ExtraError => Role::ColorfulErrorExtra,
    };
    GlyphStyle::new(role).underlined(underlined)
}

/// Everything the input thread and the caret animator both touch.
pub struct Screen<C> {
    pub canvas: C,
    pub engine: DiffEngine,
    pub timing: TimingRecorder,
    pub layout: TextLayout,
    caret_mode: CaretMode,
    caret_at: Option<usize>,
    painted_len: usize,
}

impl<C: TerminalCanvas> Screen<C> {
    pub fn new(canvas: C) -> Self {
        let mut screen = Self {
            canvas,
            engine: DiffEngine::new(""),
            timing: TimingRecorder::new(),
            layout: TextLayout::for_area(0, 0, 0),
            caret_mode: CaretMode::Hidden,
            caret_at: None,
            painted_len: 0,
        };
        screen.relayout();
        screen
    }

    /// Fresh buffer, cursor, and timestamp log for a new session.
    pub fn begin(&mut self, target: &str) {
        self.engine = DiffEngine::new(target);
        self.timing = TimingRecorder::new();
        self.caret_mode = CaretMode::Hidden;
        self.caret_at = None;
        self.painted_len = 0;
        self.relayout();
    }

    pub fn relayout(&mut self) {
        let (cols, rows) = self.canvas.size();
        self.layout = TextLayout::for_area(cols, rows, self.engine.buffer().len());
    }

    pub fn resize(&mut self) -> io::Result<()> {
        self.canvas.resize()?;
        self.relayout();
        self.canvas.clear();
        self.painted_len = 0;
        self.paint_all();
        if self.caret_mode != CaretMode::Hidden {
            self.place_caret(self.caret_mode);
        }
        Ok(())
    }

    /// Caret drawn for the running session; `Hidden` outside one.
    pub fn set_caret_mode(&mut self, mode: CaretMode) {
        self.caret_mode = mode;
    }

    pub fn caret_mode(&self) -> CaretMode {
        self.caret_mode
    }

    /// Flushes the canvas, re-homing a native caret on the cursor cell first.
    pub fn flush(&mut self) -> io::Result<()> {
        if self.caret_mode == CaretMode::Native {
            let (row, col) = self.layout.position(self.engine.cursor());
            self.canvas.move_cursor(row, col);
        }
        self.canvas.flush()
    }

    /// Repaints buffer cell `idx` from the engine, or a blank past the buffer end.
    pub fn paint_cell(&mut self, idx: usize) {
        let (row, col) = self.layout.position(idx);
        self.canvas.move_cursor(row, col);
        match self.engine.buffer().get(idx) {
            Some(cell) => {
                let style = cell_style(*cell, self.engine.is_underlined(idx));
                self.canvas.write_glyph(cell.ch, style);
            }
            None => self.canvas.write_glyph(' ', GlyphStyle::new(Role::Bg)),
        }
        if self.caret_at == Some(idx) {
            self.caret_at = None;
        }
    }

    pub fn paint_glyph(&mut self, idx: usize, ch: char, style: GlyphStyle) {
        let (row, col) = self.layout.position(idx);
        self.canvas.move_cursor(row, col);
        self.canvas.write_glyph(ch, style);
    }

    pub fn paint_all(&mut self) {
        let len = self.engine.buffer().len();
        let cells = self.painted_len.max(len) + 1;
        let rows = self.layout.rows_for(cells);
        let (cols, _) = self.canvas.size();
        self.canvas
            .clear_region(Rect::new(0, self.layout.top, cols, rows));

        let cells: Vec<_> = self.engine.decorated().collect();
        for (idx, cell, underlined) in cells {
            let (row, col) = self.layout.position(idx);
            self.canvas.move_cursor(row, col);
            self.canvas.write_glyph(cell.ch, cell_style(cell, underlined));
        }
        self.caret_at = None;
        self.painted_len = len;
    }

    pub fn paint_delta(&mut self, delta: &RenderDelta) {
        if delta.word_changed {
            self.paint_all();
            return;
        }
        for idx in delta.dirty.clone() {
            self.paint_cell(idx);
        }
        let len = self.engine.buffer().len();
        for idx in len..len + delta.cleared_tail {
            self.paint_cell(idx);
        }
        self.painted_len = self.painted_len.max(len);
    }

    /// Removes a drawn steady caret, restoring the cell beneath it.
    pub fn clear_caret(&mut self) {
        if let Some(idx) = self.caret_at.take() {
            self.paint_cell(idx);
        }
    }

    pub fn caret_at(&self) -> Option<usize> {
        self.caret_at
    }

    /// Puts the resting caret on the cursor cell.
    pub fn place_caret(&mut self, mode: CaretMode) {
        self.clear_caret();
        let cursor = self.engine.cursor();
        match mode {
            CaretMode::Hidden => self.canvas.set_cursor_shape(CursorShape::Hidden),
            CaretMode::Native => {
                let (row, col) = self.layout.position(cursor);
                self.canvas.move_cursor(row, col);
                self.canvas.set_cursor_shape(CursorShape::SteadyBar);
            }
            CaretMode::Instant | CaretMode::Smooth => {
                let ch = self.engine.buffer().get(cursor).map_or(' ', |c| c.ch);
                self.paint_glyph(cursor, ch, GlyphStyle::caret_block());
                self.caret_at = Some(cursor);
                self.canvas.set_cursor_shape(CursorShape::Hidden);
            }
        }
    }

    pub fn paint_timer(&mut self, remaining: Duration) {
        let row = self.layout.timer_row();
        let (cols, _) = self.canvas.size();
        self.canvas.clear_region(Rect::new(0, row, cols, 1));
        self.canvas.move_cursor(row, self.layout.left);
        let secs = remaining.as_secs_f64().ceil() as u64;
        self.canvas
            .write_str(&secs.to_string(), GlyphStyle::new(Role::Main).bold());
    }

    pub fn paint_menu(&mut self) {
        self.canvas.set_cursor_shape(CursorShape::Hidden);
        self.canvas.clear();
        let (_, rows) = self.canvas.size();
        let row = rows / 2;
        self.canvas.move_cursor(row, HORIZONTAL_MARGIN);
        write_choices(&mut self.canvas, MENU_PROMPT);
    }

    pub fn paint_help(&mut self) {
        self.canvas.set_cursor_shape(CursorShape::Hidden);
        self.canvas.clear();
        let (_, rows) = self.canvas.size();
        let top = rows.saturating_sub(HELP.len() as u16) / 2;
        for (offset, line) in HELP.iter().enumerate() {
            self.canvas
                .move_cursor(top + offset as u16, HORIZONTAL_MARGIN);
            let role = if offset == 0 { Role::Text } else { Role::Sub };
            self.canvas.write_str(line, GlyphStyle::new(role));
        }
    }

    /// Result line followed by the repeat prompt, below the typed text.
    pub fn paint_result(&mut self, wpm: f64, decimals: bool) {
        self.canvas.set_cursor_shape(CursorShape::Hidden);
        let rows = self.layout.rows_for(self.painted_len.max(1) + 1);
        let row = self.layout.top + rows + 1;
        let (cols, _) = self.canvas.size();
        self.canvas.clear_region(Rect::new(0, row, cols, 2));
        self.canvas.move_cursor(row, self.layout.left);
        self.canvas.write_str("wpm: ", GlyphStyle::new(Role::Sub));
        let figure = if decimals {
            format!("{wpm:.2}")
        } else {
            format!("{}", wpm.round() as u64)
        };
        self.canvas
            .write_str(&figure, GlyphStyle::new(Role::Main).bold());
        self.canvas.move_cursor(row + 1, self.layout.left);
        write_choices(&mut self.canvas, REPEAT_PROMPT);
    }

    pub fn paint_error(&mut self, message: &str) {
        self.canvas.set_cursor_shape(CursorShape::Hidden);
        self.canvas.clear();
        self.canvas.move_cursor(0, 0);
        self.canvas
            .write_str(message, GlyphStyle::new(Role::Error));
    }

    /// Zen pad lines wrapped at the layout width, with the terminal cursor after the last character.
    pub fn paint_zen(&mut self, pad: &ZenPad) {
        self.canvas.clear();
        let (cols, _) = self.canvas.size();
        let left = HORIZONTAL_MARGIN.min(cols / 4);
        let width = cols.saturating_sub(left * 2).max(1) as usize;
        let mut row = VERTICAL_MARGIN;
        let mut col = 0;
        for (n, line) in pad.lines().iter().enumerate() {
            if n > 0 {
                row += 1;
            }
            col = 0;
            self.canvas.move_cursor(row, left);
            for ch in line.chars() {
                if col == width {
                    row += 1;
                    col = 0;
                    self.canvas.move_cursor(row, left);
                }
                self.canvas.write_glyph(ch, GlyphStyle::new(Role::Main));
                col += 1;
            }
        }
        self.canvas.move_cursor(row, left + col as u16);
        self.canvas.set_cursor_shape(CursorShape::SteadyBar);
    }
}

/// Writes `prompt`, underlining the first letter of every bracketed choice.
fn write_choices<C: TerminalCanvas>(canvas: &mut C, prompt: &str) {
    let mut word_start = false;
    let mut in_brackets = false;
    for ch in prompt.chars() {
        let underline = in_brackets && word_start && ch.is_alphabetic();
        canvas.write_glyph(ch, GlyphStyle::new(Role::Sub).underlined(underline));
        match ch {
            '[' => in_brackets = true,
            ']' => in_brackets = false,
            _ => {}
        }
        word_start = matches!(ch, '[' | ' ');
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::RatatuiCanvas;
    use crate::diff::{Applied, Keystroke};
    use crate::theme::Theme;
    use ratatui::{backend::TestBackend, layout::Position, style::Modifier, Terminal};

    fn screen(cols: u16, rows: u16) -> Screen<RatatuiCanvas<TestBackend>> {
        let terminal = Terminal::new(TestBackend::new(cols, rows)).unwrap();
        Screen::new(RatatuiCanvas::headless(terminal, Theme::default()).unwrap())
    }

    fn type_keys<C: TerminalCanvas>(screen: &mut Screen<C>, keys: &str) {
        for c in keys.chars() {
            let key = if c == '<' {
                Keystroke::Backspace
            } else {
                Keystroke::Char(c)
            };
            if let Applied::Render(delta) = screen.engine.apply(key) {
                screen.paint_delta(&delta);
            }
        }
    }

    #[test]
    fn test_ui_constants_consistency() {
        const _: () = assert!(HORIZONTAL_MARGIN * 2 < 80);
        const _: () = assert!(VERTICAL_MARGIN * 2 < 24);
    }

    #[test]
    fn test_layout_wraps_by_character() {
        let layout = TextLayout {
            top: 3,
            left: 5,
            width: 10,
        };
        assert_eq!(layout.position(0), (3, 5));
        assert_eq!(layout.position(9), (3, 14));
        assert_eq!(layout.position(10), (4, 5));
        assert_eq!(layout.rows_for(21), 3);
    }

    #[test]
    fn test_layout_centers_text() {
        let layout = TextLayout::for_area(40, 11, 59);
        assert_eq!(layout.left, 5);
        assert_eq!(layout.width, 30);
        // 60 cells over two rows
        assert_eq!(layout.top, 4);
        // narrow terminals drop the margin
        assert_eq!(TextLayout::for_area(8, 4, 3).left, 0);
    }

    #[test]
    fn test_paint_all_shows_target() {
        let mut screen = screen(40, 9);
        screen.begin("the cat");
        screen.paint_all();
        let (row, col) = screen.layout.position(0);
        assert_eq!(screen.canvas.row_text(row).trim_start(), "the cat");
        let cell = screen.canvas.grid().cell((col, row)).unwrap();
        assert_eq!(cell.fg, Theme::default().sub);
    }

    #[test]
    fn test_errors_and_underline_after_word() {
        let mut screen = screen(40, 9);
        screen.begin("the cat");
        screen.paint_all();
        type_keys(&mut screen, "tha ");
        let (row, col) = screen.layout.position(2);
        let theme = Theme::default();
        let grid = screen.canvas.grid();
        let wrong = grid.cell((col, row)).unwrap();
        assert_eq!(wrong.symbol(), "e");
        assert_eq!(wrong.fg, theme.colorful_error);
        assert!(wrong.modifier.contains(Modifier::UNDERLINED));
        let right = grid.cell((col - 2, row)).unwrap();
        assert_eq!(right.fg, theme.main);
        assert!(right.modifier.contains(Modifier::UNDERLINED));
    }

    #[test]
    fn test_extra_cells_cleared_on_backspace() {
        let mut screen = screen(40, 9);
        screen.begin("ab");
        screen.paint_all();
        type_keys(&mut screen, "abxy");
        let (row, _) = screen.layout.position(0);
        assert_eq!(screen.canvas.row_text(row).trim_start(), "abxy");
        type_keys(&mut screen, "<<");
        assert_eq!(screen.canvas.row_text(row).trim_start(), "ab");
    }

    #[test]
    fn test_place_caret_modes() {
        let mut screen = screen(40, 9);
        screen.begin("go");
        screen.paint_all();
        screen.place_caret(CaretMode::Smooth);
        assert_eq!(screen.caret_at(), Some(0));
        let (row, col) = screen.layout.position(0);
        let cell = screen.canvas.grid().cell((col, row)).unwrap().clone();
        assert_eq!(cell.symbol(), "g");
        assert_eq!(cell.bg, Theme::default().caret);

        screen.place_caret(CaretMode::Native);
        assert_eq!(screen.caret_at(), None);
        assert_eq!(screen.canvas.cursor_shape(), CursorShape::SteadyBar);
        let restored = screen.canvas.grid().cell((col, row)).unwrap();
        assert_eq!(restored.bg, Theme::default().bg);
    }

    #[test]
    fn test_flush_rehomes_native_caret_after_timer() {
        let mut screen = screen(40, 9);
        screen.begin("go on");
        screen.set_caret_mode(CaretMode::Native);
        screen.paint_all();
        type_keys(&mut screen, "g");
        screen.place_caret(CaretMode::Native);
        screen.paint_timer(Duration::from_secs(14));
        screen.flush().unwrap();
        let (row, col) = screen.layout.position(1);
        assert_eq!(screen.canvas.cursor_position(), Position::new(col, row));
        assert_eq!(screen.canvas.cursor_shape(), CursorShape::SteadyBar);

        // outside a session the cursor stays where it was painted
        screen.set_caret_mode(CaretMode::Hidden);
        screen.paint_timer(Duration::from_secs(3));
        screen.flush().unwrap();
        assert_eq!(screen.canvas.cursor_position().y, screen.layout.timer_row());
    }

    #[test]
    fn test_resize_puts_caret_back() {
        let mut screen = screen(40, 9);
        screen.begin("go on");
        screen.set_caret_mode(CaretMode::Instant);
        screen.paint_all();
        type_keys(&mut screen, "g");
        screen.place_caret(CaretMode::Instant);
        assert_eq!(screen.caret_at(), Some(1));

        screen.resize().unwrap();
        assert_eq!(screen.caret_at(), Some(1));
        let (row, col) = screen.layout.position(1);
        let cell = screen.canvas.grid().cell((col, row)).unwrap();
        assert_eq!(cell.symbol(), "o");
        assert_eq!(cell.bg, Theme::default().caret);
    }

    #[test]
    fn test_menu_and_result() {
        let mut screen = screen(60, 10);
        screen.paint_menu();
        assert_eq!(screen.canvas.row_text(5).trim(), MENU_PROMPT.trim());
        let t = screen.canvas.grid().cell((HORIZONTAL_MARGIN + 6, 5)).unwrap();
        assert_eq!(t.symbol(), "t");
        assert!(t.modifier.contains(Modifier::UNDERLINED));

        screen.begin("go");
        screen.paint_all();
        screen.paint_result(61.777, true);
        let row = screen.layout.top + 2;
        assert_eq!(screen.canvas.row_text(row).trim(), "wpm: 61.78");
        screen.paint_result(61.777, false);
        assert_eq!(screen.canvas.row_text(row).trim(), "wpm: 62");
    }

    #[test]
    fn test_zen_pad_painting() {
        let mut screen = screen(20, 6);
        let mut pad = ZenPad::new();
        for c in "hi".chars() {
            pad.apply(Keystroke::Char(c));
        }
        pad.apply(Keystroke::Enter);
        pad.apply(Keystroke::Char('x'));
        screen.paint_zen(&pad);
        assert_eq!(screen.canvas.row_text(VERTICAL_MARGIN).trim(), "hi");
        assert_eq!(screen.canvas.row_text(VERTICAL_MARGIN + 1).trim(), "x");
        assert_eq!(screen.canvas.cursor_shape(), CursorShape::SteadyBar);
    }
}
