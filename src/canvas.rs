//! Cell-addressed drawing surface.
//!
//! Typing modes paint individual cells (one per buffer character) and the
//! caret animator repaints single cells many times per keystroke, so the
//! drawing surface is a retained grid rather than a per-frame widget tree.
//! [`RatatuiCanvas`] keeps that grid in a ratatui [`Buffer`] and lets
//! [`Terminal::draw`] diff it against what is already on screen.

use std::io;

use crossterm::{cursor::SetCursorStyle, execute};
use ratatui::{
    backend::Backend,
    buffer::Buffer,
    layout::{Position, Rect},
    style::{Modifier, Style},
    Terminal,
};
use unicode_width::UnicodeWidthChar;

use crate::theme::{Role, Theme};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GlyphStyle {
    pub role: Role,
    pub underline: bool,
    pub bold: bool,
    /// Drawn as the steady caret block.
    pub caret: bool,
}

impl GlyphStyle {
    pub fn new(role: Role) -> Self {
        Self {
            role,
            underline: false,
            bold: false,
            caret: false,
        }
    }

    pub fn underlined(mut self, underline: bool) -> Self {
        self.underline = underline;
        self
    }

    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    pub fn caret_block() -> Self {
        Self {
            caret: true,
            ..Self::new(Role::Caret)
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CursorShape {
    Hidden,
    SteadyBlock,
    SteadyBar,
    /// Whatever the user's terminal uses by default.
    Default,
}

impl CursorShape {
    fn command(self) -> Option<SetCursorStyle> {
        match self {
            CursorShape::Hidden => None,
            CursorShape::SteadyBlock => Some(SetCursorStyle::SteadyBlock),
            CursorShape::SteadyBar => Some(SetCursorStyle::SteadyBar),
            CursorShape::Default => Some(SetCursorStyle::DefaultUserShape),
        }
    }
}

/// Drawing primitives used by every screen. Writes are buffered until [`flush`](Self::flush).
pub trait TerminalCanvas {
    /// `(columns, rows)`
    fn size(&self) -> (u16, u16);

    fn move_cursor(&mut self, row: u16, col: u16);

    /// Writes at the cursor and advances it by the glyph's width.
    /// Writes outside the canvas are dropped.
    fn write_glyph(&mut self, ch: char, style: GlyphStyle);

    /// Fills `area` with background-colored blanks.
    fn clear_region(&mut self, area: Rect);

    /// Shape of the terminal's own cursor, shown at the last cursor position.
    fn set_cursor_shape(&mut self, shape: CursorShape);

    /// Re-reads the terminal size after a resize. Contents must be repainted.
    fn resize(&mut self) -> io::Result<()>;

    fn flush(&mut self) -> io::Result<()>;

    fn clear(&mut self) {
        let (cols, rows) = self.size();
        self.clear_region(Rect::new(0, 0, cols, rows));
    }

    fn write_str(&mut self, text: &str, style: GlyphStyle) {
        for ch in text.chars() {
            self.write_glyph(ch, style);
        }
    }
}

pub struct RatatuiCanvas<B: Backend> {
    terminal: Terminal<B>,
    grid: Buffer,
    theme: Theme,
    cursor: Position,
    shape: CursorShape,
    applied_shape: Option<CursorShape>,
    native_shapes: bool,
}

impl<B: Backend> RatatuiCanvas<B> {
    /// Canvas on a real terminal. Cursor shapes are sent as escape sequences on stdout.
    pub fn new(terminal: Terminal<B>, theme: Theme) -> io::Result<Self> {
        let mut canvas = Self::headless(terminal, theme)?;
        canvas.native_shapes = true;
        Ok(canvas)
    }

    /// Canvas that only records cursor shapes, for test backends.
    pub fn headless(terminal: Terminal<B>, theme: Theme) -> io::Result<Self> {
        let size = terminal.size()?;
        let area = Rect::new(0, 0, size.width, size.height);
        let mut grid = Buffer::empty(area);
        grid.set_style(area, theme.style(Role::Bg));
        Ok(Self {
            terminal,
            grid,
            theme,
            cursor: Position::ORIGIN,
            shape: CursorShape::Hidden,
            applied_shape: None,
            native_shapes: false,
        })
    }

    pub fn terminal(&self) -> &Terminal<B> {
        &self.terminal
    }

    pub fn grid(&self) -> &Buffer {
        &self.grid
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    pub fn cursor_shape(&self) -> CursorShape {
        self.shape
    }

    pub fn cursor_position(&self) -> Position {
        self.cursor
    }

    /// Symbols of one grid row with trailing blanks removed.
    pub fn row_text(&self, row: u16) -> String {
        let area = self.grid.area;
        if row >= area.height {
            return String::new();
        }
        let text: String = (0..area.width)
            .filter_map(|col| self.grid.cell((col, row)))
            .map(|cell| cell.symbol())
            .collect();
        text.trim_end().to_string()
    }

    pub fn resolve(&self, glyph: GlyphStyle) -> Style {
        let mut style = if glyph.caret {
            self.theme.caret_block()
        } else {
            self.theme.style(glyph.role)
        };
        if glyph.underline {
            style = style.add_modifier(Modifier::UNDERLINED);
        }
        if glyph.bold {
            style = style.add_modifier(Modifier::BOLD);
        }
        style
    }
}

impl<B: Backend> TerminalCanvas for RatatuiCanvas<B> {
    fn size(&self) -> (u16, u16) {
        (self.grid.area.width, self.grid.area.height)
    }

    fn move_cursor(&mut self, row: u16, col: u16) {
        self.cursor = Position::new(col, row);
    }

    fn write_glyph(&mut self, ch: char, style: GlyphStyle) {
        let style = self.resolve(style);
        if let Some(cell) = self.grid.cell_mut(self.cursor) {
            cell.reset();
            cell.set_char(ch).set_style(style);
        }
        let width = ch.width().unwrap_or(1).max(1) as u16;
        self.cursor.x = self.cursor.x.saturating_add(width);
    }

    fn clear_region(&mut self, area: Rect) {
        let area = area.intersection(self.grid.area);
        let style = self.theme.style(Role::Bg);
        for row in area.top()..area.bottom() {
            for col in area.left()..area.right() {
                if let Some(cell) = self.grid.cell_mut((col, row)) {
                    cell.reset();
                    cell.set_style(style);
                }
            }
        }
    }

    fn set_cursor_shape(&mut self, shape: CursorShape) {
        self.shape = shape;
    }

    fn resize(&mut self) -> io::Result<()> {
        self.terminal.autoresize()?;
        let size = self.terminal.size()?;
        let area = Rect::new(0, 0, size.width, size.height);
        self.grid = Buffer::empty(area);
        self.grid.set_style(area, self.theme.style(Role::Bg));
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.native_shapes && self.applied_shape != Some(self.shape) {
            if let Some(command) = self.shape.command() {
                execute!(io::stdout(), command)?;
            }
            self.applied_shape = Some(self.shape);
        }

        let grid = &self.grid;
        let cursor = (self.shape != CursorShape::Hidden).then_some(self.cursor);
        self.terminal.draw(|frame| {
            let area = frame.area().intersection(grid.area);
            let target = frame.buffer_mut();
            for row in area.top()..area.bottom() {
                for col in area.left()..area.right() {
                    if let (Some(src), Some(dst)) = (grid.cell((col, row)), target.cell_mut((col, row))) {
                        *dst = src.clone();
                    }
                }
            }
            if let Some(position) = cursor {
                frame.set_cursor_position(position);
            }
        })?;
        Ok(())
    }
}
