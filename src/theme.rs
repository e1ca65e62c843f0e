use std::fs;
use std::path::Path;

use ratatui::style::{Color, Modifier, Style};

use crate::error::{Error, Result};

/// Named color roles. The canvas resolves a role to a concrete style.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum_macros::Display)]
#[strum(serialize_all = "snake_case")]
pub enum Role {
    /// Correctly typed characters.
    Main,
    Caret,
    /// Background-colored glyph on a caret-colored cell, used to drain the caret.
    CaretInverse,
    /// Untyped target text.
    Sub,
    SubAlt,
    Bg,
    /// Standout text such as titles.
    Text,
    Error,
    ErrorExtra,
    ColorfulError,
    ColorfulErrorExtra,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Theme {
    pub main: Color,
    pub caret: Color,
    pub sub: Color,
    pub sub_alt: Color,
    pub bg: Color,
    pub text: Color,
    pub error: Color,
    pub error_extra: Color,
    pub colorful_error: Color,
    pub colorful_error_extra: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            main: Color::Rgb(0xe2, 0xb7, 0x14),
            caret: Color::Rgb(0xe2, 0xb7, 0x14),
            sub: Color::Rgb(0x64, 0x66, 0x69),
            sub_alt: Color::Rgb(0x2c, 0x2e, 0x31),
            bg: Color::Rgb(0x32, 0x34, 0x37),
            text: Color::Rgb(0xd1, 0xd0, 0xc5),
            error: Color::Rgb(0xca, 0x47, 0x54),
            error_extra: Color::Rgb(0x7e, 0x2a, 0x33),
            colorful_error: Color::Rgb(0xca, 0x47, 0x54),
            colorful_error_extra: Color::Rgb(0x7e, 0x2a, 0x33),
        }
    }
}

impl Theme {
    /// `default` selects the built-in theme, anything else is read as a CSS theme file.
    pub fn load(name: &str) -> Result<Self> {
        if name == "default" {
            return Ok(Self::default());
        }
        let path = Path::new(name);
        let css = fs::read_to_string(path).map_err(|e| Error::ResourceFetch {
            operation: "get_theme",
            status: format!("{}: {e}", path.display()),
        })?;
        Self::from_css(name, &css)
    }

    /// Parses the `:root{--<role>-color:#hex;...}` block of a theme stylesheet.
    /// Roles missing from the sheet keep their default color.
    pub fn from_css(name: &str, css: &str) -> Result<Self> {
        let parse_error = |fragment: &str| Error::Parse {
            what: format!("theme {name}"),
            fragment: fragment.trim().to_string(),
        };

        let start = css.find(":root").ok_or_else(|| parse_error(css))?;
        let open = css[start..]
            .find('{')
            .map(|i| start + i + 1)
            .ok_or_else(|| parse_error(&css[start..]))?;
        let close = css[open..]
            .find('}')
            .map(|i| open + i)
            .ok_or_else(|| parse_error(&css[start..]))?;

        let mut theme = Self::default();
        for decl in css[open..close].split(';').map(str::trim) {
            if decl.is_empty() {
                continue;
            }
            let (name, value) = decl.split_once(':').ok_or_else(|| parse_error(decl))?;
            let role = name
                .trim()
                .strip_prefix("--")
                .and_then(|n| n.strip_suffix("-color"))
                .ok_or_else(|| parse_error(decl))?;
            let color = parse_hex(value.trim()).ok_or_else(|| parse_error(decl))?;
            let slot = match role {
                "bg" => &mut theme.bg,
                "main" => &mut theme.main,
                "caret" => &mut theme.caret,
                "sub" => &mut theme.sub,
                "sub-alt" => &mut theme.sub_alt,
                "text" => &mut theme.text,
                "error" => &mut theme.error,
                "error-extra" => &mut theme.error_extra,
                "colorful-error" => &mut theme.colorful_error,
                "colorful-error-extra" => &mut theme.colorful_error_extra,
                _ => return Err(parse_error(decl)),
            };
            *slot = color;
        }
        Ok(theme)
    }

    pub fn color(&self, role: Role) -> Color {
        match role {
            Role::Main => self.main,
            Role::Caret => self.caret,
            Role::CaretInverse | Role::Bg => self.bg,
            Role::Sub => self.sub,
            Role::SubAlt => self.sub_alt,
            Role::Text => self.text,
            Role::Error => self.error,
            Role::ErrorExtra => self.error_extra,
            Role::ColorfulError => self.colorful_error,
            Role::ColorfulErrorExtra => self.colorful_error_extra,
        }
    }

    pub fn style(&self, role: Role) -> Style {
        let bg = match role {
            Role::CaretInverse => self.caret,
            _ => self.bg,
        };
        Style::default().fg(self.color(role)).bg(bg)
    }

    /// The steady caret: the cell under the cursor drawn on a caret-colored block.
    pub fn caret_block(&self) -> Style {
        Style::default()
            .fg(self.bg)
            .bg(self.caret)
            .add_modifier(Modifier::BOLD)
    }
}

fn parse_hex(value: &str) -> Option<Color> {
    let hex = value.strip_prefix('#')?;
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    match hex.len() {
        3 => {
            let nibble = |i: usize| u8::from_str_radix(&hex[i..=i], 16).ok().map(|n| n * 17);
            Some(Color::Rgb(nibble(0)?, nibble(1)?, nibble(2)?))
        }
        6 => {
            let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
            Some(Color::Rgb(byte(0)?, byte(2)?, byte(4)?))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    const OBLIVION: &str = ":root {
        --bg-color: #313231;
        --main-color: #a5a096;
        --caret-color: #a5a096;
        --sub-color: #5d6263;
        --text-color: #f7f5f1;
        --error-color: #dd452e;
        --error-extra-color: #9e3423;
        --colorful-error-color: #dd452e;
        --colorful-error-extra-color: #9e3423;
    }";

    #[test]
    fn test_parse_theme_css() {
        let theme = Theme::from_css("oblivion", OBLIVION).unwrap();
        assert_eq!(theme.bg, Color::Rgb(0x31, 0x32, 0x31));
        assert_eq!(theme.main, Color::Rgb(0xa5, 0xa0, 0x96));
        assert_eq!(theme.error_extra, Color::Rgb(0x9e, 0x34, 0x23));
        // not in the sheet
        assert_eq!(theme.sub_alt, Theme::default().sub_alt);
    }

    #[test]
    fn test_parse_short_hex() {
        let theme = Theme::from_css("short", ":root{--bg-color:#fff;--main-color:#0a0}").unwrap();
        assert_eq!(theme.bg, Color::Rgb(255, 255, 255));
        assert_eq!(theme.main, Color::Rgb(0, 170, 0));
    }

    #[test]
    fn test_unknown_role_names_fragment() {
        let err = Theme::from_css("bad", ":root{--nope-color:#fff}").unwrap_err();
        assert_matches!(err, Error::Parse { fragment, .. } if fragment == "--nope-color:#fff");
    }

    #[test]
    fn test_bad_hex_is_parse_error() {
        assert_matches!(
            Theme::from_css("bad", ":root{--bg-color:#12345}"),
            Err(Error::Parse { .. })
        );
        assert_matches!(
            Theme::from_css("bad", ":root{--bg-color:red}"),
            Err(Error::Parse { .. })
        );
    }

    #[test]
    fn test_missing_root_block() {
        assert_matches!(Theme::from_css("bad", "body {}"), Err(Error::Parse { .. }));
    }

    #[test]
    fn test_load_missing_file_is_fetch_error() {
        assert_matches!(
            Theme::load("/definitely/not/here.css"),
            Err(Error::ResourceFetch {
                operation: "get_theme",
                ..
            })
        );
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("oblivion.css");
        std::fs::write(&path, OBLIVION).unwrap();
        let theme = Theme::load(path.to_str().unwrap()).unwrap();
        assert_eq!(theme.text, Color::Rgb(0xf7, 0xf5, 0xf1));
    }

    #[test]
    fn test_caret_inverse_swaps_colors() {
        let theme = Theme::default();
        let style = theme.style(Role::CaretInverse);
        assert_eq!(style.fg, Some(theme.bg));
        assert_eq!(style.bg, Some(theme.caret));
        assert_eq!(Role::ColorfulErrorExtra.to_string(), "colorful_error_extra");
    }
}
