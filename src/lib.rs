// Library surface for headless/integration tests and reuse.
// Terminal setup and the CLI stay in main.rs.
pub mod app_dirs;
pub mod canvas;
pub mod caret;
pub mod config;
pub mod diff;
pub mod error;
pub mod modes;
pub mod result_log;
pub mod runtime;
pub mod session;
pub mod text_source;
pub mod theme;
pub mod timing;
pub mod ui;
pub mod util;
pub mod zen;

pub use error::{ConfigError, Error, Result};
