//! Terminal dashboard: command parsing, state rendering and the input loop.

pub mod command;
pub mod formatter;
pub mod render;
mod runner;

pub use runner::run_dashboard;

use std::io::Write;

/// Redisplay the prompt after printing output
pub fn redisplay_prompt(user_id: &str) {
    print!("{}> ", user_id);
    std::io::stdout().flush().ok();
}
