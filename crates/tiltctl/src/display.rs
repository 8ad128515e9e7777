//! Terminal output helpers

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use std::io::{self, Write};
use std::time::Duration;

pub fn banner(version: &str, style: &str, ready: bool) {
    println!("{} {}", "tilt".bright_magenta().bold(), version.dimmed());
    println!("{}", format!("voice: {}  ·  type 'exit' to leave", style).dimmed());
    if !ready {
        warning("Datasets not loaded; replies will be placeholders");
    }
    println!();
}

/// Input prompt, no newline
pub fn prompt() -> io::Result<()> {
    print!("{} ", "you ›".bright_cyan());
    io::stdout().flush()
}

pub fn fed_input(input: &str) {
    println!("{} {}", "feed ›".bright_cyan(), input);
}

pub fn reply(text: &str) {
    println!("{} {}", "tilt ›".bright_magenta(), text);
}

pub fn warning(msg: &str) {
    eprintln!("{} {}", "!".yellow().bold(), msg.yellow());
}

pub fn success(msg: &str) {
    println!("{} {}", "✓".green().bold(), msg);
}

/// Spinner shown for the thinking delay
pub fn thinking_spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
        .template("{spinner:.magenta} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    spinner.set_style(style);
    spinner.set_message("tilt (thinking)...");
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}
