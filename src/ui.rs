//! Status lines for the user.
//!
//! Rendered data goes to stdout through `output`; everything here except
//! `success` and `info` goes to stderr so it never mixes with tsv or JSON.

use colored::Colorize;

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue(), msg);
}

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print a warning message
pub fn warn(msg: &str) {
    eprintln!("{} {}", "⚠".yellow(), msg);
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print a dim/muted hint below an error
pub fn hint(msg: &str) {
    eprintln!("  {}", msg.dimmed());
}
