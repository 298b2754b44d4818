//! UI utilities for the client.

use std::io::Write;

/// Prompt shown by the line editor
pub fn prompt(username: &str) -> String {
    format!("{}> ", username)
}

/// Print a block of output and redisplay the prompt below it
pub fn print_block(text: &str, username: &str) {
    print!("{}", text);
    redisplay_prompt(username);
}

/// Redisplay the prompt after receiving a message
pub fn redisplay_prompt(username: &str) {
    print!("{}", prompt(username));
    std::io::stdout().flush().ok();
}
