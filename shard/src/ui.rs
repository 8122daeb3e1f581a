//! Console helpers: line prompts and dialogue pacing.

use std::io::{self, Write};
use std::time::Duration;

/// Delay between presented dialogue lines.
const LINE_BEAT: Duration = Duration::from_millis(800);

/// Read one trimmed line after printing a prompt. Returns `None` on EOF
/// or a read error, which callers treat as a session end.
pub fn read_line(prompt: &str) -> Option<String> {
    print!("{prompt}");
    io::stdout().flush().ok()?;

    let mut buffer = String::new();
    match io::stdin().read_line(&mut buffer) {
        Ok(0) => None,
        Ok(_) => Some(buffer.trim().to_string()),
        Err(_) => None,
    }
}

/// Is this input a session terminator? Case-insensitive.
pub fn is_quit(input: &str) -> bool {
    matches!(input.to_lowercase().as_str(), "/quit" | "/exit")
}

/// Print a label followed by slow trailing dots, one per beat.
pub async fn ellipsis(label: &str, dots: u32) {
    print!("{label}");
    io::stdout().flush().ok();
    for _ in 0..dots {
        tokio::time::sleep(LINE_BEAT).await;
        print!(".");
        io::stdout().flush().ok();
    }
    println!();
}

/// Short pause so presented lines land one at a time.
pub async fn beat() {
    tokio::time::sleep(LINE_BEAT).await;
}
