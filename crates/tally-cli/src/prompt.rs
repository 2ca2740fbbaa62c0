//! Interactive prompts
//!
//! Confirmation and password input. Every prompt degrades to a
//! non-interactive answer when stdin is not a terminal.

use std::io::{self, BufRead, Write};

use anyhow::{bail, Result};
use dialoguer::Password;

/// Ask user for confirmation
///
/// Returns true if user confirms, false otherwise.
/// In non-interactive mode (no TTY), returns false.
pub fn confirm(prompt: &str) -> Result<bool> {
    if !is_interactive() {
        return Ok(false);
    }

    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;

    let input = input.trim().to_lowercase();
    Ok(input == "y" || input == "yes")
}

/// Whether stdin is attached to a terminal
pub fn is_interactive() -> bool {
    atty::is(atty::Stream::Stdin)
}

/// Read a password without echoing it
///
/// On a terminal this prompts with hidden input. Piped stdin is read as a
/// single line with no prompt: `echo secret | tally login --email a@b.c`
pub fn read_password(prompt: &str) -> Result<String> {
    let password = if is_interactive() {
        Password::new().with_prompt(prompt).interact()?
    } else {
        read_line(io::stdin().lock())?
    };
    require_password(password)
}

/// Read a new password, asking twice on a terminal until both entries match
pub fn read_new_password(prompt: &str) -> Result<String> {
    let password = if is_interactive() {
        Password::new()
            .with_prompt(prompt)
            .with_confirmation("Confirm password", "Passwords do not match")
            .interact()?
    } else {
        read_line(io::stdin().lock())?
    };
    require_password(password)
}

fn require_password(password: String) -> Result<String> {
    if password.is_empty() {
        bail!("No password given. Pass --password or type it on stdin.");
    }
    Ok(password)
}

/// First line of `reader` without the trailing newline
fn read_line(mut reader: impl BufRead) -> Result<String> {
    let mut input = String::new();
    reader.read_line(&mut input)?;
    Ok(input.trim_end_matches(&['\r', '\n'][..]).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_line_strips_newline_only() {
        let input = io::Cursor::new(" pass word \r\nnext\n");
        assert_eq!(read_line(input).unwrap(), " pass word ");
    }

    #[test]
    fn test_empty_password_rejected() {
        let err = require_password(String::new()).unwrap_err();
        assert!(err.to_string().contains("No password given"));
        assert_eq!(require_password("pw".to_string()).unwrap(), "pw");
    }

    #[test]
    fn test_read_line_empty_input() {
        let input = io::Cursor::new("");
        assert_eq!(read_line(input).unwrap(), "");
    }
}
