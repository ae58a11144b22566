//! Formatted output helpers for CLI commands.

use std::io::{self, Write};

const RULE_WIDTH: usize = 40;

/// Writes a title followed by a double rule.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn header(out: &mut impl Write, title: &str) -> io::Result<()> {
    writeln!(out, "{title}")?;
    writeln!(out, "{}", "\u{2550}".repeat(RULE_WIDTH))?;
    writeln!(out)
}

/// Formats `count` with a singular or plural noun, e.g. "1 step", "3 steps".
#[must_use]
pub fn counted(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{count} {noun}")
    } else {
        format!("{count} {noun}s")
    }
}

/// Writes every line of `block` indented by two spaces.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn indented(out: &mut impl Write, block: &str) -> io::Result<()> {
    for line in block.lines() {
        writeln!(out, "  {line}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counted_pluralizes() {
        assert_eq!(counted(0, "step"), "0 steps");
        assert_eq!(counted(1, "step"), "1 step");
        assert_eq!(counted(4, "binding"), "4 bindings");
    }

    #[test]
    fn header_draws_rule() {
        let mut out = Vec::new();
        header(&mut out, "Plan").unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Plan");
        assert_eq!(lines[1].chars().count(), RULE_WIDTH);
        assert_eq!(lines[2], "");
    }

    #[test]
    fn indented_prefixes_each_line() {
        let mut out = Vec::new();
        indented(&mut out, "a\nb\n").unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "  a\n  b\n");
    }
}
