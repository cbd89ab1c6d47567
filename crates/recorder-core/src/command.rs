//! # wp-cli Command Builder
//!
//! Builds the command lines of `wp-cli` steps.
//!
//! Quoted values escape `\` and `"`, so a title like `Say "hi"` survives
//! the shell the command is replayed in.

use std::fmt;

/// Quote a value for a command line.
#[must_use]
pub fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len().saturating_add(2));
    out.push('"');
    for ch in text.chars() {
        if ch == '"' || ch == '\\' {
            out.push('\\');
        }
        out.push(ch);
    }
    out.push('"');
    out
}

/// A `wp ...` command line under construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WpCommand {
    line: String,
}

impl WpCommand {
    /// Start a command: `wp <group> <verb>`.
    #[must_use]
    pub fn new(group: &str, verb: &str) -> Self {
        Self {
            line: format!("wp {group} {verb}"),
        }
    }

    /// Append a bare positional argument.
    #[must_use]
    pub fn arg(mut self, arg: impl fmt::Display) -> Self {
        self.line.push(' ');
        self.line.push_str(&arg.to_string());
        self
    }

    /// Append a quoted positional argument.
    #[must_use]
    pub fn quoted(mut self, text: &str) -> Self {
        self.line.push(' ');
        self.line.push_str(&quote(text));
        self
    }

    /// Append `--name="value"`.
    #[must_use]
    pub fn flag(mut self, name: &str, value: &str) -> Self {
        self.line.push_str(" --");
        self.line.push_str(name);
        self.line.push('=');
        self.line.push_str(&quote(value));
        self
    }

    /// Append `--name=value` without quoting.
    #[must_use]
    pub fn bare_flag(mut self, name: &str, value: &str) -> Self {
        self.line.push_str(" --");
        self.line.push_str(name);
        self.line.push('=');
        self.line.push_str(value);
        self
    }

    #[must_use]
    pub fn build(self) -> String {
        self.line
    }
}

impl fmt::Display for WpCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.line)
    }
}
