//! Line commands typed at the prompt.

use thiserror::Error;

pub const HELP: &str = "commands: add <text> | edit <n> <text> | rm <n> | refresh | ls | help | quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiAction {
    Add(String),
    /// `index` is zero-based; the prompt shows items numbered from 1.
    Edit { index: usize, text: String },
    Remove { index: usize },
    Refresh,
    List,
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("empty input")]
    Empty,
    #[error("unknown command '{0}'; type 'help'")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
    #[error("'{0}' is not an item number")]
    BadIndex(String),
}

pub fn parse_action(line: &str) -> Result<UiAction, ParseError> {
    let line = line.trim();
    if line.is_empty() {
        return Err(ParseError::Empty);
    }
    let (command, rest) = match line.split_once(char::is_whitespace) {
        Some((command, rest)) => (command, rest.trim()),
        None => (line, ""),
    };

    match command.to_ascii_lowercase().as_str() {
        "add" | "a" => {
            if rest.is_empty() {
                return Err(ParseError::Usage("add <text>"));
            }
            Ok(UiAction::Add(rest.to_string()))
        }
        "edit" | "e" => {
            let (index, text) = rest
                .split_once(char::is_whitespace)
                .ok_or(ParseError::Usage("edit <n> <text>"))?;
            let text = text.trim();
            if text.is_empty() {
                return Err(ParseError::Usage("edit <n> <text>"));
            }
            Ok(UiAction::Edit {
                index: parse_index(index)?,
                text: text.to_string(),
            })
        }
        "rm" | "delete" | "d" => {
            if rest.is_empty() {
                return Err(ParseError::Usage("rm <n>"));
            }
            Ok(UiAction::Remove {
                index: parse_index(rest)?,
            })
        }
        "refresh" | "r" => Ok(UiAction::Refresh),
        "ls" | "list" => Ok(UiAction::List),
        "help" | "?" => Ok(UiAction::Help),
        "quit" | "exit" | "q" => Ok(UiAction::Quit),
        other => Err(ParseError::Unknown(other.to_string())),
    }
}

fn parse_index(raw: &str) -> Result<usize, ParseError> {
    match raw.parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n - 1),
        _ => Err(ParseError::BadIndex(raw.to_string())),
    }
}

#[cfg(test)]
#[path = "tests/input_tests.rs"]
mod tests;
