//! Command definitions
//!
//! Parses one input line into a command.

use thiserror::Error;

/// One-line summary of the accepted commands
pub const HELP: &str = "Commands: PUT <key> <value>, GET <key>, DELETE <key>, EXIT";

/// An engine operation requested from the shell
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Store a value
    Put { key: String, value: String },

    /// Read a value
    Get { key: String },

    /// Remove a key
    Delete { key: String },
}

/// What a line of input asked for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    /// Nothing but whitespace
    Blank,

    /// Leave the shell
    Exit,

    Command(Command),
}

/// Why a line could not be turned into a command
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Usage: {0}")]
    Usage(&'static str),

    #[error("Unknown command: {0}")]
    Unknown(String),
}

impl Line {
    /// Parse a single line of input
    pub fn parse(input: &str) -> Result<Self, ParseError> {
        let mut parts = input.split_whitespace();
        let Some(word) = parts.next() else {
            return Ok(Line::Blank);
        };

        let word = word.to_ascii_uppercase();
        match word.as_str() {
            "PUT" => {
                let key = parts.next();
                let value = parts.collect::<Vec<_>>().join(" ");
                match key {
                    Some(key) if !value.is_empty() => Ok(Line::Command(Command::Put {
                        key: key.to_string(),
                        value,
                    })),
                    _ => Err(ParseError::Usage("PUT <key> <value>")),
                }
            }
            "GET" => parts
                .next()
                .map(|key| Line::Command(Command::Get { key: key.to_string() }))
                .ok_or(ParseError::Usage("GET <key>")),
            "DELETE" => parts
                .next()
                .map(|key| Line::Command(Command::Delete { key: key.to_string() }))
                .ok_or(ParseError::Usage("DELETE <key>")),
            "EXIT" | "QUIT" => Ok(Line::Exit),
            _ => Err(ParseError::Unknown(word)),
        }
    }
}
