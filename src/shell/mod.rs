//! Shell Module
//!
//! Line-oriented front end over an [`Engine`](crate::Engine).
//!
//! ## Commands
//! ```text
//! PUT <key> <value...>   store a value (remaining words, joined by spaces)
//! GET <key>              print the value
//! DELETE <key>           remove the key
//! EXIT | QUIT            leave the shell
//! ```
//!
//! Command words are case-insensitive. Replies are `OK`, the value, or
//! `Error: <message>`.

mod command;
mod repl;

pub use command::{Command, Line, ParseError, HELP};
pub use repl::Repl;
