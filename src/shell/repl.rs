//! Interactive loop
//!
//! Reads lines, runs them against the engine and writes replies. Generic over
//! the input and output so it can be driven from tests as well as a terminal.

use std::io::{BufRead, Write};

use tracing::{debug, info, warn};

use crate::engine::Engine;
use crate::error::Result;

use super::command::{Line, ParseError, HELP};

const PROMPT: &str = "> ";

/// Shell bound to an engine, an input and an output
pub struct Repl<'a, R, W> {
    engine: &'a Engine,
    input: R,
    output: W,
}

impl<'a, R: BufRead, W: Write> Repl<'a, R, W> {
    pub fn new(engine: &'a Engine, input: R, output: W) -> Self {
        Self {
            engine,
            input,
            output,
        }
    }

    /// Run until `EXIT`/`QUIT` or end of input
    ///
    /// Command failures are printed and the loop carries on; only I/O
    /// errors on the input or output end it early.
    pub fn run(&mut self) -> Result<()> {
        writeln!(self.output, "emberkv - embedded key-value store")?;
        writeln!(self.output, "{}", HELP)?;

        let mut line = String::new();
        loop {
            write!(self.output, "{}", PROMPT)?;
            self.output.flush()?;

            line.clear();
            if self.input.read_line(&mut line)? == 0 {
                debug!("end of input");
                break;
            }

            if !self.handle_line(&line)? {
                info!("shutdown requested");
                writeln!(self.output, "Goodbye!")?;
                break;
            }
        }

        self.output.flush()?;
        Ok(())
    }

    /// Handle one line; returns false when the shell should stop
    fn handle_line(&mut self, line: &str) -> Result<bool> {
        match Line::parse(line) {
            Ok(Line::Blank) => {}
            Ok(Line::Exit) => return Ok(false),
            Ok(Line::Command(command)) => {
                debug!(?command, "executing");
                match self.engine.execute(command) {
                    Ok(Some(value)) => {
                        writeln!(self.output, "{}", String::from_utf8_lossy(&value))?
                    }
                    Ok(None) => writeln!(self.output, "OK")?,
                    Err(e) => writeln!(self.output, "Error: {}", e)?,
                }
            }
            Err(e @ ParseError::Usage(_)) => writeln!(self.output, "{}", e)?,
            Err(e @ ParseError::Unknown(_)) => {
                warn!(error = %e, "unknown command");
                writeln!(self.output, "{}", e)?;
                writeln!(self.output, "{}", HELP)?;
            }
        }
        Ok(true)
    }
}
