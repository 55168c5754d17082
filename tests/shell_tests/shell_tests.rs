//! Tests for the Shell
//!
//! These tests verify:
//! - Line parsing (commands, usage errors, unknown commands)
//! - The interactive loop against a real engine

use std::io::Cursor;

use emberkv::config::Config;
use emberkv::engine::Engine;
use emberkv::shell::{Command, Line, ParseError, Repl, HELP};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_engine() -> (TempDir, Engine) {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder().data_dir(temp_dir.path()).build();
    let engine = Engine::open(config).unwrap();
    (temp_dir, engine)
}

/// Feed `input` through a shell and return everything it printed
fn run_session(engine: &Engine, input: &str) -> String {
    let mut output = Vec::new();
    Repl::new(engine, Cursor::new(input.as_bytes()), &mut output)
        .run()
        .unwrap();
    String::from_utf8(output).unwrap()
}

/// Replies only, with the banner and prompts stripped
fn replies(transcript: &str) -> Vec<&str> {
    transcript
        .lines()
        .skip(2)
        .map(|line| line.trim_start_matches("> "))
        .filter(|line| !line.is_empty())
        .collect()
}

// =============================================================================
// Parse Tests
// =============================================================================

#[test]
fn test_parse_put() {
    assert_eq!(
        Line::parse("PUT name ember"),
        Ok(Line::Command(Command::Put {
            key: "name".to_string(),
            value: "ember".to_string(),
        }))
    );
}

#[test]
fn test_parse_put_joins_value_words() {
    assert_eq!(
        Line::parse("put greeting hello   big world\n"),
        Ok(Line::Command(Command::Put {
            key: "greeting".to_string(),
            value: "hello big world".to_string(),
        }))
    );
}

#[test]
fn test_parse_get_and_delete() {
    assert_eq!(
        Line::parse("get k"),
        Ok(Line::Command(Command::Get {
            key: "k".to_string()
        }))
    );
    assert_eq!(
        Line::parse("  DeLeTe k  "),
        Ok(Line::Command(Command::Delete {
            key: "k".to_string()
        }))
    );
}

#[test]
fn test_parse_exit_and_blank() {
    assert_eq!(Line::parse("exit"), Ok(Line::Exit));
    assert_eq!(Line::parse("QUIT"), Ok(Line::Exit));
    assert_eq!(Line::parse(""), Ok(Line::Blank));
    assert_eq!(Line::parse("   \t\n"), Ok(Line::Blank));
}

#[test]
fn test_parse_usage_errors() {
    assert_eq!(
        Line::parse("PUT"),
        Err(ParseError::Usage("PUT <key> <value>"))
    );
    assert_eq!(
        Line::parse("PUT onlykey"),
        Err(ParseError::Usage("PUT <key> <value>"))
    );
    assert_eq!(Line::parse("GET"), Err(ParseError::Usage("GET <key>")));
    assert_eq!(
        Line::parse("delete"),
        Err(ParseError::Usage("DELETE <key>"))
    );
}

#[test]
fn test_parse_unknown_command() {
    let err = Line::parse("frobnicate x").unwrap_err();

    assert_eq!(err, ParseError::Unknown("FROBNICATE".to_string()));
    assert_eq!(err.to_string(), "Unknown command: FROBNICATE");
}

#[test]
fn test_usage_message() {
    assert_eq!(
        ParseError::Usage("GET <key>").to_string(),
        "Usage: GET <key>"
    );
}

// =============================================================================
// Session Tests
// =============================================================================

#[test]
fn test_session_banner_and_prompt() {
    let (_temp, engine) = setup_temp_engine();

    let transcript = run_session(&engine, "");

    let mut lines = transcript.lines();
    assert_eq!(lines.next(), Some("emberkv - embedded key-value store"));
    assert_eq!(lines.next(), Some(HELP));
    assert_eq!(lines.next(), Some("> "));
}

#[test]
fn test_session_put_get_delete() {
    let (_temp, engine) = setup_temp_engine();

    let transcript = run_session(
        &engine,
        "PUT city new york\nGET city\nDELETE city\nGET city\nEXIT\n",
    );

    assert_eq!(
        replies(&transcript),
        vec![
            "OK",
            "new york",
            "OK",
            "Error: key not found: city",
            "Goodbye!",
        ]
    );
    assert!(!engine.contains_key("city"));
}

#[test]
fn test_session_reports_bad_input_and_continues() {
    let (_temp, engine) = setup_temp_engine();

    let transcript = run_session(&engine, "PUT lonely\nhello\n\nPUT k v\nGET k\n");

    assert_eq!(
        replies(&transcript),
        vec![
            "Usage: PUT <key> <value>",
            "Unknown command: HELLO",
            HELP,
            "OK",
            "v",
        ]
    );
}

#[test]
fn test_session_stops_at_exit() {
    let (_temp, engine) = setup_temp_engine();

    let transcript = run_session(&engine, "EXIT\nPUT never written\n");

    assert!(transcript.ends_with("Goodbye!\n"));
    assert!(!engine.contains_key("never"));
}

#[test]
fn test_session_stops_at_end_of_input() {
    let (_temp, engine) = setup_temp_engine();

    let transcript = run_session(&engine, "PUT k v");

    assert!(!transcript.contains("Goodbye!"));
    assert_eq!(engine.get("k").unwrap(), b"v");
}
