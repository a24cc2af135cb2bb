//! JSON-lines I/O for the CLI
//!
//! - Input: one JSON object per line; blank lines are skipped
//! - Output: one JSON object per line, `{"status": "ok", "data": ..}` or
//!   `{"status": "error", "code": .., "message": ..}`
//! - UTF-8 only

use std::io::{BufRead, Write};

use serde_json::{Map, Value};

use super::errors::{CliError, CliResult};

/// One input line
#[derive(Debug)]
pub enum InputLine {
    Object(Map<String, Value>),
    /// The line did not parse as a JSON object
    Invalid(String),
}

/// Reads JSON objects line by line. A line that is not an object is
/// reported, not fatal; a read failure ends the stream with an error.
pub fn read_lines<R: BufRead>(input: R) -> impl Iterator<Item = CliResult<InputLine>> {
    input
        .lines()
        .filter(|line| !matches!(line, Ok(l) if l.trim().is_empty()))
        .map(|line| {
            let line = line.map_err(CliError::from)?;
            Ok(match serde_json::from_str::<Value>(&line) {
                Ok(Value::Object(object)) => InputLine::Object(object),
                Ok(other) => InputLine::Invalid(format!("expected a JSON object, got {}", other)),
                Err(e) => InputLine::Invalid(e.to_string()),
            })
        })
}

/// Write a success response
pub fn write_response<W: Write>(out: &mut W, data: Value) -> CliResult<()> {
    let response = serde_json::json!({
        "status": "ok",
        "data": data
    });
    write_line(out, &response)
}

/// Write an error response
pub fn write_error<W: Write>(out: &mut W, code: &str, message: &str) -> CliResult<()> {
    let response = serde_json::json!({
        "status": "error",
        "code": code,
        "message": message
    });
    write_line(out, &response)
}

fn write_line<W: Write>(out: &mut W, value: &Value) -> CliResult<()> {
    serde_json::to_writer(&mut *out, value)?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_lines() {
        let input = "{\"a\": 1}\n\n[1]\nnot json\n";
        let lines: Vec<_> = read_lines(input.as_bytes()).map(|l| l.unwrap()).collect();
        assert_eq!(lines.len(), 3);
        assert!(matches!(&lines[0], InputLine::Object(o) if o["a"] == 1));
        assert!(matches!(lines[1], InputLine::Invalid(_)));
        assert!(matches!(lines[2], InputLine::Invalid(_)));
    }

    #[test]
    fn test_responses() {
        let mut out = Vec::new();
        write_response(&mut out, serde_json::json!({"offset": 8})).unwrap();
        write_error(&mut out, "TAIL_INVALID_RECORD", "bad").unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines[0]["status"], "ok");
        assert_eq!(lines[0]["data"]["offset"], 8);
        assert_eq!(lines[1]["status"], "error");
        assert_eq!(lines[1]["code"], "TAIL_INVALID_RECORD");
    }
}
