//! Line codec for the property telnet protocol.
//!
//! Protocol overview:
//! - Format: ASCII command/response over TCP
//! - Command terminator: CR+LF (`\r\n`)
//! - Response terminator: LF (`\n`), sometimes preceded by CR
//! - Commands: `get <path>`, `set <path> <value>`
//! - Responses: `<path> = '<value>' (<type>)`
//!
//! The `(<type>)` tag on responses is informational. The client decodes the
//! quoted literal as the kind it recorded when the request went out, so a
//! server that tags a node `unspecified` still decodes cleanly.
//!
//! Line framing is the transport reader's job ([`tokio::io::BufReader`] in
//! the client); this module only deals in whole lines.

use crate::error::ProtocolError;
use crate::value::PropertyValue;

/// Terminator appended to every outbound command.
pub const COMMAND_TERMINATOR: &str = "\r\n";

/// Encode a `get` command line for `key`.
pub fn encode_get(key: &str) -> String {
    format!("get {key}{COMMAND_TERMINATOR}")
}

/// Encode a `set` command line assigning `value` to `key`.
pub fn encode_set(key: &str, value: &PropertyValue) -> String {
    format!("set {key} {value}{COMMAND_TERMINATOR}")
}

/// A response line split into its parts, borrowing from the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseLine<'a> {
    /// Property path the response is for.
    pub key: &'a str,
    /// Raw value literal, unquoted but otherwise untouched.
    pub literal: &'a str,
    /// Type tag printed by the server, if present.
    pub type_tag: Option<&'a str>,
}

/// Parse one response line of the form `<path> = '<value>' (<type>)`.
///
/// Trailing CR/LF is tolerated. Anything else, including the bare `/>`
/// prompt the server emits between responses, is an
/// [`ProtocolError::UnrecognizedLine`].
pub fn parse_response(line: &str) -> Result<ResponseLine<'_>, ProtocolError> {
    let unrecognized = || ProtocolError::UnrecognizedLine(line.to_string());

    let trimmed = line.trim_end_matches(['\r', '\n']);
    let (key, rest) = trimmed.split_once(" = ").ok_or_else(unrecognized)?;
    if key.is_empty() {
        return Err(unrecognized());
    }

    let rest = rest.strip_prefix('\'').ok_or_else(unrecognized)?;
    // The literal may itself contain quotes; the closing quote is the last
    // one on the line, ahead of the optional type tag.
    let (literal, tail) = rest.rsplit_once('\'').ok_or_else(unrecognized)?;

    let tail = tail.trim();
    let type_tag = if tail.is_empty() {
        None
    } else {
        Some(
            tail.strip_prefix('(')
                .and_then(|t| t.strip_suffix(')'))
                .ok_or_else(unrecognized)?,
        )
    };

    Ok(ResponseLine {
        key,
        literal,
        type_tag,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_get_line() {
        assert_eq!(encode_get("/a/b"), "get /a/b\r\n");
    }

    #[test]
    fn encode_set_line_bool() {
        assert_eq!(
            encode_set("/gear/down", &PropertyValue::Bool(true)),
            "set /gear/down true\r\n"
        );
    }

    #[test]
    fn encode_set_line_double() {
        assert_eq!(
            encode_set("/controls/flight/aileron", &PropertyValue::Double(-0.25)),
            "set /controls/flight/aileron -0.25\r\n"
        );
    }

    #[test]
    fn parse_double_response() {
        let parsed = parse_response("/a/b = '3.14' (double)\r\n").unwrap();
        assert_eq!(parsed.key, "/a/b");
        assert_eq!(parsed.literal, "3.14");
        assert_eq!(parsed.type_tag, Some("double"));
    }

    #[test]
    fn parse_string_response_with_spaces() {
        let parsed = parse_response("/sim/description = 'Cessna 172P Skyhawk' (string)").unwrap();
        assert_eq!(parsed.key, "/sim/description");
        assert_eq!(parsed.literal, "Cessna 172P Skyhawk");
    }

    #[test]
    fn parse_literal_containing_quote() {
        let parsed = parse_response("/sim/note = 'pilot's choice' (string)").unwrap();
        assert_eq!(parsed.literal, "pilot's choice");
    }

    #[test]
    fn parse_response_without_type_tag() {
        let parsed = parse_response("/a/b = '1'").unwrap();
        assert_eq!(parsed.literal, "1");
        assert_eq!(parsed.type_tag, None);
    }

    #[test]
    fn parse_rejects_prompt_noise() {
        assert!(matches!(
            parse_response("/> "),
            Err(ProtocolError::UnrecognizedLine(_))
        ));
        assert!(matches!(
            parse_response(""),
            Err(ProtocolError::UnrecognizedLine(_))
        ));
    }

    #[test]
    fn parse_rejects_unquoted_value() {
        assert!(matches!(
            parse_response("/a/b = 3.14 (double)"),
            Err(ProtocolError::UnrecognizedLine(_))
        ));
    }
}
