//! Splitting of one input line into a verb and its arguments.
//!
//! Lines are handled as bytes: only the verb and whitespace-split arguments have to be
//! text, the tail given to `write` is passed on untouched.

use regex::bytes::Regex;
use std::borrow::Cow;
use std::sync::OnceLock;

/// Verbs whose argument is the rest of the line taken verbatim, spaces included.
const RAW_TAIL_VERBS: &[&str] = &["write"];

/// A parsed request: the verb plus its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine<'a> {
    pub verb: &'a str,
    /// Whitespace-split arguments. Empty for raw-tail verbs.
    pub args: Vec<Cow<'a, str>>,
    /// Everything after the verb and one separator, for raw-tail verbs only.
    pub tail: Option<&'a [u8]>,
}

/// Outcome of parsing one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedLine<'a> {
    /// Empty or whitespace only, nothing to run.
    Blank,
    Command(CommandLine<'a>),
    /// Not blank, but no verb can be extracted, e.g. it starts with invalid UTF-8.
    Unrecognized,
}

fn line_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // verb, then optionally one whitespace separator and the remainder as raw bytes
    RE.get_or_init(|| Regex::new(r"^\s*(\S+)(?:\s((?s-u:.*)))?$").expect("static pattern"))
}

fn is_blank(line: &[u8]) -> bool {
    match std::str::from_utf8(line) {
        Ok(text) => text.trim().is_empty(),
        Err(_) => false,
    }
}

/// Parse a single line, without or with its trailing `\n` / `\r\n`.
///
/// For `write` the whole remainder after the verb and one separating whitespace character
/// becomes the tail; every other verb gets whitespace-split arguments.
pub fn parse_line(line: &[u8]) -> ParsedLine<'_> {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    let line = line.strip_suffix(b"\r").unwrap_or(line);

    if is_blank(line) {
        return ParsedLine::Blank;
    }
    let Some(caps) = line_regex().captures(line) else {
        return ParsedLine::Unrecognized;
    };
    // `\S+` only matches whole UTF-8 characters
    let Some(verb) = caps.get(1).and_then(|m| std::str::from_utf8(m.as_bytes()).ok()) else {
        return ParsedLine::Unrecognized;
    };
    let rest = caps.get(2).map(|m| m.as_bytes());

    let cmd = if RAW_TAIL_VERBS.contains(&verb) {
        CommandLine {
            verb,
            args: Vec::new(),
            tail: rest,
        }
    } else {
        let args = match rest {
            None => Vec::new(),
            Some(rest) => match String::from_utf8_lossy(rest) {
                Cow::Borrowed(text) => text.split_whitespace().map(Cow::Borrowed).collect(),
                Cow::Owned(text) => text
                    .split_whitespace()
                    .map(|arg| Cow::Owned(arg.to_string()))
                    .collect(),
            },
        };
        CommandLine {
            verb,
            args,
            tail: None,
        }
    };
    ParsedLine::Command(cmd)
}
