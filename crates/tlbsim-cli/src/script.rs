//! Line-oriented command scripts.
//!
//! One command per line; blank lines and `#` comments are skipped. A line that
//! does not start with a command keyword is treated as a logical address, so
//! `2,5` and `translate 2,5` are equivalent.

use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Translate(String),
    Add(u64),
    Delete(u64),
    Snapshot,
    Events,
    Inspect(InspectTarget),
    Reset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InspectTarget {
    Page(u64),
    TlbSlot(usize),
    Frame(usize),
}

impl fmt::Display for InspectTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InspectTarget::Page(page) => write!(f, "page {page}"),
            InspectTarget::TlbSlot(slot) => write!(f, "TLB entry {slot}"),
            InspectTarget::Frame(frame) => write!(f, "frame {frame}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScriptError {
    #[error("unknown command `{0}`")]
    UnknownCommand(String),

    #[error("`{command}` expects {expected}")]
    BadArguments {
        command: &'static str,
        expected: &'static str,
    },

    #[error("`{0}` is not a non-negative integer")]
    InvalidNumber(String),
}

pub fn parse_line(line: &str) -> Result<Option<Command>, ScriptError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let (keyword, rest) = match line.split_once(char::is_whitespace) {
        Some((keyword, rest)) => (keyword, rest.trim()),
        None => (line, ""),
    };

    let command = match keyword.to_ascii_lowercase().as_str() {
        "translate" | "t" => Command::Translate(rest.to_string()),
        "add" => Command::Add(single_number(rest, "add", "a page number")?),
        "delete" | "del" => Command::Delete(single_number(rest, "delete", "a page number")?),
        "snapshot" | "show" => no_arguments(rest, "snapshot", Command::Snapshot)?,
        "events" | "log" => no_arguments(rest, "events", Command::Events)?,
        "reset" => no_arguments(rest, "reset", Command::Reset)?,
        "inspect" => Command::Inspect(parse_inspect(rest)?),
        _ if keyword.starts_with(|c: char| c.is_ascii_alphabetic()) && !line.contains(',') => {
            return Err(ScriptError::UnknownCommand(keyword.to_string()));
        }
        _ => Command::Translate(line.to_string()),
    };
    Ok(Some(command))
}

fn parse_inspect(rest: &str) -> Result<InspectTarget, ScriptError> {
    const EXPECTED: &str = "`page|tlb|frame <n>`";
    let mut parts = rest.split_whitespace();
    let (Some(kind), Some(n), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(ScriptError::BadArguments {
            command: "inspect",
            expected: EXPECTED,
        });
    };
    let n = number(n)?;
    match kind.to_ascii_lowercase().as_str() {
        "page" => Ok(InspectTarget::Page(n)),
        "tlb" => Ok(InspectTarget::TlbSlot(index(n)?)),
        "frame" => Ok(InspectTarget::Frame(index(n)?)),
        _ => Err(ScriptError::BadArguments {
            command: "inspect",
            expected: EXPECTED,
        }),
    }
}

fn single_number(
    rest: &str,
    command: &'static str,
    expected: &'static str,
) -> Result<u64, ScriptError> {
    let mut parts = rest.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some(n), None) => number(n),
        _ => Err(ScriptError::BadArguments { command, expected }),
    }
}

fn no_arguments(
    rest: &str,
    command: &'static str,
    parsed: Command,
) -> Result<Command, ScriptError> {
    if rest.is_empty() {
        Ok(parsed)
    } else {
        Err(ScriptError::BadArguments {
            command,
            expected: "no arguments",
        })
    }
}

fn number(s: &str) -> Result<u64, ScriptError> {
    s.parse()
        .map_err(|_| ScriptError::InvalidNumber(s.to_string()))
}

fn index(n: u64) -> Result<usize, ScriptError> {
    usize::try_from(n).map_err(|_| ScriptError::InvalidNumber(n.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_lines_and_comments_are_skipped() {
        assert_eq!(parse_line(""), Ok(None));
        assert_eq!(parse_line("   "), Ok(None));
        assert_eq!(parse_line("# warm the TLB"), Ok(None));
    }

    #[test]
    fn bare_addresses_translate() {
        assert_eq!(
            parse_line("2,5"),
            Ok(Some(Command::Translate("2,5".into())))
        );
        assert_eq!(
            parse_line("  translate 2 , 5 "),
            Ok(Some(Command::Translate("2 , 5".into())))
        );
        // Malformed addresses still go to the engine, which reports them.
        assert_eq!(
            parse_line("x,5"),
            Ok(Some(Command::Translate("x,5".into())))
        );
        assert_eq!(parse_line("7"), Ok(Some(Command::Translate("7".into()))));
    }

    #[test]
    fn page_table_commands() {
        assert_eq!(parse_line("add 12"), Ok(Some(Command::Add(12))));
        assert_eq!(parse_line("DELETE 3"), Ok(Some(Command::Delete(3))));
        assert_eq!(
            parse_line("add -1"),
            Err(ScriptError::InvalidNumber("-1".into()))
        );
        assert_eq!(
            parse_line("delete"),
            Err(ScriptError::BadArguments {
                command: "delete",
                expected: "a page number"
            })
        );
    }

    #[test]
    fn inspect_targets() {
        assert_eq!(
            parse_line("inspect page 4"),
            Ok(Some(Command::Inspect(InspectTarget::Page(4))))
        );
        assert_eq!(
            parse_line("inspect tlb 0"),
            Ok(Some(Command::Inspect(InspectTarget::TlbSlot(0))))
        );
        assert_eq!(
            parse_line("inspect frame 5"),
            Ok(Some(Command::Inspect(InspectTarget::Frame(5))))
        );
        assert!(parse_line("inspect disk 1").is_err());
        assert!(parse_line("inspect page").is_err());
    }

    #[test]
    fn unknown_keywords_are_errors() {
        assert_eq!(
            parse_line("flush"),
            Err(ScriptError::UnknownCommand("flush".into()))
        );
        assert_eq!(
            parse_line("snapshot now"),
            Err(ScriptError::BadArguments {
                command: "snapshot",
                expected: "no arguments"
            })
        );
    }
}
