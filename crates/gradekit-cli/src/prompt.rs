//! Interactive input: typed confirmation, per-repository verdicts and
//! multi-line comments. Readers and writers are injected so the logic runs
//! in tests without a terminal.

use std::io::{self, BufRead, Write};

pub const CONFIRM_WORD: &str = "YES";
pub const COMMENT_TERMINATOR: &str = ".";

/// Ask for the exact word `YES`. Anything else, including EOF, declines.
pub fn confirm<R: BufRead, W: Write>(action: &str, input: &mut R, out: &mut W) -> io::Result<bool> {
    write!(out, "This will {action}. Type {CONFIRM_WORD} to continue: ")?;
    out.flush()?;
    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(answer.trim_end_matches(['\r', '\n']) == CONFIRM_WORD)
}

/// One answer line, or `None` at EOF.
pub fn ask<R: BufRead, W: Write>(question: &str, input: &mut R, out: &mut W) -> io::Result<Option<String>> {
    write!(out, "{question}")?;
    out.flush()?;
    let mut answer = String::new();
    if input.read_line(&mut answer)? == 0 {
        return Ok(None);
    }
    Ok(Some(answer.trim().to_string()))
}

/// Lines until one containing only `.`. `None` when input ended before any
/// line was read.
pub fn read_comment<R: BufRead>(input: &mut R) -> io::Result<Option<String>> {
    let mut text = String::new();
    let mut read_any = false;
    loop {
        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Ok(read_any.then_some(text));
        }
        read_any = true;
        if line.trim_end_matches(['\r', '\n']) == COMMENT_TERMINATOR {
            return Ok(Some(text));
        }
        text.push_str(&line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn only_exact_yes_confirms() {
        for (answer, expected) in [("YES\n", true), ("yes\n", false), ("YES please\n", false), ("", false)] {
            let mut out = Vec::new();
            let got = confirm("remove collaborators", &mut Cursor::new(answer), &mut out).unwrap();
            assert_eq!(got, expected, "answer {answer:?}");
        }
    }

    #[test]
    fn confirm_names_the_action() {
        let mut out = Vec::new();
        confirm("cancel runs", &mut Cursor::new("no\n"), &mut out).unwrap();
        assert!(String::from_utf8(out).unwrap().contains("cancel runs"));
    }

    #[test]
    fn comment_stops_at_dot_line() {
        let mut input = Cursor::new("Nice work.\nSee line 4.\n.\nnext repo\n.\n");
        assert_eq!(
            read_comment(&mut input).unwrap().as_deref(),
            Some("Nice work.\nSee line 4.\n")
        );
        assert_eq!(read_comment(&mut input).unwrap().as_deref(), Some("next repo\n"));
        assert_eq!(read_comment(&mut input).unwrap(), None);
    }

    #[test]
    fn ask_reports_eof() {
        let mut out = Vec::new();
        let mut input = Cursor::new("fail\n");
        assert_eq!(ask("? ", &mut input, &mut out).unwrap().as_deref(), Some("fail"));
        assert_eq!(ask("? ", &mut input, &mut out).unwrap(), None);
    }
}
