//! MD:Z decoding into match, mismatch and deletion runs

use crate::error::{MutflowError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditKind {
    Match,
    /// Reference bases that differ from the read
    Mismatch,
    /// Reference bases absent from the read, written `^ACG`
    Deletion,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MdEdit {
    pub kind: EditKind,
    pub len: usize,
    /// Reference bases for mismatch and deletion runs, empty for matches
    pub bases: String,
}

impl MdEdit {
    pub fn matched(len: usize) -> Self {
        Self { kind: EditKind::Match, len, bases: String::new() }
    }

    pub fn mismatch(bases: &str) -> Self {
        Self { kind: EditKind::Mismatch, len: bases.len(), bases: bases.to_string() }
    }

    pub fn deletion(bases: &str) -> Self {
        Self { kind: EditKind::Deletion, len: bases.len(), bases: bases.to_string() }
    }
}

fn malformed(md: &str, reason: String) -> MutflowError {
    MutflowError::MalformedEditString { md: md.to_string(), reason }
}

/// Length of the run of ASCII letters starting at `start`
fn letter_run(bytes: &[u8], start: usize) -> usize {
    bytes[start..].iter().take_while(|b| b.is_ascii_alphabetic()).count()
}

/// Parse an MD:Z value such as `10A5^AC6` into edit runs.
///
/// Digit runs become matches (a run of `0` yields nothing), bare letter runs
/// become one mismatch edit, and `^` followed by letters becomes one deletion.
pub fn parse_md(md: &str) -> Result<Vec<MdEdit>> {
    let bytes = md.as_bytes();
    let mut edits = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        if b.is_ascii_digit() {
            let mut run: usize = 0;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                run = run
                    .checked_mul(10)
                    .and_then(|r| r.checked_add((bytes[i] - b'0') as usize))
                    .ok_or_else(|| malformed(md, "match run overflows".to_string()))?;
                i += 1;
            }
            if run > 0 {
                edits.push(MdEdit::matched(run));
            }
        } else if b.is_ascii_alphabetic() {
            let n = letter_run(bytes, i);
            edits.push(MdEdit::mismatch(&md[i..i + n]));
            i += n;
        } else if b == b'^' {
            i += 1;
            let n = letter_run(bytes, i);
            if n == 0 {
                return Err(malformed(md, format!("'^' at offset {} is not followed by a base", i - 1)));
            }
            edits.push(MdEdit::deletion(&md[i..i + n]));
            i += n;
        } else {
            let ch = md[i..].chars().next().unwrap_or('?');
            return Err(malformed(md, format!("unexpected character '{}' at offset {}", ch, i)));
        }
    }

    Ok(edits)
}
