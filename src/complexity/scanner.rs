//! Non-code masking
//!
//! Replaces comment bodies and string-literal contents with spaces so the
//! decision-point and header patterns never match inside them. Newlines are
//! preserved so line numbers stay stable; string delimiters are kept so the
//! surrounding code still reads as an operand.

use crate::complexity::languages::{LanguageSyntax, Quote};
use std::collections::BTreeSet;
use std::ops::Range;
use thiserror::Error;

/// A file the lexical scanner could not make sense of
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("line {line}: {reason}")]
pub struct ScanAnomaly {
    pub line: u32,
    pub reason: String,
}

impl ScanAnomaly {
    pub fn new(line: u32, reason: impl Into<String>) -> Self {
        Self {
            line,
            reason: reason.into(),
        }
    }
}

fn is_ident(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

struct Masker<'a> {
    src: &'a [u8],
    syntax: &'a LanguageSyntax,
    pos: usize,
    ranges: Vec<Range<usize>>,
}

impl<'a> Masker<'a> {
    fn line_at(&self, pos: usize) -> u32 {
        self.src[..pos.min(self.src.len())]
            .iter()
            .filter(|&&b| b == b'\n')
            .count() as u32
            + 1
    }

    fn starts_with(&self, at: usize, token: &str) -> bool {
        self.src[at..].starts_with(token.as_bytes())
    }

    fn run(mut self) -> Result<Vec<Range<usize>>, ScanAnomaly> {
        while self.pos < self.src.len() {
            let at = self.pos;
            let b = self.src[at];

            if self.syntax.line_comments.iter().any(|c| self.starts_with(at, c)) {
                let end = self.src[at..]
                    .iter()
                    .position(|&c| c == b'\n')
                    .map(|p| at + p)
                    .unwrap_or(self.src.len());
                self.ranges.push(at..end);
                self.pos = end;
                continue;
            }

            if let Some((open, close)) = self.syntax.block_comment {
                if self.starts_with(at, open) {
                    self.block_comment(open, close)?;
                    continue;
                }
            }

            if self.syntax.rust_rules && self.rust_literal()? {
                continue;
            }

            if let Some(prefix) = self.syntax.verbatim_prefix {
                if b == prefix && self.src.get(at + 1) == Some(&b'"') {
                    self.verbatim_string(at + 1)?;
                    continue;
                }
            }

            if let Some(q) = self.syntax.quotes.iter().find(|q| q.ch == b).copied() {
                if self.syntax.triple_quotes
                    && self.src.get(at + 1) == Some(&b)
                    && self.src.get(at + 2) == Some(&b)
                {
                    self.triple_string(b)?;
                } else {
                    self.string(q)?;
                }
                continue;
            }

            self.pos += 1;
        }
        Ok(self.ranges)
    }

    fn block_comment(&mut self, open: &str, close: &str) -> Result<(), ScanAnomaly> {
        let start = self.pos;
        let mut depth = 0usize;
        let mut i = start;
        while i < self.src.len() {
            if self.starts_with(i, open) && (depth == 0 || self.syntax.nested_comments) {
                depth += 1;
                i += open.len();
            } else if self.starts_with(i, close) {
                depth -= 1;
                i += close.len();
                if depth == 0 {
                    self.ranges.push(start..i);
                    self.pos = i;
                    return Ok(());
                }
            } else {
                i += 1;
            }
        }
        Err(ScanAnomaly::new(self.line_at(start), "unterminated block comment"))
    }

    /// Mask the contents between `open` (index of the opening quote) and the
    /// closing quote, leaving both quotes in place
    fn string(&mut self, q: Quote) -> Result<(), ScanAnomaly> {
        let open = self.pos;
        let mut i = open + 1;
        while i < self.src.len() {
            let c = self.src[i];
            if q.escapes && c == b'\\' {
                i += 2;
                continue;
            }
            if c == q.ch {
                self.ranges.push(open + 1..i);
                self.pos = i + 1;
                return Ok(());
            }
            if c == b'\n' && !q.multiline {
                return Err(ScanAnomaly::new(self.line_at(open), "unterminated string literal"));
            }
            i += 1;
        }
        Err(ScanAnomaly::new(self.line_at(open), "unterminated string literal"))
    }

    fn triple_string(&mut self, ch: u8) -> Result<(), ScanAnomaly> {
        let open = self.pos;
        let mut i = open + 3;
        while i + 2 < self.src.len() {
            let c = self.src[i];
            if c == b'\\' {
                i += 2;
                continue;
            }
            if c == ch && self.src.get(i + 1) == Some(&ch) && self.src.get(i + 2) == Some(&ch) {
                self.ranges.push(open + 3..i);
                self.pos = i + 3;
                return Ok(());
            }
            i += 1;
        }
        Err(ScanAnomaly::new(self.line_at(open), "unterminated triple-quoted string"))
    }

    /// C# `@"..."`: no escapes, `""` is a literal quote
    fn verbatim_string(&mut self, quote_at: usize) -> Result<(), ScanAnomaly> {
        let mut i = quote_at + 1;
        while i < self.src.len() {
            if self.src[i] == b'"' {
                if self.src.get(i + 1) == Some(&b'"') {
                    i += 2;
                    continue;
                }
                self.ranges.push(quote_at + 1..i);
                self.pos = i + 1;
                return Ok(());
            }
            i += 1;
        }
        Err(ScanAnomaly::new(self.line_at(quote_at), "unterminated verbatim string"))
    }

    /// Rust char literals, lifetimes and raw strings. Returns true when the
    /// byte at `pos` was consumed.
    fn rust_literal(&mut self) -> Result<bool, ScanAnomaly> {
        let at = self.pos;
        let b = self.src[at];
        let prev = at.checked_sub(1).map(|p| self.src[p]);

        if b == b'\'' {
            let next = self.src.get(at + 1).copied();
            // closing quote index when this is a char literal
            let close = match next {
                Some(b'\\') => {
                    let found = self.src.get(at + 3..).and_then(|rest| {
                        rest.iter()
                            .take_while(|&&c| c != b'\n')
                            .position(|&c| c == b'\'')
                    });
                    match found {
                        Some(p) => Some(at + 3 + p),
                        None => {
                            return Err(ScanAnomaly::new(
                                self.line_at(at),
                                "unterminated char literal",
                            ))
                        }
                    }
                }
                Some(c) => {
                    let end = at + 1 + utf8_len(c);
                    (self.src.get(end) == Some(&b'\'')).then_some(end)
                }
                None => None,
            };
            match close {
                Some(end) => {
                    self.ranges.push(at + 1..end);
                    self.pos = end + 1;
                }
                // lifetime or label
                None => self.pos = at + 1,
            }
            return Ok(true);
        }

        let raw_start = b == b'r'
            && match prev {
                None => true,
                Some(b'b') => at < 2 || !is_ident(self.src[at - 2]),
                Some(p) => !is_ident(p),
            };
        if raw_start {
            let hashes = self.src[at + 1..].iter().take_while(|&&c| c == b'#').count();
            if self.src.get(at + 1 + hashes) == Some(&b'"') {
                let body = at + 2 + hashes;
                let mut closing = String::from("\"");
                closing.push_str(&"#".repeat(hashes));
                let mut i = body;
                while i < self.src.len() {
                    if self.starts_with(i, &closing) {
                        self.ranges.push(body..i);
                        self.pos = i + closing.len();
                        return Ok(true);
                    }
                    i += 1;
                }
                return Err(ScanAnomaly::new(self.line_at(at), "unterminated raw string"));
            }
        }
        Ok(false)
    }
}

fn utf8_len(first: u8) -> usize {
    match first {
        0x00..=0x7F => 1,
        0xC0..=0xDF => 2,
        0xE0..=0xEF => 3,
        _ => 4,
    }
}

/// Replace bytes in the given ranges with spaces, preserving `\n`.
fn mask_ranges(source: &str, ranges: &[Range<usize>]) -> String {
    let mut bytes = source.as_bytes().to_vec();
    for range in ranges {
        for i in range.start..range.end.min(bytes.len()) {
            if bytes[i] != b'\n' {
                bytes[i] = b' ';
            }
        }
    }
    // Only whole literal bodies were blanked, so the result is valid UTF-8
    String::from_utf8(bytes).unwrap_or_else(|_| source.to_string())
}

/// 1-based numbers of lines that begin inside a masked range
fn continued_lines(source: &str, ranges: &[Range<usize>]) -> BTreeSet<u32> {
    let bytes = source.as_bytes();
    let mut sorted: Vec<&Range<usize>> = ranges.iter().collect();
    sorted.sort_by_key(|r| r.start);

    let mut lines = BTreeSet::new();
    let mut line = 1u32;
    let mut pos = 0;
    for range in sorted {
        let start = range.start.clamp(pos, bytes.len());
        let end = range.end.clamp(start, bytes.len());
        line += bytes[pos..start].iter().filter(|b| **b == b'\n').count() as u32;
        for &b in &bytes[start..end] {
            if b == b'\n' {
                line += 1;
                lines.insert(line);
            }
        }
        pos = end;
    }
    lines
}

/// Source with comments and literal contents blanked
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaskedSource {
    pub text: String,
    /// Lines that start inside a multi-line comment or literal. Their
    /// indentation says nothing about block structure.
    pub continued_lines: BTreeSet<u32>,
}

impl MaskedSource {
    pub fn is_continued(&self, line: u32) -> bool {
        self.continued_lines.contains(&line)
    }
}

/// Mask comments and string contents of `source`.
///
/// Unterminated comments or literals are anomalies: the caller skips the
/// file rather than guessing where code resumes.
pub fn mask_non_code(source: &str, syntax: &LanguageSyntax) -> Result<MaskedSource, ScanAnomaly> {
    if source.is_empty() {
        return Ok(MaskedSource::default());
    }
    let ranges = Masker {
        src: source.as_bytes(),
        syntax,
        pos: 0,
        ranges: Vec::new(),
    }
    .run()?;
    Ok(MaskedSource {
        text: mask_ranges(source, &ranges),
        continued_lines: continued_lines(source, &ranges),
    })
}
