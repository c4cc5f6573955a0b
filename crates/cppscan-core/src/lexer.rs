//! C++ lexer for separating comments and literals from code
//!
//! This is a single forward pass that knows just enough C++ to tell code from
//! comments and string/character literals. It produces the list of comments
//! and a *code mask*: a byte copy of the file where comment and literal bytes
//! are blanked to spaces. Newlines survive masking, so offsets and line
//! numbers in the mask match the source exactly.

use crate::diagnostics::{Diagnostic, DiagnosticKind};

/// Comment delimiter style
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentKind {
    /// `// ...` up to end of line
    Line,
    /// `/* ... */`
    Block,
}

/// A comment found in source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub kind: CommentKind,
    /// Byte offset of the opening delimiter
    pub start: usize,
    /// Byte offset just past the comment (past `*/` for terminated blocks)
    pub end: usize,
    /// Line of the opening delimiter (1-indexed)
    pub line: usize,
    /// Whether a block comment found its `*/`
    pub terminated: bool,
}

impl Comment {
    /// Comment text without the delimiters
    pub fn body<'a>(&self, source: &'a str) -> &'a str {
        let start = (self.start + 2).min(self.end);
        let end = match self.kind {
            CommentKind::Block if self.terminated => self.end - 2,
            _ => self.end,
        };
        &source[start..end.max(start)]
    }

    /// `///` and `/** */` (also `//!` and `/*! */`) comments
    pub fn is_doc(&self, source: &str) -> bool {
        let body = self.body(source);
        match self.kind {
            CommentKind::Line => {
                (body.starts_with('/') && !body.starts_with("//")) || body.starts_with('!')
            }
            CommentKind::Block => {
                (body.starts_with('*') && !body.starts_with("*/")) || body.starts_with('!')
            }
        }
    }

    pub fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }
}

/// Result of lexing one file
#[derive(Debug, Clone)]
pub struct Lexed {
    /// Source bytes with comments and literals blanked
    pub mask: Vec<u8>,
    /// Comments in source order
    pub comments: Vec<Comment>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Lexed {
    /// Index of the comment covering the byte offset, if any
    pub fn comment_at(&self, offset: usize) -> Option<usize> {
        let idx = self.comments.partition_point(|c| c.start <= offset);
        let idx = idx.checked_sub(1)?;
        self.comments[idx].contains(offset).then_some(idx)
    }
}

pub(crate) fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

pub(crate) fn is_ident_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Lex a whole file
pub fn lex(source: &str) -> Lexed {
    let bytes = source.as_bytes();
    let mut lexer = Lexer {
        bytes,
        mask: bytes.to_vec(),
        comments: Vec::new(),
        diagnostics: Vec::new(),
        line: 1,
    };
    lexer.run();
    Lexed {
        mask: lexer.mask,
        comments: lexer.comments,
        diagnostics: lexer.diagnostics,
    }
}

struct Lexer<'a> {
    bytes: &'a [u8],
    mask: Vec<u8>,
    comments: Vec<Comment>,
    diagnostics: Vec<Diagnostic>,
    line: usize,
}

impl Lexer<'_> {
    fn run(&mut self) {
        let mut i = 0;
        while i < self.bytes.len() {
            i = match (self.bytes[i], self.bytes.get(i + 1)) {
                (b'\n', _) => {
                    self.line += 1;
                    i + 1
                }
                (b'/', Some(b'/')) => self.line_comment(i),
                (b'/', Some(b'*')) => self.block_comment(i),
                (b'"', _) if self.is_raw_string_prefix(i) => self.raw_string(i),
                (b'"', _) => self.quoted(i, b'"'),
                (b'\'', _) if !self.is_digit_separator(i) => self.quoted(i, b'\''),
                _ => i + 1,
            };
        }
    }

    fn end_of_line(&self, from: usize) -> usize {
        self.bytes[from..]
            .iter()
            .position(|&b| b == b'\n')
            .map_or(self.bytes.len(), |p| from + p)
    }

    /// Blank a byte range, keeping newlines and counting them
    fn blank(&mut self, start: usize, end: usize) {
        for idx in start..end {
            if self.mask[idx] == b'\n' {
                self.line += 1;
            } else {
                self.mask[idx] = b' ';
            }
        }
    }

    fn line_comment(&mut self, start: usize) -> usize {
        let end = self.end_of_line(start);
        self.comments.push(Comment {
            kind: CommentKind::Line,
            start,
            end,
            line: self.line,
            terminated: true,
        });
        self.blank(start, end);
        end
    }

    fn block_comment(&mut self, start: usize) -> usize {
        let line = self.line;
        let close = self.bytes[start + 2..]
            .windows(2)
            .position(|w| w == b"*/")
            .map(|p| start + 2 + p + 2);

        let (end, terminated) = match close {
            Some(end) => (end, true),
            None => {
                self.diagnostics.push(Diagnostic::new(
                    DiagnosticKind::UnterminatedComment,
                    line,
                    "block comment is never closed with `*/`",
                ));
                (self.end_of_line(start), false)
            }
        };

        self.comments.push(Comment {
            kind: CommentKind::Block,
            start,
            end,
            line,
            terminated,
        });
        self.blank(start, end);
        end
    }

    /// `R"`, `LR"`, `uR"`, `UR"`, `u8R"`
    fn is_raw_string_prefix(&self, quote: usize) -> bool {
        if quote == 0 || self.bytes[quote - 1] != b'R' {
            return false;
        }
        let mut start = quote - 1;
        while start > 0 && is_ident_char(self.bytes[start - 1]) {
            start -= 1;
        }
        matches!(&self.bytes[start..quote], b"R" | b"LR" | b"uR" | b"UR" | b"u8R")
    }

    fn raw_string(&mut self, quote: usize) -> usize {
        let delim_end = self.bytes[quote + 1..]
            .iter()
            .take(17)
            .position(|&b| b == b'(')
            .map(|p| quote + 1 + p);

        let Some(open) = delim_end else {
            // Not a well-formed raw string; treat as an ordinary literal
            return self.quoted(quote, b'"');
        };
        let delimiter = &self.bytes[quote + 1..open];
        if delimiter
            .iter()
            .any(|&b| b.is_ascii_whitespace() || b == b'\\' || b == b')')
        {
            return self.quoted(quote, b'"');
        }

        let mut closing = Vec::with_capacity(delimiter.len() + 2);
        closing.push(b')');
        closing.extend_from_slice(delimiter);
        closing.push(b'"');

        let end = self.bytes[open + 1..]
            .windows(closing.len())
            .position(|w| w == closing.as_slice())
            .map_or_else(
                || self.end_of_line(quote),
                |p| open + 1 + p + closing.len(),
            );
        self.blank(quote, end);
        end
    }

    /// Ordinary string or character literal; ends at end of line if unterminated
    fn quoted(&mut self, open: usize, quote: u8) -> usize {
        let mut idx = open + 1;
        let end = loop {
            match self.bytes.get(idx) {
                None => break self.bytes.len(),
                Some(b'\n') => break idx,
                Some(b'\\') => idx += 2,
                Some(&b) if b == quote => break idx + 1,
                Some(_) => idx += 1,
            }
        };
        let end = end.min(self.bytes.len());
        self.blank(open, end);
        end
    }

    /// `1'000'000` and `0xFF'FF`: a quote inside a number literal
    fn is_digit_separator(&self, quote: usize) -> bool {
        let mut start = quote;
        while start > 0 && (is_ident_char(self.bytes[start - 1]) || self.bytes[start - 1] == b'\'')
        {
            start -= 1;
        }
        start < quote && self.bytes[start].is_ascii_digit()
    }
}
