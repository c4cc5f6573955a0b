//! Test declaration macro scanning
//!
//! Finds `TEST(Suite, Name)`-style invocations in code (never in comments or
//! literals) and extracts the two arguments. Argument lists may span lines;
//! the declaration is located at the line of the macro token.

use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::lexer::{Lexed, is_ident_char, is_ident_start};
use crate::text::SourceText;
use crate::vocabulary::{MacroKind, Vocabulary};

/// A successfully extracted test macro invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroInvocation {
    pub kind: MacroKind,
    /// The macro name as written (may be an alias of `kind`)
    pub macro_name: String,
    pub suite: String,
    pub name: String,
    /// Line of the macro token (1-indexed)
    pub line: usize,
    /// Line of the closing brace of the test body, if a body follows
    pub body_end_line: Option<usize>,
    /// Byte offsets of the body's `{` and `}`
    pub body: Option<(usize, usize)>,
}

/// Output of [`scan_test_macros`]
#[derive(Debug, Clone, Default)]
pub struct MacroScan {
    pub invocations: Vec<MacroInvocation>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Scan a file for test macro invocations
pub fn scan_test_macros(text: &SourceText<'_>, lexed: &Lexed, vocab: &Vocabulary) -> MacroScan {
    let mask = lexed.mask.as_slice();
    let source = text.as_str();
    let mut scan = MacroScan::default();
    let mut i = 0;

    while i < mask.len() {
        if !is_ident_start(mask[i]) || (i > 0 && is_ident_char(mask[i - 1])) {
            i += 1;
            continue;
        }

        let word_start = i;
        let word_end = ident_end(mask, i);
        i = word_end;

        let word = &source[word_start..word_end];
        let Some(kind) = vocab.macro_kind(word) else {
            continue;
        };

        let open = skip_whitespace(mask, word_end);
        if mask.get(open) != Some(&b'(') {
            continue;
        }

        let line = text.line_of(word_start);
        let Some(close) = find_closing_paren(mask, open) else {
            scan.diagnostics.push(Diagnostic::new(
                DiagnosticKind::UnbalancedParens,
                line,
                format!("`{word}(` has no matching `)` before end of file"),
            ));
            i = text.line_end(line) + 1;
            continue;
        };
        i = close + 1;

        let args = split_top_level(mask, open + 1, close);
        let args: Vec<&str> = args
            .iter()
            .map(|&(start, end)| mask_str(mask, start, end).trim())
            .collect();

        match args.as_slice() {
            [suite, name] if is_identifier_like(suite) && is_identifier_like(name) => {
                let body = body_span(mask, close + 1);
                scan.invocations.push(MacroInvocation {
                    kind,
                    macro_name: word.to_string(),
                    suite: suite.to_string(),
                    name: name.to_string(),
                    line,
                    body_end_line: body.map(|(_, end)| text.line_of(end)),
                    body,
                });
            }
            _ => {
                scan.diagnostics.push(Diagnostic::new(
                    DiagnosticKind::MalformedDeclaration,
                    line,
                    format!(
                        "`{word}({})` needs exactly two non-empty arguments",
                        compact(&args.join(","))
                    ),
                ));
            }
        }
    }

    scan
}

fn ident_end(mask: &[u8], start: usize) -> usize {
    mask[start..]
        .iter()
        .position(|&b| !is_ident_char(b))
        .map_or(mask.len(), |p| start + p)
}

fn skip_whitespace(mask: &[u8], from: usize) -> usize {
    mask[from.min(mask.len())..]
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .map_or(mask.len(), |p| from + p)
}

/// Masked bytes between two ASCII delimiters are valid UTF-8
fn mask_str(mask: &[u8], start: usize, end: usize) -> &str {
    std::str::from_utf8(&mask[start..end]).unwrap_or("")
}

/// Find the `)` balancing the `(` at `open`, counting `()` and `{}` depth
fn find_closing_paren(mask: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (idx, &b) in mask.iter().enumerate().skip(open) {
        match b {
            b'(' | b'{' => depth += 1,
            b')' | b'}' => {
                depth -= 1;
                if depth == 0 {
                    return (b == b')').then_some(idx);
                }
            }
            _ => {}
        }
    }
    None
}

/// Split `mask[start..end]` at commas outside `()`, `{}` and `<>`
fn split_top_level(mask: &[u8], start: usize, end: usize) -> Vec<(usize, usize)> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut angle = 0usize;
    let mut part_start = start;

    for (idx, &b) in mask.iter().enumerate().take(end).skip(start) {
        match b {
            b'(' | b'{' => depth += 1,
            b')' | b'}' => depth = depth.saturating_sub(1),
            b'<' => angle += 1,
            b'>' => angle = angle.saturating_sub(1),
            b',' if depth == 0 && angle == 0 => {
                parts.push((part_start, idx));
                part_start = idx + 1;
            }
            _ => {}
        }
    }
    parts.push((part_start, end));
    parts
}

/// `Suite`, `ns::Suite`, `Fixture<int, char>`; no operators or statements
fn is_identifier_like(s: &str) -> bool {
    let Some(first) = s.chars().next() else {
        return false;
    };
    if !(first.is_alphabetic() || first == '_' || first == ':') {
        return false;
    }

    let mut angle = 0usize;
    for c in s.chars() {
        match c {
            '<' => angle += 1,
            '>' => {
                if angle == 0 {
                    return false;
                }
                angle -= 1;
            }
            c if c.is_alphanumeric() || c == '_' || c == ':' => {}
            ',' | '*' | '&' if angle > 0 => {}
            c if c.is_whitespace() && angle > 0 => {}
            _ => return false,
        }
    }
    angle == 0
}

/// If a `{ ... }` body follows the argument list, the offsets of its braces
fn body_span(mask: &[u8], after_args: usize) -> Option<(usize, usize)> {
    let open = skip_whitespace(mask, after_args);
    if mask.get(open) != Some(&b'{') {
        return None;
    }
    let mut depth = 0usize;
    for (idx, &b) in mask.iter().enumerate().skip(open) {
        match b {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some((open, idx));
                }
            }
            _ => {}
        }
    }
    None
}

fn compact(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
