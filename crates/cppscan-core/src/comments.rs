//! Collecting the comment block directly above a test declaration
//!
//! Every line of the file is classified once into a [`LineTable`]; the
//! backward walk from a declaration is then a pure lookup over that table.

use crate::lexer::{CommentKind, Lexed};
use crate::text::SourceText;
use facet::Facet;

/// Comment style of a tag block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Facet)]
#[repr(u8)]
pub enum CommentStyle {
    /// A run of `///` lines
    DocLine,
    /// A run of `//` lines
    PlainLine,
    /// A single `/** ... */` block
    DocBlock,
    /// A single `/* ... */` block
    PlainBlock,
}

/// One line of comment content with its delimiters stripped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockLine {
    /// Line number (1-indexed)
    pub line: usize,
    /// Trimmed content
    pub text: String,
}

impl BlockLine {
    pub fn new(line: usize, text: impl Into<String>) -> Self {
        Self {
            line,
            text: text.into(),
        }
    }
}

/// What a physical line is, as far as block collection cares
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineClass {
    Blank,
    /// Line starts with a `//` comment
    LineComment { doc: bool },
    /// Line ends a block comment that begins its own first line
    BlockEnd { comment: usize },
    /// Code, or a comment mixed with code
    Other,
}

/// Classification of every line in a file, indexed by line number
#[derive(Debug, Clone)]
pub struct LineTable {
    classes: Vec<LineClass>,
}

impl LineTable {
    pub fn build(text: &SourceText<'_>, lexed: &Lexed) -> Self {
        let source = text.as_str();
        let classes = (1..=text.line_count())
            .map(|line| classify(text, lexed, source, line))
            .collect();
        Self { classes }
    }

    /// Class of a 1-based line; lines outside the file are blank
    pub fn class(&self, line: usize) -> LineClass {
        line.checked_sub(1)
            .and_then(|idx| self.classes.get(idx))
            .copied()
            .unwrap_or(LineClass::Blank)
    }
}

fn classify(text: &SourceText<'_>, lexed: &Lexed, source: &str, line: usize) -> LineClass {
    let start = text.line_start(line);
    let content = text.line(line);
    let Some(first) = content.find(|c: char| !c.is_whitespace()) else {
        return LineClass::Blank;
    };
    let first = start + first;
    let last = start + content.trim_end().len() - 1;

    if let Some(idx) = lexed.comment_at(first) {
        let comment = &lexed.comments[idx];
        if comment.kind == CommentKind::Line && comment.start == first {
            return LineClass::LineComment {
                doc: comment.is_doc(source),
            };
        }
    }

    if let Some(idx) = lexed.comment_at(last) {
        let comment = &lexed.comments[idx];
        let opens_its_line = {
            let open_line = text.line_of(comment.start);
            let open_start = text.line_start(open_line);
            source[open_start..comment.start].trim().is_empty()
        };
        if comment.kind == CommentKind::Block
            && comment.terminated
            && comment.end == last + 1
            && opens_its_line
        {
            return LineClass::BlockEnd { comment: idx };
        }
    }

    LineClass::Other
}

/// Collect the comment block directly above `decl_line`.
///
/// Returns `None` when the line above is blank or code. Line-comment runs stop
/// at a blank line, a change between `//` and `///`, or code; block comments
/// contribute exactly one block.
pub fn collect_block(
    table: &LineTable,
    text: &SourceText<'_>,
    lexed: &Lexed,
    decl_line: usize,
) -> Option<(CommentStyle, Vec<BlockLine>)> {
    let above = decl_line.checked_sub(1).filter(|&line| line >= 1)?;

    match table.class(above) {
        LineClass::LineComment { doc } => {
            let mut first = above;
            while first > 1 && table.class(first - 1) == (LineClass::LineComment { doc }) {
                first -= 1;
            }
            let style = if doc {
                CommentStyle::DocLine
            } else {
                CommentStyle::PlainLine
            };
            let lines = (first..=above)
                .map(|line| BlockLine::new(line, strip_line_comment(text.line(line))))
                .collect();
            Some((style, lines))
        }
        LineClass::BlockEnd { comment } => {
            let comment = &lexed.comments[comment];
            let source = text.as_str();
            let doc = comment.is_doc(source);
            let body = comment.body(source);
            // Drop the extra `*` of `/**` or the `!` of `/*!`
            let body = if doc { &body[1..] } else { body };
            let style = if doc {
                CommentStyle::DocBlock
            } else {
                CommentStyle::PlainBlock
            };
            let lines = body
                .split('\n')
                .enumerate()
                .map(|(offset, raw)| BlockLine::new(comment.line + offset, strip_block_line(raw)))
                .collect();
            Some((style, lines))
        }
        LineClass::Blank | LineClass::Other => None,
    }
}

fn strip_line_comment(line: &str) -> &str {
    let trimmed = line.trim();
    let body = trimmed
        .strip_prefix("///")
        .or_else(|| trimmed.strip_prefix("//!"))
        .or_else(|| trimmed.strip_prefix("//"))
        .unwrap_or(trimmed);
    body.trim()
}

fn strip_block_line(line: &str) -> &str {
    let trimmed = line.trim();
    match trimmed.strip_prefix('*') {
        Some(rest) => rest.trim(),
        None => trimmed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;

    fn collect(source: &str, decl_line: usize) -> Option<(CommentStyle, Vec<String>)> {
        let text = SourceText::new(source);
        let lexed = lex(source);
        let table = LineTable::build(&text, &lexed);
        collect_block(&table, &text, &lexed, decl_line)
            .map(|(style, lines)| (style, lines.into_iter().map(|l| l.text).collect()))
    }

    #[test]
    fn test_doc_line_run() {
        let source = "///\n/// @requirement CB-#0815\n///\nTEST(A, B) {}\n";
        let (style, lines) = collect(source, 4).expect("block");
        assert_eq!(style, CommentStyle::DocLine);
        assert_eq!(lines, vec!["", "@requirement CB-#0815", ""]);
    }

    #[test]
    fn test_blank_line_breaks_run() {
        let source = "/// @brief detached\n\n/// @requirement CB-#1\nTEST(A, B) {}\n";
        let (_, lines) = collect(source, 4).expect("block");
        assert_eq!(lines, vec!["@requirement CB-#1"]);
    }

    #[test]
    fn test_style_change_breaks_run() {
        let source = "// plain\n/// doc\nTEST(A, B) {}\n";
        let (style, lines) = collect(source, 3).expect("block");
        assert_eq!(style, CommentStyle::DocLine);
        assert_eq!(lines, vec!["doc"]);
    }

    #[test]
    fn test_plain_line_run_with_empty_markers() {
        let source = "\
// You know what?
// @requirement CB-#0815 CB-#0816
TEST(A, B) {}
";
        let (style, lines) = collect(source, 3).expect("block");
        assert_eq!(style, CommentStyle::PlainLine);
        assert_eq!(lines, vec!["You know what?", "@requirement CB-#0815 CB-#0816"]);
    }

    #[test]
    fn test_doc_block() {
        let source = "\
/**
 * @requirement CB-#0815, CB-#0816,
 * \t\t\t\tCB-#0817
 */
TEST(X, Y) {}
";
        let (style, lines) = collect(source, 5).expect("block");
        assert_eq!(style, CommentStyle::DocBlock);
        assert_eq!(
            lines,
            vec!["", "@requirement CB-#0815, CB-#0816,", "CB-#0817", ""]
        );
    }

    #[test]
    fn test_single_line_doc_block() {
        let (style, lines) = collect("/** @requirement CB-#1 CB-#2 */\nTEST(A, B) {}", 2).unwrap();
        assert_eq!(style, CommentStyle::DocBlock);
        assert_eq!(lines, vec!["@requirement CB-#1 CB-#2"]);
    }

    #[test]
    fn test_only_one_block_taken() {
        let source = "/* first */\n/* second */\nTEST(A, B) {}";
        let (style, lines) = collect(source, 3).unwrap();
        assert_eq!(style, CommentStyle::PlainBlock);
        assert_eq!(lines, vec!["second"]);
    }

    #[test]
    fn test_code_above_gives_no_block() {
        assert!(collect("int x = 0;\nTEST(A, B) {}", 2).is_none());
        assert!(collect("int x = 0; // trailing\nTEST(A, B) {}", 2).is_none());
        assert!(collect("int x; /* trailing */\nTEST(A, B) {}", 2).is_none());
        assert!(collect("// comment\n\nTEST(A, B) {}", 3).is_none());
        assert!(collect("TEST(A, B) {}", 1).is_none());
    }

    #[test]
    fn test_line_numbers_are_kept() {
        let source = "\n\n/**\n * @brief hello\n */\nTEST(A, B) {}";
        let text = SourceText::new(source);
        let lexed = lex(source);
        let table = LineTable::build(&text, &lexed);
        let (_, lines) = collect_block(&table, &text, &lexed, 6).unwrap();
        let numbers: Vec<usize> = lines.iter().map(|l| l.line).collect();
        assert_eq!(numbers, vec![3, 4, 5]);
    }
}
