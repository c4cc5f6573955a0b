//! Per-file extraction pipeline
//!
//! Lexes the file once, then runs the macro scanner and the marker scanner over
//! the same lexed text. Every declaration gets the comment block directly
//! above it, parsed into tags.

use crate::comments::{BlockLine, CommentStyle, LineTable, collect_block};
use crate::diagnostics::Diagnostic;
use crate::lexer::lex;
use crate::macros::scan_test_macros;
use crate::tags::{TagSet, parse_tags};
use crate::text::{SourceLocation, SourceText};
use crate::trace::{ExcludeMarker, TraceMarker, scan_markers};
use crate::vocabulary::{MacroKind, Vocabulary};
use std::path::{Path, PathBuf};

/// The tag block attached to a declaration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommentBlock {
    /// `None` when nothing comments the declaration
    pub style: Option<CommentStyle>,
    /// Stripped lines, oldest first
    pub lines: Vec<BlockLine>,
    pub tags: TagSet,
}

impl CommentBlock {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Whether any line of the block contains `needle`
    pub fn mentions(&self, needle: &str) -> bool {
        self.lines.iter().any(|l| l.text.contains(needle))
    }
}

/// A test declared with one of the test macros
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestDeclaration {
    pub kind: MacroKind,
    /// Macro name as written
    pub macro_name: String,
    pub suite: String,
    pub name: String,
    /// Location of the macro token
    pub location: SourceLocation,
    /// Line of the closing brace of the test body
    pub body_end_line: Option<usize>,
    pub block: CommentBlock,
    /// The tag block opts the test out of tracing
    pub no_tracing: bool,
}

/// Everything extracted from one file, before ordering into records
#[derive(Debug, Clone, Default)]
pub struct ParsedFile {
    pub path: PathBuf,
    pub declarations: Vec<TestDeclaration>,
    pub markers: Vec<TraceMarker>,
    pub excludes: Vec<ExcludeMarker>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Parse one file with the process-wide vocabulary
pub fn parse_file(path: impl AsRef<Path>, content: &str) -> ParsedFile {
    parse_file_with(path, content, Vocabulary::global())
}

/// Parse one file with an explicit vocabulary
pub fn parse_file_with(path: impl AsRef<Path>, content: &str, vocab: &Vocabulary) -> ParsedFile {
    let path = path.as_ref();
    let text = SourceText::new(content);
    let lexed = lex(content);
    let table = LineTable::build(&text, &lexed);

    let scan = scan_test_macros(&text, &lexed, vocab);
    let markers = scan_markers(&text, &lexed, &scan.invocations, vocab);
    let mut diagnostics = lexed.diagnostics.clone();
    diagnostics.extend(scan.diagnostics);

    let declarations: Vec<TestDeclaration> = scan
        .invocations
        .into_iter()
        .map(|inv| {
            let block = match collect_block(&table, &text, &lexed, inv.line) {
                Some((style, lines)) => {
                    let (tags, tag_diagnostics) = parse_tags(&lines, vocab);
                    diagnostics.extend(tag_diagnostics);
                    CommentBlock {
                        style: Some(style),
                        lines,
                        tags,
                    }
                }
                None => CommentBlock::empty(),
            };
            let no_tracing = block.mentions(vocab.no_tracing_marker());

            TestDeclaration {
                kind: inv.kind,
                macro_name: inv.macro_name,
                suite: inv.suite,
                name: inv.name,
                location: SourceLocation::new(path, inv.line),
                body_end_line: inv.body_end_line,
                block,
                no_tracing,
            }
        })
        .collect();

    tracing::debug!(
        path = %path.display(),
        declarations = declarations.len(),
        markers = markers.traces.len(),
        excludes = markers.excludes.len(),
        diagnostics = diagnostics.len(),
        "parsed file"
    );

    ParsedFile {
        path: path.to_path_buf(),
        declarations,
        markers: markers.traces,
        excludes: markers.excludes,
        diagnostics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::DiagnosticKind;
    use crate::vocabulary::TagKind;
    use indoc::indoc;

    fn parse(content: &str) -> ParsedFile {
        parse_file_with("test.cpp", content, &Vocabulary::default())
    }

    #[test]
    fn test_declaration_gets_block_and_tags() {
        let parsed = parse(indoc! {"
            /**
             * @requirement CB-#0815, CB-#0816,
             * \t\t\t\tCB-#0817
             * @requirement CB-#0818 CB-#0819
             * \t\t\t\tCB-#0820
             */
            TEST(X, Y) {}
        "});
        assert_eq!(parsed.declarations.len(), 1);
        let decl = &parsed.declarations[0];
        assert_eq!(decl.location, SourceLocation::new("test.cpp", 7));
        assert_eq!(decl.block.style, Some(CommentStyle::DocBlock));
        assert_eq!(
            decl.block.tags.get(TagKind::Requirement).unwrap().values,
            vec!["CB-#0815", "CB-#0816", "CB-#0817", "CB-#0818", "CB-#0819", "CB-#0820"]
        );
        assert!(parsed.diagnostics.is_empty());
    }

    #[test]
    fn test_declaration_without_comment_has_empty_block() {
        let parsed = parse("int x;\nTEST(A, B) {}\n");
        let decl = &parsed.declarations[0];
        assert!(decl.block.is_empty());
        assert_eq!(decl.block.style, None);
        assert!(decl.block.tags.is_empty());
    }

    #[test]
    fn test_no_tracing_flag() {
        let parsed = parse(indoc! {"
            // NOTRACING
            TEST(Skipped, Test) {}

            TEST(Traced, Test) {}
        "});
        assert_eq!(parsed.declarations.len(), 2);
        assert!(parsed.declarations[0].no_tracing);
        assert!(!parsed.declarations[1].no_tracing);
    }

    #[test]
    fn test_diagnostics_from_every_stage() {
        let parsed = parse(indoc! {"
            TEST(Broken,) {}
            /// @testmethods TM_NOPE
            TEST(A, B) {}
            /* never closed
        "});
        let kinds: Vec<DiagnosticKind> = parsed.diagnostics.iter().map(|d| d.kind).collect();
        assert!(kinds.contains(&DiagnosticKind::MalformedDeclaration));
        assert!(kinds.contains(&DiagnosticKind::InvalidEnumValue));
        assert!(kinds.contains(&DiagnosticKind::UnterminatedComment));
        assert_eq!(parsed.declarations.len(), 1);
    }

    #[test]
    fn test_markers_alongside_declarations() {
        let parsed = parse(indoc! {"
            TEST(Suite, Name) {
                // lobster-trace: req.One
            }
        "});
        assert_eq!(parsed.markers.len(), 1);
        assert_eq!(parsed.markers[0].enclosing.as_deref(), Some("Suite.Name"));
        assert_eq!(parsed.declarations[0].body_end_line, Some(3));
    }

    #[test]
    fn test_defect_and_exclude() {
        let parsed = parse(indoc! {"
            /// @defect CB-#12, OCT-#34
            TEST(Regression, Fixed) {
                // lobster-exclude: fixture setup only
            }
        "});
        assert_eq!(
            parsed.declarations[0].block.tags.get(TagKind::Defect).unwrap().values,
            vec!["CB-#12", "OCT-#34"]
        );
        assert!(parsed.markers.is_empty());
        assert_eq!(parsed.excludes.len(), 1);
        assert_eq!(parsed.excludes[0].enclosing.as_deref(), Some("Regression.Fixed"));
    }
}
