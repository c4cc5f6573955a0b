//! cppscan-core - Traceability extraction from C++ test sources
//!
//! This crate scans C++ text (lexically, without compiling it) for:
//! - GoogleTest-style test declarations (`TEST`, `TEST_F`, `TYPED_TEST_P`, ...)
//!   together with the annotation tags in the comment block directly above
//!   them (`@requirement`, `@test`, `@brief`, `@requiredby`, `@version`,
//!   `@testmethods`, `@defect`; `\requirement` and `\requiredby` also work)
//! - inline `// lobster-trace: ...` and `// lobster-exclude: ...` markers in
//!   any source file, with the function they sit in (resolved from a
//!   tree-sitter C++ parse via `arborium`)
//!
//! Malformed input never aborts a parse. Rejected macros, unknown
//! `@testmethods` values, malformed `@defect` tickets, empty tags and
//! unclosed comments are reported as [`Diagnostic`]s next to the best-effort
//! records.
//!
//! # Features
//!
//! - `walk` - Enable [`WalkSources`] for gitignore-aware directory walking (brings in `ignore` and `globset`)
//! - `parallel` - Parse files in parallel (brings in `rayon`)
//!
//! # Parsing one file
//!
//! ```
//! use cppscan_core::{FileRecords, OutputRecord, Vocabulary};
//!
//! let source = r#"
//! /**
//!  * @requirement CB-#0815, CB-#0816
//!  * @testmethods TM_BOUNDARY
//!  */
//! TEST(FruitTest, Weight) {
//!     // lobster-trace: fruits.Weight
//! }
//! "#;
//!
//! let records = FileRecords::parse_with("fruit_test.cpp", source, &Vocabulary::default());
//! assert_eq!(records.records.len(), 2);
//!
//! let OutputRecord::Declaration(decl) = &records.records[0] else { panic!() };
//! assert_eq!(decl.qualified_name(), "FruitTest.Weight");
//! assert_eq!(
//!     decl.tags.requirement.as_deref(),
//!     Some(&["CB-#0815".to_string(), "CB-#0816".to_string()][..])
//! );
//!
//! let OutputRecord::Marker(marker) = &records.records[1] else { panic!() };
//! assert_eq!(marker.enclosing_symbol.as_deref(), Some("FruitTest.Weight"));
//! assert!(records.diagnostics.is_empty());
//! ```
//!
//! # Many files
//!
//! Any [`Sources`] provider yields an [`Extraction`] with one [`FileRecords`]
//! per file, sorted by path:
//!
//! ```
//! use cppscan_core::{MemorySources, Sources, Vocabulary};
//!
//! let extraction = MemorySources::new()
//!     .add("b_test.cpp", "TEST(B, One) {}")
//!     .add("a_test.cpp", "TEST(A,) {}")
//!     .extract(&Vocabulary::default())
//!     .unwrap();
//!
//! assert_eq!(extraction.declaration_count(), 1);
//! assert_eq!(extraction.diagnostic_count(), 1);
//! ```
//!
//! # Vocabulary
//!
//! Macro names, tag keywords, the `@testmethods` whitelist and the marker
//! literals live in a [`Vocabulary`]. Embedders can install one process-wide
//! instance at startup with [`Vocabulary::install`]; [`FileRecords::parse`]
//! and [`parse_file`] use it.

mod comments;
mod diagnostics;
mod lexer;
mod macros;
mod parse;
mod records;
mod sources;
mod tags;
mod text;
mod trace;
mod vocabulary;

pub use comments::{BlockLine, CommentStyle};
pub use diagnostics::{Diagnostic, DiagnosticKind};
pub use parse::{CommentBlock, ParsedFile, TestDeclaration, parse_file, parse_file_with};
pub use records::{
    DeclarationRecord, DeclarationTags, ExclusionRecord, FileRecords, MarkerRecord, OutputRecord,
};
pub use sources::{
    Extraction, MemorySources, PathSources, SUPPORTED_EXTENSIONS, Sources, is_supported_extension,
};
pub use tags::{AnnotationTag, TagSet, TagValidity};
pub use text::SourceLocation;
pub use trace::{ExcludeMarker, TraceMarker};
pub use vocabulary::{
    DEFAULT_BACKSLASH_KEYWORDS, DEFAULT_EXCLUDE_MARKER, DEFAULT_NO_TRACING_MARKER,
    DEFAULT_TEST_METHODS, DEFAULT_TRACE_MARKER, MacroKind, TagKind, Vocabulary,
};

#[cfg(feature = "walk")]
pub use sources::WalkSources;
