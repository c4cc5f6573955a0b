//! Output records
//!
//! [`FileRecords`] is the ordered, serializable result for one file:
//! declaration, marker and exclusion records interleaved by line (a
//! declaration before a marker on the same line, then parse order) and the
//! file's diagnostics ordered by line. The same text always produces the same
//! value.

use crate::diagnostics::Diagnostic;
use crate::parse::{ParsedFile, TestDeclaration, parse_file_with};
use crate::tags::{AnnotationTag, TagSet};
use crate::trace::{ExcludeMarker, TraceMarker};
use crate::vocabulary::{TagKind, Vocabulary};
use facet::Facet;
use std::path::{Path, PathBuf};

/// Tag values of a declaration; absent tags are `None`
#[derive(Debug, Clone, Default, PartialEq, Eq, Facet)]
pub struct DeclarationTags {
    #[facet(default)]
    pub test: Option<String>,
    #[facet(default)]
    pub brief: Option<String>,
    #[facet(default)]
    pub requirement: Option<Vec<String>>,
    #[facet(default)]
    pub requiredby: Option<Vec<String>>,
    #[facet(default)]
    pub version: Option<Vec<String>>,
    #[facet(default)]
    pub testmethods: Option<Vec<String>>,
    #[facet(default)]
    pub defect: Option<Vec<String>>,
}

impl DeclarationTags {
    fn from_tag_set(tags: &TagSet) -> Self {
        let text = |kind| tags.get(kind).map(AnnotationTag::text);
        let list = |kind| tags.get(kind).map(|t: &AnnotationTag| t.values.clone());
        Self {
            test: text(TagKind::Test),
            brief: text(TagKind::Brief),
            requirement: list(TagKind::Requirement),
            requiredby: list(TagKind::RequiredBy),
            version: list(TagKind::Version),
            testmethods: list(TagKind::TestMethods),
            defect: list(TagKind::Defect),
        }
    }
}

/// A test declaration with its tags
#[derive(Debug, Clone, PartialEq, Eq, Facet)]
pub struct DeclarationRecord {
    /// Canonical macro name, e.g. `TEST_F`
    pub kind: String,
    pub suite: String,
    pub name: String,
    pub line: usize,
    /// Line of the closing brace of the test body
    #[facet(default)]
    pub end_line: Option<usize>,
    pub tags: DeclarationTags,
    /// Tags that are present but empty or had invalid values
    pub invalid_tags: Vec<String>,
    pub no_tracing: bool,
}

impl DeclarationRecord {
    pub fn from_declaration(decl: &TestDeclaration) -> Self {
        Self {
            kind: decl.kind.as_str().to_string(),
            suite: decl.suite.clone(),
            name: decl.name.clone(),
            line: decl.location.line,
            end_line: decl.body_end_line,
            tags: DeclarationTags::from_tag_set(&decl.block.tags),
            invalid_tags: decl
                .block
                .tags
                .invalid_kinds()
                .map(|k| k.as_str().to_string())
                .collect(),
            no_tracing: decl.no_tracing,
        }
    }

    /// `Suite.Name`
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.suite, self.name)
    }
}

/// An inline trace marker
#[derive(Debug, Clone, PartialEq, Eq, Facet)]
pub struct MarkerRecord {
    pub tags: Vec<String>,
    pub line: usize,
    #[facet(default)]
    pub enclosing_symbol: Option<String>,
}

impl MarkerRecord {
    pub fn from_marker(marker: &TraceMarker) -> Self {
        Self {
            tags: marker.tags.clone(),
            line: marker.line,
            enclosing_symbol: marker.enclosing.clone(),
        }
    }
}

/// Code deliberately left untraced
#[derive(Debug, Clone, PartialEq, Eq, Facet)]
pub struct ExclusionRecord {
    pub justification: String,
    pub line: usize,
    #[facet(default)]
    pub enclosing_symbol: Option<String>,
}

impl ExclusionRecord {
    pub fn from_marker(marker: &ExcludeMarker) -> Self {
        Self {
            justification: marker.justification.clone(),
            line: marker.line,
            enclosing_symbol: marker.enclosing.clone(),
        }
    }
}

/// One emitted record
#[derive(Debug, Clone, PartialEq, Eq, Facet)]
#[facet(rename_all = "lowercase")]
#[repr(u8)]
pub enum OutputRecord {
    Declaration(DeclarationRecord),
    Marker(MarkerRecord),
    Exclusion(ExclusionRecord),
}

impl OutputRecord {
    pub fn line(&self) -> usize {
        match self {
            OutputRecord::Declaration(d) => d.line,
            OutputRecord::Marker(m) => m.line,
            OutputRecord::Exclusion(e) => e.line,
        }
    }

    pub fn as_declaration(&self) -> Option<&DeclarationRecord> {
        match self {
            OutputRecord::Declaration(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_marker(&self) -> Option<&MarkerRecord> {
        match self {
            OutputRecord::Marker(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_exclusion(&self) -> Option<&ExclusionRecord> {
        match self {
            OutputRecord::Exclusion(e) => Some(e),
            _ => None,
        }
    }
}

/// Ordered records and diagnostics of one file
#[derive(Debug, Clone, PartialEq, Eq, Facet)]
pub struct FileRecords {
    pub file: PathBuf,
    pub records: Vec<OutputRecord>,
    pub diagnostics: Vec<Diagnostic>,
}

impl FileRecords {
    /// Parse and emit one file with the process-wide vocabulary
    pub fn parse(path: impl AsRef<Path>, content: &str) -> Self {
        Self::parse_with(path, content, Vocabulary::global())
    }

    /// Parse and emit one file with an explicit vocabulary
    pub fn parse_with(path: impl AsRef<Path>, content: &str, vocab: &Vocabulary) -> Self {
        Self::from_parsed(parse_file_with(path, content, vocab))
    }

    pub fn from_parsed(parsed: ParsedFile) -> Self {
        let declarations = parsed
            .declarations
            .iter()
            .map(|d| (0u8, OutputRecord::Declaration(DeclarationRecord::from_declaration(d))));
        let markers = parsed
            .markers
            .iter()
            .map(|m| (1u8, OutputRecord::Marker(MarkerRecord::from_marker(m))));
        let exclusions = parsed
            .excludes
            .iter()
            .map(|e| (1u8, OutputRecord::Exclusion(ExclusionRecord::from_marker(e))));

        // Stable sort keeps parse order within equal keys
        let mut keyed: Vec<(u8, OutputRecord)> =
            declarations.chain(markers).chain(exclusions).collect();
        keyed.sort_by_key(|(rank, record)| (record.line(), *rank));

        let mut diagnostics = parsed.diagnostics;
        diagnostics.sort_by_key(|d| d.line);

        Self {
            file: parsed.path,
            records: keyed.into_iter().map(|(_, record)| record).collect(),
            diagnostics,
        }
    }

    pub fn declarations(&self) -> impl Iterator<Item = &DeclarationRecord> {
        self.records.iter().filter_map(OutputRecord::as_declaration)
    }

    pub fn markers(&self) -> impl Iterator<Item = &MarkerRecord> {
        self.records.iter().filter_map(OutputRecord::as_marker)
    }

    pub fn exclusions(&self) -> impl Iterator<Item = &ExclusionRecord> {
        self.records.iter().filter_map(OutputRecord::as_exclusion)
    }
}
