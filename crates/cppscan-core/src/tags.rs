//! Annotation tag parsing
//!
//! Turns the stripped lines of a tag block into a [`TagSet`]. Parsing is a
//! left-to-right fold over the lines carrying an explicit [`ParserState`]:
//! a line that starts with a keyword opens (or re-opens) that tag, any other
//! line continues the most recently opened tag, and lines before the first
//! keyword are dropped.

use crate::comments::BlockLine;
use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::vocabulary::{TagKind, Vocabulary};
use std::collections::BTreeMap;

/// Whether a recorded tag is usable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagValidity {
    Valid,
    /// The keyword is present but normalized to no value
    Empty,
    /// Some `@testmethods` tokens were outside the whitelist and dropped
    InvalidEnumValue,
    /// Some `@defect` tokens were not ticket references and dropped
    InvalidTicketReference,
}

/// One annotation tag of a tag block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationTag {
    pub kind: TagKind,
    /// Tokens for list tags; a single string for free-text tags (none if empty)
    pub values: Vec<String>,
    pub validity: TagValidity,
    /// First and last line that contributed text (1-indexed)
    pub first_line: usize,
    pub last_line: usize,
}

impl AnnotationTag {
    pub fn is_valid(&self) -> bool {
        self.validity == TagValidity::Valid
    }

    /// Free-text value (values joined; empty string for an empty tag)
    pub fn text(&self) -> String {
        self.values.join(" ")
    }
}

/// Tags of one block, keyed by kind
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSet {
    tags: BTreeMap<TagKind, AnnotationTag>,
}

impl TagSet {
    pub fn get(&self, kind: TagKind) -> Option<&AnnotationTag> {
        self.tags.get(&kind)
    }

    pub fn contains(&self, kind: TagKind) -> bool {
        self.tags.contains_key(&kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AnnotationTag> {
        self.tags.values()
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Tag kinds flagged invalid, in kind order
    pub fn invalid_kinds(&self) -> impl Iterator<Item = TagKind> + '_ {
        self.tags.values().filter(|t| !t.is_valid()).map(|t| t.kind)
    }
}

/// Fold state: which tag receives continuation lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParserState {
    NoTagOpen,
    TagOpen(TagKind),
}

#[derive(Debug, Clone)]
struct Accumulator {
    /// Non-empty text pieces with their line
    pieces: Vec<(usize, String)>,
    first_line: usize,
    last_line: usize,
}

impl Accumulator {
    fn new(line: usize) -> Self {
        Self {
            pieces: Vec::new(),
            first_line: line,
            last_line: line,
        }
    }

    fn push(mut self, text: &str, line: usize) -> Self {
        let text = text.trim();
        if !text.is_empty() {
            self.pieces.push((line, text.to_string()));
            self.last_line = line;
        }
        self
    }
}

type Accumulators = BTreeMap<TagKind, Accumulator>;

/// A piece of a line: continuation text, or text following a keyword
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment<'a> {
    Continue(&'a str),
    Open(TagKind, &'a str),
}

/// Parse a tag block into tags, reporting empty and invalid values
pub fn parse_tags(lines: &[BlockLine], vocab: &Vocabulary) -> (TagSet, Vec<Diagnostic>) {
    let (_, accumulators) = lines.iter().fold(
        (ParserState::NoTagOpen, Accumulators::new()),
        |(state, accs), line| {
            segments(&line.text, vocab)
                .into_iter()
                .fold((state, accs), |(state, accs), segment| {
                    step(state, accs, segment, line.line)
                })
        },
    );

    let mut diagnostics = Vec::new();
    let tags = accumulators
        .into_iter()
        .map(|(kind, acc)| (kind, finish(kind, acc, vocab, &mut diagnostics)))
        .collect();

    (TagSet { tags }, diagnostics)
}

fn step(
    state: ParserState,
    mut accs: Accumulators,
    segment: Segment<'_>,
    line: usize,
) -> (ParserState, Accumulators) {
    match (segment, state) {
        (Segment::Open(kind, text), _) => {
            let acc = accs.remove(&kind).unwrap_or_else(|| Accumulator::new(line));
            accs.insert(kind, acc.push(text, line));
            (ParserState::TagOpen(kind), accs)
        }
        (Segment::Continue(text), ParserState::TagOpen(kind)) => {
            if let Some(acc) = accs.remove(&kind) {
                accs.insert(kind, acc.push(text, line));
            }
            (state, accs)
        }
        (Segment::Continue(_), ParserState::NoTagOpen) => (state, accs),
    }
}

/// Split a line at keywords that start it or follow whitespace or a comma
fn segments<'a>(text: &'a str, vocab: &Vocabulary) -> Vec<Segment<'a>> {
    let mut openings: Vec<(usize, usize, TagKind)> = Vec::new();
    let mut prev: Option<char> = None;

    for (idx, c) in text.char_indices() {
        let at_boundary = prev.is_none_or(|p| p.is_whitespace() || p == ',');
        prev = Some(c);
        if !at_boundary {
            continue;
        }
        let rest = &text[idx..];
        let found = vocab.tag_keywords().find(|(keyword, _)| {
            rest.strip_prefix(keyword)
                .is_some_and(|after| after.chars().next().is_none_or(|n| !is_word_char(n)))
        });
        if let Some((keyword, kind)) = found {
            openings.push((idx, idx + keyword.len(), kind));
        }
    }

    let mut segments = Vec::new();
    let head_end = openings.first().map_or(text.len(), |&(start, _, _)| start);
    let head = &text[..head_end];
    if !head.trim().is_empty() {
        segments.push(Segment::Continue(head));
    }
    for (i, &(_, value_start, kind)) in openings.iter().enumerate() {
        let value_end = openings
            .get(i + 1)
            .map_or(text.len(), |&(next_start, _, _)| next_start);
        segments.push(Segment::Open(kind, &text[value_start..value_end]));
    }
    segments
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn finish(
    kind: TagKind,
    acc: Accumulator,
    vocab: &Vocabulary,
    diagnostics: &mut Vec<Diagnostic>,
) -> AnnotationTag {
    let line = acc.first_line;

    let (values, validity) = if kind.is_list() {
        let tokens: Vec<(usize, &str)> = acc
            .pieces
            .iter()
            .flat_map(|(line, text)| tokenize(text).map(move |token| (*line, token)))
            .collect();
        match kind {
            TagKind::TestMethods => retain_valid(
                tokens,
                |t| vocab.is_test_method(t),
                (DiagnosticKind::InvalidEnumValue, TagValidity::InvalidEnumValue),
                "is not a recognized test method",
                diagnostics,
            ),
            TagKind::Defect => retain_valid(
                tokens,
                is_ticket_reference,
                (
                    DiagnosticKind::InvalidTicketReference,
                    TagValidity::InvalidTicketReference,
                ),
                "is not a defect ticket like `CB-#123` or `OCT-#456`",
                diagnostics,
            ),
            TagKind::Requirement => (
                tokens
                    .into_iter()
                    .map(|(_, t)| normalize_requirement(t, vocab))
                    .collect(),
                TagValidity::Valid,
            ),
            _ => (
                tokens.into_iter().map(|(_, t)| t.to_string()).collect(),
                TagValidity::Valid,
            ),
        }
    } else {
        let text = acc
            .pieces
            .iter()
            .flat_map(|(_, text)| text.split_whitespace())
            .collect::<Vec<_>>()
            .join(" ");
        let values = if text.is_empty() { Vec::new() } else { vec![text] };
        (values, TagValidity::Valid)
    };

    let validity = if values.is_empty() && validity == TagValidity::Valid {
        diagnostics.push(Diagnostic::new(
            DiagnosticKind::EmptyTagValue,
            line,
            format!("`{}` has no value", kind.keyword()),
        ));
        TagValidity::Empty
    } else {
        validity
    };

    AnnotationTag {
        kind,
        values,
        validity,
        first_line: acc.first_line,
        last_line: acc.last_line,
    }
}

/// Split list-tag text on commas and whitespace runs, dropping empty tokens
fn tokenize(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty())
}

/// Keep accepted tokens in order; each rejected token gets a diagnostic on
/// the line it was written
fn retain_valid(
    tokens: Vec<(usize, &str)>,
    accept: impl Fn(&str) -> bool,
    (kind, invalid): (DiagnosticKind, TagValidity),
    reason: &str,
    diagnostics: &mut Vec<Diagnostic>,
) -> (Vec<String>, TagValidity) {
    let mut valid = Vec::new();
    let mut rejected = false;

    for (line, token) in tokens {
        if accept(token) {
            valid.push(token.to_string());
        } else {
            rejected = true;
            diagnostics.push(Diagnostic::new(kind, line, format!("`{token}` {reason}")));
        }
    }

    let validity = if rejected { invalid } else { TagValidity::Valid };
    (valid, validity)
}

/// Short ticket form, e.g. `CB-#0815` or `OCT-#12`
fn is_ticket_reference(token: &str) -> bool {
    token.split_once("-#").is_some_and(|(prefix, number)| {
        !prefix.is_empty()
            && prefix.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
            && !number.is_empty()
            && number.chars().all(|c| c.is_ascii_digit())
    })
}

fn normalize_requirement(token: &str, vocab: &Vocabulary) -> String {
    let Some(base) = vocab.requirement_url_base() else {
        return token.to_string();
    };
    let number = token
        .strip_prefix(base)
        .and_then(|rest| rest.strip_prefix("/issue/"))
        .filter(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()));
    match number {
        Some(number) => format!("CB-#{number}"),
        None => token.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(lines: &[&str]) -> Vec<BlockLine> {
        lines
            .iter()
            .enumerate()
            .map(|(i, text)| BlockLine::new(i + 1, *text))
            .collect()
    }

    fn parse(lines: &[&str]) -> (TagSet, Vec<Diagnostic>) {
        parse_tags(&block(lines), &Vocabulary::default())
    }

    fn values(tags: &TagSet, kind: TagKind) -> Vec<&str> {
        tags.get(kind)
            .map(|t| t.values.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    #[test]
    fn test_multi_line_requirements_merge_in_order() {
        let (tags, diags) = parse(&[
            "",
            "@requirement CB-#0815, CB-#0816,",
            "CB-#0817",
            "@requirement CB-#0818 CB-#0819",
            "CB-#0820",
            "",
        ]);
        assert!(diags.is_empty());
        assert_eq!(
            values(&tags, TagKind::Requirement),
            vec!["CB-#0815", "CB-#0816", "CB-#0817", "CB-#0818", "CB-#0819", "CB-#0820"]
        );
        let tag = tags.get(TagKind::Requirement).unwrap();
        assert_eq!(tag.first_line, 2);
        assert_eq!(tag.last_line, 5);
    }

    #[test]
    fn test_duplicates_preserved() {
        let (tags, _) = parse(&["@requirement CB-#1 CB-#1", "@requirement CB-#1"]);
        assert_eq!(
            values(&tags, TagKind::Requirement),
            vec!["CB-#1", "CB-#1", "CB-#1"]
        );
    }

    #[test]
    fn test_lines_before_first_tag_dropped() {
        let (tags, _) = parse(&["You know what?", "@brief Short", "description"]);
        assert_eq!(tags.len(), 1);
        assert_eq!(tags.get(TagKind::Brief).unwrap().text(), "Short description");
    }

    #[test]
    fn test_free_text_occurrences_joined() {
        let (tags, _) = parse(&["@test first", "@brief b", "@test second"]);
        assert_eq!(tags.get(TagKind::Test).unwrap().text(), "first second");
    }

    #[test]
    fn test_testmethods_validation() {
        let (tags, diags) = parse(&["@testmethods TM_PAIRWISE TM_BOUNDARY"]);
        assert_eq!(
            values(&tags, TagKind::TestMethods),
            vec!["TM_PAIRWISE", "TM_BOUNDARY"]
        );
        assert!(diags.is_empty());

        let (tags, diags) = parse(&["@testmethods something_arbitrary"]);
        let tag = tags.get(TagKind::TestMethods).unwrap();
        assert!(tag.values.is_empty());
        assert_eq!(tag.validity, TagValidity::InvalidEnumValue);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].kind, DiagnosticKind::InvalidEnumValue);
    }

    #[test]
    fn test_testmethods_partial_invalid() {
        let (tags, diags) = parse(&["@testmethods TM_TABLE, bogus TM_CONDITION"]);
        assert_eq!(
            values(&tags, TagKind::TestMethods),
            vec!["TM_TABLE", "TM_CONDITION"]
        );
        assert_eq!(diags.len(), 1);
        assert!(diags[0].detail.contains("bogus"));
    }

    #[test]
    fn test_empty_tag_distinct_from_absent() {
        let (tags, diags) = parse(&["", "@requirement", ""]);
        let tag = tags.get(TagKind::Requirement).expect("tag present");
        assert!(tag.values.is_empty());
        assert_eq!(tag.validity, TagValidity::Empty);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].kind, DiagnosticKind::EmptyTagValue);
        assert_eq!(diags[0].line, 2);
        assert!(!tags.contains(TagKind::Brief));
        assert_eq!(tags.invalid_kinds().collect::<Vec<_>>(), vec![TagKind::Requirement]);
    }

    #[test]
    fn test_keyword_needs_word_boundary() {
        let (tags, _) = parse(&["@testmethods TM_TABLE", "@tested nothing"]);
        assert!(!tags.contains(TagKind::Test));
        // `@tested` is continuation text of the open tag
        assert_eq!(tags.get(TagKind::TestMethods).unwrap().validity, TagValidity::InvalidEnumValue);
    }

    #[test]
    fn test_keyword_case_sensitive() {
        let (tags, _) = parse(&["@Requirement CB-#1"]);
        assert!(tags.is_empty());
    }

    #[test]
    fn test_inline_second_keyword() {
        let (tags, _) = parse(&[
            "@requirement https://cb.example.net/cb/issue/0815, @requirement CB-#0304",
            "https://cb.example.net/cb/issue/0816",
        ]);
        assert_eq!(
            values(&tags, TagKind::Requirement),
            vec![
                "https://cb.example.net/cb/issue/0815",
                "CB-#0304",
                "https://cb.example.net/cb/issue/0816"
            ]
        );
    }

    #[test]
    fn test_requirement_url_normalization() {
        let vocab = Vocabulary::default().with_requirement_url_base("https://cb.example.net/cb");
        let (tags, _) = parse_tags(
            &block(&["@requirement https://cb.example.net/cb/issue/0815 https://other.net/x CB-#7"]),
            &vocab,
        );
        assert_eq!(
            values(&tags, TagKind::Requirement),
            vec!["CB-#0815", "https://other.net/x", "CB-#7"]
        );
    }

    #[test]
    fn test_invalid_test_method_reported_on_its_line() {
        let (tags, diags) = parse(&[
            "@testmethods TM_TABLE",
            "TM_BOUNDARY bogus",
            "TM_PAIRWISE",
            "also_bogus",
        ]);
        assert_eq!(
            values(&tags, TagKind::TestMethods),
            vec!["TM_TABLE", "TM_BOUNDARY", "TM_PAIRWISE"]
        );
        let lines: Vec<usize> = diags.iter().map(|d| d.line).collect();
        assert_eq!(lines, vec![2, 4]);
    }

    #[test]
    fn test_defect_tickets() {
        let (tags, diags) = parse(&["@defect CB-#0815, OCT-#12", "CB-#0816"]);
        assert!(diags.is_empty());
        assert_eq!(
            values(&tags, TagKind::Defect),
            vec!["CB-#0815", "OCT-#12", "CB-#0816"]
        );

        let (tags, diags) = parse(&["@defect CB-#1 fixed-later", "", "@defect OCT-#"]);
        let tag = tags.get(TagKind::Defect).unwrap();
        assert_eq!(tag.values, vec!["CB-#1"]);
        assert_eq!(tag.validity, TagValidity::InvalidTicketReference);
        assert_eq!(diags.len(), 2);
        assert!(diags.iter().all(|d| d.kind == DiagnosticKind::InvalidTicketReference));
        assert_eq!(diags[1].line, 3);
    }

    #[test]
    fn test_ticket_reference_shape() {
        assert!(is_ticket_reference("CB-#0815"));
        assert!(is_ticket_reference("OCT-#7"));
        assert!(!is_ticket_reference("CB-#"));
        assert!(!is_ticket_reference("-#12"));
        assert!(!is_ticket_reference("https://cb.example.net/cb/issue/0815"));
    }

    #[test]
    fn test_backslash_keywords() {
        let (tags, _) = parse(&[
            "\\requirement CB-#1, CB-#2",
            "\\requiredby FOO::BAR",
            "@requirement CB-#3",
        ]);
        assert_eq!(
            values(&tags, TagKind::Requirement),
            vec!["CB-#1", "CB-#2", "CB-#3"]
        );
        assert_eq!(values(&tags, TagKind::RequiredBy), vec!["FOO::BAR"]);

        // Only the requirement keywords have a backslash spelling
        let (tags, _) = parse(&["\\brief not a tag"]);
        assert!(tags.is_empty());
    }

    #[test]
    fn test_version_and_requiredby() {
        let (tags, _) = parse(&["@version 1, 2", "@requiredby FOO::BAR, BAZ::QUX"]);
        assert_eq!(values(&tags, TagKind::Version), vec!["1", "2"]);
        assert_eq!(values(&tags, TagKind::RequiredBy), vec!["FOO::BAR", "BAZ::QUX"]);
    }
}
