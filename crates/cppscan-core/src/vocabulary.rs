//! Engine-level constants: test macro names, annotation keywords, the
//! `@testmethods` whitelist and the inline trace and exclude markers.
//!
//! A [`Vocabulary`] is immutable once built. The process-wide instance is
//! installed at most once by the embedding layer (see [`Vocabulary::install`])
//! and every parse entry point also accepts an explicit vocabulary.

use facet::Facet;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

/// The test declaration macro forms.
///
/// All kinds share the same two-argument extraction rule, so the kind is only
/// carried along for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Facet)]
#[repr(u8)]
pub enum MacroKind {
    Test,
    TestF,
    TestP,
    TestPInstance,
    TestFInstance,
    TypedTest,
    TypedTestP,
    TypedTestSuite,
}

impl MacroKind {
    pub const ALL: [MacroKind; 8] = [
        MacroKind::Test,
        MacroKind::TestF,
        MacroKind::TestP,
        MacroKind::TestPInstance,
        MacroKind::TestFInstance,
        MacroKind::TypedTest,
        MacroKind::TypedTestP,
        MacroKind::TypedTestSuite,
    ];

    /// Parse a kind from its canonical macro name
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == s)
    }

    /// The canonical macro name, e.g. `TEST_F`
    pub fn as_str(&self) -> &'static str {
        match self {
            MacroKind::Test => "TEST",
            MacroKind::TestF => "TEST_F",
            MacroKind::TestP => "TEST_P",
            MacroKind::TestPInstance => "TEST_P_INSTANCE",
            MacroKind::TestFInstance => "TEST_F_INSTANCE",
            MacroKind::TypedTest => "TYPED_TEST",
            MacroKind::TypedTestP => "TYPED_TEST_P",
            MacroKind::TypedTestSuite => "TYPED_TEST_SUITE",
        }
    }
}

impl std::fmt::Display for MacroKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Annotation tags recognized in the comment block above a test declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Facet)]
#[repr(u8)]
pub enum TagKind {
    Test,
    Brief,
    Requirement,
    RequiredBy,
    Version,
    TestMethods,
    Defect,
}

impl TagKind {
    pub const ALL: [TagKind; 7] = [
        TagKind::Test,
        TagKind::Brief,
        TagKind::Requirement,
        TagKind::RequiredBy,
        TagKind::Version,
        TagKind::TestMethods,
        TagKind::Defect,
    ];

    /// Look up a kind by its field name, e.g. `requirement`
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == s)
    }

    /// Field name used in output records
    pub fn as_str(&self) -> &'static str {
        match self {
            TagKind::Test => "test",
            TagKind::Brief => "brief",
            TagKind::Requirement => "requirement",
            TagKind::RequiredBy => "requiredby",
            TagKind::Version => "version",
            TagKind::TestMethods => "testmethods",
            TagKind::Defect => "defect",
        }
    }

    /// Default comment keyword, e.g. `@requirement`
    pub fn keyword(&self) -> &'static str {
        match self {
            TagKind::Test => "@test",
            TagKind::Brief => "@brief",
            TagKind::Requirement => "@requirement",
            TagKind::RequiredBy => "@requiredby",
            TagKind::Version => "@version",
            TagKind::TestMethods => "@testmethods",
            TagKind::Defect => "@defect",
        }
    }

    /// List tags hold ordered tokens; free-text tags hold one string.
    pub fn is_list(&self) -> bool {
        !matches!(self, TagKind::Test | TagKind::Brief)
    }
}

impl std::fmt::Display for TagKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Values accepted by `@testmethods` out of the box.
pub const DEFAULT_TEST_METHODS: &[&str] = &[
    "TM_EQUIVALENCE",
    "TM_PAIRWISE",
    "TM_GUESSING",
    "TM_BOUNDARY",
    "TM_CONDITION",
    "TM_REQUIREMENT",
    "TM_TABLE",
];

/// Doxygen-style spellings accepted next to the `@` keywords.
pub const DEFAULT_BACKSLASH_KEYWORDS: &[(&str, TagKind)] = &[
    ("\\requirement", TagKind::Requirement),
    ("\\requiredby", TagKind::RequiredBy),
];

/// Literal that opens an inline trace comment.
pub const DEFAULT_TRACE_MARKER: &str = "lobster-trace:";

/// Literal that opens an inline exclude comment.
pub const DEFAULT_EXCLUDE_MARKER: &str = "lobster-exclude:";

/// Text that opts a test declaration out of tracing.
pub const DEFAULT_NO_TRACING_MARKER: &str = "NOTRACING";

static GLOBAL: OnceLock<Vocabulary> = OnceLock::new();

/// The recognized macro names, tag keywords and enumerations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vocabulary {
    macros: BTreeMap<String, MacroKind>,
    tag_keywords: BTreeMap<String, TagKind>,
    test_methods: BTreeSet<String>,
    trace_marker: String,
    exclude_marker: String,
    no_tracing_marker: String,
    requirement_url_base: Option<String>,
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self {
            macros: MacroKind::ALL
                .into_iter()
                .map(|kind| (kind.as_str().to_string(), kind))
                .collect(),
            tag_keywords: TagKind::ALL
                .into_iter()
                .map(|kind| (kind.keyword(), kind))
                .chain(DEFAULT_BACKSLASH_KEYWORDS.iter().copied())
                .map(|(keyword, kind)| (keyword.to_string(), kind))
                .collect(),
            test_methods: DEFAULT_TEST_METHODS.iter().map(|s| s.to_string()).collect(),
            trace_marker: DEFAULT_TRACE_MARKER.to_string(),
            exclude_marker: DEFAULT_EXCLUDE_MARKER.to_string(),
            no_tracing_marker: DEFAULT_NO_TRACING_MARKER.to_string(),
            requirement_url_base: None,
        }
    }
}

impl Vocabulary {
    /// Install the process-wide vocabulary.
    ///
    /// Succeeds only once; a second call hands the rejected value back.
    pub fn install(vocabulary: Vocabulary) -> Result<(), Vocabulary> {
        GLOBAL.set(vocabulary)
    }

    /// The installed vocabulary, or the built-in default if none was installed
    pub fn global() -> &'static Vocabulary {
        GLOBAL.get_or_init(Vocabulary::default)
    }

    /// Recognize an additional macro name as an existing kind
    pub fn with_macro_alias(mut self, name: impl Into<String>, kind: MacroKind) -> Self {
        self.macros.insert(name.into(), kind);
        self
    }

    /// Recognize an additional comment keyword for an existing tag kind
    pub fn with_tag_keyword(mut self, keyword: impl Into<String>, kind: TagKind) -> Self {
        self.tag_keywords.insert(keyword.into(), kind);
        self
    }

    /// Accept an additional `@testmethods` value
    pub fn with_test_method(mut self, method: impl Into<String>) -> Self {
        self.test_methods.insert(method.into());
        self
    }

    pub fn with_trace_marker(mut self, marker: impl Into<String>) -> Self {
        self.trace_marker = marker.into();
        self
    }

    pub fn with_exclude_marker(mut self, marker: impl Into<String>) -> Self {
        self.exclude_marker = marker.into();
        self
    }

    pub fn with_no_tracing_marker(mut self, marker: impl Into<String>) -> Self {
        self.no_tracing_marker = marker.into();
        self
    }

    /// Rewrite `<base>/issue/<digits>` requirement URLs to `CB-#<digits>`
    pub fn with_requirement_url_base(mut self, base: impl Into<String>) -> Self {
        let base = base.into();
        self.requirement_url_base = Some(base.trim_end_matches('/').to_string());
        self
    }

    pub fn macro_kind(&self, name: &str) -> Option<MacroKind> {
        self.macros.get(name).copied()
    }

    pub fn tag_keywords(&self) -> impl Iterator<Item = (&str, TagKind)> {
        self.tag_keywords.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn is_test_method(&self, token: &str) -> bool {
        self.test_methods.contains(token)
    }

    pub fn trace_marker(&self) -> &str {
        &self.trace_marker
    }

    pub fn exclude_marker(&self) -> &str {
        &self.exclude_marker
    }

    pub fn no_tracing_marker(&self) -> &str {
        &self.no_tracing_marker
    }

    pub fn requirement_url_base(&self) -> Option<&str> {
        self.requirement_url_base.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_macro_set() {
        let vocab = Vocabulary::default();
        for kind in MacroKind::ALL {
            assert_eq!(vocab.macro_kind(kind.as_str()), Some(kind));
        }
        assert_eq!(vocab.macro_kind("TEST_SUITE"), None);
        assert_eq!(vocab.macro_kind("test"), None);
    }

    #[test]
    fn test_macro_alias() {
        let vocab = Vocabulary::default().with_macro_alias("MY_TEST", MacroKind::TestF);
        assert_eq!(vocab.macro_kind("MY_TEST"), Some(MacroKind::TestF));
        assert_eq!(vocab.macro_kind("TEST_F"), Some(MacroKind::TestF));
    }

    #[test]
    fn test_macro_kind_parse_round_trips_names() {
        assert_eq!(MacroKind::parse("TYPED_TEST_P"), Some(MacroKind::TypedTestP));
        assert_eq!(MacroKind::parse("TEST_P_INSTANCE"), Some(MacroKind::TestPInstance));
        assert_eq!(MacroKind::parse("SOMETHING"), None);
    }

    #[test]
    fn test_test_methods() {
        let vocab = Vocabulary::default();
        assert!(vocab.is_test_method("TM_PAIRWISE"));
        assert!(vocab.is_test_method("TM_TABLE"));
        assert!(!vocab.is_test_method("tm_pairwise"));
        assert!(!vocab.is_test_method("something_arbitrary"));

        let vocab = vocab.with_test_method("TM_FUZZING");
        assert!(vocab.is_test_method("TM_FUZZING"));
    }

    #[test]
    fn test_url_base_trailing_slash_trimmed() {
        let vocab = Vocabulary::default().with_requirement_url_base("https://cb.example.net/cb/");
        assert_eq!(vocab.requirement_url_base(), Some("https://cb.example.net/cb"));
    }

    #[test]
    fn test_tag_kind_list_split() {
        let lists: Vec<_> = TagKind::ALL.into_iter().filter(TagKind::is_list).collect();
        assert_eq!(
            lists,
            vec![
                TagKind::Requirement,
                TagKind::RequiredBy,
                TagKind::Version,
                TagKind::TestMethods,
                TagKind::Defect
            ]
        );
    }

    #[test]
    fn test_backslash_keywords() {
        let vocab = Vocabulary::default();
        let keywords: Vec<_> = vocab.tag_keywords().collect();
        assert!(keywords.contains(&("\\requirement", TagKind::Requirement)));
        assert!(keywords.contains(&("\\requiredby", TagKind::RequiredBy)));
        assert!(!keywords.iter().any(|(k, _)| *k == "\\brief"));

        assert_eq!(TagKind::parse("requiredby"), Some(TagKind::RequiredBy));
        assert_eq!(TagKind::parse("@requiredby"), None);
        let vocab = vocab.with_tag_keyword("@req", TagKind::Requirement);
        assert!(vocab.tag_keywords().any(|(k, kind)| k == "@req" && kind == TagKind::Requirement));
    }
}
