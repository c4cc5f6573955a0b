//! Configuration schema for cppscan
//!
//! Config lives at `.config/cppscan/config.styx` relative to the working
//! directory:
//!
//! ```styx
//! include ("tests/**/*.cpp")
//! exclude ("build/**")
//! macro_aliases (
//!   {
//!     name MY_TEST
//!     kind TEST_F
//!   }
//! )
//! test_methods (TM_FUZZING)
//! tag_keywords (
//!   {
//!     keyword "@req"
//!     kind requirement
//!   }
//! )
//! exclude_marker "trace-skip:"
//! requirement_url_base "https://codebeamer.company.net/cb"
//! ```

use cppscan_core::{MacroKind, TagKind, Vocabulary};
use eyre::{Result, WrapErr};
use facet::Facet;
use std::path::Path;

/// Default config location, relative to the working directory
pub const DEFAULT_CONFIG_PATH: &str = ".config/cppscan/config.styx";

/// Root configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Facet)]
pub struct Config {
    /// Glob patterns for files to scan inside directories
    #[facet(default)]
    pub include: Vec<String>,

    /// Glob patterns to skip inside directories
    #[facet(default)]
    pub exclude: Vec<String>,

    /// Extra macro names treated like one of the built-in test macros
    #[facet(default)]
    pub macro_aliases: Vec<MacroAlias>,

    /// Additional accepted `@testmethods` values
    #[facet(default)]
    pub test_methods: Vec<String>,

    /// Extra comment keywords opening one of the built-in tags
    #[facet(default)]
    pub tag_keywords: Vec<TagKeyword>,

    /// Replaces the `lobster-trace:` marker literal
    #[facet(default)]
    pub trace_marker: Option<String>,

    /// Replaces the `lobster-exclude:` marker literal
    #[facet(default)]
    pub exclude_marker: Option<String>,

    /// Rewrites `<base>/issue/<n>` requirement URLs to `CB-#<n>`
    #[facet(default)]
    pub requirement_url_base: Option<String>,
}

/// A macro name mapped onto a built-in kind
#[derive(Debug, Clone, PartialEq, Eq, Facet)]
pub struct MacroAlias {
    pub name: String,
    /// Built-in macro name, e.g. `TEST_F`
    pub kind: String,
}

/// A comment keyword mapped onto a built-in tag
#[derive(Debug, Clone, PartialEq, Eq, Facet)]
pub struct TagKeyword {
    pub keyword: String,
    /// Tag field name, e.g. `requirement`
    pub kind: String,
}

impl Config {
    /// Parse config text; `origin` names the file in error messages
    pub fn parse(content: &str, origin: &Path) -> Result<Self> {
        facet_styx::from_str(content)
            .map_err(|e| eyre::eyre!("Config file {} has errors:\n{}", origin.display(), e))
    }

    /// Load a config file.
    ///
    /// A missing file yields the default config unless `required` is set.
    pub fn load(path: &Path, required: bool) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::parse(&content, path),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && !required => {
                tracing::info!(
                    "Config file {} not found, using defaults",
                    path.display()
                );
                Ok(Self::default())
            }
            Err(e) => {
                Err(e).wrap_err_with(|| format!("Config file {} not readable", path.display()))
            }
        }
    }

    /// Build the vocabulary this config describes
    pub fn vocabulary(&self) -> Result<Vocabulary> {
        let mut vocab = Vocabulary::default();

        for alias in &self.macro_aliases {
            let kind = MacroKind::parse(&alias.kind).ok_or_else(|| {
                eyre::eyre!(
                    "macro alias `{}` maps to unknown kind `{}` (expected one of: {})",
                    alias.name,
                    alias.kind,
                    MacroKind::ALL.map(|k| k.as_str()).join(", ")
                )
            })?;
            vocab = vocab.with_macro_alias(&alias.name, kind);
        }
        for entry in &self.tag_keywords {
            let kind = TagKind::parse(&entry.kind).ok_or_else(|| {
                eyre::eyre!(
                    "tag keyword `{}` maps to unknown tag `{}` (expected one of: {})",
                    entry.keyword,
                    entry.kind,
                    TagKind::ALL.map(|k| k.as_str()).join(", ")
                )
            })?;
            let keyword = entry.keyword.trim();
            if keyword.is_empty() || keyword.contains(char::is_whitespace) {
                eyre::bail!("tag keyword `{}` must be a single word", entry.keyword);
            }
            vocab = vocab.with_tag_keyword(keyword, kind);
        }
        for method in &self.test_methods {
            vocab = vocab.with_test_method(method);
        }
        if let Some(marker) = &self.trace_marker {
            if marker.trim().is_empty() {
                eyre::bail!("trace_marker must not be empty");
            }
            vocab = vocab.with_trace_marker(marker.trim());
        }
        if let Some(marker) = &self.exclude_marker {
            if marker.trim().is_empty() {
                eyre::bail!("exclude_marker must not be empty");
            }
            vocab = vocab.with_exclude_marker(marker.trim());
        }
        if let Some(base) = &self.requirement_url_base {
            vocab = vocab.with_requirement_url_base(base);
        }

        Ok(vocab)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_optional_config_is_default() {
        let temp = tempfile::tempdir().unwrap();
        let config = Config::load(&temp.path().join("config.styx"), false).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_missing_required_config_is_an_error() {
        let temp = tempfile::tempdir().unwrap();
        assert!(Config::load(&temp.path().join("config.styx"), true).is_err());
    }

    #[test]
    fn test_unknown_alias_kind() {
        let config = Config {
            macro_aliases: vec![MacroAlias {
                name: "MY_TEST".to_string(),
                kind: "NOT_A_MACRO".to_string(),
            }],
            ..Config::default()
        };
        let err = config.vocabulary().unwrap_err().to_string();
        assert!(err.contains("NOT_A_MACRO"));
    }

    #[test]
    fn test_unknown_tag_keyword_kind() {
        let config = Config {
            tag_keywords: vec![TagKeyword {
                keyword: "@ticket".to_string(),
                kind: "ticket".to_string(),
            }],
            ..Config::default()
        };
        let err = config.vocabulary().unwrap_err().to_string();
        assert!(err.contains("`ticket`"), "{err}");
        assert!(err.contains("defect"), "{err}");
    }

    #[test]
    fn test_parse_tag_keywords() {
        let config = Config::parse(
            "tag_keywords (\n  {\n    keyword \"@req\"\n    kind requirement\n  }\n)\nexclude_marker \"trace-skip:\"\n",
            Path::new("config.styx"),
        )
        .unwrap();
        assert_eq!(
            config.tag_keywords,
            vec![TagKeyword {
                keyword: "@req".to_string(),
                kind: "requirement".to_string(),
            }]
        );
        assert_eq!(config.exclude_marker.as_deref(), Some("trace-skip:"));
    }

    #[test]
    fn test_vocabulary_from_config() {
        let config = Config {
            macro_aliases: vec![MacroAlias {
                name: "MY_TEST".to_string(),
                kind: "TEST_F".to_string(),
            }],
            test_methods: vec!["TM_FUZZING".to_string()],
            tag_keywords: vec![TagKeyword {
                keyword: "@req".to_string(),
                kind: "requirement".to_string(),
            }],
            trace_marker: Some("trace:".to_string()),
            exclude_marker: Some("trace-skip:".to_string()),
            requirement_url_base: Some("https://cb.example.net/cb/".to_string()),
            ..Config::default()
        };
        let vocab = config.vocabulary().unwrap();
        assert_eq!(vocab.macro_kind("MY_TEST"), Some(MacroKind::TestF));
        assert!(vocab.is_test_method("TM_FUZZING"));
        assert!(vocab.is_test_method("TM_PAIRWISE"));
        assert_eq!(vocab.trace_marker(), "trace:");
        assert_eq!(vocab.exclude_marker(), "trace-skip:");
        assert!(vocab.tag_keywords().any(|(k, kind)| k == "@req" && kind == TagKind::Requirement));
        assert_eq!(vocab.requirement_url_base(), Some("https://cb.example.net/cb"));
    }
}
