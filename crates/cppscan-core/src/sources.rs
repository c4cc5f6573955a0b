//! Source providers for extraction

use crate::records::FileRecords;
use crate::vocabulary::Vocabulary;
use eyre::{Result, WrapErr};
use facet::Facet;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// Result of extracting a set of files
#[derive(Debug, Default, Clone, PartialEq, Eq, Facet)]
pub struct Extraction {
    /// One entry per parsed file, sorted by path
    pub files: Vec<FileRecords>,
    /// Files that could not be read, and similar run-level problems
    pub warnings: Vec<String>,
}

impl Extraction {
    /// Combine two extractions, keeping files sorted and unique by path
    pub fn merge(mut self, other: Extraction) -> Self {
        self.files.extend(other.files);
        self.files.sort_by(|a, b| a.file.cmp(&b.file));
        self.files.dedup_by(|a, b| a.file == b.file);
        self.warnings.extend(other.warnings);
        self
    }

    pub fn declaration_count(&self) -> usize {
        self.files.iter().map(|f| f.declarations().count()).sum()
    }

    pub fn marker_count(&self) -> usize {
        self.files.iter().map(|f| f.markers().count()).sum()
    }

    pub fn diagnostic_count(&self) -> usize {
        self.files.iter().map(|f| f.diagnostics.len()).sum()
    }

    pub fn has_diagnostics(&self) -> bool {
        self.files.iter().any(|f| !f.diagnostics.is_empty())
    }
}

/// File extensions scanned when walking directories
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    "cpp", // C++
    "cc",  // C++
    "cxx", // C++
    "c",   // C
    "h",   // C/C++ headers
    "hpp", // C++ headers
    "hh",  // C++ headers
    "hxx", // C++ headers
    "ipp", // C++ inline implementation
    "inl", // C++ inline implementation
];

/// Check if a file extension is scanned when walking directories
pub fn is_supported_extension(ext: &OsStr) -> bool {
    ext.to_str()
        .map(|e| SUPPORTED_EXTENSIONS.contains(&e))
        .unwrap_or(false)
}

/// Trait for providing source files to extract from
pub trait Sources {
    /// Extract records from all sources
    fn extract(self, vocab: &Vocabulary) -> Result<Extraction>;
}

/// Sources from an explicit list of file paths
pub struct PathSources(Vec<PathBuf>);

impl PathSources {
    /// Create from an iterator of paths
    pub fn new(paths: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        Self(paths.into_iter().map(Into::into).collect())
    }
}

impl Sources for PathSources {
    fn extract(self, vocab: &Vocabulary) -> Result<Extraction> {
        Ok(extract_paths(self.0, vocab))
    }
}

/// In-memory sources (useful for testing)
pub struct MemorySources(Vec<(PathBuf, String)>);

impl MemorySources {
    /// Create empty memory sources
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Add a file with content
    pub fn add(mut self, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        self.0.push((path.into(), content.into()));
        self
    }
}

impl Default for MemorySources {
    fn default() -> Self {
        Self::new()
    }
}

impl Sources for MemorySources {
    fn extract(self, vocab: &Vocabulary) -> Result<Extraction> {
        let mut files: Vec<FileRecords> = self
            .0
            .iter()
            .map(|(path, content)| FileRecords::parse_with(path, content, vocab))
            .collect();
        files.sort_by(|a, b| a.file.cmp(&b.file));
        Ok(Extraction {
            files,
            warnings: Vec::new(),
        })
    }
}

/// Read a file as UTF-8
fn load(path: &Path) -> Result<String> {
    let bytes =
        std::fs::read(path).wrap_err_with(|| format!("Failed to read {}", path.display()))?;
    String::from_utf8(bytes).wrap_err_with(|| format!("{} is not valid UTF-8", path.display()))
}

fn extract_one(path: &Path, vocab: &Vocabulary) -> Result<FileRecords> {
    let content = load(path)?;
    Ok(FileRecords::parse_with(path, &content, vocab))
}

/// Parse files in path order; unreadable files become warnings
fn extract_paths(mut paths: Vec<PathBuf>, vocab: &Vocabulary) -> Extraction {
    paths.sort();
    paths.dedup();

    #[cfg(feature = "parallel")]
    let results: Vec<_> = {
        use rayon::prelude::*;
        paths.par_iter().map(|p| extract_one(p, vocab)).collect()
    };

    #[cfg(not(feature = "parallel"))]
    let results: Vec<_> = paths.iter().map(|p| extract_one(p, vocab)).collect();

    let mut extraction = Extraction::default();
    for result in results {
        match result {
            Ok(records) => extraction.files.push(records),
            Err(report) => {
                let warning = format!("{report:#}, skipped");
                tracing::warn!("{warning}");
                extraction.warnings.push(warning);
            }
        }
    }

    tracing::info!(
        files = extraction.files.len(),
        skipped = extraction.warnings.len(),
        "extracted sources"
    );
    extraction
}

/// Gitignore-aware directory walker
#[cfg(feature = "walk")]
pub struct WalkSources {
    root: PathBuf,
    include: Vec<String>,
    exclude: Vec<String>,
}

#[cfg(feature = "walk")]
impl WalkSources {
    /// Create a walker for the given root directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            include: Vec::new(),
            exclude: Vec::new(),
        }
    }

    /// Add include patterns (e.g., `["tests/**/*.cpp"]`)
    pub fn include(mut self, patterns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.include.extend(patterns.into_iter().map(Into::into));
        self
    }

    /// Add exclude patterns (e.g., `["build/**"]`)
    pub fn exclude(mut self, patterns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.exclude.extend(patterns.into_iter().map(Into::into));
        self
    }

    /// Files under the root that pass the extension and glob filters
    pub fn collect_paths(&self) -> Result<(Vec<PathBuf>, Vec<String>)> {
        use ignore::WalkBuilder;

        if !self.root.exists() {
            eyre::bail!("{}: no such file or directory", self.root.display());
        }

        let include = glob_set(&self.include)?;
        let exclude = glob_set(&self.exclude)?;

        let walker = WalkBuilder::new(&self.root)
            .follow_links(true)
            .hidden(false)
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true)
            .build();

        let mut paths = Vec::new();
        let mut warnings = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warnings.push(e.to_string());
                    continue;
                }
            };
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }

            let path = entry.path();
            if path
                .extension()
                .is_none_or(|ext| !is_supported_extension(ext))
            {
                continue;
            }

            let relative = path.strip_prefix(&self.root).unwrap_or(path);
            if !self.include.is_empty() && !include.is_match(relative) {
                continue;
            }
            if exclude.is_match(relative) {
                continue;
            }
            paths.push(path.to_path_buf());
        }

        tracing::debug!(
            root = %self.root.display(),
            files = paths.len(),
            "walked source tree"
        );
        Ok((paths, warnings))
    }
}

#[cfg(feature = "walk")]
fn glob_set(patterns: &[String]) -> Result<globset::GlobSet> {
    let mut builder = globset::GlobSetBuilder::new();
    for pattern in patterns {
        let pattern = pattern.replace('\\', "/");
        let glob = globset::Glob::new(&pattern)
            .wrap_err_with(|| format!("invalid glob pattern `{pattern}`"))?;
        builder.add(glob);
    }
    builder.build().wrap_err("failed to compile glob patterns")
}

#[cfg(feature = "walk")]
impl Sources for WalkSources {
    fn extract(self, vocab: &Vocabulary) -> Result<Extraction> {
        let (paths, warnings) = self.collect_paths()?;
        for warning in &warnings {
            tracing::warn!("{warning}");
        }
        let mut extraction = extract_paths(paths, vocab);
        extraction.warnings.splice(0..0, warnings);
        Ok(extraction)
    }
}
