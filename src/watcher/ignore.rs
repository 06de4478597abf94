//! Ignore-pattern matching for watched trees.
//!
//! Patterns come from an optional plain-text file, one per line; blank
//! lines and `#` comments are skipped. Four forms are recognized:
//!
//! - bare name: matches any path component, at any depth
//! - wildcard glob (`*.log`): matched against the full path and the
//!   final segment
//! - root-anchored (`/build/**`): matched against the path relative to
//!   each watched root
//! - directory-only (`cache/`): matches only directory targets
//!
//! Any match ignores the path; there is no negation syntax. Matching is
//! case-sensitive and dotfiles are ordinary names.

use std::path::{Path, PathBuf};

use globset::{Glob, GlobMatcher};

/// A single compiled ignore pattern.
#[derive(Debug)]
enum Pattern {
    /// Bare segment name, optionally with glob forms for wildcards.
    Name {
        name: String,
        full_glob: Option<GlobMatcher>,
        name_glob: Option<GlobMatcher>,
    },
    /// Leading-separator pattern, relative to each watched root.
    Anchored { glob: GlobMatcher },
    /// Trailing-separator pattern, directories only.
    DirOnly { name: String },
}

/// Matcher over a loaded set of ignore patterns.
#[derive(Debug, Default)]
pub struct IgnoreMatcher {
    patterns: Vec<Pattern>,
    roots: Vec<PathBuf>,
}

impl IgnoreMatcher {
    /// Create a matcher with no patterns.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load patterns from a file, replacing any previously loaded set.
    ///
    /// A missing or unreadable file leaves the matcher with zero patterns
    /// rather than failing startup.
    pub fn load(&mut self, path: &Path) {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                self.patterns = compile_lines(content.lines());
                tracing::info!(
                    path = %path.display(),
                    patterns = self.patterns.len(),
                    "Loaded ignore patterns"
                );
            }
            Err(e) => {
                self.patterns.clear();
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Ignore file unavailable, proceeding with no patterns"
                );
            }
        }
    }

    /// Build a matcher directly from pattern strings.
    #[must_use]
    pub fn from_patterns(patterns: &[&str]) -> Self {
        Self {
            patterns: compile_lines(patterns.iter().copied()),
            roots: Vec::new(),
        }
    }

    /// Set the watched roots that anchored patterns are resolved against.
    pub fn set_roots(&mut self, roots: &[PathBuf]) {
        self.roots = roots.to_vec();
    }

    /// Number of loaded patterns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// True when no patterns are loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Check whether a path should be excluded from watching/indexing.
    ///
    /// With zero patterns loaded this always returns false.
    #[must_use]
    pub fn should_ignore(&self, path: &Path, is_directory: bool) -> bool {
        self.patterns
            .iter()
            .any(|p| self.matches(p, path, is_directory))
    }

    fn matches(&self, pattern: &Pattern, path: &Path, is_directory: bool) -> bool {
        match pattern {
            Pattern::Name {
                name,
                full_glob,
                name_glob,
            } => {
                if path_has_component(path, name) {
                    return true;
                }
                if let Some(glob) = full_glob {
                    if glob.is_match(path) {
                        return true;
                    }
                }
                if let Some(glob) = name_glob {
                    if let Some(file_name) = path.file_name() {
                        if glob.is_match(Path::new(file_name)) {
                            return true;
                        }
                    }
                }
                false
            }
            Pattern::Anchored { glob } => self
                .roots
                .iter()
                .filter_map(|root| path.strip_prefix(root).ok())
                .any(|rel| glob.is_match(rel)),
            Pattern::DirOnly { name } => {
                is_directory && path.file_name().is_some_and(|f| f == name.as_str())
            }
        }
    }
}

/// True when any component of the path equals `name` verbatim.
fn path_has_component(path: &Path, name: &str) -> bool {
    path.components().any(|c| {
        matches!(c, std::path::Component::Normal(seg) if seg == name)
    })
}

fn has_wildcard(pattern: &str) -> bool {
    pattern.contains(['*', '?', '['])
}

fn compile_lines<'a, I>(lines: I) -> Vec<Pattern>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut patterns = Vec::new();

    for line in lines {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some(compiled) = compile_pattern(line) {
            patterns.push(compiled);
        }
    }

    patterns
}

fn compile_pattern(raw: &str) -> Option<Pattern> {
    if let Some(name) = raw.strip_suffix('/') {
        return Some(Pattern::DirOnly {
            name: name.to_string(),
        });
    }

    if let Some(rest) = raw.strip_prefix('/') {
        return match Glob::new(rest) {
            Ok(glob) => Some(Pattern::Anchored {
                glob: glob.compile_matcher(),
            }),
            Err(e) => {
                tracing::warn!(pattern = raw, error = %e, "Skipping invalid ignore pattern");
                None
            }
        };
    }

    let (full_glob, name_glob) = if has_wildcard(raw) {
        let full = Glob::new(&format!("**/{raw}"))
            .ok()
            .map(|g| g.compile_matcher());
        let name = Glob::new(raw).ok().map(|g| g.compile_matcher());
        if full.is_none() && name.is_none() {
            tracing::warn!(pattern = raw, "Skipping invalid ignore pattern");
            return None;
        }
        (full, name)
    } else {
        (None, None)
    };

    Some(Pattern::Name {
        name: raw.to_string(),
        full_glob,
        name_glob,
    })
}
