//! Content processors: raw file text to indexable plain text.
//!
//! Processors form an explicit, caller-constructed list; selection picks
//! the highest-priority processor whose `can_handle` accepts the path.
//! There is no global registry.

use std::path::Path;

use crate::error::PipelineError;
use crate::Result;

/// Extensions handled by the plain-text processor.
const TEXT_EXTENSIONS: &[&str] = &[
    "txt", "md", "markdown", "rst", "csv", "log", "rs", "py", "js", "ts", "jsx", "tsx", "go",
    "java", "c", "cpp", "h", "hpp", "cs", "rb", "php", "swift", "kt", "sh", "sql", "yaml", "yml",
    "json", "toml", "xml", "css", "ini", "cfg", "conf",
];

/// One content-extraction capability.
pub trait ContentProcessor: Send + Sync {
    /// Whether this processor accepts the file at `path`.
    fn can_handle(&self, path: &Path) -> bool;

    /// Selection priority; the highest accepting processor wins.
    fn priority(&self) -> i32;

    /// Convert raw file content into plain text.
    ///
    /// # Errors
    ///
    /// Returns an error if extraction fails.
    fn process(&self, raw: &str) -> Result<String>;
}

/// Explicit ordered set of content processors.
pub struct ProcessorSet {
    processors: Vec<Box<dyn ContentProcessor>>,
}

impl ProcessorSet {
    /// Create a set from caller-supplied processors.
    #[must_use]
    pub fn new(processors: Vec<Box<dyn ContentProcessor>>) -> Self {
        Self { processors }
    }

    /// The default set: HTML stripping plus plain text.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(vec![
            Box::new(HtmlProcessor),
            Box::new(PlainTextProcessor),
        ])
    }

    /// Pick the highest-priority processor accepting `path`.
    #[must_use]
    pub fn select(&self, path: &Path) -> Option<&dyn ContentProcessor> {
        self.processors
            .iter()
            .filter(|p| p.can_handle(path))
            .max_by_key(|p| p.priority())
            .map(AsRef::as_ref)
    }

    /// Extract plain text from raw content for the given path.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::NoProcessor`] when no processor accepts
    /// the path, or the processor's own error when extraction fails.
    pub fn process(&self, path: &Path, raw: &str) -> Result<String> {
        let processor = self.select(path).ok_or_else(|| PipelineError::NoProcessor {
            path: path.display().to_string(),
        })?;
        processor.process(raw)
    }
}

/// Identity processor for known text and code formats.
pub struct PlainTextProcessor;

impl ContentProcessor for PlainTextProcessor {
    fn can_handle(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| TEXT_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
    }

    fn priority(&self) -> i32 {
        0
    }

    fn process(&self, raw: &str) -> Result<String> {
        Ok(raw.to_string())
    }
}

/// Tag-stripping processor for HTML files.
pub struct HtmlProcessor;

impl ContentProcessor for HtmlProcessor {
    fn can_handle(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| {
                let ext = ext.to_lowercase();
                ext == "html" || ext == "htm"
            })
    }

    fn priority(&self) -> i32 {
        10
    }

    fn process(&self, raw: &str) -> Result<String> {
        Ok(strip_html(raw))
    }
}

/// Strip tags and script/style blocks, collapsing whitespace.
fn strip_html(raw: &str) -> String {
    let mut text = String::with_capacity(raw.len());
    let mut rest = raw;

    while let Some(open) = rest.find('<') {
        text.push_str(&rest[..open]);
        rest = &rest[open..];

        // ASCII lowering keeps byte offsets aligned with `rest`.
        let lower = rest.to_ascii_lowercase();
        let skip_to = if lower.starts_with("<script") {
            lower.find("</script>").map(|i| i + "</script>".len())
        } else if lower.starts_with("<style") {
            lower.find("</style>").map(|i| i + "</style>".len())
        } else {
            rest.find('>').map(|i| i + 1)
        };

        match skip_to {
            Some(end) => rest = &rest[end..],
            // Unclosed tag: drop the remainder.
            None => {
                rest = "";
            }
        }
        text.push(' ');
    }
    text.push_str(rest);

    let decoded = text
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&nbsp;", " ");

    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_handles_known_extensions() {
        let p = PlainTextProcessor;
        assert!(p.can_handle(Path::new("/a/readme.md")));
        assert!(p.can_handle(Path::new("/a/main.rs")));
        assert!(!p.can_handle(Path::new("/a/image.png")));
        assert!(!p.can_handle(Path::new("/a/noext")));
    }

    #[test]
    fn test_html_processor_strips_tags() {
        let p = HtmlProcessor;
        let text = p
            .process("<html><body><h1>Title</h1><p>Hello &amp; welcome</p></body></html>")
            .unwrap();
        assert_eq!(text, "Title Hello & welcome");
    }

    #[test]
    fn test_html_processor_drops_script_and_style() {
        let p = HtmlProcessor;
        let text = p
            .process("<p>keep</p><script>var x = 1;</script><style>p {}</style><p>this</p>")
            .unwrap();
        assert_eq!(text, "keep this");
    }

    #[test]
    fn test_selection_picks_highest_priority() {
        let set = ProcessorSet::with_defaults();
        let selected = set.select(Path::new("/a/page.html")).unwrap();
        assert_eq!(selected.priority(), 10);

        let selected = set.select(Path::new("/a/notes.txt")).unwrap();
        assert_eq!(selected.priority(), 0);
    }

    #[test]
    fn test_unknown_format_yields_no_processor() {
        let set = ProcessorSet::with_defaults();
        assert!(set.select(Path::new("/a/image.png")).is_none());

        let err = set.process(Path::new("/a/image.png"), "raw").unwrap_err();
        assert!(err.to_string().contains("no processor"));
    }

    #[test]
    fn test_empty_set_handles_nothing() {
        let set = ProcessorSet::new(Vec::new());
        assert!(set.select(Path::new("/a/notes.txt")).is_none());
    }
}
