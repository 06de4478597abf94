//! Splitting extracted text into overlapping chunks.

/// Character-window splitter with overlap between adjacent chunks.
#[derive(Debug, Clone)]
pub struct TextSplitter {
    chunk_size: usize,
    overlap: usize,
}

impl TextSplitter {
    /// Create a splitter. Overlap is clamped below the chunk size.
    #[must_use]
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            overlap: overlap.min(chunk_size - 1),
        }
    }

    /// Split text into chunks of at most `chunk_size` characters, each
    /// overlapping the previous by `overlap` characters. Prefers to
    /// break at whitespace near the window end. Empty or
    /// whitespace-only input yields no chunks.
    #[must_use]
    pub fn split(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let chars: Vec<char> = text.chars().collect();
        if chars.len() <= self.chunk_size {
            return vec![text.to_string()];
        }

        let mut chunks = Vec::new();
        let mut start = 0;

        while start < chars.len() {
            let hard_end = (start + self.chunk_size).min(chars.len());
            let end = if hard_end == chars.len() {
                hard_end
            } else {
                self.find_break(&chars, start, hard_end)
            };

            let chunk: String = chars[start..end].iter().collect();
            if !chunk.trim().is_empty() {
                chunks.push(chunk);
            }

            if end >= chars.len() {
                break;
            }
            // A whitespace break can land below start + overlap.
            start = end.saturating_sub(self.overlap).max(start + 1);
        }

        chunks
    }

    /// Prefer the last whitespace in the final fifth of the window.
    fn find_break(&self, chars: &[char], start: usize, hard_end: usize) -> usize {
        let min_break = start + self.chunk_size - self.chunk_size / 5;

        (min_break..hard_end)
            .rev()
            .find(|&i| chars[i].is_whitespace())
            .map_or(hard_end, |i| i + 1)
    }
}
