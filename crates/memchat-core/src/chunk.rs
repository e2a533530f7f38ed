//! Overlapping fixed-window text chunker.
//!
//! Splits a [`Document`] into [`Chunk`]s of at most `window` characters,
//! each starting `window - overlap` characters after the previous one.
//! Offsets and lengths are counted in `char`s so slicing never splits a
//! UTF-8 sequence.
//!
//! # Guarantees
//!
//! - A document of `window` characters or fewer yields exactly one chunk
//!   (an empty document yields one empty chunk).
//! - For a document of length `L > W` the chunk count is
//!   `ceil((L - O) / (W - O))`.
//! - Dropping the first `overlap` characters of every chunk after the
//!   first and concatenating reproduces the document text exactly.
//! - [`Chunker::chunks`] is lazy; the iterator is `Clone`, so it can be
//!   restarted from any point.
//!
//! # Example
//!
//! ```rust
//! use memchat_core::chunk::Chunker;
//! use memchat_core::models::Document;
//!
//! let chunker = Chunker::new(10, 4).unwrap();
//! let doc = Document::new("a.txt", "abcdefghijklmnop");
//! let starts: Vec<usize> = chunker.chunks(&doc).map(|c| c.start_offset).collect();
//! assert_eq!(starts, vec![0, 6, 12]);
//! ```

use sha2::{Digest, Sha256};

use crate::error::{ChatError, Result};
use crate::models::{Chunk, Document};

pub const DEFAULT_WINDOW: usize = 500;
pub const DEFAULT_OVERLAP: usize = 100;

/// Validated chunking parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunker {
    window: usize,
    overlap: usize,
}

impl Chunker {
    /// Fails with [`ChatError::InvalidConfig`] unless
    /// `0 < overlap < window`.
    pub fn new(window: usize, overlap: usize) -> Result<Self> {
        if window == 0 || overlap == 0 {
            return Err(ChatError::InvalidConfig(format!(
                "chunk window and overlap must be positive (window={}, overlap={})",
                window, overlap
            )));
        }
        if overlap >= window {
            return Err(ChatError::InvalidConfig(format!(
                "chunk overlap ({}) must be smaller than the window ({})",
                overlap, window
            )));
        }
        Ok(Self { window, overlap })
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    fn step(&self) -> usize {
        self.window - self.overlap
    }

    /// Lazily iterate the chunks of `doc`.
    pub fn chunks<'a>(&self, doc: &'a Document) -> Chunks<'a> {
        Chunks {
            text: &doc.text,
            source_id: &doc.source_id,
            window: self.window,
            step: self.step(),
            byte_pos: 0,
            char_pos: 0,
            index: 0,
            done: false,
        }
    }
}

impl Default for Chunker {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW,
            overlap: DEFAULT_OVERLAP,
        }
    }
}

/// Iterator returned by [`Chunker::chunks`].
#[derive(Debug, Clone)]
pub struct Chunks<'a> {
    text: &'a str,
    source_id: &'a str,
    window: usize,
    step: usize,
    byte_pos: usize,
    char_pos: usize,
    index: i64,
    done: bool,
}

impl Iterator for Chunks<'_> {
    type Item = Chunk;

    fn next(&mut self) -> Option<Chunk> {
        if self.done {
            return None;
        }

        let rest = &self.text[self.byte_pos..];
        let end = byte_offset_of_char(rest, self.window);
        let chunk = make_chunk(self.source_id, self.char_pos, self.index, &rest[..end]);

        if end == rest.len() {
            self.done = true;
        } else {
            // step < window, so this boundary lies strictly inside `rest`.
            self.byte_pos += byte_offset_of_char(rest, self.step);
            self.char_pos += self.step;
        }
        self.index += 1;

        Some(chunk)
    }
}

impl std::iter::FusedIterator for Chunks<'_> {}

/// Byte index of the `n`th char of `s`, or `s.len()` when `s` is shorter.
fn byte_offset_of_char(s: &str, n: usize) -> usize {
    s.char_indices().nth(n).map(|(i, _)| i).unwrap_or(s.len())
}

fn make_chunk(source_id: &str, start_offset: usize, index: i64, text: &str) -> Chunk {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let hash = format!("{:x}", hasher.finalize());

    Chunk {
        text: text.to_string(),
        source_id: source_id.to_string(),
        start_offset,
        chunk_index: index,
        hash,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reassemble(chunks: &[Chunk], overlap: usize) -> String {
        let mut out = String::new();
        for (i, c) in chunks.iter().enumerate() {
            if i == 0 {
                out.push_str(&c.text);
            } else {
                out.extend(c.text.chars().skip(overlap));
            }
        }
        out
    }

    fn expected_count(len: usize, window: usize, overlap: usize) -> usize {
        if len <= window {
            1
        } else {
            (len - overlap).div_ceil(window - overlap)
        }
    }

    #[test]
    fn rejects_bad_parameters() {
        assert!(matches!(Chunker::new(0, 0), Err(ChatError::InvalidConfig(_))));
        assert!(matches!(Chunker::new(10, 0), Err(ChatError::InvalidConfig(_))));
        assert!(matches!(Chunker::new(10, 10), Err(ChatError::InvalidConfig(_))));
        assert!(matches!(Chunker::new(10, 12), Err(ChatError::InvalidConfig(_))));
        assert!(Chunker::new(10, 9).is_ok());
    }

    #[test]
    fn short_document_is_one_chunk() {
        let chunker = Chunker::default();
        let doc = Document::new("a.pdf", "short text");
        let chunks: Vec<Chunk> = chunker.chunks(&doc).collect();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "short text");
        assert_eq!(chunks[0].start_offset, 0);
        assert_eq!(chunks[0].source_id, "a.pdf");
    }

    #[test]
    fn empty_document_is_one_empty_chunk() {
        let chunker = Chunker::new(5, 2).unwrap();
        let doc = Document::new("e.txt", "");
        let chunks: Vec<Chunk> = chunker.chunks(&doc).collect();
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].text.is_empty());
    }

    #[test]
    fn exact_window_is_one_chunk() {
        let chunker = Chunker::new(5, 2).unwrap();
        let doc = Document::new("x", "abcde");
        assert_eq!(chunker.chunks(&doc).count(), 1);
    }

    #[test]
    fn starts_are_step_apart() {
        let chunker = Chunker::new(500, 100).unwrap();
        let text = "x".repeat(1_234);
        let doc = Document::new("big.pdf", text);
        let chunks: Vec<Chunk> = chunker.chunks(&doc).collect();
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.start_offset, i * 400);
            assert_eq!(c.chunk_index, i as i64);
            assert!(c.text.chars().count() <= 500);
        }
        assert_eq!(chunks.len(), expected_count(1_234, 500, 100));
    }

    #[test]
    fn reconstructs_text_and_matches_count() {
        let base = "The quick brown fox jumps over the lazy dog. ";
        for (window, overlap) in [(10, 3), (7, 1), (50, 49), (500, 100)] {
            let chunker = Chunker::new(window, overlap).unwrap();
            for len in [0usize, 1, 6, 7, 10, 11, 49, 50, 51, 137, 1_001] {
                let text: String = base.chars().cycle().take(len).collect();
                let doc = Document::new("d", text.clone());
                let chunks: Vec<Chunk> = chunker.chunks(&doc).collect();
                assert_eq!(
                    reassemble(&chunks, overlap),
                    text,
                    "window={} overlap={} len={}",
                    window,
                    overlap,
                    len
                );
                assert_eq!(chunks.len(), expected_count(len, window, overlap));
            }
        }
    }

    #[test]
    fn multibyte_text_is_split_on_char_boundaries() {
        let text = "ñandú┌──┐€uro".repeat(20);
        let chunker = Chunker::new(7, 3).unwrap();
        let doc = Document::new("u.txt", text.clone());
        let chunks: Vec<Chunk> = chunker.chunks(&doc).collect();
        assert_eq!(reassemble(&chunks, 3), text);
        assert!(chunks.iter().all(|c| c.text.chars().count() <= 7));
    }

    #[test]
    fn iterator_is_restartable() {
        let chunker = Chunker::new(4, 1).unwrap();
        let doc = Document::new("r", "abcdefghij");
        let mut it = chunker.chunks(&doc);
        it.next();
        let snapshot = it.clone();
        let tail_a: Vec<String> = it.map(|c| c.text).collect();
        let tail_b: Vec<String> = snapshot.map(|c| c.text).collect();
        assert_eq!(tail_a, tail_b);
        assert_eq!(tail_a, vec!["defg", "ghij"]);
    }

    #[test]
    fn hashes_are_deterministic() {
        let chunker = Chunker::new(4, 1).unwrap();
        let doc = Document::new("h", "abcdefghij");
        let a: Vec<String> = chunker.chunks(&doc).map(|c| c.hash).collect();
        let b: Vec<String> = chunker.chunks(&doc).map(|c| c.hash).collect();
        assert_eq!(a, b);
        assert_eq!(a[0].len(), 64);
    }
}
