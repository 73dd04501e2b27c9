//! Fixed-window character chunking with exact overlap.

use super::DocumentError;

/// Chunk window measured in characters (Unicode scalar values). Only built
/// through `new`, so `chunk_overlap < chunk_size` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkSettings {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl ChunkSettings {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self, DocumentError> {
        if chunk_size == 0 || chunk_overlap >= chunk_size {
            return Err(DocumentError::InvalidChunkSettings {
                chunk_size,
                chunk_overlap,
            });
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    fn step(&self) -> usize {
        self.chunk_size - self.chunk_overlap
    }
}

/// A chunk of text and its character offset in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSpan {
    pub text: String,
    pub start_offset: usize,
}

/// Splits `text` into windows of at most `chunk_size` characters.
///
/// Every window except the last is full, and each window starts
/// `chunk_size - chunk_overlap` characters after its predecessor, so
/// consecutive windows share exactly `chunk_overlap` characters.
pub fn split_into_chunks(text: &str, settings: &ChunkSettings) -> Vec<TextSpan> {
    let chars: Vec<char> = text.chars().collect();
    let total_chars = chars.len();

    let mut chunks = Vec::new();
    if total_chars == 0 {
        return chunks;
    }

    let mut start = 0;
    loop {
        let end = (start + settings.chunk_size).min(total_chars);
        chunks.push(TextSpan {
            text: chars[start..end].iter().collect(),
            start_offset: start,
        });

        if end == total_chars {
            break;
        }
        start += settings.step();
    }

    chunks
}
