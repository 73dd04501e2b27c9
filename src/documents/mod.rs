//! Course document processing.
//!
//! - `ChunkSettings` / `split_into_chunks`: fixed-window chunking with exact overlap
//! - `DocumentProcessor`: header + lesson parsing into a `Course` and its `CourseChunk`s

mod chunker;
mod processor;
mod types;

use thiserror::Error;

pub use chunker::{split_into_chunks, ChunkSettings, TextSpan};
pub use processor::{DocumentProcessor, ProcessedDocument};
pub use types::{Course, CourseChunk, Lesson};

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("chunk_overlap ({chunk_overlap}) must be smaller than chunk_size ({chunk_size})")]
    InvalidChunkSettings {
        chunk_size: usize,
        chunk_overlap: usize,
    },
}
