//! RAG (Retrieval-Augmented Generation) module.
//!
//! This module provides:
//! - `RagSystem`: query orchestration and course ingestion
//! - `Source`: answer citations, plain or linked

mod source;
mod system;

pub use source::Source;
pub use system::{ClearSessionRequest, CourseAnalytics, QueryRequest, QueryResponse, RagSystem};
