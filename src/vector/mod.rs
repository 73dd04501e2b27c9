//! Vector store over course catalog + course content.

mod embedding;
mod sqlite;
mod store;

pub use embedding::{build_embedder, Embedder, HashEmbedder, OpenAiCompatibleEmbedder};
pub use sqlite::SqliteCourseStore;
pub use store::{CourseStore, SearchHit, SearchQuery, SearchResults};
