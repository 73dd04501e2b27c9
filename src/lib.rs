//! Course materials assistant: a retrieval-augmented chat service over
//! course transcripts, plus a terminal client for it.

pub mod client;
pub mod core;
pub mod documents;
pub mod llm;
pub mod rag;
pub mod server;
pub mod session;
pub mod state;
pub mod tools;
pub mod vector;

#[cfg(test)]
mod test_support;
