//! Retrieval-augmented generation backend.
//!
//! Ingests plain-text documents (chunk, embed, index) and answers
//! queries by threshold-filtered similarity search over the stored
//! vectors, composing a grounded completion from the retrieved context.

pub mod core;
pub mod db;
pub mod documents;
pub mod llm;
pub mod rag;
pub mod server;
pub mod state;
