//! mmdb-store
//!
//! Content-level vector stores: the multimodal composition root, the plain
//! single-modality text store, and an in-memory storage backend for tests
//! and demos.

pub mod memory;
pub mod store;
pub mod text_store;

pub use memory::MemoryVectorReaderWriter;
pub use store::MultimodalVectorStore;
pub use text_store::{TextDocument, TextVectorStore};
