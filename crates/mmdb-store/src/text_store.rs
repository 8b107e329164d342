//! The pre-existing, single-modality store shape: text in, text out, one
//! injected embedding function. This is the kind of store the duct-tape
//! adapter wraps without modification.

use mmdb_core::error::{Error, Result};
use mmdb_core::traits::{Embedder, VectorReaderWriter};
use mmdb_core::types::Meta;

/// A stored text entry as returned by a search.
#[derive(Debug, Clone, PartialEq)]
pub struct TextDocument {
    pub page_content: String,
    pub metadata: Meta,
}

pub struct TextVectorStore<RW: VectorReaderWriter> {
    reader_writer: RW,
    embedder: Box<dyn Embedder>,
}

impl<RW: VectorReaderWriter> TextVectorStore<RW> {
    pub fn new(reader_writer: RW, embedder: Box<dyn Embedder>) -> Self {
        Self { reader_writer, embedder }
    }

    /// Run texts through the embedding function and store the resulting
    /// entries. The store treats each text as an opaque blob.
    pub fn add_texts(
        &self,
        texts: &[String],
        metadatas: Option<&[Meta]>,
        ids: Option<&[String]>,
    ) -> Result<Vec<String>> {
        if let Some(metadatas) = metadatas {
            if metadatas.len() != texts.len() {
                return Err(Error::ArityMismatch(format!(
                    "{} texts but {} metadatas",
                    texts.len(),
                    metadatas.len()
                )));
            }
        }
        if let Some(ids) = ids {
            if ids.len() != texts.len() {
                return Err(Error::ArityMismatch(format!(
                    "{} texts but {} ids",
                    texts.len(),
                    ids.len()
                )));
            }
        }
        let vectors = self.embedder.embed_batch(texts)?;
        self.reader_writer.store_contents(texts, &vectors, metadatas, ids)
    }

    pub fn similarity_search(
        &self,
        query: &str,
        k: usize,
        filter: Option<&Meta>,
    ) -> Result<Vec<TextDocument>> {
        Ok(self
            .similarity_search_with_score(query, k, filter)?
            .into_iter()
            .map(|(document, _)| document)
            .collect())
    }

    /// Like `similarity_search` but paired with a similarity score (higher
    /// is better).
    pub fn similarity_search_with_score(
        &self,
        query: &str,
        k: usize,
        filter: Option<&Meta>,
    ) -> Result<Vec<(TextDocument, f32)>> {
        let search_vector = self.embedder.embed_query(query)?;
        let hits = self.reader_writer.search_by_vector(&search_vector, k, filter)?;
        Ok(hits
            .into_iter()
            .map(|hit| {
                (
                    TextDocument { page_content: hit.stored, metadata: hit.metadata },
                    1.0 - hit.distance,
                )
            })
            .collect())
    }

    pub fn clear(&self) -> Result<()> {
        self.reader_writer.clear()
    }
}
