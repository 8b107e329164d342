//! Composition root: embedding combinator + content serializer + storage
//! port, exposed as add/search at the content level.

use std::sync::Arc;

use mmdb_core::error::{Error, Result};
use mmdb_core::traits::{
    check_modality_cover, ContentSerializer, MultimodalEmbedder, VectorReaderWriter,
};
use mmdb_core::types::{Content, Document, Meta, StoredDocument};

pub struct MultimodalVectorStore<RW: VectorReaderWriter> {
    reader_writer: RW,
    embedder: Arc<dyn MultimodalEmbedder>,
    serializer: Arc<dyn ContentSerializer>,
}

impl<RW: VectorReaderWriter> MultimodalVectorStore<RW> {
    /// Fails with [`Error::InvalidConfig`] unless every modality the
    /// embedder knows is also covered by the serializer.
    pub fn new(
        reader_writer: RW,
        embedder: Arc<dyn MultimodalEmbedder>,
        serializer: Arc<dyn ContentSerializer>,
    ) -> Result<Self> {
        check_modality_cover(embedder.as_ref(), serializer.as_ref())?;
        Ok(Self { reader_writer, embedder, serializer })
    }

    pub fn embedder(&self) -> &dyn MultimodalEmbedder {
        self.embedder.as_ref()
    }

    /// Embed and store a batch of contents.
    ///
    /// All-or-nothing: validation and embedding happen before any storage
    /// call, and a storage failure aborts the whole batch.
    pub fn add_contents(
        &self,
        contents: &[Content],
        metadatas: Option<&[Meta]>,
        ids: Option<&[String]>,
    ) -> Result<Vec<String>> {
        if let Some(metadatas) = metadatas {
            if metadatas.len() != contents.len() {
                return Err(Error::ArityMismatch(format!(
                    "{} contents but {} metadatas",
                    contents.len(),
                    metadatas.len()
                )));
            }
        }
        if let Some(ids) = ids {
            if ids.len() != contents.len() {
                return Err(Error::ArityMismatch(format!(
                    "{} contents but {} ids",
                    contents.len(),
                    ids.len()
                )));
            }
        }
        let vectors = self.embedder.embed_many(contents)?;
        let content_strings = contents
            .iter()
            .map(|content| self.serializer.serialize_content_to_stored_str(content))
            .collect::<Result<Vec<_>>>()?;
        self.reader_writer.store_contents(&content_strings, &vectors, metadatas, ids)
    }

    /// Unpack documents to parallel arrays and delegate to `add_contents`,
    /// preserving order. When any document carries an id, missing ones are
    /// filled with generated uuids so the arrays stay aligned.
    pub fn add_documents(&self, documents: &[Document]) -> Result<Vec<String>> {
        let contents: Vec<Content> = documents.iter().map(|d| d.content.clone()).collect();
        let metadatas: Vec<Meta> = documents.iter().map(|d| d.metadata.clone()).collect();
        let ids = if documents.iter().any(|d| d.id.is_some()) {
            Some(
                documents
                    .iter()
                    .map(|d| {
                        d.id.clone()
                            .unwrap_or_else(|| uuid::Uuid::new_v4().simple().to_string())
                    })
                    .collect::<Vec<_>>(),
            )
        } else {
            None
        };
        self.add_contents(&contents, Some(&metadatas), ids.as_deref())
    }

    /// Return the stored documents most similar to the query content,
    /// best first, reconstructed through the serializer.
    pub fn similarity_search(
        &self,
        query: &Content,
        k: usize,
        filter: Option<&Meta>,
    ) -> Result<Vec<StoredDocument>> {
        let search_vector = self.embedder.embed_one(query)?;
        let hits = self.reader_writer.search_by_vector(&search_vector, k, filter)?;
        hits.into_iter()
            .map(|hit| {
                let content = self
                    .serializer
                    .deserialize_stored_str_to_content(&hit.stored, &hit.metadata)?;
                Ok(StoredDocument {
                    content,
                    metadata: hit.metadata,
                    score: 1.0 - hit.distance,
                })
            })
            .collect()
    }

    pub fn clear(&self) -> Result<()> {
        self.reader_writer.clear()
    }
}
