//! Duct-tape adapter: multimodal storage on top of an unmodified text-only
//! vector store.
//!
//! The trick: a text store treats stored content as an opaque string and
//! calls an injected embedding function on it. So each multimodal item is
//! wrapped, together with its already-computed embedding vector, into one
//! self-describing string, and the injected function is a pass-through that
//! parses the vector back out instead of computing anything. Not the
//! cleanest way to go multimodal, but it works against arbitrary stores
//! right now.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use mmdb_core::error::{Error, Result};
use mmdb_core::traits::{
    check_modality_cover, ContentSerializer, Embedder, MultimodalEmbedder, VectorReaderWriter,
};
use mmdb_core::types::{Content, Document, Meta, Modality, StoredDocument};
use mmdb_store::{TextDocument, TextVectorStore};

pub mod utils;

use utils::{pack_vector, unpack_vector};

/// The opaque string handed to the base store as "text".
///
/// Private to the adapter/base-store pair; stable within one adapter version
/// so stored entries round-trip. Field order is alphabetical and fixed.
#[derive(Debug, Serialize, Deserialize)]
struct WrappedEntry {
    embedding_vector: String,
    stored: BTreeMap<Modality, String>,
    vector_dimension: usize,
}

fn wrap_for_base_store(
    serializer: &dyn ContentSerializer,
    content: &Content,
    embedding_vector: &[f32],
) -> Result<String> {
    let entry = WrappedEntry {
        embedding_vector: pack_vector(embedding_vector),
        stored: serializer.serialize_content(content)?,
        vector_dimension: embedding_vector.len(),
    };
    serde_json::to_string(&entry)
        .map_err(|e| Error::Backend(format!("wrapped-entry encoding failed: {e}")))
}

fn unwrap_from_base_store(
    serializer: &dyn ContentSerializer,
    wrapped: &str,
    metadata: &Meta,
) -> Result<Content> {
    let entry: WrappedEntry = serde_json::from_str(wrapped)
        .map_err(|e| Error::Backend(format!("wrapped-entry decoding failed: {e}")))?;
    serializer.deserialize_stored(&entry.stored, metadata)
}

/// Embedding function registered with the base store.
///
/// Two explicit modes:
/// - structured input: the text parses as a [`WrappedEntry`] and the packed
///   vector is returned verbatim;
/// - fallback: anything else (notably the arbitrary calibration string some
///   stores probe the function with to learn the dimension) yields a zero
///   vector of the configured dimension. This branch never errors.
pub struct PassthroughEmbedder {
    dimension: usize,
}

impl PassthroughEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl Embedder for PassthroughEmbedder {
    fn dim(&self) -> usize {
        self.dimension
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|text| match serde_json::from_str::<WrappedEntry>(text) {
                Ok(entry) => match unpack_vector(&entry.embedding_vector, entry.vector_dimension) {
                    Ok(vector) => vector,
                    Err(_) => vec![0.0; self.dimension],
                },
                Err(_) => vec![0.0; self.dimension],
            })
            .collect())
    }
}

/// The minimal surface the adapter needs from the store it wraps.
pub trait BaseTextStore: Send + Sync {
    fn add_texts(
        &self,
        texts: &[String],
        metadatas: Option<&[Meta]>,
        ids: Option<&[String]>,
    ) -> Result<Vec<String>>;

    fn similarity_search_with_score(
        &self,
        query: &str,
        k: usize,
        filter: Option<&Meta>,
    ) -> Result<Vec<(TextDocument, f32)>>;

    fn clear(&self) -> Result<()>;
}

impl<RW: VectorReaderWriter> BaseTextStore for TextVectorStore<RW> {
    fn add_texts(
        &self,
        texts: &[String],
        metadatas: Option<&[Meta]>,
        ids: Option<&[String]>,
    ) -> Result<Vec<String>> {
        TextVectorStore::add_texts(self, texts, metadatas, ids)
    }

    fn similarity_search_with_score(
        &self,
        query: &str,
        k: usize,
        filter: Option<&Meta>,
    ) -> Result<Vec<(TextDocument, f32)>> {
        TextVectorStore::similarity_search_with_score(self, query, k, filter)
    }

    fn clear(&self) -> Result<()> {
        TextVectorStore::clear(self)
    }
}

/// Multimodal store routed through an unmodified text store.
pub struct DuctTapeStore<B: BaseTextStore> {
    base_store: B,
    embedder: Arc<dyn MultimodalEmbedder>,
    serializer: Arc<dyn ContentSerializer>,
}

impl<B: BaseTextStore> DuctTapeStore<B> {
    pub fn new(
        base_store: B,
        embedder: Arc<dyn MultimodalEmbedder>,
        serializer: Arc<dyn ContentSerializer>,
    ) -> Result<Self> {
        check_modality_cover(embedder.as_ref(), serializer.as_ref())?;
        Ok(Self { base_store, embedder, serializer })
    }

    pub fn base_store(&self) -> &B {
        &self.base_store
    }

    /// Embed each content, wrap it with its vector, and push the wrapped
    /// strings through the base store's native text-insertion path. The
    /// base store calls the pass-through function internally and gets the
    /// correct vector back.
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
        let embedding_vectors = self.embedder.embed_many(contents)?;
        let wrapped: Vec<String> = contents
            .iter()
            .zip(embedding_vectors.iter())
            .map(|(content, vector)| wrap_for_base_store(self.serializer.as_ref(), content, vector))
            .collect::<Result<_>>()?;
        self.base_store.add_texts(&wrapped, metadatas, ids)
    }

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

    /// Wrap the query the same way and run it through the base store's
    /// native search, then unwrap each hit's blob back into a content.
    ///
    /// When a hit's metadata cannot reverse a lossy encoding (e.g. no
    /// `image_path` was stored), the value degrades to a placeholder rather
    /// than failing.
    pub fn similarity_search(
        &self,
        query: &Content,
        k: usize,
        filter: Option<&Meta>,
    ) -> Result<Vec<StoredDocument>> {
        let search_vector = self.embedder.embed_one(query)?;
        let wrapped_query = wrap_for_base_store(self.serializer.as_ref(), query, &search_vector)?;
        let base_results = self
            .base_store
            .similarity_search_with_score(&wrapped_query, k, filter)?;
        base_results
            .into_iter()
            .map(|(document, score)| {
                let content = unwrap_from_base_store(
                    self.serializer.as_ref(),
                    &document.page_content,
                    &document.metadata,
                )?;
                Ok(StoredDocument { content, metadata: document.metadata, score })
            })
            .collect()
    }

    pub fn clear(&self) -> Result<()> {
        self.base_store.clear()
    }
}

/// Assemble a multimodal store on top of a caller-built base store.
///
/// The base store usually offers no way to set the vector dimension
/// explicitly, so it is probed by embedding `probe_content` once; the
/// builder receives the pass-through embedding function to inject into the
/// base store's constructor.
pub fn make_multimodal<B, F>(
    embedder: Arc<dyn MultimodalEmbedder>,
    serializer: Arc<dyn ContentSerializer>,
    probe_content: &Content,
    build_base: F,
) -> Result<DuctTapeStore<B>>
where
    B: BaseTextStore,
    F: FnOnce(Box<dyn Embedder>) -> Result<B>,
{
    let embedding_dimension = embedder.embed_one(probe_content)?.len();
    let base_store = build_base(Box::new(PassthroughEmbedder::new(embedding_dimension)))?;
    DuctTapeStore::new(base_store, embedder, serializer)
}

/// Default probe used when the caller has nothing better: a plain text
/// sample, which any text-capable embedder accepts.
pub fn default_probe_content() -> Content {
    Content::text("This is a sample sentence.")
}
