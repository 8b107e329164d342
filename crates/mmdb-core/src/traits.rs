//! Interface contracts between the embedding, serialization and storage
//! layers. Concrete strategies live in the sibling crates; the defaulted
//! methods here carry the behavior every implementation shares.

use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::types::{Content, Meta, Modality, ModalitySet, ModalityValue, SearchHit};

/// Modality-aware embedding combinator.
///
/// Implementations provide `embed_by_modality` for every modality in their
/// registry; `embed_one` merges the per-modality vectors by coordinate-wise
/// arithmetic mean. The mean is the fixed, deliberately simple policy: raw
/// per-modality embeddings are not calibrated against each other, so queries
/// that mix modalities are expected to be noisier than single-modality ones.
pub trait MultimodalEmbedder: Send + Sync {
    /// Fixed output dimensionality of every vector this embedder produces.
    fn dim(&self) -> usize;

    /// The modality registry: which modalities `embed_by_modality` accepts.
    fn modalities(&self) -> ModalitySet;

    /// Single-modality embedding. Must return a vector of `dim()` floats.
    fn embed_by_modality(&self, modality: Modality, value: &ModalityValue) -> Result<Vec<f32>>;

    /// Embed one multimodal content item.
    ///
    /// Fails with [`Error::InvalidContent`] when the content is empty or
    /// names a modality outside the registry.
    fn embed_one(&self, content: &Content) -> Result<Vec<f32>> {
        if content.is_empty() {
            return Err(Error::InvalidContent("content has no fields".to_string()));
        }
        let registry = self.modalities();
        for (modality, _) in content {
            if !registry.contains(modality) {
                return Err(Error::InvalidContent(format!(
                    "modality '{modality}' is not recognized by this embedder"
                )));
            }
        }
        let dim = self.dim();
        let mut acc = vec![0.0f32; dim];
        let mut count = 0usize;
        for (modality, value) in content {
            let vector = self.embed_by_modality(*modality, value)?;
            if vector.len() != dim {
                return Err(Error::InvalidConfig(format!(
                    "embedding for modality '{modality}' has dimension {}, expected {dim}",
                    vector.len()
                )));
            }
            for (a, x) in acc.iter_mut().zip(vector.iter()) {
                *a += x;
            }
            count += 1;
        }
        let n = count as f32;
        for a in &mut acc {
            *a /= n;
        }
        Ok(acc)
    }

    /// Embed a sequence of contents, preserving order.
    fn embed_many(&self, contents: &[Content]) -> Result<Vec<Vec<f32>>> {
        contents.iter().map(|content| self.embed_one(content)).collect()
    }
}

/// Converts multimodal content to and from a storable string form.
///
/// `deserialize_stored(serialize_content(c), meta)` need not equal `c`:
/// serialization may be intentionally lossy (images become references). For
/// every modality where `is_lossless` returns true the round trip must be
/// exact.
pub trait ContentSerializer: Send + Sync {
    /// The modality registry: which modalities this serializer handles.
    fn modalities(&self) -> ModalitySet;

    /// Whether the round trip is exact for this modality.
    fn is_lossless(&self, modality: Modality) -> bool;

    /// Encode one native value to a string. Deterministic for a fixed value.
    fn serialize_by_modality(&self, modality: Modality, value: &ModalityValue) -> Result<String>;

    /// Reconstruct a usable value, consulting metadata to recover what the
    /// string form dropped. The default is identity on the stored string.
    fn deserialize_by_modality(
        &self,
        modality: Modality,
        stored: &str,
        metadata: &Meta,
    ) -> Result<ModalityValue> {
        let _ = metadata;
        Ok(match modality {
            Modality::Text => ModalityValue::Text(stored.to_string()),
            Modality::Image => ModalityValue::ImageRef(stored.to_string()),
        })
    }

    /// Apply `serialize_by_modality` per field.
    fn serialize_content(&self, content: &Content) -> Result<BTreeMap<Modality, String>> {
        let registry = self.modalities();
        let mut stored = BTreeMap::new();
        for (modality, value) in content {
            if !registry.contains(modality) {
                return Err(Error::InvalidContent(format!(
                    "modality '{modality}' is not recognized by this serializer"
                )));
            }
            stored.insert(*modality, self.serialize_by_modality(*modality, value)?);
        }
        Ok(stored)
    }

    /// Apply `deserialize_by_modality` per field.
    fn deserialize_stored(
        &self,
        stored: &BTreeMap<Modality, String>,
        metadata: &Meta,
    ) -> Result<Content> {
        let mut content = Content::new();
        for (modality, stored_value) in stored {
            content.insert(self.deserialize_by_modality(*modality, stored_value, metadata)?);
        }
        Ok(content)
    }

    /// Canonical single-string encoding of the whole per-modality map.
    ///
    /// JSON object with keys in modality order, so the output is stable for
    /// a fixed content.
    fn serialize_content_to_stored_str(&self, content: &Content) -> Result<String> {
        let stored = self.serialize_content(content)?;
        serde_json::to_string(&stored)
            .map_err(|e| Error::Backend(format!("stored-string encoding failed: {e}")))
    }

    /// Inverse of `serialize_content_to_stored_str`.
    fn deserialize_stored_str_to_content(&self, stored_str: &str, metadata: &Meta) -> Result<Content> {
        let stored: BTreeMap<Modality, String> = serde_json::from_str(stored_str)
            .map_err(|e| Error::Backend(format!("stored-string decoding failed: {e}")))?;
        self.deserialize_stored(&stored, metadata)
    }
}

/// Single-modality (text) embedding boundary.
///
/// This is the contract a pre-existing text vector store expects from its
/// injected embedding function; the duct-tape pass-through embedder
/// implements it too.
pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_batch(&[text.to_string()])?;
        vectors
            .pop()
            .ok_or_else(|| Error::Backend("embed_batch returned no vector".to_string()))
    }
}

/// Fails with [`Error::InvalidConfig`] unless every modality the embedder
/// knows is also covered by the serializer. Both composition roots run this
/// before any I/O.
pub fn check_modality_cover(
    embedder: &dyn MultimodalEmbedder,
    serializer: &dyn ContentSerializer,
) -> Result<()> {
    let missing: Vec<String> = embedder
        .modalities()
        .difference(&serializer.modalities())
        .map(|m| m.to_string())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(Error::InvalidConfig(format!(
            "serializer does not cover embedder modalities: {}",
            missing.join(", ")
        )))
    }
}

/// Storage port: the whole contract the core requires from a concrete
/// vector database.
pub trait VectorReaderWriter: Send + Sync {
    /// Persist parallel sequences of (blob, vector, metadata, id) tuples.
    ///
    /// Generates unique ids when `ids` is omitted and uses empty metadata
    /// when `metadatas` is omitted. Returns the identifiers actually used,
    /// in input order. Storing under an existing id replaces that entry.
    fn store_contents(
        &self,
        contents: &[String],
        vectors: &[Vec<f32>],
        metadatas: Option<&[Meta]>,
        ids: Option<&[String]>,
    ) -> Result<Vec<String>>;

    /// Up to `k` nearest neighbors by cosine distance, best first. A filter
    /// restricts candidates to exact matches on all given metadata pairs,
    /// equivalent to filtering then ranking.
    fn search_by_vector(
        &self,
        vector: &[f32],
        k: usize,
        filter: Option<&Meta>,
    ) -> Result<Vec<SearchHit>>;

    /// Remove all stored entries. Used for idempotent demo and test setup.
    fn clear(&self) -> Result<()>;
}
