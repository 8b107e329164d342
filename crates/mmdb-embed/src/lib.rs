//! Offline, deterministic embedders for the multimodal store.
//!
//! These hash token features into a fixed-size vector, the same trick used
//! for fake embeddings in local search pipelines: no model weights, stable
//! output for a fixed input, L2-normalized. A real model (CLIP-style) plugs
//! in behind the same [`MultimodalEmbedder`] boundary; loading and caching
//! such a model is outside this workspace.

use std::hash::{Hash, Hasher};

use twox_hash::XxHash64;

use mmdb_core::error::{Error, Result};
use mmdb_core::traits::{Embedder, MultimodalEmbedder};
use mmdb_core::types::{Modality, ModalitySet, ModalityValue};

mod serializer;

pub use serializer::{ImageTextSerializer, IMAGE_MARKER, IMAGE_PLACEHOLDER};

pub const DEFAULT_DIM: usize = 512;

/// Window width used when hashing raw image bytes.
const IMAGE_WINDOW: usize = 16;

fn hash_feature(dim: usize, vector: &mut [f32], feature: &[u8], position: usize) {
    let mut hasher = XxHash64::with_seed(0);
    feature.hash(&mut hasher);
    let h = hasher.finish();
    let idx = (h as usize) % dim;
    let val = (((h >> 32) as u32) as f32) / (u32::MAX as f32);
    vector[idx] += val + (position as f32 % 3.0) * 0.01;
}

fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt().max(1e-6);
    for x in vector.iter_mut() {
        *x /= norm;
    }
}

fn embed_text_hashed(dim: usize, text: &str) -> Vec<f32> {
    let mut v = vec![0f32; dim];
    for (i, token) in text.split_whitespace().enumerate() {
        hash_feature(dim, &mut v, token.as_bytes(), i);
    }
    l2_normalize(&mut v);
    v
}

fn embed_image_hashed(dim: usize, data: &[u8]) -> Vec<f32> {
    let mut v = vec![0f32; dim];
    for (i, window) in data.chunks(IMAGE_WINDOW).enumerate() {
        hash_feature(dim, &mut v, window, i);
    }
    l2_normalize(&mut v);
    v
}

/// Hash-based `MultimodalEmbedder` over `{text, image}`.
pub struct HashingMultimodalEmbedder {
    dim: usize,
}

impl HashingMultimodalEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }
}

impl Default for HashingMultimodalEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_DIM)
    }
}

impl MultimodalEmbedder for HashingMultimodalEmbedder {
    fn dim(&self) -> usize {
        self.dim
    }

    fn modalities(&self) -> ModalitySet {
        [Modality::Text, Modality::Image].into_iter().collect()
    }

    fn embed_by_modality(&self, modality: Modality, value: &ModalityValue) -> Result<Vec<f32>> {
        match (modality, value) {
            (Modality::Text, ModalityValue::Text(text)) => Ok(embed_text_hashed(self.dim, text)),
            (Modality::Image, ModalityValue::Image(data)) => {
                Ok(embed_image_hashed(self.dim, data))
            }
            (Modality::Image, ModalityValue::ImageRef(_)) => Err(Error::InvalidContent(
                "an image reference carries no pixel data to embed".to_string(),
            )),
            (modality, value) => Err(Error::InvalidContent(format!(
                "value of modality '{}' given for modality '{modality}'",
                value.modality()
            ))),
        }
    }
}

/// The same text path exposed through the single-modality `Embedder`
/// boundary, for the plain text vector store.
pub struct HashingTextEmbedder {
    dim: usize,
}

impl HashingTextEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }
}

impl Default for HashingTextEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_DIM)
    }
}

impl Embedder for HashingTextEmbedder {
    fn dim(&self) -> usize {
        self.dim
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| embed_text_hashed(self.dim, text)).collect())
    }
}

/// Default embedder for the demo binaries. Dimension is overridable via
/// `APP_EMBEDDING_DIM`.
pub fn get_default_embedder() -> Box<dyn MultimodalEmbedder> {
    let dim = std::env::var("APP_EMBEDDING_DIM")
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(DEFAULT_DIM);
    Box::new(HashingMultimodalEmbedder::new(dim))
}
