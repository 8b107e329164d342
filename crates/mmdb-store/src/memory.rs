//! In-memory storage backend: exhaustive cosine scan over `RwLock`ed rows.
//!
//! Good for tests, demos and small working sets; anything larger belongs in
//! a real backend behind the same [`VectorReaderWriter`] port.

use std::sync::RwLock;

use mmdb_core::error::{Error, Result};
use mmdb_core::traits::VectorReaderWriter;
use mmdb_core::types::{Meta, SearchHit};

#[derive(Debug, Clone)]
struct MemoryEntry {
    id: String,
    content: String,
    vector: Vec<f32>,
    metadata: Meta,
}

#[derive(Default)]
pub struct MemoryVectorReaderWriter {
    entries: RwLock<Vec<MemoryEntry>>,
}

impl MemoryVectorReaderWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    1.0 - dot / (norm_a * norm_b).max(1e-12)
}

fn matches_filter(metadata: &Meta, filter: &Meta) -> bool {
    filter.iter().all(|(key, value)| metadata.get(key) == Some(value))
}

impl VectorReaderWriter for MemoryVectorReaderWriter {
    fn store_contents(
        &self,
        contents: &[String],
        vectors: &[Vec<f32>],
        metadatas: Option<&[Meta]>,
        ids: Option<&[String]>,
    ) -> Result<Vec<String>> {
        if contents.len() != vectors.len() {
            return Err(Error::ArityMismatch(format!(
                "{} contents but {} vectors",
                contents.len(),
                vectors.len()
            )));
        }
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
        let mut entries = self
            .entries
            .write()
            .map_err(|_| Error::Backend("memory store lock poisoned".to_string()))?;
        let mut inserted = Vec::with_capacity(contents.len());
        for (i, (content, vector)) in contents.iter().zip(vectors.iter()).enumerate() {
            let id = match ids {
                Some(ids) => ids[i].clone(),
                None => uuid::Uuid::new_v4().simple().to_string(),
            };
            let metadata = metadatas.map(|m| m[i].clone()).unwrap_or_default();
            let entry = MemoryEntry {
                id: id.clone(),
                content: content.clone(),
                vector: vector.clone(),
                metadata,
            };
            // upsert: last write for an id wins
            match entries.iter_mut().find(|e| e.id == id) {
                Some(existing) => *existing = entry,
                None => entries.push(entry),
            }
            inserted.push(id);
        }
        Ok(inserted)
    }

    fn search_by_vector(
        &self,
        vector: &[f32],
        k: usize,
        filter: Option<&Meta>,
    ) -> Result<Vec<SearchHit>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| Error::Backend("memory store lock poisoned".to_string()))?;
        let mut hits: Vec<SearchHit> = entries
            .iter()
            .filter(|entry| filter.map_or(true, |f| matches_filter(&entry.metadata, f)))
            .map(|entry| SearchHit {
                id: entry.id.clone(),
                stored: entry.content.clone(),
                metadata: entry.metadata.clone(),
                distance: cosine_distance(vector, &entry.vector),
            })
            .collect();
        hits.sort_by(|a, b| a.distance.partial_cmp(&b.distance).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(k);
        Ok(hits)
    }

    fn clear(&self) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| Error::Backend("memory store lock poisoned".to_string()))?;
        entries.clear();
        Ok(())
    }
}
