//! LanceDB-backed storage port.
//!
//! The LanceDB client is async; this crate owns a tokio runtime and blocks
//! on it so the [`VectorReaderWriter`] surface stays synchronous like the
//! rest of the core.

use anyhow::Result;
use futures::TryStreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{connect, Connection, DistanceType};
use std::path::Path;
use std::sync::Arc;

use arrow_array::{FixedSizeListArray, RecordBatch, RecordBatchIterator, StringArray};

use mmdb_core::error::{Error, Result as CoreResult};
use mmdb_core::traits::VectorReaderWriter;
use mmdb_core::types::{Meta, SearchHit};

pub mod schema;

use schema::build_arrow_schema;

const INSERT_BATCH_SIZE: usize = 1000;

pub struct LanceVectorReaderWriter {
    rt: tokio::runtime::Runtime,
    db: Connection,
    table_name: String,
    dim: usize,
}

impl LanceVectorReaderWriter {
    pub fn new(db_path: &Path, table_name: &str, dim: usize) -> Result<Self> {
        let rt = tokio::runtime::Runtime::new()?;
        let db = rt.block_on(async { connect(db_path.to_string_lossy().as_ref()).execute().await })?;
        Ok(Self { rt, db, table_name: table_name.to_string(), dim })
    }

    fn rows_to_record_batch(
        &self,
        ids: &[String],
        contents: &[String],
        metadatas: &[String],
        vectors: &[Vec<f32>],
    ) -> Result<RecordBatch> {
        let schema = build_arrow_schema(self.dim as i32);
        let vector_values: Vec<Option<Vec<Option<f32>>>> = vectors
            .iter()
            .map(|v| Some(v.iter().map(|&x| Some(x)).collect()))
            .collect();
        let record_batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(StringArray::from(ids.to_vec())),
                Arc::new(StringArray::from(contents.to_vec())),
                Arc::new(StringArray::from(metadatas.to_vec())),
                Arc::new(FixedSizeListArray::from_iter_primitive::<
                    arrow_array::types::Float32Type,
                    _,
                    _,
                >(vector_values.into_iter(), self.dim as i32)),
            ],
        )?;
        Ok(record_batch)
    }

    // upsert contract: rows under the given ids are removed before the
    // replacement rows are appended
    async fn delete_rows_by_id(&self, ids: &[String]) -> Result<()> {
        if !self.db.table_names().execute().await?.contains(&self.table_name) {
            return Ok(());
        }
        let table = self.db.open_table(&self.table_name).execute().await?;
        let id_list = ids
            .iter()
            .map(|id| format!("'{}'", id.replace('\'', "''")))
            .collect::<Vec<_>>()
            .join(", ");
        table.delete(&format!("id IN ({id_list})")).await?;
        Ok(())
    }

    async fn insert_batch(&self, record_batch: RecordBatch) -> Result<()> {
        let schema = record_batch.schema();
        let reader = Box::new(RecordBatchIterator::new(vec![Ok(record_batch)].into_iter(), schema));
        if self.db.table_names().execute().await?.contains(&self.table_name) {
            self.db.open_table(&self.table_name).execute().await?.add(reader).execute().await?;
        } else {
            self.db.create_table(&self.table_name, reader).execute().await?;
        }
        Ok(())
    }

    fn store_impl(
        &self,
        contents: &[String],
        vectors: &[Vec<f32>],
        metadatas: Option<&[Meta]>,
        ids: Option<&[String]>,
    ) -> Result<Vec<String>> {
        let row_ids: Vec<String> = match ids {
            Some(ids) => ids.to_vec(),
            None => contents
                .iter()
                .map(|_| uuid::Uuid::new_v4().simple().to_string())
                .collect(),
        };
        // generated ids are fresh, only caller-supplied ones can collide
        if ids.is_some() && !row_ids.is_empty() {
            self.rt.block_on(self.delete_rows_by_id(&row_ids))?;
        }
        let metadata_strings: Vec<String> = match metadatas {
            Some(metadatas) => metadatas
                .iter()
                .map(serde_json::to_string)
                .collect::<std::result::Result<_, _>>()?,
            None => vec!["{}".to_string(); contents.len()],
        };
        let pb = if contents.len() > INSERT_BATCH_SIZE {
            let pb = ProgressBar::new(contents.len() as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} rows ({percent}%)")?
                    .progress_chars("#>-"),
            );
            Some(pb)
        } else {
            None
        };
        let mut start = 0usize;
        while start < contents.len() {
            let end = (start + INSERT_BATCH_SIZE).min(contents.len());
            let record_batch = self.rows_to_record_batch(
                &row_ids[start..end],
                &contents[start..end],
                &metadata_strings[start..end],
                &vectors[start..end],
            )?;
            self.rt.block_on(self.insert_batch(record_batch))?;
            if let Some(pb) = &pb {
                pb.set_position(end as u64);
            }
            start = end;
        }
        if let Some(pb) = &pb {
            pb.finish_with_message("insert complete");
        }
        Ok(row_ids)
    }

    fn search_impl(
        &self,
        vector: &[f32],
        k: usize,
        filter: Option<&Meta>,
    ) -> Result<Vec<SearchHit>> {
        let table = self.rt.block_on(self.db.open_table(&self.table_name).execute())?;
        // over-fetch when post-filtering so k survivors usually remain
        let fetch_limit = if filter.is_some() { k * 10 } else { k };
        let mut results = self.rt.block_on(
            table
                .vector_search(vector.to_vec())?
                .distance_type(DistanceType::Cosine)
                .limit(fetch_limit)
                .execute(),
        )?;
        let mut hits = Vec::new();
        while let Some(batch) = self.rt.block_on(results.try_next())? {
            for i in 0..batch.num_rows() {
                let id = batch
                    .column_by_name("id")
                    .and_then(|c| c.as_any().downcast_ref::<arrow_array::StringArray>())
                    .map(|c| c.value(i).to_string())
                    .unwrap_or_default();
                let stored = batch
                    .column_by_name("content")
                    .and_then(|c| c.as_any().downcast_ref::<arrow_array::StringArray>())
                    .map(|c| c.value(i).to_string())
                    .unwrap_or_default();
                let metadata: Meta = batch
                    .column_by_name("metadata")
                    .and_then(|c| c.as_any().downcast_ref::<arrow_array::StringArray>())
                    .and_then(|c| serde_json::from_str(c.value(i)).ok())
                    .unwrap_or_default();
                let distance = batch
                    .column_by_name("_distance")
                    .and_then(|c| c.as_any().downcast_ref::<arrow_array::Float32Array>())
                    .map(|c| c.value(i))
                    .unwrap_or(0.0);
                if let Some(filter) = filter {
                    if !filter.iter().all(|(key, value)| metadata.get(key) == Some(value)) {
                        continue;
                    }
                }
                hits.push(SearchHit { id, stored, metadata, distance });
            }
        }
        hits.sort_by(|a, b| a.distance.partial_cmp(&b.distance).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(k);
        Ok(hits)
    }

    fn clear_impl(&self) -> Result<()> {
        let table_names = self.rt.block_on(self.db.table_names().execute())?;
        if table_names.contains(&self.table_name) {
            self.rt.block_on(self.db.drop_table(&self.table_name, &[]))?;
        }
        Ok(())
    }
}

impl VectorReaderWriter for LanceVectorReaderWriter {
    fn store_contents(
        &self,
        contents: &[String],
        vectors: &[Vec<f32>],
        metadatas: Option<&[Meta]>,
        ids: Option<&[String]>,
    ) -> CoreResult<Vec<String>> {
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
        self.store_impl(contents, vectors, metadatas, ids).map_err(Error::backend)
    }

    fn search_by_vector(
        &self,
        vector: &[f32],
        k: usize,
        filter: Option<&Meta>,
    ) -> CoreResult<Vec<SearchHit>> {
        let table_names = self
            .rt
            .block_on(self.db.table_names().execute())
            .map_err(Error::backend)?;
        if !table_names.contains(&self.table_name) {
            // nothing stored yet
            return Ok(vec![]);
        }
        self.search_impl(vector, k, filter).map_err(Error::backend)
    }

    fn clear(&self) -> CoreResult<()> {
        self.clear_impl().map_err(Error::backend)
    }
}
