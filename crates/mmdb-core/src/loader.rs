//! Turns externally scraped page segments and local files into `Document`s.
//!
//! Scraping itself (HTTP, HTML parsing) is outside this crate; loaders here
//! consume pre-parsed segment sequences or local directories. The one rule
//! the rest of the system depends on: a chunk never mixes modalities, so any
//! pending text buffer is flushed before and after an image, in encounter
//! order.

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};

use crate::types::{Content, Document, Meta};

/// One pre-parsed piece of a page, in encounter order.
#[derive(Debug, Clone)]
pub enum PageSegment {
    Text(String),
    Image { data: Vec<u8>, source: String },
}

#[derive(Debug, Clone)]
pub struct ChunkingConfig {
    pub max_words: usize,
    pub overlap_percent: f32,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { max_words: 300, overlap_percent: 0.2 }
    }
}

/// Assembles an in-order segment sequence into single-modality documents.
#[derive(Default)]
pub struct DocumentAssembler {
    chunking_config: ChunkingConfig,
}

impl DocumentAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_chunking(chunking_config: ChunkingConfig) -> Self {
        Self { chunking_config }
    }

    /// Adjacent text segments are buffered and joined; the buffer is flushed
    /// to its own document before each image and at end of input. Images
    /// become their own documents carrying an `image_source` entry merged
    /// over the page metadata.
    pub fn assemble(&self, segments: Vec<PageSegment>, page_metadata: &Meta) -> Vec<Document> {
        let mut documents = Vec::new();
        let mut buffer: Vec<String> = Vec::new();
        for segment in segments {
            match segment {
                PageSegment::Text(text) => {
                    let text = text.trim().to_string();
                    if !text.is_empty() {
                        buffer.push(text);
                    }
                }
                PageSegment::Image { data, source } => {
                    flush_text_buffer(&mut buffer, page_metadata, &mut documents);
                    let mut metadata = page_metadata.clone();
                    metadata.insert("image_source".to_string(), source);
                    documents
                        .push(Document::new(Content::image(data)).with_metadata(metadata));
                }
            }
        }
        flush_text_buffer(&mut buffer, page_metadata, &mut documents);
        documents
    }

    /// Like `assemble`, but long text documents are split into overlapping
    /// word-window chunks. Image documents pass through untouched.
    pub fn assemble_and_split(
        &self,
        segments: Vec<PageSegment>,
        page_metadata: &Meta,
    ) -> Vec<Document> {
        let mut split_docs = Vec::new();
        for document in self.assemble(segments, page_metadata) {
            match document.content.get(crate::types::Modality::Text) {
                Some(crate::types::ModalityValue::Text(text))
                    if text.split_whitespace().count() > self.chunking_config.max_words =>
                {
                    for piece in self.split_text_with_overlap(text) {
                        split_docs.push(
                            Document::new(Content::text(piece))
                                .with_metadata(document.metadata.clone()),
                        );
                    }
                }
                _ => split_docs.push(document),
            }
        }
        split_docs
    }

    fn split_text_with_overlap(&self, text: &str) -> Vec<String> {
        let words: Vec<&str> = text.split_whitespace().collect();
        let words_per_chunk = self.chunking_config.max_words.max(1);
        // overlap strictly smaller than the window keeps the walk advancing
        let overlap_words = ((words_per_chunk as f32 * self.chunking_config.overlap_percent)
            as usize)
            .min(words_per_chunk - 1);
        let mut chunks = Vec::new();
        let mut start = 0;
        while start < words.len() {
            let end = (start + words_per_chunk).min(words.len());
            chunks.push(words[start..end].join(" "));
            if end >= words.len() {
                break;
            }
            start = end - overlap_words;
        }
        chunks
    }
}

fn flush_text_buffer(buffer: &mut Vec<String>, page_metadata: &Meta, documents: &mut Vec<Document>) {
    if !buffer.is_empty() {
        let full_text = buffer.join("\n");
        documents.push(Document::new(Content::text(full_text)).with_metadata(page_metadata.clone()));
        buffer.clear();
    }
}

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Loads a local directory: `.txt` files become (split) text documents,
/// image files become image documents with an `image_path` metadata entry.
#[derive(Default)]
pub struct DirectoryLoader {
    assembler: DocumentAssembler,
}

impl DirectoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_directory(&self, data_dir: &Path) -> Result<Vec<Document>> {
        let files = list_loadable_files(data_dir);
        if files.is_empty() {
            println!("No .txt or image files found under {}.", data_dir.display());
            return Ok(vec![]);
        }
        let mut documents = Vec::new();
        for (file_index, file_path) in files.iter().enumerate() {
            println!("Loading file {}/{}: {}", file_index + 1, files.len(), file_path.display());
            let mut metadata = Meta::new();
            metadata.insert("source".to_string(), file_path.to_string_lossy().to_string());
            if file_path.extension().and_then(|s| s.to_str()) == Some("txt") {
                let text = read_file_content(file_path)?;
                documents.extend(
                    self.assembler
                        .assemble_and_split(vec![PageSegment::Text(text)], &metadata),
                );
            } else {
                let data = fs::read(file_path)?;
                metadata.insert(
                    "image_path".to_string(),
                    file_path.to_string_lossy().to_string(),
                );
                documents.push(Document::new(Content::image(data)).with_metadata(metadata));
            }
        }
        println!("Loaded {} files into {} documents", files.len(), documents.len());
        Ok(documents)
    }
}

fn read_file_content(file_path: &Path) -> Result<String> {
    match fs::read_to_string(file_path) {
        Ok(content) => Ok(content),
        Err(_) => Ok(String::from_utf8_lossy(&fs::read(file_path)?).to_string()),
    }
}

fn list_loadable_files(root: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for entry in walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        let path = entry.path();
        if let Some(ext) = path.extension().and_then(|s| s.to_str()) {
            let ext = ext.to_ascii_lowercase();
            if ext == "txt" || IMAGE_EXTENSIONS.contains(&ext.as_str()) {
                files.push(path.to_path_buf());
            }
        }
    }
    files.sort();
    files
}
