use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use mmdb_core::config::Settings;
use mmdb_core::loader::DirectoryLoader;
use mmdb_core::types::{Content, Modality, ModalityValue};
use mmdb_embed::{get_default_embedder, ImageTextSerializer};
use mmdb_lance::LanceVectorReaderWriter;
use mmdb_store::MultimodalVectorStore;

fn parse_args() -> (String, Vec<String>) {
    let mut args: Vec<String> = env::args().collect();
    let prog = args.remove(0);
    if args.is_empty() {
        eprintln!("Usage: {} <ingest|query|clear> [args...]", prog);
        std::process::exit(1);
    }
    let cmd = args.remove(0);
    (cmd, args)
}

fn open_store(settings: &Settings) -> anyhow::Result<MultimodalVectorStore<LanceVectorReaderWriter>> {
    let embedder = Arc::from(get_default_embedder());
    let serializer = Arc::new(ImageTextSerializer::new());
    let reader_writer = LanceVectorReaderWriter::new(
        &settings.store_dir(),
        &settings.store.table_name,
        settings.embedding.dim,
    )?;
    Ok(MultimodalVectorStore::new(reader_writer, embedder, serializer)?)
}

fn summarize_value(value: &ModalityValue) -> String {
    match value {
        ModalityValue::Text(text) => {
            let mut summary: String = text.chars().take(60).collect();
            if text.chars().count() > 60 {
                summary.push_str("...");
            }
            summary
        }
        ModalityValue::Image(data) => format!("<{} image bytes>", data.len()),
        ModalityValue::ImageRef(reference) => reference.clone(),
    }
}

fn main() -> anyhow::Result<()> {
    let settings = Settings::load().map_err(|e| {
        eprintln!("Error loading config: {}", e);
        e
    })?;
    let (cmd, args) = parse_args();
    match cmd.as_str() {
        "ingest" => {
            let data_dir = args
                .get(0)
                .map(PathBuf::from)
                .unwrap_or_else(|| settings.raw_data_dir());
            println!("Ingesting from {}", data_dir.display());
            let loader = DirectoryLoader::new();
            let documents = loader.load_directory(&data_dir)?;
            if documents.is_empty() {
                println!("Nothing to ingest.");
                return Ok(());
            }
            let store = open_store(&settings)?;
            let inserted = store.add_documents(&documents)?;
            println!("✅ Ingest complete ({} documents)", inserted.len());
        }
        "query" => {
            let query_text = args.get(0).cloned().unwrap_or_else(|| {
                eprintln!("Usage: mmdb query \"<query>\" [k]");
                std::process::exit(1)
            });
            let k: usize = args.get(1).and_then(|s| s.parse().ok()).unwrap_or(4);
            let store = open_store(&settings)?;
            let results = store.similarity_search(&Content::text(query_text), k, None)?;
            if results.is_empty() {
                println!("No results.");
            }
            for (rank, result) in results.iter().enumerate() {
                println!("{}. score={:.4}", rank + 1, result.score);
                for modality in [Modality::Text, Modality::Image] {
                    if let Some(value) = result.content.get(modality) {
                        println!("     {} => {}", modality, summarize_value(value));
                    }
                }
                if !result.metadata.is_empty() {
                    println!("     metadata: {:?}", result.metadata);
                }
            }
        }
        "clear" => {
            let store = open_store(&settings)?;
            store.clear()?;
            println!("✅ Store cleared");
        }
        _ => {
            eprintln!("Unknown command: {}", cmd);
            std::process::exit(1);
        }
    }
    Ok(())
}
