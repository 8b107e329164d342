//! End-to-end duct-tape walkthrough: multimodal content stored through an
//! unmodified text-only vector store, running fully in memory.

use std::sync::Arc;

use mmdb_core::types::{Content, Document, Meta, Modality};
use mmdb_ducttape::{default_probe_content, make_multimodal};
use mmdb_embed::{HashingMultimodalEmbedder, ImageTextSerializer};
use mmdb_store::{MemoryVectorReaderWriter, TextVectorStore};

/// Synthetic image payload: a deterministic byte pattern per seed, standing
/// in for decoded pixel data.
fn sample_image_bytes(seed: u8) -> Vec<u8> {
    (0..4096u32).map(|i| (i as u8).wrapping_mul(seed).wrapping_add(seed)).collect()
}

fn meta(pairs: &[(&str, &str)]) -> Meta {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

fn print_results(results: &[mmdb_core::types::StoredDocument]) {
    println!("Results:");
    for result in results {
        for (modality, value) in &result.content {
            println!(" * {} => {:?} [metadata={:?}]", modality, value, result.metadata);
        }
    }
}

fn main() -> anyhow::Result<()> {
    let embedder = Arc::new(HashingMultimodalEmbedder::default());
    let serializer = Arc::new(ImageTextSerializer::new());

    let dt_store = make_multimodal(
        embedder.clone(),
        serializer,
        &default_probe_content(),
        |passthrough| Ok(TextVectorStore::new(MemoryVectorReaderWriter::new(), passthrough)),
    )?;

    dt_store.clear()?;

    println!("\nINSERTING\n");

    // Insertions through add_contents: two images, one with a recoverable path
    let insertion1 = dt_store.add_contents(
        &[
            Content::image(sample_image_bytes(3)),
            Content::image(sample_image_bytes(7)),
        ],
        Some(&[
            meta(&[("image_path", "images/iguana_on_a_bike.jpg"), ("category", "animals")]),
            meta(&[("category", "people")]),
        ]),
        Some(&["iguana".to_string(), "scientist_012".to_string()]),
    )?;
    println!("insertion1 = {:?}", insertion1);

    // Insertion through add_documents:
    let insertion2 = dt_store.add_documents(&[
        Document::new(Content::image(sample_image_bytes(11))),
        Document::new(Content::image(sample_image_bytes(13)))
            .with_metadata(meta(&[("image_path", "images/sunset.jpg")])),
    ])?;
    println!("insertion2 = {:?}", insertion2);

    println!("\nQUERYING\n");

    println!("\nText query on image entries.");
    let query1 = Content::text("An iguana on a bike");
    let results1 = dt_store.similarity_search(&query1, 1, None)?;
    print_results(&results1);

    println!("\nImage query on image entries.");
    let query2 = Content::image(sample_image_bytes(7));
    let results2 = dt_store.similarity_search(&query2, 1, None)?;
    print_results(&results2);

    println!("\nFiltered query (category = animals).");
    let results3 =
        dt_store.similarity_search(&query2, 2, Some(&meta(&[("category", "animals")])))?;
    print_results(&results3);

    // A hit whose metadata lacks image_path degrades to a placeholder
    let degraded = results2
        .iter()
        .any(|r| matches!(r.content.get(Modality::Image), Some(v) if format!("{v:?}").contains("<IMAGE>")));
    if degraded {
        println!("\n(note: entries without image_path come back as the <IMAGE> placeholder)");
    }

    Ok(())
}
