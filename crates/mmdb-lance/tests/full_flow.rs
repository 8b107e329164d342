use std::sync::Arc;

use tempfile::TempDir;

use mmdb_core::traits::VectorReaderWriter;
use mmdb_core::types::{Content, Meta, Modality, ModalityValue};
use mmdb_embed::{HashingMultimodalEmbedder, ImageTextSerializer};
use mmdb_lance::LanceVectorReaderWriter;
use mmdb_store::MultimodalVectorStore;

const DIM: usize = 64;

fn meta(pairs: &[(&str, &str)]) -> Meta {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

// one-hot-ish vectors keep the nearest-neighbor ordering predictable
fn axis_vector(axis: usize) -> Vec<f32> {
    let mut v = vec![0.0_f32; DIM];
    v[axis] = 1.0;
    v
}

// owns its tokio runtime internally, so this must not run inside one
#[test]
fn lance_reader_writer_full_flow() {
    let tmp = TempDir::new().expect("tmp");
    let rw = LanceVectorReaderWriter::new(tmp.path(), "test_contents", DIM).expect("connect");

    // empty database, no table yet
    let results = rw.search_by_vector(&axis_vector(0), 3, None).expect("search empty");
    assert!(results.is_empty());

    let contents = vec![
        "stored blob zero".to_string(),
        "stored blob one".to_string(),
        "stored blob two".to_string(),
    ];
    let vectors = vec![axis_vector(0), axis_vector(1), axis_vector(2)];
    let metadatas = vec![
        meta(&[("kind", "a")]),
        meta(&[("kind", "b")]),
        meta(&[("kind", "a")]),
    ];
    let ids = vec!["zero".to_string(), "one".to_string(), "two".to_string()];
    let stored_ids = rw
        .store_contents(&contents, &vectors, Some(&metadatas), Some(&ids))
        .expect("store");
    assert_eq!(stored_ids, ids);

    // a query near axis 1 ranks "one" first
    let mut query = axis_vector(1);
    query[0] = 0.05;
    let results = rw.search_by_vector(&query, 2, None).expect("search");
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].id, "one");
    assert_eq!(results[0].stored, "stored blob one");
    assert_eq!(results[0].metadata.get("kind").map(String::as_str), Some("b"));
    assert!(results[0].distance <= results[1].distance);

    // metadata post-filter removes the closest hit
    let results = rw
        .search_by_vector(&query, 2, Some(&meta(&[("kind", "a")])))
        .expect("filtered search");
    assert!(!results.is_empty());
    for hit in &results {
        assert_eq!(hit.metadata.get("kind").map(String::as_str), Some("a"));
    }

    // omitted ids are generated
    let generated = rw
        .store_contents(&["stored blob three".to_string()], &[axis_vector(3)], None, None)
        .expect("store without ids");
    assert_eq!(generated.len(), 1);
    assert!(!generated[0].is_empty());

    rw.clear().expect("clear");
    let results = rw.search_by_vector(&axis_vector(0), 3, None).expect("search cleared");
    assert!(results.is_empty());
}

#[test]
fn restoring_an_existing_id_replaces_the_row() {
    let tmp = TempDir::new().expect("tmp");
    let rw = LanceVectorReaderWriter::new(tmp.path(), "upsert_contents", DIM).expect("connect");

    rw.store_contents(
        &["first version".to_string()],
        &[axis_vector(0)],
        None,
        Some(&["same".to_string()]),
    )
    .expect("store");
    rw.store_contents(
        &["second version".to_string()],
        &[axis_vector(1)],
        None,
        Some(&["same".to_string()]),
    )
    .expect("re-store");

    let hits = rw.search_by_vector(&axis_vector(1), 10, None).expect("search");
    assert_eq!(hits.len(), 1, "no duplicate row for the re-stored id");
    assert_eq!(hits[0].id, "same");
    assert_eq!(hits[0].stored, "second version");
}

#[test]
fn multimodal_store_over_lance() {
    let tmp = TempDir::new().expect("tmp");
    let rw = LanceVectorReaderWriter::new(tmp.path(), "mm_contents", 128).expect("connect");
    let store = MultimodalVectorStore::new(
        rw,
        Arc::new(HashingMultimodalEmbedder::new(128)),
        Arc::new(ImageTextSerializer::new()),
    )
    .expect("store");

    store
        .add_contents(
            &[
                Content::text("a house in modern style"),
                Content::image(vec![1, 2, 3, 4]),
            ],
            Some(&[
                Meta::new(),
                meta(&[("image_path", "images/house.jpg")]),
            ]),
            Some(&["text_doc".to_string(), "image_doc".to_string()]),
        )
        .expect("add");

    let results = store
        .similarity_search(&Content::text("a house in modern style"), 1, None)
        .expect("search");
    assert_eq!(results.len(), 1);
    assert_eq!(
        results[0].content.get(Modality::Text),
        Some(&ModalityValue::Text("a house in modern style".to_string()))
    );
    assert!(results[0].score > 0.999, "exact match through the lance table");

    let results = store
        .similarity_search(&Content::image(vec![1, 2, 3, 4]), 1, None)
        .expect("image search");
    assert_eq!(results.len(), 1);
    assert_eq!(
        results[0].content.get(Modality::Image),
        Some(&ModalityValue::ImageRef("images/house.jpg".to_string()))
    );

    store.clear().expect("clear");
}
