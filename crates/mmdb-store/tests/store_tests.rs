use std::collections::HashSet;
use std::sync::Arc;

use mmdb_core::error::Error;
use mmdb_core::traits::{ContentSerializer, MultimodalEmbedder};
use mmdb_core::types::{Content, Document, Meta, Modality, ModalitySet, ModalityValue};
use mmdb_embed::{HashingMultimodalEmbedder, ImageTextSerializer};
use mmdb_store::{MemoryVectorReaderWriter, MultimodalVectorStore};

fn new_store() -> MultimodalVectorStore<MemoryVectorReaderWriter> {
    MultimodalVectorStore::new(
        MemoryVectorReaderWriter::new(),
        Arc::new(HashingMultimodalEmbedder::new(128)),
        Arc::new(ImageTextSerializer::new()),
    )
    .expect("store")
}

fn meta(pairs: &[(&str, &str)]) -> Meta {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

#[test]
fn empty_store_returns_no_results() {
    let store = new_store();
    let results = store
        .similarity_search(&Content::text("anything"), 1, None)
        .expect("search");
    assert!(results.is_empty());
}

#[test]
fn add_then_search_returns_the_inserted_content() {
    let store = new_store();
    let content = Content::text("a house in modern style");
    let inserted = store.add_contents(&[content.clone()], None, None).expect("add");
    assert_eq!(inserted.len(), 1);

    let results = store.similarity_search(&content, 1, None).expect("search");
    assert_eq!(results.len(), 1);
    assert_eq!(
        results[0].content.get(Modality::Text),
        Some(&ModalityValue::Text("a house in modern style".to_string())),
        "text is lossless, so the reconstructed content matches"
    );
    assert!(results[0].score > 0.999, "query equals the stored item");
}

#[test]
fn omitted_ids_are_generated_distinct_and_non_empty() {
    let store = new_store();
    let contents = vec![
        Content::text("alpha"),
        Content::text("bravo"),
        Content::text("charlie"),
    ];
    let ids = store.add_contents(&contents, None, None).expect("add");
    assert_eq!(ids.len(), 3);
    let distinct: HashSet<_> = ids.iter().collect();
    assert_eq!(distinct.len(), 3);
    for id in &ids {
        assert!(!id.is_empty());
    }
    // each item is retrievable by its own content
    for (content, id) in contents.iter().zip(ids.iter()) {
        let results = store.similarity_search(content, 1, None).expect("search");
        assert_eq!(results.len(), 1);
        let hit_text = match results[0].content.get(Modality::Text) {
            Some(ModalityValue::Text(t)) => t.clone(),
            other => panic!("unexpected content: {other:?}"),
        };
        let stored_text = match content.get(Modality::Text) {
            Some(ModalityValue::Text(t)) => t.clone(),
            _ => unreachable!(),
        };
        assert_eq!(hit_text, stored_text, "nearest neighbor of {id} is itself");
    }
}

#[test]
fn memory_backend_hits_carry_the_assigned_identifier() {
    use mmdb_core::traits::VectorReaderWriter;

    let rw = MemoryVectorReaderWriter::new();
    let ids = rw
        .store_contents(
            &["blob".to_string()],
            &[vec![1.0, 0.0]],
            None,
            None,
        )
        .expect("store");
    assert_eq!(ids.len(), 1);

    let hits = rw.search_by_vector(&[1.0, 0.0], 1, None).expect("search");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, ids[0]);
    assert_eq!(hits[0].stored, "blob");
    assert!(hits[0].distance < 1e-6);
}

#[test]
fn explicit_ids_are_returned_in_order() {
    let store = new_store();
    let ids = store
        .add_contents(
            &[Content::text("one"), Content::text("two")],
            None,
            Some(&["a".to_string(), "b".to_string()]),
        )
        .expect("add");
    assert_eq!(ids, vec!["a".to_string(), "b".to_string()]);
}

#[test]
fn storing_under_an_existing_id_replaces_the_entry() {
    let store = new_store();
    let ids = Some(vec!["same".to_string()]);
    store
        .add_contents(&[Content::text("first version")], None, ids.as_deref())
        .expect("add");
    store
        .add_contents(&[Content::text("second version")], None, ids.as_deref())
        .expect("re-add");
    let results = store
        .similarity_search(&Content::text("second version"), 10, None)
        .expect("search");
    assert_eq!(results.len(), 1, "last write wins, no duplicate rows");
}

#[test]
fn parallel_array_length_mismatches_fail_fast() {
    let store = new_store();
    let contents = vec![Content::text("x"), Content::text("y")];

    let err = store
        .add_contents(&contents, Some(&[Meta::new()]), None)
        .expect_err("one metadata for two contents");
    assert!(matches!(err, Error::ArityMismatch(_)), "got: {err}");

    let err = store
        .add_contents(&contents, None, Some(&["only-one".to_string()]))
        .expect_err("one id for two contents");
    assert!(matches!(err, Error::ArityMismatch(_)), "got: {err}");
}

#[test]
fn construction_rejects_uncovered_embedder_modalities() {
    // a serializer that only knows text, paired with a text+image embedder
    struct TextOnlySerializer;
    impl ContentSerializer for TextOnlySerializer {
        fn modalities(&self) -> ModalitySet {
            [Modality::Text].into_iter().collect()
        }
        fn is_lossless(&self, _modality: Modality) -> bool {
            true
        }
        fn serialize_by_modality(
            &self,
            _modality: Modality,
            value: &ModalityValue,
        ) -> mmdb_core::error::Result<String> {
            match value {
                ModalityValue::Text(t) => Ok(t.clone()),
                other => Err(Error::InvalidContent(format!("unsupported value: {other:?}"))),
            }
        }
    }

    let err = MultimodalVectorStore::new(
        MemoryVectorReaderWriter::new(),
        Arc::new(HashingMultimodalEmbedder::new(32)),
        Arc::new(TextOnlySerializer),
    )
    .err()
    .expect("embedder speaks image, serializer does not");
    assert!(matches!(err, Error::InvalidConfig(_)), "got: {err}");
}

#[test]
fn add_documents_preserves_metadata_and_explicit_ids() {
    let store = new_store();
    let documents = vec![
        Document::new(Content::image(vec![1, 2, 3]))
            .with_metadata(meta(&[("image_path", "images/house.jpg"), ("category", "houses")]))
            .with_id("house_001"),
        Document::new(Content::text("a sunset over the sea"))
            .with_metadata(meta(&[("category", "scenery")])),
    ];
    let ids = store.add_documents(&documents).expect("add_documents");
    assert_eq!(ids.len(), 2);
    assert_eq!(ids[0], "house_001");
    assert!(!ids[1].is_empty(), "missing id is filled in");

    let results = store
        .similarity_search(&Content::image(vec![1, 2, 3]), 1, None)
        .expect("search");
    assert_eq!(results.len(), 1);
    assert_eq!(
        results[0].content.get(Modality::Image),
        Some(&ModalityValue::ImageRef("images/house.jpg".to_string())),
        "image comes back as the reference recovered from metadata"
    );
    assert_eq!(results[0].metadata.get("category").map(String::as_str), Some("houses"));
}

#[test]
fn metadata_filter_restricts_candidates() {
    let store = new_store();
    store
        .add_contents(
            &[Content::text("red apple"), Content::text("red car")],
            Some(&[meta(&[("kind", "fruit")]), meta(&[("kind", "vehicle")])]),
            None,
        )
        .expect("add");

    let results = store
        .similarity_search(&Content::text("red"), 10, Some(&meta(&[("kind", "fruit")])))
        .expect("search");
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].metadata.get("kind").map(String::as_str), Some("fruit"));
}

#[test]
fn clear_empties_the_store() {
    let store = new_store();
    store.add_contents(&[Content::text("x")], None, None).expect("add");
    store.clear().expect("clear");
    let results = store
        .similarity_search(&Content::text("x"), 1, None)
        .expect("search");
    assert!(results.is_empty());
}

#[test]
fn cross_modal_query_ranks_the_related_image_first() {
    // A scenario embedder with fixed vectors: the house image sits close to
    // the house text, the sunset image does not. Mean-merging keeps the
    // ordering even though magnitudes are uncalibrated across modalities.
    struct SceneEmbedder;
    impl MultimodalEmbedder for SceneEmbedder {
        fn dim(&self) -> usize {
            3
        }
        fn modalities(&self) -> ModalitySet {
            [Modality::Text, Modality::Image].into_iter().collect()
        }
        fn embed_by_modality(
            &self,
            _modality: Modality,
            value: &ModalityValue,
        ) -> mmdb_core::error::Result<Vec<f32>> {
            Ok(match value {
                ModalityValue::Text(t) if t.contains("house") => vec![1.0, 0.1, 0.0],
                ModalityValue::Text(_) => vec![0.0, 1.0, 0.0],
                ModalityValue::Image(data) if data == &[1u8] => vec![0.9, 0.2, 0.1],
                ModalityValue::Image(_) => vec![0.0, 0.1, 1.0],
                ModalityValue::ImageRef(_) => {
                    return Err(Error::InvalidContent("no pixels".to_string()))
                }
            })
        }
    }

    let store = MultimodalVectorStore::new(
        MemoryVectorReaderWriter::new(),
        Arc::new(SceneEmbedder),
        Arc::new(ImageTextSerializer::new()),
    )
    .expect("store");

    let house_image = Content::image(vec![1u8]);
    let sunset_image = Content::image(vec![2u8]);
    store
        .add_contents(
            &[house_image, sunset_image],
            Some(&[
                meta(&[("image_path", "images/modern_house.jpg")]),
                meta(&[("image_path", "images/sunset.jpg")]),
            ]),
            Some(&["house".to_string(), "sunset".to_string()]),
        )
        .expect("add");

    let results = store
        .similarity_search(&Content::text("a house in modern style"), 2, None)
        .expect("search");
    assert_eq!(results.len(), 2);
    assert_eq!(
        results[0].content.get(Modality::Image),
        Some(&ModalityValue::ImageRef("images/modern_house.jpg".to_string())),
        "related image ranks above the unrelated one"
    );
    assert!(results[0].score > results[1].score);
}
