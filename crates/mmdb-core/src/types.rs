//! Domain types shared by the embedding and storage layers.

use serde::{Deserialize, Serialize};
use std::collections::{btree_map, BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

pub type Meta = HashMap<String, String>;

/// A named kind of content with its own embedding and serialization strategy.
///
/// The string form is lowercase (`"text"`, `"image"`) and is what ends up as
/// the key of the persisted per-modality map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    Text,
    Image,
}

impl Modality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Modality::Text => "text",
            Modality::Image => "image",
        }
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Modality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(Modality::Text),
            "image" => Ok(Modality::Image),
            other => Err(format!("unknown modality '{other}'")),
        }
    }
}

/// A native value for one modality.
///
/// `ImageRef` is the reconstructed form of an image after a lossy round trip
/// through storage: a path or url recovered from metadata (or a placeholder),
/// never the original bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModalityValue {
    Text(String),
    Image(Vec<u8>),
    ImageRef(String),
}

impl ModalityValue {
    pub fn modality(&self) -> Modality {
        match self {
            ModalityValue::Text(_) => Modality::Text,
            ModalityValue::Image(_) | ModalityValue::ImageRef(_) => Modality::Image,
        }
    }
}

/// The modality registry of an embedder or serializer.
pub type ModalitySet = BTreeSet<Modality>;

/// One multimodal item: an ordered mapping from modality to native value.
///
/// Values are keyed by their own modality, so a key/value mismatch is not
/// representable. An empty `Content` can be built but is rejected at
/// embedding time.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Content {
    fields: BTreeMap<Modality, ModalityValue>,
}

impl Content {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::new().with_text(text)
    }

    pub fn image(data: impl Into<Vec<u8>>) -> Self {
        Self::new().with_image(data)
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.insert(ModalityValue::Text(text.into()));
        self
    }

    pub fn with_image(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.insert(ModalityValue::Image(data.into()));
        self
    }

    /// Insert a value under its own modality, replacing any previous value
    /// for that modality.
    pub fn insert(&mut self, value: ModalityValue) {
        self.fields.insert(value.modality(), value);
    }

    pub fn get(&self, modality: Modality) -> Option<&ModalityValue> {
        self.fields.get(&modality)
    }

    pub fn modalities(&self) -> ModalitySet {
        self.fields.keys().copied().collect()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, Modality, ModalityValue> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<'a> IntoIterator for &'a Content {
    type Item = (&'a Modality, &'a ModalityValue);
    type IntoIter = btree_map::Iter<'a, Modality, ModalityValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

/// A multimodal item plus metadata, built by the caller before insertion.
///
/// `id` is an optional externally-assigned identifier; when absent the
/// storage layer assigns one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub content: Content,
    pub metadata: Meta,
    pub id: Option<String>,
}

impl Document {
    pub fn new(content: Content) -> Self {
        Self { content, metadata: Meta::new(), id: None }
    }

    pub fn with_metadata(mut self, metadata: Meta) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// A search result at the content level, reconstructed from persisted form.
///
/// The content is not necessarily byte-identical to what was inserted: lossy
/// modalities come back as references (see [`ModalityValue::ImageRef`]).
/// `score` is a similarity, higher is better.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredDocument {
    pub content: Content,
    pub metadata: Meta,
    pub score: f32,
}

/// The minimal surface any storage backend must produce per hit:
/// (identifier, opaque stored blob, metadata, cosine distance).
///
/// `distance` is ascending-is-better; ownership of this shape belongs to the
/// storage port, not to any concrete backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub stored: String,
    pub metadata: Meta,
    pub distance: f32,
}
