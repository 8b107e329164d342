//! Concrete serializer for text + image content.

use mmdb_core::error::{Error, Result};
use mmdb_core::traits::ContentSerializer;
use mmdb_core::types::{Meta, Modality, ModalitySet, ModalityValue};

/// Marker stored in place of image bytes. The usable value is recovered from
/// metadata at deserialization time.
pub const IMAGE_MARKER: &str = "(an image)";

/// Placeholder reference used when the metadata needed to reverse the lossy
/// image encoding is missing. A degraded result, not an error.
pub const IMAGE_PLACEHOLDER: &str = "<IMAGE>";

/// Text is lossless identity; images serialize to a fixed marker and
/// deserialize to a reference recovered from the `image_path` metadata
/// entry.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageTextSerializer;

impl ImageTextSerializer {
    pub fn new() -> Self {
        Self
    }
}

impl ContentSerializer for ImageTextSerializer {
    fn modalities(&self) -> ModalitySet {
        [Modality::Text, Modality::Image].into_iter().collect()
    }

    fn is_lossless(&self, modality: Modality) -> bool {
        match modality {
            Modality::Text => true,
            Modality::Image => false,
        }
    }

    fn serialize_by_modality(&self, modality: Modality, value: &ModalityValue) -> Result<String> {
        match (modality, value) {
            (Modality::Text, ModalityValue::Text(text)) => Ok(text.clone()),
            (Modality::Image, ModalityValue::Image(_))
            | (Modality::Image, ModalityValue::ImageRef(_)) => Ok(IMAGE_MARKER.to_string()),
            (modality, value) => Err(Error::InvalidContent(format!(
                "value of modality '{}' given for modality '{modality}'",
                value.modality()
            ))),
        }
    }

    fn deserialize_by_modality(
        &self,
        modality: Modality,
        stored: &str,
        metadata: &Meta,
    ) -> Result<ModalityValue> {
        match modality {
            Modality::Text => Ok(ModalityValue::Text(stored.to_string())),
            Modality::Image => {
                let reference = metadata
                    .get("image_path")
                    .cloned()
                    .unwrap_or_else(|| IMAGE_PLACEHOLDER.to_string());
                Ok(ModalityValue::ImageRef(reference))
            }
        }
    }
}
