//! Packing of embedding vectors into a text-safe form.

use anyhow::{bail, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

/// f32 little-endian bytes, base64-encoded.
pub fn pack_vector(vector: &[f32]) -> String {
    let mut bytes = Vec::with_capacity(vector.len() * 4);
    for x in vector {
        bytes.extend_from_slice(&x.to_le_bytes());
    }
    BASE64.encode(bytes)
}

/// Inverse of `pack_vector`; validates the byte length against the declared
/// dimension.
pub fn unpack_vector(packed: &str, dimension: usize) -> Result<Vec<f32>> {
    let bytes = BASE64.decode(packed)?;
    if bytes.len() != dimension * 4 {
        bail!("packed vector has {} bytes, expected {} for dimension {}", bytes.len(), dimension * 4, dimension);
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}
