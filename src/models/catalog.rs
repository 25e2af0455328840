//! Catalog entries from the `/models` listing and their capabilities.

use serde_json::Value;

/// The parts of a catalog entry used for registration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CatalogEntry {
    pub id: String,
    pub supports_image_input: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Model catalog has no \"data\" array")]
    MissingData,
    #[error("Model catalog entry {index} has no string \"id\"")]
    MissingId { index: usize },
}

/// Entries of the `data` array, in provider order. Duplicates are kept.
///
/// Fails on the first entry without an id, so a malformed catalog registers nothing.
pub fn parse_catalog(document: &Value) -> Result<Vec<CatalogEntry>, CatalogError> {
    let data = document
        .get("data")
        .and_then(Value::as_array)
        .ok_or(CatalogError::MissingData)?;

    data.iter()
        .enumerate()
        .map(|(index, entry)| {
            let id = entry
                .get("id")
                .and_then(Value::as_str)
                .ok_or(CatalogError::MissingId { index })?;
            Ok(CatalogEntry {
                id: id.to_string(),
                supports_image_input: supports_image_input(entry),
            })
        })
        .collect()
}

/// Whether `architecture.modality` lists `image` among its inputs.
///
/// The modality reads `<input>+<input>-><output>`. A missing or non-string
/// modality means no image support.
pub fn supports_image_input(entry: &Value) -> bool {
    let Some(modality) = entry
        .get("architecture")
        .and_then(|arch| arch.get("modality"))
        .and_then(Value::as_str)
    else {
        return false;
    };
    let inputs = modality
        .split_once("->")
        .map_or(modality, |(inputs, _)| inputs);
    inputs.split('+').any(|m| m == "image")
}
