//! `map.yml` encoding and decoding

use crate::{CatalogError, DescriptorBuilder, MapDescriptor};

/// Parse descriptor YAML without ever failing
///
/// A document that is empty, is not a mapping, or has a recognized key holding
/// the wrong kind of value comes back as an empty (invalid) builder. Unknown
/// keys are ignored.
pub fn parse(text: &str) -> DescriptorBuilder {
    if text.trim().is_empty() {
        return DescriptorBuilder::default();
    }

    match serde_yaml_ng::from_str::<DescriptorBuilder>(text) {
        Ok(builder) => builder,
        Err(e) => {
            tracing::debug!("Descriptor YAML does not have the expected shape: {}", e);
            DescriptorBuilder::default()
        }
    }
}

/// Parse and validate descriptor YAML
pub fn decode(text: &str) -> Result<MapDescriptor, CatalogError> {
    parse(text).build()
}

/// Serialize a descriptor to its canonical YAML form
pub fn encode(descriptor: &MapDescriptor) -> Result<String, CatalogError> {
    Ok(serde_yaml_ng::to_string(descriptor)?)
}

/// Serialize a descriptor that has not been validated
pub fn encode_builder(builder: &DescriptorBuilder) -> Result<String, CatalogError> {
    Ok(serde_yaml_ng::to_string(builder)?)
}
