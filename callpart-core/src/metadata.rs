//! Container comment tags carrying part metadata
//!
//! The part's container holds two tags besides the usual vendor comments:
//! `TG_META`, base64 of the binary reassignment table, and
//! `ENDPOINT_MAPPING`, a JSON array of `{"endpoint": .., "ssrc": ..}` objects.

use crate::error::{PartError, PartResult};
use crate::records::{try_parse_channel_updates, ChannelUpdate};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;
use std::collections::BTreeMap;

/// Tag holding the base64 reassignment table
pub const CHANNEL_UPDATES_TAG: &str = "TG_META";

/// Tag holding the JSON endpoint mapping
pub const ENDPOINT_MAPPING_TAG: &str = "ENDPOINT_MAPPING";

/// Metadata recovered from a part's comment tags
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartMetadata {
    /// Reassignment records in their original order
    pub channel_updates: Vec<ChannelUpdate>,
    /// Speaker name to numeric id
    pub endpoint_mapping: BTreeMap<String, i32>,
}

#[derive(Debug, Deserialize)]
struct EndpointEntry {
    endpoint: String,
    ssrc: i64,
}

impl PartMetadata {
    /// Collect metadata from `(key, value)` comment tags
    ///
    /// A broken tag is logged and ignored; the part stays playable.
    pub fn from_tags<'a, I>(tags: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut metadata = Self::default();

        for (key, value) in tags {
            if key.eq_ignore_ascii_case(CHANNEL_UPDATES_TAG) {
                match decode_channel_updates_tag(value) {
                    Ok(updates) => metadata.channel_updates = updates,
                    Err(e) => tracing::warn!(
                        category = ?e.category(),
                        "Ignoring {} tag: {}",
                        CHANNEL_UPDATES_TAG,
                        e
                    ),
                }
            } else if key.eq_ignore_ascii_case(ENDPOINT_MAPPING_TAG) {
                match decode_endpoint_mapping_tag(value) {
                    Ok(mapping) => metadata.endpoint_mapping = mapping,
                    Err(e) => tracing::warn!(
                        category = ?e.category(),
                        "Ignoring {} tag: {}",
                        ENDPOINT_MAPPING_TAG,
                        e
                    ),
                }
            }
        }

        metadata
    }
}

/// Decode a `TG_META` value into reassignment records
pub fn decode_channel_updates_tag(value: &str) -> PartResult<Vec<ChannelUpdate>> {
    let raw = STANDARD
        .decode(value.trim())
        .map_err(|e| PartError::InvalidMetadata {
            key: CHANNEL_UPDATES_TAG.to_string(),
            reason: e.to_string(),
        })?;

    let mut offset = 0;
    let table = try_parse_channel_updates(&raw, &mut offset)?;
    Ok(table.updates)
}

/// Decode an `ENDPOINT_MAPPING` value
///
/// Only a value that is not a JSON array fails. Malformed entries inside
/// the array are skipped one by one. Ids above `i32::MAX` are ssrc values
/// and wrap into the signed range.
pub fn decode_endpoint_mapping_tag(value: &str) -> PartResult<BTreeMap<String, i32>> {
    let entries: Vec<serde_json::Value> =
        serde_json::from_str(value).map_err(|e| PartError::InvalidMetadata {
            key: ENDPOINT_MAPPING_TAG.to_string(),
            reason: e.to_string(),
        })?;

    let mut mapping = BTreeMap::new();
    for (index, raw) in entries.into_iter().enumerate() {
        let entry = match serde_json::from_value::<EndpointEntry>(raw) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::debug!(index, "Skipping endpoint mapping entry: {}", e);
                continue;
            }
        };
        let id = match i32::try_from(entry.ssrc) {
            Ok(id) => id,
            Err(_) => match u32::try_from(entry.ssrc) {
                Ok(ssrc) => ssrc as i32,
                Err(_) => {
                    tracing::debug!(
                        endpoint = %entry.endpoint,
                        id = entry.ssrc,
                        "Skipping endpoint with out of range id"
                    );
                    continue;
                }
            },
        };
        mapping.insert(entry.endpoint, id);
    }

    Ok(mapping)
}
