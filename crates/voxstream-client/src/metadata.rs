//! Caller metadata extraction

use voxstream_core::Modality;

pub const RESPONSE_MODALITIES_KEY: &str = "response_modalities";
pub const VAD_DISABLED_KEY: &str = "vad_disabled";

/// Pull response modalities out of caller metadata. Accepts any list whose
/// elements are modality strings; defaults to `["TEXT"]` when the key is
/// absent, empty, or carries no recognizable entries.
pub fn response_modalities(
    metadata: &serde_json::Map<String, serde_json::Value>,
) -> Vec<Modality> {
    let modalities: Vec<Modality> = metadata
        .get(RESPONSE_MODALITIES_KEY)
        .and_then(|value| value.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_str())
                .filter_map(Modality::parse)
                .collect()
        })
        .unwrap_or_default();

    if modalities.is_empty() {
        vec![Modality::Text]
    } else {
        modalities
    }
}

/// The VAD override is forwarded only when the caller explicitly set it
/// to true.
pub fn vad_disabled(metadata: &serde_json::Map<String, serde_json::Value>) -> bool {
    metadata
        .get(VAD_DISABLED_KEY)
        .and_then(|value| value.as_bool())
        .unwrap_or(false)
}
