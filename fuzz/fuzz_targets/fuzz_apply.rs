#![no_main]

use libfuzzer_sys::fuzz_target;

// Accepts arbitrary bytes, attempts to parse `{"config": ..., "source": ...}`,
// then validates and applies the config. Goal: no panics, even on malformed
// configs and documents.
fuzz_target!(|data: &[u8]| {
    let Ok(input) = serde_json::from_slice::<serde_json::Value>(data) else {
        return;
    };
    let Ok(config) = serde_json::from_value::<json_fieldmap_core::MappingConfig>(input["config"].clone()) else {
        return;
    };
    let _ = json_fieldmap_core::validate_config(&config);
    let _ = json_fieldmap_core::apply_mapping(&input["source"], &config);
});
