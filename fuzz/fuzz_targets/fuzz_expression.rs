#![no_main]

use libfuzzer_sys::fuzz_target;

// Feeds arbitrary text to the custom-expression parser and evaluator.
// Errors are expected; panics and stack overflows are not.
fuzz_target!(|data: &[u8]| {
    if let Ok(source) = std::str::from_utf8(data) {
        let input = serde_json::json!({"name": "Ada", "tags": ["a", "b"], "n": 1.5});
        let _ = json_fieldmap_core::transform::expr::evaluate(source, &input);
        let _ = json_fieldmap_core::transform::expr::evaluate(source, &serde_json::Value::Null);
    }
});
