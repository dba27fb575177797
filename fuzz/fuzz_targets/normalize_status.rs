#![no_main]
use libfuzzer_sys::fuzz_target;
use tenant_modules::migration::{normalize_json, normalize_str, NormalizedStatus};

fuzz_target!(|data: &[u8]| {
    // Legacy statuses are arbitrary strings or JSON documents; normalization
    // must never panic and must keep unrecognized input verbatim
    if let Ok(text) = std::str::from_utf8(data) {
        match normalize_str(text) {
            None => assert!(text.trim().is_empty()),
            Some(NormalizedStatus::Unrecognized(kept)) => assert_eq!(kept, text),
            Some(NormalizedStatus::Canonical(_)) => {}
        }

        if let Ok(value) = serde_json::from_str::<serde_json::Value>(text) {
            let _ = normalize_json(&value);
        }
    }
});
