#![no_main]

use libfuzzer_sys::fuzz_target;
use shelf_core::snapshot;

fuzz_target!(|data: &[u8]| {
    let Ok(value) = serde_json::from_slice::<serde_json::Value>(data) else {
        return;
    };

    if let Ok(parsed) = snapshot::parse_snapshot(value) {
        assert!(!parsed.version.trim().is_empty());
        let encoded = serde_json::to_value(&parsed).expect("snapshot serializes");
        assert_eq!(snapshot::parse_snapshot(encoded).ok(), Some(parsed));
    }
});
