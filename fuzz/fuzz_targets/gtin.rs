#![no_main]

use libfuzzer_sys::fuzz_target;
use shelf_core::gtin;

fuzz_target!(|data: &[u8]| {
    let Ok(raw) = std::str::from_utf8(data) else {
        return;
    };

    let formatted = gtin::format(raw);
    assert_eq!(gtin::format(&formatted), formatted);

    let report = gtin::report(raw);
    match gtin::validate(raw) {
        Ok(valid) => {
            assert!(report.valid);
            assert_eq!(valid.as_str(), gtin::normalize(raw));
            assert_eq!(gtin::validate(&valid.display()), Ok(valid));
        }
        Err(_) => assert!(!report.valid),
    }
});
