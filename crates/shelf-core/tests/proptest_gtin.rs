use proptest::prelude::*;
use shelf_core::gtin::{self, GtinError, GtinKind};

use generators::*;

proptest! {
    #![proptest_config(proptest::test_runner::Config::with_cases(2000))]

    #[test]
    fn well_formed_codes_validate_with_matching_kind(code in arb_valid_gtin()) {
        let gtin = gtin::validate(&code).expect("generated code must validate");
        prop_assert_eq!(gtin.as_str(), code.as_str());
        prop_assert_eq!(Some(gtin.kind()), GtinKind::from_len(code.len()));
        prop_assert_eq!(gtin.kind().len(), code.len());
    }

    #[test]
    fn any_single_digit_substitution_is_detected(
        code in arb_valid_gtin(),
        position in any::<prop::sample::Index>(),
        bump in 1u8..10,
    ) {
        let mut digits = code.into_bytes();
        let i = position.index(digits.len());
        digits[i] = b'0' + (digits[i] - b'0' + bump) % 10;
        let mutated = String::from_utf8(digits).expect("ascii digits");

        let result = gtin::validate(&mutated);
        prop_assert!(
            matches!(result, Err(GtinError::CheckDigitMismatch { .. })),
            "mutated code {} unexpectedly validated", mutated
        );
    }

    #[test]
    fn separators_do_not_change_the_result(code in arb_valid_gtin(), sep in "[ -]{1,2}") {
        let (head, tail) = code.split_at(code.len() / 2);
        let spaced = format!("{head}{sep}{tail}");
        prop_assert_eq!(gtin::validate(&spaced), gtin::validate(&code));
    }

    #[test]
    fn format_is_idempotent_on_its_output(raw in "\\PC{0,20}") {
        let once = gtin::format(&raw);
        prop_assert_eq!(gtin::format(&once), once);
    }

    #[test]
    fn format_keeps_every_digit(raw in "[0-9 ]{0,20}") {
        let formatted = gtin::format(&raw);
        prop_assert_eq!(gtin::normalize(&formatted), gtin::normalize(&raw));
    }

    #[test]
    fn report_agrees_with_validate(raw in arb_gtin_input()) {
        let report = gtin::report(&raw);
        prop_assert_eq!(report.valid, gtin::validate(&raw).is_ok());
        prop_assert_eq!(report.valid, report.kind.is_some());
        prop_assert_eq!(report.valid, report.error_code.is_none());
    }
}
