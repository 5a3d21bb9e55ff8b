use proptest::prelude::*;
use scrap_pickup_api::estimator::normalize_estimate;
use scrap_pickup_api::models::PaymentMethod;
use scrap_pickup_api::validation::{
    validate_location, validate_otp, validate_weight, MAX_WEIGHT_KG, MIN_WEIGHT_KG,
};
use serde_json::json;

proptest! {
    #[test]
    fn weight_accepted_iff_in_range(weight in -100.0f64..200.0) {
        let accepted = validate_weight(Some(&json!(weight))).is_ok();
        prop_assert_eq!(accepted, (MIN_WEIGHT_KG..=MAX_WEIGHT_KG).contains(&weight));
    }

    #[test]
    fn accepted_weight_has_two_decimals(weight in 1.0f64..=50.0) {
        let validated = validate_weight(Some(&json!(weight))).unwrap();
        prop_assert!((MIN_WEIGHT_KG..=MAX_WEIGHT_KG).contains(&validated));
        prop_assert!((validated - weight).abs() <= 0.005 + 1e-9);
        let cents = validated * 100.0;
        prop_assert!((cents - cents.round()).abs() < 1e-6);
    }

    #[test]
    fn any_four_digit_otp_passes_for_upi(otp in "[0-9]{4}") {
        prop_assert!(validate_otp(PaymentMethod::Upi, Some(&otp)).is_ok());
    }

    #[test]
    fn other_otp_shapes_fail_for_upi(otp in "[0-9a-zA-Z]{0,8}") {
        let well_formed = otp.len() == 4 && otp.chars().all(|c| c.is_ascii_digit());
        prop_assert_eq!(validate_otp(PaymentMethod::Upi, Some(&otp)).is_ok(), well_formed);
    }

    #[test]
    fn cash_never_needs_otp(otp in proptest::option::of(".*")) {
        prop_assert!(validate_otp(PaymentMethod::Cash, otp.as_deref()).is_ok());
    }

    #[test]
    fn valid_location_is_trimmed_and_bounded(
        body in "[A-Za-z0-9 ,.#/()-]{5,150}",
        pad in " {0,10}",
    ) {
        let raw = format!("{}{}{}", pad, body, pad);
        if let Ok(location) = validate_location(Some(&raw)) {
            prop_assert_eq!(location.as_str(), location.trim());
            let chars = location.chars().count();
            prop_assert!((5..=200).contains(&chars));
        }
    }

    #[test]
    fn ai_estimates_always_in_range(weight in -1e6f64..1e6, confidence in -1e4f64..1e4) {
        let estimate = normalize_estimate(&json!({
            "weight": weight,
            "category": "plastic",
            "confidence": confidence
        }));
        prop_assert!((MIN_WEIGHT_KG..=MAX_WEIGHT_KG).contains(&estimate.weight));
        prop_assert!((0.0..=100.0).contains(&estimate.confidence));
    }
}
