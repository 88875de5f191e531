//! Property-based tests for engine type names

use cadence_sdk::interface::naming::{engine_type_name, qualify, split, METHOD_SEPARATOR};
use proptest::prelude::*;

fn arb_segment() -> impl Strategy<Value = String> {
    "[A-Za-z][A-Za-z0-9_]{0,8}"
}

proptest! {
    #[test]
    fn prop_qualify_then_split(type_name in "[A-Za-z][A-Za-z0-9_.]{0,16}", discriminator in "[a-z_]{0,8}") {
        let qualified = qualify(&type_name, &discriminator);
        prop_assert_eq!(split(&qualified), (type_name.as_str(), discriminator.as_str()));
        if discriminator.is_empty() {
            prop_assert_eq!(qualified, type_name);
        }
    }

    #[test]
    fn prop_derived_names_have_no_separator(segments in prop::collection::vec(arb_segment(), 1..5)) {
        let full_name = segments.join(METHOD_SEPARATOR);
        let name = engine_type_name(&full_name, None);
        prop_assert!(!name.contains(METHOD_SEPARATOR));
        prop_assert_eq!(name.split('.').count(), segments.len());
    }

    #[test]
    fn prop_interface_prefix_is_stripped(prefix in arb_segment(), stem in "[A-Z][a-z]{1,8}") {
        let name = engine_type_name(&format!("{prefix}::I{stem}"), None);
        prop_assert_eq!(name, format!("{prefix}.{stem}"));
    }

    #[test]
    fn prop_override_wins(full_name in "[a-z]{1,6}::I[A-Z][a-z]{1,6}", name in "[A-Za-z.]{1,12}") {
        prop_assert_eq!(engine_type_name(&full_name, Some(&name)), name);
        // blank overrides fall back to the derived name
        prop_assert_eq!(engine_type_name(&full_name, Some("  ")), engine_type_name(&full_name, None));
    }
}
