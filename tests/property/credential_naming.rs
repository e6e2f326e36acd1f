// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests for Key Naming

use proptest::prelude::*;

use twin_stack::credential::{resolve_credential, UNIQUE_SUFFIX_LEN};

fn base_name_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{0,20}"
}

fn suffix_source_strategy() -> impl Strategy<Value = String> {
    "[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}"
}

/// Ids too short, or without a letter or digit in the leading characters
fn unusable_source_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        "[0-9a-z]{0,7}",
        "[-_]{8,16}",
        "[-_./ ]{0,12}",
    ]
}

proptest! {
    /// Reuse never renames and never creates
    #[test]
    fn prop_reuse_is_identity(base in base_name_strategy(), source in suffix_source_strategy()) {
        let resolved = resolve_credential(true, &base, &source).unwrap();
        prop_assert_eq!(resolved.key_name, base);
        prop_assert!(!resolved.creates_new_resource);
    }

    /// A created key is the base name plus a short deployment suffix
    #[test]
    fn prop_created_name_shape(base in base_name_strategy(), source in suffix_source_strategy()) {
        let resolved = resolve_credential(false, &base, &source).unwrap();
        prop_assert!(resolved.creates_new_resource);

        let expected_suffix = &source[..UNIQUE_SUFFIX_LEN];
        prop_assert_eq!(resolved.key_name, format!("{}-{}", base, expected_suffix));
    }

    /// Deployments that differ in their first eight characters never collide
    #[test]
    fn prop_distinct_deployments_distinct_names(
        base in base_name_strategy(),
        a in suffix_source_strategy(),
        b in suffix_source_strategy(),
    ) {
        prop_assume!(a[..UNIQUE_SUFFIX_LEN] != b[..UNIQUE_SUFFIX_LEN]);
        let first = resolve_credential(false, &base, &a).unwrap();
        let second = resolve_credential(false, &base, &b).unwrap();
        prop_assert_ne!(first.key_name, second.key_name);
    }

    /// A fresh key is never created under an indistinct name
    #[test]
    fn prop_unusable_ids_rejected(base in base_name_strategy(), source in unusable_source_strategy()) {
        prop_assert!(resolve_credential(false, &base, &source).is_err());
        prop_assert!(resolve_credential(true, &base, &source).is_ok());
    }
}
