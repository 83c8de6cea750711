//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check the cache tier's expiry and bookkeeping rules.

use proptest::prelude::*;

use crate::cache::{CacheEntry, CacheStore};
use crate::error::ServiceError;

// == Test Configuration ==
const TEST_ABSOLUTE_MS: i64 = 60 * 60_000;

// == Strategies ==
fn valid_key_strategy() -> impl Strategy<Value = String> {
    "[a-z]{1,12}:[a-zA-Z0-9_-]{1,36}".prop_map(|s| s)
}

fn valid_value_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 {}\":,]{1,256}".prop_map(|s| s)
}

#[derive(Debug, Clone)]
enum CacheOp {
    Set { key: String, value: String },
    Get { key: String },
    Remove { key: String },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        (valid_key_strategy(), valid_value_strategy())
            .prop_map(|(key, value)| CacheOp::Set { key, value }),
        valid_key_strategy().prop_map(|key| CacheOp::Get { key }),
        valid_key_strategy().prop_map(|key| CacheOp::Remove { key }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // For any sequence of operations, hits and misses match what callers observed.
    #[test]
    fn prop_statistics_accuracy(ops in prop::collection::vec(cache_op_strategy(), 1..50)) {
        let mut store = CacheStore::new();
        let mut expected_hits: u64 = 0;
        let mut expected_misses: u64 = 0;

        for op in ops {
            match op {
                CacheOp::Set { key, value } => {
                    let _ = store.set(key, value, TEST_ABSOLUTE_MS, None);
                }
                CacheOp::Get { key } => match store.get(&key) {
                    Some(_) => expected_hits += 1,
                    None => expected_misses += 1,
                },
                CacheOp::Remove { key } => store.remove(&key),
            }
        }

        let stats = store.stats();
        prop_assert_eq!(stats.hits, expected_hits, "Hits mismatch");
        prop_assert_eq!(stats.misses, expected_misses, "Misses mismatch");
        prop_assert_eq!(stats.total_entries, store.len(), "Total entries mismatch");
    }

    // A set always replaces the previous snapshot for the same key.
    #[test]
    fn prop_overwrite_semantics(
        key in valid_key_strategy(),
        v1 in valid_value_strategy(),
        v2 in valid_value_strategy(),
    ) {
        let mut store = CacheStore::new();

        store.set(key.clone(), v1, TEST_ABSOLUTE_MS, None).unwrap();
        store.set(key.clone(), v2.clone(), TEST_ABSOLUTE_MS, None).unwrap();

        prop_assert_eq!(store.get(&key), Some(v2));
        prop_assert_eq!(store.len(), 1);
    }

    // After a remove, the key misses until it is set again.
    #[test]
    fn prop_remove_clears_entry(key in valid_key_strategy(), value in valid_value_strategy()) {
        let mut store = CacheStore::new();

        store.set(key.clone(), value, TEST_ABSOLUTE_MS, None).unwrap();
        store.remove(&key);

        prop_assert!(store.get(&key).is_none());
    }

    // No pattern of accesses pushes the effective expiry past the absolute one.
    #[test]
    fn prop_sliding_never_exceeds_absolute(
        absolute in 1_000i64..100_000,
        sliding in 1i64..50_000,
        mut touches in prop::collection::vec(0i64..200_000, 0..20),
    ) {
        let mut entry = CacheEntry::new_at("v".to_string(), absolute, Some(sliding), 0);
        touches.sort_unstable();

        for at in touches {
            if entry.is_expired_at(at) {
                break;
            }
            entry.touch_at(at);
            prop_assert!(entry.expires_at() <= absolute);
        }
        prop_assert!(entry.is_expired_at(absolute));
    }

    // Domain failures always map to a client status and keep their field.
    #[test]
    fn prop_domain_error_mapping(field in "[a-zA-Z]{1,16}", message in "[a-zA-Z ]{1,64}") {
        let errors = [
            ServiceError::not_found(field.clone(), message.clone()),
            ServiceError::invalid_credentials(field.clone(), message.clone()),
            ServiceError::token_expired(field.clone(), message.clone()),
        ];

        for err in errors {
            prop_assert!(err.status_code().is_client_error());
            prop_assert_eq!(err.field(), Some(field.as_str()));
        }
    }
}
