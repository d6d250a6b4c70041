//! Duplicate-insert validation
//!
//! The pipeline's shared insert discipline: a (key, value) pair seen
//! twice with an equal value is accepted idempotently and logged; seen
//! twice with different values it is a hard failure.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::hash::Hash;

use tracing::warn;

use super::error::ValidationError;

/// Insert `value` under `key`, enforcing the duplicate policy.
///
/// `what` names the pair in diagnostics, e.g. ``alias `Protein` ``.
pub fn check_and_insert<K, V>(
    map: &mut HashMap<K, V>,
    row: u32,
    key: K,
    value: V,
    what: &str,
) -> Result<(), ValidationError>
where
    K: Eq + Hash,
    V: PartialEq,
{
    match map.entry(key) {
        Entry::Vacant(entry) => {
            entry.insert(value);
            Ok(())
        }
        Entry::Occupied(entry) => {
            if *entry.get() == value {
                warn!("row#{} {} duplicated", row, what);
                Ok(())
            } else {
                Err(ValidationError::at_row(
                    row,
                    format!("{} duplicated with different value", what),
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_insert() {
        let mut map = HashMap::new();
        check_and_insert(&mut map, 2, "k", 1.0, "qty for `k`").unwrap();
        assert_eq!(map.get("k"), Some(&1.0));
    }

    #[test]
    fn test_equal_duplicate_is_idempotent() {
        let mut map = HashMap::new();
        check_and_insert(&mut map, 2, "k", 1.0, "qty for `k`").unwrap();
        check_and_insert(&mut map, 3, "k", 1.0, "qty for `k`").unwrap();
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_conflicting_duplicate_fails() {
        let mut map = HashMap::new();
        check_and_insert(&mut map, 2, "k", 1.0, "qty for `k`").unwrap();
        let err = check_and_insert(&mut map, 3, "k", 2.0, "qty for `k`").unwrap_err();
        assert_eq!(err.row, Some(3));
        assert_eq!(
            err.to_string(),
            "row#3 qty for `k` duplicated with different value"
        );
        // The original value survives
        assert_eq!(map.get("k"), Some(&1.0));
    }
}
