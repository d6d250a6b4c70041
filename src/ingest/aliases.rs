//! Alias resolution
//!
//! Maps source-specific labels to a canonical nutrient slot with an
//! optional unit-conversion ratio. Built once during resolution and
//! read-only for every downstream sheet.

use std::collections::HashMap;

use super::checks::check_and_insert;
use super::error::ValidationError;

/// Where an alias points: a canonical slot plus a unit ratio.
///
/// The ratio participates in conflict detection but is never applied
/// to values; it is carried for the data sheet's own bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AliasTarget {
    pub name_id: u32,
    pub ratio: f64,
}

/// The alias map, keyed by source label
#[derive(Debug, Clone, Default)]
pub struct AliasMap {
    map: HashMap<String, AliasTarget>,
}

impl AliasMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn get(&self, label: &str) -> Option<&AliasTarget> {
        self.map.get(label)
    }

    /// Insert an alias, enforcing the duplicate policy: an equal
    /// re-insertion only warns, a conflicting one fails.
    pub fn insert_checked(
        &mut self,
        row: u32,
        alias: String,
        target: AliasTarget,
    ) -> Result<(), ValidationError> {
        let what = format!("alias `{}`", alias);
        check_and_insert(&mut self.map, row, alias, target, &what)
    }

    /// Require that a downstream label is already aliased
    pub fn check_is_aliased(&self, row: u32, label: &str) -> Result<&AliasTarget, ValidationError> {
        self.map.get(label).ok_or_else(|| {
            ValidationError::at_row(row, format!("nutrient name `{}` not aliased", label))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflicting_alias_fails() {
        let mut aliases = AliasMap::new();
        aliases
            .insert_checked(
                2,
                "Protein".to_string(),
                AliasTarget {
                    name_id: 0,
                    ratio: 1.0,
                },
            )
            .unwrap();
        let err = aliases
            .insert_checked(
                3,
                "Protein".to_string(),
                AliasTarget {
                    name_id: 0,
                    ratio: 2.0,
                },
            )
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "row#3 alias `Protein` duplicated with different value"
        );
    }

    #[test]
    fn test_identical_alias_is_idempotent() {
        let mut aliases = AliasMap::new();
        let target = AliasTarget {
            name_id: 0,
            ratio: 1.0,
        };
        aliases
            .insert_checked(2, "Protein".to_string(), target)
            .unwrap();
        aliases
            .insert_checked(3, "Protein".to_string(), target)
            .unwrap();
        assert_eq!(aliases.len(), 1);
    }

    #[test]
    fn test_check_is_aliased() {
        let mut aliases = AliasMap::new();
        aliases
            .insert_checked(
                2,
                "Prot".to_string(),
                AliasTarget {
                    name_id: 3,
                    ratio: 1.0,
                },
            )
            .unwrap();

        assert_eq!(aliases.check_is_aliased(4, "Prot").unwrap().name_id, 3);

        let err = aliases.check_is_aliased(5, "Fatt").unwrap_err();
        assert_eq!(err.to_string(), "row#5 nutrient name `Fatt` not aliased");
    }
}
