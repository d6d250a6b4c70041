//! Canonical nutrient registry
//!
//! The ordered, immutable-after-build set of nutrient slots. Ids are
//! assigned 0..N-1 in first-seen order from the canonical-names sheet;
//! this order is fixed for the run and defines every vector slot.

use std::collections::HashMap;

use super::error::ValidationError;
use super::workbook::Cell;

/// The canonical nutrient registry
#[derive(Debug, Clone)]
pub struct CanonicalRegistry {
    names: Vec<String>,
    by_name: HashMap<String, u32>,
}

impl CanonicalRegistry {
    /// Build the registry from canonical names in file order.
    /// Duplicate names collapse to a single id; that is not an error.
    pub fn build<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut registry = Self {
            names: Vec::new(),
            by_name: HashMap::new(),
        };
        for name in names {
            let name = name.into();
            if !registry.by_name.contains_key(&name) {
                let id = registry.names.len() as u32;
                registry.by_name.insert(name.clone(), id);
                registry.names.push(name);
            }
        }
        registry
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Canonical ids in vector slot order
    pub fn ids(&self) -> Vec<u32> {
        (0..self.names.len() as u32).collect()
    }

    /// Canonical names in vector slot order
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn id(&self, name: &str) -> Option<u32> {
        self.by_name.get(name).copied()
    }

    pub fn name(&self, id: u32) -> Option<&str> {
        self.names.get(id as usize).map(String::as_str)
    }

    /// Resolve a cell that may hold either a canonical name or a
    /// numeric canonical id; anything else is a validation failure.
    pub fn check_is_canonical(&self, row: u32, cell: &Cell) -> Result<u32, ValidationError> {
        let resolved = match cell {
            Cell::Number(n) => {
                if n.fract() == 0.0 && *n >= 0.0 && (*n as usize) < self.names.len() {
                    Some(*n as u32)
                } else {
                    None
                }
            }
            other => self.by_name.get(other.display().as_str()).copied(),
        };

        resolved.ok_or_else(|| {
            ValidationError::at_row(
                row,
                format!(
                    "canonical name/id `{}` not in CanonicalNames",
                    cell.display()
                ),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dense_first_seen_ids() {
        let registry = CanonicalRegistry::build(["A", "B", "A"]);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.id("A"), Some(0));
        assert_eq!(registry.id("B"), Some(1));
        assert_eq!(registry.ids(), vec![0, 1]);
    }

    #[test]
    fn test_bidirectional_lookup() {
        let registry = CanonicalRegistry::build(["Protein", "Fat"]);
        assert_eq!(registry.name(1), Some("Fat"));
        assert_eq!(registry.id("Fat"), Some(1));
        assert_eq!(registry.name(2), None);
    }

    #[test]
    fn test_check_is_canonical_by_name() {
        let registry = CanonicalRegistry::build(["Protein"]);
        let id = registry
            .check_is_canonical(2, &Cell::Text("Protein".to_string()))
            .unwrap();
        assert_eq!(id, 0);
    }

    #[test]
    fn test_check_is_canonical_by_id() {
        let registry = CanonicalRegistry::build(["Protein", "Fat"]);
        let id = registry.check_is_canonical(2, &Cell::Number(1.0)).unwrap();
        assert_eq!(id, 1);
    }

    #[test]
    fn test_check_is_canonical_misses() {
        let registry = CanonicalRegistry::build(["Protein"]);
        let err = registry
            .check_is_canonical(7, &Cell::Text("Fiber".to_string()))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "row#7 canonical name/id `Fiber` not in CanonicalNames"
        );

        let err = registry.check_is_canonical(8, &Cell::Number(5.0)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "row#8 canonical name/id `5` not in CanonicalNames"
        );
    }
}
