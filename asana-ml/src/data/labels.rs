//! Ordered class-name to class-index mapping.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{MLError, Result};

/// Fixed, ordered set of class names mapped bijectively onto `0..K`.
///
/// Position in the list is the class index, so the map is serialized as a
/// plain list of names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct ClassLabelMap {
    names: Vec<String>,
    indices: HashMap<String, usize>,
}

impl ClassLabelMap {
    /// Build a map from class names in index order.
    pub fn new<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.is_empty() {
            return Err(MLError::config("class map needs at least one class"));
        }

        let mut indices = HashMap::with_capacity(names.len());
        for (index, name) in names.iter().enumerate() {
            if name.trim().is_empty() {
                return Err(MLError::config(format!("class {} has an empty name", index)));
            }
            if indices.insert(name.clone(), index).is_some() {
                return Err(MLError::config(format!("duplicate class name '{}'", name)));
            }
        }

        Ok(Self { names, indices })
    }

    /// Class index for a label string.
    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.indices.get(label).copied()
    }

    /// Class name for an index.
    pub fn name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    /// Number of classes (K).
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Always false for a constructed map; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Class names in index order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Width-K one-hot vector for `index`.
    pub fn one_hot(&self, index: usize) -> Result<Vec<f64>> {
        if index >= self.len() {
            return Err(MLError::invalid_input(format!(
                "class index {} out of range for {} classes",
                index,
                self.len()
            )));
        }
        let mut encoded = vec![0.0; self.len()];
        encoded[index] = 1.0;
        Ok(encoded)
    }
}

impl TryFrom<Vec<String>> for ClassLabelMap {
    type Error = MLError;

    fn try_from(names: Vec<String>) -> Result<Self> {
        Self::new(names)
    }
}

impl From<ClassLabelMap> for Vec<String> {
    fn from(map: ClassLabelMap) -> Self {
        map.names
    }
}

impl Default for ClassLabelMap {
    fn default() -> Self {
        let names = vec!["yoga1".to_string(), "yoga2".to_string()];
        let indices = names
            .iter()
            .enumerate()
            .map(|(index, name)| (name.clone(), index))
            .collect();
        Self { names, indices }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_classes() {
        let map = ClassLabelMap::default();
        assert_eq!(map.len(), 2);
        assert_eq!(map.index_of("yoga1"), Some(0));
        assert_eq!(map.index_of("yoga2"), Some(1));
        assert_eq!(map.name(1), Some("yoga2"));
        assert_eq!(map.index_of("yoga3"), None);
    }

    #[test]
    fn test_rejects_duplicates_and_empty() {
        assert!(ClassLabelMap::new(Vec::<String>::new()).is_err());
        assert!(ClassLabelMap::new(["a", "b", "a"]).is_err());
        assert!(ClassLabelMap::new(["a", " "]).is_err());
    }

    #[test]
    fn test_one_hot() {
        let map = ClassLabelMap::new(["warrior", "tree", "cobra"]).unwrap();
        assert_eq!(map.one_hot(1).unwrap(), vec![0.0, 1.0, 0.0]);
        assert!(map.one_hot(3).is_err());
    }

    #[test]
    fn test_serializes_as_name_list() {
        let map = ClassLabelMap::new(["tree", "cobra"]).unwrap();
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"["tree","cobra"]"#);

        let back: ClassLabelMap = serde_json::from_str(&json).unwrap();
        assert_eq!(back, map);

        let dup: std::result::Result<ClassLabelMap, _> = serde_json::from_str(r#"["a","a"]"#);
        assert!(dup.is_err());
    }
}
