//! File extensions claimed by dynamically registered languages

use parking_lot::RwLock;
use std::collections::HashSet;

/// Set of registered file extensions, shared across tasks
#[derive(Debug, Default)]
pub struct ExtensionRegistry {
    extensions: RwLock<HashSet<String>>,
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an extension; returns `true` if it was not present yet
    pub fn register(&self, extension: impl Into<String>) -> bool {
        self.extensions.write().insert(extension.into())
    }

    pub fn contains(&self, extension: &str) -> bool {
        self.extensions.read().contains(extension)
    }

    pub fn len(&self) -> usize {
        self.extensions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.read().is_empty()
    }

    /// Sorted copy of the registered extensions
    pub fn snapshot(&self) -> Vec<String> {
        let mut extensions: Vec<String> = self.extensions.read().iter().cloned().collect();
        extensions.sort();
        extensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_register_and_contains() {
        let registry = ExtensionRegistry::new();
        assert!(registry.is_empty());

        assert!(registry.register("pico"));
        assert!(!registry.register("pico"));
        assert!(registry.contains("pico"));
        assert!(!registry.contains(".pico"));
        assert_eq!(registry.len(), 1);
    }

    proptest! {
        #[test]
        fn prop_registration_is_idempotent(
            extensions in prop::collection::vec("[a-z]{1,6}", 0..20),
            repeats in 1usize..4,
        ) {
            let registry = ExtensionRegistry::new();
            for _ in 0..repeats {
                for ext in &extensions {
                    registry.register(ext.clone());
                }
            }

            let unique: HashSet<&String> = extensions.iter().collect();
            prop_assert_eq!(registry.len(), unique.len());
            for ext in &extensions {
                prop_assert!(registry.contains(ext));
            }
        }
    }
}
