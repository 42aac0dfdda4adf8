//! Registry mapping access-method names to dialects.

use std::collections::HashMap;

use super::dialect::Dialect;
use super::vendors;
use crate::error::ConfigError;

/// Registry for dialect definitions.
#[derive(Debug, Clone, Default)]
pub struct DialectRegistry {
    dialects: HashMap<String, Dialect>,
}

impl DialectRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            dialects: HashMap::new(),
        }
    }

    /// Create a registry holding the built-in dialects.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for dialect in [vendors::cisco::dialect(), vendors::junos::dialect()] {
            registry.dialects.insert(dialect.name.clone(), dialect);
        }
        registry
    }

    /// Register a dialect definition.
    pub fn register(&mut self, dialect: Dialect) -> Result<(), ConfigError> {
        if self.dialects.contains_key(&dialect.name) {
            return Err(ConfigError::Invalid {
                message: format!("dialect '{}' is already registered", dialect.name),
            });
        }
        self.dialects.insert(dialect.name.clone(), dialect);
        Ok(())
    }

    /// Get a dialect by method name.
    pub fn get(&self, name: &str) -> Option<&Dialect> {
        self.dialects.get(name)
    }

    /// Check if a dialect is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.dialects.contains_key(name)
    }

    /// List all registered method names.
    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.dialects.keys()
    }
}
