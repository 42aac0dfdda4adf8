//! Result of one successful collection attempt.

use std::time::Duration;

use indexmap::IndexMap;

/// Output kind holding the configuration text.
pub const CONFIG: &str = "config";

/// Named outputs captured from one device.
#[derive(Debug, Clone, Default)]
pub struct Collection {
    /// Captured text by output kind, in capture order.
    pub outputs: IndexMap<String, String>,

    /// Time taken by the driver.
    pub elapsed: Duration,
}

impl Collection {
    /// Create a collection holding only the configuration text.
    pub fn config(text: impl Into<String>, elapsed: Duration) -> Self {
        let mut outputs = IndexMap::new();
        outputs.insert(CONFIG.to_string(), text.into());
        Self { outputs, elapsed }
    }

    /// The captured configuration text, if any.
    pub fn config_text(&self) -> Option<&str> {
        self.outputs.get(CONFIG).map(String::as_str)
    }

    /// Get any named output.
    pub fn get(&self, kind: &str) -> Option<&str> {
        self.outputs.get(kind).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_collection() {
        let collection = Collection::config("hostname core1\n", Duration::from_secs(3));
        assert_eq!(collection.config_text(), Some("hostname core1\n"));
        assert_eq!(collection.get("version"), None);
    }
}
