use serde::{Deserialize, Serialize};

/// Construction options for a [`Store`](crate::Store).
///
/// ```
/// use slice_store::StoreConfig;
///
/// let config: StoreConfig = serde_json::from_str(r#"{ "name": "settings" }"#).unwrap();
/// assert_eq!(config.name, "settings");
///
/// let config: StoreConfig = serde_json::from_str("{}").unwrap();
/// assert_eq!(config, StoreConfig::default());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Label attached to every trace event the store emits.
    pub name: String,
}

impl StoreConfig {
    /// Default configuration with a custom trace label.
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            name: "store".to_string(),
        }
    }
}
