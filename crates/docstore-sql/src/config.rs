//! Adapter configuration loaded from environment variables.
//!
//! | Variable                   | Default    | Description                                   |
//! |----------------------------|------------|-----------------------------------------------|
//! | `DOCSTORE_DB_PATH`         | `:memory:` | SQLite database file                          |
//! | `DOCSTORE_NAMESPACE`       | `main`     | Namespace (schema) holding the collections    |
//! | `DOCSTORE_BUSY_TIMEOUT_MS` | `5000`     | SQLite busy timeout in ms                     |
//! | `DOCSTORE_DEFAULT_LIMIT`   | `25`       | Page size for `Adapter::find_options`         |
//! | `DOCSTORE_ATTACH_DIR`      | (empty)    | Directory for attached namespaces (empty = in memory) |

use std::path::PathBuf;
use std::time::Duration;

use crate::model::DEFAULT_LIMIT;

pub const MEMORY_PATH: &str = ":memory:";

/// Runtime configuration for an [`Adapter`](crate::Adapter).
#[derive(Debug, Clone, PartialEq)]
pub struct AdapterConfig {
    /// SQLite database file, or `:memory:`.
    pub db_path: String,

    /// Namespace every collection table lives in.
    pub namespace: String,

    pub busy_timeout: Duration,

    /// Page size used when the caller does not pick one.
    pub default_limit: u64,

    /// Where `create_namespace` puts attached database files. `None` keeps
    /// them in memory.
    pub attach_dir: Option<PathBuf>,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            db_path: MEMORY_PATH.to_string(),
            namespace: "main".to_string(),
            busy_timeout: Duration::from_millis(5000),
            default_limit: DEFAULT_LIMIT,
            attach_dir: None,
        }
    }
}

impl AdapterConfig {
    pub fn from_env() -> Self {
        let attach_dir = env_str("DOCSTORE_ATTACH_DIR", "");
        Self {
            db_path:       env_str("DOCSTORE_DB_PATH", MEMORY_PATH),
            namespace:     env_str("DOCSTORE_NAMESPACE", "main"),
            busy_timeout:  Duration::from_millis(env_parse("DOCSTORE_BUSY_TIMEOUT_MS", 5000)),
            default_limit: env_parse("DOCSTORE_DEFAULT_LIMIT", DEFAULT_LIMIT),
            attach_dir:    (!attach_dir.is_empty()).then(|| PathBuf::from(attach_dir)),
        }
    }

    pub fn in_memory() -> Self {
        Self::default()
    }
}

fn env_str(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = AdapterConfig::default();
        assert_eq!(cfg.db_path, ":memory:");
        assert_eq!(cfg.namespace, "main");
        assert_eq!(cfg.busy_timeout, Duration::from_secs(5));
        assert_eq!(cfg.default_limit, 25);
        assert!(cfg.attach_dir.is_none());
    }

    #[test]
    fn env_override_applied() {
        std::env::set_var("DOCSTORE_DEFAULT_LIMIT", "50");
        std::env::set_var("DOCSTORE_ATTACH_DIR", "/tmp/docstore");
        let cfg = AdapterConfig::from_env();
        assert_eq!(cfg.default_limit, 50);
        assert_eq!(cfg.attach_dir, Some(PathBuf::from("/tmp/docstore")));
        std::env::remove_var("DOCSTORE_DEFAULT_LIMIT");
        std::env::remove_var("DOCSTORE_ATTACH_DIR");
    }

    #[test]
    fn unparsable_values_fall_back() {
        std::env::set_var("DOCSTORE_BUSY_TIMEOUT_MS", "soon");
        let cfg = AdapterConfig::from_env();
        assert_eq!(cfg.busy_timeout, Duration::from_millis(5000));
        std::env::remove_var("DOCSTORE_BUSY_TIMEOUT_MS");
    }
}
