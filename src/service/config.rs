// Service configuration
// Built explicitly at startup and passed down; no process-global state

use std::path::PathBuf;

/// Configuration for the service layer.
///
/// `allowed_origins` is carried for whatever HTTP shell hosts the
/// handlers; nothing in this crate enforces CORS itself.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Bucket name objects are stored under
    pub bucket: String,

    /// Root data directory. Defaults to the platform data dir when unset.
    pub data_dir: Option<PathBuf>,

    /// Public base URL for stored objects. When unset, local file URLs
    /// are returned.
    pub public_base_url: Option<String>,

    /// Origins the hosting shell should allow
    pub allowed_origins: Vec<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        ServiceConfig {
            bucket: "drumscribe-audio".to_string(),
            data_dir: None,
            public_base_url: None,
            allowed_origins: Vec::new(),
        }
    }
}

impl ServiceConfig {
    /// Build a configuration from environment variables, falling back to
    /// defaults: `DRUMSCRIBE_BUCKET`, `DRUMSCRIBE_DATA_DIR`,
    /// `DRUMSCRIBE_BASE_URL`, `DRUMSCRIBE_ALLOWED_ORIGINS`
    /// (comma-separated).
    pub fn from_env() -> Self {
        let defaults = ServiceConfig::default();

        ServiceConfig {
            bucket: std::env::var("DRUMSCRIBE_BUCKET").unwrap_or(defaults.bucket),
            data_dir: std::env::var_os("DRUMSCRIBE_DATA_DIR").map(PathBuf::from),
            public_base_url: std::env::var("DRUMSCRIBE_BASE_URL").ok(),
            allowed_origins: std::env::var("DRUMSCRIBE_ALLOWED_ORIGINS")
                .map(|v| {
                    v.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = ServiceConfig::default();
        assert_eq!(config.bucket, "drumscribe-audio");
        assert!(config.data_dir.is_none());
        assert!(config.allowed_origins.is_empty());
    }
}
