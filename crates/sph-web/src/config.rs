use std::net::SocketAddr;
use std::path::PathBuf;

/// Runtime settings of the HTTP server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    /// `None` selects the platform data directory.
    pub database: Option<PathBuf>,
    pub max_upload_bytes: usize,
    pub session_ttl_secs: i64,
    pub secure_cookies: bool,
    /// Blank rows appended to the bulk contact form.
    pub formset_extra: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 8000)),
            database: None,
            max_upload_bytes: 5 * 1024 * 1024,
            session_ttl_secs: 14 * 24 * 3600,
            secure_cookies: false,
            formset_extra: 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.bind.port(), 8000);
        assert_eq!(config.max_upload_bytes, 5 * 1024 * 1024);
        assert_eq!(config.session_ttl_secs, 1_209_600);
        assert!(!config.secure_cookies);
        assert_eq!(config.formset_extra, 3);
    }
}
