use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_DB_PATH: &str = ".hazardmap/events.db";
pub const DEFAULT_PORT: u16 = 4830;
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServeConfig {
    pub db_path: String,
    pub host: IpAddr,
    pub port: u16,
    /// Zero disables the background sweeper.
    pub sweep_interval_secs: u64,
    pub max_upload_bytes: usize,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            db_path: DEFAULT_DB_PATH.to_string(),
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: DEFAULT_PORT,
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl ServeConfig {
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn sweep_interval(&self) -> Option<Duration> {
        (self.sweep_interval_secs > 0).then(|| Duration::from_secs(self.sweep_interval_secs))
    }

    /// Creates the database's parent directory if it is missing.
    pub fn ensure_db_dir(&self) -> std::io::Result<()> {
        match Path::new(&self.db_path).parent() {
            Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_interval_disables_sweeper() {
        let config = ServeConfig {
            sweep_interval_secs: 0,
            ..ServeConfig::default()
        };
        assert_eq!(config.sweep_interval(), None);
        assert_eq!(
            ServeConfig::default().sweep_interval(),
            Some(Duration::from_secs(60))
        );
    }

    #[test]
    fn default_addr_is_loopback() {
        assert_eq!(
            ServeConfig::default().addr(),
            "127.0.0.1:4830".parse::<SocketAddr>().unwrap()
        );
    }

    #[test]
    fn creates_nested_db_dir() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("a/b/events.db");
        let config = ServeConfig {
            db_path: db_path.to_string_lossy().into_owned(),
            ..ServeConfig::default()
        };
        config.ensure_db_dir().unwrap();
        assert!(dir.path().join("a/b").is_dir());
    }
}
