use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_STORE_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_LOG_DIR: &str = "./logs";

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
    /// Directory for rolling file logs; `None` means stdout only.
    pub log_dir: Option<PathBuf>,
    pub database_url: String,
    pub store_timeout_ms: u64,
}

impl Config {
    pub fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(4000);

        let host = std::env::var("HOST")
            .ok()
            .and_then(|value| value.parse::<IpAddr>().ok())
            .unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));

        let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let file_logs = std::env::var("ENABLE_FILE_LOGS")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);
        let log_dir = file_logs.then(|| {
            PathBuf::from(std::env::var("LOG_DIR").unwrap_or_else(|_| DEFAULT_LOG_DIR.to_string()))
        });

        let database_url =
            std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite::memory:".to_string());

        let store_timeout_ms = std::env::var("STORE_TIMEOUT_MS")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .filter(|ms| *ms > 0)
            .unwrap_or(DEFAULT_STORE_TIMEOUT_MS);

        Self {
            host,
            port,
            log_level,
            log_dir,
            database_url,
            store_timeout_ms,
        }
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_log_knobs_resolve_to_a_directory() {
        std::env::remove_var("ENABLE_FILE_LOGS");
        std::env::remove_var("LOG_DIR");
        assert_eq!(Config::from_env().log_dir, None);

        std::env::set_var("ENABLE_FILE_LOGS", "1");
        assert_eq!(Config::from_env().log_dir, Some(PathBuf::from(DEFAULT_LOG_DIR)));

        std::env::set_var("LOG_DIR", "/tmp/forest-logs");
        assert_eq!(
            Config::from_env().log_dir,
            Some(PathBuf::from("/tmp/forest-logs"))
        );

        std::env::remove_var("ENABLE_FILE_LOGS");
        std::env::remove_var("LOG_DIR");
    }
}
