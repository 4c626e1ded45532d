//! Runtime configuration, read from flags or `API_PDF_*` environment
//! variables.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::pdf::pipeline::DEFAULT_MAX_IMAGES;

const DEFAULT_LISTEN: &str = "0.0.0.0:8080";
const DEFAULT_SCRATCH_DIR: &str = "tmp";
const DEFAULT_LOOKUP_FILE: &str = "cortecsj.json";
const DEFAULT_MAX_BODY_BYTES: usize = 32 * 1024 * 1024;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Parser, Debug, Clone)]
#[command(version, about)]
pub struct Config {
    /// Address the HTTP server binds to.
    #[arg(long, env = "API_PDF_LISTEN", default_value = DEFAULT_LISTEN)]
    pub listen: SocketAddr,

    /// Write logs to this file instead of stdout.
    #[arg(long, env = "API_PDF_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Root directory for per-request scratch files.
    #[arg(long, env = "API_PDF_SCRATCH_DIR", default_value = DEFAULT_SCRATCH_DIR)]
    pub scratch_dir: PathBuf,

    /// JSON file served by `GET /cortecsj`.
    #[arg(long, env = "API_PDF_LOOKUP_FILE", default_value = DEFAULT_LOOKUP_FILE)]
    pub lookup_file: PathBuf,

    /// Maximum number of embedded images accepted per request.
    #[arg(long, env = "API_PDF_MAX_IMAGES", default_value_t = DEFAULT_MAX_IMAGES)]
    pub max_images: usize,

    #[arg(long, env = "API_PDF_MAX_BODY_BYTES", default_value_t = DEFAULT_MAX_BODY_BYTES)]
    pub max_body_bytes: usize,

    /// Upper bound on the time spent rendering one document.
    #[arg(
        long,
        env = "API_PDF_REQUEST_TIMEOUT_SECS",
        default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS
    )]
    pub request_timeout_secs: u64,
}

impl Config {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([0, 0, 0, 0], 8080)),
            log_file: None,
            scratch_dir: PathBuf::from(DEFAULT_SCRATCH_DIR),
            lookup_file: PathBuf::from(DEFAULT_LOOKUP_FILE),
            max_images: DEFAULT_MAX_IMAGES,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_defaults() {
        let config = Config::try_parse_from([
            "api-pdf",
            "--listen",
            "127.0.0.1:9000",
            "--scratch-dir",
            "/var/tmp/api-pdf",
            "--max-images",
            "5",
        ])
        .unwrap();

        assert_eq!(config.listen, "127.0.0.1:9000".parse().unwrap());
        assert_eq!(config.scratch_dir, PathBuf::from("/var/tmp/api-pdf"));
        assert_eq!(config.max_images, 5);
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn default_listen_matches_flag_default() {
        assert_eq!(Config::default().listen, DEFAULT_LISTEN.parse().unwrap());
    }

    #[test]
    fn rejects_invalid_listen_address() {
        assert!(Config::try_parse_from(["api-pdf", "--listen", "not-an-addr"]).is_err());
    }
}
