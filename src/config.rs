//! Runtime configuration: working directories and download housekeeping.
//!
//! Environment variables (loaded through `dotenvy` by the binary):
//!
//! | Variable                 | Default     | Purpose                        |
//! |--------------------------|-------------|--------------------------------|
//! | `MORADIAS_UPLOAD_DIR`    | `uploads`   | Incoming CSV files             |
//! | `MORADIAS_DOWNLOAD_DIR`  | `downloads` | Generated zips and CSVs        |
//! | `MORADIAS_REFERENCE_DIR` | `roteiros`  | Route reference spreadsheets   |

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use crate::progress::log_warning;

/// Seconds after which a generated download is considered stale.
const STALE_AFTER_SECS: u64 = 500;

/// Directory layout for one running instance.
#[derive(Debug, Clone)]
pub struct Config {
    pub upload_dir: PathBuf,
    pub download_dir: PathBuf,
    pub reference_dir: PathBuf,
    pub stale_after: Duration,
}

impl Config {
    /// Build from the environment, create the working directories and sweep
    /// stale downloads.
    pub fn from_env() -> std::io::Result<Self> {
        let config = Self::with_dirs(
            env_or("MORADIAS_UPLOAD_DIR", "uploads"),
            env_or("MORADIAS_DOWNLOAD_DIR", "downloads"),
            env_or("MORADIAS_REFERENCE_DIR", "roteiros"),
        );
        config.ensure_dirs()?;
        config.cleanup_stale_downloads();
        Ok(config)
    }

    /// Build with explicit directories; nothing is created or swept.
    pub fn with_dirs(
        upload_dir: impl Into<PathBuf>,
        download_dir: impl Into<PathBuf>,
        reference_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            upload_dir: upload_dir.into(),
            download_dir: download_dir.into(),
            reference_dir: reference_dir.into(),
            stale_after: Duration::from_secs(STALE_AFTER_SECS),
        }
    }

    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.upload_dir)?;
        std::fs::create_dir_all(&self.download_dir)?;
        Ok(())
    }

    /// Remove generated downloads older than the stale threshold.
    /// Best-effort: failures are logged, never fatal.
    pub fn cleanup_stale_downloads(&self) {
        if let Err(e) = self.sweep_dir(&self.download_dir) {
            log_warning(format!("Erro ao limpar arquivos antigos: {}", e));
        }
    }

    fn sweep_dir(&self, dir: &Path) -> std::io::Result<()> {
        let now = SystemTime::now();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let modified = entry.metadata()?.modified()?;
            if now
                .duration_since(modified)
                .map(|age| age > self.stale_after)
                .unwrap_or(false)
            {
                let _ = std::fs::remove_file(&path);
            }
        }
        Ok(())
    }
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}
