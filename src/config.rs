//! Server configuration.
//!
//! Values are layered: built-in defaults, then an optional YAML file, then
//! environment variables and command-line flags (clap merges those two).

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use serde::Deserialize;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_WORKERS: usize = 4;
pub const DEFAULT_READ_TIMEOUT_SECS: u64 = 5;

/// Command-line surface.
#[derive(Parser, Debug, Default)]
#[command(name = "fileserve", version, about = "Minimal static file server")]
pub struct Args {
    /// Path to a YAML configuration file
    #[arg(short, long, env = "FILESERVE_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Host address to bind
    #[arg(short = 'i', long = "ip", env = "FILESERVE_HOST", value_name = "HOST")]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "FILESERVE_PORT")]
    pub port: Option<u16>,

    /// Number of connections handled concurrently
    #[arg(short, long, env = "FILESERVE_WORKERS")]
    pub workers: Option<usize>,

    /// Path to the document root
    #[arg(
        short = 'r',
        long = "doc-root",
        visible_alias = "doc_root",
        env = "FILESERVE_DOC_ROOT",
        value_name = "DIR"
    )]
    pub doc_root: Option<PathBuf>,

    /// Path to the log file (stdout when absent)
    #[arg(short = 'l', long = "log", env = "FILESERVE_LOG", value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Seconds to wait for each read from a client
    #[arg(
        short = 't',
        long = "read-timeout",
        env = "FILESERVE_READ_TIMEOUT",
        value_name = "SECS"
    )]
    pub read_timeout: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub workers: usize,
    pub doc_root: PathBuf,
    pub log_file: Option<PathBuf>,
    pub read_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            workers: DEFAULT_WORKERS,
            doc_root: PathBuf::from("."),
            log_file: None,
            read_timeout_secs: DEFAULT_READ_TIMEOUT_SECS,
        }
    }
}

impl Config {
    /// Builds the configuration from the process arguments and environment.
    pub fn load() -> anyhow::Result<Self> {
        Self::from_args(Args::parse())
    }

    pub fn from_args(args: Args) -> anyhow::Result<Self> {
        let mut cfg = match &args.config {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        if let Some(host) = args.host {
            cfg.host = host;
        }
        if let Some(port) = args.port {
            cfg.port = port;
        }
        if let Some(workers) = args.workers {
            cfg.workers = workers;
        }
        if let Some(doc_root) = args.doc_root {
            cfg.doc_root = doc_root;
        }
        if let Some(log_file) = args.log_file {
            cfg.log_file = Some(log_file);
        }
        if let Some(secs) = args.read_timeout {
            cfg.read_timeout_secs = secs;
        }

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_yaml(&text)
            .with_context(|| format!("invalid config file {}", path.display()))
    }

    /// Parses a YAML document. Missing keys fall back to the defaults.
    pub fn from_yaml(text: &str) -> anyhow::Result<Self> {
        let cfg: Config = serde_yaml::from_str(text)?;
        Ok(cfg)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.workers == 0 {
            anyhow::bail!("worker count must be at least 1");
        }
        if self.read_timeout_secs == 0 {
            anyhow::bail!("read timeout must be at least 1 second");
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }
}
