use anyhow::{Context, Result, bail};
use clap::Parser;
use std::env;

/// Directory names the storage root may not use; mostly guards against
/// pointing the store at the source tree or the current directory itself.
const RESTRICTED_DIRS: &[&str] = &["src", "target", "tests", ".", "..", "./", "../"];

/// Centralized application configuration.
/// Combines environment variables and CLI arguments; built once at startup
/// and passed into the server and store components.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub storage_dir: String,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Simple Storage Service")]
pub struct Args {
    /// Host to bind to (overrides TRIPLE_S_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides TRIPLE_S_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Directory for file storage (overrides TRIPLE_S_STORAGE_DIR)
    #[arg(long)]
    pub directory: Option<String>,
}

impl AppConfig {
    /// Parse environment variables + CLI args into an AppConfig.
    pub fn from_env_and_args() -> Result<Self> {
        Self::build(Args::parse())
    }

    fn build(args: Args) -> Result<Self> {
        // --- Environment fallback ---
        let env_host = env::var("TRIPLE_S_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = match env::var("TRIPLE_S_PORT") {
            Ok(value) => value
                .parse::<u16>()
                .with_context(|| format!("parsing TRIPLE_S_PORT value `{}`", value))?,
            Err(env::VarError::NotPresent) => 6000,
            Err(err) => return Err(err).context("reading TRIPLE_S_PORT"),
        };
        let env_storage = env::var("TRIPLE_S_STORAGE_DIR").unwrap_or_else(|_| "./data".into());

        // --- Merge ---
        let cfg = Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            storage_dir: args.directory.unwrap_or(env_storage),
        };

        if is_restricted_dir(&cfg.storage_dir) {
            bail!(
                "the specified directory '{}' is restricted, choose a different name",
                cfg.storage_dir
            );
        }

        Ok(cfg)
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn is_restricted_dir(dir: &str) -> bool {
    RESTRICTED_DIRS
        .iter()
        .any(|restricted| restricted.eq_ignore_ascii_case(dir))
}
