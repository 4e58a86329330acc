use crate::services::resize_service::DEFAULT_MAX_DIMENSION;
use anyhow::{Context, Result};
use clap::Parser;
use std::{env, str::FromStr, time::Duration};

const DEFAULT_SOURCE_BASE_URL: &str = "https://brotemedia.sfo3.cdn.digitaloceanspaces.com/winfo/";

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub cache_dir: String,
    pub source_base_url: String,
    pub fetch_timeout: Duration,
    pub max_dimension: u32,
    pub single_flight: bool,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "On-demand image resizing proxy with a disk cache")]
pub struct Args {
    /// Host to bind to (overrides RESIZER_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides RESIZER_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Directory where resized artifacts are cached (overrides RESIZER_CACHE_DIR)
    #[arg(long)]
    pub cache_dir: Option<String>,

    /// Base URL of the source image store (overrides RESIZER_SOURCE_BASE_URL)
    #[arg(long)]
    pub source_base_url: Option<String>,

    /// Source fetch timeout in seconds (overrides RESIZER_FETCH_TIMEOUT_SECS)
    #[arg(long)]
    pub fetch_timeout_secs: Option<u64>,

    /// Largest accepted width or height (overrides RESIZER_MAX_DIMENSION)
    #[arg(long)]
    pub max_dimension: Option<u32>,

    /// Let concurrent misses for the same artifact compute independently
    #[arg(long)]
    pub no_single_flight: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig.
    pub fn from_env_and_args() -> Result<Self> {
        Self::merge(Args::parse(), |name| env::var(name))
    }

    /// Merge parsed CLI args over values looked up through `var`.
    fn merge<F>(args: Args, var: F) -> Result<Self>
    where
        F: Fn(&str) -> Result<String, env::VarError>,
    {
        // --- Environment fallback ---
        let env_host = var("RESIZER_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = parse_var(&var, "RESIZER_PORT", 8087u16)?;
        let env_cache = var("RESIZER_CACHE_DIR").unwrap_or_else(|_| "./cache".into());
        let env_base =
            var("RESIZER_SOURCE_BASE_URL").unwrap_or_else(|_| DEFAULT_SOURCE_BASE_URL.into());
        let env_timeout = parse_var(&var, "RESIZER_FETCH_TIMEOUT_SECS", 30u64)?;
        let env_max_dim = parse_var(&var, "RESIZER_MAX_DIMENSION", DEFAULT_MAX_DIMENSION)?;

        // --- Merge ---
        Ok(Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            cache_dir: args.cache_dir.unwrap_or(env_cache),
            source_base_url: args.source_base_url.unwrap_or(env_base),
            fetch_timeout: Duration::from_secs(args.fetch_timeout_secs.unwrap_or(env_timeout)),
            max_dimension: args.max_dimension.unwrap_or(env_max_dim),
            single_flight: !args.no_single_flight,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<F, T>(var: &F, name: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Result<String, env::VarError>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match var(name) {
        Ok(value) => value
            .parse::<T>()
            .with_context(|| format!("parsing {} value `{}`", name, value)),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(err) => Err(err).with_context(|| format!("reading {}", name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Result<String, env::VarError> + use<> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned().ok_or(env::VarError::NotPresent)
    }

    #[test]
    fn defaults_apply_without_env_or_args() {
        let cfg = AppConfig::merge(Args::default(), lookup(&[])).unwrap();
        assert_eq!(cfg.addr(), "0.0.0.0:8087");
        assert_eq!(cfg.cache_dir, "./cache");
        assert_eq!(cfg.source_base_url, DEFAULT_SOURCE_BASE_URL);
        assert_eq!(cfg.fetch_timeout, Duration::from_secs(30));
        assert_eq!(cfg.max_dimension, DEFAULT_MAX_DIMENSION);
        assert!(cfg.single_flight);
    }

    #[test]
    fn args_override_env() {
        let args = Args {
            port: Some(9000),
            cache_dir: Some("/var/cache/resizer".into()),
            no_single_flight: true,
            ..Default::default()
        };
        let env = lookup(&[("RESIZER_PORT", "7000"), ("RESIZER_HOST", "127.0.0.1")]);
        let cfg = AppConfig::merge(args, env).unwrap();
        assert_eq!(cfg.addr(), "127.0.0.1:9000");
        assert_eq!(cfg.cache_dir, "/var/cache/resizer");
        assert!(!cfg.single_flight);
    }

    #[test]
    fn malformed_env_numbers_are_errors() {
        let err = AppConfig::merge(Args::default(), lookup(&[("RESIZER_PORT", "eighty")]))
            .unwrap_err();
        assert!(err.to_string().contains("RESIZER_PORT"));
    }

    #[test]
    fn cli_parses_flags() {
        let args = Args::try_parse_from([
            "image-resizer",
            "--port",
            "8100",
            "--max-dimension",
            "2048",
            "--no-single-flight",
        ])
        .unwrap();
        assert_eq!(args.port, Some(8100));
        assert_eq!(args.max_dimension, Some(2048));
        assert!(args.no_single_flight);
    }
}
