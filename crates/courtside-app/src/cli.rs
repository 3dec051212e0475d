//! CLI argument definitions for the Courtside server.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::Parser;
use std::path::PathBuf;

/// Courtside - AI flows for a sports facility booking platform.
#[derive(Parser, Debug)]
#[command(name = "courtside", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// API server port.
    #[arg(short = 'p', long = "port")]
    pub port: Option<u16>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,

    /// Replace the SQLite contents with the demo dataset before serving.
    #[arg(long = "seed-demo-data")]
    pub seed_demo_data: bool,
}

impl CliArgs {
    /// Priority: --config flag > COURTSIDE_CONFIG env var > ~/.courtside/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("COURTSIDE_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Priority: --port flag > COURTSIDE_PORT env var > config file value.
    pub fn resolve_port(&self, config_port: u16) -> u16 {
        self.resolve_port_with(std::env::var("COURTSIDE_PORT").ok(), config_port)
    }

    fn resolve_port_with(&self, env_port: Option<String>, config_port: u16) -> u16 {
        if let Some(p) = self.port {
            return p;
        }
        env_port
            .and_then(|val| val.parse::<u16>().ok())
            .unwrap_or(config_port)
    }

    pub fn resolve_log_level(&self, config_level: &str) -> String {
        self.log_level
            .clone()
            .unwrap_or_else(|| config_level.to_string())
    }
}

fn default_config_path() -> PathBuf {
    home_dir()
        .map(|home| home.join(".courtside").join("config.toml"))
        .unwrap_or_else(|| PathBuf::from("config.toml"))
}

fn home_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    let home = std::env::var("USERPROFILE");
    #[cfg(not(target_os = "windows"))]
    let home = std::env::var("HOME");
    home.ok().map(PathBuf::from)
}

/// Expand a leading `~` to the home directory.
pub fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/").or_else(|| path.strip_prefix("~\\")), home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flags() {
        let args = CliArgs::try_parse_from([
            "courtside",
            "--config",
            "/etc/courtside.toml",
            "-p",
            "8080",
            "--log-level",
            "debug",
            "--seed-demo-data",
        ])
        .unwrap();
        assert_eq!(args.resolve_config_path(), PathBuf::from("/etc/courtside.toml"));
        assert_eq!(args.resolve_port_with(Some("9000".into()), 3040), 8080);
        assert_eq!(args.resolve_log_level("info"), "debug");
        assert!(args.seed_demo_data);
    }

    #[test]
    fn test_port_falls_back_to_env_then_config() {
        let args = CliArgs::try_parse_from(["courtside"]).unwrap();
        assert_eq!(args.resolve_port_with(Some("9000".into()), 3040), 9000);
        assert_eq!(args.resolve_port_with(Some("not-a-port".into()), 3040), 3040);
        assert_eq!(args.resolve_port_with(None, 3040), 3040);
        assert_eq!(args.resolve_log_level("warn"), "warn");
        assert!(!args.seed_demo_data);
    }

    #[test]
    fn test_expand_home_leaves_absolute_paths() {
        assert_eq!(expand_home("/var/lib/courtside.db"), PathBuf::from("/var/lib/courtside.db"));
        let expanded = expand_home("~/.courtside/courtside.db");
        assert!(expanded.ends_with(".courtside/courtside.db"));
    }
}
