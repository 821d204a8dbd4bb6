//! CLI surface — a minimal `serve`/`doctor`/`config`/`version` set, the
//! slice of the teacher's much larger `Cli`/`Command` tree that's needed
//! to run this server (no chat/import/systemd subcommands here — out of
//! scope per SPEC_FULL.md's Non-goals).

use clap::{Parser, Subcommand};

use rlreg_domain::config::{Config, ConfigSeverity};

#[derive(Debug, Parser)]
#[command(name = "rlreg-server", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the gateway server (default when no subcommand is given).
    Serve,
    /// Validate the configuration and environment without starting.
    Doctor,
    /// Configuration utilities.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Print version information.
    Version,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Parse the config file and report any errors.
    Validate,
    /// Dump the resolved configuration (with defaults) as TOML.
    Show,
}

/// Load config from `RLREG_CONFIG` (default `config.toml`), falling back
/// to defaults if the file doesn't exist.
pub fn load_config() -> anyhow::Result<(Config, String)> {
    let config_path = std::env::var("RLREG_CONFIG").unwrap_or_else(|_| "config.toml".into());

    let config = if std::path::Path::new(&config_path).exists() {
        let raw = std::fs::read_to_string(&config_path)
            .map_err(|e| anyhow::anyhow!("reading {config_path}: {e}"))?;
        toml::from_str(&raw).map_err(|e| anyhow::anyhow!("parsing {config_path}: {e}"))?
    } else {
        Config::default()
    };

    Ok((config, config_path))
}

/// Parse and validate the config, printing any issues. Returns whether
/// the config is good enough to run on (no `Error`-severity issues).
pub fn validate_config(config: &Config, config_path: &str) -> bool {
    let issues = config.validate();

    if issues.is_empty() {
        println!("Config OK ({config_path})");
        return true;
    }

    let error_count = issues.iter().filter(|i| i.severity == ConfigSeverity::Error).count();
    let warning_count = issues.len() - error_count;

    for issue in &issues {
        println!("{issue}");
    }

    println!("\n{error_count} error(s), {warning_count} warning(s) in {config_path}");
    error_count == 0
}

pub fn show_config(config: &Config) {
    match toml::to_string_pretty(config) {
        Ok(output) => print!("{output}"),
        Err(e) => {
            eprintln!("failed to serialize config: {e}");
            std::process::exit(1);
        }
    }
}
