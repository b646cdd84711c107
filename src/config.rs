use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};

use crate::state::migration_wizard::{ShellOptions, DEFAULT_BLANK_EGG, DEFAULT_HIDDEN_NESTS};

#[derive(Debug, Clone)]
pub struct Config {
    pub panel_url: String,
    pub api_key: String,
    pub server_uuid: String,
    pub dry_run: bool,
    pub log_file: PathBuf,
    pub shell: ShellOptions,
}

pub fn command() -> Command {
    Command::new("panel-shell")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Terminal client for a game-server panel: schedules and egg migration")
        .arg(
            Arg::new("panel-url")
                .long("panel-url")
                .env("PANEL_URL")
                .required(true)
                .help("Base URL of the panel, e.g. https://panel.example.com"),
        )
        .arg(
            Arg::new("api-key")
                .long("api-key")
                .env("PANEL_API_KEY")
                .hide_env_values(true)
                .required(true)
                .help("Client API key used as bearer token"),
        )
        .arg(
            Arg::new("server")
                .long("server")
                .env("PANEL_SERVER")
                .required(true)
                .help("UUID (or short identifier) of the server to manage"),
        )
        .arg(
            Arg::new("dry-run")
                .long("dry-run")
                .help("Run in dry-run mode (backup, egg change and reinstall are not sent)")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("log-file")
                .long("log-file")
                .env("PANEL_SHELL_LOG")
                .value_parser(clap::value_parser!(PathBuf))
                .help("Where to write logs; the terminal is reserved for the UI"),
        )
        .arg(
            Arg::new("blank-egg")
                .long("blank-egg")
                .default_value(DEFAULT_BLANK_EGG)
                .help("UUID of the placeholder egg new servers start on"),
        )
        .arg(
            Arg::new("hide-nest")
                .long("hide-nest")
                .action(ArgAction::Append)
                .help("Nest name never offered in the wizard (repeatable, default: Pyro)"),
        )
}

impl Config {
    pub fn from_matches(matches: &ArgMatches) -> Result<Self> {
        let required = |name: &str| -> Result<String> {
            matches
                .get_one::<String>(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| anyhow!("--{} must not be empty", name))
        };

        let hidden_nests = match matches.get_many::<String>("hide-nest") {
            Some(values) => values.cloned().collect(),
            None => DEFAULT_HIDDEN_NESTS.iter().map(|s| s.to_string()).collect(),
        };

        Ok(Self {
            panel_url: required("panel-url")?,
            api_key: required("api-key")?,
            server_uuid: required("server")?,
            dry_run: matches.get_flag("dry-run"),
            log_file: matches
                .get_one::<PathBuf>("log-file")
                .cloned()
                .unwrap_or_else(|| std::env::temp_dir().join("panel-shell.log")),
            shell: ShellOptions {
                blank_egg: required("blank-egg")?,
                hidden_nests,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Config> {
        let matches = command().try_get_matches_from(args)?;
        Config::from_matches(&matches)
    }

    #[test]
    fn test_defaults() {
        let config = parse(&[
            "panel-shell",
            "--panel-url",
            "https://panel.example.com",
            "--api-key",
            "ptlc_key",
            "--server",
            "1a2b3c4d",
        ])
        .unwrap();

        assert!(!config.dry_run);
        assert_eq!(config.shell, ShellOptions::default());
        assert!(config.log_file.ends_with("panel-shell.log"));
    }

    #[test]
    fn test_hidden_nests_override_default() {
        let config = parse(&[
            "panel-shell",
            "--panel-url",
            "https://panel.example.com",
            "--api-key",
            "ptlc_key",
            "--server",
            "1a2b3c4d",
            "--hide-nest",
            "Internal",
            "--hide-nest",
            "Voice",
            "--dry-run",
        ])
        .unwrap();

        assert!(config.dry_run);
        assert_eq!(config.shell.hidden_nests, vec!["Internal", "Voice"]);
    }

    #[test]
    fn test_blank_api_key_is_rejected() {
        let err = parse(&[
            "panel-shell",
            "--panel-url",
            "https://panel.example.com",
            "--api-key",
            "  ",
            "--server",
            "1a2b3c4d",
        ])
        .unwrap_err();

        assert!(err.to_string().contains("--api-key"));
    }
}
