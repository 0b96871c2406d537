//! Command-line surface.
//!
//! Human-readable output goes to stderr. Stdout carries only shell
//! `unset`/`export` lines, so a wrapper function can `eval` it.

pub mod commands;
pub mod hook;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config::paths::{HOME_ENV, SETTINGS_ENV};

/// Set by the shell hook so commands know which shell invoked them.
pub const SHELL_PID_ENV: &str = "APIMGR_SHELL_PID";

#[derive(Debug, Parser)]
#[command(
    name = "apimgr",
    version,
    about = "Manage named API credential profiles and activate them globally or per shell"
)]
pub struct Cli {
    /// Directory holding config.json, active.env and session markers.
    #[arg(long, global = true, env = HOME_ENV, value_name = "DIR")]
    pub config_dir: Option<PathBuf>,

    /// Claude settings.json to mirror the active configuration into.
    #[arg(long, global = true, env = SETTINGS_ENV, value_name = "FILE")]
    pub settings_file: Option<PathBuf>,

    /// Pid of the invoking shell (defaults to the parent process).
    #[arg(long, global = true, env = SHELL_PID_ENV, value_name = "PID")]
    pub pid: Option<u32>,

    /// Enable debug logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Activate a configuration globally, or for this shell with --local.
    Switch {
        alias: String,
        /// Only affect the current shell session.
        #[arg(long)]
        local: bool,
        /// Model to use with this configuration.
        #[arg(long)]
        model: Option<String>,
    },
    /// Add a configuration.
    Add {
        alias: String,
        #[command(flatten)]
        fields: FieldArgs,
    },
    /// Change fields of a configuration. An empty value clears a field.
    Edit {
        alias: String,
        #[command(flatten)]
        fields: FieldArgs,
        /// New alias.
        #[arg(long, value_name = "ALIAS")]
        rename: Option<String>,
    },
    /// Delete a configuration.
    #[command(alias = "rm")]
    Remove { alias: String },
    /// List configurations.
    #[command(alias = "ls")]
    List,
    /// Show global, shell and environment state.
    Status,
    /// Print the global activation script (used at shell startup).
    LoadActive,
    /// Forget a shell's local override (used by the shell exit hook).
    CleanupSession {
        #[arg(value_name = "PID")]
        session_pid: u32,
    },
    /// Rewrite active.env and the settings file from the global configuration.
    Sync,
    /// Replace the supported-model list. No models clears the list.
    Models {
        alias: String,
        #[arg(value_delimiter = ',', num_args = 0..)]
        models: Vec<String>,
    },
    /// Select the active model of a configuration.
    Model { alias: String, model: String },
    /// Print the shell integration snippet.
    Init {
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Fields shared by `add` and `edit`.
#[derive(Debug, Clone, Default, Args)]
pub struct FieldArgs {
    #[arg(long)]
    pub provider: Option<String>,
    #[arg(long)]
    pub api_key: Option<String>,
    #[arg(long)]
    pub auth_token: Option<String>,
    #[arg(long)]
    pub base_url: Option<String>,
    #[arg(long)]
    pub model: Option<String>,
    /// Comma-separated supported models.
    #[arg(long, value_delimiter = ',')]
    pub models: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_local_switch_with_model() {
        let cli = Cli::try_parse_from([
            "apimgr", "switch", "work", "--local", "--model", "m2", "--pid", "99",
        ])
        .unwrap();
        assert_eq!(cli.pid, Some(99));
        match cli.command {
            Command::Switch {
                alias,
                local,
                model,
            } => {
                assert_eq!(alias, "work");
                assert!(local);
                assert_eq!(model.as_deref(), Some("m2"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_models_list() {
        let cli = Cli::try_parse_from(["apimgr", "add", "a", "--api-key", "k", "--models", "m1,m2"])
            .unwrap();
        match cli.command {
            Command::Add { fields, .. } => {
                assert_eq!(
                    fields.models,
                    Some(vec!["m1".to_string(), "m2".to_string()])
                );
            }
            other => panic!("unexpected command: {other:?}"),
        }

        let cli = Cli::try_parse_from(["apimgr", "models", "a"]).unwrap();
        assert!(matches!(cli.command, Command::Models { models, .. } if models.is_empty()));
    }
}
