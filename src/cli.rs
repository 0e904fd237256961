//! CLI definitions for followloop.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// followloop CLI.
#[derive(Parser)]
#[command(name = "followloop")]
#[command(about = "Persisted follow/unfollow automation driven through a browser tab")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path (default: ~/.followloop/config.toml)
    #[arg(short, long, global = true, env = "FOLLOWLOOP_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Host the agent on a browser tab until interrupted
    Run {
        /// CDP target id of the tab (default: first tab on the site)
        #[arg(long)]
        page: Option<String>,

        /// Start a run once the tab is ready
        #[arg(long)]
        start: bool,
    },

    /// Same as `run --start`
    Start {
        #[arg(long)]
        page: Option<String>,
    },

    /// Stop the current run
    Stop,

    /// Show run status
    Status {
        /// Refresh every SECS seconds until interrupted
        #[arg(long, value_name = "SECS")]
        watch: Option<u64>,
    },

    /// Manage the follow queue
    Queue {
        #[command(subcommand)]
        action: QueueAction,
    },

    /// Show follow history
    History {
        /// Only follows that have not been undone
        #[arg(long)]
        active: bool,
    },

    /// Extract profiles from the list page open in the tab
    Extract {
        #[arg(long)]
        page: Option<String>,

        #[arg(long, default_value_t = 50)]
        max_scrolls: u32,
    },

    /// Manage agent settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },

    /// Show follow activity metrics
    Metrics,

    /// Show the recent error log
    Errors,

    /// Follow, re-check and unfollow one account end to end
    Test {
        /// Account to test against
        target: String,

        #[arg(long)]
        page: Option<String>,

        /// Seconds to wait between follow and re-check
        #[arg(long, default_value_t = 5)]
        wait: u64,
    },

    /// Report the tab's URL and script readiness
    Diagnose {
        #[arg(long)]
        page: Option<String>,
    },

    /// Create missing store entries and reset the run state
    Init,
}

#[derive(Subcommand)]
pub(crate) enum QueueAction {
    /// List queued accounts
    List,

    /// Queue accounts by handle
    Add {
        #[arg(required = true)]
        usernames: Vec<String>,
    },

    /// Remove one account from the queue
    Remove { username: String },

    /// Empty the queue
    Clear,
}

#[derive(Subcommand)]
pub(crate) enum SettingsAction {
    /// Print current settings
    Show,

    /// Set one setting, e.g. `set dailyFollowLimit 100`
    Set { key: String, value: String },

    /// Restore the configured defaults
    Reset,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_queue_add() {
        let cli = Cli::parse_from(["followloop", "queue", "add", "alice", "@bob"]);
        match cli.command {
            Commands::Queue {
                action: QueueAction::Add { usernames },
            } => assert_eq!(usernames, vec!["alice", "@bob"]),
            _ => panic!("expected queue add"),
        }
    }

    #[test]
    fn test_parse_global_config_and_watch() {
        let cli = Cli::parse_from(["followloop", "status", "--watch", "5", "--config", "/tmp/f.toml"]);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/f.toml")));
        assert!(matches!(cli.command, Commands::Status { watch: Some(5) }));
    }
}
