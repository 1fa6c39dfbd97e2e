use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "hookwarden", version, about = "Policy hook for AI coding assistants")]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Debug logging plus a detailed report on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Evaluation deadline in milliseconds (overrides the config file)
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check a proposed action read from stdin
    PreToolUse,
    /// Follow up on a completed action read from stdin
    PostToolUse,
    /// Handle the end of a session
    Stop,
    /// Inspect or create the configuration
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Print version information
    Version,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the effective configuration
    Show,
    /// Check the configuration and compile every pattern
    Validate,
    /// Write the built-in default configuration
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["hookwarden", "pre-tool-use", "--timeout", "50", "-v"])
            .unwrap();
        assert!(matches!(cli.command, Command::PreToolUse));
        assert_eq!(cli.timeout, Some(50));
        assert!(cli.verbose);
    }

    #[test]
    fn test_config_init_force() {
        let cli = Cli::try_parse_from(["hookwarden", "config", "init", "--force"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Config(ConfigCommand::Init { force: true })
        ));
    }
}
