//! CLI argument definitions using clap
//!
//! Commands:
//! - matapi serve --config <path>
//! - matapi indexes --config <path>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// matapi - REST query service for materials metadata
#[derive(Parser, Debug)]
#[command(name = "matapi")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Start the HTTP server
    Serve {
        /// Path to configuration file
        #[arg(long, default_value = "./matapi.json")]
        config: PathBuf,
    },

    /// Print the indexes every resource relies on, as JSON
    Indexes {
        /// Path to configuration file
        #[arg(long, default_value = "./matapi.json")]
        config: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_path() {
        let cli = Cli::try_parse_from(["matapi", "serve"]).unwrap();
        assert_eq!(
            cli.command,
            Command::Serve {
                config: PathBuf::from("./matapi.json")
            }
        );
    }

    #[test]
    fn test_explicit_config_path() {
        let cli = Cli::try_parse_from(["matapi", "indexes", "--config", "/etc/matapi.json"]).unwrap();
        assert_eq!(
            cli.command,
            Command::Indexes {
                config: PathBuf::from("/etc/matapi.json")
            }
        );
    }

    #[test]
    fn test_unknown_command() {
        assert!(Cli::try_parse_from(["matapi", "migrate"]).is_err());
    }
}
