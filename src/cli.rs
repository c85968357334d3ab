//! CLI command definitions using clap.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use slurmdbd_events::RelationData;

/// Default operator configuration path.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/slurmdbd-operator/config.toml";

/// slurmdbd operator
#[derive(Parser, Debug)]
#[command(name = "slurmdbd-operator")]
#[command(version)]
#[command(about = "Installs, configures and restarts slurmdbd in response to unit events")]
#[command(
    long_about = "Each invocation delivers one unit event. Events that cannot be handled yet are kept in the state file and redelivered after the next event."
)]
pub struct Cli {
    /// Operator configuration file (missing file means built-in defaults)
    #[arg(
        short,
        long,
        global = true,
        env = "SLURMDBD_OPERATOR_CONFIG",
        default_value = DEFAULT_CONFIG_PATH
    )]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Install the slurmdbd package
    Install,

    /// The unit started
    Start,

    /// Operator options changed; re-render if possible
    ConfigChanged,

    /// Database credentials arrived on the database relation
    DatabaseAvailable {
        /// Relation data as a JSON object (user, password, host, port, database)
        #[arg(short, long, value_parser = parse_relation_data)]
        payload: RelationData,
    },

    /// A consumer joined the slurmdbd relation; advertise our address
    SlurmdbdJoined,

    /// Show unit status, observed state and pending events
    Status,
}

fn parse_relation_data(raw: &str) -> Result<RelationData, String> {
    serde_json::from_str(raw).map_err(|e| format!("payload must be a JSON object: {e}"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_database_available() {
        let cli = Cli::try_parse_from([
            "slurmdbd-operator",
            "database-available",
            "--payload",
            r#"{"user":"u","port":3306}"#,
        ])
        .unwrap();

        assert!(matches!(
            cli.command,
            Commands::DatabaseAvailable { ref payload }
                if payload.get("user") == Some(&json!("u"))
                    && payload.get("port") == Some(&json!(3306))
        ));
    }

    #[test]
    fn test_payload_must_be_object() {
        let result = Cli::try_parse_from([
            "slurmdbd-operator",
            "database-available",
            "--payload",
            "[1, 2]",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_config_flag_after_subcommand() {
        let cli =
            Cli::try_parse_from(["slurmdbd-operator", "status", "--config", "/tmp/op.toml"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("/tmp/op.toml"));
        assert!(matches!(cli.command, Commands::Status));
    }

    #[test]
    fn test_kebab_case_commands() {
        for (arg, expected) in [
            ("config-changed", "ConfigChanged"),
            ("slurmdbd-joined", "SlurmdbdJoined"),
        ] {
            let cli = Cli::try_parse_from(["slurmdbd-operator", arg]).unwrap();
            assert_eq!(format!("{:?}", cli.command), expected);
        }
    }
}
