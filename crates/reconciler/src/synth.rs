//! Configuration synthesis.

use serde_json::json;
use slurmdbd_core::Options;

use crate::error::{Error, Result};
use crate::facts::DatabaseFacts;
use crate::relation::{SLURMDBD_HOSTNAME_KEY, SLURMDBD_PORT_KEY};
use crate::types::{NetworkIdentity, RenderedConfig};

/// Merge identity, options and database facts into one flat configuration.
///
/// Later layers win on key collision: identity, then options, then facts.
/// Performs no readiness checks of its own.
///
/// # Errors
///
/// Returns [`Error::IncompleteFacts`] when `facts` is `None`; no defaults are
/// substituted.
pub fn synthesize(
    identity: &NetworkIdentity,
    options: &Options,
    facts: Option<&DatabaseFacts>,
) -> Result<RenderedConfig> {
    let facts = facts.ok_or(Error::IncompleteFacts)?;

    let mut config = RenderedConfig::new();
    config.insert(SLURMDBD_HOSTNAME_KEY, json!(identity.hostname));
    config.insert(SLURMDBD_PORT_KEY, json!(identity.port));

    for (key, value) in options {
        config.insert(key.clone(), value.clone());
    }

    for (key, value) in facts.config_entries() {
        config.insert(key, value);
    }

    Ok(config)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn identity() -> NetworkIdentity {
        NetworkIdentity::new("slurmdbd-0", 6819)
    }

    fn facts() -> DatabaseFacts {
        DatabaseFacts {
            username: "u".to_string(),
            password: "p".to_string(),
            hostname: "10.0.0.5".to_string(),
            port: 3306,
            database_name: "slurm_acct_db".to_string(),
        }
    }

    #[test]
    fn test_absent_facts_fail() {
        let result = synthesize(&identity(), &Options::new(), None);
        assert!(matches!(result, Err(Error::IncompleteFacts)));
    }

    #[test]
    fn test_merges_all_layers() {
        let mut options = Options::new();
        options.insert("debug_level".to_string(), json!("info"));

        let config = synthesize(&identity(), &options, Some(&facts())).unwrap();

        assert_eq!(config.get("slurmdbd_hostname"), Some(&json!("slurmdbd-0")));
        assert_eq!(config.get("slurmdbd_port"), Some(&json!(6819)));
        assert_eq!(config.get("debug_level"), Some(&json!("info")));
        assert_eq!(config.get("user"), Some(&json!("u")));
        assert_eq!(config.get("host"), Some(&json!("10.0.0.5")));
        assert_eq!(config.get("port"), Some(&json!(3306)));
        assert_eq!(config.get("database"), Some(&json!("slurm_acct_db")));
        assert_eq!(config.len(), 8);
    }

    #[test]
    fn test_options_override_identity() {
        let mut options = Options::new();
        options.insert("slurmdbd_port".to_string(), json!(7000));

        let config = synthesize(&identity(), &options, Some(&facts())).unwrap();
        assert_eq!(config.get("slurmdbd_port"), Some(&json!(7000)));
    }

    #[test]
    fn test_facts_override_options() {
        let mut options = Options::new();
        options.insert("database".to_string(), json!("operator_db"));
        options.insert("host".to_string(), json!("operator-host"));

        let config = synthesize(&identity(), &options, Some(&facts())).unwrap();
        assert_eq!(config.get("database"), Some(&json!("slurm_acct_db")));
        assert_eq!(config.get("host"), Some(&json!("10.0.0.5")));
    }

    #[test]
    fn test_same_inputs_same_output() {
        let mut options = Options::new();
        options.insert("archive_jobs".to_string(), json!(true));

        let first = synthesize(&identity(), &options, Some(&facts())).unwrap();
        let second = synthesize(&identity(), &options, Some(&facts())).unwrap();
        assert_eq!(first, second);
    }

    proptest! {
        #[test]
        fn facts_always_win_on_collision(
            value in "[a-z0-9]{1,12}",
            key in prop::sample::select(vec!["user", "password", "host", "port", "database"]),
        ) {
            let mut options = Options::new();
            options.insert(key.to_string(), json!(value));

            let config = synthesize(&identity(), &options, Some(&facts())).unwrap();
            let expected = facts()
                .config_entries()
                .into_iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v);
            prop_assert_eq!(config.get(key).cloned(), expected);
        }
    }
}
