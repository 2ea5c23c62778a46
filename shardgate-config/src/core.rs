use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fs::read_to_string;
use std::io::ErrorKind;
use std::path::Path;
use std::str::FromStr;
use tracing::{info, warn};

use super::error::Error;
use super::general::General;
use super::sharding::ShardedTable;

/// shardgate.toml
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: General,

    /// Tables distributed across shards.
    #[serde(default)]
    pub sharded_tables: Vec<ShardedTable>,
}

impl Config {
    /// Load configuration from disk or use defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let config = match read_to_string(path) {
            Ok(source) => {
                let config: Config = source.parse()?;
                info!("loaded \"{}\"", path.display());
                config
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                warn!(
                    "\"{}\" doesn't exist, loading defaults instead",
                    path.display()
                );
                Config::default()
            }
            Err(err) => return Err(err.into()),
        };

        config.check()?;

        if !config.sharded_tables.is_empty() {
            info!(
                "{} sharded table(s) across {} shard(s)",
                config.sharded_tables.len(),
                config.general.shards
            );
        }

        Ok(config)
    }

    /// Validate settings that serde can't.
    pub fn check(&self) -> Result<(), Error> {
        if self.general.shards == 0 {
            return Err(Error::Validation("shards must be at least 1".into()));
        }

        for table in &self.sharded_tables {
            if table.name.trim().is_empty() {
                return Err(Error::Validation("sharded table name is empty".into()));
            }
            if table.column.trim().is_empty() {
                return Err(Error::Validation(format!(
                    "sharded table \"{}\" has no sharding column",
                    table.name
                )));
            }
        }

        Ok(())
    }

    /// Find the sharding configuration for a table.
    pub fn sharded_table(&self, name: &str) -> Option<&ShardedTable> {
        self.sharded_tables.iter().find(|t| t.matches(name))
    }
}

impl FromStr for Config {
    type Err = Error;

    fn from_str(source: &str) -> Result<Self, Self::Err> {
        toml::from_str(source).map_err(|err| Error::config(source, err))
    }
}

#[cfg(test)]
mod test {
    use std::io::Write;

    use super::*;
    use crate::LogFormat;

    #[test]
    fn test_parse_config() {
        let source = r#"
[general]
shards = 4
query_timeout = 1500
log_format = "json"
stats_port = 9930

[[sharded_tables]]
name = "user"
column = "id"
"#;
        let config: Config = source.parse().unwrap();
        assert_eq!(config.general.shards, 4);
        assert_eq!(
            config.general.query_timeout(),
            Some(std::time::Duration::from_millis(1500))
        );
        assert_eq!(config.general.log_format, LogFormat::Json);
        assert_eq!(config.general.stats_port, Some(9930));
        assert!(config.general.scatter_stats);
        assert_eq!(config.sharded_table("USER").unwrap().column, "id");
        assert!(config.sharded_table("main1").is_none());
        config.check().unwrap();
    }

    #[test]
    fn test_defaults() {
        let config: Config = "".parse().unwrap();
        assert_eq!(config.general.default_target, "@primary");
        assert_eq!(config.general.query_timeout(), None);
        assert!(config.sharded_tables.is_empty());
    }

    #[test]
    fn test_unknown_field_points_at_line() {
        let source = "[general]\nshards = 2\nshardz = 3\n";
        let err = source.parse::<Config>().unwrap_err();
        match err {
            Error::Config { line, snippet, .. } => {
                assert_eq!(line, 3);
                assert_eq!(snippet, "shardz = 3");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_check_rejects_zero_shards() {
        let config: Config = "[general]\nshards = 0\n".parse().unwrap();
        assert!(matches!(config.check(), Err(Error::Validation(_))));
    }

    #[test]
    fn test_check_rejects_missing_column() {
        let mut config = Config::default();
        config.sharded_tables.push(ShardedTable::new("user", ""));
        assert!(matches!(config.check(), Err(Error::Validation(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[general]\nshards = 2\n\n[[sharded_tables]]\nname = \"orders\"\ncolumn = \"customer_id\""
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.general.shards, 2);
        assert_eq!(config.sharded_tables[0].name, "orders");
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path().join("shardgate.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_unreadable_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(dir.path()).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
