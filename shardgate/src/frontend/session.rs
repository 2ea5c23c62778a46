//! Client session.

use std::fmt::Display;
use std::str::FromStr;

use super::router::Error;

/// Request-scoped client state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    /// Routing target, e.g. `commerce@primary`.
    target: String,
    /// Client has an open transaction.
    in_transaction: bool,
}

impl Session {
    pub fn new(target: impl ToString) -> Self {
        Self {
            target: target.to_string(),
            in_transaction: false,
        }
    }

    /// Routing target string.
    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn set_target(&mut self, target: impl ToString) {
        self.target = target.to_string();
    }

    pub fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    pub fn begin(&mut self) {
        self.in_transaction = true;
    }

    pub fn finish(&mut self) {
        self.in_transaction = false;
    }
}

/// Parsed target string.
///
/// Format is `[keyspace][:shard][@role]`, all parts optional, but the
/// string itself can't be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Target {
    pub keyspace: Option<String>,
    pub shard: Option<usize>,
    pub role: Option<String>,
}

impl FromStr for Target {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::EmptyTarget);
        }

        let (destination, role) = match s.split_once('@') {
            Some((destination, role)) => (destination, Some(role)),
            None => (s, None),
        };

        let (keyspace, shard) = match destination.split_once(':') {
            Some((keyspace, shard)) => {
                let shard = shard
                    .parse::<usize>()
                    .map_err(|_| Error::Target(s.to_string()))?;
                (keyspace, Some(shard))
            }
            None => (destination, None),
        };

        let role = match role {
            Some(role) if role.is_empty() => return Err(Error::Target(s.to_string())),
            Some(role) => Some(role.to_lowercase()),
            None => None,
        };

        Ok(Self {
            keyspace: if keyspace.is_empty() {
                None
            } else {
                Some(keyspace.to_string())
            },
            shard,
            role,
        })
    }
}

impl Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(ref keyspace) = self.keyspace {
            write!(f, "{}", keyspace)?;
        }
        if let Some(shard) = self.shard {
            write!(f, ":{}", shard)?;
        }
        if let Some(ref role) = self.role {
            write!(f, "@{}", role)?;
        }
        Ok(())
    }
}
