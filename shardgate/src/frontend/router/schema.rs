//! Router driven by the sharded tables configuration.

use std::collections::BTreeSet;
use std::hash::Hasher;
use std::ops::Range;
use std::sync::Arc;

use fnv::FnvHasher;
use once_cell::sync::Lazy;
use regex::Regex;
use shardgate_config::{Config, ShardedTable};
use tracing::debug;

use super::{Error, Route, ShardResolver};
use crate::backend::{BindVariables, Value};
use crate::frontend::{Session, Target};

static SHARD: Lazy<Regex> = Lazy::new(|| Regex::new(r#"/\*.*?shard: *([0-9]+).*?\*/"#).unwrap());
static MASKED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?s)'(?:[^']|'')*'|/\*.*?\*/|--[^\n]*"#).unwrap());
static TABLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\b(?:from|join|into|update)\s+([A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z_][A-Za-z0-9_]*)?)"#)
        .unwrap()
});
static ALIAS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^\s+(?i:as\s+)?([A-Za-z_][A-Za-z0-9_]*)"#).unwrap());
static CLAUSE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\b(where|on|join|set|values|group|order|having|limit|returning|union)\b"#)
        .unwrap()
});
static EQUALITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)(?:\b([A-Za-z_][A-Za-z0-9_]*)\.)?\b([A-Za-z_][A-Za-z0-9_]*)\s*=\s*(-?[0-9]+\b|'(?:[^']|'')*'|:[A-Za-z_][A-Za-z0-9_]*|\$[0-9]+)"#,
    )
    .unwrap()
});
static DISJUNCTION: Lazy<Regex> = Lazy::new(|| Regex::new(r#"(?i)\bor\b"#).unwrap());
static INSERT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)^\s*insert\s+into\s+\S+\s*\(([^)]*)\)\s*values\s*\(([^)]*)\)\s*;?\s*$"#)
        .unwrap()
});

/// Words the table pattern can pick up in the alias position.
const NOT_ALIAS: &[&str] = &[
    "where", "on", "join", "inner", "left", "right", "full", "outer", "cross", "natural", "set",
    "values", "group", "order", "having", "limit", "returning", "union", "using", "default",
];

/// Replace the contents of string literals and comments with spaces.
///
/// Byte offsets are unchanged, so matches on the masked text
/// can be read back from the original.
fn mask(sql: &str) -> String {
    let mut masked = sql.to_string();
    for literal in MASKED.find_iter(sql) {
        let range = if literal.as_str().starts_with('\'') {
            literal.start() + 1..literal.end() - 1
        } else {
            literal.range()
        };
        let blank = " ".repeat(range.len());
        masked.replace_range(range, &blank);
    }
    masked
}

/// Byte ranges following `WHERE` and `ON`, up to the next clause.
fn predicates(masked: &str) -> Vec<Range<usize>> {
    let clauses: Vec<_> = CLAUSE.find_iter(masked).collect();
    clauses
        .iter()
        .enumerate()
        .filter(|(_, clause)| {
            let keyword = clause.as_str();
            keyword.eq_ignore_ascii_case("where") || keyword.eq_ignore_ascii_case("on")
        })
        .map(|(i, clause)| {
            let end = clauses
                .get(i + 1)
                .map(|next| next.start())
                .unwrap_or(masked.len());
            clause.end()..end
        })
        .collect()
}

/// Table referenced by a statement.
#[derive(Debug, Clone, PartialEq)]
struct TableRef<'a> {
    name: &'a str,
    alias: Option<&'a str>,
}

impl<'a> TableRef<'a> {
    fn all(masked: &'a str) -> Vec<Self> {
        TABLE
            .captures_iter(masked)
            .filter_map(|cap| {
                let table = cap.get(1)?;
                let name = table.as_str();
                let name = name.rsplit('.').next().unwrap_or(name);
                let alias = ALIAS
                    .captures(&masked[table.end()..])
                    .and_then(|alias| alias.get(1))
                    .map(|alias| alias.as_str())
                    .filter(|alias| {
                        !NOT_ALIAS
                            .iter()
                            .any(|keyword| keyword.eq_ignore_ascii_case(alias))
                    });
                Some(Self { name, alias })
            })
            .collect()
    }

    /// Column qualifier refers to this table.
    fn is(&self, qualifier: &str) -> bool {
        self.name.eq_ignore_ascii_case(qualifier)
            || self
                .alias
                .is_some_and(|alias| alias.eq_ignore_ascii_case(qualifier))
    }
}

/// Sharding key value found in a statement.
#[derive(Debug, Clone, PartialEq)]
enum Key {
    Integer(i64),
    Text(String),
}

impl Key {
    fn shard(&self, shards: usize) -> usize {
        match self {
            Self::Integer(value) => value.rem_euclid(shards as i64) as usize,
            Self::Text(value) => {
                let mut hasher = FnvHasher::default();
                hasher.write(value.as_bytes());
                (hasher.finish() % shards as u64) as usize
            }
        }
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Integer(value) => Some(Self::Integer(*value)),
            Value::Text(value) => Some(Self::Text(value.clone())),
            _ => None,
        }
    }
}

/// Routes statements using the sharded tables from the configuration.
///
/// Statements that don't touch a sharded table go to shard 0. Statements
/// that pin the sharding column with an equality go to the shard owning
/// that value. Everything else is sent to all shards.
#[derive(Debug, Clone)]
pub struct SchemaRouter {
    config: Arc<Config>,
}

impl SchemaRouter {
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }

    fn shards(&self) -> usize {
        self.config.general.shards.max(1)
    }

    fn check_shard(&self, shard: usize) -> Result<usize, Error> {
        if shard < self.shards() {
            Ok(shard)
        } else {
            Err(Error::ShardOutOfRange {
                shard,
                shards: self.shards(),
            })
        }
    }

    fn verb(sql: &str) -> String {
        let sql = sql.trim_start();
        let sql = if sql.starts_with("/*") {
            sql.split_once("*/").map(|(_, rest)| rest).unwrap_or("")
        } else {
            sql
        };
        match sql
            .split_whitespace()
            .next()
            .map(|verb| verb.to_lowercase())
            .as_deref()
        {
            Some(verb @ ("select" | "insert" | "update" | "delete")) => verb.to_string(),
            _ => "other".into(),
        }
    }

    fn key(&self, literal: &str, binds: &BindVariables) -> Result<Option<Key>, Error> {
        if let Some(name) = literal.strip_prefix(':').or_else(|| literal.strip_prefix('$')) {
            let value = binds
                .get(name)
                .ok_or_else(|| Error::MissingBind(name.to_string()))?;
            return Ok(Key::from_value(value));
        }

        if let Some(text) = literal.strip_prefix('\'') {
            let text = text.strip_suffix('\'').unwrap_or(text).replace("''", "'");
            return Ok(Some(Key::Text(text)));
        }

        Ok(literal.parse::<i64>().ok().map(Key::Integer))
    }

    /// Shards pinned by equality predicates on sharding columns.
    ///
    /// Only `WHERE` and `ON` conditions are considered. A column must be
    /// unqualified or qualified with a sharded table's name or alias.
    fn where_shards(
        &self,
        sql: &str,
        masked: &str,
        tables: &[TableRef<'_>],
        binds: &BindVariables,
    ) -> Result<BTreeSet<usize>, Error> {
        let mut shards = BTreeSet::new();
        let conditions = predicates(masked);
        let sharded: Vec<(&TableRef<'_>, &ShardedTable)> = tables
            .iter()
            .filter_map(|table| Some((table, self.config.sharded_table(table.name)?)))
            .collect();

        for cap in EQUALITY.captures_iter(masked) {
            let (Some(column), Some(value)) = (cap.get(2), cap.get(3)) else {
                continue;
            };
            if !conditions
                .iter()
                .any(|condition| condition.contains(&column.start()))
            {
                continue;
            }

            let sharding_column = match cap.get(1) {
                Some(qualifier) => sharded.iter().any(|(table, config)| {
                    table.is(qualifier.as_str()) && config.is_sharding_column(column.as_str())
                }),
                None => sharded
                    .iter()
                    .any(|(_, config)| config.is_sharding_column(column.as_str())),
            };
            if !sharding_column {
                continue;
            }

            if let Some(key) = self.key(&sql[value.range()], binds)? {
                shards.insert(key.shard(self.shards()));
            }
        }

        Ok(shards)
    }

    /// Sharding key from a single-row `INSERT ... (cols) VALUES (...)`.
    fn insert_shard(
        &self,
        sql: &str,
        column: &str,
        binds: &BindVariables,
    ) -> Result<Option<usize>, Error> {
        let Some(cap) = INSERT.captures(sql) else {
            return Ok(None);
        };
        let (Some(columns), Some(values)) = (cap.get(1), cap.get(2)) else {
            return Ok(None);
        };

        let position = columns
            .as_str()
            .split(',')
            .position(|c| c.trim().trim_matches('"').eq_ignore_ascii_case(column));
        let value = position.and_then(|p| values.as_str().split(',').nth(p));

        match value {
            Some(value) => Ok(self
                .key(value.trim(), binds)?
                .map(|key| key.shard(self.shards()))),
            None => Ok(None),
        }
    }
}

impl ShardResolver for SchemaRouter {
    fn resolve(
        &self,
        session: &Session,
        sql: &str,
        binds: &BindVariables,
    ) -> Result<Route, Error> {
        if sql.trim().is_empty() {
            return Err(Error::EmptyQuery);
        }

        let target: Target = session.target().parse()?;
        let verb = Self::verb(sql);

        if let Some(shard) = SHARD
            .captures(sql)
            .and_then(|cap| cap.get(1))
            .and_then(|shard| shard.as_str().parse::<usize>().ok())
        {
            return Ok(Route::direct(self.check_shard(shard)?, verb));
        }

        if let Some(shard) = target.shard {
            return Ok(Route::direct(self.check_shard(shard)?, verb));
        }

        let masked = mask(sql);
        let tables = TableRef::all(&masked);
        let sharded: Vec<_> = tables
            .iter()
            .filter_map(|table| self.config.sharded_table(table.name))
            .collect();

        let route = if sharded.is_empty() || self.shards() == 1 {
            Route::direct(0, verb)
        } else {
            let mut shards = if DISJUNCTION.is_match(&masked) {
                BTreeSet::new()
            } else {
                self.where_shards(sql, &masked, &tables, binds)?
            };

            if verb == "insert" && shards.is_empty() {
                if let Some(shard) = self.insert_shard(sql, sharded[0].column.as_str(), binds)? {
                    shards.insert(shard);
                }
            }

            match shards.len() {
                0 if tables.len() > 1 => Route::all(self.shards(), "scatter-join"),
                0 => Route::all(self.shards(), format!("scatter-{}", verb)),
                1 => Route::new(shards.into_iter().collect(), verb),
                _ => Route::new(shards.into_iter().collect(), format!("scatter-{}", verb)),
            }
        };

        debug!("{} [{}]", route, target);

        Ok(route)
    }
}

#[cfg(test)]
mod test {
    use shardgate_stats::PlanKind;

    use super::*;
    use crate::test::test_config;

    fn router() -> SchemaRouter {
        SchemaRouter::new(Arc::new(test_config()))
    }

    fn resolve(sql: &str) -> Route {
        router()
            .resolve(&Session::new("@primary"), sql, &BindVariables::new())
            .unwrap()
    }

    #[test]
    fn test_unsharded_table() {
        let route = resolve("select * from main1");
        assert_eq!(route.shards(), &[0]);
        assert_eq!(route.plan().label, "select");
        assert_eq!(route.kind(), PlanKind::Single);
    }

    #[test]
    fn test_sharded_table_without_key() {
        let route = resolve("select * from user");
        assert_eq!(route.shards(), &[0, 1, 2, 3]);
        assert_eq!(route.plan().label, "scatter-select");
    }

    #[test]
    fn test_sharding_key_equality() {
        let route = resolve("select * from user where Id = 15");
        assert_eq!(route.shards(), &[3]);
        assert_eq!(route.plan().label, "select");

        let route = resolve("select * from user where Id > 15");
        assert!(route.is_cross_shard());
        assert_eq!(route.plan().label, "scatter-select");
    }

    #[test]
    fn test_self_join_scatters() {
        let route = resolve("select * from user as u1 join  user as u2 on u1.Id = u2.Id");
        assert!(route.is_cross_shard());
        assert_eq!(route.plan().label, "scatter-join");
    }

    #[test]
    fn test_disjunction_scatters() {
        let route = resolve("select * from user where id = 1 or id = 2");
        assert_eq!(route.shards().len(), 4);
    }

    #[test]
    fn test_multiple_keys() {
        let route = resolve("select * from user u join user v on u.id = 1 and v.id = 2");
        assert_eq!(route.shards(), &[1, 2]);
        assert_eq!(route.plan().label, "scatter-select");
    }

    #[test]
    fn test_bind_variables() {
        let mut binds = BindVariables::new();
        binds.insert("id".into(), Value::Integer(6));
        let route = router()
            .resolve(
                &Session::new("@primary"),
                "update user set name = 'x' where id = :id",
                &binds,
            )
            .unwrap();
        assert_eq!(route.shards(), &[2]);
        assert_eq!(route.plan().label, "update");

        let err = router()
            .resolve(
                &Session::new("@primary"),
                "delete from user where id = :missing",
                &binds,
            )
            .unwrap_err();
        assert!(matches!(err, Error::MissingBind(name) if name == "missing"));
    }

    #[test]
    fn test_insert() {
        let route = resolve("insert into user (name, id) values ('alice', 5)");
        assert_eq!(route.shards(), &[1]);
        assert_eq!(route.plan().label, "insert");
    }

    #[test]
    fn test_text_key_is_stable() {
        let a = resolve("select * from user where id = 'abc'");
        let b = resolve("select * from user where id = 'abc'");
        assert_eq!(a.shards().len(), 1);
        assert_eq!(a, b);
    }

    #[test]
    fn test_comment_and_target_pin_shard() {
        let route = resolve("/* shard: 2 */ select * from user");
        assert_eq!(route.shards(), &[2]);
        assert_eq!(route.plan().label, "select");

        let route = router()
            .resolve(
                &Session::new("commerce:1@primary"),
                "select * from user",
                &BindVariables::new(),
            )
            .unwrap();
        assert_eq!(route.shards(), &[1]);

        let err = resolve_err("/* shard: 9 */ select 1");
        assert!(matches!(err, Error::ShardOutOfRange { shard: 9, shards: 4 }));
    }

    #[test]
    fn test_bad_input() {
        assert!(matches!(resolve_err("   "), Error::EmptyQuery));
        let err = router()
            .resolve(&Session::new(""), "select 1", &BindVariables::new())
            .unwrap_err();
        assert!(matches!(err, Error::EmptyTarget));
    }

    #[test]
    fn test_update_set_is_not_a_predicate() {
        let route = resolve("update user set id = 7 where name = 'bob'");
        assert_eq!(route.shards(), &[0, 1, 2, 3]);
        assert_eq!(route.plan().label, "scatter-update");

        let route = resolve("update user set id = 7 where id = 6");
        assert_eq!(route.shards(), &[2]);
        assert_eq!(route.plan().label, "update");
    }

    #[test]
    fn test_literals_and_comments_ignored() {
        let route = resolve("select * from user where note like '%id = 5%'");
        assert!(route.is_cross_shard());
        assert_eq!(route.plan().label, "scatter-select");

        let route = resolve("select * from user where name = 'it''s' /* id = 5 */");
        assert_eq!(route.shards().len(), 4);

        let route = resolve("select * from user where note = 'id = 1' and id = 6");
        assert_eq!(route.shards(), &[2]);
    }

    #[test]
    fn test_other_table_column_ignored() {
        let route = resolve("select * from user u join main1 m on m.id = 5");
        assert_eq!(route.shards(), &[0, 1, 2, 3]);
        assert_eq!(route.plan().label, "scatter-join");

        let route = resolve("select * from user join main1 on main1.id = 5");
        assert_eq!(route.shards().len(), 4);

        let route = resolve("select * from user u join main1 m on u.id = 5");
        assert_eq!(route.shards(), &[1]);

        let route = resolve("select * from user join main1 on user.id = 5");
        assert_eq!(route.shards(), &[1]);
    }

    #[test]
    fn test_mask_keeps_offsets() {
        let sql = "select 'a = 1', x -- id = 2\nfrom t /* é */";
        let masked = mask(sql);
        assert_eq!(masked.len(), sql.len());
        assert_eq!(masked, "select '     ', x          \nfrom t         ");
    }

    fn resolve_err(sql: &str) -> Error {
        router()
            .resolve(&Session::new("@primary"), sql, &BindVariables::new())
            .unwrap_err()
    }
}
