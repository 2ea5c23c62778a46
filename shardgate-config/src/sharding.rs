use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Sharded table.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default, JsonSchema)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct ShardedTable {
    /// Table name, matched case-insensitively.
    pub name: String,
    /// Table sharded on this column.
    pub column: String,
}

impl ShardedTable {
    pub fn new(name: impl ToString, column: impl ToString) -> Self {
        Self {
            name: name.to_string(),
            column: column.to_string(),
        }
    }

    /// Does this entry describe the given table?
    pub fn matches(&self, table: &str) -> bool {
        self.name.eq_ignore_ascii_case(table)
    }

    /// Is this the sharding column?
    pub fn is_sharding_column(&self, column: &str) -> bool {
        self.column.eq_ignore_ascii_case(column)
    }
}
