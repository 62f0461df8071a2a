//! Compiled statements and per-statement options.

use colonnade_types::WireValue;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

// ============================================================================
// Consistency
// ============================================================================

/// CQL consistency level, carried as its protocol number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Consistency {
    Any = 0,
    One = 1,
    Two = 2,
    Three = 3,
    Quorum = 4,
    All = 5,
    LocalQuorum = 6,
    EachQuorum = 7,
    Serial = 8,
    LocalSerial = 9,
    LocalOne = 10,
}

impl Consistency {
    pub fn level(&self) -> u8 {
        *self as u8
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Any => "any",
            Self::One => "one",
            Self::Two => "two",
            Self::Three => "three",
            Self::Quorum => "quorum",
            Self::All => "all",
            Self::LocalQuorum => "local_quorum",
            Self::EachQuorum => "each_quorum",
            Self::Serial => "serial",
            Self::LocalSerial => "local_serial",
            Self::LocalOne => "local_one",
        }
    }
}

impl TryFrom<u8> for Consistency {
    type Error = String;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        Ok(match level {
            0 => Self::Any,
            1 => Self::One,
            2 => Self::Two,
            3 => Self::Three,
            4 => Self::Quorum,
            5 => Self::All,
            6 => Self::LocalQuorum,
            7 => Self::EachQuorum,
            8 => Self::Serial,
            9 => Self::LocalSerial,
            10 => Self::LocalOne,
            other => return Err(format!("Unknown consistency level: {}", other)),
        })
    }
}

impl FromStr for Consistency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        Ok(match normalized.as_str() {
            "any" => Self::Any,
            "one" => Self::One,
            "two" => Self::Two,
            "three" => Self::Three,
            "quorum" => Self::Quorum,
            "all" => Self::All,
            "local_quorum" | "localquorum" => Self::LocalQuorum,
            "each_quorum" | "eachquorum" => Self::EachQuorum,
            "serial" => Self::Serial,
            "local_serial" | "localserial" => Self::LocalSerial,
            "local_one" | "localone" => Self::LocalOne,
            _ => return Err(format!("Unknown consistency level: {}", s)),
        })
    }
}

impl fmt::Display for Consistency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Consistency {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u8(self.level())
    }
}

/// Accepts the protocol number (`6`) or the level name (`"local_quorum"`).
#[derive(Deserialize)]
#[serde(untagged)]
enum ConsistencyRepr {
    Level(u8),
    Name(String),
}

impl<'de> Deserialize<'de> for Consistency {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match ConsistencyRepr::deserialize(deserializer)? {
            ConsistencyRepr::Level(level) => Consistency::try_from(level).map_err(de::Error::custom),
            ConsistencyRepr::Name(name) => name.parse().map_err(de::Error::custom),
        }
    }
}

// ============================================================================
// QueryOptions
// ============================================================================

/// Options attached to a single statement.
///
/// Deserializes from camelCase JSON (`{"ttl": 60, "ifNotExists": true}`);
/// unrecognised keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueryOptions {
    pub consistency: Option<Consistency>,

    /// Seconds to live. Insert and update only
    pub ttl: Option<u32>,

    /// Lightweight transaction. Insert only
    pub if_not_exists: bool,

    /// Log the statement at debug level
    pub debug: bool,

    /// Log the statement in multi-line form
    pub pretty_debug: bool,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &serde_json::Value) -> Result<Self, serde_json::Error> {
        if json.is_null() {
            return Ok(Self::default());
        }
        serde_json::from_value(json.clone())
    }

    pub fn consistency(mut self, consistency: Consistency) -> Self {
        self.consistency = Some(consistency);
        self
    }

    pub fn ttl(mut self, seconds: u32) -> Self {
        self.ttl = Some(seconds);
        self
    }

    pub fn if_not_exists(mut self) -> Self {
        self.if_not_exists = true;
        self
    }

    pub fn debug(mut self) -> Self {
        self.debug = true;
        self
    }

    pub fn pretty_debug(mut self) -> Self {
        self.pretty_debug = true;
        self
    }
}

// ============================================================================
// Statement
// ============================================================================

/// What a statement does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
    CreateTable,
    AlterTable,
    CreateIndex,
    /// Nothing to send. Produced for updates with no modified fields
    Noop,
}

impl StatementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Select => "SELECT",
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::CreateTable => "CREATE TABLE",
            Self::AlterTable => "ALTER TABLE",
            Self::CreateIndex => "CREATE INDEX",
            Self::Noop => "NOOP",
        }
    }

    pub fn is_ddl(&self) -> bool {
        matches!(self, Self::CreateTable | Self::AlterTable | Self::CreateIndex)
    }

    pub fn is_write(&self) -> bool {
        matches!(self, Self::Insert | Self::Update | Self::Delete)
    }
}

/// A parameterized statement ready for the driver.
///
/// `params` binds by position: its length always equals the number of `?`
/// placeholders in `query`.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    kind: StatementKind,
    table: String,
    query: String,
    params: Vec<WireValue>,
    options: QueryOptions,
}

impl Statement {
    pub fn new(
        kind: StatementKind,
        table: impl Into<String>,
        query: impl Into<String>,
        params: Vec<WireValue>,
    ) -> Self {
        Self {
            kind,
            table: table.into(),
            query: query.into(),
            params,
            options: QueryOptions::default(),
        }
    }

    pub fn noop(table: impl Into<String>) -> Self {
        Self::new(StatementKind::Noop, table, String::new(), Vec::new())
    }

    pub fn with_options(mut self, options: QueryOptions) -> Self {
        self.options = options;
        self
    }

    pub fn kind(&self) -> StatementKind {
        self.kind
    }

    pub fn is_noop(&self) -> bool {
        self.kind == StatementKind::Noop
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn params(&self) -> &[WireValue] {
        &self.params
    }

    pub fn options(&self) -> &QueryOptions {
        &self.options
    }

    pub(crate) fn options_mut(&mut self) -> &mut QueryOptions {
        &mut self.options
    }

    /// Query text with every placeholder replaced by its literal.
    pub fn inline(&self) -> String {
        let mut out = String::with_capacity(self.query.len() + self.params.len() * 8);
        let mut params = self.params.iter().peekable();
        for ch in self.query.chars() {
            match (ch, params.next_if(|_| ch == '?')) {
                (_, Some(param)) => out.push_str(&param.to_string()),
                (c, None) => out.push(c),
            }
        }
        out
    }

    /// Inlined query broken onto one line per clause.
    pub fn pretty(&self) -> String {
        const BREAKS: &[&str] = &[
            " VALUES ",
            " SET ",
            " WHERE ",
            " AND ",
            " ORDER BY ",
            " LIMIT ",
            " ALLOW FILTERING",
            " IF NOT EXISTS",
            " USING TTL ",
        ];
        let mut text = self.inline();
        for keyword in BREAKS {
            let replacement = format!("\n  {}", keyword.trim_start());
            text = text.replace(keyword, &replacement);
        }
        text
    }

    /// Emit the statement at debug level when the options ask for it.
    pub(crate) fn log_debug(&self) {
        if self.options.pretty_debug {
            debug!(table = %self.table, "cql statement:\n{}", self.pretty());
        } else if self.options.debug {
            debug!(table = %self.table, params = self.params.len(), "cql statement: {}", self.inline());
        }
    }
}
