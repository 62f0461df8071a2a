//! Filter descriptors and find options.

use super::QueryError;
use crate::statement::QueryOptions;
use colonnade_types::Value;
use std::fmt;

/// Comparison operators accepted in a filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    In,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl Operator {
    /// Parse a `$`-prefixed filter operator.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "$eq" => Some(Self::Eq),
            "$in" => Some(Self::In),
            "$gt" => Some(Self::Gt),
            "$gte" => Some(Self::Gte),
            "$lt" => Some(Self::Lt),
            "$lte" => Some(Self::Lte),
            _ => None,
        }
    }

    pub fn as_cql(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::In => "IN",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_cql())
    }
}

/// One `field <op> value` term.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub field: String,
    pub op: Operator,
    /// For [`Operator::In`] this is always a `Value::List`
    pub value: Value,
}

/// Ordered conjunction of conditions.
///
/// Terms compile in the order they were added, which is also the order the
/// parameters bind in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<Condition>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn condition(mut self, field: impl Into<String>, op: Operator, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition {
            field: field.into(),
            op,
            value: value.into(),
        });
        self
    }

    pub fn eq(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.condition(field, Operator::Eq, value)
    }

    pub fn in_list<I, V>(self, field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let list = Value::List(values.into_iter().map(Into::into).collect());
        self.condition(field, Operator::In, list)
    }

    pub fn gt(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.condition(field, Operator::Gt, value)
    }

    pub fn gte(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.condition(field, Operator::Gte, value)
    }

    pub fn lt(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.condition(field, Operator::Lt, value)
    }

    pub fn lte(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.condition(field, Operator::Lte, value)
    }

    /// Parse `{"field": literal}` or `{"field": {"$op": value, ...}}`.
    ///
    /// An object value is an operator set only when every key starts with `$`.
    pub fn from_json(json: &serde_json::Value) -> Result<Self, QueryError> {
        let object = match json {
            serde_json::Value::Null => return Ok(Self::default()),
            serde_json::Value::Object(object) => object,
            other => {
                return Err(QueryError::InvalidFilter(format!(
                    "expected an object, got {}",
                    other
                )))
            }
        };

        let mut filter = Self::new();
        for (field, raw) in object {
            match raw {
                serde_json::Value::Object(ops)
                    if !ops.is_empty() && ops.keys().all(|k| k.starts_with('$')) =>
                {
                    for (key, operand) in ops {
                        let op = Operator::parse(key)
                            .ok_or_else(|| QueryError::UnknownOperator(key.clone()))?;
                        if op == Operator::In && !operand.is_array() {
                            return Err(QueryError::InvalidFilter(format!(
                                "$in on '{}' expects an array",
                                field
                            )));
                        }
                        filter = filter.condition(field.clone(), op, Value::from_json(operand));
                    }
                }
                literal => {
                    filter = filter.eq(field.clone(), Value::from_json(literal));
                }
            }
        }
        Ok(filter)
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_cql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Projection, ordering and paging for a select.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    /// Columns to return; `None` selects every column
    pub projection: Option<Vec<String>>,
    pub order_by: Vec<(String, SortOrder)>,
    pub limit: Option<u32>,
    pub allow_filtering: bool,
    pub query: QueryOptions,
}

impl FindOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.projection = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.order_by.push((field.into(), order));
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn allow_filtering(mut self) -> Self {
        self.allow_filtering = true;
        self
    }

    pub fn with_options(mut self, options: QueryOptions) -> Self {
        self.query = options;
        self
    }
}
