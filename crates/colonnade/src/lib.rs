//! Colonnade: schema-driven models and CQL statement generation.
//!
//! Declare a [`Schema`], register it with a [`Context`] to get a [`Model`],
//! then create, find, save and remove [`Document`]s. Statements are compiled
//! by the [`QueryBuilder`] and executed through a [`Driver`] supplied by the
//! application. [`Context::sync`] creates missing tables, columns and
//! indexes without ever dropping anything.
//!
//! ```ignore
//! let ctx = Context::new(driver);
//! let dogs = ctx.register(
//!     "Dogs",
//!     Schema::builder()
//!         .field("dog_id", FieldDefinition::new(ColumnType::Int).primary())
//!         .field("breed", ColumnType::Text)
//!         .build()?,
//! )?;
//! ctx.sync().await;
//!
//! let mut rex = dogs.create([("dog_id", Value::from(1)), ("breed", Value::from("lab"))])?;
//! rex.save(&QueryOptions::default()).await?;
//! ```

pub mod config;
pub mod context;
pub mod driver;
pub mod error;
pub mod identifier;
pub mod model;
pub mod query;
pub mod schema;
pub mod statement;
pub mod sync;

pub use config::{ColonnadeConfig, ConfigError, SyncConfig};
pub use context::Context;
pub use driver::{
    BatchSummary, ColumnMetadata, Driver, DriverError, ResultSet, Row, TableMetadata,
};
pub use error::{ModelError, ValidationError};
pub use model::{Document, Model, TrackedList, TrackedMap};
pub use query::{Filter, FindOptions, InsertMode, Operator, QueryBuilder, QueryError, SortOrder};
pub use schema::{
    FieldDefinition, FieldSpec, HookError, HookEvent, PluginRegistry, PrimaryKey, QueryEntry,
    Schema, SchemaBuilder, SchemaError, SchemaOptions, Validator, Virtual,
};
pub use statement::{Consistency, QueryOptions, Statement, StatementKind};
pub use sync::{SyncError, SyncReport, TableSyncReport, TableSynchronizer};

pub use colonnade_types::{ColumnType, TypeError, Value, WireValue};
