//! Type Registry for Colonnade
//!
//! The canonical set of column types a schema may declare, the dynamic
//! language-level [`Value`], the column-typed [`WireValue`] handed to the
//! driver, and the rules converting between them.
//!
//! # Layered Design
//!
//! - [`ColumnType`]: what a field is declared as (`text`, `int`, `list<uuid>`, ...)
//! - [`Value`]: what application code holds (loosely typed, coercible)
//! - [`WireValue`]: what a statement parameter carries (exactly one column type)
//!
//! [`marshal`] turns a `Value` into a `WireValue` for a declared type, coercing
//! where it is lossless. [`unmarshal`] is its inverse and is total for anything
//! `marshal` produced.

mod column_type;
mod error;
mod marshal;
mod value;

pub use column_type::ColumnType;
pub use error::TypeError;
pub use marshal::{marshal, unmarshal};
pub use value::{Value, WireValue};
