//! Colonnade Test Utilities
//!
//! In-memory driver and fixtures for exercising models without a cluster.
//!
//! # Usage
//!
//! ```rust,ignore
//! use colonnade::{Context, QueryOptions};
//! use colonnade_test_utils::{fixtures, MockDriver};
//!
//! #[tokio::test]
//! async fn test_save_dog() {
//!     let driver = MockDriver::shared();
//!     let ctx = Context::new(driver.clone());
//!     let dogs = ctx.register("Dogs", fixtures::dog_schema()).unwrap();
//!
//!     let mut rex = dogs.create([("dog_id", 1), ("age", 3)]).unwrap();
//!     rex.save(&QueryOptions::default()).await.unwrap();
//!     assert!(driver.queries()[0].starts_with("INSERT INTO dogs"));
//! }
//! ```

pub mod catalog;
pub mod fixtures;
pub mod mock;

pub use catalog::Catalog;
pub use mock::{ExecutedStatement, MockDriver};

pub use colonnade_logging::init_test_logging;
