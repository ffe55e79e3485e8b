//! Shared contracts for the sqlctl dialect adapters and controller: the
//! `SqlConnection`/`SqlDriverFactory` traits, the dialect-quoting trait,
//! the error taxonomy, and the pure drift-detection algorithms.

mod config;
mod connection;
mod credentials;
mod diff;
mod error;
mod query;
mod row;
mod secret_store;
mod sql_dialect;
pub mod test_support;

pub use config::RuntimeConfig;
pub use connection::{SqlConnection, SqlDriverFactory};
pub use credentials::{generate_password, ConnectionDetails, CredentialsBundle};
pub use diff::{externally_changed, map_diff, password_drift, set_diff, sets_match, MapDiff};
pub use error::{Error, Result};
pub use query::{Query, Transaction};
pub use row::{Row, SqlValue};
pub use secret_store::{KubeObjectStore, ObjectStore};
pub use sql_dialect::{DefaultSqlDialect, PlaceholderStyle, SqlDialect};
