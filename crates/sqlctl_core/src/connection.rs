use async_trait::async_trait;

use crate::credentials::CredentialsBundle;
use crate::error::Result;
use crate::query::{Query, Transaction};
use crate::row::Row;
use crate::sql_dialect::SqlDialect;

/// One open connection to a SQL server, scoped to a single reconciliation
/// operation. Opened on entry, released on every exit path — no pooling at
/// this layer (`SPEC_FULL.md` section 5, "Shared resources").
///
/// Generalizes the teacher's `dbflux_core::traits::Connection` trait: kept
/// is the factory/connection split and the per-operation lifecycle; dropped
/// is every schema-browsing/CRUD/key-value/document method, none of which
/// the reconciler needs (Non-goal: no row/data management). Generalized
/// from synchronous calls behind a `Mutex<Client>` to `async fn`, since the
/// host reconciler is itself async — see `DESIGN.md`.
#[async_trait]
pub trait SqlConnection: Send + Sync {
    /// Execute one statement with no result rows expected (DDL, single
    /// UPDATE/DELETE/GRANT/REVOKE).
    async fn exec(&mut self, query: &Query) -> Result<()>;

    /// Execute a sequence of statements atomically. MSSQL returns
    /// `Error::NotSupported` — see `SPEC_FULL.md` 4.1 and the Open
    /// Questions entry on `ExecTx`.
    async fn exec_tx(&mut self, statements: &Transaction) -> Result<()>;

    /// Run `query` expecting at most one row; `Error::NoRows` if none.
    async fn scan_one(&mut self, query: &Query) -> Result<Row>;

    /// Run `query` and return every row.
    async fn query(&mut self, query: &Query) -> Result<Vec<Row>>;

    /// The dialect's identifier/literal quoting rules.
    fn dialect(&self) -> &dyn SqlDialect;
}

/// Per-dialect factory turning a resolved credentials bundle into an open
/// connection. One implementation per driver crate
/// (`sqlctl_driver_postgres`, `_mysql`, `_mssql`, `_hana`).
#[async_trait]
pub trait SqlDriverFactory: Send + Sync {
    async fn connect(
        &self,
        credentials: &CredentialsBundle,
        default_database: &str,
    ) -> Result<Box<dyn SqlConnection>>;
}
