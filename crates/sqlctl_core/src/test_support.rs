use async_trait::async_trait;
use std::sync::Mutex;

use crate::connection::SqlConnection;
use crate::error::{Error, Result};
use crate::query::{Query, Transaction};
use crate::row::Row;
use crate::sql_dialect::{DefaultSqlDialect, SqlDialect};

/// An in-memory [`SqlConnection`] that records every statement it was
/// asked to run and returns pre-programmed rows, substituting for the
/// teacher's `dbflux_test_support` testcontainers harness: a live docker
/// daemon cannot be exercised in this environment, so the controller's
/// Observe/Create/Update/Delete state machine is tested against this fake
/// instead (`SPEC_FULL.md` section 8, "Test tooling").
pub struct FakeConnection {
    executed: Mutex<Vec<String>>,
    scan_results: Mutex<Vec<Result<Row>>>,
    query_results: Mutex<Vec<Result<Vec<Row>>>>,
    fail_exec: Option<String>,
}

impl Default for FakeConnection {
    fn default() -> Self {
        Self {
            executed: Mutex::new(Vec::new()),
            scan_results: Mutex::new(Vec::new()),
            query_results: Mutex::new(Vec::new()),
            fail_exec: None,
        }
    }
}

impl FakeConnection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue up the `Row` (or error) returned by the next `scan_one` call.
    pub fn push_scan_result(&self, result: Result<Row>) {
        self.scan_results.lock().unwrap().push(result);
    }

    /// Queue up the rows (or error) returned by the next `query` call.
    pub fn push_query_result(&self, result: Result<Vec<Row>>) {
        self.query_results.lock().unwrap().push(result);
    }

    /// Every statement executed so far, in order, for assertions like
    /// scenario S1-S6 in `SPEC_FULL.md`.
    pub fn executed_statements(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }
}

#[async_trait]
impl SqlConnection for FakeConnection {
    async fn exec(&mut self, query: &Query) -> Result<()> {
        if let Some(msg) = &self.fail_exec {
            return Err(Error::ExecFailed(msg.clone()));
        }
        self.executed.lock().unwrap().push(query.sql.clone());
        Ok(())
    }

    async fn exec_tx(&mut self, statements: &Transaction) -> Result<()> {
        for statement in statements {
            self.exec(statement).await?;
        }
        Ok(())
    }

    async fn scan_one(&mut self, query: &Query) -> Result<Row> {
        self.executed.lock().unwrap().push(query.sql.clone());
        self.scan_results
            .lock()
            .unwrap()
            .pop()
            .unwrap_or(Err(Error::NoRows))
    }

    async fn query(&mut self, query: &Query) -> Result<Vec<Row>> {
        self.executed.lock().unwrap().push(query.sql.clone());
        self.query_results
            .lock()
            .unwrap()
            .pop()
            .unwrap_or(Ok(Vec::new()))
    }

    fn dialect(&self) -> &dyn SqlDialect {
        &DefaultSqlDialect
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_executed_statements_in_order() {
        let mut conn = FakeConnection::new();
        conn.exec(&Query::raw("CREATE DATABASE db1")).await.unwrap();
        conn.exec(&Query::raw("GRANT SELECT ON db1 TO r1")).await.unwrap();
        assert_eq!(
            conn.executed_statements(),
            vec!["CREATE DATABASE db1".to_string(), "GRANT SELECT ON db1 TO r1".to_string()]
        );
    }

    #[tokio::test]
    async fn scan_one_with_no_queued_result_is_no_rows() {
        let mut conn = FakeConnection::new();
        let err = conn.scan_one(&Query::raw("SELECT 1")).await.unwrap_err();
        assert!(matches!(err, Error::NoRows));
    }
}
