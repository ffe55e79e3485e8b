use crate::row::SqlValue;

/// A single SQL statement plus its positional parameters. The query
/// composer (C3) only ever produces these — never raw concatenated
/// strings with unescaped user input.
#[derive(Debug, Clone)]
pub struct Query {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

impl Query {
    pub fn raw(sql: impl Into<String>) -> Self {
        Self { sql: sql.into(), params: Vec::new() }
    }

    pub fn with_params(sql: impl Into<String>, params: Vec<SqlValue>) -> Self {
        Self { sql: sql.into(), params }
    }
}

/// A sequence of statements meant to run inside one transaction via
/// `SqlConnection::exec_tx`. Used by Postgres default privileges (always
/// two statements: `REVOKE ALL` then `GRANT`) and MSSQL user creation
/// (login then user) — see `SPEC_FULL.md` 4.3.
pub type Transaction = Vec<Query>;
