use async_trait::async_trait;
use mysql_async::prelude::Queryable;
use mysql_async::{Conn, OptsBuilder, Value};
use sqlctl_core::{
    CredentialsBundle, Error, Query, Result, Row, SqlConnection, SqlDriverFactory, SqlValue,
    Transaction,
};

use crate::dialect::MysqlDialect;

/// Opens connections against MySQL/MariaDB from a resolved credentials
/// bundle, built with `mysql_async::OptsBuilder` rather than a literal DSN
/// string — the async counterpart of the teacher's sync `mysql::Opts`
/// construction in `dbflux_driver_mysql::driver`.
pub struct MysqlDriverFactory;

#[async_trait]
impl SqlDriverFactory for MysqlDriverFactory {
    async fn connect(
        &self,
        credentials: &CredentialsBundle,
        default_database: &str,
    ) -> Result<Box<dyn SqlConnection>> {
        let opts = OptsBuilder::default()
            .ip_or_hostname(credentials.endpoint.clone())
            .tcp_port(credentials.port)
            .user(Some(credentials.username.clone()))
            .pass(Some(credentials.password.clone()))
            .db_name(Some(default_database.to_string()));

        let conn = Conn::new(opts)
            .await
            .map_err(|e| format_mysql_error(&e, &credentials.endpoint, credentials.port))?;

        Ok(Box::new(MysqlConnection { conn }))
    }
}

pub struct MysqlConnection {
    conn: Conn,
}

fn to_mysql_value(value: &SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::NULL,
        SqlValue::Bool(b) => Value::Int(*b as i64),
        SqlValue::Int(i) => Value::Int(*i),
        SqlValue::Float(f) => Value::Double(*f),
        SqlValue::Text(s) => Value::Bytes(s.clone().into_bytes()),
    }
}

fn row_to_core_row(row: mysql_async::Row) -> Row {
    let columns = row.columns_ref().to_vec();
    let mut pairs = Vec::with_capacity(columns.len());
    let mut row = row;
    for (i, col) in columns.iter().enumerate() {
        let value: Option<String> = row.take(i);
        pairs.push((
            col.name_str().to_string(),
            value.map(SqlValue::Text).unwrap_or(SqlValue::Null),
        ));
    }
    Row::new(pairs)
}

#[async_trait]
impl SqlConnection for MysqlConnection {
    async fn exec(&mut self, query: &Query) -> Result<()> {
        let params: Vec<Value> = query.params.iter().map(to_mysql_value).collect();
        self.conn
            .exec_drop(&query.sql, params)
            .await
            .map_err(|e| Error::ExecFailed(e.to_string()))
    }

    async fn exec_tx(&mut self, statements: &Transaction) -> Result<()> {
        let mut tx = self
            .conn
            .start_transaction(mysql_async::TxOpts::default())
            .await
            .map_err(|e| Error::ExecFailed(e.to_string()))?;
        for statement in statements {
            let params: Vec<Value> = statement.params.iter().map(to_mysql_value).collect();
            tx.exec_drop(&statement.sql, params)
                .await
                .map_err(|e| Error::ExecFailed(e.to_string()))?;
        }
        tx.commit().await.map_err(|e| Error::ExecFailed(e.to_string()))
    }

    async fn scan_one(&mut self, query: &Query) -> Result<Row> {
        let params: Vec<Value> = query.params.iter().map(to_mysql_value).collect();
        let row: Option<mysql_async::Row> = self
            .conn
            .exec_first(&query.sql, params)
            .await
            .map_err(|e| Error::QueryFailed(e.to_string()))?;
        row.map(row_to_core_row).ok_or(Error::NoRows)
    }

    async fn query(&mut self, query: &Query) -> Result<Vec<Row>> {
        let params: Vec<Value> = query.params.iter().map(to_mysql_value).collect();
        let rows: Vec<mysql_async::Row> = self
            .conn
            .exec(&query.sql, params)
            .await
            .map_err(|e| Error::QueryFailed(e.to_string()))?;
        Ok(rows.into_iter().map(row_to_core_row).collect())
    }

    fn dialect(&self) -> &dyn sqlctl_core::SqlDialect {
        &MysqlDialect
    }
}

/// Humanize common MySQL driver error text, following the same
/// substring-matching style as the teacher's `format_pg_error`.
fn format_mysql_error(e: &mysql_async::Error, host: &str, port: u16) -> Error {
    let source = e.to_string();
    let message = if source.contains("Access denied") {
        "authentication failed. check the referenced secret's username and password".to_string()
    } else if source.contains("Unknown database") {
        format!("database does not exist: {source}")
    } else if source.contains("Connection refused") || source.contains("timed out") {
        format!("could not connect to {host}:{port}: {source}")
    } else {
        format!("connection error: {source}")
    };
    log::error!("mysql connection failed: {message}");
    Error::ConnectionFailed(message)
}
