use async_trait::async_trait;
use native_tls::TlsConnector;
use postgres_native_tls::MakeTlsConnector;
use sqlctl_core::{
    CredentialsBundle, Error, Query, Result, Row, SqlConnection, SqlDriverFactory, SqlValue,
    Transaction,
};
use tokio_postgres::{Client, NoTls};

use crate::dialect::PostgresDialect;

/// Opens connections against a PostgreSQL server from a resolved
/// credentials bundle. Generalizes the connection-string building and
/// SSL-mode branching from the teacher's
/// `dbflux_driver_postgres::driver::PostgresConnection::connect`, dropped
/// to just `disable`/`require` (the reconciler does not need the teacher's
/// SSH-tunnel path — Non-goal, out of scope per `SPEC_FULL.md` section 1).
pub struct PostgresDriverFactory;

#[async_trait]
impl SqlDriverFactory for PostgresDriverFactory {
    async fn connect(
        &self,
        credentials: &CredentialsBundle,
        default_database: &str,
    ) -> Result<Box<dyn SqlConnection>> {
        let dsn = format!(
            "host={} port={} user={} password={} dbname={} connect_timeout=10",
            credentials.endpoint, credentials.port, credentials.username, credentials.password,
            default_database,
        );

        let require_tls = matches!(credentials.tls.as_deref(), Some("require") | Some("verify-ca") | Some("verify-full"));

        let client = if require_tls {
            let connector = TlsConnector::builder()
                .build()
                .map_err(|e| Error::ConnectionFailed(e.to_string()))?;
            let connector = MakeTlsConnector::new(connector);
            let (client, connection) = tokio_postgres::connect(&dsn, connector)
                .await
                .map_err(|e| format_pg_error(&e, &credentials.endpoint, credentials.port))?;
            tokio::spawn(async move {
                if let Err(e) = connection.await {
                    log::error!("postgres connection task ended: {e}");
                }
            });
            client
        } else {
            let (client, connection) = tokio_postgres::connect(&dsn, NoTls)
                .await
                .map_err(|e| format_pg_error(&e, &credentials.endpoint, credentials.port))?;
            tokio::spawn(async move {
                if let Err(e) = connection.await {
                    log::error!("postgres connection task ended: {e}");
                }
            });
            client
        };

        Ok(Box::new(PostgresConnection { client }))
    }
}

pub struct PostgresConnection {
    client: Client,
}

fn to_pg_param(value: &SqlValue) -> Box<dyn tokio_postgres::types::ToSql + Sync> {
    match value {
        SqlValue::Null => Box::new(Option::<String>::None),
        SqlValue::Bool(b) => Box::new(*b),
        SqlValue::Int(i) => Box::new(*i),
        SqlValue::Float(f) => Box::new(*f),
        SqlValue::Text(s) => Box::new(s.clone()),
    }
}

fn row_to_core_row(row: &tokio_postgres::Row) -> Row {
    let columns: Vec<(String, SqlValue)> = row
        .columns()
        .iter()
        .enumerate()
        .map(|(i, col)| {
            let value = row
                .try_get::<_, Option<String>>(i)
                .ok()
                .flatten()
                .map(SqlValue::Text)
                .unwrap_or(SqlValue::Null);
            (col.name().to_string(), value)
        })
        .collect();
    Row::new(columns)
}

#[async_trait]
impl SqlConnection for PostgresConnection {
    async fn exec(&mut self, query: &Query) -> Result<()> {
        let params: Vec<_> = query.params.iter().map(|p| to_pg_param(p)).collect();
        let refs: Vec<&(dyn tokio_postgres::types::ToSql + Sync)> =
            params.iter().map(|p| p.as_ref()).collect();
        self.client
            .execute(&query.sql, &refs)
            .await
            .map_err(|e| Error::ExecFailed(e.to_string()))?;
        Ok(())
    }

    async fn exec_tx(&mut self, statements: &Transaction) -> Result<()> {
        let tx = self
            .client
            .transaction()
            .await
            .map_err(|e| Error::ExecFailed(e.to_string()))?;
        for statement in statements {
            let params: Vec<_> = statement.params.iter().map(|p| to_pg_param(p)).collect();
            let refs: Vec<&(dyn tokio_postgres::types::ToSql + Sync)> =
                params.iter().map(|p| p.as_ref()).collect();
            tx.execute(&statement.sql, &refs)
                .await
                .map_err(|e| Error::ExecFailed(e.to_string()))?;
        }
        tx.commit().await.map_err(|e| Error::ExecFailed(e.to_string()))?;
        Ok(())
    }

    async fn scan_one(&mut self, query: &Query) -> Result<Row> {
        let params: Vec<_> = query.params.iter().map(|p| to_pg_param(p)).collect();
        let refs: Vec<&(dyn tokio_postgres::types::ToSql + Sync)> =
            params.iter().map(|p| p.as_ref()).collect();
        let row = self
            .client
            .query_opt(&query.sql, &refs)
            .await
            .map_err(|e| Error::QueryFailed(e.to_string()))?
            .ok_or(Error::NoRows)?;
        Ok(row_to_core_row(&row))
    }

    async fn query(&mut self, query: &Query) -> Result<Vec<Row>> {
        let params: Vec<_> = query.params.iter().map(|p| to_pg_param(p)).collect();
        let refs: Vec<&(dyn tokio_postgres::types::ToSql + Sync)> =
            params.iter().map(|p| p.as_ref()).collect();
        let rows = self
            .client
            .query(&query.sql, &refs)
            .await
            .map_err(|e| Error::QueryFailed(e.to_string()))?;
        Ok(rows.iter().map(row_to_core_row).collect())
    }

    fn dialect(&self) -> &dyn sqlctl_core::SqlDialect {
        &PostgresDialect
    }
}

/// Humanize common libpq error substrings into operator-readable messages.
/// Grounded directly on
/// `dbflux_driver_postgres::driver::format_pg_error` in the teacher crate.
fn format_pg_error(e: &tokio_postgres::Error, host: &str, port: u16) -> Error {
    let source = e.to_string();

    let message = if source.contains("timed out") {
        format!("connection to {host}:{port} timed out. check that the host is reachable and the port is open")
    } else if source.contains("Connection refused") {
        format!("connection refused at {host}:{port}. verify the server is running and accepting connections")
    } else if source.contains("password authentication failed") {
        "authentication failed. check the referenced secret's username and password".to_string()
    } else if source.contains("does not exist") {
        format!("database or user does not exist: {source}")
    } else if source.contains("no pg_hba.conf entry") {
        format!("server rejected connection from this host. check pg_hba.conf on {host}")
    } else {
        format!("connection error: {source}")
    };

    log::error!("postgres connection failed: {message}");
    Error::ConnectionFailed(message)
}
