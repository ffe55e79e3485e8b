use async_trait::async_trait;
use sqlctl_core::{
    CredentialsBundle, Error, Query, Result, Row, SqlConnection, SqlDriverFactory, SqlValue,
    Transaction,
};
use tiberius::{AuthMethod, Client, Config, EncryptionLevel, Query as TiberiusQuery};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};

use crate::dialect::MssqlDialect;

type TiberiusClient = Client<Compat<TcpStream>>;

/// Opens connections against Microsoft SQL Server, grounded on the
/// `tiberius` + `tokio::net::TcpStream` + `tokio_util::compat` pattern
/// used by Prisma's quaint MSSQL connector. SQL auth and federated
/// (Azure AD) auth both flow through `CredentialsBundle::fedauth`
/// (`SPEC_FULL.md` section 6).
pub struct MssqlDriverFactory;

#[async_trait]
impl SqlDriverFactory for MssqlDriverFactory {
    async fn connect(
        &self,
        credentials: &CredentialsBundle,
        default_database: &str,
    ) -> Result<Box<dyn SqlConnection>> {
        let mut config = Config::new();
        config.host(&credentials.endpoint);
        config.port(credentials.port);
        config.database(default_database);
        config.encryption(EncryptionLevel::Required);
        config.trust_cert();

        match credentials.fedauth.as_deref() {
            Some("ActiveDirectoryPassword") => {
                config.authentication(AuthMethod::AADPassword {
                    users: credentials.username.clone(),
                    password: credentials.password.clone(),
                });
            }
            Some(_) | None => {
                config.authentication(AuthMethod::sql_server(
                    &credentials.username,
                    &credentials.password,
                ));
            }
        }

        let tcp = TcpStream::connect(config.get_addr())
            .await
            .map_err(|e| {
                Error::ConnectionFailed(format!(
                    "could not connect to {}:{}: {e}",
                    credentials.endpoint, credentials.port
                ))
            })?;
        tcp.set_nodelay(true).ok();

        let client = Client::connect(config, tcp.compat_write())
            .await
            .map_err(|e| Error::ConnectionFailed(format!("mssql handshake failed: {e}")))?;

        Ok(Box::new(MssqlConnection { client }))
    }
}

pub struct MssqlConnection {
    client: TiberiusClient,
}

/// Rewrites this crate's generic `?` placeholders into tiberius's
/// positional `@P1`, `@P2`, ... parameter syntax. Composed SQL never
/// contains a literal `?` outside a placeholder position.
fn rewrite_placeholders(sql: &str) -> String {
    let mut rewritten = String::with_capacity(sql.len());
    let mut n = 0u32;
    for ch in sql.chars() {
        if ch == '?' {
            n += 1;
            rewritten.push_str(&format!("@P{n}"));
        } else {
            rewritten.push(ch);
        }
    }
    rewritten
}

fn bind_params<'a>(tiberius_query: &mut TiberiusQuery<'a>, params: &'a [SqlValue]) {
    for param in params {
        match param {
            SqlValue::Null => tiberius_query.bind(Option::<&str>::None),
            SqlValue::Bool(b) => tiberius_query.bind(*b),
            SqlValue::Int(i) => tiberius_query.bind(*i),
            SqlValue::Float(f) => tiberius_query.bind(*f),
            SqlValue::Text(s) => tiberius_query.bind(s.as_str()),
        }
    }
}

fn row_to_core_row(row: &tiberius::Row) -> Row {
    let columns: Vec<(String, SqlValue)> = row
        .cell_iter()
        .enumerate()
        .map(|(i, cell)| {
            let name = row.columns()[i].name().to_string();
            let value = cell
                .as_ref()
                .and_then(|v| v.as_str())
                .map(|s| SqlValue::Text(s.to_string()))
                .unwrap_or(SqlValue::Null);
            (name, value)
        })
        .collect();
    Row::new(columns)
}

#[async_trait]
impl SqlConnection for MssqlConnection {
    async fn exec(&mut self, query: &Query) -> Result<()> {
        let sql = rewrite_placeholders(&query.sql);
        let mut tiberius_query = TiberiusQuery::new(sql);
        bind_params(&mut tiberius_query, &query.params);
        tiberius_query
            .execute(&mut self.client)
            .await
            .map_err(|e| Error::ExecFailed(e.to_string()))?;
        Ok(())
    }

    /// MSSQL has no multi-statement transaction support in this driver —
    /// see `SPEC_FULL.md` 4.1 and the Open Questions decision to never
    /// give MSSQL a resource kind that would need one.
    async fn exec_tx(&mut self, _statements: &Transaction) -> Result<()> {
        Err(Error::NotSupported("mssql driver does not support exec_tx".to_string()))
    }

    async fn scan_one(&mut self, query: &Query) -> Result<Row> {
        let sql = rewrite_placeholders(&query.sql);
        let mut tiberius_query = TiberiusQuery::new(sql);
        bind_params(&mut tiberius_query, &query.params);
        let stream = tiberius_query
            .query(&mut self.client)
            .await
            .map_err(|e| Error::QueryFailed(e.to_string()))?;
        let rows = stream
            .into_first_result()
            .await
            .map_err(|e| Error::QueryFailed(e.to_string()))?;
        rows.first().map(row_to_core_row).ok_or(Error::NoRows)
    }

    async fn query(&mut self, query: &Query) -> Result<Vec<Row>> {
        let sql = rewrite_placeholders(&query.sql);
        let mut tiberius_query = TiberiusQuery::new(sql);
        bind_params(&mut tiberius_query, &query.params);
        let stream = tiberius_query
            .query(&mut self.client)
            .await
            .map_err(|e| Error::QueryFailed(e.to_string()))?;
        let rows = stream
            .into_first_result()
            .await
            .map_err(|e| Error::QueryFailed(e.to_string()))?;
        Ok(rows.iter().map(row_to_core_row).collect())
    }

    fn dialect(&self) -> &dyn sqlctl_core::SqlDialect {
        &MssqlDialect
    }
}
