use async_trait::async_trait;
use hdbconnect_async::{ConnectParams, Connection as HdbConnection, HdbValue};
use sqlctl_core::{
    CredentialsBundle, Error, Query, Result, Row, SqlConnection, SqlDriverFactory, SqlValue,
    Transaction,
};

use crate::dialect::HanaDialect;

/// Opens connections against SAP HANA via `hdbconnect_async`. No example
/// in the retrieval pack grounds a real HANA driver (the one pack file
/// touching HANA wraps a fictional vendor SDK) — see `DESIGN.md` for the
/// explicit call-out. The connection-lifecycle and error-wrapping shape
/// still follow the same per-operation-connection pattern as the other
/// three driver crates.
pub struct HanaDriverFactory;

#[async_trait]
impl SqlDriverFactory for HanaDriverFactory {
    async fn connect(
        &self,
        credentials: &CredentialsBundle,
        _default_database: &str,
    ) -> Result<Box<dyn SqlConnection>> {
        let address = format!("{}:{}", credentials.endpoint, credentials.port);
        let params = ConnectParams::builder()
            .hostname(&credentials.endpoint)
            .port(credentials.port)
            .dbuser(&credentials.username)
            .password(&credentials.password)
            .build()
            .map_err(|e| Error::ConnectionFailed(format!("invalid hana connect params for {address}: {e}")))?;

        let connection = HdbConnection::new(params)
            .await
            .map_err(|e| Error::ConnectionFailed(format!("could not connect to {address}: {e}")))?;

        Ok(Box::new(HanaConnectionAdapter { connection }))
    }
}

pub struct HanaConnectionAdapter {
    connection: HdbConnection,
}

impl HanaConnectionAdapter {
    async fn fetch_rows(&mut self, query: &Query) -> Result<Vec<Row>> {
        let result_set = if query.params.is_empty() {
            self.connection
                .query(&query.sql)
                .await
                .map_err(|e| Error::QueryFailed(e.to_string()))?
        } else {
            let params = to_hdb_params(&query.params);
            let mut prepared = self
                .connection
                .prepare(&query.sql)
                .await
                .map_err(|e| Error::QueryFailed(e.to_string()))?;
            prepared
                .execute(&params)
                .await
                .map_err(|e| Error::QueryFailed(e.to_string()))?
                .into_resultset()
                .map_err(|e| Error::QueryFailed(e.to_string()))?
        };
        let rows = result_set
            .into_rows()
            .await
            .map_err(|e| Error::QueryFailed(e.to_string()))?;
        Ok(rows.into_iter().map(row_from_hdb).collect())
    }
}

fn hdb_value_to_core(value: &HdbValue) -> SqlValue {
    match value {
        HdbValue::NULL => SqlValue::Null,
        HdbValue::BOOLEAN(b) => SqlValue::Bool(*b),
        other => SqlValue::Text(other.to_string()),
    }
}

fn to_hdb_params(params: &[SqlValue]) -> Vec<HdbValue<'static>> {
    params
        .iter()
        .map(|value| match value {
            SqlValue::Null => HdbValue::NULL,
            SqlValue::Bool(b) => HdbValue::BOOLEAN(*b),
            SqlValue::Int(i) => HdbValue::BIGINT(*i),
            SqlValue::Float(f) => HdbValue::DOUBLE(*f),
            SqlValue::Text(s) => HdbValue::STRING(s.clone()),
        })
        .collect()
}

#[async_trait]
impl SqlConnection for HanaConnectionAdapter {
    async fn exec(&mut self, query: &Query) -> Result<()> {
        if query.params.is_empty() {
            self.connection
                .exec(&query.sql)
                .await
                .map_err(|e| Error::ExecFailed(e.to_string()))?;
            return Ok(());
        }
        let params = to_hdb_params(&query.params);
        let mut prepared = self
            .connection
            .prepare(&query.sql)
            .await
            .map_err(|e| Error::ExecFailed(e.to_string()))?;
        prepared
            .execute(&params)
            .await
            .map_err(|e| Error::ExecFailed(e.to_string()))?;
        Ok(())
    }

    async fn exec_tx(&mut self, statements: &Transaction) -> Result<()> {
        for statement in statements {
            self.exec(statement).await?;
        }
        self.connection
            .commit()
            .await
            .map_err(|e| Error::ExecFailed(e.to_string()))
    }

    async fn scan_one(&mut self, query: &Query) -> Result<Row> {
        let rows = self.fetch_rows(query).await?;
        rows.into_iter().next().ok_or(Error::NoRows)
    }

    async fn query(&mut self, query: &Query) -> Result<Vec<Row>> {
        self.fetch_rows(query).await
    }

    fn dialect(&self) -> &dyn sqlctl_core::SqlDialect {
        &HanaDialect
    }
}

fn row_from_hdb(hdb_row: hdbconnect_async::Row) -> Row {
    let field_names: Vec<String> = hdb_row.metadata().iter().map(|f| f.displayname().to_string()).collect();
    let values: Vec<(String, SqlValue)> = hdb_row
        .into_iter()
        .zip(field_names)
        .map(|(value, name)| (name, hdb_value_to_core(&value)))
        .collect();
    Row::new(values)
}
