//! Connector (C6): three-step factory turning a managed object's
//! provider-config reference into an open dialect connection. Rebuilds
//! from scratch on every reconciliation — no caching (`SPEC_FULL.md`
//! section 5, "Shared resources").

use kube::Client;
use sqlctl_core::{CredentialsBundle, Error, ObjectStore, Result, SqlConnection, SqlDriverFactory};
use sqlctl_resources::provider_config::{CredentialsSource, ProviderConfigSpec};

use crate::credentials::{resolve_credentials, ProviderConfigRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Postgres,
    Mysql,
    Mssql,
    Hana,
}

impl Dialect {
    /// Validates that a provider config's declared `credentials.source`
    /// matches the dialect the referencing object expects — the
    /// `InvalidProviderConfigKind` error kind from `SPEC_FULL.md` 4.2.
    fn matches(self, source: &CredentialsSource) -> bool {
        matches!(
            (self, source),
            (Dialect::Postgres, CredentialsSource::PostgreSQLConnectionSecret)
                | (Dialect::Mysql, CredentialsSource::MySQLConnectionSecret)
                | (Dialect::Mssql, CredentialsSource::MSSQLConnectionSecret)
                | (Dialect::Hana, CredentialsSource::HANAConnectionSecret)
        )
    }

    fn driver_factory(self) -> Box<dyn SqlDriverFactory> {
        match self {
            Dialect::Postgres => Box::new(sqlctl_driver_postgres::PostgresDriverFactory),
            Dialect::Mysql => Box::new(sqlctl_driver_mysql::MysqlDriverFactory),
            Dialect::Mssql => Box::new(sqlctl_driver_mssql::MssqlDriverFactory),
            Dialect::Hana => Box::new(sqlctl_driver_hana::HanaDriverFactory),
        }
    }
}

pub struct Connector<'a> {
    pub client: Client,
    pub object_store: &'a dyn ObjectStore,
}

pub struct Connected {
    pub connection: Box<dyn SqlConnection>,
    pub credentials: CredentialsBundle,
    pub provider_config: ProviderConfigSpec,
}

impl<'a> Connector<'a> {
    /// Resolve credentials (C2) then open a connection (C1) for
    /// `dialect`, optionally against `database_override` instead of the
    /// provider config's default database (used for MSSQL user objects
    /// whose `loginDatabase` differs from the target database, which
    /// need two connections — see `SPEC_FULL.md` 4.6).
    pub async fn connect(
        &self,
        dialect: Dialect,
        namespace: &str,
        usage_name: &str,
        resource_ref: &str,
        reference: &ProviderConfigRef,
        provider_config_ref: &str,
        database_override: Option<&str>,
    ) -> Result<Connected> {
        let (credentials, provider_config) = resolve_credentials(
            &self.client,
            self.object_store,
            namespace,
            usage_name,
            resource_ref,
            reference,
            provider_config_ref,
        )
        .await?;

        if !dialect.matches(&provider_config.credentials.source) {
            return Err(Error::InvalidProviderConfigKind(format!(
                "{:?} object referenced a provider config with source {:?}",
                dialect, provider_config.credentials.source
            )));
        }

        let database = database_override.unwrap_or(&provider_config.default_database);
        let connection = dialect.driver_factory().connect(&credentials, database).await?;

        Ok(Connected { connection, credentials, provider_config })
    }
}
