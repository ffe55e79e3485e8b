use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Which dialect, and therefore which secret shape, a provider config's
/// credentials describe. `HANAConnectionSecret` is a same-shape addition
/// beyond the three sources `SPEC_FULL.md` names explicitly for Postgres/
/// MySQL/MSSQL — needed because this controller manages four dialects
/// (see `SPEC_FULL.md` section 6).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum CredentialsSource {
    PostgreSQLConnectionSecret,
    MySQLConnectionSecret,
    MSSQLConnectionSecret,
    HANAConnectionSecret,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SecretRef {
    pub name: String,
    pub namespace: String,
    #[serde(default = "default_secret_key")]
    pub key: String,
}

fn default_secret_key() -> String {
    "credentials".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Credentials {
    pub source: CredentialsSource,
    #[serde(rename = "connectionSecretRef")]
    pub connection_secret_ref: Option<SecretRef>,
}

/// Postgres `sslMode` values (`SPEC_FULL.md` section 6).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum SslMode {
    Disable,
    Allow,
    Prefer,
    Require,
    #[serde(rename = "verify-ca")]
    VerifyCa,
    #[serde(rename = "verify-full")]
    VerifyFull,
}

/// MySQL `tls` values (`SPEC_FULL.md` section 6).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum MySqlTlsMode {
    #[serde(rename = "true")]
    Enabled,
    #[serde(rename = "skip-verify")]
    SkipVerify,
    Preferred,
    Custom,
}

/// Fields shared by `ProviderConfig` and `ClusterProviderConfig`.
/// `kube::CustomResource` derives one Kubernetes kind per annotated
/// struct, so the two scopes each carry their own copy of this shape via
/// `#[serde(flatten)]` rather than a common base type — Rust structs
/// don't support inheritance, and flattening is the idiomatic substitute
/// (the same technique `ProviderConfigSpec` itself already needs none of,
/// since it has no further subtype).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ProviderConfigSpec {
    pub credentials: Credentials,
    #[serde(rename = "defaultDatabase")]
    pub default_database: String,
    #[serde(rename = "sslMode", default)]
    pub ssl_mode: Option<SslMode>,
    #[serde(default)]
    pub tls: Option<MySqlTlsMode>,
    #[serde(rename = "tlsConfig", default)]
    pub tls_config: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ProviderConfigStatus {
    #[serde(default)]
    pub users: i32,
}

/// Namespaced provider configuration: its secret must be in the same
/// namespace as the managed object that references it.
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "sql.internal",
    version = "v1alpha1",
    kind = "ProviderConfig",
    plural = "providerconfigs",
    shortname = "pc",
    namespaced,
    status = "ProviderConfigStatus"
)]
pub struct ProviderConfigCrdSpec {
    #[serde(flatten)]
    pub inner: ProviderConfigSpec,
}

/// Cluster-scoped provider configuration: its secret may live in any
/// namespace, named by `SecretRef::namespace`.
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "sql.internal",
    version = "v1alpha1",
    kind = "ClusterProviderConfig",
    plural = "clusterproviderconfigs",
    shortname = "cpc",
    status = "ProviderConfigStatus"
)]
pub struct ClusterProviderConfigCrdSpec {
    #[serde(flatten)]
    pub inner: ProviderConfigSpec,
}

/// Usage edge from a managed object to the provider config it references,
/// tracked so the host layer can refuse to delete a config still in use.
/// Mirrors the Clever-operator pattern of a dedicated tracking resource
/// alongside the resource it tracks.
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "sql.internal",
    version = "v1alpha1",
    kind = "ProviderConfigUsage",
    plural = "providerconfigusages",
    shortname = "pcu",
    namespaced
)]
pub struct ProviderConfigUsageSpec {
    #[serde(rename = "providerConfigRef")]
    pub provider_config_ref: String,
    #[serde(rename = "resourceRef")]
    pub resource_ref: String,
}
