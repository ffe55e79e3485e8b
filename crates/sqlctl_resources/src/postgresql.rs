use std::collections::BTreeMap;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::common::{Reference, WithOption};
use crate::status::Conditions;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DatabaseParameters {}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct DatabaseObservation {
    pub exists: bool,
}

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "postgresql.sql.internal",
    version = "v1alpha1",
    kind = "Database",
    plural = "databases",
    namespaced,
    status = "DatabaseStatus"
)]
pub struct DatabaseSpec {
    #[serde(rename = "providerConfigRef")]
    pub provider_config_ref: String,
    #[serde(default)]
    pub parameters: DatabaseParameters,
}

impl Default for DatabaseParameters {
    fn default() -> Self {
        DatabaseParameters {}
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct DatabaseStatus {
    #[serde(flatten)]
    pub conditions: Conditions,
    #[serde(rename = "atProvider", default)]
    pub at_provider: DatabaseObservation,
}

/// Postgres role/user/login. `passwordSecretRef` is optional: when absent
/// a password is generated at create time and written to the connection
/// details secret (`SPEC_FULL.md` 4.5, Create contract).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RoleSecretRef {
    pub name: String,
    pub namespace: String,
    #[serde(default = "default_password_key")]
    pub key: String,
}

fn default_password_key() -> String {
    "password".to_string()
}

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "postgresql.sql.internal",
    version = "v1alpha1",
    kind = "Role",
    plural = "roles",
    namespaced,
    status = "RoleStatus"
)]
pub struct RoleSpec {
    #[serde(rename = "providerConfigRef")]
    pub provider_config_ref: String,
    #[serde(rename = "passwordSecretRef", default)]
    pub password_secret_ref: Option<RoleSecretRef>,
    #[serde(default)]
    pub privileges: Vec<String>,
    #[serde(rename = "configurationParameters", default)]
    pub configuration_parameters: BTreeMap<String, String>,
    #[serde(rename = "connectionLimit", default)]
    pub connection_limit: Option<i32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct RoleObservation {
    pub exists: bool,
    #[serde(rename = "passwordChangedAt", default)]
    pub password_changed_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct RoleStatus {
    #[serde(flatten)]
    pub conditions: Conditions,
    #[serde(rename = "atProvider", default)]
    pub at_provider: RoleObservation,
}

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "postgresql.sql.internal",
    version = "v1alpha1",
    kind = "Schema",
    plural = "schemas",
    namespaced,
    status = "SchemaStatus"
)]
pub struct SchemaSpec {
    #[serde(rename = "providerConfigRef")]
    pub provider_config_ref: String,
    pub database: Reference,
    pub owner: Reference,
    #[serde(rename = "revokePublicOnSchema", default)]
    pub revoke_public_on_schema: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct SchemaObservation {
    pub exists: bool,
    #[serde(default)]
    pub owner: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct SchemaStatus {
    #[serde(flatten)]
    pub conditions: Conditions,
    #[serde(rename = "atProvider", default)]
    pub at_provider: SchemaObservation,
}

/// A Postgres grant. Exactly one of `{role-member, database/schema}`
/// shapes may be populated — see `SPEC_FULL.md` 3 invariants and the
/// `GrantTypeAmbiguous` error kind.
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "postgresql.sql.internal",
    version = "v1alpha1",
    kind = "Grant",
    plural = "grants",
    namespaced,
    status = "GrantStatus"
)]
pub struct GrantSpec {
    #[serde(rename = "providerConfigRef")]
    pub provider_config_ref: String,
    pub role: Reference,
    #[serde(default)]
    pub database: Option<Reference>,
    #[serde(default)]
    pub schema: Option<Reference>,
    #[serde(rename = "memberOf", default)]
    pub member_of: Option<Reference>,
    #[serde(default)]
    pub privileges: Vec<String>,
    #[serde(rename = "withOption", default)]
    pub with_option: Option<WithOption>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct GrantObservation {
    #[serde(default)]
    pub privileges: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct GrantStatus {
    #[serde(flatten)]
    pub conditions: Conditions,
    #[serde(rename = "atProvider", default)]
    pub at_provider: GrantObservation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum ObjectType {
    Table,
    Sequence,
    Function,
    Type,
    Schema,
}

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "postgresql.sql.internal",
    version = "v1alpha1",
    kind = "DefaultPrivileges",
    plural = "defaultprivileges",
    namespaced,
    status = "DefaultPrivilegesStatus"
)]
pub struct DefaultPrivilegesSpec {
    #[serde(rename = "providerConfigRef")]
    pub provider_config_ref: String,
    pub role: Reference,
    #[serde(rename = "targetRole")]
    pub target_role: Reference,
    #[serde(default)]
    pub database: Option<Reference>,
    #[serde(default)]
    pub schema: Option<Reference>,
    #[serde(rename = "objectType")]
    pub object_type: ObjectType,
    #[serde(default)]
    pub privileges: Vec<String>,
    #[serde(rename = "withOption", default)]
    pub with_option: Option<WithOption>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct DefaultPrivilegesObservation {
    #[serde(default)]
    pub privileges: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct DefaultPrivilegesStatus {
    #[serde(flatten)]
    pub conditions: Conditions,
    #[serde(rename = "atProvider", default)]
    pub at_provider: DefaultPrivilegesObservation,
}

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "postgresql.sql.internal",
    version = "v1alpha1",
    kind = "ExtensionInstallation",
    plural = "extensioninstallations",
    namespaced,
    status = "ExtensionInstallationStatus"
)]
pub struct ExtensionInstallationSpec {
    #[serde(rename = "providerConfigRef")]
    pub provider_config_ref: String,
    pub database: Reference,
    #[serde(default)]
    pub version: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ExtensionInstallationObservation {
    #[serde(rename = "installedVersion", default)]
    pub installed_version: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ExtensionInstallationStatus {
    #[serde(flatten)]
    pub conditions: Conditions,
    #[serde(rename = "atProvider", default)]
    pub at_provider: ExtensionInstallationObservation,
}
