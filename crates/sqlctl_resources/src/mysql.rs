use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::common::Reference;
use crate::status::Conditions;

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "mysql.sql.internal",
    version = "v1alpha1",
    kind = "Database",
    plural = "databases",
    namespaced,
    status = "DatabaseStatus"
)]
pub struct DatabaseSpec {
    #[serde(rename = "providerConfigRef")]
    pub provider_config_ref: String,
    #[serde(rename = "characterSet", default)]
    pub character_set: Option<String>,
    #[serde(default)]
    pub collate: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct DatabaseObservation {
    pub exists: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct DatabaseStatus {
    #[serde(flatten)]
    pub conditions: Conditions,
    #[serde(rename = "atProvider", default)]
    pub at_provider: DatabaseObservation,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct UserSecretRef {
    pub name: String,
    pub namespace: String,
    #[serde(default = "default_password_key")]
    pub key: String,
}

fn default_password_key() -> String {
    "password".to_string()
}

/// Resource-option clauses rendered to canonical form and compared
/// against the last-observed clauses (`SPEC_FULL.md` 4.4, "Resource-options
/// diff").
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ResourceOptions {
    #[serde(rename = "maxQueriesPerHour", default)]
    pub max_queries_per_hour: Option<u32>,
    #[serde(rename = "maxUpdatesPerHour", default)]
    pub max_updates_per_hour: Option<u32>,
    #[serde(rename = "maxConnectionsPerHour", default)]
    pub max_connections_per_hour: Option<u32>,
    #[serde(rename = "maxUserConnections", default)]
    pub max_user_connections: Option<u32>,
}

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "mysql.sql.internal",
    version = "v1alpha1",
    kind = "User",
    plural = "users",
    namespaced,
    status = "UserStatus"
)]
pub struct UserSpec {
    #[serde(rename = "providerConfigRef")]
    pub provider_config_ref: String,
    #[serde(rename = "passwordSecretRef", default)]
    pub password_secret_ref: Option<UserSecretRef>,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(rename = "resourceOptions", default)]
    pub resource_options: ResourceOptions,
}

fn default_host() -> String {
    "%".to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct UserObservation {
    pub exists: bool,
    #[serde(rename = "appliedResourceOptions", default)]
    pub applied_resource_options: ResourceOptions,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct UserStatus {
    #[serde(flatten)]
    pub conditions: Conditions,
    #[serde(rename = "atProvider", default)]
    pub at_provider: UserObservation,
}

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "mysql.sql.internal",
    version = "v1alpha1",
    kind = "Grant",
    plural = "grants",
    namespaced,
    status = "GrantStatus"
)]
pub struct GrantSpec {
    #[serde(rename = "providerConfigRef")]
    pub provider_config_ref: String,
    pub user: Reference,
    #[serde(default = "default_host")]
    pub host: String,
    pub database: Reference,
    #[serde(default)]
    pub table: Option<String>,
    #[serde(default)]
    pub privileges: Vec<String>,
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
