use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::common::Reference;
use crate::status::Conditions;

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "mssql.sql.internal",
    version = "v1alpha1",
    kind = "Database",
    plural = "databases",
    namespaced,
    status = "DatabaseStatus"
)]
pub struct DatabaseSpec {
    #[serde(rename = "providerConfigRef")]
    pub provider_config_ref: String,
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
pub struct LoginSecretRef {
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
    group = "mssql.sql.internal",
    version = "v1alpha1",
    kind = "Login",
    plural = "logins",
    namespaced,
    status = "LoginStatus"
)]
pub struct LoginSpec {
    #[serde(rename = "providerConfigRef")]
    pub provider_config_ref: String,
    #[serde(rename = "passwordSecretRef", default)]
    pub password_secret_ref: Option<LoginSecretRef>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct LoginObservation {
    pub exists: bool,
    #[serde(rename = "passwordChangedAt", default)]
    pub password_changed_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct LoginStatus {
    #[serde(flatten)]
    pub conditions: Conditions,
    #[serde(rename = "atProvider", default)]
    pub at_provider: LoginObservation,
}

/// MSSQL user type (`SPEC_FULL.md` section 3): local (tied to a server
/// Login), AD-backed, or contained (authenticates inside one database
/// with no server-level login — forbids `loginDatabase*`, see invariants).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum UserType {
    Local,
    #[serde(rename = "AD")]
    ActiveDirectory,
    Contained,
}

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "mssql.sql.internal",
    version = "v1alpha1",
    kind = "User",
    plural = "users",
    namespaced,
    status = "UserStatus"
)]
pub struct UserSpec {
    #[serde(rename = "providerConfigRef")]
    pub provider_config_ref: String,
    #[serde(rename = "type")]
    pub user_type: UserType,
    pub database: Reference,
    #[serde(rename = "loginDatabase", default)]
    pub login_database: Option<String>,
    #[serde(rename = "loginRef", default)]
    pub login_ref: Option<Reference>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct UserObservation {
    pub exists: bool,
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
    group = "mssql.sql.internal",
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
    pub database: Reference,
    #[serde(default)]
    pub schema: Option<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct GrantObservation {
    #[serde(default)]
    pub permissions: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct GrantStatus {
    #[serde(flatten)]
    pub conditions: Conditions,
    #[serde(rename = "atProvider", default)]
    pub at_provider: GrantObservation,
}
