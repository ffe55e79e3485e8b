use std::collections::BTreeMap;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::common::Reference;
use crate::status::Conditions;

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

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "hana.sql.internal",
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
    #[serde(default)]
    pub restricted: bool,
    #[serde(rename = "forceFirstPasswordChange", default = "default_true")]
    pub force_first_password_change: bool,
    /// Keys are filtered against the whitelist named in `SPEC_FULL.md`
    /// 4.3 ({CLIENT, LOCALE, TIME ZONE, EMAIL ADDRESS, STATEMENT MEMORY
    /// LIMIT, STATEMENT THREAD LIMIT}) by the query composer, not here.
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
    #[serde(default)]
    pub usergroup: Option<Reference>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct UserObservation {
    pub exists: bool,
    #[serde(rename = "passwordChangedAt", default)]
    pub password_changed_at: Option<chrono::DateTime<chrono::Utc>>,
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
    group = "hana.sql.internal",
    version = "v1alpha1",
    kind = "Role",
    plural = "roles",
    namespaced,
    status = "RoleStatus"
)]
pub struct RoleSpec {
    #[serde(rename = "providerConfigRef")]
    pub provider_config_ref: String,
    #[serde(rename = "ldapGroups", default)]
    pub ldap_groups: Vec<String>,
    #[serde(rename = "noGrantToCreator", default)]
    pub no_grant_to_creator: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct RoleObservation {
    pub exists: bool,
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
    group = "hana.sql.internal",
    version = "v1alpha1",
    kind = "Usergroup",
    plural = "usergroups",
    namespaced,
    status = "UsergroupStatus"
)]
pub struct UsergroupSpec {
    #[serde(rename = "providerConfigRef")]
    pub provider_config_ref: String,
    #[serde(rename = "disableUserAdmin", default)]
    pub disable_user_admin: bool,
    #[serde(rename = "noGrantToCreator", default)]
    pub no_grant_to_creator: bool,
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
    #[serde(rename = "enableParameterSet", default)]
    pub enable_parameter_set: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct UsergroupObservation {
    pub exists: bool,
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct UsergroupStatus {
    #[serde(flatten)]
    pub conditions: Conditions,
    #[serde(rename = "atProvider", default)]
    pub at_provider: UsergroupObservation,
}

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "hana.sql.internal",
    version = "v1alpha1",
    kind = "DbSchema",
    plural = "dbschemas",
    namespaced,
    status = "DbSchemaStatus"
)]
pub struct DbSchemaSpec {
    #[serde(rename = "providerConfigRef")]
    pub provider_config_ref: String,
    pub owner: Reference,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct DbSchemaObservation {
    pub exists: bool,
    #[serde(default)]
    pub owner: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct DbSchemaStatus {
    #[serde(flatten)]
    pub conditions: Conditions,
    #[serde(rename = "atProvider", default)]
    pub at_provider: DbSchemaObservation,
}
