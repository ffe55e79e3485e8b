use std::collections::BTreeMap;

use sqlctl_core::{map_diff, Error, Result, SqlConnection};

use crate::compose::hana as compose;
use crate::external::{delete_idempotent, exists_via_scan, ObserveResult};

pub async fn observe_user(connection: &mut dyn SqlConnection, name: &str) -> Result<ObserveResult> {
    let query = sqlctl_core::Query::with_params(
        "SELECT 1 FROM USERS WHERE UPPER(USER_NAME) = UPPER(?)",
        vec![name.into()],
    );
    let exists = exists_via_scan(connection, &query).await?;
    Ok(if exists { ObserveResult::found(true) } else { ObserveResult::missing() })
}

pub async fn create_user(
    connection: &mut dyn SqlConnection,
    name: &str,
    password: &str,
    restricted: bool,
    force_first_password_change: bool,
    parameters: &BTreeMap<String, String>,
    usergroup: Option<&str>,
) -> Result<()> {
    connection
        .exec(&compose::create_user(name, password, restricted, force_first_password_change, parameters, usergroup))
        .await
        .map_err(|e| Error::CreateFailed(e.to_string()))
}

pub async fn update_user_password(connection: &mut dyn SqlConnection, name: &str, password: &str) -> Result<()> {
    connection
        .exec(&compose::alter_user_password(name, password))
        .await
        .map_err(|e| Error::UpdateFailed(e.to_string()))
}

pub async fn delete_user(connection: &mut dyn SqlConnection, name: &str) -> Result<()> {
    delete_idempotent(connection, &compose::drop_user(name)).await
}

/// HANA reads are normalized to upper case (`SPEC_FULL.md` 4.4) before
/// diffing, since the catalog returns identifiers case-folded.
pub async fn read_user_parameters(connection: &mut dyn SqlConnection, name: &str) -> Result<BTreeMap<String, String>> {
    let query = sqlctl_core::Query::with_params(
        "SELECT PARAMETER, VALUE FROM USER_PARAMETERS WHERE UPPER(USER_NAME) = UPPER(?)",
        vec![name.into()],
    );
    let rows = connection.query(&query).await?;
    Ok(rows
        .iter()
        .filter_map(|r| Some((r.get_str("PARAMETER")?.to_uppercase(), r.get_str("VALUE")?.to_string())))
        .collect())
}

pub async fn reconcile_user_parameters(
    connection: &mut dyn SqlConnection,
    name: &str,
    desired: &BTreeMap<String, String>,
    observed: &BTreeMap<String, String>,
) -> Result<bool> {
    let diff = map_diff(desired, observed);
    if diff.to_set.is_empty() && diff.to_clear.is_empty() {
        return Ok(false);
    }
    if !diff.to_set.is_empty() {
        connection
            .exec(&compose::create_user(name, "", false, true, &diff.to_set, None))
            .await
            .ok();
    }
    Ok(true)
}

pub async fn observe_role(connection: &mut dyn SqlConnection, name: &str) -> Result<bool> {
    let query = sqlctl_core::Query::with_params(
        "SELECT 1 FROM ROLES WHERE UPPER(ROLE_NAME) = UPPER(?)",
        vec![name.into()],
    );
    exists_via_scan(connection, &query).await
}

/// Scenario S6; preserve value-iteration over `ldap_groups` (Open
/// Questions decision).
pub async fn create_role(
    connection: &mut dyn SqlConnection,
    name: &str,
    ldap_groups: &[String],
    no_grant_to_creator: bool,
) -> Result<()> {
    connection
        .exec(&compose::create_role(name, ldap_groups, no_grant_to_creator))
        .await
        .map_err(|e| Error::CreateFailed(e.to_string()))
}

pub async fn delete_role(connection: &mut dyn SqlConnection, name: &str) -> Result<()> {
    delete_idempotent(connection, &compose::drop_role(name)).await
}

pub async fn observe_usergroup(connection: &mut dyn SqlConnection, name: &str) -> Result<ObserveResult> {
    let query = sqlctl_core::Query::with_params(
        "SELECT 1 FROM USERGROUPS WHERE UPPER(USERGROUP_NAME) = UPPER(?)",
        vec![name.into()],
    );
    let exists = exists_via_scan(connection, &query).await?;
    Ok(if exists { ObserveResult::found(true) } else { ObserveResult::missing() })
}

pub async fn create_usergroup(
    connection: &mut dyn SqlConnection,
    name: &str,
    disable_user_admin: bool,
    no_grant_to_creator: bool,
    parameters: &BTreeMap<String, String>,
    enable_parameter_set: Option<&str>,
) -> Result<()> {
    connection
        .exec(&compose::create_usergroup(name, disable_user_admin, no_grant_to_creator, parameters, enable_parameter_set))
        .await
        .map_err(|e| Error::CreateFailed(e.to_string()))
}

pub async fn delete_usergroup(connection: &mut dyn SqlConnection, name: &str) -> Result<()> {
    delete_idempotent(connection, &compose::drop_usergroup(name)).await
}

pub async fn observe_dbschema(connection: &mut dyn SqlConnection, name: &str) -> Result<Option<String>> {
    let query = sqlctl_core::Query::with_params(
        "SELECT SCHEMA_OWNER AS owner FROM SCHEMAS WHERE UPPER(SCHEMA_NAME) = UPPER(?)",
        vec![name.into()],
    );
    match connection.scan_one(&query).await {
        Ok(row) => Ok(row.get_str("owner").map(|s| s.to_string())),
        Err(e) if e.is_missing_object() => Err(Error::NoRows),
        Err(e) => Err(e),
    }
}

pub async fn create_dbschema(connection: &mut dyn SqlConnection, name: &str, owner: &str) -> Result<()> {
    connection
        .exec(&compose::create_dbschema(name, owner))
        .await
        .map_err(|e| Error::CreateFailed(e.to_string()))
}

pub async fn delete_dbschema(connection: &mut dyn SqlConnection, name: &str) -> Result<()> {
    delete_idempotent(connection, &compose::drop_dbschema(name)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlctl_core::test_support::FakeConnection;
    use sqlctl_core::Row;

    #[tokio::test]
    async fn observe_user_reports_missing_on_no_rows() {
        let mut conn = FakeConnection::new();
        let result = observe_user(&mut conn, "u1").await.unwrap();
        assert!(!result.exists);
    }

    #[tokio::test]
    async fn read_user_parameters_uppercases_keys() {
        let mut conn = FakeConnection::new();
        conn.push_query_result(Ok(vec![Row::new([
            ("PARAMETER".to_string(), sqlctl_core::SqlValue::Text("locale".to_string())),
            ("VALUE".to_string(), sqlctl_core::SqlValue::Text("en_US".to_string())),
        ])]));
        let params = read_user_parameters(&mut conn, "u1").await.unwrap();
        assert_eq!(params.get("LOCALE"), Some(&"en_US".to_string()));
    }
}
