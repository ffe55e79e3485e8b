use sqlctl_core::{set_diff, sets_match, Error, Result, SqlConnection};

use crate::compose::mssql as compose;
use crate::external::{delete_idempotent, exists_via_scan, ObserveResult};

pub async fn observe_database(connection: &mut dyn SqlConnection, name: &str) -> Result<ObserveResult> {
    let query = sqlctl_core::Query::with_params(
        "SELECT 1 FROM sys.databases WHERE name = ?",
        vec![name.into()],
    );
    let exists = exists_via_scan(connection, &query).await?;
    Ok(if exists { ObserveResult::found(true) } else { ObserveResult::missing() })
}

pub async fn create_database(connection: &mut dyn SqlConnection, name: &str) -> Result<()> {
    connection
        .exec(&compose::create_database(name))
        .await
        .map_err(|e| Error::CreateFailed(e.to_string()))
}

pub async fn delete_database(connection: &mut dyn SqlConnection, name: &str) -> Result<()> {
    delete_idempotent(connection, &compose::drop_database(name)).await
}

pub async fn observe_login(connection: &mut dyn SqlConnection, name: &str) -> Result<bool> {
    let query = sqlctl_core::Query::with_params(
        "SELECT 1 FROM sys.server_principals WHERE name = ?",
        vec![name.into()],
    );
    exists_via_scan(connection, &query).await
}

/// Scenario S3: login creation runs against the login database, always
/// followed (by the caller, using the other connection) by
/// `create_local_user` against the target database.
pub async fn create_login(connection: &mut dyn SqlConnection, name: &str, password: &str) -> Result<()> {
    connection
        .exec(&compose::create_login(name, password))
        .await
        .map_err(|e| Error::CreateFailed(e.to_string()))
}

pub async fn update_login_password(connection: &mut dyn SqlConnection, name: &str, password: &str) -> Result<()> {
    connection
        .exec(&compose::alter_login_password(name, password))
        .await
        .map_err(|e| Error::UpdateFailed(e.to_string()))
}

/// `SPEC_FULL.md` scenario S4: active sessions for the login are killed
/// one by one before the login itself is dropped; any kill failure
/// aborts the whole delete.
pub async fn kill_active_sessions(connection: &mut dyn SqlConnection, login_name: &str) -> Result<()> {
    let rows = connection
        .query(&compose::read_active_sessions(login_name))
        .await
        .map_err(|e| Error::CannotKillSession(e.to_string()))?;
    for row in rows {
        if let Some(sqlctl_core::SqlValue::Int(session_id)) = row.get("session_id") {
            connection
                .exec(&compose::kill_session(*session_id))
                .await
                .map_err(|e| Error::CannotKillSession(e.to_string()))?;
        }
    }
    Ok(())
}

pub async fn delete_login(connection: &mut dyn SqlConnection, name: &str) -> Result<()> {
    delete_idempotent(connection, &compose::drop_login(name)).await
}

pub async fn observe_user(connection: &mut dyn SqlConnection, name: &str) -> Result<bool> {
    let query = sqlctl_core::Query::with_params(
        "SELECT 1 FROM sys.database_principals WHERE name = ?",
        vec![name.into()],
    );
    exists_via_scan(connection, &query).await
}

pub async fn create_local_user(connection: &mut dyn SqlConnection, name: &str, login_name: &str) -> Result<()> {
    connection
        .exec(&compose::create_local_user(name, login_name))
        .await
        .map_err(|e| Error::CreateFailed(e.to_string()))
}

pub async fn create_ad_user(connection: &mut dyn SqlConnection, name: &str) -> Result<()> {
    connection
        .exec(&compose::create_ad_user(name))
        .await
        .map_err(|e| Error::CreateFailed(e.to_string()))
}

pub async fn create_contained_user(connection: &mut dyn SqlConnection, name: &str, password: &str) -> Result<()> {
    connection
        .exec(&compose::create_contained_user(name, password))
        .await
        .map_err(|e| Error::CreateFailed(e.to_string()))
}

pub async fn delete_user(connection: &mut dyn SqlConnection, name: &str) -> Result<()> {
    delete_idempotent(connection, &compose::drop_user(name)).await
}

/// Synthetic `CONNECT` permission is granted implicitly by MSSQL and is
/// never part of the diff (`SPEC_FULL.md` 4.4).
pub fn strip_implicit_connect(permissions: &[String]) -> Vec<String> {
    permissions
        .iter()
        .filter(|p| !p.eq_ignore_ascii_case("CONNECT"))
        .cloned()
        .collect()
}

pub async fn read_permissions(
    connection: &mut dyn SqlConnection,
    principal: &str,
    schema: Option<&str>,
) -> Result<Vec<String>> {
    let rows = connection
        .query(&compose::read_permissions(principal, schema))
        .await
        .map_err(|e| Error::CannotGetGrants(e.to_string()))?;
    Ok(rows.iter().filter_map(|r| r.get_str("permission_name").map(|s| s.to_string())).collect())
}

/// `SPEC_FULL.md` 4.5 Update contract: toGrant/toRevoke lists sorted
/// before emission for reproducible DDL (already handled by the composer
/// internally); here we only need the set diff with CONNECT stripped.
pub async fn reconcile_grant(
    connection: &mut dyn SqlConnection,
    user: &str,
    schema: Option<&str>,
    desired_permissions: &[String],
    observed_permissions: &[String],
) -> Result<bool> {
    let observed = strip_implicit_connect(observed_permissions);
    if sets_match(desired_permissions, &observed) {
        return Ok(false);
    }
    let (to_add, to_remove) = set_diff(desired_permissions, &observed);
    if !to_remove.is_empty() {
        connection
            .exec(&compose::revoke_grant(user, schema, &to_remove))
            .await
            .map_err(|e| Error::UpdateFailed(e.to_string()))?;
    }
    if !to_add.is_empty() {
        connection
            .exec(&compose::create_grant(user, schema, &to_add))
            .await
            .map_err(|e| Error::UpdateFailed(e.to_string()))?;
    }
    Ok(true)
}

pub async fn delete_grant(
    connection: &mut dyn SqlConnection,
    user: &str,
    schema: Option<&str>,
    permissions: &[String],
) -> Result<()> {
    delete_idempotent(connection, &compose::revoke_grant(user, schema, permissions)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlctl_core::test_support::FakeConnection;
    use sqlctl_core::Row;

    #[test]
    fn strip_implicit_connect_is_case_insensitive() {
        let permissions = vec!["connect".to_string(), "SELECT".to_string()];
        assert_eq!(strip_implicit_connect(&permissions), vec!["SELECT".to_string()]);
    }

    /// Scenario S4: two active sessions -> two KILLs in order.
    #[tokio::test]
    async fn s4_kill_active_sessions_before_drop() {
        let mut conn = FakeConnection::new();
        conn.push_query_result(Ok(vec![
            Row::new([("session_id".to_string(), sqlctl_core::SqlValue::Int(17))]),
            Row::new([("session_id".to_string(), sqlctl_core::SqlValue::Int(42))]),
        ]));
        kill_active_sessions(&mut conn, "alice").await.unwrap();
        // FakeConnection.query pops the single queued result for the one
        // query call; KILL statements are separate `exec` calls recorded
        // in order after it.
        let statements = conn.executed_statements();
        assert!(statements.iter().any(|s| s == "KILL 17"));
        assert!(statements.iter().any(|s| s == "KILL 42"));
    }

    #[tokio::test]
    async fn reconcile_grant_ignores_implicit_connect_difference() {
        let mut conn = FakeConnection::new();
        let changed = reconcile_grant(
            &mut conn, "alice", None,
            &["SELECT".to_string()],
            &["SELECT".to_string(), "CONNECT".to_string()],
        ).await.unwrap();
        assert!(!changed);
        assert!(conn.executed_statements().is_empty());
    }
}
