use sqlctl_core::{set_diff, sets_match, Error, Result, SqlConnection};

use crate::compose::mysql as compose;
use crate::external::{delete_idempotent, exists_via_scan, ObserveResult};

pub async fn observe_database(connection: &mut dyn SqlConnection, name: &str) -> Result<ObserveResult> {
    let query = sqlctl_core::Query::with_params(
        "SELECT 1 FROM information_schema.schemata WHERE schema_name = ?",
        vec![name.into()],
    );
    let exists = exists_via_scan(connection, &query).await?;
    Ok(if exists { ObserveResult::found(true) } else { ObserveResult::missing() })
}

pub async fn create_database(
    connection: &mut dyn SqlConnection,
    name: &str,
    character_set: Option<&str>,
    collate: Option<&str>,
) -> Result<()> {
    connection
        .exec(&compose::create_database(name, character_set, collate))
        .await
        .map_err(|e| Error::CreateFailed(e.to_string()))
}

pub async fn delete_database(connection: &mut dyn SqlConnection, name: &str) -> Result<()> {
    delete_idempotent(connection, &compose::drop_database(name)).await
}

pub async fn observe_user(connection: &mut dyn SqlConnection, user: &str, host: &str) -> Result<bool> {
    let query = sqlctl_core::Query::with_params(
        "SELECT 1 FROM mysql.user WHERE User = ? AND Host = ?",
        vec![user.into(), host.into()],
    );
    exists_via_scan(connection, &query).await
}

pub async fn create_user(connection: &mut dyn SqlConnection, user: &str, host: &str, password: &str) -> Result<()> {
    connection
        .exec(&compose::create_user(user, host, password))
        .await
        .map_err(|e| Error::CreateFailed(e.to_string()))
}

/// Scenario S5: password-drift -> `ALTER USER ... IDENTIFIED BY ...`.
pub async fn update_user_password(
    connection: &mut dyn SqlConnection,
    user: &str,
    host: &str,
    spec_password: &str,
    connection_details_password: &str,
) -> Result<bool> {
    if !sqlctl_core::password_drift(spec_password, connection_details_password) {
        return Ok(false);
    }
    connection
        .exec(&compose::alter_user_password(user, host, spec_password))
        .await
        .map_err(|e| Error::UpdateFailed(e.to_string()))?;
    Ok(true)
}

pub async fn delete_user(connection: &mut dyn SqlConnection, user: &str, host: &str) -> Result<()> {
    delete_idempotent(connection, &compose::drop_user(user, host)).await
}

/// Resource-options diff (`SPEC_FULL.md` 4.4): render desired clauses and
/// compare against the last-observed canonical clauses; no SQL is issued
/// when they already match. The actual `SET ... clause` is applied via
/// a single `ALTER USER` statement combining every drifted clause, not
/// per-clause, since MySQL only accepts one `WITH` resource clause list
/// per statement.
pub fn resource_option_clauses(options: &sqlctl_resources::mysql::ResourceOptions) -> Vec<String> {
    let mut clauses = Vec::new();
    if let Some(n) = options.max_queries_per_hour {
        clauses.push(format!("MAX_QUERIES_PER_HOUR {n}"));
    }
    if let Some(n) = options.max_updates_per_hour {
        clauses.push(format!("MAX_UPDATES_PER_HOUR {n}"));
    }
    if let Some(n) = options.max_connections_per_hour {
        clauses.push(format!("MAX_CONNECTIONS_PER_HOUR {n}"));
    }
    if let Some(n) = options.max_user_connections {
        clauses.push(format!("MAX_USER_CONNECTIONS {n}"));
    }
    clauses
}

pub async fn update_resource_options(
    connection: &mut dyn SqlConnection,
    user: &str,
    host: &str,
    desired: &sqlctl_resources::mysql::ResourceOptions,
    observed_clauses: &[String],
) -> Result<bool> {
    let desired_clauses = resource_option_clauses(desired);
    if sets_match(&desired_clauses, observed_clauses) {
        return Ok(false);
    }
    let d = sqlctl_driver_mysql::MysqlDialect;
    use sqlctl_core::SqlDialect;
    let sql = format!(
        "ALTER USER {}@{} WITH {}",
        d.quote_value(user),
        d.quote_value(host),
        desired_clauses.join(" ")
    );
    connection
        .exec(&sqlctl_core::Query::raw(sql))
        .await
        .map_err(|e| Error::UpdateFailed(e.to_string()))?;
    Ok(true)
}

pub async fn read_privileges(
    connection: &mut dyn SqlConnection,
    user: &str,
    host: &str,
    database: &str,
    table: Option<&str>,
) -> Result<Vec<String>> {
    let rows = connection.query(&compose::read_privileges(user, host, database, table)).await?;
    Ok(rows.iter().filter_map(|r| r.get_str("PRIVILEGE_TYPE").map(|s| s.to_string())).collect())
}

pub async fn reconcile_grant(
    connection: &mut dyn SqlConnection,
    user: &str,
    host: &str,
    database: &str,
    table: Option<&str>,
    desired_privileges: &[String],
    observed_privileges: &[String],
) -> Result<bool> {
    if sets_match(desired_privileges, observed_privileges) {
        return Ok(false);
    }
    let (to_add, to_remove) = set_diff(desired_privileges, observed_privileges);
    if !to_remove.is_empty() {
        connection
            .exec(&compose::revoke_grant(user, host, database, table, &to_remove))
            .await
            .map_err(|e| Error::UpdateFailed(e.to_string()))?;
    }
    if !to_add.is_empty() {
        connection
            .exec(&compose::create_grant(user, host, database, table, &to_add))
            .await
            .map_err(|e| Error::UpdateFailed(e.to_string()))?;
    }
    Ok(true)
}

pub async fn delete_grant(
    connection: &mut dyn SqlConnection,
    user: &str,
    host: &str,
    database: &str,
    table: Option<&str>,
    privileges: &[String],
) -> Result<()> {
    delete_idempotent(connection, &compose::revoke_grant(user, host, database, table, privileges)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlctl_core::test_support::FakeConnection;

    #[tokio::test]
    async fn reconcile_grant_is_noop_when_up_to_date() {
        let mut conn = FakeConnection::new();
        let changed = reconcile_grant(
            &mut conn, "alice", "%", "db1", None,
            &["SELECT".to_string()], &["SELECT".to_string()],
        ).await.unwrap();
        assert!(!changed);
        assert!(conn.executed_statements().is_empty());
    }

    #[tokio::test]
    async fn update_user_password_is_noop_without_drift() {
        let mut conn = FakeConnection::new();
        let changed = update_user_password(&mut conn, "alice", "%", "same", "same").await.unwrap();
        assert!(!changed);
        assert!(conn.executed_statements().is_empty());
    }

    /// Scenario S5.
    #[tokio::test]
    async fn s5_update_user_password_alters_on_drift() {
        let mut conn = FakeConnection::new();
        let changed = update_user_password(&mut conn, "alice", "%", "new", "old").await.unwrap();
        assert!(changed);
        assert_eq!(conn.executed_statements(), vec!["ALTER USER 'alice'@'%' IDENTIFIED BY 'new'".to_string()]);
    }

    #[test]
    fn resource_option_clauses_renders_only_set_fields() {
        let mut options = sqlctl_resources::mysql::ResourceOptions::default();
        options.max_queries_per_hour = Some(100);
        let clauses = resource_option_clauses(&options);
        assert_eq!(clauses, vec!["MAX_QUERIES_PER_HOUR 100".to_string()]);
    }
}
