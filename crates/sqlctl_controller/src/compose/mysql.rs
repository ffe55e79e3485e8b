//! Query composer (C3) for MySQL/MariaDB. Grounded in `SPEC_FULL.md`
//! 4.3's MySQL DDL summaries and scenario S5.

use sqlctl_core::{Query, SqlDialect};
use sqlctl_driver_mysql::MysqlDialect;

fn dialect() -> MysqlDialect {
    MysqlDialect
}

pub fn create_database(name: &str, character_set: Option<&str>, collate: Option<&str>) -> Query {
    let d = dialect();
    let mut sql = format!("CREATE DATABASE {}", d.quote_identifier(name));
    if let Some(cs) = character_set {
        sql.push_str(&format!(" CHARACTER SET {cs}"));
    }
    if let Some(collate) = collate {
        sql.push_str(&format!(" COLLATE {collate}"));
    }
    Query::raw(sql)
}

pub fn drop_database(name: &str) -> Query {
    let d = dialect();
    Query::raw(format!("DROP DATABASE IF EXISTS {}", d.quote_identifier(name)))
}

fn user_at_host(d: &MysqlDialect, user: &str, host: &str) -> String {
    format!("{}@{}", d.quote_value(user), d.quote_value(host))
}

pub fn create_user(user: &str, host: &str, password: &str) -> Query {
    let d = dialect();
    Query::raw(format!(
        "CREATE USER {} IDENTIFIED BY {}",
        user_at_host(&d, user, host),
        d.quote_value(password)
    ))
}

/// Scenario S5: password drift -> `ALTER USER 'alice'@'%' IDENTIFIED BY 'new'`.
pub fn alter_user_password(user: &str, host: &str, password: &str) -> Query {
    let d = dialect();
    Query::raw(format!(
        "ALTER USER {} IDENTIFIED BY {}",
        user_at_host(&d, user, host),
        d.quote_value(password)
    ))
}

pub fn drop_user(user: &str, host: &str) -> Query {
    let d = dialect();
    Query::raw(format!("DROP USER IF EXISTS {}", user_at_host(&d, user, host)))
}

pub fn create_grant(user: &str, host: &str, database: &str, table: Option<&str>, privileges: &[String]) -> Query {
    let d = dialect();
    let mut privs = privileges.to_vec();
    privs.sort();
    let target = match table {
        Some(table) => format!("{}.{}", d.quote_identifier(database), d.quote_identifier(table)),
        None => format!("{}.*", d.quote_identifier(database)),
    };
    Query::raw(format!(
        "GRANT {} ON {} TO {}",
        privs.join(", "),
        target,
        user_at_host(&d, user, host)
    ))
}

pub fn revoke_grant(user: &str, host: &str, database: &str, table: Option<&str>, privileges: &[String]) -> Query {
    let d = dialect();
    let mut privs = privileges.to_vec();
    privs.sort();
    let target = match table {
        Some(table) => format!("{}.{}", d.quote_identifier(database), d.quote_identifier(table)),
        None => format!("{}.*", d.quote_identifier(database)),
    };
    Query::raw(format!(
        "REVOKE {} ON {} FROM {}",
        privs.join(", "),
        target,
        user_at_host(&d, user, host)
    ))
}

/// Reads granted privileges as individual tokens via `information_schema`
/// rather than parsing `SHOW GRANTS`' free-form statement strings. Scoped
/// to a single table when one is given, otherwise the whole database.
pub fn read_privileges(user: &str, host: &str, database: &str, table: Option<&str>) -> Query {
    let d = dialect();
    let grantee = user_at_host(&d, user, host);
    match table {
        Some(table) => Query::with_params(
            "SELECT PRIVILEGE_TYPE FROM information_schema.TABLE_PRIVILEGES \
             WHERE GRANTEE = ? AND TABLE_SCHEMA = ? AND TABLE_NAME = ?",
            vec![grantee.into(), database.into(), table.into()],
        ),
        None => Query::with_params(
            "SELECT PRIVILEGE_TYPE FROM information_schema.SCHEMA_PRIVILEGES \
             WHERE GRANTEE = ? AND TABLE_SCHEMA = ?",
            vec![grantee.into(), database.into()],
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn s5_mysql_password_drift_alter() {
        let q = alter_user_password("alice", "%", "new");
        assert_eq!(q.sql, "ALTER USER 'alice'@'%' IDENTIFIED BY 'new'");
    }

    #[test]
    fn grant_targets_whole_database_without_table() {
        let q = create_grant("alice", "%", "db1", None, &["SELECT".to_string()]);
        assert_eq!(q.sql, "GRANT SELECT ON `db1`.* TO 'alice'@'%'");
    }

    #[test]
    fn read_privileges_without_table_queries_schema_privileges() {
        let q = read_privileges("alice", "%", "db1", None);
        assert!(q.sql.contains("information_schema.SCHEMA_PRIVILEGES"));
        assert_eq!(q.params.len(), 2);
    }

    #[test]
    fn read_privileges_with_table_queries_table_privileges() {
        let q = read_privileges("alice", "%", "db1", Some("t1"));
        assert!(q.sql.contains("information_schema.TABLE_PRIVILEGES"));
        assert_eq!(q.params.len(), 3);
    }
}
