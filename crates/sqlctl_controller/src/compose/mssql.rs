//! Query composer (C3) for Microsoft SQL Server. Grounded in
//! `SPEC_FULL.md` 4.3's MSSQL DDL summaries and scenarios S3/S4.

use sqlctl_core::{Query, SqlDialect};
use sqlctl_driver_mssql::MssqlDialect;

fn dialect() -> MssqlDialect {
    MssqlDialect
}

pub fn create_database(name: &str) -> Query {
    let d = dialect();
    Query::raw(format!("CREATE DATABASE {}", d.quote_identifier(name)))
}

pub fn drop_database(name: &str) -> Query {
    let d = dialect();
    Query::raw(format!("DROP DATABASE IF EXISTS {}", d.quote_identifier(name)))
}

/// Scenario S3: `CREATE LOGIN [alice] WITH PASSWORD='p@ss'`, run against
/// the login database.
pub fn create_login(name: &str, password: &str) -> Query {
    let d = dialect();
    Query::raw(format!(
        "CREATE LOGIN {} WITH PASSWORD={}",
        d.quote_identifier(name),
        d.quote_value(password)
    ))
}

pub fn alter_login_password(name: &str, password: &str) -> Query {
    let d = dialect();
    Query::raw(format!(
        "ALTER LOGIN {} WITH PASSWORD={}",
        d.quote_identifier(name),
        d.quote_value(password)
    ))
}

pub fn drop_login(name: &str) -> Query {
    let d = dialect();
    Query::raw(format!("DROP LOGIN {}", d.quote_identifier(name)))
}

/// Scenario S3: `CREATE USER [alice] FOR LOGIN [bob]`, run against the
/// target database. `name` is the database user, `login_name` the
/// server-level login it maps onto — these differ whenever the `User`
/// object's external name doesn't match its referenced `Login`'s.
pub fn create_local_user(name: &str, login_name: &str) -> Query {
    let d = dialect();
    Query::raw(format!(
        "CREATE USER {} FOR LOGIN {}",
        d.quote_identifier(name),
        d.quote_identifier(login_name)
    ))
}

pub fn create_ad_user(name: &str) -> Query {
    let d = dialect();
    Query::raw(format!("CREATE USER {} FROM EXTERNAL PROVIDER", d.quote_identifier(name)))
}

pub fn create_contained_user(name: &str, password: &str) -> Query {
    let d = dialect();
    Query::raw(format!(
        "CREATE USER {} WITH PASSWORD={}",
        d.quote_identifier(name),
        d.quote_value(password)
    ))
}

pub fn drop_user(name: &str) -> Query {
    let d = dialect();
    Query::raw(format!("DROP USER IF EXISTS {}", d.quote_identifier(name)))
}

/// Scenario S4: one `KILL <id>` per active session, run before dropping
/// the user/login.
pub fn kill_session(session_id: i64) -> Query {
    Query::raw(format!("KILL {session_id}"))
}

pub fn read_active_sessions(login_name: &str) -> Query {
    Query::with_params(
        "SELECT session_id FROM sys.dm_exec_sessions WHERE login_name = ?",
        vec![login_name.into()],
    )
}

pub fn create_grant(user: &str, schema: Option<&str>, permissions: &[String]) -> Query {
    let d = dialect();
    let mut perms = permissions.to_vec();
    perms.sort();
    let scope = match schema {
        Some(schema) => format!(" ON SCHEMA::{}", d.quote_identifier(schema)),
        None => String::new(),
    };
    Query::raw(format!(
        "GRANT {}{} TO {}",
        perms.join(", "),
        scope,
        d.quote_identifier(user)
    ))
}

pub fn revoke_grant(user: &str, schema: Option<&str>, permissions: &[String]) -> Query {
    let d = dialect();
    let mut perms = permissions.to_vec();
    perms.sort();
    let scope = match schema {
        Some(schema) => format!(" ON SCHEMA::{}", d.quote_identifier(schema)),
        None => String::new(),
    };
    Query::raw(format!(
        "REVOKE {}{} FROM {}",
        perms.join(", "),
        scope,
        d.quote_identifier(user)
    ))
}

/// Property #7: with a schema, class = 3 and filters by schema name;
/// without one, class = 0 (database-wide permissions).
pub fn read_permissions(principal: &str, schema: Option<&str>) -> Query {
    let d = dialect();
    let base = "SELECT pe.permission_name FROM sys.database_permissions pe \
                JOIN sys.database_principals pr ON pr.principal_id = pe.grantee_principal_id";
    match schema {
        Some(schema) => Query::raw(format!(
            "{base} JOIN sys.schemas s ON s.schema_id = pe.major_id \
             WHERE pe.class = 3 AND s.name = {} AND pr.name = {}",
            d.quote_value(schema),
            d.quote_value(principal)
        )),
        None => Query::raw(format!(
            "{base} WHERE pe.class = 0 AND pr.name = {}",
            d.quote_value(principal)
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn s3_mssql_create_login_and_user() {
        let login = create_login("alice", "p@ss");
        assert_eq!(login.sql, "CREATE LOGIN [alice] WITH PASSWORD='p@ss'");
        let user = create_local_user("alice", "alice");
        assert_eq!(user.sql, "CREATE USER [alice] FOR LOGIN [alice]");
    }

    #[test]
    fn create_local_user_maps_to_a_differently_named_login() {
        let user = create_local_user("alice", "svc_login");
        assert_eq!(user.sql, "CREATE USER [alice] FOR LOGIN [svc_login]");
    }

    #[test]
    fn s4_mssql_kill_sessions_before_drop() {
        assert_eq!(kill_session(17).sql, "KILL 17");
        assert_eq!(kill_session(42).sql, "KILL 42");
        assert_eq!(drop_user("alice").sql, "DROP USER IF EXISTS [alice]");
        assert_eq!(drop_login("alice").sql, "DROP LOGIN [alice]");
    }

    #[test]
    fn property7_permissions_read_distinguishes_schema_scope() {
        let with_schema = read_permissions("alice", Some("dbo"));
        assert!(with_schema.sql.contains("pe.class = 3"));
        assert!(with_schema.sql.contains("s.name = 'dbo'"));

        let without_schema = read_permissions("alice", None);
        assert!(without_schema.sql.contains("pe.class = 0"));
        assert!(!without_schema.sql.contains("s.name"));
    }
}
