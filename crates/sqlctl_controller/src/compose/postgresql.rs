//! Query composer (C3) for the Postgres dialect. Pure functions: given a
//! spec (and sometimes an observation), produce a `Query` or `Transaction`
//! with every identifier/literal already quoted. Grounded in
//! `SPEC_FULL.md` 4.3's DDL-shape summaries and scenarios S1/S2.

use sqlctl_core::{DefaultSqlDialect, Query, SqlDialect, Transaction};

fn dialect() -> DefaultSqlDialect {
    DefaultSqlDialect
}

fn sorted_privileges(privileges: &[String]) -> Vec<String> {
    let mut sorted = privileges.to_vec();
    sorted.sort();
    sorted
}

pub fn create_database(name: &str) -> Query {
    let d = dialect();
    Query::raw(format!("CREATE DATABASE {}", d.quote_identifier(name)))
}

pub fn drop_database(name: &str) -> Query {
    let d = dialect();
    Query::raw(format!("DROP DATABASE IF EXISTS {}", d.quote_identifier(name)))
}

pub fn database_exists_query(name: &str) -> Query {
    Query::with_params(
        "SELECT 1 FROM pg_database WHERE datname = $1",
        vec![name.into()],
    )
}

pub fn create_role(name: &str, password: Option<&str>, connection_limit: Option<i32>) -> Query {
    let d = dialect();
    let mut sql = format!("CREATE ROLE {} WITH LOGIN", d.quote_identifier(name));
    if let Some(password) = password {
        sql.push_str(&format!(" PASSWORD {}", d.quote_value(password)));
    }
    if let Some(limit) = connection_limit {
        sql.push_str(&format!(" CONNECTION LIMIT {limit}"));
    }
    Query::raw(sql)
}

pub fn alter_role_password(name: &str, password: &str) -> Query {
    let d = dialect();
    Query::raw(format!(
        "ALTER ROLE {} WITH PASSWORD {}",
        d.quote_identifier(name),
        d.quote_value(password)
    ))
}

pub fn drop_role(name: &str) -> Query {
    let d = dialect();
    Query::raw(format!("DROP ROLE IF EXISTS {}", d.quote_identifier(name)))
}

pub fn role_exists_query(name: &str) -> Query {
    Query::with_params("SELECT 1 FROM pg_roles WHERE rolname = $1", vec![name.into()])
}

/// `SPEC_FULL.md` 4.3 "Postgres grant create": role-member form when
/// `database`/`schema` are absent, database-or-schema form otherwise.
pub enum GrantTarget<'a> {
    RoleMember { member_of: &'a str },
    Database { database: &'a str },
    Schema { database: &'a str, schema: &'a str },
}

pub fn create_grant(role: &str, target: &GrantTarget, privileges: &[String], with_grant_option: bool) -> Query {
    let d = dialect();
    match target {
        GrantTarget::RoleMember { member_of } => {
            let mut sql = format!(
                "GRANT {} TO {}",
                d.quote_identifier(member_of),
                d.quote_identifier(role)
            );
            if with_grant_option {
                sql.push_str(" WITH ADMIN OPTION");
            }
            Query::raw(sql)
        }
        GrantTarget::Database { database } => {
            let privs = sorted_privileges(privileges).join(", ");
            let mut sql = format!(
                "GRANT {} ON DATABASE {} TO {}",
                privs,
                d.quote_identifier(database),
                d.quote_identifier(role)
            );
            if with_grant_option {
                sql.push_str(" WITH GRANT OPTION");
            }
            Query::raw(sql)
        }
        GrantTarget::Schema { database, schema } => {
            let privs = sorted_privileges(privileges).join(", ");
            let mut sql = format!(
                "GRANT {} ON SCHEMA {}.{} TO {}",
                privs,
                d.quote_identifier(database),
                d.quote_identifier(schema),
                d.quote_identifier(role)
            );
            if with_grant_option {
                sql.push_str(" WITH GRANT OPTION");
            }
            Query::raw(sql)
        }
    }
}

pub fn revoke_grant(role: &str, target: &GrantTarget, privileges: &[String]) -> Query {
    let d = dialect();
    match target {
        GrantTarget::RoleMember { member_of } => Query::raw(format!(
            "REVOKE {} FROM {}",
            d.quote_identifier(member_of),
            d.quote_identifier(role)
        )),
        GrantTarget::Database { database } => {
            let privs = sorted_privileges(privileges).join(", ");
            Query::raw(format!(
                "REVOKE {} ON DATABASE {} FROM {}",
                privs,
                d.quote_identifier(database),
                d.quote_identifier(role)
            ))
        }
        GrantTarget::Schema { database, schema } => {
            let privs = sorted_privileges(privileges).join(", ");
            Query::raw(format!(
                "REVOKE {} ON SCHEMA {}.{} FROM {}",
                privs,
                d.quote_identifier(database),
                d.quote_identifier(schema),
                d.quote_identifier(role)
            ))
        }
    }
}

pub fn read_role_membership(role: &str) -> Query {
    Query::with_params(
        "SELECT r.rolname FROM pg_auth_members m \
         JOIN pg_roles r ON r.oid = m.roleid \
         JOIN pg_roles member ON member.oid = m.member \
         WHERE member.rolname = $1",
        vec![role.into()],
    )
}

/// Privilege names GRANT ON DATABASE actually accepts (`SPEC_FULL.md`
/// section 6's Postgres privilege enum, restricted to the subset a
/// database target supports).
const DATABASE_GRANTABLE_PRIVILEGES: &[&str] = &["CREATE", "CONNECT", "TEMPORARY"];

/// Subset of the privilege enum a schema target supports.
const SCHEMA_GRANTABLE_PRIVILEGES: &[&str] = &["CREATE", "USAGE"];

/// One round trip, probing every database-grantable privilege through
/// `has_database_privilege` and returning the ones currently held.
pub fn read_database_privileges(role: &str, database: &str) -> Query {
    Query::with_params(
        &format!(
            "SELECT privilege FROM unnest(ARRAY[{}]) AS privilege \
             WHERE has_database_privilege($1, $2, privilege)",
            DATABASE_GRANTABLE_PRIVILEGES.iter().map(|p| format!("'{p}'")).collect::<Vec<_>>().join(", ")
        ),
        vec![role.into(), database.into()],
    )
}

/// Same shape as [`read_database_privileges`], scoped to a schema via
/// `has_schema_privilege`.
pub fn read_schema_privileges(role: &str, schema: &str) -> Query {
    Query::with_params(
        &format!(
            "SELECT privilege FROM unnest(ARRAY[{}]) AS privilege \
             WHERE has_schema_privilege($1, $2, privilege)",
            SCHEMA_GRANTABLE_PRIVILEGES.iter().map(|p| format!("'{p}'")).collect::<Vec<_>>().join(", ")
        ),
        vec![role.into(), schema.into()],
    )
}

/// Always a two-statement transaction: REVOKE ALL, then GRANT. See
/// `SPEC_FULL.md` scenario S4's sibling, the default-privileges shape in
/// 4.3, and testable property #4.
pub fn create_default_privileges(
    role: &str,
    target_role: &str,
    schema: Option<&str>,
    object_type: &str,
    privileges: &[String],
    with_grant_option: bool,
) -> Transaction {
    let d = dialect();
    let scope = match schema {
        Some(schema) => format!(" IN SCHEMA {}", d.quote_identifier(schema)),
        None => String::new(),
    };
    let object_type_upper = object_type.to_uppercase();
    let revoke = Query::raw(format!(
        "ALTER DEFAULT PRIVILEGES FOR ROLE {}{} REVOKE ALL ON {}S FROM {}",
        d.quote_identifier(target_role),
        scope,
        object_type_upper,
        d.quote_identifier(role)
    ));
    let mut grant_sql = format!(
        "ALTER DEFAULT PRIVILEGES FOR ROLE {}{} GRANT {} ON {}S TO {}",
        d.quote_identifier(target_role),
        scope,
        sorted_privileges(privileges).join(", "),
        object_type_upper,
        d.quote_identifier(role)
    );
    if with_grant_option {
        grant_sql.push_str(" WITH GRANT OPTION");
    }
    vec![revoke, Query::raw(grant_sql)]
}

pub fn read_default_privileges(role: &str, object_type_char: &str) -> Query {
    Query::with_params(
        "SELECT DISTINCT privilege_type FROM pg_roles \
         JOIN (SELECT defaclnamespace, (aclexplode(defaclacl)).* \
               FROM pg_default_acl WHERE defaclobjtype = $1) a ON oid = a.grantee \
         WHERE rolname = $2",
        vec![object_type_char.into(), role.into()],
    )
}

pub fn create_schema(name: &str, owner: &str) -> Query {
    let d = dialect();
    Query::raw(format!(
        "CREATE SCHEMA {} AUTHORIZATION {}",
        d.quote_identifier(name),
        d.quote_identifier(owner)
    ))
}

pub fn alter_schema_owner(name: &str, owner: &str) -> Query {
    let d = dialect();
    Query::raw(format!(
        "ALTER SCHEMA {} OWNER TO {}",
        d.quote_identifier(name),
        d.quote_identifier(owner)
    ))
}

pub fn revoke_public_on_schema(name: &str) -> Query {
    let d = dialect();
    Query::raw(format!(
        "REVOKE ALL ON SCHEMA {} FROM PUBLIC",
        d.quote_identifier(name)
    ))
}

pub fn drop_schema(name: &str) -> Query {
    let d = dialect();
    Query::raw(format!("DROP SCHEMA IF EXISTS {} CASCADE", d.quote_identifier(name)))
}

pub fn create_extension(name: &str, version: Option<&str>) -> Query {
    let d = dialect();
    let mut sql = format!("CREATE EXTENSION IF NOT EXISTS {}", d.quote_identifier(name));
    if let Some(version) = version {
        sql.push_str(&format!(" VERSION {}", d.quote_value(version)));
    }
    Query::raw(sql)
}

pub fn drop_extension(name: &str) -> Query {
    let d = dialect();
    Query::raw(format!("DROP EXTENSION IF EXISTS {}", d.quote_identifier(name)))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Scenario S1: role=r1, database=db1, privileges=[SELECT,INSERT] ->
    /// sorted DDL `GRANT INSERT, SELECT ON DATABASE "db1" TO "r1"`.
    #[test]
    fn s1_postgres_grant_create() {
        let q = create_grant(
            "r1",
            &GrantTarget::Database { database: "db1" },
            &["SELECT".to_string(), "INSERT".to_string()],
            false,
        );
        assert_eq!(q.sql, "GRANT INSERT, SELECT ON DATABASE \"db1\" TO \"r1\"");
    }

    /// Scenario S4 / property #4: default privileges Create is a
    /// two-statement transaction, REVOKE ALL then GRANT, both referencing
    /// targetRole in FOR ROLE and role in TO/FROM.
    #[test]
    fn default_privileges_create_is_revoke_then_grant() {
        let stmts = create_default_privileges(
            "r1", "t1", None, "table",
            &["SELECT".to_string(), "UPDATE".to_string()],
            false,
        );
        assert_eq!(stmts.len(), 2);
        assert!(stmts[0].sql.starts_with("ALTER DEFAULT PRIVILEGES FOR ROLE \"t1\""));
        assert!(stmts[0].sql.contains("REVOKE ALL ON TABLES FROM \"r1\""));
        assert!(stmts[1].sql.contains("GRANT SELECT, UPDATE ON TABLES TO \"r1\""));
    }

    #[test]
    fn grant_with_option_adds_clause() {
        let q = create_grant(
            "r1",
            &GrantTarget::Database { database: "db1" },
            &["CONNECT".to_string()],
            true,
        );
        assert!(q.sql.ends_with("WITH GRANT OPTION"));
    }

    #[test]
    fn role_member_grant_has_no_privilege_list() {
        let q = create_grant("r1", &GrantTarget::RoleMember { member_of: "admins" }, &[], false);
        assert_eq!(q.sql, "GRANT \"admins\" TO \"r1\"");
    }

    #[test]
    fn read_database_privileges_probes_has_database_privilege() {
        let q = read_database_privileges("r1", "db1");
        assert!(q.sql.contains("has_database_privilege($1, $2, privilege)"));
        assert!(q.sql.contains("'CREATE'"));
        assert!(q.sql.contains("'CONNECT'"));
        assert!(q.sql.contains("'TEMPORARY'"));
    }

    #[test]
    fn read_schema_privileges_probes_has_schema_privilege() {
        let q = read_schema_privileges("r1", "s1");
        assert!(q.sql.contains("has_schema_privilege($1, $2, privilege)"));
        assert!(q.sql.contains("'CREATE'"));
        assert!(q.sql.contains("'USAGE'"));
    }
}
