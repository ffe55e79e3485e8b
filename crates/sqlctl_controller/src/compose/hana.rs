//! Query composer (C3) for SAP HANA. Grounded in `SPEC_FULL.md` 4.3's
//! HANA DDL summaries and scenario S6.

use std::collections::BTreeMap;

use sqlctl_core::{Query, SqlDialect};
use sqlctl_driver_hana::HanaDialect;

fn dialect() -> HanaDialect {
    HanaDialect
}

/// Parameter keys allowed in `SET PARAMETER` clauses (`SPEC_FULL.md` 4.3).
/// Keys outside this whitelist are silently dropped by the composer
/// rather than erroring, matching the teacher's permissive style of
/// ignoring unsupported capability requests.
const ALLOWED_PARAMETER_KEYS: &[&str] = &[
    "CLIENT",
    "LOCALE",
    "TIME ZONE",
    "EMAIL ADDRESS",
    "STATEMENT MEMORY LIMIT",
    "STATEMENT THREAD LIMIT",
];

fn render_parameters(d: &HanaDialect, parameters: &BTreeMap<String, String>) -> String {
    let clauses: Vec<String> = parameters
        .iter()
        .filter(|(k, _)| ALLOWED_PARAMETER_KEYS.contains(&k.as_str()))
        .map(|(k, v)| format!("{k}={}", d.quote_value(v)))
        .collect();
    if clauses.is_empty() {
        String::new()
    } else {
        format!(" SET PARAMETER {}", clauses.join(", "))
    }
}

pub fn create_user(
    name: &str,
    password: &str,
    restricted: bool,
    force_first_password_change: bool,
    parameters: &BTreeMap<String, String>,
    usergroup: Option<&str>,
) -> Query {
    let d = dialect();
    let mut sql = String::new();
    if restricted {
        sql.push_str("CREATE RESTRICTED USER ");
    } else {
        sql.push_str("CREATE USER ");
    }
    sql.push_str(&d.quote_identifier(name));
    sql.push_str(&format!(" PASSWORD {}", d.quote_value(password)));
    if !force_first_password_change {
        sql.push_str(" NO FORCE_FIRST_PASSWORD_CHANGE");
    }
    sql.push_str(&render_parameters(&d, parameters));
    if let Some(group) = usergroup {
        sql.push_str(&format!(" SET USERGROUP {}", d.quote_identifier(group)));
    }
    Query::raw(sql)
}

pub fn alter_user_password(name: &str, password: &str) -> Query {
    let d = dialect();
    Query::raw(format!(
        "ALTER USER {} PASSWORD {}",
        d.quote_identifier(name),
        d.quote_value(password)
    ))
}

pub fn drop_user(name: &str) -> Query {
    let d = dialect();
    Query::raw(format!("DROP USER {}", d.quote_identifier(name)))
}

/// Scenario S6: `CREATE ROLE R1 LDAP GROUP 'G1', 'G2' NO GRANT TO CREATOR`.
/// Iterates ldap groups by value, never by index — see the Open Questions
/// decision in `SPEC_FULL.md` section 9.
pub fn create_role(name: &str, ldap_groups: &[String], no_grant_to_creator: bool) -> Query {
    let d = dialect();
    let mut sql = format!("CREATE ROLE {}", d.quote_identifier(name));
    if !ldap_groups.is_empty() {
        let groups: Vec<String> = ldap_groups.iter().map(|group| d.quote_value(group)).collect();
        sql.push_str(&format!(" LDAP GROUP {}", groups.join(", ")));
    }
    if no_grant_to_creator {
        sql.push_str(" NO GRANT TO CREATOR");
    }
    Query::raw(sql)
}

pub fn drop_role(name: &str) -> Query {
    let d = dialect();
    Query::raw(format!("DROP ROLE {}", d.quote_identifier(name)))
}

pub fn create_usergroup(
    name: &str,
    disable_user_admin: bool,
    no_grant_to_creator: bool,
    parameters: &BTreeMap<String, String>,
    enable_parameter_set: Option<&str>,
) -> Query {
    let d = dialect();
    let mut sql = format!("CREATE USERGROUP {}", d.quote_identifier(name));
    if disable_user_admin {
        sql.push_str(" SET DISABLE USER ADMIN");
    }
    if no_grant_to_creator {
        sql.push_str(" SET NO GRANT TO CREATOR");
    }
    sql.push_str(&render_parameters(&d, parameters));
    if let Some(param_set) = enable_parameter_set {
        sql.push_str(&format!(" ENABLE PARAMETER SET {param_set}"));
    }
    Query::raw(sql)
}

pub fn drop_usergroup(name: &str) -> Query {
    let d = dialect();
    Query::raw(format!("DROP USERGROUP {}", d.quote_identifier(name)))
}

pub fn create_dbschema(name: &str, owner: &str) -> Query {
    let d = dialect();
    Query::raw(format!(
        "CREATE SCHEMA {} OWNED BY {}",
        d.quote_identifier(name),
        d.quote_identifier(owner)
    ))
}

pub fn drop_dbschema(name: &str) -> Query {
    let d = dialect();
    Query::raw(format!("DROP SCHEMA {} CASCADE", d.quote_identifier(name)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn s6_hana_role_with_ldap_groups() {
        let q = create_role("R1", &["G1".to_string(), "G2".to_string()], true);
        assert_eq!(q.sql, "CREATE ROLE \"R1\" LDAP GROUP 'G1', 'G2' NO GRANT TO CREATOR");
    }

    #[test]
    fn create_user_filters_disallowed_parameter_keys() {
        let mut parameters = BTreeMap::new();
        parameters.insert("LOCALE".to_string(), "en_US".to_string());
        parameters.insert("NOT_ALLOWED".to_string(), "x".to_string());
        let q = create_user("u1", "pw", false, true, &parameters, None);
        assert!(q.sql.contains("LOCALE='en_US'"));
        assert!(!q.sql.contains("NOT_ALLOWED"));
    }

    #[test]
    fn create_user_adds_no_force_first_password_change_when_disabled() {
        let q = create_user("u1", "pw", false, false, &BTreeMap::new(), None);
        assert!(q.sql.contains("NO FORCE_FIRST_PASSWORD_CHANGE"));
    }
}
