/// How a dialect expects query placeholders to be written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// `?`, used by MySQL and MSSQL (via named `@P1` in practice, but the
    /// composer only ever emits literals for MSSQL today — see
    /// `SPEC_FULL.md` 4.3).
    QuestionMark,
    /// `$1`, `$2`, ... used by Postgres.
    DollarNumber,
}

/// Per-dialect identifier/literal quoting rules.
///
/// Grounded directly on `dbflux_core::sql_dialect::SqlDialect` from the
/// teacher crate; extended with nothing new, since quoting is the one piece
/// of the teacher's dialect trait this crate keeps unchanged.
pub trait SqlDialect: Send + Sync {
    fn quote_identifier(&self, ident: &str) -> String;

    fn qualified_name(&self, parts: &[&str]) -> String {
        parts
            .iter()
            .map(|p| self.quote_identifier(p))
            .collect::<Vec<_>>()
            .join(".")
    }

    fn quote_value(&self, value: &str) -> String {
        format!("'{}'", self.escape_string(value))
    }

    fn escape_string(&self, value: &str) -> String {
        value.replace('\'', "''")
    }

    fn placeholder_style(&self) -> PlaceholderStyle;

    fn supports_returning(&self) -> bool {
        false
    }
}

/// Double-quote identifiers, doubling embedded quotes. Shared baseline for
/// Postgres and HANA, both of which follow the SQL standard here.
pub struct DefaultSqlDialect;

impl SqlDialect for DefaultSqlDialect {
    fn quote_identifier(&self, ident: &str) -> String {
        format!("\"{}\"", ident.replace('"', "\"\""))
    }

    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::DollarNumber
    }

    fn supports_returning(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_dialect_doubles_embedded_quotes() {
        let d = DefaultSqlDialect;
        assert_eq!(d.quote_identifier("a\"b"), "\"a\"\"b\"");
    }

    #[test]
    fn default_dialect_escapes_single_quotes_in_values() {
        let d = DefaultSqlDialect;
        assert_eq!(d.quote_value("o'brien"), "'o''brien'");
    }

    #[test]
    fn qualified_name_joins_quoted_parts() {
        let d = DefaultSqlDialect;
        assert_eq!(d.qualified_name(&["public", "accounts"]), "\"public\".\"accounts\"");
    }
}
