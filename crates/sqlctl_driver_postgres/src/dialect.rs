use sqlctl_core::{PlaceholderStyle, SqlDialect};

/// Postgres identifier/literal quoting: double-quoted identifiers, single
/// quoted literals, both doubling embedded quote characters. Kept
/// verbatim from the teacher's `dbflux_core::sql_dialect::DefaultSqlDialect`,
/// which was itself modeled on Postgres conventions.
pub struct PostgresDialect;

impl SqlDialect for PostgresDialect {
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
    fn quotes_identifiers_with_embedded_double_quotes() {
        assert_eq!(PostgresDialect.quote_identifier("weird\"name"), "\"weird\"\"name\"");
    }
}
