use sqlctl_core::{PlaceholderStyle, SqlDialect};

/// MySQL/MariaDB identifier quoting: back-ticks, doubling any embedded
/// back-tick. Grounded on the teacher's `MysqlDialect` in
/// `dbflux_driver_mysql::driver`.
pub struct MysqlDialect;

impl SqlDialect for MysqlDialect {
    fn quote_identifier(&self, ident: &str) -> String {
        format!("`{}`", ident.replace('`', "``"))
    }

    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::QuestionMark
    }

    fn supports_returning(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_identifiers_with_backticks() {
        assert_eq!(MysqlDialect.quote_identifier("my_table"), "`my_table`");
    }

    #[test]
    fn doubles_embedded_backticks() {
        assert_eq!(MysqlDialect.quote_identifier("weird`name"), "`weird``name`");
    }
}
