use sqlctl_core::{PlaceholderStyle, SqlDialect};

/// HANA follows the same standard-SQL quoting convention as Postgres:
/// double-quoted identifiers, doubled embedded quotes.
pub struct HanaDialect;

impl SqlDialect for HanaDialect {
    fn quote_identifier(&self, ident: &str) -> String {
        format!("\"{}\"", ident.replace('"', "\"\""))
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
    fn quotes_identifiers_like_postgres() {
        assert_eq!(HanaDialect.quote_identifier("USERGROUP1"), "\"USERGROUP1\"");
    }
}
