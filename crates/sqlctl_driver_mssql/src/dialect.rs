use sqlctl_core::{PlaceholderStyle, SqlDialect};

/// MSSQL identifier quoting: square brackets, doubling embedded `]`.
/// Literals use single quotes with doubled embedded single quotes, same as
/// the shared `SqlDialect` default for escaping.
pub struct MssqlDialect;

impl SqlDialect for MssqlDialect {
    fn quote_identifier(&self, ident: &str) -> String {
        format!("[{}]", ident.replace(']', "]]"))
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
    fn quotes_identifiers_with_brackets() {
        assert_eq!(MssqlDialect.quote_identifier("dbo"), "[dbo]");
    }

    #[test]
    fn doubles_embedded_closing_brackets() {
        assert_eq!(MssqlDialect.quote_identifier("weird]name"), "[weird]]name]");
    }
}
