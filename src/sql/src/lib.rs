//! SQL front end for the query engine.
//!
//! Statements are parsed with `sqlparser` and translated into the engine's query model.
//! Only single SELECT statements are accepted.

#[macro_use]
extern crate log;

mod translate;

pub use translate::Translator;

use common::{ArborError, Query};
use queryexe::QueryParser;
use sqlparser::ast::Statement;
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;

/// Name under which the SQL parser registers itself.
pub const LANGUAGE: &str = "sql";

/// Parses SQL SELECT statements.
#[derive(Debug, Default, Clone, Copy)]
pub struct SqlQueryParser;

impl SqlQueryParser {
    pub fn new() -> Self {
        SqlQueryParser
    }
}

impl QueryParser for SqlQueryParser {
    fn language(&self) -> &str {
        LANGUAGE
    }

    fn parse(&self, text: &str) -> Result<Query, ArborError> {
        let dialect = GenericDialect {};
        let mut statements = Parser::parse_sql(&dialect, text.to_string())
            .map_err(|e| ArborError::ParseError(e.to_string()))?;
        if statements.len() != 1 {
            return Err(ArborError::ParseError(format!(
                "Expected exactly one statement but found {}",
                statements.len()
            )));
        }
        match statements.remove(0) {
            Statement::Query(query) => {
                let query = Translator::from_sql(&query)?;
                debug!("translated sql into {}", query);
                Ok(query)
            }
            _ => Err(ArborError::ParseError(String::from(
                "Only SELECT statements are supported",
            ))),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_rejects_other_statements() {
        let parser = SqlQueryParser::new();
        assert!(matches!(
            parser.parse("CREATE TABLE t (a INT)"),
            Err(ArborError::ParseError(_))
        ));
        assert!(matches!(
            parser.parse("SELECT * FROM a; SELECT * FROM b"),
            Err(ArborError::ParseError(_))
        ));
        assert!(matches!(
            parser.parse("SELEC * FROM a"),
            Err(ArborError::ParseError(_))
        ));
    }
}
