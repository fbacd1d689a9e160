use common::{ArborError, Query};
use std::collections::HashMap;
use std::sync::Arc;

/// Turns query text in one language into a query.
pub trait QueryParser: Send + Sync {
    /// Name of the language, matched case-insensitively.
    fn language(&self) -> &str;

    /// Parses `text`. Text that cannot be turned into a query is a `ParseError`.
    fn parse(&self, text: &str) -> Result<Query, ArborError>;
}

/// The query languages an engine understands, keyed by language name.
#[derive(Clone, Default)]
pub struct QueryParsers {
    parsers: HashMap<String, Arc<dyn QueryParser>>,
}

impl QueryParsers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `parser`, returning the parser it replaces.
    pub fn add_parser(&mut self, parser: Arc<dyn QueryParser>) -> Option<Arc<dyn QueryParser>> {
        let language = parser.language().to_lowercase();
        debug!("registered query language {}", language);
        self.parsers.insert(language, parser)
    }

    pub fn remove_parser(&mut self, language: &str) -> Option<Arc<dyn QueryParser>> {
        self.parsers.remove(&language.to_lowercase())
    }

    pub fn parser(&self, language: &str) -> Option<&Arc<dyn QueryParser>> {
        self.parsers.get(&language.to_lowercase())
    }

    /// Names of the registered languages, sorted.
    pub fn languages(&self) -> Vec<String> {
        let mut languages: Vec<String> = self
            .parsers
            .values()
            .map(|p| p.language().to_string())
            .collect();
        languages.sort();
        languages
    }

    /// Parses `text` with the parser of `language`.
    pub fn parse(&self, language: &str, text: &str) -> Result<Query, ArborError> {
        match self.parser(language) {
            Some(parser) => parser.parse(text),
            None => Err(ArborError::UnsupportedLanguage(language.to_string())),
        }
    }
}
