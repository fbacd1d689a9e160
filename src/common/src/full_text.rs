//! Full-text search terms and the parser for full-text search expressions.

use crate::ArborError;
use std::fmt;

/// A parsed full-text search expression.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub enum Term {
    /// A word or quoted phrase.
    Simple { value: String, negated: bool },
    /// Every term must match.
    Conjunction(Vec<Term>),
    /// Any term may match.
    Disjunction(Vec<Term>),
}

impl Term {
    pub fn simple(value: impl Into<String>) -> Self {
        Term::Simple {
            value: value.into(),
            negated: false,
        }
    }

    pub fn negated(value: impl Into<String>) -> Self {
        Term::Simple {
            value: value.into(),
            negated: true,
        }
    }

    /// True if this is a simple term whose value must be quoted to be rendered.
    pub fn requires_quotes(&self) -> bool {
        match self {
            Term::Simple { value, .. } => value.chars().any(char::is_whitespace),
            _ => false,
        }
    }

    /// Returns every simple term, negated or not.
    pub fn simple_terms(&self) -> Vec<&Term> {
        match self {
            Term::Simple { .. } => vec![self],
            Term::Conjunction(terms) | Term::Disjunction(terms) => {
                terms.iter().flat_map(|t| t.simple_terms()).collect()
            }
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            Term::Disjunction(_) => 0,
            Term::Conjunction(_) => 1,
            Term::Simple { .. } => 2,
        }
    }

    fn fmt_child(&self, child: &Term, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if child.precedence() < self.precedence() {
            write!(f, "({})", child)
        } else {
            write!(f, "{}", child)
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Simple { value, negated } => {
                if *negated {
                    write!(f, "-")?;
                }
                if self.requires_quotes() {
                    write!(f, "\"{}\"", value)
                } else {
                    write!(f, "{}", value)
                }
            }
            Term::Conjunction(terms) | Term::Disjunction(terms) => {
                let separator = if let Term::Conjunction(_) = self {
                    " "
                } else {
                    " OR "
                };
                for (i, term) in terms.iter().enumerate() {
                    if i > 0 {
                        write!(f, "{}", separator)?;
                    }
                    self.fmt_child(term, f)?;
                }
                Ok(())
            }
        }
    }
}

#[derive(Debug, PartialEq)]
enum Token {
    Word { value: String, negated: bool },
    Or,
}

fn tokenize(expression: &str) -> Result<Vec<Token>, ArborError> {
    let mut tokens = Vec::new();
    let mut chars = expression.chars().peekable();
    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        let mut negated = false;
        if c == '-' {
            negated = true;
            chars.next();
        }
        let mut value = String::new();
        let quoted = chars.peek() == Some(&'"');
        if quoted {
            chars.next();
            let mut closed = false;
            for c in chars.by_ref() {
                if c == '"' {
                    closed = true;
                    break;
                }
                value.push(c);
            }
            if !closed {
                return Err(ArborError::ParseError(format!(
                    "Unterminated phrase in full-text expression '{}'",
                    expression
                )));
            }
        } else {
            while let Some(&c) = chars.peek() {
                if c.is_whitespace() {
                    break;
                }
                value.push(c);
                chars.next();
            }
        }
        if !quoted && !negated && value == "OR" {
            tokens.push(Token::Or);
        } else if !value.trim().is_empty() {
            tokens.push(Token::Word {
                value: value.trim().to_string(),
                negated,
            });
        }
    }
    Ok(tokens)
}

fn collapse(mut terms: Vec<Term>, conjunction: bool) -> Term {
    if terms.len() == 1 {
        terms.remove(0)
    } else if conjunction {
        Term::Conjunction(terms)
    } else {
        Term::Disjunction(terms)
    }
}

/// Parses a full-text search expression.
///
/// Whitespace separates terms that must all match; an upper-case `OR` between terms
/// separates alternatives and binds looser than the implicit conjunction. A leading `-`
/// negates a term and double quotes group a phrase.
///
/// # Arguments
///
/// * `expression` - Full-text search expression.
pub fn parse_full_text(expression: &str) -> Result<Term, ArborError> {
    let tokens = tokenize(expression)?;
    let mut disjuncts = Vec::new();
    let mut conjuncts = Vec::new();
    for token in tokens {
        match token {
            Token::Word { value, negated } => conjuncts.push(Term::Simple { value, negated }),
            Token::Or => {
                if conjuncts.is_empty() {
                    return Err(ArborError::ParseError(format!(
                        "Expected a term before OR in full-text expression '{}'",
                        expression
                    )));
                }
                disjuncts.push(collapse(conjuncts, true));
                conjuncts = Vec::new();
            }
        }
    }
    if conjuncts.is_empty() {
        return Err(ArborError::ParseError(format!(
            "Full-text expression '{}' has no terms",
            expression
        )));
    }
    disjuncts.push(collapse(conjuncts, true));
    Ok(collapse(disjuncts, false))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_single_word() {
        assert_eq!(parse_full_text("  engine ").unwrap(), Term::simple("engine"));
    }

    #[test]
    fn test_implicit_and_binds_tighter_than_or() {
        let term = parse_full_text("red car OR blue -truck").unwrap();
        assert_eq!(
            term,
            Term::Disjunction(vec![
                Term::Conjunction(vec![Term::simple("red"), Term::simple("car")]),
                Term::Conjunction(vec![Term::simple("blue"), Term::negated("truck")]),
            ])
        );
        assert_eq!(term.to_string(), "red car OR blue -truck");
    }

    #[test]
    fn test_phrases_require_quotes() {
        let term = parse_full_text("\"sports car\" -\"pick up\"").unwrap();
        assert_eq!(
            term,
            Term::Conjunction(vec![Term::simple("sports car"), Term::negated("pick up")])
        );
        assert!(Term::simple("sports car").requires_quotes());
        assert!(!Term::simple("sports").requires_quotes());
        assert_eq!(term.to_string(), "\"sports car\" -\"pick up\"");
    }

    #[test]
    fn test_nested_disjunction_is_parenthesized() {
        let term = Term::Conjunction(vec![
            Term::Disjunction(vec![Term::simple("a"), Term::simple("b")]),
            Term::simple("c"),
        ]);
        assert_eq!(term.to_string(), "(a OR b) c");
    }

    #[test]
    fn test_malformed_expressions() {
        assert!(parse_full_text("").is_err());
        assert!(parse_full_text("OR car").is_err());
        assert!(parse_full_text("\"open phrase").is_err());
    }
}
