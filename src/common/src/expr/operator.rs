use crate::Field;
use std::cmp::Ordering;
use std::fmt;

/// Comparison operators.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    EqualTo,
    NotEqualTo,
    LessThan,
    LessThanOrEqualTo,
    GreaterThan,
    GreaterThanOrEqualTo,
    Like,
}

impl Operator {
    /// Every operator, in declaration order.
    pub const ALL: [Operator; 7] = [
        Operator::EqualTo,
        Operator::NotEqualTo,
        Operator::LessThan,
        Operator::LessThanOrEqualTo,
        Operator::GreaterThan,
        Operator::GreaterThanOrEqualTo,
        Operator::Like,
    ];

    /// Returns the canonical symbol.
    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::EqualTo => "=",
            Operator::NotEqualTo => "!=",
            Operator::LessThan => "<",
            Operator::LessThanOrEqualTo => "<=",
            Operator::GreaterThan => ">",
            Operator::GreaterThanOrEqualTo => ">=",
            Operator::Like => "LIKE",
        }
    }

    /// Looks up the operator for a symbol.
    ///
    /// The lookup ignores case and surrounding whitespace, and accepts `<>` for `!=`.
    ///
    /// # Arguments
    ///
    /// * `symbol` - Symbol to look up.
    pub fn for_symbol(symbol: &str) -> Option<Operator> {
        let symbol = symbol.trim();
        if symbol == "<>" {
            return Some(Operator::NotEqualTo);
        }
        Operator::ALL
            .iter()
            .find(|op| op.symbol().eq_ignore_ascii_case(symbol))
            .copied()
    }

    /// Returns the operator to use when the operands trade sides.
    pub fn reverse(&self) -> Self {
        match self {
            Operator::GreaterThan => Operator::LessThan,
            Operator::LessThan => Operator::GreaterThan,
            Operator::LessThanOrEqualTo => Operator::GreaterThanOrEqualTo,
            Operator::GreaterThanOrEqualTo => Operator::LessThanOrEqualTo,
            op => *op,
        }
    }

    /// Returns true if the operator bounds a range from below.
    pub fn is_lower_bound(&self) -> bool {
        matches!(self, Operator::GreaterThan | Operator::GreaterThanOrEqualTo)
    }

    /// Returns true if the operator bounds a range from above.
    pub fn is_upper_bound(&self) -> bool {
        matches!(self, Operator::LessThan | Operator::LessThanOrEqualTo)
    }

    /// Do the comparison. Any comparison involving a null value is false.
    ///
    /// # Arguments
    ///
    /// * `left` - Value of the dynamic operand.
    /// * `right` - Value of the static operand.
    pub fn evaluate(&self, left: &Field, right: &Field) -> bool {
        if let Operator::Like = self {
            return match (left.as_string(), right.as_string()) {
                (Some(value), Some(pattern)) => like_matches(&value, &pattern),
                _ => false,
            };
        }
        match left.compare(right) {
            Some(ord) => match self {
                Operator::EqualTo => ord == Ordering::Equal,
                Operator::NotEqualTo => ord != Ordering::Equal,
                Operator::LessThan => ord == Ordering::Less,
                Operator::LessThanOrEqualTo => ord != Ordering::Greater,
                Operator::GreaterThan => ord == Ordering::Greater,
                Operator::GreaterThanOrEqualTo => ord != Ordering::Less,
                Operator::Like => false,
            },
            None => false,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Matches a value against a LIKE pattern.
///
/// `%` matches any run of characters, `_` exactly one, and `\` escapes the next character.
pub fn like_matches(value: &str, pattern: &str) -> bool {
    enum Token {
        Any,
        One,
        Char(char),
    }
    let mut tokens = Vec::new();
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        match c {
            '%' => tokens.push(Token::Any),
            '_' => tokens.push(Token::One),
            '\\' => tokens.push(Token::Char(chars.next().unwrap_or('\\'))),
            c => tokens.push(Token::Char(c)),
        }
    }
    let value: Vec<char> = value.chars().collect();

    // matched[j] is true when the first j characters match the tokens seen so far.
    let mut matched = vec![false; value.len() + 1];
    matched[0] = true;
    for token in &tokens {
        let mut next = vec![false; value.len() + 1];
        match token {
            Token::Any => {
                let mut seen = false;
                for j in 0..=value.len() {
                    seen = seen || matched[j];
                    next[j] = seen;
                }
            }
            Token::One => {
                for j in 1..=value.len() {
                    next[j] = matched[j - 1];
                }
            }
            Token::Char(c) => {
                for j in 1..=value.len() {
                    next[j] = matched[j - 1] && value[j - 1] == *c;
                }
            }
        }
        matched = next;
    }
    matched[value.len()]
}
