#[macro_use]
extern crate serde;
#[macro_use]
extern crate log;

use std::cmp;
use std::error::Error;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::io;

pub mod context;
pub mod expr;
pub mod full_text;
pub mod logical_plan;
pub mod path;
pub mod problems;
pub mod query_model;
pub mod schemata;
pub mod testutil;

pub use context::{ExecutionEnvironment, PlanHints, QueryContext};
pub use expr::*;
pub use problems::{Location, Problem, ProblemCode, Problems, Severity};
pub use query_model::{Query, QueryBuilder, Source};

/// Custom error type.
///
/// Only failures that prevent a plan from existing at all are reported through this type.
/// Semantic issues found while planning or optimizing are recorded as [`Problem`]s.
#[derive(Debug, Clone, PartialEq)]
pub enum ArborError {
    /// IO Errors.
    IOError(String),
    /// Query text could not be parsed.
    ParseError(String),
    /// No parser is registered for the language.
    UnsupportedLanguage(String),
    /// Validation errors.
    ValidationError(String),
    /// Execution errors.
    ExecutionError(String),
    /// A caller broke an API contract.
    InvalidArgument(String),
}

impl fmt::Display for ArborError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                ArborError::ParseError(s) => format!("Parse Error: {}", s),
                ArborError::UnsupportedLanguage(s) => {
                    format!("Unsupported Language: no parser registered for '{}'", s)
                }
                ArborError::ValidationError(s) => format!("Validation Error: {}", s),
                ArborError::ExecutionError(s) => format!("Execution Error: {}", s),
                ArborError::InvalidArgument(s) => format!("Invalid Argument: {}", s),
                ArborError::IOError(s) => s.to_string(),
            }
        )
    }
}

impl From<io::Error> for ArborError {
    fn from(error: io::Error) -> Self {
        ArborError::IOError(error.to_string())
    }
}

impl Error for ArborError {}

/// Enumerate the supported dtypes.
#[derive(PartialEq, Eq, Serialize, Deserialize, Clone, Copy, Debug, Hash)]
pub enum DataType {
    String,
    Long,
    Double,
    Boolean,
    Date,
    Path,
    Name,
}

impl DataType {
    /// Returns true for the types whose values are compared numerically.
    pub fn is_numeric(&self) -> bool {
        matches!(self, DataType::Long | DataType::Double | DataType::Date)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::String => "STRING",
            DataType::Long => "LONG",
            DataType::Double => "DOUBLE",
            DataType::Boolean => "BOOLEAN",
            DataType::Date => "DATE",
            DataType::Path => "PATH",
            DataType::Name => "NAME",
        };
        write!(f, "{}", name)
    }
}

/// For each of the dtypes, make sure that there is a corresponding field type.
///
/// Dates are carried as `LongField` milliseconds; paths and names as `StringField`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub enum Field {
    Null,
    BooleanField(bool),
    LongField(i64),
    DoubleField(f64),
    StringField(String),
}

impl Field {
    /// Rank used to totally order fields of different variants.
    fn rank(&self) -> u8 {
        match self {
            Field::Null => 0,
            Field::BooleanField(_) => 1,
            Field::LongField(_) | Field::DoubleField(_) => 2,
            Field::StringField(_) => 3,
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            Field::LongField(i) => Some(*i as f64),
            Field::DoubleField(d) => Some(*d),
            _ => None,
        }
    }

    /// Returns true if this is the null value.
    pub fn is_null(&self) -> bool {
        matches!(self, Field::Null)
    }

    /// Compares two values the way a constraint does.
    ///
    /// Numbers compare numerically across variants, strings lexically, and a string
    /// compared with a number is parsed as one when possible. Null never compares.
    pub fn compare(&self, other: &Field) -> Option<cmp::Ordering> {
        match (self, other) {
            (Field::Null, _) | (_, Field::Null) => None,
            (Field::LongField(a), Field::LongField(b)) => Some(a.cmp(b)),
            (Field::BooleanField(a), Field::BooleanField(b)) => Some(a.cmp(b)),
            (Field::StringField(a), Field::StringField(b)) => Some(a.cmp(b)),
            (Field::StringField(s), n) | (n, Field::StringField(s))
                if n.as_f64().is_some() =>
            {
                let parsed = s.trim().parse::<f64>().ok()?;
                let number = n.as_f64()?;
                let ord = parsed.partial_cmp(&number)?;
                if let Field::StringField(_) = self {
                    Some(ord)
                } else {
                    Some(ord.reverse())
                }
            }
            (Field::StringField(s), Field::BooleanField(b)) => {
                s.parse::<bool>().ok().map(|v| v.cmp(b))
            }
            (Field::BooleanField(b), Field::StringField(s)) => {
                s.parse::<bool>().ok().map(|v| b.cmp(&v))
            }
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x.partial_cmp(&y),
                _ => None,
            },
        }
    }

    /// Returns the string form used for LIKE, LENGTH and full-text evaluation.
    pub fn as_string(&self) -> Option<String> {
        match self {
            Field::Null => None,
            other => Some(other.to_string()),
        }
    }
}

impl PartialEq for Field {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == cmp::Ordering::Equal
    }
}

impl Eq for Field {}

impl PartialOrd for Field {
    fn partial_cmp(&self, other: &Self) -> Option<cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Field {
    /// Total order used for sorting and duplicate removal; nulls sort first.
    fn cmp(&self, other: &Self) -> cmp::Ordering {
        match (self, other) {
            (Field::BooleanField(a), Field::BooleanField(b)) => a.cmp(b),
            (Field::LongField(a), Field::LongField(b)) => a.cmp(b),
            (Field::StringField(a), Field::StringField(b)) => a.cmp(b),
            (a, b) if a.rank() == 2 && b.rank() == 2 => {
                let x = a.as_f64().unwrap_or_default();
                let y = b.as_f64().unwrap_or_default();
                x.total_cmp(&y)
            }
            (a, b) => a.rank().cmp(&b.rank()),
        }
    }
}

impl Hash for Field {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            Field::Null => {}
            Field::BooleanField(b) => b.hash(state),
            // Longs and doubles that compare equal must hash the same.
            Field::LongField(i) => (*i as f64).to_bits().hash(state),
            Field::DoubleField(d) => d.to_bits().hash(state),
            Field::StringField(s) => s.hash(state),
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Null => write!(f, "NULL"),
            Field::BooleanField(b) => write!(f, "{}", b),
            Field::LongField(x) => write!(f, "{}", x),
            Field::DoubleField(x) => write!(f, "{}", x),
            Field::StringField(x) => write!(f, "{}", x),
        }
    }
}

impl From<&str> for Field {
    fn from(value: &str) -> Self {
        Field::StringField(value.to_string())
    }
}

impl From<String> for Field {
    fn from(value: String) -> Self {
        Field::StringField(value)
    }
}

impl From<i64> for Field {
    fn from(value: i64) -> Self {
        Field::LongField(value)
    }
}

impl From<f64> for Field {
    fn from(value: f64) -> Self {
        Field::DoubleField(value)
    }
}

impl From<bool> for Field {
    fn from(value: bool) -> Self {
        Field::BooleanField(value)
    }
}

/// Tuple type.
#[derive(Debug, Serialize, Deserialize, Eq, PartialEq, Clone, Hash)]
pub struct Tuple {
    /// Tuple data.
    pub field_vals: Vec<Field>,
}

impl Tuple {
    /// Create a new tuple with the given data.
    ///
    /// # Arguments
    ///
    /// * `field_vals` - Field values of the tuple.
    pub fn new(field_vals: Vec<Field>) -> Self {
        Self { field_vals }
    }

    /// Get the field at index.
    ///
    /// # Arguments
    ///
    /// * `i` - Index of the field.
    pub fn get_field(&self, i: usize) -> Option<&Field> {
        self.field_vals.get(i)
    }

    /// Returns an iterator over the field values.
    pub fn field_vals(&self) -> impl Iterator<Item = &Field> {
        self.field_vals.iter()
    }

    /// Return the length of the tuple.
    pub fn size(&self) -> usize {
        self.field_vals.len()
    }

    /// Append another tuple with self.
    ///
    /// # Arguments
    ///
    /// * `other` - Other tuple to append.
    pub fn merge(&self, other: &Self) -> Self {
        let mut fields = self.field_vals.clone();
        fields.extend(other.field_vals.iter().cloned());
        Self::new(fields)
    }

    /// Returns a tuple of `width` null fields.
    pub fn nulls(width: usize) -> Self {
        Self::new(vec![Field::Null; width])
    }
}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut res = String::new();
        for field in &self.field_vals {
            res.push_str(&field.to_string());
            res.push('\t');
        }
        write!(f, "{}", res)
    }
}
