use crate::ArborError;
use std::fmt;

/// A window over the rows of a result: at most `row_limit` rows after skipping `offset`.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Limit {
    row_limit: usize,
    offset: usize,
}

impl Limit {
    /// Row limit sentinel meaning "no bound on the number of rows".
    pub const UNBOUNDED: usize = usize::MAX;

    /// No row limit and no offset.
    pub const NONE: Limit = Limit {
        row_limit: Limit::UNBOUNDED,
        offset: 0,
    };

    /// Creates a limit.
    ///
    /// # Arguments
    ///
    /// * `row_limit` - Maximum number of rows, or [`Limit::UNBOUNDED`]. Must be positive.
    /// * `offset` - Number of leading rows to skip.
    pub fn new(row_limit: usize, offset: usize) -> Result<Self, ArborError> {
        if row_limit == 0 {
            return Err(ArborError::InvalidArgument(String::from(
                "The row limit must be positive",
            )));
        }
        Ok(Self { row_limit, offset })
    }

    /// Creates a limit from signed values, rejecting negative inputs.
    pub fn from_signed(row_limit: i64, offset: i64) -> Result<Self, ArborError> {
        if row_limit <= 0 {
            return Err(ArborError::InvalidArgument(format!(
                "The row limit must be positive but was {}",
                row_limit
            )));
        }
        if offset < 0 {
            return Err(ArborError::InvalidArgument(format!(
                "The offset must not be negative but was {}",
                offset
            )));
        }
        Limit::new(row_limit as usize, offset as usize)
    }

    /// Returns the row limit.
    pub fn row_limit(&self) -> usize {
        self.row_limit
    }

    /// Returns the offset.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// True if the limit neither bounds nor skips rows.
    pub fn is_unlimited(&self) -> bool {
        self.row_limit == Limit::UNBOUNDED && self.offset == 0
    }

    /// True if the number of rows is bounded.
    pub fn has_row_limited(&self) -> bool {
        self.row_limit != Limit::UNBOUNDED
    }

    /// True if leading rows are skipped.
    pub fn is_offset(&self) -> bool {
        self.offset > 0
    }

    /// Returns a copy with a different row limit.
    pub fn with_row_limit(&self, row_limit: usize) -> Result<Self, ArborError> {
        Limit::new(row_limit, self.offset)
    }

    /// Returns a copy with a different offset.
    pub fn with_offset(&self, offset: usize) -> Self {
        Self {
            row_limit: self.row_limit,
            offset,
        }
    }
}

impl Default for Limit {
    fn default() -> Self {
        Limit::NONE
    }
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.has_row_limited() {
            write!(f, "LIMIT {}", self.row_limit)?;
            if self.is_offset() {
                write!(f, " ")?;
            }
        }
        if self.is_offset() {
            write!(f, "OFFSET {}", self.offset)?;
        }
        Ok(())
    }
}
