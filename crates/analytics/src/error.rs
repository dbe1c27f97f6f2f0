use thiserror::Error;

use ridership_core::{TransportType, Year};

/// Malformed ingest source.
///
/// `row` is the 1-based index of the data row (the header is row 0), so
/// `row: 3` is the third line after the header, blank lines excluded.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("source is empty: expected a header row")]
    EmptyInput,

    #[error("invalid header: {0}")]
    InvalidHeader(String),

    #[error("duplicate column '{column}' in header")]
    DuplicateColumn { column: String },

    #[error("row {row}: expected {expected} fields, found {found}")]
    ColumnCount {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("row {row}: invalid year '{value}'")]
    InvalidYear { row: usize, value: String },

    #[error("row {row}, column {column_index} ('{column}'): '{value}' is not a finite number")]
    InvalidNumber {
        row: usize,
        column_index: usize,
        column: String,
        value: String,
    },

    #[error("row {row}, column {column_index} ('{column}'): negative passenger count {value}")]
    NegativeValue {
        row: usize,
        column_index: usize,
        column: String,
        value: f64,
    },

    #[error("row {row}: year {year} appears more than once")]
    DuplicateYear { row: usize, year: Year },
}

impl ParseError {
    /// Data-row index the error points at, when it is row-specific.
    pub fn row(&self) -> Option<usize> {
        match self {
            ParseError::ColumnCount { row, .. }
            | ParseError::InvalidYear { row, .. }
            | ParseError::InvalidNumber { row, .. }
            | ParseError::NegativeValue { row, .. }
            | ParseError::DuplicateYear { row, .. } => Some(*row),
            ParseError::EmptyInput
            | ParseError::InvalidHeader(_)
            | ParseError::DuplicateColumn { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalyticsError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Regression needs at least two distinct years.
    #[error("insufficient data for {transport_type}: need at least 2 distinct years, got {points}")]
    InsufficientData {
        transport_type: TransportType,
        points: usize,
    },

    /// A fit succeeded but its forecast points are unrepresentable, e.g. a
    /// horizon year past `Year::MAX`.
    #[error("invalid job input: {0}")]
    InvalidInput(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_errors_name_row_and_column() {
        let err = ParseError::InvalidNumber {
            row: 4,
            column_index: 2,
            column: "sea".to_string(),
            value: "abc".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "row 4, column 2 ('sea'): 'abc' is not a finite number"
        );
        assert_eq!(err.row(), Some(4));

        let err = ParseError::ColumnCount {
            row: 7,
            expected: 9,
            found: 8,
        };
        assert_eq!(err.to_string(), "row 7: expected 9 fields, found 8");
        assert_eq!(ParseError::EmptyInput.row(), None);
    }

    #[test]
    fn insufficient_data_is_scoped_to_a_type() {
        let err = AnalyticsError::InsufficientData {
            transport_type: TransportType::new("air").unwrap(),
            points: 1,
        };
        assert_eq!(
            err.to_string(),
            "insufficient data for air: need at least 2 distinct years, got 1"
        );
    }
}
