//! Wide-to-long reshaping of the passenger-count source table.
//!
//! Source layout (UTF-8, one record per line):
//!
//! ```text
//! year;railway;sea;...
//! 1995;577431.5;7817;...
//! ```
//!
//! Each data row yields one [`PassengerRecord`] per type column, so a table of
//! `R` rows and `k` type columns yields exactly `R·k` records, row-major.

use std::collections::BTreeSet;

use ridership_core::{PassengerRecord, TransportType, Year};

use crate::error::{AnalyticsError, ParseError};
use crate::forecast::FORECAST_HORIZON;
use crate::job::AnalyticsJob;

pub const DEFAULT_DELIMITER: char = ';';

/// Name of the first header column.
pub const YEAR_COLUMN: &str = "year";

/// Latest accepted year: forecasts run [`FORECAST_HORIZON`] years past it.
pub const MAX_YEAR: Year = Year::MAX - FORECAST_HORIZON;

/// Parser for the delimiter-separated wide table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WideTableParser {
    delimiter: char,
}

impl Default for WideTableParser {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER,
        }
    }
}

impl WideTableParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn delimiter(&self) -> char {
        self.delimiter
    }

    /// Parse the header into the ordered list of transport types.
    pub fn parse_header(&self, line: &str) -> Result<Vec<TransportType>, ParseError> {
        let mut fields = line.split(self.delimiter).map(str::trim);

        match fields.next() {
            Some(first) if first.eq_ignore_ascii_case(YEAR_COLUMN) => {}
            Some(first) => {
                return Err(ParseError::InvalidHeader(format!(
                    "first column must be '{YEAR_COLUMN}', found '{first}'"
                )));
            }
            None => return Err(ParseError::EmptyInput),
        }

        let mut seen = BTreeSet::new();
        let mut types = Vec::new();
        for field in fields {
            let transport_type = TransportType::new(field)
                .map_err(|e| ParseError::InvalidHeader(e.to_string()))?;
            if !seen.insert(transport_type.clone()) {
                return Err(ParseError::DuplicateColumn {
                    column: transport_type.to_string(),
                });
            }
            types.push(transport_type);
        }

        if types.is_empty() {
            return Err(ParseError::InvalidHeader(
                "header declares no transport type columns".to_string(),
            ));
        }
        Ok(types)
    }

    /// Parse the whole source into long-format records.
    ///
    /// Blank lines are skipped and `\r\n` line endings are accepted. The first
    /// failure aborts the parse; nothing is returned partially.
    pub fn parse(&self, source: &str) -> Result<Vec<PassengerRecord>, ParseError> {
        let mut lines = source
            .lines()
            .map(|l| l.trim_end_matches('\r'))
            .filter(|l| !l.trim().is_empty());

        let header = lines.next().ok_or(ParseError::EmptyInput)?;
        let types = self.parse_header(header)?;
        let expected = types.len() + 1;

        let mut years = BTreeSet::new();
        let mut records = Vec::new();

        for (idx, line) in lines.enumerate() {
            let row = idx + 1;
            let fields: Vec<&str> = line.split(self.delimiter).map(str::trim).collect();
            if fields.len() != expected {
                return Err(ParseError::ColumnCount {
                    row,
                    expected,
                    found: fields.len(),
                });
            }

            let year: Year = fields[0]
                .parse()
                .ok()
                .filter(|y| *y <= MAX_YEAR)
                .ok_or_else(|| ParseError::InvalidYear {
                    row,
                    value: fields[0].to_string(),
                })?;
            if !years.insert(year) {
                return Err(ParseError::DuplicateYear { row, year });
            }

            for (column_index, (raw, transport_type)) in fields[1..].iter().zip(&types).enumerate() {
                let column_index = column_index + 1;
                let passengers = parse_count(raw).ok_or_else(|| ParseError::InvalidNumber {
                    row,
                    column_index,
                    column: transport_type.to_string(),
                    value: raw.to_string(),
                })?;
                if passengers < 0.0 {
                    return Err(ParseError::NegativeValue {
                        row,
                        column_index,
                        column: transport_type.to_string(),
                        value: passengers,
                    });
                }

                let record = PassengerRecord::new(year, transport_type.clone(), passengers).map_err(|_| {
                    ParseError::InvalidNumber {
                        row,
                        column_index,
                        column: transport_type.to_string(),
                        value: raw.to_string(),
                    }
                })?;
                records.push(record);
            }
        }

        Ok(records)
    }
}

/// Finite counts only; `-0` is stored as `0.0`.
fn parse_count(raw: &str) -> Option<f64> {
    raw.parse::<f64>().ok().filter(|v| v.is_finite()).map(|v| v + 0.0)
}

/// Ingest job: source text in, long-format records out.
#[derive(Debug, Clone)]
pub struct IngestJob {
    source: String,
    parser: WideTableParser,
}

impl IngestJob {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            parser: WideTableParser::default(),
        }
    }

    pub fn with_parser(mut self, parser: WideTableParser) -> Self {
        self.parser = parser;
        self
    }
}

impl AnalyticsJob for IngestJob {
    type Input = String;
    type Output = Vec<PassengerRecord>;

    fn name(&self) -> &'static str {
        "ingest.wide_table"
    }

    fn input(&self) -> &Self::Input {
        &self.source
    }

    fn run(&self) -> Result<Self::Output, AnalyticsError> {
        Ok(self.parser.parse(&self.source)?)
    }
}
