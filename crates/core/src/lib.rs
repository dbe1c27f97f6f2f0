//! `ridership-core` — passenger-count domain records.
//!
//! This crate contains **pure domain** types (no infrastructure concerns):
//! validated transport-type codes, the long-format passenger record and the
//! forecast record, plus the error model shared by the rest of the workspace.

pub mod error;
pub mod id;
pub mod record;
pub mod transport;
pub mod value_object;

pub use error::{DomainError, DomainResult};
pub use id::RunId;
pub use record::{ForecastKey, ForecastRecord, NaturalKey, PassengerKey, PassengerRecord, Year};
pub use transport::TransportType;
pub use value_object::ValueObject;
