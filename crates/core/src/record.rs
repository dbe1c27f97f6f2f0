//! Long-format passenger records and forecast records.
//!
//! Both record kinds are produced in bulk and replaced wholesale; neither is
//! ever updated in place. Constructors enforce the numeric invariants so no
//! negative or non-finite value can reach a store.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::transport::TransportType;
use crate::value_object::ValueObject;

/// Calendar year of an observation or forecast.
pub type Year = i32;

/// Natural key of a [`PassengerRecord`].
pub type PassengerKey = (Year, TransportType);

/// Natural key of a [`ForecastRecord`].
pub type ForecastKey = (TransportType, Year);

/// Records that are unique by a natural key within their dataset.
///
/// Stores use the key to reject batches that would break uniqueness.
pub trait NaturalKey {
    type Key: Ord + Clone + core::fmt::Debug + Send + Sync;

    fn natural_key(&self) -> Self::Key;
}

/// Annual passenger count for one transport mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassengerRecord {
    pub year: Year,
    pub transport_type: TransportType,
    pub passengers: f64,
}

impl PassengerRecord {
    /// Build a record; `passengers` must be finite and non-negative.
    pub fn new(year: Year, transport_type: TransportType, passengers: f64) -> DomainResult<Self> {
        if !passengers.is_finite() {
            return Err(DomainError::validation(format!(
                "passenger count for {transport_type} in {year} is not a finite number"
            )));
        }
        if passengers < 0.0 {
            return Err(DomainError::invariant(format!(
                "passenger count for {transport_type} in {year} is negative ({passengers})"
            )));
        }
        Ok(Self {
            year,
            transport_type,
            passengers,
        })
    }
}

impl ValueObject for PassengerRecord {}

impl NaturalKey for PassengerRecord {
    type Key = PassengerKey;

    fn natural_key(&self) -> Self::Key {
        (self.year, self.transport_type.clone())
    }
}

/// One forecast point for a transport mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRecord {
    pub transport_type: TransportType,
    pub prediction_year: Year,
    pub predicted_passengers: f64,
    /// Goodness of fit of the model that produced this point, in \[0, 1\].
    pub confidence_level: f64,
}

impl ForecastRecord {
    pub fn new(
        transport_type: TransportType,
        prediction_year: Year,
        predicted_passengers: f64,
        confidence_level: f64,
    ) -> DomainResult<Self> {
        if !(predicted_passengers.is_finite() && predicted_passengers >= 0.0) {
            return Err(DomainError::invariant(format!(
                "predicted passengers for {transport_type} in {prediction_year} must be finite and >= 0, got {predicted_passengers}"
            )));
        }
        if !(confidence_level.is_finite() && (0.0..=1.0).contains(&confidence_level)) {
            return Err(DomainError::invariant(format!(
                "confidence level for {transport_type} must lie in [0, 1], got {confidence_level}"
            )));
        }
        Ok(Self {
            transport_type,
            prediction_year,
            predicted_passengers,
            confidence_level,
        })
    }
}

impl ValueObject for ForecastRecord {}

impl NaturalKey for ForecastRecord {
    type Key = ForecastKey;

    fn natural_key(&self) -> Self::Key {
        (self.transport_type.clone(), self.prediction_year)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rail() -> TransportType {
        TransportType::new("railway").unwrap()
    }

    #[test]
    fn passenger_record_rejects_negative_and_nan() {
        assert!(PassengerRecord::new(1995, rail(), 577431.5).is_ok());
        assert!(PassengerRecord::new(1995, rail(), 0.0).is_ok());
        assert!(matches!(
            PassengerRecord::new(1995, rail(), -1.0),
            Err(DomainError::InvariantViolation(_))
        ));
        assert!(matches!(
            PassengerRecord::new(1995, rail(), f64::NAN),
            Err(DomainError::Validation(_))
        ));
        assert!(PassengerRecord::new(1995, rail(), f64::INFINITY).is_err());
    }

    #[test]
    fn forecast_record_bounds_confidence() {
        assert!(ForecastRecord::new(rail(), 2021, 10.0, 0.0).is_ok());
        assert!(ForecastRecord::new(rail(), 2021, 10.0, 1.0).is_ok());
        assert!(ForecastRecord::new(rail(), 2021, 10.0, 1.01).is_err());
        assert!(ForecastRecord::new(rail(), 2021, 10.0, f64::NAN).is_err());
        assert!(ForecastRecord::new(rail(), 2021, -0.5, 0.5).is_err());
    }

    #[test]
    fn natural_keys() {
        let p = PassengerRecord::new(2001, rail(), 1.0).unwrap();
        assert_eq!(p.natural_key(), (2001, rail()));
        let f = ForecastRecord::new(rail(), 2021, 1.0, 0.5).unwrap();
        assert_eq!(f.natural_key(), (rail(), 2021));
    }

    #[test]
    fn serializes_with_flat_field_names() {
        let p = PassengerRecord::new(2001, rail(), 12.5).unwrap();
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"year": 2001, "transport_type": "railway", "passengers": 12.5})
        );
    }

    #[cfg(test)]
    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: any finite non-negative count is accepted and kept as-is.
            #[test]
            fn non_negative_counts_are_accepted(year in 1900i32..2100, passengers in 0.0f64..1e12) {
                let r = PassengerRecord::new(year, rail(), passengers).unwrap();
                prop_assert_eq!(r.passengers, passengers);
                prop_assert_eq!(r.year, year);
            }

            /// Property: confidence outside [0, 1] is always rejected.
            #[test]
            fn out_of_range_confidence_is_rejected(c in prop_oneof![-1e6f64..-1e-9, 1.0f64 + 1e-9..1e6]) {
                prop_assert!(ForecastRecord::new(rail(), 2021, 1.0, c).is_err());
            }
        }
    }
}
