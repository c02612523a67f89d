//! Data quality gate applied before anything touches the store.

use thiserror::Error;

use crate::models::observation::RawObservation;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("missing required field '{0}'")]
    MissingField(&'static str),
    #[error("{field} has invalid value {value}")]
    InvalidValue { field: &'static str, value: f64 },
    #[error("{larger} ({larger_value}) is below {smaller} ({smaller_value})")]
    OutOfOrder {
        larger: &'static str,
        larger_value: f64,
        smaller: &'static str,
        smaller_value: f64,
    },
}

impl ValidationError {
    /// Name of the field that failed
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::MissingField(field) => field,
            ValidationError::InvalidValue { field, .. } => field,
            ValidationError::OutOfOrder { larger, .. } => larger,
        }
    }
}

/// Validate one raw observation; the first failing check wins.
pub fn validate_observation(observation: &RawObservation) -> Result<(), ValidationError> {
    require_non_empty("id", &observation.id)?;
    require_non_empty("symbol", &observation.symbol)?;
    require_non_empty("name", &observation.name)?;

    match observation.current_price {
        None => return Err(ValidationError::MissingField("current_price")),
        Some(price) => require_positive("current_price", price)?,
    }

    for (field, value) in [
        ("high_24h", observation.high_24h),
        ("low_24h", observation.low_24h),
        ("ath", observation.ath),
        ("atl", observation.atl),
        ("market_cap", observation.market_cap),
        ("fully_diluted_valuation", observation.fully_diluted_valuation),
        ("total_volume", observation.total_volume),
        ("circulating_supply", observation.circulating_supply),
        ("total_supply", observation.total_supply),
        ("max_supply", observation.max_supply),
    ] {
        if let Some(value) = value {
            require_non_negative(field, value)?;
        }
    }

    if let Some(rank) = observation.market_cap_rank {
        if rank <= 0 {
            return Err(ValidationError::InvalidValue {
                field: "market_cap_rank",
                value: f64::from(rank),
            });
        }
    }

    if let (Some(high), Some(low)) = (observation.high_24h, observation.low_24h) {
        require_ordered(("high_24h", high), ("low_24h", low))?;
    }

    if let (Some(max), Some(total)) = (observation.max_supply, observation.total_supply) {
        require_ordered(("max_supply", max), ("total_supply", total))?;

        if let Some(circulating) = observation.circulating_supply {
            require_ordered(("total_supply", total), ("circulating_supply", circulating))?;
        }
    }

    if observation.last_updated.is_none() {
        return Err(ValidationError::MissingField("last_updated"));
    }

    Ok(())
}

fn require_non_empty(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::MissingField(field));
    }
    Ok(())
}

fn require_positive(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ValidationError::InvalidValue { field, value });
    }
    Ok(())
}

fn require_non_negative(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ValidationError::InvalidValue { field, value });
    }
    Ok(())
}

fn require_ordered(
    (larger, larger_value): (&'static str, f64),
    (smaller, smaller_value): (&'static str, f64),
) -> Result<(), ValidationError> {
    if larger_value < smaller_value {
        return Err(ValidationError::OutOfOrder {
            larger,
            larger_value,
            smaller,
            smaller_value,
        });
    }
    Ok(())
}
