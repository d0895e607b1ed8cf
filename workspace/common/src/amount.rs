//! Monetary amounts: requests may send a JSON number or a numeric string.

use rust_decimal::Decimal;
use serde::de::{self, Deserializer, Visitor};
use std::fmt;
use std::str::FromStr;
use validator::ValidationError;

/// Maximum number of decimal places an amount may carry.
pub const MAX_SCALE: u32 = 2;

struct AmountVisitor;

impl Visitor<'_> for AmountVisitor {
    type Value = Decimal;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a number or a numeric string")
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<Decimal, E> {
        Decimal::from_str(value.trim())
            .map_err(|_| E::custom(format!("The amount field must be a number, got '{}'", value)))
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<Decimal, E> {
        Ok(Decimal::from(value))
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<Decimal, E> {
        Ok(Decimal::from(value))
    }

    fn visit_f64<E: de::Error>(self, value: f64) -> Result<Decimal, E> {
        // Go through the shortest decimal representation so 99.99 stays 99.99.
        Decimal::from_str(&value.to_string())
            .map_err(|_| E::custom(format!("The amount field must be a number, got {}", value)))
    }
}

/// Serde helper for `#[serde(deserialize_with = "...")]`.
pub fn deserialize<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_any(AmountVisitor)
}

/// Amounts must be non-negative with at most two decimal places.
pub fn validate_amount(amount: &Decimal) -> Result<(), ValidationError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        let mut error = ValidationError::new("min");
        error.message = Some("The amount field must be at least 0.".into());
        return Err(error);
    }
    if amount.scale() > MAX_SCALE {
        let mut error = ValidationError::new("decimal");
        error.message = Some("The amount field must have 0-2 decimal places.".into());
        return Err(error);
    }
    Ok(())
}
