//! Emission factors and idempotent emission calculations.
//!
//! A calculation converts the requested quantity into the factor's unit and
//! multiplies it by the factor's gCO2e per unit. Conversions only happen
//! inside a unit family: mass (`g`, `kg`), volume (`ml`, `l`) or count
//! (`piece`).

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::{Value, json};
use uuid::Uuid;

use super::{IdempotencyKey, PayloadHash, canonicalize_and_hash};

/// Only method currently implemented.
pub const DIRECT_FACTOR_METHOD: &str = "direct_factor";

/// Unit of a quantity or emission factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuantityUnit {
    Grams,
    Kilograms,
    Millilitres,
    Litres,
    Piece,
}

/// Convertible unit group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitFamily {
    Mass,
    Volume,
    Count,
}

impl QuantityUnit {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Grams => "g",
            Self::Kilograms => "kg",
            Self::Millilitres => "ml",
            Self::Litres => "l",
            Self::Piece => "piece",
        }
    }

    pub const fn family(self) -> UnitFamily {
        match self {
            Self::Grams | Self::Kilograms => UnitFamily::Mass,
            Self::Millilitres | Self::Litres => UnitFamily::Volume,
            Self::Piece => UnitFamily::Count,
        }
    }

    /// Size of one unit in the family's base unit (g, ml, piece).
    const fn base_scale(self) -> f64 {
        match self {
            Self::Kilograms | Self::Litres => 1000.0,
            Self::Grams | Self::Millilitres | Self::Piece => 1.0,
        }
    }

    /// Convert `quantity` of `self` into `target`, if both share a family.
    ///
    /// # Examples
    /// ```
    /// use carbon_tracker::domain::emission::QuantityUnit;
    ///
    /// assert_eq!(QuantityUnit::Grams.convert(500.0, QuantityUnit::Kilograms), Some(0.5));
    /// assert_eq!(QuantityUnit::Litres.convert(1.0, QuantityUnit::Grams), None);
    /// ```
    pub fn convert(self, quantity: f64, target: Self) -> Option<f64> {
        (self.family() == target.family())
            .then(|| quantity * self.base_scale() / target.base_scale())
    }
}

impl fmt::Display for QuantityUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown unit.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported quantity unit: {0}")]
pub struct ParseQuantityUnitError(pub String);

impl FromStr for QuantityUnit {
    type Err = ParseQuantityUnitError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "g" => Ok(Self::Grams),
            "kg" => Ok(Self::Kilograms),
            "ml" => Ok(Self::Millilitres),
            "l" => Ok(Self::Litres),
            "piece" => Ok(Self::Piece),
            other => Err(ParseQuantityUnitError(other.to_owned())),
        }
    }
}

/// Emission factor reference data.
#[derive(Debug, Clone, PartialEq)]
pub struct EmissionFactor {
    pub id: i64,
    pub category_code: String,
    pub unit: QuantityUnit,
    pub factor_gco2e_per_unit: f64,
    pub source: Option<String>,
    pub version: Option<String>,
    pub valid_from: Option<NaiveDate>,
    pub valid_to: Option<NaiveDate>,
}

impl EmissionFactor {
    /// Whether `day` falls within the factor's validity range.
    pub fn is_valid_on(&self, day: NaiveDate) -> bool {
        self.valid_from.is_none_or(|from| from <= day) && self.valid_to.is_none_or(|to| day <= to)
    }
}

/// Validation failures for calculation input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EmissionInputError {
    #[error("category_code must not be empty")]
    EmptyCategory,
    #[error("quantity must be a positive number")]
    NonPositiveQuantity,
}

/// Validated calculation input.
#[derive(Debug, Clone, PartialEq)]
pub struct EmissionInput {
    category_code: String,
    quantity: f64,
    unit: QuantityUnit,
    product_id: Option<String>,
    session_id: Option<String>,
}

impl EmissionInput {
    pub fn new(
        category_code: impl Into<String>,
        quantity: f64,
        unit: QuantityUnit,
        product_id: Option<String>,
        session_id: Option<String>,
    ) -> Result<Self, EmissionInputError> {
        let category_code = category_code.into().trim().to_owned();
        if category_code.is_empty() {
            return Err(EmissionInputError::EmptyCategory);
        }
        if !quantity.is_finite() || quantity <= 0.0 {
            return Err(EmissionInputError::NonPositiveQuantity);
        }
        Ok(Self {
            category_code,
            quantity,
            unit,
            product_id,
            session_id,
        })
    }

    pub fn category_code(&self) -> &str {
        &self.category_code
    }

    pub fn quantity(&self) -> f64 {
        self.quantity
    }

    pub fn unit(&self) -> QuantityUnit {
        self.unit
    }

    pub fn product_id(&self) -> Option<&str> {
        self.product_id.as_deref()
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Canonical JSON form used for the idempotency payload hash.
    pub fn payload(&self) -> Value {
        json!({
            "category_code": self.category_code,
            "quantity": self.quantity,
            "quantity_unit": self.unit.as_str(),
            "product_id": self.product_id,
            "session_id": self.session_id,
        })
    }

    pub fn payload_hash(&self) -> PayloadHash {
        canonicalize_and_hash(&self.payload())
    }

    /// Pick the first factor whose unit family matches the input's.
    pub fn compatible_factor<'a>(&self, factors: &'a [EmissionFactor]) -> Option<&'a EmissionFactor> {
        factors
            .iter()
            .find(|factor| factor.unit.family() == self.unit.family())
    }
}

/// Stored calculation.
#[derive(Debug, Clone, PartialEq)]
pub struct EmissionCalculation {
    pub id: Uuid,
    pub product_id: Option<String>,
    pub category_code: String,
    pub quantity: f64,
    pub quantity_unit: QuantityUnit,
    pub normalized_qty: f64,
    pub factor_id: i64,
    pub emissions_gco2e: f64,
    pub method: String,
    pub session_id: Option<String>,
    pub idempotency_key: IdempotencyKey,
    pub payload_hash: PayloadHash,
    pub created_at: DateTime<Utc>,
}

impl EmissionCalculation {
    /// Compute a new calculation from `input` with a same-family `factor`.
    ///
    /// Returns `None` when the units cannot be converted.
    pub fn compute(
        input: &EmissionInput,
        factor: &EmissionFactor,
        idempotency_key: IdempotencyKey,
        created_at: DateTime<Utc>,
    ) -> Option<Self> {
        let normalized_qty = input.unit.convert(input.quantity, factor.unit)?;
        Some(Self {
            id: Uuid::new_v4(),
            product_id: input.product_id.clone(),
            category_code: input.category_code.clone(),
            quantity: input.quantity,
            quantity_unit: input.unit,
            normalized_qty,
            factor_id: factor.id,
            emissions_gco2e: normalized_qty * factor.factor_gco2e_per_unit,
            method: DIRECT_FACTOR_METHOD.to_owned(),
            session_id: input.session_id.clone(),
            idempotency_key,
            payload_hash: input.payload_hash(),
            created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn factor(unit: QuantityUnit, per_unit: f64) -> EmissionFactor {
        EmissionFactor {
            id: 3,
            category_code: "dairy".to_owned(),
            unit,
            factor_gco2e_per_unit: per_unit,
            source: Some("ADEME".to_owned()),
            version: Some("2024".to_owned()),
            valid_from: NaiveDate::from_ymd_opt(2024, 1, 1),
            valid_to: None,
        }
    }

    #[rstest]
    #[case(QuantityUnit::Grams, 250.0, QuantityUnit::Kilograms, Some(0.25))]
    #[case(QuantityUnit::Litres, 1.5, QuantityUnit::Millilitres, Some(1500.0))]
    #[case(QuantityUnit::Piece, 3.0, QuantityUnit::Piece, Some(3.0))]
    #[case(QuantityUnit::Piece, 3.0, QuantityUnit::Grams, None)]
    fn converts_within_families(
        #[case] from: QuantityUnit,
        #[case] quantity: f64,
        #[case] to: QuantityUnit,
        #[case] expected: Option<f64>,
    ) {
        assert_eq!(from.convert(quantity, to), expected);
    }

    #[rstest]
    #[case("KG", QuantityUnit::Kilograms)]
    #[case(" ml ", QuantityUnit::Millilitres)]
    fn parses_units_case_insensitively(#[case] raw: &str, #[case] expected: QuantityUnit) {
        assert_eq!(raw.parse::<QuantityUnit>(), Ok(expected));
    }

    #[rstest]
    fn rejects_unknown_units() {
        assert!("tonne".parse::<QuantityUnit>().is_err());
    }

    #[rstest]
    #[case(0.0)]
    #[case(-1.0)]
    #[case(f64::NAN)]
    fn rejects_non_positive_quantities(#[case] quantity: f64) {
        let result = EmissionInput::new("dairy", quantity, QuantityUnit::Grams, None, None);
        assert_eq!(result, Err(EmissionInputError::NonPositiveQuantity));
    }

    #[rstest]
    fn computes_emissions_in_factor_units() {
        let input = EmissionInput::new("dairy", 500.0, QuantityUnit::Grams, None, None)
            .expect("valid input");
        let calc = EmissionCalculation::compute(
            &input,
            &factor(QuantityUnit::Kilograms, 1200.0),
            IdempotencyKey::random(),
            Utc::now(),
        )
        .expect("compatible units");
        assert!((calc.normalized_qty - 0.5).abs() < f64::EPSILON);
        assert!((calc.emissions_gco2e - 600.0).abs() < 1e-9);
        assert_eq!(calc.method, DIRECT_FACTOR_METHOD);
    }

    #[rstest]
    fn picks_factor_in_matching_family() {
        let input = EmissionInput::new("milk", 1.0, QuantityUnit::Litres, None, None)
            .expect("valid input");
        let factors = [factor(QuantityUnit::Kilograms, 1.0), factor(QuantityUnit::Millilitres, 2.0)];
        let picked = input.compatible_factor(&factors).expect("volume factor");
        assert_eq!(picked.unit, QuantityUnit::Millilitres);
    }

    #[rstest]
    fn payload_hash_ignores_nothing_but_key_order() {
        let a = EmissionInput::new("dairy", 1.0, QuantityUnit::Kilograms, None, Some("s1".to_owned()))
            .expect("valid input");
        let b = EmissionInput::new("dairy", 1.0, QuantityUnit::Kilograms, None, Some("s2".to_owned()))
            .expect("valid input");
        assert_eq!(a.payload_hash(), a.clone().payload_hash());
        assert_ne!(a.payload_hash(), b.payload_hash());
    }

    #[rstest]
    fn validity_range_is_inclusive() {
        let mut f = factor(QuantityUnit::Grams, 1.0);
        f.valid_to = NaiveDate::from_ymd_opt(2024, 12, 31);
        let last = NaiveDate::from_ymd_opt(2024, 12, 31).expect("date");
        let after = NaiveDate::from_ymd_opt(2025, 1, 1).expect("date");
        assert!(f.is_valid_on(last));
        assert!(!f.is_valid_on(after));
    }
}
