//! Carrier pricing document: carriers, formats, limits and step prices.

use common::Money;
use serde::{Deserialize, Serialize};

use crate::error::PricingError;

/// Slack for floating-point weight and size comparisons.
pub(crate) const TOLERANCE: f64 = 1e-9;

/// True if `value` does not exceed `limit`, allowing for rounding noise.
pub(crate) fn within(value: f64, limit: f64) -> bool {
    value <= limit + TOLERANCE
}

/// Per-parcel ceilings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParcelLimits {
    pub max_weight_kg: f64,
    pub max_side_cm: f64,
    pub max_sum_of_sides_cm: f64,
}

impl ParcelLimits {
    /// Element-wise minimum of two limit sets.
    pub fn tightest(&self, other: &ParcelLimits) -> ParcelLimits {
        ParcelLimits {
            max_weight_kg: self.max_weight_kg.min(other.max_weight_kg),
            max_side_cm: self.max_side_cm.min(other.max_side_cm),
            max_sum_of_sides_cm: self.max_sum_of_sides_cm.min(other.max_sum_of_sides_cm),
        }
    }

    fn validate(&self, owner: &str) -> Result<(), PricingError> {
        for (name, value) in [
            ("max_weight_kg", self.max_weight_kg),
            ("max_side_cm", self.max_side_cm),
            ("max_sum_of_sides_cm", self.max_sum_of_sides_cm),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(PricingError::Invalid(format!(
                    "{owner}: {name} must be a positive number, got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// One row of a step price table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceStep {
    pub max_weight_kg: f64,
    pub price: Money,
}

/// Step price table, sorted by strictly increasing weight ceiling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PriceTable(Vec<PriceStep>);

impl PriceTable {
    pub fn new(steps: Vec<PriceStep>) -> Self {
        Self(steps)
    }

    pub fn steps(&self) -> &[PriceStep] {
        &self.0
    }

    /// Price of the first step whose ceiling is at least `weight_kg`.
    ///
    /// Returns `None` when the weight exceeds the last step.
    pub fn price_for(&self, weight_kg: f64) -> Option<Money> {
        let idx = self
            .0
            .partition_point(|step| !within(weight_kg, step.max_weight_kg));
        self.0.get(idx).map(|step| step.price)
    }

    fn validate(&self, owner: &str) -> Result<(), PricingError> {
        if self.0.is_empty() {
            return Err(PricingError::Invalid(format!("{owner}: price table is empty")));
        }
        for step in &self.0 {
            if !step.max_weight_kg.is_finite() || step.max_weight_kg <= 0.0 {
                return Err(PricingError::Invalid(format!(
                    "{owner}: step ceiling must be positive, got {}",
                    step.max_weight_kg
                )));
            }
            if step.price.is_negative() {
                return Err(PricingError::Invalid(format!(
                    "{owner}: step price must not be negative, got {}",
                    step.price
                )));
            }
        }
        if self
            .0
            .windows(2)
            .any(|pair| pair[0].max_weight_kg >= pair[1].max_weight_kg)
        {
            return Err(PricingError::Invalid(format!(
                "{owner}: step ceilings must be strictly increasing"
            )));
        }
        Ok(())
    }
}

/// A carrier-specific size class with its own limits and prices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarrierFormat {
    pub name: String,
    #[serde(flatten)]
    pub limits: ParcelLimits,
    pub price_steps: PriceTable,
}

/// Pricing and size rules for one carrier. Replaced wholesale on reload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarrierProfile {
    pub carrier_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    pub limits: ParcelLimits,
    pub formats: Vec<CarrierFormat>,
}

impl CarrierProfile {
    /// Limits a parcel must satisfy when shipped in `format`.
    pub fn effective_limits(&self, format: &CarrierFormat) -> ParcelLimits {
        self.limits.tightest(&format.limits)
    }
}

/// Subtotal above which shipping is free.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FreeShipping {
    pub enabled: bool,
    pub threshold: Money,
}

impl FreeShipping {
    pub fn applies_to(&self, subtotal: Money) -> bool {
        self.enabled && subtotal >= self.threshold
    }
}

/// The full pricing document: shipping settings plus carriers in
/// declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarrierDocument {
    #[serde(default)]
    pub markup_percent: u32,
    #[serde(default)]
    pub free_shipping: FreeShipping,
    pub carriers: Vec<CarrierProfile>,
}

impl CarrierDocument {
    /// Parses and validates a JSON document.
    pub fn from_json(raw: &str) -> Result<Self, PricingError> {
        let document: CarrierDocument = serde_json::from_str(raw)?;
        document.validate()?;
        Ok(document)
    }

    /// Checks the rules a usable document must satisfy.
    pub fn validate(&self) -> Result<(), PricingError> {
        if self.carriers.is_empty() {
            return Err(PricingError::Invalid("no carriers configured".to_string()));
        }
        if self.free_shipping.threshold.is_negative() {
            return Err(PricingError::Invalid(
                "free shipping threshold must not be negative".to_string(),
            ));
        }

        let mut seen = std::collections::HashSet::new();
        for carrier in &self.carriers {
            if carrier.carrier_id.trim().is_empty() {
                return Err(PricingError::Invalid("carrier_id must not be empty".to_string()));
            }
            if !seen.insert(carrier.carrier_id.as_str()) {
                return Err(PricingError::Invalid(format!(
                    "duplicate carrier_id {}",
                    carrier.carrier_id
                )));
            }
            carrier.limits.validate(&carrier.carrier_id)?;
            if carrier.formats.is_empty() {
                return Err(PricingError::Invalid(format!(
                    "{}: at least one format is required",
                    carrier.carrier_id
                )));
            }
            for format in &carrier.formats {
                let owner = format!("{}/{}", carrier.carrier_id, format.name);
                format.limits.validate(&owner)?;
                format.price_steps.validate(&owner)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(steps: &[(f64, i64)]) -> PriceTable {
        PriceTable::new(
            steps
                .iter()
                .map(|&(w, p)| PriceStep {
                    max_weight_kg: w,
                    price: Money::from_cents(p),
                })
                .collect(),
        )
    }

    #[test]
    fn test_price_lookup_picks_first_step_at_or_above_weight() {
        let t = table(&[(1.0, 100), (5.0, 200), (10.0, 300)]);
        assert_eq!(t.price_for(0.2), Some(Money::from_cents(100)));
        assert_eq!(t.price_for(1.0), Some(Money::from_cents(100)));
        assert_eq!(t.price_for(1.01), Some(Money::from_cents(200)));
        assert_eq!(t.price_for(10.0), Some(Money::from_cents(300)));
        assert_eq!(t.price_for(10.5), None);
    }

    #[test]
    fn test_price_lookup_tolerates_float_noise() {
        let t = table(&[(0.3, 100), (1.0, 200)]);
        assert_eq!(t.price_for(0.1 + 0.2), Some(Money::from_cents(100)));
    }

    #[test]
    fn test_validate_rejects_non_increasing_steps() {
        let t = table(&[(5.0, 100), (5.0, 200)]);
        assert!(matches!(t.validate("c/f"), Err(PricingError::Invalid(_))));
        let t = table(&[(5.0, 100), (2.0, 200)]);
        assert!(t.validate("c/f").is_err());
        assert!(table(&[]).validate("c/f").is_err());
    }

    #[test]
    fn test_effective_limits_take_minimum() {
        let carrier = ParcelLimits {
            max_weight_kg: 30.0,
            max_side_cm: 100.0,
            max_sum_of_sides_cm: 200.0,
        };
        let format = ParcelLimits {
            max_weight_kg: 40.0,
            max_side_cm: 60.0,
            max_sum_of_sides_cm: 250.0,
        };
        let tight = carrier.tightest(&format);
        assert_eq!(tight.max_weight_kg, 30.0);
        assert_eq!(tight.max_side_cm, 60.0);
        assert_eq!(tight.max_sum_of_sides_cm, 200.0);
    }

    #[test]
    fn test_free_shipping_threshold_is_inclusive() {
        let rule = FreeShipping {
            enabled: true,
            threshold: Money::from_cents(10_000),
        };
        assert!(rule.applies_to(Money::from_cents(10_000)));
        assert!(!rule.applies_to(Money::from_cents(9_999)));

        let disabled = FreeShipping {
            enabled: false,
            ..rule
        };
        assert!(!disabled.applies_to(Money::from_cents(1_000_000)));
    }

    #[test]
    fn test_document_validation() {
        let raw = r#"{
            "carriers": [
                {
                    "carrier_id": "a",
                    "max_weight_kg": 10, "max_side_cm": 50, "max_sum_of_sides_cm": 100,
                    "formats": [{
                        "name": "standard",
                        "max_weight_kg": 10, "max_side_cm": 50, "max_sum_of_sides_cm": 100,
                        "price_steps": [{"max_weight_kg": 10, "price": 999}]
                    }]
                },
                {
                    "carrier_id": "a",
                    "max_weight_kg": 10, "max_side_cm": 50, "max_sum_of_sides_cm": 100,
                    "formats": []
                }
            ]
        }"#;
        let err = CarrierDocument::from_json(raw).unwrap_err();
        assert!(err.to_string().contains("duplicate carrier_id"));

        let empty = r#"{"carriers": []}"#;
        assert!(CarrierDocument::from_json(empty).is_err());

        assert!(matches!(
            CarrierDocument::from_json("not json"),
            Err(PricingError::Parse(_))
        ));
    }
}
