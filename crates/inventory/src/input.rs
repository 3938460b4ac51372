//! Boundary normalisation of raw quantity input.
//!
//! Callers (the HTTP layer, bulk imports) hand over loosely-typed numbers.
//! Everything is normalised here exactly once; the engine only ever sees
//! finite, non-negative figures.

use serde::Deserialize;

use larder_core::{DomainError, DomainResult};

use crate::ledger::FlowInputs;
use crate::quantity::QuantityInput;
use crate::units::{PrimaryUnit, SecondaryUnit, UnitConfig};

/// A number as typed into a form: either a JSON number or a numeric string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawNumber {
    Number(f64),
    Text(String),
}

impl From<f64> for RawNumber {
    fn from(value: f64) -> Self {
        RawNumber::Number(value)
    }
}

/// Normalise one raw quantity.
///
/// Missing or blank input counts as zero. Text that is not a number and
/// negative values are rejected. Non-finite values count as zero.
pub fn normalize_quantity(field: &str, raw: Option<&RawNumber>) -> DomainResult<f64> {
    let value = match raw {
        None => return Ok(0.0),
        Some(RawNumber::Number(n)) => *n,
        Some(RawNumber::Text(s)) => {
            let s = s.trim();
            if s.is_empty() {
                return Ok(0.0);
            }
            s.parse::<f64>().map_err(|_| {
                DomainError::validation(format!(
                    "invalid value for {field}: {s:?}, must be a valid number"
                ))
            })?
        }
    };

    if !value.is_finite() {
        return Ok(0.0);
    }
    if value < 0.0 {
        return Err(DomainError::validation(format!("{field} cannot be negative")));
    }
    Ok(value)
}

/// Raw unit settings as sent by a caller; defaults match a plain kilogram item.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawUnits {
    pub primary_unit: Option<String>,
    pub custom_primary_unit: Option<String>,
    pub secondary_unit: Option<String>,
    pub quantity_per_secondary_unit: Option<RawNumber>,
}

impl RawUnits {
    pub fn to_unit_config(&self) -> DomainResult<UnitConfig> {
        let primary_unit = match self.primary_unit.as_deref() {
            Some(s) => s.parse::<PrimaryUnit>()?,
            None => PrimaryUnit::default(),
        };
        let secondary_unit = match self.secondary_unit.as_deref() {
            Some(s) => SecondaryUnit::parse_optional(s)?,
            None => None,
        };
        let factor = normalize_quantity(
            "quantityPerSecondaryUnit",
            self.quantity_per_secondary_unit.as_ref(),
        )?;
        UnitConfig::new(
            primary_unit,
            self.custom_primary_unit.clone().unwrap_or_default(),
            secondary_unit,
            factor,
        )
    }
}

/// Raw quantity fields of an item or record payload.
///
/// Two shapes are accepted: the legacy one with only combined figures, and
/// the split one (recognised by the presence of either split opening field)
/// where every flow comes as a primary/secondary pair.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawLedgerInput {
    pub opening_stock: Option<RawNumber>,
    pub received: Option<RawNumber>,
    pub consumed: Option<RawNumber>,
    pub received2: Option<RawNumber>,
    pub consumed2: Option<RawNumber>,

    pub opening_stock_primary: Option<RawNumber>,
    pub opening_stock_secondary: Option<RawNumber>,
    pub received_primary: Option<RawNumber>,
    pub received_secondary: Option<RawNumber>,
    pub consumed_primary: Option<RawNumber>,
    pub consumed_secondary: Option<RawNumber>,
    pub received2_primary: Option<RawNumber>,
    pub received2_secondary: Option<RawNumber>,
    pub consumed2_primary: Option<RawNumber>,
    pub consumed2_secondary: Option<RawNumber>,
}

impl RawLedgerInput {
    pub fn is_split(&self) -> bool {
        self.opening_stock_primary.is_some() || self.opening_stock_secondary.is_some()
    }

    /// Classify every field as [`QuantityInput`] and resolve it.
    pub fn to_flow_inputs(&self, units: &UnitConfig) -> DomainResult<FlowInputs> {
        let q = |field: &str, raw: &Option<RawNumber>| normalize_quantity(field, raw.as_ref());

        let inputs = if self.is_split() {
            let pair = |pf: &str, p: &Option<RawNumber>, sf: &str, s: &Option<RawNumber>| {
                Ok::<_, DomainError>(units.split(q(pf, p)?, q(sf, s)?))
            };
            [
                pair(
                    "openingStockPrimary",
                    &self.opening_stock_primary,
                    "openingStockSecondary",
                    &self.opening_stock_secondary,
                )?,
                pair(
                    "receivedPrimary",
                    &self.received_primary,
                    "receivedSecondary",
                    &self.received_secondary,
                )?,
                pair(
                    "consumedPrimary",
                    &self.consumed_primary,
                    "consumedSecondary",
                    &self.consumed_secondary,
                )?,
                pair(
                    "received2Primary",
                    &self.received2_primary,
                    "received2Secondary",
                    &self.received2_secondary,
                )?,
                pair(
                    "consumed2Primary",
                    &self.consumed2_primary,
                    "consumed2Secondary",
                    &self.consumed2_secondary,
                )?,
            ]
        } else {
            [
                QuantityInput::Combined(q("openingStock", &self.opening_stock)?),
                QuantityInput::Combined(q("received", &self.received)?),
                QuantityInput::Combined(q("consumed", &self.consumed)?),
                QuantityInput::Combined(q("received2", &self.received2)?),
                QuantityInput::Combined(q("consumed2", &self.consumed2)?),
            ]
        };

        let [opening, received, consumed, received2, consumed2] = inputs.map(QuantityInput::resolve);
        let flows = FlowInputs {
            opening,
            received,
            consumed,
            received2,
            consumed2,
        };
        if !flows.stays_finite() {
            return Err(DomainError::validation(
                "quantities are too large once converted to primary units",
            ));
        }
        Ok(flows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(v: f64) -> Option<RawNumber> {
        Some(RawNumber::Number(v))
    }

    #[test]
    fn missing_and_blank_count_as_zero() {
        assert_eq!(normalize_quantity("x", None).unwrap(), 0.0);
        assert_eq!(
            normalize_quantity("x", Some(&RawNumber::Text("  ".into()))).unwrap(),
            0.0
        );
    }

    #[test]
    fn numeric_strings_are_parsed() {
        assert_eq!(
            normalize_quantity("x", Some(&RawNumber::Text("2.5".into()))).unwrap(),
            2.5
        );
    }

    #[test]
    fn garbage_and_negatives_are_rejected() {
        let err = normalize_quantity("received", Some(&RawNumber::Text("lots".into()))).unwrap_err();
        assert!(matches!(err, DomainError::Validation(ref m) if m.contains("received")));

        let err = normalize_quantity("consumed", Some(&RawNumber::Number(-1.0))).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn legacy_payload_becomes_primary_only() {
        let raw = RawLedgerInput {
            opening_stock: num(10.0),
            received: num(4.0),
            ..RawLedgerInput::default()
        };
        let flows = raw.to_flow_inputs(&UnitConfig::default()).unwrap();
        assert_eq!(flows.opening.combined, 10.0);
        assert_eq!(flows.opening.primary, 10.0);
        assert_eq!(flows.received.secondary, 0.0);
        assert_eq!(flows.consumed.combined, 0.0);
    }

    #[test]
    fn split_payload_uses_item_factor_and_ignores_combined_fields() {
        let units = UnitConfig::new(PrimaryUnit::Kg, "", Some(SecondaryUnit::Bag), 50.0).unwrap();
        let raw = RawLedgerInput {
            opening_stock: num(999.0),
            opening_stock_primary: num(5.0),
            opening_stock_secondary: num(2.0),
            received_secondary: num(1.0),
            ..RawLedgerInput::default()
        };
        let flows = raw.to_flow_inputs(&units).unwrap();
        assert_eq!(flows.opening.combined, 105.0);
        assert_eq!(flows.received.combined, 50.0);
    }

    #[test]
    fn overflowing_conversion_is_rejected() {
        let units = UnitConfig::new(PrimaryUnit::Kg, "", Some(SecondaryUnit::Bag), 1e300).unwrap();
        let raw = RawLedgerInput {
            opening_stock_secondary: num(1e300),
            ..RawLedgerInput::default()
        };
        let err = raw.to_flow_inputs(&units).unwrap_err();
        assert!(matches!(err, DomainError::Validation(ref m) if m.contains("too large")));
    }

    #[test]
    fn overflowing_totals_are_rejected() {
        let raw = RawLedgerInput {
            opening_stock: num(f64::MAX),
            received: num(f64::MAX),
            ..RawLedgerInput::default()
        };
        assert!(raw.to_flow_inputs(&UnitConfig::default()).is_err());
    }

    #[test]
    fn raw_units_default_to_kilograms() {
        let config = RawUnits::default().to_unit_config().unwrap();
        assert_eq!(config, UnitConfig::default());
    }

    #[test]
    fn deserializes_numbers_and_strings() {
        let raw: RawLedgerInput = serde_json::from_value(serde_json::json!({
            "openingStock": 3,
            "received": "1.5",
            "consumed": null,
        }))
        .unwrap();
        let flows = raw.to_flow_inputs(&UnitConfig::default()).unwrap();
        assert_eq!(flows.opening.combined, 3.0);
        assert_eq!(flows.received.combined, 1.5);
        assert_eq!(flows.consumed.combined, 0.0);
    }
}
