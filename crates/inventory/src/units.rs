//! Unit configuration of a stocked good.

use core::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use larder_core::{DomainError, DomainResult, ValueObject};

use crate::quantity::{Quantity, QuantityInput};

/// Unit every quantity of an item is counted in.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimaryUnit {
    #[default]
    Kg,
    Lit,
    Piece,
    /// Free-text unit; the label lives in [`UnitConfig::custom_primary_unit`].
    Custom,
}

impl FromStr for PrimaryUnit {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "kg" => Ok(PrimaryUnit::Kg),
            "lit" => Ok(PrimaryUnit::Lit),
            "piece" => Ok(PrimaryUnit::Piece),
            "custom" => Ok(PrimaryUnit::Custom),
            other => Err(DomainError::validation(format!(
                "primaryUnit must be one of: kg, lit, piece, custom (got {other:?})"
            ))),
        }
    }
}

/// Countable packaging unit (a bag of flour, a tin of oil).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum SecondaryUnit {
    Bag,
    Carton,
    Tin,
    Packets,
}

impl SecondaryUnit {
    pub fn as_str(self) -> &'static str {
        match self {
            SecondaryUnit::Bag => "bag",
            SecondaryUnit::Carton => "carton",
            SecondaryUnit::Tin => "tin",
            SecondaryUnit::Packets => "packets",
        }
    }

    /// Parse the wire form, where the empty string means "no secondary unit".
    pub fn parse_optional(s: &str) -> DomainResult<Option<Self>> {
        match s.trim().to_lowercase().as_str() {
            "" => Ok(None),
            "bag" => Ok(Some(SecondaryUnit::Bag)),
            "carton" => Ok(Some(SecondaryUnit::Carton)),
            "tin" => Ok(Some(SecondaryUnit::Tin)),
            "packets" => Ok(Some(SecondaryUnit::Packets)),
            other => Err(DomainError::validation(format!(
                "secondaryUnit must be one of: bag, carton, tin, packets or empty (got {other:?})"
            ))),
        }
    }
}

mod secondary_unit_wire {
    use super::*;

    pub fn serialize<S: Serializer>(unit: &Option<SecondaryUnit>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(unit.map(SecondaryUnit::as_str).unwrap_or(""))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<SecondaryUnit>, D::Error> {
        let raw: Option<String> = Option::deserialize(d)?;
        match raw {
            None => Ok(None),
            Some(s) => SecondaryUnit::parse_optional(&s).map_err(serde::de::Error::custom),
        }
    }
}

/// How an item is measured and how its secondary unit converts.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitConfig {
    #[serde(default)]
    pub primary_unit: PrimaryUnit,
    #[serde(default)]
    pub custom_primary_unit: String,
    #[serde(default, with = "secondary_unit_wire")]
    pub secondary_unit: Option<SecondaryUnit>,
    /// Primary units per one secondary unit; 0 means "ignore secondary".
    #[serde(default)]
    pub quantity_per_secondary_unit: f64,
}

impl ValueObject for UnitConfig {}

impl UnitConfig {
    pub fn new(
        primary_unit: PrimaryUnit,
        custom_primary_unit: impl Into<String>,
        secondary_unit: Option<SecondaryUnit>,
        quantity_per_secondary_unit: f64,
    ) -> DomainResult<Self> {
        let config = Self {
            primary_unit,
            custom_primary_unit: custom_primary_unit.into().trim().to_string(),
            secondary_unit,
            quantity_per_secondary_unit,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.primary_unit == PrimaryUnit::Custom && self.custom_primary_unit.is_empty() {
            return Err(DomainError::validation(
                "customPrimaryUnit is required when primaryUnit is custom",
            ));
        }
        if !self.quantity_per_secondary_unit.is_finite() || self.quantity_per_secondary_unit < 0.0 {
            return Err(DomainError::validation(
                "quantityPerSecondaryUnit cannot be negative",
            ));
        }
        Ok(())
    }

    pub fn factor(&self) -> f64 {
        self.quantity_per_secondary_unit
    }

    /// Build a split input using this configuration's conversion factor.
    pub fn split(&self, primary: f64, secondary: f64) -> QuantityInput {
        QuantityInput::Split {
            primary,
            secondary,
            factor: self.factor(),
        }
    }

    /// Resolve a split pair straight to a [`Quantity`].
    pub fn quantity(&self, primary: f64, secondary: f64) -> Quantity {
        self.split(primary, secondary).resolve()
    }
}
