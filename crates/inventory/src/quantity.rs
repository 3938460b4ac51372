//! Quantities and the primary/secondary unit conversion.

use serde::{Deserialize, Serialize};

use larder_core::ValueObject;

/// Reconcile a primary/secondary split into a single combined figure.
///
/// `factor` is "primary units per one secondary unit". A factor of zero (or
/// anything not positive) means no secondary unit is configured and the
/// secondary figure is ignored.
pub fn combine(primary: f64, secondary: f64, factor: f64) -> f64 {
    if factor > 0.0 {
        primary + secondary * factor
    } else {
        primary
    }
}

/// A resolved quantity: the combined figure plus the split it came from.
#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Quantity {
    pub combined: f64,
    pub primary: f64,
    pub secondary: f64,
}

impl ValueObject for Quantity {}

impl Quantity {
    /// A quantity expressed only in primary units.
    pub fn primary_only(value: f64) -> Self {
        Self {
            combined: value,
            primary: value,
            secondary: 0.0,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.combined == 0.0 && self.primary == 0.0 && self.secondary == 0.0
    }

    /// Re-derive the combined figure from the split using another factor.
    pub fn reconverted(self, factor: f64) -> Self {
        Self {
            combined: combine(self.primary, self.secondary, factor),
            ..self
        }
    }
}

/// Raw quantity as it arrives from a caller.
///
/// Legacy callers send one figure per field; newer ones send the split and
/// the item's conversion factor. Both resolve to the same [`Quantity`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum QuantityInput {
    Combined(f64),
    Split { primary: f64, secondary: f64, factor: f64 },
}

impl QuantityInput {
    pub fn resolve(self) -> Quantity {
        match self {
            QuantityInput::Combined(value) => Quantity::primary_only(value),
            QuantityInput::Split {
                primary,
                secondary,
                factor,
            } => Quantity {
                combined: combine(primary, secondary, factor),
                primary,
                secondary,
            },
        }
    }
}

impl From<QuantityInput> for Quantity {
    fn from(input: QuantityInput) -> Self {
        input.resolve()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn split_opening_with_bags_of_fifty() {
        let q = QuantityInput::Split {
            primary: 5.0,
            secondary: 2.0,
            factor: 50.0,
        }
        .resolve();
        assert_eq!(q.combined, 105.0);
        assert_eq!(q.primary, 5.0);
        assert_eq!(q.secondary, 2.0);
    }

    #[test]
    fn zero_factor_ignores_secondary() {
        let q = QuantityInput::Split {
            primary: 3.0,
            secondary: 9.0,
            factor: 0.0,
        }
        .resolve();
        assert_eq!(q.combined, 3.0);
        // The split is kept as entered even though it does not contribute.
        assert_eq!(q.secondary, 9.0);
    }

    #[test]
    fn combined_input_is_all_primary() {
        let q = QuantityInput::Combined(12.5).resolve();
        assert_eq!(q, Quantity::primary_only(12.5));
    }

    #[test]
    fn reconverted_uses_new_factor() {
        let q = QuantityInput::Split {
            primary: 1.0,
            secondary: 2.0,
            factor: 0.0,
        }
        .resolve()
        .reconverted(10.0);
        assert_eq!(q.combined, 21.0);
    }

    proptest! {
        #[test]
        fn zero_factor_combined_equals_primary(
            primary in 0.0f64..1_000_000.0,
            secondary in 0.0f64..1_000_000.0,
        ) {
            prop_assert_eq!(combine(primary, secondary, 0.0), primary);
        }

        #[test]
        fn positive_factor_adds_scaled_secondary(
            primary in 0.0f64..1_000_000.0,
            secondary in 0.0f64..10_000.0,
            factor in 0.001f64..1_000.0,
        ) {
            prop_assert_eq!(combine(primary, secondary, factor), primary + secondary * factor);
        }
    }
}
