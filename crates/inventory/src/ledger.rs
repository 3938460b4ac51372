//! Derived-field computation for one item-day.
//!
//! A [`Ledger`] is always built from [`FlowInputs`] through [`Ledger::compute`]
//! (or [`Ledger::settled`], which is the same computation with no flow), so
//! the derived chain can never drift from the raw figures.

use serde::{Deserialize, Serialize};

use crate::quantity::Quantity;

/// The five raw quantities of one day.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct FlowInputs {
    pub opening: Quantity,
    pub received: Quantity,
    pub consumed: Quantity,
    pub received2: Quantity,
    pub consumed2: Quantity,
}

impl FlowInputs {
    /// No flow: only an opening quantity.
    pub fn opening_only(opening: Quantity) -> Self {
        Self {
            opening,
            ..Self::default()
        }
    }

    /// Re-derive every combined figure from its split with a new factor.
    pub fn reconverted(self, factor: f64) -> Self {
        Self {
            opening: self.opening.reconverted(factor),
            received: self.received.reconverted(factor),
            consumed: self.consumed.reconverted(factor),
            received2: self.received2.reconverted(factor),
            consumed2: self.consumed2.reconverted(factor),
        }
    }

    /// Whether every figure [`Ledger::compute`] derives from these inputs is
    /// finite. Each derived figure is bounded by the sum of magnitudes.
    pub fn stays_finite(&self) -> bool {
        let all = [self.opening, self.received, self.consumed, self.received2, self.consumed2];
        let bounded = |part: fn(&Quantity) -> f64| all.iter().map(|q| part(q).abs()).sum::<f64>().is_finite();
        bounded(|q| q.combined) && bounded(|q| q.primary) && bounded(|q| q.secondary)
    }
}

/// Whether an item still has movement recorded for the day.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerState {
    /// Some received/consumed figure is non-zero.
    Open,
    /// All flow figures are zero (right after a rollover).
    Settled,
}

/// Raw and derived stock figures, combined and split.
///
/// Combined figures are plain signed arithmetic. Split balances and final
/// stock are clamped at zero, so the two views disagree once consumption
/// exceeds what was on hand.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Ledger {
    pub opening_stock: f64,
    pub received: f64,
    pub consumed: f64,
    pub total: f64,
    pub balance: f64,
    pub received2: f64,
    pub consumed2: f64,
    pub total2: f64,
    pub final_stock: f64,

    pub opening_stock_primary: f64,
    pub opening_stock_secondary: f64,
    pub received_primary: f64,
    pub received_secondary: f64,
    pub consumed_primary: f64,
    pub consumed_secondary: f64,
    pub received2_primary: f64,
    pub received2_secondary: f64,
    pub consumed2_primary: f64,
    pub consumed2_secondary: f64,
    pub balance_primary: f64,
    pub balance_secondary: f64,
    pub final_stock_primary: f64,
    pub final_stock_secondary: f64,
}

impl Ledger {
    pub fn compute(inputs: &FlowInputs) -> Self {
        let FlowInputs {
            opening,
            received,
            consumed,
            received2,
            consumed2,
        } = *inputs;

        let total = opening.combined + received.combined;
        let balance = total - consumed.combined;
        let total2 = balance + received2.combined;
        let final_stock = total2 - consumed2.combined;

        let balance_primary = (opening.primary + received.primary - consumed.primary).max(0.0);
        let balance_secondary =
            (opening.secondary + received.secondary - consumed.secondary).max(0.0);
        let final_stock_primary =
            (balance_primary + received2.primary - consumed2.primary).max(0.0);
        let final_stock_secondary =
            (balance_secondary + received2.secondary - consumed2.secondary).max(0.0);

        Self {
            opening_stock: opening.combined,
            received: received.combined,
            consumed: consumed.combined,
            total,
            balance,
            received2: received2.combined,
            consumed2: consumed2.combined,
            total2,
            final_stock,

            opening_stock_primary: opening.primary,
            opening_stock_secondary: opening.secondary,
            received_primary: received.primary,
            received_secondary: received.secondary,
            consumed_primary: consumed.primary,
            consumed_secondary: consumed.secondary,
            received2_primary: received2.primary,
            received2_secondary: received2.secondary,
            consumed2_primary: consumed2.primary,
            consumed2_secondary: consumed2.secondary,
            balance_primary,
            balance_secondary,
            final_stock_primary,
            final_stock_secondary,
        }
    }

    /// A ledger with only an opening quantity and no movement.
    pub fn settled(opening: Quantity) -> Self {
        Self::compute(&FlowInputs::opening_only(opening))
    }

    /// The raw figures this ledger was computed from.
    pub fn inputs(&self) -> FlowInputs {
        FlowInputs {
            opening: Quantity {
                combined: self.opening_stock,
                primary: self.opening_stock_primary,
                secondary: self.opening_stock_secondary,
            },
            received: Quantity {
                combined: self.received,
                primary: self.received_primary,
                secondary: self.received_secondary,
            },
            consumed: Quantity {
                combined: self.consumed,
                primary: self.consumed_primary,
                secondary: self.consumed_secondary,
            },
            received2: Quantity {
                combined: self.received2,
                primary: self.received2_primary,
                secondary: self.received2_secondary,
            },
            consumed2: Quantity {
                combined: self.consumed2,
                primary: self.consumed2_primary,
                secondary: self.consumed2_secondary,
            },
        }
    }

    /// Stock on hand right now; same as final stock.
    pub fn current_stock(&self) -> f64 {
        self.final_stock
    }

    pub fn state(&self) -> LedgerState {
        let inputs = self.inputs();
        let flows = [
            inputs.received,
            inputs.consumed,
            inputs.received2,
            inputs.consumed2,
        ];
        if flows.iter().all(Quantity::is_zero) {
            LedgerState::Settled
        } else {
            LedgerState::Open
        }
    }

    /// Replace the opening quantity, keeping the day's flows.
    pub fn with_opening(&self, opening: Quantity) -> Self {
        let mut inputs = self.inputs();
        inputs.opening = opening;
        Self::compute(&inputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quantity::QuantityInput;
    use proptest::prelude::*;

    fn combined(opening: f64, received: f64, consumed: f64, received2: f64, consumed2: f64) -> FlowInputs {
        FlowInputs {
            opening: QuantityInput::Combined(opening).resolve(),
            received: QuantityInput::Combined(received).resolve(),
            consumed: QuantityInput::Combined(consumed).resolve(),
            received2: QuantityInput::Combined(received2).resolve(),
            consumed2: QuantityInput::Combined(consumed2).resolve(),
        }
    }

    #[test]
    fn derives_the_full_chain() {
        let ledger = Ledger::compute(&combined(100.0, 20.0, 50.0, 10.0, 5.0));
        assert_eq!(ledger.total, 120.0);
        assert_eq!(ledger.balance, 70.0);
        assert_eq!(ledger.total2, 80.0);
        assert_eq!(ledger.final_stock, 75.0);
        assert_eq!(ledger.current_stock(), 75.0);
        assert_eq!(ledger.state(), LedgerState::Open);
    }

    #[test]
    fn combined_final_stock_may_go_negative_while_split_is_clamped() {
        let ledger = Ledger::compute(&combined(0.0, 0.0, 10.0, 0.0, 0.0));
        assert_eq!(ledger.final_stock, -10.0);
        assert_eq!(ledger.balance_primary, 0.0);
        assert_eq!(ledger.final_stock_primary, 0.0);
    }

    #[test]
    fn split_inputs_feed_both_views() {
        let factor = 50.0;
        let split = |p, s| QuantityInput::Split { primary: p, secondary: s, factor }.resolve();
        let inputs = FlowInputs {
            opening: split(5.0, 2.0),
            received: split(0.0, 1.0),
            consumed: split(20.0, 0.0),
            received2: Quantity::default(),
            consumed2: split(0.0, 1.0),
        };
        let ledger = Ledger::compute(&inputs);

        assert_eq!(ledger.opening_stock, 105.0);
        assert_eq!(ledger.total, 155.0);
        assert_eq!(ledger.final_stock, 85.0);
        // primary: 5 + 0 - 20 clamps to 0; secondary: 2 + 1 - 0 = 3, then - 1.
        assert_eq!(ledger.balance_primary, 0.0);
        assert_eq!(ledger.balance_secondary, 3.0);
        assert_eq!(ledger.final_stock_secondary, 2.0);
    }

    #[test]
    fn settled_ledger_has_no_flow() {
        let ledger = Ledger::settled(Quantity::primary_only(40.0));
        assert_eq!(ledger.state(), LedgerState::Settled);
        assert_eq!(ledger.total, 40.0);
        assert_eq!(ledger.balance, 40.0);
        assert_eq!(ledger.total2, 40.0);
        assert_eq!(ledger.final_stock, 40.0);
        assert_eq!(ledger.final_stock_primary, 40.0);
    }

    #[test]
    fn with_opening_keeps_flows() {
        let ledger = Ledger::compute(&combined(10.0, 5.0, 3.0, 0.0, 0.0));
        let moved = ledger.with_opening(Quantity::primary_only(20.0));
        assert_eq!(moved.received, 5.0);
        assert_eq!(moved.final_stock, 22.0);
    }

    #[test]
    fn serializes_with_wire_field_names() {
        let ledger = Ledger::compute(&combined(1.0, 0.0, 0.0, 0.0, 0.0));
        let json = serde_json::to_value(&ledger).unwrap();
        assert!(json.get("openingStock").is_some());
        assert!(json.get("received2Primary").is_some());
        assert!(json.get("finalStockSecondary").is_some());
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// finalStock is the unclamped signed sum of all movements.
        #[test]
        fn final_stock_is_signed_sum(
            opening in 0u32..100_000,
            received in 0u32..100_000,
            consumed in 0u32..100_000,
            received2 in 0u32..100_000,
            consumed2 in 0u32..100_000,
        ) {
            let (o, r, c, r2, c2) = (opening as f64, received as f64, consumed as f64, received2 as f64, consumed2 as f64);
            let ledger = Ledger::compute(&combined(o, r, c, r2, c2));
            prop_assert_eq!(ledger.final_stock, o + r - c + r2 - c2);
            prop_assert_eq!(ledger.current_stock(), ledger.final_stock);
        }

        /// Split balances and final stock never go below zero.
        #[test]
        fn split_figures_are_non_negative(
            figures in prop::collection::vec((0.0f64..1_000.0, 0.0f64..100.0), 5),
            factor in 0.0f64..100.0,
        ) {
            let q = |i: usize| QuantityInput::Split {
                primary: figures[i].0,
                secondary: figures[i].1,
                factor,
            }.resolve();
            let ledger = Ledger::compute(&FlowInputs {
                opening: q(0),
                received: q(1),
                consumed: q(2),
                received2: q(3),
                consumed2: q(4),
            });
            prop_assert!(ledger.balance_primary >= 0.0);
            prop_assert!(ledger.balance_secondary >= 0.0);
            prop_assert!(ledger.final_stock_primary >= 0.0);
            prop_assert!(ledger.final_stock_secondary >= 0.0);
        }
    }
}
