use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use larder_core::{DomainError, DomainResult, Entity, ItemId};

use crate::ledger::{FlowInputs, Ledger, LedgerState};
use crate::rollover::Rollover;
use crate::units::UnitConfig;

/// Everything a caller supplies when creating or overwriting an item.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ItemDraft {
    pub name: String,
    pub units: UnitConfig,
    pub minimum_quantity: f64,
    pub inputs: FlowInputs,
}

impl ItemDraft {
    pub fn validate(&self) -> DomainResult<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("name is required"));
        }
        self.units.validate()?;
        if !self.minimum_quantity.is_finite() || self.minimum_quantity < 0.0 {
            return Err(DomainError::validation("minimumQuantity cannot be negative"));
        }
        if !self.inputs.stays_finite() {
            return Err(DomainError::validation("quantities are too large to add up"));
        }
        Ok(())
    }
}

/// Live "today" state of one stocked good.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    id: ItemId,
    name: String,
    #[serde(flatten)]
    units: UnitConfig,
    #[serde(default)]
    minimum_quantity: f64,
    #[serde(flatten)]
    ledger: Ledger,
    #[serde(default)]
    current_stock: f64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl InventoryItem {
    pub fn create(id: ItemId, draft: ItemDraft, now: DateTime<Utc>) -> DomainResult<Self> {
        draft.validate()?;
        let ledger = Ledger::compute(&draft.inputs);
        Ok(Self {
            id,
            name: draft.name.trim().to_string(),
            units: draft.units,
            minimum_quantity: draft.minimum_quantity,
            current_stock: ledger.current_stock(),
            ledger,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn units(&self) -> &UnitConfig {
        &self.units
    }

    pub fn minimum_quantity(&self) -> f64 {
        self.minimum_quantity
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn current_stock(&self) -> f64 {
        self.current_stock
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn state(&self) -> LedgerState {
        self.ledger.state()
    }

    /// Full overwrite: every caller-supplied field is replaced, derived
    /// fields are recomputed. Identity and creation time are kept.
    pub fn apply_update(&mut self, draft: ItemDraft, now: DateTime<Utc>) -> DomainResult<()> {
        draft.validate()?;
        self.name = draft.name.trim().to_string();
        self.units = draft.units;
        self.minimum_quantity = draft.minimum_quantity;
        self.set_ledger(Ledger::compute(&draft.inputs), now);
        Ok(())
    }

    /// What tomorrow would open with if the day were closed now.
    pub fn tomorrow_opening(&self) -> Rollover {
        Rollover::close(&self.ledger)
    }

    /// Close the day: carry the final stock forward and reset all flows.
    pub fn roll_over(&mut self, now: DateTime<Utc>) -> Rollover {
        let rollover = self.tomorrow_opening();
        self.set_ledger(rollover.settled_ledger(), now);
        rollover
    }

    /// Undo legacy data where the opening figure was copied into every flow
    /// field. Returns whether the item was changed.
    pub fn repair_duplicated_flows(&mut self, now: DateTime<Utc>) -> bool {
        let l = &self.ledger;
        let opening = l.opening_stock;
        let duplicated = opening > 0.0
            && [l.received, l.consumed, l.received2, l.consumed2]
                .iter()
                .all(|v| *v == opening);
        if !duplicated {
            return false;
        }
        let settled = Ledger::settled(self.ledger.inputs().opening);
        self.set_ledger(settled, now);
        true
    }

    fn set_ledger(&mut self, ledger: Ledger, now: DateTime<Utc>) {
        self.current_stock = ledger.current_stock();
        self.ledger = ledger;
        self.updated_at = now;
    }
}

impl Entity for InventoryItem {
    type Id = ItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
