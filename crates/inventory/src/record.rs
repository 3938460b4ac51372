//! Dated snapshots of an item's ledger.
//!
//! Records are associated with items by name, never by id. Several records
//! for the same (item name, date) pair may exist; helpers that look one up
//! by that pair act on the first match.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use larder_core::{DomainError, DomainResult, Entity, RecordId};

use crate::item::InventoryItem;
use crate::ledger::{FlowInputs, Ledger, LedgerState};
use crate::quantity::Quantity;
use crate::rollover::Rollover;
use crate::units::UnitConfig;

/// Caller-supplied content of an explicit record.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordDraft {
    pub item_name: String,
    pub date: NaiveDate,
    pub units: UnitConfig,
    pub inputs: FlowInputs,
}

impl RecordDraft {
    pub fn validate(&self) -> DomainResult<()> {
        if self.item_name.trim().is_empty() {
            return Err(DomainError::validation("itemName is required"));
        }
        self.units.validate()?;
        ensure_finite(&self.inputs)
    }
}

fn ensure_finite(inputs: &FlowInputs) -> DomainResult<()> {
    if inputs.stays_finite() {
        Ok(())
    } else {
        Err(DomainError::validation("quantities are too large to add up"))
    }
}

/// One day entry as posted by the day-sheet screen: combined figures only.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct DayEntry {
    /// `None` keeps the opening of an existing record.
    pub opening: Option<f64>,
    pub received: f64,
    pub consumed: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryRecord {
    id: RecordId,
    date: NaiveDate,
    item_name: String,
    #[serde(flatten)]
    units: UnitConfig,
    #[serde(flatten)]
    ledger: Ledger,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl InventoryRecord {
    fn new(item_name: String, date: NaiveDate, units: UnitConfig, ledger: Ledger, now: DateTime<Utc>) -> Self {
        Self {
            id: RecordId::new(),
            date,
            item_name,
            units,
            ledger,
            created_at: now,
            updated_at: now,
        }
    }

    /// An explicitly entered record; the derived chain comes from the engine.
    pub fn create(draft: RecordDraft, now: DateTime<Utc>) -> DomainResult<Self> {
        draft.validate()?;
        Ok(Self::new(
            draft.item_name.trim().to_string(),
            draft.date,
            draft.units,
            Ledger::compute(&draft.inputs),
            now,
        ))
    }

    /// Copy of an item's current ledger, dated `date`.
    pub fn snapshot_of(item: &InventoryItem, date: NaiveDate, now: DateTime<Utc>) -> Self {
        Self::new(
            item.name().to_string(),
            date,
            item.units().clone(),
            item.ledger().clone(),
            now,
        )
    }

    /// A settled record that opens with what a rollover carried forward.
    pub fn opening_for(item: &InventoryItem, date: NaiveDate, rollover: &Rollover, now: DateTime<Utc>) -> Self {
        Self::new(
            item.name().to_string(),
            date,
            item.units().clone(),
            rollover.settled_ledger(),
            now,
        )
    }

    /// A new record for a day entry.
    pub fn from_day_entry(
        item_name: impl Into<String>,
        date: NaiveDate,
        entry: DayEntry,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let item_name = item_name.into().trim().to_string();
        if item_name.is_empty() {
            return Err(DomainError::validation("itemName is required"));
        }
        let inputs = FlowInputs {
            opening: Quantity::primary_only(entry.opening.unwrap_or(0.0)),
            received: Quantity::primary_only(entry.received),
            consumed: Quantity::primary_only(entry.consumed),
            ..FlowInputs::default()
        };
        ensure_finite(&inputs)?;
        Ok(Self::new(item_name, date, UnitConfig::default(), Ledger::compute(&inputs), now))
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn item_name(&self) -> &str {
        &self.item_name
    }

    pub fn units(&self) -> &UnitConfig {
        &self.units
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn state(&self) -> LedgerState {
        self.ledger.state()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Overwrite the opening with a rollover's carry, keeping the day's flows.
    pub fn reopen_with(&mut self, rollover: &Rollover, now: DateTime<Utc>) {
        self.ledger = self.ledger.with_opening(rollover.opening);
        self.updated_at = now;
    }

    /// Replace ledger and units with the item's current state.
    pub fn refresh_from(&mut self, item: &InventoryItem, now: DateTime<Utc>) {
        self.units = item.units().clone();
        self.ledger = item.ledger().clone();
        self.updated_at = now;
    }

    /// Full overwrite by an explicit edit.
    pub fn apply_update(&mut self, draft: RecordDraft, now: DateTime<Utc>) -> DomainResult<()> {
        draft.validate()?;
        self.item_name = draft.item_name.trim().to_string();
        self.date = draft.date;
        self.units = draft.units;
        self.ledger = Ledger::compute(&draft.inputs);
        self.updated_at = now;
        Ok(())
    }

    /// Overwrite the first receive/consume cycle from a day entry; the second
    /// cycle and the unit configuration are kept.
    pub fn apply_day_entry(&mut self, entry: DayEntry, now: DateTime<Utc>) -> DomainResult<()> {
        let mut inputs = self.ledger.inputs();
        if let Some(opening) = entry.opening {
            inputs.opening = Quantity::primary_only(opening);
        }
        inputs.received = Quantity::primary_only(entry.received);
        inputs.consumed = Quantity::primary_only(entry.consumed);
        ensure_finite(&inputs)?;
        self.ledger = Ledger::compute(&inputs);
        self.updated_at = now;
        Ok(())
    }

    /// Take over an item's unit configuration. Combined figures are
    /// re-derived from the split with the new factor. Returns whether
    /// anything changed. Units whose factor would overflow the figures are
    /// not adopted.
    pub fn adopt_units(&mut self, units: &UnitConfig, now: DateTime<Utc>) -> bool {
        if &self.units == units {
            return false;
        }
        let inputs = self.ledger.inputs();
        let split_recorded = [
            inputs.opening,
            inputs.received,
            inputs.consumed,
            inputs.received2,
            inputs.consumed2,
        ]
        .iter()
        .any(|q| q.secondary != 0.0);
        if split_recorded {
            let reconverted = inputs.reconverted(units.factor());
            if !reconverted.stays_finite() {
                return false;
            }
            self.ledger = Ledger::compute(&reconverted);
        }
        self.units = units.clone();
        self.updated_at = now;
        true
    }
}

impl Entity for InventoryRecord {
    type Id = RecordId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::ItemDraft;
    use crate::quantity::QuantityInput;
    use crate::units::{PrimaryUnit, SecondaryUnit};
    use larder_core::ItemId;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-10T20:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    fn item(opening: f64, received: f64, consumed: f64) -> InventoryItem {
        let q = |v| QuantityInput::Combined(v).resolve();
        InventoryItem::create(
            ItemId::new(1),
            ItemDraft {
                name: "Onion".to_string(),
                units: UnitConfig::default(),
                minimum_quantity: 0.0,
                inputs: FlowInputs {
                    opening: q(opening),
                    received: q(received),
                    consumed: q(consumed),
                    ..FlowInputs::default()
                },
            },
            now(),
        )
        .unwrap()
    }

    #[test]
    fn explicit_record_gets_engine_computed_chain() {
        let record = InventoryRecord::create(
            RecordDraft {
                item_name: " Onion ".to_string(),
                date: day(10),
                units: UnitConfig::default(),
                inputs: FlowInputs {
                    opening: Quantity::primary_only(12.0),
                    consumed: Quantity::primary_only(2.0),
                    ..FlowInputs::default()
                },
            },
            now(),
        )
        .unwrap();
        assert_eq!(record.item_name(), "Onion");
        assert_eq!(record.ledger().total, 12.0);
        assert_eq!(record.ledger().final_stock, 10.0);
    }

    #[test]
    fn snapshot_copies_item_ledger() {
        let it = item(10.0, 5.0, 3.0);
        let record = InventoryRecord::snapshot_of(&it, day(10), now());
        assert_eq!(record.item_name(), "Onion");
        assert_eq!(record.date(), day(10));
        assert_eq!(record.ledger(), it.ledger());
    }

    #[test]
    fn opening_for_is_settled() {
        let it = item(10.0, 5.0, 3.0);
        let rollover = it.tomorrow_opening();
        let record = InventoryRecord::opening_for(&it, day(11), &rollover, now());
        assert_eq!(record.state(), LedgerState::Settled);
        assert_eq!(record.ledger().opening_stock, 12.0);
        assert_eq!(record.ledger().final_stock, 12.0);
    }

    #[test]
    fn reopen_keeps_flows_and_recomputes() {
        let it = item(10.0, 0.0, 0.0);
        let mut record = InventoryRecord::snapshot_of(&item(1.0, 4.0, 2.0), day(11), now());
        record.reopen_with(&it.tomorrow_opening(), now());
        assert_eq!(record.ledger().opening_stock, 10.0);
        assert_eq!(record.ledger().received, 4.0);
        assert_eq!(record.ledger().final_stock, 12.0);
    }

    #[test]
    fn day_entry_keeps_existing_opening_when_omitted() {
        let mut record = InventoryRecord::snapshot_of(&item(8.0, 0.0, 0.0), day(10), now());
        record.apply_day_entry(
            DayEntry {
                opening: None,
                received: 2.0,
                consumed: 1.0,
            },
            now(),
        )
        .unwrap();
        assert_eq!(record.ledger().opening_stock, 8.0);
        assert_eq!(record.ledger().total, 10.0);
        assert_eq!(record.ledger().final_stock, 9.0);
    }

    #[test]
    fn new_day_entry_defaults_opening_to_zero() {
        let record = InventoryRecord::from_day_entry(
            "Salt",
            day(10),
            DayEntry {
                opening: None,
                received: 3.0,
                consumed: 0.0,
            },
            now(),
        )
        .unwrap();
        assert_eq!(record.ledger().total, 3.0);
        assert_eq!(record.units().primary_unit, PrimaryUnit::Kg);
    }

    #[test]
    fn adopt_units_reconverts_split_figures() {
        let old = UnitConfig::new(PrimaryUnit::Kg, "", Some(SecondaryUnit::Bag), 25.0).unwrap();
        let mut record = InventoryRecord::create(
            RecordDraft {
                item_name: "Flour".to_string(),
                date: day(10),
                units: old.clone(),
                inputs: FlowInputs::opening_only(old.quantity(0.0, 2.0)),
            },
            now(),
        )
        .unwrap();
        assert_eq!(record.ledger().opening_stock, 50.0);

        let new = UnitConfig::new(PrimaryUnit::Kg, "", Some(SecondaryUnit::Bag), 50.0).unwrap();
        assert!(record.adopt_units(&new, now()));
        assert_eq!(record.ledger().opening_stock, 100.0);
        assert_eq!(record.units(), &new);
        assert!(!record.adopt_units(&new, now()));
    }

    #[test]
    fn adopt_units_leaves_legacy_figures_alone() {
        let mut record = InventoryRecord::snapshot_of(&item(8.0, 0.0, 0.0), day(10), now());
        let new = UnitConfig::new(PrimaryUnit::Lit, "", None, 0.0).unwrap();
        assert!(record.adopt_units(&new, now()));
        assert_eq!(record.ledger().opening_stock, 8.0);
    }

    #[test]
    fn day_entry_that_overflows_is_rejected() {
        let mut record = InventoryRecord::snapshot_of(&item(f64::MAX, 0.0, 0.0), day(10), now());
        let before = record.clone();
        let err = record
            .apply_day_entry(
                DayEntry {
                    opening: None,
                    received: f64::MAX,
                    consumed: 0.0,
                },
                now(),
            )
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(record, before);
    }

    #[test]
    fn adopt_units_refuses_an_overflowing_factor() {
        let old = UnitConfig::new(PrimaryUnit::Kg, "", Some(SecondaryUnit::Bag), 1.0).unwrap();
        let mut record = InventoryRecord::create(
            RecordDraft {
                item_name: "Flour".to_string(),
                date: day(10),
                units: old.clone(),
                inputs: FlowInputs::opening_only(old.quantity(0.0, 1e300)),
            },
            now(),
        )
        .unwrap();
        let huge = UnitConfig::new(PrimaryUnit::Kg, "", Some(SecondaryUnit::Bag), 1e300).unwrap();
        assert!(!record.adopt_units(&huge, now()));
        assert_eq!(record.units(), &old);
        assert_eq!(record.ledger().opening_stock, 1e300);
    }

    #[test]
    fn wire_form_uses_plain_date() {
        let record = InventoryRecord::snapshot_of(&item(8.0, 0.0, 0.0), day(10), now());
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["date"], "2026-03-10");
        assert_eq!(json["itemName"], "Onion");
        assert!(json.get("currentStock").is_none());
        let back: InventoryRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }
}
