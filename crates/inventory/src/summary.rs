//! Aggregations over a set of records.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::record::InventoryRecord;
use crate::units::UnitConfig;

/// Totals over every record in a period.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordSummary {
    pub total_records: usize,
    /// Both receive cycles.
    pub total_received: f64,
    /// Both consume cycles.
    pub total_consumed: f64,
    pub total_opening_stock: f64,
    pub total_final_stock: f64,
    pub unique_items: usize,
}

impl RecordSummary {
    pub fn of<'a>(records: impl IntoIterator<Item = &'a InventoryRecord>) -> Self {
        let mut summary = Self::default();
        let mut names = BTreeSet::new();
        for record in records {
            let l = record.ledger();
            summary.total_records += 1;
            summary.total_received += l.received + l.received2;
            summary.total_consumed += l.consumed + l.consumed2;
            summary.total_opening_stock += l.opening_stock;
            summary.total_final_stock += l.final_stock;
            names.insert(record.item_name());
        }
        summary.unique_items = names.len();
        summary
    }
}

/// Per-item sums over a period (the month view).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemPeriodTotals {
    pub item_name: String,
    /// Unit configuration of the first record seen for the item.
    #[serde(flatten)]
    pub units: UnitConfig,
    pub record_count: usize,
    pub opening_stock: f64,
    pub received: f64,
    pub consumed: f64,
    pub total: f64,
    pub received2: f64,
    pub consumed2: f64,
    pub final_stock: f64,
}

impl ItemPeriodTotals {
    fn empty(record: &InventoryRecord) -> Self {
        Self {
            item_name: record.item_name().to_string(),
            units: record.units().clone(),
            record_count: 0,
            opening_stock: 0.0,
            received: 0.0,
            consumed: 0.0,
            total: 0.0,
            received2: 0.0,
            consumed2: 0.0,
            final_stock: 0.0,
        }
    }

    fn add(&mut self, record: &InventoryRecord) {
        let l = record.ledger();
        self.record_count += 1;
        self.opening_stock += l.opening_stock;
        self.received += l.received;
        self.consumed += l.consumed;
        self.total += l.total;
        self.received2 += l.received2;
        self.consumed2 += l.consumed2;
        self.final_stock += l.final_stock;
    }
}

/// Group records by item name; result is ordered by name.
pub fn totals_by_item<'a>(records: impl IntoIterator<Item = &'a InventoryRecord>) -> Vec<ItemPeriodTotals> {
    let mut groups: BTreeMap<&str, ItemPeriodTotals> = BTreeMap::new();
    for record in records {
        groups
            .entry(record.item_name())
            .or_insert_with(|| ItemPeriodTotals::empty(record))
            .add(record);
    }
    groups.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::FlowInputs;
    use crate::quantity::Quantity;
    use crate::record::RecordDraft;
    use crate::units::{PrimaryUnit, SecondaryUnit};
    use chrono::{NaiveDate, Utc};

    fn record(name: &str, d: u32, opening: f64, received: f64, consumed: f64, received2: f64) -> InventoryRecord {
        InventoryRecord::create(
            RecordDraft {
                item_name: name.to_string(),
                date: NaiveDate::from_ymd_opt(2026, 2, d).unwrap(),
                units: UnitConfig::default(),
                inputs: FlowInputs {
                    opening: Quantity::primary_only(opening),
                    received: Quantity::primary_only(received),
                    consumed: Quantity::primary_only(consumed),
                    received2: Quantity::primary_only(received2),
                    ..FlowInputs::default()
                },
            },
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn empty_summary_is_zero() {
        assert_eq!(RecordSummary::of(&Vec::<InventoryRecord>::new()), RecordSummary::default());
    }

    #[test]
    fn summary_adds_both_cycles() {
        let records = vec![
            record("Rice", 1, 10.0, 5.0, 3.0, 2.0),
            record("Rice", 2, 14.0, 0.0, 4.0, 0.0),
            record("Oil", 1, 3.0, 1.0, 0.0, 0.0),
        ];
        let s = RecordSummary::of(&records);
        assert_eq!(s.total_records, 3);
        assert_eq!(s.total_received, 8.0);
        assert_eq!(s.total_consumed, 7.0);
        assert_eq!(s.total_opening_stock, 27.0);
        assert_eq!(s.total_final_stock, 14.0 + 10.0 + 4.0);
        assert_eq!(s.unique_items, 2);
    }

    #[test]
    fn totals_group_by_name_in_order() {
        let mut oil = record("Oil", 3, 3.0, 1.0, 0.0, 0.0);
        let tin = UnitConfig::new(PrimaryUnit::Lit, "", Some(SecondaryUnit::Tin), 15.0).unwrap();
        oil.adopt_units(&tin, Utc::now());
        let records = vec![
            record("Rice", 1, 10.0, 5.0, 3.0, 0.0),
            oil,
            record("Rice", 2, 12.0, 0.0, 2.0, 0.0),
            record("Oil", 4, 4.0, 0.0, 1.0, 0.0),
        ];
        let totals = totals_by_item(&records);
        assert_eq!(totals.len(), 2);
        assert_eq!(totals[0].item_name, "Oil");
        assert_eq!(totals[0].units, tin);
        assert_eq!(totals[0].record_count, 2);
        assert_eq!(totals[0].opening_stock, 7.0);
        assert_eq!(totals[1].item_name, "Rice");
        assert_eq!(totals[1].received, 5.0);
        assert_eq!(totals[1].consumed, 5.0);
        assert_eq!(totals[1].final_stock, 22.0);
    }
}
