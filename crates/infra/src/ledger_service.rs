//! Orchestration of the ledger engine over the stores.
//!
//! Every inventory figure is computed by `larder-inventory`; this layer only
//! loads documents, applies engine operations and persists the results.
//! Batch operations keep going when a single item fails and report counts.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Days, NaiveDate, Utc};
use serde::Serialize;
use thiserror::Error;

use larder_core::{DomainError, Entity, ItemId, RecordId};
use larder_inventory::{
    DayEntry, InventoryItem, InventoryRecord, ItemDraft, ItemPeriodTotals, RecordDraft, RecordSummary, Rollover,
    UnitConfig, next_day, totals_by_item,
};

use crate::store::{ItemStore, RecordPage, RecordQuery, RecordStore, StoreError, StoreResult};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

pub const DEFAULT_GENERATION_WINDOW_DAYS: u32 = 30;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct LedgerSettings {
    /// How far back record generation may reach.
    pub generation_window_days: u32,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            generation_window_days: DEFAULT_GENERATION_WINDOW_DAYS,
        }
    }
}

/// One item's line in a rollover report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RolledItem {
    pub id: ItemId,
    pub name: String,
    pub today_balance: f64,
    pub tomorrow_opening_stock: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RolloverReport {
    pub succeeded: usize,
    pub failed: usize,
    pub records_written: usize,
    pub record_failures: usize,
    pub items: Vec<RolledItem>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationReport {
    pub generated: usize,
    pub refreshed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub records: Vec<InventoryRecord>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize)]
pub struct UnitSyncReport {
    pub updated: usize,
    pub total: usize,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize)]
pub struct RepairReport {
    pub fixed: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Whether a day entry created a new record or overwrote an existing one.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Upserted {
    Created,
    Updated,
}

#[derive(Clone)]
pub struct LedgerService {
    items: Arc<dyn ItemStore>,
    records: Arc<dyn RecordStore>,
    settings: LedgerSettings,
}

impl LedgerService {
    pub fn new(items: Arc<dyn ItemStore>, records: Arc<dyn RecordStore>, settings: LedgerSettings) -> Self {
        Self {
            items,
            records,
            settings,
        }
    }

    // ---------------------------------------------------------------------
    // Items
    // ---------------------------------------------------------------------

    pub async fn add_item(&self, id: Option<ItemId>, draft: ItemDraft) -> ServiceResult<InventoryItem> {
        draft.validate()?;
        let id = match id {
            Some(id) => id,
            None => self.items.next_id().await?,
        };
        let item = InventoryItem::create(id, draft, Utc::now())?;
        self.items.insert(item.clone()).await?;
        tracing::info!(item_id = %id, name = item.name(), "inventory item added");
        Ok(item)
    }

    /// Add several items at once. Nothing is written unless every entry is valid.
    pub async fn add_items(&self, drafts: Vec<(Option<ItemId>, ItemDraft)>) -> ServiceResult<Vec<InventoryItem>> {
        if drafts.is_empty() {
            return Err(DomainError::validation("at least one item is required").into());
        }
        for (index, (_, draft)) in drafts.iter().enumerate() {
            draft
                .validate()
                .map_err(|e| DomainError::validation(format!("item {}: {e}", index + 1)))?;
        }

        let highest_given = drafts.iter().filter_map(|(id, _)| *id).max();
        let mut next = self.items.next_id().await?;
        if let Some(given) = highest_given {
            next = next.max(given.next());
        }

        let now = Utc::now();
        let mut items = Vec::with_capacity(drafts.len());
        for (id, draft) in drafts {
            let id = id.unwrap_or_else(|| {
                let assigned = next;
                next = next.next();
                assigned
            });
            items.push(InventoryItem::create(id, draft, now)?);
        }

        self.items.insert_many(items.clone()).await?;
        tracing::info!(count = items.len(), "inventory items added in bulk");
        Ok(items)
    }

    pub async fn list_items(&self) -> ServiceResult<Vec<InventoryItem>> {
        Ok(self.items.list().await?)
    }

    pub async fn get_item(&self, id: ItemId) -> ServiceResult<InventoryItem> {
        self.items
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::from(DomainError::not_found(format!("inventory item {id}"))))
    }

    /// Overwrite an item, then mirror tomorrow's projected opening into the
    /// history. The mirror is best-effort and never fails the update.
    pub async fn update_item(&self, id: ItemId, draft: ItemDraft, today: NaiveDate) -> ServiceResult<InventoryItem> {
        let mut item = self.get_item(id).await?;
        item.apply_update(draft, Utc::now())?;
        self.items.upsert(item.clone()).await?;
        tracing::info!(item_id = %id, current_stock = item.current_stock(), "inventory item updated");

        let tomorrow = next_day(today);
        let rollover = item.tomorrow_opening();
        if let Err(e) = self.write_opening(&item, tomorrow, &rollover).await {
            tracing::warn!(item_id = %id, date = %tomorrow, error = %e, "failed to mirror next-day opening");
        }
        Ok(item)
    }

    pub async fn delete_item(&self, id: ItemId) -> ServiceResult<InventoryItem> {
        let item = self
            .items
            .delete(id)
            .await?
            .ok_or_else(|| ServiceError::from(DomainError::not_found(format!("inventory item {id}"))))?;
        tracing::info!(item_id = %id, name = item.name(), "inventory item deleted");
        Ok(item)
    }

    /// Close `today` for every item and open `today + 1` in the history.
    pub async fn prepare_next_day(&self, today: NaiveDate) -> ServiceResult<RolloverReport> {
        let items = self.items.list().await?;
        if items.is_empty() {
            return Err(DomainError::validation("no inventory items found to prepare for next day").into());
        }

        let tomorrow = next_day(today);
        let now = Utc::now();
        let mut report = RolloverReport::default();

        for mut item in items {
            let rollover = item.roll_over(now);
            if let Err(e) = self.items.upsert(item.clone()).await {
                tracing::warn!(item_id = %item.id(), name = item.name(), error = %e, "rollover failed");
                report.failed += 1;
                continue;
            }
            report.succeeded += 1;
            report.items.push(RolledItem {
                id: *item.id(),
                name: item.name().to_string(),
                today_balance: rollover.today_balance,
                tomorrow_opening_stock: rollover.tomorrow_opening_stock(),
            });

            match self.write_opening(&item, tomorrow, &rollover).await {
                Ok(()) => report.records_written += 1,
                Err(e) => {
                    tracing::warn!(item_id = %item.id(), date = %tomorrow, error = %e, "failed to write next-day record");
                    report.record_failures += 1;
                }
            }
        }

        tracing::info!(
            date = %today,
            succeeded = report.succeeded,
            failed = report.failed,
            records_written = report.records_written,
            "day rolled over"
        );
        Ok(report)
    }

    /// Repair items whose opening figure was copied into every flow field.
    pub async fn repair_items(&self) -> ServiceResult<RepairReport> {
        let now = Utc::now();
        let mut report = RepairReport::default();
        for mut item in self.items.list().await? {
            if !item.repair_duplicated_flows(now) {
                report.skipped += 1;
                continue;
            }
            match self.items.upsert(item.clone()).await {
                Ok(()) => {
                    tracing::info!(item_id = %item.id(), name = item.name(), "repaired duplicated flow figures");
                    report.fixed += 1;
                }
                Err(e) => {
                    tracing::warn!(item_id = %item.id(), error = %e, "repair failed");
                    report.failed += 1;
                }
            }
        }
        Ok(report)
    }

    // ---------------------------------------------------------------------
    // Records
    // ---------------------------------------------------------------------

    pub async fn create_record(&self, draft: RecordDraft) -> ServiceResult<InventoryRecord> {
        let record = InventoryRecord::create(draft, Utc::now())?;
        self.records.insert(record.clone()).await?;
        tracing::info!(record_id = %record.id(), item_name = record.item_name(), date = %record.date(), "record created");
        Ok(record)
    }

    /// Overwrite the first cycle of the (item, date) record, creating it when missing.
    pub async fn upsert_day_record(
        &self,
        item_name: &str,
        date: NaiveDate,
        entry: DayEntry,
    ) -> ServiceResult<(InventoryRecord, Upserted)> {
        let item_name = item_name.trim();
        let now = Utc::now();
        match self.records.find_for_item_on(item_name, date).await? {
            Some(mut record) => {
                record.apply_day_entry(entry, now)?;
                self.records.upsert(record.clone()).await?;
                Ok((record, Upserted::Updated))
            }
            None => {
                let record = InventoryRecord::from_day_entry(item_name, date, entry, now)?;
                self.records.insert(record.clone()).await?;
                Ok((record, Upserted::Created))
            }
        }
    }

    pub async fn get_record(&self, id: RecordId) -> ServiceResult<InventoryRecord> {
        self.records
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::from(DomainError::not_found(format!("inventory record {id}"))))
    }

    pub async fn update_record(&self, id: RecordId, draft: RecordDraft) -> ServiceResult<InventoryRecord> {
        let mut record = self.get_record(id).await?;
        record.apply_update(draft, Utc::now())?;
        self.records.upsert(record.clone()).await?;
        Ok(record)
    }

    pub async fn delete_record(&self, id: RecordId) -> ServiceResult<InventoryRecord> {
        self.records
            .delete(id)
            .await?
            .ok_or_else(|| ServiceError::from(DomainError::not_found(format!("inventory record {id}"))))
    }

    pub async fn query_records(&self, query: &RecordQuery) -> ServiceResult<RecordPage> {
        Ok(self.records.find(query).await?)
    }

    pub async fn monthly_totals(&self, from: NaiveDate, to: NaiveDate) -> ServiceResult<Vec<ItemPeriodTotals>> {
        if from > to {
            return Err(DomainError::validation("start date must not be after end date").into());
        }
        let page = self.records.find(&RecordQuery::range(Some(from), Some(to))).await?;
        Ok(totals_by_item(&page.records))
    }

    pub async fn summary(&self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> ServiceResult<RecordSummary> {
        let page = self.records.find(&RecordQuery::range(from, to)).await?;
        Ok(RecordSummary::of(&page.records))
    }

    /// Snapshot every tracked item into the history for `date`.
    ///
    /// Items without any record on or before `date` did not exist yet and
    /// are skipped. Existing records on `date` are refreshed from the item.
    pub async fn generate_missing(&self, date: NaiveDate, today: NaiveDate) -> ServiceResult<GenerationReport> {
        if date > today {
            return Err(DomainError::validation("cannot generate records for future dates").into());
        }
        let window = self.settings.generation_window_days;
        let earliest = today
            .checked_sub_days(Days::new(u64::from(window)))
            .unwrap_or(NaiveDate::MIN);
        if date < earliest {
            return Err(DomainError::validation(format!(
                "cannot generate records more than {window} days in the past"
            ))
            .into());
        }

        let now = Utc::now();
        let mut report = GenerationReport::default();
        for item in self.items.list().await? {
            match self.snapshot_item(&item, date, now).await {
                Ok(Some((records, Upserted::Created))) => {
                    report.generated += records.len();
                    report.records.extend(records);
                }
                Ok(Some((records, Upserted::Updated))) => {
                    report.refreshed += records.len();
                    report.records.extend(records);
                }
                Ok(None) => report.skipped += 1,
                Err(e) => {
                    tracing::warn!(item_id = %item.id(), date = %date, error = %e, "record generation failed");
                    report.failed += 1;
                }
            }
        }

        tracing::info!(
            date = %date,
            generated = report.generated,
            refreshed = report.refreshed,
            skipped = report.skipped,
            failed = report.failed,
            "records generated"
        );
        Ok(report)
    }

    /// Copy every item's unit configuration onto the records sharing its name.
    pub async fn sync_record_units(&self) -> ServiceResult<UnitSyncReport> {
        let mut units_by_name: HashMap<String, UnitConfig> = HashMap::new();
        // Most recently updated item wins when names repeat.
        for item in self.items.list().await? {
            units_by_name
                .entry(item.name().to_string())
                .or_insert_with(|| item.units().clone());
        }

        let records = self.records.list_all().await?;
        let now = Utc::now();
        let mut report = UnitSyncReport {
            updated: 0,
            total: records.len(),
        };
        for mut record in records {
            let Some(units) = units_by_name.get(record.item_name()) else {
                continue;
            };
            if record.adopt_units(units, now) {
                self.records.upsert(record).await?;
                report.updated += 1;
            }
        }
        tracing::info!(updated = report.updated, total = report.total, "record units synchronised");
        Ok(report)
    }

    // ---------------------------------------------------------------------
    // Helpers
    // ---------------------------------------------------------------------

    /// Set the opening of the item's record on `date` to what `rollover` carries.
    async fn write_opening(&self, item: &InventoryItem, date: NaiveDate, rollover: &Rollover) -> StoreResult<()> {
        let now = Utc::now();
        match self.records.find_for_item_on(item.name(), date).await? {
            Some(mut record) => {
                record.reopen_with(rollover, now);
                self.records.upsert(record).await
            }
            None => {
                self.records
                    .insert(InventoryRecord::opening_for(item, date, rollover, now))
                    .await
            }
        }
    }

    async fn snapshot_item(
        &self,
        item: &InventoryItem,
        date: NaiveDate,
        now: chrono::DateTime<Utc>,
    ) -> StoreResult<Option<(Vec<InventoryRecord>, Upserted)>> {
        if self.records.earliest_on_or_before(item.name(), date).await?.is_none() {
            return Ok(None);
        }
        let mut existing = self.records.all_for_item_on(item.name(), date).await?;
        if existing.is_empty() {
            let record = InventoryRecord::snapshot_of(item, date, now);
            self.records.insert(record.clone()).await?;
            return Ok(Some((vec![record], Upserted::Created)));
        }
        // Duplicates for the same day are all brought up to date.
        for record in &mut existing {
            record.refresh_from(item, now);
            self.records.upsert(record.clone()).await?;
        }
        Ok(Some((existing, Upserted::Updated)))
    }
}
