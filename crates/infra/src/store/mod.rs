//! Persistence collaborators for items and records.
//!
//! Two traits, one per document kind. Implementations only store and
//! retrieve; they never compute ledger figures.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use larder_core::{ItemId, RecordId};
use larder_inventory::{InventoryItem, InventoryRecord};

pub mod in_memory;
pub mod postgres;

pub use in_memory::{InMemoryItemStore, InMemoryRecordStore};
pub use postgres::{PostgresItemStore, PostgresRecordStore, connect};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait::async_trait]
pub trait ItemStore: Send + Sync {
    /// Smallest id greater than every stored id.
    async fn next_id(&self) -> StoreResult<ItemId>;
    async fn find_by_id(&self, id: ItemId) -> StoreResult<Option<InventoryItem>>;
    /// Exact name match; names are not unique.
    async fn find_by_name(&self, name: &str) -> StoreResult<Vec<InventoryItem>>;
    /// All items, most recently updated first.
    async fn list(&self) -> StoreResult<Vec<InventoryItem>>;
    /// Fails with [`StoreError::Conflict`] if the id is taken.
    async fn insert(&self, item: InventoryItem) -> StoreResult<()>;
    /// All or nothing.
    async fn insert_many(&self, items: Vec<InventoryItem>) -> StoreResult<()>;
    async fn upsert(&self, item: InventoryItem) -> StoreResult<()>;
    async fn delete(&self, id: ItemId) -> StoreResult<Option<InventoryItem>>;
}

#[async_trait::async_trait]
impl<S> ItemStore for Arc<S>
where
    S: ItemStore + ?Sized,
{
    async fn next_id(&self) -> StoreResult<ItemId> {
        (**self).next_id().await
    }

    async fn find_by_id(&self, id: ItemId) -> StoreResult<Option<InventoryItem>> {
        (**self).find_by_id(id).await
    }

    async fn find_by_name(&self, name: &str) -> StoreResult<Vec<InventoryItem>> {
        (**self).find_by_name(name).await
    }

    async fn list(&self) -> StoreResult<Vec<InventoryItem>> {
        (**self).list().await
    }

    async fn insert(&self, item: InventoryItem) -> StoreResult<()> {
        (**self).insert(item).await
    }

    async fn insert_many(&self, items: Vec<InventoryItem>) -> StoreResult<()> {
        (**self).insert_many(items).await
    }

    async fn upsert(&self, item: InventoryItem) -> StoreResult<()> {
        (**self).upsert(item).await
    }

    async fn delete(&self, id: ItemId) -> StoreResult<Option<InventoryItem>> {
        (**self).delete(id).await
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RecordSortKey {
    #[default]
    Date,
    ItemName,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// Page request; `page` is 1-based.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self { page: 1, limit: 50 }
    }
}

impl PageRequest {
    pub const MAX_LIMIT: u32 = 1000;

    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(50).clamp(1, Self::MAX_LIMIT),
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }
}

/// Filter, ordering and paging for record listings. Date bounds are inclusive.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecordQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    /// Case-insensitive substring of the item name.
    pub item_name: Option<String>,
    pub sort_by: RecordSortKey,
    pub sort_order: SortOrder,
    /// `None` returns every match.
    pub page: Option<PageRequest>,
}

impl RecordQuery {
    /// Every record dated `date`, ordered by item name.
    pub fn day(date: NaiveDate) -> Self {
        Self {
            from: Some(date),
            to: Some(date),
            sort_by: RecordSortKey::ItemName,
            sort_order: SortOrder::Asc,
            ..Self::default()
        }
    }

    /// Every record in the inclusive range, oldest first.
    pub fn range(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        Self {
            from,
            to,
            sort_by: RecordSortKey::Date,
            sort_order: SortOrder::Asc,
            ..Self::default()
        }
    }

    pub fn matches(&self, record: &InventoryRecord) -> bool {
        if self.from.is_some_and(|from| record.date() < from) {
            return false;
        }
        if self.to.is_some_and(|to| record.date() > to) {
            return false;
        }
        match self.item_name.as_deref().map(str::trim) {
            Some(needle) if !needle.is_empty() => record
                .item_name()
                .to_lowercase()
                .contains(&needle.to_lowercase()),
            _ => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordPage {
    pub records: Vec<InventoryRecord>,
    /// Matches across all pages.
    pub total: u64,
    pub page: Option<PageRequest>,
}

impl RecordPage {
    pub fn total_pages(&self) -> u64 {
        match self.page {
            Some(p) => self.total.div_ceil(u64::from(p.limit)),
            None => u64::from(self.total > 0),
        }
    }

    pub fn has_next_page(&self) -> bool {
        match self.page {
            Some(p) => p.offset() + (self.records.len() as u64) < self.total,
            None => false,
        }
    }
}

#[async_trait::async_trait]
pub trait RecordStore: Send + Sync {
    async fn find_by_id(&self, id: RecordId) -> StoreResult<Option<InventoryRecord>>;
    /// First record for the exact (item name, date) pair.
    async fn find_for_item_on(&self, item_name: &str, date: NaiveDate) -> StoreResult<Option<InventoryRecord>>;
    /// Every record for the exact (item name, date) pair, oldest first.
    async fn all_for_item_on(&self, item_name: &str, date: NaiveDate) -> StoreResult<Vec<InventoryRecord>>;
    async fn find(&self, query: &RecordQuery) -> StoreResult<RecordPage>;
    /// Oldest record for the item dated on or before `date`.
    async fn earliest_on_or_before(&self, item_name: &str, date: NaiveDate) -> StoreResult<Option<InventoryRecord>>;
    async fn insert(&self, record: InventoryRecord) -> StoreResult<()>;
    /// All or nothing.
    async fn insert_many(&self, records: Vec<InventoryRecord>) -> StoreResult<()>;
    async fn upsert(&self, record: InventoryRecord) -> StoreResult<()>;
    async fn delete(&self, id: RecordId) -> StoreResult<Option<InventoryRecord>>;
    async fn list_all(&self) -> StoreResult<Vec<InventoryRecord>>;
}

#[async_trait::async_trait]
impl<S> RecordStore for Arc<S>
where
    S: RecordStore + ?Sized,
{
    async fn find_by_id(&self, id: RecordId) -> StoreResult<Option<InventoryRecord>> {
        (**self).find_by_id(id).await
    }

    async fn find_for_item_on(&self, item_name: &str, date: NaiveDate) -> StoreResult<Option<InventoryRecord>> {
        (**self).find_for_item_on(item_name, date).await
    }

    async fn all_for_item_on(&self, item_name: &str, date: NaiveDate) -> StoreResult<Vec<InventoryRecord>> {
        (**self).all_for_item_on(item_name, date).await
    }

    async fn find(&self, query: &RecordQuery) -> StoreResult<RecordPage> {
        (**self).find(query).await
    }

    async fn earliest_on_or_before(&self, item_name: &str, date: NaiveDate) -> StoreResult<Option<InventoryRecord>> {
        (**self).earliest_on_or_before(item_name, date).await
    }

    async fn insert(&self, record: InventoryRecord) -> StoreResult<()> {
        (**self).insert(record).await
    }

    async fn insert_many(&self, records: Vec<InventoryRecord>) -> StoreResult<()> {
        (**self).insert_many(records).await
    }

    async fn upsert(&self, record: InventoryRecord) -> StoreResult<()> {
        (**self).upsert(record).await
    }

    async fn delete(&self, id: RecordId) -> StoreResult<Option<InventoryRecord>> {
        (**self).delete(id).await
    }

    async fn list_all(&self) -> StoreResult<Vec<InventoryRecord>> {
        (**self).list_all().await
    }
}
