//! In-memory stores for tests and development.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::NaiveDate;

use larder_core::{Entity, ItemId, RecordId};
use larder_inventory::{InventoryItem, InventoryRecord};

use super::{ItemStore, RecordPage, RecordQuery, RecordSortKey, RecordStore, SortOrder, StoreError, StoreResult};

fn read<T>(lock: &RwLock<T>) -> StoreResult<RwLockReadGuard<'_, T>> {
    lock.read()
        .map_err(|_| StoreError::Backend("in-memory store lock poisoned".to_string()))
}

fn write<T>(lock: &RwLock<T>) -> StoreResult<RwLockWriteGuard<'_, T>> {
    lock.write()
        .map_err(|_| StoreError::Backend("in-memory store lock poisoned".to_string()))
}

#[derive(Debug, Default)]
pub struct InMemoryItemStore {
    inner: RwLock<BTreeMap<ItemId, InventoryItem>>,
}

impl InMemoryItemStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl ItemStore for InMemoryItemStore {
    async fn next_id(&self) -> StoreResult<ItemId> {
        let map = read(&self.inner)?;
        Ok(map
            .keys()
            .next_back()
            .map(|id| id.next())
            .unwrap_or(ItemId::new(1)))
    }

    async fn find_by_id(&self, id: ItemId) -> StoreResult<Option<InventoryItem>> {
        Ok(read(&self.inner)?.get(&id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> StoreResult<Vec<InventoryItem>> {
        let map = read(&self.inner)?;
        Ok(map.values().filter(|i| i.name() == name).cloned().collect())
    }

    async fn list(&self) -> StoreResult<Vec<InventoryItem>> {
        let mut items: Vec<_> = read(&self.inner)?.values().cloned().collect();
        items.sort_by(|a, b| b.updated_at().cmp(&a.updated_at()).then_with(|| a.id().cmp(b.id())));
        Ok(items)
    }

    async fn insert(&self, item: InventoryItem) -> StoreResult<()> {
        let mut map = write(&self.inner)?;
        let id = *item.id();
        if map.contains_key(&id) {
            return Err(StoreError::Conflict(format!("item {id} already exists")));
        }
        map.insert(id, item);
        Ok(())
    }

    async fn insert_many(&self, items: Vec<InventoryItem>) -> StoreResult<()> {
        let mut map = write(&self.inner)?;
        let mut seen = std::collections::BTreeSet::new();
        for item in &items {
            let id = *item.id();
            if map.contains_key(&id) || !seen.insert(id) {
                return Err(StoreError::Conflict(format!("item {id} already exists")));
            }
        }
        for item in items {
            map.insert(*item.id(), item);
        }
        Ok(())
    }

    async fn upsert(&self, item: InventoryItem) -> StoreResult<()> {
        write(&self.inner)?.insert(*item.id(), item);
        Ok(())
    }

    async fn delete(&self, id: ItemId) -> StoreResult<Option<InventoryItem>> {
        Ok(write(&self.inner)?.remove(&id))
    }
}

/// Records in insertion order.
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    inner: RwLock<Vec<InventoryRecord>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn compare(a: &InventoryRecord, b: &InventoryRecord, key: RecordSortKey) -> Ordering {
    match key {
        RecordSortKey::Date => a
            .date()
            .cmp(&b.date())
            .then_with(|| a.item_name().cmp(b.item_name())),
        RecordSortKey::ItemName => a
            .item_name()
            .cmp(b.item_name())
            .then_with(|| a.date().cmp(&b.date())),
    }
}

#[async_trait::async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn find_by_id(&self, id: RecordId) -> StoreResult<Option<InventoryRecord>> {
        Ok(read(&self.inner)?.iter().find(|r| *r.id() == id).cloned())
    }

    async fn find_for_item_on(&self, item_name: &str, date: NaiveDate) -> StoreResult<Option<InventoryRecord>> {
        Ok(read(&self.inner)?
            .iter()
            .find(|r| r.item_name() == item_name && r.date() == date)
            .cloned())
    }

    async fn all_for_item_on(&self, item_name: &str, date: NaiveDate) -> StoreResult<Vec<InventoryRecord>> {
        Ok(read(&self.inner)?
            .iter()
            .filter(|r| r.item_name() == item_name && r.date() == date)
            .cloned()
            .collect())
    }

    async fn find(&self, query: &RecordQuery) -> StoreResult<RecordPage> {
        let mut matched: Vec<_> = read(&self.inner)?
            .iter()
            .filter(|r| query.matches(r))
            .cloned()
            .collect();
        matched.sort_by(|a, b| {
            let ord = compare(a, b, query.sort_by);
            match query.sort_order {
                SortOrder::Asc => ord,
                SortOrder::Desc => ord.reverse(),
            }
        });

        let total = matched.len() as u64;
        let records = match query.page {
            Some(page) => matched
                .into_iter()
                .skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
                .take(page.limit as usize)
                .collect(),
            None => matched,
        };
        Ok(RecordPage {
            records,
            total,
            page: query.page,
        })
    }

    async fn earliest_on_or_before(&self, item_name: &str, date: NaiveDate) -> StoreResult<Option<InventoryRecord>> {
        Ok(read(&self.inner)?
            .iter()
            .filter(|r| r.item_name() == item_name && r.date() <= date)
            .min_by_key(|r| r.date())
            .cloned())
    }

    async fn insert(&self, record: InventoryRecord) -> StoreResult<()> {
        let mut records = write(&self.inner)?;
        if records.iter().any(|r| r.id() == record.id()) {
            return Err(StoreError::Conflict(format!("record {} already exists", record.id())));
        }
        records.push(record);
        Ok(())
    }

    async fn insert_many(&self, batch: Vec<InventoryRecord>) -> StoreResult<()> {
        let mut records = write(&self.inner)?;
        for (i, record) in batch.iter().enumerate() {
            let taken = records.iter().any(|r| r.id() == record.id())
                || batch[..i].iter().any(|r| r.id() == record.id());
            if taken {
                return Err(StoreError::Conflict(format!("record {} already exists", record.id())));
            }
        }
        records.extend(batch);
        Ok(())
    }

    async fn upsert(&self, record: InventoryRecord) -> StoreResult<()> {
        let mut records = write(&self.inner)?;
        match records.iter_mut().find(|r| r.id() == record.id()) {
            Some(slot) => *slot = record,
            None => records.push(record),
        }
        Ok(())
    }

    async fn delete(&self, id: RecordId) -> StoreResult<Option<InventoryRecord>> {
        let mut records = write(&self.inner)?;
        Ok(records
            .iter()
            .position(|r| *r.id() == id)
            .map(|pos| records.remove(pos)))
    }

    async fn list_all(&self) -> StoreResult<Vec<InventoryRecord>> {
        Ok(read(&self.inner)?.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::PageRequest;
    use chrono::{DateTime, Duration, Utc};
    use larder_inventory::{FlowInputs, ItemDraft, Quantity, RecordDraft, UnitConfig};

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-05-01T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn item(id: u64, name: &str, at: DateTime<Utc>) -> InventoryItem {
        InventoryItem::create(
            ItemId::new(id),
            ItemDraft {
                name: name.to_string(),
                inputs: FlowInputs::opening_only(Quantity::primary_only(5.0)),
                ..ItemDraft::default()
            },
            at,
        )
        .unwrap()
    }

    fn record(name: &str, d: u32) -> InventoryRecord {
        InventoryRecord::create(
            RecordDraft {
                item_name: name.to_string(),
                date: NaiveDate::from_ymd_opt(2026, 5, d).unwrap(),
                units: UnitConfig::default(),
                inputs: FlowInputs::default(),
            },
            now(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn next_id_follows_highest() {
        let store = InMemoryItemStore::new();
        assert_eq!(store.next_id().await.unwrap(), ItemId::new(1));
        store.insert(item(41, "Salt", now())).await.unwrap();
        store.insert(item(3, "Sugar", now())).await.unwrap();
        assert_eq!(store.next_id().await.unwrap(), ItemId::new(42));
    }

    #[tokio::test]
    async fn insert_rejects_duplicate_id() {
        let store = InMemoryItemStore::new();
        store.insert(item(1, "Salt", now())).await.unwrap();
        let err = store.insert(item(1, "Pepper", now())).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn insert_many_is_all_or_nothing() {
        let store = InMemoryItemStore::new();
        store.insert(item(2, "Salt", now())).await.unwrap();
        let err = store
            .insert_many(vec![item(1, "Rice", now()), item(2, "Oil", now())])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn list_is_most_recently_updated_first() {
        let store = InMemoryItemStore::new();
        store.insert(item(1, "Old", now())).await.unwrap();
        store.insert(item(2, "New", now() + Duration::minutes(5))).await.unwrap();
        let names: Vec<_> = store
            .list()
            .await
            .unwrap()
            .iter()
            .map(|i| i.name().to_string())
            .collect();
        assert_eq!(names, vec!["New", "Old"]);
    }

    #[tokio::test]
    async fn find_by_name_is_exact() {
        let store = InMemoryItemStore::new();
        store.insert(item(1, "Rice", now())).await.unwrap();
        store.insert(item(2, "Rice flour", now())).await.unwrap();
        assert_eq!(store.find_by_name("Rice").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn find_filters_sorts_and_pages() {
        let store = InMemoryRecordStore::new();
        for (name, d) in [("Rice", 1), ("Oil", 2), ("Rice", 3), ("Brown rice", 4), ("Salt", 5)] {
            store.insert(record(name, d)).await.unwrap();
        }

        let query = RecordQuery {
            item_name: Some("RICE".to_string()),
            sort_by: RecordSortKey::Date,
            sort_order: SortOrder::Desc,
            page: Some(PageRequest::new(Some(1), Some(2))),
            ..RecordQuery::default()
        };
        let page = store.find(&query).await.unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.records.len(), 2);
        assert_eq!(page.records[0].item_name(), "Brown rice");
        assert_eq!(page.total_pages(), 2);
        assert!(page.has_next_page());

        let day = store
            .find(&RecordQuery::day(NaiveDate::from_ymd_opt(2026, 5, 2).unwrap()))
            .await
            .unwrap();
        assert_eq!(day.total, 1);
        assert_eq!(day.records[0].item_name(), "Oil");
    }

    #[tokio::test]
    async fn earliest_on_or_before_ignores_later_records() {
        let store = InMemoryRecordStore::new();
        store.insert(record("Rice", 9)).await.unwrap();
        store.insert(record("Rice", 4)).await.unwrap();
        let d = |day| NaiveDate::from_ymd_opt(2026, 5, day).unwrap();

        assert!(store.earliest_on_or_before("Rice", d(3)).await.unwrap().is_none());
        let found = store.earliest_on_or_before("Rice", d(10)).await.unwrap().unwrap();
        assert_eq!(found.date(), d(4));
    }

    #[tokio::test]
    async fn upsert_replaces_by_id_and_delete_returns_record() {
        let store = InMemoryRecordStore::new();
        let mut r = record("Rice", 1);
        store.insert(r.clone()).await.unwrap();
        r.apply_day_entry(
            larder_inventory::DayEntry {
                opening: Some(3.0),
                received: 0.0,
                consumed: 0.0,
            },
            now(),
        )
        .unwrap();
        store.upsert(r.clone()).await.unwrap();
        assert_eq!(store.list_all().await.unwrap(), vec![r.clone()]);

        let removed = store.delete(*r.id()).await.unwrap();
        assert_eq!(removed, Some(r));
        assert!(store.list_all().await.unwrap().is_empty());
    }
}
