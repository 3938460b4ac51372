//! Postgres-backed stores.
//!
//! Each item and record is kept as a JSONB document next to the few key
//! columns queries filter and sort on.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `Conflict` |
//! | Database (other) | Any other | `Backend` |
//! | Decode / ColumnDecode | N/A | `Serialization` |
//! | Other | N/A | `Backend` |

use std::time::Duration;

use chrono::NaiveDate;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use sqlx::{Postgres, QueryBuilder, Row};
use tracing::instrument;

use larder_core::{Entity, ItemId, RecordId};
use larder_inventory::{InventoryItem, InventoryRecord};

use super::{
    ItemStore, RecordPage, RecordQuery, RecordSortKey, RecordStore, SortOrder, StoreError, StoreResult,
};

/// Open a pool and bring the schema up to date.
#[instrument(skip(database_url))]
pub async fn connect(database_url: &str, max_connections: u32) -> StoreResult<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(30))
        .connect(database_url)
        .await
        .map_err(|e| map_sqlx_error("connect", e))?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| StoreError::Backend(format!("migration failed: {e}")))?;

    tracing::info!(max_connections, "postgres stores ready");
    Ok(pool)
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::Conflict(msg),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::Decode(e) => StoreError::Serialization(format!("decode error in {operation}: {e}")),
        sqlx::Error::ColumnDecode { index, source } => StoreError::Serialization(format!(
            "column {index} decode error in {operation}: {source}"
        )),
        sqlx::Error::PoolClosed => StoreError::Backend(format!("connection pool closed in {operation}")),
        _ => StoreError::Backend(format!("sqlx error in {operation}: {err}")),
    }
}

fn db_id(id: ItemId) -> StoreResult<i64> {
    i64::try_from(id.get()).map_err(|_| StoreError::Backend(format!("item id {id} out of range")))
}

fn doc<T: serde::de::DeserializeOwned>(row: &sqlx::postgres::PgRow) -> StoreResult<T> {
    row.try_get::<Json<T>, _>("doc")
        .map(|Json(v)| v)
        .map_err(|e| StoreError::Serialization(format!("failed to read document: {e}")))
}

#[derive(Debug, Clone)]
pub struct PostgresItemStore {
    pool: PgPool,
}

impl PostgresItemStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const INSERT_ITEM: &str = r#"
    INSERT INTO inventory_items (id, name, updated_at, doc)
    VALUES ($1, $2, $3, $4)
"#;

#[async_trait::async_trait]
impl ItemStore for PostgresItemStore {
    async fn next_id(&self) -> StoreResult<ItemId> {
        let row = sqlx::query("SELECT COALESCE(MAX(id), 0) AS max_id FROM inventory_items")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("next_item_id", e))?;
        let max: i64 = row
            .try_get("max_id")
            .map_err(|e| map_sqlx_error("next_item_id", e))?;
        Ok(ItemId::new(u64::try_from(max).unwrap_or(0)).next())
    }

    async fn find_by_id(&self, id: ItemId) -> StoreResult<Option<InventoryItem>> {
        let row = sqlx::query("SELECT doc FROM inventory_items WHERE id = $1")
            .bind(db_id(id)?)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_item", e))?;
        row.as_ref().map(doc).transpose()
    }

    async fn find_by_name(&self, name: &str) -> StoreResult<Vec<InventoryItem>> {
        let rows = sqlx::query("SELECT doc FROM inventory_items WHERE name = $1 ORDER BY id")
            .bind(name)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_items_by_name", e))?;
        rows.iter().map(doc).collect()
    }

    async fn list(&self) -> StoreResult<Vec<InventoryItem>> {
        let rows = sqlx::query("SELECT doc FROM inventory_items ORDER BY updated_at DESC, id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_items", e))?;
        rows.iter().map(doc).collect()
    }

    #[instrument(skip(self, item), fields(item_id = %item.id()))]
    async fn insert(&self, item: InventoryItem) -> StoreResult<()> {
        sqlx::query(INSERT_ITEM)
            .bind(db_id(*item.id())?)
            .bind(item.name())
            .bind(item.updated_at())
            .bind(Json(&item))
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("insert_item", e))?;
        Ok(())
    }

    #[instrument(skip(self, items), fields(count = items.len()))]
    async fn insert_many(&self, items: Vec<InventoryItem>) -> StoreResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;
        for item in &items {
            sqlx::query(INSERT_ITEM)
                .bind(db_id(*item.id())?)
                .bind(item.name())
                .bind(item.updated_at())
                .bind(Json(item))
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("insert_items", e))?;
        }
        tx.commit().await.map_err(|e| map_sqlx_error("commit", e))
    }

    async fn upsert(&self, item: InventoryItem) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO inventory_items (id, name, updated_at, doc)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id)
            DO UPDATE SET
                name = EXCLUDED.name,
                updated_at = EXCLUDED.updated_at,
                doc = EXCLUDED.doc
            "#,
        )
        .bind(db_id(*item.id())?)
        .bind(item.name())
        .bind(item.updated_at())
        .bind(Json(&item))
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("upsert_item", e))?;
        Ok(())
    }

    async fn delete(&self, id: ItemId) -> StoreResult<Option<InventoryItem>> {
        let row = sqlx::query("DELETE FROM inventory_items WHERE id = $1 RETURNING doc")
            .bind(db_id(id)?)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_item", e))?;
        row.as_ref().map(doc).transpose()
    }
}

#[derive(Debug, Clone)]
pub struct PostgresRecordStore {
    pool: PgPool,
}

impl PostgresRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const INSERT_RECORD: &str = r#"
    INSERT INTO inventory_records (id, item_name, record_date, created_at, doc)
    VALUES ($1, $2, $3, $4, $5)
"#;

fn push_filter<'a>(qb: &mut QueryBuilder<'a, Postgres>, query: &'a RecordQuery) {
    qb.push(" WHERE TRUE");
    if let Some(from) = query.from {
        qb.push(" AND record_date >= ").push_bind(from);
    }
    if let Some(to) = query.to {
        qb.push(" AND record_date <= ").push_bind(to);
    }
    if let Some(needle) = query.item_name.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        qb.push(" AND strpos(lower(item_name), lower(")
            .push_bind(needle)
            .push(")) > 0");
    }
}

#[async_trait::async_trait]
impl RecordStore for PostgresRecordStore {
    async fn find_by_id(&self, id: RecordId) -> StoreResult<Option<InventoryRecord>> {
        let row = sqlx::query("SELECT doc FROM inventory_records WHERE id = $1")
            .bind(*id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_record", e))?;
        row.as_ref().map(doc).transpose()
    }

    async fn find_for_item_on(&self, item_name: &str, date: NaiveDate) -> StoreResult<Option<InventoryRecord>> {
        let row = sqlx::query(
            r#"
            SELECT doc FROM inventory_records
            WHERE item_name = $1 AND record_date = $2
            ORDER BY created_at, id
            LIMIT 1
            "#,
        )
        .bind(item_name)
        .bind(date)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_record_for_item", e))?;
        row.as_ref().map(doc).transpose()
    }

    async fn all_for_item_on(&self, item_name: &str, date: NaiveDate) -> StoreResult<Vec<InventoryRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT doc FROM inventory_records
            WHERE item_name = $1 AND record_date = $2
            ORDER BY created_at, id
            "#,
        )
        .bind(item_name)
        .bind(date)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_records_for_item", e))?;
        rows.iter().map(doc).collect()
    }

    #[instrument(skip(self))]
    async fn find(&self, query: &RecordQuery) -> StoreResult<RecordPage> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) AS total FROM inventory_records");
        push_filter(&mut count, query);
        let total: i64 = count
            .build()
            .fetch_one(&self.pool)
            .await
            .and_then(|row| row.try_get("total"))
            .map_err(|e| map_sqlx_error("count_records", e))?;

        let mut select = QueryBuilder::<Postgres>::new("SELECT doc FROM inventory_records");
        push_filter(&mut select, query);
        let dir = match query.sort_order {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        };
        match query.sort_by {
            RecordSortKey::Date => select.push(format!(" ORDER BY record_date {dir}, item_name {dir}")),
            RecordSortKey::ItemName => select.push(format!(" ORDER BY item_name {dir}, record_date {dir}")),
        };
        if let Some(page) = query.page {
            select
                .push(" LIMIT ")
                .push_bind(i64::from(page.limit))
                .push(" OFFSET ")
                .push_bind(i64::try_from(page.offset()).unwrap_or(i64::MAX));
        }

        let rows = select
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_records", e))?;
        let records = rows.iter().map(doc).collect::<StoreResult<Vec<_>>>()?;

        Ok(RecordPage {
            records,
            total: u64::try_from(total).unwrap_or(0),
            page: query.page,
        })
    }

    async fn earliest_on_or_before(&self, item_name: &str, date: NaiveDate) -> StoreResult<Option<InventoryRecord>> {
        let row = sqlx::query(
            r#"
            SELECT doc FROM inventory_records
            WHERE item_name = $1 AND record_date <= $2
            ORDER BY record_date ASC
            LIMIT 1
            "#,
        )
        .bind(item_name)
        .bind(date)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("earliest_record", e))?;
        row.as_ref().map(doc).transpose()
    }

    async fn insert(&self, record: InventoryRecord) -> StoreResult<()> {
        sqlx::query(INSERT_RECORD)
            .bind(*record.id().as_uuid())
            .bind(record.item_name())
            .bind(record.date())
            .bind(record.created_at())
            .bind(Json(&record))
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("insert_record", e))?;
        Ok(())
    }

    #[instrument(skip(self, records), fields(count = records.len()))]
    async fn insert_many(&self, records: Vec<InventoryRecord>) -> StoreResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;
        for record in &records {
            sqlx::query(INSERT_RECORD)
                .bind(*record.id().as_uuid())
                .bind(record.item_name())
                .bind(record.date())
                .bind(record.created_at())
                .bind(Json(record))
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("insert_records", e))?;
        }
        tx.commit().await.map_err(|e| map_sqlx_error("commit", e))
    }

    async fn upsert(&self, record: InventoryRecord) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO inventory_records (id, item_name, record_date, created_at, doc)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id)
            DO UPDATE SET
                item_name = EXCLUDED.item_name,
                record_date = EXCLUDED.record_date,
                doc = EXCLUDED.doc
            "#,
        )
        .bind(*record.id().as_uuid())
        .bind(record.item_name())
        .bind(record.date())
        .bind(record.created_at())
        .bind(Json(&record))
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("upsert_record", e))?;
        Ok(())
    }

    async fn delete(&self, id: RecordId) -> StoreResult<Option<InventoryRecord>> {
        let row = sqlx::query("DELETE FROM inventory_records WHERE id = $1 RETURNING doc")
            .bind(*id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_record", e))?;
        row.as_ref().map(doc).transpose()
    }

    async fn list_all(&self) -> StoreResult<Vec<InventoryRecord>> {
        let rows = sqlx::query("SELECT doc FROM inventory_records ORDER BY created_at, id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_records", e))?;
        rows.iter().map(doc).collect()
    }
}
