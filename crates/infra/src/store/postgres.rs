//! Postgres-backed fulfillment store.
//!
//! ## Locking
//!
//! Transactions run at READ COMMITTED and serialize on row locks:
//!
//! - status changes lock the order row `FOR UPDATE`
//! - reservations lock every asset row of the order `FOR UPDATE`, in id order,
//!   before summing bookings, so the sum sees every competitor that committed
//!   while we waited
//! - scans lock the order row `FOR SHARE` and the scanned asset `FOR UPDATE`
//!
//! ## Error Mapping
//!
//! | PostgreSQL code | StoreError | Scenario |
//! |-----------------|------------|----------|
//! | `40001` | `Concurrency` | serialization failure |
//! | `40P01` | `Concurrency` | deadlock detected |
//! | `23505` | `Concurrency` | duplicate booking from a concurrent reservation |
//! | `23503`, `23514` | `Constraint` | foreign key / check (incl. append-only triggers) |
//! | other | `Database` | anything else |

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::instrument;

use rentflow_core::{AssetId, CompanyId, DateRange, OrderId, UserId};
use rentflow_fulfillment::{
    Asset, AssetBooking, AssetConditionChange, AssetUsage, Condition, Order, OrderItem, OrderStatus,
    ScanEvent, ScanType, StatusHistoryEntry, TrackingMethod,
};

use super::{FulfillmentStore, RowLock, StoreTx};
use crate::error::StoreError;

const SCHEMA: &str = include_str!("schema.sql");

#[derive(Debug, Clone)]
pub struct PostgresFulfillmentStore {
    pool: Arc<PgPool>,
}

impl PostgresFulfillmentStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create tables, indexes and append-only triggers if missing.
    #[instrument(skip(self), err)]
    pub async fn apply_schema(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("apply_schema", e))?;
        Ok(())
    }
}

#[async_trait]
impl FulfillmentStore for PostgresFulfillmentStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, StoreError> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;
        Ok(Box::new(PostgresTx { tx }))
    }
}

struct PostgresTx {
    tx: Transaction<'static, Postgres>,
}

impl RowLock {
    fn sql(self) -> &'static str {
        match self {
            RowLock::None => "",
            RowLock::Share => " FOR SHARE",
            RowLock::Update => " FOR UPDATE",
        }
    }
}

const ORDER_COLUMNS: &str = "id, order_ref, company_id, status, financial_status, event_start, event_end, venue, created_at, updated_at";
const ASSET_COLUMNS: &str = "id, name, qr_code, total_quantity, tracking_method, condition, refurb_days_estimate";
const SCAN_COLUMNS: &str = "id, order_id, asset_id, scan_type, quantity, condition, notes, photos, actor_id, scanned_at";

#[async_trait]
impl StoreTx for PostgresTx {
    async fn load_order(&mut self, order_id: OrderId, lock: RowLock) -> Result<Option<Order>, StoreError> {
        let query = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1{}", lock.sql());
        let row = sqlx::query(&query)
            .bind(order_id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("load_order", e))?;
        row.as_ref().map(decode_order).transpose()
    }

    async fn order_items(&mut self, order_id: OrderId) -> Result<Vec<OrderItem>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, order_id, asset_id, quantity, unit_volume_m3, unit_weight_kg
            FROM order_items
            WHERE order_id = $1
            ORDER BY id
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("order_items", e))?;
        rows.iter().map(decode_item).collect()
    }

    async fn asset(&mut self, asset_id: AssetId, lock: RowLock) -> Result<Option<Asset>, StoreError> {
        let query = format!("SELECT {ASSET_COLUMNS} FROM assets WHERE id = $1{}", lock.sql());
        let row = sqlx::query(&query)
            .bind(asset_id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("asset", e))?;
        row.as_ref().map(decode_asset).transpose()
    }

    async fn asset_by_qr(&mut self, qr_code: &str, lock: RowLock) -> Result<Option<Asset>, StoreError> {
        let query = format!("SELECT {ASSET_COLUMNS} FROM assets WHERE qr_code = $1{}", lock.sql());
        let row = sqlx::query(&query)
            .bind(qr_code)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("asset_by_qr", e))?;
        row.as_ref().map(decode_asset).transpose()
    }

    async fn lock_assets(&mut self, asset_ids: &[AssetId]) -> Result<Vec<Asset>, StoreError> {
        let ids: Vec<uuid::Uuid> = asset_ids.iter().map(|id| *id.as_uuid()).collect();
        let query = format!("SELECT {ASSET_COLUMNS} FROM assets WHERE id = ANY($1) ORDER BY id FOR UPDATE");
        let rows = sqlx::query(&query)
            .bind(&ids)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("lock_assets", e))?;
        rows.iter().map(decode_asset).collect()
    }

    async fn asset_usage(
        &mut self,
        asset_id: AssetId,
        window: Option<DateRange>,
    ) -> Result<AssetUsage, StoreError> {
        let committed: Vec<String> = OrderStatus::ALL
            .into_iter()
            .filter(OrderStatus::is_committed)
            .map(|s| s.as_str().to_string())
            .collect();

        let row = sqlx::query(
            r#"
            SELECT
                COALESCE((
                    SELECT SUM(b.quantity)
                    FROM asset_bookings b
                    JOIN orders o ON o.id = b.order_id
                    WHERE b.asset_id = $1
                      AND o.status = ANY($2)
                      AND ($3::timestamptz IS NULL OR (o.event_start <= $4 AND $3 <= o.event_end))
                ), 0)::BIGINT AS booked,
                COALESCE((
                    SELECT SUM(quantity) FROM scan_events
                    WHERE asset_id = $1 AND scan_type = 'OUTBOUND'
                ), 0)::BIGINT AS outbound,
                COALESCE((
                    SELECT SUM(quantity) FROM scan_events
                    WHERE asset_id = $1 AND scan_type = 'INBOUND'
                ), 0)::BIGINT AS inbound
            "#,
        )
        .bind(asset_id.as_uuid())
        .bind(&committed)
        .bind(window.map(|w| w.start()))
        .bind(window.map(|w| w.end()))
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("asset_usage", e))?;

        Ok(AssetUsage {
            booked: non_negative(row.try_get("booked").map_err(decode_err)?),
            outbound: non_negative(row.try_get("outbound").map_err(decode_err)?),
            inbound: non_negative(row.try_get("inbound").map_err(decode_err)?),
        })
    }

    async fn bookings_for_order(&mut self, order_id: OrderId) -> Result<Vec<AssetBooking>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, order_id, asset_id, quantity, created_at
            FROM asset_bookings
            WHERE order_id = $1
            ORDER BY asset_id
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("bookings_for_order", e))?;

        rows.iter()
            .map(|row| {
                Ok(AssetBooking {
                    id: uuid_col::<rentflow_core::BookingId>(row, "id")?,
                    order_id: uuid_col(row, "order_id")?,
                    asset_id: uuid_col(row, "asset_id")?,
                    quantity: u32_col(row, "quantity")?,
                    created_at: row.try_get("created_at").map_err(decode_err)?,
                })
            })
            .collect()
    }

    async fn insert_bookings(&mut self, bookings: &[AssetBooking]) -> Result<(), StoreError> {
        for booking in bookings {
            sqlx::query(
                r#"
                INSERT INTO asset_bookings (id, order_id, asset_id, quantity, created_at)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(booking.id.as_uuid())
            .bind(booking.order_id.as_uuid())
            .bind(booking.asset_id.as_uuid())
            .bind(to_i32(booking.quantity, "quantity")?)
            .bind(booking.created_at)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("insert_bookings", e))?;
        }
        Ok(())
    }

    async fn delete_bookings(&mut self, order_id: OrderId) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM asset_bookings WHERE order_id = $1")
            .bind(order_id.as_uuid())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("delete_bookings", e))?;
        Ok(result.rows_affected())
    }

    async fn scan_events(&mut self, order_id: OrderId) -> Result<Vec<ScanEvent>, StoreError> {
        let query = format!(
            "SELECT {SCAN_COLUMNS} FROM scan_events WHERE order_id = $1 ORDER BY scanned_at, id"
        );
        let rows = sqlx::query(&query)
            .bind(order_id.as_uuid())
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("scan_events", e))?;
        rows.iter().map(decode_scan).collect()
    }

    async fn append_scan(&mut self, event: &ScanEvent) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO scan_events
                (id, order_id, asset_id, scan_type, quantity, condition, notes, photos, actor_id, scanned_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(event.id.as_uuid())
        .bind(event.order_id.as_uuid())
        .bind(event.asset_id.as_uuid())
        .bind(event.scan_type.as_str())
        .bind(to_i32(event.quantity, "quantity")?)
        .bind(event.condition.as_str())
        .bind(event.notes.as_deref())
        .bind(&event.photos)
        .bind(event.actor_id.as_uuid())
        .bind(event.scanned_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("append_scan", e))?;
        Ok(())
    }

    async fn update_order_status(
        &mut self,
        order_id: OrderId,
        status: OrderStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE orders SET status = $2, updated_at = $3 WHERE id = $1")
            .bind(order_id.as_uuid())
            .bind(status.as_str())
            .bind(updated_at)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("update_order_status", e))?;
        if result.rows_affected() != 1 {
            return Err(StoreError::Constraint(format!("order {order_id} does not exist")));
        }
        Ok(())
    }

    async fn append_history(&mut self, entry: &StatusHistoryEntry) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO order_status_history (id, order_id, status, actor_id, note, recorded_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(entry.id.as_uuid())
        .bind(entry.order_id.as_uuid())
        .bind(entry.status.as_str())
        .bind(entry.actor_id.as_uuid())
        .bind(entry.note.as_deref())
        .bind(entry.recorded_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("append_history", e))?;
        Ok(())
    }

    async fn status_history(&mut self, order_id: OrderId) -> Result<Vec<StatusHistoryEntry>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, order_id, status, actor_id, note, recorded_at
            FROM order_status_history
            WHERE order_id = $1
            ORDER BY recorded_at ASC, seq ASC
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("status_history", e))?;

        rows.iter()
            .map(|row| {
                Ok(StatusHistoryEntry {
                    id: uuid_col(row, "id")?,
                    order_id: uuid_col(row, "order_id")?,
                    status: decode_status(row.try_get("status").map_err(decode_err)?)?,
                    actor_id: uuid_col(row, "actor_id")?,
                    note: row.try_get("note").map_err(decode_err)?,
                    recorded_at: row.try_get("recorded_at").map_err(decode_err)?,
                })
            })
            .collect()
    }

    async fn update_asset_condition(&mut self, asset: &Asset) -> Result<(), StoreError> {
        let refurb = asset
            .refurb_days_estimate
            .map(|d| to_i32(d, "refurb_days_estimate"))
            .transpose()?;
        sqlx::query("UPDATE assets SET condition = $2, refurb_days_estimate = $3 WHERE id = $1")
            .bind(asset.id.as_uuid())
            .bind(asset.condition.as_str())
            .bind(refurb)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("update_asset_condition", e))?;
        Ok(())
    }

    async fn append_condition_change(&mut self, change: &AssetConditionChange) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO asset_condition_history
                (id, asset_id, previous_condition, new_condition, order_id, actor_id, notes, photos, recorded_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(change.id.as_uuid())
        .bind(change.asset_id.as_uuid())
        .bind(change.previous.as_str())
        .bind(change.new.as_str())
        .bind(change.order_id.map(|id| *id.as_uuid()))
        .bind(change.actor_id.as_uuid())
        .bind(change.notes.as_deref())
        .bind(&change.photos)
        .bind(change.recorded_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("append_condition_change", e))?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx
            .commit()
            .await
            .map_err(|e| map_sqlx_error("commit", e))
    }
}

// Row decoding

fn decode_err(err: sqlx::Error) -> StoreError {
    StoreError::Decode(err.to_string())
}

fn uuid_col<T: From<uuid::Uuid>>(row: &PgRow, column: &str) -> Result<T, StoreError> {
    let id: uuid::Uuid = row.try_get(column).map_err(decode_err)?;
    Ok(T::from(id))
}

fn u32_col(row: &PgRow, column: &str) -> Result<u32, StoreError> {
    let value: i32 = row.try_get(column).map_err(decode_err)?;
    u32::try_from(value).map_err(|_| StoreError::Decode(format!("{column} is negative: {value}")))
}

fn to_i32(value: u32, field: &str) -> Result<i32, StoreError> {
    i32::try_from(value).map_err(|_| StoreError::Constraint(format!("{field} out of range: {value}")))
}

fn non_negative(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

fn decode_status(raw: String) -> Result<OrderStatus, StoreError> {
    raw.parse().map_err(|e: rentflow_fulfillment::UnknownStatus| StoreError::Decode(e.to_string()))
}

fn decode_condition(raw: &str) -> Result<Condition, StoreError> {
    match raw {
        "GREEN" => Ok(Condition::Green),
        "ORANGE" => Ok(Condition::Orange),
        "RED" => Ok(Condition::Red),
        other => Err(StoreError::Decode(format!("unknown condition '{other}'"))),
    }
}

fn decode_tracking(raw: &str) -> Result<TrackingMethod, StoreError> {
    match raw {
        "INDIVIDUAL" => Ok(TrackingMethod::Individual),
        "BATCH" => Ok(TrackingMethod::Batch),
        other => Err(StoreError::Decode(format!("unknown tracking method '{other}'"))),
    }
}

fn decode_order(row: &PgRow) -> Result<Order, StoreError> {
    let event_window = DateRange::new(
        row.try_get("event_start").map_err(decode_err)?,
        row.try_get("event_end").map_err(decode_err)?,
    )
    .map_err(|e| StoreError::Decode(e.to_string()))?;

    Ok(Order {
        id: uuid_col(row, "id")?,
        order_ref: row.try_get("order_ref").map_err(decode_err)?,
        company_id: uuid_col::<CompanyId>(row, "company_id")?,
        status: decode_status(row.try_get("status").map_err(decode_err)?)?,
        financial_status: row.try_get("financial_status").map_err(decode_err)?,
        event_window,
        venue: row.try_get("venue").map_err(decode_err)?,
        created_at: row.try_get("created_at").map_err(decode_err)?,
        updated_at: row.try_get("updated_at").map_err(decode_err)?,
    })
}

fn decode_item(row: &PgRow) -> Result<OrderItem, StoreError> {
    Ok(OrderItem {
        id: uuid_col(row, "id")?,
        order_id: uuid_col(row, "order_id")?,
        asset_id: uuid_col(row, "asset_id")?,
        quantity: u32_col(row, "quantity")?,
        unit_volume_m3: row.try_get("unit_volume_m3").map_err(decode_err)?,
        unit_weight_kg: row.try_get("unit_weight_kg").map_err(decode_err)?,
    })
}

fn decode_asset(row: &PgRow) -> Result<Asset, StoreError> {
    let refurb: Option<i32> = row.try_get("refurb_days_estimate").map_err(decode_err)?;
    let tracking: String = row.try_get("tracking_method").map_err(decode_err)?;
    let condition: String = row.try_get("condition").map_err(decode_err)?;

    Ok(Asset {
        id: uuid_col(row, "id")?,
        name: row.try_get("name").map_err(decode_err)?,
        qr_code: row.try_get("qr_code").map_err(decode_err)?,
        total_quantity: u32_col(row, "total_quantity")?,
        tracking_method: decode_tracking(&tracking)?,
        condition: decode_condition(&condition)?,
        refurb_days_estimate: refurb.and_then(|d| u32::try_from(d).ok()),
    })
}

fn decode_scan(row: &PgRow) -> Result<ScanEvent, StoreError> {
    let scan_type: String = row.try_get("scan_type").map_err(decode_err)?;
    let condition: String = row.try_get("condition").map_err(decode_err)?;

    Ok(ScanEvent {
        id: uuid_col(row, "id")?,
        order_id: uuid_col(row, "order_id")?,
        asset_id: uuid_col(row, "asset_id")?,
        scan_type: scan_type
            .parse::<ScanType>()
            .map_err(|e| StoreError::Decode(e.to_string()))?,
        quantity: u32_col(row, "quantity")?,
        condition: decode_condition(&condition)?,
        notes: row.try_get("notes").map_err(decode_err)?,
        photos: row.try_get("photos").map_err(decode_err)?,
        actor_id: uuid_col::<UserId>(row, "actor_id")?,
        scanned_at: row.try_get("scanned_at").map_err(decode_err)?,
    })
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("40001") | Some("40P01") | Some("23505") => StoreError::Concurrency(msg),
                Some("23503") | Some("23514") => StoreError::Constraint(msg),
                _ => StoreError::Database(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Database(format!("connection pool closed in {}", operation))
        }
        sqlx::Error::PoolTimedOut => {
            StoreError::Database(format!("connection pool timed out in {}", operation))
        }
        _ => StoreError::Database(format!("sqlx error in {}: {}", operation, err)),
    }
}
