//! Postgres storage. The tree lives in `products.variants` as JSONB; stock
//! for untracked products is summed from `inventory`.

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use uuid::Uuid;
use crate::domain::aggregates::variant::Variant;
use crate::domain::ports::{OnHandInventory, StoredProduct, VariantRepository};
use crate::{Result, VariantError};

#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: Uuid,
    name: String,
    variants: Option<Json<Value>>,
    unit_price: Option<i64>,
    currency: String,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for StoredProduct {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            variants: row.variants.map_or(Value::Null, |Json(v)| v),
            unit_price: row.unit_price,
            currency: row.currency,
            updated_at: row.updated_at,
        }
    }
}

fn storage(e: sqlx::Error) -> VariantError { VariantError::StorageError(e.to_string()) }

impl PgStore {
    pub fn new(db: PgPool) -> Self { Self { db } }

    /// Opens a pool and brings the schema up to date.
    pub async fn connect(url: &str) -> Result<Self> {
        let db = PgPoolOptions::new().max_connections(10).connect(url).await.map_err(storage)?;
        sqlx::migrate!("./migrations")
            .run(&db)
            .await
            .map_err(|e| VariantError::StorageError(e.to_string()))?;
        Ok(Self::new(db))
    }
}

impl VariantRepository for PgStore {
    async fn load(&self, id: Uuid) -> Result<Option<StoredProduct>> {
        let row = sqlx::query_as::<_, ProductRow>(
            "SELECT id, name, variants, unit_price, currency, updated_at FROM products WHERE id = $1 AND status <> 'deleted'",
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .map_err(storage)?;
        Ok(row.map(StoredProduct::from))
    }

    async fn update_variants<T, F>(&self, id: Uuid, update: F) -> Result<Option<T>>
    where
        T: Send,
        F: FnOnce(StoredProduct) -> Result<(Vec<Variant>, T)> + Send,
    {
        let mut tx = self.db.begin().await.map_err(storage)?;
        let row = sqlx::query_as::<_, ProductRow>(
            "SELECT id, name, variants, unit_price, currency, updated_at FROM products WHERE id = $1 AND status <> 'deleted' FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(storage)?;
        let Some(row) = row else { return Ok(None) };
        // Dropping `tx` on an error rolls back and releases the row lock.
        let (variants, output) = update(row.into())?;
        sqlx::query("UPDATE products SET variants = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(Json(&variants))
            .execute(&mut *tx)
            .await
            .map_err(storage)?;
        tx.commit().await.map_err(storage)?;
        Ok(Some(output))
    }
}

impl OnHandInventory for PgStore {
    async fn on_hand(&self, id: Uuid) -> Result<u64> {
        let (total,): (Option<i64>,) = sqlx::query_as("SELECT SUM(on_hand)::BIGINT FROM inventory WHERE product_id = $1")
            .bind(id)
            .fetch_one(&self.db)
            .await
            .map_err(storage)?;
        Ok(total.map_or(0, |t| u64::try_from(t).unwrap_or(0)))
    }
}
