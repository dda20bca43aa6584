//! Catalog service
//!
//! Loads product trees through the storage ports, cleans them on every read,
//! validates before every write and publishes the resulting events.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};
use uuid::Uuid;
use crate::domain::aggregates::product::Product;
use crate::domain::aggregates::variant::Variant;
use crate::domain::ports::{EventPublisher, OnHandInventory, StoredProduct, VariantRepository};
use crate::domain::services::aggregator::{self, BreakdownRow};
use crate::domain::services::export::ExportTable;
use crate::domain::services::validation;
use crate::domain::value_objects::{MaxDepth, Money, ValueAddress};
use crate::{Result, VariantError};

/// Stock figures for one product, as dashboards and alerts consume them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockSnapshot {
    pub product_id: Uuid,
    pub name: String,
    pub variants: Vec<Variant>,
    pub total_quantity: u64,
    pub on_hand: u64,
    pub effective_stock: u64,
    pub breakdown: Vec<BreakdownRow>,
    pub low_stock: Vec<BreakdownRow>,
}

impl StockSnapshot {
    pub fn of(product: &Product) -> Self {
        let breakdown = aggregator::breakdown(product.variants());
        let low_stock = breakdown.iter().filter(|row| row.is_low()).cloned().collect();
        Self {
            product_id: product.id(),
            name: product.name().to_string(),
            variants: product.variants().to_vec(),
            total_quantity: product.total_quantity(),
            on_hand: product.on_hand(),
            effective_stock: product.effective_stock(),
            breakdown,
            low_stock,
        }
    }
}

pub struct Catalog<S, P> {
    store: S,
    publisher: P,
    max_depth: MaxDepth,
}

impl<S, P> Catalog<S, P>
where
    S: VariantRepository + OnHandInventory,
    P: EventPublisher,
{
    pub fn new(store: S, publisher: P, max_depth: MaxDepth) -> Self { Self { store, publisher, max_depth } }

    pub fn max_depth(&self) -> MaxDepth { self.max_depth }
    pub fn store(&self) -> &S { &self.store }

    /// Reads a product and cleans its stored tree.
    pub async fn load(&self, id: Uuid) -> Result<Product> {
        let stored = self.store.load(id).await?.ok_or(VariantError::ProductNotFound(id))?;
        let on_hand = self.store.on_hand(id).await?;
        Ok(self.hydrate(stored, on_hand))
    }

    fn hydrate(&self, stored: StoredProduct, on_hand: u64) -> Product {
        let variants = validation::clean_variants_json(&stored.variants, self.max_depth);
        let product = Product::new(stored.id, stored.name, self.max_depth)
            .with_variants(variants)
            .with_on_hand(on_hand);
        match stored.unit_price {
            Some(minor) => product.with_unit_price(Money::from_minor(minor, &stored.currency)),
            None => product,
        }
    }

    pub async fn snapshot(&self, id: Uuid) -> Result<StockSnapshot> {
        Ok(StockSnapshot::of(&self.load(id).await?))
    }

    /// Validates `variants` and, when clean, replaces the stored tree with
    /// the cleaned version. Any validation error blocks the save.
    pub async fn save_variants(&self, id: Uuid, variants: Value) -> Result<StockSnapshot> {
        let on_hand = self.store.on_hand(id).await?;
        let mut product = self
            .store
            .update_variants(id, |stored| {
                let report = validation::validate_product(&json!({ "name": &stored.name, "variants": variants }), self.max_depth);
                if !report.valid {
                    return Err(VariantError::Invalid(report.errors));
                }
                let mut product = self.hydrate(stored, on_hand);
                product.replace_variants(report.cleaned_data.variants);
                Ok((product.variants().to_vec(), product))
            })
            .await
            .inspect_err(|err| {
                if let VariantError::Invalid(errors) = err {
                    warn!(product_id = %id, errors = errors.len(), "rejected variant save");
                }
            })?
            .ok_or(VariantError::ProductNotFound(id))?;
        info!(product_id = %id, total = product.total_quantity(), "saved variants");
        self.publish(&mut product).await;
        Ok(StockSnapshot::of(&product))
    }

    /// Takes stock off one leaf. The read and the write happen under the
    /// store's per-product update, so concurrent withdrawals never oversell.
    pub async fn withdraw(&self, id: Uuid, address: &ValueAddress, quantity: u32) -> Result<StockSnapshot> {
        let on_hand = self.store.on_hand(id).await?;
        let mut product = self
            .store
            .update_variants(id, |stored| {
                let mut product = self.hydrate(stored, on_hand);
                product.withdraw(address, quantity)?;
                Ok((product.variants().to_vec(), product))
            })
            .await?
            .ok_or(VariantError::ProductNotFound(id))?;
        self.publish(&mut product).await;
        Ok(StockSnapshot::of(&product))
    }

    pub async fn export(&self, id: Uuid, title: Option<&str>) -> Result<ExportTable> {
        let product = self.load(id).await?;
        Ok(ExportTable::new(title.unwrap_or(product.name()), product.variants(), product.unit_price()))
    }

    async fn publish(&self, product: &mut Product) {
        for event in product.take_events() {
            if let Err(err) = self.publisher.publish(&event).await {
                warn!(%err, subject = event.subject(), "failed to publish event");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use chrono::Utc;
    use super::*;
    use crate::domain::aggregates::variant::VariantValue;
    use crate::infrastructure::{MemoryStore, NatsPublisher};

    /// Yields on every read so concurrent requests interleave.
    #[derive(Clone, Default)]
    struct YieldingStore(MemoryStore);

    impl VariantRepository for YieldingStore {
        async fn load(&self, id: Uuid) -> Result<Option<StoredProduct>> {
            let product = self.0.load(id).await;
            tokio::task::yield_now().await;
            product
        }

        async fn update_variants<T, F>(&self, id: Uuid, update: F) -> Result<Option<T>>
        where
            T: Send,
            F: FnOnce(StoredProduct) -> Result<(Vec<Variant>, T)> + Send,
        {
            tokio::task::yield_now().await;
            self.0.update_variants(id, update).await
        }
    }

    impl OnHandInventory for YieldingStore {
        async fn on_hand(&self, id: Uuid) -> Result<u64> {
            tokio::task::yield_now().await;
            self.0.on_hand(id).await
        }
    }

    async fn catalog_with(stock: u32) -> (Arc<Catalog<YieldingStore, NatsPublisher>>, Uuid) {
        let store = YieldingStore::default();
        let id = Uuid::now_v7();
        let tree = vec![Variant::new("Size", vec![VariantValue::leaf("S", stock)])];
        store.0.insert(StoredProduct {
            id,
            name: "Tee".into(),
            variants: serde_json::to_value(&tree).unwrap(),
            unit_price: None,
            currency: "USD".into(),
            updated_at: Utc::now(),
        }).await;
        (Arc::new(Catalog::new(store, NatsPublisher::disabled(), MaxDepth::default())), id)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_withdrawals_never_oversell() {
        let (catalog, id) = catalog_with(100).await;
        let tasks: Vec<_> = (0..120)
            .map(|_| {
                let catalog = Arc::clone(&catalog);
                tokio::spawn(async move { catalog.withdraw(id, &ValueAddress::top(0, 0), 1).await })
            })
            .collect();
        let mut succeeded = 0;
        let mut refused = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(_) => succeeded += 1,
                Err(VariantError::Stock(_)) => refused += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert_eq!((succeeded, refused), (100, 20));
        assert_eq!(catalog.snapshot(id).await.unwrap().total_quantity, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_save_does_not_drop_concurrent_withdrawal() {
        let (catalog, id) = catalog_with(10).await;
        let withdraw = {
            let catalog = Arc::clone(&catalog);
            tokio::spawn(async move { catalog.withdraw(id, &ValueAddress::top(0, 0), 4).await })
        };
        let rename = {
            let catalog = Arc::clone(&catalog);
            tokio::spawn(async move {
                catalog.save_variants(id, json!([{"attribute": "Size", "values": [{"value": "S", "quantity": 10}, {"value": "M", "quantity": 5}]}])).await
            })
        };
        withdraw.await.unwrap().unwrap();
        rename.await.unwrap().unwrap();
        // Whichever ran second saw the other's write.
        let total = catalog.snapshot(id).await.unwrap().total_quantity;
        assert!(total == 11 || total == 15, "total {total}");
    }

    #[tokio::test]
    async fn test_rejected_save_leaves_tree_alone() {
        let (catalog, id) = catalog_with(3).await;
        let err = catalog.save_variants(id, json!([{"attribute": "", "values": ["x"]}])).await.unwrap_err();
        assert!(matches!(err, VariantError::Invalid(_)));
        assert_eq!(catalog.snapshot(id).await.unwrap().total_quantity, 3);
        assert!(matches!(catalog.withdraw(Uuid::now_v7(), &ValueAddress::top(0, 0), 1).await, Err(VariantError::ProductNotFound(_))));
    }
}
