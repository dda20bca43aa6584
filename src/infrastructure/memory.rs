//! In-memory store, used when no database is configured and in tests.

use std::collections::HashMap;
use std::sync::Arc;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;
use crate::domain::aggregates::variant::Variant;
use crate::domain::ports::{OnHandInventory, StoredProduct, VariantRepository};
use crate::Result;

#[derive(Clone, Default)]
pub struct MemoryStore {
    products: Arc<RwLock<HashMap<Uuid, StoredProduct>>>,
    on_hand: Arc<RwLock<HashMap<Uuid, u64>>>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }

    pub async fn insert(&self, product: StoredProduct) {
        self.products.write().await.insert(product.id, product);
    }

    pub async fn set_on_hand(&self, id: Uuid, quantity: u64) {
        self.on_hand.write().await.insert(id, quantity);
    }
}

impl VariantRepository for MemoryStore {
    async fn load(&self, id: Uuid) -> Result<Option<StoredProduct>> {
        Ok(self.products.read().await.get(&id).cloned())
    }

    async fn update_variants<T, F>(&self, id: Uuid, update: F) -> Result<Option<T>>
    where
        T: Send,
        F: FnOnce(StoredProduct) -> Result<(Vec<Variant>, T)> + Send,
    {
        // The write guard is held until the new tree is stored.
        let mut products = self.products.write().await;
        let Some(product) = products.get_mut(&id) else { return Ok(None) };
        let (variants, output) = update(product.clone())?;
        product.variants = serde_json::to_value(&variants)?;
        product.updated_at = Utc::now();
        Ok(Some(output))
    }
}

impl OnHandInventory for MemoryStore {
    async fn on_hand(&self, id: Uuid) -> Result<u64> {
        Ok(self.on_hand.read().await.get(&id).copied().unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use crate::domain::aggregates::variant::VariantValue;

    fn stored(id: Uuid) -> StoredProduct {
        StoredProduct { id, name: "Tee".into(), variants: json!([]), unit_price: None, currency: "USD".into(), updated_at: Utc::now() }
    }

    fn sizes() -> Vec<Variant> { vec![Variant::new("Size", vec![VariantValue::leaf("S", 2)])] }

    #[tokio::test]
    async fn test_update_round_trip() {
        let store = MemoryStore::new();
        let id = Uuid::now_v7();
        store.insert(stored(id)).await;
        let name = store.update_variants(id, |p| Ok((sizes(), p.name))).await.unwrap();
        assert_eq!(name.as_deref(), Some("Tee"));
        let loaded = store.load(id).await.unwrap().unwrap();
        assert_eq!(loaded.variants, json!([{"attribute": "Size", "values": [{"value": "S", "quantity": 2}]}]));
        assert!(store.update_variants(Uuid::now_v7(), |_| Ok((sizes(), ()))).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failed_update_keeps_stored_tree() {
        let store = MemoryStore::new();
        let id = Uuid::now_v7();
        store.insert(stored(id)).await;
        let result = store
            .update_variants(id, |_| -> Result<(Vec<Variant>, ())> { Err(crate::VariantError::BadRequest("no".into())) })
            .await;
        assert!(result.is_err());
        assert_eq!(store.load(id).await.unwrap().unwrap().variants, json!([]));
    }

    #[tokio::test]
    async fn test_on_hand_defaults_to_zero() {
        let store = MemoryStore::new();
        let id = Uuid::now_v7();
        assert_eq!(store.on_hand(id).await.unwrap(), 0);
        store.set_on_hand(id, 12).await;
        assert_eq!(store.on_hand(id).await.unwrap(), 12);
    }
}
