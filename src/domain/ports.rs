//! Collaborator interfaces
//!
//! The variant core owns no I/O. Storage, stock reads and event delivery are
//! reached through these traits.

use std::future::Future;
use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;
use crate::domain::aggregates::variant::Variant;
use crate::domain::events::DomainEvent;
use crate::Result;

/// A product record as storage holds it. `variants` is opaque JSON and is
/// not trusted to satisfy any tree invariant.
#[derive(Clone, Debug, PartialEq)]
pub struct StoredProduct {
    pub id: Uuid,
    pub name: String,
    pub variants: Value,
    /// Price in minor units.
    pub unit_price: Option<i64>,
    pub currency: String,
    pub updated_at: DateTime<Utc>,
}

pub trait VariantRepository: Send + Sync {
    fn load(&self, id: Uuid) -> impl Future<Output = Result<Option<StoredProduct>>> + Send;

    /// Reads the product, lets `update` compute the next tree and writes it
    /// back, with no other update to the same product in between. An error
    /// from `update` leaves the stored tree untouched. Returns `None` when the
    /// product does not exist.
    fn update_variants<T, F>(&self, id: Uuid, update: F) -> impl Future<Output = Result<Option<T>>> + Send
    where
        T: Send,
        F: FnOnce(StoredProduct) -> Result<(Vec<Variant>, T)> + Send;
}

/// On-hand stock for products that do not track quantities in their tree.
pub trait OnHandInventory: Send + Sync {
    fn on_hand(&self, id: Uuid) -> impl Future<Output = Result<u64>> + Send;
}

pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: &DomainEvent) -> impl Future<Output = Result<()>> + Send;
}
