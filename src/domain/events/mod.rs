//! Domain events
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    Product(ProductEvent),
}

impl DomainEvent {
    /// NATS subject the event is published on.
    pub fn subject(&self) -> &'static str {
        match self {
            Self::Product(ProductEvent::VariantsReplaced { .. }) => "inventory.variants.replaced",
            Self::Product(ProductEvent::StockWithdrawn { .. }) => "inventory.stock.withdrawn",
            Self::Product(ProductEvent::LowStock { .. }) => "inventory.stock.low",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProductEvent {
    VariantsReplaced { product_id: Uuid, total_quantity: u64, leaves: usize, at: DateTime<Utc> },
    StockWithdrawn { product_id: Uuid, path: String, quantity: u32, remaining: u32, at: DateTime<Utc> },
    LowStock { product_id: Uuid, path: String, quantity: u32, minimum_quantity: u32, at: DateTime<Utc> },
}
