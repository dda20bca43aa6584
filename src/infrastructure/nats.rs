//! NATS event publishing. Without a configured client events are dropped.

use crate::domain::events::DomainEvent;
use crate::domain::ports::EventPublisher;
use crate::{Result, VariantError};

#[derive(Clone, Default)]
pub struct NatsPublisher {
    client: Option<async_nats::Client>,
}

impl NatsPublisher {
    pub fn new(client: Option<async_nats::Client>) -> Self { Self { client } }

    pub fn disabled() -> Self { Self::default() }

    /// Connects when `url` is set; a failed connection degrades to a disabled
    /// publisher.
    pub async fn connect(url: Option<&str>) -> Self {
        let Some(url) = url else { return Self::disabled() };
        match async_nats::connect(url).await {
            Ok(client) => Self::new(Some(client)),
            Err(err) => {
                tracing::warn!(%err, url, "NATS unavailable, events will not be published");
                Self::disabled()
            }
        }
    }

    pub fn is_enabled(&self) -> bool { self.client.is_some() }
}

impl EventPublisher for NatsPublisher {
    async fn publish(&self, event: &DomainEvent) -> Result<()> {
        let Some(client) = &self.client else { return Ok(()) };
        let payload = serde_json::to_vec(event)?;
        client
            .publish(event.subject().to_string(), payload.into())
            .await
            .map_err(|e| VariantError::PublishError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;
    use crate::domain::events::ProductEvent;

    #[tokio::test]
    async fn test_disabled_publisher_is_a_no_op() {
        let publisher = NatsPublisher::connect(None).await;
        assert!(!publisher.is_enabled());
        let event = DomainEvent::Product(ProductEvent::VariantsReplaced {
            product_id: Uuid::now_v7(), total_quantity: 1, leaves: 1, at: Utc::now(),
        });
        assert!(publisher.publish(&event).await.is_ok());
    }

    #[test]
    fn test_event_payload_shape() {
        let event = DomainEvent::Product(ProductEvent::LowStock {
            product_id: Uuid::nil(), path: "Color: Red".into(), quantity: 1, minimum_quantity: 2, at: Utc::now(),
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "product");
        assert_eq!(json["event"], "low_stock");
        assert_eq!(json["minimum_quantity"], 2);
        assert_eq!(event.subject(), "inventory.stock.low");
    }
}
