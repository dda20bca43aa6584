//! Adapters for the domain ports
pub mod memory;
pub mod nats;
pub mod postgres;

pub use memory::MemoryStore;
pub use nats::NatsPublisher;
pub use postgres::PgStore;
