//! Variant domain: tree types, algorithms and collaborator ports
pub mod aggregates;
pub mod events;
pub mod ports;
pub mod services;
pub mod value_objects;
