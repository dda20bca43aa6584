//! Aggregates module
pub mod product;
pub mod variant;

pub use product::Product;
pub use variant::{Variant, VariantValue};
