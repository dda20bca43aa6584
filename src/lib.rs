//! OpenSASE Variants
//!
//! Nested product-variant inventory for warehouse and 3PL catalogs.
//!
//! ## Features
//! - Recursive attribute/value trees (Color → Size → Material) with a depth ceiling
//! - Leaf-only quantities, totals and per-leaf breakdowns
//! - Validation and cleaning of untrusted trees
//! - Pure edit reducer for nested editors
//! - Tabular export with computed stock value

use thiserror::Error;
use uuid::Uuid;

pub mod api;
pub mod catalog;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use domain::aggregates::product::Product;
pub use domain::aggregates::variant::{Variant, VariantValue, PATH_SEPARATOR};
pub use domain::services::aggregator::{breakdown, effective_stock, low_stock, total_quantity, withdraw, BreakdownRow, StockError};
pub use domain::services::editor::{apply, EditCommand, EditError, ValueUpdate, VariantEditor, VariantField};
pub use domain::services::export::{export_rows, ExportRow, ExportTable};
pub use domain::services::validation::{
    clean_variants, clean_variants_json, has_product_issues, validate_product, variants_from_json, CleanedProduct,
    ProductIssues, ValidationReport,
};
pub use domain::value_objects::{ListPath, MaxDepth, Money, ValueAddress};

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum VariantError {
    #[error("Product not found: {0}")]
    ProductNotFound(Uuid),

    #[error("Invalid variants: {}", .0.join("; "))]
    Invalid(Vec<String>),

    #[error(transparent)]
    Edit(#[from] EditError),

    #[error(transparent)]
    Stock(#[from] StockError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Publish error: {0}")]
    PublishError(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, VariantError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = VariantError::Invalid(vec!["Product name is required".into(), "Variant 1: Attribute name is required".into()]);
        assert_eq!(err.to_string(), "Invalid variants: Product name is required; Variant 1: Attribute name is required");
        let err: VariantError = EditError::LastValue.into();
        assert_eq!(err.to_string(), "a variant must keep at least one value");
    }
}
