//! Quantity aggregation over variant trees
//!
//! Every consumer (dashboard totals, low-stock alerts, checkout, exports)
//! reads the tree through [`walk_leaves`], so totals and itemised rows agree.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use crate::domain::aggregates::variant::{self, path_segment, Variant, VariantValue, PATH_SEPARATOR};
use crate::domain::value_objects::{ListPath, ValueAddress};

/// One leaf of the tree, flattened.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakdownRow {
    pub path: String,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_quantity: Option<u32>,
    pub address: ValueAddress,
}

impl BreakdownRow {
    pub fn is_low(&self) -> bool { self.minimum_quantity.is_some_and(|min| self.quantity <= min) }
}

/// Depth-first, stored-order visit of every leaf value. `segments` holds the
/// `attribute: value` chain from the root down to and including the leaf.
pub fn walk_leaves<'a, F>(variants: &'a [Variant], visit: &mut F)
where
    F: FnMut(&[String], ValueAddress, &'a VariantValue),
{
    let mut segments = Vec::new();
    walk(variants, &ListPath::root(), &mut segments, visit);
}

fn walk<'a, F>(variants: &'a [Variant], list: &ListPath, segments: &mut Vec<String>, visit: &mut F)
where
    F: FnMut(&[String], ValueAddress, &'a VariantValue),
{
    for (vi, variant) in variants.iter().enumerate() {
        for (xi, value) in variant.values.iter().enumerate() {
            segments.push(path_segment(&variant.attribute, &value.value));
            if value.is_leaf() {
                visit(segments.as_slice(), ValueAddress::new(list.clone(), vi, xi), value);
            } else {
                walk(&value.sub_variants, &list.child(vi, xi), segments, visit);
            }
            segments.pop();
        }
    }
}

/// Sum of leaf quantities. A value with children counts only its descendants.
pub fn total_quantity(variants: &[Variant]) -> u64 {
    let mut total = 0u64;
    walk_leaves(variants, &mut |_, _, value| total += u64::from(value.quantity));
    total
}

/// One row per leaf, in traversal order.
pub fn breakdown(variants: &[Variant]) -> Vec<BreakdownRow> {
    let mut rows = Vec::new();
    walk_leaves(variants, &mut |segments, address, value| {
        rows.push(BreakdownRow {
            path: segments.join(PATH_SEPARATOR),
            quantity: value.quantity,
            sku: value.sku.clone(),
            minimum_quantity: value.minimum_quantity,
            address,
        });
    });
    rows
}

/// Leaves at or below their reorder threshold.
pub fn low_stock(variants: &[Variant]) -> Vec<BreakdownRow> {
    breakdown(variants).into_iter().filter(BreakdownRow::is_low).collect()
}

/// Current stock for a product: the tree total when it tracks any quantity,
/// otherwise the on-hand figure from the inventory table.
pub fn effective_stock(variants: Option<&[Variant]>, on_hand: u64) -> u64 {
    match variants.map(total_quantity) {
        Some(total) if total > 0 => total,
        _ => on_hand,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StockError {
    #[error("no variant value at {0}")]
    NotFound(ValueAddress),
    #[error("variant value at {0} has sub-variants; stock is held on its leaves")]
    NotALeaf(ValueAddress),
    #[error("insufficient stock at {address}: requested {requested}, available {available}")]
    Insufficient { address: ValueAddress, requested: u32, available: u32 },
}

/// Takes `quantity` units off one leaf, returning the updated tree.
pub fn withdraw(variants: &[Variant], address: &ValueAddress, quantity: u32) -> Result<Vec<Variant>, StockError> {
    let mut tree = variants.to_vec();
    let value = variant::value_at_mut(&mut tree, address).ok_or_else(|| StockError::NotFound(address.clone()))?;
    if !value.is_leaf() { return Err(StockError::NotALeaf(address.clone())); }
    value.quantity = value.quantity.checked_sub(quantity).ok_or(StockError::Insufficient {
        address: address.clone(),
        requested: quantity,
        available: value.quantity,
    })?;
    tracing::debug!(%address, quantity, remaining = value.quantity, "withdrew variant stock");
    Ok(tree)
}
