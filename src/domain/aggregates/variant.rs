//! Variant tree
//!
//! A product's variations as a recursive attribute/value tree
//! (Color → Size → Material). Quantities live on leaf values only.

use serde::{Deserialize, Serialize};
use crate::domain::value_objects::{ListPath, ValueAddress};

pub const ATTRIBUTE_MAX_LEN: usize = 50;
pub const VALUE_MAX_LEN: usize = 100;
/// Joins `attribute: value` segments in breakdown paths.
pub const PATH_SEPARATOR: &str = " → ";

/// One axis of variation, e.g. "Color".
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variant {
    #[serde(default)]
    pub attribute: String,
    #[serde(default)]
    pub values: Vec<VariantValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
}

/// One option under a variant, e.g. "Red". Branches into `sub_variants` or
/// holds a quantity, never both.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantValue {
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sub_variants: Vec<Variant>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_quantity: Option<u32>,
}

impl Variant {
    pub fn new(attribute: impl Into<String>, values: Vec<VariantValue>) -> Self {
        Self { attribute: attribute.into(), values, sku: None }
    }

    /// Fresh row for "add variant": blank attribute with one blank value.
    pub fn empty() -> Self { Self::new("", vec![VariantValue::empty()]) }

    pub fn with_sku(mut self, sku: impl Into<String>) -> Self { self.sku = Some(sku.into()); self }
}

impl VariantValue {
    /// Fresh row for "add value".
    pub fn empty() -> Self { Self::default() }

    pub fn leaf(value: impl Into<String>, quantity: u32) -> Self {
        Self { value: value.into(), quantity, ..Self::default() }
    }

    pub fn branch(value: impl Into<String>, sub_variants: Vec<Variant>) -> Self {
        Self { value: value.into(), sub_variants, ..Self::default() }
    }

    pub fn with_sku(mut self, sku: impl Into<String>) -> Self { self.sku = Some(sku.into()); self }
    pub fn with_minimum(mut self, minimum: u32) -> Self { self.minimum_quantity = Some(minimum); self }

    pub fn is_leaf(&self) -> bool { self.sub_variants.is_empty() }

    /// Quantity that counts towards totals; zero for branching values.
    pub fn effective_quantity(&self) -> u32 { if self.is_leaf() { self.quantity } else { 0 } }
}

/// `"Color: Red"`
pub fn path_segment(attribute: &str, value: &str) -> String { format!("{attribute}: {value}") }

/// Number of variant levels in the tree; 0 for an empty tree.
pub fn tree_depth(variants: &[Variant]) -> usize {
    variants
        .iter()
        .flat_map(|v| v.values.iter())
        .map(|val| tree_depth(&val.sub_variants))
        .max()
        .map_or(if variants.is_empty() { 0 } else { 1 }, |d| d + 1)
}

pub fn list_at<'a>(tree: &'a [Variant], path: &ListPath) -> Option<&'a [Variant]> {
    let mut list = tree;
    for step in path.steps() {
        list = list.get(step.variant)?.values.get(step.value)?.sub_variants.as_slice();
    }
    Some(list)
}

pub fn list_at_mut<'a>(tree: &'a mut Vec<Variant>, path: &ListPath) -> Option<&'a mut Vec<Variant>> {
    let mut list = tree;
    for step in path.steps() {
        let value = list.get_mut(step.variant)?.values.get_mut(step.value)?;
        list = &mut value.sub_variants;
    }
    Some(list)
}

pub fn value_at<'a>(tree: &'a [Variant], addr: &ValueAddress) -> Option<&'a VariantValue> {
    list_at(tree, &addr.list)?.get(addr.variant)?.values.get(addr.value)
}

pub fn value_at_mut<'a>(tree: &'a mut Vec<Variant>, addr: &ValueAddress) -> Option<&'a mut VariantValue> {
    list_at_mut(tree, &addr.list)?.get_mut(addr.variant)?.values.get_mut(addr.value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn color_size() -> Vec<Variant> {
        vec![Variant::new("Color", vec![
            VariantValue::branch("Red", vec![Variant::new("Size", vec![VariantValue::leaf("S", 2), VariantValue::leaf("M", 4)])]),
            VariantValue::leaf("Blue", 3),
        ])]
    }

    #[test]
    fn test_empty_rows() {
        let v = Variant::empty();
        assert_eq!(v.attribute, "");
        assert_eq!(v.values, vec![VariantValue { value: String::new(), quantity: 0, ..Default::default() }]);
    }

    #[test]
    fn test_wire_shape() {
        let json = serde_json::to_value(color_size()).unwrap();
        assert_eq!(json[0]["values"][0]["subVariants"][0]["attribute"], "Size");
        assert!(json[0]["values"][1].get("subVariants").is_none());
        assert!(json[0]["values"][1].get("minimumQuantity").is_none());
        let back: Vec<Variant> = serde_json::from_value(json).unwrap();
        assert_eq!(back, color_size());
    }

    #[test]
    fn test_lookup() {
        let tree = color_size();
        let m = ValueAddress::new(ListPath::root().child(0, 0), 0, 1);
        assert_eq!(value_at(&tree, &m).map(|v| v.quantity), Some(4));
        assert!(value_at(&tree, &ValueAddress::top(0, 5)).is_none());
        assert_eq!(tree_depth(&tree), 2);
        assert_eq!(tree_depth(&[]), 0);
    }

    #[test]
    fn test_effective_quantity() {
        let mut red = VariantValue::branch("Red", vec![Variant::new("Size", vec![VariantValue::leaf("S", 1)])]);
        red.quantity = 9;
        assert_eq!(red.effective_quantity(), 0);
        assert_eq!(VariantValue::leaf("Blue", 3).effective_quantity(), 3);
    }
}
