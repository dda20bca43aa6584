//! Validation and cleaning of variant trees
//!
//! Storage does not enforce any tree invariant, so every tree that arrives
//! from a form, a bulk import or the database goes through here first.
//! Nothing in this module fails: malformed input is coerced or skipped and
//! problems come back as data.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;
use crate::domain::aggregates::variant::{Variant, VariantValue, ATTRIBUTE_MAX_LEN, PATH_SEPARATOR, VALUE_MAX_LEN};
use crate::domain::value_objects::MaxDepth;

pub const NAME_MAX_LEN: u64 = 255;

/// Outcome of a hard validation pass.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
    pub cleaned_data: CleanedProduct,
}

/// The product with its name trimmed and its tree cleaned. Fields this
/// module does not understand are carried through untouched.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CleanedProduct {
    pub name: String,
    pub variants: Vec<Variant>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

/// Cheap warning list for badges.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductIssues {
    pub has_issues: bool,
    pub issues: Vec<String>,
}

// =============================================================================
// Coercion
// =============================================================================

/// Reads a loosely-typed JSON tree. Bare strings become zero-quantity values,
/// anything that is not an object becomes an empty node, quantities are
/// clamped to non-negative integers.
pub fn variants_from_json(input: &Value) -> Vec<Variant> {
    input.as_array().map(|items| items.iter().map(coerce_variant).collect()).unwrap_or_default()
}

fn coerce_variant(item: &Value) -> Variant {
    let Some(obj) = item.as_object() else { return Variant::default() };
    Variant {
        attribute: label(obj.get("attribute")),
        values: obj
            .get("values")
            .and_then(Value::as_array)
            .map(|values| values.iter().map(coerce_value).collect())
            .unwrap_or_default(),
        sku: optional_label(obj.get("sku")),
    }
}

fn coerce_value(item: &Value) -> VariantValue {
    match item {
        Value::String(s) => VariantValue::leaf(s.clone(), 0),
        Value::Number(n) => VariantValue::leaf(n.to_string(), 0),
        Value::Object(obj) => VariantValue {
            value: label(obj.get("value")),
            quantity: quantity(obj.get("quantity")).unwrap_or(0),
            sub_variants: variants_from_json(either(obj, "subVariants", "sub_variants").unwrap_or(&Value::Null)),
            sku: optional_label(obj.get("sku")),
            minimum_quantity: quantity(either(obj, "minimumQuantity", "minimum_quantity")),
        },
        _ => VariantValue::empty(),
    }
}

fn either<'a>(obj: &'a Map<String, Value>, key: &str, alias: &str) -> Option<&'a Value> {
    obj.get(key).or_else(|| obj.get(alias))
}

fn label(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

fn optional_label(value: Option<&Value>) -> Option<String> {
    let s = label(value);
    (!s.trim().is_empty()).then(|| s.trim().to_string())
}

fn quantity(value: Option<&Value>) -> Option<u32> {
    let n = match value? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !n.is_finite() { return None; }
    Some(n.floor().clamp(0.0, f64::from(u32::MAX)) as u32)
}

// =============================================================================
// Cleaning
// =============================================================================

/// Drops every node that is not well formed: blank or over-long labels are
/// trimmed/truncated, blank values and variants left without values are
/// removed, nesting past `max_depth` is pruned, and values that had children
/// lose their own quantity and threshold, even when none of the children
/// survive. Idempotent, and never raises the tree total.
pub fn clean_variants(variants: &[Variant], max_depth: MaxDepth) -> Vec<Variant> {
    clean_list(variants, 0, max_depth)
}

/// [`clean_variants`] over untrusted JSON.
pub fn clean_variants_json(input: &Value, max_depth: MaxDepth) -> Vec<Variant> {
    clean_variants(&variants_from_json(input), max_depth)
}

fn clean_list(variants: &[Variant], depth: usize, max_depth: MaxDepth) -> Vec<Variant> {
    variants.iter().filter_map(|variant| clean_variant(variant, depth, max_depth)).collect()
}

fn clean_variant(variant: &Variant, depth: usize, max_depth: MaxDepth) -> Option<Variant> {
    let attribute = normalize(&variant.attribute, ATTRIBUTE_MAX_LEN);
    if attribute.is_empty() {
        debug!(depth, "dropping variant without attribute");
        return None;
    }
    let values: Vec<VariantValue> = variant
        .values
        .iter()
        .filter_map(|value| clean_value(value, depth, max_depth))
        .collect();
    if values.is_empty() {
        debug!(depth, %attribute, "dropping variant without values");
        return None;
    }
    Some(Variant { attribute, values, sku: clean_sku(variant.sku.as_deref()) })
}

fn clean_value(value: &VariantValue, depth: usize, max_depth: MaxDepth) -> Option<VariantValue> {
    let label = normalize(&value.value, VALUE_MAX_LEN);
    if label.is_empty() { return None; }
    let sub_variants = if max_depth.allows_sub_variants(depth) {
        clean_list(&value.sub_variants, depth + 1, max_depth)
    } else {
        if !value.sub_variants.is_empty() {
            debug!(depth, value = %label, "pruning sub-variants past max depth");
        }
        Vec::new()
    };
    // A stored branch never had stock of its own, even if all of its
    // children are dropped here.
    let leaf = value.is_leaf();
    Some(VariantValue {
        value: label,
        quantity: if leaf { value.quantity } else { 0 },
        sub_variants,
        sku: clean_sku(value.sku.as_deref()),
        minimum_quantity: value.minimum_quantity.filter(|_| leaf),
    })
}

fn normalize(raw: &str, max_chars: usize) -> String {
    let trimmed = raw.trim();
    if trimmed.chars().count() <= max_chars { return trimmed.to_string(); }
    trimmed.chars().take(max_chars).collect::<String>().trim_end().to_string()
}

fn clean_sku(sku: Option<&str>) -> Option<String> {
    sku.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

// =============================================================================
// Validation
// =============================================================================

/// Validates a product payload (`{name, variants, ..}`) and returns one
/// message per failing node. Rows left completely blank are skipped without
/// an error; rows with only some fields filled are reported.
pub fn validate_product(input: &Value, max_depth: MaxDepth) -> ValidationReport {
    let mut other = input.as_object().cloned().unwrap_or_default();
    let name = label(other.remove("name").as_ref()).trim().to_string();
    let variants = variants_from_json(&other.remove("variants").unwrap_or(Value::Null));

    let mut errors = Vec::new();
    if name.is_empty() {
        errors.push("Product name is required".to_string());
    } else if !validator::validate_length(name.as_str(), None, Some(NAME_MAX_LEN), None) {
        errors.push(format!("Product name must be {NAME_MAX_LEN} characters or fewer"));
    }
    check_list(&variants, 0, "", max_depth, &mut errors);

    debug!(errors = errors.len(), "validated product");
    ValidationReport {
        valid: errors.is_empty(),
        errors,
        cleaned_data: CleanedProduct { name, variants: clean_variants(&variants, max_depth), other },
    }
}

fn is_blank_row(variant: &Variant) -> bool {
    variant.attribute.trim().is_empty()
        && variant.values.iter().all(|v| v.value.trim().is_empty() && v.sub_variants.is_empty())
}

fn check_list(variants: &[Variant], depth: usize, parent: &str, max_depth: MaxDepth, errors: &mut Vec<String>) {
    for (index, variant) in variants.iter().enumerate() {
        if is_blank_row(variant) { continue; }
        let attribute = variant.attribute.trim();
        let name = if attribute.is_empty() { format!("#{}", index + 1) } else { attribute.to_string() };
        let location = match (parent.is_empty(), attribute.is_empty()) {
            (true, true) => format!("Variant {}", index + 1),
            (true, false) => format!("Variant \"{name}\""),
            (false, _) => format!("Variant \"{parent}{PATH_SEPARATOR}{name}\""),
        };

        if attribute.is_empty() {
            errors.push(format!("{location}: Attribute name is required"));
        } else if attribute.chars().count() > ATTRIBUTE_MAX_LEN {
            errors.push(format!("{location}: Attribute name must be {ATTRIBUTE_MAX_LEN} characters or fewer"));
        }

        let mut named_values = 0;
        for (vi, value) in variant.values.iter().enumerate() {
            let label = value.value.trim();
            if label.is_empty() {
                errors.push(format!("{location}: Value {} cannot be empty", vi + 1));
                continue;
            }
            named_values += 1;
            if label.chars().count() > VALUE_MAX_LEN {
                errors.push(format!("{location}: Value {} must be {VALUE_MAX_LEN} characters or fewer", vi + 1));
            }
            if value.sub_variants.is_empty() { continue; }
            let breadcrumb = if parent.is_empty() {
                format!("{name}: {label}")
            } else {
                format!("{parent}{PATH_SEPARATOR}{name}: {label}")
            };
            if max_depth.allows_sub_variants(depth) {
                check_list(&value.sub_variants, depth + 1, &breadcrumb, max_depth, errors);
            } else {
                errors.push(format!(
                    "Variant \"{breadcrumb}\": Sub-variants exceed the maximum depth of {}",
                    max_depth.value()
                ));
            }
        }
        if named_values == 0 {
            errors.push(format!("{location}: At least one value is required"));
        }
    }
}

// =============================================================================
// Issue badges
// =============================================================================

const ISSUE_EMPTY_NAME: &str = "Product name is empty";
const ISSUE_EMPTY_ATTRIBUTE: &str = "Variant attribute is empty";
const ISSUE_EMPTY_VALUE: &str = "Variant value is empty";

/// Lists the kinds of problem a stored product has, each at most once.
pub fn has_product_issues(product: &Value) -> ProductIssues {
    let mut issues = Vec::new();
    let name = product.get("name").and_then(Value::as_str).unwrap_or_default();
    if name.trim().is_empty() { note(&mut issues, ISSUE_EMPTY_NAME); }
    if let Some(variants) = product.get("variants") { scan_variants(variants, &mut issues); }
    ProductIssues { has_issues: !issues.is_empty(), issues }
}

fn scan_variants(variants: &Value, issues: &mut Vec<String>) {
    let Some(variants) = variants.as_array() else { return };
    for variant in variants.iter().filter_map(Value::as_object) {
        let attribute = variant.get("attribute").and_then(Value::as_str).unwrap_or_default();
        if attribute.trim().is_empty() { note(issues, ISSUE_EMPTY_ATTRIBUTE); }
        let Some(values) = variant.get("values").and_then(Value::as_array) else { continue };
        for value in values {
            let (label, children) = match value {
                Value::String(s) => (s.as_str(), None),
                Value::Object(obj) => (
                    obj.get("value").and_then(Value::as_str).unwrap_or_default(),
                    either(obj, "subVariants", "sub_variants"),
                ),
                _ => continue,
            };
            if label.trim().is_empty() { note(issues, ISSUE_EMPTY_VALUE); }
            if let Some(children) = children { scan_variants(children, issues); }
        }
    }
}

fn note(issues: &mut Vec<String>, issue: &str) {
    if !issues.iter().any(|i| i == issue) { issues.push(issue.to_string()); }
}
