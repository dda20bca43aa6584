//! Value Objects for the variant inventory

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Currency assumed when a price does not name one; matches the
/// `products.currency` column default.
pub const DEFAULT_CURRENCY: &str = "USD";

/// Money value object
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money { amount: Decimal, currency: String }

impl Money {
    pub fn new(amount: Decimal, currency: &str) -> Self { Self { amount, currency: currency.to_uppercase() } }
    pub fn usd(amount: Decimal) -> Self { Self::new(amount, "USD") }
    pub fn zero(currency: &str) -> Self { Self::new(Decimal::ZERO, currency) }
    /// Builds a price from minor units (cents, kobo), the shape prices are stored in.
    pub fn from_minor(minor: i64, currency: &str) -> Self { Self::new(Decimal::new(minor, 2), currency) }
    pub fn amount(&self) -> Decimal { self.amount }
    pub fn currency(&self) -> &str { &self.currency }
    pub fn add(&self, other: &Money) -> Result<Money, MoneyError> {
        if self.currency != other.currency { return Err(MoneyError::CurrencyMismatch); }
        Ok(Money::new(self.amount + other.amount, &self.currency))
    }
    pub fn multiply(&self, qty: u32) -> Money { Money::new(self.amount * Decimal::from(qty), &self.currency) }
}

impl Default for Money { fn default() -> Self { Self::zero(DEFAULT_CURRENCY) } }

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{:.2} {}", self.amount, self.currency) }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoneyError {
    #[error("Currency mismatch")]
    CurrencyMismatch,
}

/// Ceiling on how many attribute layers a product may nest.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub struct MaxDepth(usize);

impl MaxDepth {
    pub const DEFAULT: MaxDepth = MaxDepth(3);

    pub fn new(value: usize) -> Result<Self, MaxDepthError> {
        if value == 0 { return Err(MaxDepthError(value)); }
        Ok(Self(value))
    }
    pub fn value(&self) -> usize { self.0 }

    /// A value sitting in a variant list at `depth` may branch only while
    /// `depth < max - 1`; the deepest list holds leaves only.
    pub fn allows_sub_variants(&self, depth: usize) -> bool { depth + 1 < self.0 }
}

impl Default for MaxDepth { fn default() -> Self { Self::DEFAULT } }

impl TryFrom<usize> for MaxDepth {
    type Error = MaxDepthError;
    fn try_from(value: usize) -> Result<Self, Self::Error> { Self::new(value) }
}

impl From<MaxDepth> for usize { fn from(d: MaxDepth) -> usize { d.0 } }

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("max depth must be at least 1, got {0}")]
pub struct MaxDepthError(pub usize);

/// One hop from a variant list into the sub-variants of one of its values.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PathStep { pub variant: usize, pub value: usize }

/// Addresses a variant list inside a tree. The empty path is the top-level list;
/// its length is the depth of the list it points at.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListPath(Vec<PathStep>);

impl ListPath {
    pub fn root() -> Self { Self(Vec::new()) }
    pub fn depth(&self) -> usize { self.0.len() }
    pub fn steps(&self) -> &[PathStep] { &self.0 }
    pub fn child(&self, variant: usize, value: usize) -> Self {
        let mut steps = self.0.clone();
        steps.push(PathStep { variant, value });
        Self(steps)
    }
    /// The value whose sub-variants this list is; `None` for the top level.
    pub fn parent_value(&self) -> Option<ValueAddress> {
        let (last, rest) = self.0.split_last()?;
        Some(ValueAddress::new(Self(rest.to_vec()), last.variant, last.value))
    }
    /// True when `self` equals `other` or lies underneath it.
    pub fn starts_with(&self, other: &ListPath) -> bool { self.0.starts_with(&other.0) }
}

impl From<Vec<PathStep>> for ListPath { fn from(steps: Vec<PathStep>) -> Self { Self(steps) } }

impl fmt::Display for ListPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/")?;
        for step in &self.0 { write!(f, "{}.{}/", step.variant, step.value)?; }
        Ok(())
    }
}

/// Addresses one `VariantValue`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueAddress { pub list: ListPath, pub variant: usize, pub value: usize }

impl ValueAddress {
    pub fn new(list: ListPath, variant: usize, value: usize) -> Self { Self { list, variant, value } }
    pub fn top(variant: usize, value: usize) -> Self { Self::new(ListPath::root(), variant, value) }
    pub fn depth(&self) -> usize { self.list.depth() }
    /// Path of the sub-variant list hanging off this value.
    pub fn children(&self) -> ListPath { self.list.child(self.variant, self.value) }
}

impl fmt::Display for ValueAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}{}.{}", self.list, self.variant, self.value) }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn test_money_add() {
        let a = Money::usd(Decimal::new(100, 0));
        let b = Money::usd(Decimal::new(50, 0));
        assert_eq!(a.add(&b).unwrap().amount(), Decimal::new(150, 0));
        assert_eq!(a.add(&Money::zero("NGN")), Err(MoneyError::CurrencyMismatch));
    }
    #[test]
    fn test_money_from_minor() {
        let price = Money::from_minor(1999, "usd");
        assert_eq!(price.amount(), Decimal::new(1999, 2));
        assert_eq!(price.multiply(3).amount(), Decimal::new(5997, 2));
        assert_eq!(price.to_string(), "19.99 USD");
    }
    #[test]
    fn test_max_depth_ceiling() {
        let d = MaxDepth::default();
        assert!(d.allows_sub_variants(0));
        assert!(d.allows_sub_variants(1));
        assert!(!d.allows_sub_variants(2));
        assert!(!MaxDepth::new(1).unwrap().allows_sub_variants(0));
        assert_eq!(MaxDepth::new(0), Err(MaxDepthError(0)));
    }
    #[test]
    fn test_paths() {
        let addr = ValueAddress::new(ListPath::root().child(0, 1), 2, 0);
        assert_eq!(addr.depth(), 1);
        assert_eq!(addr.children().depth(), 2);
        assert!(addr.children().starts_with(&addr.list));
        assert_eq!(addr.to_string(), "/0.1/2.0");
        assert_eq!(addr.children().parent_value(), Some(addr.clone()));
        assert_eq!(ListPath::root().parent_value(), None);
    }
}
