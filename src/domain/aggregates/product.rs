//! Product Aggregate

use chrono::{DateTime, Utc};
use uuid::Uuid;
use crate::domain::aggregates::variant::{self, Variant};
use crate::domain::events::{DomainEvent, ProductEvent};
use crate::domain::services::{aggregator, editor};
use crate::domain::value_objects::{MaxDepth, Money, ValueAddress};

/// A product and its variant tree. `on_hand` is the untracked-variant stock
/// figure read from the inventory table.
#[derive(Clone, Debug)]
pub struct Product {
    id: Uuid,
    name: String,
    variants: Vec<Variant>,
    unit_price: Option<Money>,
    on_hand: u64,
    max_depth: MaxDepth,
    updated_at: DateTime<Utc>,
    events: Vec<DomainEvent>,
}

impl Product {
    pub fn new(id: Uuid, name: impl Into<String>, max_depth: MaxDepth) -> Self {
        Self {
            id, name: name.into(), variants: vec![], unit_price: None, on_hand: 0,
            max_depth, updated_at: Utc::now(), events: vec![],
        }
    }

    pub fn create(name: impl Into<String>) -> Self { Self::new(Uuid::now_v7(), name, MaxDepth::default()) }

    pub fn with_variants(mut self, variants: Vec<Variant>) -> Self { self.variants = variants; self }
    pub fn with_unit_price(mut self, price: Money) -> Self { self.unit_price = Some(price); self }
    pub fn with_on_hand(mut self, on_hand: u64) -> Self { self.on_hand = on_hand; self }

    pub fn id(&self) -> Uuid { self.id }
    pub fn name(&self) -> &str { &self.name }
    pub fn variants(&self) -> &[Variant] { &self.variants }
    pub fn unit_price(&self) -> Option<&Money> { self.unit_price.as_ref() }
    pub fn on_hand(&self) -> u64 { self.on_hand }
    pub fn max_depth(&self) -> MaxDepth { self.max_depth }
    pub fn updated_at(&self) -> DateTime<Utc> { self.updated_at }

    pub fn total_quantity(&self) -> u64 { aggregator::total_quantity(&self.variants) }
    pub fn effective_stock(&self) -> u64 { aggregator::effective_stock(Some(&self.variants), self.on_hand) }
    pub fn is_in_stock(&self) -> bool { self.effective_stock() > 0 }

    /// Swaps the whole tree in one step.
    pub fn replace_variants(&mut self, variants: Vec<Variant>) {
        self.variants = variants;
        self.touch();
        let leaves = aggregator::breakdown(&self.variants).len();
        self.raise_event(DomainEvent::Product(ProductEvent::VariantsReplaced {
            product_id: self.id, total_quantity: self.total_quantity(), leaves, at: self.updated_at,
        }));
    }

    pub fn apply_edit(&mut self, command: &editor::EditCommand) -> Result<(), editor::EditError> {
        self.variants = editor::apply(&self.variants, command, self.max_depth)?;
        self.touch();
        Ok(())
    }

    /// Takes stock off one leaf, e.g. at checkout.
    pub fn withdraw(&mut self, address: &ValueAddress, quantity: u32) -> Result<(), aggregator::StockError> {
        self.variants = aggregator::withdraw(&self.variants, address, quantity)?;
        self.touch();
        let Some(leaf) = variant::value_at(&self.variants, address) else { return Ok(()) };
        let (remaining, minimum) = (leaf.quantity, leaf.minimum_quantity);
        let path = self.path_of(address);
        self.raise_event(DomainEvent::Product(ProductEvent::StockWithdrawn {
            product_id: self.id, path: path.clone(), quantity, remaining, at: self.updated_at,
        }));
        if let Some(minimum_quantity) = minimum.filter(|min| remaining <= *min) {
            self.raise_event(DomainEvent::Product(ProductEvent::LowStock {
                product_id: self.id, path, quantity: remaining, minimum_quantity, at: self.updated_at,
            }));
        }
        Ok(())
    }

    fn path_of(&self, address: &ValueAddress) -> String {
        aggregator::breakdown(&self.variants)
            .into_iter()
            .find(|row| &row.address == address)
            .map(|row| row.path)
            .unwrap_or_else(|| address.to_string())
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
    fn touch(&mut self) { self.updated_at = Utc::now(); }
}
