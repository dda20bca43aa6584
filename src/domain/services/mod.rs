//! Algorithms over variant trees
pub mod aggregator;
pub mod editor;
pub mod export;
pub mod validation;
