//! Domain layer types and invariants.

pub mod links;
pub mod pages;
pub mod products;
pub mod types;
