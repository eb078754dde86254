//! Small formatting helpers shared across layers.

pub mod price;
