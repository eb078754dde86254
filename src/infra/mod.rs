//! Infrastructure adapters and runtime bootstrap.

pub mod cms;
pub mod error;
pub mod fixtures;
pub mod http;
pub mod telemetry;
