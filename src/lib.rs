//! Vitrine: storefront rendering and response-cache revalidation for a
//! headless product catalog.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
pub mod presentation;
pub mod util;
