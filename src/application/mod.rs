//! Application services: catalog reads and the views built from them.

pub mod blocks;
pub mod catalog;
pub mod error;
pub mod repos;
pub mod richtext;
pub mod sitemap;
pub mod storefront;
