//! Sitemap service for sitemap.xml and robots.txt generation.

use crate::application::catalog::{CatalogError, CatalogService};
use crate::cache::{HOME_PATH, PRODUCTS_PATH, product_path};
use crate::domain::products::Product;

/// Service for generating sitemap.xml and robots.txt.
#[derive(Clone)]
pub struct SitemapService {
    catalog: CatalogService,
    base: String,
}

impl SitemapService {
    pub fn new(catalog: CatalogService, public_site_url: &str) -> Self {
        Self {
            catalog,
            base: normalize_public_site_url(public_site_url),
        }
    }

    /// Generate sitemap.xml content.
    ///
    /// Lists the home page, the product index and every published product
    /// with a slug.
    pub async fn sitemap_xml(&self) -> Result<String, CatalogError> {
        let products = self.catalog.sitemap_products().await?;

        let mut xml = String::from(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
        );
        xml.push_str(&sitemap_entry(&self.base, HOME_PATH, None));
        xml.push_str(&sitemap_entry(&self.base, PRODUCTS_PATH, None));

        for product in products.iter().filter(|product| product.status.is_published()) {
            let Some(slug) = product.slug() else {
                continue;
            };
            xml.push_str(&sitemap_entry(
                &self.base,
                &product_path(slug),
                last_modified(product),
            ));
        }

        xml.push_str("</urlset>\n");
        Ok(xml)
    }

    pub fn robots_txt(&self) -> String {
        let sitemap_url = format!("{}sitemap.xml", self.base);
        format!("User-agent: *\nAllow: /\nSitemap: {sitemap_url}\n")
    }
}

fn last_modified(product: &Product) -> Option<&str> {
    product
        .extra
        .get("updatedAt")
        .and_then(serde_json::Value::as_str)
        .filter(|value| !value.is_empty())
}

pub(crate) fn normalize_public_site_url(url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    format!("{trimmed}/")
}

fn sitemap_entry(base: &str, path: &str, lastmod: Option<&str>) -> String {
    let loc = escape_xml(&canonical_url(base, path));
    match lastmod {
        Some(lastmod) => format!(
            "  <url><loc>{loc}</loc><lastmod>{}</lastmod></url>\n",
            escape_xml(lastmod)
        ),
        None => format!("  <url><loc>{loc}</loc></url>\n"),
    }
}

pub(crate) fn canonical_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    if path == "/" {
        base.to_string()
    } else {
        format!("{base}{path}")
    }
}

fn escape_xml(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
