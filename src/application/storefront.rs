//! Public storefront views.
//!
//! Each method loads what one route needs from the catalog and wraps the
//! resulting view in the site chrome. Handlers only pick the template.

use tracing::debug;

use crate::application::blocks::{BlockRenderer, category_badges, image_view, link_views, product_card};
use crate::application::catalog::{CatalogError, CatalogService};
use crate::application::sitemap::{canonical_url, normalize_public_site_url};
use crate::cache::{HOME_PATH, PRODUCTS_PATH, category_path, product_path};
use crate::domain::products::Product;
use crate::presentation::views::{
    BrandView, LayoutChrome, LayoutContext, LinkView, PageContentView, PageMetaView,
    ProductDetailView, ProductListingView,
};
use crate::util::price::{Currency, format_amount};

/// Slug of the CMS page rendered at `/`.
pub const HOME_SLUG: &str = "home";

#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    pub brand_title: String,
    pub description: String,
    pub public_site_url: String,
    pub currency: Currency,
}

impl From<&crate::config::StorefrontSettings> for StorefrontConfig {
    fn from(settings: &crate::config::StorefrontSettings) -> Self {
        Self {
            brand_title: settings.brand_title.clone(),
            description: settings.description.clone(),
            public_site_url: settings.public_site_url.clone(),
            currency: settings.currency.clone(),
        }
    }
}

#[derive(Clone)]
pub struct StorefrontService {
    catalog: CatalogService,
    blocks: BlockRenderer,
    config: StorefrontConfig,
    base: String,
}

impl StorefrontService {
    pub fn new(catalog: CatalogService, blocks: BlockRenderer, config: StorefrontConfig) -> Self {
        let base = normalize_public_site_url(&config.public_site_url);
        Self {
            catalog,
            blocks,
            config,
            base,
        }
    }

    /// Site chrome without page-specific metadata.
    pub fn chrome(&self) -> LayoutChrome {
        LayoutChrome {
            brand: BrandView {
                title: self.config.brand_title.clone(),
                href: HOME_PATH.to_string(),
            },
            navigation: vec![nav_link(HOME_PATH, "Home"), nav_link(PRODUCTS_PATH, "Products")],
            meta: PageMetaView {
                title: self.config.brand_title.clone(),
                description: self.config.description.clone(),
                canonical: canonical_url(&self.base, HOME_PATH),
            },
        }
    }

    /// The home page. A storefront without a `home` page in the CMS still
    /// renders, with an empty layout.
    pub async fn home(&self) -> Result<LayoutContext<PageContentView>, CatalogError> {
        match self.page_at(HOME_SLUG, HOME_PATH).await {
            Err(CatalogError::PageNotFound(_)) => {
                debug!("No home page in the catalog, rendering an empty layout");
                let content = PageContentView {
                    title: self.config.brand_title.clone(),
                    hero: None,
                    blocks: Vec::new(),
                };
                Ok(LayoutContext::new(self.chrome(), content))
            }
            other => other,
        }
    }

    pub async fn page(&self, slug: &str) -> Result<LayoutContext<PageContentView>, CatalogError> {
        self.page_at(slug, &format!("/{slug}")).await
    }

    async fn page_at(
        &self,
        slug: &str,
        path: &str,
    ) -> Result<LayoutContext<PageContentView>, CatalogError> {
        let page = self.catalog.page_by_slug(slug).await?;
        let content = self.blocks.page_content(&page).await?;
        let chrome = self.page_chrome(&content.title, path);
        Ok(LayoutContext::new(chrome, content))
    }

    pub async fn products(&self) -> Result<LayoutContext<ProductListingView>, CatalogError> {
        let products = self.catalog.list_products().await?;
        let content = ProductListingView {
            heading: "Products".to_string(),
            intro: None,
            products: products.iter().map(product_card).collect(),
        };
        Ok(LayoutContext::new(
            self.page_chrome(&content.heading, PRODUCTS_PATH),
            content,
        ))
    }

    pub async fn category(
        &self,
        slug: &str,
    ) -> Result<LayoutContext<ProductListingView>, CatalogError> {
        let (category, products) = self.catalog.category_with_products(slug).await?;
        let heading = category
            .title
            .filter(|title| !title.is_empty())
            .unwrap_or_else(|| slug.to_string());
        let content = ProductListingView {
            intro: Some(format!("{} products", products.len())),
            products: products.iter().map(product_card).collect(),
            heading,
        };
        Ok(LayoutContext::new(
            self.page_chrome(&content.heading, &category_path(slug)),
            content,
        ))
    }

    pub async fn product(
        &self,
        slug: &str,
    ) -> Result<LayoutContext<ProductDetailView>, CatalogError> {
        let product = self.catalog.product_by_slug(slug).await?;
        let content = self.product_detail(&product);
        Ok(LayoutContext::new(
            self.page_chrome(&content.name, &product_path(slug)),
            content,
        ))
    }

    fn product_detail(&self, product: &Product) -> ProductDetailView {
        ProductDetailView {
            name: product.display_label(),
            description: product
                .description
                .clone()
                .filter(|description| !description.is_empty()),
            price: product
                .price
                .map(|amount| format_amount(amount, &self.config.currency)),
            image: product.card_image().and_then(image_view),
            categories: category_badges(&product.categories),
            links: link_views(&product.links),
        }
    }

    fn page_chrome(&self, title: &str, path: &str) -> LayoutChrome {
        self.chrome()
            .with_page(title, canonical_url(&self.base, path))
    }
}

fn nav_link(href: &str, label: &str) -> LinkView {
    LinkView {
        href: href.to_string(),
        label: label.to_string(),
        new_tab: false,
        appearance: "default",
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::application::richtext::RichTextRenderer;
    use crate::infra::fixtures::FixtureCatalog;

    fn service() -> StorefrontService {
        let fixtures = FixtureCatalog::from_value(json!({
            "products": [
                {
                    "id": 1, "slug": "vase", "name": "Blue Vase", "_status": "published",
                    "price": 1200, "categories": [{ "id": 10, "slug": "ceramics", "title": "Ceramics" }]
                },
                { "id": 2, "slug": "lamp", "name": "Lamp", "_status": "published", "categories": [11] }
            ],
            "categories": [{ "id": 10, "slug": "ceramics", "title": "Ceramics" }],
            "pages": [{ "id": 1, "slug": "about", "title": "About", "_status": "published" }]
        }))
        .expect("fixtures");
        let catalog = CatalogService::new(Arc::new(fixtures), 24);
        let blocks = BlockRenderer::new(catalog.clone(), Arc::new(RichTextRenderer::new()));
        StorefrontService::new(
            catalog,
            blocks,
            StorefrontConfig {
                brand_title: "Vitrine".to_string(),
                description: "A storefront".to_string(),
                public_site_url: "https://shop.example.com".to_string(),
                currency: Currency::parse("EUR").expect("currency"),
            },
        )
    }

    #[test]
    fn config_keeps_the_validated_settings_currency() {
        let settings = crate::config::StorefrontSettings {
            brand_title: "Vitrine".to_string(),
            description: String::new(),
            public_site_url: "https://shop.example.com".to_string(),
            currency: Currency::parse("mxn").expect("currency"),
            listing_limit: std::num::NonZeroU32::MIN,
        };
        let config = StorefrontConfig::from(&settings);
        assert_eq!(config.currency.code(), "MXN");
        assert_eq!(format_amount(5.0, &config.currency), "MX$5.00");
    }

    #[tokio::test]
    async fn product_detail_uses_configured_currency() {
        let view = service().product("vase").await.expect("product");
        assert_eq!(view.content.name, "Blue Vase");
        assert_eq!(view.content.price.as_deref(), Some("€1,200.00"));
        assert_eq!(view.meta.title, "Blue Vase | Vitrine");
        assert_eq!(view.meta.canonical, "https://shop.example.com/products/vase");
    }

    #[tokio::test]
    async fn category_lists_its_products() {
        let view = service().category("ceramics").await.expect("category");
        assert_eq!(view.content.heading, "Ceramics");
        assert_eq!(view.content.products.len(), 1);
        assert_eq!(view.content.products[0].href, "/products/vase");
    }

    #[tokio::test]
    async fn missing_home_page_renders_empty_layout() {
        let view = service().home().await.expect("home");
        assert_eq!(view.content.title, "Vitrine");
        assert!(view.content.blocks.is_empty());
    }

    #[tokio::test]
    async fn unknown_slugs_are_not_found() {
        let service = service();
        assert!(matches!(
            service.page("missing").await,
            Err(CatalogError::PageNotFound(_))
        ));
        assert!(matches!(
            service.product("missing").await,
            Err(CatalogError::ProductNotFound(_))
        ));
    }

    #[tokio::test]
    async fn page_canonical_follows_slug() {
        let view = service().page("about").await.expect("page");
        assert_eq!(view.meta.canonical, "https://shop.example.com/about");
        assert_eq!(view.navigation.len(), 2);
    }
}
