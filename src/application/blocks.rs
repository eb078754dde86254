//! Turns CMS pages and products into presentation views.

use std::sync::Arc;

use crate::application::catalog::{CatalogError, CatalogService};
use crate::application::richtext::RichTextRenderer;
use crate::domain::links::{Link, LinkItem};
use crate::domain::pages::{Block, ContentBlock, FeaturedProductsBlock, Hero, Page, RichText};
use crate::domain::products::{CategoryRef, MediaRef, Product};
use crate::presentation::views::{
    BlockView, CategoryBadge, ColumnView, ContentView, FeaturedProductsView, HeroView, ImageView,
    LinkView, PageContentView, ProductCardView,
};
use crate::util::price::format_card_price;

const UNTITLED_CATEGORY: &str = "Untitled category";

#[derive(Clone)]
pub struct BlockRenderer {
    catalog: CatalogService,
    rich_text: Arc<RichTextRenderer>,
}

impl BlockRenderer {
    pub fn new(catalog: CatalogService, rich_text: Arc<RichTextRenderer>) -> Self {
        Self { catalog, rich_text }
    }

    /// Hero first, then each supported block in layout order.
    pub async fn page_content(&self, page: &Page) -> Result<PageContentView, CatalogError> {
        let hero = page
            .hero
            .as_ref()
            .filter(|hero| hero.is_enabled())
            .map(|hero| self.hero(hero));

        let mut blocks = Vec::with_capacity(page.layout.len());
        for (index, block) in page.layout.iter().enumerate() {
            match block {
                Block::FeaturedProducts(featured) => blocks.push(BlockView::FeaturedProducts(
                    self.featured_products(featured, index).await?,
                )),
                Block::Content(content) => blocks.push(BlockView::Content(self.content(content))),
                Block::Unsupported => {}
            }
        }

        Ok(PageContentView {
            title: page_title(page),
            hero,
            blocks,
        })
    }

    pub async fn featured_products(
        &self,
        block: &FeaturedProductsBlock,
        index: usize,
    ) -> Result<FeaturedProductsView, CatalogError> {
        let products = self
            .catalog
            .featured_products(&block.selected_products)
            .await?;

        Ok(FeaturedProductsView {
            anchor: match &block.id {
                Some(id) => format!("block-{id}"),
                None => format!("block-{index}"),
            },
            intro_html: self.render_rich_text(block.intro_content.as_ref()),
            products: products.iter().map(product_card).collect(),
            links: link_views(&block.links),
        })
    }

    pub fn content(&self, block: &ContentBlock) -> ContentView {
        ContentView {
            columns: block
                .columns
                .iter()
                .map(|column| ColumnView {
                    span: column.size.span(),
                    is_full: column.size.span() == 12,
                    html: self.render_rich_text(column.rich_text.as_ref()),
                    link: column
                        .link
                        .as_ref()
                        .filter(|_| column.enable_link)
                        .and_then(link_view),
                })
                .collect(),
        }
    }

    fn hero(&self, hero: &Hero) -> HeroView {
        HeroView {
            html: self.render_rich_text(hero.rich_text.as_ref()),
            image: hero.media.as_ref().and_then(image_view),
            links: link_views(&hero.links),
        }
    }

    fn render_rich_text(&self, rich_text: Option<&RichText>) -> Option<String> {
        rich_text
            .map(|rich_text| self.rich_text.render(rich_text))
            .filter(|html| !html.is_empty())
    }
}

fn page_title(page: &Page) -> String {
    page.title
        .as_deref()
        .or(page.slug.as_deref())
        .filter(|title| !title.is_empty())
        .unwrap_or("Untitled")
        .to_string()
}

/// Card shown in product grids.
pub fn product_card(product: &Product) -> ProductCardView {
    ProductCardView {
        title: product.name.clone().filter(|name| !name.is_empty()),
        href: product_href(product),
        image: product.card_image().and_then(image_view),
        categories: category_badges(&product.categories),
        description: product
            .description
            .clone()
            .filter(|description| !description.is_empty()),
        price: format_card_price(product.price),
        links: link_views(&product.links),
    }
}

/// Detail URL, with an id-based fallback for products without a slug.
pub fn product_href(product: &Product) -> String {
    match product.slug() {
        Some(slug) => format!("/products/{slug}"),
        None => format!("/products/product-{}", product.id),
    }
}

pub fn category_badges(categories: &[CategoryRef]) -> Vec<CategoryBadge> {
    categories
        .iter()
        .filter_map(|category| match category {
            CategoryRef::Resolved(category) => Some(CategoryBadge {
                label: category
                    .title
                    .clone()
                    .filter(|title| !title.is_empty())
                    .unwrap_or_else(|| UNTITLED_CATEGORY.to_string()),
                href: category
                    .slug
                    .as_deref()
                    .filter(|slug| !slug.is_empty())
                    .map(|slug| format!("/categories/{slug}")),
            }),
            CategoryRef::Unresolved(_) => None,
        })
        .collect()
}

pub fn image_view(media: &MediaRef) -> Option<ImageView> {
    let media = media.resolved()?;
    let src = media.url.clone().filter(|url| !url.is_empty())?;
    Some(ImageView {
        src,
        alt: media.alt.clone().unwrap_or_default(),
        width: media.width,
        height: media.height,
    })
}

/// Links without a resolvable target are dropped.
pub fn link_view(link: &Link) -> Option<LinkView> {
    let href = link.href()?;
    Some(LinkView {
        label: link
            .label
            .clone()
            .filter(|label| !label.is_empty())
            .unwrap_or_else(|| href.clone()),
        href,
        new_tab: link.new_tab,
        appearance: link.appearance.as_str(),
    })
}

pub fn link_views(items: &[LinkItem]) -> Vec<LinkView> {
    items.iter().filter_map(|item| link_view(&item.link)).collect()
}
