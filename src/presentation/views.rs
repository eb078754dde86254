use crate::application::error::{ErrorReport, HttpError};
use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        let TemplateRenderError {
            source,
            public_message,
            error,
        } = err;

        HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            public_message,
            &error,
        )
    }
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_template",
            "Template rendering failed",
            err,
        )
        .into()
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

pub fn render_not_found_response(chrome: LayoutChrome) -> Response {
    let view = LayoutContext::new(chrome, ErrorPageView::not_found());
    let mut response = render_template_response(ErrorTemplate { view }, StatusCode::NOT_FOUND);
    ErrorReport::from_message(
        "presentation::views::render_not_found_response",
        StatusCode::NOT_FOUND,
        "Resource not found",
    )
    .attach(&mut response);
    response
}

/// A resolved CMS link.
#[derive(Clone, Debug, PartialEq)]
pub struct LinkView {
    pub href: String,
    pub label: String,
    pub new_tab: bool,
    pub appearance: &'static str,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ImageView {
    pub src: String,
    pub alt: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CategoryBadge {
    pub label: String,
    pub href: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ProductCardView {
    pub title: Option<String>,
    pub href: String,
    pub image: Option<ImageView>,
    pub categories: Vec<CategoryBadge>,
    pub description: Option<String>,
    pub price: String,
    pub links: Vec<LinkView>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct HeroView {
    pub html: Option<String>,
    pub image: Option<ImageView>,
    pub links: Vec<LinkView>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FeaturedProductsView {
    pub anchor: String,
    pub intro_html: Option<String>,
    pub products: Vec<ProductCardView>,
    pub links: Vec<LinkView>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ColumnView {
    pub span: u8,
    pub is_full: bool,
    pub html: Option<String>,
    pub link: Option<LinkView>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ContentView {
    pub columns: Vec<ColumnView>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum BlockView {
    FeaturedProducts(FeaturedProductsView),
    Content(ContentView),
}

impl BlockView {
    pub fn featured(&self) -> Option<&FeaturedProductsView> {
        match self {
            BlockView::FeaturedProducts(view) => Some(view),
            BlockView::Content(_) => None,
        }
    }

    pub fn content(&self) -> Option<&ContentView> {
        match self {
            BlockView::Content(view) => Some(view),
            BlockView::FeaturedProducts(_) => None,
        }
    }
}

/// Hero followed by layout blocks.
#[derive(Clone, Debug, PartialEq)]
pub struct PageContentView {
    pub title: String,
    pub hero: Option<HeroView>,
    pub blocks: Vec<BlockView>,
}

#[derive(Clone)]
pub struct PageMetaView {
    pub title: String,
    pub description: String,
    pub canonical: String,
}

impl PageMetaView {
    pub fn with_canonical(self, canonical: String) -> Self {
        Self { canonical, ..self }
    }
}

#[derive(Clone)]
pub struct BrandView {
    pub title: String,
    pub href: String,
}

#[derive(Clone)]
pub struct LayoutChrome {
    pub brand: BrandView,
    pub navigation: Vec<LinkView>,
    pub meta: PageMetaView,
}

impl LayoutChrome {
    pub fn with_page(self, title: &str, canonical: String) -> Self {
        let meta = PageMetaView {
            title: format!("{title} | {}", self.brand.title),
            ..self.meta
        }
        .with_canonical(canonical);
        Self { meta, ..self }
    }
}

pub struct LayoutContext<T> {
    pub brand: BrandView,
    pub navigation: Vec<LinkView>,
    pub meta: PageMetaView,
    pub content: T,
}

impl<T> LayoutContext<T> {
    pub fn new(chrome: LayoutChrome, content: T) -> Self {
        Self {
            brand: chrome.brand,
            navigation: chrome.navigation,
            meta: chrome.meta,
            content,
        }
    }
}

#[derive(Template)]
#[template(path = "page.html")]
pub struct PageTemplate {
    pub view: LayoutContext<PageContentView>,
}

pub struct ProductListingView {
    pub heading: String,
    pub intro: Option<String>,
    pub products: Vec<ProductCardView>,
}

#[derive(Template)]
#[template(path = "products.html")]
pub struct ProductListingTemplate {
    pub view: LayoutContext<ProductListingView>,
}

pub struct ProductDetailView {
    pub name: String,
    pub description: Option<String>,
    pub price: Option<String>,
    pub image: Option<ImageView>,
    pub categories: Vec<CategoryBadge>,
    pub links: Vec<LinkView>,
}

#[derive(Template)]
#[template(path = "product.html")]
pub struct ProductTemplate {
    pub view: LayoutContext<ProductDetailView>,
}

pub struct ErrorPageView {
    pub title: String,
    pub message: String,
    pub primary_action: Option<LinkView>,
}

impl ErrorPageView {
    pub fn not_found() -> Self {
        Self {
            title: "Page Not Found".to_string(),
            message: "The page you requested does not exist. Try the product catalog instead."
                .to_string(),
            primary_action: Some(LinkView {
                href: "/products".to_string(),
                label: "Browse products".to_string(),
                new_tab: false,
                appearance: "default",
            }),
        }
    }
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub view: LayoutContext<ErrorPageView>,
}
