use std::{future::IntoFuture, process, sync::Arc};

use serde::Serialize;
use tokio::sync::Notify;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;
use vitrine::{
    application::{
        blocks::BlockRenderer,
        catalog::CatalogService,
        error::AppError,
        repos::CatalogRepo,
        richtext::RichTextRenderer,
        sitemap::SitemapService,
        storefront::{StorefrontConfig, StorefrontService},
    },
    cache::{
        CacheConfig, CacheState, ChangeEvent, InvalidationPlan, RevalidationHooks,
        should_invalidate,
    },
    config,
    infra::{
        cms::PayloadClient,
        error::InfraError,
        fixtures::FixtureCatalog,
        http::{self, HttpState, RevalidateState},
        telemetry,
    },
    util::price::format_price_str,
};

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Plan(args) => run_plan(args).await,
        config::Command::Price(args) => run_price(&settings, args),
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let repo = init_catalog_repo(&settings.cms).await?;
    let http_state = build_http_state(repo, &settings);
    serve_http(&settings.server, http_state).await
}

async fn init_catalog_repo(cms: &config::CmsSettings) -> Result<Arc<dyn CatalogRepo>, AppError> {
    if let Some(path) = cms.fixtures_path.as_deref() {
        let catalog = FixtureCatalog::load(path).await?;
        return Ok(Arc::new(catalog));
    }

    let Some(base_url) = cms.base_url.as_deref() else {
        return Err(InfraError::configuration(
            "either cms.base_url or cms.fixtures_path must be set",
        )
        .into());
    };

    let client = PayloadClient::new(base_url, cms.api_key.clone(), cms.request_timeout)?;
    info!(
        target = "vitrine::cms",
        base_url,
        timeout_ms = cms.request_timeout.as_millis() as u64,
        "Using CMS catalog"
    );
    Ok(Arc::new(client))
}

fn build_http_state(repo: Arc<dyn CatalogRepo>, settings: &config::Settings) -> HttpState {
    let catalog = CatalogService::new(repo, settings.storefront.listing_limit.get());
    let rich_text = Arc::new(RichTextRenderer::new());
    let blocks = BlockRenderer::new(catalog.clone(), rich_text);
    let storefront = StorefrontService::new(
        catalog.clone(),
        blocks,
        StorefrontConfig::from(&settings.storefront),
    );
    let sitemap = SitemapService::new(catalog, &settings.storefront.public_site_url);

    let cache = CacheState::new(CacheConfig::from(&settings.cache));
    let hooks = Arc::new(RevalidationHooks::new(
        cache.config.clone(),
        Arc::new(cache.clone()),
    ));

    let revalidate = match settings.revalidate.secret.as_deref() {
        Some(secret) => Some(RevalidateState::new(hooks, secret)),
        None => {
            warn!(
                target = "vitrine::revalidate",
                "revalidate.secret is not set; the change webhook is disabled"
            );
            None
        }
    };

    HttpState {
        storefront: Arc::new(storefront),
        sitemap: Arc::new(sitemap),
        cache: cache.config.is_enabled().then_some(cache),
        revalidate,
    }
}

async fn serve_http(server: &config::ServerSettings, state: HttpState) -> Result<(), AppError> {
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(target = "vitrine::http", addr = %server.addr, "Listening");

    let stop = Arc::new(Notify::new());
    let stopped = stop.clone();
    let mut handle = tokio::spawn(
        axum::serve(listener, router.into_make_service())
            .with_graceful_shutdown(async move { stopped.notified().await })
            .into_future(),
    );

    tokio::select! {
        joined = &mut handle => return flatten_server_result(joined),
        () = shutdown_signal() => {}
    }

    info!(
        target = "vitrine::http",
        grace_secs = server.graceful_shutdown.as_secs(),
        "Shutting down"
    );
    stop.notify_one();

    match tokio::time::timeout(server.graceful_shutdown, &mut handle).await {
        Ok(joined) => flatten_server_result(joined),
        Err(_) => {
            warn!(
                target = "vitrine::http",
                "Graceful shutdown timed out; dropping open connections"
            );
            handle.abort();
            Ok(())
        }
    }
}

fn flatten_server_result(
    joined: Result<std::io::Result<()>, tokio::task::JoinError>,
) -> Result<(), AppError> {
    match joined {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(AppError::unexpected(format!("server error: {err}"))),
        Err(err) => Err(AppError::unexpected(format!("server task failed: {err}"))),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}

#[derive(Serialize)]
struct PlanReport {
    kind: &'static str,
    invalidate: bool,
    plan: InvalidationPlan,
}

async fn run_plan(args: config::PlanArgs) -> Result<(), AppError> {
    let raw = tokio::fs::read(&args.file)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    let event: ChangeEvent = serde_json::from_slice(&raw)
        .map_err(|err| AppError::validation(format!("invalid change event: {err}")))?;

    let invalidate = should_invalidate(&event);
    let plan = if invalidate {
        InvalidationPlan::resolve(&event)
    } else {
        InvalidationPlan::default()
    };

    let report = PlanReport {
        kind: event.kind.as_str(),
        invalidate,
        plan,
    };
    let rendered = serde_json::to_string_pretty(&report)
        .map_err(|err| AppError::unexpected(format!("failed to encode plan: {err}")))?;
    println!("{rendered}");
    Ok(())
}

fn run_price(settings: &config::Settings, args: config::PriceArgs) -> Result<(), AppError> {
    let formatted = format_price_str(&args.amount, settings.storefront.currency.code())
        .map_err(|err| AppError::validation(err.to_string()))?;
    println!("{formatted}");
    Ok(())
}
