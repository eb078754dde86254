//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{
    net::SocketAddr,
    num::{NonZeroU32, NonZeroU64},
    path::PathBuf,
    str::FromStr,
    time::Duration,
};

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

use crate::util::price::Currency;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "vitrine";
const ENV_PREFIX: &str = "VITRINE";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_CMS_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_RESPONSE_LIMIT: u32 = 200;
const DEFAULT_MAX_BODY_BYTES: u64 = 1024 * 1024;
const DEFAULT_BRAND_TITLE: &str = "Vitrine";
const DEFAULT_DESCRIPTION: &str = "Products from our catalog.";
const DEFAULT_PUBLIC_SITE_URL: &str = "http://localhost:3000";
const DEFAULT_CURRENCY: &str = "USD";
const DEFAULT_LISTING_LIMIT: u32 = 24;

/// Command-line arguments for the Vitrine binary.
#[derive(Debug, Parser)]
#[command(name = "vitrine", version, about = "Vitrine storefront server")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "VITRINE_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the storefront HTTP service.
    Serve(Box<ServeArgs>),
    /// Print the invalidation plan for a product change event.
    Plan(PlanArgs),
    /// Format an amount the way product pages do.
    Price(PriceArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the CMS base URL.
    #[arg(long = "cms-base-url", value_name = "URL")]
    pub cms_base_url: Option<String>,

    /// Serve the catalog from a JSON fixture file instead of the CMS.
    #[arg(long = "cms-fixtures", value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub cms_fixtures_path: Option<PathBuf>,

    /// Toggle the response cache.
    #[arg(
        long = "cache-enabled",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub cache_enabled: Option<bool>,

    /// Override the number of cached responses.
    #[arg(long = "cache-response-limit", value_name = "COUNT")]
    pub cache_response_limit: Option<u32>,

    /// Override the public site URL used for canonical links and the sitemap.
    #[arg(long = "public-site-url", value_name = "URL")]
    pub public_site_url: Option<String>,

    /// Override the currency used on product pages.
    #[arg(long = "currency", value_name = "CODE")]
    pub currency: Option<String>,
}

#[derive(Debug, Args, Clone)]
pub struct PlanArgs {
    /// JSON change event, in the webhook's format.
    #[arg(value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub file: PathBuf,
}

#[derive(Debug, Args, Clone)]
pub struct PriceArgs {
    /// Amount to format; parsed like the CMS front-end parses prices.
    #[arg(value_name = "AMOUNT", allow_hyphen_values = true)]
    pub amount: String,

    /// Currency code; defaults to `storefront.currency`.
    #[arg(long = "currency", value_name = "CODE")]
    pub currency: Option<String>,
}

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub cms: CmsSettings,
    pub cache: CacheSettings,
    pub revalidate: RevalidateSettings,
    pub storefront: StorefrontSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub graceful_shutdown: Duration,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct CmsSettings {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub request_timeout: Duration,
    pub fixtures_path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub enable_response_cache: bool,
    pub response_limit: NonZeroU32,
    pub max_body_bytes: NonZeroU64,
}

#[derive(Debug, Clone)]
pub struct RevalidateSettings {
    /// Shared secret for the change webhook; the route is not mounted without one.
    pub secret: Option<String>,
}

#[derive(Debug, Clone)]
pub struct StorefrontSettings {
    pub brand_title: String,
    pub description: String,
    pub public_site_url: String,
    pub currency: Currency,
    pub listing_limit: NonZeroU32,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::Price(args)) => raw.apply_currency_override(args.currency.as_ref()),
        Some(Command::Plan(_)) => {}
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    cms: RawCmsSettings,
    cache: RawCacheSettings,
    revalidate: RawRevalidateSettings,
    storefront: RawStorefrontSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(seconds) = overrides.server_graceful_shutdown_seconds {
            self.server.graceful_shutdown_seconds = Some(seconds);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(url) = overrides.cms_base_url.as_ref() {
            self.cms.base_url = Some(url.clone());
        }
        if let Some(path) = overrides.cms_fixtures_path.as_ref() {
            self.cms.fixtures_path = Some(path.clone());
        }
        if let Some(enabled) = overrides.cache_enabled {
            self.cache.enable_response_cache = Some(enabled);
        }
        if let Some(limit) = overrides.cache_response_limit {
            self.cache.response_limit = Some(limit);
        }
        if let Some(url) = overrides.public_site_url.as_ref() {
            self.storefront.public_site_url = Some(url.clone());
        }
        self.apply_currency_override(overrides.currency.as_ref());
    }

    fn apply_currency_override(&mut self, currency: Option<&String>) {
        if let Some(currency) = currency {
            self.storefront.currency = Some(currency.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            cms,
            cache,
            revalidate,
            storefront,
        } = raw;

        Ok(Self {
            server: build_server_settings(server)?,
            logging: build_logging_settings(logging)?,
            cms: build_cms_settings(cms)?,
            cache: build_cache_settings(cache)?,
            revalidate: build_revalidate_settings(revalidate),
            storefront: build_storefront_settings(storefront)?,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

    let graceful_secs = server
        .graceful_shutdown_seconds
        .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_SECS);
    if graceful_secs == 0 {
        return Err(LoadError::invalid(
            "server.graceful_shutdown_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ServerSettings {
        addr,
        graceful_shutdown: Duration::from_secs(graceful_secs),
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_cms_settings(cms: RawCmsSettings) -> Result<CmsSettings, LoadError> {
    let base_url = non_empty(cms.base_url);
    if let Some(url) = base_url.as_deref() {
        Url::parse(url)
            .map_err(|err| LoadError::invalid("cms.base_url", format!("invalid url: {err}")))?;
    }

    let timeout_ms = cms.request_timeout_ms.unwrap_or(DEFAULT_CMS_TIMEOUT_MS);
    if timeout_ms == 0 {
        return Err(LoadError::invalid(
            "cms.request_timeout_ms",
            "must be greater than zero",
        ));
    }

    Ok(CmsSettings {
        base_url,
        api_key: non_empty(cms.api_key),
        request_timeout: Duration::from_millis(timeout_ms),
        fixtures_path: cms
            .fixtures_path
            .filter(|path| !path.as_os_str().is_empty()),
    })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let response_limit = non_zero_u32(
        cache
            .response_limit
            .unwrap_or(DEFAULT_RESPONSE_LIMIT)
            .into(),
        "cache.response_limit",
    )?;

    let max_body_bytes_value = cache.max_body_bytes.unwrap_or(DEFAULT_MAX_BODY_BYTES);
    let max_body_bytes = NonZeroU64::new(max_body_bytes_value)
        .ok_or_else(|| LoadError::invalid("cache.max_body_bytes", "must be greater than zero"))?;
    usize::try_from(max_body_bytes_value).map_err(|_| {
        LoadError::invalid(
            "cache.max_body_bytes",
            "value exceeds supported range for usize",
        )
    })?;

    Ok(CacheSettings {
        enable_response_cache: cache.enable_response_cache.unwrap_or(true),
        response_limit,
        max_body_bytes,
    })
}

fn build_revalidate_settings(revalidate: RawRevalidateSettings) -> RevalidateSettings {
    RevalidateSettings {
        secret: non_empty(revalidate.secret),
    }
}

fn build_storefront_settings(
    storefront: RawStorefrontSettings,
) -> Result<StorefrontSettings, LoadError> {
    let public_site_url = non_empty(storefront.public_site_url)
        .unwrap_or_else(|| DEFAULT_PUBLIC_SITE_URL.to_string());
    Url::parse(&public_site_url).map_err(|err| {
        LoadError::invalid("storefront.public_site_url", format!("invalid url: {err}"))
    })?;

    let currency = storefront
        .currency
        .unwrap_or_else(|| DEFAULT_CURRENCY.to_string());
    let currency = Currency::parse(&currency)
        .map_err(|err| LoadError::invalid("storefront.currency", err.to_string()))?;

    Ok(StorefrontSettings {
        brand_title: non_empty(storefront.brand_title)
            .unwrap_or_else(|| DEFAULT_BRAND_TITLE.to_string()),
        description: storefront
            .description
            .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string()),
        public_site_url,
        currency,
        listing_limit: non_zero_u32(
            storefront
                .listing_limit
                .unwrap_or(DEFAULT_LISTING_LIMIT)
                .into(),
            "storefront.listing_limit",
        )?,
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    graceful_shutdown_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCmsSettings {
    base_url: Option<String>,
    api_key: Option<String>,
    request_timeout_ms: Option<u64>,
    fixtures_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    enable_response_cache: Option<bool>,
    response_limit: Option<u32>,
    max_body_bytes: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawRevalidateSettings {
    secret: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawStorefrontSettings {
    brand_title: Option<String>,
    description: Option<String>,
    public_site_url: Option<String>,
    currency: Option<String>,
    listing_limit: Option<u32>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn non_zero_u32(value: u64, key: &'static str) -> Result<NonZeroU32, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    let value_u32: u32 = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for u32"))?;
    NonZeroU32::new(value_u32).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn cli_overrides_take_highest_precedence() {
        let mut raw = RawSettings::default();
        raw.server.port = Some(4000);
        raw.logging.level = Some("info".to_string());

        let overrides = ServeOverrides {
            server_port: Some(4321),
            log_level: Some("debug".to_string()),
            ..Default::default()
        };

        raw.apply_serve_overrides(&overrides);
        let settings = Settings::from_raw(raw).expect("valid settings");

        assert_eq!(settings.server.addr.port(), 4321);
        assert_eq!(settings.logging.level, LevelFilter::DEBUG);
    }

    #[test]
    fn defaults_are_valid() {
        let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

        assert_eq!(settings.server.addr.port(), DEFAULT_PORT);
        assert!(settings.cache.enable_response_cache);
        assert_eq!(settings.cache.response_limit.get(), DEFAULT_RESPONSE_LIMIT);
        assert_eq!(settings.cache.max_body_bytes.get(), DEFAULT_MAX_BODY_BYTES);
        assert_eq!(settings.cms.request_timeout, Duration::from_secs(5));
        assert!(settings.cms.base_url.is_none());
        assert!(settings.revalidate.secret.is_none());
        assert_eq!(settings.storefront.currency, Currency::usd());
        assert_eq!(settings.storefront.listing_limit.get(), DEFAULT_LISTING_LIMIT);
    }

    #[test]
    fn blank_secret_is_treated_as_unset() {
        let mut raw = RawSettings::default();
        raw.revalidate.secret = Some("   ".to_string());
        let settings = Settings::from_raw(raw).expect("valid settings");
        assert!(settings.revalidate.secret.is_none());
    }

    #[test]
    fn currency_is_validated_and_normalized() {
        let mut raw = RawSettings::default();
        raw.apply_currency_override(Some(&"eur".to_string()));
        let settings = Settings::from_raw(raw).expect("valid settings");
        assert_eq!(settings.storefront.currency.code(), "EUR");

        let mut raw = RawSettings::default();
        raw.storefront.currency = Some("euro".to_string());
        assert!(matches!(
            Settings::from_raw(raw),
            Err(LoadError::Invalid {
                key: "storefront.currency",
                ..
            })
        ));
    }

    #[test]
    fn zero_limits_are_rejected() {
        let mut raw = RawSettings::default();
        raw.cache.response_limit = Some(0);
        assert!(Settings::from_raw(raw).is_err());

        let mut raw = RawSettings::default();
        raw.cache.max_body_bytes = Some(0);
        assert!(Settings::from_raw(raw).is_err());

        let mut raw = RawSettings::default();
        raw.cms.request_timeout_ms = Some(0);
        assert!(Settings::from_raw(raw).is_err());
    }

    #[test]
    fn invalid_cms_url_is_rejected() {
        let mut raw = RawSettings::default();
        raw.cms.base_url = Some("cms.example.com".to_string());
        assert!(matches!(
            Settings::from_raw(raw),
            Err(LoadError::Invalid {
                key: "cms.base_url",
                ..
            })
        ));
    }

    #[test]
    fn cli_json_logging_enforces_format() {
        let mut raw = RawSettings::default();
        let overrides = ServeOverrides {
            log_json: Some(true),
            cache_enabled: Some(false),
            ..Default::default()
        };

        raw.apply_serve_overrides(&overrides);
        let settings = Settings::from_raw(raw).expect("valid settings");

        assert!(matches!(settings.logging.format, LogFormat::Json));
        assert!(!settings.cache.enable_response_cache);
    }

    #[test]
    fn default_to_serve_command() {
        let args = CliArgs::parse_from(["vitrine"]);
        let command = args
            .command
            .unwrap_or(Command::Serve(Box::<ServeArgs>::default()));
        assert!(matches!(command, Command::Serve(_)));
    }

    #[test]
    fn parse_price_arguments() {
        let args = CliArgs::parse_from(["vitrine", "price", "-12.5", "--currency", "GBP"]);
        match args.command.expect("price command") {
            Command::Price(price) => {
                assert_eq!(price.amount, "-12.5");
                assert_eq!(price.currency.as_deref(), Some("GBP"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn config_file_layers_under_cli() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .expect("tempfile");
        writeln!(
            file,
            "[server]\nport = 8080\n\n[cache]\nresponse_limit = 50\n\n[revalidate]\nsecret = \"hook\""
        )
        .expect("write");

        let args = CliArgs::parse_from([
            "vitrine",
            "--config-file",
            file.path().to_str().expect("utf-8 path"),
            "serve",
            "--server-port",
            "9090",
        ]);
        let settings = load(&args).expect("settings");

        assert_eq!(settings.server.addr.port(), 9090);
        assert_eq!(settings.cache.response_limit.get(), 50);
        assert_eq!(settings.revalidate.secret.as_deref(), Some("hook"));
    }
}
