//! Client configuration: credentials, endpoint, network route, proxy, timeouts.
//!
//! Sources, lowest to highest precedence when combined by the caller:
//! `Default`, YAML file ([`ClientConfig::from_yaml_file`]), environment
//! ([`ClientConfig::from_env`]), builder methods.

use crate::client::retry::RetryPolicy;
use crate::i18n::Locale;
use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_BASE_URL: &str = "https://o1key.com";
pub const GENERATIONS_PATH: &str = "/v1/images/generations";

/// Per-attempt timeout used unless overridden.
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(60);

/// Alternative upstream entry points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkRoute {
    /// Use `base_url` as configured.
    #[default]
    Direct,
    GlobalAccelerated,
    DomesticAccelerated,
}

impl NetworkRoute {
    pub fn base_url_override(&self) -> Option<&'static str> {
        match self {
            NetworkRoute::Direct => None,
            NetworkRoute::GlobalAccelerated => Some("https://api.aabao.top"),
            NetworkRoute::DomesticAccelerated => Some("https://hk-api.aabao.top"),
        }
    }
}

impl NetworkRoute {
    pub const ALL: [NetworkRoute; 3] = [
        NetworkRoute::Direct,
        NetworkRoute::GlobalAccelerated,
        NetworkRoute::DomesticAccelerated,
    ];

    /// Choice label shown by the API config node.
    pub fn label(&self, locale: Locale) -> &'static str {
        match (locale, self) {
            (Locale::English, NetworkRoute::Direct) => "Direct",
            (Locale::English, NetworkRoute::GlobalAccelerated) => "A - Global accelerated",
            (Locale::English, NetworkRoute::DomesticAccelerated) => "A - Domestic accelerated",
            (Locale::SimplifiedChinese, NetworkRoute::Direct) => "不加速",
            (Locale::SimplifiedChinese, NetworkRoute::GlobalAccelerated) => "A-全球加速线路",
            (Locale::SimplifiedChinese, NetworkRoute::DomesticAccelerated) => "A-国内加速线路",
        }
    }

    /// Resolve a node choice in any locale.
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL.into_iter().find(|route| {
            route.label(Locale::English).eq_ignore_ascii_case(label)
                || route.label(Locale::SimplifiedChinese) == label
        })
    }
}

impl FromStr for NetworkRoute {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "direct" | "none" | "不加速" => Ok(NetworkRoute::Direct),
            "global" | "global_accelerated" | "a-全球加速线路" => Ok(NetworkRoute::GlobalAccelerated),
            "domestic" | "domestic_accelerated" | "a-国内加速线路" => {
                Ok(NetworkRoute::DomesticAccelerated)
            }
            other => Err(format!("unknown network route: {other}")),
        }
    }
}

/// How the upstream should return the generated image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseFormat {
    #[default]
    Url,
    B64Json,
}

impl ResponseFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseFormat::Url => "url",
            ResponseFormat::B64Json => "b64_json",
        }
    }
}

#[derive(Clone)]
pub struct ClientConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub network: NetworkRoute,
    pub proxy: Option<String>,
    pub attempt_timeout: Duration,
    pub retry: RetryPolicy,
    pub response_format: ResponseFormat,
    pub locale: Locale,
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("network", &self.network)
            .field("proxy", &self.proxy)
            .field("attempt_timeout", &self.attempt_timeout)
            .field("retry", &self.retry)
            .field("response_format", &self.response_format)
            .field("locale", &self.locale)
            .finish()
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            network: NetworkRoute::Direct,
            proxy: None,
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
            retry: RetryPolicy::default(),
            response_format: ResponseFormat::Url,
            locale: Locale::English,
        }
    }
}

/// On-disk shape; every field optional so partial files work.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    api_key: Option<String>,
    base_url: Option<String>,
    network: Option<NetworkRoute>,
    proxy: Option<String>,
    timeout_secs: Option<u64>,
    max_retries: Option<u32>,
    retry_base_delay_ms: Option<u64>,
    response_format: Option<ResponseFormat>,
    locale: Option<Locale>,
}

/// Numeric overrides keep the current value when unparsable, with a warning.
fn env_number<T: FromStr>(name: &str, raw: Option<String>) -> Option<T> {
    let raw = raw?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(variable = name, value = raw.as_str(), "ignoring unparsable environment override");
            None
        }
    }
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_network(mut self, network: NetworkRoute) -> Self {
        self.network = network;
        self
    }

    /// Blank strings clear the proxy. `http://`, `https://`, `socks5://` and
    /// `socks5h://` URLs are accepted.
    pub fn with_proxy(mut self, proxy: impl Into<String>) -> Self {
        let proxy = proxy.into();
        let proxy = proxy.trim();
        self.proxy = (!proxy.is_empty()).then(|| proxy.to_string());
        self
    }

    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_response_format(mut self, format: ResponseFormat) -> Self {
        self.response_format = format;
        self
    }

    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }

    /// The API key, if one is set and not blank.
    pub fn credential(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }

    /// Base URL after applying the network route.
    pub fn effective_base_url(&self) -> &str {
        self.network
            .base_url_override()
            .unwrap_or(self.base_url.as_str())
    }

    pub fn generations_url(&self) -> String {
        format!(
            "{}{}",
            self.effective_base_url().trim_end_matches('/'),
            GENERATIONS_PATH
        )
    }

    /// Overlay environment variables on top of `self`.
    ///
    /// - `NANO_BANANA_API_KEY`
    /// - `NANO_BANANA_BASE_URL`
    /// - `NANO_BANANA_NETWORK` (`direct` / `global` / `domestic`)
    /// - `NANO_BANANA_PROXY_URL`
    /// - `NANO_BANANA_TIMEOUT_SECS`
    /// - `NANO_BANANA_MAX_RETRIES`
    /// - `NANO_BANANA_LOCALE` (`en` / `zh-CN`)
    pub fn merge_env(mut self) -> Result<Self> {
        if let Ok(key) = env::var("NANO_BANANA_API_KEY") {
            self.api_key = Some(key);
        }
        if let Ok(url) = env::var("NANO_BANANA_BASE_URL") {
            self.base_url = url;
        }
        if let Ok(route) = env::var("NANO_BANANA_NETWORK") {
            self.network = route
                .parse()
                .map_err(|e: String| env_error("NANO_BANANA_NETWORK", e))?;
        }
        if let Ok(proxy) = env::var("NANO_BANANA_PROXY_URL") {
            self = self.with_proxy(proxy);
        }
        let timeout = env::var("NANO_BANANA_TIMEOUT_SECS").ok();
        if let Some(secs) = env_number::<u64>("NANO_BANANA_TIMEOUT_SECS", timeout) {
            self.attempt_timeout = Duration::from_secs(secs);
        }
        let retries = env::var("NANO_BANANA_MAX_RETRIES").ok();
        if let Some(n) = env_number::<u32>("NANO_BANANA_MAX_RETRIES", retries) {
            self.retry.max_retries = n;
        }
        if let Ok(locale) = env::var("NANO_BANANA_LOCALE") {
            self.locale = locale
                .parse()
                .map_err(|e: String| env_error("NANO_BANANA_LOCALE", e))?;
        }
        Ok(self)
    }

    pub fn from_env() -> Result<Self> {
        Self::default().merge_env()
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let file: FileConfig = serde_yaml::from_str(content)?;
        let mut cfg = Self::default();
        if let Some(key) = file.api_key {
            cfg.api_key = Some(key);
        }
        if let Some(url) = file.base_url {
            cfg.base_url = url;
        }
        if let Some(network) = file.network {
            cfg.network = network;
        }
        if let Some(proxy) = file.proxy {
            cfg = cfg.with_proxy(proxy);
        }
        if let Some(secs) = file.timeout_secs {
            cfg.attempt_timeout = Duration::from_secs(secs);
        }
        if let Some(n) = file.max_retries {
            cfg.retry.max_retries = n;
        }
        if let Some(ms) = file.retry_base_delay_ms {
            cfg.retry.base_delay = Duration::from_millis(ms);
        }
        if let Some(format) = file.response_format {
            cfg.response_format = format;
        }
        if let Some(locale) = file.locale {
            cfg.locale = locale;
        }
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&content)
    }

    /// Structural checks. A missing API key is not an error here: it is
    /// reported per job so that a batch still yields one outcome per job.
    pub fn validate(&self) -> Result<()> {
        let base = self.effective_base_url();
        let parsed = url::Url::parse(base).map_err(|e| {
            Error::configuration_with_context(
                format!("invalid base URL: {e}"),
                ErrorContext::new()
                    .with_field_path("client.base_url")
                    .with_details(base.to_string())
                    .with_source("client_config"),
            )
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::configuration_with_context(
                "base URL must use http or https",
                ErrorContext::new()
                    .with_field_path("client.base_url")
                    .with_details(base.to_string())
                    .with_source("client_config"),
            ));
        }
        if self.attempt_timeout.is_zero() {
            return Err(Error::configuration_with_context(
                "attempt timeout must be positive",
                ErrorContext::new()
                    .with_field_path("client.attempt_timeout")
                    .with_source("client_config"),
            ));
        }
        if let Some(proxy) = &self.proxy {
            url::Url::parse(proxy).map_err(|e| {
                Error::configuration_with_context(
                    format!("invalid proxy URL: {e}"),
                    ErrorContext::new()
                        .with_field_path("client.proxy")
                        .with_details(proxy.clone())
                        .with_source("client_config"),
                )
            })?;
        }
        Ok(())
    }
}

fn env_error(var: &str, message: String) -> Error {
    Error::configuration_with_context(
        message,
        ErrorContext::new()
            .with_field_path(var)
            .with_source("environment"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = ClientConfig::default();
        assert_eq!(cfg.generations_url(), "https://o1key.com/v1/images/generations");
        assert_eq!(cfg.attempt_timeout, Duration::from_secs(60));
        assert_eq!(cfg.retry.max_retries, 3);
        assert!(cfg.credential().is_none());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_blank_key_is_not_a_credential() {
        let cfg = ClientConfig::new().with_api_key("   ");
        assert!(cfg.credential().is_none());
        let cfg = ClientConfig::new().with_api_key(" sk-123 ");
        assert_eq!(cfg.credential(), Some("sk-123"));
    }

    #[test]
    fn test_network_route_overrides_base_url() {
        let cfg = ClientConfig::new()
            .with_base_url("http://localhost:9999/")
            .with_network(NetworkRoute::GlobalAccelerated);
        assert_eq!(
            cfg.generations_url(),
            "https://api.aabao.top/v1/images/generations"
        );
        let direct = cfg.with_network(NetworkRoute::Direct);
        assert_eq!(
            direct.generations_url(),
            "http://localhost:9999/v1/images/generations"
        );
    }

    #[test]
    fn test_network_labels_round_trip() {
        for route in NetworkRoute::ALL {
            for locale in [Locale::English, Locale::SimplifiedChinese] {
                assert_eq!(NetworkRoute::from_label(route.label(locale)), Some(route));
            }
        }
        assert_eq!("A-全球加速线路".parse::<NetworkRoute>(), Ok(NetworkRoute::GlobalAccelerated));
        assert!(NetworkRoute::from_label("B-line").is_none());
    }

    #[test]
    fn test_unparsable_numeric_override_is_ignored() {
        assert_eq!(env_number::<u64>("NANO_BANANA_TIMEOUT_SECS", Some("6O".into())), None);
        assert_eq!(env_number::<u32>("NANO_BANANA_MAX_RETRIES", Some("three".into())), None);
        assert_eq!(env_number::<u64>("NANO_BANANA_TIMEOUT_SECS", Some(" 90 ".into())), Some(90));
        assert_eq!(env_number::<u32>("NANO_BANANA_MAX_RETRIES", None), None);
    }

    #[test]
    fn test_blank_proxy_clears() {
        let cfg = ClientConfig::new().with_proxy("http://127.0.0.1:7890");
        assert_eq!(cfg.proxy.as_deref(), Some("http://127.0.0.1:7890"));
        let cfg = cfg.with_proxy("  ");
        assert!(cfg.proxy.is_none());
    }

    #[test]
    fn test_yaml_overlay() {
        let cfg = ClientConfig::from_yaml_str(
            r#"
api_key: sk-yaml
network: domestic_accelerated
timeout_secs: 30
max_retries: 1
locale: zh-CN
"#,
        )
        .unwrap();
        assert_eq!(cfg.credential(), Some("sk-yaml"));
        assert_eq!(cfg.network, NetworkRoute::DomesticAccelerated);
        assert_eq!(cfg.attempt_timeout, Duration::from_secs(30));
        assert_eq!(cfg.retry.max_retries, 1);
        assert_eq!(cfg.locale, Locale::SimplifiedChinese);
    }

    #[test]
    fn test_yaml_rejects_unknown_fields_and_bad_urls() {
        assert!(ClientConfig::from_yaml_str("colour: blue").is_err());
        let err = ClientConfig::from_yaml_str("base_url: not a url").unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }

    #[test]
    fn test_debug_redacts_key() {
        let cfg = ClientConfig::new().with_api_key("sk-secret");
        let rendered = format!("{:?}", cfg);
        assert!(!rendered.contains("sk-secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
