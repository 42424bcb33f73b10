use crate::config::{ClientConfig, NetworkRoute};
use crate::{Error, ErrorContext, Result};
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiConfigInput {
    pub api_key: String,
    /// e.g. `http://127.0.0.1:7890`; blank for none.
    pub proxy: String,
    /// Network choice label in either locale, or a route name.
    pub network: String,
}

/// Collects key, proxy and network route into a [`ClientConfig`] that the
/// other nodes accept.
pub struct ApiConfigNode {
    base: ClientConfig,
}

impl ApiConfigNode {
    pub const TYPE_NAME: &'static str = "NanoBananaAPIConfig";

    /// `base` supplies everything the node does not expose (timeouts, retries, locale).
    pub fn new(base: ClientConfig) -> Self {
        Self { base }
    }

    pub fn network_choices(&self) -> Vec<&'static str> {
        NetworkRoute::ALL
            .iter()
            .map(|route| route.label(self.base.locale))
            .collect()
    }

    pub fn build(&self, input: &ApiConfigInput) -> Result<ClientConfig> {
        let network = NetworkRoute::from_label(&input.network)
            .map(Ok)
            .unwrap_or_else(|| input.network.parse::<NetworkRoute>())
            .map_err(|e| {
                Error::validation_with_context(
                    e,
                    ErrorContext::new()
                        .with_field_path("network")
                        .with_details(input.network.clone())
                        .with_source(Self::TYPE_NAME),
                )
            })?;

        let config = self
            .base
            .clone()
            .with_api_key(input.api_key.trim())
            .with_proxy(input.proxy.as_str())
            .with_network(network);
        config.validate()?;
        debug!(
            network = ?network,
            proxy = config.proxy.is_some(),
            has_key = config.credential().is_some(),
            "api config built"
        );
        Ok(config)
    }
}

impl Default for ApiConfigNode {
    fn default() -> Self {
        Self::new(ClientConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i18n::Locale;

    #[test]
    fn test_builds_accelerated_route_from_chinese_label() {
        let node = ApiConfigNode::default();
        let cfg = node
            .build(&ApiConfigInput {
                api_key: " sk-abc ".into(),
                proxy: "http://127.0.0.1:7890".into(),
                network: "A-国内加速线路".into(),
            })
            .unwrap();
        assert_eq!(cfg.credential(), Some("sk-abc"));
        assert_eq!(cfg.network, NetworkRoute::DomesticAccelerated);
        assert_eq!(cfg.effective_base_url(), "https://hk-api.aabao.top");
        assert_eq!(cfg.proxy.as_deref(), Some("http://127.0.0.1:7890"));
    }

    #[test]
    fn test_blank_network_means_direct() {
        let cfg = ApiConfigNode::default().build(&ApiConfigInput::default()).unwrap();
        assert_eq!(cfg.network, NetworkRoute::Direct);
        assert!(cfg.proxy.is_none());
    }

    #[test]
    fn test_unknown_network_and_bad_proxy_rejected() {
        let node = ApiConfigNode::default();
        let bad_network = ApiConfigInput {
            network: "B-line".into(),
            ..Default::default()
        };
        assert!(matches!(node.build(&bad_network), Err(Error::Validation { .. })));

        let bad_proxy = ApiConfigInput {
            proxy: "127.0.0.1 7890".into(),
            ..Default::default()
        };
        assert!(matches!(node.build(&bad_proxy), Err(Error::Configuration { .. })));
    }

    #[test]
    fn test_choices_follow_locale() {
        let node = ApiConfigNode::new(ClientConfig::new().with_locale(Locale::SimplifiedChinese));
        assert_eq!(node.network_choices()[0], "不加速");
    }
}
