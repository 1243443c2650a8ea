//! Provider router: selects the model provider based on config.

use std::collections::HashMap;
use std::sync::Arc;

use gitscribe_config::AppConfig;
use gitscribe_core::error::ProviderError;
use gitscribe_core::provider::Provider;
use tracing::warn;

use crate::gemini::GeminiProvider;

/// Provider names `build_from_config` knows how to construct.
pub const SUPPORTED_PROVIDERS: &[&str] = &["gemini"];

/// Holds the configured providers and names the default one.
pub struct ProviderRouter {
    providers: HashMap<String, Arc<dyn Provider>>,
    default_provider: String,
}

impl ProviderRouter {
    pub fn new(default_provider: impl Into<String>) -> Self {
        Self {
            providers: HashMap::new(),
            default_provider: default_provider.into(),
        }
    }

    pub fn register(&mut self, name: impl Into<String>, provider: Arc<dyn Provider>) {
        self.providers.insert(name.into(), provider);
    }

    /// The provider named by `default_provider`, if registered.
    pub fn default(&self) -> Option<Arc<dyn Provider>> {
        self.providers.get(&self.default_provider).cloned()
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Provider>> {
        self.providers.get(name).cloned()
    }

    /// Registered provider names, sorted.
    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.providers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Build providers from configuration.
///
/// The default provider must be supported and have an API key; either
/// problem is reported as `ProviderError::NotConfigured` rather than deferred
/// to the first call. Other `[providers.*]` entries that cannot be built are
/// skipped with a warning.
pub fn build_from_config(config: &AppConfig) -> Result<ProviderRouter, ProviderError> {
    let mut router = ProviderRouter::new(&config.default_provider);

    let mut names: Vec<&String> = config.providers.keys().collect();
    if !config.providers.contains_key(&config.default_provider) {
        names.push(&config.default_provider);
    }

    for name in names {
        let is_default = name == &config.default_provider;
        match build_one(config, name) {
            Ok(provider) => router.register(name.clone(), provider),
            Err(e) if is_default => return Err(e),
            Err(e) => warn!(provider = %name, error = %e, "Skipping provider"),
        }
    }

    Ok(router)
}

fn build_one(config: &AppConfig, name: &str) -> Result<Arc<dyn Provider>, ProviderError> {
    if !SUPPORTED_PROVIDERS.contains(&name) {
        return Err(ProviderError::NotConfigured(format!(
            "unsupported provider '{name}' (supported: {})",
            SUPPORTED_PROVIDERS.join(", ")
        )));
    }

    let provider_config = config.providers.get(name).cloned().unwrap_or_default();
    let api_key = provider_config
        .api_key
        .or_else(|| config.api_key.clone())
        .ok_or_else(|| {
            ProviderError::NotConfigured(format!(
                "no API key for provider '{name}' (set GOOGLE_API_KEY or GITSCRIBE_API_KEY)"
            ))
        })?;

    let provider = match provider_config.api_url {
        Some(url) => GeminiProvider::with_base_url(api_key, url)?,
        None => GeminiProvider::new(api_key)?,
    };
    Ok(Arc::new(provider))
}

#[cfg(test)]
mod tests {
    use super::*;
    use gitscribe_config::ProviderConfig;

    #[test]
    fn router_register_and_lookup() {
        let mut router = ProviderRouter::new("gemini");
        let provider = Arc::new(GeminiProvider::new("g-test").unwrap());
        router.register("gemini", provider);

        assert!(router.get("gemini").is_some());
        assert!(router.get("nonexistent").is_none());
        assert!(router.default().is_some());
    }

    #[test]
    fn builds_gemini_by_default() {
        let config = AppConfig {
            api_key: Some("g-key".into()),
            ..AppConfig::default()
        };
        let router = build_from_config(&config).unwrap();
        assert_eq!(router.default().unwrap().name(), "gemini");
    }

    #[test]
    fn missing_key_for_default_provider_is_error() {
        let err = build_from_config(&AppConfig::default()).err().unwrap();
        assert!(matches!(err, ProviderError::NotConfigured(_)));
    }

    #[test]
    fn unsupported_default_provider_is_error() {
        let config = AppConfig {
            api_key: Some("key".into()),
            default_provider: "openai".into(),
            ..AppConfig::default()
        };
        let err = build_from_config(&config).err().unwrap();
        assert!(err.to_string().contains("unsupported provider 'openai'"));
    }

    #[test]
    fn per_provider_key_and_url() {
        let mut config = AppConfig::default();
        config.providers.insert(
            "gemini".into(),
            ProviderConfig {
                api_key: Some("g-1".into()),
                api_url: Some("http://localhost:9999".into()),
                default_model: None,
            },
        );
        let router = build_from_config(&config).unwrap();
        assert_eq!(router.list(), vec!["gemini"]);
    }

    #[test]
    fn unusable_extra_provider_is_skipped() {
        let mut config = AppConfig {
            api_key: Some("g-key".into()),
            ..AppConfig::default()
        };
        config
            .providers
            .insert("ollama".into(), ProviderConfig::default());
        let router = build_from_config(&config).unwrap();
        assert_eq!(router.list(), vec!["gemini"]);
    }
}
