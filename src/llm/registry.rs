use super::compatible::CompatibleProvider;
use super::traits::Provider;
use crate::config::Config;
use std::collections::HashMap;
use std::sync::Arc;

/// Named providers the judge can be pointed at.
#[derive(Default, Clone)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn Provider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// One [`CompatibleProvider`] per `[providers.<id>]` table.
    pub fn from_config(config: &Config) -> Self {
        let mut registry = Self::new();
        for (id, endpoint) in &config.providers {
            tracing::debug!(
                provider = id.as_str(),
                base_url = %endpoint.base_url,
                "registering judge provider"
            );
            registry.insert(
                id.clone(),
                Arc::new(CompatibleProvider::new(id.clone(), endpoint)),
            );
        }
        registry
    }

    pub fn insert(&mut self, id: impl Into<String>, provider: Arc<dyn Provider>) {
        self.providers.insert(id.into(), provider);
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn Provider>> {
        self.providers.get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.providers.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderEndpointConfig;

    #[test]
    fn from_config_registers_every_endpoint() {
        let mut config = Config::default();
        for id in ["b-local", "a-hosted"] {
            config.providers.insert(
                id.into(),
                ProviderEndpointConfig {
                    base_url: format!("http://{id}"),
                    api_key: None,
                    model: "m".into(),
                    timeout_secs: 5,
                },
            );
        }

        let registry = ProviderRegistry::from_config(&config);

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.ids(), vec!["a-hosted", "b-local"]);
        assert_eq!(registry.get("a-hosted").unwrap().name(), "a-hosted");
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn empty_registry() {
        let registry = ProviderRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.ids().is_empty());
    }
}
