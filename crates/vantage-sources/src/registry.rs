use std::collections::HashMap;
use std::sync::Arc;

use vantage_core::SourceType;

use crate::http::{build_client, HttpSettings};
use crate::{
    CisaConnector, Connector, HackerNewsConnector, NistNvdConnector, RedditConnector,
    RssConnector, SecEdgarConnector, SourceError,
};

/// Connectors keyed by the source type they serve.
#[derive(Clone, Default)]
pub struct ConnectorRegistry {
    connectors: HashMap<SourceType, Arc<dyn Connector>>,
}

impl ConnectorRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with every built-in connector sharing one HTTP client.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Http`] if the HTTP client cannot be built.
    pub fn with_defaults(settings: &HttpSettings) -> Result<Self, SourceError> {
        let client = build_client(settings)?;
        let mut registry = Self::new();
        registry.register(Arc::new(RssConnector::new(client.clone())));
        registry.register(Arc::new(HackerNewsConnector::new(client.clone())));
        registry.register(Arc::new(RedditConnector::new(client.clone())));
        registry.register(Arc::new(CisaConnector::new(client.clone())));
        registry.register(Arc::new(NistNvdConnector::new(client.clone())));
        registry.register(Arc::new(SecEdgarConnector::new(
            client,
            settings.sec_user_agent.clone(),
        )));
        Ok(registry)
    }

    /// Add or replace the connector for its source type.
    pub fn register(&mut self, connector: Arc<dyn Connector>) {
        self.connectors.insert(connector.source_type(), connector);
    }

    #[must_use]
    pub fn get(&self, source_type: SourceType) -> Option<Arc<dyn Connector>> {
        self.connectors.get(&source_type).cloned()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.connectors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.connectors.is_empty()
    }
}

impl std::fmt::Debug for ConnectorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut types: Vec<&str> = self.connectors.keys().map(|t| t.as_str()).collect();
        types.sort_unstable();
        f.debug_struct("ConnectorRegistry")
            .field("types", &types)
            .finish()
    }
}
