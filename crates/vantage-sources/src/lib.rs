//! Source connectors: one adapter per external protocol, each mapping a
//! bounded batch of upstream items into [`RawArticle`]s.
//!
//! Connectors never fail a batch over transport or parse problems. They log
//! a warning and return an empty list; only unusable configuration surfaces
//! as an error.

pub mod cisa;
pub mod error;
pub mod hackernews;
pub mod http;
pub mod nvd;
pub mod reddit;
pub mod registry;
pub mod rss;
pub mod sec_edgar;

use async_trait::async_trait;
use vantage_core::{RawArticle, SourceDescriptor, SourceType};

pub use cisa::CisaConnector;
pub use error::SourceError;
pub use hackernews::HackerNewsConnector;
pub use http::{build_client, HttpSettings};
pub use nvd::NistNvdConnector;
pub use reddit::RedditConnector;
pub use registry::ConnectorRegistry;
pub use rss::RssConnector;
pub use sec_edgar::SecEdgarConnector;

/// Adapter from one external source protocol to [`RawArticle`]s.
#[async_trait]
pub trait Connector: Send + Sync {
    /// The source type tag this connector serves.
    fn source_type(&self) -> SourceType;

    /// Fetch a bounded batch of items for `source`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::InvalidConfig`] when the source cannot be
    /// fetched as configured. Upstream failures yield `Ok(vec![])`.
    async fn fetch(&self, source: &SourceDescriptor) -> Result<Vec<RawArticle>, SourceError>;
}
