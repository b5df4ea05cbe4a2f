use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::taxonomy::SourceType;
use crate::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceCategory {
    Tech,
    Cyber,
    Company,
    Regulatory,
}

impl SourceCategory {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SourceCategory::Tech => "tech",
            SourceCategory::Cyber => "cyber",
            SourceCategory::Company => "company",
            SourceCategory::Regulatory => "regulatory",
        }
    }
}

impl std::fmt::Display for SourceCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_enabled() -> bool {
    true
}

fn default_fetch_interval() -> i32 {
    120
}

fn default_metadata() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

/// One entry of the source catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub source_type: SourceType,
    pub url: String,
    pub category: SourceCategory,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_fetch_interval")]
    pub fetch_interval_minutes: i32,
    /// Connector-specific settings, e.g. `tickers` for EDGAR.
    #[serde(default = "default_metadata")]
    pub metadata: serde_json::Value,
}

/// A stored source as handed to a connector.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceDescriptor {
    pub id: uuid::Uuid,
    pub name: String,
    pub source_type: SourceType,
    pub url: String,
    pub metadata: serde_json::Value,
}

impl SourceDescriptor {
    /// String entries of a metadata array, e.g. `tickers`.
    #[must_use]
    pub fn metadata_strings(&self, key: &str) -> Vec<String> {
        self.metadata
            .get(key)
            .and_then(serde_json::Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(serde_json::Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// One watchlist company, keyed by ticker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyConfig {
    pub ticker: String,
    pub name: String,
    pub slug: String,
    pub sector: String,
    pub description: String,
    #[serde(default)]
    pub is_main: bool,
    #[serde(default = "default_metadata")]
    pub metadata: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct SourcesFile {
    pub sources: Vec<SourceConfig>,
    #[serde(default)]
    pub companies: Vec<CompanyConfig>,
}

/// Load and validate the source catalog from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_sources(path: &Path) -> Result<SourcesFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let sources_file: SourcesFile =
        serde_yaml::from_str(&content).map_err(|e| ConfigError::FileParse {
            path: path.display().to_string(),
            source: e,
        })?;

    validate_sources(&sources_file)?;

    Ok(sources_file)
}

fn validate_sources(sources_file: &SourcesFile) -> Result<(), ConfigError> {
    let mut seen_names = HashSet::new();

    for source in &sources_file.sources {
        if source.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "source name must be non-empty".to_string(),
            ));
        }

        if !seen_names.insert(source.name.to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "duplicate source name: '{}'",
                source.name
            )));
        }

        if !(source.url.starts_with("https://") || source.url.starts_with("http://")) {
            return Err(ConfigError::Validation(format!(
                "source '{}' has non-http url '{}'",
                source.name, source.url
            )));
        }

        if source.fetch_interval_minutes <= 0 {
            return Err(ConfigError::Validation(format!(
                "source '{}' has non-positive fetch interval {}",
                source.name, source.fetch_interval_minutes
            )));
        }
    }

    validate_companies(&sources_file.companies)
}

fn validate_companies(companies: &[CompanyConfig]) -> Result<(), ConfigError> {
    let mut seen_tickers = HashSet::new();
    let mut seen_slugs = HashSet::new();

    for company in companies {
        if company.ticker.trim().is_empty() || company.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "company ticker and name must be non-empty".to_string(),
            ));
        }

        if !seen_tickers.insert(company.ticker.to_uppercase()) {
            return Err(ConfigError::Validation(format!(
                "duplicate company ticker: '{}'",
                company.ticker
            )));
        }

        if !is_slug(&company.slug) {
            return Err(ConfigError::Validation(format!(
                "company '{}' has invalid slug '{}'",
                company.ticker, company.slug
            )));
        }

        if !seen_slugs.insert(company.slug.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate company slug: '{}'",
                company.slug
            )));
        }
    }

    if companies.iter().filter(|c| c.is_main).count() > 1 {
        return Err(ConfigError::Validation(
            "at most one company may set is_main".to_string(),
        ));
    }

    Ok(())
}

/// Lowercase alphanumeric words joined by single hyphens.
fn is_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug.split('-').all(|part| {
            !part.is_empty()
                && part
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        })
}
