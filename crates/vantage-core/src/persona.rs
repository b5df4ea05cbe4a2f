//! Persona configuration: the reader profile that conditions every prompt.
//!
//! The JSON shape (camelCase) is what is stored in `personas.config`.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterestArea {
    pub topic: String,
    pub weight: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DepthLevel {
    Executive,
    Managerial,
    Technical,
    Analyst,
}

impl DepthLevel {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            DepthLevel::Executive => "executive",
            DepthLevel::Managerial => "managerial",
            DepthLevel::Technical => "technical",
            DepthLevel::Analyst => "analyst",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BriefingFormat {
    pub max_items: u32,
    pub include_action_items: bool,
    pub include_trend_analysis: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonaConfig {
    pub interest_areas: Vec<InterestArea>,
    pub depth_level: DepthLevel,
    #[serde(default)]
    pub company_watchlist: Vec<String>,
    #[serde(default)]
    pub source_prioritization: HashMap<String, f64>,
    pub briefing_format: BriefingFormat,
    pub relevance_threshold: f64,
}

impl Default for PersonaConfig {
    fn default() -> Self {
        let area = |topic: &str, weight: f64| InterestArea {
            topic: topic.to_string(),
            weight,
        };
        Self {
            interest_areas: vec![
                area("cybersecurity", 1.0),
                area("AI/ML", 0.8),
                area("cloud infrastructure", 0.7),
                area("enterprise technology", 0.6),
            ],
            depth_level: DepthLevel::Executive,
            company_watchlist: ["CRWD", "PANW", "S", "FTNT", "ZS"]
                .into_iter()
                .map(String::from)
                .collect(),
            source_prioritization: HashMap::new(),
            briefing_format: BriefingFormat {
                max_items: 15,
                include_action_items: true,
                include_trend_analysis: true,
            },
            relevance_threshold: 0.3,
        }
    }
}

impl PersonaConfig {
    /// Check value ranges that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for area in &self.interest_areas {
            if area.topic.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "interest area topic must be non-empty".to_string(),
                ));
            }
            if !(0.0..=1.0).contains(&area.weight) {
                return Err(ConfigError::Validation(format!(
                    "interest area '{}' has weight {} outside [0, 1]",
                    area.topic, area.weight
                )));
            }
        }

        for (source, weight) in &self.source_prioritization {
            if !(0.0..=1.0).contains(weight) {
                return Err(ConfigError::Validation(format!(
                    "source priority '{source}' has weight {weight} outside [0, 1]"
                )));
            }
        }

        if !(0.0..=1.0).contains(&self.relevance_threshold) {
            return Err(ConfigError::Validation(format!(
                "relevance threshold {} outside [0, 1]",
                self.relevance_threshold
            )));
        }

        if self.briefing_format.max_items < 1 {
            return Err(ConfigError::Validation(
                "briefing max_items must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

/// Persona seed record as written in `config/persona.yaml`.
#[derive(Debug, Clone, Deserialize)]
pub struct PersonaSeed {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub config: PersonaConfig,
}

/// Load and validate a persona seed from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_persona(path: &Path) -> Result<PersonaSeed, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let seed: PersonaSeed = serde_yaml::from_str(&content).map_err(|e| ConfigError::FileParse {
        path: path.display().to_string(),
        source: e,
    })?;

    if seed.name.trim().is_empty() {
        return Err(ConfigError::Validation(
            "persona name must be non-empty".to_string(),
        ));
    }
    seed.config.validate()?;

    Ok(seed)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = PersonaConfig::default();
        config.validate().unwrap();
        assert_eq!(config.briefing_format.max_items, 15);
        assert!((config.relevance_threshold - 0.3).abs() < f64::EPSILON);
    }

    #[test]
    fn serializes_as_camel_case() {
        let json = serde_json::to_value(PersonaConfig::default()).unwrap();
        assert!(json.get("interestAreas").is_some());
        assert!(json.get("companyWatchlist").is_some());
        assert_eq!(json["briefingFormat"]["maxItems"], 15);
        assert_eq!(json["depthLevel"], "executive");
    }

    #[test]
    fn rejects_weight_out_of_range() {
        let mut config = PersonaConfig::default();
        config.interest_areas[0].weight = 1.5;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref m) if m.contains("cybersecurity")));
    }

    #[test]
    fn rejects_zero_max_items() {
        let mut config = PersonaConfig::default();
        config.briefing_format.max_items = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_threshold_out_of_range() {
        let mut config = PersonaConfig::default();
        config.relevance_threshold = -0.1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_persona_from_yaml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(
            br#"
name: Analyst
description: Threat desk
config:
  interestAreas:
    - { topic: ransomware, weight: 0.9 }
  depthLevel: analyst
  companyWatchlist: [CRWD]
  briefingFormat: { maxItems: 5, includeActionItems: false, includeTrendAnalysis: true }
  relevanceThreshold: 0.5
"#,
        )
        .unwrap();

        let seed = load_persona(file.path()).unwrap();
        assert_eq!(seed.name, "Analyst");
        assert_eq!(seed.config.depth_level, DepthLevel::Analyst);
        assert!(seed.config.source_prioritization.is_empty());
        assert!(!seed.config.briefing_format.include_action_items);
    }

    #[test]
    fn bundled_persona_matches_defaults() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../config/persona.yaml");
        let seed = load_persona(&path).unwrap();
        assert_eq!(seed.config, PersonaConfig::default());
    }
}
