//! Response schemas for the LLM-backed stages.
//!
//! Field names are camelCase to match the JSON the prompts ask for. Closed
//! vocabularies are enforced by the `vantage-core` enums during
//! deserialization; numeric ranges are checked here.

use serde::Deserialize;
use vantage_core::{Entity, ImpactLevel, RelationshipType, Sentiment};
use vantage_llm::extract_json;

use crate::error::ParseError;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichmentResponse {
    pub executive_summary: String,
    pub relevance_score: f64,
    pub impact_level: ImpactLevel,
    pub sentiment: Sentiment,
    pub entities: Vec<Entity>,
    pub category_tags: Vec<String>,
    pub key_facts: Vec<String>,
    #[serde(default)]
    pub connection_hints: Vec<String>,
}

/// One proposed edge. Ids stay as text until checked against the batch.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionProposal {
    pub source_article_id: String,
    pub target_article_id: String,
    pub relationship_type: RelationshipType,
    pub reasoning: String,
    pub confidence: f64,
}

fn check_unit_interval(field: &str, value: f64) -> Result<(), ParseError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ParseError::Schema(format!("{field} {value} outside [0, 1]")))
    }
}

/// Parse and validate an enrichment response.
///
/// # Errors
///
/// Returns [`ParseError`] when no JSON can be extracted, the JSON does not
/// match the schema, or `relevanceScore` is outside `[0, 1]`.
pub fn parse_enrichment(text: &str) -> Result<EnrichmentResponse, ParseError> {
    let value = extract_json(text)?;
    let response: EnrichmentResponse = serde_json::from_value(value)?;
    check_unit_interval("relevanceScore", response.relevance_score)?;
    Ok(response)
}

/// Parse and validate a connection-finder response (a JSON array).
///
/// # Errors
///
/// Returns [`ParseError`] when no JSON can be extracted, the value is not an
/// array of proposals, or any `confidence` is outside `[0, 1]`.
pub fn parse_connections(text: &str) -> Result<Vec<ConnectionProposal>, ParseError> {
    let value = extract_json(text)?;
    let proposals: Vec<ConnectionProposal> = serde_json::from_value(value)?;
    for proposal in &proposals {
        check_unit_interval("confidence", proposal.confidence)?;
    }
    Ok(proposals)
}

/// Markdown output (briefings, analyses). Blank output is a failure.
///
/// # Errors
///
/// Returns [`ParseError::Empty`] when the text is blank.
pub fn parse_markdown(text: &str) -> Result<String, ParseError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ParseError::Empty);
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use vantage_core::EntityType;

    use super::*;

    const ENRICHMENT: &str = r#"{
        "executiveSummary": "A critical RCE in Ivanti gateways is being exploited.",
        "relevanceScore": 0.92,
        "impactLevel": "critical",
        "sentiment": "negative",
        "entities": [{"name": "Ivanti", "type": "company"}],
        "categoryTags": ["vulnerability", "VPN"],
        "keyFacts": ["CVSS 9.8", "Exploited in the wild"]
    }"#;

    #[test]
    fn parses_enrichment_with_default_hints() {
        let parsed = parse_enrichment(ENRICHMENT).unwrap();
        assert_eq!(parsed.impact_level, ImpactLevel::Critical);
        assert_eq!(parsed.sentiment, Sentiment::Negative);
        assert_eq!(parsed.entities[0].entity_type, EntityType::Company);
        assert!(parsed.connection_hints.is_empty());
    }

    #[test]
    fn parses_enrichment_inside_fence() {
        let text = format!("```json\n{ENRICHMENT}\n```");
        assert!(parse_enrichment(&text).is_ok());
    }

    #[test]
    fn rejects_relevance_out_of_range() {
        let text = ENRICHMENT.replace("0.92", "1.4");
        assert!(matches!(parse_enrichment(&text), Err(ParseError::Schema(_))));
    }

    #[test]
    fn rejects_unknown_impact_level() {
        let text = ENRICHMENT.replace("\"critical\"", "\"severe\"");
        assert!(matches!(parse_enrichment(&text), Err(ParseError::Json(_))));
    }

    #[test]
    fn rejects_unknown_entity_type() {
        let text = ENRICHMENT.replace("\"company\"", "\"organisation\"");
        assert!(matches!(parse_enrichment(&text), Err(ParseError::Json(_))));
    }

    #[test]
    fn rejects_prose_around_braces() {
        let text = format!("Sure! Here you go: {ENRICHMENT} Let me know.");
        assert!(matches!(parse_enrichment(&text), Err(ParseError::NoJson)));
    }

    #[test]
    fn parses_connection_array() {
        let text = r#"[{
            "sourceArticleId": "a", "targetArticleId": "b",
            "relationshipType": "follow-up", "reasoning": "same CVE", "confidence": 0.8
        }]"#;
        let proposals = parse_connections(text).unwrap();
        assert_eq!(proposals.len(), 1);
        assert_eq!(proposals[0].relationship_type, RelationshipType::FollowUp);
    }

    #[test]
    fn rejects_connection_object_instead_of_array() {
        let text = r#"{"sourceArticleId": "a"}"#;
        assert!(matches!(parse_connections(text), Err(ParseError::Json(_))));
    }

    #[test]
    fn rejects_connection_confidence_out_of_range() {
        let text = r#"[{
            "sourceArticleId": "a", "targetArticleId": "b",
            "relationshipType": "related", "reasoning": "r", "confidence": -0.1
        }]"#;
        assert!(matches!(parse_connections(text), Err(ParseError::Schema(_))));
    }

    #[test]
    fn blank_markdown_is_empty() {
        assert!(matches!(parse_markdown(" \n "), Err(ParseError::Empty)));
        assert_eq!(parse_markdown("\n## Key Takeaways\n").unwrap(), "## Key Takeaways");
    }
}
