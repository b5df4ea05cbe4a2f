//! Prompt builders. Pure functions over plain inputs so the text is testable.

use std::fmt::Write;

use chrono::{DateTime, Utc};
use vantage_core::{AnalysisKind, PersonaConfig};
use vantage_db::{EnrichedArticleRow, UnenrichedArticleRow};

use crate::normalize::truncate_chars;

pub const ENRICH_CONTENT_CHARS: usize = 3_000;

pub const ENRICH_SYSTEM: &str = "You are an intelligence analyst. You read one article and \
     return a single JSON object describing it. Output JSON only.";
pub const CONNECT_SYSTEM: &str = "You are an intelligence analyst who links related news \
     items. Output a single JSON array only.";
pub const BRIEFING_SYSTEM: &str = "You are a senior technology analyst writing a daily \
     intelligence briefing for engineers and technology leaders.";
pub const ANALYSIS_SYSTEM: &str = "You are a senior technology analyst writing in-depth \
     research reports.";

fn persona_block(persona: &PersonaConfig) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Reader profile:");
    let _ = writeln!(out, "- Depth level: {}", persona.depth_level.as_str());
    let interests: Vec<String> = persona
        .interest_areas
        .iter()
        .map(|a| format!("{} ({:.1})", a.topic, a.weight))
        .collect();
    let _ = writeln!(out, "- Interests (weight 0-1): {}", interests.join(", "));
    if !persona.company_watchlist.is_empty() {
        let _ = writeln!(out, "- Company watchlist: {}", persona.company_watchlist.join(", "));
    }
    let _ = writeln!(
        out,
        "- Items scoring below {:.2} relevance are noise to this reader",
        persona.relevance_threshold
    );
    out
}

/// Prompt for one article's enrichment.
#[must_use]
pub fn enrichment_prompt(article: &UnenrichedArticleRow, persona: &PersonaConfig) -> String {
    format!(
        "Analyze this article and return a JSON enrichment.

{persona}
Title: {title}
Source: {source}
Published: {published}
Content: {content}

Return JSON with these fields:
- \"executiveSummary\": 1-2 sentence summary of what matters to this reader
- \"relevanceScore\": 0-1 relevance to the reader's interests, weighted as above
- \"impactLevel\": \"critical\"|\"high\"|\"medium\"|\"low\"|\"informational\"
- \"sentiment\": \"positive\"|\"negative\"|\"neutral\"|\"mixed\"
- \"entities\": [{{\"name\":\"...\",\"type\":\"company\"|\"person\"|\"technology\"|\"vulnerability\"|\"regulation\"|\"product\"}}] (max 5)
- \"categoryTags\": short tags, max 4 (e.g. \"ransomware\",\"AI\",\"cloud\")
- \"keyFacts\": 2-3 key facts
- \"connectionHints\": short phrases that could link this story to others (optional)

Return ONLY one JSON object. No markdown, no explanation.",
        persona = persona_block(persona),
        title = article.title,
        source = article.source_name,
        published = article.published_at.to_rfc3339(),
        content = truncate_chars(&article.content, ENRICH_CONTENT_CHARS),
    )
}

/// Prompt listing the batch for connection finding.
#[must_use]
pub fn connection_prompt(articles: &[EnrichedArticleRow]) -> String {
    let list = articles
        .iter()
        .map(|a| {
            format!(
                "- ID: {}\n  Title: {}\n  Summary: {}\n  Tags: {}",
                a.article_id,
                a.title,
                a.executive_summary,
                a.category_tags.join(", ")
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "Identify connections between these articles.

{list}

For each connection return:
- \"sourceArticleId\": ID of first article
- \"targetArticleId\": ID of second article
- \"relationshipType\": \"related\"|\"follow-up\"|\"contradicts\"|\"caused-by\"
- \"reasoning\": Brief explanation
- \"confidence\": 0-1

Use only the IDs listed above. Only include connections with confidence >= 0.5.
Return ONLY a JSON array, which may be empty."
    )
}

pub const BRIEFING_SECTIONS: &[&str] = &[
    "Key Takeaways",
    "Critical Alerts",
    "Top Stories",
    "Tech & Engineering Landscape",
    "Cybersecurity Update",
    "Emerging Trends",
    "Action Items",
];

/// Prompt for the daily briefing.
#[must_use]
pub fn briefing_prompt(
    articles: &[EnrichedArticleRow],
    persona: &PersonaConfig,
    now: DateTime<Utc>,
) -> String {
    let list = articles
        .iter()
        .enumerate()
        .map(|(i, a)| {
            format!(
                "{}. [{}] {} ({})\n   {}\n   Tags: {}\n   {}",
                i + 1,
                a.impact_level.to_uppercase(),
                a.title,
                a.source_name,
                a.executive_summary,
                a.category_tags.join(", "),
                a.url
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "**Date:** {date}

{persona}
**Today's Intelligence ({count} articles):**

{list}

**Instructions:**
Generate a daily tech intelligence briefing in markdown. Use these exact sections:

## Key Takeaways
- 3-5 bullet points on the most important developments today. Each on its own line starting with \"- \".

## Critical Alerts
- Any critical/high impact security or infrastructure items, each on its own line starting with \"- \". If none, write \"No critical alerts today.\"

## Top Stories
For each of the {top} most significant stories, write a **bold title** followed by 1-2 sentences of analysis on a new line. Separate stories with a blank line.

## Tech & Engineering Landscape
Key developments across software engineering, infrastructure, AI/ML, cloud, open source and developer tools.

## Cybersecurity Update
Threat landscape, vulnerabilities, breaches and security tooling updates.

## Emerging Trends
Patterns emerging across today's intelligence. What is gaining momentum?

## Action Items
A numbered list of specific, actionable items, one per line.

Write in a crisp, analytical style. Connect dots between stories. Include URLs as markdown links where relevant.",
        date = now.format("%A, %B %-d, %Y"),
        persona = persona_block(persona),
        count = articles.len(),
        top = persona.briefing_format.max_items.clamp(5, 8),
    )
}

/// One supporting article for an analysis prompt.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisSource {
    pub title: String,
    pub source_name: String,
    pub summary: String,
}

pub const ANALYSIS_SECTIONS: &[&str] = &[
    "Executive Summary",
    "Detailed Analysis",
    "Key Findings",
    "Implications",
    "Recommendations",
];

/// Prompt for an ad-hoc analysis report.
#[must_use]
pub fn analysis_prompt(
    topic: &str,
    kind: AnalysisKind,
    articles: &[AnalysisSource],
    persona: Option<&PersonaConfig>,
) -> String {
    let list = if articles.is_empty() {
        "(no matching articles in the archive; rely on general knowledge and say so)".to_string()
    } else {
        articles
            .iter()
            .map(|a| format!("- {} ({}): {}", a.title, a.source_name, a.summary))
            .collect::<Vec<_>>()
            .join("\n")
    };
    let sections = ANALYSIS_SECTIONS
        .iter()
        .enumerate()
        .map(|(i, s)| format!("{}. {s}", i + 1))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Write a deep analysis report on the following topic.

**Analysis type:** {kind}
**Topic:** {topic}
{persona}
**Supporting intelligence:**
{list}

Write in markdown with these sections:
{sections}

Focus on technical depth and engineering implications. Be specific and cite sources.",
        persona = persona.map(persona_block).unwrap_or_default(),
    )
}
