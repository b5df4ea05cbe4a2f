//! Closed vocabularies shared by connectors, the database layer, and the
//! LLM response schemas.
//!
//! Every enum round-trips through the same lowercase tag used in the database
//! columns, the YAML catalog, and the JSON produced by the model.

use serde::{Deserialize, Serialize};

use crate::CoreError;

macro_rules! tagged_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal {
            $($variant:ident => $tag:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $tag)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            #[must_use]
            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $tag,)+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = CoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($tag => Ok($name::$variant),)+
                    other => Err(CoreError::unknown($kind, other)),
                }
            }
        }
    };
}

tagged_enum! {
    /// Fetch protocol of a source; selects the connector.
    SourceType, "source type" {
        Rss => "rss",
        HackerNews => "hackernews",
        Reddit => "reddit",
        Cisa => "cisa",
        NistNvd => "nist_nvd",
        SecEdgar => "sec_edgar",
    }
}

tagged_enum! {
    ImpactLevel, "impact level" {
        Critical => "critical",
        High => "high",
        Medium => "medium",
        Low => "low",
        Informational => "informational",
    }
}

tagged_enum! {
    Sentiment, "sentiment" {
        Positive => "positive",
        Negative => "negative",
        Neutral => "neutral",
        Mixed => "mixed",
    }
}

tagged_enum! {
    EntityType, "entity type" {
        Company => "company",
        Person => "person",
        Technology => "technology",
        Vulnerability => "vulnerability",
        Regulation => "regulation",
        Product => "product",
    }
}

tagged_enum! {
    /// Directed relationship proposed between two articles.
    RelationshipType, "relationship type" {
        Related => "related",
        FollowUp => "follow-up",
        Contradicts => "contradicts",
        CausedBy => "caused-by",
    }
}

tagged_enum! {
    AnalysisKind, "analysis type" {
        Competitive => "competitive",
        Trend => "trend",
        Regulatory => "regulatory",
        Threat => "threat",
    }
}

impl AnalysisKind {
    /// Title-case label used in report titles, e.g. `"Threat"`.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            AnalysisKind::Competitive => "Competitive",
            AnalysisKind::Trend => "Trend",
            AnalysisKind::Regulatory => "Regulatory",
            AnalysisKind::Threat => "Threat",
        }
    }
}

impl ImpactLevel {
    /// Ordering weight, `critical` highest.
    #[must_use]
    pub fn rank(self) -> u8 {
        match self {
            ImpactLevel::Critical => 4,
            ImpactLevel::High => 3,
            ImpactLevel::Medium => 2,
            ImpactLevel::Low => 1,
            ImpactLevel::Informational => 0,
        }
    }
}

/// A named entity extracted from an article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub name: String,
    #[serde(rename = "type")]
    pub entity_type: EntityType,
}
