use serde::{Deserialize, Serialize};

use crate::CoreError;

/// One of the five governed batch stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineKind {
    Fetch,
    Enrich,
    Connect,
    Briefing,
    Analysis,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerKind {
    Cron,
    Manual,
}

/// Ledger status of a pipeline run. `Running` marks an admitted run that has
/// not finished yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Success,
    Failed,
}

/// Per-day admission caps for a pipeline, split by trigger kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DailyLimit {
    pub cron: i64,
    pub manual: i64,
}

impl DailyLimit {
    #[must_use]
    pub fn for_trigger(self, trigger: TriggerKind) -> i64 {
        match trigger {
            TriggerKind::Cron => self.cron,
            TriggerKind::Manual => self.manual,
        }
    }
}

impl PipelineKind {
    pub const ALL: &'static [PipelineKind] = &[
        PipelineKind::Fetch,
        PipelineKind::Enrich,
        PipelineKind::Connect,
        PipelineKind::Briefing,
        PipelineKind::Analysis,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            PipelineKind::Fetch => "fetch",
            PipelineKind::Enrich => "enrich",
            PipelineKind::Connect => "connect",
            PipelineKind::Briefing => "briefing",
            PipelineKind::Analysis => "analysis",
        }
    }

    /// Analysis has no scheduled allowance.
    #[must_use]
    pub fn daily_limit(self) -> DailyLimit {
        match self {
            PipelineKind::Analysis => DailyLimit { cron: 0, manual: 2 },
            _ => DailyLimit { cron: 1, manual: 2 },
        }
    }

    #[must_use]
    pub fn limit_for(self, trigger: TriggerKind) -> i64 {
        self.daily_limit().for_trigger(trigger)
    }
}

impl TriggerKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TriggerKind::Cron => "cron",
            TriggerKind::Manual => "manual",
        }
    }
}

impl RunStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Running => "running",
            RunStatus::Success => "success",
            RunStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for PipelineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PipelineKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fetch" => Ok(PipelineKind::Fetch),
            "enrich" => Ok(PipelineKind::Enrich),
            "connect" => Ok(PipelineKind::Connect),
            "briefing" => Ok(PipelineKind::Briefing),
            "analysis" => Ok(PipelineKind::Analysis),
            other => Err(CoreError::unknown("pipeline", other)),
        }
    }
}

impl std::str::FromStr for TriggerKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cron" => Ok(TriggerKind::Cron),
            "manual" => Ok(TriggerKind::Manual),
            other => Err(CoreError::unknown("trigger", other)),
        }
    }
}

impl std::str::FromStr for RunStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" => Ok(RunStatus::Running),
            "success" => Ok(RunStatus::Success),
            "failed" => Ok(RunStatus::Failed),
            other => Err(CoreError::unknown("run status", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheduled_stages_allow_one_cron_two_manual() {
        for kind in [
            PipelineKind::Fetch,
            PipelineKind::Enrich,
            PipelineKind::Connect,
            PipelineKind::Briefing,
        ] {
            assert_eq!(kind.limit_for(TriggerKind::Cron), 1, "{kind}");
            assert_eq!(kind.limit_for(TriggerKind::Manual), 2, "{kind}");
        }
    }

    #[test]
    fn analysis_is_manual_only() {
        assert_eq!(PipelineKind::Analysis.limit_for(TriggerKind::Cron), 0);
        assert_eq!(PipelineKind::Analysis.limit_for(TriggerKind::Manual), 2);
    }

    #[test]
    fn pipeline_kind_parses_known_names() {
        for kind in PipelineKind::ALL {
            assert_eq!(kind.as_str().parse::<PipelineKind>().unwrap(), *kind);
        }
        assert!("ingest".parse::<PipelineKind>().is_err());
    }

    #[test]
    fn trigger_and_status_tags() {
        assert_eq!("manual".parse::<TriggerKind>().unwrap(), TriggerKind::Manual);
        assert_eq!(RunStatus::Failed.to_string(), "failed");
        assert!("done".parse::<RunStatus>().is_err());
    }
}
