//! Uniform entry point over the stages, used by the server and the CLI.

use serde::Serialize;
use uuid::Uuid;
use vantage_core::{PipelineKind, TriggerKind};

use crate::analysis::{AnalysisReport, AnalysisRequest};
use crate::briefing::BriefingReport;
use crate::connect::ConnectReport;
use crate::enrich::EnrichReport;
use crate::error::PipelineError;
use crate::fetch::FetchReport;
use crate::usage::{run_governed, GovernedRun, RunMetrics};
use crate::Pipeline;

/// Caller-supplied knobs. `limit` only applies to enrichment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageOptions {
    pub persona_id: Option<Uuid>,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StageReport {
    Fetch(FetchReport),
    Enrich(EnrichReport),
    Connect(ConnectReport),
    Briefing(BriefingReport),
    Analysis(AnalysisReport),
}

impl RunMetrics for StageReport {
    fn items_processed(&self) -> i32 {
        match self {
            StageReport::Fetch(r) => r.items_processed(),
            StageReport::Enrich(r) => r.items_processed(),
            StageReport::Connect(r) => r.items_processed(),
            StageReport::Briefing(r) => r.items_processed(),
            StageReport::Analysis(r) => r.items_processed(),
        }
    }

    fn total_tokens(&self) -> i64 {
        match self {
            StageReport::Fetch(r) => r.total_tokens(),
            StageReport::Enrich(r) => r.total_tokens(),
            StageReport::Connect(r) => r.total_tokens(),
            StageReport::Briefing(r) => r.total_tokens(),
            StageReport::Analysis(r) => r.total_tokens(),
        }
    }
}

impl Pipeline {
    /// Run one batch stage without governance.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidRequest`] for `analysis`, which needs
    /// an [`AnalysisRequest`], and otherwise whatever the stage returns.
    pub async fn run_stage(
        &self,
        kind: PipelineKind,
        options: &StageOptions,
    ) -> Result<StageReport, PipelineError> {
        match kind {
            PipelineKind::Fetch => self.run_fetch().await.map(StageReport::Fetch),
            PipelineKind::Enrich => self
                .run_enrich(options.persona_id, options.limit)
                .await
                .map(StageReport::Enrich),
            PipelineKind::Connect => self
                .run_connect(options.persona_id)
                .await
                .map(StageReport::Connect),
            PipelineKind::Briefing => self
                .run_briefing(options.persona_id)
                .await
                .map(StageReport::Briefing),
            PipelineKind::Analysis => Err(PipelineError::InvalidRequest(
                "analysis runs need a topic and type".to_string(),
            )),
        }
    }

    /// Admit, run and record one batch stage.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidRequest`] for `analysis` before any
    /// reservation, or [`PipelineError::Db`] if the reservation fails.
    pub async fn run_governed_stage(
        &self,
        kind: PipelineKind,
        trigger: TriggerKind,
        options: StageOptions,
    ) -> Result<GovernedRun<StageReport>, PipelineError> {
        if kind == PipelineKind::Analysis {
            return Err(PipelineError::InvalidRequest(
                "analysis runs need a topic and type".to_string(),
            ));
        }
        run_governed(self.store(), kind, trigger, || async move {
            self.run_stage(kind, &options).await
        })
        .await
    }

    /// Admit, run and record one analysis. The request is validated before
    /// any quota is reserved.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidRequest`] for a blank topic, or
    /// [`PipelineError::Db`] if the reservation fails.
    pub async fn run_governed_analysis(
        &self,
        trigger: TriggerKind,
        request: &AnalysisRequest,
    ) -> Result<GovernedRun<AnalysisReport>, PipelineError> {
        request.validate()?;
        run_governed(self.store(), PipelineKind::Analysis, trigger, || {
            self.run_analysis(request)
        })
        .await
    }
}
