//! Persona resolution shared by every stage.

use uuid::Uuid;
use vantage_core::PersonaConfig;
use vantage_db::PersonaRow;

use crate::error::PipelineError;
use crate::Pipeline;

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPersona {
    pub id: Uuid,
    pub name: String,
    pub config: PersonaConfig,
}

impl From<PersonaRow> for ResolvedPersona {
    fn from(row: PersonaRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            config: row.config.0,
        }
    }
}

impl Pipeline {
    /// Resolve a persona in order: `explicit`, the configured default id,
    /// then the row flagged `is_default`.
    ///
    /// An explicit id that does not exist is an error rather than a silent
    /// fallback. A configured default that does not exist is skipped.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::NoPersona`] when nothing resolves, or
    /// [`PipelineError::Db`] on a storage failure.
    pub async fn resolve_persona(
        &self,
        explicit: Option<Uuid>,
    ) -> Result<ResolvedPersona, PipelineError> {
        self.find_persona(explicit)
            .await?
            .ok_or(PipelineError::NoPersona)
    }

    /// Like [`Pipeline::resolve_persona`] but absence is not an error.
    pub(crate) async fn find_persona(
        &self,
        explicit: Option<Uuid>,
    ) -> Result<Option<ResolvedPersona>, PipelineError> {
        if let Some(id) = explicit {
            return match self.store.get_persona(id).await? {
                Some(row) => Ok(Some(row.into())),
                None => {
                    tracing::warn!(persona_id = %id, "requested persona does not exist");
                    Err(PipelineError::NoPersona)
                }
            };
        }

        if let Some(id) = self.settings.default_persona_id {
            if let Some(row) = self.store.get_persona(id).await? {
                return Ok(Some(row.into()));
            }
            tracing::warn!(persona_id = %id, "configured default persona not found, using flagged default");
        }

        Ok(self.store.get_default_persona().await?.map(Into::into))
    }
}
