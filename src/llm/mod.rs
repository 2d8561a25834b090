pub mod prompts;
pub mod providers;

use crate::error::PipelineError;
use async_trait::async_trait;

/// Seam between the pipeline and the hosted model.
///
/// Stateless per call: no conversation memory, no retry policy. A failed
/// generation is reported once to the requesting user.
#[async_trait]
pub trait SqlGenerator: Send + Sync {
    /// Sends the (system, human) prompt pair and returns the raw completion
    /// text. Fails with `ModelTimeout` on deadline, `ModelUnavailable` for
    /// everything else.
    async fn generate_sql(
        &self,
        system_prompt: &str,
        human_prompt: &str,
    ) -> Result<String, PipelineError>;
}
