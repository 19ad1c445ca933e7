//! Batch summarizer: one generation call per batch, validated and kept or
//! dropped. Nothing here persists anything.

use docdigest_generation::{GenerationRequest, TextGenerator};
use docdigest_shared::OutputFormat;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::batcher::Batch;
use crate::progress::SummaryProgress;
use crate::validator::{Rejection, SummaryGate};

/// Characters of batch input shown in debug logs.
const PREVIEW_CHARS: usize = 500;

/// Generation settings shared by every call of one run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub output_format: OutputFormat,
    pub max_output_tokens: u32,
    pub temperature: f64,
}

impl GenerationParams {
    pub(crate) fn request(&self, text: String, target_words: Option<usize>) -> GenerationRequest {
        GenerationRequest {
            text,
            output_format: self.output_format,
            max_output_tokens: self.max_output_tokens,
            temperature: self.temperature,
            target_words,
        }
    }
}

/// Why a generation attempt produced nothing usable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FailureReason {
    /// The call itself failed.
    Generation(String),
    /// The call succeeded but the validator rejected the text.
    Rejected(Rejection),
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Generation(e) => write!(f, "generation failed: {e}"),
            Self::Rejected(r) => write!(f, "rejected: {r}"),
        }
    }
}

/// Result of one generate-then-validate attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    /// Validated, trimmed text.
    Succeeded(String),
    Failed(FailureReason),
}

/// One dropped batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchFailure {
    /// 0-based batch index.
    pub batch: usize,
    pub reason: FailureReason,
}

/// Aggregated outcomes of a batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub attempted: usize,
    pub succeeded: usize,
    /// Calls that errored.
    pub failed: usize,
    /// Calls whose output the validator rejected.
    pub rejected: usize,
    pub reasons: Vec<BatchFailure>,
}

impl RunReport {
    fn record(&mut self, batch: usize, outcome: &BatchOutcome) {
        self.attempted += 1;
        match outcome {
            BatchOutcome::Succeeded(_) => self.succeeded += 1,
            BatchOutcome::Failed(reason) => {
                match reason {
                    FailureReason::Generation(_) => self.failed += 1,
                    FailureReason::Rejected(_) => self.rejected += 1,
                }
                self.reasons.push(BatchFailure {
                    batch,
                    reason: reason.clone(),
                });
            }
        }
    }
}

/// Valid batch summaries in batch order, plus the report of the run.
#[derive(Debug, Clone, Default)]
pub struct BatchRun {
    pub summaries: Vec<String>,
    pub report: RunReport,
}

/// Make one generation call and pass the reply through `gate`.
pub async fn generate_validated(
    generator: &dyn TextGenerator,
    gate: &dyn SummaryGate,
    request: &GenerationRequest,
) -> BatchOutcome {
    match generator.generate(request).await {
        Ok(text) => match gate.check(&text) {
            Ok(()) => BatchOutcome::Succeeded(text.trim().to_string()),
            Err(rejection) => BatchOutcome::Failed(FailureReason::Rejected(rejection)),
        },
        Err(e) => BatchOutcome::Failed(FailureReason::Generation(e.to_string())),
    }
}

/// Summarize each batch in order. Failed or rejected batches are dropped and
/// the run continues; gaps are closed in the returned list.
pub async fn summarize_batches(
    batches: &[Batch<'_>],
    generator: &dyn TextGenerator,
    gate: &dyn SummaryGate,
    params: &GenerationParams,
    progress: &dyn SummaryProgress,
) -> BatchRun {
    let total = batches.len();
    let mut run = BatchRun::default();

    for (i, batch) in batches.iter().enumerate() {
        let text = batch.text();
        let words = batch.word_count();
        progress.batch_progress(i + 1, total, &format!("{words} words"));
        info!(batch = i + 1, total, words, "summarizing batch");
        debug!(
            batch = i + 1,
            preview = %text.chars().take(PREVIEW_CHARS).collect::<String>(),
            "batch input"
        );

        let outcome = generate_validated(generator, gate, &params.request(text, None)).await;
        run.report.record(i, &outcome);

        match outcome {
            BatchOutcome::Succeeded(summary) => run.summaries.push(summary),
            BatchOutcome::Failed(FailureReason::Rejected(reason)) => {
                warn!(batch = i + 1, %reason, "batch summary rejected");
            }
            BatchOutcome::Failed(FailureReason::Generation(err)) => {
                warn!(batch = i + 1, error = %err, "batch generation failed");
            }
        }
    }

    if run.summaries.is_empty() && total > 0 {
        error!(
            attempted = run.report.attempted,
            failed = run.report.failed,
            rejected = run.report.rejected,
            "no valid batch summaries"
        );
    }

    run
}
